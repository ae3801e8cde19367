//! JSON-Schema-like parameter definitions shared across providers.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::ParleyError;

/// Schema of one property.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PropertySchema {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, rename = "enum", skip_serializing_if = "Option::is_none")]
    pub enum_values: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<BTreeMap<String, PropertySchema>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required: Option<Vec<String>>,
}

/// Object schema describing a tool's arguments.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolSchema {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub properties: BTreeMap<String, PropertySchema>,
    #[serde(default)]
    pub required: Vec<String>,
}

impl Default for ToolSchema {
    fn default() -> Self {
        Self::empty()
    }
}

impl ToolSchema {
    /// An object schema with no parameters.
    pub fn empty() -> Self {
        Self {
            kind: "object".to_string(),
            properties: BTreeMap::new(),
            required: Vec::new(),
        }
    }

    /// Builder: create an object schema with properties.
    pub fn object() -> ToolSchemaBuilder {
        ToolSchemaBuilder {
            properties: BTreeMap::new(),
            required: Vec::new(),
        }
    }

    /// Render as a JSON value for the wire.
    pub fn to_value(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_else(|_| serde_json::json!({"type": "object"}))
    }

    /// Check structural consistency: required names must be declared.
    pub fn validate(&self, tool: &str) -> Result<(), ParleyError> {
        if self.kind != "object" {
            return Err(ParleyError::Configuration(format!(
                "Tool '{tool}' schema must be an object, got '{}'",
                self.kind
            )));
        }
        validate_required(tool, &self.properties, &self.required)
    }
}

fn validate_required(
    tool: &str,
    properties: &BTreeMap<String, PropertySchema>,
    required: &[String],
) -> Result<(), ParleyError> {
    if let Some(missing) = required.iter().find(|name| !properties.contains_key(*name)) {
        return Err(ParleyError::Configuration(format!(
            "Tool '{tool}' schema requires undeclared property '{missing}'"
        )));
    }
    for property in properties.values() {
        if let Some(nested) = &property.properties {
            validate_required(tool, nested, property.required.as_deref().unwrap_or_default())?;
        }
    }
    Ok(())
}

/// Builder for constructing tool parameter schemas.
pub struct ToolSchemaBuilder {
    properties: BTreeMap<String, PropertySchema>,
    required: Vec<String>,
}

impl ToolSchemaBuilder {
    fn property(mut self, name: impl Into<String>, schema: PropertySchema, required: bool) -> Self {
        let name = name.into();
        if required {
            self.required.push(name.clone());
        }
        self.properties.insert(name, schema);
        self
    }

    fn scalar(kind: &str, description: impl Into<String>) -> PropertySchema {
        PropertySchema {
            kind: kind.to_string(),
            description: Some(description.into()),
            enum_values: None,
            properties: None,
            required: None,
        }
    }

    /// Add a string property.
    pub fn string(self, name: impl Into<String>, description: impl Into<String>, required: bool) -> Self {
        self.property(name, Self::scalar("string", description), required)
    }

    /// Add a number property.
    pub fn number(self, name: impl Into<String>, description: impl Into<String>, required: bool) -> Self {
        self.property(name, Self::scalar("number", description), required)
    }

    /// Add a boolean property.
    pub fn boolean(self, name: impl Into<String>, description: impl Into<String>, required: bool) -> Self {
        self.property(name, Self::scalar("boolean", description), required)
    }

    /// Add an enum (string) property.
    pub fn string_enum<I, S>(
        self,
        name: impl Into<String>,
        description: impl Into<String>,
        values: I,
        required: bool,
    ) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut schema = Self::scalar("string", description);
        schema.enum_values = Some(values.into_iter().map(Into::into).collect());
        self.property(name, schema, required)
    }

    /// Add a nested object property.
    pub fn object(
        self,
        name: impl Into<String>,
        description: impl Into<String>,
        nested: ToolSchema,
        required: bool,
    ) -> Self {
        let mut schema = Self::scalar("object", description);
        schema.properties = Some(nested.properties);
        schema.required = Some(nested.required);
        self.property(name, schema, required)
    }

    pub fn build(self) -> ToolSchema {
        ToolSchema {
            kind: "object".to_string(),
            properties: self.properties,
            required: self.required,
        }
    }
}
