//! Typed access to tool call arguments.

use crate::error::ParleyError;

/// Decoded arguments of one tool selection.
#[derive(Debug, Clone)]
pub struct ToolArguments {
    tool: String,
    value: serde_json::Value,
}

impl ToolArguments {
    pub fn new(tool: impl Into<String>, value: serde_json::Value) -> Self {
        Self {
            tool: tool.into(),
            value,
        }
    }

    /// Decode the serialized arguments a model emitted.
    ///
    /// Blank input decodes to an empty object; anything other than a JSON
    /// object is rejected.
    pub fn parse(tool: &str, raw: &str) -> Result<Self, ParleyError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Ok(Self::new(tool, serde_json::json!({})));
        }
        let value: serde_json::Value =
            serde_json::from_str(trimmed).map_err(|e| ParleyError::ToolArgumentDecode {
                tool: tool.to_string(),
                message: e.to_string(),
            })?;
        if !value.is_object() {
            return Err(ParleyError::ToolArgumentDecode {
                tool: tool.to_string(),
                message: format!("expected a JSON object, got {value}"),
            });
        }
        Ok(Self::new(tool, value))
    }

    /// Get the raw JSON value.
    pub fn raw(&self) -> &serde_json::Value {
        &self.value
    }

    fn missing(&self, kind: &str, key: &str) -> ParleyError {
        ParleyError::ToolArgumentDecode {
            tool: self.tool.clone(),
            message: format!("Missing {kind} argument: {key}"),
        }
    }

    /// Get a string argument by key.
    pub fn get_str(&self, key: &str) -> Result<&str, ParleyError> {
        self.value
            .get(key)
            .and_then(|v| v.as_str())
            .ok_or_else(|| self.missing("string", key))
    }

    /// Get an optional string argument.
    pub fn get_str_opt(&self, key: &str) -> Option<&str> {
        self.value.get(key).and_then(|v| v.as_str())
    }

    /// Get an integer argument.
    pub fn get_i64(&self, key: &str) -> Result<i64, ParleyError> {
        self.value
            .get(key)
            .and_then(|v| v.as_i64())
            .ok_or_else(|| self.missing("integer", key))
    }

    /// Get a float argument.
    pub fn get_f64(&self, key: &str) -> Result<f64, ParleyError> {
        self.value
            .get(key)
            .and_then(|v| v.as_f64())
            .ok_or_else(|| self.missing("float", key))
    }

    /// Get a boolean argument.
    pub fn get_bool(&self, key: &str) -> Result<bool, ParleyError> {
        self.value
            .get(key)
            .and_then(|v| v.as_bool())
            .ok_or_else(|| self.missing("boolean", key))
    }

    /// Deserialize the entire arguments into a typed struct.
    pub fn deserialize<T: serde::de::DeserializeOwned>(&self) -> Result<T, ParleyError> {
        serde_json::from_value(self.value.clone()).map_err(|e| ParleyError::ToolArgumentDecode {
            tool: self.tool.clone(),
            message: format!("Failed to deserialize arguments: {e}"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_arguments_decode_to_empty_object() {
        let args = ToolArguments::parse("clock", "  ").unwrap();
        assert_eq!(args.raw(), &serde_json::json!({}));
    }

    #[test]
    fn malformed_arguments_fail_with_tool_name() {
        let err = ToolArguments::parse("search", "{\"q\":").unwrap_err();
        assert!(matches!(err, ParleyError::ToolArgumentDecode { ref tool, .. } if tool == "search"));
    }

    #[test]
    fn non_object_arguments_are_rejected() {
        assert!(ToolArguments::parse("search", "[1,2]").is_err());
    }

    #[test]
    fn typed_getters() {
        let args = ToolArguments::parse("t", r#"{"name":"Alice","age":30,"ok":true}"#).unwrap();
        assert_eq!(args.get_str("name").unwrap(), "Alice");
        assert_eq!(args.get_i64("age").unwrap(), 30);
        assert!(args.get_bool("ok").unwrap());
        assert_eq!(args.get_str_opt("missing"), None);
        assert!(args.get_str("missing").is_err());
    }

    #[test]
    fn deserialize_into_struct() {
        #[derive(serde::Deserialize, PartialEq, Debug)]
        struct Params {
            query: String,
            limit: Option<u32>,
        }

        let args = ToolArguments::parse("t", r#"{"query":"rust","limit":10}"#).unwrap();
        let params: Params = args.deserialize().unwrap();
        assert_eq!(params.query, "rust");
        assert_eq!(params.limit, Some(10));
    }
}
