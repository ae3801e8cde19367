//! Tool system for function calling.

pub mod arguments;
pub mod schema;
pub mod tool;

pub use arguments::ToolArguments;
pub use schema::{PropertySchema, ToolSchema, ToolSchemaBuilder};
pub use tool::{FnTool, Tool, ToolContext, ToolDefinition};
