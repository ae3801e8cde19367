//! Chat requests, the client, and the tool-call loop.

pub mod client;
pub mod request;
pub mod tool_loop;

pub use client::{Client, MessageStream};
pub use request::ChatRequest;
pub use tool_loop::{
    resolve_tool_selections, validate_tool_results, LoopEvent, ToolEventSink, ToolLoopOutcome,
};
