//! Parley: a provider-agnostic chat runtime.
//!
//! One canonical message model for several LLM vendors, with streaming
//! decoding, an automatic tool-call loop, and agents that hand tasks to each
//! other while reporting their progress as a conversation tree.
//!
//! # Quick Start
//!
//! ```no_run
//! use parley::prelude::*;
//!
//! # async fn example() -> parley::error::Result<()> {
//! let client = ParleyConfig::load()?.client();
//! let model: Model = "openai:gpt-4o".parse()?;
//! let reply = client
//!     .perform(ChatRequest::new(model, vec![Message::user("Hello!")]))
//!     .await?;
//! println!("{}", reply.text());
//! # Ok(())
//! # }
//! ```

pub mod chat;
pub mod config;
pub mod error;
pub mod models;
pub mod prelude;
pub mod provider;
pub mod stream;
pub mod tools;
pub mod types;

#[cfg(feature = "agent")]
pub mod agent;

#[cfg(feature = "agent")]
pub mod conversation;

#[cfg(feature = "cli")]
pub mod cli;
