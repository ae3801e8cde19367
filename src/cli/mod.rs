//! CLI entry point for Parley.

pub mod status;

use clap::{Parser, Subcommand};

/// Parley chat CLI
#[derive(Parser, Debug)]
#[command(name = "parley", version, about = "Parley: provider-agnostic chat CLI")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Chat with an AI model
    Chat(ChatArgs),
    /// Show configured providers
    Status,
}

/// Arguments for the `chat` subcommand.
#[derive(Parser, Debug)]
pub struct ChatArgs {
    /// Model to use (format: provider:model, e.g., openai:gpt-4o)
    #[arg(short, long, default_value = "openai:gpt-4o")]
    pub model: String,

    /// System prompt
    #[arg(short, long)]
    pub system: Option<String>,

    /// Temperature (0.0 - 2.0)
    #[arg(short, long)]
    pub temperature: Option<f64>,

    /// Max tokens
    #[arg(long)]
    pub max_tokens: Option<u32>,

    /// Stop the tool loop after this many model requests
    #[arg(long)]
    pub max_iterations: Option<usize>,

    /// Print only the final message instead of streaming
    #[arg(long)]
    pub no_stream: bool,

    /// User prompt (positional)
    pub prompt: Option<String>,
}
