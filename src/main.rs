//! Parley CLI binary entry point.

use std::io::Write;

use clap::Parser;
use futures::StreamExt;
use parley::chat::ChatRequest;
use parley::cli::{ChatArgs, Cli, Commands};
use parley::config::ParleyConfig;
use parley::models::Model;
use parley::tools::{FnTool, ToolSchema};
use parley::types::{GenerationSettings, Message, MessageId, Role};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let result = match ParleyConfig::load() {
        Ok(config) => match cli.command {
            Commands::Chat(chat_args) => handle_chat(&config, chat_args).await,
            Commands::Status => parley::cli::status::handle_status(&config),
        },
        Err(e) => Err(e.into()),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

async fn handle_chat(config: &ParleyConfig, args: ChatArgs) -> Result<(), Box<dyn std::error::Error>> {
    let prompt = match args.prompt {
        Some(p) => p,
        None => {
            eprintln!("Usage: parley chat \"your prompt here\"");
            std::process::exit(1);
        }
    };

    let model: Model = args.model.parse()?;

    let mut messages = Vec::new();
    if let Some(system) = args.system {
        messages.push(Message::system(system));
    }
    messages.push(Message::user(prompt));

    let settings = GenerationSettings::builder()
        .maybe_temperature(args.temperature)
        .maybe_max_tokens(args.max_tokens)
        .build();

    let clock = FnTool::new(
        "current_time",
        "Current UTC date and time",
        ToolSchema::empty(),
        |_args, _ctx| async { Ok(chrono::Utc::now().to_rfc3339()) },
    );

    let mut request = ChatRequest::new(model, messages)
        .with_settings(settings)
        .with_tool(clock.shared());
    if let Some(max) = args.max_iterations {
        request = request.with_max_iterations(max);
    }

    let client = config.client();

    if args.no_stream {
        let message = client.perform(request).await?;
        println!("{}", message.text());
        return Ok(());
    }

    // Snapshots repeat the whole message; print only what is new.
    let mut shown: Option<(MessageId, usize)> = None;
    let mut stream = client.stream(request);
    while let Some(message) = stream.next().await {
        let message = message?;
        match message.role {
            Role::Assistant => {
                let text = message.text();
                let start = match shown {
                    Some((id, len)) if id == message.id && text.len() >= len => len,
                    Some((id, _)) if id == message.id => text.len(),
                    _ => 0,
                };
                if let Some(fresh) = text.get(start..) {
                    print!("{fresh}");
                }
                let _ = std::io::stdout().flush();
                shown = Some((message.id, text.len()));
            }
            Role::Tool => {
                if let Some(result) = &message.tool_result {
                    let marker = if result.is_error { "❌" } else { "✅" };
                    eprintln!("  {marker} {}", result.result_text);
                }
            }
            Role::System | Role::User => {}
        }
    }

    println!(); // newline after streaming
    Ok(())
}
