//! generic-agent command line
//!
//! Inspect the provider configuration, run preset or ad-hoc agents, and chat
//! with OpenRouter models.

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use futures::StreamExt;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use agent_core::{RunOptions, RunResult, Tool};
use generic_agent::catalog::{FREE_MODELS, PAID_MODELS};
use generic_agent::presets::PRESETS;
use generic_agent::tools::{BUILTIN_TOOL_NAMES, builtin_tool};
use generic_agent::{
    ChatClient, ChatOptions, DEFAULT_AGENT_NAME, DEFAULT_CHAT_MODEL, ProviderOverrides, check_configuration,
    create_agent, create_agent_from_preset,
};

#[derive(Parser, Debug)]
#[command(name = "agent-cli", version, about = "Configurable LLM agents over OpenAI-compatible APIs")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Report which providers have credentials configured
    Check {
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// List the bundled agent presets
    Presets,

    /// List the OpenRouter model aliases
    Models,

    /// Run a bundled preset on one message
    Run {
        #[arg(long)]
        preset: String,
        #[arg(long)]
        max_turns: Option<usize>,
        message: String,
    },

    /// Run an ad-hoc agent on one message
    Ask {
        #[arg(long, default_value = DEFAULT_AGENT_NAME)]
        name: String,
        #[arg(long)]
        instructions: Option<String>,
        /// openrouter, openai or custom
        #[arg(long, default_value = "openrouter")]
        provider: String,
        #[arg(long)]
        model: Option<String>,
        #[arg(long)]
        base_url: Option<String>,
        /// Bundled tool to enable; repeatable
        #[arg(long = "tool")]
        tools: Vec<String>,
        #[arg(long)]
        max_turns: Option<usize>,
        message: String,
    },

    /// Chat with an OpenRouter model; each message is one turn
    Chat {
        /// Alias from `models` or a full model id
        #[arg(long, default_value = DEFAULT_CHAT_MODEL)]
        model: String,
        #[arg(long, default_value_t = 0.7)]
        temperature: f32,
        #[arg(long)]
        max_tokens: Option<u32>,
        /// Stream each answer as a one-off question, without history
        #[arg(long)]
        stream: bool,
        /// Continue a previously exported conversation
        #[arg(long)]
        load: Option<PathBuf>,
        /// Save the conversation afterwards
        #[arg(long)]
        export: Option<PathBuf>,
        #[arg(required = true)]
        messages: Vec<String>,
    },

    /// Ask several OpenRouter models the same prompt
    Compare {
        /// Repeatable; aliases or full model ids
        #[arg(long = "model", required = true)]
        models: Vec<String>,
        #[arg(long, default_value_t = 0.7)]
        temperature: f32,
        prompt: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Check { json } => check(json)?,
        Command::Presets => presets(),
        Command::Models => models(),
        Command::Run {
            preset,
            max_turns,
            message,
        } => {
            let agent = create_agent_from_preset(&preset)?;
            let result = agent.run_with(&message, &run_options(max_turns)).await?;
            print_result(&result);
        }
        Command::Ask {
            name,
            instructions,
            provider,
            model,
            base_url,
            tools,
            max_turns,
            message,
        } => {
            let tools = tools
                .iter()
                .map(|name| {
                    builtin_tool(name).with_context(|| {
                        format!("unknown tool '{name}', expected one of {}", BUILTIN_TOOL_NAMES.join(", "))
                    })
                })
                .collect::<anyhow::Result<Vec<Arc<dyn Tool>>>>()?;

            let instructions = instructions.unwrap_or_else(|| agent_core::reasoning::DEFAULT_INSTRUCTIONS.into());
            let extras = ProviderOverrides {
                model_name: model,
                api_key: None,
                base_url,
            };

            let agent = create_agent(&name, &instructions, tools, &provider, extras)?;
            let result = agent.run_with(&message, &run_options(max_turns)).await?;
            print_result(&result);
        }
        Command::Chat {
            model,
            temperature,
            max_tokens,
            stream,
            load,
            export,
            messages,
        } => {
            let mut client = ChatClient::openrouter(None)?;
            if let Some(path) = &load {
                client.load_conversation(path)?;
            }

            let options = ChatOptions {
                model,
                temperature,
                max_tokens,
            };

            for message in &messages {
                println!("> {message}");
                if stream {
                    stream_answer(&client, message, &options).await?;
                } else {
                    println!("{}\n", client.chat(message, &options).await?);
                }
            }

            if let Some(path) = &export {
                client.export_conversation(path)?;
            }
        }
        Command::Compare {
            models,
            temperature,
            prompt,
        } => {
            let client = ChatClient::openrouter(None)?;
            for (model, reply) in client.compare_models(&prompt, &models, temperature).await {
                println!("=== {model} ===\n{reply}\n");
            }
        }
    }

    Ok(())
}

fn check(json: bool) -> anyhow::Result<()> {
    let statuses = check_configuration();

    if json {
        let report: serde_json::Map<String, serde_json::Value> = statuses
            .iter()
            .map(|(kind, status)| Ok::<_, serde_json::Error>((kind.to_string(), serde_json::to_value(status)?)))
            .collect::<serde_json::Result<_>>()?;
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    for (kind, status) in &statuses {
        match status {
            generic_agent::ProviderStatus::Configured { model, base_url } => {
                println!("✓ {}: {model} at {base_url}", kind.display_name());
            }
            generic_agent::ProviderStatus::Error { error } => {
                println!("✗ {}: {error}", kind.display_name());
            }
        }
    }

    if !statuses.iter().any(|(_, s)| s.is_configured()) {
        bail!("no provider is configured");
    }
    Ok(())
}

fn presets() {
    for preset in PRESETS {
        let tools = if preset.tools.is_empty() {
            "none".to_string()
        } else {
            preset.tools.join(", ")
        };
        println!("{} ({}, {})", preset.id, preset.name, preset.provider);
        println!("  {}", preset.instructions);
        println!("  tools: {tools}");
    }
}

fn models() {
    println!("Free:");
    for model in FREE_MODELS {
        println!("  {:<24} {}", model.alias, model.id);
    }
    println!("Paid:");
    for model in PAID_MODELS {
        println!("  {:<24} {}", model.alias, model.id);
    }
}

const fn run_options(max_turns: Option<usize>) -> RunOptions {
    RunOptions { max_turns, model: None }
}

fn print_result(result: &RunResult) {
    println!("{}", result.final_output);
    tracing::info!(turns = result.turns, model = %result.model, "Run finished");
    if let Some(usage) = result.usage {
        tracing::info!(
            prompt = usage.prompt_tokens,
            completion = usage.completion_tokens,
            total = usage.total_tokens,
            "Token usage"
        );
    }
}

async fn stream_answer(client: &ChatClient, message: &str, options: &ChatOptions) -> anyhow::Result<()> {
    let mut stream = client.stream_response(message, options).await?;
    let mut stdout = std::io::stdout();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        write!(stdout, "{}", chunk.delta)?;
        stdout.flush()?;
        if chunk.done {
            break;
        }
    }
    writeln!(stdout, "\n")?;
    Ok(())
}
