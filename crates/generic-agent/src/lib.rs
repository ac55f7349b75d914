//! # generic-agent
//!
//! Configurable agent wrapper on top of `agent-core`.
//!
//! An agent is described by a name, instructions, a tool list and a model
//! provider (OpenRouter, OpenAI or a custom OpenAI-compatible endpoint).
//! Credentials come from explicit overrides first and the environment second.
//!
//! ```no_run
//! # async fn demo() -> generic_agent::Result<()> {
//! use generic_agent::{AgentSpec, GenericAgent, tools::get_weather};
//!
//! let agent = GenericAgent::new(
//!     AgentSpec::new("WeatherAgent")
//!         .instructions("You are a weather expert.")
//!         .tool(get_weather()),
//! )?;
//! let result = agent.run("What's the weather in Madrid?").await?;
//! println!("{}", result.final_output);
//! # Ok(())
//! # }
//! ```

pub mod agent;
pub mod catalog;
pub mod chat;
pub mod error;
pub mod presets;
pub mod provider;
pub mod tools;

pub use agent::{AgentInfo, AgentSpec, DEFAULT_AGENT_NAME, GenericAgent, create_agent};
pub use catalog::{DEFAULT_CHAT_MODEL, ModelEntry, ModelTier, resolve_model};
pub use chat::{ChatClient, ChatOptions};
pub use error::{GenericAgentError, Result};
pub use presets::{Preset, ProviderStatus, check_configuration, create_agent_from_preset};
pub use provider::{ProviderConfig, ProviderKind, ProviderOverrides};
