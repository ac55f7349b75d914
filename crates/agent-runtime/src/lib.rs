//! # agent-runtime
//!
//! Runtime providers for the generic agent.
//!
//! ## Providers
//!
//! - **OpenAI-compatible** (default): any chat-completions endpoint, covering
//!   OpenAI, OpenRouter and self-hosted gateways
//!
//! ## Usage
//!
//! ```rust,ignore
//! use agent_runtime::{OpenAiCompatibleProvider, OpenAiConfig};
//!
//! let config = OpenAiConfig::new("OpenAI", "https://api.openai.com/v1", api_key, "gpt-4o-mini");
//! let agent = Agent::builder()
//!     .provider(Arc::new(OpenAiCompatibleProvider::new(config)?))
//!     .build()?;
//! ```

#[cfg(feature = "openai")]
pub mod openai;

#[cfg(feature = "openai")]
pub use openai::{OpenAiCompatibleProvider, OpenAiConfig};

// Re-export core types for convenience
pub use agent_core::{
    Agent, AgentError, LlmProvider, Message, Result, Role, RunResult, Tool, ToolRegistry,
};
