//! Error Types for the Generic Agent

use agent_core::AgentError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, GenericAgentError>;

#[derive(Error, Debug)]
pub enum GenericAgentError {
    #[error("Unsupported model provider: {0}")]
    UnsupportedProvider(String),

    #[error("{env_key} is not set; pass an API key explicitly or export {env_key}")]
    MissingApiKey { env_key: &'static str },

    #[error("A custom provider needs base_url, api_key and model_name")]
    IncompleteCustomProvider,

    #[error("Preset not found: {0}")]
    PresetNotFound(String),

    #[error(transparent)]
    Agent(#[from] AgentError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
