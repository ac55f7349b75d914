//! Error Types

use thiserror::Error;

/// Result type alias for agent operations
pub type Result<T> = std::result::Result<T, AgentError>;

/// Agent error types
#[derive(Error, Debug)]
pub enum AgentError {
    /// LLM provider error
    #[error("Provider error: {0}")]
    Provider(String),

    /// Provider unavailable or not responding
    #[error("Provider unavailable: {0}")]
    ProviderUnavailable(String),

    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    #[error("Tool validation error: {0}")]
    ToolValidation(String),

    #[error("Tool execution error: {0}")]
    ToolExecution(String),

    /// Maximum model turns reached in the run loop
    #[error("Maximum turns ({0}) reached")]
    MaxTurns(usize),

    /// A tool call did not finish in time
    #[error("Tool '{0}' timed out")]
    Timeout(String),

    /// Parse error (e.g., malformed provider payload)
    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Rate limited: {0}")]
    RateLimited(String),

    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_names_tool() {
        assert_eq!(AgentError::ToolNotFound("get_weather".into()).to_string(), "Tool not found: get_weather");
        assert_eq!(AgentError::MaxTurns(10).to_string(), "Maximum turns (10) reached");
    }

    #[test]
    fn test_json_error_converts() {
        let err: AgentError = serde_json::from_str::<serde_json::Value>("{").unwrap_err().into();
        assert!(matches!(err, AgentError::Json(_)));
    }
}
