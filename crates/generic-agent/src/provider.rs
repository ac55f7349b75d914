//! Provider Selection
//!
//! Maps a provider key (`openrouter`, `openai`, `custom`) to its endpoint,
//! default model and API key variable, and resolves a complete
//! [`ProviderConfig`] from explicit values, defaults and the environment.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use agent_core::LlmProvider;
use agent_runtime::{OpenAiCompatibleProvider, OpenAiConfig, openai::mask_key};
use serde::{Deserialize, Serialize};

use crate::error::{GenericAgentError, Result};

/// Supported model providers
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    #[default]
    OpenRouter,
    OpenAi,
    /// Any OpenAI-compatible endpoint; nothing is defaulted
    Custom,
}

impl ProviderKind {
    /// Providers that ship with defaults
    pub const BUILTIN: [Self; 2] = [Self::OpenRouter, Self::OpenAi];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::OpenRouter => "openrouter",
            Self::OpenAi => "openai",
            Self::Custom => "custom",
        }
    }

    pub const fn display_name(self) -> &'static str {
        match self {
            Self::OpenRouter => "OpenRouter",
            Self::OpenAi => "OpenAI",
            Self::Custom => "Custom",
        }
    }

    /// Static defaults, `None` for [`ProviderKind::Custom`]
    pub const fn defaults(self) -> Option<ProviderDefaults> {
        match self {
            Self::OpenRouter => Some(ProviderDefaults {
                base_url: "https://openrouter.ai/api/v1",
                model_name: "openai/gpt-4o-mini",
                env_key: "OPEN_ROUTER_API_KEY",
            }),
            Self::OpenAi => Some(ProviderDefaults {
                base_url: "https://api.openai.com/v1",
                model_name: "gpt-4o-mini",
                env_key: "OPENAI_API_KEY",
            }),
            Self::Custom => None,
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = GenericAgentError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "openrouter" => Ok(Self::OpenRouter),
            "openai" => Ok(Self::OpenAi),
            "custom" => Ok(Self::Custom),
            _ => Err(GenericAgentError::UnsupportedProvider(s.to_string())),
        }
    }
}

/// Endpoint, default model and key variable of a built-in provider
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ProviderDefaults {
    pub base_url: &'static str,
    pub model_name: &'static str,
    pub env_key: &'static str,
}

/// Explicit values that take precedence over defaults and environment
#[derive(Clone, Default, PartialEq, Eq)]
pub struct ProviderOverrides {
    pub model_name: Option<String>,
    pub api_key: Option<String>,
    pub base_url: Option<String>,
}

impl fmt::Debug for ProviderOverrides {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderOverrides")
            .field("model_name", &self.model_name)
            .field("api_key", &self.api_key.as_deref().map(mask_key))
            .field("base_url", &self.base_url)
            .finish()
    }
}

/// Fully resolved provider settings
#[derive(Clone, PartialEq, Eq)]
pub struct ProviderConfig {
    pub kind: ProviderKind,
    pub base_url: String,
    pub api_key: String,
    pub model_name: String,
}

impl fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("kind", &self.kind)
            .field("base_url", &self.base_url)
            .field("api_key", &mask_key(&self.api_key))
            .field("model_name", &self.model_name)
            .finish()
    }
}

/// Treat empty strings like missing values
fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

impl ProviderConfig {
    /// Resolve settings, reading the API key through `env` when not given.
    pub fn resolve<F>(kind: ProviderKind, overrides: &ProviderOverrides, env: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let model_name = non_empty(overrides.model_name.clone());
        let api_key = non_empty(overrides.api_key.clone());
        let base_url = non_empty(overrides.base_url.clone());

        let Some(defaults) = kind.defaults() else {
            return match (base_url, api_key, model_name) {
                (Some(base_url), Some(api_key), Some(model_name)) => Ok(Self {
                    kind,
                    base_url,
                    api_key,
                    model_name,
                }),
                _ => Err(GenericAgentError::IncompleteCustomProvider),
            };
        };

        let api_key = api_key
            .or_else(|| non_empty(env(defaults.env_key)))
            .ok_or(GenericAgentError::MissingApiKey {
                env_key: defaults.env_key,
            })?;

        Ok(Self {
            kind,
            base_url: base_url.unwrap_or_else(|| defaults.base_url.into()),
            api_key,
            model_name: model_name.unwrap_or_else(|| defaults.model_name.into()),
        })
    }

    /// Resolve against the process environment
    pub fn from_env(kind: ProviderKind, overrides: &ProviderOverrides) -> Result<Self> {
        Self::resolve(kind, overrides, |key| std::env::var(key).ok())
    }

    /// Build the runtime provider for these settings
    pub fn build_provider(&self) -> Result<Arc<dyn LlmProvider>> {
        let config = OpenAiConfig::new(
            self.kind.display_name(),
            self.base_url.clone(),
            self.api_key.clone(),
            self.model_name.clone(),
        );
        tracing::info!(
            provider = %self.kind,
            base_url = %self.base_url,
            model = %self.model_name,
            api_key = %mask_key(&self.api_key),
            "Configured model provider"
        );
        Ok(Arc::new(OpenAiCompatibleProvider::new(config)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env_with(pairs: &'static [(&'static str, &'static str)]) -> impl Fn(&str) -> Option<String> {
        move |key: &str| pairs.iter().find(|(k, _)| *k == key).map(|(_, v)| (*v).to_string())
    }

    #[test]
    fn test_parse_provider_kind() {
        assert_eq!("openrouter".parse::<ProviderKind>().unwrap(), ProviderKind::OpenRouter);
        assert_eq!(" OpenAI ".parse::<ProviderKind>().unwrap(), ProviderKind::OpenAi);
        assert_eq!("custom".parse::<ProviderKind>().unwrap(), ProviderKind::Custom);
    }

    #[test]
    fn test_unsupported_provider() {
        let err = "anthropic".parse::<ProviderKind>().unwrap_err();
        assert!(matches!(err, GenericAgentError::UnsupportedProvider(p) if p == "anthropic"));
    }

    #[test]
    fn test_openrouter_defaults_with_env_key() {
        let config = ProviderConfig::resolve(
            ProviderKind::OpenRouter,
            &ProviderOverrides::default(),
            env_with(&[("OPEN_ROUTER_API_KEY", "sk-or-123")]),
        )
        .unwrap();

        assert_eq!(config.base_url, "https://openrouter.ai/api/v1");
        assert_eq!(config.model_name, "openai/gpt-4o-mini");
        assert_eq!(config.api_key, "sk-or-123");
    }

    #[test]
    fn test_explicit_values_win() {
        let overrides = ProviderOverrides {
            model_name: Some("gpt-4.1".into()),
            api_key: Some("sk-explicit".into()),
            base_url: None,
        };
        let config = ProviderConfig::resolve(
            ProviderKind::OpenAi,
            &overrides,
            env_with(&[("OPENAI_API_KEY", "sk-env")]),
        )
        .unwrap();

        assert_eq!(config.api_key, "sk-explicit");
        assert_eq!(config.model_name, "gpt-4.1");
        assert_eq!(config.base_url, "https://api.openai.com/v1");
    }

    #[test]
    fn test_missing_key_names_env_var() {
        let err = ProviderConfig::resolve(ProviderKind::OpenAi, &ProviderOverrides::default(), |_| None)
            .unwrap_err();
        assert!(matches!(err, GenericAgentError::MissingApiKey { env_key: "OPENAI_API_KEY" }));
        assert!(err.to_string().contains("OPENAI_API_KEY"));
    }

    #[test]
    fn test_empty_env_key_counts_as_missing() {
        let err = ProviderConfig::resolve(
            ProviderKind::OpenRouter,
            &ProviderOverrides::default(),
            env_with(&[("OPEN_ROUTER_API_KEY", "")]),
        )
        .unwrap_err();
        assert!(matches!(err, GenericAgentError::MissingApiKey { .. }));
    }

    #[test]
    fn test_custom_requires_all_fields() {
        let partial = ProviderOverrides {
            base_url: Some("http://localhost:8080/v1".into()),
            api_key: Some("local".into()),
            model_name: None,
        };
        let err = ProviderConfig::resolve(ProviderKind::Custom, &partial, |_| Some("ignored".into()))
            .unwrap_err();
        assert!(matches!(err, GenericAgentError::IncompleteCustomProvider));

        let full = ProviderOverrides {
            model_name: Some("llama3".into()),
            ..partial
        };
        let config = ProviderConfig::resolve(ProviderKind::Custom, &full, |_| None).unwrap();
        assert_eq!(config.base_url, "http://localhost:8080/v1");
        assert_eq!(config.model_name, "llama3");
    }

    #[test]
    fn test_debug_masks_key() {
        let config = ProviderConfig::resolve(
            ProviderKind::OpenAi,
            &ProviderOverrides {
                api_key: Some("sk-supersecret".into()),
                ..ProviderOverrides::default()
            },
            |_| None,
        )
        .unwrap();
        assert!(!format!("{config:?}").contains("supersecret"));
    }
}
