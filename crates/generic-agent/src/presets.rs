//! Agent Presets
//!
//! Named agent configurations bundled with the crate, plus a configuration
//! check reporting which providers have credentials available.

use serde::Serialize;

use crate::agent::{AgentSpec, GenericAgent};
use crate::error::{GenericAgentError, Result};
use crate::provider::{ProviderConfig, ProviderKind, ProviderOverrides};
use crate::tools::{CALCULATE, GET_TIME, GET_WEATHER, builtin_tool};

/// A bundled agent configuration
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Preset {
    pub id: &'static str,
    pub name: &'static str,
    pub instructions: &'static str,
    pub provider: ProviderKind,
    /// Names of bundled tools; unknown names are skipped
    pub tools: &'static [&'static str],
}

pub const PRESETS: &[Preset] = &[
    Preset {
        id: "weather",
        name: "Meteorologist",
        instructions: "You are an expert meteorologist who answers in Spanish.",
        provider: ProviderKind::OpenRouter,
        tools: &[GET_WEATHER, GET_TIME],
    },
    Preset {
        id: "math",
        name: "Mathematician",
        instructions: "You are a mathematics expert who solves problems step by step.",
        provider: ProviderKind::OpenAi,
        tools: &[CALCULATE],
    },
    Preset {
        id: "general",
        name: "GeneralAssistant",
        instructions: "You are a friendly and helpful assistant who answers in Spanish.",
        provider: ProviderKind::OpenRouter,
        tools: &[],
    },
];

impl Preset {
    pub fn get(id: &str) -> Result<&'static Self> {
        PRESETS
            .iter()
            .find(|p| p.id == id)
            .ok_or_else(|| GenericAgentError::PresetNotFound(id.to_string()))
    }

    pub const fn all() -> &'static [Self] {
        PRESETS
    }

    /// Combine the preset with resolved provider settings
    pub fn to_spec(&self, config: &ProviderConfig) -> AgentSpec {
        let tools = self.tools.iter().filter_map(|name| {
            let tool = builtin_tool(name);
            if tool.is_none() {
                tracing::warn!(preset = self.id, tool = name, "Skipping unknown tool");
            }
            tool
        });

        AgentSpec::new(self.name)
            .instructions(self.instructions)
            .provider(config.kind)
            .model_name(config.model_name.clone())
            .api_key(config.api_key.clone())
            .base_url(config.base_url.clone())
            .tools(tools)
    }
}

/// Build a ready-to-run agent from a preset, reading credentials from the environment
pub fn create_agent_from_preset(id: &str) -> Result<GenericAgent> {
    let preset = Preset::get(id)?;
    let config = ProviderConfig::from_env(preset.provider, &ProviderOverrides::default())?;
    GenericAgent::new(preset.to_spec(&config))
}

/// Configuration state of one provider
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ProviderStatus {
    Configured { model: String, base_url: String },
    Error { error: String },
}

impl ProviderStatus {
    pub const fn is_configured(&self) -> bool {
        matches!(self, Self::Configured { .. })
    }
}

/// Check every built-in provider against the process environment
pub fn check_configuration() -> Vec<(ProviderKind, ProviderStatus)> {
    check_configuration_with(|key| std::env::var(key).ok())
}

/// Check every built-in provider using `env` for variable lookups
pub fn check_configuration_with<F>(env: F) -> Vec<(ProviderKind, ProviderStatus)>
where
    F: Fn(&str) -> Option<String>,
{
    ProviderKind::BUILTIN
        .into_iter()
        .map(|kind| {
            let status = match ProviderConfig::resolve(kind, &ProviderOverrides::default(), &env) {
                Ok(config) => ProviderStatus::Configured {
                    model: config.model_name,
                    base_url: config.base_url,
                },
                Err(e) => ProviderStatus::Error { error: e.to_string() },
            };
            (kind, status)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn openai_config() -> ProviderConfig {
        let overrides = ProviderOverrides {
            api_key: Some("sk-test".into()),
            ..ProviderOverrides::default()
        };
        ProviderConfig::resolve(ProviderKind::OpenAi, &overrides, |_| None).unwrap()
    }

    #[test]
    fn test_get_preset() {
        let preset = Preset::get("math").unwrap();
        assert_eq!(preset.name, "Mathematician");
        assert_eq!(preset.provider, ProviderKind::OpenAi);
        assert_eq!(preset.tools, &["calculate"]);
        assert_eq!(Preset::all().len(), 3);
    }

    #[test]
    fn test_unknown_preset() {
        let err = Preset::get("poet").unwrap_err();
        assert!(matches!(err, GenericAgentError::PresetNotFound(id) if id == "poet"));
    }

    #[test]
    fn test_to_spec_copies_provider_settings() {
        let spec = Preset::get("math").unwrap().to_spec(&openai_config());
        assert_eq!(spec.name, "Mathematician");
        assert_eq!(spec.provider, ProviderKind::OpenAi);
        assert_eq!(spec.model_name.as_deref(), Some("gpt-4o-mini"));
        assert_eq!(spec.api_key.as_deref(), Some("sk-test"));
        assert_eq!(spec.base_url.as_deref(), Some("https://api.openai.com/v1"));
        assert_eq!(spec.tools.len(), 1);
    }

    #[test]
    fn test_unknown_tool_names_are_skipped() {
        let preset = Preset {
            id: "odd",
            name: "Odd",
            instructions: "",
            provider: ProviderKind::OpenAi,
            tools: &["calculate", "teleport"],
        };
        assert_eq!(preset.to_spec(&openai_config()).tools.len(), 1);
    }

    #[test]
    fn test_check_configuration() {
        let statuses = check_configuration_with(|key| (key == "OPENAI_API_KEY").then(|| "sk-test".to_string()));

        assert_eq!(statuses.len(), 2);
        let (kind, openrouter) = &statuses[0];
        assert_eq!(*kind, ProviderKind::OpenRouter);
        assert!(matches!(openrouter, ProviderStatus::Error { error } if error.contains("OPEN_ROUTER_API_KEY")));

        let (kind, openai) = &statuses[1];
        assert_eq!(*kind, ProviderKind::OpenAi);
        assert_eq!(
            openai,
            &ProviderStatus::Configured {
                model: "gpt-4o-mini".into(),
                base_url: "https://api.openai.com/v1".into(),
            }
        );
    }
}
