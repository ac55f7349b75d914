//! Generic Agent
//!
//! A reusable agent that can be instantiated anywhere: pick a provider by key,
//! give it a name, instructions and tools, then `run` messages through it.

use std::fmt;
use std::sync::Arc;

use agent_core::{Agent, LlmProvider, RunOptions, RunResult, Tool, ToolRegistry};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::provider::{ProviderConfig, ProviderKind, ProviderOverrides};

pub const DEFAULT_AGENT_NAME: &str = "GenericAgent";

/// Configuration record for a [`GenericAgent`]
#[derive(Clone)]
pub struct AgentSpec {
    pub name: String,
    pub instructions: String,
    pub tools: Vec<Arc<dyn Tool>>,
    pub provider: ProviderKind,
    pub model_name: Option<String>,
    pub api_key: Option<String>,
    pub base_url: Option<String>,
}

impl Default for AgentSpec {
    fn default() -> Self {
        Self {
            name: DEFAULT_AGENT_NAME.into(),
            instructions: agent_core::reasoning::DEFAULT_INSTRUCTIONS.into(),
            tools: Vec::new(),
            provider: ProviderKind::default(),
            model_name: None,
            api_key: None,
            base_url: None,
        }
    }
}

impl fmt::Debug for AgentSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AgentSpec")
            .field("name", &self.name)
            .field("tools", &self.tools.iter().map(|t| t.schema().name).collect::<Vec<_>>())
            .field("provider", &self.provider)
            .field("model_name", &self.model_name)
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl AgentSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn instructions(mut self, instructions: impl Into<String>) -> Self {
        self.instructions = instructions.into();
        self
    }

    #[must_use]
    pub fn tool<T: Tool + 'static>(mut self, tool: T) -> Self {
        self.tools.push(Arc::new(tool));
        self
    }

    #[must_use]
    pub fn tools(mut self, tools: impl IntoIterator<Item = Arc<dyn Tool>>) -> Self {
        self.tools.extend(tools);
        self
    }

    #[must_use]
    pub const fn provider(mut self, provider: ProviderKind) -> Self {
        self.provider = provider;
        self
    }

    #[must_use]
    pub fn model_name(mut self, model: impl Into<String>) -> Self {
        self.model_name = Some(model.into());
        self
    }

    #[must_use]
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    #[must_use]
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Apply explicit provider values
    #[must_use]
    pub fn with_overrides(mut self, overrides: ProviderOverrides) -> Self {
        self.model_name = overrides.model_name;
        self.api_key = overrides.api_key;
        self.base_url = overrides.base_url;
        self
    }

    pub fn overrides(&self) -> ProviderOverrides {
        ProviderOverrides {
            model_name: self.model_name.clone(),
            api_key: self.api_key.clone(),
            base_url: self.base_url.clone(),
        }
    }
}

/// Snapshot of an agent's configuration
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentInfo {
    pub name: String,
    pub instructions: String,
    pub tools_count: usize,
    pub model_provider: ProviderKind,
    pub model_name: String,
}

/// Configurable agent bound to one provider
pub struct GenericAgent {
    name: String,
    instructions: String,
    tools: Vec<Arc<dyn Tool>>,
    config: ProviderConfig,
    provider: Arc<dyn LlmProvider>,
    agent: Agent,
}

impl GenericAgent {
    /// Resolve the provider from `spec` overrides and the process environment
    pub fn new(spec: AgentSpec) -> Result<Self> {
        let config = ProviderConfig::from_env(spec.provider, &spec.overrides())?;
        let provider = config.build_provider()?;
        Ok(Self::with_provider(spec, config, provider))
    }

    /// Assemble an agent around an already built provider
    pub fn with_provider(spec: AgentSpec, config: ProviderConfig, provider: Arc<dyn LlmProvider>) -> Self {
        let mut tools: Vec<Arc<dyn Tool>> = Vec::with_capacity(spec.tools.len());
        for tool in spec.tools {
            push_tool(&mut tools, tool);
        }

        let agent = build_agent(&spec.name, &spec.instructions, &tools, &config, &provider);
        tracing::info!(
            agent = %spec.name,
            provider = %config.kind,
            model = %config.model_name,
            tools = tools.len(),
            "Agent ready"
        );

        Self {
            name: spec.name,
            instructions: spec.instructions,
            tools,
            config,
            provider,
            agent,
        }
    }

    fn rebuild(&mut self) {
        self.agent = build_agent(&self.name, &self.instructions, &self.tools, &self.config, &self.provider);
    }

    /// Run the agent on a message
    pub async fn run(&self, message: &str) -> Result<RunResult> {
        self.run_with(message, &RunOptions::default()).await
    }

    /// Run the agent with per-run overrides (turn budget, model)
    pub async fn run_with(&self, message: &str, options: &RunOptions) -> Result<RunResult> {
        Ok(self.agent.run_with(message, options).await?)
    }

    /// Add a tool; a tool with the same name is replaced
    pub fn add_tool(&mut self, tool: Arc<dyn Tool>) {
        push_tool(&mut self.tools, tool);
        self.rebuild();
    }

    pub fn update_instructions(&mut self, instructions: impl Into<String>) {
        self.instructions = instructions.into();
        self.rebuild();
    }

    pub fn info(&self) -> AgentInfo {
        AgentInfo {
            name: self.name.clone(),
            instructions: self.instructions.clone(),
            tools_count: self.tools.len(),
            model_provider: self.config.kind,
            model_name: self.config.model_name.clone(),
        }
    }

    pub const fn provider_config(&self) -> &ProviderConfig {
        &self.config
    }

    /// The underlying run-loop agent
    pub const fn agent(&self) -> &Agent {
        &self.agent
    }
}

impl fmt::Debug for GenericAgent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GenericAgent")
            .field("info", &self.info())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

fn push_tool(tools: &mut Vec<Arc<dyn Tool>>, tool: Arc<dyn Tool>) {
    let name = tool.schema().name;
    if let Some(existing) = tools.iter_mut().find(|t| t.schema().name == name) {
        *existing = tool;
    } else {
        tools.push(tool);
    }
}

fn build_agent(
    name: &str,
    instructions: &str,
    tools: &[Arc<dyn Tool>],
    config: &ProviderConfig,
    provider: &Arc<dyn LlmProvider>,
) -> Agent {
    let mut registry = ToolRegistry::new();
    for tool in tools {
        registry.register_arc(Arc::clone(tool));
    }

    let mut agent_config = agent_core::AgentConfig::default();
    agent_config.generation.model.clone_from(&config.model_name);

    Agent::new(name, instructions, Arc::clone(provider), Arc::new(registry), agent_config)
}

/// Convenience constructor taking the provider as a string key.
///
/// Only the model name, API key and base URL can be passed as extras.
pub fn create_agent(
    name: &str,
    instructions: &str,
    tools: Vec<Arc<dyn Tool>>,
    model_provider: &str,
    extras: ProviderOverrides,
) -> Result<GenericAgent> {
    let spec = AgentSpec::new(name)
        .instructions(instructions)
        .tools(tools)
        .provider(model_provider.parse()?)
        .with_overrides(extras);

    GenericAgent::new(spec)
}
