//! Run Loop
//!
//! Implements the ReAct (Reason + Act) pattern for agent behavior.
//! The agent sends the conversation to its provider, executes any tool calls the
//! model asks for, feeds the results back and stops once the model answers
//! without requesting another tool.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{AgentError, Result};
use crate::message::{Conversation, Message, Role};
use crate::provider::{GenerationOptions, LlmProvider, TokenUsage};
use crate::tool::{Tool, ToolCall, ToolRegistry, ToolResult};

/// Instructions used when an agent is built without any
pub const DEFAULT_INSTRUCTIONS: &str = "You are a helpful and friendly assistant.";

/// How tools are offered to the model
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolMode {
    /// Tool schemas go through the provider's function calling API
    #[default]
    Native,
    /// Tool descriptions are appended to the system prompt and the model
    /// answers with a fenced `tool` JSON block
    Prompted,
}

/// Agent configuration
#[derive(Clone, Debug)]
pub struct AgentConfig {
    /// Maximum model turns before giving up
    pub max_turns: usize,

    pub generation: GenerationOptions,

    pub tool_mode: ToolMode,

    /// Upper bound for a single tool execution
    pub tool_timeout: Duration,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_turns: 10,
            generation: GenerationOptions::default(),
            tool_mode: ToolMode::default(),
            tool_timeout: Duration::from_secs(30),
        }
    }
}

/// Per-run overrides
#[derive(Clone, Debug, Default)]
pub struct RunOptions {
    /// Overrides [`AgentConfig::max_turns`]
    pub max_turns: Option<usize>,

    /// Overrides the configured model for this run only
    pub model: Option<String>,
}

/// Outcome of a run
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RunResult {
    /// The model's final answer
    pub final_output: String,

    /// Messages appended during this run (assistant turns, tool results)
    pub new_messages: Vec<Message>,

    /// Number of model turns used
    pub turns: usize,

    /// Model that produced the final answer
    pub model: String,

    /// Token usage summed over all turns, when the provider reports it
    pub usage: Option<TokenUsage>,
}

/// The main Agent struct
pub struct Agent {
    name: String,
    instructions: String,
    provider: Arc<dyn LlmProvider>,
    tools: Arc<ToolRegistry>,
    config: AgentConfig,
}

impl Agent {
    pub fn new(
        name: impl Into<String>,
        instructions: impl Into<String>,
        provider: Arc<dyn LlmProvider>,
        tools: Arc<ToolRegistry>,
        config: AgentConfig,
    ) -> Self {
        Self {
            name: name.into(),
            instructions: instructions.into(),
            provider,
            tools,
            config,
        }
    }

    pub fn builder() -> AgentBuilder {
        AgentBuilder::new()
    }

    /// Build the full system prompt, including tool descriptions in prompted mode
    fn build_system_prompt(&self) -> String {
        let mut prompt = self.instructions.clone();

        if self.config.tool_mode == ToolMode::Prompted && !self.tools.is_empty() {
            prompt.push_str("\n\n");
            prompt.push_str(&self.tools.generate_prompt_section());
        }

        prompt
    }

    /// Run the agent on a single user message
    pub async fn run(&self, input: &str) -> Result<RunResult> {
        self.run_with(input, &RunOptions::default()).await
    }

    /// Run the agent on a single user message with per-run overrides
    pub async fn run_with(&self, input: &str, options: &RunOptions) -> Result<RunResult> {
        let mut conversation = Conversation::with_system_prompt(self.build_system_prompt());
        conversation.push(Message::user(input));
        self.run_conversation(&mut conversation, options).await
    }

    /// Continue an existing conversation until the model gives a final answer
    pub async fn run_conversation(
        &self,
        conversation: &mut Conversation,
        options: &RunOptions,
    ) -> Result<RunResult> {
        if conversation.messages().first().map(|m| &m.role) != Some(&Role::System) {
            conversation
                .messages_mut()
                .insert(0, Message::system(self.build_system_prompt()));
        }

        let start = conversation.len();
        let max_turns = options.max_turns.unwrap_or(self.config.max_turns);

        let mut generation = self.config.generation.clone();
        if let Some(model) = &options.model {
            generation.model.clone_from(model);
        }
        if self.config.tool_mode == ToolMode::Native {
            generation.tools = self.tools.schemas();
        }

        let mut usage: Option<TokenUsage> = None;

        for turn in 1..=max_turns {
            tracing::debug!(agent = %self.name, turn, model = %generation.model, "Requesting completion");

            let completion = self.provider.complete(conversation.messages(), &generation).await?;

            if let Some(turn_usage) = &completion.usage {
                usage.get_or_insert_with(TokenUsage::default).add(turn_usage);
            }

            let calls = if completion.tool_calls.is_empty() {
                parse_tool_call(&completion.content).into_iter().collect()
            } else {
                completion.tool_calls.clone()
            };

            if calls.is_empty() {
                conversation.push(Message::assistant(&completion.content).with_model(&completion.model));
                tracing::info!(agent = %self.name, turns = turn, "Run finished");
                return Ok(RunResult {
                    final_output: completion.content,
                    new_messages: conversation.messages()[start..].to_vec(),
                    turns: turn,
                    model: completion.model,
                    usage,
                });
            }

            conversation.push(
                Message::assistant_with_tool_calls(&completion.content, calls.clone())
                    .with_model(&completion.model),
            );

            for call in &calls {
                tracing::debug!(agent = %self.name, tool = %call.name, "Executing tool");
                let result = self.execute_tool(call).await;
                conversation.push(
                    Message::tool(format_tool_result(&result), call.id.clone()).with_name(&call.name),
                );
            }
        }

        tracing::warn!(agent = %self.name, max_turns, "Run exceeded its turn budget");
        Err(AgentError::MaxTurns(max_turns))
    }

    /// Execute a tool call; failures become a failed [`ToolResult`] for the model
    async fn execute_tool(&self, call: &ToolCall) -> ToolResult {
        let outcome = tokio::time::timeout(self.config.tool_timeout, self.tools.execute(call))
            .await
            .unwrap_or_else(|_| Err(AgentError::Timeout(call.name.clone())));

        match outcome {
            Ok(mut result) => {
                result.id.clone_from(&call.id);
                result
            }
            Err(e) => {
                tracing::warn!(tool = %call.name, error = %e, "Tool call failed");
                ToolResult {
                    name: call.name.clone(),
                    id: call.id.clone(),
                    success: false,
                    output: format!("Error: {e}"),
                }
            }
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn instructions(&self) -> &str {
        &self.instructions
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    pub fn provider(&self) -> &Arc<dyn LlmProvider> {
        &self.provider
    }

    pub const fn config(&self) -> &AgentConfig {
        &self.config
    }
}

/// Format tool result for conversation
fn format_tool_result(result: &ToolResult) -> String {
    if result.success {
        result.output.clone()
    } else {
        format!("[Tool '{}' failed]\n{}", result.name, result.output)
    }
}

/// Parse a fenced ```` ```tool ```` block
fn parse_tool_call(content: &str) -> Option<ToolCall> {
    const TOOL_START: &str = "```tool";
    const TOOL_END: &str = "```";

    let start_idx = content.find(TOOL_START)?;
    let after_marker = &content[start_idx + TOOL_START.len()..];
    let end_idx = after_marker.find(TOOL_END)?;

    let mut call = serde_json::from_str::<ToolCall>(after_marker[..end_idx].trim()).ok()?;
    if call.id.is_none() {
        call.id = Some(uuid::Uuid::new_v4().to_string());
    }
    Some(call)
}

/// Builder for [`Agent`]
pub struct AgentBuilder {
    name: String,
    instructions: String,
    provider: Option<Arc<dyn LlmProvider>>,
    tools: ToolRegistry,
    config: AgentConfig,
}

impl Default for AgentBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl AgentBuilder {
    pub fn new() -> Self {
        Self {
            name: "Agent".into(),
            instructions: DEFAULT_INSTRUCTIONS.into(),
            provider: None,
            tools: ToolRegistry::new(),
            config: AgentConfig::default(),
        }
    }

    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    #[must_use]
    pub fn instructions(mut self, instructions: impl Into<String>) -> Self {
        self.instructions = instructions.into();
        self
    }

    #[must_use]
    pub fn provider(mut self, provider: Arc<dyn LlmProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    #[must_use]
    pub fn tool<T: Tool + 'static>(mut self, tool: T) -> Self {
        self.tools.register(tool);
        self
    }

    #[must_use]
    pub fn tools(mut self, tools: ToolRegistry) -> Self {
        self.tools = tools;
        self
    }

    #[must_use]
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.generation.model = model.into();
        self
    }

    #[must_use]
    pub const fn temperature(mut self, temp: f32) -> Self {
        self.config.generation.temperature = temp;
        self
    }

    #[must_use]
    pub const fn max_turns(mut self, max: usize) -> Self {
        self.config.max_turns = max;
        self
    }

    #[must_use]
    pub const fn tool_mode(mut self, mode: ToolMode) -> Self {
        self.config.tool_mode = mode;
        self
    }

    #[must_use]
    pub const fn tool_timeout(mut self, timeout: Duration) -> Self {
        self.config.tool_timeout = timeout;
        self
    }

    pub fn build(self) -> Result<Agent> {
        let provider = self
            .provider
            .ok_or_else(|| AgentError::Config("Provider is required".into()))?;

        Ok(Agent::new(self.name, self.instructions, provider, Arc::new(self.tools), self.config))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::Completion;
    use crate::testing::ScriptedProvider;
    use crate::tool::{FnTool, ParameterSchema};

    fn shout_tool() -> FnTool {
        FnTool::new("shout", "Upper-case the text", |call| Ok(call.str_arg("text")?.to_uppercase()))
            .with_param(ParameterSchema::required_string("text", "Text"))
    }

    fn tool_call_completion(call: ToolCall) -> Completion {
        let mut completion = Completion::text("mock-model", "");
        completion.tool_calls = vec![call];
        completion
    }

    #[test]
    fn test_parse_fenced_tool_call() {
        let content = r#"Let me check that for you.
```tool
{"tool": "calculate", "arguments": {"expression": "2 + 2"}}
```"#;

        let call = parse_tool_call(content).unwrap();
        assert_eq!(call.name, "calculate");
        assert_eq!(call.str_arg("expression").unwrap(), "2 + 2");
        assert!(call.id.is_some());
    }

    #[test]
    fn test_unfenced_json_is_not_a_tool_call() {
        assert!(parse_tool_call(r#"I'll use {"tool": "get_time", "arguments": {}} now"#).is_none());
    }

    #[test]
    fn test_plain_text_is_not_a_tool_call() {
        assert!(parse_tool_call("The answer is 4.").is_none());
    }

    #[test]
    fn test_build_requires_provider() {
        assert!(matches!(AgentBuilder::new().build(), Err(AgentError::Config(_))));
    }

    #[tokio::test]
    async fn test_run_without_tools_returns_answer() {
        let provider = Arc::new(ScriptedProvider::new(vec![Completion::text("mock-model", "Hola!")]));
        let agent = Agent::builder()
            .name("Greeter")
            .instructions("Say hi")
            .provider(provider.clone())
            .build()
            .unwrap();

        let result = agent.run("hi").await.unwrap();
        assert_eq!(result.final_output, "Hola!");
        assert_eq!(result.turns, 1);

        let requests = provider.requests().await;
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].messages[0].content, "Say hi");
        assert_eq!(requests[0].messages[1].content, "hi");
    }

    #[tokio::test]
    async fn test_answer_quoting_json_finishes_in_one_turn() {
        let answer = r#"Your record is {"name": "Ana", "type": "tool"}"#;
        let provider = Arc::new(ScriptedProvider::new(vec![Completion::text("mock-model", answer)]));
        let agent = Agent::builder().provider(provider.clone()).build().unwrap();

        let result = agent.run("show my record").await.unwrap();
        assert_eq!(result.final_output, answer);
        assert_eq!(result.turns, 1);
        assert_eq!(provider.requests().await.len(), 1);
    }

    #[tokio::test]
    async fn test_run_executes_native_tool_call() {
        let provider = Arc::new(ScriptedProvider::new(vec![
            tool_call_completion(ToolCall::new("shout").with_arg("text", "hey").with_id("call_1")),
            Completion::text("mock-model", "It says HEY"),
        ]));
        let agent = Agent::builder()
            .provider(provider.clone())
            .tool(shout_tool())
            .build()
            .unwrap();

        let result = agent.run("shout hey").await.unwrap();
        assert_eq!(result.final_output, "It says HEY");
        assert_eq!(result.turns, 2);

        // assistant(tool call), tool result, final assistant
        assert_eq!(result.new_messages.len(), 3);
        let tool_msg = &result.new_messages[1];
        assert_eq!(tool_msg.role, Role::Tool);
        assert_eq!(tool_msg.content, "HEY");
        assert_eq!(tool_msg.tool_call_id(), Some("call_1"));

        let requests = provider.requests().await;
        assert_eq!(requests[0].options.tools.len(), 1);
        assert_eq!(requests[0].options.tools[0].name, "shout");
    }

    #[tokio::test]
    async fn test_unknown_tool_is_reported_to_model() {
        let provider = Arc::new(ScriptedProvider::new(vec![
            tool_call_completion(ToolCall::new("missing").with_id("c1")),
            Completion::text("mock-model", "Sorry"),
        ]));
        let agent = Agent::builder().provider(provider).build().unwrap();

        let result = agent.run("do it").await.unwrap();
        assert_eq!(result.final_output, "Sorry");
        assert!(result.new_messages[1].content.contains("Tool not found: missing"));
    }

    #[tokio::test]
    async fn test_max_turns_exceeded() {
        let looping = (0..5)
            .map(|i| tool_call_completion(ToolCall::new("shout").with_arg("text", "x").with_id(format!("c{i}"))))
            .collect();
        let agent = Agent::builder()
            .provider(Arc::new(ScriptedProvider::new(looping)))
            .tool(shout_tool())
            .max_turns(3)
            .build()
            .unwrap();

        let err = agent.run("loop").await.unwrap_err();
        assert!(matches!(err, AgentError::MaxTurns(3)));
    }

    #[tokio::test]
    async fn test_run_options_override_model() {
        let provider = Arc::new(ScriptedProvider::new(vec![Completion::text("other", "ok")]));
        let agent = Agent::builder().provider(provider.clone()).model("base-model").build().unwrap();

        let options = RunOptions {
            model: Some("other".into()),
            ..RunOptions::default()
        };
        agent.run_with("hi", &options).await.unwrap();

        assert_eq!(provider.requests().await[0].options.model, "other");
    }

    #[tokio::test]
    async fn test_prompted_mode_describes_tools_in_system_prompt() {
        let provider = Arc::new(ScriptedProvider::new(vec![
            Completion::text("m", "```tool\n{\"tool\": \"shout\", \"arguments\": {\"text\": \"a\"}}\n```"),
            Completion::text("m", "done"),
        ]));
        let agent = Agent::builder()
            .provider(provider.clone())
            .tool(shout_tool())
            .tool_mode(ToolMode::Prompted)
            .build()
            .unwrap();

        let result = agent.run("go").await.unwrap();
        assert_eq!(result.final_output, "done");

        let requests = provider.requests().await;
        assert!(requests[0].options.tools.is_empty());
        assert!(requests[0].messages[0].content.contains("### shout"));
    }
}
