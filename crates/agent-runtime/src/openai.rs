//! OpenAI-compatible LLM Provider
//!
//! Implementation of `LlmProvider` for any endpoint speaking the OpenAI
//! chat-completions protocol (OpenAI itself, OpenRouter, self-hosted gateways).

use std::collections::HashMap;
use std::time::Duration;

use agent_core::{
    error::{AgentError, Result},
    message::{Message, Role},
    provider::{
        Completion, CompletionStream, FinishReason, GenerationOptions, LlmProvider, ModelInfo,
        ProviderInfo, StreamChunk, TokenUsage,
    },
    tool::{ToolCall, ToolSchema},
};
use async_trait::async_trait;
use futures::StreamExt;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use reqwest_eventsource::{Event, EventSource, retry::Never};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Environment variable overriding the HTTP timeout
pub const TIMEOUT_ENV: &str = "AGENT_HTTP_TIMEOUT_SECS";

const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// OpenAI-compatible provider configuration
#[derive(Clone)]
pub struct OpenAiConfig {
    /// Display name (e.g., "OpenRouter")
    pub name: String,

    /// API root, e.g. `https://api.openai.com/v1`
    pub base_url: String,

    pub api_key: String,

    /// Model used when a request leaves `GenerationOptions::model` empty
    pub default_model: String,

    /// Timeout in seconds for whole non-streaming requests and for
    /// establishing a connection
    pub timeout_secs: u64,
}

impl std::fmt::Debug for OpenAiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiConfig")
            .field("name", &self.name)
            .field("base_url", &self.base_url)
            .field("api_key", &mask_key(&self.api_key))
            .field("default_model", &self.default_model)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl OpenAiConfig {
    pub fn new(
        name: impl Into<String>,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        default_model: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            base_url: base_url.into(),
            api_key: api_key.into(),
            default_model: default_model.into(),
            timeout_secs: timeout_from_env(),
        }
    }

    /// Build a full URL from the base URL and an API path
    fn url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

fn timeout_from_env() -> u64 {
    std::env::var(TIMEOUT_ENV)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(DEFAULT_TIMEOUT_SECS)
}

/// First characters of a key, safe to log
pub fn mask_key(key: &str) -> String {
    let prefix: String = key.chars().take(8).collect();
    format!("{prefix}...")
}

/// OpenAI-compatible LLM provider
pub struct OpenAiCompatibleProvider {
    client: Client,
    config: OpenAiConfig,
}

impl OpenAiCompatibleProvider {
    pub fn new(config: OpenAiConfig) -> Result<Self> {
        // Total timeouts are set per request so long streams are not cut off
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AgentError::Config(format!("Failed to build HTTP client: {e}")))?;

        tracing::debug!(
            provider = %config.name,
            base_url = %config.base_url,
            api_key = %mask_key(&config.api_key),
            "Initialized OpenAI-compatible provider"
        );

        Ok(Self { client, config })
    }

    pub const fn config(&self) -> &OpenAiConfig {
        &self.config
    }

    fn model_for<'a>(&'a self, options: &'a GenerationOptions) -> &'a str {
        if options.model.is_empty() {
            &self.config.default_model
        } else {
            &options.model
        }
    }

    /// Convert agent messages to the chat-completions wire format
    fn convert_messages(messages: &[Message]) -> Vec<WireMessage> {
        messages
            .iter()
            .map(|m| {
                let role = match m.role {
                    Role::System => "system",
                    Role::User => "user",
                    Role::Assistant => "assistant",
                    Role::Tool => "tool",
                };

                let tool_calls: Vec<WireToolCall> = m
                    .tool_calls
                    .iter()
                    .map(|call| WireToolCall {
                        id: call.id.clone().unwrap_or_default(),
                        kind: "function",
                        function: WireFunctionCall {
                            name: call.name.clone(),
                            arguments: call.arguments_json(),
                        },
                    })
                    .collect();

                // Assistant turns that only call tools carry a null content
                let content = if m.content.is_empty() && !tool_calls.is_empty() {
                    None
                } else {
                    Some(m.content.clone())
                };

                WireMessage {
                    role,
                    content,
                    name: if m.role == Role::Tool { None } else { m.name.clone() },
                    tool_call_id: m.tool_call_id().map(str::to_string),
                    tool_calls,
                }
            })
            .collect()
    }

    fn convert_tools(tools: &[ToolSchema]) -> Vec<WireTool> {
        tools
            .iter()
            .map(|schema| WireTool {
                kind: "function",
                function: WireFunctionDef {
                    name: schema.name.clone(),
                    description: schema.description.clone(),
                    parameters: schema.to_json_schema(),
                },
            })
            .collect()
    }

    fn build_request(&self, messages: &[Message], options: &GenerationOptions, stream: bool) -> ChatRequest {
        ChatRequest {
            model: self.model_for(options).to_string(),
            messages: Self::convert_messages(messages),
            temperature: options.temperature,
            max_tokens: options.max_tokens,
            top_p: options.top_p,
            stop: options.stop_sequences.clone(),
            tools: Self::convert_tools(&options.tools),
            stream,
            stream_options: stream.then_some(StreamOptions { include_usage: true }),
        }
    }

    /// Convert a chat-completions response to an agent completion
    fn convert_completion(response: ChatResponse, requested_model: &str) -> Result<Completion> {
        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| AgentError::Parse("response contained no choices".into()))?;

        let tool_calls = choice
            .message
            .tool_calls
            .into_iter()
            .map(|call| {
                Ok(ToolCall {
                    name: call.function.name,
                    arguments: parse_arguments(&call.function.arguments)?,
                    id: call.id,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let finish_reason = choice.finish_reason.as_deref().map(FinishReason::from_api);

        Ok(Completion {
            content: choice.message.content.unwrap_or_default(),
            model: response.model.unwrap_or_else(|| requested_model.to_string()),
            usage: response.usage.map(Into::into),
            truncated: finish_reason == Some(FinishReason::Length),
            finish_reason,
            tool_calls,
        })
    }

    /// Authorized POST; only non-streaming requests get a total timeout
    fn post_request(&self, path: &str, body: &ChatRequest) -> RequestBuilder {
        let builder = self
            .client
            .post(self.config.url(path))
            .bearer_auth(&self.config.api_key)
            .json(body);

        if body.stream {
            builder
        } else {
            builder.timeout(Duration::from_secs(self.config.timeout_secs))
        }
    }

    async fn post_json(&self, path: &str, body: &ChatRequest) -> Result<Response> {
        let response = self
            .post_request(path, body)
            .send()
            .await
            .map_err(map_transport_error)?;

        check_status(response).await
    }
}

/// Decode the JSON-encoded `arguments` string of a function call
fn parse_arguments(raw: &str) -> Result<HashMap<String, Value>> {
    if raw.trim().is_empty() {
        return Ok(HashMap::new());
    }
    serde_json::from_str(raw).map_err(|e| AgentError::Parse(format!("invalid tool arguments: {e}")))
}

fn map_transport_error(err: reqwest::Error) -> AgentError {
    if err.is_timeout() || err.is_connect() {
        AgentError::ProviderUnavailable(err.to_string())
    } else {
        AgentError::Provider(err.to_string())
    }
}

fn map_status(status: StatusCode, body: &str) -> AgentError {
    let detail = format!("HTTP {}: {}", status.as_u16(), body.trim());
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => AgentError::Auth(detail),
        StatusCode::TOO_MANY_REQUESTS => AgentError::RateLimited(detail),
        s if s.is_server_error() => AgentError::ProviderUnavailable(detail),
        _ => AgentError::Provider(detail),
    }
}

async fn check_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(map_status(status, &body))
}

#[async_trait]
impl LlmProvider for OpenAiCompatibleProvider {
    async fn info(&self) -> Result<ProviderInfo> {
        Ok(ProviderInfo {
            name: self.config.name.clone(),
            base_url: Some(self.config.base_url.clone()),
            default_model: self.config.default_model.clone(),
            supports_streaming: true,
            supports_tools: true,
        })
    }

    async fn health_check(&self) -> Result<bool> {
        match self.list_models().await {
            Ok(_) => Ok(true),
            Err(e) => {
                tracing::warn!(provider = %self.config.name, "Health check failed: {}", e);
                Ok(false)
            }
        }
    }

    async fn complete(&self, messages: &[Message], options: &GenerationOptions) -> Result<Completion> {
        let request = self.build_request(messages, options, false);

        tracing::debug!(
            provider = %self.config.name,
            model = %request.model,
            messages = request.messages.len(),
            tools = request.tools.len(),
            "Sending chat completion request"
        );

        let response: ChatResponse = self
            .post_json("chat/completions", &request)
            .await?
            .json()
            .await
            .map_err(|e| AgentError::Parse(e.to_string()))?;

        Self::convert_completion(response, &request.model)
    }

    async fn complete_stream(
        &self,
        messages: &[Message],
        options: &GenerationOptions,
    ) -> Result<CompletionStream> {
        let request = self.build_request(messages, options, true);

        tracing::debug!(provider = %self.config.name, model = %request.model, "Opening completion stream");

        let mut source = EventSource::new(self.post_request("chat/completions", &request))
            .map_err(|e| AgentError::Config(format!("Failed to open event stream: {e}")))?;
        source.set_retry_policy(Box::new(Never));

        let stream = futures::stream::unfold(Some(source), |state| async move {
            let mut source = state?;
            loop {
                let item = match source.next().await? {
                    Ok(Event::Open) => continue,
                    Ok(Event::Message(message)) => match decode_event(&message.data) {
                        Some(item) => item,
                        None => continue,
                    },
                    Err(reqwest_eventsource::Error::StreamEnded) => return None,
                    Err(e) => Err(map_stream_error(e).await),
                };

                // Stop after [DONE] or the first error
                if matches!(&item, Ok(chunk) if !chunk.done) {
                    return Some((item, Some(source)));
                }
                source.close();
                return Some((item, None));
            }
        });

        Ok(Box::pin(stream))
    }

    async fn list_models(&self) -> Result<Vec<ModelInfo>> {
        let response = self
            .client
            .get(self.config.url("models"))
            .bearer_auth(&self.config.api_key)
            .timeout(Duration::from_secs(self.config.timeout_secs))
            .send()
            .await
            .map_err(map_transport_error)?;

        let list: ModelList = check_status(response)
            .await?
            .json()
            .await
            .map_err(|e| AgentError::Parse(e.to_string()))?;

        Ok(list
            .data
            .into_iter()
            .map(|m| ModelInfo {
                name: m.name.unwrap_or_else(|| m.id.clone()),
                id: m.id,
                context_length: m.context_length,
            })
            .collect())
    }
}

async fn map_stream_error(err: reqwest_eventsource::Error) -> AgentError {
    match err {
        reqwest_eventsource::Error::Transport(e) => map_transport_error(e),
        reqwest_eventsource::Error::InvalidStatusCode(status, response) => {
            let body = response.text().await.unwrap_or_default();
            map_status(status, &body)
        }
        other => AgentError::Provider(format!("event stream failed: {other}")),
    }
}

/// Decode the `data` payload of one server-sent event.
///
/// Returns `None` for events without content to report.
fn decode_event(data: &str) -> Option<Result<StreamChunk>> {
    let data = data.trim();
    if data.is_empty() {
        return None;
    }

    if data == "[DONE]" {
        return Some(Ok(StreamChunk {
            delta: String::new(),
            done: true,
            usage: None,
        }));
    }

    let chunk: ChatChunk = match serde_json::from_str(data) {
        Ok(chunk) => chunk,
        Err(e) => return Some(Err(AgentError::Parse(format!("bad stream chunk: {e}")))),
    };

    if let Some(error) = chunk.error {
        return Some(Err(error.into()));
    }

    let delta = chunk
        .choices
        .into_iter()
        .filter_map(|c| c.delta.content)
        .collect::<String>();

    Some(Ok(StreamChunk {
        delta,
        done: false,
        usage: chunk.usage.map(Into::into),
    }))
}

// ============================================================================
// Wire Types
// ============================================================================

#[derive(Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<WireMessage>,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f32>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    stop: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<WireTool>,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    stream_options: Option<StreamOptions>,
}

#[derive(Serialize)]
struct StreamOptions {
    include_usage: bool,
}

#[derive(Serialize)]
struct WireMessage {
    role: &'static str,
    content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tool_calls: Vec<WireToolCall>,
}

#[derive(Serialize)]
struct WireToolCall {
    id: String,
    #[serde(rename = "type")]
    kind: &'static str,
    function: WireFunctionCall,
}

#[derive(Serialize)]
struct WireFunctionCall {
    name: String,
    arguments: String,
}

#[derive(Serialize)]
struct WireTool {
    #[serde(rename = "type")]
    kind: &'static str,
    function: WireFunctionDef,
}

#[derive(Serialize)]
struct WireFunctionDef {
    name: String,
    description: String,
    parameters: Value,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    model: Option<String>,
    choices: Vec<ChatChoice>,
    #[serde(default)]
    usage: Option<WireUsage>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ResponseMessage,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Vec<ResponseToolCall>,
}

#[derive(Deserialize)]
struct ResponseToolCall {
    #[serde(default)]
    id: Option<String>,
    function: ResponseFunction,
}

#[derive(Deserialize)]
struct ResponseFunction {
    name: String,
    #[serde(default)]
    arguments: String,
}

#[derive(Deserialize)]
struct WireUsage {
    #[serde(default)]
    prompt_tokens: u32,
    #[serde(default)]
    completion_tokens: u32,
    #[serde(default)]
    total_tokens: u32,
}

impl From<WireUsage> for TokenUsage {
    fn from(u: WireUsage) -> Self {
        Self {
            prompt_tokens: u.prompt_tokens,
            completion_tokens: u.completion_tokens,
            total_tokens: u.total_tokens,
        }
    }
}

#[derive(Deserialize)]
struct ChatChunk {
    #[serde(default)]
    choices: Vec<ChunkChoice>,
    #[serde(default)]
    usage: Option<WireUsage>,
    #[serde(default)]
    error: Option<WireError>,
}

/// Error object sent in place of a chunk, e.g. by OpenRouter mid-stream
#[derive(Deserialize)]
struct WireError {
    message: String,
    /// HTTP-style status code; some gateways send it as a string
    #[serde(default)]
    code: Option<Value>,
}

impl From<WireError> for AgentError {
    fn from(error: WireError) -> Self {
        let status = error
            .code
            .as_ref()
            .and_then(|code| code.as_u64().or_else(|| code.as_str()?.parse().ok()))
            .and_then(|code| u16::try_from(code).ok())
            .and_then(|code| StatusCode::from_u16(code).ok());

        match status {
            Some(status) => map_status(status, &error.message),
            None => Self::Provider(error.message),
        }
    }
}

#[derive(Deserialize)]
struct ChunkChoice {
    delta: ChunkDelta,
}

#[derive(Deserialize)]
struct ChunkDelta {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct ModelList {
    data: Vec<WireModel>,
}

#[derive(Deserialize)]
struct WireModel {
    id: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    context_length: Option<u32>,
}
