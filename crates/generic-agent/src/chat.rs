//! Chat Client
//!
//! Conversational access to an OpenAI-compatible provider without tools:
//! multi-turn chat with history, one-off questions, streaming, side-by-side
//! model comparison and conversation export/import.

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;
use std::sync::Arc;

use agent_core::provider::CompletionStream;
use agent_core::{GenerationOptions, LlmProvider, Message};
use agent_runtime::openai::mask_key;

use crate::catalog::{DEFAULT_CHAT_MODEL, resolve_model};
use crate::error::Result;
use crate::provider::{ProviderConfig, ProviderKind, ProviderOverrides};

/// Sampling settings for a chat request
#[derive(Clone, Debug)]
pub struct ChatOptions {
    /// Friendly alias or full model id
    pub model: String,
    pub temperature: f32,
    pub max_tokens: Option<u32>,
}

impl Default for ChatOptions {
    fn default() -> Self {
        Self {
            model: DEFAULT_CHAT_MODEL.into(),
            temperature: 0.7,
            max_tokens: None,
        }
    }
}

impl ChatOptions {
    pub fn for_model(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            ..Self::default()
        }
    }

    fn generation(&self) -> GenerationOptions {
        GenerationOptions::for_model(resolve_model(&self.model))
            .with_temperature(self.temperature)
            .with_max_tokens(self.max_tokens)
    }
}

pub struct ChatClient {
    provider: Arc<dyn LlmProvider>,
    history: Vec<Message>,
}

impl ChatClient {
    pub fn new(provider: Arc<dyn LlmProvider>) -> Self {
        Self {
            provider,
            history: Vec::new(),
        }
    }

    /// OpenRouter client; the key falls back to `OPEN_ROUTER_API_KEY`
    pub fn openrouter(api_key: Option<String>) -> Result<Self> {
        let overrides = ProviderOverrides {
            api_key,
            model_name: Some(DEFAULT_CHAT_MODEL.into()),
            base_url: None,
        };
        let config = ProviderConfig::from_env(ProviderKind::OpenRouter, &overrides)?;
        tracing::info!(api_key = %mask_key(&config.api_key), "OpenRouter API key loaded");
        Ok(Self::new(config.build_provider()?))
    }

    /// Send a message as part of the ongoing conversation.
    ///
    /// The user message stays in the history even when the request fails.
    pub async fn chat(&mut self, message: &str, options: &ChatOptions) -> Result<String> {
        self.history.push(Message::user(message));

        let generation = options.generation();
        let completion = match self.provider.complete(&self.history, &generation).await {
            Ok(completion) => completion,
            Err(e) => {
                tracing::error!(model = %generation.model, "Chat request failed: {}", e);
                return Err(e.into());
            }
        };

        self.history.push(Message::assistant(&completion.content));
        Ok(completion.content)
    }

    /// One-off question; history is neither used nor updated
    pub async fn get_response(&self, message: &str, options: &ChatOptions) -> Result<String> {
        let completion = self
            .provider
            .complete(&[Message::user(message)], &options.generation())
            .await
            .inspect_err(|e| tracing::error!(model = %options.model, "Request failed: {}", e))?;
        Ok(completion.content)
    }

    /// One-off question, streamed
    pub async fn stream_response(&self, message: &str, options: &ChatOptions) -> Result<CompletionStream> {
        Ok(self
            .provider
            .complete_stream(&[Message::user(message)], &options.generation())
            .await?)
    }

    /// Ask every model the same prompt; failures are reported inline as `Error: ...`
    pub async fn compare_models<S: AsRef<str>>(
        &self,
        prompt: &str,
        models: &[S],
        temperature: f32,
    ) -> Vec<(String, String)> {
        let mut results = Vec::with_capacity(models.len());

        for model in models {
            let model = model.as_ref();
            tracing::info!(model, "Getting response");
            let options = ChatOptions {
                model: model.to_string(),
                temperature,
                max_tokens: None,
            };
            let reply = match self.get_response(prompt, &options).await {
                Ok(reply) => reply,
                Err(e) => format!("Error: {e}"),
            };
            results.push((model.to_string(), reply));
        }

        results
    }

    pub fn clear_history(&mut self) {
        self.history.clear();
        tracing::info!("Chat history cleared");
    }

    pub fn history(&self) -> &[Message] {
        &self.history
    }

    pub fn set_history(&mut self, history: Vec<Message>) {
        self.history = history;
    }

    /// Write the history as a pretty-printed JSON array
    pub fn export_conversation(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let mut writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(&mut writer, &self.history)?;
        writer.flush()?;
        tracing::info!(path = %path.display(), "Conversation exported");
        Ok(())
    }

    /// Replace the history with a previously exported conversation
    pub fn load_conversation(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let reader = BufReader::new(File::open(path)?);
        self.history = serde_json::from_reader(reader)?;
        tracing::info!(path = %path.display(), messages = self.history.len(), "Conversation loaded");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agent_core::testing::ScriptedProvider;
    use agent_core::{AgentError, Completion, Role};
    use futures::StreamExt;

    fn client(replies: &[&str]) -> (ChatClient, Arc<ScriptedProvider>) {
        let provider = Arc::new(ScriptedProvider::new(
            replies.iter().map(|r| Completion::text("m", *r)).collect(),
        ));
        (ChatClient::new(provider.clone()), provider)
    }

    #[tokio::test]
    async fn test_chat_keeps_history() {
        let (mut client, provider) = client(&["4", "8"]);

        assert_eq!(client.chat("What is 2+2?", &ChatOptions::default()).await.unwrap(), "4");
        assert_eq!(client.chat("Double it", &ChatOptions::default()).await.unwrap(), "8");

        assert_eq!(client.history().len(), 4);
        assert_eq!(client.history()[3].role, Role::Assistant);

        let requests = provider.requests().await;
        assert_eq!(requests[1].messages.len(), 3);
        assert_eq!(requests[0].options.model, DEFAULT_CHAT_MODEL);
        assert!((requests[0].options.temperature - 0.7).abs() < f32::EPSILON);
    }

    #[tokio::test]
    async fn test_failed_chat_keeps_user_message() {
        let provider = Arc::new(ScriptedProvider::from_results(vec![Err(AgentError::RateLimited(
            "slow down".into(),
        ))]));
        let mut client = ChatClient::new(provider);

        assert!(client.chat("hi", &ChatOptions::default()).await.is_err());
        assert_eq!(client.history().len(), 1);
        assert_eq!(client.history()[0].role, Role::User);
    }

    #[tokio::test]
    async fn test_get_response_resolves_alias_without_history() {
        let (client, provider) = client(&["Paris"]);

        let options = ChatOptions {
            max_tokens: Some(10),
            ..ChatOptions::for_model("mistral_small")
        };
        let reply = client.get_response("Capital of France?", &options).await.unwrap();
        assert_eq!(reply, "Paris");
        assert!(client.history().is_empty());

        let request = &provider.requests().await[0];
        assert_eq!(request.options.model, "mistralai/mistral-small-3.1-24b-instruct:free");
        assert_eq!(request.options.max_tokens, Some(10));
    }

    #[tokio::test]
    async fn test_stream_response() {
        let (client, _) = client(&["streamed"]);
        let stream = client.stream_response("hi", &ChatOptions::default()).await.unwrap();
        let text: String = stream.map(|chunk| chunk.unwrap().delta).collect::<Vec<_>>().await.concat();
        assert_eq!(text, "streamed");
    }

    #[tokio::test]
    async fn test_compare_models_reports_errors_inline() {
        let provider = Arc::new(ScriptedProvider::from_results(vec![
            Ok(Completion::text("a", "AI is pattern learning.")),
            Err(AgentError::ProviderUnavailable("down".into())),
        ]));
        let client = ChatClient::new(provider);

        let results = client
            .compare_models("Explain AI in one sentence", &["mistral_small", "gemini_2_flash"], 0.7)
            .await;

        assert_eq!(results.len(), 2);
        assert_eq!(results[0], ("mistral_small".to_string(), "AI is pattern learning.".to_string()));
        assert_eq!(results[1].0, "gemini_2_flash");
        assert!(results[1].1.starts_with("Error: "));
    }

    #[tokio::test]
    async fn test_export_and_load_conversation() {
        let (mut client, _) = client(&["Hello!"]);
        client.chat("Hi", &ChatOptions::default()).await.unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("conversation.json");
        client.export_conversation(&path).unwrap();

        client.clear_history();
        assert!(client.history().is_empty());

        client.load_conversation(&path).unwrap();
        assert_eq!(client.history().len(), 2);
        assert_eq!(client.history()[1].content, "Hello!");
    }

    #[test]
    fn test_load_plain_role_content_export() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plain.json");
        std::fs::write(&path, r#"[{"role": "user", "content": "hola"}, {"role": "assistant", "content": "¡hola!"}]"#)
            .unwrap();

        let (mut client, _) = client(&[]);
        client.load_conversation(&path).unwrap();
        assert_eq!(client.history()[1].content, "¡hola!");
    }

    #[test]
    fn test_export_reports_write_failure() {
        let dir = tempfile::tempdir().unwrap();
        let (client, _) = client(&[]);
        // A directory cannot be opened as a file
        assert!(client.export_conversation(dir.path()).is_err());
    }

    #[test]
    fn test_export_is_complete_on_return() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("conversation.json");
        let (mut client, _) = client(&[]);
        client.set_history(vec![Message::user("x".repeat(20_000)), Message::assistant("ok")]);

        client.export_conversation(&path).unwrap();
        let saved: Vec<Message> = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(saved.len(), 2);
        assert_eq!(saved[0].content.len(), 20_000);
    }

    #[test]
    fn test_load_missing_file_fails() {
        let (mut client, _) = client(&[]);
        assert!(client.load_conversation("/definitely/not/here.json").is_err());
    }
}
