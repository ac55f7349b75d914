//! OpenRouter model catalog with friendly aliases.

use serde::Serialize;

/// Model used by [`crate::chat::ChatClient`] when none is given
pub const DEFAULT_CHAT_MODEL: &str = "meta-llama/llama-4-maverick:free";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelTier {
    Free,
    Paid,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct ModelEntry {
    pub alias: &'static str,
    pub id: &'static str,
}

const fn entry(alias: &'static str, id: &'static str) -> ModelEntry {
    ModelEntry { alias, id }
}

pub const FREE_MODELS: &[ModelEntry] = &[
    entry("mistral_small", "mistralai/mistral-small-3.1-24b-instruct:free"),
    entry("deepseek_v3", "deepseek/deepseek-v3-base:free"),
    entry("llama_4_maverick", "meta-llama/llama-4-maverick:free"),
    entry("hermes_mistral", "nousresearch/deephermes-3-mistral-24b-preview:free"),
    entry("gemini_2_flash", "google/gemini-2.0-flash-exp:free"),
];

pub const PAID_MODELS: &[ModelEntry] = &[
    entry("gpt_4_nano", "openai/gpt-4.1-nano"),
    entry("gpt_4_mini", "openai/gpt-4.1-mini"),
    entry("claude_haiku", "anthropic/claude-3.5-haiku"),
    entry("claude_sonnet", "anthropic/claude-3.7-sonnet"),
    entry("gemini_flash_thinking", "google/gemini-2.5-flash-preview:thinking"),
];

/// Every catalog entry with its tier, free models first
pub fn available_models() -> impl Iterator<Item = (ModelTier, &'static ModelEntry)> {
    FREE_MODELS
        .iter()
        .map(|m| (ModelTier::Free, m))
        .chain(PAID_MODELS.iter().map(|m| (ModelTier::Paid, m)))
}

/// Map a friendly alias to its model id; anything else is taken as an id already
pub fn resolve_model(name: &str) -> &str {
    available_models()
        .find(|(_, m)| m.alias == name)
        .map_or(name, |(_, m)| m.id)
}
