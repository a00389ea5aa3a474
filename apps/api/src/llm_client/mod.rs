//! LLM provider abstraction — the single point of entry for model calls.
//!
//! ARCHITECTURAL RULE: no other module may call a provider API directly.
//! The matching pipeline sees one capability: `query(prompt, system) -> text`.
//! Concrete providers (Anthropic, OpenAI-compatible) live behind the
//! `ChatProvider` trait and are selected via `create_provider`.

use std::collections::HashMap;
use std::str::FromStr;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use thiserror::Error;

pub mod anthropic;
pub mod openai_compat;

pub use anthropic::AnthropicProvider;
pub use openai_compat::OpenAiCompatProvider;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Rate limited after {retries} retries")]
    RateLimited { retries: u32 },

    #[error("LLM returned empty content")]
    EmptyContent,
}

/// A chat-completion capable model provider.
///
/// `query` sends one prompt with a system instruction and returns the raw
/// text content of the reply. Callers own all parsing of that text.
#[async_trait]
pub trait ChatProvider: Send + Sync {
    /// Model identifier, reported back to API callers for transparency.
    fn model(&self) -> &str;

    async fn query(&self, prompt: &str, system: &str) -> Result<String, LlmError>;
}

/// Supported provider families. OpenRouter and Gemini speak the
/// OpenAI-compatible chat-completions dialect and differ only by base URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderKind {
    Anthropic,
    OpenAi,
    OpenRouter,
    Gemini,
}

impl ProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::Anthropic => "anthropic",
            ProviderKind::OpenAi => "openai",
            ProviderKind::OpenRouter => "openrouter",
            ProviderKind::Gemini => "gemini",
        }
    }
}

impl FromStr for ProviderKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "anthropic" | "claude" => Ok(ProviderKind::Anthropic),
            "openai" => Ok(ProviderKind::OpenAi),
            "openrouter" => Ok(ProviderKind::OpenRouter),
            "gemini" | "google" => Ok(ProviderKind::Gemini),
            other => Err(format!("Unknown AI provider '{other}'")),
        }
    }
}

/// Constructs a provider for the given family, model and key.
pub fn create_provider(kind: ProviderKind, model: &str, api_key: &str) -> Arc<dyn ChatProvider> {
    match kind {
        ProviderKind::Anthropic => Arc::new(AnthropicProvider::new(model, api_key)),
        ProviderKind::OpenAi => Arc::new(OpenAiCompatProvider::new(
            openai_compat::OPENAI_API_URL,
            model,
            api_key,
        )),
        ProviderKind::OpenRouter => Arc::new(OpenAiCompatProvider::new(
            openai_compat::OPENROUTER_API_URL,
            model,
            api_key,
        )),
        ProviderKind::Gemini => Arc::new(OpenAiCompatProvider::new(
            openai_compat::GEMINI_OPENAI_API_URL,
            model,
            api_key,
        )),
    }
}

/// Config-keyed provider cache.
///
/// Per-user settings can name any provider/model/key combination; rather than
/// holding one mutable global client that re-initializes when settings change,
/// each distinct configuration gets its own immutable client, constructed on
/// first use and reused afterwards.
#[derive(Default)]
pub struct ProviderCache {
    inner: RwLock<HashMap<String, Arc<dyn ChatProvider>>>,
}

impl ProviderCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_create(
        &self,
        kind: ProviderKind,
        model: &str,
        api_key: &str,
    ) -> Arc<dyn ChatProvider> {
        let key = format!("{}/{}/{}", kind.as_str(), model, api_key);

        if let Some(provider) = self.inner.read().expect("provider cache poisoned").get(&key) {
            return Arc::clone(provider);
        }

        let provider = create_provider(kind, model, api_key);
        self.inner
            .write()
            .expect("provider cache poisoned")
            .insert(key, Arc::clone(&provider));
        provider
    }
}

/// Strips ```json ... ``` or ``` ... ``` code fences from LLM output.
pub fn strip_json_fences(text: &str) -> &str {
    let text = text.trim();
    if let Some(stripped) = text.strip_prefix("```json") {
        stripped
            .trim_start()
            .strip_suffix("```")
            .map(|s| s.trim())
            .unwrap_or(stripped.trim_start())
    } else if let Some(stripped) = text.strip_prefix("```") {
        stripped
            .trim_start()
            .strip_suffix("```")
            .map(|s| s.trim())
            .unwrap_or(stripped.trim_start())
    } else {
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_json_fences_with_json_tag() {
        let input = "```json\n[{\"jobId\": \"a\"}]\n```";
        assert_eq!(strip_json_fences(input), "[{\"jobId\": \"a\"}]");
    }

    #[test]
    fn test_strip_json_fences_without_tag() {
        let input = "```\n{\"key\": \"value\"}\n```";
        assert_eq!(strip_json_fences(input), "{\"key\": \"value\"}");
    }

    #[test]
    fn test_strip_json_fences_no_fences() {
        let input = "{\"key\": \"value\"}";
        assert_eq!(strip_json_fences(input), "{\"key\": \"value\"}");
    }

    #[test]
    fn test_provider_kind_parses_aliases() {
        assert_eq!("claude".parse::<ProviderKind>(), Ok(ProviderKind::Anthropic));
        assert_eq!("OpenAI".parse::<ProviderKind>(), Ok(ProviderKind::OpenAi));
        assert_eq!("google".parse::<ProviderKind>(), Ok(ProviderKind::Gemini));
        assert!("mystery".parse::<ProviderKind>().is_err());
    }

    #[test]
    fn test_provider_cache_reuses_same_config() {
        let cache = ProviderCache::new();
        let a = cache.get_or_create(ProviderKind::Anthropic, "claude-sonnet-4-5", "k1");
        let b = cache.get_or_create(ProviderKind::Anthropic, "claude-sonnet-4-5", "k1");
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn test_provider_cache_distinguishes_configs() {
        let cache = ProviderCache::new();
        let a = cache.get_or_create(ProviderKind::OpenAi, "gpt-4o", "k1");
        let b = cache.get_or_create(ProviderKind::OpenAi, "gpt-4o", "k2");
        assert!(!Arc::ptr_eq(&a, &b));
    }
}
