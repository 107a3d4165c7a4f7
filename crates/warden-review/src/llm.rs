use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use warden_core::{LlmConfig, WardenError};

/// A message in a chat conversation with the LLM.
///
/// # Examples
///
/// ```
/// use warden_review::llm::{ChatMessage, Role};
///
/// let msg = ChatMessage::user("Validate these comments");
/// assert!(matches!(msg.role, Role::User));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatMessage {
    /// Role of the message sender.
    pub role: Role,
    /// Text content of the message.
    pub content: String,
}

impl ChatMessage {
    /// A system message.
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    /// A user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// Role in the chat conversation.
///
/// # Examples
///
/// ```
/// use warden_review::llm::Role;
///
/// let role = Role::System;
/// assert_eq!(serde_json::to_string(&role).unwrap(), "\"system\"");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// System-level instructions.
    System,
    /// User input.
    User,
    /// Assistant response.
    Assistant,
}

/// Something that can answer a chat conversation with raw text.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Model identifier, for reporting.
    fn model(&self) -> &str;

    /// Send `messages` and return the assistant's text.
    async fn chat(&self, messages: Vec<ChatMessage>) -> Result<String, WardenError>;
}

/// OpenAI-compatible chat completions client.
///
/// Works with any provider that exposes the `/v1/chat/completions` endpoint:
/// OpenAI, Ollama, vLLM, LiteLLM, etc.
///
/// # Examples
///
/// ```
/// use warden_core::LlmConfig;
/// use warden_review::llm::LlmClient;
///
/// let config = LlmConfig {
///     api_key: Some("test-key".into()),
///     ..LlmConfig::default()
/// };
/// let client = LlmClient::new(&config).unwrap();
/// ```
pub struct LlmClient {
    client: reqwest::Client,
    config: LlmConfig,
    base_url: String,
}

/// Default API root for a known provider name.
///
/// # Examples
///
/// ```
/// use warden_review::llm::provider_base_url;
///
/// assert_eq!(provider_base_url("ollama"), Some("http://localhost:11434"));
/// assert_eq!(provider_base_url("acme-llm"), None);
/// ```
pub fn provider_base_url(provider: &str) -> Option<&'static str> {
    match provider.to_lowercase().as_str() {
        "openai" => Some("https://api.openai.com"),
        "ollama" => Some("http://localhost:11434"),
        "openrouter" => Some("https://openrouter.ai/api"),
        _ => None,
    }
}

impl LlmClient {
    /// Create a new LLM client from configuration.
    ///
    /// # Errors
    ///
    /// Returns [`WardenError::Config`] if the provider is unknown and no
    /// `base_url` is set, or [`WardenError::Llm`] if the HTTP client cannot
    /// be built.
    pub fn new(config: &LlmConfig) -> Result<Self, WardenError> {
        let base_url = match (&config.base_url, provider_base_url(&config.provider)) {
            (Some(url), _) => url.clone(),
            (None, Some(url)) => url.to_string(),
            (None, None) => {
                return Err(WardenError::Config(format!(
                    "unknown LLM provider '{}'; set [llm] base_url",
                    config.provider
                )))
            }
        };
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| WardenError::Llm(format!("failed to create HTTP client: {e}")))?;
        Ok(Self {
            client,
            config: config.clone(),
            base_url,
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/v1/chat/completions", self.base_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl ChatBackend for LlmClient {
    fn model(&self) -> &str {
        &self.config.model
    }

    /// Builds a request with temperature 0.1 and JSON response format.
    async fn chat(&self, messages: Vec<ChatMessage>) -> Result<String, WardenError> {
        let body = serde_json::json!({
            "model": self.config.model,
            "messages": messages,
            "temperature": 0.1,
            "response_format": { "type": "json_object" },
        });

        let mut request = self.client.post(self.endpoint());
        if let Some(api_key) = &self.config.api_key {
            request = request.header("Authorization", format!("Bearer {api_key}"));
        }

        let response = request
            .json(&body)
            .send()
            .await
            .map_err(|e| WardenError::Llm(format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            return Err(WardenError::Llm(format!(
                "LLM API error {status}: {body_text}"
            )));
        }

        let response_body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| WardenError::Llm(format!("failed to parse response: {e}")))?;

        let content = response_body
            .get("choices")
            .and_then(|c| c.get(0))
            .and_then(|c| c.get("message"))
            .and_then(|m| m.get("content"))
            .and_then(|c| c.as_str())
            .ok_or_else(|| {
                WardenError::Llm(format!("unexpected response structure: {response_body}"))
            })?;

        Ok(content.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_construction_succeeds() {
        assert!(LlmClient::new(&LlmConfig::default()).is_ok());
    }

    #[test]
    fn model_returns_config_model() {
        let config = LlmConfig {
            model: "gpt-4o-mini".into(),
            ..LlmConfig::default()
        };
        let client = LlmClient::new(&config).unwrap();
        assert_eq!(client.model(), "gpt-4o-mini");
    }

    #[test]
    fn endpoint_tolerates_trailing_slash() {
        let config = LlmConfig {
            base_url: Some("http://localhost:11434/".into()),
            ..LlmConfig::default()
        };
        let client = LlmClient::new(&config).unwrap();
        assert_eq!(client.endpoint(), "http://localhost:11434/v1/chat/completions");
    }

    #[test]
    fn provider_selects_default_endpoint() {
        let config = LlmConfig {
            provider: "ollama".into(),
            ..LlmConfig::default()
        };
        let client = LlmClient::new(&config).unwrap();
        assert_eq!(client.endpoint(), "http://localhost:11434/v1/chat/completions");

        let client = LlmClient::new(&LlmConfig::default()).unwrap();
        assert_eq!(client.endpoint(), "https://api.openai.com/v1/chat/completions");
    }

    #[test]
    fn explicit_base_url_beats_provider() {
        let config = LlmConfig {
            provider: "ollama".into(),
            base_url: Some("http://gpu-box:8000".into()),
            ..LlmConfig::default()
        };
        let client = LlmClient::new(&config).unwrap();
        assert_eq!(client.endpoint(), "http://gpu-box:8000/v1/chat/completions");
    }

    #[test]
    fn unknown_provider_needs_base_url() {
        let config = LlmConfig {
            provider: "acme-llm".into(),
            ..LlmConfig::default()
        };
        assert!(matches!(LlmClient::new(&config), Err(WardenError::Config(_))));
    }

    #[test]
    fn chat_message_serializes() {
        let json = serde_json::to_value(ChatMessage::system("hello")).unwrap();
        assert_eq!(json["role"], "system");
        assert_eq!(json["content"], "hello");
    }
}
