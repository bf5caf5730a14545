//! OpenAI-compatible provider implementation for Parley
//!
//! Talks to any `/chat/completions` endpoint that follows the OpenAI wire
//! format. The default configuration points at DeepSeek (`deepseek-chat`).

use crate::config::OpenAiConfig;
use crate::error::{ParleyError, Result};
use crate::providers::{CompletionResponse, Message, Provider, TokenUsage};

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// OpenAI-compatible chat completions provider
pub struct OpenAiProvider {
    client: Client,
    config: OpenAiConfig,
}

/// Request structure for the chat completions API
#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: &'a [Message],
    stream: bool,
}

/// Response structure from the chat completions API
#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    model: Option<String>,
    choices: Vec<ChatCompletionChoice>,
    #[serde(default)]
    usage: Option<ChatCompletionUsage>,
}

/// Choice in a chat completions response
#[derive(Debug, Deserialize)]
struct ChatCompletionChoice {
    message: ChatCompletionMessage,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionUsage {
    prompt_tokens: usize,
    completion_tokens: usize,
}

impl OpenAiProvider {
    /// Create a new OpenAI-compatible provider
    ///
    /// A missing API key is not an error here; `complete` reports it as a
    /// configuration error so the server can still start and serve history.
    ///
    /// # Errors
    ///
    /// Returns error if HTTP client initialization fails
    ///
    /// # Examples
    ///
    /// ```
    /// use parley::config::OpenAiConfig;
    /// use parley::providers::OpenAiProvider;
    ///
    /// let provider = OpenAiProvider::new(OpenAiConfig::default());
    /// assert!(provider.is_ok());
    /// ```
    pub fn new(config: OpenAiConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .user_agent(concat!("parley/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ParleyError::Provider(format!("Failed to create HTTP client: {}", e)))?;

        tracing::info!(
            "Initialized OpenAI-compatible provider: api_base={}, model={}",
            config.api_base,
            config.model
        );

        Ok(Self { client, config })
    }

    /// Full URL of the completions endpoint
    fn completions_url(&self) -> String {
        format!(
            "{}/chat/completions",
            self.config.api_base.trim_end_matches('/')
        )
    }

    /// The configured key; empty strings count as missing
    fn api_key(&self) -> Result<&str> {
        self.config
            .api_key
            .as_deref()
            .filter(|key| !key.is_empty())
            .ok_or_else(|| {
                ParleyError::Config("Missing API key for completion provider".to_string()).into()
            })
    }
}

#[async_trait]
impl Provider for OpenAiProvider {
    async fn complete(&self, messages: &[Message]) -> Result<CompletionResponse> {
        let api_key = self.api_key()?;

        let request = ChatCompletionRequest {
            model: &self.config.model,
            messages,
            stream: false,
        };

        tracing::debug!(
            "Sending chat completion request: {} messages, model={}",
            messages.len(),
            self.config.model
        );

        let response = self
            .client
            .post(self.completions_url())
            .bearer_auth(api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                tracing::error!("Chat completion request failed: {}", e);
                ParleyError::Provider(format!("Chat completion request failed: {}", e))
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            tracing::error!("Completion API returned error {}: {}", status, error_text);
            return Err(ParleyError::Provider(format!(
                "Completion API returned error {}: {}",
                status, error_text
            ))
            .into());
        }

        let body: ChatCompletionResponse = response.json().await.map_err(|e| {
            tracing::error!("Failed to parse completion response: {}", e);
            ParleyError::Provider(format!("Failed to parse completion response: {}", e))
        })?;

        let choice = body
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| ParleyError::Provider("No choices in completion response".to_string()))?;

        let message = Message::assistant(choice.message.content.unwrap_or_default());
        let completion = match body.usage {
            Some(u) => CompletionResponse::with_usage(
                message,
                TokenUsage::new(u.prompt_tokens, u.completion_tokens),
            ),
            None => CompletionResponse::new(message),
        };

        Ok(completion.with_model(body.model.unwrap_or_else(|| self.config.model.clone())))
    }

    fn ensure_configured(&self) -> Result<()> {
        self.api_key().map(|_| ())
    }

    fn get_current_model(&self) -> Result<String> {
        Ok(self.config.model.clone())
    }
}
