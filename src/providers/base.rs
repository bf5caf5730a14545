//! Base provider trait and common types for Parley
//!
//! This module defines the Provider trait that every completion backend
//! implements, along with the wire-neutral message and response types that
//! the prompt assembly engine produces.

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Message structure for a completion request
///
/// A flattened `role`/`content` pair. Persisted chat messages carry more
/// metadata (timestamps, files); only these two fields ever reach a provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Role of the message sender (user, assistant, system)
    pub role: String,
    /// Content of the message
    pub content: String,
}

impl Message {
    /// Creates a new user message
    ///
    /// # Arguments
    ///
    /// * `content` - The message content
    ///
    /// # Examples
    ///
    /// ```
    /// use parley::providers::Message;
    ///
    /// let msg = Message::user("Hello, assistant!");
    /// assert_eq!(msg.role, "user");
    /// ```
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }

    /// Creates a new assistant message
    ///
    /// # Examples
    ///
    /// ```
    /// use parley::providers::Message;
    ///
    /// let msg = Message::assistant("Hello, user!");
    /// assert_eq!(msg.role, "assistant");
    /// ```
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: "assistant".to_string(),
            content: content.into(),
        }
    }

    /// Creates a new system message
    ///
    /// # Examples
    ///
    /// ```
    /// use parley::providers::Message;
    ///
    /// let msg = Message::system("You are a helpful assistant");
    /// assert_eq!(msg.role, "system");
    /// ```
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }
}

/// Token usage information from a completion
///
/// Tracks the number of tokens used in prompts and completions,
/// as reported by the provider.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    /// Number of tokens in the prompt
    pub prompt_tokens: usize,
    /// Number of tokens in the completion
    pub completion_tokens: usize,
    /// Total tokens used (prompt + completion)
    pub total_tokens: usize,
}

impl TokenUsage {
    /// Create a new TokenUsage instance
    ///
    /// # Examples
    ///
    /// ```
    /// use parley::providers::TokenUsage;
    ///
    /// let usage = TokenUsage::new(100, 50);
    /// assert_eq!(usage.total_tokens, 150);
    /// ```
    pub fn new(prompt_tokens: usize, completion_tokens: usize) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens + completion_tokens,
        }
    }
}

/// Completion response with message and optional token usage
#[derive(Debug, Clone)]
pub struct CompletionResponse {
    /// The response message from the model
    pub message: Message,
    /// Optional token usage information
    pub usage: Option<TokenUsage>,
    /// Model that produced the answer, when the backend reports it
    pub model: Option<String>,
}

impl CompletionResponse {
    /// Create a new CompletionResponse
    ///
    /// # Examples
    ///
    /// ```
    /// use parley::providers::{CompletionResponse, Message};
    ///
    /// let response = CompletionResponse::new(Message::assistant("Hello!"));
    /// assert_eq!(response.message.role, "assistant");
    /// assert!(response.usage.is_none());
    /// ```
    pub fn new(message: Message) -> Self {
        Self {
            message,
            usage: None,
            model: None,
        }
    }

    /// Create a new CompletionResponse with token usage
    pub fn with_usage(message: Message, usage: TokenUsage) -> Self {
        Self {
            message,
            usage: Some(usage),
            model: None,
        }
    }

    /// Attach the reporting model name
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }
}

/// Provider trait for completion backends
///
/// Every backend (OpenAI-compatible, Ollama) implements this trait. The chat
/// service holds exactly one `Arc<dyn Provider>` built at process start.
///
/// # Examples
///
/// ```no_run
/// use parley::providers::{Provider, Message, CompletionResponse};
/// use parley::error::Result;
/// use async_trait::async_trait;
///
/// struct MyProvider;
///
/// #[async_trait]
/// impl Provider for MyProvider {
///     async fn complete(&self, messages: &[Message]) -> Result<CompletionResponse> {
///         Ok(CompletionResponse::new(Message::assistant("Response")))
///     }
/// }
/// ```
#[async_trait]
pub trait Provider: Send + Sync {
    /// Completes a conversation with the given ordered messages
    ///
    /// # Arguments
    ///
    /// * `messages` - Exact message list to send, in order
    ///
    /// # Returns
    ///
    /// Returns the assistant's response message along with token usage information
    ///
    /// # Errors
    ///
    /// Returns `ParleyError::Config` if credentials are missing, or
    /// `ParleyError::Provider` if the API call fails or the response is invalid
    async fn complete(&self, messages: &[Message]) -> Result<CompletionResponse>;

    /// Check that the provider has everything `complete` needs locally
    ///
    /// Runs before any history is written, so a missing credential never
    /// leaves a half-submitted turn behind. No network I/O.
    ///
    /// # Errors
    ///
    /// Returns `ParleyError::Config` when the provider cannot issue requests
    fn ensure_configured(&self) -> Result<()> {
        Ok(())
    }

    /// Get the name of the configured model
    ///
    /// The default implementation reports that the model is unknown.
    fn get_current_model(&self) -> Result<String> {
        Err(crate::error::ParleyError::Provider(
            "Current model information is not available from this provider".to_string(),
        )
        .into())
    }
}
