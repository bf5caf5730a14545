//! Provider module for Parley
//!
//! This module contains the completion provider abstraction and its
//! implementations for OpenAI-compatible endpoints and Ollama.

pub mod base;
pub mod ollama;
pub mod openai;

pub use base::{CompletionResponse, Message, Provider, TokenUsage};
pub use ollama::OllamaProvider;
pub use openai::OpenAiProvider;

use crate::config::ProviderConfig;
use crate::error::{ParleyError, Result};
use std::sync::Arc;

/// Create a provider instance based on configuration
///
/// # Arguments
///
/// * `provider_type` - Type of provider ("openai" or "ollama")
/// * `config` - Provider configuration
///
/// # Returns
///
/// Returns a shared provider handle
///
/// # Errors
///
/// Returns error if provider type is invalid or initialization fails
pub fn create_provider(provider_type: &str, config: &ProviderConfig) -> Result<Arc<dyn Provider>> {
    match provider_type {
        "openai" => Ok(Arc::new(OpenAiProvider::new(config.openai.clone())?)),
        "ollama" => Ok(Arc::new(OllamaProvider::new(config.ollama.clone())?)),
        _ => Err(ParleyError::Provider(format!("Unknown provider type: {}", provider_type)).into()),
    }
}
