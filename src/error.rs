//! Error types for Parley
//!
//! This module defines all error types used throughout the service,
//! using `thiserror` for ergonomic error handling.

use thiserror::Error;

/// Main error type for Parley operations
///
/// Every failure that can reach a client is one of these variants. Handlers
/// downcast the propagated `anyhow::Error` to this type to decide what the
/// client sees.
#[derive(Error, Debug)]
pub enum ParleyError {
    /// The caller has no identity attached to the request
    #[error("Not authenticated")]
    Auth,

    /// Chat absent, or not owned by the caller
    #[error("{0}")]
    NotFound(String),

    /// Configuration-related errors (including missing provider credentials)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Upstream completion or search call failed or returned non-success
    #[error("Provider error: {0}")]
    Provider(String),

    /// A single file could not be converted to text
    #[error("Extraction error: {0}")]
    Extraction(String),

    /// Regeneration found no user prompt before the requested index
    #[error("Prompt not found")]
    PromptNotFound,

    /// Request parameters failed validation
    #[error("Invalid request: {0}")]
    Validation(String),

    /// Chat store errors (database operations)
    #[error("Storage error: {0}")]
    Storage(String),
}

impl ParleyError {
    /// Shorthand for the "chat not found" variant
    pub fn chat_not_found() -> Self {
        Self::NotFound("Chat not found".to_string())
    }
}

/// Result type alias for Parley operations
///
/// Uses `anyhow::Error` so call sites can attach context; the concrete
/// `ParleyError` stays recoverable through `downcast_ref`.
pub type Result<T> = anyhow::Result<T>;
