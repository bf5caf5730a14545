//! Prompt assembly
//!
//! Builds the exact, ordered message list sent to the completion provider
//! from chat history, the prompting mode, the new user prompt and any
//! uploaded file text.
//!
//! Two shapes exist:
//!
//! - plain submission: `[...history, {system: directive}, {user: prompt}]`
//! - file submission: `[...batch file messages, {system: directive}, {user: prompt}]`

pub mod regenerate;

use crate::error::{ParleyError, Result};
use crate::extract::PreparedFile;
use crate::providers::Message;
use crate::search::{format_snippets, SearchProvider};
use crate::storage::{ChatMessage, FileRef};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use ulid::Ulid;

/// Directive for `normal` mode
pub const NORMAL_DIRECTIVE: &str = "You are a helpful assistant. Answer concisely and to the point.";

/// Leading text of the `search` mode directive; formatted results follow
pub const SEARCH_DIRECTIVE_PREFIX: &str = "Using the web results below, answer the question and cite sources with bracketed references such as [1].\n\nSearch results:\n";

/// Prompting mode selected per request
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    #[default]
    Normal,
    DeepThink,
    Search,
}

impl Mode {
    /// Tag prefixed to regenerated answers; `None` for `normal`
    pub fn label(&self) -> Option<&'static str> {
        match self {
            Mode::Normal => None,
            Mode::DeepThink => Some("DeepThink"),
            Mode::Search => Some("Search"),
        }
    }

    /// Parse an optional request field, defaulting to `normal`
    ///
    /// # Errors
    ///
    /// Returns `ParleyError::Validation` for unknown mode names
    pub fn parse_optional(value: Option<&str>) -> Result<Self> {
        match value.map(str::trim).filter(|v| !v.is_empty()) {
            Some(v) => v.parse(),
            None => Ok(Mode::Normal),
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Normal => write!(f, "normal"),
            Mode::DeepThink => write!(f, "deepthink"),
            Mode::Search => write!(f, "search"),
        }
    }
}

impl FromStr for Mode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "normal" => Ok(Mode::Normal),
            "deepthink" => Ok(Mode::DeepThink),
            "search" => Ok(Mode::Search),
            _ => Err(ParleyError::Validation(format!("Unknown mode: {}", s)).into()),
        }
    }
}

/// Directive for `deepthink` mode
pub fn deepthink_directive(model: &str) -> String {
    format!(
        "Answer as thoroughly and in as much detail as possible, with examples, code and sources. \
         If asked which model you are working with, answer exactly \"{}\" in \"deepthink\" mode.",
        model
    )
}

/// Resolves the per-mode system directive
///
/// Holds the search backend used by `search` mode and the model name quoted
/// by the `deepthink` directive.
#[derive(Clone)]
pub struct PromptAssembler {
    search: Arc<dyn SearchProvider>,
    model_name: String,
}

impl PromptAssembler {
    /// Create an assembler
    pub fn new(search: Arc<dyn SearchProvider>, model_name: impl Into<String>) -> Self {
        Self {
            search,
            model_name: model_name.into(),
        }
    }

    /// Build the system directive for `mode`
    ///
    /// `search` mode queries the search provider with `query`; every other
    /// mode is purely local.
    ///
    /// # Errors
    ///
    /// Propagates search configuration and provider errors
    pub async fn directive(&self, mode: Mode, query: &str) -> Result<String> {
        match mode {
            Mode::Normal => Ok(NORMAL_DIRECTIVE.to_string()),
            Mode::DeepThink => Ok(deepthink_directive(&self.model_name)),
            Mode::Search => {
                let snippets = self.search.search(query).await?;
                tracing::debug!(results = snippets.len(), "Search directive built");
                Ok(format!(
                    "{}{}",
                    SEARCH_DIRECTIVE_PREFIX,
                    format_snippets(&snippets)
                ))
            }
        }
    }
}

/// Messages for a plain submission: full history, directive, then prompt
pub fn assemble_plain(history: &[ChatMessage], directive: &str, prompt: &str) -> Vec<Message> {
    history
        .iter()
        .map(ChatMessage::to_provider_message)
        .chain([Message::system(directive), Message::user(prompt)])
        .collect()
}

/// Messages for a file submission: only this batch's file text, directive, then prompt
pub fn assemble_with_files(
    file_messages: &[ChatMessage],
    directive: &str,
    prompt: &str,
) -> Vec<Message> {
    assemble_plain(file_messages, directive, prompt)
}

/// File-text system messages and linked metadata for one upload batch
#[derive(Debug, Clone, Default)]
pub struct FileBatch {
    /// One `[FILE]` system message per prepared file, in input order
    pub file_messages: Vec<ChatMessage>,
    /// Matching metadata for the user message, same order
    pub file_refs: Vec<FileRef>,
}

impl FileBatch {
    /// Server file ids assigned to this batch
    pub fn file_ids(&self) -> Vec<String> {
        self.file_messages
            .iter()
            .filter_map(|m| m.file_id.clone())
            .collect()
    }
}

/// Assign a fresh server file id to each prepared file
pub fn assemble_file_batch(prepared: &[PreparedFile]) -> FileBatch {
    let mut batch = FileBatch::default();
    for file in prepared {
        let file_id = Ulid::new().to_string();
        batch
            .file_messages
            .push(ChatMessage::file_text(file.summary_message(), file_id.clone()));
        batch.file_refs.push(file.file_ref(file_id));
    }
    batch
}
