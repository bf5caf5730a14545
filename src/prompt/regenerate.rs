//! Regeneration resolver
//!
//! Maps a message index back to the user prompt that produced it, so the
//! prompt can be re-issued as new history without touching the original.

use crate::error::{ParleyError, Result};
use crate::prompt::Mode;
use crate::storage::{Chat, ChatMessage, FileRef, Role};

/// Content of the assistant placeholder appended while regeneration runs
pub const REGENERATING_PLACEHOLDER: &str = "↻ Regenerating…";

/// The user prompt a regeneration re-issues
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPrompt {
    /// Index of the original user message
    pub index: usize,
    pub content: String,
    pub files: Vec<FileRef>,
}

impl ResolvedPrompt {
    /// Fresh copy of the original user message with a new timestamp
    pub fn duplicate(&self) -> ChatMessage {
        ChatMessage::user(self.content.clone()).with_files(self.files.clone())
    }
}

/// Find the nearest user message strictly before `index`
///
/// `index` is clamped to the history length, so any index past the end
/// resolves against the last user message.
///
/// # Errors
///
/// Returns `ParleyError::PromptNotFound` when no user message precedes `index`
///
/// # Examples
///
/// ```
/// use parley::prompt::regenerate::resolve_prompt;
/// use parley::storage::ChatMessage;
///
/// let history = vec![ChatMessage::user("hi"), ChatMessage::assistant("hello")];
/// let resolved = resolve_prompt(&history, 1).unwrap();
/// assert_eq!(resolved.index, 0);
/// assert_eq!(resolved.content, "hi");
/// ```
pub fn resolve_prompt(messages: &[ChatMessage], index: usize) -> Result<ResolvedPrompt> {
    let end = index.min(messages.len());
    let (found, message) = messages[..end]
        .iter()
        .enumerate()
        .rev()
        .find(|(_, m)| m.role == Role::User)
        .ok_or(ParleyError::PromptNotFound)?;

    Ok(ResolvedPrompt {
        index: found,
        content: message.content.clone(),
        files: message.files.clone().unwrap_or_default(),
    })
}

/// Look up the stored file text for each FileRef by its server file id
///
/// # Returns
///
/// The resolved file-text messages in FileRef order, and the FileRefs
/// reconciled so only resolvable ids are kept. Unresolvable refs are kept
/// without an id and logged.
pub fn resolve_file_messages(chat: &Chat, files: &[FileRef]) -> (Vec<ChatMessage>, Vec<FileRef>) {
    let mut messages = Vec::new();
    let mut reconciled = Vec::with_capacity(files.len());

    for file in files {
        let found = file
            .server_file_id
            .as_deref()
            .and_then(|id| chat.file_message(id));

        let mut file = file.clone();
        match found {
            Some(message) => messages.push(message.clone()),
            None => {
                tracing::warn!(
                    file = %file.name,
                    server_file_id = ?file.server_file_id,
                    "File text not found for regeneration, skipping"
                );
                file.server_file_id = None;
            }
        }
        reconciled.push(file);
    }

    (messages, reconciled)
}

/// Prefix a regenerated answer with its mode tag, e.g. `[DeepThink] `
pub fn label_answer(mode: Mode, answer: &str) -> String {
    match mode.label() {
        Some(label) => format!("[{}] {}", label, answer),
        None => answer.to_string(),
    }
}
