use crate::providers::Message;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ulid::Ulid;

/// Prefix identifying synthetic system messages that hold extracted file text
pub const FILE_MARKER: &str = "[FILE]";

/// Display name given to freshly created chats
pub const DEFAULT_CHAT_NAME: &str = "New Chat";

/// Sender of a chat message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
}

impl Role {
    /// Wire name of the role as completion APIs expect it
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::System => "system",
        }
    }
}

/// Metadata for a file attached to a user message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileRef {
    /// Original file name
    pub name: String,
    /// Declared size in bytes
    pub size: u64,
    /// Declared MIME type
    #[serde(rename = "type", default)]
    pub mime_type: String,
    /// Id of the system message holding this file's extracted text
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server_file_id: Option<String>,
}

/// A single persisted chat message
///
/// Insertion order within `Chat::messages` is the conversation order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
    /// Unix milliseconds
    pub timestamp: i64,
    /// Attached files (user messages only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub files: Option<Vec<FileRef>>,
    /// Index of the message this one supersedes after an edit
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub edited_from: Option<usize>,
    /// Server file id carried by a file-text system message
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_id: Option<String>,
    /// Set on a user message whose completion failed
    #[serde(default, skip_serializing_if = "is_false")]
    pub unanswered: bool,
}

fn is_false(value: &bool) -> bool {
    !*value
}

impl ChatMessage {
    fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            timestamp: now_millis(),
            files: None,
            edited_from: None,
            file_id: None,
            unanswered: false,
        }
    }

    /// User message stamped with the current time
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    /// Assistant message stamped with the current time
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    /// System message stamped with the current time
    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    /// Synthetic system message carrying extracted file text
    pub fn file_text(content: impl Into<String>, file_id: impl Into<String>) -> Self {
        let mut message = Self::new(Role::System, content);
        message.file_id = Some(file_id.into());
        message
    }

    /// Attach file metadata; an empty list leaves `files` unset
    pub fn with_files(mut self, files: Vec<FileRef>) -> Self {
        self.files = if files.is_empty() { None } else { Some(files) };
        self
    }

    /// Record which message this one supersedes
    pub fn with_edited_from(mut self, edited_from: Option<usize>) -> Self {
        self.edited_from = edited_from;
        self
    }

    /// True for system messages synthesized from an uploaded file
    pub fn is_file_text(&self) -> bool {
        self.role == Role::System && self.content.starts_with(FILE_MARKER)
    }

    /// Flatten to the role/content pair sent to a provider
    pub fn to_provider_message(&self) -> Message {
        Message {
            role: self.role.as_str().to_string(),
            content: self.content.clone(),
        }
    }
}

/// A chat session owned by one user
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Chat {
    /// Unique chat identifier (ULID)
    pub id: String,
    /// Identity of the creating user
    pub owner_id: String,
    /// Display name
    pub name: String,
    #[serde(default)]
    pub pinned: bool,
    #[serde(default)]
    pub messages: Vec<ChatMessage>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Chat {
    /// Create an empty chat for `owner_id` with a fresh ULID
    pub fn new(owner_id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Ulid::new().to_string(),
            owner_id: owner_id.into(),
            name: DEFAULT_CHAT_NAME.to_string(),
            pinned: false,
            messages: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Bump `updated_at` to now
    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    /// Find the file-text system message with the given server file id
    pub fn file_message(&self, file_id: &str) -> Option<&ChatMessage> {
        self.messages
            .iter()
            .find(|m| m.is_file_text() && m.file_id.as_deref() == Some(file_id))
    }

    /// List-view projection
    pub fn summary(&self) -> ChatSummary {
        ChatSummary {
            id: self.id.clone(),
            name: self.name.clone(),
            pinned: self.pinned,
            message_count: self.messages.len(),
            updated_at: self.updated_at,
        }
    }
}

/// List-view projection of a chat
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatSummary {
    pub id: String,
    pub name: String,
    pub pinned: bool,
    pub message_count: usize,
    pub updated_at: DateTime<Utc>,
}

/// Current time as Unix milliseconds
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}
