//! Chat persistence
//!
//! One JSON document per chat in an embedded `sled` database, keyed by
//! `"{owner_id}/{chat_id}"` so every lookup is scoped to its owner.

use crate::error::{ParleyError, Result};
use anyhow::Context;
use sled::Db;
use std::path::Path;

pub mod types;
pub use types::{
    now_millis, Chat, ChatMessage, ChatSummary, FileRef, Role, DEFAULT_CHAT_NAME, FILE_MARKER,
};

/// Chat document store
///
/// Writes are per-document atomic. There is no optimistic concurrency
/// control: the last `save` of a chat wins.
#[derive(Clone)]
pub struct ChatStore {
    db: Db,
}

impl ChatStore {
    /// Open or create a chat store
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the database directory
    ///
    /// # Errors
    ///
    /// Returns `ParleyError::Storage` if the database cannot be opened
    ///
    /// # Examples
    ///
    /// ```
    /// use parley::storage::ChatStore;
    ///
    /// # fn main() -> parley::error::Result<()> {
    /// let dir = tempfile::tempdir()?;
    /// let store = ChatStore::new(dir.path().join("chats.db"))?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .context("Failed to create parent directory for database")
                .map_err(|e| ParleyError::Storage(e.to_string()))?;
        }

        let db = sled::open(path)
            .map_err(|e| ParleyError::Storage(format!("Failed to open database: {}", e)))?;
        tracing::debug!(path = %path.display(), "Opened chat store");
        Ok(Self { db })
    }

    fn key(owner_id: &str, chat_id: &str) -> String {
        format!("{}/{}", owner_id, chat_id)
    }

    /// Insert or replace a chat document
    ///
    /// # Errors
    ///
    /// Returns `ParleyError::Storage` if serialization or insertion fails
    pub fn save(&self, chat: &Chat) -> Result<()> {
        let key = Self::key(&chat.owner_id, &chat.id);
        let value = serde_json::to_vec(chat)
            .map_err(|e| ParleyError::Storage(format!("Serialization failed: {}", e)))?;

        self.db
            .insert(key.as_bytes(), value)
            .map_err(|e| ParleyError::Storage(format!("Insert failed: {}", e)))?;

        self.db
            .flush()
            .map_err(|e| ParleyError::Storage(format!("Flush failed: {}", e)))?;

        Ok(())
    }

    /// Retrieve one of `owner_id`'s chats
    ///
    /// # Returns
    ///
    /// Returns `None` when the chat does not exist or belongs to someone else
    ///
    /// # Errors
    ///
    /// Returns `ParleyError::Storage` if retrieval or deserialization fails
    pub fn get(&self, owner_id: &str, chat_id: &str) -> Result<Option<Chat>> {
        let key = Self::key(owner_id, chat_id);
        match self
            .db
            .get(key.as_bytes())
            .map_err(|e| ParleyError::Storage(format!("Get failed: {}", e)))?
        {
            Some(bytes) => {
                let chat: Chat = serde_json::from_slice(&bytes)
                    .map_err(|e| ParleyError::Storage(format!("Deserialization failed: {}", e)))?;
                Ok((chat.owner_id == owner_id).then_some(chat))
            }
            None => Ok(None),
        }
    }

    /// List every chat owned by `owner_id`, in key order
    ///
    /// # Errors
    ///
    /// Returns `ParleyError::Storage` if iteration or deserialization fails
    pub fn list(&self, owner_id: &str) -> Result<Vec<Chat>> {
        let prefix = format!("{}/", owner_id);
        let mut chats = Vec::new();
        for result in self.db.scan_prefix(prefix.as_bytes()) {
            let (_, value) =
                result.map_err(|e| ParleyError::Storage(format!("Iteration failed: {}", e)))?;

            let chat: Chat = serde_json::from_slice(&value)
                .map_err(|e| ParleyError::Storage(format!("Deserialization failed: {}", e)))?;

            // Owner ids containing '/' can share a prefix with another owner.
            if chat.owner_id == owner_id {
                chats.push(chat);
            }
        }

        Ok(chats)
    }

    /// Delete one chat
    ///
    /// # Returns
    ///
    /// Returns `true` if a chat was removed
    pub fn delete(&self, owner_id: &str, chat_id: &str) -> Result<bool> {
        if self.get(owner_id, chat_id)?.is_none() {
            return Ok(false);
        }

        let key = Self::key(owner_id, chat_id);
        self.db
            .remove(key.as_bytes())
            .map_err(|e| ParleyError::Storage(format!("Remove failed: {}", e)))?;
        self.db
            .flush()
            .map_err(|e| ParleyError::Storage(format!("Flush failed: {}", e)))?;
        Ok(true)
    }

    /// Delete every chat owned by `owner_id`
    ///
    /// # Returns
    ///
    /// Returns the number of chats removed
    pub fn clear(&self, owner_id: &str) -> Result<usize> {
        let chats = self.list(owner_id)?;
        let mut batch = sled::Batch::default();
        for chat in &chats {
            batch.remove(Self::key(owner_id, &chat.id).as_bytes());
        }

        self.db
            .apply_batch(batch)
            .map_err(|e| ParleyError::Storage(format!("Batch remove failed: {}", e)))?;
        self.db
            .flush()
            .map_err(|e| ParleyError::Storage(format!("Flush failed: {}", e)))?;

        Ok(chats.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn temp_store() -> (TempDir, ChatStore) {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let store = ChatStore::new(temp_dir.path().join("chats.db")).expect("Failed to open store");
        (temp_dir, store)
    }

    #[test]
    fn test_chat_store_new_creates_parent_dirs() {
        let temp_dir = TempDir::new().unwrap();
        let result = ChatStore::new(temp_dir.path().join("nested/dir/chats.db"));
        assert!(result.is_ok());
    }

    #[test]
    fn test_save_and_get() {
        let (_dir, store) = temp_store();
        let mut chat = Chat::new("alice");
        chat.messages.push(ChatMessage::user("hello"));
        store.save(&chat).unwrap();

        let loaded = store.get("alice", &chat.id).unwrap().unwrap();
        assert_eq!(loaded.id, chat.id);
        assert_eq!(loaded.messages, chat.messages);
    }

    #[test]
    fn test_get_is_scoped_to_owner() {
        let (_dir, store) = temp_store();
        let chat = Chat::new("alice");
        store.save(&chat).unwrap();

        assert!(store.get("bob", &chat.id).unwrap().is_none());
        assert!(store.get("alice", "missing").unwrap().is_none());
    }

    #[test]
    fn test_list_returns_only_owner_chats() {
        let (_dir, store) = temp_store();
        for _ in 0..3 {
            store.save(&Chat::new("alice")).unwrap();
        }
        store.save(&Chat::new("bob")).unwrap();
        store.save(&Chat::new("alice/extra")).unwrap();

        assert_eq!(store.list("alice").unwrap().len(), 3);
        assert_eq!(store.list("bob").unwrap().len(), 1);
        assert!(store.list("carol").unwrap().is_empty());
    }

    #[test]
    fn test_delete() {
        let (_dir, store) = temp_store();
        let chat = Chat::new("alice");
        store.save(&chat).unwrap();

        assert!(!store.delete("bob", &chat.id).unwrap());
        assert!(store.delete("alice", &chat.id).unwrap());
        assert!(store.get("alice", &chat.id).unwrap().is_none());
        assert!(!store.delete("alice", &chat.id).unwrap());
    }

    #[test]
    fn test_clear_removes_only_owner_chats() {
        let (_dir, store) = temp_store();
        store.save(&Chat::new("alice")).unwrap();
        store.save(&Chat::new("alice")).unwrap();
        store.save(&Chat::new("bob")).unwrap();

        assert_eq!(store.clear("alice").unwrap(), 2);
        assert!(store.list("alice").unwrap().is_empty());
        assert_eq!(store.list("bob").unwrap().len(), 1);
    }
}
