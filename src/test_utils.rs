//! Test utilities for Parley
//!
//! Scripted fakes for the completion and search providers, plus helpers for
//! temporary chat stores and error assertions.

use crate::config::ExtractionConfig;
use crate::error::{ParleyError, Result};
use crate::extract::DocumentExtractor;
use crate::providers::{CompletionResponse, Message, Provider};
use crate::search::{SearchProvider, SearchSnippet};
use crate::service::ChatService;
use crate::storage::ChatStore;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

/// Create a temporary directory for testing
pub fn temp_dir() -> TempDir {
    TempDir::new().expect("Failed to create temporary directory")
}

/// Open a chat store inside a fresh temporary directory
///
/// The directory must outlive the store, so both are returned.
pub fn temp_store() -> (TempDir, ChatStore) {
    let dir = temp_dir();
    let store = ChatStore::new(dir.path().join("chats.db")).expect("Failed to open chat store");
    (dir, store)
}

/// Assert that an error's display contains the expected message
///
/// # Panics
///
/// Panics if the result is Ok or if the error doesn't contain the expected message
pub fn assert_error_contains<T: std::fmt::Debug>(result: Result<T>, expected: &str) {
    match result {
        Ok(value) => panic!("Expected error containing '{}', got Ok({:?})", expected, value),
        Err(e) => {
            let message = e.to_string();
            assert!(
                message.contains(expected),
                "Expected error containing '{}', got '{}'",
                expected,
                message
            );
        }
    }
}

/// Completion provider that replays scripted replies and records requests
#[derive(Default)]
pub struct ScriptedProvider {
    replies: Mutex<VecDeque<Result<String>>>,
    requests: Mutex<Vec<Vec<Message>>>,
    missing_credential: bool,
}

impl ScriptedProvider {
    /// Provider that answers "answer 1", "answer 2", ... once its script runs out
    pub fn new() -> Self {
        Self::default()
    }

    /// Provider whose credential is missing; `ensure_configured` fails
    pub fn unconfigured() -> Self {
        Self {
            missing_credential: true,
            ..Self::default()
        }
    }

    /// Queue a successful reply
    pub fn reply(self, content: &str) -> Self {
        self.push(Ok(content.to_string()));
        self
    }

    /// Queue a failed completion
    pub fn fail(self, message: &str) -> Self {
        self.push(Err(ParleyError::Provider(message.to_string()).into()));
        self
    }

    fn push(&self, reply: Result<String>) {
        self.replies
            .lock()
            .expect("replies lock poisoned")
            .push_back(reply);
    }

    /// Every message list sent so far, oldest first
    pub fn requests(&self) -> Vec<Vec<Message>> {
        self.requests.lock().expect("requests lock poisoned").clone()
    }

    /// The most recent message list sent
    pub fn last_request(&self) -> Vec<Message> {
        self.requests().pop().expect("no completion requests recorded")
    }
}

#[async_trait]
impl Provider for ScriptedProvider {
    async fn complete(&self, messages: &[Message]) -> Result<CompletionResponse> {
        let count = {
            let mut requests = self.requests.lock().expect("requests lock poisoned");
            requests.push(messages.to_vec());
            requests.len()
        };

        let reply = self
            .replies
            .lock()
            .expect("replies lock poisoned")
            .pop_front()
            .unwrap_or_else(|| Ok(format!("answer {}", count)));

        reply.map(|content| {
            CompletionResponse::new(Message::assistant(content)).with_model("scripted-model")
        })
    }

    fn ensure_configured(&self) -> Result<()> {
        if self.missing_credential {
            return Err(
                ParleyError::Config("Missing API key for completion provider".to_string()).into(),
            );
        }
        Ok(())
    }

    fn get_current_model(&self) -> Result<String> {
        Ok("scripted-model".to_string())
    }
}

/// Search provider returning a fixed result set
pub struct StaticSearch {
    results: Option<Vec<SearchSnippet>>,
    queries: Mutex<Vec<String>>,
}

impl StaticSearch {
    /// Search provider with no credential configured
    pub fn unconfigured() -> Self {
        Self {
            results: None,
            queries: Mutex::new(Vec::new()),
        }
    }

    /// Queries received so far
    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().expect("queries lock poisoned").clone()
    }
}

impl Default for StaticSearch {
    fn default() -> Self {
        Self {
            results: Some(vec![SearchSnippet {
                title: "Example".to_string(),
                url: "https://example.com".to_string(),
                snippet: "An example result".to_string(),
            }]),
            queries: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl SearchProvider for StaticSearch {
    async fn search(&self, query: &str) -> Result<Vec<SearchSnippet>> {
        self.queries
            .lock()
            .expect("queries lock poisoned")
            .push(query.to_string());
        self.results
            .clone()
            .ok_or_else(|| ParleyError::Config("SERPER_API_KEY missing".to_string()).into())
    }
}

/// Chat service wired to the given fakes and a temporary store
pub fn test_service(
    provider: Arc<ScriptedProvider>,
    search: Arc<StaticSearch>,
) -> (TempDir, ChatService) {
    let (dir, store) = temp_store();
    let service = ChatService::new(
        store,
        provider,
        search,
        Arc::new(DocumentExtractor::default()),
        ExtractionConfig::default(),
    );
    (dir, service)
}
