use parley::config::{ExtractionConfig, OpenAiConfig, SearchConfig};
use parley::extract::DocumentExtractor;
use parley::providers::OpenAiProvider;
use parley::search::SerperSearch;
use parley::service::ChatService;
use parley::storage::ChatStore;
use serde_json::{json, Value};
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[allow(dead_code)]
pub fn temp_config_file(contents: &str) -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().expect("failed to create tempdir");
    let config_path = temp_dir.path().join("config.yaml");
    fs::write(&config_path, contents).expect("failed to write config file");
    (temp_dir, config_path)
}

/// Service wired to real HTTP clients pointed at `server`
///
/// Completions are served from `/chat/completions`, search from `/search`.
#[allow(dead_code)]
pub fn service_against(server: &MockServer) -> (TempDir, ChatService) {
    let dir = TempDir::new().expect("failed to create tempdir");
    let store = ChatStore::new(dir.path().join("chats.db")).expect("failed to open store");

    let provider = OpenAiProvider::new(OpenAiConfig {
        api_base: server.uri(),
        model: "deepseek-chat".to_string(),
        api_key: Some("sk-test".to_string()),
        timeout_seconds: 5,
    })
    .expect("failed to build provider");

    let search = SerperSearch::new(SearchConfig {
        api_base: server.uri(),
        api_key: Some("serper-test".to_string()),
        max_results: 5,
    })
    .expect("failed to build search client");

    let service = ChatService::new(
        store,
        Arc::new(provider),
        Arc::new(search),
        Arc::new(DocumentExtractor::default()),
        ExtractionConfig::default(),
    );
    (dir, service)
}

/// Body of a successful chat completion
#[allow(dead_code)]
pub fn completion_body(content: &str) -> Value {
    json!({
        "id": "cmpl-test",
        "model": "deepseek-chat",
        "choices": [{
            "index": 0,
            "message": {"role": "assistant", "content": content},
            "finish_reason": "stop"
        }],
        "usage": {"prompt_tokens": 10, "completion_tokens": 3, "total_tokens": 13}
    })
}

/// Answer every completion request with `content`
#[allow(dead_code)]
pub async fn mount_completion(server: &MockServer, content: &str) {
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion_body(content)))
        .mount(server)
        .await;
}

/// Message lists sent to the completion endpoint, oldest first
#[allow(dead_code)]
pub async fn completion_requests(server: &MockServer) -> Vec<Vec<Value>> {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter(|r| r.url.path() == "/chat/completions")
        .map(|r| {
            let body: Value = serde_json::from_slice(&r.body).expect("request body is JSON");
            body["messages"]
                .as_array()
                .cloned()
                .expect("messages array")
        })
        .collect()
}
