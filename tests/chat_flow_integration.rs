//! End-to-end chat flows against mocked completion and search endpoints

mod common;

use common::{completion_requests, mount_completion, service_against};
use parley::storage::Role;
use parley::Mode;
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn test_normal_prompt_sends_history_directive_then_prompt() {
    let server = MockServer::start().await;
    mount_completion(&server, "Paris").await;
    let (_dir, service) = service_against(&server);

    let chat = service.create_chat("alice").unwrap();
    service
        .submit_prompt("alice", &chat.id, "Capital of France?", Mode::Normal, None)
        .await
        .unwrap();
    let outcome = service
        .submit_prompt("alice", &chat.id, "And of Spain?", Mode::Normal, None)
        .await
        .unwrap();

    assert_eq!(outcome.answer, "Paris");
    assert_eq!(outcome.model.as_deref(), Some("deepseek-chat"));

    let requests = completion_requests(&server).await;
    assert_eq!(requests.len(), 2);

    let second = &requests[1];
    let roles: Vec<&str> = second.iter().map(|m| m["role"].as_str().unwrap()).collect();
    assert_eq!(roles, ["user", "assistant", "system", "user"]);
    assert_eq!(second[0]["content"], "Capital of France?");
    assert_eq!(second[3]["content"], "And of Spain?");

    let stored = service.get_chat("alice", &chat.id).unwrap();
    assert_eq!(stored.messages.len(), 4);
}

#[tokio::test]
async fn test_search_mode_injects_serper_results() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/search"))
        .and(header("x-api-key", "serper-test"))
        .and(body_json(json!({"q": "latest rust release"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "organic": [
                {"title": "Rust Blog", "link": "https://blog.rust-lang.org", "snippet": "Rust 1.80 released"}
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;
    mount_completion(&server, "Rust 1.80").await;
    let (_dir, service) = service_against(&server);

    let chat = service.create_chat("alice").unwrap();
    service
        .submit_prompt("alice", &chat.id, "latest rust release", Mode::Search, None)
        .await
        .unwrap();

    let request = completion_requests(&server).await.remove(0);
    let directive = request[0]["content"].as_str().unwrap();
    assert_eq!(request[0]["role"], "system");
    assert!(directive.contains("Rust Blog"));
    assert!(directive.contains("https://blog.rust-lang.org"));
    assert!(directive.contains("Rust 1.80 released"));
}

#[tokio::test]
async fn test_search_failure_leaves_chat_untouched() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/search"))
        .respond_with(ResponseTemplate::new(500).set_body_string("quota exceeded"))
        .mount(&server)
        .await;
    mount_completion(&server, "unused").await;
    let (_dir, service) = service_against(&server);

    let chat = service.create_chat("alice").unwrap();
    let err = service
        .submit_prompt("alice", &chat.id, "news", Mode::Search, None)
        .await
        .unwrap_err();
    assert!(err.to_string().contains("Serper error 500"));

    assert!(completion_requests(&server).await.is_empty());
    assert!(service.get_chat("alice", &chat.id).unwrap().messages.is_empty());
}

#[tokio::test]
async fn test_upstream_failure_marks_prompt_unanswered() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
        .mount(&server)
        .await;
    let (_dir, service) = service_against(&server);

    let chat = service.create_chat("alice").unwrap();
    let err = service
        .submit_prompt("alice", &chat.id, "hello", Mode::Normal, None)
        .await
        .unwrap_err();
    assert!(err.to_string().contains("503"));

    let stored = service.get_chat("alice", &chat.id).unwrap();
    assert_eq!(stored.messages.len(), 1);
    assert_eq!(stored.messages[0].role, Role::User);
    assert!(stored.messages[0].unanswered);
}

#[tokio::test]
async fn test_regenerate_appends_labelled_pair() {
    let server = MockServer::start().await;
    mount_completion(&server, "42").await;
    let (_dir, service) = service_against(&server);

    let chat = service.create_chat("alice").unwrap();
    service
        .submit_prompt("alice", &chat.id, "Meaning of life?", Mode::Normal, None)
        .await
        .unwrap();

    let outcome = service
        .regenerate("alice", &chat.id, 1, Mode::DeepThink)
        .await
        .unwrap();
    assert_eq!(outcome.answer, "[DeepThink] 42");
    assert_eq!(outcome.prompt_index, 0);

    let stored = service.get_chat("alice", &chat.id).unwrap();
    let contents: Vec<&str> = stored.messages.iter().map(|m| m.content.as_str()).collect();
    assert_eq!(
        contents,
        ["Meaning of life?", "42", "Meaning of life?", "[DeepThink] 42"]
    );

    let request = completion_requests(&server).await.pop().unwrap();
    let directive = request[request.len() - 2]["content"].as_str().unwrap();
    assert!(directive.contains("deepseek-chat"));
}

#[tokio::test]
async fn test_chats_are_isolated_per_user() {
    let server = MockServer::start().await;
    mount_completion(&server, "hi").await;
    let (_dir, service) = service_against(&server);

    let chat = service.create_chat("alice").unwrap();
    let err = service
        .submit_prompt("bob", &chat.id, "let me in", Mode::Normal, None)
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "Chat not found");
    assert!(service.list_chats("bob").unwrap().is_empty());
    assert!(completion_requests(&server).await.is_empty());
}
