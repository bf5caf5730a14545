//! HTTP request handlers for the chat API

use std::sync::Arc;

use axum::extract::{Multipart, Path, State};
use axum::http::HeaderMap;
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::Instrument;

use super::AppState;
use crate::error::{ParleyError, Result};
use crate::extract::UploadedFile;
use crate::prompt::Mode;

/// Turn an operation result into the `{ success, ... }` body
fn respond(result: Result<Value>) -> Json<Value> {
    match result {
        Ok(body) => Json(body),
        Err(err) => {
            let message = client_message(&err);
            tracing::warn!("Request failed: {:#}", err);
            Json(json!({ "success": false, "error": message }))
        }
    }
}

/// Message shown to the client for a failed request
fn client_message(err: &anyhow::Error) -> String {
    match err.downcast_ref::<ParleyError>() {
        Some(ParleyError::NotFound(message)) | Some(ParleyError::Validation(message)) => {
            message.clone()
        }
        Some(other) => other.to_string(),
        None => err.to_string(),
    }
}

fn identify(state: &AppState, headers: &HeaderMap) -> Result<String> {
    state.identity.resolve(headers)
}

// -- /health --

pub(super) async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

// -- chat management --

pub(super) async fn create_chat(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Json<Value> {
    respond(create_chat_body(&state, &headers))
}

fn create_chat_body(state: &AppState, headers: &HeaderMap) -> Result<Value> {
    let user = identify(state, headers)?;
    let chat = state.service.create_chat(&user)?;
    Ok(json!({ "success": true, "data": chat }))
}

pub(super) async fn list_chats(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Json<Value> {
    respond(list_chats_body(&state, &headers))
}

fn list_chats_body(state: &AppState, headers: &HeaderMap) -> Result<Value> {
    let user = identify(state, headers)?;
    let chats = state.service.list_chats(&user)?;
    Ok(json!({ "success": true, "data": chats }))
}

pub(super) async fn get_chat(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(chat_id): Path<String>,
) -> Json<Value> {
    respond(get_chat_body(&state, &headers, &chat_id))
}

fn get_chat_body(state: &AppState, headers: &HeaderMap, chat_id: &str) -> Result<Value> {
    let user = identify(state, headers)?;
    let chat = state.service.get_chat(&user, chat_id)?;
    Ok(json!({ "success": true, "data": chat }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct RenameRequest {
    chat_id: String,
    name: String,
}

pub(super) async fn rename_chat(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<RenameRequest>,
) -> Json<Value> {
    respond(rename_chat_body(&state, &headers, &req))
}

fn rename_chat_body(state: &AppState, headers: &HeaderMap, req: &RenameRequest) -> Result<Value> {
    let user = identify(state, headers)?;
    state.service.rename_chat(&user, &req.chat_id, &req.name)?;
    Ok(json!({ "success": true, "message": "Chat renamed" }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct DeleteRequest {
    chat_id: String,
}

pub(super) async fn delete_chat(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<DeleteRequest>,
) -> Json<Value> {
    respond(delete_chat_body(&state, &headers, &req.chat_id))
}

fn delete_chat_body(state: &AppState, headers: &HeaderMap, chat_id: &str) -> Result<Value> {
    let user = identify(state, headers)?;
    state.service.delete_chat(&user, chat_id)?;
    Ok(json!({ "success": true, "message": "Chat deleted" }))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct PinRequest {
    #[serde(default)]
    action: Option<String>,
    #[serde(default)]
    chat_id: Option<String>,
    #[serde(default)]
    pin: Option<bool>,
}

/// Pin/unpin one chat, or `action: "clear"` to delete all of the caller's chats
pub(super) async fn pin(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<PinRequest>,
) -> Json<Value> {
    respond(pin_body(&state, &headers, &req))
}

fn pin_body(state: &AppState, headers: &HeaderMap, req: &PinRequest) -> Result<Value> {
    let user = identify(state, headers)?;
    if req.action.as_deref() == Some("clear") {
        let removed = state.service.clear_all_chats(&user)?;
        return Ok(json!({ "success": true, "removed": removed }));
    }

    let chat_id = req
        .chat_id
        .as_deref()
        .ok_or_else(|| ParleyError::Validation("chatId is required".to_string()))?;
    state
        .service
        .set_pin(&user, chat_id, req.pin.unwrap_or(false))?;
    Ok(json!({ "success": true }))
}

// -- prompting --

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct AiRequest {
    chat_id: String,
    prompt: String,
    #[serde(default)]
    mode: Option<String>,
    #[serde(default)]
    edited_from: Option<usize>,
}

pub(super) async fn submit_prompt(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<AiRequest>,
) -> Json<Value> {
    let span = tracing::info_span!("chat_ai", chat_id = %req.chat_id, mode = ?req.mode);
    respond(submit_prompt_body(&state, &headers, req).instrument(span).await)
}

async fn submit_prompt_body(state: &AppState, headers: &HeaderMap, req: AiRequest) -> Result<Value> {
    let user = identify(state, headers)?;
    let mode = Mode::parse_optional(req.mode.as_deref())?;
    let outcome = state
        .service
        .submit_prompt(&user, &req.chat_id, &req.prompt, mode, req.edited_from)
        .await?;
    Ok(json!({
        "success": true,
        "model": outcome.model,
        "answer": outcome.answer,
        "data": outcome.message,
    }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct RegenerateRequest {
    chat_id: String,
    index: usize,
    #[serde(default)]
    mode: Option<String>,
}

pub(super) async fn regenerate(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<RegenerateRequest>,
) -> Json<Value> {
    let span = tracing::info_span!("chat_regenerate", chat_id = %req.chat_id, index = req.index);
    respond(regenerate_body(&state, &headers, req).instrument(span).await)
}

async fn regenerate_body(
    state: &AppState,
    headers: &HeaderMap,
    req: RegenerateRequest,
) -> Result<Value> {
    let user = identify(state, headers)?;
    let mode = Mode::parse_optional(req.mode.as_deref())?;
    let outcome = state
        .service
        .regenerate(&user, &req.chat_id, req.index, mode)
        .await?;
    Ok(json!({
        "success": true,
        "answer": outcome.answer,
        "data": outcome.message,
        "promptIndex": outcome.prompt_index,
        "fileIds": outcome.file_ids,
    }))
}

/// Fields collected from an upload form
#[derive(Debug, Default)]
struct UploadForm {
    chat_id: Option<String>,
    prompt: Option<String>,
    mode: Option<String>,
    edited_from: Option<usize>,
    files: Vec<UploadedFile>,
}

async fn read_upload_form(mut multipart: Multipart) -> Result<UploadForm> {
    let mut form = UploadForm::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ParleyError::Validation(format!("Malformed multipart body: {}", e)))?
    {
        let name = field.name().unwrap_or_default().to_string();
        if name == "file" {
            let file_name = field.file_name().unwrap_or("upload").to_string();
            let mime_type = field
                .content_type()
                .unwrap_or("application/octet-stream")
                .to_string();
            let bytes = field.bytes().await.map_err(|e| {
                ParleyError::Validation(format!("Failed to read file {}: {}", file_name, e))
            })?;
            form.files.push(UploadedFile::new(file_name, mime_type, bytes));
            continue;
        }

        let text = field.text().await.map_err(|e| {
            ParleyError::Validation(format!("Failed to read field {}: {}", name, e))
        })?;
        match name.as_str() {
            "chatId" => form.chat_id = Some(text),
            "prompt" => form.prompt = Some(text),
            "mode" => form.mode = Some(text),
            "editedFrom" => {
                let index = text
                    .trim()
                    .parse()
                    .map_err(|_| ParleyError::Validation(format!("Invalid editedFrom: {}", text)))?;
                form.edited_from = Some(index);
            }
            other => tracing::debug!(field = other, "Ignoring unknown upload field"),
        }
    }

    Ok(form)
}

pub(super) async fn upload(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    multipart: Multipart,
) -> Json<Value> {
    respond(upload_body(&state, &headers, multipart).await)
}

async fn upload_body(state: &AppState, headers: &HeaderMap, multipart: Multipart) -> Result<Value> {
    let user = identify(state, headers)?;
    let form = read_upload_form(multipart).await?;
    let chat_id = form
        .chat_id
        .ok_or_else(|| ParleyError::Validation("chatId is required".to_string()))?;
    let mode = Mode::parse_optional(form.mode.as_deref())?;

    let outcome = state
        .service
        .upload_and_submit(
            &user,
            &chat_id,
            form.prompt.as_deref(),
            mode,
            form.files,
            form.edited_from,
        )
        .instrument(tracing::info_span!("chat_upload", chat_id = %chat_id, %mode))
        .await?;

    Ok(json!({
        "success": true,
        "answer": outcome.answer,
        "data": {
            "fileIds": outcome.file_ids,
            "skipped": outcome.skipped,
            "message": outcome.message,
        },
    }))
}
