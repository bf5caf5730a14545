//! Chat service
//!
//! Orchestrates every chat operation: load the chat, assemble the
//! completion request, call the provider, append to history and persist.
//!
//! Mutation rules shared by all submitting operations:
//!
//! - credential, search and validation failures happen before any write;
//! - a failed completion keeps the user message, flags it `unanswered`
//!   and persists the chat before returning the error;
//! - a successful completion appends exactly one assistant message.

use crate::config::{Config, ExtractionConfig};
use crate::error::{ParleyError, Result};
use crate::extract::{prepare_file, DocumentExtractor, PreparedFile, TextExtractor, UploadedFile};
use crate::prompt::regenerate::{
    label_answer, resolve_file_messages, resolve_prompt, REGENERATING_PLACEHOLDER,
};
use crate::prompt::{assemble_file_batch, assemble_plain, assemble_with_files, Mode, PromptAssembler};
use crate::providers::{create_provider, CompletionResponse, Message, Provider};
use crate::search::{SearchProvider, SerperSearch};
use crate::storage::{now_millis, Chat, ChatMessage, ChatStore, ChatSummary};
use serde::Serialize;
use std::sync::Arc;

/// Result of a plain prompt submission
#[derive(Debug, Clone)]
pub struct SubmitOutcome {
    pub answer: String,
    /// The appended assistant message
    pub message: ChatMessage,
    /// Model reported by the provider
    pub model: Option<String>,
}

/// An uploaded file left out of the batch
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedFile {
    pub name: String,
    pub reason: String,
}

/// Result of a file upload, with or without a prompt
#[derive(Debug, Clone)]
pub struct UploadOutcome {
    /// Empty when no prompt was given
    pub answer: String,
    /// Server file ids of the extracted files, in input order
    pub file_ids: Vec<String>,
    pub skipped: Vec<SkippedFile>,
    /// The appended assistant message when a prompt was answered
    pub message: Option<ChatMessage>,
}

/// Result of a regeneration
#[derive(Debug, Clone)]
pub struct RegenerateOutcome {
    /// Answer with its mode tag applied
    pub answer: String,
    /// The assistant message that replaced the placeholder
    pub message: ChatMessage,
    /// Index of the original user message that was re-issued
    pub prompt_index: usize,
    /// Server file ids resolved for the re-issued prompt
    pub file_ids: Vec<String>,
}

/// Chat operations over a store and a single completion provider
pub struct ChatService {
    store: ChatStore,
    provider: Arc<dyn Provider>,
    assembler: PromptAssembler,
    extractor: Arc<dyn TextExtractor>,
    limits: ExtractionConfig,
}

impl ChatService {
    /// Create a service from its collaborators
    pub fn new(
        store: ChatStore,
        provider: Arc<dyn Provider>,
        search: Arc<dyn SearchProvider>,
        extractor: Arc<dyn TextExtractor>,
        limits: ExtractionConfig,
    ) -> Self {
        let model_name = provider
            .get_current_model()
            .unwrap_or_else(|_| "unknown".to_string());
        Self {
            store,
            provider,
            assembler: PromptAssembler::new(search, model_name),
            extractor,
            limits,
        }
    }

    /// Build the service described by `config`
    ///
    /// # Errors
    ///
    /// Returns error if the store cannot be opened or a client cannot be built
    pub fn from_config(config: &Config) -> Result<Self> {
        let store = ChatStore::new(config.storage.resolve_path()?)?;
        let provider = create_provider(&config.provider.provider_type, &config.provider)?;
        let search = Arc::new(SerperSearch::new(config.search.clone())?);
        let extractor = Arc::new(DocumentExtractor::new(config.extraction.csv_max_rows));

        Ok(Self::new(store, provider, search, extractor, config.extraction))
    }

    /// Underlying chat store
    pub fn store(&self) -> &ChatStore {
        &self.store
    }

    fn load(&self, user: &str, chat_id: &str) -> Result<Chat> {
        self.store
            .get(user, chat_id)?
            .ok_or_else(|| ParleyError::chat_not_found().into())
    }

    fn check_edited_from(chat: &Chat, edited_from: Option<usize>) -> Result<()> {
        match edited_from {
            Some(index) if index >= chat.messages.len() => Err(ParleyError::Validation(format!(
                "editedFrom {} is out of range",
                index
            ))
            .into()),
            _ => Ok(()),
        }
    }

    /// Call the provider, rejecting empty answers
    async fn complete(&self, messages: &[Message]) -> Result<CompletionResponse> {
        tracing::debug!(messages = messages.len(), "Requesting completion");
        let response = self.provider.complete(messages).await?;
        if response.message.content.trim().is_empty() {
            return Err(ParleyError::Provider("No content returned".to_string()).into());
        }
        if let Some(usage) = response.usage {
            tracing::debug!(
                prompt_tokens = usage.prompt_tokens,
                completion_tokens = usage.completion_tokens,
                "Completion finished"
            );
        }
        Ok(response)
    }

    /// Flag the user message at `index` unanswered and persist
    fn persist_unanswered(&self, chat: &mut Chat, index: usize, error: &anyhow::Error) -> Result<()> {
        tracing::error!(chat_id = %chat.id, "Completion failed: {}", error);
        if let Some(message) = chat.messages.get_mut(index) {
            message.unanswered = true;
        }
        chat.touch();
        self.store.save(chat)
    }

    /// Create an empty chat for `user`
    pub fn create_chat(&self, user: &str) -> Result<Chat> {
        let chat = Chat::new(user);
        self.store.save(&chat)?;
        tracing::info!(chat_id = %chat.id, "Created chat");
        Ok(chat)
    }

    /// List `user`'s chats: pinned first, then most recently updated
    pub fn list_chats(&self, user: &str) -> Result<Vec<ChatSummary>> {
        let mut summaries: Vec<ChatSummary> =
            self.store.list(user)?.iter().map(Chat::summary).collect();
        summaries.sort_by(|a, b| {
            b.pinned
                .cmp(&a.pinned)
                .then_with(|| b.updated_at.cmp(&a.updated_at))
        });
        Ok(summaries)
    }

    /// Fetch one of `user`'s chats
    ///
    /// # Errors
    ///
    /// Returns `ParleyError::NotFound` if the chat is absent or not owned by `user`
    pub fn get_chat(&self, user: &str, chat_id: &str) -> Result<Chat> {
        self.load(user, chat_id)
    }

    /// Rename a chat
    pub fn rename_chat(&self, user: &str, chat_id: &str, name: &str) -> Result<Chat> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ParleyError::Validation("Chat name cannot be empty".to_string()).into());
        }
        let mut chat = self.load(user, chat_id)?;
        chat.name = name.to_string();
        chat.touch();
        self.store.save(&chat)?;
        Ok(chat)
    }

    /// Delete a chat
    pub fn delete_chat(&self, user: &str, chat_id: &str) -> Result<()> {
        if !self.store.delete(user, chat_id)? {
            return Err(ParleyError::chat_not_found().into());
        }
        tracing::info!(chat_id, "Deleted chat");
        Ok(())
    }

    /// Pin or unpin a chat
    pub fn set_pin(&self, user: &str, chat_id: &str, pinned: bool) -> Result<()> {
        let mut chat = self.load(user, chat_id)?;
        chat.pinned = pinned;
        self.store.save(&chat)
    }

    /// Delete every chat owned by `user`
    ///
    /// # Returns
    ///
    /// Returns the number of chats removed
    pub fn clear_all_chats(&self, user: &str) -> Result<usize> {
        let removed = self.store.clear(user)?;
        tracing::info!(removed, "Cleared chat history");
        Ok(removed)
    }

    /// Submit a text prompt
    ///
    /// Sends the full history, the mode directive and the prompt, then
    /// appends the user message and the assistant answer.
    ///
    /// # Errors
    ///
    /// - `ParleyError::Validation` for an empty prompt or bad `edited_from`
    /// - `ParleyError::NotFound` if the chat does not belong to `user`
    /// - `ParleyError::Config` for a missing completion credential, before any write
    /// - search and provider errors from the assembly and completion calls
    pub async fn submit_prompt(
        &self,
        user: &str,
        chat_id: &str,
        prompt: &str,
        mode: Mode,
        edited_from: Option<usize>,
    ) -> Result<SubmitOutcome> {
        let prompt = prompt.trim();
        if prompt.is_empty() {
            return Err(ParleyError::Validation("Prompt is required".to_string()).into());
        }

        let mut chat = self.load(user, chat_id)?;
        Self::check_edited_from(&chat, edited_from)?;

        self.provider.ensure_configured()?;
        let directive = self.assembler.directive(mode, prompt).await?;
        let request = assemble_plain(&chat.messages, &directive, prompt);

        chat.messages
            .push(ChatMessage::user(prompt).with_edited_from(edited_from));
        let user_index = chat.messages.len() - 1;

        let response = match self.complete(&request).await {
            Ok(response) => response,
            Err(e) => {
                self.persist_unanswered(&mut chat, user_index, &e)?;
                return Err(e);
            }
        };

        let message = ChatMessage::assistant(response.message.content.clone());
        chat.messages.push(message.clone());
        chat.touch();
        self.store.save(&chat)?;

        tracing::info!(chat_id, %mode, messages = chat.messages.len(), "Prompt answered");
        Ok(SubmitOutcome {
            answer: message.content.clone(),
            message,
            model: response.model,
        })
    }

    /// Extract every upload in input order
    async fn prepare_uploads(
        &self,
        files: Vec<UploadedFile>,
    ) -> (Vec<PreparedFile>, Vec<SkippedFile>) {
        let mut prepared = Vec::new();
        let mut skipped = Vec::new();

        for file in files {
            let name = file.name.clone();
            let extractor = Arc::clone(&self.extractor);
            let limits = self.limits;

            let outcome =
                tokio::task::spawn_blocking(move || prepare_file(extractor.as_ref(), &file, &limits))
                    .await
                    .unwrap_or_else(|e| {
                        Err(ParleyError::Extraction(format!("Extraction task failed: {}", e)).into())
                    });

            match outcome {
                Ok(Some(file)) => prepared.push(file),
                Ok(None) => skipped.push(SkippedFile {
                    name,
                    reason: format!("File exceeds {} bytes", self.limits.max_file_bytes),
                }),
                Err(e) => {
                    tracing::warn!(file = %name, "Skipping file: {}", e);
                    skipped.push(SkippedFile {
                        name,
                        reason: e.to_string(),
                    });
                }
            }
        }

        (prepared, skipped)
    }

    /// Upload files, optionally with a prompt about them
    ///
    /// Each extracted file becomes a `[FILE]` system message. With a prompt,
    /// only this batch's file messages, the directive and the prompt are sent
    /// and the answer is appended; without one, only the file messages are
    /// stored and the answer is empty.
    ///
    /// # Errors
    ///
    /// - `ParleyError::Validation` ("No file") when `files` is empty
    /// - `ParleyError::NotFound` if the chat does not belong to `user`
    /// - `ParleyError::Config` for a missing completion credential when a prompt is present
    /// - search and provider errors when a prompt is present
    pub async fn upload_and_submit(
        &self,
        user: &str,
        chat_id: &str,
        prompt: Option<&str>,
        mode: Mode,
        files: Vec<UploadedFile>,
        edited_from: Option<usize>,
    ) -> Result<UploadOutcome> {
        if files.is_empty() {
            return Err(ParleyError::Validation("No file".to_string()).into());
        }

        let mut chat = self.load(user, chat_id)?;
        Self::check_edited_from(&chat, edited_from)?;

        let prompt = prompt.map(str::trim).filter(|p| !p.is_empty());
        let directive = match prompt {
            Some(p) => {
                self.provider.ensure_configured()?;
                Some(self.assembler.directive(mode, p).await?)
            }
            None => None,
        };

        let (prepared, skipped) = self.prepare_uploads(files).await;
        let batch = assemble_file_batch(&prepared);
        let file_ids = batch.file_ids();
        chat.messages.extend(batch.file_messages.iter().cloned());

        let (Some(prompt), Some(directive)) = (prompt, directive) else {
            chat.touch();
            self.store.save(&chat)?;
            tracing::info!(chat_id, files = file_ids.len(), skipped = skipped.len(), "Files stored");
            return Ok(UploadOutcome {
                answer: String::new(),
                file_ids,
                skipped,
                message: None,
            });
        };

        let request = assemble_with_files(&batch.file_messages, &directive, prompt);
        chat.messages.push(
            ChatMessage::user(prompt)
                .with_files(batch.file_refs)
                .with_edited_from(edited_from),
        );
        let user_index = chat.messages.len() - 1;

        let response = match self.complete(&request).await {
            Ok(response) => response,
            Err(e) => {
                self.persist_unanswered(&mut chat, user_index, &e)?;
                return Err(e);
            }
        };

        let message = ChatMessage::assistant(response.message.content);
        chat.messages.push(message.clone());
        chat.touch();
        self.store.save(&chat)?;

        tracing::info!(chat_id, %mode, files = file_ids.len(), "File prompt answered");
        Ok(UploadOutcome {
            answer: message.content.clone(),
            file_ids,
            skipped,
            message: Some(message),
        })
    }

    /// Re-issue the user prompt preceding `index` and append a new answer
    ///
    /// The original messages are never edited; history grows by exactly two
    /// messages on success.
    ///
    /// # Errors
    ///
    /// - `ParleyError::PromptNotFound` when no user message precedes `index`
    /// - `ParleyError::NotFound` if the chat does not belong to `user`
    /// - `ParleyError::Config` for a missing completion credential, before any write
    /// - search and provider errors from the assembly and completion calls
    pub async fn regenerate(
        &self,
        user: &str,
        chat_id: &str,
        index: usize,
        mode: Mode,
    ) -> Result<RegenerateOutcome> {
        let mut chat = self.load(user, chat_id)?;
        let resolved = resolve_prompt(&chat.messages, index)?;
        tracing::debug!(chat_id, prompt_index = resolved.index, %mode, "Regenerating");

        self.provider.ensure_configured()?;
        let directive = self.assembler.directive(mode, &resolved.content).await?;

        let (request, files, file_ids) = if resolved.files.is_empty() {
            let request = assemble_plain(&chat.messages, &directive, &resolved.content);
            (request, Vec::new(), Vec::new())
        } else {
            let (file_messages, files) = resolve_file_messages(&chat, &resolved.files);
            // No file text left to send: fall back to the full history
            let request = if file_messages.is_empty() {
                assemble_plain(&chat.messages, &directive, &resolved.content)
            } else {
                assemble_with_files(&file_messages, &directive, &resolved.content)
            };
            let file_ids = file_messages
                .iter()
                .filter_map(|m| m.file_id.clone())
                .collect();
            (request, files, file_ids)
        };

        chat.messages.push(
            ChatMessage::user(resolved.content.clone()).with_files(files),
        );
        let user_index = chat.messages.len() - 1;
        chat.messages
            .push(ChatMessage::assistant(REGENERATING_PLACEHOLDER));
        let placeholder_index = user_index + 1;
        chat.touch();
        self.store.save(&chat)?;

        let response = match self.complete(&request).await {
            Ok(response) => response,
            Err(e) => {
                chat.messages.truncate(placeholder_index);
                self.persist_unanswered(&mut chat, user_index, &e)?;
                return Err(e);
            }
        };

        let answer = label_answer(mode, &response.message.content);
        let placeholder = &mut chat.messages[placeholder_index];
        placeholder.content = answer.clone();
        placeholder.timestamp = now_millis();
        let message = placeholder.clone();
        chat.touch();
        self.store.save(&chat)?;

        tracing::info!(chat_id, %mode, "Regenerated answer");
        Ok(RegenerateOutcome {
            answer,
            message,
            prompt_index: resolved.index,
            file_ids,
        })
    }
}
