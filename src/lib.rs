//! Parley - chat web service library
//!
//! Multi-user chat over a single LLM completion provider, with three
//! prompting modes, document upload and summarization, web-search
//! augmentation and non-destructive answer regeneration.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//!
//! - `service`: Chat operations (create, list, prompt, upload, regenerate)
//! - `server`: axum router and request handlers
//! - `prompt`: Mode directives and completion request assembly
//! - `providers`: Completion provider abstraction (OpenAI-compatible, Ollama)
//! - `search`: Web search provider abstraction (Serper)
//! - `extract`: Text extraction from uploaded documents
//! - `storage`: sled-backed chat document store
//! - `auth`: Caller identity resolution
//! - `config`: Configuration management and validation
//! - `error`: Error types and result aliases
//! - `cli`: Command-line interface definition
//!
//! # Example
//!
//! ```no_run
//! use parley::cli::Cli;
//! use parley::{ChatService, Config, Mode};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let cli: Cli = clap::Parser::parse_from(["parley", "serve"]);
//!     let config = Config::load("config/config.yaml", &cli)?;
//!     config.validate()?;
//!
//!     let service = ChatService::from_config(&config)?;
//!     let chat = service.create_chat("alice")?;
//!     let outcome = service
//!         .submit_prompt("alice", &chat.id, "Hello!", Mode::Normal, None)
//!         .await?;
//!     println!("{}", outcome.answer);
//!     Ok(())
//! }
//! ```

pub mod auth;
pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod extract;
pub mod prompt;
pub mod providers;
pub mod search;
pub mod server;
pub mod service;
pub mod storage;

// Re-export commonly used types
pub use config::Config;
pub use error::{ParleyError, Result};
pub use prompt::Mode;
pub use service::ChatService;
pub use storage::{Chat, ChatMessage, ChatStore};

#[cfg(test)]
pub mod test_utils;
