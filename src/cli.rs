//! Command-line interface definition for Parley
//!
//! This module defines the CLI structure using clap's derive API:
//! a `serve` command for the HTTP service and `history` commands for
//! inspecting and pruning a user's stored chats.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Parley - chat service with prompt modes, file summaries and web search
#[derive(Parser, Debug, Clone)]
#[command(name = "parley")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config/config.yaml")]
    pub config: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Override the chat database location
    #[arg(long, env = "PARLEY_STORAGE_PATH")]
    pub storage_path: Option<PathBuf>,

    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands for Parley
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Start the HTTP service
    Serve {
        /// Address to listen on, overriding the configured one
        #[arg(short, long)]
        bind: Option<String>,
    },

    /// Inspect or prune stored chats
    History {
        /// History subcommand
        #[command(subcommand)]
        command: HistoryCommand,
    },
}

/// History management subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum HistoryCommand {
    /// List a user's chats
    List {
        /// Owner of the chats
        #[arg(short, long)]
        user: String,
    },

    /// Delete one chat
    Delete {
        /// Owner of the chat
        #[arg(short, long)]
        user: String,

        /// Chat id
        chat_id: String,
    },

    /// Delete every chat a user owns
    Clear {
        /// Owner of the chats
        #[arg(short, long)]
        user: String,
    },
}

impl Cli {
    /// Parse command line arguments
    ///
    /// # Returns
    ///
    /// Returns the parsed CLI structure
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
