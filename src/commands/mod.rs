/*!
Command handlers for the CLI

- `serve`: run the HTTP chat service
- `history`: list, delete or clear a user's stored chats
*/

use crate::config::Config;
use crate::error::Result;

// History inspection commands
pub mod history;

// HTTP service command handler
pub mod serve {
    //! Starts the chat service.
    //!
    //! Opens the chat store, builds the completion and search clients from
    //! configuration and serves the router until Ctrl-C.

    use super::*;
    use crate::server::{self, AppState};
    use std::sync::Arc;

    /// Run the HTTP service
    ///
    /// # Arguments
    ///
    /// * `config` - Global configuration (consumed)
    /// * `bind` - Optional override for `server.bind`
    ///
    /// # Errors
    ///
    /// Returns error if the store cannot be opened, a client cannot be
    /// built, or the address cannot be bound
    pub async fn run_serve(config: Config, bind: Option<String>) -> Result<()> {
        let bind = bind.unwrap_or_else(|| config.server.bind.clone());
        let state = AppState::from_config(&config)?;

        tracing::info!(
            provider = %config.provider.provider_type,
            store = %config.storage.resolve_path()?.display(),
            search = config.search.api_key.is_some(),
            "Starting Parley"
        );

        server::serve(Arc::new(state), &bind).await
    }
}
