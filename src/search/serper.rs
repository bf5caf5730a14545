//! Serper (google.serper.dev) search provider

use crate::config::SearchConfig;
use crate::error::{ParleyError, Result};
use crate::search::{SearchProvider, SearchSnippet};

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Search provider backed by the Serper API
pub struct SerperSearch {
    client: Client,
    config: SearchConfig,
}

#[derive(Debug, Serialize)]
struct SerperRequest<'a> {
    q: &'a str,
}

#[derive(Debug, Deserialize)]
struct SerperResponse {
    #[serde(default)]
    organic: Vec<SerperOrganic>,
}

#[derive(Debug, Deserialize)]
struct SerperOrganic {
    #[serde(default)]
    title: String,
    #[serde(default, alias = "url")]
    link: String,
    #[serde(default)]
    snippet: Option<String>,
}

impl From<SerperOrganic> for SearchSnippet {
    fn from(result: SerperOrganic) -> Self {
        Self {
            title: result.title,
            url: result.link,
            snippet: result.snippet.unwrap_or_default(),
        }
    }
}

impl SerperSearch {
    /// Create a Serper client
    ///
    /// # Errors
    ///
    /// Returns error if HTTP client initialization fails
    pub fn new(config: SearchConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(concat!("parley/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ParleyError::Provider(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client, config })
    }
}

#[async_trait]
impl SearchProvider for SerperSearch {
    async fn search(&self, query: &str) -> Result<Vec<SearchSnippet>> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .filter(|key| !key.is_empty())
            .ok_or_else(|| ParleyError::Config("SERPER_API_KEY missing".to_string()))?;

        let url = format!("{}/search", self.config.api_base.trim_end_matches('/'));
        tracing::debug!(query_len = query.len(), "Running web search");

        let response = self
            .client
            .post(&url)
            .header("X-API-KEY", api_key)
            .json(&SerperRequest { q: query })
            .send()
            .await
            .map_err(|e| {
                tracing::error!("Serper request failed: {}", e);
                ParleyError::Provider(format!("Serper request failed: {}", e))
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            tracing::error!("Serper returned error {}: {}", status, error_text);
            return Err(ParleyError::Provider(format!(
                "Serper error {}: {}",
                status.as_u16(),
                error_text
            ))
            .into());
        }

        let body: SerperResponse = response.json().await.map_err(|e| {
            tracing::error!("Failed to parse Serper response: {}", e);
            ParleyError::Provider(format!("Failed to parse Serper response: {}", e))
        })?;

        Ok(body
            .organic
            .into_iter()
            .take(self.config.max_results)
            .map(SearchSnippet::from)
            .collect())
    }
}
