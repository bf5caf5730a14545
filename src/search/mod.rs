//! Web search augmentation
//!
//! A `SearchProvider` turns a query into ranked snippets that the `search`
//! mode injects into its system directive.

pub mod serper;

pub use serper::SerperSearch;

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// One organic search result
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchSnippet {
    pub title: String,
    pub url: String,
    /// Empty when the result has no snippet
    pub snippet: String,
}

/// Web search backend
#[async_trait]
pub trait SearchProvider: Send + Sync {
    /// Run `query` and return the top results, best first
    ///
    /// # Errors
    ///
    /// Returns `ParleyError::Config` when no credential is configured (before
    /// any network I/O) and `ParleyError::Provider` on transport failure or a
    /// non-success upstream status
    async fn search(&self, query: &str) -> Result<Vec<SearchSnippet>>;
}

/// Render snippets as numbered blocks separated by blank lines
///
/// # Examples
///
/// ```
/// use parley::search::{format_snippets, SearchSnippet};
///
/// let text = format_snippets(&[SearchSnippet {
///     title: "Rust".to_string(),
///     url: "https://www.rust-lang.org".to_string(),
///     snippet: "A language empowering everyone".to_string(),
/// }]);
/// assert_eq!(text, "1. Rust\nhttps://www.rust-lang.org\nA language empowering everyone");
/// ```
pub fn format_snippets(snippets: &[SearchSnippet]) -> String {
    snippets
        .iter()
        .enumerate()
        .map(|(i, s)| format!("{}. {}\n{}\n{}", i + 1, s.title, s.url, s.snippet))
        .collect::<Vec<_>>()
        .join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snippet(title: &str, snippet: &str) -> SearchSnippet {
        SearchSnippet {
            title: title.to_string(),
            url: format!("https://example.com/{}", title.to_lowercase()),
            snippet: snippet.to_string(),
        }
    }

    #[test]
    fn test_format_snippets_numbered_from_one() {
        let text = format_snippets(&[snippet("First", "one"), snippet("Second", "")]);
        assert_eq!(
            text,
            "1. First\nhttps://example.com/first\none\n\n2. Second\nhttps://example.com/second\n"
        );
    }

    #[test]
    fn test_format_snippets_empty() {
        assert_eq!(format_snippets(&[]), "");
    }
}
