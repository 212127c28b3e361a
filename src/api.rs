//! Remote search API trait and client configuration.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::{Result, SearchHistoryItem, SearchQuery, SearchResponse, SearchSuggestion};

/// Connection settings for the storefront API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Base URL that endpoint paths are appended to, e.g.
    /// `https://shop.example/api`.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
    /// User-Agent header.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

fn default_base_url() -> String {
    "http://localhost:3000/api".to_string()
}

fn default_timeout() -> u64 {
    10
}

fn default_user_agent() -> String {
    concat!("storefront-search/", env!("CARGO_PKG_VERSION")).to_string()
}

impl ClientConfig {
    /// Creates a configuration for `base_url` with default settings.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Default::default()
        }
    }

    /// Sets the request timeout.
    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout(),
            user_agent: default_user_agent(),
        }
    }
}

/// Operations offered by the storefront search API.
///
/// Implementations do not retry; a failed call is reported once and the
/// caller decides what to show.
#[async_trait]
pub trait SearchApi: Send + Sync {
    /// Runs a search.
    async fn search(&self, query: &SearchQuery) -> Result<SearchResponse>;

    /// Returns completions for a partial query.
    async fn suggestions(&self, partial: &str) -> Result<Vec<SearchSuggestion>>;

    /// Returns the most recent searches, newest first.
    async fn history(&self, limit: u32) -> Result<Vec<SearchHistoryItem>>;

    /// Records a completed search.
    async fn add_history(&self, query: &str, results_count: u64) -> Result<SearchHistoryItem>;

    /// Deletes all recorded searches.
    async fn clear_history(&self) -> Result<()>;

    /// Returns the category ids available for filtering.
    async fn categories(&self) -> Result<Vec<String>>;

    /// Returns popular tags available for filtering.
    async fn tags(&self) -> Result<Vec<String>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_config_default() {
        let config = ClientConfig::default();
        assert_eq!(config.base_url, "http://localhost:3000/api");
        assert_eq!(config.timeout_secs, 10);
        assert!(config.user_agent.starts_with("storefront-search/"));
    }

    #[test]
    fn test_client_config_new() {
        let config = ClientConfig::new("https://shop.example/api").with_timeout(3);
        assert_eq!(config.base_url, "https://shop.example/api");
        assert_eq!(config.timeout_secs, 3);
    }

    #[test]
    fn test_client_config_deserialization_defaults() {
        let json = r#"{"base_url":"https://shop.example/api"}"#;
        let config: ClientConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.base_url, "https://shop.example/api");
        assert_eq!(config.timeout_secs, 10);
    }
}
