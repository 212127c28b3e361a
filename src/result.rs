//! Search result types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single search hit as returned by the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResult {
    /// Identifier, unique within one response.
    pub id: String,
    /// Result title.
    pub title: String,
    /// Result description.
    #[serde(default)]
    pub description: String,
    /// Link to the item.
    pub url: String,
    /// Category id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    /// Tags attached to the item.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    /// Relevance reported by the server.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relevance: Option<f64>,
    /// Score reported by the server.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
    /// Item price.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    /// Item date.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
}

impl SearchResult {
    /// Creates a new search result.
    pub fn new(id: impl Into<String>, title: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            description: String::new(),
            url: url.into(),
            category: None,
            tags: Vec::new(),
            relevance: None,
            score: None,
            price: None,
            date: None,
        }
    }

    /// Sets the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Sets the category.
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    /// Adds a tag.
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    /// Sets the price.
    pub fn with_price(mut self, price: f64) -> Self {
        self.price = Some(price);
        self
    }

    /// Sets the score.
    pub fn with_score(mut self, score: f64) -> Self {
        self.score = Some(score);
        self
    }

    /// Returns the server's ranking value, preferring `score` over
    /// `relevance`.
    pub fn rank(&self) -> Option<f64> {
        self.score.or(self.relevance)
    }
}

/// One page of search results.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResponse {
    /// Results in server order.
    pub results: Vec<SearchResult>,
    /// Total number of matches across all pages.
    pub total: u64,
    /// Current page (1-indexed).
    pub page: u32,
    /// Number of pages.
    pub total_pages: u32,
    /// Whether a later page exists.
    pub has_more: bool,
}

impl SearchResponse {
    /// Builds a response page, deriving `totalPages` and `hasMore`.
    pub fn from_page(results: Vec<SearchResult>, total: u64, page: u32, limit: u32) -> Self {
        let limit = u64::from(limit.max(1));
        let total_pages = total.div_ceil(limit).min(u64::from(u32::MAX)) as u32;
        Self {
            results,
            total,
            page,
            total_pages,
            has_more: page < total_pages,
        }
    }

    /// Returns true when the page holds no results.
    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// Number of results on this page.
    pub fn len(&self) -> usize {
        self.results.len()
    }
}

/// A recorded search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchHistoryItem {
    /// Server-assigned id.
    #[serde(default)]
    pub id: String,
    /// The query text that was searched.
    pub query: String,
    /// When the search completed.
    pub timestamp: DateTime<Utc>,
    /// Total matches reported for the search.
    #[serde(default)]
    pub results_count: u64,
}

/// Body of a history append request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewHistoryItem {
    pub query: String,
    pub results_count: u64,
    pub timestamp: DateTime<Utc>,
}

impl NewHistoryItem {
    /// Creates a history entry stamped with the current time.
    pub fn now(query: impl Into<String>, results_count: u64) -> Self {
        Self {
            query: query.into(),
            results_count,
            timestamp: Utc::now(),
        }
    }
}

/// Origin of a suggestion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SuggestionKind {
    Recent,
    Popular,
    Suggested,
}

/// A query completion offered while typing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchSuggestion {
    pub id: String,
    pub text: String,
    #[serde(rename = "type")]
    pub kind: SuggestionKind,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_result_new() {
        let result = SearchResult::new("1", "Title", "https://example.com/products/1");
        assert_eq!(result.id, "1");
        assert_eq!(result.title, "Title");
        assert_eq!(result.url, "https://example.com/products/1");
        assert!(result.description.is_empty());
        assert!(result.category.is_none());
        assert!(result.tags.is_empty());
        assert!(result.rank().is_none());
    }

    #[test]
    fn test_search_result_rank_prefers_score() {
        let mut result = SearchResult::new("1", "t", "u");
        result.relevance = Some(0.4);
        assert_eq!(result.rank(), Some(0.4));
        let result = result.with_score(0.9);
        assert_eq!(result.rank(), Some(0.9));
    }

    #[test]
    fn test_search_result_deserialization_minimal() {
        let json = r#"{"id":"1","title":"Search Result 1","url":"/products/1"}"#;
        let result: SearchResult = serde_json::from_str(json).unwrap();
        assert_eq!(result.title, "Search Result 1");
        assert!(result.price.is_none());
    }

    #[test]
    fn test_search_result_serialization_omits_absent() {
        let result = SearchResult::new("1", "t", "u").with_price(1200.0);
        let json = serde_json::to_string(&result).unwrap();
        assert!(json.contains("\"price\":1200.0"));
        assert!(!json.contains("category"));
        assert!(!json.contains("tags"));
    }

    #[test]
    fn test_response_from_page() {
        let response = SearchResponse::from_page(vec![], 25, 1, 10);
        assert_eq!(response.total_pages, 3);
        assert!(response.has_more);

        let last = SearchResponse::from_page(vec![], 25, 3, 10);
        assert!(!last.has_more);
    }

    #[test]
    fn test_response_from_page_zero_total() {
        let response = SearchResponse::from_page(vec![], 0, 1, 10);
        assert_eq!(response.total_pages, 0);
        assert!(!response.has_more);
        assert!(response.is_empty());
    }

    #[test]
    fn test_response_deserialization() {
        let json = r#"{
            "results": [
                {"id": "1", "title": "A", "description": "first", "url": "/a"},
                {"id": "2", "title": "B", "description": "second", "url": "/b"}
            ],
            "total": 2,
            "page": 1,
            "totalPages": 1,
            "hasMore": false
        }"#;
        let response: SearchResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.len(), 2);
        assert_eq!(response.results[0].id, "1");
        assert_eq!(response.results[1].id, "2");
        assert_eq!(response.total_pages, 1);
    }

    #[test]
    fn test_history_item_deserialization_without_id() {
        let json = r#"{"query":"recent search 1","timestamp":"2024-01-15T10:00:00Z"}"#;
        let item: SearchHistoryItem = serde_json::from_str(json).unwrap();
        assert_eq!(item.query, "recent search 1");
        assert!(item.id.is_empty());
        assert_eq!(item.results_count, 0);
    }

    #[test]
    fn test_new_history_item_serialization() {
        let item = NewHistoryItem::now("キーワード", 12);
        let json = serde_json::to_string(&item).unwrap();
        assert!(json.contains("\"resultsCount\":12"));
        assert!(json.contains("\"timestamp\""));
    }

    #[test]
    fn test_suggestion_kind_wire_name() {
        let json = r#"{"id":"s1","text":"rust","type":"popular"}"#;
        let suggestion: SearchSuggestion = serde_json::from_str(json).unwrap();
        assert_eq!(suggestion.kind, SuggestionKind::Popular);
    }
}
