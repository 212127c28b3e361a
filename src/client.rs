//! HTTP client for the storefront search API.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

use crate::api::{ClientConfig, SearchApi};
use crate::cache::TtlCache;
use crate::result::NewHistoryItem;
use crate::{
    Result, SearchError, SearchHistoryItem, SearchQuery, SearchResponse, SearchSuggestion, SortBy,
};

const LOOKUP_TTL: Duration = Duration::from_secs(30 * 60);
const SUGGESTION_TTL: Duration = Duration::from_secs(5 * 60);

/// Builds the `GET /search` query parameters.
///
/// Unset filters are left out entirely; tags are sent as repeated `tags`
/// parameters.
pub fn search_params(query: &SearchQuery) -> Vec<(&'static str, String)> {
    let filters = &query.filters;
    let mut params = vec![
        ("q", query.query.clone()),
        ("page", query.page.to_string()),
        ("limit", query.limit.to_string()),
    ];

    if let Some(category) = &filters.category {
        params.push(("category", category.clone()));
    }
    for tag in &filters.tags {
        params.push(("tags", tag.clone()));
    }
    if let Some(from) = filters.date_from {
        params.push(("dateFrom", from.to_string()));
    }
    if let Some(to) = filters.date_to {
        params.push(("dateTo", to.to_string()));
    }
    if let Some(min) = filters.min_price {
        params.push(("minPrice", min.to_string()));
    }
    if let Some(max) = filters.max_price {
        params.push(("maxPrice", max.to_string()));
    }
    if filters.sort_by != SortBy::Relevance {
        params.push(("sortBy", filters.sort_by.as_str().to_string()));
    }
    if let Some(order) = filters.sort_order {
        params.push(("sortOrder", order.as_str().to_string()));
    }

    params
}

/// [`SearchApi`] over REST/JSON using reqwest.
///
/// Category and tag lists are cached for 30 minutes and suggestions for
/// 5 minutes per query; search results are never cached.
pub struct HttpSearchClient {
    client: Client,
    base_url: String,
    categories: TtlCache<(), Vec<String>>,
    tags: TtlCache<(), Vec<String>>,
    suggestions: TtlCache<String, Vec<SearchSuggestion>>,
}

impl HttpSearchClient {
    /// Creates a client from configuration.
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Self::with_client(client, &config.base_url)
    }

    /// Creates a client with a custom reqwest client.
    pub fn with_client(client: Client, base_url: &str) -> Result<Self> {
        Url::parse(base_url)?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            categories: TtlCache::new(LOOKUP_TTL),
            tags: TtlCache::new(LOOKUP_TTL),
            suggestions: TtlCache::new(SUGGESTION_TTL),
        })
    }

    /// Returns the base URL without a trailing slash.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn send(&self, request: RequestBuilder, path: &str) -> Result<Response> {
        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        if status == StatusCode::NOT_FOUND {
            return Err(SearchError::NotFound(path.to_string()));
        }

        let reason = status.canonical_reason().unwrap_or("Unknown status");
        let body = response.text().await.unwrap_or_default();
        let message = if body.trim().is_empty() {
            reason.to_string()
        } else {
            format!("{}: {}", reason, body.trim())
        };
        Err(SearchError::Network {
            status: status.as_u16(),
            message,
        })
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, String)],
    ) -> Result<T> {
        debug!("GET {} {:?}", path, params);
        let request = self.client.get(self.endpoint(path)).query(params);
        let response = self.send(request, path).await?;
        decode_json(response, path).await
    }
}

async fn decode_json<T: DeserializeOwned>(response: Response, path: &str) -> Result<T> {
    let body = response.text().await?;
    serde_json::from_str(&body)
        .map_err(|e| SearchError::Parse(format!("unexpected {} response: {}", path, e)))
}

#[async_trait]
impl SearchApi for HttpSearchClient {
    async fn search(&self, query: &SearchQuery) -> Result<SearchResponse> {
        query.validate()?;
        match self.get_json("/search", &search_params(query)).await {
            // A missing search endpoint is a failed search, not a missing item.
            Err(SearchError::NotFound(_)) => Err(SearchError::Network {
                status: StatusCode::NOT_FOUND.as_u16(),
                message: "Not Found".to_string(),
            }),
            other => other,
        }
    }

    async fn suggestions(&self, partial: &str) -> Result<Vec<SearchSuggestion>> {
        let key = partial.to_string();
        if let Some(cached) = self.suggestions.get(&key).await {
            return Ok(cached);
        }
        let suggestions: Vec<SearchSuggestion> = self
            .get_json("/search/suggestions", &[("q", key.clone())])
            .await?;
        self.suggestions.insert(key, suggestions.clone()).await;
        Ok(suggestions)
    }

    async fn history(&self, limit: u32) -> Result<Vec<SearchHistoryItem>> {
        self.get_json("/search/history", &[("limit", limit.to_string())])
            .await
    }

    async fn add_history(&self, query: &str, results_count: u64) -> Result<SearchHistoryItem> {
        let path = "/search/history";
        debug!("POST {} query={}", path, query);
        let request = self
            .client
            .post(self.endpoint(path))
            .json(&NewHistoryItem::now(query, results_count));
        let response = self.send(request, path).await?;
        decode_json(response, path).await
    }

    async fn clear_history(&self) -> Result<()> {
        let path = "/search/history";
        debug!("DELETE {}", path);
        self.send(self.client.delete(self.endpoint(path)), path)
            .await?;
        Ok(())
    }

    async fn categories(&self) -> Result<Vec<String>> {
        if let Some(cached) = self.categories.get(&()).await {
            return Ok(cached);
        }
        let categories: Vec<String> = self.get_json("/search/categories", &[]).await?;
        self.categories.insert((), categories.clone()).await;
        Ok(categories)
    }

    async fn tags(&self) -> Result<Vec<String>> {
        if let Some(cached) = self.tags.get(&()).await {
            return Ok(cached);
        }
        let tags: Vec<String> = self.get_json("/search/tags", &[]).await?;
        self.tags.insert((), tags.clone()).await;
        Ok(tags)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{SearchFilters, SortOrder};
    use chrono::NaiveDate;

    fn value<'a>(params: &'a [(&'static str, String)], key: &str) -> Vec<&'a str> {
        params
            .iter()
            .filter(|(k, _)| *k == key)
            .map(|(_, v)| v.as_str())
            .collect()
    }

    #[test]
    fn test_search_params_defaults() {
        let params = search_params(&SearchQuery::new("テスト商品"));
        assert_eq!(
            params,
            vec![
                ("q", "テスト商品".to_string()),
                ("page", "1".to_string()),
                ("limit", "10".to_string()),
            ]
        );
    }

    #[test]
    fn test_search_params_empty_query_kept() {
        let params = search_params(&SearchQuery::new(""));
        assert_eq!(value(&params, "q"), vec![""]);
    }

    #[test]
    fn test_search_params_all_filters() {
        let filters = SearchFilters::new()
            .with_category("electronics")
            .with_tag("sale")
            .with_tag("new")
            .with_price_range(Some(1000.0), Some(5000.0))
            .with_date_range(
                NaiveDate::from_ymd_opt(2024, 1, 1),
                NaiveDate::from_ymd_opt(2024, 6, 30),
            )
            .with_sort(SortBy::PriceAsc)
            .with_sort_order(SortOrder::Asc);
        let params = search_params(&SearchQuery::new("x").with_filters(filters).with_page(2));

        assert_eq!(value(&params, "category"), vec!["electronics"]);
        assert_eq!(value(&params, "tags"), vec!["new", "sale"]);
        assert_eq!(value(&params, "minPrice"), vec!["1000"]);
        assert_eq!(value(&params, "maxPrice"), vec!["5000"]);
        assert_eq!(value(&params, "dateFrom"), vec!["2024-01-01"]);
        assert_eq!(value(&params, "dateTo"), vec!["2024-06-30"]);
        assert_eq!(value(&params, "sortBy"), vec!["price_asc"]);
        assert_eq!(value(&params, "sortOrder"), vec!["asc"]);
        assert_eq!(value(&params, "page"), vec!["2"]);
    }

    #[test]
    fn test_search_params_omit_relevance_sort() {
        let filters = SearchFilters::new().with_sort(SortBy::Relevance);
        let params = search_params(&SearchQuery::new("x").with_filters(filters));
        assert!(value(&params, "sortBy").is_empty());
    }

    #[test]
    fn test_client_new() {
        let client = HttpSearchClient::new(&ClientConfig::default()).unwrap();
        assert_eq!(client.base_url(), "http://localhost:3000/api");
    }

    #[test]
    fn test_client_trims_trailing_slash() {
        let client = HttpSearchClient::with_client(Client::new(), "https://shop.example/api/")
            .unwrap();
        assert_eq!(client.endpoint("/search"), "https://shop.example/api/search");
    }

    #[test]
    fn test_client_rejects_bad_base_url() {
        let result = HttpSearchClient::new(&ClientConfig::new("not a url"));
        assert!(matches!(result, Err(SearchError::UrlParse(_))));
    }

    #[tokio::test]
    async fn test_search_validates_before_request() {
        // Nothing listens here; validation must fail first.
        let client = HttpSearchClient::new(&ClientConfig::new("http://127.0.0.1:9")).unwrap();
        let filters = SearchFilters::new().with_price_range(Some(6000.0), Some(5000.0));
        let result = client.search(&SearchQuery::new("x").with_filters(filters)).await;
        assert!(matches!(result, Err(SearchError::Validation(_))));
    }
}
