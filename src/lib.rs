//! # storefront-search
//!
//! Search and filter state for a storefront, kept in step with the page
//! address and a remote search API.
//!
//! The crate provides:
//!
//! - A debouncer for bursty text input
//! - A validated query/filter state container
//! - URL encoding and decoding of that state
//! - A search session that drops stale responses and records history
//! - A view model for rendering results
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use storefront_search::{
//!     ClientConfig, HttpSearchClient, ResultView, SearchSession, SessionConfig,
//! };
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let client = HttpSearchClient::new(&ClientConfig::new("http://localhost:3000/api"))?;
//!     let session = SearchSession::start(Arc::new(client), SessionConfig::default(), None)?;
//!
//!     session.set_query("ワイヤレスイヤホン")?;
//!     let mut view = session.subscribe_view();
//!     view.wait_for(|v| !v.is_loading() && *v != ResultView::Idle).await?;
//!
//!     if let Some(response) = session.view().response() {
//!         for result in &response.results {
//!             println!("{}: {}", result.title, result.url);
//!         }
//!     }
//!     Ok(())
//! }
//! ```

mod cache;
mod debounce;
mod error;
mod query;
mod result;
mod state;
mod view;

pub mod api;
pub mod client;
pub mod search;
pub mod suggest;
pub mod url_state;

pub use api::{ClientConfig, SearchApi};
pub use cache::TtlCache;
pub use client::HttpSearchClient;
pub use debounce::Debouncer;
pub use error::{Result, SearchError};
pub use query::{SearchFilters, SearchQuery, SortBy, SortOrder, DEFAULT_LIMIT};
pub use result::{
    NewHistoryItem, SearchHistoryItem, SearchResponse, SearchResult, SearchSuggestion,
    SuggestionKind,
};
pub use search::{SearchSession, SessionConfig};
pub use state::{SearchSnapshot, SearchState};
pub use suggest::{SuggestionConfig, SuggestionFeed};
pub use url_state::{Location, MemoryLocation, UrlSynchronizer};
pub use view::{render_text, ResultView, EMPTY_MESSAGE, ERROR_MESSAGE};
