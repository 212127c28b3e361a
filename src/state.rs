//! Query and filter state container.

use tokio::sync::watch;
use tracing::debug;

use crate::query::DEFAULT_LIMIT;
use crate::{Result, SearchError, SearchFilters, SearchQuery};

/// Point-in-time copy of the search state.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchSnapshot {
    /// Raw query text, updated on every keystroke.
    pub query: String,
    /// Active filters.
    pub filters: SearchFilters,
    /// Current page (1-indexed).
    pub page: u32,
    /// Page size.
    pub limit: u32,
}

impl SearchSnapshot {
    /// Creates a first-page snapshot for `query`.
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            ..Self::default()
        }
    }

    /// Sets the filters.
    pub fn with_filters(mut self, filters: SearchFilters) -> Self {
        self.filters = filters;
        self
    }

    /// Sets the page.
    pub fn with_page(mut self, page: u32) -> Self {
        self.page = page;
        self
    }

    /// Builds the request for this state.
    pub fn to_query(&self) -> SearchQuery {
        SearchQuery {
            query: self.query.clone(),
            filters: self.filters.clone(),
            page: self.page,
            limit: self.limit,
        }
    }

    /// Returns true when nothing differs from a freshly reset state.
    pub fn is_default(&self) -> bool {
        self.query.is_empty() && self.filters.is_empty() && self.page == 1
    }
}

impl Default for SearchSnapshot {
    fn default() -> Self {
        Self {
            query: String::new(),
            filters: SearchFilters::default(),
            page: 1,
            limit: DEFAULT_LIMIT,
        }
    }
}

/// Owns the query, filters and page, and publishes a [`SearchSnapshot`]
/// to subscribers after every change.
///
/// Changing the query or the filters always moves back to page 1.
/// Setters return `Ok(false)` when the value was already current; nothing
/// is published in that case.
pub struct SearchState {
    current: SearchSnapshot,
    tx: watch::Sender<SearchSnapshot>,
}

impl SearchState {
    /// Creates an empty state with the given page size.
    pub fn new(limit: u32) -> Self {
        let current = SearchSnapshot {
            limit: limit.max(1),
            ..SearchSnapshot::default()
        };
        let (tx, _) = watch::channel(current.clone());
        Self { current, tx }
    }

    /// Returns the current state.
    pub fn snapshot(&self) -> &SearchSnapshot {
        &self.current
    }

    /// Returns the raw query text.
    pub fn query(&self) -> &str {
        &self.current.query
    }

    /// Returns the active filters.
    pub fn filters(&self) -> &SearchFilters {
        &self.current.filters
    }

    /// Returns the current page.
    pub fn page(&self) -> u32 {
        self.current.page
    }

    /// Builds the request for the current state.
    pub fn to_query(&self) -> SearchQuery {
        self.current.to_query()
    }

    /// Subscribes to state changes.
    pub fn subscribe(&self) -> watch::Receiver<SearchSnapshot> {
        self.tx.subscribe()
    }

    /// Replaces the query text.
    pub fn set_query(&mut self, query: impl Into<String>) -> bool {
        let query = query.into();
        if query == self.current.query {
            return false;
        }
        self.current.query = query;
        self.current.page = 1;
        self.publish();
        true
    }

    /// Replaces the filters. Invalid filters are rejected and leave the
    /// state untouched.
    pub fn set_filters(&mut self, filters: SearchFilters) -> Result<bool> {
        let filters = filters.normalized();
        filters.validate()?;
        if filters == self.current.filters {
            return Ok(false);
        }
        self.current.filters = filters;
        self.current.page = 1;
        self.publish();
        Ok(true)
    }

    /// Merges changes into the current filters. The merged result is
    /// validated as a whole.
    pub fn update_filters<F>(&mut self, update: F) -> Result<bool>
    where
        F: FnOnce(&mut SearchFilters),
    {
        let mut filters = self.current.filters.clone();
        update(&mut filters);
        self.set_filters(filters)
    }

    /// Moves to another page of the same query.
    pub fn set_page(&mut self, page: u32) -> Result<bool> {
        if page == 0 {
            return Err(SearchError::Validation("page must be at least 1".into()));
        }
        if page == self.current.page {
            return Ok(false);
        }
        self.current.page = page;
        self.publish();
        Ok(true)
    }

    /// Clears the query and filters and returns to page 1. The page size
    /// is kept.
    pub fn reset(&mut self) -> bool {
        let cleared = SearchSnapshot {
            limit: self.current.limit,
            ..SearchSnapshot::default()
        };
        if cleared == self.current {
            return false;
        }
        self.current = cleared;
        self.publish();
        true
    }

    /// Replaces the whole state at once, e.g. from a restored URL. The
    /// page is kept as given rather than reset.
    pub fn seed(&mut self, snapshot: SearchSnapshot) -> Result<()> {
        let snapshot = SearchSnapshot {
            filters: snapshot.filters.normalized(),
            limit: snapshot.limit.max(1),
            ..snapshot
        };
        snapshot.to_query().validate()?;
        if snapshot != self.current {
            self.current = snapshot;
            self.publish();
        }
        Ok(())
    }

    fn publish(&self) {
        debug!(
            query = %self.current.query,
            page = self.current.page,
            filters = self.current.filters.active_count(),
            "search state changed"
        );
        self.tx.send_replace(self.current.clone());
    }
}

impl Default for SearchState {
    fn default() -> Self {
        Self::new(DEFAULT_LIMIT)
    }
}
