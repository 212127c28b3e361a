//! Search query and filter representation.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::{Result, SearchError};

/// Default number of results per page.
pub const DEFAULT_LIMIT: u32 = 10;

/// Result ordering requested from the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortBy {
    /// Server-defined relevance ranking.
    #[default]
    Relevance,
    /// Cheapest first.
    PriceAsc,
    /// Most expensive first.
    PriceDesc,
    /// Oldest first.
    DateAsc,
    /// Newest first.
    DateDesc,
}

impl SortBy {
    /// All sort options, in display order.
    pub const ALL: [SortBy; 5] = [
        SortBy::Relevance,
        SortBy::PriceAsc,
        SortBy::PriceDesc,
        SortBy::DateAsc,
        SortBy::DateDesc,
    ];

    /// Returns the wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            SortBy::Relevance => "relevance",
            SortBy::PriceAsc => "price_asc",
            SortBy::PriceDesc => "price_desc",
            SortBy::DateAsc => "date_asc",
            SortBy::DateDesc => "date_desc",
        }
    }
}

impl fmt::Display for SortBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortBy {
    type Err = SearchError;

    fn from_str(s: &str) -> Result<Self> {
        SortBy::ALL
            .into_iter()
            .find(|sort| sort.as_str() == s)
            .ok_or_else(|| SearchError::Parse(format!("unknown sort option '{}'", s)))
    }
}

/// Explicit sort direction forwarded to the server as `sortOrder`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    /// Returns the wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            SortOrder::Asc => "asc",
            SortOrder::Desc => "desc",
        }
    }
}

impl FromStr for SortOrder {
    type Err = SearchError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "asc" => Ok(SortOrder::Asc),
            "desc" => Ok(SortOrder::Desc),
            other => Err(SearchError::Parse(format!("unknown sort order '{}'", other))),
        }
    }
}

/// Structured filters applied on top of the free-text query.
///
/// A field that is `None` (or an empty tag set) places no constraint on
/// the results. There is no separate "unset" sentinel.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchFilters {
    /// Category id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    /// Required tags.
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub tags: BTreeSet<String>,
    /// Lower price bound, inclusive.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_price: Option<f64>,
    /// Upper price bound, inclusive.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_price: Option<f64>,
    /// Earliest date, inclusive.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_from: Option<NaiveDate>,
    /// Latest date, inclusive.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_to: Option<NaiveDate>,
    /// Result ordering.
    #[serde(default)]
    pub sort_by: SortBy,
    /// Explicit sort direction.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort_order: Option<SortOrder>,
}

impl SearchFilters {
    /// Creates an empty filter set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the category.
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    /// Adds a required tag.
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.insert(tag.into());
        self
    }

    /// Sets both price bounds. Either side may be open.
    pub fn with_price_range(mut self, min: Option<f64>, max: Option<f64>) -> Self {
        self.min_price = min;
        self.max_price = max;
        self
    }

    /// Sets the date range. Either side may be open.
    pub fn with_date_range(mut self, from: Option<NaiveDate>, to: Option<NaiveDate>) -> Self {
        self.date_from = from;
        self.date_to = to;
        self
    }

    /// Sets the ordering.
    pub fn with_sort(mut self, sort_by: SortBy) -> Self {
        self.sort_by = sort_by;
        self
    }

    /// Sets the explicit sort direction.
    pub fn with_sort_order(mut self, order: SortOrder) -> Self {
        self.sort_order = Some(order);
        self
    }

    /// Collapses empty strings to absence so that "no constraint" has a
    /// single representation.
    pub fn normalized(mut self) -> Self {
        if self
            .category
            .as_deref()
            .map(|c| c.trim().is_empty())
            .unwrap_or(false)
        {
            self.category = None;
        }
        self.tags = self
            .tags
            .into_iter()
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .collect();
        self
    }

    /// Checks the filter invariants.
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [("minPrice", self.min_price), ("maxPrice", self.max_price)] {
            if let Some(v) = value {
                if !v.is_finite() {
                    return Err(SearchError::Validation(format!("{} must be a finite number", name)));
                }
                if v < 0.0 {
                    return Err(SearchError::Validation(format!("{} must not be negative", name)));
                }
            }
        }

        if let (Some(min), Some(max)) = (self.min_price, self.max_price) {
            if min > max {
                return Err(SearchError::Validation(format!(
                    "minPrice ({}) must not exceed maxPrice ({})",
                    min, max
                )));
            }
        }

        if let (Some(from), Some(to)) = (self.date_from, self.date_to) {
            if from > to {
                return Err(SearchError::Validation(format!(
                    "dateFrom ({}) must not be after dateTo ({})",
                    from, to
                )));
            }
        }

        Ok(())
    }

    /// Number of active constraints, counting the sort only when it is
    /// not the default.
    pub fn active_count(&self) -> usize {
        [
            self.category.is_some(),
            !self.tags.is_empty(),
            self.min_price.is_some(),
            self.max_price.is_some(),
            self.date_from.is_some(),
            self.date_to.is_some(),
            self.sort_by != SortBy::Relevance,
            self.sort_order.is_some(),
        ]
        .into_iter()
        .filter(|active| *active)
        .count()
    }

    /// Returns true when nothing is constrained.
    pub fn is_empty(&self) -> bool {
        self.active_count() == 0
    }
}

/// A complete search request: text, filters and paging.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchQuery {
    /// Free text. May be empty.
    pub query: String,
    /// Structured filters.
    #[serde(default)]
    pub filters: SearchFilters,
    /// Page number (1-indexed).
    pub page: u32,
    /// Results per page.
    pub limit: u32,
}

impl SearchQuery {
    /// Creates a first-page query with the default page size.
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            filters: SearchFilters::default(),
            page: 1,
            limit: DEFAULT_LIMIT,
        }
    }

    /// Sets the filters.
    pub fn with_filters(mut self, filters: SearchFilters) -> Self {
        self.filters = filters;
        self
    }

    /// Sets the page number.
    pub fn with_page(mut self, page: u32) -> Self {
        self.page = page;
        self
    }

    /// Sets the page size.
    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = limit;
        self
    }

    /// Checks paging and filter invariants.
    pub fn validate(&self) -> Result<()> {
        if self.page == 0 {
            return Err(SearchError::Validation("page must be at least 1".into()));
        }
        if self.limit == 0 {
            return Err(SearchError::Validation("limit must be at least 1".into()));
        }
        self.filters.validate()
    }
}

impl Default for SearchQuery {
    fn default() -> Self {
        Self::new("")
    }
}
