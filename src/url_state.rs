//! Query-string representation of the search state.
//!
//! The state is mirrored into the location's query string so a search can
//! be shared, bookmarked and restored after a reload. Parameters equal to
//! their default are left out, and unparseable parameters are read back
//! as unset.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use chrono::NaiveDate;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, warn};
use url::form_urlencoded;

use crate::state::SearchSnapshot;
use crate::{Result, SearchError, SortBy};

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Serializes the state into a query string, without the leading `?`.
///
/// Parameters are always written in the same order so equal states give
/// equal strings.
pub fn encode(snapshot: &SearchSnapshot) -> String {
    let filters = &snapshot.filters;
    let mut out = form_urlencoded::Serializer::new(String::new());

    if !snapshot.query.is_empty() {
        out.append_pair("q", &snapshot.query);
    }
    if let Some(category) = filters.category.as_deref().filter(|c| !c.is_empty()) {
        out.append_pair("category", category);
    }
    if let Some(min) = filters.min_price {
        out.append_pair("minPrice", &min.to_string());
    }
    if let Some(max) = filters.max_price {
        out.append_pair("maxPrice", &max.to_string());
    }
    if filters.sort_by != SortBy::Relevance {
        out.append_pair("sortBy", filters.sort_by.as_str());
    }
    if let Some(order) = filters.sort_order {
        out.append_pair("sortOrder", order.as_str());
    }
    if let Some(from) = filters.date_from {
        out.append_pair("dateFrom", &from.format(DATE_FORMAT).to_string());
    }
    if let Some(to) = filters.date_to {
        out.append_pair("dateTo", &to.format(DATE_FORMAT).to_string());
    }
    for tag in &filters.tags {
        out.append_pair("tags", tag);
    }
    if snapshot.page > 1 {
        out.append_pair("page", &snapshot.page.to_string());
    }

    out.finish()
}

/// Restores the state from a query string.
///
/// Accepts a bare query string, one with a leading `?`, or a URL such as
/// `/search?q=...`. Malformed values are logged and treated as unset.
pub fn decode(input: &str) -> SearchSnapshot {
    let (snapshot, problems) = parse(input);
    for problem in &problems {
        warn!("ignoring URL parameter: {}", problem);
    }
    snapshot
}

/// Like [`decode`], but fails on the first malformed value.
pub fn decode_strict(input: &str) -> Result<SearchSnapshot> {
    let (snapshot, problems) = parse(input);
    match problems.into_iter().next() {
        Some(problem) => Err(SearchError::Parse(problem)),
        None => Ok(snapshot),
    }
}

fn query_part(input: &str) -> &str {
    let input = input.split('#').next().unwrap_or_default();
    match input.split_once('?') {
        Some((_, query)) => query,
        None if input.contains('=') => input,
        // A path without a query string carries no state.
        None => "",
    }
}

fn parse(input: &str) -> (SearchSnapshot, Vec<String>) {
    let mut snapshot = SearchSnapshot::default();
    let mut problems = Vec::new();
    let mut seen_page = false;
    let mut seen_sort = false;

    for (key, value) in form_urlencoded::parse(query_part(input).as_bytes()) {
        let filters = &mut snapshot.filters;
        match key.as_ref() {
            "q" if snapshot.query.is_empty() => snapshot.query = value.into_owned(),
            "category" if filters.category.is_none() => {
                if !value.trim().is_empty() {
                    filters.category = Some(value.into_owned());
                }
            }
            "minPrice" if filters.min_price.is_none() => {
                filters.min_price = parse_price("minPrice", &value, &mut problems);
            }
            "maxPrice" if filters.max_price.is_none() => {
                filters.max_price = parse_price("maxPrice", &value, &mut problems);
            }
            "sortBy" if !seen_sort => {
                seen_sort = true;
                match value.parse::<SortBy>() {
                    Ok(sort) => filters.sort_by = sort,
                    Err(e) => problems.push(format!("sortBy: {}", e)),
                }
            }
            "sortOrder" if filters.sort_order.is_none() => match value.parse() {
                Ok(order) => filters.sort_order = Some(order),
                Err(e) => problems.push(format!("sortOrder: {}", e)),
            },
            "dateFrom" if filters.date_from.is_none() => {
                filters.date_from = parse_date("dateFrom", &value, &mut problems);
            }
            "dateTo" if filters.date_to.is_none() => {
                filters.date_to = parse_date("dateTo", &value, &mut problems);
            }
            "tags" => {
                let tag = value.trim();
                if !tag.is_empty() {
                    filters.tags.insert(tag.to_string());
                }
            }
            "page" if !seen_page => {
                seen_page = true;
                match value.parse::<u32>() {
                    Ok(page) if page >= 1 => snapshot.page = page,
                    _ => problems.push(format!("page={} is not a positive integer", value)),
                }
            }
            _ => {}
        }
    }

    let filters = &mut snapshot.filters;
    if let (Some(min), Some(max)) = (filters.min_price, filters.max_price) {
        if min > max {
            problems.push(format!("minPrice={} exceeds maxPrice={}", min, max));
            filters.min_price = None;
            filters.max_price = None;
        }
    }
    if let (Some(from), Some(to)) = (filters.date_from, filters.date_to) {
        if from > to {
            problems.push(format!("dateFrom={} is after dateTo={}", from, to));
            filters.date_from = None;
            filters.date_to = None;
        }
    }

    (snapshot, problems)
}

fn parse_price(name: &str, value: &str, problems: &mut Vec<String>) -> Option<f64> {
    match value.trim().parse::<f64>() {
        Ok(v) if v.is_finite() && v >= 0.0 => Some(v),
        _ => {
            problems.push(format!("{}={} is not a valid price", name, value));
            None
        }
    }
}

fn parse_date(name: &str, value: &str, problems: &mut Vec<String>) -> Option<NaiveDate> {
    match NaiveDate::parse_from_str(value.trim(), DATE_FORMAT) {
        Ok(date) => Some(date),
        Err(_) => {
            problems.push(format!("{}={} is not a YYYY-MM-DD date", name, value));
            None
        }
    }
}

/// The address bar, or whatever stands in for it.
///
/// Writes always replace the current entry; they never add history.
pub trait Location: Send + Sync {
    /// Returns the current query string, without the leading `?`.
    fn query(&self) -> String;

    /// Replaces the query string in place.
    fn replace_query(&self, query: &str);
}

/// In-memory [`Location`], used by the CLI and in tests.
#[derive(Debug)]
pub struct MemoryLocation {
    path: String,
    query: Mutex<String>,
    replacements: AtomicUsize,
}

impl MemoryLocation {
    /// Creates a location at `path` with an empty query string.
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            query: Mutex::new(String::new()),
            replacements: AtomicUsize::new(0),
        }
    }

    /// Creates a location from a relative URL such as `/search?q=rust`.
    pub fn parse(href: &str) -> Self {
        let href = href.split('#').next().unwrap_or_default();
        let (path, query) = href.split_once('?').unwrap_or((href, ""));
        let location = Self::new(if path.is_empty() { "/search" } else { path });
        if let Ok(mut current) = location.query.lock() {
            *current = query.to_string();
        }
        location
    }

    /// Returns the path followed by the query string, if any.
    pub fn href(&self) -> String {
        let query = self.query();
        if query.is_empty() {
            self.path.clone()
        } else {
            format!("{}?{}", self.path, query)
        }
    }

    /// Number of times the query string was replaced.
    pub fn replacements(&self) -> usize {
        self.replacements.load(Ordering::SeqCst)
    }
}

impl Default for MemoryLocation {
    fn default() -> Self {
        Self::new("/search")
    }
}

impl Location for MemoryLocation {
    fn query(&self) -> String {
        self.query.lock().map(|q| q.clone()).unwrap_or_default()
    }

    fn replace_query(&self, query: &str) {
        if let Ok(mut current) = self.query.lock() {
            *current = query.to_string();
            self.replacements.fetch_add(1, Ordering::SeqCst);
        }
    }
}

/// Keeps a [`Location`] in step with the search state.
///
/// The location is read once, at mount, through [`UrlSynchronizer::seed`];
/// afterwards it is only written.
pub struct UrlSynchronizer<L> {
    location: Arc<L>,
}

impl<L: Location + 'static> UrlSynchronizer<L> {
    /// Creates a synchronizer over `location`.
    pub fn new(location: Arc<L>) -> Self {
        Self { location }
    }

    /// Returns the underlying location.
    pub fn location(&self) -> &Arc<L> {
        &self.location
    }

    /// Reads the initial state from the location.
    pub fn seed(&self) -> SearchSnapshot {
        decode(&self.location.query())
    }

    /// Writes the state to the location if it differs. Returns whether a
    /// write happened.
    pub fn sync(&self, snapshot: &SearchSnapshot) -> bool {
        let encoded = encode(snapshot);
        if encoded == self.location.query() {
            return false;
        }
        debug!(query = %encoded, "replacing location query");
        self.location.replace_query(&encoded);
        true
    }

    /// Follows a state subscription until the state owner goes away.
    pub fn spawn(self, mut states: watch::Receiver<SearchSnapshot>) -> JoinHandle<()> {
        tokio::spawn(async move {
            loop {
                let snapshot = states.borrow_and_update().clone();
                self.sync(&snapshot);
                if states.changed().await.is_err() {
                    break;
                }
            }
        })
    }
}
