//! Error types for the search library.

use thiserror::Error;

/// Result type alias for search operations.
pub type Result<T> = std::result::Result<T, SearchError>;

/// Errors that can occur while building, issuing or restoring a search.
#[derive(Error, Debug)]
pub enum SearchError {
    /// Filter or paging values rejected before any request is made.
    #[error("Invalid search parameters: {0}")]
    Validation(String),

    /// The server answered with a non-success status.
    #[error("Request failed with status {status}: {message}")]
    Network {
        /// HTTP status code.
        status: u16,
        /// Status reason or response body.
        message: String,
    },

    /// Transport-level failure (connect, timeout, reading the body).
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// A looked-up resource does not exist (HTTP 404). A 404 from the search
    /// endpoint itself is reported as [`SearchError::Network`].
    #[error("Not found: {0}")]
    NotFound(String),

    /// Malformed input data, e.g. URL parameters or a response body.
    #[error("Failed to parse: {0}")]
    Parse(String),

    /// URL parsing error.
    #[error("URL parsing error: {0}")]
    UrlParse(#[from] url::ParseError),

    /// Generic error.
    #[error("{0}")]
    Other(String),
}

impl SearchError {
    /// Returns true for failures that came from the network layer.
    pub fn is_network(&self) -> bool {
        matches!(self, SearchError::Network { .. } | SearchError::Http(_))
    }

    /// Returns true for locally rejected input.
    pub fn is_validation(&self) -> bool {
        matches!(self, SearchError::Validation(_))
    }
}
