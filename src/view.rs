//! What a results pane should show.

use std::fmt::Write;

use crate::{SearchError, SearchResponse};

/// Message shown when a search succeeded but matched nothing.
pub const EMPTY_MESSAGE: &str = "No results found.";
/// Heading shown when a search request failed.
pub const ERROR_MESSAGE: &str = "An error occurred.";

/// The mutually exclusive states of the results pane.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum ResultView {
    /// Nothing has been searched yet.
    #[default]
    Idle,
    /// A request is in flight.
    Loading,
    /// The last request failed. No results are shown alongside.
    Error(String),
    /// The last request succeeded with zero results.
    Empty,
    /// Results in server order.
    Populated(SearchResponse),
}

impl ResultView {
    /// Picks the view for the given inputs. Loading wins over an error,
    /// and an error wins over any response.
    pub fn resolve(
        loading: bool,
        error: Option<&SearchError>,
        response: Option<&SearchResponse>,
    ) -> Self {
        if loading {
            return ResultView::Loading;
        }
        if let Some(err) = error {
            return ResultView::Error(err.to_string());
        }
        match response {
            None => ResultView::Idle,
            Some(r) if r.is_empty() => ResultView::Empty,
            Some(r) => ResultView::Populated(r.clone()),
        }
    }

    /// Builds the view for a finished request.
    pub fn from_outcome(outcome: &Result<SearchResponse, SearchError>) -> Self {
        match outcome {
            Ok(response) => Self::resolve(false, None, Some(response)),
            Err(err) => Self::resolve(false, Some(err), None),
        }
    }

    /// Returns true while a request is in flight.
    pub fn is_loading(&self) -> bool {
        matches!(self, ResultView::Loading)
    }

    /// Returns the displayed response, if any.
    pub fn response(&self) -> Option<&SearchResponse> {
        match self {
            ResultView::Populated(response) => Some(response),
            _ => None,
        }
    }
}

/// Renders the view as plain text.
pub fn render_text(view: &ResultView, query: &str) -> String {
    match view {
        ResultView::Idle => "Enter a keyword to start searching.".to_string(),
        ResultView::Loading => "Loading...".to_string(),
        ResultView::Error(message) => format!("{}\n{}", ERROR_MESSAGE, message),
        ResultView::Empty => EMPTY_MESSAGE.to_string(),
        ResultView::Populated(response) => {
            let mut out = String::new();
            let _ = writeln!(
                out,
                "Results for \"{}\" ({} results, page {}/{})",
                query,
                response.total,
                response.page,
                response.total_pages.max(1)
            );
            for (i, result) in response.results.iter().enumerate() {
                let _ = writeln!(out, "\n{}. {}", i + 1, result.title);
                let _ = writeln!(out, "   URL: {}", result.url);
                if !result.description.is_empty() {
                    let _ = writeln!(out, "   {}", truncate(&result.description, 150));
                }
                let mut meta = Vec::new();
                if let Some(category) = &result.category {
                    meta.push(format!("Category: {}", category));
                }
                if let Some(price) = result.price {
                    meta.push(format!("Price: {}", price));
                }
                if !result.tags.is_empty() {
                    meta.push(format!("Tags: {}", result.tags.join(", ")));
                }
                if !meta.is_empty() {
                    let _ = writeln!(out, "   {}", meta.join(" | "));
                }
            }
            if response.has_more {
                let _ = writeln!(out, "\nMore results on page {}.", response.page + 1);
            }
            out
        }
    }
}

/// Shortens `text` to at most `max` characters, marking the cut with `...`.
fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let kept: String = text.chars().take(max.saturating_sub(3)).collect();
    format!("{}...", kept)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SearchResult;

    fn response(n: usize) -> SearchResponse {
        let results = (1..=n)
            .map(|i| SearchResult::new(i.to_string(), format!("Item {}", i), format!("/p/{}", i)))
            .collect();
        SearchResponse::from_page(results, n as u64, 1, 10)
    }

    #[test]
    fn test_loading_has_priority() {
        let err = SearchError::Other("boom".into());
        let view = ResultView::resolve(true, Some(&err), Some(&response(2)));
        assert!(view.is_loading());
    }

    #[test]
    fn test_error_before_results() {
        let err = SearchError::Network {
            status: 500,
            message: "Internal Server Error".into(),
        };
        let view = ResultView::resolve(false, Some(&err), Some(&response(2)));
        assert!(matches!(view, ResultView::Error(_)));
        assert!(view.response().is_none());
    }

    #[test]
    fn test_empty_is_not_error() {
        let view = ResultView::from_outcome(&Ok(response(0)));
        assert_eq!(view, ResultView::Empty);
        let text = render_text(&view, "nothing");
        assert_eq!(text, EMPTY_MESSAGE);
        assert!(!text.contains(ERROR_MESSAGE));
    }

    #[test]
    fn test_populated_keeps_server_order() {
        let mut page = response(3);
        page.results.reverse();
        let view = ResultView::from_outcome(&Ok(page));
        let ids: Vec<_> = view
            .response()
            .unwrap()
            .results
            .iter()
            .map(|r| r.id.as_str())
            .collect();
        assert_eq!(ids, vec!["3", "2", "1"]);
    }

    #[test]
    fn test_no_response_is_idle() {
        assert_eq!(ResultView::resolve(false, None, None), ResultView::Idle);
    }

    #[test]
    fn test_render_populated_shows_count() {
        let text = render_text(&ResultView::Populated(response(2)), "テスト商品");
        assert!(text.contains("Results for \"テスト商品\" (2 results, page 1/1)"));
        assert!(text.contains("1. Item 1"));
        assert!(text.contains("2. Item 2"));
    }

    #[test]
    fn test_render_error() {
        let view = ResultView::from_outcome(&Err(SearchError::Other("timeout".into())));
        let text = render_text(&view, "x");
        assert!(text.starts_with(ERROR_MESSAGE));
        assert!(text.contains("timeout"));
    }

    #[test]
    fn test_truncate_multibyte() {
        let text = "あ".repeat(200);
        let short = truncate(&text, 10);
        assert_eq!(short.chars().count(), 10);
        assert!(short.ends_with("..."));
    }
}
