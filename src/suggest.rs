//! Query suggestions while typing.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::api::SearchApi;
use crate::debounce::Debouncer;
use crate::{Result, SearchSuggestion};

/// Suggestion feed settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuggestionConfig {
    /// Quiet period before a suggestion lookup.
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
}

fn default_debounce_ms() -> u64 {
    200
}

impl Default for SuggestionConfig {
    fn default() -> Self {
        Self {
            debounce_ms: default_debounce_ms(),
        }
    }
}

type Lookup = (u64, Result<Vec<SearchSuggestion>>);

/// Debounced suggestion lookups for a text input.
///
/// Clearing the input clears the suggestions without a request. A lookup
/// that is overtaken by newer input is dropped.
pub struct SuggestionFeed {
    input: mpsc::UnboundedSender<String>,
    suggestions: watch::Receiver<Vec<SearchSuggestion>>,
    driver: JoinHandle<()>,
}

impl SuggestionFeed {
    /// Starts the feed. Must be called from within a tokio runtime.
    pub fn new(api: Arc<dyn SearchApi>, config: SuggestionConfig) -> Self {
        let (input_tx, input_rx) = mpsc::unbounded_channel();
        let (suggestions_tx, suggestions_rx) = watch::channel(Vec::new());
        let delay = Duration::from_millis(config.debounce_ms);
        let driver = tokio::spawn(run(api, delay, input_rx, suggestions_tx));
        Self {
            input: input_tx,
            suggestions: suggestions_rx,
            driver,
        }
    }

    /// Feeds the current input text.
    pub fn input(&self, text: impl Into<String>) {
        let _ = self.input.send(text.into());
    }

    /// Returns the latest suggestions.
    pub fn current(&self) -> Vec<SearchSuggestion> {
        self.suggestions.borrow().clone()
    }

    /// Subscribes to suggestion updates.
    pub fn subscribe(&self) -> watch::Receiver<Vec<SearchSuggestion>> {
        self.suggestions.clone()
    }
}

impl Drop for SuggestionFeed {
    fn drop(&mut self) {
        self.driver.abort();
    }
}

async fn run(
    api: Arc<dyn SearchApi>,
    delay: Duration,
    mut input: mpsc::UnboundedReceiver<String>,
    suggestions: watch::Sender<Vec<SearchSuggestion>>,
) {
    let (debouncer, mut settled) = Debouncer::channel(delay);
    let (lookup_tx, mut lookups) = mpsc::unbounded_channel::<Lookup>();
    let mut latest = String::new();
    let mut generation = 0u64;
    let mut in_flight: Option<JoinHandle<()>> = None;

    loop {
        tokio::select! {
            text = input.recv() => match text {
                Some(text) => {
                    latest = text.clone();
                    if text.trim().is_empty() {
                        generation += 1;
                        if let Some(handle) = in_flight.take() {
                            handle.abort();
                        }
                        suggestions.send_replace(Vec::new());
                    } else {
                        debouncer.call(text);
                    }
                }
                None => break,
            },
            Some(text) = settled.recv() => {
                if text != latest {
                    continue;
                }
                generation += 1;
                if let Some(handle) = in_flight.take() {
                    handle.abort();
                }
                let api = Arc::clone(&api);
                let tx = lookup_tx.clone();
                let current = generation;
                in_flight = Some(tokio::spawn(async move {
                    let _ = tx.send((current, api.suggestions(&text).await));
                }));
            }
            Some((current, outcome)) = lookups.recv() => {
                if current != generation {
                    debug!("discarding stale suggestions");
                    continue;
                }
                in_flight = None;
                match outcome {
                    Ok(items) => {
                        suggestions.send_replace(items);
                    }
                    Err(e) => warn!("suggestion lookup failed: {}", e),
                }
            }
        }
    }

    if let Some(handle) = in_flight {
        handle.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        SearchError, SearchHistoryItem, SearchQuery, SearchResponse, SuggestionKind,
    };
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use tokio::time::sleep;

    #[derive(Default)]
    struct SuggestApi {
        lookups: Mutex<Vec<String>>,
        delays: HashMap<String, Duration>,
    }

    #[async_trait]
    impl SearchApi for SuggestApi {
        async fn search(&self, _query: &SearchQuery) -> Result<SearchResponse> {
            Err(SearchError::Other("unused".into()))
        }

        async fn suggestions(&self, partial: &str) -> Result<Vec<SearchSuggestion>> {
            self.lookups.lock().unwrap().push(partial.to_string());
            let delay = self
                .delays
                .get(partial)
                .copied()
                .unwrap_or(Duration::from_millis(20));
            sleep(delay).await;
            Ok(vec![SearchSuggestion {
                id: "1".into(),
                text: format!("{} case", partial),
                kind: SuggestionKind::Suggested,
            }])
        }

        async fn history(&self, _limit: u32) -> Result<Vec<SearchHistoryItem>> {
            Ok(vec![])
        }

        async fn add_history(&self, _query: &str, _count: u64) -> Result<SearchHistoryItem> {
            Err(SearchError::Other("unused".into()))
        }

        async fn clear_history(&self) -> Result<()> {
            Ok(())
        }

        async fn categories(&self) -> Result<Vec<String>> {
            Ok(vec![])
        }

        async fn tags(&self) -> Result<Vec<String>> {
            Ok(vec![])
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_debounced_lookup() {
        let api = Arc::new(SuggestApi::default());
        let feed = SuggestionFeed::new(api.clone(), SuggestionConfig::default());

        feed.input("p");
        feed.input("ph");
        feed.input("phone");
        sleep(Duration::from_millis(500)).await;

        assert_eq!(*api.lookups.lock().unwrap(), vec!["phone".to_string()]);
        assert_eq!(feed.current()[0].text, "phone case");
    }

    #[tokio::test(start_paused = true)]
    async fn test_clearing_input_clears_suggestions() {
        let api = Arc::new(SuggestApi::default());
        let feed = SuggestionFeed::new(api.clone(), SuggestionConfig::default());

        feed.input("phone");
        sleep(Duration::from_millis(500)).await;
        assert_eq!(feed.current().len(), 1);

        feed.input("");
        sleep(Duration::from_millis(500)).await;
        assert!(feed.current().is_empty());
        assert_eq!(api.lookups.lock().unwrap().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cleared_before_settle_makes_no_request() {
        let api = Arc::new(SuggestApi::default());
        let feed = SuggestionFeed::new(api.clone(), SuggestionConfig::default());

        feed.input("pho");
        sleep(Duration::from_millis(50)).await;
        feed.input("");
        sleep(Duration::from_secs(1)).await;

        assert!(api.lookups.lock().unwrap().is_empty());
        assert!(feed.current().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_overtaken_lookup_is_discarded() {
        let api = Arc::new(SuggestApi {
            delays: HashMap::from([("head".to_string(), Duration::from_secs(1))]),
            ..Default::default()
        });
        let feed = SuggestionFeed::new(api.clone(), SuggestionConfig::default());
        let mut rx = feed.subscribe();
        rx.borrow_and_update();
        let published = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&published);
        tokio::spawn(async move {
            while rx.changed().await.is_ok() {
                let texts: Vec<String> = rx.borrow_and_update().iter().map(|s| s.text.clone()).collect();
                sink.lock().unwrap().push(texts);
            }
        });

        feed.input("head");
        sleep(Duration::from_millis(300)).await;
        feed.input("headphones");
        sleep(Duration::from_secs(3)).await;

        assert_eq!(
            *api.lookups.lock().unwrap(),
            vec!["head".to_string(), "headphones".to_string()]
        );
        assert_eq!(
            *published.lock().unwrap(),
            vec![vec!["headphones case".to_string()]]
        );
        assert_eq!(feed.current()[0].text, "headphones case");
    }
}
