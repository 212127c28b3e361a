//! Search session orchestration.
//!
//! A [`SearchSession`] is the handle a view holds. Behind it a single
//! driver task owns the [`SearchState`], debounces query text, issues
//! requests and publishes a [`ResultView`]. Only the response to the most
//! recently issued request is ever shown.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::api::SearchApi;
use crate::debounce::Debouncer;
use crate::query::DEFAULT_LIMIT;
use crate::state::{SearchSnapshot, SearchState};
use crate::view::ResultView;
use crate::{Result, SearchError, SearchFilters, SearchQuery, SearchResponse};

/// Session behaviour settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Quiet period before typed text triggers a search.
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
    /// Results per page.
    #[serde(default = "default_page_size")]
    pub page_size: u32,
    /// Whether completed searches are appended to the server-side history.
    #[serde(default = "default_record_history")]
    pub record_history: bool,
    /// Whether an empty query is sent to the server (browse all) instead
    /// of leaving the results pane idle.
    #[serde(default)]
    pub search_empty_query: bool,
}

fn default_debounce_ms() -> u64 {
    300
}

fn default_page_size() -> u32 {
    DEFAULT_LIMIT
}

fn default_record_history() -> bool {
    true
}

impl SessionConfig {
    /// Returns the debounce window.
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            debounce_ms: default_debounce_ms(),
            page_size: default_page_size(),
            record_history: default_record_history(),
            search_empty_query: false,
        }
    }
}

enum Command {
    SetQuery(String),
    Submit(String),
    SetFilters(SearchFilters),
    UpdateFilters(FilterUpdate, oneshot::Sender<Result<()>>),
    SetPage(u32),
    Reset,
    Retry,
}

type FilterUpdate = Box<dyn FnOnce(&mut SearchFilters) + Send>;

type Outcome = (u64, SearchQuery, Result<SearchResponse>);

/// Handle to a running search session.
///
/// Input methods return immediately; results arrive through
/// [`SearchSession::subscribe_view`]. Invalid filters and pages are
/// rejected before they take effect and never reach the server.
pub struct SearchSession {
    commands: mpsc::UnboundedSender<Command>,
    state: watch::Receiver<SearchSnapshot>,
    view: watch::Receiver<ResultView>,
    driver: JoinHandle<()>,
}

impl SearchSession {
    /// Starts a session. When `seed` is given (e.g. restored from the URL)
    /// the state starts there and, if it holds a query, exactly one search
    /// is issued for it without waiting for the debounce window.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(
        api: Arc<dyn SearchApi>,
        config: SessionConfig,
        seed: Option<SearchSnapshot>,
    ) -> Result<Self> {
        let mut state = SearchState::new(config.page_size);
        if let Some(seed) = seed {
            state.seed(SearchSnapshot {
                limit: config.page_size,
                ..seed
            })?;
        }

        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (view_tx, view_rx) = watch::channel(ResultView::Idle);
        let (outcome_tx, outcome_rx) = mpsc::unbounded_channel();
        let (debouncer, settled_rx) = Debouncer::channel(config.debounce());
        let state_rx = state.subscribe();

        let mut driver = Driver {
            settled_query: state.query().to_string(),
            state,
            api,
            config,
            debouncer,
            view: view_tx,
            outcomes: outcome_tx,
            generation: 0,
            in_flight: None,
            current: None,
        };
        if !driver.settled_query.is_empty() || driver.config.search_empty_query {
            driver.dispatch(false);
        }

        let handle = tokio::spawn(driver.run(command_rx, settled_rx, outcome_rx));

        Ok(Self {
            commands: command_tx,
            state: state_rx,
            view: view_rx,
            driver: handle,
        })
    }

    /// Updates the query text. A search follows once typing pauses.
    pub fn set_query(&self, query: impl Into<String>) -> Result<()> {
        self.send(Command::SetQuery(query.into()))
    }

    /// Sets the query text and searches right away, as on Enter.
    pub fn submit(&self, query: impl Into<String>) -> Result<()> {
        self.send(Command::Submit(query.into()))
    }

    /// Replaces the filters and searches immediately.
    pub fn set_filters(&self, filters: SearchFilters) -> Result<()> {
        let filters = filters.normalized();
        filters.validate()?;
        self.send(Command::SetFilters(filters))
    }

    /// Changes some filter fields and searches immediately. The update is
    /// applied to the filters as they stand after every earlier input, and
    /// the merged filters are validated as a whole.
    pub async fn update_filters<F>(&self, update: F) -> Result<()>
    where
        F: FnOnce(&mut SearchFilters) + Send + 'static,
    {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(Command::UpdateFilters(Box::new(update), reply_tx))?;
        reply_rx.await.map_err(|_| shut_down())?
    }

    /// Moves to another page.
    pub fn set_page(&self, page: u32) -> Result<()> {
        if page == 0 {
            return Err(SearchError::Validation("page must be at least 1".into()));
        }
        self.send(Command::SetPage(page))
    }

    /// Clears query, filters and results.
    pub fn reset(&self) -> Result<()> {
        self.send(Command::Reset)
    }

    /// Issues the current search again, e.g. after an error.
    pub fn retry(&self) -> Result<()> {
        self.send(Command::Retry)
    }

    /// Returns the current state.
    pub fn state(&self) -> SearchSnapshot {
        self.state.borrow().clone()
    }

    /// Subscribes to state changes.
    pub fn subscribe_state(&self) -> watch::Receiver<SearchSnapshot> {
        self.state.clone()
    }

    /// Returns the current view.
    pub fn view(&self) -> ResultView {
        self.view.borrow().clone()
    }

    /// Subscribes to view changes.
    pub fn subscribe_view(&self) -> watch::Receiver<ResultView> {
        self.view.clone()
    }

    /// Stops the session, cancelling any pending debounce and request.
    pub async fn shutdown(self) {
        drop(self.commands);
        if let Err(e) = self.driver.await {
            warn!("search session driver ended abnormally: {}", e);
        }
    }

    fn send(&self, command: Command) -> Result<()> {
        self.commands
            .send(command)
            .map_err(|_| shut_down())
    }
}

fn shut_down() -> SearchError {
    SearchError::Other("search session has shut down".into())
}

struct Driver {
    state: SearchState,
    api: Arc<dyn SearchApi>,
    config: SessionConfig,
    debouncer: Debouncer<String>,
    view: watch::Sender<ResultView>,
    outcomes: mpsc::UnboundedSender<Outcome>,
    /// Query text that has settled through the debouncer.
    settled_query: String,
    /// Incremented for every dispatched or abandoned request.
    generation: u64,
    in_flight: Option<JoinHandle<()>>,
    /// Request that produced the current view.
    current: Option<SearchQuery>,
}

impl Driver {
    async fn run(
        mut self,
        mut commands: mpsc::UnboundedReceiver<Command>,
        mut settled: mpsc::UnboundedReceiver<String>,
        mut outcomes: mpsc::UnboundedReceiver<Outcome>,
    ) {
        loop {
            tokio::select! {
                command = commands.recv() => match command {
                    Some(command) => self.handle(command),
                    None => break,
                },
                Some(text) = settled.recv() => self.on_settled(text),
                Some((generation, query, outcome)) = outcomes.recv() => {
                    self.on_outcome(generation, query, outcome);
                }
            }
        }

        self.debouncer.cancel();
        self.abandon();
        debug!("search session stopped");
    }

    fn handle(&mut self, command: Command) {
        match command {
            Command::SetQuery(text) => {
                if self.state.set_query(text.clone()) {
                    self.debouncer.call(text);
                }
            }
            Command::Submit(text) => {
                self.debouncer.discard();
                self.state.set_query(text);
                self.settled_query = self.state.query().to_string();
                self.dispatch(false);
            }
            Command::SetFilters(filters) => match self.state.set_filters(filters) {
                Ok(true) => self.dispatch(false),
                Ok(false) => {}
                Err(e) => warn!("rejected filters: {}", e),
            },
            Command::UpdateFilters(update, reply) => match self.state.update_filters(update) {
                Ok(changed) => {
                    let _ = reply.send(Ok(()));
                    if changed {
                        self.dispatch(false);
                    }
                }
                Err(e) => {
                    let _ = reply.send(Err(e));
                }
            },
            Command::SetPage(page) => match self.state.set_page(page) {
                Ok(true) => self.dispatch(false),
                Ok(false) => {}
                Err(e) => warn!("rejected page: {}", e),
            },
            Command::Reset => {
                self.debouncer.discard();
                self.state.reset();
                self.settled_query.clear();
                self.abandon();
                self.current = None;
                self.view.send_replace(ResultView::Idle);
            }
            Command::Retry => self.dispatch(true),
        }
    }

    fn on_settled(&mut self, text: String) {
        // Reset or submit may have moved the text on since it was typed.
        if text != self.state.query() {
            debug!(query = %text, "ignoring superseded debounced query");
            return;
        }
        // Already searched for, e.g. by Enter; only a retry re-sends it.
        if text == self.settled_query && self.current.as_ref() == Some(&self.next_query()) {
            debug!(query = %text, "debounced query already searched");
            return;
        }
        self.settled_query = text;
        self.dispatch(false);
    }

    fn next_query(&self) -> SearchQuery {
        SearchQuery {
            query: self.settled_query.clone(),
            ..self.state.to_query()
        }
    }

    fn dispatch(&mut self, force: bool) {
        let query = self.next_query();

        if query.query.trim().is_empty() && !self.config.search_empty_query {
            self.abandon();
            self.current = None;
            self.view.send_replace(ResultView::Idle);
            return;
        }

        let showing_error = matches!(*self.view.borrow(), ResultView::Error(_));
        if !force && !showing_error && self.current.as_ref() == Some(&query) {
            debug!(query = %query.query, "search unchanged, not re-issuing");
            return;
        }

        self.abandon();
        let generation = self.generation;
        self.current = Some(query.clone());
        self.view.send_replace(ResultView::Loading);

        debug!(
            generation,
            query = %query.query,
            page = query.page,
            "dispatching search"
        );
        let api = Arc::clone(&self.api);
        let outcomes = self.outcomes.clone();
        self.in_flight = Some(tokio::spawn(async move {
            let outcome = api.search(&query).await;
            let _ = outcomes.send((generation, query, outcome));
        }));
    }

    /// Aborts the in-flight request, if any, and invalidates its response.
    fn abandon(&mut self) {
        self.generation += 1;
        if let Some(handle) = self.in_flight.take() {
            handle.abort();
        }
    }

    fn on_outcome(&mut self, generation: u64, query: SearchQuery, outcome: Result<SearchResponse>) {
        if generation != self.generation {
            debug!(
                generation,
                current = self.generation,
                "discarding stale search response"
            );
            return;
        }
        self.in_flight = None;

        match &outcome {
            Ok(response) => {
                debug!(query = %query.query, total = response.total, "search completed");
                if self.config.record_history && !query.query.trim().is_empty() {
                    self.record_history(query.query, response.total);
                }
            }
            Err(e) => warn!(query = %query.query, "search failed: {}", e),
        }

        self.view.send_replace(ResultView::from_outcome(&outcome));
    }

    /// Appends to the search history without waiting for or reporting the
    /// result.
    fn record_history(&self, query: String, total: u64) {
        let api = Arc::clone(&self.api);
        tokio::spawn(async move {
            if let Err(e) = api.add_history(&query, total).await {
                warn!("failed to record search history for '{}': {}", query, e);
            }
        });
    }
}
