use crate::api::{bounded, MarketApi};
use crate::config::Config;
use crate::normalize;
use crate::schema::TickerCandidate;
use crate::task::{TaskHandle, TaskSlot};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, trace, warn};

/// Where the view should go next.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    /// The detail view of a symbol.
    Stock(String),
}

/// Why the search service could not answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unavailable {
    /// The service answered with a non-success status.
    ServiceDown,
    /// The service could not be reached, timed out, or sent garbage.
    Connection,
}

impl Unavailable {
    pub fn message(&self) -> &'static str {
        match self {
            Unavailable::ServiceDown => "Search service temporarily unavailable",
            Unavailable::Connection => "Unable to search. Please check your connection.",
        }
    }
}

/// The mutually exclusive states of the result panel.
#[derive(Debug, Clone, PartialEq)]
pub enum SearchOutcome {
    /// No query; nothing to show.
    Empty,
    Matches(Vec<TickerCandidate>),
    NoResults { query: String },
    Unavailable(Unavailable),
}

impl SearchOutcome {
    /// Human-readable text for the non-match states.
    pub fn message(&self) -> Option<String> {
        match self {
            SearchOutcome::NoResults { query } => Some(format!("No results found for \"{query}\"")),
            SearchOutcome::Unavailable(reason) => Some(reason.message().to_string()),
            SearchOutcome::Empty | SearchOutcome::Matches(_) => None,
        }
    }

    pub fn matches(&self) -> &[TickerCandidate] {
        match self {
            SearchOutcome::Matches(hits) => hits,
            _ => &[],
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SearchView {
    pub query: String,
    pub panel_open: bool,
    pub loading: bool,
    pub outcome: SearchOutcome,
}

impl Default for SearchView {
    fn default() -> Self {
        Self {
            query: String::new(),
            panel_open: false,
            loading: false,
            outcome: SearchOutcome::Empty,
        }
    }
}

/// Debounced free-text to ticker resolution.
///
/// Each call to [`set_query`](Self::set_query) supersedes the previous one:
/// its pending timer, or its request if already dispatched, is cancelled,
/// and a generation counter keeps any answer that slips through from being
/// shown. Dropping the resolver cancels whatever is pending.
pub struct SymbolResolver {
    api: Arc<dyn MarketApi>,
    debounce: Duration,
    timeout: Duration,
    limit: usize,
    state: Arc<watch::Sender<SearchView>>,
    generation: Arc<AtomicU64>,
    pending: TaskSlot,
}

impl SymbolResolver {
    pub fn new(api: Arc<dyn MarketApi>, config: &Config) -> Self {
        let (state, _) = watch::channel(SearchView::default());
        Self {
            api,
            debounce: config.debounce,
            timeout: config.request_timeout,
            limit: config.search_limit,
            state: Arc::new(state),
            generation: Arc::new(AtomicU64::new(0)),
            pending: TaskSlot::new(),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<SearchView> {
        self.state.subscribe()
    }

    pub fn view(&self) -> SearchView {
        self.state.borrow().clone()
    }

    /// The query text changed.
    pub fn set_query(&mut self, query: impl Into<String>) {
        let query = query.into();
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.pending.cancel();

        if query.trim().is_empty() {
            trace!("empty query; clearing results");
            self.state.send_modify(|view| {
                view.query = query;
                view.panel_open = false;
                view.loading = false;
                view.outcome = SearchOutcome::Empty;
            });
            return;
        }

        self.state.send_modify(|view| {
            view.query = query.clone();
            view.loading = false;
        });

        let search = Search {
            api: self.api.clone(),
            state: self.state.clone(),
            generation: self.generation.clone(),
            issued: generation,
            timeout: self.timeout,
            limit: self.limit,
            query,
        };
        self.pending.replace(TaskHandle::schedule(
            "search debounce",
            self.debounce,
            search.run(),
        ));
    }

    /// A candidate was picked: clear the query, close the panel, and route
    /// to its detail view.
    pub fn select(&mut self, candidate: &TickerCandidate) -> Route {
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.pending.cancel();
        self.state.send_modify(|view| *view = SearchView::default());
        debug!("selected {}", candidate.symbol);
        Route::Stock(candidate.symbol.clone())
    }

    /// The form was submitted without an explicit pick; the top candidate
    /// is selected, if there is one.
    pub fn submit(&mut self) -> Option<Route> {
        let first = self.state.borrow().outcome.matches().first().cloned();
        first.map(|candidate| self.select(&candidate))
    }

    /// A click landed outside the panel; the query text stays.
    pub fn dismiss(&self) {
        self.state.send_if_modified(|view| std::mem::replace(&mut view.panel_open, false));
    }

    /// The input regained focus; reopen the panel for a non-empty query.
    pub fn focus(&self) {
        self.state.send_if_modified(|view| {
            if view.query.is_empty() || view.panel_open {
                return false;
            }
            view.panel_open = true;
            true
        });
    }

    /// Whether a debounce timer or request is still outstanding.
    pub fn is_settled(&self) -> bool {
        self.pending.is_idle()
    }
}

struct Search {
    api: Arc<dyn MarketApi>,
    state: Arc<watch::Sender<SearchView>>,
    generation: Arc<AtomicU64>,
    issued: u64,
    timeout: Duration,
    limit: usize,
    query: String,
}

impl Search {
    fn is_current(&self) -> bool {
        self.generation.load(Ordering::SeqCst) == self.issued
    }

    async fn run(self) {
        if !self.state.send_if_modified(|view| {
            if !self.is_current() {
                return false;
            }
            view.loading = true;
            true
        }) {
            return;
        }

        debug!("searching for {:?}", self.query);
        let result = bounded(self.timeout, self.api.search(&self.query, self.limit))
            .await
            .and_then(|payload| normalize::candidates(&payload));

        let outcome = match result {
            Ok(hits) if hits.is_empty() => SearchOutcome::NoResults {
                query: self.query.clone(),
            },
            Ok(hits) => SearchOutcome::Matches(hits),
            Err(e) => {
                warn!("search for {:?} failed: {e}", self.query);
                if e.is_status() {
                    SearchOutcome::Unavailable(Unavailable::ServiceDown)
                } else {
                    SearchOutcome::Unavailable(Unavailable::Connection)
                }
            }
        };

        let applied = self.state.send_if_modified(|view| {
            if !self.is_current() {
                return false;
            }
            view.loading = false;
            view.panel_open = true;
            view.outcome = outcome;
            true
        });
        if !applied {
            trace!("discarding stale results for {:?}", self.query);
        }
    }
}
