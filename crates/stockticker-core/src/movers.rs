use crate::api::{bounded, MarketApi};
use crate::config::Config;
use crate::fallback;
use crate::normalize;
use crate::schema::{DataSource, MoverQuote};
use crate::task::TaskHandle;
use chrono::{DateTime, Local};
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};

/// Shown in place of live quotes while the upstream is failing.
pub const DEGRADED_NOTICE: &str = "Unable to load market data";

/// One poll of the movers endpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct MoversSnapshot {
    pub quotes: Vec<MoverQuote>,
    pub source: DataSource,
    pub notice: Option<String>,
    pub updated_at: DateTime<Local>,
}

/// Fetch the current movers of `config.movers_index`.
///
/// Never fails: a network error, bad status, or timeout yields the demo list
/// with [`DEGRADED_NOTICE`].
pub async fn fetch_movers(api: &dyn MarketApi, config: &Config) -> MoversSnapshot {
    let result = bounded(config.request_timeout, api.movers(&config.movers_index)).await;
    let updated_at = Local::now();

    match result {
        Ok(payload) => {
            let quotes = normalize::movers(&payload, config.movers_limit);
            debug!("{} movers for {}", quotes.len(), config.movers_index);
            MoversSnapshot {
                quotes,
                source: DataSource::Live,
                notice: None,
                updated_at,
            }
        }
        Err(e) => {
            warn!("movers fetch failed, showing demo data: {e}");
            MoversSnapshot {
                quotes: fallback::demo_movers(),
                source: DataSource::Fallback,
                notice: Some(DEGRADED_NOTICE.to_string()),
                updated_at,
            }
        }
    }
}

/// What the banner renders.
#[derive(Debug, Clone, PartialEq)]
pub struct MoversView {
    pub quotes: Vec<MoverQuote>,
    pub source: DataSource,
    pub notice: Option<String>,
    /// No snapshot has landed yet.
    pub loading: bool,
    /// A manual refresh is in flight.
    pub refreshing: bool,
    pub updated_at: Option<DateTime<Local>>,
}

impl Default for MoversView {
    fn default() -> Self {
        Self {
            quotes: Vec::new(),
            source: DataSource::Live,
            notice: None,
            loading: true,
            refreshing: false,
            updated_at: None,
        }
    }
}

impl MoversView {
    pub fn is_degraded(&self) -> bool {
        self.source.is_fallback()
    }

    /// The list twice over, for a seamless scrolling strip.
    pub fn looped(&self) -> impl Iterator<Item = &MoverQuote> + '_ {
        self.quotes.iter().chain(self.quotes.iter())
    }

    fn apply(&mut self, snapshot: MoversSnapshot) {
        self.quotes = snapshot.quotes;
        self.source = snapshot.source;
        self.notice = snapshot.notice;
        self.updated_at = Some(snapshot.updated_at);
        self.loading = false;
        self.refreshing = false;
    }
}

/// Polls the movers endpoint on a fixed period for as long as it lives.
///
/// The period is anchored at spawn time; a manual [`refresh`](Self::refresh)
/// fetches immediately without shifting the next scheduled poll. Dropping
/// the feed stops the loop.
pub struct MoversFeed {
    state: Arc<watch::Sender<MoversView>>,
    refresh: mpsc::Sender<()>,
    _poller: TaskHandle,
}

impl MoversFeed {
    pub fn spawn(api: Arc<dyn MarketApi>, config: &Config) -> Self {
        let (state, _) = watch::channel(MoversView::default());
        let state = Arc::new(state);
        let (refresh, requests) = mpsc::channel(1);
        let poller = TaskHandle::spawn(
            "movers poll",
            poll(api, config.clone(), state.clone(), requests),
        );
        Self {
            state,
            refresh,
            _poller: poller,
        }
    }

    /// Fetch now. A refresh that is already queued absorbs this one.
    pub fn refresh(&self) {
        if self.refresh.try_send(()).is_ok() {
            self.state.send_modify(|view| view.refreshing = true);
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<MoversView> {
        self.state.subscribe()
    }

    pub fn view(&self) -> MoversView {
        self.state.borrow().clone()
    }
}

async fn poll(
    api: Arc<dyn MarketApi>,
    config: Config,
    state: Arc<watch::Sender<MoversView>>,
    mut requests: mpsc::Receiver<()>,
) {
    let mut ticker = tokio::time::interval(config.movers_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            Some(()) = requests.recv() => debug!("manual movers refresh"),
        }
        let snapshot = fetch_movers(api.as_ref(), &config).await;
        state.send_modify(|view| view.apply(snapshot));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedApi;
    use crate::Error;
    use serde_json::json;
    use std::time::Duration;

    #[tokio::test]
    async fn failure_shows_the_demo_list() {
        let api = ScriptedApi::new();
        api.push_movers(Err(Error::Status(500)));

        let snapshot = fetch_movers(&api, &Config::default()).await;
        assert_eq!(snapshot.quotes, fallback::demo_movers());
        assert_eq!(snapshot.quotes.len(), 5);
        assert_eq!(snapshot.source, DataSource::Fallback);
        assert_eq!(snapshot.notice.as_deref(), Some(DEGRADED_NOTICE));
        assert_eq!(api.movers_calls(), vec!["NIFTY".to_string()]);
    }

    #[tokio::test(start_paused = true)]
    async fn hung_upstream_degrades_after_the_timeout() {
        let api = ScriptedApi::new();
        api.hang();
        let config = Config::default().with_timeout(Duration::from_secs(4));

        let snapshot = fetch_movers(&api, &config).await;
        assert!(snapshot.source.is_fallback());
    }

    #[tokio::test(start_paused = true)]
    async fn feed_polls_and_recovers() {
        let api = Arc::new(ScriptedApi::new());
        api.push_movers(Err(Error::Status(503)));
        api.push_movers(Ok(json!({
            "gainers": [{ "symbol": "TCS", "open": 3234.5, "change": 12.0, "percent": 0.4 }]
        })));
        let feed = MoversFeed::spawn(api.clone(), &Config::default());
        assert!(feed.view().loading);

        tokio::time::sleep(Duration::from_millis(10)).await;
        let view = feed.view();
        assert!(!view.loading);
        assert!(view.is_degraded());
        assert_eq!(view.notice.as_deref(), Some(DEGRADED_NOTICE));

        tokio::time::sleep(Duration::from_secs(30)).await;
        let view = feed.view();
        assert!(!view.is_degraded());
        assert_eq!(view.notice, None);
        assert_eq!(view.quotes, vec![MoverQuote::new("TCS", 3234.5, 12.0, 0.4)]);
        assert_eq!(api.movers_calls().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn manual_refresh_keeps_the_schedule() {
        let api = Arc::new(ScriptedApi::new());
        let feed = MoversFeed::spawn(api.clone(), &Config::default());

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(api.movers_calls().len(), 1);

        feed.refresh();
        assert!(feed.view().refreshing);
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(api.movers_calls().len(), 2);
        assert!(!feed.view().refreshing);

        // still due at t = 30s, not t = 40s
        tokio::time::sleep(Duration::from_secs(21)).await;
        assert_eq!(api.movers_calls().len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_the_feed_stops_polling() {
        let api = Arc::new(ScriptedApi::new());
        let feed = MoversFeed::spawn(api.clone(), &Config::default());
        tokio::time::sleep(Duration::from_millis(10)).await;
        drop(feed);

        tokio::time::sleep(Duration::from_secs(120)).await;
        assert_eq!(api.movers_calls().len(), 1);
    }

    #[test]
    fn looped_repeats_without_copying() {
        let view = MoversView {
            quotes: fallback::demo_movers(),
            loading: false,
            ..MoversView::default()
        };
        let symbols: Vec<&str> = view.looped().map(|q| q.symbol.as_str()).collect();
        assert_eq!(symbols.len(), 10);
        assert_eq!(symbols[0], symbols[5]);
    }
}
