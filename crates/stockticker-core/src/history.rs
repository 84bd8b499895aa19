use crate::api::{bounded, MarketApi};
use crate::config::Config;
use crate::error::Error;
use crate::fallback;
use crate::normalize;
use crate::schema::{DataSource, Granularity, PricePoint, PriceQuery};
use crate::task::{TaskHandle, TaskSlot};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, trace, warn};

/// Chart window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Period {
    #[default]
    OneDay,
    OneWeek,
    OneMonth,
    ThreeMonths,
    OneYear,
}

impl Period {
    pub const ALL: [Period; 5] = [
        Period::OneDay,
        Period::OneWeek,
        Period::OneMonth,
        Period::ThreeMonths,
        Period::OneYear,
    ];

    pub fn days(&self) -> u32 {
        match self {
            Period::OneDay => 1,
            Period::OneWeek => 7,
            Period::OneMonth => 30,
            Period::ThreeMonths => 90,
            Period::OneYear => 365,
        }
    }

    /// Only the one-day window is intraday.
    pub fn granularity(&self) -> Granularity {
        match self {
            Period::OneDay => Granularity::Intraday,
            _ => Granularity::Daily,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Period::OneDay => "1D",
            Period::OneWeek => "1W",
            Period::OneMonth => "1M",
            Period::ThreeMonths => "3M",
            Period::OneYear => "1Y",
        }
    }

    pub fn query(&self, limit: usize) -> PriceQuery {
        PriceQuery {
            days: self.days(),
            granularity: self.granularity(),
            limit,
        }
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Period {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Period::ALL
            .into_iter()
            .find(|period| period.label().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| Error::InvalidPeriod(s.to_string()))
    }
}

/// Price points of one symbol over one window, in upstream order.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceSeries {
    pub symbol: String,
    pub period: Period,
    pub points: Vec<PricePoint>,
    pub source: DataSource,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SeriesSummary {
    pub current: f64,
    pub change: f64,
    pub change_percent: f64,
}

impl SeriesSummary {
    pub fn is_gaining(&self) -> bool {
        self.change >= 0.0
    }
}

impl PriceSeries {
    /// Last price against the first; all zero for an empty series, and a
    /// zero percentage when the first price is zero.
    pub fn summary(&self) -> SeriesSummary {
        let first = self.points.first().map_or(0.0, |p| p.price);
        let current = self.points.last().map_or(0.0, |p| p.price);
        let change = current - first;
        let change_percent = if first != 0.0 { change / first * 100.0 } else { 0.0 };
        SeriesSummary {
            current,
            change,
            change_percent,
        }
    }
}

/// Fetch the series for `symbol` over `period`.
///
/// Any failure, including a payload that is not an array, gives a synthetic
/// series marked [`DataSource::Fallback`].
pub async fn fetch_history(
    api: &dyn MarketApi,
    symbol: &str,
    period: Period,
    config: &Config,
) -> PriceSeries {
    let query = period.query(config.history_limit);
    let result = bounded(config.request_timeout, api.prices(symbol, query))
        .await
        .and_then(|payload| normalize::price_series(&payload));

    let (points, source) = match result {
        Ok(points) => {
            debug!("{} {period} points for {symbol}", points.len());
            (points, DataSource::Live)
        }
        Err(e) => {
            warn!("{period} history for {symbol} unavailable, synthesizing: {e}");
            let points = fallback::price_series(period.days(), &mut rand::thread_rng());
            (points, DataSource::Fallback)
        }
    };

    PriceSeries {
        symbol: symbol.to_string(),
        period,
        points,
        source,
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct HistoryView {
    pub symbol: String,
    pub period: Period,
    /// The series of the current selection, once it has landed.
    pub series: Option<PriceSeries>,
    pub loading: bool,
}

/// The chart of a detail page: re-fetches whenever the symbol or the period
/// changes, and only ever shows the series of the latest selection.
pub struct PriceHistory {
    api: Arc<dyn MarketApi>,
    config: Config,
    state: Arc<watch::Sender<HistoryView>>,
    pending: TaskSlot,
}

impl PriceHistory {
    pub fn new(api: Arc<dyn MarketApi>, config: &Config, symbol: impl Into<String>, period: Period) -> Self {
        let (state, _) = watch::channel(HistoryView {
            symbol: symbol.into(),
            period,
            series: None,
            loading: true,
        });
        let mut history = Self {
            api,
            config: config.clone(),
            state: Arc::new(state),
            pending: TaskSlot::new(),
        };
        history.reload();
        history
    }

    pub fn set_symbol(&mut self, symbol: impl Into<String>) {
        let symbol = symbol.into();
        if self.state.borrow().symbol == symbol {
            return;
        }
        self.state.send_modify(|view| view.symbol = symbol);
        self.reload();
    }

    pub fn set_period(&mut self, period: Period) {
        if self.state.borrow().period == period {
            return;
        }
        self.state.send_modify(|view| view.period = period);
        self.reload();
    }

    pub fn subscribe(&self) -> watch::Receiver<HistoryView> {
        self.state.subscribe()
    }

    pub fn view(&self) -> HistoryView {
        self.state.borrow().clone()
    }

    fn reload(&mut self) {
        let (symbol, period) = {
            let view = self.state.borrow();
            (view.symbol.clone(), view.period)
        };
        self.state.send_modify(|view| view.loading = true);

        let api = self.api.clone();
        let config = self.config.clone();
        let state = self.state.clone();
        self.pending.replace(TaskHandle::spawn("history fetch", async move {
            let series = fetch_history(api.as_ref(), &symbol, period, &config).await;
            let applied = state.send_if_modified(|view| {
                if view.symbol != series.symbol || view.period != series.period {
                    return false;
                }
                view.series = Some(series);
                view.loading = false;
                true
            });
            if !applied {
                trace!("dropping stale {period} series for {symbol}");
            }
        }));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedApi;
    use serde_json::json;
    use std::time::Duration;

    fn series(prices: &[f64]) -> PriceSeries {
        PriceSeries {
            symbol: "TCS".to_string(),
            period: Period::OneDay,
            points: prices
                .iter()
                .enumerate()
                .map(|(i, &price)| PricePoint {
                    time: i.to_string(),
                    price,
                    volume: None,
                })
                .collect(),
            source: DataSource::Live,
        }
    }

    #[test]
    fn periods_map_to_query_windows() {
        assert_eq!(
            Period::OneDay.query(100),
            PriceQuery {
                days: 1,
                granularity: Granularity::Intraday,
                limit: 100
            }
        );
        assert_eq!(
            Period::OneMonth.query(100),
            PriceQuery {
                days: 30,
                granularity: Granularity::Daily,
                limit: 100
            }
        );
        assert_eq!(Period::OneYear.days(), 365);
    }

    #[test]
    fn periods_parse_case_insensitively() {
        assert_eq!("3m".parse::<Period>().unwrap(), Period::ThreeMonths);
        assert_eq!(" 1W ".parse::<Period>().unwrap(), Period::OneWeek);
        assert!(matches!("2D".parse::<Period>(), Err(Error::InvalidPeriod(_))));
    }

    #[test]
    fn summary_compares_last_with_first() {
        let summary = series(&[100.0, 90.0, 110.0]).summary();
        assert_eq!(summary.current, 110.0);
        assert_eq!(summary.change, 10.0);
        assert!((summary.change_percent - 10.0).abs() < 1e-9);

        let flat_start = series(&[0.0, 5.0]).summary();
        assert_eq!(flat_start.change, 5.0);
        assert_eq!(flat_start.change_percent, 0.0);

        let empty = series(&[]).summary();
        assert_eq!((empty.current, empty.change, empty.change_percent), (0.0, 0.0, 0.0));
    }

    #[tokio::test]
    async fn live_series_keeps_upstream_points() {
        let api = ScriptedApi::new();
        api.push_prices(Ok(json!([
            { "time": "09:15", "price": 101.0 },
            { "time": "09:20", "price": 102.5, "volume": 300 }
        ])));

        let series = fetch_history(&api, "TCS", Period::OneMonth, &Config::default()).await;
        assert_eq!(series.source, DataSource::Live);
        assert_eq!(series.points.len(), 2);
        assert_eq!(series.points[1].volume, Some(300));
        assert_eq!(
            api.prices_calls(),
            vec![("TCS".to_string(), Period::OneMonth.query(100))]
        );
    }

    #[tokio::test]
    async fn non_array_payload_synthesizes() {
        let api = ScriptedApi::new();
        api.push_prices(Ok(json!({ "error": "no data" })));
        let week = fetch_history(&api, "TCS", Period::OneWeek, &Config::default()).await;
        assert!(week.source.is_fallback());
        assert_eq!(week.points.len(), 14);
        assert_eq!(week.points[0].time, "Day 1");

        api.push_prices(Err(Error::Status(500)));
        let day = fetch_history(&api, "TCS", Period::OneDay, &Config::default()).await;
        assert_eq!(day.points.len(), 24);
        assert_eq!(day.points[1].time, "09:30");
    }

    #[tokio::test(start_paused = true)]
    async fn latest_selection_wins() {
        let api = Arc::new(ScriptedApi::new());
        api.set_latency(Duration::from_millis(200));
        // the aborted 1D call never takes this answer
        api.push_prices(Ok(json!([{ "time": "b", "price": 2.0 }])));

        let mut history = PriceHistory::new(api.clone(), &Config::default(), "TCS", Period::OneDay);
        tokio::time::sleep(Duration::from_millis(50)).await;
        history.set_period(Period::OneYear);
        assert!(history.view().loading);

        tokio::time::sleep(Duration::from_secs(1)).await;
        let view = history.view();
        assert!(!view.loading);
        let series = view.series.unwrap();
        assert_eq!(series.period, Period::OneYear);
        assert_eq!(series.points[0].time, "b");
        assert_eq!(api.prices_calls().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn unchanged_selection_does_not_refetch() {
        let api = Arc::new(ScriptedApi::new());
        let mut history = PriceHistory::new(api.clone(), &Config::default(), "TCS", Period::OneDay);
        tokio::time::sleep(Duration::from_millis(10)).await;

        history.set_period(Period::OneDay);
        history.set_symbol("TCS");
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(api.prices_calls().len(), 1);
        assert!(history.view().series.unwrap().source.is_fallback());
    }
}
