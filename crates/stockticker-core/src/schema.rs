use serde::{Deserialize, Serialize};
use std::fmt;

/// A search hit, in the order the upstream ranked it.
/// ```json
/// { "symbol": "TCS", "name": "Tata Consultancy Services", "exchange": "NSE" }
/// ```
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct TickerCandidate {
    pub symbol: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exchange: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
}

/// One entry of the movers banner; replaced wholesale on every poll.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MoverQuote {
    pub symbol: String,
    pub price: f64,
    pub change: f64,
    pub change_percent: f64,
}

impl MoverQuote {
    pub fn new(symbol: &str, price: f64, change: f64, change_percent: f64) -> Self {
        Self {
            symbol: symbol.to_string(),
            price,
            change,
            change_percent,
        }
    }
}

/// Identity merged with the latest quote, as shown on a detail page.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StockRecord {
    pub symbol: String,
    pub name: String,
    pub price: f64,
    pub change: f64,
    pub change_percent: f64,
    pub high: f64,
    pub low: f64,
    pub open: f64,
    pub volume: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub market_cap: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pe: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub eps: Option<f64>,
}

impl StockRecord {
    pub fn previous_close(&self) -> f64 {
        self.price - self.change
    }

    pub fn is_gaining(&self) -> bool {
        self.change >= 0.0
    }
}

/// A single chart point. `time` is an opaque label (timestamp string,
/// `Day N`, or clock time) and is never re-sorted.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct PricePoint {
    pub time: String,
    pub price: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volume: Option<u64>,
}

/// Snapshot of a stock taken when it was favorited; it is not live-updated.
///
/// Numeric fields default to zero so that entries written by older builds
/// still load.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FavoriteEntry {
    pub symbol: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub price: f64,
    #[serde(default)]
    pub change: f64,
    #[serde(default)]
    pub change_percent: f64,
}

impl From<&StockRecord> for FavoriteEntry {
    fn from(record: &StockRecord) -> Self {
        Self {
            symbol: record.symbol.clone(),
            name: record.name.clone(),
            price: record.price,
            change: record.change,
            change_percent: record.change_percent,
        }
    }
}

/// Where a piece of data came from: the upstream, or a locally synthesized
/// placeholder standing in for it.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataSource {
    Live,
    Fallback,
}

impl DataSource {
    pub fn is_fallback(&self) -> bool {
        matches!(self, DataSource::Fallback)
    }
}

/// Granularity of the prices endpoint.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum Granularity {
    Intraday,
    Daily,
}

impl Granularity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Granularity::Intraday => "INTRADAY",
            Granularity::Daily => "DAILY",
        }
    }
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Query parameters of the prices endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PriceQuery {
    pub days: u32,
    pub granularity: Granularity,
    pub limit: usize,
}

impl PriceQuery {
    /// The single most recent intraday point, used as a quote.
    pub fn latest_quote() -> Self {
        Self {
            days: 1,
            granularity: Granularity::Intraday,
            limit: 1,
        }
    }
}
