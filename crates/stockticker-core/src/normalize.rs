//! Normalization of the upstream's loosely shaped payloads.
//!
//! The market-data API names the same quantity differently from endpoint to
//! endpoint (`price`/`close`/`ltp`, `percent`/`per_change`, ...) and may send
//! numbers as JSON strings. Every field is read through an ordered chain of
//! candidate keys: the first key that holds a finite, non-zero number (or a
//! string parsing to one) wins. Absent, `null`, unparseable, and zero values
//! all fall through to the next key, so `{ "price": 0, "close": 101.5 }`
//! reads as 101.5.

use crate::error::{Error, Result};
use crate::schema::{MoverQuote, PricePoint, TickerCandidate};
use serde_json::Value;
use tracing::trace;

/// Chart point price: explicit price, then close, then last traded price.
pub const PRICE_FIELDS: &[&str] = &["price", "close", "ltp"];
pub const TIME_FIELDS: &[&str] = &["time", "timestamp"];

pub const MOVER_SYMBOL_FIELDS: &[&str] = &["symbol", "name"];
pub const MOVER_PRICE_FIELDS: &[&str] = &["open", "ltp"];
pub const MOVER_PERCENT_FIELDS: &[&str] = &["percent", "per_change"];

pub const QUOTE_PRICE_FIELDS: &[&str] = &["price", "close", "ltp", "open"];
pub const QUOTE_PERCENT_FIELDS: &[&str] = &["changePercent", "percent", "per_change"];
pub const QUOTE_MARKET_CAP_FIELDS: &[&str] = &["marketCap", "market_cap"];

/// First finite, non-zero number found under `keys`.
pub fn number(obj: &Value, keys: &[&str]) -> Option<f64> {
    keys.iter().find_map(|key| {
        let n = match obj.get(*key)? {
            Value::Number(n) => n.as_f64()?,
            Value::String(s) => s.trim().parse::<f64>().ok()?,
            _ => return None,
        };
        // zero counts as missing
        (n.is_finite() && n != 0.0).then_some(n)
    })
}

/// First non-empty text found under `keys`; numbers are rendered as text.
pub fn text(obj: &Value, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| match obj.get(*key)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

/// A non-negative count, rounded.
pub fn count(obj: &Value, keys: &[&str]) -> Option<u64> {
    number(obj, keys)
        .filter(|n| *n >= 0.0)
        .map(|n| n.round() as u64)
}

fn as_array<'a>(payload: &'a Value, what: &str) -> Result<&'a Vec<Value>> {
    payload
        .as_array()
        .ok_or_else(|| Error::Malformed(format!("{what}: expected an array")))
}

/// Search hits, upstream order preserved. Entries without a symbol are dropped.
pub fn candidates(payload: &Value) -> Result<Vec<TickerCandidate>> {
    let hits = as_array(payload, "search")?
        .iter()
        .filter_map(|hit| {
            let symbol = text(hit, &["symbol"])?;
            Some(TickerCandidate {
                name: text(hit, &["name"]).unwrap_or_else(|| symbol.clone()),
                exchange: text(hit, &["exchange"]),
                kind: text(hit, &["type"]),
                symbol,
            })
        })
        .collect::<Vec<_>>();
    trace!("normalized {} search hits", hits.len());
    Ok(hits)
}

/// One movers entry; missing numbers default to zero instead of failing the entry.
pub fn mover(entry: &Value) -> MoverQuote {
    MoverQuote {
        symbol: text(entry, MOVER_SYMBOL_FIELDS).unwrap_or_else(|| "N/A".to_string()),
        price: number(entry, MOVER_PRICE_FIELDS).unwrap_or(0.0),
        change: number(entry, &["change"]).unwrap_or(0.0),
        change_percent: number(entry, MOVER_PERCENT_FIELDS).unwrap_or(0.0),
    }
}

/// The `gainers` of a movers payload, truncated to `limit`.
///
/// A payload without a `gainers` array is an empty list, not an error.
pub fn movers(payload: &Value, limit: usize) -> Vec<MoverQuote> {
    payload
        .get("gainers")
        .and_then(Value::as_array)
        .map(|gainers| gainers.iter().take(limit).map(mover).collect())
        .unwrap_or_default()
}

/// One chart point. `index` labels points that carry no time of their own.
pub fn price_point(entry: &Value, index: usize) -> PricePoint {
    PricePoint {
        time: text(entry, TIME_FIELDS).unwrap_or_else(|| index.to_string()),
        price: number(entry, PRICE_FIELDS).unwrap_or(0.0),
        volume: count(entry, &["volume"]),
    }
}

/// A whole price series; anything but an array is malformed.
pub fn price_series(payload: &Value) -> Result<Vec<PricePoint>> {
    Ok(as_array(payload, "prices")?
        .iter()
        .enumerate()
        .map(|(i, entry)| price_point(entry, i))
        .collect())
}

/// Quote fields of the newest price point; every field stays optional.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Quote {
    pub price: Option<f64>,
    pub open: Option<f64>,
    pub high: Option<f64>,
    pub low: Option<f64>,
    pub change: Option<f64>,
    pub change_percent: Option<f64>,
    pub volume: Option<u64>,
    pub market_cap: Option<f64>,
    pub pe: Option<f64>,
    pub eps: Option<f64>,
}

impl Quote {
    /// Whether the upstream supplied every field, leaving nothing to
    /// synthesize.
    pub fn is_complete(&self) -> bool {
        [
            self.price,
            self.open,
            self.high,
            self.low,
            self.change,
            self.change_percent,
            self.market_cap,
            self.pe,
            self.eps,
        ]
        .iter()
        .all(Option::is_some)
            && self.volume.is_some()
    }
}

/// The first element of a prices payload, if it is an object.
pub fn quote(payload: &Value) -> Option<Quote> {
    let first = payload.as_array()?.first().filter(|v| v.is_object())?;
    Some(Quote {
        price: number(first, QUOTE_PRICE_FIELDS),
        open: number(first, &["open"]),
        high: number(first, &["high"]),
        low: number(first, &["low"]),
        change: number(first, &["change"]),
        change_percent: number(first, QUOTE_PERCENT_FIELDS),
        volume: count(first, &["volume"]),
        market_cap: number(first, QUOTE_MARKET_CAP_FIELDS),
        pe: number(first, &["pe"]),
        eps: number(first, &["eps"]),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn number_walks_the_chain_in_order() {
        let point = json!({ "close": "101.5", "ltp": 99.0 });
        assert_eq!(number(&point, PRICE_FIELDS), Some(101.5));

        let point = json!({ "price": null, "close": "n/a", "ltp": 99.0 });
        assert_eq!(number(&point, PRICE_FIELDS), Some(99.0));

        assert_eq!(number(&json!({}), PRICE_FIELDS), None);
    }

    #[test]
    fn zero_falls_through_to_the_next_key() {
        let point = json!({ "price": 0, "close": 101.5 });
        assert_eq!(number(&point, PRICE_FIELDS), Some(101.5));

        let point = json!({ "price": "0", "close": 0.0, "ltp": "99.5" });
        assert_eq!(number(&point, PRICE_FIELDS), Some(99.5));

        assert_eq!(number(&json!({ "price": 0 }), PRICE_FIELDS), None);
        assert_eq!(count(&json!({ "volume": 0 }), &["volume"]), None);

        let entry = json!({
            "symbol": "INFY", "open": 0, "ltp": 1567.8, "percent": 0, "per_change": 2.5
        });
        assert_eq!(mover(&entry), MoverQuote::new("INFY", 1567.8, 0.0, 2.5));

        let point = price_point(&json!({ "time": "09:15", "price": 0, "ltp": 42.0 }), 0);
        assert_eq!(point.price, 42.0);
    }

    #[test]
    fn movers_default_missing_numbers_to_zero() {
        let payload = json!({
            "gainers": [
                { "symbol": "TCS", "open": "3234.5", "change": -12.3, "percent": -0.38 },
                { "name": "Infosys", "ltp": 1567.8, "per_change": "2.97" },
                { "change": 1.0 }
            ]
        });
        let quotes = movers(&payload, 10);
        assert_eq!(quotes.len(), 3);
        assert_eq!(quotes[0], MoverQuote::new("TCS", 3234.5, -12.3, -0.38));
        assert_eq!(quotes[1], MoverQuote::new("Infosys", 1567.8, 0.0, 2.97));
        assert_eq!(quotes[2], MoverQuote::new("N/A", 0.0, 1.0, 0.0));
    }

    #[test]
    fn movers_are_truncated_and_tolerate_missing_gainers() {
        let gainers: Vec<Value> = (0..15).map(|i| json!({ "symbol": format!("S{i}") })).collect();
        assert_eq!(movers(&json!({ "gainers": gainers }), 10).len(), 10);
        assert!(movers(&json!({ "losers": [] }), 10).is_empty());
        assert!(movers(&json!([1, 2, 3]), 10).is_empty());
    }

    #[test]
    fn price_series_keeps_upstream_order() {
        let payload = json!([
            { "timestamp": "2024-03-01 15:00", "close": 10.0, "volume": "1500" },
            { "time": "2024-03-01 09:15", "price": 12.0 },
            { "ltp": 11.0 }
        ]);
        let points = price_series(&payload).unwrap();
        assert_eq!(points[0].time, "2024-03-01 15:00");
        assert_eq!(points[0].volume, Some(1500));
        assert_eq!(points[1].time, "2024-03-01 09:15");
        assert_eq!(points[1].volume, None);
        assert_eq!(points[2].time, "2");
        assert_eq!(points[2].price, 11.0);
    }

    #[test]
    fn non_array_series_is_malformed() {
        let err = price_series(&json!({ "error": "nope" })).unwrap_err();
        assert!(matches!(err, Error::Malformed(_)));
    }

    #[test]
    fn candidates_require_a_symbol() {
        let payload = json!([
            { "symbol": "RELIANCE", "name": "Reliance Industries", "exchange": "NSE" },
            { "name": "no symbol" },
            { "symbol": "ITC" }
        ]);
        let hits = candidates(&payload).unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].symbol, "RELIANCE");
        assert_eq!(hits[1].name, "ITC");
    }

    #[test]
    fn quote_reads_first_point_only() {
        let payload = json!([
            { "close": 101.0, "open": 100.0, "high": 102.0, "low": 99.0, "changePercent": 1.0 },
            { "close": 5.0 }
        ]);
        let q = quote(&payload).unwrap();
        assert_eq!(q.price, Some(101.0));
        assert_eq!(q.open, Some(100.0));
        assert_eq!(q.change_percent, Some(1.0));
        assert_eq!(q.change, None);

        assert!(quote(&json!([])).is_none());
        assert!(quote(&json!({ "close": 1.0 })).is_none());
    }

    #[test]
    fn quote_is_complete_only_with_every_field() {
        let full = json!([{
            "close": 101.0, "open": 100.0, "high": 102.0, "low": 99.0,
            "change": 1.0, "changePercent": 1.0, "volume": 10,
            "market_cap": 5000.0, "pe": 20.0, "eps": 5.0
        }]);
        assert!(quote(&full).unwrap().is_complete());

        let partial = json!([{ "high": 3250, "low": 3200, "volume": 42, "change": 1.25 }]);
        assert!(!quote(&partial).unwrap().is_complete());
        assert!(!Quote::default().is_complete());
    }
}
