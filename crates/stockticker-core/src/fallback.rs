//! Placeholder data, substituted when the upstream is down or answers with
//! something unusable. None of these numbers mean anything; they only keep a
//! view populated.

use crate::error::Error;
use crate::normalize::Quote;
use crate::schema::{MoverQuote, PricePoint, StockRecord, TickerCandidate};
use rand::Rng;
use std::str::FromStr;

/// How missing quote fields of a detail record are synthesized.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FallbackPolicy {
    /// Every missing field is an independent draw; `high >= open >= low` may
    /// not hold.
    #[default]
    Independent,
    /// Missing price fields are replaced by one internally consistent OHLC
    /// quadruple, with `change` and `changePercent` derived from it.
    Coherent,
}

impl FromStr for FallbackPolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "independent" => Ok(FallbackPolicy::Independent),
            "coherent" => Ok(FallbackPolicy::Coherent),
            other => Err(Error::Config(format!(
                "unknown fallback policy {other:?}; expected independent or coherent"
            ))),
        }
    }
}

/// The fixed demo banner shown while the movers feed is degraded.
pub fn demo_movers() -> Vec<MoverQuote> {
    vec![
        MoverQuote::new("RELIANCE", 2456.75, 23.45, 0.96),
        MoverQuote::new("TCS", 3234.5, -12.3, -0.38),
        MoverQuote::new("INFY", 1567.8, 45.2, 2.97),
        MoverQuote::new("HDFCBANK", 1678.9, 8.75, 0.52),
        MoverQuote::new("ICICIBANK", 987.65, -5.4, -0.54),
    ]
}

/// Merge a confirmed identity with whatever quote fields are available.
///
/// `quote` is `None` when the quote call failed outright; every
/// quote-derived field is then synthesized.
pub fn stock_record<R: Rng + ?Sized>(
    identity: &TickerCandidate,
    quote: Option<&Quote>,
    policy: FallbackPolicy,
    rng: &mut R,
) -> StockRecord {
    let q = quote.cloned().unwrap_or_default();

    let (price, change, change_percent, high, low, open) = match policy {
        FallbackPolicy::Independent => (
            q.price.unwrap_or_else(|| rng.gen_range(500.0..1500.0)),
            q.change.unwrap_or_else(|| rng.gen_range(-25.0..25.0)),
            q.change_percent.unwrap_or_else(|| rng.gen_range(-2.5..2.5)),
            q.high.unwrap_or_else(|| rng.gen_range(600.0..1600.0)),
            q.low.unwrap_or_else(|| rng.gen_range(400.0..1400.0)),
            q.open.unwrap_or_else(|| rng.gen_range(500.0..1500.0)),
        ),
        FallbackPolicy::Coherent => coherent_prices(&q, rng),
    };

    StockRecord {
        symbol: identity.symbol.clone(),
        name: identity.name.clone(),
        price,
        change,
        change_percent,
        high,
        low,
        open,
        volume: q
            .volume
            .unwrap_or_else(|| rng.gen_range(100_000..1_100_000)),
        market_cap: Some(
            q.market_cap
                .unwrap_or_else(|| f64::from(rng.gen_range(10_000u32..110_000))),
        ),
        pe: Some(q.pe.unwrap_or_else(|| rng.gen_range(10.0..40.0))),
        eps: Some(q.eps.unwrap_or_else(|| rng.gen_range(5.0..55.0))),
    }
}

// (price, change, change_percent, high, low, open)
fn coherent_prices<R: Rng + ?Sized>(q: &Quote, rng: &mut R) -> (f64, f64, f64, f64, f64, f64) {
    if let (Some(price), Some(open), Some(high), Some(low)) = (q.price, q.open, q.high, q.low) {
        let change = q.change.unwrap_or(price - open);
        let change_percent = q
            .change_percent
            .unwrap_or(if open != 0.0 { change / open * 100.0 } else { 0.0 });
        return (price, change, change_percent, high, low, open);
    }

    // keep the magnitude of whatever the upstream did send
    let open = q
        .open
        .or(q.price)
        .filter(|p| *p > 0.0)
        .unwrap_or_else(|| rng.gen_range(500.0..1500.0));
    let price = open * (1.0 + rng.gen_range(-0.025..0.025));
    let high = open.max(price) * (1.0 + rng.gen_range(0.0..0.02));
    let low = open.min(price) * (1.0 - rng.gen_range(0.0..0.02));
    let change = price - open;
    let change_percent = change / open * 100.0;
    (price, change, change_percent, high, low, open)
}

/// A synthetic series for a `days` window.
///
/// One day gives 24 half-hourly points from 09:00; longer windows give two
/// points per day, capped at 100, labelled `Day N` up to a month and
/// `{month}M {day}D` beyond. Prices follow a smooth random walk that never
/// drops below 80% of the base price.
pub fn price_series<R: Rng + ?Sized>(days: u32, rng: &mut R) -> Vec<PricePoint> {
    let points = if days == 1 {
        24
    } else {
        (days as usize * 2).min(100)
    };
    let base = rng.gen_range(1000.0..1500.0);
    let floor = base * 0.8;
    let mut walk = 0.0;

    (0..points)
        .map(|i| {
            walk += rng.gen_range(-10.0..10.0);
            let price = (base + walk * (i as f64 / points as f64)).max(floor);
            PricePoint {
                time: label(days, i),
                price: (price * 100.0).round() / 100.0,
                volume: Some(rng.gen_range(10_000..110_000)),
            }
        })
        .collect()
}

fn label(days: u32, i: usize) -> String {
    if days == 1 {
        format!("{:02}:{}", 9 + i / 2, if i % 2 == 0 { "00" } else { "30" })
    } else if days <= 30 {
        format!("Day {}", i + 1)
    } else {
        format!("{}M {}D", i / 30 + 1, i % 30)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn identity() -> TickerCandidate {
        TickerCandidate {
            symbol: "TCS".to_string(),
            name: "Tata Consultancy Services".to_string(),
            exchange: None,
            kind: None,
        }
    }

    #[test]
    fn demo_banner_has_five_quotes() {
        let demo = demo_movers();
        assert_eq!(demo.len(), 5);
        assert_eq!(demo[0].symbol, "RELIANCE");
    }

    #[test]
    fn missing_quote_fills_every_field() {
        let mut rng = StdRng::seed_from_u64(7);
        for policy in [FallbackPolicy::Independent, FallbackPolicy::Coherent] {
            let record = stock_record(&identity(), None, policy, &mut rng);
            assert_eq!(record.symbol, "TCS");
            assert_eq!(record.name, "Tata Consultancy Services");
            for value in [record.price, record.high, record.low, record.open] {
                assert!(value.is_finite() && value > 0.0);
            }
            assert!(record.change.is_finite() && record.change_percent.is_finite());
            assert!(record.volume >= 100_000);
            assert!(record.market_cap.unwrap() >= 10_000.0);
            assert!(record.pe.unwrap() >= 10.0);
            assert!(record.eps.unwrap() >= 5.0);
        }
    }

    #[test]
    fn present_quote_fields_win() {
        let quote = Quote {
            price: Some(101.0),
            volume: Some(42),
            ..Quote::default()
        };
        let mut rng = StdRng::seed_from_u64(1);
        let record = stock_record(&identity(), Some(&quote), FallbackPolicy::Independent, &mut rng);
        assert_eq!(record.price, 101.0);
        assert_eq!(record.volume, 42);
    }

    #[test]
    fn coherent_policy_orders_ohlc() {
        let mut rng = StdRng::seed_from_u64(99);
        for _ in 0..200 {
            let r = stock_record(&identity(), None, FallbackPolicy::Coherent, &mut rng);
            assert!(r.high >= r.open && r.high >= r.price);
            assert!(r.low <= r.open && r.low <= r.price);
            assert!((r.change - (r.price - r.open)).abs() < 1e-9);
        }
    }

    #[test]
    fn policy_parses_case_insensitively() {
        assert_eq!("Coherent".parse::<FallbackPolicy>().unwrap(), FallbackPolicy::Coherent);
        assert!("random".parse::<FallbackPolicy>().is_err());
    }

    #[test]
    fn series_shape_depends_on_window() {
        let mut rng = StdRng::seed_from_u64(3);

        let intraday = price_series(1, &mut rng);
        assert_eq!(intraday.len(), 24);
        assert_eq!(intraday[0].time, "09:00");
        assert_eq!(intraday[1].time, "09:30");
        assert_eq!(intraday[23].time, "20:30");

        let week = price_series(7, &mut rng);
        assert_eq!(week.len(), 14);
        assert_eq!(week[13].time, "Day 14");

        let quarter = price_series(90, &mut rng);
        assert_eq!(quarter.len(), 100);
        assert_eq!(quarter[0].time, "1M 0D");
        assert_eq!(quarter[31].time, "2M 1D");

        assert_eq!(price_series(365, &mut rng).len(), 100);
    }

    #[test]
    fn series_never_drops_below_floor() {
        let mut rng = StdRng::seed_from_u64(11);
        for _ in 0..50 {
            let series = price_series(30, &mut rng);
            // base is at least 1000, so the floor is at least 800
            assert!(series.iter().all(|p| p.price >= 800.0));
            assert!(series.iter().all(|p| p.volume.is_some()));
        }
    }
}
