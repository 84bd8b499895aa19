use crate::api::{bounded, MarketApi};
use crate::config::Config;
use crate::fallback;
use crate::normalize::{self, Quote};
use crate::schema::{DataSource, PriceQuery, StockRecord, TickerCandidate};
use serde_json::Value;
use tracing::{debug, warn};

/// Result of resolving a detail page.
#[derive(Debug, Clone, PartialEq)]
pub enum DetailOutcome {
    Found {
        record: StockRecord,
        /// `Fallback` when the quote was unavailable or at least one of its
        /// fields was synthesized.
        source: DataSource,
    },
    NotFound,
}

impl DetailOutcome {
    pub fn record(&self) -> Option<&StockRecord> {
        match self {
            DetailOutcome::Found { record, .. } => Some(record),
            DetailOutcome::NotFound => None,
        }
    }
}

/// Resolve `symbol` to a full record.
///
/// The identity lookup is authoritative: no match, or any failure, is
/// [`DetailOutcome::NotFound`] and the quote is never requested. Once the
/// identity is confirmed, the quote only decides which fields are live:
/// each field it lacks is synthesized on its own, and the record is marked
/// [`DataSource::Fallback`] as soon as one was.
pub async fn fetch_stock(api: &dyn MarketApi, symbol: &str, config: &Config) -> DetailOutcome {
    let Some(identity) = lookup_identity(api, symbol, config).await else {
        return DetailOutcome::NotFound;
    };

    let quote = match bounded(
        config.request_timeout,
        api.prices(symbol, PriceQuery::latest_quote()),
    )
    .await
    {
        Ok(payload) => normalize::quote(&payload),
        Err(e) => {
            warn!("quote for {symbol} failed: {e}");
            None
        }
    };

    let source = if quote.as_ref().is_some_and(Quote::is_complete) {
        DataSource::Live
    } else {
        DataSource::Fallback
    };
    let record = fallback::stock_record(
        &identity,
        quote.as_ref(),
        config.fallback,
        &mut rand::thread_rng(),
    );
    DetailOutcome::Found { record, source }
}

/// The identity stage of [`fetch_stock`] on its own: the first search hit
/// for `symbol`, or `None` on no match or any failure.
pub async fn lookup_identity(
    api: &dyn MarketApi,
    symbol: &str,
    config: &Config,
) -> Option<TickerCandidate> {
    let payload = match bounded(config.request_timeout, api.search(symbol, 1)).await {
        Ok(payload) => payload,
        Err(e) => {
            warn!("identity lookup for {symbol} failed: {e}");
            return None;
        }
    };
    let found = identity(&payload, symbol);
    if found.is_none() {
        debug!("no identity for {symbol}");
    }
    found
}

/// The symbol that user `input` stands for.
///
/// Input that `is_known` already accepts, uppercased, is taken as is and
/// costs no request. Anything else is looked up, so `tata` resolves to the
/// upstream's `TATAMOTORS`; when the lookup finds nothing the uppercased
/// input is returned.
pub async fn resolve_symbol<F>(
    api: &dyn MarketApi,
    input: &str,
    config: &Config,
    is_known: F,
) -> String
where
    F: Fn(&str) -> bool,
{
    let symbol = input.trim().to_uppercase();
    if is_known(&symbol) {
        return symbol;
    }
    match lookup_identity(api, &symbol, config).await {
        Some(identity) => identity.symbol,
        None => symbol,
    }
}

/// The first search hit, with the requested symbol and `"<SYMBOL> Limited"`
/// standing in for missing fields.
fn identity(payload: &Value, requested: &str) -> Option<TickerCandidate> {
    let first = payload.as_array()?.first().filter(|hit| !hit.is_null())?;
    Some(TickerCandidate {
        symbol: normalize::text(first, &["symbol"]).unwrap_or_else(|| requested.to_string()),
        name: normalize::text(first, &["name"]).unwrap_or_else(|| format!("{requested} Limited")),
        exchange: normalize::text(first, &["exchange"]),
        kind: normalize::text(first, &["type"]),
    })
}
