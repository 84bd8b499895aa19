use crate::api::MarketApi;
use crate::error::Result;
use crate::schema::{Granularity, PriceQuery};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;
use tracing::trace;

pub const IDENTITY_TTL: Duration = Duration::from_secs(60);
pub const QUOTE_TTL: Duration = Duration::from_secs(30);

/// Revalidation layer in front of a [`MarketApi`].
///
/// Detail pages look up the same identity (`search` with `length = 1`) and
/// quote (`prices` for the newest intraday point) over and over; those are
/// served from memory until their TTL lapses. Everything else, and every
/// failed call, goes straight to the upstream.
pub struct Revalidating {
    inner: Arc<dyn MarketApi>,
    identity_ttl: Duration,
    quote_ttl: Duration,
    entries: Mutex<HashMap<String, Cached>>,
}

struct Cached {
    stored_at: Instant,
    ttl: Duration,
    body: Value,
}

impl Revalidating {
    pub fn new(inner: Arc<dyn MarketApi>) -> Self {
        Self::with_ttls(inner, IDENTITY_TTL, QUOTE_TTL)
    }

    pub fn with_ttls(inner: Arc<dyn MarketApi>, identity_ttl: Duration, quote_ttl: Duration) -> Self {
        Self {
            inner,
            identity_ttl,
            quote_ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    fn lookup(&self, key: &str) -> Option<Value> {
        let mut entries = self.entries.lock().ok()?;
        match entries.get(key) {
            Some(hit) if hit.stored_at.elapsed() <= hit.ttl => {
                trace!("revalidation cache hit: {key}");
                Some(hit.body.clone())
            }
            Some(_) => {
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    fn store(&self, key: String, ttl: Duration, body: &Value) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.retain(|_, hit| hit.stored_at.elapsed() <= hit.ttl);
            entries.insert(
                key,
                Cached {
                    stored_at: Instant::now(),
                    ttl,
                    body: body.clone(),
                },
            );
        }
    }

    async fn cached<F>(&self, key: String, ttl: Duration, call: F) -> Result<Value>
    where
        F: std::future::Future<Output = Result<Value>> + Send,
    {
        if let Some(hit) = self.lookup(&key) {
            return Ok(hit);
        }
        let body = call.await?;
        self.store(key, ttl, &body);
        Ok(body)
    }
}

fn is_quote(query: &PriceQuery) -> bool {
    query.limit == 1 && query.days == 1 && query.granularity == Granularity::Intraday
}

#[async_trait]
impl MarketApi for Revalidating {
    async fn search(&self, keyword: &str, length: usize) -> Result<Value> {
        if length != 1 {
            return self.inner.search(keyword, length).await;
        }
        let key = format!("identity:{}", keyword.to_uppercase());
        self.cached(key, self.identity_ttl, self.inner.search(keyword, length))
            .await
    }

    async fn prices(&self, symbol: &str, query: PriceQuery) -> Result<Value> {
        if !is_quote(&query) {
            return self.inner.prices(symbol, query).await;
        }
        let key = format!("quote:{}", symbol.to_uppercase());
        self.cached(key, self.quote_ttl, self.inner.prices(symbol, query))
            .await
    }

    async fn movers(&self, index: &str) -> Result<Value> {
        self.inner.movers(index).await
    }
}
