//! Scripted in-memory upstream for component tests.

use crate::api::MarketApi;
use crate::error::{Error, Result};
use crate::schema::PriceQuery;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// Answers each endpoint from its own queue, in order. An exhausted queue
/// answers `503`.
#[derive(Default)]
pub(crate) struct ScriptedApi {
    search: Mutex<VecDeque<Result<Value>>>,
    prices: Mutex<VecDeque<Result<Value>>>,
    movers: Mutex<VecDeque<Result<Value>>>,
    search_calls: Mutex<Vec<(String, usize)>>,
    prices_calls: Mutex<Vec<(String, PriceQuery)>>,
    movers_calls: Mutex<Vec<String>>,
    latency: Mutex<Duration>,
    hang: AtomicBool,
}

impl ScriptedApi {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push_search(&self, response: Result<Value>) {
        self.search.lock().unwrap().push_back(response);
    }

    pub(crate) fn push_prices(&self, response: Result<Value>) {
        self.prices.lock().unwrap().push_back(response);
    }

    pub(crate) fn push_movers(&self, response: Result<Value>) {
        self.movers.lock().unwrap().push_back(response);
    }

    /// Delay every answer by `latency`.
    pub(crate) fn set_latency(&self, latency: Duration) {
        *self.latency.lock().unwrap() = latency;
    }

    /// Never answer at all.
    pub(crate) fn hang(&self) {
        self.hang.store(true, Ordering::SeqCst);
    }

    pub(crate) fn search_calls(&self) -> Vec<(String, usize)> {
        self.search_calls.lock().unwrap().clone()
    }

    pub(crate) fn prices_calls(&self) -> Vec<(String, PriceQuery)> {
        self.prices_calls.lock().unwrap().clone()
    }

    pub(crate) fn movers_calls(&self) -> Vec<String> {
        self.movers_calls.lock().unwrap().clone()
    }

    async fn answer(&self, queue: &Mutex<VecDeque<Result<Value>>>) -> Result<Value> {
        if self.hang.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
        let latency = *self.latency.lock().unwrap();
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
        let next = queue.lock().unwrap().pop_front();
        next.unwrap_or(Err(Error::Status(503)))
    }
}

#[async_trait]
impl MarketApi for ScriptedApi {
    async fn search(&self, keyword: &str, length: usize) -> Result<Value> {
        self.search_calls
            .lock()
            .unwrap()
            .push((keyword.to_string(), length));
        self.answer(&self.search).await
    }

    async fn prices(&self, symbol: &str, query: PriceQuery) -> Result<Value> {
        self.prices_calls
            .lock()
            .unwrap()
            .push((symbol.to_string(), query));
        self.answer(&self.prices).await
    }

    async fn movers(&self, index: &str) -> Result<Value> {
        self.movers_calls.lock().unwrap().push(index.to_string());
        self.answer(&self.movers).await
    }
}
