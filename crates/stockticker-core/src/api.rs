use crate::config::Config;
use crate::error::{Error, Result};
use crate::schema::PriceQuery;
use async_trait::async_trait;
use reqwest::Client as HttpClient;
use serde_json::Value;
use std::future::Future;
use std::time::Duration;
use stockticker_util::{Json, JsonResponse};
use tracing::{debug, trace};
use url::Url;

/// The upstream market-data service.
///
/// Payloads are handed back as raw JSON: field names and shapes vary between
/// endpoints, and turning them into records is the job of
/// [`normalize`](crate::normalize). A non-success status is an
/// [`Error::Status`], never a payload.
#[async_trait]
pub trait MarketApi: Send + Sync {
    /// Ranked ticker matches for `keyword`, at most `length` of them.
    async fn search(&self, keyword: &str, length: usize) -> Result<Value>;

    /// Price points of `symbol` over the window described by `query`.
    async fn prices(&self, symbol: &str, query: PriceQuery) -> Result<Value>;

    /// Top movers of a market index; an object with a `gainers` array.
    async fn movers(&self, index: &str) -> Result<Value>;
}

/// Bound an upstream call by `limit`; a call still pending after it becomes
/// [`Error::Timeout`].
pub async fn bounded<T, F>(limit: Duration, call: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    tokio::time::timeout(limit, call)
        .await
        .map_err(|_| Error::Timeout(limit))?
}

/// [`MarketApi`] over HTTP.
#[derive(Debug, Clone)]
pub struct HttpApi {
    http: HttpClient,
    base: Url,
}

impl HttpApi {
    pub fn new(config: &Config) -> Result<Self> {
        let http = reqwest::ClientBuilder::new()
            .user_agent(&config.user_agent)
            .timeout(config.request_timeout)
            .build()?;
        let base = Url::parse(&config.api_url)?;
        if base.cannot_be_a_base() {
            return Err(Error::Config(format!("{base} cannot be a base URL")));
        }
        debug!("market API at {base}");
        Ok(Self { http, base })
    }

    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base.clone();
        // checked in `new()`
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    pub(crate) fn search_url(&self, keyword: &str, length: usize) -> Url {
        let mut url = self.endpoint(&["search"]);
        url.query_pairs_mut()
            .append_pair("keyword", keyword)
            .append_pair("length", &length.to_string());
        url
    }

    pub(crate) fn prices_url(&self, symbol: &str, query: PriceQuery) -> Url {
        let mut url = self.endpoint(&["stock", symbol, "prices"]);
        url.query_pairs_mut()
            .append_pair("days", &query.days.to_string())
            .append_pair("type", query.granularity.as_str())
            .append_pair("limit", &query.limit.to_string());
        url
    }

    pub(crate) fn movers_url(&self, index: &str) -> Url {
        // the upstream insists on the trailing slash
        self.endpoint(&["index", index, "movers", ""])
    }

    async fn get(&self, url: Url) -> Result<Value> {
        let response = self.http.get_json(url.as_str()).await.map_err(|e| {
            if e.is_decode() {
                Error::Malformed(format!("{url}: {e}"))
            } else {
                Error::Http(e)
            }
        })?;

        match response {
            JsonResponse::Ok(body) => {
                trace!("{url} answered");
                Ok(body)
            }
            JsonResponse::Status(status) => Err(Error::Status(status.as_u16())),
        }
    }
}

#[async_trait]
impl MarketApi for HttpApi {
    async fn search(&self, keyword: &str, length: usize) -> Result<Value> {
        self.get(self.search_url(keyword, length)).await
    }

    async fn prices(&self, symbol: &str, query: PriceQuery) -> Result<Value> {
        self.get(self.prices_url(symbol, query)).await
    }

    async fn movers(&self, index: &str) -> Result<Value> {
        self.get(self.movers_url(index)).await
    }
}
