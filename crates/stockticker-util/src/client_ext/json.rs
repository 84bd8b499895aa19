use reqwest::{Client, StatusCode};
use serde_json::Value;
use std::future::Future;
use tracing::{error, trace};

/// Outcome of a JSON GET; a non-success status is reported rather than
/// turned into an error, so that callers can tell "the service said no"
/// apart from "the service could not be reached".
#[derive(Debug, Clone, PartialEq)]
pub enum JsonResponse {
    Ok(Value),
    Status(StatusCode),
}

pub trait ClientJsonExt {
    fn get_json(&self, url: &str) -> impl Future<Output = reqwest::Result<JsonResponse>> + Send;
}

/// Add-on methods for [`reqwest::Client`].
///
/// [`reqwest::Client`]: https://docs.rs/reqwest/latest/reqwest/struct.Client.html
impl ClientJsonExt for Client {
    /// GET request `url` and decode the body as JSON, only when the status is a success.
    async fn get_json(&self, url: &str) -> reqwest::Result<JsonResponse> {
        trace!("GET {url}");
        let response = self.get(url).send().await.map_err(|e| {
            error!("failed fetching response from {url}: {e}");
            e
        })?;

        let status = response.status();
        if !status.is_success() {
            trace!("{url} answered with {status}");
            return Ok(JsonResponse::Status(status));
        }

        let body: Value = response.json().await.map_err(|e| {
            error!("failed deserializing from {url}");
            e
        })?;

        Ok(JsonResponse::Ok(body))
    }
}
