use std::time::Duration;
use thiserror::Error as ThisError;

#[derive(ThisError, Debug)]
pub enum Error {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("upstream answered with status {0}")]
    Status(u16),

    #[error("upstream call timed out after {0:?}")]
    Timeout(Duration),

    #[error("malformed payload: {0}")]
    Malformed(String),

    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Storage(#[from] anyhow::Error),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("invalid period: {0}")]
    InvalidPeriod(String),
}

impl From<url::ParseError> for Error {
    fn from(err: url::ParseError) -> Self {
        Error::Config(format!("invalid URL: {err}"))
    }
}

impl Error {
    /// Whether the upstream service answered, but with a non-success status.
    pub fn is_status(&self) -> bool {
        matches!(self, Error::Status(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
