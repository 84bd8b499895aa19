use crate::error::{Error, Result};
use crate::fallback::FallbackPolicy;
use dotenv::var;
use std::path::PathBuf;
use std::time::Duration;
use tracing::debug;
use url::Url;

pub const DEFAULT_API_URL: &str = "https://portal.tradebrains.in/api/assignment";
pub const DEFAULT_USER_AGENT: &str = "stockticker/0.1";
pub const DEFAULT_MOVERS_INDEX: &str = "NIFTY";
pub const DEFAULT_DATA_DIR: &str = "./.stockticker";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(300);
const DEFAULT_MOVERS_INTERVAL: Duration = Duration::from_secs(30);

/// Runtime settings shared by every component.
///
/// Values come from the environment (a `.env` file is honoured), falling back
/// to the defaults below:
///
/// | variable                    | default                                        |
/// |-----------------------------|------------------------------------------------|
/// | `STOCKTICKER_API_URL`       | `https://portal.tradebrains.in/api/assignment` |
/// | `USER_AGENT`                | `stockticker/0.1`                              |
/// | `STOCKTICKER_TIMEOUT_SECS`  | `10`                                           |
/// | `STOCKTICKER_DATA_DIR`      | `./.stockticker`                               |
/// | `STOCKTICKER_MOVERS_INDEX`  | `NIFTY`                                        |
/// | `STOCKTICKER_FALLBACK`      | `independent`                                  |
#[derive(Debug, Clone)]
pub struct Config {
    pub api_url: String,
    pub user_agent: String,
    pub request_timeout: Duration,
    pub debounce: Duration,
    pub search_limit: usize,
    pub movers_index: String,
    pub movers_interval: Duration,
    pub movers_limit: usize,
    pub history_limit: usize,
    pub data_dir: PathBuf,
    pub fallback: FallbackPolicy,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            request_timeout: DEFAULT_TIMEOUT,
            debounce: DEFAULT_DEBOUNCE,
            search_limit: 10,
            movers_index: DEFAULT_MOVERS_INDEX.to_string(),
            movers_interval: DEFAULT_MOVERS_INTERVAL,
            movers_limit: 10,
            history_limit: 100,
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            fallback: FallbackPolicy::default(),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(url) = var("STOCKTICKER_API_URL") {
            Url::parse(&url)?;
            config.api_url = url;
        }
        if let Ok(agent) = var("USER_AGENT") {
            config.user_agent = agent;
        }
        if let Ok(secs) = var("STOCKTICKER_TIMEOUT_SECS") {
            let secs: u64 = secs
                .trim()
                .parse()
                .map_err(|_| Error::Config(format!("STOCKTICKER_TIMEOUT_SECS: {secs:?}")))?;
            config.request_timeout = Duration::from_secs(secs.max(1));
        }
        if let Ok(dir) = var("STOCKTICKER_DATA_DIR") {
            config.data_dir = PathBuf::from(dir);
        }
        if let Ok(index) = var("STOCKTICKER_MOVERS_INDEX") {
            config.movers_index = index;
        }
        if let Ok(policy) = var("STOCKTICKER_FALLBACK") {
            config.fallback = policy.parse()?;
        }

        debug!("configuration loaded: {config:?}");
        Ok(config)
    }

    pub fn with_api_url(mut self, url: impl Into<String>) -> Self {
        self.api_url = url.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    pub fn with_movers_interval(mut self, interval: Duration) -> Self {
        self.movers_interval = interval;
        self
    }

    pub fn with_data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.data_dir = dir.into();
        self
    }

    pub fn with_fallback(mut self, policy: FallbackPolicy) -> Self {
        self.fallback = policy;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_dashboard_timings() {
        let config = Config::default();
        assert_eq!(config.debounce, Duration::from_millis(300));
        assert_eq!(config.movers_interval, Duration::from_secs(30));
        assert_eq!(config.movers_limit, 10);
        assert_eq!(config.search_limit, 10);
        assert_eq!(config.history_limit, 100);
        assert_eq!(config.fallback, FallbackPolicy::Independent);
    }

    #[test]
    fn builders_override_fields() {
        let config = Config::default()
            .with_timeout(Duration::from_secs(2))
            .with_fallback(FallbackPolicy::Coherent)
            .with_data_dir("/tmp/favs");
        assert_eq!(config.request_timeout, Duration::from_secs(2));
        assert_eq!(config.fallback, FallbackPolicy::Coherent);
        assert_eq!(config.data_dir, PathBuf::from("/tmp/favs"));
    }
}
