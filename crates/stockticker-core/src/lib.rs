//! Market-data orchestration for the StockTicker dashboard: ticker search,
//! the movers banner, stock detail and price history, and the favorites
//! collection.
//!
//! ```rust,ignore
//! let config = Config::from_env()?;
//! let api: Arc<dyn MarketApi> = Arc::new(Revalidating::new(Arc::new(HttpApi::new(&config)?)));
//! match fetch_stock(api.as_ref(), "TCS", &config).await {
//!     DetailOutcome::Found { record, .. } => println!("{}", record.price),
//!     DetailOutcome::NotFound => println!("no such stock"),
//! }
//! ```
pub mod api;
pub mod cache;
pub mod config;
pub mod detail;
pub mod error;
pub mod fallback;
pub mod favorites;
pub mod history;
pub mod movers;
pub mod normalize;
pub mod resolver;
pub mod schema;
pub mod storage;
pub mod task;

#[cfg(test)]
mod testing;

pub use crate::error::{Error, Result};

pub mod prelude {
    pub use crate::api::{HttpApi, MarketApi};
    pub use crate::cache::Revalidating;
    pub use crate::config::Config;
    pub use crate::detail::{fetch_stock, resolve_symbol, DetailOutcome};
    pub use crate::fallback::FallbackPolicy;
    pub use crate::favorites::FavoritesStore;
    pub use crate::history::{fetch_history, Period, PriceHistory, PriceSeries};
    pub use crate::movers::{fetch_movers, MoversFeed, MoversSnapshot, MoversView};
    pub use crate::resolver::{Route, SearchOutcome, SearchView, SymbolResolver};
    pub use crate::schema::*;
    pub use crate::storage::{FileStorage, MemoryStorage, Storage};
    pub use crate::{Error, Result};
}
