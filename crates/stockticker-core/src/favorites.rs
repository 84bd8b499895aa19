use crate::schema::FavoriteEntry;
use crate::storage::Storage;
use serde_json::Value;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::watch;
use tracing::{debug, error, warn};

/// Storage key of the favorites collection.
pub const FAVORITES_KEY: &str = "stockFavorites";

/// The user's favorites, one entry per symbol, in insertion order.
///
/// Share one store per process behind an `Arc`; every mutation is visible to
/// all holders at once, and [`subscribe`](Self::subscribe) hands out a
/// receiver that sees each new collection. Mutations write the whole
/// collection through to storage before returning. A failed write is logged
/// and otherwise ignored, so memory may run ahead of storage until the next
/// successful write.
pub struct FavoritesStore {
    storage: Arc<dyn Storage>,
    entries: Mutex<Vec<FavoriteEntry>>,
    updates: watch::Sender<Vec<FavoriteEntry>>,
}

impl FavoritesStore {
    /// Load the persisted collection; anything unreadable loads as empty.
    pub fn load(storage: Arc<dyn Storage>) -> Self {
        let entries = match storage.get_item(FAVORITES_KEY) {
            Ok(Some(raw)) => decode(&raw),
            Ok(None) => Vec::new(),
            Err(e) => {
                error!("failed to read favorites: {e}");
                Vec::new()
            }
        };
        debug!("{} favorites loaded", entries.len());

        let (updates, _) = watch::channel(entries.clone());
        Self {
            storage,
            entries: Mutex::new(entries),
            updates,
        }
    }

    /// Insert or replace the entry for `entry.symbol`; it ends up last.
    pub fn add(&self, entry: FavoriteEntry) {
        let mut entries = self.lock();
        entries.retain(|fav| fav.symbol != entry.symbol);
        entries.push(entry);
        self.commit(&entries);
    }

    pub fn remove(&self, symbol: &str) {
        let mut entries = self.lock();
        let before = entries.len();
        entries.retain(|fav| fav.symbol != symbol);
        if entries.len() != before {
            self.commit(&entries);
        }
    }

    pub fn contains(&self, symbol: &str) -> bool {
        self.lock().iter().any(|fav| fav.symbol == symbol)
    }

    /// Remove the symbol if present, add `entry` otherwise. Returns whether
    /// the symbol is a favorite afterwards.
    pub fn toggle(&self, entry: FavoriteEntry) -> bool {
        let mut entries = self.lock();
        let before = entries.len();
        entries.retain(|fav| fav.symbol != entry.symbol);
        let added = entries.len() == before;
        if added {
            entries.push(entry);
        }
        self.commit(&entries);
        added
    }

    pub fn list(&self) -> Vec<FavoriteEntry> {
        self.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn subscribe(&self) -> watch::Receiver<Vec<FavoriteEntry>> {
        self.updates.subscribe()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<FavoriteEntry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn commit(&self, entries: &[FavoriteEntry]) {
        match serde_json::to_string(entries) {
            Ok(json) => {
                if let Err(e) = self.storage.set_item(FAVORITES_KEY, &json) {
                    error!("failed to save favorites: {e}");
                }
            }
            Err(e) => error!("failed to encode favorites: {e}"),
        }
        self.updates.send_replace(entries.to_vec());
    }
}

fn decode(raw: &str) -> Vec<FavoriteEntry> {
    let items: Vec<Value> = match serde_json::from_str(raw) {
        Ok(items) => items,
        Err(e) => {
            error!("stored favorites are corrupt, starting empty: {e}");
            return Vec::new();
        }
    };

    let mut entries: Vec<FavoriteEntry> = Vec::with_capacity(items.len());
    for item in items {
        match serde_json::from_value::<FavoriteEntry>(item) {
            Ok(entry) => {
                entries.retain(|fav| fav.symbol != entry.symbol);
                entries.push(entry);
            }
            Err(e) => warn!("skipping malformed favorite: {e}"),
        }
    }
    entries
}
