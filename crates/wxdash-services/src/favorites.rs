//! Recently viewed cities, most recent first.

use std::sync::Arc;

use parking_lot::Mutex;
use wxdash_weather::CityQuery;

use crate::storage::{SlotStorage, StorageError};

pub const FAVORITES_SLOT: &str = "favorites";
pub const MAX_FAVORITES: usize = 5;

/// Bounded, de-duplicated favorites list. Every mutation rewrites the whole
/// slot.
pub struct FavoritesStore {
    storage: Arc<dyn SlotStorage>,
    entries: Mutex<Vec<CityQuery>>,
}

impl FavoritesStore {
    /// Read the persisted list. Missing or unreadable data yields an empty list.
    pub fn load(storage: Arc<dyn SlotStorage>) -> Self {
        let entries = read_entries(storage.as_ref());
        tracing::debug!("Loaded {} favorites", entries.len());

        Self {
            storage,
            entries: Mutex::new(entries),
        }
    }

    /// Move `query` to the front, dropping any older copy and anything past
    /// the fifth entry, then persist.
    ///
    /// The lock is held across the write so the slot always matches the last
    /// list committed in memory. A failed write leaves the list unchanged.
    pub fn add(&self, query: CityQuery) -> Result<(), StorageError> {
        let mut entries = self.entries.lock();

        let mut next: Vec<CityQuery> = entries
            .iter()
            .filter(|existing| *existing != &query)
            .take(MAX_FAVORITES - 1)
            .cloned()
            .collect();
        next.insert(0, query);

        self.persist(&next)?;
        *entries = next;
        Ok(())
    }

    pub fn clear(&self) -> Result<(), StorageError> {
        let mut entries = self.entries.lock();
        self.storage.remove_slot(FAVORITES_SLOT)?;
        entries.clear();
        Ok(())
    }

    pub fn list(&self) -> Vec<CityQuery> {
        self.entries.lock().clone()
    }

    pub fn get(&self, index: usize) -> Option<CityQuery> {
        self.entries.lock().get(index).cloned()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    fn persist(&self, entries: &[CityQuery]) -> Result<(), StorageError> {
        let json = serde_json::to_string(entries).map_err(|e| StorageError::Serialize {
            slot: FAVORITES_SLOT.to_string(),
            reason: e.to_string(),
        })?;
        self.storage.write_slot(FAVORITES_SLOT, &json)
    }
}

fn read_entries(storage: &dyn SlotStorage) -> Vec<CityQuery> {
    let raw = match storage.read_slot(FAVORITES_SLOT) {
        Ok(Some(raw)) => raw,
        Ok(None) => return Vec::new(),
        Err(e) => {
            tracing::warn!("Ignoring favorites: {}", e);
            return Vec::new();
        }
    };

    match serde_json::from_str::<Vec<CityQuery>>(&raw) {
        Ok(mut entries) => {
            entries.truncate(MAX_FAVORITES);
            entries
        }
        Err(e) => {
            let err = StorageError::Corrupt {
                slot: FAVORITES_SLOT.to_string(),
                reason: e.to_string(),
            };
            tracing::warn!("{}", err);
            Vec::new()
        }
    }
}
