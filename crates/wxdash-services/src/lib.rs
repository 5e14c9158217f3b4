//! Favorites persistence and the dashboard session that ties the weather and
//! AI clients together.

pub mod dashboard;
pub mod favorites;
pub mod storage;

pub use dashboard::{Dashboard, ForecastView, WeatherView};
pub use favorites::{FavoritesStore, FAVORITES_SLOT, MAX_FAVORITES};
pub use storage::{FileSlotStorage, MemorySlotStorage, SlotStorage, StorageError};
