//! Named storage slots, each holding one serialized value.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::PathBuf;

use parking_lot::Mutex;
use thiserror::Error;
use wxdash_core::AppError;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Failed to access slot '{slot}': {source}")]
    Io {
        slot: String,
        #[source]
        source: io::Error,
    },

    #[error("Slot '{slot}' holds unreadable data: {reason}")]
    Corrupt { slot: String, reason: String },

    #[error("Failed to serialize slot '{slot}': {reason}")]
    Serialize { slot: String, reason: String },
}

impl StorageError {
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::Io { .. } | Self::Serialize { .. } => "Could not save your favorites.",
            Self::Corrupt { .. } => "Saved favorites were unreadable and have been reset.",
        }
    }
}

impl From<StorageError> for AppError {
    fn from(e: StorageError) -> Self {
        AppError::Storage(e.to_string())
    }
}

/// Key/value persistence keyed by slot name.
pub trait SlotStorage: Send + Sync {
    /// Raw contents of `slot`, or `None` if nothing was ever written.
    fn read_slot(&self, slot: &str) -> Result<Option<String>, StorageError>;

    /// Replace the contents of `slot`.
    fn write_slot(&self, slot: &str, contents: &str) -> Result<(), StorageError>;

    /// Delete `slot`. Removing a missing slot is not an error.
    fn remove_slot(&self, slot: &str) -> Result<(), StorageError>;
}

/// One `<slot>.json` file per slot under a directory.
#[derive(Debug, Clone)]
pub struct FileSlotStorage {
    dir: PathBuf,
}

impl FileSlotStorage {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn slot_path(&self, slot: &str) -> PathBuf {
        self.dir.join(format!("{}.json", slot))
    }
}

fn io_error(slot: &str, source: io::Error) -> StorageError {
    StorageError::Io {
        slot: slot.to_string(),
        source,
    }
}

impl SlotStorage for FileSlotStorage {
    fn read_slot(&self, slot: &str) -> Result<Option<String>, StorageError> {
        match fs::read_to_string(self.slot_path(slot)) {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(io_error(slot, e)),
        }
    }

    fn write_slot(&self, slot: &str, contents: &str) -> Result<(), StorageError> {
        fs::create_dir_all(&self.dir).map_err(|e| io_error(slot, e))?;

        let path = self.slot_path(slot);
        fs::write(&path, contents).map_err(|e| io_error(slot, e))?;

        tracing::debug!("Wrote slot '{}' to {:?}", slot, path);
        Ok(())
    }

    fn remove_slot(&self, slot: &str) -> Result<(), StorageError> {
        match fs::remove_file(self.slot_path(slot)) {
            Ok(()) => {
                tracing::info!("Removed slot '{}'", slot);
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(io_error(slot, e)),
        }
    }
}

/// Process-local slots, for tests and for running without a storage dir.
#[derive(Debug, Default)]
pub struct MemorySlotStorage {
    slots: Mutex<HashMap<String, String>>,
}

impl MemorySlotStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SlotStorage for MemorySlotStorage {
    fn read_slot(&self, slot: &str) -> Result<Option<String>, StorageError> {
        Ok(self.slots.lock().get(slot).cloned())
    }

    fn write_slot(&self, slot: &str, contents: &str) -> Result<(), StorageError> {
        self.slots
            .lock()
            .insert(slot.to_string(), contents.to_string());
        Ok(())
    }

    fn remove_slot(&self, slot: &str) -> Result<(), StorageError> {
        self.slots.lock().remove(slot);
        Ok(())
    }
}
