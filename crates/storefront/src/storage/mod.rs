//! Client-local key/value persistence.
//!
//! # Keys
//!
//! - [`keys::PRODUCTS`] - catalog snapshot, the bootstrap document verbatim
//! - [`keys::CART_ITEMS`] - ordered cart entries
//!
//! Both values are JSON documents. Every mutation rewrites the whole value and
//! every read loads the whole value; there is no schema versioning, so a
//! format change needs a manual migration or a cleared data directory.
//!
//! # Backends
//!
//! - [`JsonFileStore`] - one file per key in a data directory
//! - [`MemoryStore`] - in-process map for tests and throwaway sessions

mod file;
mod memory;

pub use file::JsonFileStore;
pub use memory::MemoryStore;

use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;

/// Well-known storage keys.
pub mod keys {
    /// Catalog snapshot.
    pub const PRODUCTS: &str = "products";
    /// Cart entries.
    pub const CART_ITEMS: &str = "cartsItems";
}

/// Errors that can occur when reading or writing persisted state.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Filesystem operation failed.
    #[error("I/O error for key {key}: {source}")]
    Io {
        key: String,
        #[source]
        source: std::io::Error,
    },

    /// Stored document could not be decoded.
    #[error("Corrupt document under key {key}: {source}")]
    Corrupt {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    /// Value could not be encoded for storage.
    #[error("Failed to encode value for key {key}: {source}")]
    Encode {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    /// Key contains characters that cannot be mapped to a storage slot.
    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    /// Backend cannot be used (e.g. poisoned lock).
    #[error("Storage unavailable: {0}")]
    Unavailable(String),
}

/// Synchronous whole-value key/value store.
///
/// Writers are not coordinated: two writers on the same key race and the
/// last write wins.
pub trait KeyValueStore: Send + Sync {
    /// Read the raw value stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be read.
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Replace the value stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be written.
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Delete the value stored under `key`. Absent keys are not an error.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be written.
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

/// Read and decode a JSON value.
///
/// # Errors
///
/// Returns `StorageError::Corrupt` if the stored document does not decode
/// as `T`, or any backend error.
pub fn load_json<T: DeserializeOwned>(
    store: &dyn KeyValueStore,
    key: &str,
) -> Result<Option<T>, StorageError> {
    let Some(raw) = store.get(key)? else {
        return Ok(None);
    };

    serde_json::from_str(&raw)
        .map(Some)
        .map_err(|source| StorageError::Corrupt {
            key: key.to_string(),
            source,
        })
}

/// Encode and write a JSON value.
///
/// # Errors
///
/// Returns `StorageError::Encode` if serialization fails, or any backend error.
pub fn save_json<T: Serialize + ?Sized>(
    store: &dyn KeyValueStore,
    key: &str,
    value: &T,
) -> Result<(), StorageError> {
    let raw = serde_json::to_string(value).map_err(|source| StorageError::Encode {
        key: key.to_string(),
        source,
    })?;
    store.set(key, &raw)
}
