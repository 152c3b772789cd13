//! Zip Locator: postal code → region/country lookup.
//!
//! Pure in-memory lookups; the only I/O is the optional one-off table load in
//! [`ZipLocator::from_path`].

mod table;

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Number of characters a zip must have before it autofills the address.
pub const AUTOFILL_ZIP_LENGTH: usize = 5;

/// Errors loading an external zip table.
#[derive(Debug, Error)]
pub enum ZipTableError {
    #[error("Failed to read zip table {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Zip table parse error: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Region and country for a postal code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZipLocation {
    pub state: String,
    pub country: String,
}

/// Static zip table.
#[derive(Debug, Clone)]
pub struct ZipLocator {
    table: HashMap<String, ZipLocation>,
}

impl Default for ZipLocator {
    /// The built-in United States table.
    fn default() -> Self {
        Self {
            table: table::builtin().clone(),
        }
    }
}

impl ZipLocator {
    /// Build a locator from an explicit table.
    #[must_use]
    pub const fn from_table(table: HashMap<String, ZipLocation>) -> Self {
        Self { table }
    }

    /// Load a JSON object of `{"<zip>": {"state": .., "country": ..}}`.
    ///
    /// # Errors
    ///
    /// Returns `ZipTableError` if the file cannot be read or parsed.
    pub fn from_path(path: &Path) -> Result<Self, ZipTableError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ZipTableError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let table: HashMap<String, ZipLocation> = serde_json::from_str(&raw)?;
        tracing::info!(entries = table.len(), path = %path.display(), "Loaded zip table");
        Ok(Self { table })
    }

    /// Exact-match lookup. No trimming, no prefix or fuzzy matching.
    #[must_use]
    pub fn lookup(&self, zip: &str) -> Option<&ZipLocation> {
        self.table.get(zip)
    }

    /// Lookup that only matches complete (5-character) zips.
    #[must_use]
    pub fn autofill(&self, zip: &str) -> Option<&ZipLocation> {
        if zip.chars().count() != AUTOFILL_ZIP_LENGTH {
            return None;
        }
        self.lookup(zip)
    }

    /// Number of known zips.
    #[must_use]
    pub fn len(&self) -> usize {
        self.table.len()
    }

    /// Whether the table is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}
