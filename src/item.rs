//! Downloadable items and their identities.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Unique catalog identifier of a track. Two items with the same id are the
/// same item for removal and selection purposes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CatalogId(String);

impl CatalogId {
    /// Creates an identifier from any string-like value.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CatalogId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Opaque handle the downloader uses to fetch an item's bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackHandle(String);

impl TrackHandle {
    #[must_use]
    pub fn new(handle: impl Into<String>) -> Self {
        Self(handle.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// One downloadable unit. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Item {
    id: CatalogId,
    label: String,
    handle: TrackHandle,
}

impl Item {
    /// Creates an item with an explicit display label.
    #[must_use]
    pub fn new(id: CatalogId, label: impl Into<String>, handle: TrackHandle) -> Self {
        Self {
            id,
            label: label.into(),
            handle,
        }
    }

    /// Creates an item labelled "{artists} - {title}", or just the title when
    /// no artists are known.
    #[must_use]
    pub fn from_track(id: CatalogId, title: &str, artists: &[String], handle: TrackHandle) -> Self {
        let label = if artists.is_empty() {
            title.to_string()
        } else {
            format!("{} - {title}", artists.join(", "))
        };
        Self::new(id, label, handle)
    }

    #[must_use]
    pub const fn id(&self) -> &CatalogId {
        &self.id
    }

    /// Human-readable label shown in status text and logs.
    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    #[must_use]
    pub const fn handle(&self) -> &TrackHandle {
        &self.handle
    }
}

impl fmt::Display for Item {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label)
    }
}
