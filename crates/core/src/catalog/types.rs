//! Types for the catalog definition registry.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Media type of a catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaType {
    Movie,
    Series,
}

impl MediaType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaType::Movie => "movie",
            MediaType::Series => "series",
        }
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MediaType {
    type Err = ParseValueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "movie" => Ok(MediaType::Movie),
            "series" => Ok(MediaType::Series),
            other => Err(ParseValueError(format!("unknown media type '{}'", other))),
        }
    }
}

/// Sync status of a catalog definition.
///
/// `idle -> importing -> idle` on success, `importing -> error` on a fatal
/// failure, and a manual reset brings `error` back to `idle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CatalogStatus {
    #[default]
    Idle,
    Importing,
    Error,
}

impl CatalogStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CatalogStatus::Idle => "idle",
            CatalogStatus::Importing => "importing",
            CatalogStatus::Error => "error",
        }
    }
}

impl fmt::Display for CatalogStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CatalogStatus {
    type Err = ParseValueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "idle" => Ok(CatalogStatus::Idle),
            "importing" => Ok(CatalogStatus::Importing),
            "error" => Ok(CatalogStatus::Error),
            other => Err(ParseValueError(format!("unknown status '{}'", other))),
        }
    }
}

/// How a definition id is derived from the provider's catalog coordinates.
///
/// Providers reuse catalog ids across media types (a "top" catalog exists
/// for both movies and series), so the composite key is the default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CatalogKeyMode {
    /// `catalog_id` alone.
    CatalogId,
    /// `catalog_id:media_type`.
    #[default]
    CatalogAndMediaType,
}

impl CatalogKeyMode {
    pub fn key(&self, catalog_id: &str, media_type: MediaType) -> String {
        match self {
            CatalogKeyMode::CatalogId => catalog_id.to_string(),
            CatalogKeyMode::CatalogAndMediaType => format!("{}:{}", catalog_id, media_type),
        }
    }
}

/// What to do with definitions left in `importing` by a previous process.
#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StaleImportPolicy {
    /// Put the row back to `idle` so the next cycle re-runs it.
    #[default]
    Rerun,
    /// Put the row into `error`; an operator has to reset it.
    MarkError,
}

/// One configured external catalog and its sync bookkeeping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogDefinition {
    /// Registry key (see [`CatalogKeyMode`]).
    pub id: String,
    /// Manifest URL of the provider addon serving this catalog.
    pub source_manifest_url: String,
    /// Provider-assigned catalog id.
    pub catalog_id: String,
    /// Display name, also used for the collection created for it.
    pub name: String,
    pub media_type: MediaType,
    pub enabled: bool,
    /// Minimum hours between scheduled syncs (0 = every cycle).
    pub update_interval_hours: u32,
    /// Hard cap on the collection size.
    pub max_items: u32,
    pub status: CatalogStatus,
    /// Items imported by the current or last run.
    pub imported_count: u32,
    /// Items that failed in the current or last run.
    pub failed_count: u32,
    /// Collection in the library store. Owned by the store, only remembered here.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub collection_id: Option<String>,
    /// Cached member count, refreshed after each completed run.
    pub collection_item_count: u32,
    /// When the last run completed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<DateTime<Utc>>,
}

impl CatalogDefinition {
    /// Create an idle, enabled definition with zeroed counters.
    pub fn new(
        id: impl Into<String>,
        source_manifest_url: impl Into<String>,
        catalog_id: impl Into<String>,
        name: impl Into<String>,
        media_type: MediaType,
    ) -> Self {
        Self {
            id: id.into(),
            source_manifest_url: source_manifest_url.into(),
            catalog_id: catalog_id.into(),
            name: name.into(),
            media_type,
            enabled: true,
            update_interval_hours: 0,
            max_items: 0,
            status: CatalogStatus::Idle,
            imported_count: 0,
            failed_count: 0,
            collection_id: None,
            collection_item_count: 0,
            last_updated: None,
        }
    }

    pub fn with_max_items(mut self, max_items: u32) -> Self {
        self.max_items = max_items;
        self
    }

    pub fn with_update_interval_hours(mut self, hours: u32) -> Self {
        self.update_interval_hours = hours;
        self
    }

    /// Whether a scheduled cycle at `now` should sync this definition.
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        if self.update_interval_hours == 0 {
            return true;
        }
        match self.last_updated {
            None => true,
            Some(last) => now - last >= Duration::hours(i64::from(self.update_interval_hours)),
        }
    }
}

/// A stored value that could not be parsed back.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct ParseValueError(pub String);

/// Errors for registry operations.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Catalog definition not found: {0}")]
    NotFound(String),

    #[error("Internal error: {0}")]
    Internal(String),
}
