//! Types for the catalog importer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::catalog::{MediaType, RegistryError};
use crate::library::LibraryError;
use crate::source::SourceError;

/// Errors that can occur while importing a catalog.
#[derive(Debug, Error)]
pub enum ImportError {
    /// Catalog provider unreachable or not configured for the acting user.
    #[error("catalog source unavailable: {0}")]
    SourceUnavailable(String),

    /// Catalog provider failed a request.
    #[error("catalog source error: {0}")]
    Source(SourceError),

    /// Registry read or write failed.
    #[error("registry error: {0}")]
    Registry(#[from] RegistryError),

    /// Library store failed an operation the run depends on.
    #[error("library error: {0}")]
    Library(LibraryError),

    /// Acting user could not be resolved.
    #[error("user not found: {0}")]
    UserNotFound(String),

    /// Another sync of the same definition is running in this process.
    #[error("catalog {0} is already being imported")]
    AlreadyRunning(String),

    /// The run observed cancellation.
    #[error("import cancelled")]
    Cancelled,

    /// Background task failure.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ImportError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, ImportError::Cancelled)
    }
}

impl From<SourceError> for ImportError {
    fn from(err: SourceError) -> Self {
        match err {
            SourceError::Unavailable(reason) => ImportError::SourceUnavailable(reason),
            other => ImportError::Source(other),
        }
    }
}

impl From<LibraryError> for ImportError {
    fn from(err: LibraryError) -> Self {
        match err {
            LibraryError::Cancelled => ImportError::Cancelled,
            other => ImportError::Library(other),
        }
    }
}

/// Request to import one catalog.
///
/// The definition is created on first request and refreshed on later ones.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportRequest {
    pub source_manifest_url: String,
    pub catalog_id: String,
    pub name: String,
    pub media_type: MediaType,
    /// Overrides the definition's cap when set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_items: Option<u32>,
}

impl ImportRequest {
    pub fn new(
        source_manifest_url: impl Into<String>,
        catalog_id: impl Into<String>,
        name: impl Into<String>,
        media_type: MediaType,
    ) -> Self {
        Self {
            source_manifest_url: source_manifest_url.into(),
            catalog_id: catalog_id.into(),
            name: name.into(),
            media_type,
            max_items: None,
        }
    }

    pub fn with_max_items(mut self, max_items: u32) -> Self {
        self.max_items = Some(max_items);
        self
    }
}

/// A batch of import requests run as one background job.
#[derive(Debug, Clone)]
pub struct ImportJob {
    pub id: Uuid,
    /// User whose library settings the job acts on.
    pub user_id: String,
    pub requests: Vec<ImportRequest>,
    /// Shared by every request in the batch.
    pub cancel: CancellationToken,
}

impl ImportJob {
    pub fn new(user_id: impl Into<String>, requests: Vec<ImportRequest>) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id: user_id.into(),
            requests,
            cancel: CancellationToken::new(),
        }
    }

    /// Use `cancel` instead of a fresh token, e.g. a child of the host's
    /// shutdown token.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }
}

/// Options for a manual reset.
///
/// Counters are always cleared; status and collection only on request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResetOptions {
    /// Put the status back to `idle`.
    #[serde(default)]
    pub reset_status: bool,
    /// Forget the collection association (the collection itself stays).
    #[serde(default)]
    pub clear_collection: bool,
}

/// Outcome of one completed sync run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncSummary {
    pub definition_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub collection_id: Option<String>,
    /// Items fetched from the catalog.
    pub fetched: usize,
    /// Members removed from the collection.
    pub removed: usize,
    pub imported: u32,
    pub failed: u32,
    /// New catalog items left out because the collection was full.
    pub dropped: usize,
    /// Members after the run, when the store could report it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub collection_item_count: Option<u32>,
}

/// Lifecycle of a bulk import job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    #[default]
    Running,
    Completed,
    Cancelled,
}

/// Live progress of a bulk import job.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobProgress {
    pub state: JobState,
    /// Requests finished, successfully or not.
    pub processed: usize,
    pub total: usize,
    /// Definition currently being imported.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current: Option<String>,
}

/// Result of one request within a job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum CatalogOutcome {
    Completed { summary: SyncSummary },
    Failed { catalog: String, error: String },
    Cancelled { catalog: String },
}

impl CatalogOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, CatalogOutcome::Completed { .. })
    }
}

/// Final report of a bulk import job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobReport {
    pub job_id: Uuid,
    pub state: JobState,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub outcomes: Vec<CatalogOutcome>,
}

impl JobReport {
    pub fn completed_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_completed()).count()
    }

    pub fn failed_count(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, CatalogOutcome::Failed { .. }))
            .count()
    }
}
