//! Types for the sync scheduler.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::catalog::RegistryError;

/// Reasons a whole cycle is skipped.
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// No catalog provider is available.
    #[error("catalog source unavailable")]
    SourceUnavailable,

    /// Neither the configured nor the default user could be resolved.
    #[error("no user to run scheduled syncs as (configured: {0:?})")]
    NoUser(Option<String>),

    /// Definitions could not be listed.
    #[error("registry error: {0}")]
    Registry(#[from] RegistryError),
}

/// A definition whose sync failed during a cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CycleFailure {
    pub definition_id: String,
    pub error: String,
}

/// Progress of a running cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CycleProgress {
    pub processed: usize,
    pub total: usize,
}

/// Outcome of one scheduler cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CycleReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// Definitions selected for this cycle.
    pub total: usize,
    pub processed: usize,
    pub succeeded: usize,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub failed: Vec<CycleFailure>,
    /// Why the cycle did nothing, if it was skipped.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skipped: Option<String>,
    /// Whether shutdown interrupted the cycle.
    #[serde(default)]
    pub cancelled: bool,
}

impl CycleReport {
    pub(crate) fn started(now: DateTime<Utc>) -> Self {
        Self {
            started_at: now,
            finished_at: now,
            total: 0,
            processed: 0,
            succeeded: 0,
            failed: Vec::new(),
            skipped: None,
            cancelled: false,
        }
    }

    pub fn is_skipped(&self) -> bool {
        self.skipped.is_some()
    }

    /// Label used for the cycle metric.
    pub(crate) fn result_label(&self) -> &'static str {
        if self.skipped.is_some() {
            "skipped"
        } else if self.cancelled {
            "cancelled"
        } else {
            "completed"
        }
    }
}
