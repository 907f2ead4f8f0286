//! Catalog import - sync external catalogs into library collections.
//!
//! The importer fetches a catalog, reconciles it against the collection it
//! feeds and applies the difference one item at a time:
//!
//! ```text
//! fetch pages -> reconcile -> remove (batched) -> insert + add (sequential)
//! ```
//!
//! Bulk imports run as background jobs reporting through an
//! [`ImportJobHandle`].

mod importer;
mod job;
mod types;

pub use importer::CatalogImporter;
pub use job::ImportJobHandle;
pub use types::{
    CatalogOutcome, ImportError, ImportJob, ImportRequest, JobProgress, JobReport, JobState,
    ResetOptions, SyncSummary,
};
