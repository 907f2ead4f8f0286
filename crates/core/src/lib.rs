pub mod catalog;
pub mod config;
pub mod import;
pub mod library;
pub mod metrics;
pub mod reconcile;
pub mod scheduler;
pub mod source;
pub mod testing;

pub use catalog::{
    CatalogDefinition, CatalogKeyMode, CatalogRegistry, CatalogStatus, MediaType, RegistryError,
    SqliteCatalogRegistry, StaleImportPolicy,
};
pub use config::{
    load_config, load_config_from_str, validate_config, Config, ConfigError, ImportConfig,
    SchedulerConfig,
};
pub use import::{
    CatalogImporter, CatalogOutcome, ImportError, ImportJob, ImportJobHandle, ImportRequest,
    JobProgress, JobReport, JobState, ResetOptions, SyncSummary,
};
pub use library::{
    CollectionMember, CollectionStore, InsertOptions, InsertOutcome, LibraryError,
    MetadataInserter, UserContext, UserDirectory,
};
pub use reconcile::{reconcile, Alias, AliasKind, AliasSet, ExternalIds, LocalItem, Reconciliation};
pub use scheduler::{CycleProgress, CycleReport, SchedulerError, SyncScheduler};
pub use source::{CatalogItem, CatalogSource, NullCatalogSource, SourceError};
