//! Catalog importer implementation.
//!
//! One sync run per definition:
//! - Fetch: paginated, capped at `max_items`, cancellable between pages
//! - Reconcile: pure, see [`crate::reconcile`]
//! - Apply: one batched removal, then additions strictly one at a time
//!
//! Progress is owned by the run and flushed through the registry after every
//! item, so the persisted row is the only place other components read it.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use chrono::Utc;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::catalog::{CatalogDefinition, CatalogRegistry, CatalogStatus, RegistryError};
use crate::config::ImportConfig;
use crate::library::{
    CollectionStore, InsertOptions, LibraryError, MetadataInserter, UserContext, UserDirectory,
};
use crate::metrics;
use crate::reconcile::{reconcile, AliasSet, LocalItem};
use crate::source::{CatalogItem, CatalogSource};

use super::job::ImportJobHandle;
use super::types::{
    CatalogOutcome, ImportError, ImportJob, ImportRequest, JobProgress, JobReport, JobState,
    ResetOptions, SyncSummary,
};

/// Counters owned by a single sync run.
#[derive(Debug, Default)]
struct RunProgress {
    imported: u32,
    failed: u32,
    removed: usize,
}

/// Marks a definition as being synced by this process until dropped.
struct ActiveGuard {
    active: Arc<Mutex<HashSet<String>>>,
    id: String,
}

impl Drop for ActiveGuard {
    fn drop(&mut self) {
        let mut active = self.active.lock().unwrap_or_else(|e| e.into_inner());
        active.remove(&self.id);
    }
}

/// Imports external catalogs into library collections.
///
/// Cloning is cheap; clones share collaborators and the in-process run guard.
#[derive(Clone)]
pub struct CatalogImporter {
    config: ImportConfig,
    registry: Arc<dyn CatalogRegistry>,
    source: Arc<dyn CatalogSource>,
    collections: Arc<dyn CollectionStore>,
    inserter: Arc<dyn MetadataInserter>,
    users: Arc<dyn UserDirectory>,
    active: Arc<Mutex<HashSet<String>>>,
}

impl CatalogImporter {
    /// Create a new importer.
    pub fn new(
        config: ImportConfig,
        registry: Arc<dyn CatalogRegistry>,
        source: Arc<dyn CatalogSource>,
        collections: Arc<dyn CollectionStore>,
        inserter: Arc<dyn MetadataInserter>,
        users: Arc<dyn UserDirectory>,
    ) -> Self {
        Self {
            config,
            registry,
            source,
            collections,
            inserter,
            users,
            active: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    pub fn config(&self) -> &ImportConfig {
        &self.config
    }

    /// Whether a catalog provider is configured and reachable.
    pub fn source_available(&self) -> bool {
        self.source.is_available()
    }

    /// Move definitions left in `importing` by a previous process out of
    /// that state, according to the configured policy.
    ///
    /// Definitions this importer is syncing right now are left alone. The run
    /// guard stays locked during recovery so no sync can claim a row halfway.
    pub fn recover_stale(&self) -> Result<Vec<String>, ImportError> {
        let active = self.active.lock().unwrap_or_else(|e| e.into_inner());
        let running: Vec<String> = active.iter().cloned().collect();
        Ok(self
            .registry
            .recover_stale_imports(self.config.stale_import_policy, &running)?)
    }

    /// Snapshot of a definition, for status polling.
    pub fn get_status(&self, definition_id: &str) -> Result<CatalogDefinition, ImportError> {
        Ok(self.registry.get(definition_id)?)
    }

    /// Clear a definition's counters, and optionally its status and
    /// collection association.
    pub fn reset(
        &self,
        definition_id: &str,
        options: ResetOptions,
    ) -> Result<CatalogDefinition, ImportError> {
        let definition = self.registry.update(definition_id, &mut |def| {
            def.imported_count = 0;
            def.failed_count = 0;
            if options.reset_status {
                def.status = CatalogStatus::Idle;
            }
            if options.clear_collection {
                def.collection_id = None;
                def.collection_item_count = 0;
            }
        })?;

        info!(
            "Reset catalog {} (status: {}, collection cleared: {})",
            definition_id, definition.status, options.clear_collection
        );
        Ok(definition)
    }

    /// Create the definition for `request`, or refresh the existing one.
    pub fn ensure_definition(
        &self,
        request: &ImportRequest,
    ) -> Result<CatalogDefinition, ImportError> {
        let id = self
            .config
            .key_mode
            .key(&request.catalog_id, request.media_type);

        match self.registry.get(&id) {
            Ok(_) => Ok(self.registry.update(&id, &mut |def| {
                def.name = request.name.clone();
                def.source_manifest_url = request.source_manifest_url.clone();
                def.catalog_id = request.catalog_id.clone();
                if let Some(max_items) = request.max_items {
                    def.max_items = max_items;
                }
            })?),
            Err(RegistryError::NotFound(_)) => {
                let definition = CatalogDefinition::new(
                    &id,
                    &request.source_manifest_url,
                    &request.catalog_id,
                    &request.name,
                    request.media_type,
                )
                .with_max_items(request.max_items.unwrap_or(self.config.default_max_items))
                .with_update_interval_hours(self.config.default_update_interval_hours);
                self.registry.save(&definition)?;
                info!("Created catalog definition {} ({})", id, request.name);
                Ok(definition)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Accept a bulk import and run it in the background.
    ///
    /// Requests run one after another; a failing catalog does not stop the
    /// batch. Cancelling the job stops it before the next page or item.
    pub fn start_bulk_import(&self, job: ImportJob) -> ImportJobHandle {
        let (progress_tx, progress_rx) = watch::channel(JobProgress {
            total: job.requests.len(),
            ..Default::default()
        });
        let id = job.id;
        let cancel = job.cancel.clone();
        let importer = self.clone();

        info!(
            "Accepted import job {} with {} catalog(s) for user {}",
            id,
            job.requests.len(),
            job.user_id
        );

        let task = tokio::spawn(async move { importer.run_bulk_import(job, progress_tx).await });

        ImportJobHandle::new(id, cancel, progress_rx, task)
    }

    async fn run_bulk_import(
        self,
        job: ImportJob,
        progress_tx: watch::Sender<JobProgress>,
    ) -> JobReport {
        let started_at = Utc::now();
        let user = self.users.resolve(&job.user_id).await;
        if user.is_none() {
            warn!(
                "Import job {}: user {} not found, every catalog will fail",
                job.id, job.user_id
            );
        }

        let mut outcomes = Vec::with_capacity(job.requests.len());
        let mut state = JobState::Completed;

        for request in &job.requests {
            if job.cancel.is_cancelled() {
                state = JobState::Cancelled;
                break;
            }

            let catalog = self
                .config
                .key_mode
                .key(&request.catalog_id, request.media_type);
            progress_tx.send_modify(|p| p.current = Some(catalog.clone()));

            let outcome = self
                .import_request(request, &catalog, user.as_ref(), &job)
                .await;
            let cancelled = matches!(outcome, CatalogOutcome::Cancelled { .. });
            outcomes.push(outcome);

            progress_tx.send_modify(|p| {
                p.processed += 1;
                p.current = None;
            });

            if cancelled {
                state = JobState::Cancelled;
                break;
            }
        }

        progress_tx.send_modify(|p| {
            p.state = state;
            p.current = None;
        });

        let report = JobReport {
            job_id: job.id,
            state,
            started_at,
            finished_at: Utc::now(),
            outcomes,
        };

        info!(
            "Import job {} finished ({:?}): {} completed, {} failed",
            job.id,
            state,
            report.completed_count(),
            report.failed_count()
        );

        report
    }

    /// Run one request of a bulk job, containing every failure.
    async fn import_request(
        &self,
        request: &ImportRequest,
        catalog: &str,
        user: Option<&UserContext>,
        job: &ImportJob,
    ) -> CatalogOutcome {
        let failed = |error: ImportError| CatalogOutcome::Failed {
            catalog: catalog.to_string(),
            error: error.to_string(),
        };

        let definition = match self.ensure_definition(request) {
            Ok(definition) => definition,
            Err(e) => {
                error!("Import job {}: cannot register {}: {}", job.id, catalog, e);
                return failed(e);
            }
        };

        let user = match user {
            Some(user) if self.source.is_available() => user,
            Some(_) => {
                let err =
                    ImportError::SourceUnavailable("no catalog provider available".to_string());
                warn!("Import job {}: skipping {}: {}", job.id, definition.id, err);
                self.mark_error(&definition.id);
                return failed(err);
            }
            None => {
                let err = ImportError::UserNotFound(job.user_id.clone());
                warn!("Import job {}: skipping {}: {}", job.id, definition.id, err);
                self.mark_error(&definition.id);
                return failed(err);
            }
        };

        match self.sync(&definition.id, user, &job.cancel).await {
            Ok(summary) => CatalogOutcome::Completed { summary },
            Err(ImportError::Cancelled) => CatalogOutcome::Cancelled {
                catalog: definition.id,
            },
            Err(e) => {
                warn!("Import job {}: catalog {} failed: {}", job.id, definition.id, e);
                failed(e)
            }
        }
    }

    /// Sync one catalog definition into its collection.
    ///
    /// On success the definition ends `idle` with fresh counters and
    /// `last_updated`. A fatal failure leaves it in `error` and is returned.
    /// Cancellation returns [`ImportError::Cancelled`] and leaves the status
    /// and whatever counters were already flushed untouched.
    pub async fn sync(
        &self,
        definition_id: &str,
        user: &UserContext,
        cancel: &CancellationToken,
    ) -> Result<SyncSummary, ImportError> {
        if !self.source.is_available() {
            return Err(ImportError::SourceUnavailable(
                "no catalog provider available".to_string(),
            ));
        }

        let _guard = self.claim(definition_id)?;
        let started = Instant::now();

        let definition = self.registry.update(definition_id, &mut |def| {
            def.status = CatalogStatus::Importing;
            def.imported_count = 0;
            def.failed_count = 0;
        })?;
        info!(
            "Starting sync of catalog {} ({}, max {} items)",
            definition.id, definition.name, definition.max_items
        );

        let result = self.run_sync(&definition, user, cancel).await;
        let elapsed = started.elapsed().as_secs_f64();

        match &result {
            Ok(summary) => {
                info!(
                    "Catalog {} synced: {} imported, {} failed, {} removed in {:.1}s",
                    definition.id, summary.imported, summary.failed, summary.removed, elapsed
                );
                metrics::SYNC_RUNS.with_label_values(&["completed"]).inc();
                metrics::SYNC_DURATION
                    .with_label_values(&["completed"])
                    .observe(elapsed);
            }
            Err(ImportError::Cancelled) => {
                info!("Sync of catalog {} cancelled", definition.id);
                metrics::SYNC_RUNS.with_label_values(&["cancelled"]).inc();
                metrics::SYNC_DURATION
                    .with_label_values(&["cancelled"])
                    .observe(elapsed);
            }
            Err(e) => {
                error!("Sync of catalog {} failed: {}", definition.id, e);
                self.mark_error(&definition.id);
                metrics::SYNC_RUNS.with_label_values(&["failed"]).inc();
                metrics::SYNC_DURATION
                    .with_label_values(&["failed"])
                    .observe(elapsed);
            }
        }

        result
    }

    fn claim(&self, definition_id: &str) -> Result<ActiveGuard, ImportError> {
        let mut active = self.active.lock().unwrap_or_else(|e| e.into_inner());
        if !active.insert(definition_id.to_string()) {
            return Err(ImportError::AlreadyRunning(definition_id.to_string()));
        }
        Ok(ActiveGuard {
            active: Arc::clone(&self.active),
            id: definition_id.to_string(),
        })
    }

    fn mark_error(&self, definition_id: &str) {
        if let Err(e) = self
            .registry
            .update(definition_id, &mut |def| def.status = CatalogStatus::Error)
        {
            error!(
                "Failed to record error status for catalog {}: {}",
                definition_id, e
            );
        }
    }

    async fn run_sync(
        &self,
        definition: &CatalogDefinition,
        user: &UserContext,
        cancel: &CancellationToken,
    ) -> Result<SyncSummary, ImportError> {
        let priority = &self.config.alias_priority;
        let mut progress = RunProgress::default();

        let collection_id = self.resolve_collection(definition).await?;

        let members = match &collection_id {
            Some(id) => self.collections.list_members(id).await?,
            None => Vec::new(),
        };
        let local: Vec<LocalItem> = members
            .iter()
            .map(|m| LocalItem {
                local_id: m.local_id.clone(),
                aliases: AliasSet::for_local(&m.local_id, &m.ids, priority),
            })
            .collect();

        let fetched = self.fetch_catalog(definition, cancel).await?;
        let fetched_aliases: Vec<AliasSet> = fetched
            .iter()
            .map(|item| AliasSet::from_ids(&item.ids, priority))
            .collect();

        let plan = reconcile(&local, &fetched_aliases, definition.max_items as usize);
        debug!(
            "Catalog {}: {} members, {} fetched, remove {}, add {}, {} slots, {} over cap",
            definition.id,
            local.len(),
            fetched.len(),
            plan.remove.len(),
            plan.add.len(),
            plan.slots,
            plan.dropped
        );

        if cancel.is_cancelled() {
            return Err(ImportError::Cancelled);
        }

        if let Some(collection) = &collection_id {
            if !plan.remove.is_empty() {
                self.collections
                    .remove_items(collection, &plan.remove)
                    .await?;
                progress.removed = plan.remove.len();
                metrics::ITEMS_REMOVED.inc_by(plan.remove.len() as u64);
                info!(
                    "Catalog {}: removed {} item(s) no longer listed",
                    definition.id, progress.removed
                );
            }
        }

        for &idx in &plan.add {
            if cancel.is_cancelled() {
                return Err(ImportError::Cancelled);
            }

            let item = &fetched[idx];
            match self
                .import_item(definition, item, collection_id.as_deref(), user, cancel)
                .await
            {
                Ok(()) => {
                    progress.imported += 1;
                    metrics::ITEMS_IMPORTED.inc();
                }
                Err(LibraryError::Cancelled) => return Err(ImportError::Cancelled),
                Err(e) => {
                    warn!(
                        "Catalog {}: failed to import {} ({}): {}",
                        definition.id, item.name, fetched_aliases[idx], e
                    );
                    progress.failed += 1;
                    metrics::ITEMS_FAILED
                        .with_label_values(&[failure_reason(&e)])
                        .inc();
                }
            }

            self.registry.update(&definition.id, &mut |def| {
                def.imported_count = progress.imported;
                def.failed_count = progress.failed;
            })?;
        }

        let collection_item_count = match &collection_id {
            Some(id) => match self.collections.list_members(id).await {
                Ok(members) => Some(members.len() as u32),
                Err(e) => {
                    warn!(
                        "Catalog {}: could not refresh collection size: {}",
                        definition.id, e
                    );
                    None
                }
            },
            None => None,
        };

        let now = Utc::now();
        self.registry.update(&definition.id, &mut |def| {
            def.status = CatalogStatus::Idle;
            def.imported_count = progress.imported;
            def.failed_count = progress.failed;
            def.collection_id = collection_id.clone();
            def.last_updated = Some(now);
            if let Some(count) = collection_item_count {
                def.collection_item_count = count;
            }
        })?;

        Ok(SyncSummary {
            definition_id: definition.id.clone(),
            collection_id,
            fetched: fetched.len(),
            removed: progress.removed,
            imported: progress.imported,
            failed: progress.failed,
            dropped: plan.dropped,
            collection_item_count,
        })
    }

    /// Find the definition's collection, creating it when missing.
    ///
    /// A new collection id is persisted before any member is touched, so a
    /// crash later in the run still finds it on retry. Failing to create one
    /// is not fatal: the run continues and items stay uncollected.
    async fn resolve_collection(
        &self,
        definition: &CatalogDefinition,
    ) -> Result<Option<String>, ImportError> {
        if let Some(existing) = &definition.collection_id {
            if self.collections.collection_exists(existing).await? {
                return Ok(Some(existing.clone()));
            }
            warn!(
                "Collection {} of catalog {} no longer exists, creating a new one",
                existing, definition.id
            );
        }

        match self.collections.create_collection(&definition.name).await {
            Ok(collection_id) => {
                self.registry.update(&definition.id, &mut |def| {
                    def.collection_id = Some(collection_id.clone());
                })?;
                info!(
                    "Created collection {} for catalog {}",
                    collection_id, definition.id
                );
                Ok(Some(collection_id))
            }
            Err(e) => {
                warn!(
                    "Could not create collection '{}' for catalog {}, continuing without: {}",
                    definition.name, definition.id, e
                );
                Ok(None)
            }
        }
    }

    /// Fetch catalog pages until a short page or `max_items` items.
    async fn fetch_catalog(
        &self,
        definition: &CatalogDefinition,
        cancel: &CancellationToken,
    ) -> Result<Vec<CatalogItem>, ImportError> {
        let cap = definition.max_items as usize;
        let page_size = self.config.page_size;
        let mut items: Vec<CatalogItem> = Vec::new();
        let mut skip = 0;

        while items.len() < cap {
            if cancel.is_cancelled() {
                return Err(ImportError::Cancelled);
            }

            let fetch = self.source.fetch_page(
                &definition.catalog_id,
                definition.media_type,
                None,
                skip,
            );
            let page = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(ImportError::Cancelled),
                result = fetch => match result {
                    Ok(page) => {
                        metrics::PAGES_FETCHED.with_label_values(&["success"]).inc();
                        page
                    }
                    Err(e) => {
                        metrics::PAGES_FETCHED.with_label_values(&["error"]).inc();
                        return Err(e.into());
                    }
                },
            };

            let page_len = page.len();
            debug!(
                "Catalog {}: fetched {} item(s) at skip {}",
                definition.id, page_len, skip
            );

            let remaining = cap - items.len();
            items.extend(page.into_iter().take(remaining));

            if page_len < page_size {
                break;
            }
            skip += page_len;
        }

        Ok(items)
    }

    /// Insert one catalog item and add it to the collection.
    async fn import_item(
        &self,
        definition: &CatalogDefinition,
        item: &CatalogItem,
        collection_id: Option<&str>,
        user: &UserContext,
        cancel: &CancellationToken,
    ) -> Result<(), LibraryError> {
        let item_cancel = cancel.child_token();
        let options = InsertOptions {
            media_type: definition.media_type,
            catalog: definition.id.clone(),
        };
        let timeout = Duration::from_secs(self.config.item_timeout_secs);

        let insert = self
            .inserter
            .insert(&user.root_folder, item, &options, &item_cancel);

        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(LibraryError::Cancelled),
            result = tokio::time::timeout(timeout, insert) => match result {
                Ok(outcome) => outcome?,
                Err(_) => {
                    item_cancel.cancel();
                    return Err(LibraryError::Timeout {
                        secs: self.config.item_timeout_secs,
                    });
                }
            },
        };

        let local_id = outcome.local_item.ok_or_else(|| LibraryError::MissingItem {
            item: item.name.clone(),
        })?;

        if let Some(collection) = collection_id {
            self.collections
                .add_items(collection, std::slice::from_ref(&local_id))
                .await?;
        }

        debug!(
            "Catalog {}: imported {} as {} ({})",
            definition.id,
            item.name,
            local_id,
            if outcome.created { "new" } else { "existing" }
        );
        Ok(())
    }
}

fn failure_reason(err: &LibraryError) -> &'static str {
    match err {
        LibraryError::Timeout { .. } => "timeout",
        LibraryError::MissingItem { .. } => "no_item",
        LibraryError::Insert { .. } => "insert",
        _ => "collection",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_reason_labels() {
        let missing = LibraryError::MissingItem {
            item: "Dune".to_string(),
        };
        let insert = LibraryError::Insert {
            item: "Dune".to_string(),
            reason: "no library item found upstream".to_string(),
        };
        assert_eq!(failure_reason(&missing), "no_item");
        assert_eq!(failure_reason(&insert), "insert");
        assert_eq!(failure_reason(&LibraryError::Timeout { secs: 1 }), "timeout");
        assert_eq!(
            failure_reason(&LibraryError::CollectionNotFound("c".to_string())),
            "collection"
        );
    }
}
