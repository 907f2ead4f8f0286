//! Sync scheduler implementation.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::catalog::{CatalogDefinition, CatalogRegistry};
use crate::config::SchedulerConfig;
use crate::import::{CatalogImporter, ImportError};
use crate::library::{UserContext, UserDirectory};
use crate::metrics;

use super::types::{CycleFailure, CycleProgress, CycleReport, SchedulerError};

/// Callback invoked after every definition of a cycle.
pub type CycleProgressCallback = Arc<dyn Fn(CycleProgress) + Send + Sync>;

/// Everything a cycle needs; cloned into the interval task.
#[derive(Clone)]
struct CycleRunner {
    config: SchedulerConfig,
    registry: Arc<dyn CatalogRegistry>,
    importer: CatalogImporter,
    users: Arc<dyn UserDirectory>,
    on_progress: Option<CycleProgressCallback>,
    cycle_lock: Arc<Mutex<()>>,
    last_report: Arc<RwLock<Option<CycleReport>>>,
    shutdown: CancellationToken,
}

/// Periodically syncs enabled catalog definitions.
pub struct SyncScheduler {
    runner: CycleRunner,
    running: Arc<AtomicBool>,
}

impl SyncScheduler {
    /// Create a new scheduler.
    pub fn new(
        config: SchedulerConfig,
        registry: Arc<dyn CatalogRegistry>,
        importer: CatalogImporter,
        users: Arc<dyn UserDirectory>,
    ) -> Self {
        Self {
            runner: CycleRunner {
                config,
                registry,
                importer,
                users,
                on_progress: None,
                cycle_lock: Arc::new(Mutex::new(())),
                last_report: Arc::new(RwLock::new(None)),
                shutdown: CancellationToken::new(),
            },
            running: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Report `processed/total` after every definition of a cycle.
    pub fn with_progress_callback(mut self, callback: CycleProgressCallback) -> Self {
        self.runner.on_progress = Some(callback);
        self
    }

    /// Tie the scheduler to a parent shutdown token.
    pub fn with_shutdown(mut self, shutdown: CancellationToken) -> Self {
        self.runner.shutdown = shutdown;
        self
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }

    /// Recover stale imports and spawn the interval loop.
    ///
    /// The first cycle runs immediately. A stopped scheduler cannot be
    /// started again.
    pub fn start(&self) {
        if !self.runner.config.enabled {
            info!("Sync scheduler disabled, syncs run only when triggered");
            return;
        }
        if self.runner.shutdown.is_cancelled() {
            warn!("Sync scheduler already stopped");
            return;
        }
        if self.running.swap(true, Ordering::SeqCst) {
            warn!("Sync scheduler already running");
            return;
        }

        match self.runner.importer.recover_stale() {
            Ok(ids) if !ids.is_empty() => {
                info!("Recovered {} interrupted import(s): {:?}", ids.len(), ids)
            }
            Ok(_) => {}
            Err(e) => error!("Failed to recover interrupted imports: {}", e),
        }

        let runner = self.runner.clone();
        let running = Arc::clone(&self.running);
        let period = Duration::from_secs(runner.config.interval_minutes.max(1) * 60);

        tokio::spawn(async move {
            info!(
                "Sync scheduler started (every {} minute(s))",
                runner.config.interval_minutes
            );
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    biased;
                    _ = runner.shutdown.cancelled() => {
                        info!("Sync scheduler received shutdown signal");
                        break;
                    }
                    _ = ticker.tick() => {
                        runner.run_cycle(false).await;
                    }
                }
            }

            running.store(false, Ordering::SeqCst);
            info!("Sync scheduler stopped");
        });
    }

    /// Stop the interval loop and cancel any sync in flight.
    pub fn stop(&self) {
        info!("Stopping sync scheduler");
        self.runner.shutdown.cancel();
    }

    /// Run one cycle in the background, ignoring the due check.
    pub fn run_now(&self) -> JoinHandle<CycleReport> {
        let runner = self.runner.clone();
        tokio::spawn(async move { runner.run_cycle(true).await })
    }

    /// Run one cycle and wait for it. `force` ignores the due check.
    pub async fn run_cycle(&self, force: bool) -> CycleReport {
        self.runner.run_cycle(force).await
    }

    /// Report of the last finished cycle.
    pub async fn status(&self) -> Option<CycleReport> {
        self.runner.last_report.read().await.clone()
    }
}

impl CycleRunner {
    async fn run_cycle(&self, force: bool) -> CycleReport {
        let _cycle = self.cycle_lock.lock().await;
        let mut report = CycleReport::started(Utc::now());

        match self.prepare(force).await {
            Err(e) => {
                warn!("Skipping sync cycle: {}", e);
                report.skipped = Some(e.to_string());
            }
            Ok((user, definitions)) => {
                report.total = definitions.len();
                info!(
                    "Sync cycle started: {} catalog(s) as user {}",
                    report.total, user.user_id
                );
                self.notify(&report);

                for definition in &definitions {
                    if self.shutdown.is_cancelled() {
                        report.cancelled = true;
                        break;
                    }

                    let cancel = self.shutdown.child_token();
                    match self.importer.sync(&definition.id, &user, &cancel).await {
                        Ok(summary) => {
                            debug!(
                                "Cycle: catalog {} synced ({} imported, {} failed)",
                                definition.id, summary.imported, summary.failed
                            );
                            report.succeeded += 1;
                        }
                        Err(ImportError::Cancelled) => {
                            report.cancelled = true;
                            break;
                        }
                        Err(e) => {
                            warn!("Cycle: catalog {} failed: {}", definition.id, e);
                            report.failed.push(CycleFailure {
                                definition_id: definition.id.clone(),
                                error: e.to_string(),
                            });
                        }
                    }

                    report.processed += 1;
                    self.notify(&report);
                }

                info!(
                    "Sync cycle finished: {}/{} processed, {} failed{}",
                    report.processed,
                    report.total,
                    report.failed.len(),
                    if report.cancelled { " (cancelled)" } else { "" }
                );
            }
        }

        report.finished_at = Utc::now();
        metrics::SCHEDULER_CYCLES
            .with_label_values(&[report.result_label()])
            .inc();
        *self.last_report.write().await = Some(report.clone());
        report
    }

    /// Resolve the acting user and the definitions to sync.
    async fn prepare(
        &self,
        force: bool,
    ) -> Result<(UserContext, Vec<CatalogDefinition>), SchedulerError> {
        if !self.importer.source_available() {
            return Err(SchedulerError::SourceUnavailable);
        }

        let user = match &self.config.run_as_user {
            Some(user_id) => self.users.resolve(user_id).await,
            None => self.users.default_user().await,
        }
        .ok_or_else(|| SchedulerError::NoUser(self.config.run_as_user.clone()))?;

        let now = Utc::now();
        let definitions = self
            .registry
            .get_all()?
            .into_iter()
            .filter(|d| d.enabled && (force || d.is_due(now)))
            .collect();

        Ok((user, definitions))
    }

    fn notify(&self, report: &CycleReport) {
        if let Some(callback) = &self.on_progress {
            callback(CycleProgress {
                processed: report.processed,
                total: report.total,
            });
        }
    }
}
