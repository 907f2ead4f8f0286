//! Scheduler cycle integration tests.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::Utc;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

use shelfsync_core::{
    scheduler::CycleProgressCallback,
    testing::{fixtures, MockCatalogSource, MockLibrary, MockUserDirectory},
    CatalogImporter, CatalogRegistry, CatalogStatus, CycleProgress, CycleReport, ImportConfig,
    SchedulerConfig, SourceError, SqliteCatalogRegistry, SyncScheduler, UserContext,
};

struct TestHarness {
    registry: Arc<SqliteCatalogRegistry>,
    source: Arc<MockCatalogSource>,
    library: Arc<MockLibrary>,
    users: Arc<MockUserDirectory>,
    importer: CatalogImporter,
    _temp_dir: TempDir,
}

impl TestHarness {
    async fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let registry = Arc::new(
            SqliteCatalogRegistry::new(&temp_dir.path().join("test.db"))
                .expect("Failed to create registry"),
        );
        let source = Arc::new(MockCatalogSource::new(100));
        let library = Arc::new(MockLibrary::new());
        let users = Arc::new(MockUserDirectory::with_user("admin", "/media/movies").await);

        source.set_items(fixtures::catalog_items(2)).await;

        let config = ImportConfig {
            item_timeout_secs: 1,
            ..Default::default()
        };
        let importer = CatalogImporter::new(
            config,
            registry.clone(),
            source.clone(),
            library.clone(),
            library.clone(),
            users.clone(),
        );

        Self {
            registry,
            source,
            library,
            users,
            importer,
            _temp_dir: temp_dir,
        }
    }

    fn scheduler(&self, config: SchedulerConfig) -> SyncScheduler {
        SyncScheduler::new(
            config,
            self.registry.clone(),
            self.importer.clone(),
            self.users.clone(),
        )
    }

    async fn wait_for_report(
        &self,
        scheduler: &SyncScheduler,
        timeout: Duration,
    ) -> Option<CycleReport> {
        let start = std::time::Instant::now();
        while start.elapsed() < timeout {
            if let Some(report) = scheduler.status().await {
                return Some(report);
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        None
    }
}

#[tokio::test]
async fn test_cycle_syncs_enabled_definitions() {
    let harness = TestHarness::new().await;
    harness.registry.save(&fixtures::definition("a", 10)).unwrap();
    let mut disabled = fixtures::definition("b", 10);
    disabled.enabled = false;
    harness.registry.save(&disabled).unwrap();

    let scheduler = harness.scheduler(SchedulerConfig::default());
    let report = scheduler.run_cycle(false).await;

    assert_eq!(report.total, 1);
    assert_eq!(report.processed, 1);
    assert_eq!(report.succeeded, 1);
    assert!(report.failed.is_empty());
    assert_eq!(
        harness.registry.get("a:movie").unwrap().imported_count,
        2
    );
    assert!(harness.registry.get("b:movie").unwrap().collection_id.is_none());
    assert_eq!(scheduler.status().await, Some(report));
}

#[tokio::test]
async fn test_cycle_skips_definitions_not_due_unless_forced() {
    let harness = TestHarness::new().await;
    let mut fresh = fixtures::definition("a", 10).with_update_interval_hours(24);
    fresh.last_updated = Some(Utc::now());
    harness.registry.save(&fresh).unwrap();

    let scheduler = harness.scheduler(SchedulerConfig::default());

    let report = scheduler.run_cycle(false).await;
    assert_eq!(report.total, 0);

    let report = scheduler.run_now().await.unwrap();
    assert_eq!(report.total, 1);
    assert_eq!(report.succeeded, 1);
}

#[tokio::test]
async fn test_cycle_skipped_when_source_unavailable() {
    let harness = TestHarness::new().await;
    harness.registry.save(&fixtures::definition("a", 10)).unwrap();
    harness.source.set_available(false);

    let scheduler = harness.scheduler(SchedulerConfig::default());
    let report = scheduler.run_cycle(true).await;

    assert!(report.is_skipped());
    assert_eq!(report.total, 0);
    assert_eq!(
        harness.registry.get("a:movie").unwrap().status,
        CatalogStatus::Idle
    );
    assert!(harness.source.recorded_fetches().await.is_empty());
}

#[tokio::test]
async fn test_cycle_skipped_without_user() {
    let harness = TestHarness::new().await;
    harness.registry.save(&fixtures::definition("a", 10)).unwrap();

    let scheduler = harness.scheduler(SchedulerConfig {
        run_as_user: Some("ghost".to_string()),
        ..Default::default()
    });
    let report = scheduler.run_cycle(true).await;

    assert!(report.is_skipped());
    assert!(harness.library.recorded_inserts().await.is_empty());
}

#[tokio::test]
async fn test_cycle_isolates_definition_failures() {
    let harness = TestHarness::new().await;
    harness.registry.save(&fixtures::definition("a", 10)).unwrap();
    harness.registry.save(&fixtures::definition("b", 10)).unwrap();
    harness
        .source
        .set_next_error(SourceError::Http("timeout".to_string()))
        .await;

    let scheduler = harness.scheduler(SchedulerConfig::default());
    let report = scheduler.run_cycle(false).await;

    assert_eq!(report.processed, 2);
    assert_eq!(report.succeeded, 1);
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].definition_id, "a:movie");
    assert_eq!(
        harness.registry.get("a:movie").unwrap().status,
        CatalogStatus::Error
    );
    assert_eq!(
        harness.registry.get("b:movie").unwrap().status,
        CatalogStatus::Idle
    );
}

#[tokio::test]
async fn test_cycle_reports_progress() {
    let harness = TestHarness::new().await;
    harness.registry.save(&fixtures::definition("a", 10)).unwrap();
    harness.registry.save(&fixtures::definition("b", 10)).unwrap();

    let seen: Arc<Mutex<Vec<CycleProgress>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    let callback: CycleProgressCallback = Arc::new(move |progress| {
        sink.lock().unwrap().push(progress);
    });

    let scheduler = harness
        .scheduler(SchedulerConfig::default())
        .with_progress_callback(callback);
    scheduler.run_cycle(false).await;

    let seen = seen.lock().unwrap().clone();
    let processed: Vec<usize> = seen.iter().map(|p| p.processed).collect();
    assert_eq!(processed, vec![0, 1, 2]);
    assert!(seen.iter().all(|p| p.total == 2));
}

#[tokio::test]
async fn test_start_recovers_stale_import_and_runs_first_cycle() {
    let harness = TestHarness::new().await;
    let mut stale = fixtures::definition("a", 10);
    stale.status = CatalogStatus::Importing;
    harness.registry.save(&stale).unwrap();

    let scheduler = harness.scheduler(SchedulerConfig::default());
    scheduler.start();
    assert!(scheduler.is_running());

    let report = harness
        .wait_for_report(&scheduler, Duration::from_secs(5))
        .await
        .expect("first cycle should run immediately");
    assert_eq!(report.succeeded, 1);

    let definition = harness.registry.get("a:movie").unwrap();
    assert_eq!(definition.status, CatalogStatus::Idle);
    assert_eq!(definition.imported_count, 2);

    scheduler.stop();
    let start = std::time::Instant::now();
    while scheduler.is_running() && start.elapsed() < Duration::from_secs(5) {
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert!(!scheduler.is_running());
}

#[tokio::test]
async fn test_disabled_scheduler_does_not_start() {
    let harness = TestHarness::new().await;
    let scheduler = harness.scheduler(SchedulerConfig {
        enabled: false,
        ..Default::default()
    });

    scheduler.start();

    assert!(!scheduler.is_running());
    assert!(scheduler.status().await.is_none());
}

#[tokio::test]
async fn test_start_leaves_running_sync_alone() {
    let harness = TestHarness::new().await;
    harness.registry.save(&fixtures::definition("a", 10)).unwrap();
    harness
        .library
        .delay_item("Movie 1", Duration::from_millis(800))
        .await;

    let importer = harness.importer.clone();
    let running = tokio::spawn(async move {
        let user = UserContext {
            user_id: "admin".to_string(),
            root_folder: "/media/movies".to_string(),
        };
        importer
            .sync("a:movie", &user, &CancellationToken::new())
            .await
    });

    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(
        harness.registry.get("a:movie").unwrap().status,
        CatalogStatus::Importing
    );

    let scheduler = harness.scheduler(SchedulerConfig::default());
    scheduler.start();

    assert_eq!(
        harness.registry.get("a:movie").unwrap().status,
        CatalogStatus::Importing
    );

    let summary = running.await.unwrap().unwrap();
    assert_eq!(summary.imported, 2);
    assert_eq!(
        harness.registry.get("a:movie").unwrap().status,
        CatalogStatus::Idle
    );
    scheduler.stop();
}
