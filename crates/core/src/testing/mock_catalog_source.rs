//! Mock catalog source for testing.

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

use crate::catalog::MediaType;
use crate::source::{CatalogItem, CatalogSource, SourceError};

/// A recorded page request for test assertions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedFetch {
    pub catalog_id: String,
    pub media_type: MediaType,
    pub skip: usize,
}

/// Mock implementation of the CatalogSource trait.
///
/// Serves a fixed item list in pages of `page_size`:
/// - Toggle availability
/// - Track page requests for assertions
/// - Simulate a failing page or a slow provider
///
/// # Example
///
/// ```rust,ignore
/// use shelfsync_core::testing::{fixtures, MockCatalogSource};
///
/// let source = MockCatalogSource::new(100);
/// source.set_items(vec![fixtures::catalog_item("The Matrix", "tt0133093")]).await;
///
/// let page = source.fetch_page("top", MediaType::Movie, None, 0).await?;
/// assert_eq!(page.len(), 1);
/// ```
#[derive(Debug)]
pub struct MockCatalogSource {
    items: Arc<RwLock<Vec<CatalogItem>>>,
    page_size: usize,
    available: Arc<AtomicBool>,
    fetches: Arc<RwLock<Vec<RecordedFetch>>>,
    /// If set, the next fetch will fail with this error.
    next_error: Arc<RwLock<Option<SourceError>>>,
    fetch_delay: Arc<RwLock<Duration>>,
}

impl MockCatalogSource {
    /// Create an available, empty source serving pages of `page_size`.
    pub fn new(page_size: usize) -> Self {
        Self {
            items: Arc::new(RwLock::new(Vec::new())),
            page_size,
            available: Arc::new(AtomicBool::new(true)),
            fetches: Arc::new(RwLock::new(Vec::new())),
            next_error: Arc::new(RwLock::new(None)),
            fetch_delay: Arc::new(RwLock::new(Duration::ZERO)),
        }
    }

    /// Replace the catalog contents.
    pub async fn set_items(&self, items: Vec<CatalogItem>) {
        *self.items.write().await = items;
    }

    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Make the next fetch fail with the given error.
    pub async fn set_next_error(&self, error: SourceError) {
        *self.next_error.write().await = Some(error);
    }

    /// Delay every fetch by `delay`.
    pub async fn set_fetch_delay(&self, delay: Duration) {
        *self.fetch_delay.write().await = delay;
    }

    /// Get all recorded page requests.
    pub async fn recorded_fetches(&self) -> Vec<RecordedFetch> {
        self.fetches.read().await.clone()
    }

    /// Skips of all recorded page requests, in order.
    pub async fn recorded_skips(&self) -> Vec<usize> {
        self.fetches.read().await.iter().map(|f| f.skip).collect()
    }
}

#[async_trait]
impl CatalogSource for MockCatalogSource {
    fn is_available(&self) -> bool {
        self.available.load(Ordering::SeqCst)
    }

    async fn fetch_page(
        &self,
        catalog_id: &str,
        media_type: MediaType,
        _query: Option<&str>,
        skip: usize,
    ) -> Result<Vec<CatalogItem>, SourceError> {
        self.fetches.write().await.push(RecordedFetch {
            catalog_id: catalog_id.to_string(),
            media_type,
            skip,
        });

        if let Some(error) = self.next_error.write().await.take() {
            return Err(error);
        }

        let delay = *self.fetch_delay.read().await;
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let items = self.items.read().await;
        Ok(items
            .iter()
            .skip(skip)
            .take(self.page_size)
            .cloned()
            .collect())
    }
}
