//! Mock library store for testing.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;

use crate::library::{
    CollectionMember, CollectionStore, InsertOptions, InsertOutcome, LibraryError,
    MetadataInserter,
};
use crate::reconcile::ExternalIds;
use crate::source::CatalogItem;

/// A recorded insertion for test assertions.
#[derive(Debug, Clone)]
pub struct RecordedInsert {
    pub parent_folder: String,
    pub item_name: String,
    pub options: InsertOptions,
}

#[derive(Debug, Default)]
struct LibraryState {
    /// Library items by local id.
    items: HashMap<String, ExternalIds>,
    /// Collection members by collection id, in insertion order.
    collections: HashMap<String, Vec<String>>,
    next_id: u64,
}

#[derive(Debug, Default)]
struct Behavior {
    failing_items: HashSet<String>,
    empty_items: HashSet<String>,
    delays: HashMap<String, Duration>,
    fail_create_collection: bool,
    fail_remove: bool,
    cancel_after: Option<(usize, CancellationToken)>,
}

/// Mock implementation of the CollectionStore and MetadataInserter traits.
///
/// Keeps an in-memory library of items and collections:
/// - Inserting an item whose ids match an existing library item reuses it
/// - Per-item failures, missing results and delays by item name
/// - Cancel a token after N insertions
/// - Track insertions and removal batches for assertions
///
/// # Example
///
/// ```rust,ignore
/// use shelfsync_core::testing::MockLibrary;
///
/// let library = Arc::new(MockLibrary::new());
/// library.fail_item("Broken Movie").await;
///
/// let importer = CatalogImporter::new(config, registry, source,
///     library.clone(), library.clone(), users);
/// ```
#[derive(Debug, Default)]
pub struct MockLibrary {
    state: Arc<RwLock<LibraryState>>,
    behavior: Arc<RwLock<Behavior>>,
    inserts: Arc<RwLock<Vec<RecordedInsert>>>,
    removals: Arc<RwLock<Vec<Vec<String>>>>,
}

impl MockLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a library item.
    pub async fn add_library_item(&self, local_id: &str, ids: ExternalIds) {
        self.state
            .write()
            .await
            .items
            .insert(local_id.to_string(), ids);
    }

    /// Seed a collection with existing members.
    pub async fn add_collection(&self, collection_id: &str, members: &[&str]) {
        self.state.write().await.collections.insert(
            collection_id.to_string(),
            members.iter().map(|m| m.to_string()).collect(),
        );
    }

    /// Delete a collection, as a user would out of band.
    pub async fn delete_collection(&self, collection_id: &str) {
        self.state.write().await.collections.remove(collection_id);
    }

    /// Members of a collection, or `None` if it does not exist.
    pub async fn collection_members(&self, collection_id: &str) -> Option<Vec<String>> {
        self.state
            .read()
            .await
            .collections
            .get(collection_id)
            .cloned()
    }

    pub async fn collection_count(&self) -> usize {
        self.state.read().await.collections.len()
    }

    /// External ids of a library item.
    pub async fn library_item(&self, local_id: &str) -> Option<ExternalIds> {
        self.state.read().await.items.get(local_id).cloned()
    }

    /// Fail insertion of the item with this name.
    pub async fn fail_item(&self, name: &str) {
        self.behavior
            .write()
            .await
            .failing_items
            .insert(name.to_string());
    }

    /// Report success without a library item for this name.
    pub async fn return_no_item(&self, name: &str) {
        self.behavior
            .write()
            .await
            .empty_items
            .insert(name.to_string());
    }

    /// Delay insertion of the item with this name.
    pub async fn delay_item(&self, name: &str, delay: Duration) {
        self.behavior
            .write()
            .await
            .delays
            .insert(name.to_string(), delay);
    }

    pub async fn fail_collection_creation(&self, fail: bool) {
        self.behavior.write().await.fail_create_collection = fail;
    }

    pub async fn fail_removals(&self, fail: bool) {
        self.behavior.write().await.fail_remove = fail;
    }

    /// Cancel `token` once `count` insertions have completed.
    pub async fn cancel_after(&self, count: usize, token: CancellationToken) {
        self.behavior.write().await.cancel_after = Some((count, token));
    }

    /// Get all recorded insertions.
    pub async fn recorded_inserts(&self) -> Vec<RecordedInsert> {
        self.inserts.read().await.clone()
    }

    /// Names of inserted items, in call order.
    pub async fn inserted_names(&self) -> Vec<String> {
        self.inserts
            .read()
            .await
            .iter()
            .map(|i| i.item_name.clone())
            .collect()
    }

    /// Every `remove_items` batch, in call order.
    pub async fn recorded_removals(&self) -> Vec<Vec<String>> {
        self.removals.read().await.clone()
    }

    fn same_item(a: &ExternalIds, b: &ExternalIds) -> bool {
        let eq = |x: &Option<String>, y: &Option<String>| {
            matches!((x, y), (Some(x), Some(y)) if x == y)
        };
        eq(&a.primary_id, &b.primary_id)
            || eq(&a.imdb_id, &b.imdb_id)
            || eq(&a.tmdb_id, &b.tmdb_id)
    }
}

#[async_trait]
impl CollectionStore for MockLibrary {
    async fn create_collection(&self, name: &str) -> Result<String, LibraryError> {
        if self.behavior.read().await.fail_create_collection {
            return Err(LibraryError::Store(format!(
                "cannot create collection '{}'",
                name
            )));
        }

        let mut state = self.state.write().await;
        state.next_id += 1;
        let id = format!("collection-{}", state.next_id);
        state.collections.insert(id.clone(), Vec::new());
        Ok(id)
    }

    async fn collection_exists(&self, collection_id: &str) -> Result<bool, LibraryError> {
        Ok(self
            .state
            .read()
            .await
            .collections
            .contains_key(collection_id))
    }

    async fn add_items(
        &self,
        collection_id: &str,
        local_ids: &[String],
    ) -> Result<(), LibraryError> {
        let mut state = self.state.write().await;
        let members = state
            .collections
            .get_mut(collection_id)
            .ok_or_else(|| LibraryError::CollectionNotFound(collection_id.to_string()))?;
        for id in local_ids {
            if !members.contains(id) {
                members.push(id.clone());
            }
        }
        Ok(())
    }

    async fn remove_items(
        &self,
        collection_id: &str,
        local_ids: &[String],
    ) -> Result<(), LibraryError> {
        if self.behavior.read().await.fail_remove {
            return Err(LibraryError::Store("removal rejected".to_string()));
        }

        self.removals.write().await.push(local_ids.to_vec());
        let mut state = self.state.write().await;
        let members = state
            .collections
            .get_mut(collection_id)
            .ok_or_else(|| LibraryError::CollectionNotFound(collection_id.to_string()))?;
        members.retain(|m| !local_ids.contains(m));
        Ok(())
    }

    async fn list_members(
        &self,
        collection_id: &str,
    ) -> Result<Vec<CollectionMember>, LibraryError> {
        let state = self.state.read().await;
        let members = state
            .collections
            .get(collection_id)
            .ok_or_else(|| LibraryError::CollectionNotFound(collection_id.to_string()))?;
        Ok(members
            .iter()
            .map(|local_id| CollectionMember {
                local_id: local_id.clone(),
                ids: state.items.get(local_id).cloned().unwrap_or_default(),
            })
            .collect())
    }
}

#[async_trait]
impl MetadataInserter for MockLibrary {
    async fn insert(
        &self,
        parent_folder: &str,
        item: &CatalogItem,
        options: &InsertOptions,
        cancel: &CancellationToken,
    ) -> Result<InsertOutcome, LibraryError> {
        self.inserts.write().await.push(RecordedInsert {
            parent_folder: parent_folder.to_string(),
            item_name: item.name.clone(),
            options: options.clone(),
        });

        let (delay, fail, empty) = {
            let behavior = self.behavior.read().await;
            (
                behavior.delays.get(&item.name).copied(),
                behavior.failing_items.contains(&item.name),
                behavior.empty_items.contains(&item.name),
            )
        };

        if let Some(delay) = delay {
            tokio::select! {
                _ = cancel.cancelled() => return Err(LibraryError::Cancelled),
                _ = tokio::time::sleep(delay) => {}
            }
        }

        if fail {
            return Err(LibraryError::Insert {
                item: item.name.clone(),
                reason: "metadata lookup failed".to_string(),
            });
        }

        let outcome = if empty {
            InsertOutcome {
                local_item: None,
                created: false,
            }
        } else {
            let mut state = self.state.write().await;
            let existing = state
                .items
                .iter()
                .find(|(_, ids)| Self::same_item(ids, &item.ids))
                .map(|(id, _)| id.clone());
            match existing {
                Some(id) => InsertOutcome::existing(id),
                None => {
                    state.next_id += 1;
                    let id = format!("item-{}", state.next_id);
                    state.items.insert(id.clone(), item.ids.clone());
                    InsertOutcome::created(id)
                }
            }
        };

        let behavior = self.behavior.read().await;
        if let Some((count, token)) = &behavior.cancel_after {
            if self.inserts.read().await.len() >= *count {
                token.cancel();
            }
        }

        Ok(outcome)
    }
}
