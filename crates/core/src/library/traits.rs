//! Trait definitions for the library module.

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use super::error::LibraryError;
use super::types::{CollectionMember, InsertOptions, InsertOutcome, UserContext};
use crate::source::CatalogItem;

/// Collection operations of the library store.
#[async_trait]
pub trait CollectionStore: Send + Sync {
    /// Create a collection and return its id.
    async fn create_collection(&self, name: &str) -> Result<String, LibraryError>;

    /// Whether the collection still exists.
    async fn collection_exists(&self, collection_id: &str) -> Result<bool, LibraryError>;

    /// Add library items to a collection.
    async fn add_items(&self, collection_id: &str, local_ids: &[String])
        -> Result<(), LibraryError>;

    /// Remove library items from a collection.
    async fn remove_items(
        &self,
        collection_id: &str,
        local_ids: &[String],
    ) -> Result<(), LibraryError>;

    /// Current members with their known external ids.
    async fn list_members(&self, collection_id: &str)
        -> Result<Vec<CollectionMember>, LibraryError>;
}

/// Creates library items from catalog metadata.
#[async_trait]
pub trait MetadataInserter: Send + Sync {
    /// Insert `item` under `parent_folder`.
    ///
    /// Implementations should stop early once `cancel` fires; the caller
    /// also time-boxes the call and cancels the token on expiry.
    async fn insert(
        &self,
        parent_folder: &str,
        item: &CatalogItem,
        options: &InsertOptions,
        cancel: &CancellationToken,
    ) -> Result<InsertOutcome, LibraryError>;
}

/// Resolves acting users to their library settings.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Look up a user by id.
    async fn resolve(&self, user_id: &str) -> Option<UserContext>;

    /// User that unattended syncs act as when none is configured.
    async fn default_user(&self) -> Option<UserContext>;
}
