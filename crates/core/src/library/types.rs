//! Types exchanged with the library store.

use serde::{Deserialize, Serialize};

use crate::catalog::MediaType;
use crate::reconcile::ExternalIds;

/// A member of a collection, with the external ids the library knows for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionMember {
    /// Library item id.
    pub local_id: String,
    #[serde(flatten)]
    pub ids: ExternalIds,
}

/// The acting user and their library settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserContext {
    pub user_id: String,
    /// Folder new items are inserted under.
    pub root_folder: String,
}

/// Options for a metadata insertion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InsertOptions {
    pub media_type: MediaType,
    /// Catalog definition on whose behalf the item is inserted.
    pub catalog: String,
}

/// Result of a metadata insertion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InsertOutcome {
    /// Library item id, when the inserter produced or found one.
    pub local_item: Option<String>,
    /// Whether a new library item was created (false = already present).
    pub created: bool,
}

impl InsertOutcome {
    pub fn created(local_id: impl Into<String>) -> Self {
        Self {
            local_item: Some(local_id.into()),
            created: true,
        }
    }

    pub fn existing(local_id: impl Into<String>) -> Self {
        Self {
            local_item: Some(local_id.into()),
            created: false,
        }
    }
}
