//! Mock user directory for testing.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::library::{UserContext, UserDirectory};

/// Mock implementation of the UserDirectory trait.
///
/// The first user added becomes the default user unless one is set.
#[derive(Debug, Default)]
pub struct MockUserDirectory {
    users: Arc<RwLock<HashMap<String, UserContext>>>,
    default_user: Arc<RwLock<Option<String>>>,
}

impl MockUserDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Directory with a single user whose items go under `root_folder`.
    pub async fn with_user(user_id: &str, root_folder: &str) -> Self {
        let directory = Self::new();
        directory.add_user(user_id, root_folder).await;
        directory
    }

    pub async fn add_user(&self, user_id: &str, root_folder: &str) {
        self.users.write().await.insert(
            user_id.to_string(),
            UserContext {
                user_id: user_id.to_string(),
                root_folder: root_folder.to_string(),
            },
        );
        let mut default_user = self.default_user.write().await;
        if default_user.is_none() {
            *default_user = Some(user_id.to_string());
        }
    }

    pub async fn set_default_user(&self, user_id: Option<&str>) {
        *self.default_user.write().await = user_id.map(str::to_string);
    }
}

#[async_trait]
impl UserDirectory for MockUserDirectory {
    async fn resolve(&self, user_id: &str) -> Option<UserContext> {
        self.users.read().await.get(user_id).cloned()
    }

    async fn default_user(&self) -> Option<UserContext> {
        let default_user = self.default_user.read().await.clone()?;
        self.resolve(&default_user).await
    }
}
