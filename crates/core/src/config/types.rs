use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::catalog::{CatalogKeyMode, StaleImportPolicy};
use crate::reconcile::AliasKind;

/// Root configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub import: ImportConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
}

/// Database configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

fn default_db_path() -> PathBuf {
    PathBuf::from("shelfsync.db")
}

/// Import behaviour shared by bulk imports and scheduled syncs.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ImportConfig {
    /// Time box for a single metadata insertion (seconds).
    #[serde(default = "default_item_timeout")]
    pub item_timeout_secs: u64,

    /// Nominal page size of the catalog provider.
    /// A page shorter than this ends pagination.
    #[serde(default = "default_page_size")]
    pub page_size: usize,

    /// `max_items` for definitions created from an import request that does
    /// not carry one.
    #[serde(default = "default_max_items")]
    pub default_max_items: u32,

    /// `update_interval_hours` for definitions created from an import request.
    #[serde(default = "default_update_interval")]
    pub default_update_interval_hours: u32,

    /// How catalog definition ids are derived.
    #[serde(default)]
    pub key_mode: CatalogKeyMode,

    /// Identifier kinds used for matching, highest priority first.
    #[serde(default = "default_alias_priority")]
    pub alias_priority: Vec<AliasKind>,

    #[serde(default)]
    pub stale_import_policy: StaleImportPolicy,
}

fn default_item_timeout() -> u64 {
    60
}

fn default_page_size() -> usize {
    100
}

fn default_max_items() -> u32 {
    100
}

fn default_update_interval() -> u32 {
    24
}

fn default_alias_priority() -> Vec<AliasKind> {
    AliasKind::ALL.to_vec()
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            item_timeout_secs: default_item_timeout(),
            page_size: default_page_size(),
            default_max_items: default_max_items(),
            default_update_interval_hours: default_update_interval(),
            key_mode: CatalogKeyMode::default(),
            alias_priority: default_alias_priority(),
            stale_import_policy: StaleImportPolicy::default(),
        }
    }
}

/// Scheduled sync configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SchedulerConfig {
    /// When disabled, syncs only happen through explicit triggers.
    #[serde(default = "default_scheduler_enabled")]
    pub enabled: bool,

    /// How often a sync cycle runs (minutes).
    #[serde(default = "default_interval_minutes")]
    pub interval_minutes: u64,

    /// User whose library settings scheduled syncs act on.
    /// Falls back to the user directory's default user.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_as_user: Option<String>,
}

fn default_scheduler_enabled() -> bool {
    true
}

fn default_interval_minutes() -> u64 {
    60
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            enabled: default_scheduler_enabled(),
            interval_minutes: default_interval_minutes(),
            run_as_user: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_empty_config_uses_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.database.path.to_str().unwrap(), "shelfsync.db");
        assert_eq!(config.import.item_timeout_secs, 60);
        assert_eq!(config.import.page_size, 100);
        assert_eq!(config.import.key_mode, CatalogKeyMode::CatalogAndMediaType);
        assert_eq!(
            config.import.alias_priority,
            vec![AliasKind::Provider, AliasKind::Imdb, AliasKind::Tmdb]
        );
        assert_eq!(config.import.stale_import_policy, StaleImportPolicy::Rerun);
        assert!(config.scheduler.enabled);
        assert_eq!(config.scheduler.interval_minutes, 60);
        assert!(config.scheduler.run_as_user.is_none());
    }

    #[test]
    fn test_deserialize_full_import_section() {
        let toml = r#"
[import]
item_timeout_secs = 15
page_size = 50
default_max_items = 250
default_update_interval_hours = 6
key_mode = "catalog_id"
alias_priority = ["tmdb", "imdb"]
stale_import_policy = "mark_error"
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.import.item_timeout_secs, 15);
        assert_eq!(config.import.page_size, 50);
        assert_eq!(config.import.default_max_items, 250);
        assert_eq!(config.import.default_update_interval_hours, 6);
        assert_eq!(config.import.key_mode, CatalogKeyMode::CatalogId);
        assert_eq!(
            config.import.alias_priority,
            vec![AliasKind::Tmdb, AliasKind::Imdb]
        );
        assert_eq!(
            config.import.stale_import_policy,
            StaleImportPolicy::MarkError
        );
    }

    #[test]
    fn test_deserialize_scheduler_section() {
        let toml = r#"
[scheduler]
enabled = false
interval_minutes = 15
run_as_user = "admin"
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert!(!config.scheduler.enabled);
        assert_eq!(config.scheduler.interval_minutes, 15);
        assert_eq!(config.scheduler.run_as_user.as_deref(), Some("admin"));
    }

    #[test]
    fn test_deserialize_with_custom_database_path() {
        let toml = r#"
[database]
path = "/data/sync.sqlite"
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.database.path.to_str().unwrap(), "/data/sync.sqlite");
    }

    #[test]
    fn test_unknown_alias_kind_rejected() {
        let toml = r#"
[import]
alias_priority = ["tvdb"]
"#;
        let result: Result<Config, _> = toml::from_str(toml);
        assert!(result.is_err());
    }
}
