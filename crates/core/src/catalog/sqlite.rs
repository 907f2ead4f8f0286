//! SQLite-backed catalog registry implementation.

use std::path::Path;
use std::str::FromStr;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use tracing::info;

use super::{
    CatalogDefinition, CatalogRegistry, CatalogStatus, MediaType, RegistryError,
    StaleImportPolicy,
};

const SELECT_COLUMNS: &str = "id, source_manifest_url, catalog_id, name, media_type, enabled,
     update_interval_hours, max_items, status, imported_count, failed_count,
     collection_id, collection_item_count, last_updated";

/// SQLite-backed catalog registry.
pub struct SqliteCatalogRegistry {
    conn: Mutex<Connection>,
}

impl SqliteCatalogRegistry {
    /// Create a new SQLite registry, creating the database file and tables if needed.
    pub fn new(path: &Path) -> Result<Self, RegistryError> {
        let conn = Connection::open(path).map_err(|e| RegistryError::Database(e.to_string()))?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory SQLite registry (useful for testing).
    pub fn in_memory() -> Result<Self, RegistryError> {
        let conn =
            Connection::open_in_memory().map_err(|e| RegistryError::Database(e.to_string()))?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn initialize_schema(conn: &Connection) -> Result<(), RegistryError> {
        conn.execute_batch(
            r#"
            -- One row per configured external catalog
            CREATE TABLE IF NOT EXISTS catalog_definitions (
                id TEXT PRIMARY KEY,
                source_manifest_url TEXT NOT NULL,
                catalog_id TEXT NOT NULL,
                name TEXT NOT NULL,
                media_type TEXT NOT NULL,
                enabled INTEGER NOT NULL DEFAULT 1,
                update_interval_hours INTEGER NOT NULL DEFAULT 0,
                max_items INTEGER NOT NULL DEFAULT 0,
                status TEXT NOT NULL DEFAULT 'idle',
                imported_count INTEGER NOT NULL DEFAULT 0,
                failed_count INTEGER NOT NULL DEFAULT 0,
                collection_id TEXT,
                collection_item_count INTEGER NOT NULL DEFAULT 0,
                last_updated TEXT
            );

            CREATE INDEX IF NOT EXISTS idx_catalog_definitions_name ON catalog_definitions(name);
            CREATE INDEX IF NOT EXISTS idx_catalog_definitions_status ON catalog_definitions(status);
            "#,
        )
        .map_err(|e| RegistryError::Database(e.to_string()))?;

        Ok(())
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, RegistryError> {
        self.conn
            .lock()
            .map_err(|_| RegistryError::Internal("registry lock poisoned".to_string()))
    }

    fn parse_text<T>(idx: usize, value: String) -> rusqlite::Result<T>
    where
        T: FromStr,
        T::Err: std::error::Error + Send + Sync + 'static,
    {
        value.parse().map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
        })
    }

    fn row_to_definition(row: &rusqlite::Row) -> rusqlite::Result<CatalogDefinition> {
        let media_type: MediaType = Self::parse_text(4, row.get(4)?)?;
        let status: CatalogStatus = Self::parse_text(8, row.get(8)?)?;
        let last_updated_str: Option<String> = row.get(13)?;

        let last_updated = last_updated_str
            .and_then(|s| DateTime::parse_from_rfc3339(&s).ok())
            .map(|dt| dt.with_timezone(&Utc));

        Ok(CatalogDefinition {
            id: row.get(0)?,
            source_manifest_url: row.get(1)?,
            catalog_id: row.get(2)?,
            name: row.get(3)?,
            media_type,
            enabled: row.get(5)?,
            update_interval_hours: row.get(6)?,
            max_items: row.get(7)?,
            status,
            imported_count: row.get(9)?,
            failed_count: row.get(10)?,
            collection_id: row.get(11)?,
            collection_item_count: row.get(12)?,
            last_updated,
        })
    }

    fn load(conn: &Connection, id: &str) -> Result<CatalogDefinition, RegistryError> {
        conn.query_row(
            &format!("SELECT {} FROM catalog_definitions WHERE id = ?", SELECT_COLUMNS),
            params![id],
            Self::row_to_definition,
        )
        .optional()
        .map_err(|e| RegistryError::Database(e.to_string()))?
        .ok_or_else(|| RegistryError::NotFound(id.to_string()))
    }

    fn write(conn: &Connection, def: &CatalogDefinition) -> Result<(), RegistryError> {
        conn.execute(
            "INSERT INTO catalog_definitions (id, source_manifest_url, catalog_id, name, media_type, enabled,
                update_interval_hours, max_items, status, imported_count, failed_count,
                collection_id, collection_item_count, last_updated)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                source_manifest_url = excluded.source_manifest_url,
                catalog_id = excluded.catalog_id,
                name = excluded.name,
                media_type = excluded.media_type,
                enabled = excluded.enabled,
                update_interval_hours = excluded.update_interval_hours,
                max_items = excluded.max_items,
                status = excluded.status,
                imported_count = excluded.imported_count,
                failed_count = excluded.failed_count,
                collection_id = excluded.collection_id,
                collection_item_count = excluded.collection_item_count,
                last_updated = excluded.last_updated",
            params![
                &def.id,
                &def.source_manifest_url,
                &def.catalog_id,
                &def.name,
                def.media_type.as_str(),
                def.enabled,
                def.update_interval_hours,
                def.max_items,
                def.status.as_str(),
                def.imported_count,
                def.failed_count,
                &def.collection_id,
                def.collection_item_count,
                def.last_updated.map(|dt| dt.to_rfc3339()),
            ],
        )
        .map_err(|e| RegistryError::Database(e.to_string()))?;

        Ok(())
    }
}

impl CatalogRegistry for SqliteCatalogRegistry {
    fn get_all(&self) -> Result<Vec<CatalogDefinition>, RegistryError> {
        let conn = self.lock()?;

        let mut stmt = conn
            .prepare(&format!(
                "SELECT {} FROM catalog_definitions ORDER BY name COLLATE NOCASE, id",
                SELECT_COLUMNS
            ))
            .map_err(|e| RegistryError::Database(e.to_string()))?;

        let rows = stmt
            .query_map([], Self::row_to_definition)
            .map_err(|e| RegistryError::Database(e.to_string()))?;

        let mut definitions = Vec::new();
        for row in rows {
            definitions.push(row.map_err(|e| RegistryError::Database(e.to_string()))?);
        }
        Ok(definitions)
    }

    fn get(&self, id: &str) -> Result<CatalogDefinition, RegistryError> {
        let conn = self.lock()?;
        Self::load(&conn, id)
    }

    fn save(&self, definition: &CatalogDefinition) -> Result<(), RegistryError> {
        let conn = self.lock()?;
        Self::write(&conn, definition)
    }

    fn delete(&self, id: &str) -> Result<(), RegistryError> {
        let conn = self.lock()?;

        let rows_affected = conn
            .execute("DELETE FROM catalog_definitions WHERE id = ?", params![id])
            .map_err(|e| RegistryError::Database(e.to_string()))?;

        if rows_affected == 0 {
            return Err(RegistryError::NotFound(id.to_string()));
        }

        Ok(())
    }

    fn update(
        &self,
        id: &str,
        apply: &mut dyn FnMut(&mut CatalogDefinition),
    ) -> Result<CatalogDefinition, RegistryError> {
        let conn = self.lock()?;

        let mut definition = Self::load(&conn, id)?;
        apply(&mut definition);
        definition.id = id.to_string();
        Self::write(&conn, &definition)?;

        Ok(definition)
    }

    fn recover_stale_imports(
        &self,
        policy: StaleImportPolicy,
        running: &[String],
    ) -> Result<Vec<String>, RegistryError> {
        let conn = self.lock()?;

        let mut stmt = conn
            .prepare("SELECT id FROM catalog_definitions WHERE status = ? ORDER BY id")
            .map_err(|e| RegistryError::Database(e.to_string()))?;
        let ids = stmt
            .query_map(params![CatalogStatus::Importing.as_str()], |row| {
                row.get::<_, String>(0)
            })
            .map_err(|e| RegistryError::Database(e.to_string()))?
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| RegistryError::Database(e.to_string()))?
            .into_iter()
            .filter(|id| !running.contains(id))
            .collect::<Vec<_>>();

        if ids.is_empty() {
            return Ok(ids);
        }

        let target = match policy {
            StaleImportPolicy::Rerun => CatalogStatus::Idle,
            StaleImportPolicy::MarkError => CatalogStatus::Error,
        };

        for id in &ids {
            conn.execute(
                "UPDATE catalog_definitions SET status = ? WHERE id = ? AND status = ?",
                params![target.as_str(), id, CatalogStatus::Importing.as_str()],
            )
            .map_err(|e| RegistryError::Database(e.to_string()))?;
        }

        info!(
            "Recovered {} stale importing catalog(s) as {}: {:?}",
            ids.len(),
            target,
            ids
        );

        Ok(ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn create_test_registry() -> SqliteCatalogRegistry {
        SqliteCatalogRegistry::in_memory().unwrap()
    }

    fn create_test_definition(id: &str, name: &str) -> CatalogDefinition {
        CatalogDefinition::new(
            id,
            "https://addon.example/manifest.json",
            id.split(':').next().unwrap_or(id),
            name,
            MediaType::Movie,
        )
        .with_max_items(50)
        .with_update_interval_hours(12)
    }

    #[test]
    fn test_save_and_get() {
        let registry = create_test_registry();
        let mut def = create_test_definition("top:movie", "Top Movies");
        def.collection_id = Some("col-1".to_string());
        def.last_updated = Some(Utc::now());

        registry.save(&def).unwrap();

        let loaded = registry.get("top:movie").unwrap();
        assert_eq!(loaded.name, "Top Movies");
        assert_eq!(loaded.max_items, 50);
        assert_eq!(loaded.update_interval_hours, 12);
        assert_eq!(loaded.collection_id.as_deref(), Some("col-1"));
        assert_eq!(loaded.media_type, MediaType::Movie);
        assert!(loaded.last_updated.is_some());
    }

    #[test]
    fn test_get_nonexistent() {
        let registry = create_test_registry();
        let result = registry.get("missing");
        assert!(matches!(result, Err(RegistryError::NotFound(_))));
    }

    #[test]
    fn test_save_replaces_full_row() {
        let registry = create_test_registry();
        let mut def = create_test_definition("top:movie", "Top Movies");
        def.collection_id = Some("col-1".to_string());
        registry.save(&def).unwrap();

        let mut replacement = create_test_definition("top:movie", "Renamed");
        replacement.collection_id = None;
        registry.save(&replacement).unwrap();

        let loaded = registry.get("top:movie").unwrap();
        assert_eq!(loaded.name, "Renamed");
        assert!(loaded.collection_id.is_none());
        assert_eq!(registry.get_all().unwrap().len(), 1);
    }

    #[test]
    fn test_get_all_ordered_by_name() {
        let registry = create_test_registry();
        registry
            .save(&create_test_definition("c:movie", "zombies"))
            .unwrap();
        registry
            .save(&create_test_definition("a:movie", "Action"))
            .unwrap();
        registry
            .save(&create_test_definition("b:movie", "classics"))
            .unwrap();

        let names: Vec<String> = registry
            .get_all()
            .unwrap()
            .into_iter()
            .map(|d| d.name)
            .collect();
        assert_eq!(names, vec!["Action", "classics", "zombies"]);
    }

    #[test]
    fn test_delete() {
        let registry = create_test_registry();
        registry
            .save(&create_test_definition("top:movie", "Top"))
            .unwrap();

        registry.delete("top:movie").unwrap();

        assert!(matches!(
            registry.get("top:movie"),
            Err(RegistryError::NotFound(_))
        ));
        assert!(matches!(
            registry.delete("top:movie"),
            Err(RegistryError::NotFound(_))
        ));
    }

    #[test]
    fn test_update_applies_closure_and_keeps_id() {
        let registry = create_test_registry();
        registry
            .save(&create_test_definition("top:movie", "Top"))
            .unwrap();

        let updated = registry
            .update("top:movie", &mut |def| {
                def.status = CatalogStatus::Importing;
                def.imported_count = 3;
                def.id = "hijacked".to_string();
            })
            .unwrap();

        assert_eq!(updated.id, "top:movie");
        assert_eq!(updated.status, CatalogStatus::Importing);

        let loaded = registry.get("top:movie").unwrap();
        assert_eq!(loaded.imported_count, 3);
        assert!(registry.get("hijacked").is_err());
    }

    #[test]
    fn test_update_preserves_fields_changed_concurrently() {
        let registry = create_test_registry();
        registry
            .save(&create_test_definition("top:movie", "Top"))
            .unwrap();

        // An admin edit lands between two progress flushes.
        registry
            .update("top:movie", &mut |def| def.imported_count = 1)
            .unwrap();
        registry
            .update("top:movie", &mut |def| def.name = "Edited".to_string())
            .unwrap();
        registry
            .update("top:movie", &mut |def| def.imported_count = 2)
            .unwrap();

        let loaded = registry.get("top:movie").unwrap();
        assert_eq!(loaded.name, "Edited");
        assert_eq!(loaded.imported_count, 2);
    }

    #[test]
    fn test_update_nonexistent() {
        let registry = create_test_registry();
        let result = registry.update("missing", &mut |_| {});
        assert!(matches!(result, Err(RegistryError::NotFound(_))));
    }

    #[test]
    fn test_recover_stale_imports_rerun() {
        let registry = create_test_registry();
        let mut stale = create_test_definition("a:movie", "A");
        stale.status = CatalogStatus::Importing;
        registry.save(&stale).unwrap();
        registry.save(&create_test_definition("b:movie", "B")).unwrap();

        let recovered = registry
            .recover_stale_imports(StaleImportPolicy::Rerun, &[])
            .unwrap();

        assert_eq!(recovered, vec!["a:movie".to_string()]);
        assert_eq!(registry.get("a:movie").unwrap().status, CatalogStatus::Idle);
    }

    #[test]
    fn test_recover_stale_imports_mark_error() {
        let registry = create_test_registry();
        let mut stale = create_test_definition("a:movie", "A");
        stale.status = CatalogStatus::Importing;
        registry.save(&stale).unwrap();

        registry
            .recover_stale_imports(StaleImportPolicy::MarkError, &[])
            .unwrap();

        assert_eq!(registry.get("a:movie").unwrap().status, CatalogStatus::Error);
    }

    #[test]
    fn test_recover_skips_running_ids() {
        let registry = create_test_registry();
        for id in ["a:movie", "b:movie"] {
            let mut def = create_test_definition(id, id);
            def.status = CatalogStatus::Importing;
            registry.save(&def).unwrap();
        }

        let recovered = registry
            .recover_stale_imports(
                StaleImportPolicy::MarkError,
                &["a:movie".to_string()],
            )
            .unwrap();

        assert_eq!(recovered, vec!["b:movie".to_string()]);
        assert_eq!(
            registry.get("a:movie").unwrap().status,
            CatalogStatus::Importing
        );
        assert_eq!(registry.get("b:movie").unwrap().status, CatalogStatus::Error);
    }

    #[test]
    fn test_recover_with_nothing_stale() {
        let registry = create_test_registry();
        registry.save(&create_test_definition("a:movie", "A")).unwrap();
        let recovered = registry
            .recover_stale_imports(StaleImportPolicy::Rerun, &[])
            .unwrap();
        assert!(recovered.is_empty());
    }

    #[test]
    fn test_persists_across_reopen() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("registry.db");

        {
            let registry = SqliteCatalogRegistry::new(&path).unwrap();
            let mut def = create_test_definition("top:series", "Top Series");
            def.media_type = MediaType::Series;
            def.status = CatalogStatus::Error;
            def.failed_count = 4;
            registry.save(&def).unwrap();
        }

        let registry = SqliteCatalogRegistry::new(&path).unwrap();
        let loaded = registry.get("top:series").unwrap();
        assert_eq!(loaded.media_type, MediaType::Series);
        assert_eq!(loaded.status, CatalogStatus::Error);
        assert_eq!(loaded.failed_count, 4);
    }
}
