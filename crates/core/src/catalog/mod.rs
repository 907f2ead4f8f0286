//! Catalog registry - durable store of catalog definitions.
//!
//! Every operation is synchronous and serialized against the others, so a
//! running sync flushing its counters and an administrative edit cannot
//! interleave inside one read-modify-write.

mod sqlite;
mod types;

pub use sqlite::SqliteCatalogRegistry;
pub use types::*;

/// Trait for catalog definition storage.
pub trait CatalogRegistry: Send + Sync {
    /// All definitions, ordered by name.
    fn get_all(&self) -> Result<Vec<CatalogDefinition>, RegistryError>;

    /// Get a definition by id.
    fn get(&self, id: &str) -> Result<CatalogDefinition, RegistryError>;

    /// Insert or fully replace a definition (last writer wins).
    fn save(&self, definition: &CatalogDefinition) -> Result<(), RegistryError>;

    /// Delete a definition. The collection it points at is left alone.
    fn delete(&self, id: &str) -> Result<(), RegistryError>;

    /// Read the current row, apply `apply` to it and write it back while
    /// holding the writer lock. Returns the stored row.
    ///
    /// The id cannot be changed through this call.
    fn update(
        &self,
        id: &str,
        apply: &mut dyn FnMut(&mut CatalogDefinition),
    ) -> Result<CatalogDefinition, RegistryError>;

    /// Move rows left in `importing` by a previous process out of that state
    /// according to `policy`, skipping the ids in `running`. Returns the ids
    /// that were changed.
    fn recover_stale_imports(
        &self,
        policy: StaleImportPolicy,
        running: &[String],
    ) -> Result<Vec<String>, RegistryError>;
}
