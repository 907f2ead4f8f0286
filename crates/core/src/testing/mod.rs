//! Testing utilities and mock implementations.
//!
//! Mocks for every collaborator the importer drives, so a full sync can run
//! against an in-memory registry without a media server or catalog provider.
//!
//! # Example
//!
//! ```rust,ignore
//! use shelfsync_core::testing::{fixtures, MockCatalogSource, MockLibrary, MockUserDirectory};
//!
//! let source = MockCatalogSource::new(100);
//! source.set_items(vec![fixtures::catalog_item("The Matrix", "tt0133093")]).await;
//!
//! let library = MockLibrary::new();
//! library.fail_item("Broken Movie").await;
//!
//! let users = MockUserDirectory::with_user("admin", "/media/movies").await;
//! ```

mod mock_catalog_source;
mod mock_library;
mod mock_user_directory;

pub use mock_catalog_source::{MockCatalogSource, RecordedFetch};
pub use mock_library::{MockLibrary, RecordedInsert};
pub use mock_user_directory::MockUserDirectory;

/// Test fixtures and helper functions.
pub mod fixtures {
    use crate::catalog::{CatalogDefinition, MediaType};
    use crate::import::ImportRequest;
    use crate::reconcile::ExternalIds;
    use crate::source::CatalogItem;

    pub const MANIFEST_URL: &str = "https://addon.example/manifest.json";

    /// Ids carrying only an IMDb id.
    pub fn imdb_ids(imdb_id: &str) -> ExternalIds {
        ExternalIds {
            imdb_id: Some(imdb_id.to_string()),
            ..Default::default()
        }
    }

    /// Ids carrying only a TMDB id.
    pub fn tmdb_ids(tmdb_id: &str) -> ExternalIds {
        ExternalIds {
            tmdb_id: Some(tmdb_id.to_string()),
            ..Default::default()
        }
    }

    /// A catalog item whose provider id is its IMDb id, as most providers do.
    pub fn catalog_item(name: &str, imdb_id: &str) -> CatalogItem {
        CatalogItem::new(
            name,
            ExternalIds {
                primary_id: Some(imdb_id.to_string()),
                imdb_id: Some(imdb_id.to_string()),
                tmdb_id: None,
            },
        )
    }

    /// `count` catalog items named `Movie 1..=count` with ids `tt1..`.
    pub fn catalog_items(count: usize) -> Vec<CatalogItem> {
        (1..=count)
            .map(|i| catalog_item(&format!("Movie {}", i), &format!("tt{}", i)))
            .collect()
    }

    /// A movie definition keyed `<catalog_id>:movie`.
    pub fn definition(catalog_id: &str, max_items: u32) -> CatalogDefinition {
        CatalogDefinition::new(
            format!("{}:movie", catalog_id),
            MANIFEST_URL,
            catalog_id,
            format!("Catalog {}", catalog_id),
            MediaType::Movie,
        )
        .with_max_items(max_items)
    }

    /// A movie import request.
    pub fn request(catalog_id: &str, max_items: u32) -> ImportRequest {
        ImportRequest::new(
            MANIFEST_URL,
            catalog_id,
            format!("Catalog {}", catalog_id),
            MediaType::Movie,
        )
        .with_max_items(max_items)
    }
}
