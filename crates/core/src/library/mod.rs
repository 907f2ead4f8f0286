//! Library store integration.
//!
//! The library (collections, items, users) is owned by the host media
//! server. This module only defines the seams the importer drives:
//!
//! - [`CollectionStore`] - create collections, list and change members
//! - [`MetadataInserter`] - turn a catalog item into a library item
//! - [`UserDirectory`] - resolve the acting user's root folder

mod error;
mod traits;
mod types;

pub use error::LibraryError;
pub use traits::{CollectionStore, MetadataInserter, UserDirectory};
pub use types::{CollectionMember, InsertOptions, InsertOutcome, UserContext};
