//! Catalog source integration.
//!
//! The catalog provider is an optional capability: a host without a provider
//! configured composes the importer with [`NullCatalogSource`], which reports
//! itself unavailable instead of failing every call.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::catalog::MediaType;
use crate::reconcile::ExternalIds;

/// Errors that can occur when fetching from a catalog source.
#[derive(Debug, Error)]
pub enum SourceError {
    /// Provider unreachable or not configured.
    #[error("Catalog source unavailable: {0}")]
    Unavailable(String),

    /// Transport failure.
    #[error("HTTP request failed: {0}")]
    Http(String),

    /// Provider returned an error.
    #[error("API error: {status} - {message}")]
    ApiError { status: u16, message: String },

    /// Failed to parse response.
    #[error("Failed to parse response: {0}")]
    ParseError(String),
}

/// One item listed by a catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogItem {
    /// Display name, used in logs.
    pub name: String,
    #[serde(flatten)]
    pub ids: ExternalIds,
    /// Provider metadata, forwarded untouched to the metadata inserter.
    #[serde(default)]
    pub payload: serde_json::Value,
}

impl CatalogItem {
    pub fn new(name: impl Into<String>, ids: ExternalIds) -> Self {
        Self {
            name: name.into(),
            ids,
            payload: serde_json::Value::Null,
        }
    }

    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = payload;
        self
    }
}

/// Trait for paginated catalog providers.
#[async_trait]
pub trait CatalogSource: Send + Sync {
    /// Whether the provider is configured and reachable for this process.
    fn is_available(&self) -> bool;

    /// Fetch one page starting at `skip`.
    ///
    /// Items arrive in the provider's priority order. A page shorter than the
    /// provider's nominal page size, or an empty page, ends the catalog.
    async fn fetch_page(
        &self,
        catalog_id: &str,
        media_type: MediaType,
        query: Option<&str>,
        skip: usize,
    ) -> Result<Vec<CatalogItem>, SourceError>;
}

/// Catalog source used when no provider is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullCatalogSource;

#[async_trait]
impl CatalogSource for NullCatalogSource {
    fn is_available(&self) -> bool {
        false
    }

    async fn fetch_page(
        &self,
        _catalog_id: &str,
        _media_type: MediaType,
        _query: Option<&str>,
        _skip: usize,
    ) -> Result<Vec<CatalogItem>, SourceError> {
        Err(SourceError::Unavailable(
            "no catalog provider configured".to_string(),
        ))
    }
}
