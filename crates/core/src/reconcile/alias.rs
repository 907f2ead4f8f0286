//! Identity aliases for catalog and library items.

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Kind of external identifier that can take part in identity matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AliasKind {
    /// The catalog provider's own identifier.
    Provider,
    /// IMDb id (`tt...`).
    Imdb,
    /// TMDb numeric id.
    Tmdb,
}

impl AliasKind {
    /// Every kind, in the default priority order.
    pub const ALL: [AliasKind; 3] = [AliasKind::Provider, AliasKind::Imdb, AliasKind::Tmdb];
}

impl fmt::Display for AliasKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AliasKind::Provider => "provider",
            AliasKind::Imdb => "imdb",
            AliasKind::Tmdb => "tmdb",
        };
        f.write_str(name)
    }
}

/// Known external identifiers of one item.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalIds {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub imdb_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tmdb_id: Option<String>,
}

impl ExternalIds {
    fn get(&self, kind: AliasKind) -> Option<&str> {
        let value = match kind {
            AliasKind::Provider => self.primary_id.as_deref(),
            AliasKind::Imdb => self.imdb_id.as_deref(),
            AliasKind::Tmdb => self.tmdb_id.as_deref(),
        };
        value.map(str::trim).filter(|v| !v.is_empty())
    }
}

/// A single identity alias.
///
/// Aliases of different kinds never compare equal, so an IMDb id can only
/// match another IMDb id.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Alias {
    External { kind: AliasKind, value: String },
    /// Library-local identifier, used when an item has no external ids.
    Local(String),
}

impl Alias {
    fn external(kind: AliasKind, value: &str) -> Self {
        let value = match kind {
            AliasKind::Imdb => value.to_ascii_lowercase(),
            _ => value.to_string(),
        };
        Alias::External { kind, value }
    }
}

impl fmt::Display for Alias {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Alias::External { kind, value } => write!(f, "{}:{}", kind, value),
            Alias::Local(id) => write!(f, "local:{}", id),
        }
    }
}

/// The aliases of one item, ordered by the configured priority.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AliasSet {
    aliases: Vec<Alias>,
}

impl AliasSet {
    /// Build the alias set of a catalog item from the identifier kinds in
    /// `priority`. Kinds not listed are ignored.
    pub fn from_ids(ids: &ExternalIds, priority: &[AliasKind]) -> Self {
        let aliases = priority
            .iter()
            .filter_map(|kind| ids.get(*kind).map(|value| Alias::external(*kind, value)))
            .collect();
        Self { aliases }
    }

    /// Build the alias set of a library item. An item without any usable
    /// external id falls back to its local id, which no catalog item carries.
    pub fn for_local(local_id: &str, ids: &ExternalIds, priority: &[AliasKind]) -> Self {
        let mut set = Self::from_ids(ids, priority);
        if set.aliases.is_empty() {
            set.aliases.push(Alias::Local(local_id.to_string()));
        }
        set
    }

    pub fn is_empty(&self) -> bool {
        self.aliases.is_empty()
    }

    pub fn len(&self) -> usize {
        self.aliases.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Alias> {
        self.aliases.iter()
    }

    /// Highest priority alias, used as a display key.
    pub fn canonical(&self) -> Option<&Alias> {
        self.aliases.first()
    }

    /// Whether any alias of this set is in `universe`.
    pub fn intersects(&self, universe: &HashSet<Alias>) -> bool {
        self.aliases.iter().any(|a| universe.contains(a))
    }

    /// Add every alias of this set to `universe`.
    pub fn extend_into(&self, universe: &mut HashSet<Alias>) {
        universe.extend(self.aliases.iter().cloned());
    }
}

impl fmt::Display for AliasSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.canonical() {
            Some(alias) => write!(f, "{}", alias),
            None => f.write_str("<no ids>"),
        }
    }
}
