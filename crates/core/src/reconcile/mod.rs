//! Collection reconciliation.
//!
//! Pure computation converging a collection's current members toward the
//! fetched catalog content under a size cap. No I/O happens here; the
//! importer feeds in alias sets and applies the result.
//!
//! Identity is alias-set intersection: a library item and a catalog item are
//! the same title when they share at least one identifier of the same kind.
//! Earlier catalog positions always win the remaining slots, which makes
//! successive runs converge on the same membership.

mod alias;

pub use alias::{Alias, AliasKind, AliasSet, ExternalIds};

use std::collections::HashSet;

/// A current collection member as seen by the reconciler.
#[derive(Debug, Clone)]
pub struct LocalItem {
    /// Library identifier, used for removal.
    pub local_id: String,
    pub aliases: AliasSet,
}

/// Result of one reconciliation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reconciliation {
    /// Local ids to remove from the collection, in member order.
    pub remove: Vec<String>,
    /// Indices into the fetched slice to add, in source order.
    pub add: Vec<usize>,
    /// Members kept in the collection.
    pub retained: usize,
    /// Capacity available for additions.
    pub slots: usize,
    /// New catalog items left out because the cap was reached.
    pub dropped: usize,
}

impl Reconciliation {
    /// Whether the collection already reflects the catalog.
    pub fn is_noop(&self) -> bool {
        self.remove.is_empty() && self.add.is_empty()
    }
}

/// Compute removals and additions for a collection.
///
/// * `local` - current members with their alias sets.
/// * `fetched` - alias sets of the fetched catalog items, in source order.
/// * `max_items` - cap on the collection size.
///
/// Fetched items with an empty alias set are never added: nothing could
/// match them on a later run. A fetched identity listed twice is added once.
pub fn reconcile(local: &[LocalItem], fetched: &[AliasSet], max_items: usize) -> Reconciliation {
    let mut fetched_universe = HashSet::new();
    for aliases in fetched {
        aliases.extend_into(&mut fetched_universe);
    }

    let mut remove = Vec::new();
    let mut present = HashSet::new();
    for item in local {
        if item.aliases.intersects(&fetched_universe) {
            item.aliases.extend_into(&mut present);
        } else {
            remove.push(item.local_id.clone());
        }
    }

    let retained = local.len() - remove.len();
    let slots = max_items.saturating_sub(retained);

    let mut add = Vec::new();
    let mut dropped = 0;
    for (idx, aliases) in fetched.iter().enumerate() {
        if aliases.is_empty() || aliases.intersects(&present) {
            continue;
        }
        if add.len() < slots {
            add.push(idx);
        } else {
            dropped += 1;
        }
        aliases.extend_into(&mut present);
    }

    Reconciliation {
        remove,
        add,
        retained,
        slots,
        dropped,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn imdb(value: &str) -> AliasSet {
        AliasSet::from_ids(
            &ExternalIds {
                imdb_id: Some(value.to_string()),
                ..Default::default()
            },
            &AliasKind::ALL,
        )
    }

    fn local(id: &str, aliases: AliasSet) -> LocalItem {
        LocalItem {
            local_id: id.to_string(),
            aliases,
        }
    }

    #[test]
    fn test_order_preference_under_cap() {
        let members = vec![local("X", imdb("x")), local("Y", imdb("y"))];
        let fetched = vec![imdb("y"), imdb("z"), imdb("w"), imdb("v")];

        let result = reconcile(&members, &fetched, 3);

        assert_eq!(result.remove, vec!["X".to_string()]);
        assert_eq!(result.retained, 1);
        assert_eq!(result.slots, 2);
        assert_eq!(result.add, vec![1, 2]);
        assert_eq!(result.dropped, 1);
    }

    #[test]
    fn test_second_run_is_noop() {
        let fetched = vec![imdb("a"), imdb("b"), imdb("c")];
        let first = reconcile(&[], &fetched, 10);
        assert_eq!(first.add, vec![0, 1, 2]);

        let members: Vec<LocalItem> = first
            .add
            .iter()
            .map(|&i| local(&format!("lib-{}", i), fetched[i].clone()))
            .collect();
        let second = reconcile(&members, &fetched, 10);
        assert!(second.is_noop());
    }

    #[test]
    fn test_alias_independence_tmdb_only_match() {
        let member_ids = ExternalIds {
            primary_id: Some("local-provider".to_string()),
            imdb_id: Some("tt9999".to_string()),
            tmdb_id: Some("603".to_string()),
        };
        let fetched_ids = ExternalIds {
            primary_id: Some("catalog-provider".to_string()),
            imdb_id: Some("tt0133093".to_string()),
            tmdb_id: Some("603".to_string()),
        };
        let members = vec![local(
            "lib-1",
            AliasSet::for_local("lib-1", &member_ids, &AliasKind::ALL),
        )];
        let fetched = vec![AliasSet::from_ids(&fetched_ids, &AliasKind::ALL)];

        let result = reconcile(&members, &fetched, 5);
        assert!(result.remove.is_empty());
        assert!(result.add.is_empty());
    }

    #[test]
    fn test_member_without_ids_is_removed() {
        let members = vec![local(
            "lib-1",
            AliasSet::for_local("lib-1", &ExternalIds::default(), &AliasKind::ALL),
        )];
        let fetched = vec![imdb("a")];

        let result = reconcile(&members, &fetched, 5);
        assert_eq!(result.remove, vec!["lib-1".to_string()]);
        assert_eq!(result.add, vec![0]);
    }

    #[test]
    fn test_zero_cap_removes_unmatched_and_adds_nothing() {
        let members = vec![local("A", imdb("a"))];
        let result = reconcile(&members, &[], 0);
        assert_eq!(result.remove, vec!["A".to_string()]);
        assert!(result.add.is_empty());
        assert_eq!(result.slots, 0);
    }

    #[test]
    fn test_retained_over_cap_leaves_no_slots() {
        let members = vec![local("A", imdb("a")), local("B", imdb("b"))];
        let fetched = vec![imdb("a"), imdb("b"), imdb("c")];

        let result = reconcile(&members, &fetched, 1);
        assert!(result.remove.is_empty());
        assert_eq!(result.slots, 0);
        assert!(result.add.is_empty());
        assert_eq!(result.dropped, 1);
    }

    #[test]
    fn test_empty_and_duplicate_fetched_items_skipped() {
        let fetched = vec![AliasSet::default(), imdb("a"), imdb("A"), imdb("b")];
        let result = reconcile(&[], &fetched, 10);
        assert_eq!(result.add, vec![1, 3]);
    }

    #[test]
    fn test_priority_list_excludes_unlisted_kinds() {
        let ids = ExternalIds {
            primary_id: Some("p-1".to_string()),
            ..Default::default()
        };
        let only_imdb = [AliasKind::Imdb];
        let members = vec![local("lib-1", AliasSet::for_local("lib-1", &ids, &only_imdb))];
        let fetched = vec![AliasSet::from_ids(&ids, &only_imdb)];

        let result = reconcile(&members, &fetched, 5);
        assert_eq!(result.remove, vec!["lib-1".to_string()]);
        assert!(result.add.is_empty());
    }
}
