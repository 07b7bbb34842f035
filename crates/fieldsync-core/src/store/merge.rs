//! Domain merge: remote conversion result into the stored domain map.

use std::collections::{BTreeMap, HashSet};

use fieldsync_types::{Entity, EntitySource};

/// Entities of one domain keyed by natural key.
pub type DomainMap = BTreeMap<String, Entity>;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeStats {
    pub inserted: usize,
    pub replaced: usize,
    /// Local edits newer than the remote value, kept as-is.
    pub preserved_local: usize,
    /// Local edits the server has not echoed yet, kept as-is.
    pub pending_local: usize,
    /// Local edits dropped because the server now reports their id under another key.
    pub reconciled: usize,
    pub removed: usize,
}

/// Build the next domain map from the stored one and a fresh remote result.
///
/// - The remote result is authoritative for remote and cached entities: keys
///   it no longer contains are dropped.
/// - A stored local edit survives when the incoming remote value does not win
///   over it (see [`Entity::wins_over`]), and when the key is absent remotely,
///   unless the remote result carries the same id under a different key.
pub fn merge_domain(existing: &DomainMap, incoming: Vec<Entity>) -> (DomainMap, MergeStats) {
    let mut stats = MergeStats::default();
    let mut next = DomainMap::new();
    let remote_ids: HashSet<String> = incoming.iter().map(|e| e.id.clone()).collect();

    for entity in incoming {
        let key = entity.natural_key.clone();
        match existing.get(&key) {
            Some(local) if local.source == EntitySource::LocalEdit && !entity.wins_over(local) => {
                tracing::debug!("Keeping local edit for '{}' over older remote value", key);
                stats.preserved_local += 1;
                next.insert(key, local.clone());
            }
            Some(_) => {
                stats.replaced += 1;
                next.insert(key, entity);
            }
            None => {
                stats.inserted += 1;
                next.insert(key, entity);
            }
        }
    }

    for (key, entity) in existing {
        if next.contains_key(key) {
            continue;
        }
        if entity.source != EntitySource::LocalEdit {
            stats.removed += 1;
        } else if remote_ids.contains(&entity.id) {
            tracing::debug!("Local edit '{}' superseded under a new key", entity.id);
            stats.reconciled += 1;
        } else {
            stats.pending_local += 1;
            next.insert(key.clone(), entity.clone());
        }
    }

    (next, stats)
}

/// Insert or replace a single entity. Returns false when the stored value
/// wins over it and is kept.
pub fn upsert_entity(map: &mut DomainMap, entity: Entity) -> bool {
    let key = entity.natural_key.clone();
    replace_entity(map, &key, entity)
}

/// Replace the entry stored under `previous_key` with `entity`, whose own key
/// may differ. Rejected when the value stored under either key wins over it.
pub fn replace_entity(map: &mut DomainMap, previous_key: &str, entity: Entity) -> bool {
    let stored_wins = |key: &str| map.get(key).is_some_and(|current| current.wins_over(&entity));
    if stored_wins(previous_key) || stored_wins(&entity.natural_key) {
        return false;
    }

    if previous_key != entity.natural_key {
        map.remove(previous_key);
    }
    map.insert(entity.natural_key.clone(), entity);
    true
}
