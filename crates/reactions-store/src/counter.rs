// SPDX-License-Identifier: Apache-2.0
//! Counter store port and the in-memory implementation.

use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;

use reactions_proto::{CommentId, ReactionAction};

use crate::StoreError;

/// Persistent counter matrix keyed by (comment, reaction alias).
///
/// Absence means zero. Implementations never store a value ≤ 0: a mutation
/// that lands on zero (or would go below) deletes the entry instead, and
/// `apply` returns the clamped logical count, never a negative.
pub trait CounterStore: Send + Sync {
    /// Current count, 0 if no entry exists.
    fn get(&self, comment_id: CommentId, alias: &str) -> Result<u64, StoreError>;

    /// Apply one react (+1) or revert (−1) atomically and return the new
    /// clamped count. The read-modify-write must not interleave with another
    /// `apply` on the same key; concurrent increments may not be lost.
    fn apply(
        &self,
        comment_id: CommentId,
        alias: &str,
        action: ReactionAction,
    ) -> Result<u64, StoreError>;

    /// All aliases with a count > 0 on the given comment, for the render
    /// layer.
    fn all_for_comment(&self, comment_id: CommentId) -> Result<BTreeMap<String, u64>, StoreError>;
}

/// Compute the clamped successor count; `None` means "delete the entry".
pub(crate) fn next_count(current: u64, action: ReactionAction) -> Option<u64> {
    match action {
        ReactionAction::React => Some(current + 1),
        ReactionAction::Revert => match current.saturating_sub(1) {
            0 => None,
            n => Some(n),
        },
    }
}

/// In-memory counter store. The write lock is held across the whole
/// read-modify-write in `apply`, which closes the lost-increment race a
/// naive get/compute/store sequence has.
#[derive(Debug, Default)]
pub struct MemoryCounterStore {
    counts: RwLock<HashMap<(CommentId, String), u64>>,
}

impl MemoryCounterStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl CounterStore for MemoryCounterStore {
    fn get(&self, comment_id: CommentId, alias: &str) -> Result<u64, StoreError> {
        let counts = self.counts.read().map_err(|_| StoreError::Poisoned)?;
        Ok(counts
            .get(&(comment_id, alias.to_string()))
            .copied()
            .unwrap_or(0))
    }

    fn apply(
        &self,
        comment_id: CommentId,
        alias: &str,
        action: ReactionAction,
    ) -> Result<u64, StoreError> {
        let mut counts = self.counts.write().map_err(|_| StoreError::Poisoned)?;
        let key = (comment_id, alias.to_string());
        let current = counts.get(&key).copied().unwrap_or(0);
        match next_count(current, action) {
            Some(n) => {
                counts.insert(key, n);
                Ok(n)
            }
            None => {
                counts.remove(&key);
                Ok(0)
            }
        }
    }

    fn all_for_comment(&self, comment_id: CommentId) -> Result<BTreeMap<String, u64>, StoreError> {
        let counts = self.counts.read().map_err(|_| StoreError::Poisoned)?;
        Ok(counts
            .iter()
            .filter(|((id, _), _)| *id == comment_id)
            .map(|((_, alias), count)| (alias.clone(), *count))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn react_then_revert_restores_prior_count() {
        let store = MemoryCounterStore::new();
        store.apply(7, "thumbsup", ReactionAction::React).unwrap();
        let before = store.get(7, "thumbsup").unwrap();

        store.apply(7, "thumbsup", ReactionAction::React).unwrap();
        store.apply(7, "thumbsup", ReactionAction::Revert).unwrap();
        assert_eq!(store.get(7, "thumbsup").unwrap(), before);
    }

    #[test]
    fn revert_at_zero_stays_clamped_and_absent() {
        let store = MemoryCounterStore::new();
        assert_eq!(store.apply(7, "joy", ReactionAction::Revert).unwrap(), 0);
        assert_eq!(store.get(7, "joy").unwrap(), 0);
        assert!(store.all_for_comment(7).unwrap().is_empty());
    }

    #[test]
    fn entry_is_deleted_when_count_hits_zero() {
        let store = MemoryCounterStore::new();
        store.apply(7, "fire", ReactionAction::React).unwrap();
        assert_eq!(store.all_for_comment(7).unwrap().get("fire"), Some(&1));

        assert_eq!(store.apply(7, "fire", ReactionAction::Revert).unwrap(), 0);
        assert!(store.all_for_comment(7).unwrap().is_empty());
    }

    #[test]
    fn counts_are_per_comment_and_per_alias() {
        let store = MemoryCounterStore::new();
        store.apply(1, "thumbsup", ReactionAction::React).unwrap();
        store.apply(1, "joy", ReactionAction::React).unwrap();
        store.apply(2, "thumbsup", ReactionAction::React).unwrap();

        let comment_1 = store.all_for_comment(1).unwrap();
        assert_eq!(comment_1.len(), 2);
        assert_eq!(store.get(2, "thumbsup").unwrap(), 1);
        assert_eq!(store.get(2, "joy").unwrap(), 0);
    }

    #[test]
    fn concurrent_reacts_from_zero_land_on_exactly_two() {
        let store = Arc::new(MemoryCounterStore::new());
        let mut handles = Vec::new();
        for _ in 0..2 {
            let store = Arc::clone(&store);
            handles.push(std::thread::spawn(move || {
                store.apply(9, "joy", ReactionAction::React).unwrap()
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(store.get(9, "joy").unwrap(), 2);
    }

    #[test]
    fn many_concurrent_increments_are_not_lost() {
        let store = Arc::new(MemoryCounterStore::new());
        let mut handles = Vec::new();
        for _ in 0..16 {
            let store = Arc::clone(&store);
            handles.push(std::thread::spawn(move || {
                for _ in 0..50 {
                    store.apply(3, "clap", ReactionAction::React).unwrap();
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(store.get(3, "clap").unwrap(), 16 * 50);
    }
}
