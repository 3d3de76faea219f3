// SPDX-License-Identifier: Apache-2.0
//! Filesystem-backed counter store: one JSON file per comment.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use reactions_proto::{CommentId, ReactionAction};

use crate::counter::{next_count, CounterStore};
use crate::StoreError;

/// Store counts as JSON files under a base directory, `comment_<id>.json`
/// each holding an alias → count map.
///
/// A process-wide mutex serializes `apply`, so the file read-modify-write is
/// atomic within the process. Cross-process writers are out of scope; a
/// deployment with more than one server process needs a shared backend
/// behind the same [`CounterStore`] port.
pub struct FsCounterStore {
    base: PathBuf,
    write_lock: Mutex<()>,
}

impl FsCounterStore {
    /// Create a store rooted at `base`, creating the directory if needed.
    pub fn new(base: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let base = base.into();
        fs::create_dir_all(&base)?;
        Ok(Self {
            base,
            write_lock: Mutex::new(()),
        })
    }

    fn path_for(&self, comment_id: CommentId) -> PathBuf {
        self.base.join(format!("comment_{comment_id}.json"))
    }

    fn read_map(path: &Path) -> Result<BTreeMap<String, u64>, StoreError> {
        match fs::read(path) {
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(err) => Err(StoreError::Io(err)),
        }
    }

    fn write_map(path: &Path, map: &BTreeMap<String, u64>) -> Result<(), StoreError> {
        if map.is_empty() {
            match fs::remove_file(path) {
                Ok(()) => Ok(()),
                Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
                Err(err) => Err(StoreError::Io(err)),
            }
        } else {
            let data = serde_json::to_vec_pretty(map)?;
            fs::write(path, data)?;
            Ok(())
        }
    }
}

impl CounterStore for FsCounterStore {
    fn get(&self, comment_id: CommentId, alias: &str) -> Result<u64, StoreError> {
        let map = Self::read_map(&self.path_for(comment_id))?;
        Ok(map.get(alias).copied().unwrap_or(0))
    }

    fn apply(
        &self,
        comment_id: CommentId,
        alias: &str,
        action: ReactionAction,
    ) -> Result<u64, StoreError> {
        let _guard = self.write_lock.lock().map_err(|_| StoreError::Poisoned)?;
        let path = self.path_for(comment_id);
        let mut map = Self::read_map(&path)?;
        let current = map.get(alias).copied().unwrap_or(0);
        let new_count = match next_count(current, action) {
            Some(n) => {
                map.insert(alias.to_string(), n);
                n
            }
            None => {
                map.remove(alias);
                0
            }
        };
        Self::write_map(&path, &map)?;
        Ok(new_count)
    }

    fn all_for_comment(&self, comment_id: CommentId) -> Result<BTreeMap<String, u64>, StoreError> {
        Self::read_map(&self.path_for(comment_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn apply_persists_across_store_instances() {
        let dir = tempfile::tempdir().unwrap();
        {
            let store = FsCounterStore::new(dir.path()).unwrap();
            store.apply(7, "thumbsup", ReactionAction::React).unwrap();
            store.apply(7, "thumbsup", ReactionAction::React).unwrap();
        }
        let store = FsCounterStore::new(dir.path()).unwrap();
        assert_eq!(store.get(7, "thumbsup").unwrap(), 2);
    }

    #[test]
    fn file_is_removed_when_last_alias_hits_zero() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsCounterStore::new(dir.path()).unwrap();

        store.apply(5, "joy", ReactionAction::React).unwrap();
        let path = dir.path().join("comment_5.json");
        assert!(path.exists());

        assert_eq!(store.apply(5, "joy", ReactionAction::Revert).unwrap(), 0);
        assert!(!path.exists());
        assert_eq!(store.get(5, "joy").unwrap(), 0);
    }

    #[test]
    fn corrupt_file_surfaces_as_serde_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsCounterStore::new(dir.path()).unwrap();
        fs::write(dir.path().join("comment_3.json"), b"not json").unwrap();

        assert!(matches!(
            store.get(3, "thumbsup"),
            Err(StoreError::Serde(_))
        ));
    }

    #[test]
    fn revert_at_zero_leaves_no_file_behind() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsCounterStore::new(dir.path()).unwrap();
        assert_eq!(store.apply(8, "wave", ReactionAction::Revert).unwrap(), 0);
        assert!(!dir.path().join("comment_8.json").exists());
    }
}
