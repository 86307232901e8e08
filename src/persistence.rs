//! Record stores.
//!
//! A store loads and saves whole record sets, one per entity kind. There is
//! no append or partial write: every save replaces the full set.

use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
};

use crate::{error::StoreError, model::EntityKind, record::RecordSet};

/// Loads and saves record sets by entity kind
pub trait RecordStore {
    /// Load the full record set for `kind`
    ///
    /// # Errors
    ///
    /// Returns a `StoreError` if the set does not exist or cannot be read.
    fn load(&self, kind: EntityKind) -> Result<RecordSet, StoreError>;

    /// Replace every given record set as one unit
    ///
    /// # Errors
    ///
    /// Returns a `StoreError` if any set cannot be written. Implementations
    /// leave previously stored sets untouched when that happens, except where
    /// they document otherwise.
    fn save_all(&mut self, sets: Vec<(EntityKind, RecordSet)>) -> Result<(), StoreError>;
}

/// A directory holding one CSV file per entity kind
#[derive(Debug, Clone)]
pub struct CsvDirStore {
    /// Data directory
    root: PathBuf,
}

impl CsvDirStore {
    /// Use the files under `root`
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Data directory
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// File backing `kind`
    #[must_use]
    pub fn path_for(&self, kind: EntityKind) -> PathBuf {
        self.root.join(kind.file_name())
    }

    /// Create the directory and a header-only file for every missing kind
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Io` if the directory or a file cannot be created.
    pub fn init_missing(&self) -> Result<(), StoreError> {
        fs::create_dir_all(&self.root)
            .map_err(|source| StoreError::Io { path: self.root.clone(), source })?;
        for kind in EntityKind::ALL {
            let path = self.path_for(kind);
            if !path.exists() {
                tracing::debug!(%kind, path = %path.display(), "creating empty record file");
                write_file(&path, &RecordSet::new(kind.columns()).to_csv())?;
            }
        }
        Ok(())
    }
}

/// Write text to a file, mapping failures to `StoreError::Io`
fn write_file(path: &Path, text: &str) -> Result<(), StoreError> {
    fs::write(path, text).map_err(|source| StoreError::Io { path: path.to_path_buf(), source })
}

impl RecordStore for CsvDirStore {
    fn load(&self, kind: EntityKind) -> Result<RecordSet, StoreError> {
        let path = self.path_for(kind);
        if !path.exists() {
            return Err(StoreError::Missing { kind, path });
        }
        let text = fs::read_to_string(&path)
            .map_err(|source| StoreError::Io { path: path.clone(), source })?;
        let set = RecordSet::from_csv(&text)?;
        tracing::debug!(%kind, rows = set.len(), "loaded record set");
        Ok(set)
    }

    /// Every set is first written beside its file, then renamed over it
    ///
    /// A failed write leaves every file as it was. A failed rename removes the
    /// staged files that remain, but kinds renamed before it stay replaced.
    fn save_all(&mut self, sets: Vec<(EntityKind, RecordSet)>) -> Result<(), StoreError> {
        let mut staged = Vec::with_capacity(sets.len());
        for (kind, set) in &sets {
            let path = self.path_for(*kind);
            let tmp = path.with_extension("csv.tmp");
            if let Err(error) = write_file(&tmp, &set.to_csv()) {
                for (written, _) in &staged {
                    drop(fs::remove_file(written));
                }
                return Err(error);
            }
            staged.push((tmp, path));
        }

        for (done, (tmp, path)) in staged.iter().enumerate() {
            if let Err(source) = fs::rename(tmp, path) {
                for (left, _) in staged.iter().skip(done) {
                    drop(fs::remove_file(left));
                }
                tracing::warn!(path = %path.display(), renamed = done, "save interrupted");
                return Err(StoreError::Io { path: path.clone(), source });
            }
        }
        for (kind, set) in &sets {
            tracing::debug!(%kind, rows = set.len(), "saved record set");
        }
        Ok(())
    }
}

/// Record sets held in memory
///
/// Starts with an empty, canonically headed set for every kind. A snapshot of
/// another store serves as the working set for a batch of operations, which is
/// then written back in one go with [`MemoryStore::flush_into`].
#[derive(Debug, Clone)]
pub struct MemoryStore {
    /// Current set per kind
    sets: HashMap<EntityKind, RecordSet>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        let sets = EntityKind::ALL.into_iter().map(|kind| (kind, RecordSet::new(kind.columns())));
        Self { sets: sets.collect() }
    }
}

impl MemoryStore {
    /// A store with an empty set for every kind
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the set for `kind`
    pub fn insert(&mut self, kind: EntityKind, set: RecordSet) {
        self.sets.insert(kind, set);
    }

    /// Replace the set for `kind` with parsed CSV text
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Csv` if the text is not well-formed CSV.
    pub fn with_csv(mut self, kind: EntityKind, text: &str) -> Result<Self, StoreError> {
        self.insert(kind, RecordSet::from_csv(text)?);
        Ok(self)
    }

    /// Current set for `kind`
    #[must_use]
    pub fn get(&self, kind: EntityKind) -> Option<&RecordSet> {
        self.sets.get(&kind)
    }

    /// Copy every kind out of another store
    ///
    /// # Errors
    ///
    /// Returns the first load error from `source`.
    pub fn snapshot(source: &impl RecordStore) -> Result<Self, StoreError> {
        let mut sets = HashMap::new();
        for kind in EntityKind::ALL {
            sets.insert(kind, source.load(kind)?);
        }
        Ok(Self { sets })
    }

    /// Write every kind back into another store as one save
    ///
    /// # Errors
    ///
    /// Returns the error from `target.save_all`.
    pub fn flush_into(&self, target: &mut impl RecordStore) -> Result<(), StoreError> {
        let sets = EntityKind::ALL
            .into_iter()
            .filter_map(|kind| self.sets.get(&kind).map(|set| (kind, set.clone())))
            .collect();
        target.save_all(sets)
    }
}

impl RecordStore for MemoryStore {
    fn load(&self, kind: EntityKind) -> Result<RecordSet, StoreError> {
        self.sets.get(&kind).cloned().ok_or(StoreError::Absent(kind))
    }

    fn save_all(&mut self, sets: Vec<(EntityKind, RecordSet)>) -> Result<(), StoreError> {
        self.sets.extend(sets);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_store_is_seeded() {
        let store = MemoryStore::new();
        for kind in EntityKind::ALL {
            let set = store.load(kind).unwrap_or_default();
            assert!(set.is_empty());
            assert_eq!(set.columns, kind.columns());
        }
    }

    #[test]
    fn test_snapshot_and_flush() {
        let source = MemoryStore::new()
            .with_csv(EntityKind::Rooms, "room_id,capacity\nR101,50\n")
            .unwrap_or_default();
        let mut batch = MemoryStore::snapshot(&source).unwrap_or_default();
        assert_eq!(batch.get(EntityKind::Rooms).map(RecordSet::len), Some(1));

        batch.insert(EntityKind::Rooms, RecordSet::new(&["room_id"]));
        let mut target = MemoryStore::new();
        assert!(batch.flush_into(&mut target).is_ok());
        assert_eq!(
            target.get(EntityKind::Rooms).map(|s| s.columns.clone()),
            Some(vec!["room_id".to_string()])
        );
        assert_eq!(source.get(EntityKind::Rooms).map(RecordSet::len), Some(1));
    }

    #[test]
    #[allow(clippy::expect_used)]
    fn test_failed_rename_leaves_no_staged_files() {
        let dir = tempfile::TempDir::new().expect("temp dir");
        let store_root = dir.path();
        let mut store = CsvDirStore::new(store_root);
        assert!(store.init_missing().is_ok());

        // a non-empty directory where the fines file belongs cannot be replaced
        let fines = store.path_for(EntityKind::Fines);
        assert!(fs::remove_file(&fines).is_ok());
        assert!(fs::create_dir(&fines).is_ok());
        assert!(fs::write(fines.join("keep"), "").is_ok());

        let sets = [EntityKind::Members, EntityKind::Fines, EntityKind::Events]
            .into_iter()
            .map(|kind| (kind, RecordSet::new(kind.columns())))
            .collect();
        let result = store.save_all(sets);
        assert!(matches!(result, Err(StoreError::Io { ref path, .. }) if *path == fines));

        let leftovers = fs::read_dir(store_root)
            .map(|entries| {
                entries
                    .filter_map(Result::ok)
                    .filter(|entry| entry.file_name().to_string_lossy().ends_with(".tmp"))
                    .count()
            })
            .unwrap_or_default();
        assert_eq!(leftovers, 0);
        assert!(store.path_for(EntityKind::Events).is_file());
    }

    #[test]
    fn test_csv_dir_missing_file() {
        let store = CsvDirStore::new("/nonexistent/library-data");
        assert!(matches!(
            store.load(EntityKind::Members),
            Err(StoreError::Missing { kind: EntityKind::Members, .. })
        ));
    }
}
