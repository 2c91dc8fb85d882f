use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
    sync::{Mutex, MutexGuard, PoisonError},
};

use tracing::info;

use crate::{
    export::{ExportError, write_csv},
    model::WeatherRecord,
};

/// Latest records keyed by district.
pub type Snapshot = BTreeMap<String, WeatherRecord>;

/// Holds the current snapshot; every refresh swaps in a complete new one.
///
/// Readers always get owned copies, so they see either the snapshot before a
/// `replace` or the one after it, never a mix.
#[derive(Debug, Default)]
pub struct SnapshotStore {
    current: Mutex<Snapshot>,
}

impl SnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    // The guarded map is only ever assigned whole, so a poisoned lock still
    // holds a consistent snapshot.
    fn lock(&self) -> MutexGuard<'_, Snapshot> {
        self.current.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Replace the current snapshot. A repeated district keeps its last record.
    pub fn replace<I>(&self, records: I)
    where
        I: IntoIterator<Item = WeatherRecord>,
    {
        let fresh: Snapshot = records.into_iter().map(|r| (r.district.clone(), r)).collect();
        let count = fresh.len();

        let previous = std::mem::replace(&mut *self.lock(), fresh);
        drop(previous);

        info!(districts = count, "snapshot replaced");
    }

    pub fn get_all(&self) -> Snapshot {
        self.lock().clone()
    }

    /// Exact, case-sensitive lookup.
    pub fn get(&self, district: &str) -> Option<WeatherRecord> {
        self.lock().get(district).cloned()
    }

    pub fn districts(&self) -> Vec<String> {
        self.lock().keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Write the snapshot as CSV to `path`.
    ///
    /// Returns `Ok(None)` and creates nothing when there is no data yet.
    pub fn export(&self, path: &Path) -> Result<Option<PathBuf>, ExportError> {
        let snapshot = self.get_all();
        if snapshot.is_empty() {
            return Ok(None);
        }

        write_csv(&snapshot, path)?;
        info!(path = %path.display(), rows = snapshot.len(), "snapshot exported");
        Ok(Some(path.to_path_buf()))
    }
}
