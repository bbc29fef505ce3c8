//! JSON Lines dataset store - one record object per line.

use std::path::{Path, PathBuf};

use crate::dataset::Dataset;
use crate::error::StoreError;
use crate::store::{ensure_writable_dir, read_existing, write_atomically, DatasetStore};
use crate::types::LabeledRecord;

/// File-backed JSONL store.
///
/// Each line is `{"min":..,"max":..,"mean":..,"stdDev":..,"activity":".."}`.
#[derive(Debug, Clone)]
pub struct JsonlStore {
    path: PathBuf,
}

impl JsonlStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl DatasetStore for JsonlStore {
    fn load(&self) -> Result<Dataset, StoreError> {
        let text = read_existing(&self.path)?;
        let mut dataset = Dataset::new();
        for (idx, line) in text.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let record: LabeledRecord = serde_json::from_str(line)
                .map_err(|e| StoreError::format(idx + 1, e.to_string()))?;
            dataset.push(record);
        }
        log::debug!("Loaded {} records from {}", dataset.len(), self.path.display());
        Ok(dataset)
    }

    fn save(&mut self, dataset: &Dataset) -> Result<(), StoreError> {
        ensure_writable_dir(&self.path)?;
        write_atomically(&self.path, |w| {
            for record in dataset {
                let json = serde_json::to_string(record)?;
                writeln!(w, "{}", json)?;
            }
            Ok(())
        })
    }

    fn check_available(&self) -> Result<(), StoreError> {
        ensure_writable_dir(&self.path)
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}
