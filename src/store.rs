//! Persistence boundary and merge-on-persist.
//!
//! A [`DatasetStore`] is an opaque labeled-table store with `load` and
//! `save`. The format lives behind it ([`crate::arff::ArffStore`],
//! [`crate::jsonl::JsonlStore`], [`MemoryStore`]); the session only ever
//! talks to a [`DatasetPersister`].
//!
//! Merge policy: the persister remembers how many in-memory records have
//! already been merged. Each persist reloads the store, appends only the
//! records not yet merged, and saves the concatenation (loaded first). The
//! cursor advances only after a successful save, so a failed persist is
//! retried in full by the next one and nothing is appended twice.

use std::cell::Cell;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

use crate::dataset::Dataset;
use crate::error::StoreError;

/// Opaque labeled-table store.
pub trait DatasetStore {
    /// Read the whole persisted dataset.
    ///
    /// Returns [`StoreError::NotFound`] when nothing was ever saved.
    fn load(&self) -> Result<Dataset, StoreError>;

    /// Replace the persisted dataset. Must be atomic with respect to process
    /// termination: readers see either the old or the new table.
    fn save(&mut self, dataset: &Dataset) -> Result<(), StoreError>;

    /// Fail with [`StoreError::StorageUnavailable`] when the backing medium
    /// cannot currently be written.
    fn check_available(&self) -> Result<(), StoreError> {
        Ok(())
    }

    /// Human-readable location, for logging.
    fn describe(&self) -> String;
}

impl<S: DatasetStore + ?Sized> DatasetStore for Box<S> {
    fn load(&self) -> Result<Dataset, StoreError> {
        (**self).load()
    }

    fn save(&mut self, dataset: &Dataset) -> Result<(), StoreError> {
        (**self).save(dataset)
    }

    fn check_available(&self) -> Result<(), StoreError> {
        (**self).check_available()
    }

    fn describe(&self) -> String {
        (**self).describe()
    }
}

/// Merges newly completed records into a [`DatasetStore`].
#[derive(Debug)]
pub struct DatasetPersister<S> {
    store: S,
    /// Number of in-memory records already merged into the store.
    persisted: usize,
}

impl<S: DatasetStore> DatasetPersister<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            persisted: 0,
        }
    }

    /// Merge the records of `dataset` not yet persisted into the store.
    ///
    /// Returns how many records were appended. With nothing pending this
    /// touches neither the store nor the disk.
    pub fn persist(&mut self, dataset: &Dataset) -> Result<usize, StoreError> {
        let pending = dataset.records_since(self.persisted);
        if pending.is_empty() {
            return Ok(0);
        }

        self.store.check_available()?;

        let mut merged = match self.store.load() {
            Ok(existing) => existing,
            Err(StoreError::NotFound { path }) => {
                log::info!("No existing dataset at {}, starting a new one", path.display());
                Dataset::new()
            }
            Err(e) => return Err(e),
        };
        let loaded = merged.len();
        merged.extend_from_slice(pending);

        self.store.save(&merged)?;
        self.persisted = dataset.len();

        log::debug!(
            "Persisted {} new records to {} ({} loaded, {} total)",
            pending.len(),
            self.store.describe(),
            loaded,
            merged.len()
        );
        Ok(pending.len())
    }

    /// Records of `dataset` still waiting to be merged.
    pub fn pending(&self, dataset: &Dataset) -> usize {
        dataset.records_since(self.persisted).len()
    }

    /// Records merged so far.
    pub fn persisted(&self) -> usize {
        self.persisted
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }
}

/// In-process store.
///
/// Keeps the "saved" table in memory. Can be switched unavailable to mimic
/// an unmounted medium.
#[derive(Debug)]
pub struct MemoryStore {
    saved: Option<Dataset>,
    available: bool,
    loads: Cell<usize>,
    saves: usize,
}

impl MemoryStore {
    /// Empty, available store with nothing saved.
    pub fn new() -> Self {
        Self {
            saved: None,
            available: true,
            loads: Cell::new(0),
            saves: 0,
        }
    }

    /// Store that already holds `dataset`, as if saved by an earlier run.
    pub fn with_dataset(dataset: Dataset) -> Self {
        Self {
            saved: Some(dataset),
            ..Self::new()
        }
    }

    pub fn set_available(&mut self, available: bool) {
        self.available = available;
    }

    /// The last saved table, if any.
    pub fn saved(&self) -> Option<&Dataset> {
        self.saved.as_ref()
    }

    pub fn load_count(&self) -> usize {
        self.loads.get()
    }

    pub fn save_count(&self) -> usize {
        self.saves
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl DatasetStore for MemoryStore {
    fn load(&self) -> Result<Dataset, StoreError> {
        self.loads.set(self.loads.get() + 1);
        self.saved.clone().ok_or_else(|| StoreError::NotFound {
            path: PathBuf::from("<memory>"),
        })
    }

    fn save(&mut self, dataset: &Dataset) -> Result<(), StoreError> {
        self.check_available()?;
        self.saved = Some(dataset.clone());
        self.saves += 1;
        Ok(())
    }

    fn check_available(&self) -> Result<(), StoreError> {
        if self.available {
            Ok(())
        } else {
            Err(StoreError::StorageUnavailable {
                reason: "memory store switched off".to_string(),
            })
        }
    }

    fn describe(&self) -> String {
        "<memory>".to_string()
    }
}

// ============================================================================
// FILE HELPERS (shared by the file-backed stores)
// ============================================================================

/// Directory a dataset file lives in.
pub(crate) fn parent_dir(path: &Path) -> &Path {
    match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    }
}

/// The directory holding `path` must exist and be writable.
pub(crate) fn ensure_writable_dir(path: &Path) -> Result<(), StoreError> {
    let dir = parent_dir(path);
    let meta = fs::metadata(dir).map_err(|e| StoreError::StorageUnavailable {
        reason: format!("{}: {}", dir.display(), e),
    })?;

    if !meta.is_dir() {
        return Err(StoreError::StorageUnavailable {
            reason: format!("{} is not a directory", dir.display()),
        });
    }
    if meta.permissions().readonly() {
        return Err(StoreError::StorageUnavailable {
            reason: format!("{} is read-only", dir.display()),
        });
    }
    Ok(())
}

/// Read a dataset file, mapping a missing file to [`StoreError::NotFound`].
pub(crate) fn read_existing(path: &Path) -> Result<String, StoreError> {
    fs::read_to_string(path).map_err(|e| {
        if e.kind() == io::ErrorKind::NotFound {
            StoreError::NotFound {
                path: path.to_path_buf(),
            }
        } else {
            StoreError::Io(e)
        }
    })
}

/// Write-then-rename: `write` fills a temporary file next to `path`, which
/// is synced and renamed over `path` only once `write` succeeds.
pub(crate) fn write_atomically<F>(path: &Path, write: F) -> Result<(), StoreError>
where
    F: FnOnce(&mut dyn Write) -> Result<(), StoreError>,
{
    let mut tmp = NamedTempFile::new_in(parent_dir(path)).map_err(classify_io)?;
    {
        let mut writer: BufWriter<&mut File> = BufWriter::new(tmp.as_file_mut());
        write(&mut writer)?;
        writer.flush()?;
    }
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| classify_io(e.error))?;
    Ok(())
}

fn classify_io(err: io::Error) -> StoreError {
    if err.kind() == io::ErrorKind::PermissionDenied {
        StoreError::StorageUnavailable {
            reason: err.to_string(),
        }
    } else {
        StoreError::Io(err)
    }
}
