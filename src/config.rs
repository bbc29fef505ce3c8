//! Runtime configuration for the recorder binary.
//!
//! Everything comes from environment variables, with an optional `.env`
//! file loaded first.

use std::env;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use crate::arff::ArffStore;
use crate::error::ConfigError;
use crate::jsonl::JsonlStore;
use crate::store::DatasetStore;
use crate::window::{WindowConfig, DEFAULT_OVERLAP_SIZE, DEFAULT_WINDOW_SIZE};

pub const DEFAULT_DATASET_PATH: &str = "data.arff";
pub const DEFAULT_SAMPLE_INTERVAL_MS: u64 = 16;

/// On-disk dataset format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreFormat {
    Arff,
    Jsonl,
}

impl StoreFormat {
    /// Guess from a file extension. Anything not `.jsonl`/`.ndjson` is ARFF.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("jsonl") || ext.eq_ignore_ascii_case("ndjson") => {
                StoreFormat::Jsonl
            }
            _ => StoreFormat::Arff,
        }
    }
}

impl FromStr for StoreFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "arff" => Ok(StoreFormat::Arff),
            "jsonl" | "ndjson" => Ok(StoreFormat::Jsonl),
            other => Err(ConfigError::UnknownStoreFormat(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// File the dataset is merged into.
    pub dataset_path: PathBuf,
    pub store_format: StoreFormat,
    pub window: WindowConfig,
    /// Cadence of the synthetic sensor.
    pub sample_interval: Duration,
    /// Default log filter when `RUST_LOG` is unset.
    pub rust_log: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            dataset_path: PathBuf::from(DEFAULT_DATASET_PATH),
            store_format: StoreFormat::Arff,
            window: WindowConfig::default(),
            sample_interval: Duration::from_millis(DEFAULT_SAMPLE_INTERVAL_MS),
            rust_log: "info".to_string(),
        }
    }
}

impl Config {
    /// Load `.env` (if present) and read the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Build from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let dataset_path = lookup("TRACE_DATASET_PATH")
            .filter(|p| !p.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DATASET_PATH));

        let store_format = match lookup("TRACE_STORE_FORMAT") {
            Some(raw) => raw.parse::<StoreFormat>()?,
            None => StoreFormat::from_path(&dataset_path),
        };

        let window_size = parse_var(&lookup, "TRACE_WINDOW_SIZE", DEFAULT_WINDOW_SIZE)?;
        let overlap_size = parse_var(&lookup, "TRACE_OVERLAP_SIZE", DEFAULT_OVERLAP_SIZE)?;
        let window = WindowConfig::new(window_size, overlap_size)?;

        let interval_ms = parse_var(&lookup, "TRACE_SAMPLE_INTERVAL_MS", DEFAULT_SAMPLE_INTERVAL_MS)?;
        if interval_ms == 0 {
            return Err(ConfigError::InvalidValue {
                var: "TRACE_SAMPLE_INTERVAL_MS".to_string(),
                message: "must be at least 1".to_string(),
            });
        }

        let rust_log = lookup("RUST_LOG").unwrap_or_else(|| "info".to_string());

        Ok(Self {
            dataset_path,
            store_format,
            window,
            sample_interval: Duration::from_millis(interval_ms),
            rust_log,
        })
    }

    /// Open the configured file store.
    pub fn open_store(&self) -> Box<dyn DatasetStore + Send> {
        match self.store_format {
            StoreFormat::Arff => Box::new(ArffStore::new(&self.dataset_path)),
            StoreFormat::Jsonl => Box::new(JsonlStore::new(&self.dataset_path)),
        }
    }
}

fn parse_var<F, T>(lookup: &F, var: &str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(var) {
        None => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::InvalidValue {
            var: var.to_string(),
            message: format!("'{}': {}", raw, e),
        }),
    }
}
