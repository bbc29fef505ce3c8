//! Trace Activity Recorder Library
//!
//! Turns a live accelerometer stream into a labeled training dataset for
//! activity recognition.
//!
//! # Pipeline
//!
//! Each reading is reduced to its magnitude and pushed into a sliding
//! window. Every time the window is full, four features (min, max, mean,
//! population standard deviation) are computed, tagged with the activity the
//! user said they are doing, appended to an in-memory [`Dataset`] and merged
//! into a persistent [`DatasetStore`]. The window then slides forward by the
//! configured overlap.
//!
//! # Principles
//!
//! - **Nothing completed is ever lost**: storage failures leave records in
//!   memory and the next persist retries them.
//! - **Fail-loud contracts**: a window of the wrong length is a logic error,
//!   never silently padded or truncated.
//! - **Serialized delivery**: the session handles one sample at a time,
//!   including its persist.
//!
//! # Example
//!
//! ```
//! use trace_activity::{ActivityLabel, ActivitySession, ManualSource, MemoryStore, WindowConfig};
//!
//! let config = WindowConfig::new(4, 2).unwrap();
//! let mut session = ActivitySession::new(config, MemoryStore::new(), ManualSource::new()).unwrap();
//!
//! session.start(ActivityLabel::Walking);
//! for v in 1..=6 {
//!     session.on_sample(0.0, 0.0, v as f32).unwrap();
//! }
//! session.stop().unwrap();
//!
//! assert_eq!(session.dataset().len(), 2);
//! ```

pub mod arff;
pub mod config;
pub mod dataset;
pub mod error;
pub mod jsonl;
pub mod session;
pub mod signal;
pub mod source;
pub mod statistics;
pub mod store;
pub mod types;
pub mod window;


// Re-export commonly used types
pub use arff::ArffStore;
pub use config::{Config, StoreFormat};
pub use dataset::Dataset;
pub use error::{ConfigError, PreconditionViolation, SessionError, StoreError, WindowingError};
pub use jsonl::JsonlStore;
pub use session::{ActivitySession, RunSummary, SampleOutcome, SessionEvent, SessionState};
pub use source::{ManualSource, SensorSource, SyntheticSource, Waveform};
pub use store::{DatasetPersister, DatasetStore, MemoryStore};
pub use types::{ActivityLabel, LabeledRecord, MotionSample, WindowFeatures};
pub use window::{SlidingWindowBuffer, WindowConfig};
