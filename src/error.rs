//! Error types for the activity dataset engine.
//!
//! Errors are split by concern so callers can tell a recoverable storage
//! hiccup apart from a broken windowing contract:
//!
//! - [`ConfigError`]: invalid window geometry or environment values
//! - [`PreconditionViolation`]: a buffer or window shorter than the contract
//!   requires. Always a logic error.
//! - [`WindowingError`]: batch extraction over a recorded stream
//! - [`StoreError`]: loading or saving the persisted dataset
//! - [`SessionError`]: misuse of the session state machine

use std::path::PathBuf;

use thiserror::Error;

/// Invalid configuration.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Window size must be at least one sample.
    #[error("window size must be greater than zero")]
    ZeroWindow,

    /// Overlap must satisfy `0 < overlap <= window`.
    #[error("overlap size {overlap} must be in 1..={window}")]
    InvalidOverlap {
        /// Configured window size.
        window: usize,
        /// Rejected overlap size.
        overlap: usize,
    },

    /// An environment variable held a value that could not be used.
    #[error("invalid value for {var}: {message}")]
    InvalidValue {
        /// Variable name.
        var: String,
        /// What was wrong with it.
        message: String,
    },

    /// A store format name that is neither ARFF nor JSON Lines.
    #[error("unknown store format '{0}' (expected arff or jsonl)")]
    UnknownStoreFormat(String),
}

/// A windowing contract was broken.
///
/// These never come from bad sensor data; they mean the caller asked for a
/// window or a discard the buffer cannot satisfy.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PreconditionViolation {
    /// A window was requested with the wrong number of samples.
    #[error("window requires exactly {expected} samples, got {actual}")]
    WindowLength {
        /// Required length.
        expected: usize,
        /// Length supplied.
        actual: usize,
    },

    /// Fewer samples are buffered than the overlap discard removes.
    #[error("cannot discard {overlap} samples from a buffer of {buffered}")]
    OverlapDiscard {
        /// Samples the discard would remove.
        overlap: usize,
        /// Samples currently buffered.
        buffered: usize,
    },
}

/// Batch windowing over a recorded stream failed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WindowingError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Precondition(#[from] PreconditionViolation),
}

/// Failure loading or saving the persisted dataset.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Nothing has been persisted at this location yet.
    #[error("dataset not found at {}", path.display())]
    NotFound {
        /// Location that was probed.
        path: PathBuf,
    },

    /// The backing medium is missing or not writable.
    #[error("storage unavailable: {reason}")]
    StorageUnavailable {
        /// Why the medium was rejected.
        reason: String,
    },

    /// Read or write failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The persisted file does not match the dataset schema.
    #[error("malformed dataset at line {line}: {message}")]
    Format {
        /// 1-based line number of the offending input.
        line: usize,
        /// Description of the problem.
        message: String,
    },

    /// JSON encoding or decoding failed.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StoreError {
    /// Shorthand for a [`StoreError::Format`].
    pub fn format(line: usize, message: impl Into<String>) -> Self {
        StoreError::Format {
            line,
            message: message.into(),
        }
    }

    /// True for failures that a later persist attempt may get past.
    pub fn is_transient(&self) -> bool {
        matches!(self, StoreError::StorageUnavailable { .. } | StoreError::Io(_))
    }
}

/// Misuse of the recording session.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// A sample arrived while no activity is being recorded.
    #[error("session is idle; call start() before delivering samples")]
    NotSampling,

    /// The windowing contract broke; the session was aborted.
    #[error("session aborted: {0}")]
    Precondition(#[from] PreconditionViolation),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = ConfigError::InvalidOverlap {
            window: 4,
            overlap: 5,
        };
        assert_eq!(err.to_string(), "overlap size 5 must be in 1..=4");

        let err = PreconditionViolation::OverlapDiscard {
            overlap: 64,
            buffered: 10,
        };
        assert_eq!(err.to_string(), "cannot discard 64 samples from a buffer of 10");
    }

    #[test]
    fn test_transient_classification() {
        let unavailable = StoreError::StorageUnavailable {
            reason: "not mounted".to_string(),
        };
        assert!(unavailable.is_transient());

        let io = StoreError::from(std::io::Error::new(std::io::ErrorKind::Other, "disk"));
        assert!(io.is_transient());

        assert!(!StoreError::format(3, "bad row").is_transient());
    }

    #[test]
    fn test_session_error_wraps_precondition() {
        let err: SessionError = PreconditionViolation::WindowLength {
            expected: 128,
            actual: 3,
        }
        .into();
        assert!(matches!(err, SessionError::Precondition(_)));
    }
}
