//! Sliding window buffer with fixed-size windows and overlap discard.
//!
//! Samples are appended at the tail. When the buffer holds exactly
//! `window_size` samples a window is ready; after it is consumed the oldest
//! `overlap_size` samples are dropped, so consecutive windows share
//! `window_size - overlap_size` samples.
//!
//! Readiness is an exact-length check, never `>=`. If the buffer ever grows
//! past `window_size` without being drained, no window is produced until it
//! is brought back to an exact match.

use std::collections::VecDeque;

use crate::error::{ConfigError, PreconditionViolation};

/// Default window length in samples.
pub const DEFAULT_WINDOW_SIZE: usize = 128;

/// Default number of samples discarded after each window.
pub const DEFAULT_OVERLAP_SIZE: usize = 64;

/// Window geometry.
///
/// The defaults (128 / 64) give 50% overlap between consecutive windows.
/// An overlap equal to the window size produces disjoint windows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowConfig {
    /// Samples per window.
    pub window_size: usize,

    /// Samples discarded from the front after each window.
    pub overlap_size: usize,
}

impl WindowConfig {
    /// Validated constructor. Requires `window_size > 0` and
    /// `0 < overlap_size <= window_size`.
    pub fn new(window_size: usize, overlap_size: usize) -> Result<Self, ConfigError> {
        let config = Self {
            window_size,
            overlap_size,
        };
        config.validate()?;
        Ok(config)
    }

    /// Check the geometry lets the pipeline make progress.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.window_size == 0 {
            return Err(ConfigError::ZeroWindow);
        }
        if self.overlap_size == 0 || self.overlap_size > self.window_size {
            return Err(ConfigError::InvalidOverlap {
                window: self.window_size,
                overlap: self.overlap_size,
            });
        }
        Ok(())
    }

    /// Samples shared between two consecutive windows.
    pub fn shared_samples(&self) -> usize {
        self.window_size - self.overlap_size
    }
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            window_size: DEFAULT_WINDOW_SIZE,
            overlap_size: DEFAULT_OVERLAP_SIZE,
        }
    }
}

/// Ordered FIFO of reduced samples awaiting windowing.
#[derive(Debug, Clone)]
pub struct SlidingWindowBuffer {
    samples: VecDeque<f64>,
    config: WindowConfig,
}

impl SlidingWindowBuffer {
    /// Create an empty buffer for the given geometry.
    pub fn new(config: WindowConfig) -> Self {
        Self {
            samples: VecDeque::with_capacity(config.window_size),
            config,
        }
    }

    /// Add a sample at the tail. The buffer never drops samples on its own.
    pub fn append(&mut self, sample: f64) {
        self.samples.push_back(sample);
    }

    /// True iff the buffer holds exactly one window of samples.
    pub fn is_window_ready(&self) -> bool {
        self.samples.len() == self.config.window_size
    }

    /// Copy of the first `window_size` samples, oldest first.
    ///
    /// Does not mutate the buffer.
    pub fn snapshot_window(&self) -> Result<Vec<f64>, PreconditionViolation> {
        if self.samples.len() < self.config.window_size {
            return Err(PreconditionViolation::WindowLength {
                expected: self.config.window_size,
                actual: self.samples.len(),
            });
        }
        Ok(self
            .samples
            .iter()
            .take(self.config.window_size)
            .copied()
            .collect())
    }

    /// Remove the oldest `overlap_size` samples.
    pub fn discard_overlap(&mut self) -> Result<(), PreconditionViolation> {
        let overlap = self.config.overlap_size;
        if self.samples.len() < overlap {
            return Err(PreconditionViolation::OverlapDiscard {
                overlap,
                buffered: self.samples.len(),
            });
        }
        self.samples.drain(..overlap);
        Ok(())
    }

    /// Drop every buffered sample.
    pub fn clear(&mut self) {
        self.samples.clear();
    }

    /// Number of buffered samples.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// True when nothing is buffered.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Geometry this buffer windows with.
    pub fn config(&self) -> WindowConfig {
        self.config
    }
}
