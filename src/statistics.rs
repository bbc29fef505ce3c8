//! Per-window summary statistics.
//!
//! Computes {min, max, mean, population standard deviation} over exactly one
//! window of reduced samples.
//!
//! Design: two passes over the window, no incremental state.
//! - Pass 1 finds the extremes and the mean, accumulated as offsets from the
//!   minimum so they stay small when every sample sits near 9.81 m/s². The
//!   result can differ from `sum / n` in the last bit.
//! - A constant window (`min == max`, infinities included) short-circuits to
//!   `mean == value` and `std_dev == 0.0` exactly.
//! - Pass 2 sums squared deviations from that mean and divides by the window
//!   length (population variance, not sample variance).

use crate::error::{PreconditionViolation, WindowingError};
use crate::types::WindowFeatures;
use crate::window::WindowConfig;

/// Compute the features of a window that must hold exactly `window_size`
/// samples. A window of any other length is a contract violation; it is
/// never truncated or padded.
pub fn compute(window: &[f64], window_size: usize) -> Result<WindowFeatures, PreconditionViolation> {
    if window.len() != window_size || window.is_empty() {
        return Err(PreconditionViolation::WindowLength {
            expected: window_size,
            actual: window.len(),
        });
    }

    let n = window.len() as f64;

    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    for &x in window {
        if x < min {
            min = x;
        }
        if x > max {
            max = x;
        }
    }

    if min == max {
        return Ok(WindowFeatures {
            min,
            max,
            mean: min,
            std_dev: 0.0,
        });
    }

    let offset_sum: f64 = window.iter().map(|&x| x - min).sum();
    // Rounding in the offset sum may push the mean a hair past max.
    let mut mean = min + offset_sum / n;
    if mean > max {
        mean = max;
    }

    let squared_deviation_sum: f64 = window
        .iter()
        .map(|&x| {
            let d = x - mean;
            d * d
        })
        .sum();
    let std_dev = (squared_deviation_sum / n).sqrt();

    Ok(WindowFeatures {
        min,
        max,
        mean,
        std_dev,
    })
}

/// Batch form: every complete window of a recorded stream.
///
/// Windows start at 0 and advance by `overlap_size` while a full window
/// still fits. Produces the same features, in the same order, as streaming
/// the samples through a [`crate::window::SlidingWindowBuffer`].
///
/// A geometry that [`WindowConfig::validate`] rejects is an error, not an
/// empty result.
pub fn extract_windows(samples: &[f64], config: WindowConfig) -> Result<Vec<WindowFeatures>, WindowingError> {
    config.validate()?;

    let mut features = Vec::new();
    let mut start = 0;
    while start + config.window_size <= samples.len() {
        let window = &samples[start..start + config.window_size];
        features.push(compute(window, config.window_size)?);
        start += config.overlap_size;
    }
    Ok(features)
}
