//! Core data types for the activity dataset engine.
//!
//! This module defines the values that flow through the recording pipeline:
//! raw accelerometer readings in, labeled feature records out.
//!
//! Design principle: Types should make intent obvious. If a concept exists,
//! it gets a type. Activity labels are a closed enum, never free strings.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A single raw accelerometer reading.
///
/// This is the minimal input contract: three axes and a monotonic
/// timestamp. The engine only ever looks at the magnitude.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MotionSample {
    /// Monotonic timestamp in milliseconds.
    pub timestamp_ms: u64,

    /// Accelerometer reading [x, y, z] in m/s².
    pub accel: [f32; 3],
}

impl MotionSample {
    /// Creates a new sample.
    pub fn new(timestamp_ms: u64, accel: [f32; 3]) -> Self {
        Self {
            timestamp_ms,
            accel,
        }
    }

    /// Euclidean norm of the acceleration vector in m/s².
    pub fn magnitude(&self) -> f64 {
        crate::signal::reduce(self.accel[0], self.accel[1], self.accel[2])
    }
}

/// Activity being performed while a window was recorded.
///
/// The set is closed: every persisted dataset declares all of these up
/// front, so adding a variant is a schema change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivityLabel {
    Walking,
    Running,
    Stationary,
    Stairs,
}

impl ActivityLabel {
    /// Persisted name of the label.
    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityLabel::Walking => "walking",
            ActivityLabel::Running => "running",
            ActivityLabel::Stationary => "stationary",
            ActivityLabel::Stairs => "stairs",
        }
    }

    /// Every label, in declaration order.
    pub fn all() -> [ActivityLabel; 4] {
        [
            ActivityLabel::Walking,
            ActivityLabel::Running,
            ActivityLabel::Stationary,
            ActivityLabel::Stairs,
        ]
    }
}

impl fmt::Display for ActivityLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a string names no known activity.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown activity label '{0}'")]
pub struct UnknownLabel(pub String);

impl FromStr for ActivityLabel {
    type Err = UnknownLabel;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ActivityLabel::all()
            .into_iter()
            .find(|label| label.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| UnknownLabel(s.to_string()))
    }
}

/// Summary statistics of one window of magnitudes.
///
/// All four values derive from a single window and nothing else.
/// `min <= mean <= max` always holds; `std_dev` is the population form.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WindowFeatures {
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    #[serde(rename = "stdDev")]
    pub std_dev: f64,
}

impl WindowFeatures {
    /// Spread between the extremes.
    pub fn range(&self) -> f64 {
        self.max - self.min
    }
}

/// One completed window tagged with the activity active when it closed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LabeledRecord {
    #[serde(flatten)]
    pub features: WindowFeatures,
    pub activity: ActivityLabel,
}

impl LabeledRecord {
    pub fn new(features: WindowFeatures, activity: ActivityLabel) -> Self {
        Self { features, activity }
    }
}
