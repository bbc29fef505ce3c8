//! Sample reduction.
//!
//! Every reading is collapsed to a single orientation-free scalar before it
//! reaches the window buffer: the Euclidean norm of the acceleration vector.
//!
//! Design note: axes arrive as f32 from the sensor, but squaring and summing
//! happen in f64 so the reduction never loses precision the statistics could
//! use.

/// Euclidean norm `sqrt(x² + y² + z²)` of a three-axis reading.
///
/// Pure and total. Non-finite inputs propagate into the result.
pub fn reduce(x: f32, y: f32, z: f32) -> f64 {
    let x = x as f64;
    let y = y as f64;
    let z = z as f64;
    (x * x + y * y + z * z).sqrt()
}
