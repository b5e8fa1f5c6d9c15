//! Approximate comparisons for viewport boundary checks.
//!
//! After a few chained scale/translate operations an edge that should sit
//! exactly on the image border is usually off by a few ulps. `less` and
//! `greater` therefore use a tolerance relative to the magnitude of the
//! operands, while `equal` only absorbs an absolute epsilon.

const EPSILON: f64 = 0.000_001;
const TOLERANCE: f64 = 0.01;

fn delta(a: f64, b: f64) -> f64 {
    a.abs().max(b.abs()).max(EPSILON) * TOLERANCE
}

pub fn less(a: f64, b: f64) -> bool {
    a < b - delta(a, b)
}

pub fn greater(a: f64, b: f64) -> bool {
    a > b + delta(a, b)
}

/// Absolute comparison; deliberately stricter than `less`/`greater`.
pub fn equal(a: f64, b: f64) -> bool {
    (a - b).abs() < EPSILON
}

pub fn less_equal(a: f64, b: f64) -> bool {
    !greater(a, b)
}

pub fn greater_equal(a: f64, b: f64) -> bool {
    !less(a, b)
}
