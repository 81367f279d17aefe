//! Tolerance constants for engine tests.

/// Accumulated tick arithmetic (sums of 0.1-beat steps).
pub const BEAT_EPSILON: f64 = 1e-9;

/// Blended and clamped tempi.
pub const TEMPO_EPSILON: f64 = 1e-6;

/// Normalized hypothesis probabilities.
pub const PROBABILITY_EPSILON: f64 = 1e-9;
