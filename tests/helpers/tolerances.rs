//! Tolerance constants for analysis testing.

/// Floating point rounding errors.
pub const FLOAT_EPSILON: f32 = 1e-6;

/// Accumulated float math (sums over a block, EMA chains).
pub const DSP_EPSILON: f32 = 1e-4;

/// Loudness values, in LU.
pub const LUFS_EPSILON: f32 = 0.05;

/// Correlation of sampled sinusoids over a finite block.
pub const CORRELATION_EPSILON: f32 = 0.01;

/// The loudness floor used for silence.
pub const LUFS_FLOOR: f32 = -70.0;
