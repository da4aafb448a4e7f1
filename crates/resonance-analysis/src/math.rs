//! Shared numeric helpers.
//!
//! Every helper here is total: empty input, zero variance and non-finite
//! values map to a documented sentinel instead of NaN.

/// Loudness floor in LUFS, reported for silence and empty measurements.
pub const LUFS_FLOOR: f32 = -70.0;

/// LUFS = LUFS_OFFSET + 10*log10(mean_power).
pub const LUFS_OFFSET: f64 = -0.691;

/// Floor for true-peak readings in dBFS.
pub const PEAK_FLOOR_DB: f32 = -144.0;

/// Replace NaN/Infinity with `fallback`.
#[inline]
pub fn finite_or(value: f32, fallback: f32) -> f32 {
    if value.is_finite() {
        value
    } else {
        fallback
    }
}

/// Clamp into `[lo, hi]`, mapping non-finite values to `fallback`.
#[inline]
pub fn sanitize(value: f32, lo: f32, hi: f32, fallback: f32) -> f32 {
    finite_or(value, fallback).clamp(lo, hi)
}

/// Convert a dB magnitude to linear. Anything at or below the peak floor is 0.
#[inline]
pub fn db_to_linear(db: f32) -> f32 {
    if db.is_nan() || db <= PEAK_FLOOR_DB {
        return 0.0;
    }
    let linear = 10.0f32.powf(db / 20.0);
    finite_or(linear, 0.0)
}

/// Convert a linear amplitude to dBFS with a floor.
#[inline]
pub fn linear_to_db(linear: f32) -> f32 {
    if linear > 0.0 && linear.is_finite() {
        (20.0 * linear.log10()).max(PEAK_FLOOR_DB)
    } else {
        PEAK_FLOOR_DB
    }
}

/// Loudness of a mean-square power value, floored at [`LUFS_FLOOR`].
#[inline]
pub fn power_to_lufs(mean_power: f64) -> f32 {
    if mean_power <= 0.0 || !mean_power.is_finite() {
        return LUFS_FLOOR;
    }
    let lufs = (LUFS_OFFSET + 10.0 * mean_power.log10()) as f32;
    sanitize(lufs, LUFS_FLOOR, f32::MAX, LUFS_FLOOR)
}

/// Mean power that corresponds to a loudness value (inverse of [`power_to_lufs`]
/// without the offset, as used by the relative gate).
#[inline]
pub fn lufs_to_gate_power(lufs: f64) -> f64 {
    10f64.powf(lufs / 10.0)
}

pub fn mean(values: &[f32]) -> f32 {
    if values.is_empty() {
        return 0.0;
    }
    let sum: f64 = values.iter().map(|&v| v as f64).sum();
    (sum / values.len() as f64) as f32
}

/// Population standard deviation.
pub fn std_dev(values: &[f32]) -> f32 {
    if values.len() < 2 {
        return 0.0;
    }
    let m = mean(values) as f64;
    let variance: f64 = values
        .iter()
        .map(|&v| {
            let d = v as f64 - m;
            d * d
        })
        .sum::<f64>()
        / values.len() as f64;
    finite_or(variance.sqrt() as f32, 0.0)
}

/// Least-squares slope of `values` against positions normalized to `[0, 1]`.
///
/// The result is the fitted change across the whole window, so it does not
/// depend on how many samples the window holds.
pub fn linear_trend(values: &[f32]) -> f32 {
    let n = values.len();
    if n < 2 {
        return 0.0;
    }
    let span = (n - 1) as f64;
    let mut sum_x = 0.0f64;
    let mut sum_y = 0.0f64;
    let mut sum_xy = 0.0f64;
    let mut sum_xx = 0.0f64;
    for (i, &v) in values.iter().enumerate() {
        let x = i as f64 / span;
        let y = v as f64;
        sum_x += x;
        sum_y += y;
        sum_xy += x * y;
        sum_xx += x * x;
    }
    let nf = n as f64;
    let denom = nf * sum_xx - sum_x * sum_x;
    if denom.abs() < f64::EPSILON {
        return 0.0;
    }
    finite_or(((nf * sum_xy - sum_x * sum_y) / denom) as f32, 0.0)
}

/// Pearson correlation of two equally long series, in `[-1, 1]`.
///
/// Returns 0 when either series has zero variance or the lengths differ.
pub fn pearson(a: &[f32], b: &[f32]) -> f32 {
    let n = a.len();
    if n < 2 || n != b.len() {
        return 0.0;
    }
    let mean_a = mean(a) as f64;
    let mean_b = mean(b) as f64;

    let mut num = 0.0f64;
    let mut den_a = 0.0f64;
    let mut den_b = 0.0f64;
    for (&x, &y) in a.iter().zip(b) {
        let da = x as f64 - mean_a;
        let db = y as f64 - mean_b;
        num += da * db;
        den_a += da * da;
        den_b += db * db;
    }

    let den = (den_a * den_b).sqrt();
    if den <= f64::EPSILON {
        return 0.0;
    }
    sanitize((num / den) as f32, -1.0, 1.0, 0.0)
}

/// True when `value` lies within `tolerance` of an integer.
#[inline]
pub fn is_near_integer(value: f32, tolerance: f32) -> bool {
    value.is_finite() && (value - value.round()).abs() < tolerance
}
