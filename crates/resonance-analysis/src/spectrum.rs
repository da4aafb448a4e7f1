//! Spectral measures on the dB magnitude arrays of a block.
//!
//! Magnitudes arrive in dB; everything here works on linear magnitude
//! `10^(dB/20)`, with `-inf` bins contributing nothing.

use crate::bands::{bin_frequency, BinMap};
use crate::math::{db_to_linear, sanitize, PEAK_FLOOR_DB};

/// Highest frequency counted as sub-bass for the mono check.
pub const SUB_BASS_CUTOFF_HZ: f32 = 100.0;

/// Energy-weighted mean frequency of both channels, 0 for an empty spectrum.
pub fn spectral_centroid(freq_left: &[f32], freq_right: &[f32], sample_rate: f32, fft_size: usize) -> f32 {
    let mut weighted = 0.0f64;
    let mut total = 0.0f64;
    for (bin, (&l, &r)) in freq_left.iter().zip(freq_right).enumerate() {
        let magnitude = (db_to_linear(l) + db_to_linear(r)) as f64 * 0.5;
        weighted += bin_frequency(bin, sample_rate, fft_size) as f64 * magnitude;
        total += magnitude;
    }
    if total <= 0.0 {
        return 0.0;
    }
    sanitize((weighted / total) as f32, 0.0, sample_rate * 0.5, 0.0)
}

/// How mono the sub-bass is, as a percentage.
///
/// Averages `min(|L|,|R|) / max(|L|,|R|)` over bins `1..=floor(100·fft/sr)`,
/// skipping bins where either channel is empty.
pub fn sub_bass_mono_ratio(freq_left: &[f32], freq_right: &[f32], sample_rate: f32, fft_size: usize) -> f32 {
    let last_bin = (SUB_BASS_CUTOFF_HZ * fft_size as f32 / sample_rate).floor() as usize;
    let last_bin = last_bin.min(freq_left.len().min(freq_right.len()).saturating_sub(1));

    let mut sum = 0.0f64;
    let mut counted = 0usize;
    for bin in 1..=last_bin {
        let l = db_to_linear(freq_left[bin]);
        let r = db_to_linear(freq_right[bin]);
        if l > 0.0 && r > 0.0 {
            sum += (l.min(r) / l.max(r)) as f64;
            counted += 1;
        }
    }
    if counted == 0 {
        return 0.0;
    }
    sanitize((sum / counted as f64 * 100.0) as f32, 0.0, 100.0, 0.0)
}

/// Per-band linear energy averaged across channels, normalized so the
/// loudest band is 1. All zeros when the spectrum is empty.
pub fn band_energies(freq_left: &[f32], freq_right: &[f32], bins: &BinMap) -> Vec<f32> {
    let mut raw = vec![0.0f64; bins.band_count()];
    for (bin, band) in bins.assigned() {
        let (Some(&l), Some(&r)) = (freq_left.get(bin), freq_right.get(bin)) else {
            continue;
        };
        raw[band] += (db_to_linear(l) + db_to_linear(r)) as f64 * 0.5;
    }
    normalize_energies(&raw)
}

/// Scale raw energies into `[0, 1]` by the maximum.
pub fn normalize_energies(raw: &[f64]) -> Vec<f32> {
    let max = raw.iter().copied().fold(0.0f64, f64::max);
    if !(max.is_finite() && max > 0.0) {
        return vec![0.0; raw.len()];
    }
    raw.iter()
        .map(|&e| sanitize((e / max) as f32, 0.0, 1.0, 0.0))
        .collect()
}

/// Mean absolute dB change between two spectra, empty bins at the peak floor.
pub fn spectral_flux(previous: &[f32], current: &[f32]) -> f32 {
    let len = previous.len().min(current.len());
    if len == 0 {
        return 0.0;
    }
    let floor = |db: f32| if db.is_nan() { PEAK_FLOOR_DB } else { db.max(PEAK_FLOOR_DB) };
    let sum: f64 = previous[..len]
        .iter()
        .zip(&current[..len])
        .map(|(&p, &c)| (floor(c) - floor(p)).abs() as f64)
        .sum();
    sanitize((sum / len as f64) as f32, 0.0, f32::MAX, 0.0)
}
