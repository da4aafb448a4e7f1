//! Level, crest factor, clipping and transient measures for one block.

use crate::math::{finite_or, sanitize};
use crate::{Error, Result};

/// Clip detection parameters.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(
    feature = "serialization",
    derive(serde::Serialize, serde::Deserialize)
)]
pub struct ClipConfig {
    /// A sample clips when `|x| > threshold`.
    pub threshold: f32,
    /// Minimum consecutive clipped samples that count as one clip.
    pub min_run: usize,
}

impl Default for ClipConfig {
    fn default() -> Self {
        Self {
            threshold: 0.99,
            min_run: 3,
        }
    }
}

impl ClipConfig {
    /// Check the clip threshold.
    pub fn validate(&self) -> Result<()> {
        if !self.threshold.is_finite() || self.threshold <= 0.0 {
            return Err(Error::InvalidConfig(format!(
                "clip threshold must be positive, got {}",
                self.threshold
            )));
        }
        if self.min_run == 0 {
            return Err(Error::InvalidConfig("clip min_run must be >= 1".into()));
        }
        Ok(())
    }
}

/// Dynamics of one block.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
#[cfg_attr(
    feature = "serialization",
    derive(serde::Serialize, serde::Deserialize)
)]
pub struct Dynamics {
    pub peak: f32,
    pub rms: f32,
    /// peak / rms, 0 for silence.
    pub crest_factor: f32,
    /// 20·log10(crest), 0 for silence.
    pub dynamic_range_db: f32,
    /// Number of clipped runs.
    pub clip_count: u32,
    /// Zero-crossing density in `[0, 1]`.
    pub transient_density: f32,
    /// Mean |L| scaled by transient density.
    pub rhythmic_intensity: f32,
}

impl Dynamics {
    /// RMS of exactly zero.
    pub fn is_silent(&self) -> bool {
        self.rms == 0.0
    }
}

/// Measure a block's dynamics.
pub fn analyze_dynamics(left: &[f32], right: &[f32], clip: &ClipConfig) -> Dynamics {
    let len = left.len().min(right.len());
    if len == 0 {
        return Dynamics::default();
    }

    let mut peak = 0.0f32;
    let mut sum_sq = 0.0f64;
    for (&l, &r) in left[..len].iter().zip(&right[..len]) {
        let l = finite_or(l, 0.0);
        let r = finite_or(r, 0.0);
        peak = peak.max(l.abs()).max(r.abs());
        sum_sq += (l as f64 * l as f64 + r as f64 * r as f64) * 0.5;
    }
    let rms = (sum_sq / len as f64).sqrt() as f32;

    let (crest_factor, dynamic_range_db) = if rms > 0.0 {
        let crest = peak / rms;
        (crest, finite_or(20.0 * crest.log10(), 0.0))
    } else {
        (0.0, 0.0)
    };

    let transient_density = zero_crossing_density(&left[..len]);
    let mean_abs = left[..len]
        .iter()
        .map(|&x| finite_or(x, 0.0).abs() as f64)
        .sum::<f64>()
        / len as f64;

    Dynamics {
        peak,
        rms,
        crest_factor,
        dynamic_range_db,
        clip_count: count_clips(&left[..len], &right[..len], clip),
        transient_density,
        rhythmic_intensity: sanitize(mean_abs as f32 * transient_density, 0.0, 1.0, 0.0),
    }
}

/// Count runs of at least `min_run` consecutive samples where either channel
/// exceeds the threshold.
pub fn count_clips(left: &[f32], right: &[f32], clip: &ClipConfig) -> u32 {
    let mut clips = 0u32;
    let mut run = 0usize;
    for (&l, &r) in left.iter().zip(right) {
        if l.abs() > clip.threshold || r.abs() > clip.threshold {
            run += 1;
            if run == clip.min_run {
                clips += 1;
            }
        } else {
            run = 0;
        }
    }
    clips
}

/// Sign changes per sample, scaled so one crossing every ten samples is 1.
pub fn zero_crossing_density(samples: &[f32]) -> f32 {
    if samples.len() < 2 {
        return 0.0;
    }
    let crossings = samples
        .windows(2)
        .filter(|w| (w[0] >= 0.0) != (w[1] >= 0.0))
        .count();
    (crossings as f32 / (samples.len() as f32 * 0.1)).min(1.0)
}
