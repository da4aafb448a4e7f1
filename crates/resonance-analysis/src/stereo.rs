//! Stereo correlation and image analysis
//!
//! - **Correlation**: phase agreement between L/R (-1 to +1)
//! - **Width**: share of side energy in the mid/side split, as a percentage
//! - **Balance**: left/right level balance
//! - **True peak**: per-channel absolute sample peak

use crate::math::{linear_to_db, sanitize};

/// Stereo analysis of one block.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
#[cfg_attr(
    feature = "serialization",
    derive(serde::Serialize, serde::Deserialize)
)]
pub struct StereoAnalysis {
    /// Phase correlation (-1.0 to 1.0)
    /// - 1.0 = Mono (L and R identical)
    /// - 0.0 = Uncorrelated, or silent
    /// - -1.0 = Out of phase (L and R are inverted)
    pub correlation: f32,

    /// Stereo width (0 to 100)
    /// - 0 = Mono
    /// - 50 = Equal mid and side energy
    /// - 100 = Pure side (out of phase)
    pub width: f32,

    /// Left/right balance (-1.0 full left, 0.0 center, 1.0 full right)
    pub balance: f32,

    /// Mid (L+R)/2 RMS level
    pub mid_level: f32,

    /// Side (L-R)/2 RMS level
    pub side_level: f32,

    pub left_level: f32,
    pub right_level: f32,

    pub true_peak: TruePeak,
}

/// Per-channel absolute sample peak.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(
    feature = "serialization",
    derive(serde::Serialize, serde::Deserialize)
)]
pub struct TruePeak {
    pub left: f32,
    pub right: f32,
    pub left_db: f32,
    pub right_db: f32,
}

impl Default for TruePeak {
    fn default() -> Self {
        Self::from_linear(0.0, 0.0)
    }
}

impl TruePeak {
    fn from_linear(left: f32, right: f32) -> Self {
        Self {
            left,
            right,
            left_db: linear_to_db(left),
            right_db: linear_to_db(right),
        }
    }

    /// Louder of the two channels in dBFS.
    pub fn max_db(&self) -> f32 {
        self.left_db.max(self.right_db)
    }
}

impl StereoAnalysis {
    /// True when correlation is negative enough to cancel on mono fold-down.
    pub fn has_phase_issues(&self) -> bool {
        self.correlation < -0.3
    }

    /// Correlation above 0.95.
    pub fn is_mono(&self) -> bool {
        self.correlation > 0.95
    }
}

/// Analyze a stereo block. Non-finite samples count as silence.
pub fn analyze_stereo(left: &[f32], right: &[f32]) -> StereoAnalysis {
    let len = left.len().min(right.len());
    if len == 0 {
        return StereoAnalysis::default();
    }

    let mut sum_l_sq = 0.0f64;
    let mut sum_r_sq = 0.0f64;
    let mut sum_lr = 0.0f64;
    let mut sum_mid_sq = 0.0f64;
    let mut sum_side_sq = 0.0f64;
    let mut peak_l = 0.0f32;
    let mut peak_r = 0.0f32;

    for (&l, &r) in left[..len].iter().zip(&right[..len]) {
        let l = if l.is_finite() { l } else { 0.0 };
        let r = if r.is_finite() { r } else { 0.0 };
        peak_l = peak_l.max(l.abs());
        peak_r = peak_r.max(r.abs());

        let (l, r) = (l as f64, r as f64);
        sum_l_sq += l * l;
        sum_r_sq += r * r;
        sum_lr += l * r;

        let mid = (l + r) * 0.5;
        let side = (l - r) * 0.5;
        sum_mid_sq += mid * mid;
        sum_side_sq += side * side;
    }

    let n = len as f64;

    // r = Σ(L*R) / sqrt(Σ(L²) * Σ(R²))
    let correlation = if sum_l_sq > 0.0 && sum_r_sq > 0.0 {
        sanitize(
            (sum_lr / (sum_l_sq * sum_r_sq).sqrt()) as f32,
            -1.0,
            1.0,
            0.0,
        )
    } else {
        0.0
    };

    let width = if sum_mid_sq + sum_side_sq > 0.0 {
        sanitize(
            (sum_side_sq / (sum_mid_sq + sum_side_sq) * 100.0) as f32,
            0.0,
            100.0,
            0.0,
        )
    } else {
        0.0
    };

    let left_rms = (sum_l_sq / n).sqrt() as f32;
    let right_rms = (sum_r_sq / n).sqrt() as f32;
    let total_level = left_rms + right_rms;
    let balance = if total_level > 0.0 {
        (right_rms - left_rms) / total_level
    } else {
        0.0
    };

    StereoAnalysis {
        correlation,
        width,
        balance,
        mid_level: (sum_mid_sq / n).sqrt() as f32,
        side_level: (sum_side_sq / n).sqrt() as f32,
        left_level: left_rms,
        right_level: right_rms,
        true_peak: TruePeak::from_linear(peak_l, peak_r),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use proptest::prelude::*;

    fn sine(len: usize, step: f32) -> Vec<f32> {
        (0..len).map(|i| (i as f32 * step).sin()).collect()
    }

    #[test]
    fn test_mono_signal() {
        let samples = sine(1000, 0.01);
        let analysis = analyze_stereo(&samples, &samples);

        assert!(
            analysis.correlation > 0.99,
            "Mono signal should have ~1.0 correlation"
        );
        assert!(analysis.is_mono());
        assert!(analysis.width < 0.1, "Mono signal should have ~0 width");
        assert!(analysis.balance.abs() < 0.01);
        assert!(analysis.side_level < 0.001);
    }

    #[test]
    fn test_out_of_phase() {
        let left = sine(1000, 0.01);
        let right: Vec<f32> = left.iter().map(|&s| -s).collect();
        let analysis = analyze_stereo(&left, &right);

        assert!(analysis.correlation < -0.99);
        assert!(analysis.has_phase_issues());
        assert_relative_eq!(analysis.width, 100.0, epsilon = 1e-3);
        assert!(analysis.mid_level < 0.001);
    }

    #[test]
    fn test_one_sided_width() {
        // Left only: mid and side carry equal energy.
        let left = sine(1000, 0.01);
        let right = vec![0.0; 1000];
        let analysis = analyze_stereo(&left, &right);

        assert_relative_eq!(analysis.width, 50.0, epsilon = 1e-3);
        assert_eq!(analysis.correlation, 0.0);
        assert!(analysis.balance < -0.9);
    }

    #[test]
    fn test_silence() {
        let silence = vec![0.0f32; 1000];
        let analysis = analyze_stereo(&silence, &silence);

        assert_eq!(analysis.correlation, 0.0);
        assert_eq!(analysis.width, 0.0);
        assert_eq!(analysis.true_peak.left_db, crate::math::PEAK_FLOOR_DB);
    }

    #[test]
    fn test_true_peak() {
        let mut left = vec![0.0f32; 64];
        let mut right = vec![0.0f32; 64];
        left[10] = -0.5;
        right[20] = 1.0;
        let peak = analyze_stereo(&left, &right).true_peak;

        assert_eq!(peak.left, 0.5);
        assert_relative_eq!(peak.left_db, -6.0206, epsilon = 1e-3);
        assert_relative_eq!(peak.max_db(), 0.0, epsilon = 1e-6);
    }

    #[test]
    fn test_non_finite_samples_are_silence() {
        let left = vec![f32::NAN; 32];
        let right = vec![f32::INFINITY; 32];
        let analysis = analyze_stereo(&left, &right);
        assert_eq!(analysis.correlation, 0.0);
        assert_eq!(analysis.true_peak.right, 0.0);
    }

    proptest! {
        #[test]
        fn prop_correlation_in_range(
            left in proptest::collection::vec(-1.0f32..1.0, 1..256),
            right in proptest::collection::vec(-1.0f32..1.0, 1..256),
        ) {
            let analysis = analyze_stereo(&left, &right);
            prop_assert!((-1.0..=1.0).contains(&analysis.correlation));
            prop_assert!((0.0..=100.0).contains(&analysis.width));
        }
    }
}
