//! Per-block output snapshot.

use crate::analysis::{
    AnalysisWarning, EmotionReport, Genre, HistoryKind, LoudnessReading, MigrationReport,
    PhaseReport, RelationshipReport, TruePeak,
};

/// Everything the engine knows after one block.
///
/// Produced once per processed block. The live analyzer hands these out as
/// `Arc<Metrics>`, so a snapshot is never mutated after publication.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(
    feature = "serialization",
    derive(serde::Serialize, serde::Deserialize)
)]
pub struct Metrics {
    /// Capture timestamp of the source block, ms.
    pub timestamp: f64,
    /// Zero-based count of blocks processed since the last reset.
    pub block_index: u64,

    pub loudness: LoudnessReading,
    /// Exponentially smoothed loudness for meters.
    pub loudness_display: LoudnessReading,

    pub correlation: f32,
    /// 0-100.
    pub stereo_width: f32,
    /// -1 (left) to 1 (right).
    pub balance: f32,
    /// dB.
    pub dynamic_range: f32,
    pub crest_factor: f32,
    pub clip_count: u32,
    pub true_peak: TruePeak,

    /// Hz.
    pub spectral_centroid: f32,
    /// Percent of sub-bass energy that is mono.
    pub sub_bass_ratio: f32,
    pub spectral_flux: f32,
    pub transient_density: f32,
    pub rhythmic_intensity: f32,

    /// This block's normalized band energies.
    pub band_energies: Vec<f32>,
    /// Tracker-smoothed band energies.
    pub smoothed_energies: Vec<f32>,
    pub dominant_bands: Vec<usize>,

    pub migration: MigrationReport,
    pub relationships: RelationshipReport,
    pub phase: PhaseReport,
    /// Mean cross-channel coherence, 0 until enough frames exist.
    pub overall_coherence: f32,

    /// Emotional dimensions and the closest genres.
    pub emotion: EmotionReport,

    pub warnings: Vec<AnalysisWarning>,
}

impl Metrics {
    /// Bands classified as emerging.
    pub fn emerging(&self) -> &[usize] {
        &self.migration.emerging
    }

    /// Bands classified as fading.
    pub fn fading(&self) -> &[usize] {
        &self.migration.fading
    }

    /// Bands classified as stable.
    pub fn stable(&self) -> &[usize] {
        &self.migration.stable
    }

    /// True when the block carried no signal.
    pub fn is_degenerate(&self) -> bool {
        self.warnings.contains(&AnalysisWarning::DegenerateInput)
    }

    /// Best genre match, once the emotional profile has been updated.
    pub fn likely_genre(&self) -> Option<Genre> {
        self.emotion.genres.first().map(|m| m.genre)
    }

    /// True when `kind` ran on less history than it needs.
    pub fn lacks_history(&self, kind: HistoryKind) -> bool {
        self.warnings.iter().any(|w| {
            matches!(w, AnalysisWarning::InsufficientHistory { analysis, .. } if *analysis == kind)
        })
    }
}
