//! Engine configuration.

use crate::analysis::{
    BandConfig, ClipConfig, EmotionConfig, Error as AnalysisError, LoudnessConfig, PhaseConfig,
    RelationConfig, TrackerConfig, TrendConfig,
};
use crate::Result;

/// Construction-time configuration for [`AnalysisEngine`](crate::AnalysisEngine).
///
/// Immutable for the life of an engine; change it through
/// [`AnalysisEngine::reconfigure`](crate::AnalysisEngine::reconfigure), which
/// rebuilds all state.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(
    feature = "serialization",
    derive(serde::Serialize, serde::Deserialize)
)]
pub struct AnalyzerConfig {
    pub bands: BandConfig,
    pub loudness: LoudnessConfig,
    pub clip: ClipConfig,
    pub tracker: TrackerConfig,
    pub trend: TrendConfig,
    pub relations: RelationConfig,
    pub phase: PhaseConfig,
    pub emotion: EmotionConfig,
    pub history: HistoryConfig,
    pub live: LiveConfig,
}

/// Bounds of the long-running metric and spectrogram histories.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(
    feature = "serialization",
    derive(serde::Serialize, serde::Deserialize)
)]
pub struct HistoryConfig {
    pub metrics_len: usize,
    pub spectrogram_len: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            metrics_len: 3600,
            spectrogram_len: 3600,
        }
    }
}

/// Live analysis thread settings.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(
    feature = "serialization",
    derive(serde::Serialize, serde::Deserialize)
)]
pub struct LiveConfig {
    /// Pending blocks; when full the newest replaces the oldest.
    pub queue_capacity: usize,
    /// Snapshots buffered per subscriber before that subscriber misses one.
    pub sink_capacity: usize,
    pub thread_name: String,
}

impl Default for LiveConfig {
    fn default() -> Self {
        Self {
            queue_capacity: 1,
            sink_capacity: 16,
            thread_name: "resonance-analysis".into(),
        }
    }
}

impl AnalyzerConfig {
    /// Validate every section.
    pub fn validate(&self) -> Result<()> {
        self.bands.validate()?;
        self.loudness.validate()?;
        self.clip.validate()?;
        self.tracker.validate()?;
        self.trend.validate()?;
        self.relations.validate()?;
        self.phase.validate()?;
        self.emotion.validate()?;

        if self.trend.window > self.tracker.history_len {
            return Err(invalid(format!(
                "trend window {} exceeds tracker history {}",
                self.trend.window, self.tracker.history_len
            )));
        }
        if self.history.metrics_len == 0 || self.history.spectrogram_len == 0 {
            return Err(invalid("history lengths must be > 0".into()));
        }
        if self.live.queue_capacity == 0 || self.live.sink_capacity == 0 {
            return Err(invalid("queue and sink capacities must be > 0".into()));
        }
        Ok(())
    }
}

fn invalid(message: String) -> crate::Error {
    AnalysisError::InvalidConfig(message).into()
}
