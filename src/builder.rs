//! Builder for configuring and constructing an `AnalysisEngine` or a `LiveAnalyzer`.

use crate::analysis::{
    BandConfig, ClipConfig, EmotionConfig, LoudnessConfig, PhaseConfig, RelationConfig, Spacing,
    TrackerConfig, TrendConfig, WindowFunction,
};
use crate::{AnalysisEngine, AnalyzerConfig, LiveAnalyzer, Result};

/// Fluent front end over [`AnalyzerConfig`]. Nothing is validated until
/// [`build`](Self::build) or [`spawn`](Self::spawn).
///
/// # Example
///
/// ```rust
/// use resonance::prelude::*;
///
/// let engine = AnalyzerBuilder::default()
///     .band_count(24)
///     .frequency_range(30.0, 16000.0)
///     .gate_offset(-10.0)
///     .window(WindowFunction::Blackman)
///     .build()?;
/// assert_eq!(engine.bands().len(), 24);
/// # Ok::<(), resonance::Error>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct AnalyzerBuilder {
    config: AnalyzerConfig,
}

impl AnalyzerBuilder {
    /// Start from an existing configuration.
    pub fn from_config(config: AnalyzerConfig) -> Self {
        Self { config }
    }

    /// Replace the whole band configuration.
    pub fn bands(mut self, bands: BandConfig) -> Self {
        self.config.bands = bands;
        self
    }

    /// Default: 32
    pub fn band_count(mut self, count: usize) -> Self {
        self.config.bands.count = count;
        self
    }

    /// Default: 20 Hz to 20 kHz
    pub fn frequency_range(mut self, min_freq: f32, max_freq: f32) -> Self {
        self.config.bands.min_freq = min_freq;
        self.config.bands.max_freq = max_freq;
        self
    }

    /// Default: logarithmic
    pub fn spacing(mut self, spacing: Spacing) -> Self {
        self.config.bands.spacing = spacing;
        self
    }

    /// Replace the whole loudness configuration.
    pub fn loudness(mut self, loudness: LoudnessConfig) -> Self {
        self.config.loudness = loudness;
        self
    }

    /// Gating block length in ms and overlap fraction. Default: 400 ms, 0.75
    pub fn loudness_block(mut self, block_ms: f32, overlap: f32) -> Self {
        self.config.loudness.block_ms = block_ms;
        self.config.loudness.overlap = overlap;
        self
    }

    /// Relative gate in LU. Default: -10
    pub fn gate_offset(mut self, offset: f32) -> Self {
        self.config.loudness.gate_offset = offset;
        self
    }

    /// Enable an absolute gate in LUFS on top of the relative gate.
    pub fn absolute_gate(mut self, lufs: f32) -> Self {
        self.config.loudness.absolute_gate = Some(lufs);
        self
    }

    /// Default: clip threshold 0.99
    pub fn clip(mut self, clip: ClipConfig) -> Self {
        self.config.clip = clip;
        self
    }

    /// Default: 0.99
    pub fn clip_threshold(mut self, threshold: f32) -> Self {
        self.config.clip.threshold = threshold;
        self
    }

    /// Band energy smoothing and history length.
    pub fn tracker(mut self, tracker: TrackerConfig) -> Self {
        self.config.tracker = tracker;
        self
    }

    /// Trend window and classification thresholds.
    pub fn trend(mut self, trend: TrendConfig) -> Self {
        self.config.trend = trend;
        self
    }

    /// Relationship window and thresholds.
    pub fn relations(mut self, relations: RelationConfig) -> Self {
        self.config.relations = relations;
        self
    }

    /// Phase coherence window, history and FFT.
    pub fn phase(mut self, phase: PhaseConfig) -> Self {
        self.config.phase = phase;
        self
    }

    /// Emotional profile tuning.
    pub fn emotion(mut self, emotion: EmotionConfig) -> Self {
        self.config.emotion = emotion;
        self
    }

    /// Window applied before the phase FFT. Default: Hann
    pub fn window(mut self, window: WindowFunction) -> Self {
        self.config.phase.window = window;
        self
    }

    /// Set the band tracker, loudness display, relationship and phase
    /// history lengths together.
    pub fn history_lengths(
        mut self,
        tracker: usize,
        loudness_display: usize,
        relations: usize,
        phase: usize,
    ) -> Self {
        self.config.tracker.history_len = tracker;
        self.config.loudness.display_history = loudness_display;
        self.config.relations.history_len = relations;
        self.config.phase.history_len = phase;
        self
    }

    /// Metric and spectrogram ring lengths. Default: 3600 each
    pub fn metric_history(mut self, metrics_len: usize, spectrogram_len: usize) -> Self {
        self.config.history.metrics_len = metrics_len;
        self.config.history.spectrogram_len = spectrogram_len;
        self
    }

    /// Pending block slots for the live thread. Default: 1
    pub fn queue_capacity(mut self, capacity: usize) -> Self {
        self.config.live.queue_capacity = capacity;
        self
    }

    /// Per-subscriber snapshot buffer. Default: 16
    pub fn sink_capacity(mut self, capacity: usize) -> Self {
        self.config.live.sink_capacity = capacity;
        self
    }

    /// Default: "resonance-analysis"
    pub fn thread_name(mut self, name: impl Into<String>) -> Self {
        self.config.live.thread_name = name.into();
        self
    }

    /// Configuration as built so far.
    pub fn config(&self) -> &AnalyzerConfig {
        &self.config
    }

    pub fn into_config(self) -> AnalyzerConfig {
        self.config
    }

    /// Validate the configuration and create an engine.
    pub fn build(self) -> Result<AnalysisEngine> {
        AnalysisEngine::new(self.config)
    }

    /// Build the engine and move it onto its own analysis thread.
    pub fn spawn(self) -> Result<LiveAnalyzer> {
        LiveAnalyzer::spawn(self.build()?)
    }
}
