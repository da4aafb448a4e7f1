//! AnalysisEngine that coordinates every analysis stage

use std::mem;

use crate::analysis::{
    AnalysisWarning, AudioBlock, BandEnergyTracker, BandLayout, BlockAnalyzer, EmotionAnalyzer,
    EmotionFeatures, FrequencyBand, LoudnessMeter, PhaseCoherenceAnalyzer, RelationshipEngine,
    TrendEngine,
};
use crate::history::{MetricHistory, Spectrogram};
use crate::{AnalyzerBuilder, AnalyzerConfig, Metrics, Result};

/// Owned, single-threaded analysis pipeline.
///
/// Each call to [`process`](Self::process) runs one block through block
/// metrics, loudness, band tracking, trend classification, band
/// relationships, phase coherence and emotion, in that order, and returns the
/// aggregated [`Metrics`].
///
/// # Example
///
/// ```rust
/// use resonance::prelude::*;
///
/// let mut engine = AnalysisEngine::builder().band_count(16).build()?;
///
/// let block = AudioBlock {
///     time_left: vec![0.0; 2048],
///     time_right: vec![0.0; 2048],
///     freq_left: vec![-144.0; 1024],
///     freq_right: vec![-144.0; 1024],
///     sample_rate: 44100.0,
///     fft_size: 2048,
///     timestamp: 0.0,
/// };
/// let metrics = engine.process(&block)?;
/// assert_eq!(metrics.loudness.integrated, -70.0);
/// # Ok::<(), resonance::Error>(())
/// ```
#[derive(Debug)]
pub struct AnalysisEngine {
    config: AnalyzerConfig,
    layout: BandLayout,
    block: BlockAnalyzer,
    loudness: LoudnessMeter,
    tracker: BandEnergyTracker,
    trends: TrendEngine,
    relations: RelationshipEngine,
    phase: PhaseCoherenceAnalyzer,
    emotion: EmotionAnalyzer,
    history: MetricHistory,
    spectrogram: Spectrogram,
    blocks_processed: u64,
    in_silent_run: bool,
}

impl AnalysisEngine {
    /// Start from the default configuration.
    pub fn builder() -> AnalyzerBuilder {
        AnalyzerBuilder::default()
    }

    /// Build every stage from `config`. Fails without a partial engine.
    pub fn new(config: AnalyzerConfig) -> Result<Self> {
        config.validate()?;

        let layout = BandLayout::new(config.bands.clone())?;
        let centers = layout.bands().iter().map(|b| b.center_freq).collect();
        let engine = Self {
            block: BlockAnalyzer::new(config.clip.clone()),
            loudness: LoudnessMeter::new(config.loudness.clone())?,
            tracker: BandEnergyTracker::new(layout.len(), config.tracker.clone())?,
            trends: TrendEngine::new(config.trend.clone())?,
            relations: RelationshipEngine::new(centers, config.relations.clone())?,
            phase: PhaseCoherenceAnalyzer::new(&layout, config.phase.clone())?,
            emotion: EmotionAnalyzer::new(&layout, config.emotion.clone())?,
            history: MetricHistory::new(config.history.metrics_len),
            spectrogram: Spectrogram::new(config.history.spectrogram_len),
            blocks_processed: 0,
            in_silent_run: false,
            layout,
            config,
        };

        tracing::debug!(
            bands = engine.layout.len(),
            min_freq = engine.config.bands.min_freq,
            max_freq = engine.config.bands.max_freq,
            "Analysis engine built"
        );
        Ok(engine)
    }

    /// Analyze one block.
    ///
    /// Malformed blocks are rejected before any state changes.
    pub fn process(&mut self, block: &AudioBlock) -> Result<Metrics> {
        if let Err(err) = block.validate() {
            tracing::warn!(error = %err, timestamp = block.timestamp, "Rejected audio block");
            return Err(err.into());
        }

        let block_metrics = self.block.analyze(block, &self.layout);
        let mut warnings = Vec::new();
        if block_metrics.is_degenerate() {
            if !self.in_silent_run {
                tracing::warn!(
                    timestamp = block.timestamp,
                    "Silent input, reporting floor values"
                );
                self.in_silent_run = true;
            }
            warnings.push(AnalysisWarning::DegenerateInput);
        } else if self.in_silent_run {
            tracing::debug!(timestamp = block.timestamp, "Signal resumed");
            self.in_silent_run = false;
        }

        let loudness = self
            .loudness
            .process(&block.time_left, &block.time_right, block.sample_rate);

        self.tracker.update(&block_metrics.band_energies);
        let smoothed_energies = self.tracker.energies();

        let mut migration = self.trends.analyze(&self.tracker);
        let mut relationships = self
            .relations
            .update(&block_metrics.band_energies, &smoothed_energies);
        let mut phase = self.phase.process(block, &self.layout);
        let emotion = self.emotion.process(
            &EmotionFeatures::from_block(&block_metrics),
            &block_metrics.band_energies,
            block.timestamp,
        );

        warnings.extend(mem::take(&mut migration.warnings));
        warnings.extend(mem::take(&mut relationships.warnings));
        warnings.extend(mem::take(&mut phase.warnings));

        let stereo = &block_metrics.stereo;
        let dynamics = &block_metrics.dynamics;
        self.history.push(loudness, stereo.correlation, stereo.width);
        self.spectrogram
            .push(block.timestamp, &block.freq_left, &block.freq_right);

        let metrics = Metrics {
            timestamp: block.timestamp,
            block_index: self.blocks_processed,
            loudness,
            loudness_display: self.loudness.display().current(),
            correlation: stereo.correlation,
            stereo_width: stereo.width,
            balance: stereo.balance,
            dynamic_range: dynamics.dynamic_range_db,
            crest_factor: dynamics.crest_factor,
            clip_count: dynamics.clip_count,
            true_peak: stereo.true_peak,
            spectral_centroid: block_metrics.spectral_centroid,
            sub_bass_ratio: block_metrics.sub_bass_mono,
            spectral_flux: block_metrics.spectral_flux,
            transient_density: dynamics.transient_density,
            rhythmic_intensity: dynamics.rhythmic_intensity,
            dominant_bands: self.tracker.dominant_bands(),
            overall_coherence: phase.overall_coherence,
            band_energies: block_metrics.band_energies,
            smoothed_energies,
            migration,
            relationships,
            phase,
            emotion,
            warnings,
        };
        self.blocks_processed += 1;

        tracing::trace!(
            block = metrics.block_index,
            momentary = metrics.loudness.momentary,
            correlation = metrics.correlation,
            warnings = metrics.warnings.len(),
            "Processed block"
        );
        Ok(metrics)
    }

    /// Clear all state back to silence, keeping the configuration.
    pub fn reset(&mut self) {
        self.block.reset();
        self.loudness.reset();
        self.tracker.reset();
        self.trends.reset();
        self.relations.reset();
        self.phase.reset();
        self.emotion.reset();
        self.history.clear();
        self.spectrogram.clear();
        self.blocks_processed = 0;
        self.in_silent_run = false;
        tracing::debug!("Analysis engine reset");
    }

    /// Replace the configuration, rebuilding every stage.
    ///
    /// On error the engine keeps its previous configuration and state.
    pub fn reconfigure(&mut self, config: AnalyzerConfig) -> Result<()> {
        *self = Self::new(config)?;
        Ok(())
    }

    /// Configuration the engine was built with.
    pub fn config(&self) -> &AnalyzerConfig {
        &self.config
    }

    /// Bands in ascending frequency order.
    pub fn bands(&self) -> &[FrequencyBand] {
        self.layout.bands()
    }

    /// Band layout, including bin lookup.
    pub fn layout(&self) -> &BandLayout {
        &self.layout
    }

    /// Blocks analyzed since construction or the last reset.
    pub fn blocks_processed(&self) -> u64 {
        self.blocks_processed
    }

    /// Recent raw spectra, oldest first.
    pub fn spectrogram(&self) -> &Spectrogram {
        &self.spectrogram
    }

    /// Per-block loudness, correlation and width history.
    pub fn history(&self) -> &MetricHistory {
        &self.history
    }

    /// Loudness meter, for gate details.
    pub fn loudness_meter(&self) -> &LoudnessMeter {
        &self.loudness
    }

    /// Smoothed band state.
    pub fn tracker(&self) -> &BandEnergyTracker {
        &self.tracker
    }

    /// Emotion analyzer, for its profile history and narrative.
    pub fn emotion(&self) -> &EmotionAnalyzer {
        &self.emotion
    }
}
