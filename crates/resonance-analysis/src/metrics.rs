//! Per-block metric extraction.

use crate::bands::{BandLayout, BinMap};
use crate::block::AudioBlock;
use crate::dynamics::{analyze_dynamics, ClipConfig, Dynamics};
use crate::spectrum::{band_energies, spectral_centroid, spectral_flux, sub_bass_mono_ratio};
use crate::stereo::{analyze_stereo, StereoAnalysis};

/// Everything measured from a single block, before any history is applied.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(
    feature = "serialization",
    derive(serde::Serialize, serde::Deserialize)
)]
pub struct BlockMetrics {
    pub stereo: StereoAnalysis,
    pub dynamics: Dynamics,
    /// Hz.
    pub spectral_centroid: f32,
    /// Percent.
    pub sub_bass_mono: f32,
    pub spectral_flux: f32,
    /// Normalized per-band energy, max 1 (or all 0).
    pub band_energies: Vec<f32>,
}

impl BlockMetrics {
    /// No signal in either the time or the frequency domain.
    pub fn is_degenerate(&self) -> bool {
        self.dynamics.is_silent() && self.band_energies.iter().all(|&e| e == 0.0)
    }
}

/// Computes [`BlockMetrics`], caching the bin map and the previous spectrum.
#[derive(Debug, Clone)]
pub struct BlockAnalyzer {
    clip: ClipConfig,
    bin_map: Option<BinMap>,
    previous_left: Option<Vec<f32>>,
}

impl BlockAnalyzer {
    pub fn new(clip: ClipConfig) -> Self {
        Self {
            clip,
            bin_map: None,
            previous_left: None,
        }
    }

    /// Analyze a block that has already passed [`AudioBlock::validate`].
    pub fn analyze(&mut self, block: &AudioBlock, layout: &BandLayout) -> BlockMetrics {
        let bin_map = match self.bin_map.take() {
            Some(map) if map.matches(block.sample_rate, block.fft_size) => map,
            _ => {
                tracing::debug!(
                    sample_rate = block.sample_rate,
                    fft_size = block.fft_size,
                    "Rebuilding bin map"
                );
                layout.bin_map(block.sample_rate, block.fft_size)
            }
        };

        let spectral_flux = match &self.previous_left {
            Some(prev) if prev.len() == block.freq_left.len() => {
                spectral_flux(prev, &block.freq_left)
            }
            _ => 0.0,
        };

        let metrics = BlockMetrics {
            stereo: analyze_stereo(&block.time_left, &block.time_right),
            dynamics: analyze_dynamics(&block.time_left, &block.time_right, &self.clip),
            spectral_centroid: spectral_centroid(
                &block.freq_left,
                &block.freq_right,
                block.sample_rate,
                block.fft_size,
            ),
            sub_bass_mono: sub_bass_mono_ratio(
                &block.freq_left,
                &block.freq_right,
                block.sample_rate,
                block.fft_size,
            ),
            spectral_flux,
            band_energies: band_energies(&block.freq_left, &block.freq_right, &bin_map),
        };

        self.bin_map = Some(bin_map);
        match &mut self.previous_left {
            Some(prev) => {
                prev.clear();
                prev.extend_from_slice(&block.freq_left);
            }
            None => self.previous_left = Some(block.freq_left.clone()),
        }
        metrics
    }

    /// Forget the previous spectrum.
    pub fn reset(&mut self) {
        self.previous_left = None;
    }
}
