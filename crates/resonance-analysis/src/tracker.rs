//! Smoothed per-band energy with bounded history.

use std::collections::VecDeque;

use crate::math::sanitize;
use crate::{Error, Result};

/// Smoothed energy above which a band counts as dominant.
pub const DOMINANT_ENERGY: f32 = 0.6;

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(
    feature = "serialization",
    derive(serde::Serialize, serde::Deserialize)
)]
pub struct TrackerConfig {
    /// EMA weight of the previous value, in `[0, 1)`.
    pub smoothing: f32,
    /// Samples kept per band.
    pub history_len: usize,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            smoothing: 0.7,
            history_len: 200,
        }
    }
}

impl TrackerConfig {
    /// Check smoothing and history length.
    pub fn validate(&self) -> Result<()> {
        if !(0.0..1.0).contains(&self.smoothing) {
            return Err(Error::InvalidConfig(format!(
                "tracker smoothing must be in [0, 1), got {}",
                self.smoothing
            )));
        }
        if self.history_len < 2 {
            return Err(Error::InvalidConfig(format!(
                "tracker history_len must be >= 2, got {}",
                self.history_len
            )));
        }
        Ok(())
    }
}

/// State of one band.
///
/// Trend, volatility and classification are derived from this history by
/// the migration pass and reported per band in
/// [`MigrationReport::trends`](crate::trend::MigrationReport::trends).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BandState {
    energy: f32,
    history: VecDeque<f32>,
}

impl BandState {
    /// Smoothed energy in `[0, 1]`.
    pub fn energy(&self) -> f32 {
        self.energy
    }

    /// Smoothed energies, oldest first.
    pub fn history(&self) -> &VecDeque<f32> {
        &self.history
    }

    /// The most recent `n` history entries (or fewer), oldest first.
    pub fn recent(&self, n: usize) -> impl ExactSizeIterator<Item = f32> + '_ {
        let skip = self.history.len().saturating_sub(n);
        self.history.iter().skip(skip).copied()
    }
}

/// Per-band EMA tracker. Band count is fixed at construction.
#[derive(Debug, Clone)]
pub struct BandEnergyTracker {
    config: TrackerConfig,
    bands: Vec<BandState>,
}

impl BandEnergyTracker {
    /// Tracker with `band_count` silent bands.
    pub fn new(band_count: usize, config: TrackerConfig) -> Result<Self> {
        config.validate()?;
        if band_count == 0 {
            return Err(Error::InvalidConfig("tracker needs at least one band".into()));
        }
        let bands = (0..band_count)
            .map(|_| BandState {
                energy: 0.0,
                history: VecDeque::with_capacity(config.history_len),
            })
            .collect();
        Ok(Self { config, bands })
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    /// Fold in one frame of normalized energies.
    ///
    /// Extra values are ignored and missing ones count as zero, so the band
    /// count never changes here.
    pub fn update(&mut self, energies: &[f32]) {
        let alpha = self.config.smoothing;
        let capacity = self.config.history_len;
        for (i, band) in self.bands.iter_mut().enumerate() {
            let new = sanitize(energies.get(i).copied().unwrap_or(0.0), 0.0, 1.0, 0.0);
            band.energy = sanitize(band.energy * alpha + new * (1.0 - alpha), 0.0, 1.0, 0.0);
            if band.history.len() == capacity {
                band.history.pop_front();
            }
            band.history.push_back(band.energy);
        }
    }

    pub fn bands(&self) -> &[BandState] {
        &self.bands
    }

    /// Current smoothed energies, one per band.
    pub fn energies(&self) -> Vec<f32> {
        self.bands.iter().map(BandState::energy).collect()
    }

    /// History depth, equal across bands.
    pub fn history_len(&self) -> usize {
        self.bands.first().map_or(0, |b| b.history.len())
    }

    /// Bands whose smoothed energy exceeds [`DOMINANT_ENERGY`].
    pub fn dominant_bands(&self) -> Vec<usize> {
        self.bands
            .iter()
            .enumerate()
            .filter(|(_, b)| b.energy > DOMINANT_ENERGY)
            .map(|(i, _)| i)
            .collect()
    }

    /// Zero every band and drop history.
    pub fn reset(&mut self) {
        for band in &mut self.bands {
            band.energy = 0.0;
            band.history.clear();
        }
    }
}
