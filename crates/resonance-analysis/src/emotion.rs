//! Emotional reading of the spectrum and a genre estimate.
//!
//! Four bipolar dimensions (joy/sadness, tension/release, energy/calm and
//! warmth/coldness) live in `[0, 1]` with 0.5 as neutral. Each update maps
//! block features and range-grouped band energies to a target value per
//! dimension, scales its distance from neutral by `sensitivity` and moves
//! the current value toward it by `transition`.
//!
//! Updates happen at most once per `update_interval_ms` of block time. Every
//! `narrative_interval` updates a snapshot joins the narrative, whose
//! per-dimension slopes give the strongest emotional arcs.

use std::collections::VecDeque;

use crate::bands::{BandLayout, FrequencyRange};
use crate::math::{finite_or, linear_trend, sanitize};
use crate::metrics::BlockMetrics;
use crate::{Error, Result};

/// Smoothed band energy a band needs to count toward its range.
const SIGNIFICANT_ENERGY: f32 = 0.05;
const NEUTRAL: f32 = 0.5;
/// Arcs reported per narrative.
const MAX_ARCS: usize = 2;

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(
    feature = "serialization",
    derive(serde::Serialize, serde::Deserialize)
)]
pub struct EmotionConfig {
    /// Minimum block time between dimension updates, in ms.
    pub update_interval_ms: f64,
    /// Scale applied to each target's distance from neutral, `[0, 1]`.
    pub sensitivity: f32,
    /// Fraction of the way each dimension moves toward its target, `(0, 1]`.
    pub transition: f32,
    /// EMA weight of the previous band energy, `[0, 1)`.
    pub band_smoothing: f32,
    /// Dimension updates between narrative snapshots.
    pub narrative_interval: usize,
    /// Narrative snapshots kept.
    pub narrative_len: usize,
    /// How far back the profile history reaches.
    pub history_secs: f64,
    /// Per-snapshot slope a dimension needs to count as an arc.
    pub arc_threshold: f32,
    /// Genre matches reported, best first.
    pub genre_matches: usize,
}

impl Default for EmotionConfig {
    fn default() -> Self {
        Self {
            update_interval_ms: 500.0,
            sensitivity: 0.7,
            transition: 0.1,
            band_smoothing: 0.8,
            narrative_interval: 10,
            narrative_len: 20,
            history_secs: 60.0,
            arc_threshold: 0.05,
            genre_matches: 3,
        }
    }
}

impl EmotionConfig {
    /// Check rates, intervals and history lengths.
    pub fn validate(&self) -> Result<()> {
        if !self.update_interval_ms.is_finite() || self.update_interval_ms <= 0.0 {
            return Err(Error::InvalidConfig(format!(
                "emotion update interval must be positive, got {}",
                self.update_interval_ms
            )));
        }
        if !(0.0..=1.0).contains(&self.sensitivity) {
            return Err(Error::InvalidConfig(format!(
                "emotion sensitivity must be in [0, 1], got {}",
                self.sensitivity
            )));
        }
        if !(self.transition > 0.0 && self.transition <= 1.0) {
            return Err(Error::InvalidConfig(format!(
                "emotion transition must be in (0, 1], got {}",
                self.transition
            )));
        }
        if !(0.0..1.0).contains(&self.band_smoothing) {
            return Err(Error::InvalidConfig(format!(
                "emotion band smoothing must be in [0, 1), got {}",
                self.band_smoothing
            )));
        }
        if self.narrative_interval == 0 || self.narrative_len < 3 {
            return Err(Error::InvalidConfig(format!(
                "emotion narrative needs interval >= 1 and length >= 3, got {} and {}",
                self.narrative_interval, self.narrative_len
            )));
        }
        if !self.history_secs.is_finite() || self.history_secs <= 0.0 {
            return Err(Error::InvalidConfig(format!(
                "emotion history must be positive, got {}s",
                self.history_secs
            )));
        }
        if !self.arc_threshold.is_finite() || self.arc_threshold < 0.0 {
            return Err(Error::InvalidConfig(format!(
                "arc threshold must be non-negative, got {}",
                self.arc_threshold
            )));
        }
        if self.genre_matches == 0 {
            return Err(Error::InvalidConfig("genre_matches must be >= 1".into()));
        }
        Ok(())
    }

    fn history_len(&self) -> usize {
        ((self.history_secs * 1000.0 / self.update_interval_ms).ceil() as usize).max(1)
    }
}

/// One pole of a dimension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(
    feature = "serialization",
    derive(serde::Serialize, serde::Deserialize)
)]
pub enum Emotion {
    Joy,
    Sadness,
    Tension,
    Release,
    Energy,
    Calm,
    Warmth,
    Coldness,
}

/// A bipolar emotional axis, named after its upper pole.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(
    feature = "serialization",
    derive(serde::Serialize, serde::Deserialize)
)]
pub enum Dimension {
    Joy,
    Tension,
    Energy,
    Warmth,
}

impl Dimension {
    pub const ALL: [Self; 4] = [Self::Joy, Self::Tension, Self::Energy, Self::Warmth];

    /// `(upper, lower)` poles.
    pub fn poles(self) -> (Emotion, Emotion) {
        match self {
            Self::Joy => (Emotion::Joy, Emotion::Sadness),
            Self::Tension => (Emotion::Tension, Emotion::Release),
            Self::Energy => (Emotion::Energy, Emotion::Calm),
            Self::Warmth => (Emotion::Warmth, Emotion::Coldness),
        }
    }
}

/// Value per dimension in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(
    feature = "serialization",
    derive(serde::Serialize, serde::Deserialize)
)]
pub struct EmotionalProfile {
    pub joy: f32,
    pub tension: f32,
    pub energy: f32,
    pub warmth: f32,
}

impl Default for EmotionalProfile {
    fn default() -> Self {
        Self::uniform(NEUTRAL)
    }
}

impl EmotionalProfile {
    pub const fn new(joy: f32, tension: f32, energy: f32, warmth: f32) -> Self {
        Self {
            joy,
            tension,
            energy,
            warmth,
        }
    }

    pub const fn uniform(value: f32) -> Self {
        Self::new(value, value, value, value)
    }

    /// Value of one dimension in `[0, 1]`.
    pub fn get(&self, dimension: Dimension) -> f32 {
        match dimension {
            Dimension::Joy => self.joy,
            Dimension::Tension => self.tension,
            Dimension::Energy => self.energy,
            Dimension::Warmth => self.warmth,
        }
    }

    fn get_mut(&mut self, dimension: Dimension) -> &mut f32 {
        match dimension {
            Dimension::Joy => &mut self.joy,
            Dimension::Tension => &mut self.tension,
            Dimension::Energy => &mut self.energy,
            Dimension::Warmth => &mut self.warmth,
        }
    }

    /// `1 - RMS difference`, so identical profiles score 1.
    pub fn similarity(&self, other: &Self) -> f32 {
        let mean_sq = Dimension::ALL
            .iter()
            .map(|&d| (self.get(d) - other.get(d)).powi(2))
            .sum::<f32>()
            / Dimension::ALL.len() as f32;
        1.0 - mean_sq.sqrt()
    }

    /// Emotions ordered by distance from neutral, strongest first.
    pub fn ranked(&self) -> [EmotionReading; 4] {
        let mut readings = Dimension::ALL.map(|d| {
            let value = self.get(d);
            let (upper, lower) = d.poles();
            EmotionReading {
                emotion: if value > NEUTRAL { upper } else { lower },
                intensity: (value - NEUTRAL).abs() * 2.0,
            }
        });
        readings.sort_by(|a, b| b.intensity.total_cmp(&a.intensity));
        readings
    }
}

/// How strongly each range is associated with each dimension.
pub fn emotional_weight(range: FrequencyRange) -> EmotionalProfile {
    match range {
        FrequencyRange::SubBass => EmotionalProfile::new(0.3, 0.7, 0.9, 0.6),
        FrequencyRange::Bass => EmotionalProfile::new(0.4, 0.5, 0.8, 0.7),
        FrequencyRange::LowMids => EmotionalProfile::new(0.6, 0.4, 0.6, 0.9),
        FrequencyRange::Mids => EmotionalProfile::new(0.7, 0.5, 0.5, 0.8),
        FrequencyRange::UpperMids => EmotionalProfile::new(0.8, 0.6, 0.7, 0.5),
        FrequencyRange::Presence => EmotionalProfile::new(0.9, 0.8, 0.7, 0.4),
        FrequencyRange::Air => EmotionalProfile::new(0.6, 0.7, 0.5, 0.3),
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(
    feature = "serialization",
    derive(serde::Serialize, serde::Deserialize)
)]
pub struct EmotionReading {
    pub emotion: Emotion,
    /// Distance from neutral scaled to `[0, 1]`.
    pub intensity: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(
    feature = "serialization",
    derive(serde::Serialize, serde::Deserialize)
)]
pub enum ArcDirection {
    Rising,
    Falling,
}

/// A dimension moving steadily across the narrative.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(
    feature = "serialization",
    derive(serde::Serialize, serde::Deserialize)
)]
pub struct EmotionalArc {
    pub dimension: Dimension,
    pub direction: ArcDirection,
    /// Absolute slope per snapshot.
    pub magnitude: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(
    feature = "serialization",
    derive(serde::Serialize, serde::Deserialize)
)]
pub enum Genre {
    Classical,
    Jazz,
    Rock,
    Electronic,
    Ambient,
    Pop,
    HipHop,
}

impl Genre {
    pub const ALL: [Self; 7] = [
        Self::Classical,
        Self::Jazz,
        Self::Rock,
        Self::Electronic,
        Self::Ambient,
        Self::Pop,
        Self::HipHop,
    ];

    /// Reference profile of the genre.
    pub fn profile(self) -> EmotionalProfile {
        match self {
            Self::Classical => EmotionalProfile::new(0.6, 0.4, 0.4, 0.7),
            Self::Jazz => EmotionalProfile::new(0.7, 0.6, 0.6, 0.8),
            Self::Rock => EmotionalProfile::new(0.6, 0.7, 0.8, 0.6),
            Self::Electronic => EmotionalProfile::new(0.7, 0.6, 0.8, 0.4),
            Self::Ambient => EmotionalProfile::new(0.5, 0.3, 0.2, 0.6),
            Self::Pop => EmotionalProfile::new(0.8, 0.5, 0.7, 0.6),
            Self::HipHop => EmotionalProfile::new(0.6, 0.6, 0.8, 0.5),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(
    feature = "serialization",
    derive(serde::Serialize, serde::Deserialize)
)]
pub struct GenreMatch {
    pub genre: Genre,
    /// `1 - RMS profile difference`.
    pub similarity: f32,
}

/// The `count` genres closest to `profile`, best first.
pub fn match_genres(profile: &EmotionalProfile, count: usize) -> Vec<GenreMatch> {
    let mut matches: Vec<GenreMatch> = Genre::ALL
        .iter()
        .map(|&genre| GenreMatch {
            genre,
            similarity: profile.similarity(&genre.profile()),
        })
        .collect();
    matches.sort_by(|a, b| b.similarity.total_cmp(&a.similarity));
    matches.truncate(count);
    matches
}

/// Snapshot recorded every `narrative_interval` updates.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(
    feature = "serialization",
    derive(serde::Serialize, serde::Deserialize)
)]
pub struct NarrativeEntry {
    pub timestamp: f64,
    pub dominant: EmotionReading,
    pub secondary: EmotionReading,
    pub profile: EmotionalProfile,
}

/// Scalar block features the dimensions are built from.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct EmotionFeatures {
    /// Hz.
    pub spectral_centroid: f32,
    pub spectral_flux: f32,
    /// Stereo correlation mapped to `[0, 1]`.
    pub harmonic_ratio: f32,
    pub rhythmic_intensity: f32,
    /// dB.
    pub dynamic_range: f32,
    pub transient_density: f32,
}

impl EmotionFeatures {
    /// Features from one block's metrics.
    pub fn from_block(metrics: &BlockMetrics) -> Self {
        Self {
            spectral_centroid: metrics.spectral_centroid,
            spectral_flux: metrics.spectral_flux,
            harmonic_ratio: (metrics.stereo.correlation + 1.0) / 2.0,
            rhythmic_intensity: metrics.dynamics.rhythmic_intensity,
            dynamic_range: metrics.dynamics.dynamic_range_db,
            transient_density: metrics.dynamics.transient_density,
        }
    }

    fn sanitized(&self) -> Self {
        Self {
            spectral_centroid: finite_or(self.spectral_centroid, 0.0),
            spectral_flux: finite_or(self.spectral_flux, 0.0),
            harmonic_ratio: sanitize(self.harmonic_ratio, 0.0, 1.0, NEUTRAL),
            rhythmic_intensity: finite_or(self.rhythmic_intensity, 0.0),
            dynamic_range: finite_or(self.dynamic_range, 0.0),
            transient_density: sanitize(self.transient_density, 0.0, 1.0, 0.0),
        }
    }
}

/// Current emotional state.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(
    feature = "serialization",
    derive(serde::Serialize, serde::Deserialize)
)]
pub struct EmotionReport {
    pub profile: EmotionalProfile,
    /// `None` until the first update.
    pub dominant: Option<EmotionReading>,
    pub secondary: Option<EmotionReading>,
    /// Strongest arcs, largest first. Empty until three snapshots exist.
    pub arcs: Vec<EmotionalArc>,
    /// Closest genres, best first. Empty until the first update.
    pub genres: Vec<GenreMatch>,
}

fn normalize(value: f32, min: f32, max: f32) -> f32 {
    ((value - min) / (max - min)).clamp(0.0, 1.0)
}

/// Raw dimension targets before sensitivity and smoothing.
fn targets(f: &EmotionFeatures, ranges: &[f32; 7]) -> EmotionalProfile {
    let r = |range: FrequencyRange| ranges[range.index()];
    use FrequencyRange::*;

    let joy = NEUTRAL
        + (normalize(f.spectral_centroid, 500.0, 4000.0) - 0.5) * 0.3
        + (r(UpperMids) + r(Presence) - r(Bass) - r(LowMids)) * 0.3
        + (f.transient_density - 0.5) * 0.2
        + (f.harmonic_ratio - 0.5) * 0.2;
    let tension = NEUTRAL
        + ((1.0 - f.harmonic_ratio) - 0.5) * 0.3
        + (f.spectral_flux - 0.5) * 0.3
        + (r(Presence) + r(Air) - r(Mids)) * 0.2
        + ((1.0 - f.dynamic_range / 10.0) - 0.5) * 0.2;
    let energy = NEUTRAL
        + (f.rhythmic_intensity - 0.5) * 0.3
        + (f.transient_density - 0.5) * 0.2
        + (r(Bass) + r(SubBass) - r(Mids)) * 0.3
        + (f.spectral_flux - 0.5) * 0.2;
    let warmth = NEUTRAL
        + (r(LowMids) + r(Mids) - r(Presence) - r(Air)) * 0.4
        + (f.harmonic_ratio - 0.5) * 0.3
        + ((1.0 - f.spectral_centroid / 3000.0) - 0.5) * 0.3;

    EmotionalProfile::new(joy, tension, energy, warmth)
}

/// Streaming emotional analysis over band energies and block features.
#[derive(Debug, Clone)]
pub struct EmotionAnalyzer {
    config: EmotionConfig,
    ranges: Vec<FrequencyRange>,
    energies: Vec<f32>,
    profile: EmotionalProfile,
    last_update: Option<f64>,
    updates_since_snapshot: usize,
    history: VecDeque<(f64, EmotionalProfile)>,
    narrative: VecDeque<NarrativeEntry>,
    report: EmotionReport,
}

impl EmotionAnalyzer {
    /// Analyzer at a neutral profile.
    pub fn new(layout: &BandLayout, config: EmotionConfig) -> Result<Self> {
        config.validate()?;
        let ranges: Vec<FrequencyRange> = layout
            .bands()
            .iter()
            .map(|b| FrequencyRange::of(b.center_freq))
            .collect();
        Ok(Self {
            energies: vec![0.0; ranges.len()],
            ranges,
            profile: EmotionalProfile::default(),
            last_update: None,
            updates_since_snapshot: 0,
            history: VecDeque::new(),
            narrative: VecDeque::new(),
            report: EmotionReport::default(),
            config,
        })
    }

    pub fn config(&self) -> &EmotionConfig {
        &self.config
    }

    /// Current profile.
    pub fn profile(&self) -> EmotionalProfile {
        self.profile
    }

    /// `(timestamp, profile)` per update, oldest first.
    pub fn history(&self) -> impl ExactSizeIterator<Item = &(f64, EmotionalProfile)> {
        self.history.iter()
    }

    /// Narrative snapshots, oldest first.
    pub fn narrative(&self) -> impl ExactSizeIterator<Item = &NarrativeEntry> {
        self.narrative.iter()
    }

    /// Fold in one block. `timestamp` is the block time in ms.
    pub fn process(
        &mut self,
        features: &EmotionFeatures,
        band_energies: &[f32],
        timestamp: f64,
    ) -> EmotionReport {
        let keep = self.config.band_smoothing;
        for (energy, &value) in self.energies.iter_mut().zip(band_energies) {
            *energy = *energy * keep + sanitize(value, 0.0, 1.0, 0.0) * (1.0 - keep);
        }

        let due = match self.last_update {
            None => true,
            // Time going backwards means a new stream.
            Some(last) => timestamp < last || timestamp - last >= self.config.update_interval_ms,
        };
        if due {
            self.update(features, timestamp);
        }
        self.report.clone()
    }

    /// Back to a neutral profile with no history.
    pub fn reset(&mut self) {
        self.energies.iter_mut().for_each(|e| *e = 0.0);
        self.profile = EmotionalProfile::default();
        self.last_update = None;
        self.updates_since_snapshot = 0;
        self.history.clear();
        self.narrative.clear();
        self.report = EmotionReport::default();
    }

    fn update(&mut self, features: &EmotionFeatures, timestamp: f64) {
        self.last_update = Some(timestamp);

        let mut ranges = [0.0f32; 7];
        let mut counted = 0usize;
        for (&energy, &range) in self.energies.iter().zip(&self.ranges) {
            if energy > SIGNIFICANT_ENERGY {
                ranges[range.index()] += energy;
                counted += 1;
            }
        }
        let norm = counted.max(1) as f32;
        ranges.iter_mut().for_each(|r| *r /= norm);

        let targets = targets(&features.sanitized(), &ranges);
        let (sensitivity, transition) = (self.config.sensitivity, self.config.transition);
        for dimension in Dimension::ALL {
            let target = NEUTRAL + (targets.get(dimension) - NEUTRAL) * sensitivity;
            let value = self.profile.get_mut(dimension);
            *value = sanitize(
                *value * (1.0 - transition) + target * transition,
                0.0,
                1.0,
                NEUTRAL,
            );
        }

        self.history.push_back((timestamp, self.profile));
        while self.history.len() > self.config.history_len() {
            self.history.pop_front();
        }

        let [dominant, secondary, ..] = self.profile.ranked();
        self.report.profile = self.profile;
        self.report.dominant = Some(dominant);
        self.report.secondary = Some(secondary);
        self.report.genres = match_genres(&self.profile, self.config.genre_matches);

        self.updates_since_snapshot += 1;
        if self.updates_since_snapshot >= self.config.narrative_interval {
            self.updates_since_snapshot = 0;
            self.narrative.push_back(NarrativeEntry {
                timestamp,
                dominant,
                secondary,
                profile: self.profile,
            });
            if self.narrative.len() > self.config.narrative_len {
                self.narrative.pop_front();
            }
            self.report.arcs = self.arcs();
        }
    }

    fn arcs(&self) -> Vec<EmotionalArc> {
        let n = self.narrative.len();
        if n < 3 {
            return Vec::new();
        }
        let mut arcs: Vec<EmotionalArc> = Dimension::ALL
            .iter()
            .filter_map(|&dimension| {
                let values: Vec<f32> = self.narrative.iter().map(|e| e.profile.get(dimension)).collect();
                // linear_trend spans the whole window; convert to per snapshot.
                let slope = linear_trend(&values) / (n - 1) as f32;
                (slope.abs() > self.config.arc_threshold).then(|| EmotionalArc {
                    dimension,
                    direction: if slope > 0.0 {
                        ArcDirection::Rising
                    } else {
                        ArcDirection::Falling
                    },
                    magnitude: slope.abs(),
                })
            })
            .collect();
        arcs.sort_by(|a, b| b.magnitude.total_cmp(&a.magnitude));
        arcs.truncate(MAX_ARCS);
        arcs
    }
}
