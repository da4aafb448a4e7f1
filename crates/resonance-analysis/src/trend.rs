//! Band trend classification and whole-spectrum shape measures.
//!
//! Works on the smoothed histories kept by [`BandEnergyTracker`]. A band
//! with fewer than `window` history samples gets no classification.

use std::collections::VecDeque;

use crate::error::{AnalysisWarning, HistoryKind};
use crate::math::{linear_trend, sanitize, std_dev};
use crate::tracker::BandEnergyTracker;
use crate::{Error, Result};

const EMERGING_TREND: f32 = 0.1;
const EMERGING_ENERGY: f32 = 0.2;
const FADING_TREND: f32 = -0.1;
const FADING_PRIOR_ENERGY: f32 = 0.4;
const STABLE_TREND: f32 = 0.05;
const STABLE_VOLATILITY: f32 = 0.1;
const STABLE_ENERGY: f32 = 0.3;
const DENSITY_ENERGY: f32 = 0.1;
const FLUIDITY_SCALE: f32 = 10.0;

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(
    feature = "serialization",
    derive(serde::Serialize, serde::Deserialize)
)]
pub struct TrendConfig {
    /// History samples used for trend and volatility.
    pub window: usize,
    /// Entropy values kept for fluidity.
    pub entropy_history: usize,
    /// Entropy values needed before fluidity is reported.
    pub min_entropy_history: usize,
}

impl Default for TrendConfig {
    fn default() -> Self {
        Self {
            window: 10,
            entropy_history: 30,
            min_entropy_history: 5,
        }
    }
}

impl TrendConfig {
    /// Check window and thresholds.
    pub fn validate(&self) -> Result<()> {
        if self.window < 2 {
            return Err(Error::InvalidConfig(format!(
                "trend window must be >= 2, got {}",
                self.window
            )));
        }
        if self.min_entropy_history < 2 || self.entropy_history < self.min_entropy_history {
            return Err(Error::InvalidConfig(format!(
                "entropy history {} must be >= its minimum {} (and the minimum >= 2)",
                self.entropy_history, self.min_entropy_history
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(
    feature = "serialization",
    derive(serde::Serialize, serde::Deserialize)
)]
pub enum Classification {
    Emerging,
    Fading,
    Stable,
    Unclassified,
}

/// Trend of one band.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(
    feature = "serialization",
    derive(serde::Serialize, serde::Deserialize)
)]
pub struct BandTrend {
    pub band: usize,
    /// Fitted change in energy across the window.
    pub trend: f32,
    pub volatility: f32,
    pub energy: f32,
    /// `None` while the band has too little history.
    pub classification: Option<Classification>,
}

/// Whole-spectrum view of where energy is moving.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(
    feature = "serialization",
    derive(serde::Serialize, serde::Deserialize)
)]
pub struct MigrationReport {
    pub trends: Vec<BandTrend>,
    pub emerging: Vec<usize>,
    pub fading: Vec<usize>,
    pub stable: Vec<usize>,
    /// Normalized Shannon entropy of the current energies, `[0, 1]`.
    pub entropy: f32,
    /// How quickly the entropy changes, `[0, 1]`.
    pub fluidity: f32,
    /// Fraction of bands with meaningful energy.
    pub density: f32,
    /// Energy-weighted mean band index.
    pub center_of_mass: f32,
    pub warnings: Vec<AnalysisWarning>,
}

/// Classify a band from its trend window and the samples before the current one.
///
/// `prior` holds the samples preceding the current value, newest last.
pub fn classify(trend: f32, volatility: f32, energy: f32, prior: &[f32]) -> Classification {
    if trend > EMERGING_TREND && energy > EMERGING_ENERGY {
        Classification::Emerging
    } else if trend < FADING_TREND && prior.iter().any(|&e| e > FADING_PRIOR_ENERGY) {
        Classification::Fading
    } else if trend.abs() < STABLE_TREND && volatility < STABLE_VOLATILITY && energy > STABLE_ENERGY
    {
        Classification::Stable
    } else {
        Classification::Unclassified
    }
}

/// Normalized Shannon entropy (log2) of a spectrum, 0 when it is empty.
pub fn spectral_entropy(energies: &[f32]) -> f32 {
    if energies.len() < 2 {
        return 0.0;
    }
    let total: f64 = energies.iter().map(|&e| e.max(0.0) as f64).sum();
    if !(total.is_finite() && total > 0.0) {
        return 0.0;
    }
    let entropy: f64 = energies
        .iter()
        .map(|&e| e.max(0.0) as f64 / total)
        .filter(|&p| p > 0.0)
        .map(|p| -p * p.log2())
        .sum();
    sanitize(
        (entropy / (energies.len() as f64).log2()) as f32,
        0.0,
        1.0,
        0.0,
    )
}

/// Fraction of bands above the density threshold.
pub fn spectral_density(energies: &[f32]) -> f32 {
    if energies.is_empty() {
        return 0.0;
    }
    energies.iter().filter(|&&e| e > DENSITY_ENERGY).count() as f32 / energies.len() as f32
}

/// Energy-weighted mean band index; the middle band for an empty spectrum.
pub fn center_of_mass(energies: &[f32]) -> f32 {
    let total: f64 = energies.iter().map(|&e| e.max(0.0) as f64).sum();
    if !(total.is_finite() && total > 0.0) {
        return energies.len() as f32 / 2.0;
    }
    let weighted: f64 = energies
        .iter()
        .enumerate()
        .map(|(i, &e)| i as f64 * e.max(0.0) as f64)
        .sum();
    (weighted / total) as f32
}

/// Trend and classification engine.
#[derive(Debug, Clone)]
pub struct TrendEngine {
    config: TrendConfig,
    entropy_history: VecDeque<f32>,
}

impl TrendEngine {
    pub fn new(config: TrendConfig) -> Result<Self> {
        config.validate()?;
        let entropy_history = VecDeque::with_capacity(config.entropy_history);
        Ok(Self {
            config,
            entropy_history,
        })
    }

    pub fn config(&self) -> &TrendConfig {
        &self.config
    }

    /// Analyze the tracker's current state and record this frame's entropy.
    pub fn analyze(&mut self, tracker: &BandEnergyTracker) -> MigrationReport {
        let window = self.config.window;
        let mut report = MigrationReport::default();

        let have = tracker.history_len();
        if have < window {
            report.warnings.push(AnalysisWarning::InsufficientHistory {
                analysis: HistoryKind::Trend,
                have,
                need: window,
            });
        }

        for (band, state) in tracker.bands().iter().enumerate() {
            let energy = state.energy();
            if state.history().len() < window {
                report.trends.push(BandTrend {
                    band,
                    trend: 0.0,
                    volatility: 0.0,
                    energy,
                    classification: None,
                });
                continue;
            }

            let recent: Vec<f32> = state.recent(window).collect();
            let trend = linear_trend(&recent);
            let volatility = std_dev(&recent);

            // up to `window` samples before the current one
            let history = state.history();
            let end = history.len() - 1;
            let start = end.saturating_sub(window);
            let prior: Vec<f32> = history.range(start..end).copied().collect();

            let classification = classify(trend, volatility, energy, &prior);
            match classification {
                Classification::Emerging => report.emerging.push(band),
                Classification::Fading => report.fading.push(band),
                Classification::Stable => report.stable.push(band),
                Classification::Unclassified => {}
            }
            report.trends.push(BandTrend {
                band,
                trend,
                volatility,
                energy,
                classification: Some(classification),
            });
        }

        let energies = tracker.energies();
        report.entropy = spectral_entropy(&energies);
        report.density = spectral_density(&energies);
        report.center_of_mass = center_of_mass(&energies);

        if self.entropy_history.len() == self.config.entropy_history {
            self.entropy_history.pop_front();
        }
        self.entropy_history.push_back(report.entropy);
        report.fluidity = self.fluidity();

        report
    }

    fn fluidity(&self) -> f32 {
        if self.entropy_history.len() < self.config.min_entropy_history {
            return 0.0;
        }
        let deltas: Vec<f32> = self
            .entropy_history
            .iter()
            .zip(self.entropy_history.iter().skip(1))
            .map(|(a, b)| (b - a).abs())
            .collect();
        let mean = deltas.iter().sum::<f32>() / deltas.len() as f32;
        sanitize(mean * FLUIDITY_SCALE, 0.0, 1.0, 0.0)
    }

    /// Forget the previous analysis.
    pub fn reset(&mut self) {
        self.entropy_history.clear();
    }
}
