//! Cross-band relationship discovery
//!
//! Correlates the energy histories of every band pair, classifies each pair
//! by correlation and frequency ratio, and smooths the resulting matrix over
//! the last `history_len` cycles.

use std::collections::VecDeque;

use crate::error::{AnalysisWarning, HistoryKind};
use crate::math::{is_near_integer, pearson, sanitize};
use crate::matrix::{MatrixHistory, SymmetricMatrix};
use crate::{Error, Result};

/// Ratio tolerance for a harmonic pair.
const HARMONIC_TOLERANCE: f32 = 0.05;
/// Semitone tolerance for a musical-interval pair.
const MUSICAL_TOLERANCE: f32 = 0.1;
/// Energy both bands need for a pair to count as a connection.
const CONNECTION_ENERGY: f32 = 0.1;

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(
    feature = "serialization",
    derive(serde::Serialize, serde::Deserialize)
)]
pub struct RelationConfig {
    /// Energy frames and matrices kept.
    pub history_len: usize,
    /// |c| above which a pair is active.
    pub interaction_threshold: f32,
    /// Active pairs below this correlation are conflicting.
    pub conflict_threshold: f32,
    /// Age weight base for matrix smoothing.
    pub smoothing_base: f32,
    /// Matrices needed before cell trends are reported.
    pub min_trend_history: usize,
}

impl Default for RelationConfig {
    fn default() -> Self {
        Self {
            history_len: 30,
            interaction_threshold: 0.2,
            conflict_threshold: -0.4,
            smoothing_base: 1.5,
            min_trend_history: 5,
        }
    }
}

impl RelationConfig {
    /// Check thresholds and window sizes.
    pub fn validate(&self) -> Result<()> {
        if self.history_len < 2 {
            return Err(Error::InvalidConfig(format!(
                "relationship history_len must be >= 2, got {}",
                self.history_len
            )));
        }
        if !(0.0..=1.0).contains(&self.interaction_threshold) {
            return Err(Error::InvalidConfig(format!(
                "interaction threshold must be in [0, 1], got {}",
                self.interaction_threshold
            )));
        }
        if !(-1.0..=0.0).contains(&self.conflict_threshold) {
            return Err(Error::InvalidConfig(format!(
                "conflict threshold must be in [-1, 0], got {}",
                self.conflict_threshold
            )));
        }
        if !self.smoothing_base.is_finite() || self.smoothing_base < 1.0 {
            return Err(Error::InvalidConfig(format!(
                "smoothing base must be >= 1, got {}",
                self.smoothing_base
            )));
        }
        if self.min_trend_history < 2 {
            return Err(Error::InvalidConfig(
                "min_trend_history must be >= 2".into(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(
    feature = "serialization",
    derive(serde::Serialize, serde::Deserialize)
)]
pub enum RelationshipType {
    /// Strong positive, integer frequency ratio.
    Harmonic,
    /// Strong positive, ratio close to a semitone interval.
    Musical,
    /// Strong positive, no simple ratio.
    Synergistic,
    Cooperative,
    Competing,
    Conflicting,
    Neutral,
}

impl RelationshipType {
    /// Classify a pair from its correlation and frequency ratio `f_j / f_i`.
    pub fn classify(correlation: f32, ratio: f32) -> Self {
        if correlation > 0.6 {
            if is_harmonic_ratio(ratio) {
                Self::Harmonic
            } else if is_musical_ratio(ratio) {
                Self::Musical
            } else {
                Self::Synergistic
            }
        } else if correlation > 0.3 {
            Self::Cooperative
        } else if correlation < -0.6 {
            Self::Conflicting
        } else if correlation < -0.3 {
            Self::Competing
        } else {
            Self::Neutral
        }
    }
}

/// Integer ratio in either direction.
pub fn is_harmonic_ratio(ratio: f32) -> bool {
    if !(ratio.is_finite() && ratio > 0.0) {
        return false;
    }
    is_near_integer(ratio, HARMONIC_TOLERANCE) || is_near_integer(1.0 / ratio, HARMONIC_TOLERANCE)
}

/// Ratio within a tenth of a semitone of an equal-tempered interval.
pub fn is_musical_ratio(ratio: f32) -> bool {
    ratio.is_finite() && ratio > 0.0 && is_near_integer(12.0 * ratio.log2(), MUSICAL_TOLERANCE)
}

/// One matrix cell.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(
    feature = "serialization",
    derive(serde::Serialize, serde::Deserialize)
)]
pub struct Relationship {
    pub correlation: f32,
    pub kind: RelationshipType,
    /// Change in correlation per cycle.
    pub trend: f32,
}

impl Default for Relationship {
    fn default() -> Self {
        Self {
            correlation: 0.0,
            kind: RelationshipType::Neutral,
            trend: 0.0,
        }
    }
}

/// Band-pair relationships. The diagonal holds each band's self-correlation.
pub type RelationshipMatrix = SymmetricMatrix<Relationship>;

/// An active pair, `a < b`.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(
    feature = "serialization",
    derive(serde::Serialize, serde::Deserialize)
)]
pub struct BandPair {
    pub a: usize,
    pub b: usize,
    pub relationship: Relationship,
}

/// Active pair between two audible bands.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(
    feature = "serialization",
    derive(serde::Serialize, serde::Deserialize)
)]
pub struct Connection {
    pub a: usize,
    pub b: usize,
    pub kind: RelationshipType,
    /// |c| scaled by the weaker band's energy.
    pub strength: f32,
}

#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(
    feature = "serialization",
    derive(serde::Serialize, serde::Deserialize)
)]
pub struct RelationshipReport {
    pub matrix: RelationshipMatrix,
    pub active: Vec<BandPair>,
    pub conflicting: Vec<BandPair>,
    pub connections: Vec<Connection>,
    pub warnings: Vec<AnalysisWarning>,
}

/// Pairwise band relationship engine.
#[derive(Debug, Clone)]
pub struct RelationshipEngine {
    config: RelationConfig,
    centers: Vec<f32>,
    /// Per band, its recent normalized energies.
    series: Vec<VecDeque<f32>>,
    matrices: MatrixHistory,
}

impl RelationshipEngine {
    /// `centers` are the band center frequencies, which fix the band count.
    pub fn new(centers: Vec<f32>, config: RelationConfig) -> Result<Self> {
        config.validate()?;
        if centers.is_empty() {
            return Err(Error::InvalidConfig(
                "relationship engine needs at least one band".into(),
            ));
        }
        let series = centers
            .iter()
            .map(|_| VecDeque::with_capacity(config.history_len))
            .collect();
        let matrices = MatrixHistory::new(config.history_len, config.smoothing_base);
        Ok(Self {
            config,
            centers,
            series,
            matrices,
        })
    }

    pub fn config(&self) -> &RelationConfig {
        &self.config
    }

    pub fn band_count(&self) -> usize {
        self.centers.len()
    }

    /// Frames of energy history currently held.
    pub fn history_len(&self) -> usize {
        self.series.first().map_or(0, VecDeque::len)
    }

    /// Record one frame and recompute the smoothed relationships.
    ///
    /// `energies` are this frame's normalized band energies; `smoothed` are
    /// the tracker's energies used to weight connections.
    pub fn update(&mut self, energies: &[f32], smoothed: &[f32]) -> RelationshipReport {
        let capacity = self.config.history_len;
        for (band, series) in self.series.iter_mut().enumerate() {
            if series.len() == capacity {
                series.pop_front();
            }
            let e = energies.get(band).copied().unwrap_or(0.0);
            series.push_back(sanitize(e, 0.0, 1.0, 0.0));
        }

        let n = self.band_count();
        let have = self.history_len();
        if have < 2 {
            return RelationshipReport {
                matrix: self.neutral_matrix(),
                active: Vec::new(),
                conflicting: Vec::new(),
                connections: Vec::new(),
                warnings: vec![AnalysisWarning::InsufficientHistory {
                    analysis: HistoryKind::Relationships,
                    have,
                    need: 2,
                }],
            };
        }

        let columns: Vec<Vec<f32>> = self
            .series
            .iter()
            .map(|s| s.iter().copied().collect())
            .collect();
        let raw = SymmetricMatrix::from_fn(n, |i, j| {
            if i == j {
                1.0
            } else {
                pearson(&columns[i], &columns[j])
            }
        });
        self.matrices.push(raw);

        let smoothed_matrix = self
            .matrices
            .smoothed()
            .unwrap_or_else(|| SymmetricMatrix::filled(n, 0.0));
        let trends = self.matrices.trends(self.config.min_trend_history);

        let matrix = smoothed_matrix.map(|i, j, &correlation| {
            let trend = trends
                .as_ref()
                .and_then(|t| t.get(i, j).copied())
                .unwrap_or(0.0);
            let kind = if i == j {
                RelationshipType::Neutral
            } else {
                RelationshipType::classify(correlation, self.ratio(j, i))
            };
            Relationship {
                correlation,
                kind,
                trend,
            }
        });

        let active: Vec<BandPair> = matrix
            .pairs()
            .filter(|(_, _, r)| r.correlation.abs() > self.config.interaction_threshold)
            .map(|(a, b, &relationship)| BandPair { a, b, relationship })
            .collect();
        let conflicting = active
            .iter()
            .filter(|p| p.relationship.correlation < self.config.conflict_threshold)
            .copied()
            .collect();
        let connections = active
            .iter()
            .filter_map(|p| {
                let ea = smoothed.get(p.a).copied().unwrap_or(0.0);
                let eb = smoothed.get(p.b).copied().unwrap_or(0.0);
                (ea > CONNECTION_ENERGY && eb > CONNECTION_ENERGY).then(|| Connection {
                    a: p.a,
                    b: p.b,
                    kind: p.relationship.kind,
                    strength: p.relationship.correlation.abs() * ea.min(eb),
                })
            })
            .collect();

        let mut warnings = Vec::new();
        if self.matrices.len() < self.config.min_trend_history {
            warnings.push(AnalysisWarning::InsufficientHistory {
                analysis: HistoryKind::Relationships,
                have: self.matrices.len(),
                need: self.config.min_trend_history,
            });
        }

        tracing::trace!(active = active.len(), "Relationships updated");

        RelationshipReport {
            matrix,
            active,
            conflicting,
            connections,
            warnings,
        }
    }

    fn ratio(&self, high: usize, low: usize) -> f32 {
        let lo = self.centers[low.min(high)];
        let hi = self.centers[high.max(low)];
        if lo > 0.0 {
            hi / lo
        } else {
            0.0
        }
    }

    fn neutral_matrix(&self) -> RelationshipMatrix {
        SymmetricMatrix::from_fn(self.band_count(), |i, j| Relationship {
            correlation: if i == j { 1.0 } else { 0.0 },
            ..Relationship::default()
        })
    }

    /// Drop all history and relationships.
    pub fn reset(&mut self) {
        for series in &mut self.series {
            series.clear();
        }
        self.matrices.clear();
    }
}
