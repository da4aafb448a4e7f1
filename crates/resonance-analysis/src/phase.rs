//! Cross-channel phase coherence per band
//!
//! Each block is windowed and transformed with a complex FFT. Per band the
//! analyzer keeps, over a sliding time window of recent blocks:
//!
//! - the real part of the cross-spectrum `Σ Re(L·R*)` together with the two
//!   channel powers, giving the diagonal coherence
//!   `Σ Re(L·R*) / sqrt(Σ|L|² · Σ|R|²)`;
//! - the band magnitudes `|L_i|` and `|R_i|`, whose Pearson correlations across
//!   frames give the off-diagonal cells
//!   `(corr(|L_i|, |R_j|) + corr(|L_j|, |R_i|)) / 2`.

use std::collections::VecDeque;
use std::sync::Arc;

use rustfft::{num_complex::Complex, Fft, FftPlanner};

use crate::bands::{BandLayout, BinMap};
use crate::block::AudioBlock;
use crate::error::{AnalysisWarning, HistoryKind};
use crate::math::{finite_or, is_near_integer, pearson, sanitize};
use crate::matrix::{MatrixHistory, SymmetricMatrix};
use crate::window::WindowFunction;
use crate::{Error, Result};

/// Ratio tolerance for bands counted in [`PhaseReport::band_coherence`].
const RELATED_RATIO_TOLERANCE: f32 = 0.1;

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(
    feature = "serialization",
    derive(serde::Serialize, serde::Deserialize)
)]
pub struct PhaseConfig {
    /// How far back frames are kept, by block timestamp.
    pub window_ms: f64,
    /// Frames needed before a matrix is computed.
    pub min_frames: usize,
    /// Hard cap on kept frames, independent of timestamps.
    pub max_frames: usize,
    /// Phase matrices kept for smoothing and trends.
    pub history_len: usize,
    /// Matrices needed before the smoothed value replaces the latest one.
    pub min_smoothing_history: usize,
    /// Matrices needed before cell trends are reported.
    pub min_trend_history: usize,
    pub smoothing_base: f32,
    /// Diagonal coherence below which a band is problematic.
    pub problem_threshold: f32,
    pub window: WindowFunction,
}

impl Default for PhaseConfig {
    fn default() -> Self {
        Self {
            window_ms: 2000.0,
            min_frames: 3,
            max_frames: 128,
            history_len: 30,
            min_smoothing_history: 3,
            min_trend_history: 5,
            smoothing_base: 1.5,
            problem_threshold: 0.4,
            window: WindowFunction::Hann,
        }
    }
}

impl PhaseConfig {
    /// Check window, history and FFT size.
    pub fn validate(&self) -> Result<()> {
        if !self.window_ms.is_finite() || self.window_ms <= 0.0 {
            return Err(Error::InvalidConfig(format!(
                "phase window_ms must be positive, got {}",
                self.window_ms
            )));
        }
        if self.min_frames < 2 || self.max_frames < self.min_frames {
            return Err(Error::InvalidConfig(format!(
                "phase frames: need 2 <= min_frames ({}) <= max_frames ({})",
                self.min_frames, self.max_frames
            )));
        }
        if self.history_len == 0 {
            return Err(Error::InvalidConfig("phase history_len must be > 0".into()));
        }
        if self.min_trend_history < 2 {
            return Err(Error::InvalidConfig(
                "phase min_trend_history must be >= 2".into(),
            ));
        }
        if !self.smoothing_base.is_finite() || self.smoothing_base < 1.0 {
            return Err(Error::InvalidConfig(format!(
                "phase smoothing base must be >= 1, got {}",
                self.smoothing_base
            )));
        }
        if !(-1.0..=1.0).contains(&self.problem_threshold) {
            return Err(Error::InvalidConfig(format!(
                "problem threshold must be in [-1, 1], got {}",
                self.problem_threshold
            )));
        }
        Ok(())
    }
}

/// A band whose channels disagree in phase.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(
    feature = "serialization",
    derive(serde::Serialize, serde::Deserialize)
)]
pub struct ProblemRegion {
    pub band: usize,
    pub center_freq: f32,
    pub coherence: f32,
}

#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(
    feature = "serialization",
    derive(serde::Serialize, serde::Deserialize)
)]
pub struct PhaseReport {
    /// `None` until enough frames have been seen.
    pub matrix: Option<SymmetricMatrix<f32>>,
    pub trends: Option<SymmetricMatrix<f32>>,
    /// Mean diagonal coherence.
    pub overall_coherence: f32,
    pub band_coherence: Vec<f32>,
    pub problem_regions: Vec<ProblemRegion>,
    pub warnings: Vec<AnalysisWarning>,
}

/// Per-band accumulators for one block.
#[derive(Debug, Clone)]
struct Frame {
    timestamp: f64,
    cross: Vec<f64>,
    power_left: Vec<f64>,
    power_right: Vec<f64>,
    magnitude_left: Vec<f32>,
    magnitude_right: Vec<f32>,
}

impl Frame {
    fn has_energy(&self, band: usize) -> bool {
        self.power_left[band] > 0.0 && self.power_right[band] > 0.0
    }
}

/// Cached FFT plan and scratch buffers for one FFT size.
struct Transform {
    size: usize,
    window: Vec<f32>,
    fft: Arc<dyn Fft<f32>>,
    left: Vec<Complex<f32>>,
    right: Vec<Complex<f32>>,
    scratch: Vec<Complex<f32>>,
}

impl core::fmt::Debug for Transform {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Transform").field("size", &self.size).finish()
    }
}

/// Streaming phase coherence analyzer.
#[derive(Debug)]
pub struct PhaseCoherenceAnalyzer {
    config: PhaseConfig,
    centers: Vec<f32>,
    transform: Option<Transform>,
    bin_map: Option<BinMap>,
    frames: VecDeque<Frame>,
    history: MatrixHistory,
    /// `(sample_rate, fft_size)` of the frames and matrices held.
    geometry: Option<(f32, usize)>,
}

impl PhaseCoherenceAnalyzer {
    pub fn new(layout: &BandLayout, config: PhaseConfig) -> Result<Self> {
        config.validate()?;
        let centers = layout.bands().iter().map(|b| b.center_freq).collect();
        let history = MatrixHistory::new(config.history_len, config.smoothing_base);
        Ok(Self {
            config,
            centers,
            transform: None,
            bin_map: None,
            frames: VecDeque::new(),
            history,
            geometry: None,
        })
    }

    pub fn config(&self) -> &PhaseConfig {
        &self.config
    }

    /// Frames inside the current time window.
    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    /// Smoothed matrices currently held.
    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    /// Analyze a validated block.
    pub fn process(&mut self, block: &AudioBlock, layout: &BandLayout) -> PhaseReport {
        // FFT magnitudes scale with the transform size, so frames and
        // matrices from another geometry cannot be mixed.
        let geometry = (block.sample_rate, block.fft_size);
        if self.geometry.is_some_and(|g| g != geometry) {
            tracing::debug!(
                sample_rate = block.sample_rate,
                fft_size = block.fft_size,
                "Block geometry changed, clearing phase history"
            );
            self.frames.clear();
            self.history.clear();
        }
        self.geometry = Some(geometry);

        let frame = self.transform_block(block, layout);
        let now = frame.timestamp;
        self.frames.push_back(frame);
        while self.frames.len() > self.config.max_frames
            || self
                .frames
                .front()
                .is_some_and(|f| now - f.timestamp > self.config.window_ms)
        {
            self.frames.pop_front();
        }

        let mut report = PhaseReport::default();
        if self.frames.len() < self.config.min_frames {
            report.warnings.push(AnalysisWarning::InsufficientHistory {
                analysis: HistoryKind::PhaseCoherence,
                have: self.frames.len(),
                need: self.config.min_frames,
            });
            return report;
        }

        self.history.push(self.coherence_matrix());
        let matrix = if self.history.len() >= self.config.min_smoothing_history {
            self.history.smoothed()
        } else {
            self.history.latest().cloned()
        };
        let Some(matrix) = matrix else {
            return report;
        };

        let n = matrix.size();
        let diagonal: Vec<f32> = matrix.diagonal().copied().collect();
        report.overall_coherence = if n > 0 {
            diagonal.iter().sum::<f32>() / n as f32
        } else {
            0.0
        };

        report.band_coherence = (0..n)
            .map(|i| {
                let mut sum = diagonal[i];
                let mut count = 1usize;
                for j in (0..n).filter(|&j| j != i) {
                    let ratio = self.centers[j] / self.centers[i];
                    if is_near_integer(ratio, RELATED_RATIO_TOLERANCE) {
                        sum += matrix.get(i, j).copied().unwrap_or(0.0);
                        count += 1;
                    }
                }
                sum / count as f32
            })
            .collect();

        // Silent bands have nothing to disagree about.
        let audible: Vec<bool> = (0..n)
            .map(|i| self.frames.iter().any(|f| f.has_energy(i)))
            .collect();
        report.problem_regions = diagonal
            .iter()
            .enumerate()
            .filter(|&(i, &c)| audible[i] && c < self.config.problem_threshold)
            .map(|(band, &coherence)| ProblemRegion {
                band,
                center_freq: self.centers[band],
                coherence,
            })
            .collect();

        report.trends = self.history.trends(self.config.min_trend_history);
        report.matrix = Some(matrix);
        report
    }

    fn transform_block(&mut self, block: &AudioBlock, layout: &BandLayout) -> Frame {
        let size = block.fft_size;
        let transform = match self.transform.take() {
            Some(t) if t.size == size => t,
            _ => {
                // FftPlanner is not Send, so only the plan is kept.
                let fft = FftPlanner::new().plan_fft_forward(size);
                let scratch = vec![Complex::default(); fft.get_inplace_scratch_len()];
                Transform {
                    size,
                    window: self.config.window.coefficients(size),
                    fft,
                    left: vec![Complex::default(); size],
                    right: vec![Complex::default(); size],
                    scratch,
                }
            }
        };
        let mut t = transform;

        for (slot, (&x, &w)) in t.left.iter_mut().zip(block.time_left.iter().zip(&t.window)) {
            *slot = Complex::new(finite_or(x, 0.0) * w, 0.0);
        }
        for (slot, (&x, &w)) in t.right.iter_mut().zip(block.time_right.iter().zip(&t.window)) {
            *slot = Complex::new(finite_or(x, 0.0) * w, 0.0);
        }
        t.fft.process_with_scratch(&mut t.left, &mut t.scratch);
        t.fft.process_with_scratch(&mut t.right, &mut t.scratch);

        let bin_map = match self.bin_map.take() {
            Some(map) if map.matches(block.sample_rate, size) => map,
            _ => layout.bin_map(block.sample_rate, size),
        };

        let bands = bin_map.band_count();
        let mut frame = Frame {
            timestamp: block.timestamp,
            cross: vec![0.0; bands],
            power_left: vec![0.0; bands],
            power_right: vec![0.0; bands],
            magnitude_left: vec![0.0; bands],
            magnitude_right: vec![0.0; bands],
        };
        for (bin, band) in bin_map.assigned() {
            let l = t.left[bin];
            let r = t.right[bin];
            frame.cross[band] += (l * r.conj()).re as f64;
            frame.power_left[band] += l.norm_sqr() as f64;
            frame.power_right[band] += r.norm_sqr() as f64;
            frame.magnitude_left[band] += l.norm();
            frame.magnitude_right[band] += r.norm();
        }

        self.bin_map = Some(bin_map);
        self.transform = Some(t);
        frame
    }

    fn coherence_matrix(&self) -> SymmetricMatrix<f32> {
        let n = self.frames.back().map_or(0, |f| f.cross.len());
        let series = |band: usize, left: bool| -> Vec<f32> {
            self.frames
                .iter()
                .map(|f| {
                    if left {
                        f.magnitude_left[band]
                    } else {
                        f.magnitude_right[band]
                    }
                })
                .collect()
        };
        let lefts: Vec<Vec<f32>> = (0..n).map(|b| series(b, true)).collect();
        let rights: Vec<Vec<f32>> = (0..n).map(|b| series(b, false)).collect();

        SymmetricMatrix::from_fn(n, |i, j| {
            if i == j {
                let (mut cross, mut pl, mut pr) = (0.0f64, 0.0f64, 0.0f64);
                for f in &self.frames {
                    cross += f.cross[i];
                    pl += f.power_left[i];
                    pr += f.power_right[i];
                }
                let denom = (pl * pr).sqrt();
                if denom > 0.0 {
                    sanitize((cross / denom) as f32, -1.0, 1.0, 0.0)
                } else {
                    0.0
                }
            } else {
                let a = pearson(&lefts[i], &rights[j]);
                let b = pearson(&lefts[j], &rights[i]);
                sanitize((a + b) * 0.5, -1.0, 1.0, 0.0)
            }
        })
    }

    /// Drop frames, history and geometry.
    pub fn reset(&mut self) {
        self.frames.clear();
        self.history.clear();
        self.geometry = None;
    }
}
