//! Gated loudness metering
//!
//! Two-stage relative-gated loudness over a rolling window:
//!
//! 1. Per-sample power `L² + R²` (equal channel weighting, no K-filter).
//! 2. Gating blocks of `block_ms` with `overlap`, i.e. a new block every
//!    `block_len · (1 - overlap)` samples.
//! 3. Ungated loudness `-0.691 + 10·log10(mean block power)`.
//! 4. Blocks whose power exceeds `10^((ungated + gate_offset) / 10)` are kept
//!    and their mean power gives the integrated value.
//!
//! Momentary and short-term loudness are ungated means over the most recent
//! `block_ms` and `short_term_secs` of samples. Silence and empty windows
//! report [`LUFS_FLOOR`].

use std::collections::VecDeque;

use crate::math::{finite_or, lufs_to_gate_power, power_to_lufs, LUFS_FLOOR, LUFS_OFFSET};
use crate::{Error, Result};

/// Exponential smoothing factors for the display values.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(
    feature = "serialization",
    derive(serde::Serialize, serde::Deserialize)
)]
pub struct DisplaySmoothing {
    pub momentary: f32,
    pub short_term: f32,
    pub integrated: f32,
}

impl Default for DisplaySmoothing {
    fn default() -> Self {
        Self {
            momentary: 0.2,
            short_term: 0.1,
            integrated: 0.05,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(
    feature = "serialization",
    derive(serde::Serialize, serde::Deserialize)
)]
pub struct LoudnessConfig {
    /// Gating block duration.
    pub block_ms: f32,
    /// Overlap between consecutive gating blocks, in `[0, 1)`.
    pub overlap: f32,
    /// Relative gate in LU below the ungated loudness.
    pub gate_offset: f32,
    pub short_term_secs: f32,
    /// How far back the integrated measurement reaches.
    pub integration_secs: f32,
    /// Optional absolute gate in LUFS, applied before the relative gate.
    pub absolute_gate: Option<f32>,
    pub smoothing: DisplaySmoothing,
    /// Entries kept in the smoothed display history.
    pub display_history: usize,
}

impl Default for LoudnessConfig {
    fn default() -> Self {
        Self {
            block_ms: 400.0,
            overlap: 0.75,
            gate_offset: -10.0,
            short_term_secs: 3.0,
            integration_secs: 60.0,
            absolute_gate: None,
            smoothing: DisplaySmoothing::default(),
            display_history: 100,
        }
    }
}

impl LoudnessConfig {
    /// Check durations, overlap and smoothing factors.
    pub fn validate(&self) -> Result<()> {
        if !self.block_ms.is_finite() || self.block_ms <= 0.0 {
            return Err(Error::InvalidConfig(format!(
                "loudness block_ms must be positive, got {}",
                self.block_ms
            )));
        }
        if !(0.0..1.0).contains(&self.overlap) {
            return Err(Error::InvalidConfig(format!(
                "loudness overlap must be in [0, 1), got {}",
                self.overlap
            )));
        }
        if !self.gate_offset.is_finite() || self.gate_offset > 0.0 {
            return Err(Error::InvalidConfig(format!(
                "gate offset must be a finite non-positive LU value, got {}",
                self.gate_offset
            )));
        }
        if !self.short_term_secs.is_finite() || self.short_term_secs * 1000.0 < self.block_ms {
            return Err(Error::InvalidConfig(format!(
                "short-term window {}s is shorter than the gating block",
                self.short_term_secs
            )));
        }
        if !self.integration_secs.is_finite() || self.integration_secs * 1000.0 < self.block_ms {
            return Err(Error::InvalidConfig(format!(
                "integration window {}s is shorter than the gating block",
                self.integration_secs
            )));
        }
        if let Some(gate) = self.absolute_gate {
            if !gate.is_finite() {
                return Err(Error::InvalidConfig("absolute gate must be finite".into()));
            }
        }
        let s = &self.smoothing;
        for (name, factor) in [
            ("momentary", s.momentary),
            ("short_term", s.short_term),
            ("integrated", s.integrated),
        ] {
            if !(factor > 0.0 && factor <= 1.0) {
                return Err(Error::InvalidConfig(format!(
                    "{name} smoothing must be in (0, 1], got {factor}"
                )));
            }
        }
        if self.display_history == 0 {
            return Err(Error::InvalidConfig(
                "loudness display history must be > 0".into(),
            ));
        }
        Ok(())
    }
}

/// Loudness values in LUFS.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(
    feature = "serialization",
    derive(serde::Serialize, serde::Deserialize)
)]
pub struct LoudnessReading {
    pub momentary: f32,
    pub short_term: f32,
    pub integrated: f32,
}

impl Default for LoudnessReading {
    fn default() -> Self {
        Self {
            momentary: LUFS_FLOOR,
            short_term: LUFS_FLOOR,
            integrated: LUFS_FLOOR,
        }
    }
}

/// Breakdown of the last integrated measurement.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct GateReport {
    pub total_blocks: usize,
    /// Blocks surviving both gates.
    pub kept_blocks: usize,
    pub ungated_lufs: f32,
    /// Power a block had to exceed to pass the relative gate.
    pub relative_threshold: f64,
    pub kept_mean_power: f64,
}

/// Sample-rate dependent window sizes.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Geometry {
    sample_rate: f32,
    block_len: usize,
    stride: usize,
    short_term_len: usize,
    max_blocks: usize,
}

impl Geometry {
    fn new(config: &LoudnessConfig, sample_rate: f32) -> Self {
        let sr = sample_rate as f64;
        let block_len = ((config.block_ms as f64 / 1000.0 * sr).round() as usize).max(1);
        let stride = ((block_len as f64 * (1.0 - config.overlap as f64)).round() as usize).max(1);
        let short_term_len =
            ((config.short_term_secs as f64 * sr).round() as usize).max(block_len);
        let integration_len = (config.integration_secs as f64 * sr).round() as usize;
        let max_blocks = (integration_len.saturating_sub(block_len) / stride + 1).max(1);
        Self {
            sample_rate,
            block_len,
            stride,
            short_term_len,
            max_blocks,
        }
    }
}

/// Streaming gated loudness meter.
#[derive(Debug, Clone)]
pub struct LoudnessMeter {
    config: LoudnessConfig,
    geometry: Option<Geometry>,
    /// Recent per-sample powers, bounded by the short-term window.
    powers: VecDeque<f64>,
    /// Mean power of each completed gating block.
    blocks: VecDeque<f64>,
    since_last_block: usize,
    reading: LoudnessReading,
    gate: GateReport,
    display: LoudnessDisplay,
}

impl LoudnessMeter {
    /// Meter with empty power history.
    pub fn new(config: LoudnessConfig) -> Result<Self> {
        config.validate()?;
        let display = LoudnessDisplay::new(config.smoothing.clone(), config.display_history);
        Ok(Self {
            config,
            geometry: None,
            powers: VecDeque::new(),
            blocks: VecDeque::new(),
            since_last_block: 0,
            reading: LoudnessReading::default(),
            gate: GateReport::default(),
            display,
        })
    }

    pub fn config(&self) -> &LoudnessConfig {
        &self.config
    }

    /// Feed one stereo block and return the instantaneous reading.
    pub fn process(&mut self, left: &[f32], right: &[f32], sample_rate: f32) -> LoudnessReading {
        let geometry = self.geometry_for(sample_rate);

        for (&l, &r) in left.iter().zip(right) {
            let l = finite_or(l, 0.0) as f64;
            let r = finite_or(r, 0.0) as f64;
            self.powers.push_back(l * l + r * r);
            if self.powers.len() > geometry.short_term_len {
                self.powers.pop_front();
            }

            self.since_last_block += 1;
            if self.since_last_block >= geometry.stride && self.powers.len() >= geometry.block_len {
                self.since_last_block = 0;
                let block_power = self.tail_mean(geometry.block_len);
                self.blocks.push_back(block_power);
                if self.blocks.len() > geometry.max_blocks {
                    self.blocks.pop_front();
                }
            }
        }

        self.reading = LoudnessReading {
            momentary: power_to_lufs(self.tail_mean(geometry.block_len)),
            short_term: power_to_lufs(self.tail_mean(geometry.short_term_len)),
            integrated: self.integrate(),
        };
        self.display.update(self.reading);
        self.reading
    }

    /// Last instantaneous reading.
    pub fn reading(&self) -> LoudnessReading {
        self.reading
    }

    /// Smoothed values for display. Never fed back into gating.
    pub fn display(&self) -> &LoudnessDisplay {
        &self.display
    }

    /// Gated and ungated block statistics for the current history.
    pub fn gate_report(&self) -> GateReport {
        self.gate
    }

    /// Gating block powers currently inside the integration window.
    pub fn block_powers(&self) -> impl Iterator<Item = f64> + '_ {
        self.blocks.iter().copied()
    }

    /// Clear all buffers back to the silence floor.
    pub fn reset(&mut self) {
        self.powers.clear();
        self.blocks.clear();
        self.since_last_block = 0;
        self.reading = LoudnessReading::default();
        self.gate = GateReport::default();
        self.display.reset();
    }

    fn geometry_for(&mut self, sample_rate: f32) -> Geometry {
        match self.geometry {
            Some(g) if g.sample_rate == sample_rate => g,
            previous => {
                if previous.is_some() {
                    tracing::debug!(sample_rate, "Sample rate changed, clearing loudness buffers");
                    self.powers.clear();
                    self.blocks.clear();
                    self.since_last_block = 0;
                }
                let g = Geometry::new(&self.config, sample_rate);
                self.geometry = Some(g);
                g
            }
        }
    }

    fn tail_mean(&self, len: usize) -> f64 {
        let n = len.min(self.powers.len());
        if n == 0 {
            return 0.0;
        }
        self.powers.iter().rev().take(n).sum::<f64>() / n as f64
    }

    fn integrate(&mut self) -> f32 {
        let total_blocks = self.blocks.len();
        if total_blocks == 0 {
            self.gate = GateReport::default();
            return LUFS_FLOOR;
        }

        let absolute_threshold = self
            .config
            .absolute_gate
            .map(|gate| 10f64.powf((gate as f64 - LUFS_OFFSET) / 10.0));
        let candidates = || {
            self.blocks
                .iter()
                .copied()
                .filter(move |&p| absolute_threshold.map_or(true, |t| p > t))
        };

        let (count, sum) = candidates().fold((0usize, 0.0f64), |(n, s), p| (n + 1, s + p));
        if count == 0 {
            self.gate = GateReport {
                total_blocks,
                ungated_lufs: LUFS_FLOOR,
                ..GateReport::default()
            };
            return LUFS_FLOOR;
        }
        let ungated_lufs = power_to_lufs(sum / count as f64);

        let relative_threshold =
            lufs_to_gate_power(ungated_lufs as f64 + self.config.gate_offset as f64);
        let (kept, kept_sum) = candidates()
            .filter(|&p| p > relative_threshold)
            .fold((0usize, 0.0f64), |(n, s), p| (n + 1, s + p));
        let kept_mean_power = if kept > 0 { kept_sum / kept as f64 } else { 0.0 };

        self.gate = GateReport {
            total_blocks,
            kept_blocks: kept,
            ungated_lufs,
            relative_threshold,
            kept_mean_power,
        };
        power_to_lufs(kept_mean_power)
    }
}

/// Exponentially smoothed loudness for display, with a bounded history.
#[derive(Debug, Clone)]
pub struct LoudnessDisplay {
    smoothing: DisplaySmoothing,
    current: LoudnessReading,
    history: VecDeque<LoudnessReading>,
    capacity: usize,
}

impl LoudnessDisplay {
    pub fn new(smoothing: DisplaySmoothing, capacity: usize) -> Self {
        Self {
            smoothing,
            current: LoudnessReading::default(),
            history: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Fold a reading in. Values at the floor are ignored.
    pub fn update(&mut self, reading: LoudnessReading) {
        fn smooth(current: &mut f32, value: f32, factor: f32) {
            if !value.is_finite() || value <= LUFS_FLOOR {
                return;
            }
            if *current <= LUFS_FLOOR {
                *current = value;
            } else {
                *current += (value - *current) * factor;
            }
        }

        smooth(&mut self.current.momentary, reading.momentary, self.smoothing.momentary);
        smooth(&mut self.current.short_term, reading.short_term, self.smoothing.short_term);
        smooth(&mut self.current.integrated, reading.integrated, self.smoothing.integrated);

        if self.history.len() == self.capacity {
            self.history.pop_front();
        }
        self.history.push_back(self.current);
    }

    /// Latest smoothed reading.
    pub fn current(&self) -> LoudnessReading {
        self.current
    }

    /// Oldest first.
    pub fn history(&self) -> impl ExactSizeIterator<Item = &LoudnessReading> {
        self.history.iter()
    }

    /// Back to the floor with no history.
    pub fn reset(&mut self) {
        self.current = LoudnessReading::default();
        self.history.clear();
    }
}
