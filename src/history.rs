//! Long-running metric and spectrogram rings.

use std::collections::VecDeque;

use crate::analysis::LoudnessReading;

fn push_bounded<T>(ring: &mut VecDeque<T>, capacity: usize, value: T) {
    if ring.len() == capacity {
        ring.pop_front();
    }
    ring.push_back(value);
}

/// Bounded histories of the headline metrics, oldest first.
#[derive(Debug, Clone)]
pub struct MetricHistory {
    capacity: usize,
    loudness: VecDeque<LoudnessReading>,
    correlation: VecDeque<f32>,
    width: VecDeque<f32>,
}

impl MetricHistory {
    /// Rings holding at most `capacity` entries each.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            loudness: VecDeque::with_capacity(capacity),
            correlation: VecDeque::with_capacity(capacity),
            width: VecDeque::with_capacity(capacity),
        }
    }

    /// Append one block's values, evicting the oldest at capacity.
    pub fn push(&mut self, loudness: LoudnessReading, correlation: f32, width: f32) {
        push_bounded(&mut self.loudness, self.capacity, loudness);
        push_bounded(&mut self.correlation, self.capacity, correlation);
        push_bounded(&mut self.width, self.capacity, width);
    }

    /// Smoothed loudness readings, oldest first.
    pub fn loudness(&self) -> &VecDeque<LoudnessReading> {
        &self.loudness
    }

    /// Correlation values, oldest first.
    pub fn correlation(&self) -> &VecDeque<f32> {
        &self.correlation
    }

    /// Stereo width values, oldest first.
    pub fn width(&self) -> &VecDeque<f32> {
        &self.width
    }

    pub fn len(&self) -> usize {
        self.loudness.len()
    }

    pub fn is_empty(&self) -> bool {
        self.loudness.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.loudness.clear();
        self.correlation.clear();
        self.width.clear();
    }
}

/// One column of the spectrogram: both channels' dB spectra.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(
    feature = "serialization",
    derive(serde::Serialize, serde::Deserialize)
)]
pub struct SpectrogramFrame {
    pub timestamp: f64,
    pub left: Vec<f32>,
    pub right: Vec<f32>,
}

/// Bounded ring of spectra, oldest first.
#[derive(Debug, Clone)]
pub struct Spectrogram {
    capacity: usize,
    frames: VecDeque<SpectrogramFrame>,
}

impl Spectrogram {
    /// Empty spectrogram keeping at most `capacity` frames.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            frames: VecDeque::with_capacity(capacity),
        }
    }

    /// Append both spectra, evicting the oldest frame at capacity.
    pub fn push(&mut self, timestamp: f64, left: &[f32], right: &[f32]) {
        // Reuse the evicted column's allocations once the ring is full.
        let frame = if self.frames.len() == self.capacity {
            self.frames.pop_front().map(|mut old| {
                old.timestamp = timestamp;
                old.left.clear();
                old.left.extend_from_slice(left);
                old.right.clear();
                old.right.extend_from_slice(right);
                old
            })
        } else {
            None
        };
        let frame = frame.unwrap_or_else(|| SpectrogramFrame {
            timestamp,
            left: left.to_vec(),
            right: right.to_vec(),
        });
        self.frames.push_back(frame);
    }

    /// Frames, oldest first.
    pub fn frames(&self) -> impl ExactSizeIterator<Item = &SpectrogramFrame> {
        self.frames.iter()
    }

    /// Most recent frame.
    pub fn latest(&self) -> Option<&SpectrogramFrame> {
        self.frames.back()
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn clear(&mut self) {
        self.frames.clear();
    }
}
