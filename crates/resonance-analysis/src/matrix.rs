//! Symmetric band-pair matrices and their smoothed history.

use std::collections::VecDeque;

use crate::math::{linear_trend, sanitize};

/// Symmetric `n × n` matrix stored as its lower triangle, diagonal included.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(
    feature = "serialization",
    derive(serde::Serialize, serde::Deserialize)
)]
pub struct SymmetricMatrix<T> {
    size: usize,
    cells: Vec<T>,
}

impl<T> Default for SymmetricMatrix<T> {
    fn default() -> Self {
        Self {
            size: 0,
            cells: Vec::new(),
        }
    }
}

impl<T: Clone> SymmetricMatrix<T> {
    /// `size` x `size` matrix with every cell set to `value`.
    pub fn filled(size: usize, value: T) -> Self {
        Self {
            size,
            cells: vec![value; size * (size + 1) / 2],
        }
    }
}

impl<T> SymmetricMatrix<T> {
    /// Build from a function of `(i, j)` with `i >= j`.
    pub fn from_fn(size: usize, mut f: impl FnMut(usize, usize) -> T) -> Self {
        let mut cells = Vec::with_capacity(size * (size + 1) / 2);
        for i in 0..size {
            for j in 0..=i {
                cells.push(f(i, j));
            }
        }
        Self { size, cells }
    }

    #[inline]
    fn index(i: usize, j: usize) -> usize {
        let (hi, lo) = if i >= j { (i, j) } else { (j, i) };
        hi * (hi + 1) / 2 + lo
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Cell `(i, j)`, the same as `(j, i)`. `None` out of range.
    pub fn get(&self, i: usize, j: usize) -> Option<&T> {
        if i >= self.size || j >= self.size {
            return None;
        }
        self.cells.get(Self::index(i, j))
    }

    /// Set cell `(i, j)`, which is also `(j, i)`.
    pub fn set(&mut self, i: usize, j: usize, value: T) {
        if i < self.size && j < self.size {
            let idx = Self::index(i, j);
            self.cells[idx] = value;
        }
    }

    /// Cells `(i, i)` in order.
    pub fn diagonal(&self) -> impl Iterator<Item = &T> + '_ {
        (0..self.size).map(move |i| &self.cells[Self::index(i, i)])
    }

    /// Every stored cell as `(i, j, value)` with `i >= j`.
    pub fn iter(&self) -> impl Iterator<Item = (usize, usize, &T)> + '_ {
        (0..self.size)
            .flat_map(|i| (0..=i).map(move |j| (i, j)))
            .zip(self.cells.iter())
            .map(|((i, j), v)| (i, j, v))
    }

    /// Off-diagonal cells only, `(i, j, value)` with `i < j`.
    pub fn pairs(&self) -> impl Iterator<Item = (usize, usize, &T)> + '_ {
        self.iter()
            .filter(|(i, j, _)| i != j)
            .map(|(i, j, v)| (j, i, v))
    }

    pub fn map<U>(&self, mut f: impl FnMut(usize, usize, &T) -> U) -> SymmetricMatrix<U> {
        SymmetricMatrix {
            size: self.size,
            cells: self.iter().map(|(i, j, v)| f(i, j, v)).collect(),
        }
    }
}

/// Bounded history of correlation matrices with age-weighted smoothing.
#[derive(Debug, Clone)]
pub struct MatrixHistory {
    capacity: usize,
    base: f32,
    entries: VecDeque<SymmetricMatrix<f32>>,
}

impl MatrixHistory {
    /// History of at most `capacity` matrices.
    pub fn new(capacity: usize, base: f32) -> Self {
        Self {
            capacity,
            base,
            entries: VecDeque::with_capacity(capacity),
        }
    }

    pub fn push(&mut self, matrix: SymmetricMatrix<f32>) {
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(matrix);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Most recently pushed matrix.
    pub fn latest(&self) -> Option<&SymmetricMatrix<f32>> {
        self.entries.back()
    }

    /// Weighted mean of the stored matrices, newest weighted `base^(n-1)`,
    /// oldest `base^0`.
    pub fn smoothed(&self) -> Option<SymmetricMatrix<f32>> {
        let latest = self.entries.back()?;
        let mut sums = vec![0.0f64; latest.cells.len()];
        let mut total_weight = 0.0f64;
        let mut weight = 1.0f64;
        for entry in &self.entries {
            for (sum, &v) in sums.iter_mut().zip(&entry.cells) {
                *sum += v as f64 * weight;
            }
            total_weight += weight;
            weight *= self.base as f64;
        }
        Some(SymmetricMatrix {
            size: latest.size,
            cells: sums
                .into_iter()
                .map(|s| sanitize((s / total_weight) as f32, -1.0, 1.0, 0.0))
                .collect(),
        })
    }

    /// Per-cell slope per entry over the stored history, `None` below `min_len`.
    pub fn trends(&self, min_len: usize) -> Option<SymmetricMatrix<f32>> {
        let n = self.entries.len();
        if n < min_len.max(2) {
            return None;
        }
        let latest = self.entries.back()?;
        let mut series = vec![0.0f32; n];
        let cells = (0..latest.cells.len())
            .map(|c| {
                for (slot, entry) in series.iter_mut().zip(&self.entries) {
                    *slot = entry.cells.get(c).copied().unwrap_or(0.0);
                }
                // normalized-position slope back to change per entry
                linear_trend(&series) / (n - 1) as f32
            })
            .collect();
        Some(SymmetricMatrix {
            size: latest.size,
            cells,
        })
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
