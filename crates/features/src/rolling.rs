//! Trailing rolling-window accumulators.
//!
//! A window of width `w` queried before the value at position `i` is pushed
//! covers rows `[i-w, i-1]`. A row may hold no value (the first return of a
//! series); it still occupies a slot and counts toward readiness, while
//! aggregates are taken over the defined values only.

use std::collections::VecDeque;

/// Variance below this fraction of the mean square is rounding residue.
const VARIANCE_RESIDUE: f64 = 1e-14;

/// Result of one windowed computation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Cell {
    /// A finite value.
    Present(f64),
    /// Not enough trailing rows yet.
    Insufficient,
    /// The computation produced (or consumed) a non-finite value.
    NonFinite,
}

impl Cell {
    /// Wrap a raw value, classifying NaN and infinities.
    #[inline]
    pub fn from_value(v: f64) -> Self {
        if v.is_finite() {
            Cell::Present(v)
        } else {
            Cell::NonFinite
        }
    }

    #[inline]
    pub fn value(self) -> Option<f64> {
        match self {
            Cell::Present(v) => Some(v),
            _ => None,
        }
    }

    /// Combine two present cells; the first missing state wins otherwise.
    #[inline]
    pub fn zip_with(self, other: Cell, f: impl FnOnce(f64, f64) -> Cell) -> Cell {
        match (self, other) {
            (Cell::Present(a), Cell::Present(b)) => f(a, b),
            (Cell::Present(_), missing) => missing,
            (missing, _) => missing,
        }
    }
}

/// Rolling sum / sum-of-squares accumulator over a fixed number of rows.
#[derive(Debug, Clone)]
pub struct RollingWindow {
    /// Window size in rows.
    window: usize,
    /// Row slots, oldest first. `None` is a row without a value.
    slots: VecDeque<Option<f64>>,
    /// Running sum of finite values.
    sum: f64,
    /// Running sum of squared finite values.
    sum_sq: f64,
    /// Finite values in the window.
    defined: usize,
    /// Non-finite values in the window.
    non_finite: usize,
    /// Most recent finite value.
    last: Option<f64>,
    /// Trailing finite values equal to `last`.
    run: usize,
}

impl RollingWindow {
    /// Create a new accumulator.
    pub fn new(window: usize) -> Self {
        Self {
            window,
            slots: VecDeque::with_capacity(window + 1),
            sum: 0.0,
            sum_sq: 0.0,
            defined: 0,
            non_finite: 0,
            last: None,
            run: 0,
        }
    }

    /// Append a row, evicting the oldest once the window is full.
    pub fn push(&mut self, value: Option<f64>) {
        if self.slots.len() >= self.window {
            if let Some(old) = self.slots.pop_front() {
                self.remove(old);
            }
        }

        match value {
            Some(v) if v.is_finite() => {
                self.sum += v;
                self.sum_sq += v * v;
                self.defined += 1;
                if self.last == Some(v) {
                    self.run += 1;
                } else {
                    self.last = Some(v);
                    self.run = 1;
                }
            }
            Some(_) => {
                self.non_finite += 1;
                self.last = None;
                self.run = 0;
            }
            None => {}
        }
        self.slots.push_back(value);
    }

    fn remove(&mut self, old: Option<f64>) {
        match old {
            Some(v) if v.is_finite() => {
                self.sum -= v;
                self.sum_sq -= v * v;
                self.defined -= 1;
                // The run is trailing; eviction only shortens it when it spans the window.
                self.run = self.run.min(self.defined);
                if self.defined == 0 {
                    // drop accumulated rounding residue
                    self.sum = 0.0;
                    self.sum_sq = 0.0;
                }
            }
            Some(_) => self.non_finite -= 1,
            None => {}
        }
    }

    /// Every finite value in the window is the same.
    #[inline]
    fn is_constant(&self) -> bool {
        self.defined > 0 && self.run == self.defined
    }

    /// Whether `window` rows have been seen.
    #[inline]
    pub fn is_ready(&self) -> bool {
        self.slots.len() >= self.window
    }

    /// Arithmetic mean of the defined values.
    pub fn mean(&self) -> Cell {
        if !self.is_ready() || self.defined == 0 {
            return Cell::Insufficient;
        }
        if self.non_finite > 0 {
            return Cell::NonFinite;
        }
        if self.is_constant() {
            if let Some(v) = self.last {
                return Cell::Present(v);
            }
        }
        Cell::from_value(self.sum / self.defined as f64)
    }

    /// Sample standard deviation (`n - 1` denominator) of the defined values.
    pub fn std(&self) -> Cell {
        if !self.is_ready() || self.defined < 2 {
            return Cell::Insufficient;
        }
        if self.non_finite > 0 {
            return Cell::NonFinite;
        }
        if self.is_constant() {
            return Cell::Present(0.0);
        }

        let n = self.defined as f64;
        let m2 = self.sum_sq - self.sum * self.sum / n;

        // Handle numerical issues
        if m2 <= self.sum_sq * VARIANCE_RESIDUE {
            Cell::Present(0.0)
        } else {
            Cell::from_value((m2 / (n - 1.0)).sqrt())
        }
    }

    /// Rows currently held.
    #[inline]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Finite values currently held.
    #[inline]
    pub fn defined(&self) -> usize {
        self.defined
    }

    /// Clear all data.
    pub fn clear(&mut self) {
        self.slots.clear();
        self.sum = 0.0;
        self.sum_sq = 0.0;
        self.defined = 0;
        self.non_finite = 0;
        self.last = None;
        self.run = 0;
    }
}
