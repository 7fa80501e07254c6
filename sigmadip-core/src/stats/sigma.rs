//! Rolling volatility of daily returns.
//!
//! Two evaluation modes:
//! - `Inclusive`: the most recent `window` returns, today included.
//! - `PointInTime`: the `window` returns immediately before today
//!   (`returns[n-W-1 .. n-1]`), so today's move cannot inflate the sigma it
//!   is judged against.

use super::sample_std;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Default minimum observation count for inclusive and rolling estimates.
pub const DEFAULT_MIN_OBSERVATIONS: usize = 120;

/// Default lookback, one trading year.
pub const DEFAULT_WINDOW: usize = 252;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SigmaMode {
    Inclusive,
    PointInTime,
}

impl fmt::Display for SigmaMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SigmaMode::Inclusive => write!(f, "inclusive"),
            SigmaMode::PointInTime => write!(f, "point-in-time"),
        }
    }
}

/// Sigma over a trailing window of daily returns.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SigmaEstimator {
    window: usize,
    min_observations: usize,
    mode: SigmaMode,
}

impl SigmaEstimator {
    /// Windows below two returns have no sample std and are raised to two.
    pub fn new(window: usize, min_observations: usize, mode: SigmaMode) -> Self {
        Self {
            window: window.max(2),
            min_observations: min_observations.max(2),
            mode,
        }
    }

    pub fn point_in_time(window: usize) -> Self {
        Self::new(window, DEFAULT_MIN_OBSERVATIONS.min(window), SigmaMode::PointInTime)
    }

    pub fn inclusive(window: usize, min_observations: usize) -> Self {
        Self::new(window, min_observations, SigmaMode::Inclusive)
    }

    pub fn window(&self) -> usize {
        self.window
    }

    pub fn min_observations(&self) -> usize {
        self.min_observations
    }

    pub fn mode(&self) -> SigmaMode {
        self.mode
    }

    /// Number of returns needed before `estimate` can produce a value.
    pub fn required_returns(&self) -> usize {
        match self.mode {
            SigmaMode::Inclusive => self.min_observations,
            SigmaMode::PointInTime => self.window + 1,
        }
    }

    /// Sigma for the last day of `returns`, or `None` if history is too short.
    pub fn estimate(&self, returns: &[f64]) -> Option<f64> {
        let n = returns.len();
        if n < self.required_returns() {
            return None;
        }
        let slice = match self.mode {
            SigmaMode::Inclusive => &returns[n.saturating_sub(self.window)..],
            SigmaMode::PointInTime => &returns[n - self.window - 1..n - 1],
        };
        sample_std(slice)
    }

    /// Point-in-time sigma for the day at return index `t`: the `window`
    /// returns ending the day before. `None` without a full window.
    pub fn before(&self, returns: &[f64], t: usize) -> Option<f64> {
        if t < self.window || t > returns.len() {
            return None;
        }
        sample_std(&returns[t - self.window..t])
    }

    /// Sigma for every day of `returns`, aligned one-to-one with it.
    ///
    /// Trailing-`window` sample std with `min_observations` as the minimum
    /// period. In point-in-time mode the series is shifted by one day so the
    /// value at `t` only uses returns strictly before `t`. Undefined entries
    /// are `f64::NAN`.
    pub fn rolling(&self, returns: &[f64]) -> Vec<f64> {
        let n = returns.len();
        let mut trailing = vec![f64::NAN; n];

        for (i, slot) in trailing.iter_mut().enumerate() {
            let start = (i + 1).saturating_sub(self.window);
            let window = &returns[start..=i];
            if window.len() < self.min_observations {
                continue;
            }
            if let Some(std) = sample_std(window) {
                *slot = std;
            }
        }

        match self.mode {
            SigmaMode::Inclusive => trailing,
            SigmaMode::PointInTime => {
                let mut shifted = vec![f64::NAN; n];
                if n > 1 {
                    shifted[1..].copy_from_slice(&trailing[..n - 1]);
                }
                shifted
            }
        }
    }
}

impl Default for SigmaEstimator {
    fn default() -> Self {
        Self::point_in_time(DEFAULT_WINDOW)
    }
}
