//! Annualized sigma-drop frequency.
//!
//! Counts days in a trailing window whose return fell to `-k * sigma` or
//! below, using the rolling sigma aligned to each day, and divides by the
//! calendar years the window spans.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

const DAYS_PER_YEAR: f64 = 365.25;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EventFrequency {
    /// Qualifying days in the window.
    pub events: usize,
    /// Days with both a return and a defined, positive sigma.
    pub observations: usize,
    /// Calendar years between the first and last observation.
    pub years: f64,
}

impl EventFrequency {
    pub fn per_year(&self) -> f64 {
        if self.years > 0.0 {
            self.events as f64 / self.years
        } else {
            0.0
        }
    }

    /// Events per year rounded half-to-even.
    pub fn annualized(&self) -> i64 {
        self.per_year().round_ties_even() as i64
    }
}

/// Count sigma-drop days over the last `lookback` entries.
///
/// `dates`, `returns` and `sigma` must be aligned. Days with a non-finite
/// return or a sigma that is NaN or `<= 0` are excluded from both the count
/// and the elapsed-time span. `None` when fewer than two such days remain.
pub fn count_events(
    dates: &[NaiveDate],
    returns: &[f64],
    sigma: &[f64],
    multiple: f64,
    lookback: usize,
) -> Option<EventFrequency> {
    let n = dates.len().min(returns.len()).min(sigma.len());
    let start = n.saturating_sub(lookback);

    let mut events = 0;
    let mut observations = 0;
    let mut first: Option<NaiveDate> = None;
    let mut last: Option<NaiveDate> = None;

    for t in start..n {
        let (r, s) = (returns[t], sigma[t]);
        if !r.is_finite() || !s.is_finite() || s <= 0.0 {
            continue;
        }
        observations += 1;
        first.get_or_insert(dates[t]);
        last = Some(dates[t]);
        if r <= -multiple * s {
            events += 1;
        }
    }

    let (first, last) = (first?, last?);
    let years = (last - first).num_days() as f64 / DAYS_PER_YEAR;
    if years <= 0.0 {
        return None;
    }

    Some(EventFrequency {
        events,
        observations,
        years,
    })
}
