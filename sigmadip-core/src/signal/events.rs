//! Trigger-event extraction for backtesting.
//!
//! A day `i` triggers when its close is at or below
//! `prev_close * (1 - k * sigma)`, where sigma is the sample std of the
//! `window` returns ending the day before (`returns[i-W-1 .. i-1]`). Each
//! event carries up to `forward_days` subsequent closes to score TP outcomes.

use crate::domain::{PricePoint, PriceSeries};
use crate::stats::SigmaEstimator;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Default forward path length, roughly one trading month.
pub const DEFAULT_FORWARD_DAYS: usize = 20;

/// One historical day whose drop crossed the sigma threshold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriggerEvent {
    pub date: NaiveDate,
    pub entry_price: f64,
    pub prev_close: f64,
    pub sigma_at_trigger: f64,
    /// Closes after the trigger day, clipped to the end of the series.
    ///
    /// Daily closes stand in for intraday highs, which are not available.
    pub forward_prices: Vec<f64>,
}

impl TriggerEvent {
    /// Entry-relative drop on the trigger day (negative).
    pub fn drop_pct(&self) -> f64 {
        self.entry_price / self.prev_close - 1.0
    }

    /// Best close reached on the forward path, if any.
    pub fn max_forward(&self) -> Option<f64> {
        self.forward_prices
            .iter()
            .copied()
            .fold(None, |acc, p| Some(acc.map_or(p, |a: f64| a.max(p))))
    }
}

/// Point-in-time sigma-drop detector.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EventDetector {
    window: usize,
    multiple: f64,
    forward_days: usize,
}

impl EventDetector {
    /// `window` is raised to two, the smallest window with a sample std.
    pub fn new(window: usize, multiple: f64, forward_days: usize) -> Self {
        Self {
            window: window.max(2),
            multiple,
            forward_days,
        }
    }

    pub fn window(&self) -> usize {
        self.window
    }

    pub fn multiple(&self) -> f64 {
        self.multiple
    }

    pub fn forward_days(&self) -> usize {
        self.forward_days
    }

    /// Lazily scan `series` for trigger events in chronological order.
    ///
    /// The scan is pure over `series`; calling this again restarts it.
    pub fn events<'a>(&self, series: &'a PriceSeries) -> TriggerEvents<'a> {
        let returns = series.returns().values().to_vec();
        TriggerEvents {
            points: series.points(),
            returns,
            estimator: SigmaEstimator::point_in_time(self.window),
            multiple: self.multiple,
            forward_days: self.forward_days,
            next: self.window + 1,
        }
    }
}

/// Iterator over the trigger events of one series.
#[derive(Debug, Clone)]
pub struct TriggerEvents<'a> {
    points: &'a [PricePoint],
    returns: Vec<f64>,
    estimator: SigmaEstimator,
    multiple: f64,
    forward_days: usize,
    next: usize,
}

impl Iterator for TriggerEvents<'_> {
    type Item = TriggerEvent;

    fn next(&mut self) -> Option<TriggerEvent> {
        let n = self.points.len();
        // The last day has no forward path, so it is never scanned.
        while self.next + 1 < n {
            let i = self.next;
            self.next += 1;

            // Return index i-1 is day i's own move; use the window before it.
            let sigma = match self.estimator.before(&self.returns, i - 1) {
                Some(s) if s > 0.0 => s,
                _ => continue,
            };

            let prev_close = self.points[i - 1].close;
            let close = self.points[i].close;
            let threshold = prev_close * (1.0 - self.multiple * sigma);
            if close > threshold {
                continue;
            }

            let end = (i + 1 + self.forward_days).min(n);
            return Some(TriggerEvent {
                date: self.points[i].date,
                entry_price: close,
                prev_close,
                sigma_at_trigger: sigma,
                forward_prices: self.points[i + 1..end].iter().map(|p| p.close).collect(),
            });
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signal::make_series;
    use crate::stats::{assert_approx, DEFAULT_EPSILON};

    /// Zig-zag closes with a small, stable sigma.
    fn calm(n: usize) -> Vec<f64> {
        (0..n).map(|i| if i % 2 == 0 { 100.0 } else { 101.0 }).collect()
    }

    #[test]
    fn crash_after_calm_history_triggers() {
        let mut closes = calm(12);
        closes.push(80.0); // index 12
        closes.extend([82.0, 85.0, 90.0]);
        let series = make_series(&closes);
        let events: Vec<_> = EventDetector::new(10, 2.0, 2).events(&series).collect();

        assert_eq!(events.len(), 1);
        let ev = &events[0];
        assert_eq!(ev.entry_price, 80.0);
        assert_eq!(ev.prev_close, closes[11]);
        assert_eq!(ev.forward_prices, vec![82.0, 85.0]);
    }

    #[test]
    fn sigma_comes_from_preceding_window() {
        let mut closes = calm(12);
        closes.push(80.0);
        closes.push(81.0);
        let series = make_series(&closes);
        let returns = series.returns().values().to_vec();
        let expected = crate::stats::sample_std(&returns[12 - 10 - 1..12 - 1]).unwrap();

        let ev = EventDetector::new(10, 1.0, 5).events(&series).next().unwrap();
        assert_approx(ev.sigma_at_trigger, expected, DEFAULT_EPSILON);
        assert_eq!(ev.forward_prices, vec![81.0]);
    }

    #[test]
    fn last_day_is_never_an_event() {
        let mut closes = calm(12);
        closes.push(50.0);
        let series = make_series(&closes);
        assert_eq!(EventDetector::new(10, 1.0, 5).events(&series).count(), 0);
    }

    #[test]
    fn zero_sigma_window_is_skipped() {
        let mut closes = vec![100.0; 12];
        closes.push(10.0);
        closes.push(11.0);
        let series = make_series(&closes);
        assert_eq!(EventDetector::new(10, 1.0, 5).events(&series).count(), 0);
    }

    #[test]
    fn degenerate_window_does_not_panic() {
        let mut closes = calm(6);
        closes.push(50.0);
        closes.push(51.0);
        let series = make_series(&closes);
        for window in [0, 1] {
            let detector = EventDetector::new(window, 1.0, 5);
            assert_eq!(detector.window(), 2);
            assert_eq!(detector.events(&series).count(), 1);
        }
    }

    #[test]
    fn short_series_yields_nothing() {
        let series = make_series(&calm(5));
        assert_eq!(EventDetector::new(10, 1.0, 5).events(&series).count(), 0);
    }

    #[test]
    fn events_restart_from_the_beginning() {
        let mut closes = calm(12);
        closes.extend([80.0, 82.0, 84.0]);
        let series = make_series(&closes);
        let det = EventDetector::new(10, 2.0, 20);
        let first: Vec<_> = det.events(&series).collect();
        let second: Vec<_> = det.events(&series).collect();
        assert_eq!(first, second);
    }

    #[test]
    fn stricter_multiple_finds_fewer_events() {
        let closes: Vec<f64> = (0..200)
            .map(|i| 100.0 * (1.0 + 0.03 * ((i * 37 % 23) as f64 / 23.0 - 0.5)))
            .collect();
        let series = make_series(&closes);
        let one = EventDetector::new(20, 1.0, 5).events(&series).count();
        let two = EventDetector::new(20, 2.0, 5).events(&series).count();
        assert!(two <= one);
    }
}
