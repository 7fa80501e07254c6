//! Grid search for a historical take-profit percentage.
//!
//! For every candidate `tp` and every trigger event, the position "hits" if
//! any forward close reaches `entry * (1 + tp)`. A hit earns `tp - 2 * fees`
//! (entry and exit legs), a miss earns nothing. The candidate with the
//! largest total wins; ties keep the earliest candidate in grid order.
//!
//! This is a single pass over a fixed grid. It does not model stop-losses,
//! position sizing, partial exits or the cost of capital tied up in misses.

use super::events::{EventDetector, TriggerEvent};
use crate::domain::PriceSeries;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Extra bars beyond the sigma window required before optimizing.
pub const DEFAULT_MARGIN: usize = 30;

/// Candidate TP percentages: `start`, `start + step`, ... up to `end`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TpGrid {
    pub start: f64,
    pub end: f64,
    pub step: f64,
}

impl TpGrid {
    pub fn new(start: f64, end: f64, step: f64) -> Self {
        Self { start, end, step }
    }

    pub fn is_valid(&self) -> bool {
        self.start.is_finite()
            && self.end.is_finite()
            && self.step.is_finite()
            && self.start > 0.0
            && self.step > 0.0
            && self.end >= self.start
    }

    /// Candidates in ascending order, each rounded to 3 decimals.
    pub fn candidates(&self) -> Vec<f64> {
        if !self.is_valid() {
            return Vec::new();
        }
        let mut out = Vec::new();
        let mut n = 0u32;
        loop {
            let tp = ((self.start + n as f64 * self.step) * 1000.0).round() / 1000.0;
            if tp > self.end + 1e-9 {
                break;
            }
            out.push(tp);
            n += 1;
        }
        out
    }
}

impl Default for TpGrid {
    /// 2% to 20% in 0.5% steps.
    fn default() -> Self {
        Self::new(0.02, 0.20, 0.005)
    }
}

/// Aggregate outcome of one candidate across all events.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TpCandidateResult {
    pub tp_percent: f64,
    pub total_net_return: f64,
    pub hit_count: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TpOptimizer {
    grid: Vec<f64>,
    fees: f64,
    margin: usize,
}

impl TpOptimizer {
    pub fn new(grid: &TpGrid, fees: f64) -> Self {
        Self::from_candidates(grid.candidates(), fees)
    }

    pub fn from_candidates(candidates: Vec<f64>, fees: f64) -> Self {
        Self {
            grid: candidates,
            fees,
            margin: DEFAULT_MARGIN,
        }
    }

    pub fn with_margin(mut self, margin: usize) -> Self {
        self.margin = margin;
        self
    }

    pub fn candidates(&self) -> &[f64] {
        &self.grid
    }

    /// Score a single candidate.
    pub fn score(&self, tp: f64, events: &[TriggerEvent]) -> TpCandidateResult {
        let net = tp - 2.0 * self.fees;
        let hit_count = events
            .iter()
            .filter(|ev| {
                let target = ev.entry_price * (1.0 + tp);
                ev.forward_prices.iter().any(|&p| p >= target)
            })
            .count();
        TpCandidateResult {
            tp_percent: tp,
            total_net_return: net * hit_count as f64,
            hit_count,
        }
    }

    /// Score every candidate, in grid order.
    pub fn evaluate(&self, events: &[TriggerEvent]) -> Vec<TpCandidateResult> {
        self.grid.iter().map(|&tp| self.score(tp, events)).collect()
    }

    /// Best candidate, or `None` with no events or an empty grid.
    pub fn optimize(&self, events: &[TriggerEvent]) -> Option<TpCandidateResult> {
        if events.is_empty() {
            return None;
        }
        let mut best: Option<TpCandidateResult> = None;
        for result in self.evaluate(events) {
            if best.map_or(true, |b| result.total_net_return > b.total_net_return) {
                best = Some(result);
            }
        }
        best
    }

    /// Detect events over `series` and optimize.
    ///
    /// `None` when the series is shorter than `detector.window() + margin`
    /// or when no events are found.
    pub fn optimize_series(
        &self,
        series: &PriceSeries,
        detector: &EventDetector,
    ) -> Option<TpCandidateResult> {
        let needed = detector.window() + self.margin;
        if series.len() < needed {
            debug!(
                symbol = series.symbol(),
                needed,
                available = series.len(),
                "series too short for TP search"
            );
            return None;
        }
        let events: Vec<TriggerEvent> = detector.events(series).collect();
        debug!(symbol = series.symbol(), events = events.len(), "trigger events found");
        self.optimize(&events)
    }
}
