//! Drawdown-event detection and take-profit search.
//!
//! Both halves only ever look at data strictly before the day being judged:
//! the sigma a day is compared against comes from the preceding window, and
//! forward prices are only used to score outcomes, never to detect.

pub mod events;
pub mod frequency;
pub mod take_profit;

pub use events::{EventDetector, TriggerEvent, TriggerEvents, DEFAULT_FORWARD_DAYS};
pub use frequency::{count_events, EventFrequency};
pub use take_profit::{TpCandidateResult, TpGrid, TpOptimizer, DEFAULT_MARGIN};

/// Build a dated price series from closes for tests (one day apart).
#[cfg(test)]
pub fn make_series(closes: &[f64]) -> crate::domain::PriceSeries {
    use crate::domain::{PricePoint, PriceSeries};
    let base = chrono::NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
    PriceSeries::new(
        "TEST",
        closes
            .iter()
            .enumerate()
            .map(|(i, &c)| PricePoint::new(base + chrono::Duration::days(i as i64), c)),
    )
    .unwrap()
}
