//! Shared fixtures for integration tests.

#![allow(dead_code)]

use chrono::NaiveDate;
use sigmadip_core::domain::{PricePoint, PriceSeries};

pub fn end_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 6, 28).unwrap()
}

/// Deterministic random walk of `n` daily closes ending at `end_date()`,
/// with an occasional sharp drop so trigger events exist.
pub fn walk(symbol: &str, n: usize, seed: u64) -> PriceSeries {
    let mut price = 100.0;
    let mut state = seed.wrapping_mul(2862933555777941757).wrapping_add(3037000493);
    let points = (0..n).map(|i| {
        state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
        let u = (state >> 33) as f64 / (1u64 << 31) as f64; // [0, 1)
        let mut r = (u - 0.5) * 0.06;
        if i % 41 == 40 {
            r = -0.12;
        }
        price = (price * (1.0 + r)).max(1.0);
        let date = end_date() - chrono::Duration::days((n - 1 - i) as i64);
        PricePoint::new(date, price)
    });
    PriceSeries::new(symbol, points).unwrap()
}

/// Append one more close dated the day after the series ends.
pub fn with_close(series: &PriceSeries, close: f64) -> PriceSeries {
    let mut points = series.points().to_vec();
    let next = series.last_date().unwrap() + chrono::Duration::days(1);
    points.push(PricePoint::new(next, close));
    PriceSeries::new(series.symbol(), points).unwrap()
}
