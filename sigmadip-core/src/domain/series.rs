//! PriceSeries and ReturnSeries, the inputs every statistic is derived from.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One daily close for a single symbol.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub date: NaiveDate,
    pub close: f64,
}

impl PricePoint {
    pub fn new(date: NaiveDate, close: f64) -> Self {
        Self { date, close }
    }

    /// A close is usable if it is finite and strictly positive.
    pub fn is_valid(&self) -> bool {
        self.close.is_finite() && self.close > 0.0
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum SeriesError {
    #[error("duplicate date {date} in series for {symbol}")]
    DuplicateDate { symbol: String, date: NaiveDate },
}

/// Ordered daily closes for one ticker.
///
/// Invariant: dates strictly increasing, every close finite and > 0.
/// Built fresh from the provider on each run and only ever read afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceSeries {
    symbol: String,
    points: Vec<PricePoint>,
}

impl PriceSeries {
    /// Build a series from raw provider points.
    ///
    /// Invalid closes (NaN, zero, negative) are dropped the way a provider's
    /// holiday rows are, points are sorted by date, and duplicate dates are
    /// rejected.
    pub fn new(
        symbol: impl Into<String>,
        points: impl IntoIterator<Item = PricePoint>,
    ) -> Result<Self, SeriesError> {
        let symbol = symbol.into();
        let mut points: Vec<PricePoint> = points.into_iter().filter(|p| p.is_valid()).collect();
        points.sort_by_key(|p| p.date);

        if let Some(w) = points.windows(2).find(|w| w[0].date == w[1].date) {
            return Err(SeriesError::DuplicateDate {
                symbol,
                date: w[1].date,
            });
        }

        Ok(Self { symbol, points })
    }

    /// An empty series for `symbol`.
    pub fn empty(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            points: Vec::new(),
        }
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn points(&self) -> &[PricePoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn closes(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.close).collect()
    }

    pub fn dates(&self) -> Vec<NaiveDate> {
        self.points.iter().map(|p| p.date).collect()
    }

    pub fn last(&self) -> Option<&PricePoint> {
        self.points.last()
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.points.first().map(|p| p.date)
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.points.last().map(|p| p.date)
    }

    /// Points dated on or after `start`.
    pub fn since(&self, start: NaiveDate) -> PriceSeries {
        let from = self.points.partition_point(|p| p.date < start);
        PriceSeries {
            symbol: self.symbol.clone(),
            points: self.points[from..].to_vec(),
        }
    }

    /// Daily simple returns: `r[i] = close[i+1] / close[i] - 1`.
    pub fn returns(&self) -> ReturnSeries {
        let mut dates = Vec::with_capacity(self.points.len().saturating_sub(1));
        let mut values = Vec::with_capacity(self.points.len().saturating_sub(1));
        for w in self.points.windows(2) {
            dates.push(w[1].date);
            values.push(w[1].close / w[0].close - 1.0);
        }
        ReturnSeries { dates, values }
    }
}

/// Daily simple returns aligned to the price that closes each day.
///
/// `dates[i]` / `values[i]` belong to price index `i + 1`, so
/// `len() == prices.len() - 1` for any non-empty series.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReturnSeries {
    dates: Vec<NaiveDate>,
    values: Vec<f64>,
}

impl ReturnSeries {
    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn last(&self) -> Option<f64> {
        self.values.last().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
    }

    #[test]
    fn returns_are_one_shorter_than_prices() {
        let s = PriceSeries::new(
            "TQQQ",
            vec![
                PricePoint::new(d(2), 100.0),
                PricePoint::new(d(3), 110.0),
                PricePoint::new(d(4), 99.0),
            ],
        )
        .unwrap();
        let r = s.returns();
        assert_eq!(r.len(), s.len() - 1);
        assert!((r.values()[0] - 0.10).abs() < 1e-12);
        assert!((r.values()[1] + 0.10).abs() < 1e-12);
        assert_eq!(r.dates()[0], d(3));
    }

    #[test]
    fn unsorted_points_are_sorted() {
        let s = PriceSeries::new(
            "QLD",
            vec![PricePoint::new(d(5), 2.0), PricePoint::new(d(2), 1.0)],
        )
        .unwrap();
        assert_eq!(s.first_date(), Some(d(2)));
        assert_eq!(s.last_date(), Some(d(5)));
    }

    #[test]
    fn invalid_closes_are_dropped() {
        let s = PriceSeries::new(
            "SOXL",
            vec![
                PricePoint::new(d(2), f64::NAN),
                PricePoint::new(d(3), 0.0),
                PricePoint::new(d(4), 12.5),
            ],
        )
        .unwrap();
        assert_eq!(s.len(), 1);
    }

    #[test]
    fn duplicate_dates_rejected() {
        let err = PriceSeries::new(
            "SSO",
            vec![PricePoint::new(d(2), 1.0), PricePoint::new(d(2), 1.1)],
        )
        .unwrap_err();
        assert_eq!(
            err,
            SeriesError::DuplicateDate {
                symbol: "SSO".into(),
                date: d(2)
            }
        );
    }

    #[test]
    fn since_trims_leading_points() {
        let s = PriceSeries::new("TQQQ", (2..=9).map(|i| PricePoint::new(d(i), i as f64))).unwrap();
        let tail = s.since(d(6));
        assert_eq!(tail.len(), 4);
        assert_eq!(tail.first_date(), Some(d(6)));
    }

    #[test]
    fn empty_series_has_no_returns() {
        assert!(PriceSeries::empty("X").returns().is_empty());
    }
}
