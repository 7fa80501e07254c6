//! Ordered fallback across providers.
//!
//! Strategies are tried in order and the first success wins. When every
//! strategy fails the caller sees a single `DataError::Unavailable` listing
//! each attempt, instead of the failures being swallowed one by one.

use super::provider::{DataError, PriceSeriesProvider, Quote};
use crate::domain::PriceSeries;
use chrono::NaiveDate;
use tracing::{debug, warn};

pub struct FallbackProvider {
    strategies: Vec<Box<dyn PriceSeriesProvider>>,
}

impl FallbackProvider {
    pub fn new(strategies: Vec<Box<dyn PriceSeriesProvider>>) -> Self {
        Self { strategies }
    }

    pub fn push(&mut self, provider: Box<dyn PriceSeriesProvider>) {
        self.strategies.push(provider);
    }

    pub fn len(&self) -> usize {
        self.strategies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strategies.is_empty()
    }

    fn first_success<T>(
        &self,
        symbol: &str,
        what: &str,
        mut attempt: impl FnMut(&dyn PriceSeriesProvider) -> Result<T, DataError>,
    ) -> Result<T, DataError> {
        let mut attempts = Vec::with_capacity(self.strategies.len());
        for provider in &self.strategies {
            match attempt(provider.as_ref()) {
                Ok(value) => {
                    debug!(symbol, provider = provider.name(), what, "provider succeeded");
                    return Ok(value);
                }
                Err(e) => {
                    warn!(symbol, provider = provider.name(), what, error = %e, "provider failed");
                    attempts.push(format!("{}: {e}", provider.name()));
                }
            }
        }
        if attempts.is_empty() {
            attempts.push("no providers configured".into());
        }
        Err(DataError::Unavailable {
            symbol: symbol.to_string(),
            attempts,
        })
    }
}

impl PriceSeriesProvider for FallbackProvider {
    fn name(&self) -> &str {
        "fallback"
    }

    /// Empty series count as a failure so the next strategy gets a chance.
    fn fetch(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<PriceSeries, DataError> {
        self.first_success(symbol, "history", |p| {
            let series = p.fetch(symbol, start, end)?;
            if series.is_empty() {
                return Err(DataError::Other("empty series".into()));
            }
            Ok(series)
        })
    }

    fn fetch_quote(&self, symbol: &str) -> Result<Quote, DataError> {
        self.first_success(symbol, "quote", |p| p.fetch_quote(symbol))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::MemoryProvider;
    use crate::signal::make_series;

    fn range() -> (NaiveDate, NaiveDate) {
        (
            NaiveDate::from_ymd_opt(2000, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2100, 1, 1).unwrap(),
        )
    }

    #[test]
    fn first_success_wins() {
        let empty = MemoryProvider::new();
        let full = MemoryProvider::new().with_series("TQQQ", make_series(&[1.0, 2.0]));
        let fb = FallbackProvider::new(vec![Box::new(empty), Box::new(full)]);
        let (s, e) = range();
        assert_eq!(fb.fetch("TQQQ", s, e).unwrap().len(), 2);
    }

    #[test]
    fn all_failures_surface_as_one_unavailable() {
        let fb = FallbackProvider::new(vec![
            Box::new(MemoryProvider::new()),
            Box::new(MemoryProvider::new()),
        ]);
        let (s, e) = range();
        match fb.fetch("SOXL", s, e).unwrap_err() {
            DataError::Unavailable { symbol, attempts } => {
                assert_eq!(symbol, "SOXL");
                assert_eq!(attempts.len(), 2);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn no_strategies_is_unavailable() {
        let fb = FallbackProvider::new(Vec::new());
        let (s, e) = range();
        assert!(matches!(
            fb.fetch("QLD", s, e),
            Err(DataError::Unavailable { .. })
        ));
    }
}
