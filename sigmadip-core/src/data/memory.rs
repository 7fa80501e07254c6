//! In-memory provider for fixtures, tests and replaying saved data.

use super::provider::{DataError, PriceSeriesProvider, Quote};
use crate::domain::PriceSeries;
use chrono::NaiveDate;
use std::collections::HashMap;

#[derive(Debug, Clone, Default)]
pub struct MemoryProvider {
    series: HashMap<String, PriceSeries>,
    quotes: HashMap<String, Quote>,
}

impl MemoryProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a series under `symbol` (the series' own symbol is ignored).
    pub fn with_series(mut self, symbol: &str, series: PriceSeries) -> Self {
        let points = series.points().to_vec();
        let series = PriceSeries::new(symbol, points).unwrap_or_else(|_| PriceSeries::empty(symbol));
        self.series.insert(symbol.to_string(), series);
        self
    }

    pub fn with_quote(mut self, symbol: &str, quote: Quote) -> Self {
        self.quotes.insert(symbol.to_string(), quote);
        self
    }
}

impl PriceSeriesProvider for MemoryProvider {
    fn name(&self) -> &str {
        "memory"
    }

    fn fetch(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<PriceSeries, DataError> {
        let series = self.series.get(symbol).ok_or_else(|| DataError::SymbolNotFound {
            symbol: symbol.to_string(),
        })?;
        let points = series
            .points()
            .iter()
            .filter(|p| p.date >= start && p.date <= end)
            .copied();
        Ok(PriceSeries::new(symbol, points)?)
    }

    fn fetch_quote(&self, symbol: &str) -> Result<Quote, DataError> {
        self.quotes
            .get(symbol)
            .copied()
            .ok_or_else(|| DataError::SymbolNotFound {
                symbol: symbol.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signal::make_series;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
    }

    #[test]
    fn fetch_filters_to_range() {
        let p = MemoryProvider::new().with_series("TQQQ", make_series(&[1.0, 2.0, 3.0, 4.0]));
        // make_series starts on 2024-01-02
        let s = p.fetch("TQQQ", d(3), d(4)).unwrap();
        assert_eq!(s.closes(), vec![2.0, 3.0]);
        assert_eq!(s.symbol(), "TQQQ");
    }

    #[test]
    fn fetch_many_keeps_input_order_and_partial_failures() {
        let p = MemoryProvider::new()
            .with_series("QLD", make_series(&[1.0, 2.0]))
            .with_series("SSO", make_series(&[3.0]));
        let symbols = vec!["SSO".to_string(), "NOPE".to_string(), "QLD".to_string()];
        let results = p.fetch_many(&symbols, d(1), d(31));

        let order: Vec<&str> = results.iter().map(|(s, _)| s.as_str()).collect();
        assert_eq!(order, vec!["SSO", "NOPE", "QLD"]);
        assert!(results[0].1.is_ok());
        assert!(matches!(results[1].1, Err(DataError::SymbolNotFound { .. })));
        assert_eq!(results[2].1.as_ref().unwrap().len(), 2);
    }

    #[test]
    fn quote_lookup() {
        let p = MemoryProvider::new().with_quote("SOXL", Quote::closed(Some(30.0)));
        assert_eq!(p.fetch_previous_close("SOXL").unwrap(), Some(30.0));
        assert!(p.fetch_quote("TQQQ").is_err());
    }
}
