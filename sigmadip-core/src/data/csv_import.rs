//! CSV price provider.
//!
//! Reads `<dir>/<SYMBOL>.csv` with a `date,close` header (`Date`/`Close`
//! also accepted). Used for offline runs and as the fallback when Yahoo is
//! unavailable.

use super::provider::{DataError, PriceSeriesProvider, Quote};
use crate::domain::{PricePoint, PriceSeries};
use chrono::NaiveDate;
use serde::Deserialize;
use std::path::PathBuf;

#[derive(Debug, Deserialize)]
struct CsvRow {
    #[serde(alias = "Date")]
    date: NaiveDate,
    #[serde(alias = "Close")]
    close: f64,
}

#[derive(Debug, Clone)]
pub struct CsvProvider {
    dir: PathBuf,
}

impl CsvProvider {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, symbol: &str) -> PathBuf {
        self.dir.join(format!("{symbol}.csv"))
    }

    fn read_all(&self, symbol: &str) -> Result<PriceSeries, DataError> {
        let path = self.path_for(symbol);
        if !path.exists() {
            return Err(DataError::SymbolNotFound {
                symbol: symbol.to_string(),
            });
        }

        let csv_err = |e: csv::Error| DataError::Csv {
            symbol: symbol.to_string(),
            message: e.to_string(),
        };

        let mut reader = csv::Reader::from_path(&path).map_err(csv_err)?;
        let mut points = Vec::new();
        for row in reader.deserialize::<CsvRow>() {
            let row = row.map_err(csv_err)?;
            points.push(PricePoint::new(row.date, row.close));
        }
        Ok(PriceSeries::new(symbol, points)?)
    }
}

impl PriceSeriesProvider for CsvProvider {
    fn name(&self) -> &str {
        "csv"
    }

    fn fetch(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<PriceSeries, DataError> {
        let all = self.read_all(symbol)?;
        let points = all
            .points()
            .iter()
            .filter(|p| p.date >= start && p.date <= end)
            .copied();
        Ok(PriceSeries::new(symbol, points)?)
    }

    /// Files carry no session information: the last close is the previous
    /// close and there is never a live price.
    fn fetch_quote(&self, symbol: &str) -> Result<Quote, DataError> {
        let all = self.read_all(symbol)?;
        Ok(Quote::closed(all.last().map(|p| p.close)))
    }
}
