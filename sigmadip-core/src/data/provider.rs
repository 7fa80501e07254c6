//! Price provider trait and structured error types.
//!
//! The PriceSeriesProvider trait abstracts over data sources (Yahoo Finance,
//! CSV files, in-memory fixtures) so the engine can swap implementations and
//! mock them in tests.

use crate::domain::{PriceSeries, SeriesError};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Structured error types for data operations.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("network unreachable: {0}")]
    NetworkUnreachable(String),

    #[error("rate limited by provider (retry after {retry_after_secs}s)")]
    RateLimited { retry_after_secs: u64 },

    #[error("response format changed: {0}")]
    ResponseFormatChanged(String),

    #[error("symbol not found: {symbol}")]
    SymbolNotFound { symbol: String },

    #[error("hard stop: data provider has blocked requests (circuit breaker tripped)")]
    CircuitBreakerTripped,

    #[error("http client error: {0}")]
    Client(String),

    #[error("csv error for {symbol}: {message}")]
    Csv { symbol: String, message: String },

    #[error(transparent)]
    Series(#[from] SeriesError),

    #[error("data unavailable for {symbol}: {}", attempts.join("; "))]
    Unavailable {
        symbol: String,
        attempts: Vec<String>,
    },

    #[error("data error: {0}")]
    Other(String),
}

/// State of the regular trading session when a quote was taken.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarketSession {
    Regular,
    Closed,
    Unknown,
}

/// Live-side prices for one symbol.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    pub previous_close: Option<f64>,
    pub last_price: Option<f64>,
    pub session: MarketSession,
}

impl Quote {
    pub fn closed(previous_close: Option<f64>) -> Self {
        Self {
            previous_close,
            last_price: None,
            session: MarketSession::Closed,
        }
    }
}

fn usable(price: Option<f64>) -> Option<f64> {
    price.filter(|p| p.is_finite() && *p > 0.0)
}

/// Trait for price providers.
///
/// Implementations handle the specifics of one source. Fallback between
/// sources is a separate concern (`FallbackProvider`).
pub trait PriceSeriesProvider: Send + Sync {
    /// Human-readable name of this provider.
    fn name(&self) -> &str;

    /// Fetch daily closes for a symbol over a date range (inclusive).
    fn fetch(&self, symbol: &str, start: NaiveDate, end: NaiveDate)
        -> Result<PriceSeries, DataError>;

    /// Previous official close and, while the market is open, the last price.
    fn fetch_quote(&self, symbol: &str) -> Result<Quote, DataError>;

    /// Previous official close, if the provider knows it.
    fn fetch_previous_close(&self, symbol: &str) -> Result<Option<f64>, DataError> {
        Ok(usable(self.fetch_quote(symbol)?.previous_close))
    }

    /// Latest intraday price; `None` outside the regular session.
    fn fetch_latest_price(&self, symbol: &str) -> Result<Option<f64>, DataError> {
        let quote = self.fetch_quote(symbol)?;
        match quote.session {
            MarketSession::Regular => Ok(usable(quote.last_price)),
            MarketSession::Closed | MarketSession::Unknown => Ok(None),
        }
    }

    /// Fetch several symbols; results come back in input order.
    fn fetch_many(
        &self,
        symbols: &[String],
        start: NaiveDate,
        end: NaiveDate,
    ) -> Vec<(String, Result<PriceSeries, DataError>)> {
        symbols
            .iter()
            .map(|s| (s.clone(), self.fetch(s, start, end)))
            .collect()
    }
}
