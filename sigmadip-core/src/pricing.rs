//! Choosing the previous close and current price a signal is judged on.

use crate::config::PriceSource;
use crate::data::{MarketSession, Quote};
use crate::domain::PriceSeries;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ResolvedPrices {
    pub prev_close: f64,
    pub current_price: f64,
    /// True when `current_price` is an intraday quote.
    pub live: bool,
}

impl ResolvedPrices {
    pub fn return_today(&self) -> f64 {
        self.current_price / self.prev_close - 1.0
    }
}

fn usable(price: Option<f64>) -> Option<f64> {
    price.filter(|p| p.is_finite() && *p > 0.0)
}

/// Resolve prices for one ticker.
///
/// - `Series`: second-to-last and last close; `None` with fewer than two.
/// - `Live`: the quote's previous close (else the last series close); the
///   live price only during the regular session, otherwise the previous
///   close stands in for the current price.
pub fn resolve_prices(
    series: &PriceSeries,
    source: PriceSource,
    quote: Option<&Quote>,
) -> Option<ResolvedPrices> {
    match source {
        PriceSource::Series => {
            let points = series.points();
            let n = points.len();
            if n < 2 {
                return None;
            }
            Some(ResolvedPrices {
                prev_close: points[n - 2].close,
                current_price: points[n - 1].close,
                live: false,
            })
        }
        PriceSource::Live => {
            let prev_close = usable(quote.and_then(|q| q.previous_close))
                .or_else(|| series.last().map(|p| p.close))?;
            let live_price = quote
                .filter(|q| q.session == MarketSession::Regular)
                .and_then(|q| usable(q.last_price));
            Some(ResolvedPrices {
                prev_close,
                current_price: live_price.unwrap_or(prev_close),
                live: live_price.is_some(),
            })
        }
    }
}
