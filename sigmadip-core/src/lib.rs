//! sigmadip core: volatility-scaled dip alerts for leveraged ETFs.
//!
//! This crate contains the signal engine and everything around it:
//! - Domain types (price series, return series)
//! - Sigma estimation over a trailing window (inclusive or point-in-time)
//! - Drawdown-event detection and the annualized event rate
//! - Take-profit grid search over historical trigger events
//! - Alert composition and text rendering
//! - Price providers (Yahoo Finance, CSV, in-memory) with ordered fallback
//! - Notification sinks (Discord webhook, stdout)
//! - The per-run pipeline (`AlertEngine`)

pub mod alert;
pub mod config;
pub mod data;
pub mod domain;
pub mod engine;
pub mod notify;
pub mod pricing;
pub mod signal;
pub mod stats;

pub use alert::{AlertReport, RunReport, TickerError, TickerReport};
pub use config::{AlertConfig, ConfigError};
pub use engine::{AlertEngine, Backtest};

#[cfg(test)]
mod tests {
    use super::*;

    /// Compile-time check: types crossing the per-ticker rayon loop are Send + Sync.
    #[allow(dead_code)]
    fn assert_send_sync() {
        fn require_send<T: Send>() {}
        fn require_sync<T: Sync>() {}

        require_send::<domain::PriceSeries>();
        require_sync::<domain::PriceSeries>();
        require_send::<alert::TickerReport>();
        require_sync::<alert::TickerReport>();
        require_send::<config::TickerProfile>();
        require_sync::<config::TickerProfile>();
        require_send::<signal::TriggerEvent>();
        require_sync::<signal::TriggerEvent>();
        require_send::<data::YahooProvider>();
        require_sync::<data::YahooProvider>();
        require_send::<data::FallbackProvider>();
        require_sync::<data::FallbackProvider>();
        require_send::<engine::AlertEngine<'static>>();
        require_sync::<engine::AlertEngine<'static>>();
    }
}
