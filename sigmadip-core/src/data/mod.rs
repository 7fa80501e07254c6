//! Price data providers

pub mod circuit_breaker;
pub mod csv_import;
pub mod fallback;
pub mod memory;
pub mod provider;
pub mod yahoo;

pub use circuit_breaker::CircuitBreaker;
pub use csv_import::CsvProvider;
pub use fallback::FallbackProvider;
pub use memory::MemoryProvider;
pub use provider::{DataError, MarketSession, PriceSeriesProvider, Quote};
pub use yahoo::YahooProvider;
