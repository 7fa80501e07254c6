//! Domain types for sigmadip

pub mod series;

pub use series::{PricePoint, PriceSeries, ReturnSeries, SeriesError};

/// Symbol type alias
pub type Symbol = String;
