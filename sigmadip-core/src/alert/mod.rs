//! Alert composition and rendering.
//!
//! Composition is pure: numbers in, `AlertReport` out. Rendering turns a
//! run's reports into the text handed to a notification sink.

pub mod compose;
pub mod render;

pub use compose::{compose, AlertInputs, AlertReport, LevelThreshold, TickerError, TickerReport};
pub use render::{render_heartbeat, sigma_label, RunReport};
