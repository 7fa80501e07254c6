//! AlertReport and the buy-condition rule.
//!
//! A level `k` is crossed when `current <= prev_close * (1 - k * sigma)`.
//! With several levels the largest crossed multiple is reported, so a day
//! that breaks both 1σ and 2σ is labelled 2σ.

use crate::pricing::ResolvedPrices;
use crate::signal::{EventFrequency, TpCandidateResult};
use crate::stats::SigmaMode;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Why a ticker produced no report. None of these abort a run.
#[derive(Debug, Clone, Error, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TickerError {
    #[error("data unavailable: {reason}")]
    DataUnavailable { reason: String },

    #[error("insufficient history: need {needed} closes, have {available}")]
    InsufficientHistory { needed: usize, available: usize },

    #[error("{name} could not be computed")]
    UndefinedStatistic { name: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LevelThreshold {
    pub multiple: f64,
    pub threshold_price: f64,
    pub crossed: bool,
}

/// Per-ticker snapshot for one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertReport {
    pub symbol: String,
    pub sigma: f64,
    pub sigma_mode: SigmaMode,
    pub window: usize,
    /// Threshold of the strictest configured level.
    pub threshold_price: f64,
    pub current_price: f64,
    pub prev_close: f64,
    pub return_today: f64,
    pub live_price: bool,
    pub condition_met: bool,
    /// Largest crossed multiple, if any.
    pub triggered_level: Option<f64>,
    pub levels: Vec<LevelThreshold>,
    pub event_rate: Option<EventFrequency>,
    pub event_rate_years: Option<u32>,
    pub optimal_tp: Option<TpCandidateResult>,
    /// Whether a TP search was configured (distinguishes "off" from "no result").
    pub tp_search: bool,
    pub fixed_tp: Option<f64>,
    pub fixed_tp_multiple: Option<f64>,
}

/// Everything `compose` needs, already computed.
#[derive(Debug, Clone)]
pub struct AlertInputs<'a> {
    pub symbol: &'a str,
    pub sigma: f64,
    pub sigma_mode: SigmaMode,
    pub window: usize,
    pub prices: ResolvedPrices,
    pub levels: &'a [f64],
    pub event_rate: Option<EventFrequency>,
    pub event_rate_years: Option<u32>,
    pub optimal_tp: Option<TpCandidateResult>,
    pub tp_search: bool,
    pub fixed_tp_multiple: Option<f64>,
}

pub fn compose(inputs: AlertInputs<'_>) -> AlertReport {
    let prices = inputs.prices;

    let mut levels: Vec<LevelThreshold> = inputs
        .levels
        .iter()
        .map(|&k| {
            let threshold_price = prices.prev_close * (1.0 - k * inputs.sigma);
            LevelThreshold {
                multiple: k,
                threshold_price,
                crossed: prices.current_price <= threshold_price,
            }
        })
        .collect();
    levels.sort_by(|a, b| a.multiple.total_cmp(&b.multiple));

    let triggered_level = levels.iter().rev().find(|l| l.crossed).map(|l| l.multiple);
    let threshold_price = levels
        .last()
        .map_or(prices.prev_close, |l| l.threshold_price);

    AlertReport {
        symbol: inputs.symbol.to_string(),
        sigma: inputs.sigma,
        sigma_mode: inputs.sigma_mode,
        window: inputs.window,
        threshold_price,
        current_price: prices.current_price,
        prev_close: prices.prev_close,
        return_today: prices.return_today(),
        live_price: prices.live,
        condition_met: triggered_level.is_some(),
        triggered_level,
        levels,
        event_rate: inputs.event_rate,
        event_rate_years: inputs.event_rate_years,
        optimal_tp: inputs.optimal_tp,
        tp_search: inputs.tp_search,
        fixed_tp: inputs.fixed_tp_multiple.map(|m| m * inputs.sigma),
        fixed_tp_multiple: inputs.fixed_tp_multiple,
    }
}

/// One entry of a run: a full report or an explicit degraded entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TickerReport {
    Ready(AlertReport),
    Unavailable { symbol: String, error: TickerError },
}

impl TickerReport {
    pub fn symbol(&self) -> &str {
        match self {
            TickerReport::Ready(r) => &r.symbol,
            TickerReport::Unavailable { symbol, .. } => symbol,
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, TickerReport::Ready(_))
    }

    pub fn condition_met(&self) -> bool {
        matches!(self, TickerReport::Ready(r) if r.condition_met)
    }
}
