//! Run configuration: fees, notification target and per-ticker signal profiles.
//!
//! Loaded from TOML. Every ticker starts from the `[defaults]` profile and
//! may override any field; a ticker's `take_profit` table replaces the
//! default one as a whole.

use crate::signal::{TpGrid, DEFAULT_FORWARD_DAYS, DEFAULT_MARGIN};
use crate::stats::sigma::{DEFAULT_MIN_OBSERVATIONS, DEFAULT_WINDOW};
use crate::stats::{SigmaEstimator, SigmaMode};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Trading days per year used to size return windows.
pub const TRADING_DAYS_PER_YEAR: usize = 252;

/// Round-trip leg fee used by the source alerts (0.065%).
pub const DEFAULT_FEES: f64 = 0.00065;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("no tickers configured")]
    NoTickers,

    #[error("ticker {0} is configured more than once")]
    DuplicateTicker(String),

    #[error("unknown setting(s) for {scope}: {}", .fields.join(", "))]
    UnknownFields { scope: String, fields: Vec<String> },

    #[error("invalid setting for {scope}: {message}")]
    Invalid { scope: String, message: String },
}

/// Where the current and previous prices come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriceSource {
    /// Last two closes of the daily series.
    Series,
    /// Provider previous close and, during the session, the live price.
    Live,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TpMode {
    Off,
    Optimized,
    Fixed,
    Both,
}

impl TpMode {
    pub fn optimized(self) -> bool {
        matches!(self, TpMode::Optimized | TpMode::Both)
    }

    pub fn fixed(self) -> bool {
        matches!(self, TpMode::Fixed | TpMode::Both)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TakeProfitConfig {
    pub mode: TpMode,
    pub grid: TpGrid,
    pub forward_days: usize,
    /// Calendar days of history the grid search runs over.
    pub history_days: u32,
    /// Bars beyond the sigma window required before searching.
    pub margin: usize,
    /// Sigma multiple for trigger events; defaults to the strictest level.
    pub event_multiple: Option<f64>,
    /// `tp = fixed_multiple * sigma` for the fixed mode.
    pub fixed_multiple: f64,
}

impl Default for TakeProfitConfig {
    fn default() -> Self {
        Self {
            mode: TpMode::Optimized,
            grid: TpGrid::default(),
            forward_days: DEFAULT_FORWARD_DAYS,
            history_days: 730,
            margin: DEFAULT_MARGIN,
            event_multiple: None,
            fixed_multiple: 2.0,
        }
    }
}

/// Everything that decides how one ticker is evaluated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SignalProfile {
    pub window: usize,
    pub min_observations: usize,
    pub sigma_mode: SigmaMode,
    /// Sigma multiples to test, e.g. `[1.0, 2.0]`.
    pub levels: Vec<f64>,
    pub price_source: PriceSource,
    /// Trailing years for the event-rate statistic; `None` or `0` disables it.
    pub event_rate_years: Option<u32>,
    pub event_rate_multiple: f64,
    pub take_profit: TakeProfitConfig,
}

impl Default for SignalProfile {
    fn default() -> Self {
        Self {
            window: DEFAULT_WINDOW,
            min_observations: DEFAULT_MIN_OBSERVATIONS,
            sigma_mode: SigmaMode::PointInTime,
            levels: vec![2.0],
            price_source: PriceSource::Series,
            event_rate_years: Some(1),
            event_rate_multiple: 1.0,
            take_profit: TakeProfitConfig::default(),
        }
    }
}

impl SignalProfile {
    pub fn estimator(&self) -> SigmaEstimator {
        SigmaEstimator::new(self.window, self.min_observations, self.sigma_mode)
    }

    /// Largest configured multiple.
    pub fn strictest_level(&self) -> f64 {
        self.levels.iter().copied().fold(f64::NAN, f64::max)
    }

    pub fn tp_event_multiple(&self) -> f64 {
        self.take_profit
            .event_multiple
            .unwrap_or_else(|| self.strictest_level())
    }

    /// Years for the event-rate statistic, if it is enabled.
    pub fn active_event_rate_years(&self) -> Option<u32> {
        self.event_rate_years.filter(|&years| years > 0)
    }

    /// Calendar days of history this profile needs from the provider.
    pub fn history_calendar_days(&self) -> u32 {
        let sigma_days = self.window + 2;
        let rate_days = self
            .active_event_rate_years()
            .map_or(0, |y| y as usize * TRADING_DAYS_PER_YEAR + self.window + 1);
        let trading = sigma_days.max(rate_days);
        let calendar = (trading as f64 * 365.25 / TRADING_DAYS_PER_YEAR as f64).ceil() as u32;
        let tp = if self.take_profit.mode.optimized() {
            self.take_profit.history_days
        } else {
            0
        };
        // Holiday buffer.
        calendar.max(tp) + 14
    }

    fn validate(&self, scope: &str) -> Result<(), ConfigError> {
        let invalid = |message: String| ConfigError::Invalid {
            scope: scope.to_string(),
            message,
        };
        if self.window < 2 {
            return Err(invalid(format!("window must be >= 2, got {}", self.window)));
        }
        if self.min_observations < 2 {
            return Err(invalid("min_observations must be >= 2".into()));
        }
        if self.min_observations > self.window {
            return Err(invalid(format!(
                "min_observations ({}) must not exceed window ({})",
                self.min_observations, self.window
            )));
        }
        if self.levels.is_empty() {
            return Err(invalid("levels must not be empty".into()));
        }
        if let Some(bad) = self.levels.iter().find(|k| !k.is_finite() || **k <= 0.0) {
            return Err(invalid(format!("level {bad} must be a positive number")));
        }
        if !self.event_rate_multiple.is_finite() || self.event_rate_multiple <= 0.0 {
            return Err(invalid("event_rate_multiple must be positive".into()));
        }
        let tp = &self.take_profit;
        if tp.mode.optimized() {
            if !tp.grid.is_valid() {
                return Err(invalid(format!(
                    "take_profit grid {}..{} step {} is not a valid ascending range",
                    tp.grid.start, tp.grid.end, tp.grid.step
                )));
            }
            if tp.forward_days == 0 {
                return Err(invalid("take_profit.forward_days must be >= 1".into()));
            }
            if let Some(k) = tp.event_multiple {
                if !k.is_finite() || k <= 0.0 {
                    return Err(invalid("take_profit.event_multiple must be positive".into()));
                }
            }
        }
        if tp.mode.fixed() && (!tp.fixed_multiple.is_finite() || tp.fixed_multiple <= 0.0) {
            return Err(invalid("take_profit.fixed_multiple must be positive".into()));
        }
        Ok(())
    }
}

/// Per-ticker overrides of the default profile.
///
/// `event_rate_years = 0` switches the event rate off for one ticker even
/// when the defaults enable it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProfileOverrides {
    pub window: Option<usize>,
    pub min_observations: Option<usize>,
    pub sigma_mode: Option<SigmaMode>,
    pub levels: Option<Vec<f64>>,
    pub price_source: Option<PriceSource>,
    pub event_rate_years: Option<u32>,
    pub event_rate_multiple: Option<f64>,
    pub take_profit: Option<TakeProfitConfig>,
}

impl ProfileOverrides {
    pub fn apply(&self, base: &SignalProfile) -> SignalProfile {
        SignalProfile {
            window: self.window.unwrap_or(base.window),
            min_observations: self.min_observations.unwrap_or(base.min_observations),
            sigma_mode: self.sigma_mode.unwrap_or(base.sigma_mode),
            levels: self.levels.clone().unwrap_or_else(|| base.levels.clone()),
            price_source: self.price_source.unwrap_or(base.price_source),
            event_rate_years: self
                .event_rate_years
                .or(base.event_rate_years)
                .filter(|&years| years > 0),
            event_rate_multiple: self.event_rate_multiple.unwrap_or(base.event_rate_multiple),
            take_profit: self
                .take_profit
                .clone()
                .unwrap_or_else(|| base.take_profit.clone()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TickerConfig {
    pub symbol: String,
    #[serde(flatten)]
    pub overrides: ProfileOverrides,
    /// Keys matching no override. Flattening rules out `deny_unknown_fields`,
    /// so `validate` rejects these instead.
    #[serde(flatten)]
    pub extra: BTreeMap<String, toml::Value>,
}

impl TickerConfig {
    pub fn new(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            overrides: ProfileOverrides::default(),
            extra: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct NotifyConfig {
    pub webhook_url: Option<String>,
    /// Prefix for every message, e.g. `@everyone`.
    pub mention: Option<String>,
}

/// A ticker paired with its fully resolved profile.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TickerProfile {
    pub symbol: String,
    pub profile: SignalProfile,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AlertConfig {
    /// Fee per leg; a round trip pays it twice.
    #[serde(default = "default_fees")]
    pub fees: f64,
    /// Offset of the report timestamp from UTC.
    #[serde(default = "default_utc_offset_hours")]
    pub utc_offset_hours: i32,
    #[serde(default)]
    pub parallel: bool,
    /// Day of month on which a heartbeat message is sent.
    #[serde(default)]
    pub heartbeat_day: Option<u32>,
    #[serde(default)]
    pub notify: NotifyConfig,
    #[serde(default)]
    pub defaults: SignalProfile,
    #[serde(default)]
    pub tickers: Vec<TickerConfig>,
}

fn default_fees() -> f64 {
    DEFAULT_FEES
}

fn default_utc_offset_hours() -> i32 {
    9
}

impl AlertConfig {
    /// Config with default profile for the given tickers.
    pub fn with_tickers<I, S>(tickers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            fees: DEFAULT_FEES,
            utc_offset_hours: default_utc_offset_hours(),
            parallel: false,
            heartbeat_day: None,
            notify: NotifyConfig::default(),
            defaults: SignalProfile::default(),
            tickers: tickers.into_iter().map(TickerConfig::new).collect(),
        }
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Parse and validate.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: AlertConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tickers.is_empty() {
            return Err(ConfigError::NoTickers);
        }
        let global = |message: String| ConfigError::Invalid {
            scope: "config".into(),
            message,
        };
        if !self.fees.is_finite() || self.fees < 0.0 {
            return Err(global(format!("fees must be >= 0, got {}", self.fees)));
        }
        if !(-12..=14).contains(&self.utc_offset_hours) {
            return Err(global(format!(
                "utc_offset_hours must be within -12..=14, got {}",
                self.utc_offset_hours
            )));
        }
        if let Some(day) = self.heartbeat_day {
            if !(1..=31).contains(&day) {
                return Err(global(format!("heartbeat_day must be 1..=31, got {day}")));
            }
        }

        self.defaults.validate("defaults")?;

        let mut seen = HashSet::new();
        for ticker in &self.tickers {
            let symbol = ticker.symbol.trim();
            if symbol.is_empty() {
                return Err(global("ticker symbol must not be empty".into()));
            }
            if !seen.insert(symbol.to_ascii_uppercase()) {
                return Err(ConfigError::DuplicateTicker(symbol.to_string()));
            }
            if !ticker.extra.is_empty() {
                return Err(ConfigError::UnknownFields {
                    scope: symbol.to_string(),
                    fields: ticker.extra.keys().cloned().collect(),
                });
            }
            ticker.overrides.apply(&self.defaults).validate(symbol)?;
        }
        Ok(())
    }

    /// Resolved profiles in configured ticker order.
    pub fn profiles(&self) -> Vec<TickerProfile> {
        self.tickers
            .iter()
            .map(|t| TickerProfile {
                symbol: t.symbol.trim().to_string(),
                profile: t.overrides.apply(&self.defaults),
            })
            .collect()
    }

    /// True when any resolved profile reads the current price from a live quote.
    pub fn uses_live_prices(&self) -> bool {
        self.profiles()
            .iter()
            .any(|p| p.profile.price_source == PriceSource::Live)
    }

    /// Force every ticker onto `source`, dropping per-ticker choices.
    pub fn pin_price_source(&mut self, source: PriceSource) {
        self.defaults.price_source = source;
        for ticker in &mut self.tickers {
            ticker.overrides.price_source = None;
        }
    }

    pub fn symbols(&self) -> Vec<String> {
        self.tickers.iter().map(|t| t.symbol.trim().to_string()).collect()
    }

    /// Calendar days of history to request so every profile can be evaluated.
    pub fn history_calendar_days(&self) -> u32 {
        self.profiles()
            .iter()
            .map(|p| p.profile.history_calendar_days())
            .max()
            .unwrap_or(0)
    }
}
