//! One alert run: fetch, estimate, detect, optimize, compose.
//!
//! Each ticker is evaluated on its own series only. A ticker that cannot be
//! evaluated yields a `TickerReport::Unavailable` entry and never stops the
//! others. Only an invalid configuration is rejected up front.

use crate::alert::{compose, AlertInputs, AlertReport, RunReport, TickerError, TickerReport};
use crate::config::{AlertConfig, ConfigError, PriceSource, TickerProfile, TRADING_DAYS_PER_YEAR};
use crate::data::PriceSeriesProvider;
use crate::domain::PriceSeries;
use crate::pricing::resolve_prices;
use crate::signal::{
    count_events, EventDetector, EventFrequency, TpCandidateResult, TpOptimizer, TriggerEvent,
};
use chrono::{DateTime, Datelike, FixedOffset, NaiveDate, Offset, Utc};
use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, info, warn};

/// Trigger events and the full TP grid for one ticker.
#[derive(Debug, Clone, Serialize)]
pub struct Backtest {
    pub symbol: String,
    pub first_date: Option<NaiveDate>,
    pub last_date: Option<NaiveDate>,
    pub multiple: f64,
    pub events: Vec<TriggerEvent>,
    pub grid: Vec<TpCandidateResult>,
    pub best: Option<TpCandidateResult>,
}

pub struct AlertEngine<'a> {
    config: &'a AlertConfig,
    provider: &'a dyn PriceSeriesProvider,
}

impl<'a> AlertEngine<'a> {
    pub fn new(
        config: &'a AlertConfig,
        provider: &'a dyn PriceSeriesProvider,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self { config, provider })
    }

    pub fn config(&self) -> &AlertConfig {
        self.config
    }

    /// Timezone offset for report timestamps.
    pub fn offset(&self) -> FixedOffset {
        FixedOffset::east_opt(self.config.utc_offset_hours * 3600).unwrap_or_else(|| Utc.fix())
    }

    /// Current time in the configured offset.
    pub fn now(&self) -> DateTime<FixedOffset> {
        Utc::now().with_timezone(&self.offset())
    }

    /// Evaluate every configured ticker as of `today`.
    ///
    /// Output order always matches the configured ticker order.
    pub fn evaluate_all(&self, today: NaiveDate) -> Vec<TickerReport> {
        let profiles = self.config.profiles();
        let start = today - chrono::Duration::days(self.config.history_calendar_days() as i64);
        info!(
            tickers = profiles.len(),
            %start,
            end = %today,
            parallel = self.config.parallel,
            "starting alert run"
        );

        if self.config.parallel {
            profiles
                .par_iter()
                .map(|p| self.evaluate(p, start, today))
                .collect()
        } else {
            profiles.iter().map(|p| self.evaluate(p, start, today)).collect()
        }
    }

    /// Evaluate all tickers and stamp the result with `generated_at`.
    pub fn run(&self, today: NaiveDate, generated_at: DateTime<FixedOffset>) -> RunReport {
        let run = RunReport::new(generated_at, self.evaluate_all(today));
        info!(
            signals = run.signal_count(),
            unavailable = run.unavailable_count(),
            fingerprint = %run.fingerprint(),
            "alert run complete"
        );
        run
    }

    /// Whether `today` is the configured heartbeat day.
    pub fn is_heartbeat_day(&self, today: NaiveDate) -> bool {
        self.config.heartbeat_day == Some(today.day())
    }

    fn evaluate(&self, ticker: &TickerProfile, start: NaiveDate, end: NaiveDate) -> TickerReport {
        let symbol = ticker.symbol.as_str();
        let result = self
            .provider
            .fetch(symbol, start, end)
            .map_err(|e| TickerError::DataUnavailable {
                reason: e.to_string(),
            })
            .and_then(|series| self.analyze(ticker, &series));

        match result {
            Ok(report) => {
                info!(
                    symbol,
                    sigma = report.sigma,
                    condition_met = report.condition_met,
                    "ticker evaluated"
                );
                TickerReport::Ready(report)
            }
            Err(error) => {
                warn!(symbol, %error, "ticker unavailable");
                TickerReport::Unavailable {
                    symbol: symbol.to_string(),
                    error,
                }
            }
        }
    }

    /// Build the report for one ticker from an already fetched series.
    pub fn analyze(
        &self,
        ticker: &TickerProfile,
        series: &PriceSeries,
    ) -> Result<AlertReport, TickerError> {
        let symbol = ticker.symbol.as_str();
        let profile = &ticker.profile;

        if series.is_empty() {
            return Err(TickerError::DataUnavailable {
                reason: "empty series".into(),
            });
        }

        let returns = series.returns();
        let estimator = profile.estimator();
        if returns.len() < estimator.required_returns() {
            return Err(TickerError::InsufficientHistory {
                needed: estimator.required_returns() + 1,
                available: series.len(),
            });
        }
        let sigma = estimator
            .estimate(returns.values())
            .ok_or_else(|| TickerError::UndefinedStatistic {
                name: "sigma".into(),
            })?;
        debug!(symbol, sigma, mode = %estimator.mode(), "sigma estimated");

        let quote = match profile.price_source {
            PriceSource::Series => None,
            PriceSource::Live => match self.provider.fetch_quote(symbol) {
                Ok(q) => Some(q),
                Err(e) => {
                    warn!(symbol, error = %e, "quote unavailable, falling back to series");
                    None
                }
            },
        };
        let prices = resolve_prices(series, profile.price_source, quote.as_ref()).ok_or(
            TickerError::InsufficientHistory {
                needed: 2,
                available: series.len(),
            },
        )?;

        let event_rate = profile
            .active_event_rate_years()
            .and_then(|years| self.event_rate(ticker, series, years));

        let tp = &profile.take_profit;
        let optimal_tp = if tp.mode.optimized() {
            self.optimize_tp(ticker, series)
        } else {
            None
        };

        Ok(compose(AlertInputs {
            symbol,
            sigma,
            sigma_mode: estimator.mode(),
            window: estimator.window(),
            prices,
            levels: &profile.levels,
            event_rate,
            event_rate_years: profile.active_event_rate_years(),
            optimal_tp,
            tp_search: tp.mode.optimized(),
            fixed_tp_multiple: tp.mode.fixed().then_some(tp.fixed_multiple),
        }))
    }

    fn event_rate(
        &self,
        ticker: &TickerProfile,
        series: &PriceSeries,
        years: u32,
    ) -> Option<EventFrequency> {
        let profile = &ticker.profile;
        let returns = series.returns();
        let rolling = profile.estimator().rolling(returns.values());
        let rate = count_events(
            returns.dates(),
            returns.values(),
            &rolling,
            profile.event_rate_multiple,
            years as usize * TRADING_DAYS_PER_YEAR,
        );
        if rate.is_none() {
            debug!(symbol = %ticker.symbol, "event rate undefined");
        }
        rate
    }

    fn tp_window(&self, ticker: &TickerProfile, series: &PriceSeries) -> PriceSeries {
        let tp = &ticker.profile.take_profit;
        match series.last_date() {
            Some(last) => series.since(last - chrono::Duration::days(tp.history_days as i64)),
            None => series.clone(),
        }
    }

    fn detector(&self, ticker: &TickerProfile) -> EventDetector {
        let profile = &ticker.profile;
        EventDetector::new(
            profile.window,
            profile.tp_event_multiple(),
            profile.take_profit.forward_days,
        )
    }

    fn optimizer(&self, ticker: &TickerProfile) -> TpOptimizer {
        let tp = &ticker.profile.take_profit;
        TpOptimizer::new(&tp.grid, self.config.fees).with_margin(tp.margin)
    }

    fn optimize_tp(&self, ticker: &TickerProfile, series: &PriceSeries) -> Option<TpCandidateResult> {
        let window = self.tp_window(ticker, series);
        self.optimizer(ticker)
            .optimize_series(&window, &self.detector(ticker))
    }

    /// Trigger events and the scored TP grid for one configured ticker.
    pub fn backtest(&self, symbol: &str, today: NaiveDate) -> Result<Backtest, TickerError> {
        let ticker = self
            .config
            .profiles()
            .into_iter()
            .find(|p| p.symbol.eq_ignore_ascii_case(symbol))
            .ok_or_else(|| TickerError::DataUnavailable {
                reason: format!("{symbol} is not configured"),
            })?;

        let start = today - chrono::Duration::days(ticker.profile.history_calendar_days() as i64);
        let series = self
            .provider
            .fetch(&ticker.symbol, start, today)
            .map_err(|e| TickerError::DataUnavailable {
                reason: e.to_string(),
            })?;
        let window = self.tp_window(&ticker, &series);

        let detector = self.detector(&ticker);
        let optimizer = self.optimizer(&ticker);
        let events: Vec<TriggerEvent> = detector.events(&window).collect();
        let grid = if events.is_empty() {
            Vec::new()
        } else {
            optimizer.evaluate(&events)
        };

        Ok(Backtest {
            symbol: ticker.symbol.clone(),
            first_date: window.first_date(),
            last_date: window.last_date(),
            multiple: detector.multiple(),
            best: optimizer.optimize_series(&window, &detector),
            events,
            grid,
        })
    }
}
