//! Plain-text rendering of a run.

use super::compose::{AlertReport, TickerReport};
use chrono::{DateTime, FixedOffset};
use serde::Serialize;
use std::fmt::Write;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// All ticker reports from one run, in configured ticker order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunReport {
    pub generated_at: DateTime<FixedOffset>,
    pub reports: Vec<TickerReport>,
}

impl RunReport {
    pub fn new(generated_at: DateTime<FixedOffset>, reports: Vec<TickerReport>) -> Self {
        Self {
            generated_at,
            reports,
        }
    }

    pub fn signal_count(&self) -> usize {
        self.reports.iter().filter(|r| r.condition_met()).count()
    }

    pub fn unavailable_count(&self) -> usize {
        self.reports.iter().filter(|r| !r.is_ready()).count()
    }

    /// One block per ticker, separated by blank lines.
    pub fn render(&self) -> String {
        self.render_blocks().join("\n\n")
    }

    /// Blocks of the rendered text, one per ticker.
    pub fn render_blocks(&self) -> Vec<String> {
        let stamp = self.generated_at.format(TIMESTAMP_FORMAT).to_string();
        self.reports.iter().map(|r| render_ticker(r, &stamp)).collect()
    }

    /// blake3 over the serialized reports. The timestamp is left out, so
    /// identical input data always gives the same fingerprint.
    pub fn fingerprint(&self) -> String {
        let json = serde_json::to_vec(&self.reports).unwrap_or_default();
        blake3::hash(&json).to_hex().to_string()
    }
}

/// `1σ`, `2σ`, `1.5σ`.
pub fn sigma_label(multiple: f64) -> String {
    if multiple.fract() == 0.0 {
        format!("{multiple:.0}σ")
    } else {
        format!("{multiple}σ")
    }
}

fn pct(value: f64) -> String {
    format!("{:.2}%", value * 100.0)
}

fn signed_pct(value: f64) -> String {
    if value > 0.0 {
        format!("+{:.2}%", value * 100.0)
    } else {
        pct(value)
    }
}

fn render_ticker(report: &TickerReport, stamp: &str) -> String {
    match report {
        TickerReport::Ready(r) => render_ready(r, stamp),
        TickerReport::Unavailable { symbol, error } => {
            format!("❌ [{symbol}] analysis unavailable: {error}")
        }
    }
}

fn render_ready(r: &AlertReport, stamp: &str) -> String {
    // Writing to a String cannot fail.
    let mut out = String::new();
    let _ = writeln!(out, "📉 [{} buy-signal check]", r.symbol);
    let _ = writeln!(out, "Generated at: {stamp}");
    for level in &r.levels {
        let _ = writeln!(
            out,
            "{} ({}, {}d): {} (threshold: ${:.2})",
            sigma_label(level.multiple),
            r.sigma_mode,
            r.window,
            pct(level.multiple * r.sigma),
            level.threshold_price
        );
    }
    if let (Some(rate), Some(years)) = (r.event_rate, r.event_rate_years) {
        let _ = writeln!(
            out,
            "Sigma drops over last {years}y: {}/year",
            rate.annualized()
        );
    }
    let _ = writeln!(out, "Previous close: ${:.2}", r.prev_close);
    let _ = writeln!(
        out,
        "Current price: ${:.2}{}",
        r.current_price,
        if r.live_price { " (live)" } else { "" }
    );
    let _ = writeln!(out, "Change: {}", signed_pct(r.return_today));
    let verdict = match r.triggered_level {
        Some(k) => format!("✅ {}", sigma_label(k)),
        None => "❌ No".to_string(),
    };
    let _ = write!(out, "Buy condition met: {verdict}");

    if let Some(fixed) = r.fixed_tp {
        let k = r.fixed_tp_multiple.unwrap_or_default();
        let _ = write!(out, "\nTP (fixed k={k}): {}", pct(fixed));
    }
    match r.optimal_tp {
        Some(tp) => {
            let _ = write!(
                out,
                "\nOptimal TP (historical): {} ({} hits, net {})",
                pct(tp.tp_percent),
                tp.hit_count,
                pct(tp.total_net_return)
            );
        }
        None if r.tp_search => {
            let _ = write!(out, "\nOptimal TP (historical): n/a");
        }
        None => {}
    }
    out
}

/// The periodic "still alive" message.
pub fn render_heartbeat(now: DateTime<FixedOffset>) -> String {
    format!(
        "✅ Heartbeat: sigmadip is running ({})",
        now.format(TIMESTAMP_FORMAT)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alert::compose::{LevelThreshold, TickerError};
    use crate::signal::TpCandidateResult;
    use crate::stats::SigmaMode;
    use chrono::TimeZone;

    fn at() -> DateTime<FixedOffset> {
        FixedOffset::east_opt(9 * 3600)
            .unwrap()
            .with_ymd_and_hms(2024, 5, 1, 22, 30, 0)
            .unwrap()
    }

    fn report() -> AlertReport {
        AlertReport {
            symbol: "SOXL".into(),
            sigma: 0.05,
            sigma_mode: SigmaMode::PointInTime,
            window: 252,
            threshold_price: 90.0,
            current_price: 89.0,
            prev_close: 100.0,
            return_today: -0.11,
            live_price: false,
            condition_met: true,
            triggered_level: Some(2.0),
            levels: vec![LevelThreshold {
                multiple: 2.0,
                threshold_price: 90.0,
                crossed: true,
            }],
            event_rate: None,
            event_rate_years: None,
            optimal_tp: Some(TpCandidateResult {
                tp_percent: 0.065,
                total_net_return: 0.1,
                hit_count: 2,
            }),
            fixed_tp: None,
            fixed_tp_multiple: None,
            tp_search: true,
        }
    }

    #[test]
    fn renders_ready_report() {
        let run = RunReport::new(at(), vec![TickerReport::Ready(report())]);
        let text = run.render();
        assert!(text.starts_with("📉 [SOXL buy-signal check]"));
        assert!(text.contains("Generated at: 2024-05-01 22:30:00"));
        assert!(text.contains("2σ (point-in-time, 252d): 10.00% (threshold: $90.00)"));
        assert!(text.contains("Change: -11.00%"));
        assert!(text.contains("Buy condition met: ✅ 2σ"));
        assert!(text.contains("Optimal TP (historical): 6.50% (2 hits, net 10.00%)"));
    }

    #[test]
    fn renders_unavailable_entry() {
        let run = RunReport::new(
            at(),
            vec![TickerReport::Unavailable {
                symbol: "QLD".into(),
                error: TickerError::DataUnavailable {
                    reason: "empty series".into(),
                },
            }],
        );
        assert_eq!(
            run.render(),
            "❌ [QLD] analysis unavailable: data unavailable: empty series"
        );
    }

    #[test]
    fn missing_tp_shows_na_when_searched() {
        let mut r = report();
        r.optimal_tp = None;
        let text = RunReport::new(at(), vec![TickerReport::Ready(r.clone())]).render();
        assert!(text.ends_with("Optimal TP (historical): n/a"));

        r.tp_search = false;
        let text = RunReport::new(at(), vec![TickerReport::Ready(r)]).render();
        assert!(text.ends_with("Buy condition met: ✅ 2σ"));
    }

    #[test]
    fn positive_change_has_plus_sign() {
        assert_eq!(signed_pct(0.0123), "+1.23%");
        assert_eq!(signed_pct(0.0), "0.00%");
    }

    #[test]
    fn fingerprint_ignores_timestamp() {
        let a = RunReport::new(at(), vec![TickerReport::Ready(report())]);
        let mut b = a.clone();
        b.generated_at = at() + chrono::Duration::hours(3);
        assert_eq!(a.fingerprint(), b.fingerprint());
    }

    #[test]
    fn sigma_labels() {
        assert_eq!(sigma_label(2.0), "2σ");
        assert_eq!(sigma_label(1.5), "1.5σ");
    }
}
