//! End-to-end runs over in-memory data: fetch, estimate, detect, optimize,
//! compose, render and deliver.

mod common;

use chrono::{FixedOffset, TimeZone};
use sigmadip_core::alert::{compose, AlertInputs};
use sigmadip_core::config::{PriceSource, TpMode};
use sigmadip_core::data::{DataError, FallbackProvider, MarketSession, MemoryProvider, Quote};
use sigmadip_core::notify::{deliver, RecordingSink};
use sigmadip_core::pricing::ResolvedPrices;
use sigmadip_core::signal::{TpOptimizer, TriggerEvent};
use sigmadip_core::stats::SigmaMode;
use sigmadip_core::{AlertConfig, AlertEngine, TickerError, TickerReport};

fn stamp() -> chrono::DateTime<FixedOffset> {
    FixedOffset::east_opt(9 * 3600)
        .unwrap()
        .with_ymd_and_hms(2024, 6, 29, 7, 0, 0)
        .unwrap()
}

fn provider() -> MemoryProvider {
    MemoryProvider::new()
        .with_series("TQQQ", common::walk("TQQQ", 600, 1))
        .with_series("SOXL", sigmadip_core::domain::PriceSeries::empty("SOXL"))
}

#[test]
fn one_empty_ticker_does_not_abort_the_run() {
    let config = AlertConfig::with_tickers(["TQQQ", "SOXL"]);
    let provider = provider();
    let engine = AlertEngine::new(&config, &provider).unwrap();

    let run = engine.run(common::end_date(), stamp());
    assert_eq!(run.reports.len(), 2);

    match &run.reports[0] {
        TickerReport::Ready(r) => {
            assert_eq!(r.symbol, "TQQQ");
            assert!(r.sigma > 0.0);
            assert_eq!(r.sigma_mode, SigmaMode::PointInTime);
            assert!(r.event_rate.is_some());
            assert!(r.optimal_tp.is_some());
        }
        other => panic!("expected a ready report, got {other:?}"),
    }
    assert!(matches!(
        &run.reports[1],
        TickerReport::Unavailable {
            symbol,
            error: TickerError::DataUnavailable { .. },
        } if symbol == "SOXL"
    ));
    assert_eq!(run.unavailable_count(), 1);

    let text = run.render();
    assert!(text.contains("📉 [TQQQ buy-signal check]"));
    assert!(text.contains("❌ [SOXL] analysis unavailable"));
}

#[test]
fn zero_event_rate_years_skips_the_event_rate() {
    let mut config = AlertConfig::with_tickers(["TQQQ"]);
    config.tickers[0].overrides.event_rate_years = Some(0);
    let provider = provider();
    let engine = AlertEngine::new(&config, &provider).unwrap();

    match &engine.run(common::end_date(), stamp()).reports[0] {
        TickerReport::Ready(r) => {
            assert!(r.event_rate.is_none());
            assert_eq!(r.event_rate_years, None);
        }
        other => panic!("expected a ready report, got {other:?}"),
    }
}

#[test]
fn identical_input_gives_identical_output() {
    let config = AlertConfig::with_tickers(["TQQQ", "SOXL"]);
    let provider = provider();
    let engine = AlertEngine::new(&config, &provider).unwrap();

    let a = engine.run(common::end_date(), stamp());
    let b = engine.run(common::end_date(), stamp());
    assert_eq!(a.render(), b.render());
    assert_eq!(a.fingerprint(), b.fingerprint());
}

#[test]
fn parallel_run_keeps_ticker_order() {
    let symbols = ["TQQQ", "SOXL", "QLD", "UPRO"];
    let mut provider = MemoryProvider::new();
    for (i, s) in symbols.iter().enumerate() {
        provider = provider.with_series(s, common::walk(s, 500, i as u64 + 10));
    }

    let mut sequential = AlertConfig::with_tickers(symbols);
    sequential.parallel = false;
    let mut parallel = sequential.clone();
    parallel.parallel = true;

    let a = AlertEngine::new(&sequential, &provider)
        .unwrap()
        .run(common::end_date(), stamp());
    let b = AlertEngine::new(&parallel, &provider)
        .unwrap()
        .run(common::end_date(), stamp());

    let order: Vec<&str> = b.reports.iter().map(|r| r.symbol()).collect();
    assert_eq!(order, symbols);
    assert_eq!(a.fingerprint(), b.fingerprint());
}

#[test]
fn live_quote_during_session_is_used() {
    let series = common::walk("TQQQ", 400, 5);
    let prev = series.last().unwrap().close;
    let provider = MemoryProvider::new()
        .with_series("TQQQ", series)
        .with_quote(
            "TQQQ",
            Quote {
                previous_close: Some(prev),
                last_price: Some(prev * 0.5),
                session: MarketSession::Regular,
            },
        );
    let mut config = AlertConfig::with_tickers(["TQQQ"]);
    config.defaults.price_source = PriceSource::Live;
    config.defaults.take_profit.mode = TpMode::Off;

    let engine = AlertEngine::new(&config, &provider).unwrap();
    let run = engine.run(common::end_date(), stamp());
    let TickerReport::Ready(r) = &run.reports[0] else {
        panic!("expected a ready report");
    };
    assert!(r.live_price);
    assert_eq!(r.prev_close, prev);
    assert_eq!(r.current_price, prev * 0.5);
    assert!(r.condition_met);
    assert!(run.render().contains("(live)"));
}

#[test]
fn fallback_uses_second_provider_and_reports_all_failures() {
    let fallback = FallbackProvider::new(vec![
        Box::new(MemoryProvider::new()),
        Box::new(MemoryProvider::new().with_series("TQQQ", common::walk("TQQQ", 400, 2))),
    ]);
    let config = AlertConfig::with_tickers(["TQQQ", "TMF"]);
    let engine = AlertEngine::new(&config, &fallback).unwrap();
    let run = engine.run(common::end_date(), stamp());

    assert!(run.reports[0].is_ready());
    match &run.reports[1] {
        TickerReport::Unavailable {
            error: TickerError::DataUnavailable { reason },
            ..
        } => {
            // Both attempts are named in the single error.
            assert_eq!(reason.matches("memory:").count(), 2);
        }
        other => panic!("expected unavailable, got {other:?}"),
    }

    let err = sigmadip_core::data::PriceSeriesProvider::fetch(
        &fallback,
        "TMF",
        common::end_date(),
        common::end_date(),
    )
    .unwrap_err();
    assert!(matches!(err, DataError::Unavailable { .. }));
}

#[test]
fn report_is_delivered_to_sink() {
    let config = AlertConfig::with_tickers(["TQQQ", "SOXL"]);
    let provider = provider();
    let engine = AlertEngine::new(&config, &provider).unwrap();
    let run = engine.run(common::end_date(), stamp());

    let sink = RecordingSink::new();
    assert!(deliver(&sink, &run.render()));
    assert_eq!(sink.messages(), vec![run.render()]);

    let failing = RecordingSink::failing();
    assert!(!deliver(&failing, &run.render()));
    assert!(failing.messages().is_empty());
}

#[test]
fn threshold_crossing_worked_example() {
    let report = compose(AlertInputs {
        symbol: "TQQQ",
        sigma: 0.05,
        sigma_mode: SigmaMode::PointInTime,
        window: 252,
        prices: ResolvedPrices {
            prev_close: 100.0,
            current_price: 95.0,
            live: false,
        },
        levels: &[1.0],
        event_rate: None,
        event_rate_years: None,
        optimal_tp: None,
        tp_search: false,
        fixed_tp_multiple: None,
    });
    assert!((report.threshold_price - 95.0).abs() < 1e-9);
    assert!(report.condition_met);
    assert_eq!(report.triggered_level, Some(1.0));
}

#[test]
fn take_profit_worked_example() {
    let event = TriggerEvent {
        date: common::end_date(),
        entry_price: 100.0,
        prev_close: 110.0,
        sigma_at_trigger: 0.05,
        forward_prices: vec![101.0, 103.0],
    };
    let optimizer = TpOptimizer::from_candidates(vec![0.02, 0.04], 0.00065);
    let grid = optimizer.evaluate(std::slice::from_ref(&event));
    assert_eq!(grid[0].hit_count, 1);
    assert!((grid[0].total_net_return - 0.0187).abs() < 1e-12);
    assert_eq!(grid[1].hit_count, 0);
    assert_eq!(grid[1].total_net_return, 0.0);

    let best = optimizer.optimize(&[event]).unwrap();
    assert_eq!(best.tp_percent, 0.02);
}
