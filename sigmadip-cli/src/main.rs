//! sigmadip CLI: run the sigma-dip alert, inspect trigger events, check config.
//!
//! Commands:
//! - `run` fetch prices, evaluate every ticker, print and deliver the report
//! - `events` list historical trigger events and the scored TP grid for one ticker
//! - `check` validate a config file and print the resolved per-ticker profiles

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use sigmadip_core::alert::{render_heartbeat, sigma_label};
use sigmadip_core::config::PriceSource;
use sigmadip_core::data::{CircuitBreaker, CsvProvider, FallbackProvider, YahooProvider};
use sigmadip_core::notify::{
    deliver, deliver_report, DiscordWebhook, NotificationSink, StdoutSink,
};
use sigmadip_core::{AlertConfig, AlertEngine};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const WEBHOOK_ENV: &str = "DISCORD_WEBHOOK";

#[derive(Parser)]
#[command(
    name = "sigmadip",
    version,
    about = "Sigma-dip buy-signal alerts for leveraged ETFs"
)]
struct Cli {
    /// Debug logging (overridden by RUST_LOG).
    #[arg(short, long, global = true, default_value_t = false)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct DataArgs {
    /// Path to the TOML config file.
    #[arg(long, default_value = "sigmadip.toml")]
    config: PathBuf,

    /// Offline mode: read prices from --csv-dir only.
    #[arg(long, default_value_t = false)]
    offline: bool,

    /// Directory of <SYMBOL>.csv files, tried after Yahoo (or alone with --offline).
    #[arg(long)]
    csv_dir: Option<PathBuf>,

    /// Evaluation date (YYYY-MM-DD). Defaults to today in the configured offset.
    /// Live quotes describe today, so a set date forces series prices.
    #[arg(long)]
    date: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate all configured tickers and deliver the report.
    Run {
        #[command(flatten)]
        data: DataArgs,

        /// Print the report without sending it.
        #[arg(long, default_value_t = false)]
        dry_run: bool,

        /// Print the report as JSON instead of text.
        #[arg(long, default_value_t = false)]
        json: bool,

        /// Discord webhook URL. Falls back to $DISCORD_WEBHOOK, then the config file.
        #[arg(long)]
        webhook: Option<String>,
    },
    /// List trigger events and the TP grid for one configured ticker.
    Events {
        /// Ticker symbol (must be in the config).
        symbol: String,

        #[command(flatten)]
        data: DataArgs,

        /// Print as JSON instead of tables.
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Validate a config file and print the resolved profiles.
    Check {
        /// Path to the TOML config file.
        #[arg(long, default_value = "sigmadip.toml")]
        config: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Run {
            data,
            dry_run,
            json,
            webhook,
        } => run_alert(&data, dry_run, json, webhook),
        Commands::Events { symbol, data, json } => run_events(&symbol, &data, json),
        Commands::Check { config } => run_check(&config),
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(path: &Path) -> Result<AlertConfig> {
    AlertConfig::from_file(path).with_context(|| format!("loading config {}", path.display()))
}

/// Config for a run; a replayed `--date` cannot use today's live quotes.
fn load_run_config(data: &DataArgs) -> Result<AlertConfig> {
    let mut config = load_config(&data.config)?;
    if let Some(date) = &data.date {
        if config.uses_live_prices() {
            warn!(date = %date, "live quotes ignored for a fixed --date, using series closes");
            config.pin_price_source(PriceSource::Series);
        }
    }
    Ok(config)
}

fn build_provider(data: &DataArgs) -> Result<FallbackProvider> {
    let mut provider = FallbackProvider::new(Vec::new());
    if data.offline {
        let Some(dir) = &data.csv_dir else {
            bail!("--offline requires --csv-dir");
        };
        provider.push(Box::new(CsvProvider::new(dir)));
        return Ok(provider);
    }

    let breaker = Arc::new(CircuitBreaker::default_provider());
    provider.push(Box::new(YahooProvider::new(breaker)?));
    if let Some(dir) = &data.csv_dir {
        provider.push(Box::new(CsvProvider::new(dir)));
    }
    Ok(provider)
}

fn evaluation_date(data: &DataArgs, engine: &AlertEngine<'_>) -> Result<NaiveDate> {
    match data.date.as_deref() {
        Some(s) => NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .with_context(|| format!("invalid --date {s:?}, expected YYYY-MM-DD")),
        None => Ok(engine.now().date_naive()),
    }
}

fn build_sink(config: &AlertConfig, webhook: Option<String>) -> Result<Box<dyn NotificationSink>> {
    let url = webhook
        .or_else(|| std::env::var(WEBHOOK_ENV).ok())
        .or_else(|| config.notify.webhook_url.clone())
        .filter(|u| !u.trim().is_empty());

    match url {
        Some(url) => Ok(Box::new(DiscordWebhook::new(url, config.notify.mention.clone())?)),
        None => {
            warn!("no webhook configured (--webhook, ${WEBHOOK_ENV} or notify.webhook_url); printing only");
            Ok(Box::new(StdoutSink))
        }
    }
}

fn run_alert(data: &DataArgs, dry_run: bool, json: bool, webhook: Option<String>) -> Result<()> {
    let config = load_run_config(data)?;
    let provider = build_provider(data)?;
    let engine = AlertEngine::new(&config, &provider)?;
    let today = evaluation_date(data, &engine)?;

    let run = engine.run(today, engine.now());
    let text = run.render();

    if json {
        println!("{}", serde_json::to_string_pretty(&run)?);
    } else {
        println!("{text}");
    }

    if dry_run {
        info!("dry run, nothing sent");
        return Ok(());
    }

    let sink = build_sink(&config, webhook)?;
    deliver_report(sink.as_ref(), &text);
    if engine.is_heartbeat_day(today) {
        deliver(sink.as_ref(), &render_heartbeat(engine.now()));
    }
    Ok(())
}

fn run_events(symbol: &str, data: &DataArgs, json: bool) -> Result<()> {
    let config = load_run_config(data)?;
    let provider = build_provider(data)?;
    let engine = AlertEngine::new(&config, &provider)?;
    let today = evaluation_date(data, &engine)?;

    let backtest = engine.backtest(symbol, today)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&backtest)?);
        return Ok(());
    }

    let span = match (backtest.first_date, backtest.last_date) {
        (Some(a), Some(b)) => format!("{a} to {b}"),
        _ => "no data".to_string(),
    };
    println!(
        "{}: {} trigger events at {} ({span})",
        backtest.symbol,
        backtest.events.len(),
        sigma_label(backtest.multiple)
    );
    println!();
    println!(
        "{:<12} {:>10} {:>10} {:>8} {:>8} {:>10}",
        "date", "prev", "entry", "change", "sigma", "max fwd"
    );
    for ev in &backtest.events {
        let max_fwd = ev
            .max_forward()
            .map(|p| format!("{p:.2}"))
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{:<12} {:>10.2} {:>10.2} {:>7.2}% {:>7.2}% {:>10}",
            ev.date.to_string(),
            ev.prev_close,
            ev.entry_price,
            ev.drop_pct() * 100.0,
            ev.sigma_at_trigger * 100.0,
            max_fwd
        );
    }

    if backtest.grid.is_empty() {
        println!("\nNo events, TP grid not scored.");
        return Ok(());
    }

    println!();
    println!("{:>8} {:>6} {:>10}", "tp", "hits", "net");
    for row in &backtest.grid {
        let marker = if backtest.best.map(|b| b.tp_percent) == Some(row.tp_percent) {
            " <- best"
        } else {
            ""
        };
        println!(
            "{:>7.1}% {:>6} {:>9.2}%{marker}",
            row.tp_percent * 100.0,
            row.hit_count,
            row.total_net_return * 100.0
        );
    }
    Ok(())
}

fn run_check(path: &Path) -> Result<()> {
    let config = load_config(path)?;
    println!(
        "Config OK: {} tickers, fees {}, UTC{:+}, parallel {}",
        config.tickers.len(),
        config.fees,
        config.utc_offset_hours,
        config.parallel
    );
    for ticker in config.profiles() {
        let p = &ticker.profile;
        let levels: Vec<String> = p.levels.iter().map(|&k| sigma_label(k)).collect();
        println!(
            "  {:<6} window={} mode={} levels=[{}] price={:?} tp={:?} history={}d",
            ticker.symbol,
            p.window,
            p.sigma_mode,
            levels.join(", "),
            p.price_source,
            p.take_profit.mode,
            p.history_calendar_days()
        );
    }
    Ok(())
}
