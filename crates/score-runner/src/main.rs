//! score-runner: batch jobs for the scoring engine.
//!
//! Usage:
//!   score-runner recompute
//!   score-runner snapshot [--date YYYY-MM-DD]
//!   score-runner cleanup [--keep-days N]
//!   score-runner movers [--days N] [--limit N] [--direction up|down]
//!   score-runner signals [--days N]
//!   score-runner history TICKER [--days N]
//!   score-runner leaderboard [--limit N] [--sector NAME] [--signal SIGNAL]
//!   score-runner screen [--strategy NAME] [--min METRIC=V]... [--max METRIC=V]...
//!                       [--sector NAME] [--signal SIGNAL] [--min-percentile P]
//!                       [--sort METRIC] [--order asc|desc] [--limit N]
//!   score-runner import FILE.json
//!
//! Results are printed to stdout as JSON; logs go to stderr.

mod config;

use std::str::FromStr;
use std::sync::Arc;

use analysis_core::{InstrumentFundamentals, PriceSource, Signal};
use analysis_orchestrator::{ScreenMetric, ScreenerCriteria, ScreenerStrategy, ScoringOrchestrator};
use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use price_data::{FallbackPriceSource, SyntheticPriceSource, YahooPriceSource};
use score_history::MoverDirection;
use score_store::ScoreDb;
use serde::Serialize;

use config::RunnerConfig;

const USAGE: &str =
    "Usage: score-runner <recompute|snapshot|cleanup|movers|signals|history|leaderboard|screen|import> [options]";

const COMMANDS: [&str; 9] = [
    "recompute",
    "snapshot",
    "cleanup",
    "movers",
    "signals",
    "history",
    "leaderboard",
    "screen",
    "import",
];

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let Some(command) = args.first().map(String::as_str) else {
        eprintln!("{}", USAGE);
        std::process::exit(1);
    };
    if !is_known_command(command) {
        eprintln!("Unknown command '{}'", command);
        eprintln!("{}", USAGE);
        std::process::exit(1);
    }

    let config = RunnerConfig::from_env()?;
    tracing::debug!("Configuration: {:?}", config);

    let db = Arc::new(ScoreDb::new(&config.database_url).await?);
    let orchestrator = ScoringOrchestrator::new(db.clone())
        .with_price_source(price_source(&config), config.price_history_period);
    let tracker = orchestrator.history();

    match command {
        "recompute" => {
            let summary = orchestrator.recompute().await?;
            print_json(&summary)?;
        }
        "snapshot" => {
            let date = match flag_value(&args, "--date") {
                Some(raw) => Some(
                    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                        .with_context(|| format!("invalid --date '{}'", raw))?,
                ),
                None => None,
            };
            let created = orchestrator.snapshot_all(date).await?;
            print_json(&serde_json::json!({ "snapshots_created": created }))?;
        }
        "cleanup" => {
            let keep_days = parsed_flag(&args, "--keep-days")?.unwrap_or(config.history_retention_days);
            let deleted = tracker.cleanup(keep_days).await?;
            print_json(&serde_json::json!({ "deleted": deleted, "keep_days": keep_days }))?;
        }
        "movers" => {
            let days = parsed_flag(&args, "--days")?.unwrap_or(config.movers_lookback_days);
            let limit = parsed_flag(&args, "--limit")?.unwrap_or(config.movers_limit);
            let direction = parsed_flag::<MoverDirection>(&args, "--direction")?.unwrap_or(MoverDirection::Up);
            let movers = tracker.get_top_movers(days, limit, direction).await?;
            print_json(&movers)?;
        }
        "signals" => {
            let days = parsed_flag(&args, "--days")?.unwrap_or(config.movers_lookback_days);
            let changes = tracker.get_signal_changes(days).await?;
            print_json(&changes)?;
        }
        "history" => {
            let Some(ticker) = args.get(1).filter(|a| !a.starts_with("--")) else {
                bail!("history needs a ticker, e.g. `score-runner history AAPL --days 30`");
            };
            let days = parsed_flag(&args, "--days")?.unwrap_or(30);
            let history = tracker.get_history(ticker, days).await?;
            let change = tracker.get_change(ticker, days).await?;
            print_json(&serde_json::json!({ "history": history, "change": change }))?;
        }
        "leaderboard" => {
            let limit = parsed_flag(&args, "--limit")?.unwrap_or(config.movers_limit);
            let signal = parsed_flag::<Signal>(&args, "--signal")?;
            let sector = flag_value(&args, "--sector");
            let board = orchestrator.leaderboard(limit, sector, signal).await?;
            print_json(&board)?;
        }
        "screen" => {
            let criteria = screen_criteria(&args)?;
            let strategy = parsed_flag::<ScreenerStrategy>(&args, "--strategy")?;
            let mut response = orchestrator.screen(&criteria).await?;
            response.strategy = strategy.map(|s| s.name().to_string());
            print_json(&response)?;
        }
        "import" => {
            let Some(path) = args.get(1) else {
                bail!("import needs a JSON file of instrument fundamentals");
            };
            let raw = std::fs::read_to_string(path).with_context(|| format!("reading {}", path))?;
            let instruments: Vec<InstrumentFundamentals> =
                serde_json::from_str(&raw).with_context(|| format!("parsing {}", path))?;
            for instrument in &instruments {
                db.upsert_fundamentals(instrument).await?;
            }
            tracing::info!("Imported fundamentals for {} instruments", instruments.len());
            print_json(&serde_json::json!({ "imported": instruments.len() }))?;
        }
        other => bail!("unhandled command '{}'", other),
    }

    Ok(())
}

fn is_known_command(command: &str) -> bool {
    COMMANDS.contains(&command)
}

fn init_tracing() {
    let json_logging = std::env::var("RUST_LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);
    let filter = || {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"))
    };

    if json_logging {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter())
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter())
            .with_writer(std::io::stderr)
            .init();
    }
}

fn price_source(config: &RunnerConfig) -> Arc<dyn PriceSource> {
    let synthetic: Arc<dyn PriceSource> = Arc::new(SyntheticPriceSource::new());
    if config.use_live_prices {
        Arc::new(FallbackPriceSource::new(Arc::new(YahooPriceSource::new()), synthetic))
    } else {
        synthetic
    }
}

fn flag_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.iter()
        .position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .map(|s| s.as_str())
}

fn flag_values<'a>(args: &'a [String], flag: &str) -> Vec<&'a str> {
    args.windows(2)
        .filter(|pair| pair[0] == flag)
        .map(|pair| pair[1].as_str())
        .collect()
}

/// `roic=15` style bound.
fn metric_bound(raw: &str) -> Result<(ScreenMetric, f64)> {
    let Some((metric, value)) = raw.split_once('=') else {
        bail!("expected METRIC=VALUE, got '{}'", raw);
    };
    let metric = metric.trim().parse::<ScreenMetric>()?;
    let value = value
        .trim()
        .parse::<f64>()
        .with_context(|| format!("invalid bound value in '{}'", raw))?;
    Ok((metric, value))
}

/// Preset (if any) with the command-line bounds and options layered on top.
fn screen_criteria(args: &[String]) -> Result<ScreenerCriteria> {
    let limit = parsed_flag(args, "--limit")?.unwrap_or(50);
    let mut criteria = match parsed_flag::<ScreenerStrategy>(args, "--strategy")? {
        Some(strategy) => strategy.criteria(limit),
        None => ScreenerCriteria::default().limit(limit),
    };

    for raw in flag_values(args, "--min") {
        let (metric, value) = metric_bound(raw)?;
        criteria = criteria.min(metric, value);
    }
    for raw in flag_values(args, "--max") {
        let (metric, value) = metric_bound(raw)?;
        criteria = criteria.max(metric, value);
    }
    if let Some(sector) = flag_value(args, "--sector") {
        criteria.sector = Some(sector.to_string());
    }
    if let Some(signal) = parsed_flag(args, "--signal")? {
        criteria.signal = Some(signal);
    }
    criteria.min_score_percentile = parsed_flag(args, "--min-percentile")?;
    if let Some(sort_by) = parsed_flag(args, "--sort")? {
        criteria.sort_by = sort_by;
    }
    if let Some(order) = parsed_flag(args, "--order")? {
        criteria.sort_order = order;
    }
    Ok(criteria)
}

fn parsed_flag<T>(args: &[String], flag: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match flag_value(args, flag) {
        Some(raw) => raw
            .parse()
            .map(Some)
            .map_err(|e| anyhow::anyhow!("invalid {} '{}': {}", flag, raw, e)),
        None => Ok(None),
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
