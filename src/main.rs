//! NOTEPICKER — automated note buyer for peer-to-peer lending marketplaces
//!
//! Entry point. Parses flags, loads configuration, initialises structured
//! logging, and performs a single listing → decide → buy run.

use anyhow::Result;
use clap::Parser;
use rust_decimal::Decimal;
use tracing::{error, info};

use notepicker::config::{self, Overrides};
use notepicker::engine::runner::{RunReport, Runner};
use notepicker::marketplace::lending_club::LendingClubClient;
use notepicker::types::DecisionReason;

const BANNER: &str = r#"
  _  _     _       ___ _    _
 | \| |___| |_ ___| _ (_)__| |_____ _ _
 | .` / _ \  _/ -_)  _/ / _| / / -_) '_|
 |_|\_\___/\__\___|_| |_\__|_\_\___|_|

  v0.1.0 — P2P note buyer
"#;

#[derive(Parser, Debug)]
#[command(name = "notepicker")]
#[command(about = "Buy the best-scoring loans on the lending marketplace")]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(long, default_value = "config.toml")]
    config: String,

    /// Place real orders (default is a dry run)
    #[arg(long)]
    buy: bool,

    /// Minimum score a loan needs to be bought
    #[arg(long)]
    min_loan_score: Option<f64>,

    /// Amount to invest in each note
    #[arg(long)]
    amount_to_invest: Option<Decimal>,

    /// Investor account id
    #[arg(long)]
    investor_id: Option<u64>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load .env file if present (non-fatal if missing)
    let _ = dotenv::dotenv();

    init_logging();

    let mut cfg = config::AppConfig::load(&cli.config)?;
    cfg.apply_env()?;
    cfg.apply_overrides(&Overrides {
        buy: cli.buy,
        min_loan_score: cli.min_loan_score,
        amount_to_invest: cli.amount_to_invest,
        investor_id: cli.investor_id,
    });

    let run_config = cfg.run_configuration()?;
    let investor_id = cfg.investor_id()?;
    let api_key = cfg.resolve_api_key()?;

    println!("{BANNER}");

    let client = LendingClubClient::new(api_key, cfg.marketplace.base_url.clone())?;
    let runner = Runner::new(run_config, investor_id);

    match runner.run(&client).await {
        Ok(report) => {
            log_run_report(&report);
            Ok(())
        }
        Err(e) => {
            error!(error = %format!("{e:#}"), "Run failed");
            Err(e)
        }
    }
}

/// Log a human-readable run summary.
fn log_run_report(report: &RunReport) {
    info!(
        listed = report.listed,
        eligible = report.eligible,
        rejected = report.rejections.total(),
        available_cash = %report.available_cash,
        budget = report.budget_count,
        would_buy = report.count(DecisionReason::WouldBuy),
        already_owned = report.count(DecisionReason::AlreadyOwned),
        low_score = report.count(DecisionReason::LowScore),
        out_of_budget = report.count(DecisionReason::OutOfBudget),
        dry_run = report.execution.dry_run,
        ordered = report.execution.orders.len(),
        invested = %report.execution.total_invested,
        "Run complete"
    );
    if report.rejections.total() > 0 {
        info!(rejections = %report.rejections, "Underwriting rejections by rule");
    }
}

/// Initialise the `tracing` subscriber.
fn init_logging() {
    use tracing_subscriber::{fmt, EnvFilter};

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("notepicker=info"));

    let json_logging = std::env::var("NOTEPICKER_LOG_JSON").is_ok();

    if json_logging {
        fmt()
            .json()
            .with_env_filter(env_filter)
            .with_target(true)
            .with_thread_ids(true)
            .init();
    } else {
        fmt()
            .with_env_filter(env_filter)
            .with_target(true)
            .init();
    }
}
