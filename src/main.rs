use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::{Args as ClapArgs, Parser, Subcommand};
use fill_reconciler::broker::alpaca::AlpacaOrdersClient;
use fill_reconciler::config::{load_broker_config, load_settings, CliOverrides};
use fill_reconciler::constants::DEFAULT_TRADE_LOG_PATH;
use fill_reconciler::logging::intent_log::IntentLogger;
use fill_reconciler::model::Side;
use fill_reconciler::pipeline::run_pipeline;
use fill_reconciler::ui::console::ConsoleRenderer;
use rust_decimal::Decimal;
use std::path::PathBuf;
use tracing::{error, info};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

#[derive(Parser, Debug)]
#[command(author, version, about = "Reconcile broker fills with the bot's trade log", long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fetch filled orders, join them with the trade log and write the merged CSV (default)
    Reconcile(ReconcileArgs),
    /// Append an order intent to the trade log and print its client order id
    LogIntent(LogIntentArgs),
}

#[derive(ClapArgs, Debug, Default)]
struct ReconcileArgs {
    /// TOML config file with a [reconcile] table
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Trade log (JSONL)
    #[arg(long)]
    log_path: Option<PathBuf>,

    /// Merged CSV destination (default: next to the trade log)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Fetch window length in days, ending now
    #[arg(long, conflicts_with_all = ["after", "until"])]
    days: Option<i64>,

    /// Window start (RFC 3339), requires --until
    #[arg(long, requires = "until")]
    after: Option<DateTime<Utc>>,

    /// Window end (RFC 3339), requires --after
    #[arg(long, requires = "after")]
    until: Option<DateTime<Utc>>,

    /// Records per page (1-500)
    #[arg(long)]
    page_size: Option<u32>,
}

impl ReconcileArgs {
    fn overrides(&self) -> CliOverrides {
        CliOverrides {
            log_path: self.log_path.clone(),
            output_path: self.output.clone(),
            window_days: self.days,
            after: self.after,
            until: self.until,
            page_size: self.page_size,
        }
    }
}

#[derive(ClapArgs, Debug)]
struct LogIntentArgs {
    /// Trade log (JSONL)
    #[arg(long)]
    log_path: Option<PathBuf>,

    #[arg(long)]
    symbol: String,

    /// buy or sell
    #[arg(long)]
    side: Side,

    #[arg(long)]
    qty: Decimal,

    #[arg(long)]
    strategy: Option<String>,

    #[arg(long)]
    note: Option<String>,
}

fn init_tracing() -> WorkerGuard {
    let file_appender = tracing_appender::rolling::daily("logs", "reconcile.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    // Console Layer (Env Filter)
    let console_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_level(true)
        .with_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        );

    // File Layer (Simple Text)
    let file_layer = tracing_subscriber::fmt::layer()
        .with_ansi(false)
        .with_writer(non_blocking)
        .with_target(false)
        .with_filter(EnvFilter::new("info,fill_reconciler=debug"));

    tracing_subscriber::registry()
        .with(console_layer)
        .with(file_layer)
        .init();

    guard
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file if it exists, ignore if missing (env vars might be set otherwise)
    let _guard = init_tracing();

    let args = Args::parse();
    match args
        .command
        .unwrap_or_else(|| Command::Reconcile(ReconcileArgs::default()))
    {
        Command::Reconcile(args) => reconcile(args).await,
        Command::LogIntent(args) => log_intent(args),
    }
}

async fn reconcile(args: ReconcileArgs) -> Result<()> {
    let settings = load_settings(args.config.as_deref(), &args.overrides())
        .context("Invalid reconcile configuration")?;

    let broker_config = load_broker_config(settings.request_timeout);
    info!("Using broker endpoint {}", broker_config.base_url);
    let client = AlpacaOrdersClient::new(&broker_config)?;

    match run_pipeline(&client, &settings).await {
        Ok(outcome) => {
            ConsoleRenderer::render(&outcome);
            Ok(())
        }
        Err(e) => {
            error!("Reconciliation failed: {}", e);
            Err(e.into())
        }
    }
}

fn log_intent(args: LogIntentArgs) -> Result<()> {
    let path = args
        .log_path
        .or_else(|| std::env::var("TRADE_LOG_PATH").ok().map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_TRADE_LOG_PATH));

    let logger = IntentLogger::new(&path)?;
    let client_order_id =
        logger.log_intent(&args.symbol, args.side, args.qty, args.strategy, args.note)?;

    info!("Logged intent {} to {}", client_order_id, path.display());
    println!("{}", client_order_id);
    Ok(())
}
