mod chart;
mod config;
mod error;
mod export;
mod indicator;
mod model;
mod series;
mod session;
mod source;
mod trend;

use std::path::PathBuf;

use chrono::{Duration, NaiveDate, NaiveTime, Utc};
use clap::Parser;
use derive_more::{Display, Error};
use error_stack::{Report, ResultExt};
use tracing::info;
use tracing_subscriber::EnvFilter;

use config::AppConfig;
use model::{MarketKind, TimeFrame};
use session::AnalysisSession;
use source::build_source;

#[derive(Debug, Display, Error)]
pub enum AppError {
    #[display("configuration error")]
    Config,
    #[display("data source error")]
    Source,
    #[display("analysis error")]
    Analysis,
    #[display("export error")]
    Export,
    #[display("chart error")]
    Chart,
}

#[derive(Parser)]
#[command(
    name = "market-trend-analyzer",
    about = "Technical-analysis trend classification for stocks and crypto"
)]
struct Cli {
    /// Market symbol (e.g. AAPL, BTC/USDT)
    #[arg(short, long)]
    symbol: String,

    /// Market type: "stock" or "crypto"
    #[arg(short, long, default_value = "stock")]
    market: String,

    /// Candle timeframe (e.g. 1d, 1h)
    #[arg(short, long, default_value = "1d")]
    timeframe: String,

    /// Start date (YYYY-MM-DD); defaults to one year before the end date
    #[arg(long)]
    start_date: Option<NaiveDate>,

    /// End date (YYYY-MM-DD, inclusive); defaults to today
    #[arg(long)]
    end_date: Option<NaiveDate>,

    /// Output CSV file path
    #[arg(long, default_value = "market_analysis.csv")]
    output_csv: PathBuf,

    /// Output chart file path
    #[arg(long, default_value = "market_trend.png")]
    output_plot: PathBuf,

    /// Path to an optional TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() {
    if let Err(report) = run().await {
        eprintln!("{report:?}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Report<AppError>> {
    let cli = Cli::parse();
    let config = config::load_or_default(cli.config.as_deref()).change_context(AppError::Config)?;

    init_tracing(&config);

    let market = MarketKind::from_str(&cli.market).ok_or_else(|| {
        Report::new(AppError::Config).attach(format!("unknown market type: {}", cli.market))
    })?;
    let timeframe = TimeFrame::from_str(&cli.timeframe).ok_or_else(|| {
        Report::new(AppError::Config).attach(format!("unknown timeframe: {}", cli.timeframe))
    })?;

    // End date is inclusive: fetch up to the following midnight.
    let end = match cli.end_date {
        Some(date) => (date + Duration::days(1))
            .and_time(NaiveTime::MIN)
            .and_utc(),
        None => Utc::now(),
    };
    let start = match cli.start_date {
        Some(date) => date.and_time(NaiveTime::MIN).and_utc(),
        None => end - Duration::days(365),
    };
    if start >= end {
        return Err(
            Report::new(AppError::Config).attach("start date must be before end date".to_owned())
        );
    }

    info!(
        symbol = %cli.symbol,
        market = %market,
        timeframe = %timeframe,
        start = %start,
        end = %end,
        "starting analysis"
    );

    let source = build_source(market);
    info!(source = %source.kind(), symbol = %cli.symbol, "fetching historical series");
    let raw = source
        .fetch_series(&cli.symbol, timeframe, start, end)
        .await
        .change_context(AppError::Source)?;

    let validated = series::validate(raw).change_context(AppError::Analysis)?;
    info!(rows = validated.len(), "series validated");

    let session = AnalysisSession::analyze(validated, &config.analysis.to_params())
        .change_context(AppError::Analysis)?;

    export::write_csv(&cli.output_csv, &session).change_context(AppError::Export)?;
    chart::render(&cli.output_plot, &session, &cli.symbol).change_context(AppError::Chart)?;

    info!("analysis complete");
    Ok(())
}

fn init_tracing(config: &AppConfig) {
    let filter = EnvFilter::new(&config.general.log_level);
    match config.general.log_format.as_str() {
        "json" => {
            tracing_subscriber::fmt()
                .json()
                .with_env_filter(filter)
                .init();
        }
        _ => {
            tracing_subscriber::fmt().with_env_filter(filter).init();
        }
    }
}
