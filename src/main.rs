use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Mutex;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::fmt::time::ChronoLocal;
use tracing_subscriber::{EnvFilter, fmt};

mod analyzer;
mod config;
mod error;
mod log;
mod model;
mod pool;
mod render;

use analyzer::{Analyzer, RunOutcome};
use config::{Config, Overrides};
use log::LogFile;
use render::HtmlReportSink;

const TIMESTAMP_FORMAT: &str = "%Y.%m.%d %H:%M:%S";

/// Rank URLs of the newest nginx access log by total request time.
#[derive(Parser)]
#[command(name = "access-log-analyzer", version, about, long_about = None)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Analyze this file instead of the newest log in the log directory.
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Directory scanned for access logs.
    #[arg(long)]
    log_dir: Option<PathBuf>,

    /// Directory receiving the HTML reports.
    #[arg(long)]
    report_dir: Option<PathBuf>,

    /// Maximum number of URLs in the report.
    #[arg(long)]
    report_size: Option<usize>,

    /// Number of parse workers (1 parses sequentially).
    #[arg(short, long)]
    workers: Option<usize>,

    /// Logging verbosity level (trace, debug, info, warn, error).
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn main() -> ExitCode {
    let started = Instant::now();
    let cli = Cli::parse();

    let cfg = match load_config(&cli) {
        Ok(cfg) => cfg,
        Err(err) => {
            eprintln!("error: {:#}", err);
            return ExitCode::FAILURE;
        }
    };

    if let Err(err) = init_tracing(&cli.log_level, cfg.logging_file_path.as_deref()) {
        eprintln!("error: {:#}", err);
        return ExitCode::FAILURE;
    }

    match run(&cli, &cfg) {
        Ok(outcome) => {
            tracing::info!(
                ?outcome,
                elapsed_secs = started.elapsed().as_secs_f64(),
                "finished"
            );
            ExitCode::SUCCESS
        }
        Err(err) => {
            tracing::error!("{:#}", err);
            ExitCode::FAILURE
        }
    }
}

fn load_config(cli: &Cli) -> Result<Config> {
    let base = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };

    let cfg = base.merge(Overrides {
        report_size: cli.report_size,
        report_dir: cli.report_dir.clone(),
        log_dir: cli.log_dir.clone(),
        worker_count: cli.workers,
    });
    cfg.validate()?;
    Ok(cfg)
}

fn init_tracing(level: &str, file: Option<&Path>) -> Result<()> {
    let filter =
        EnvFilter::try_new(level).with_context(|| format!("invalid log level: {}", level))?;
    let timer = ChronoLocal::new(TIMESTAMP_FORMAT.to_string());

    match file {
        Some(path) => {
            let out = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("open logging file {}", path.display()))?;
            fmt()
                .with_env_filter(filter)
                .with_timer(timer)
                .with_ansi(false)
                .with_writer(Mutex::new(out))
                .init();
        }
        None => {
            fmt()
                .with_env_filter(filter)
                .with_timer(timer)
                .with_target(false)
                .init();
        }
    }

    Ok(())
}

fn run(cli: &Cli, cfg: &Config) -> Result<RunOutcome> {
    let log = match &cli.log_file {
        Some(path) => LogFile::from_path(path, &cfg.service_prefix)?,
        None => log::find_latest(&cfg.log_dir, &cfg.service_prefix)?,
    };

    tracing::info!(
        log = %log.path.display(),
        workers = cfg.worker_count,
        report_size = cfg.report_size,
        "analyzing access log"
    );

    let analyzer = Analyzer::from_config(cfg)?;
    let sink = HtmlReportSink::new(&cfg.report_dir, cfg.report_template.clone());
    analyzer.run(&log, &sink)
}
