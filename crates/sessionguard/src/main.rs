mod config;
mod replay;
mod scenario;

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use colored::Colorize;

use sessionguard_logging::{init_tracing, LogEvent, LogFormat, Logger};

use crate::config::ProjectConfig;
use crate::replay::{ReplayReport, ScenarioRunner};
use crate::scenario::parse_scenario;

#[derive(Parser, Debug)]
#[command(
    name = "sessionguard",
    about = "Replay page activity through an analytics session guard",
    version,
    author
)]
struct Cli {
    /// Scenario file (JSON lines, one step per line)
    scenario: PathBuf,

    /// Config file (default: ./sessionguard.toml, then the user config dir)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Idle minutes after which the session expires
    #[arg(short = 't', long)]
    session_timeout: Option<f64>,

    /// Log output format
    #[arg(long, value_enum)]
    log_format: Option<LogFormatChoice>,

    /// Tracing filter level (RUST_LOG takes precedence)
    #[arg(long)]
    log_level: Option<String>,

    /// Also write tracing diagnostics to this file
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Append replay events as JSON lines to this file
    #[arg(long)]
    events_file: Option<PathBuf>,

    /// Replay on a host without visibility listeners
    #[arg(long)]
    headless: bool,

    /// Replay clock start, in milliseconds since the epoch (default: now)
    #[arg(long)]
    start_ms: Option<i64>,

    /// Output the report as JSON
    #[arg(long)]
    json_output: bool,

    /// Dry run: list the steps without replaying them
    #[arg(long)]
    dry_run: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogFormatChoice {
    Pretty,
    Json,
    Compact,
}

impl From<LogFormatChoice> for LogFormat {
    fn from(choice: LogFormatChoice) -> Self {
        match choice {
            LogFormatChoice::Pretty => LogFormat::Pretty,
            LogFormatChoice::Json => LogFormat::Json,
            LogFormatChoice::Compact => LogFormat::Compact,
        }
    }
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let working_dir = std::env::current_dir().context("Failed to get current directory")?;

    // Explicit --config wins over discovery
    let config = match &cli.config {
        Some(path) => ProjectConfig::load_from(path)?,
        None => ProjectConfig::load(&working_dir)?.unwrap_or_default(),
    };

    let log_format: LogFormat = match (cli.log_format, config.logging.format.as_deref()) {
        (Some(choice), _) => choice.into(),
        (None, Some(format)) => format.parse().map_err(anyhow::Error::msg)?,
        (None, None) => LogFormat::Pretty,
    };
    let log_level = cli
        .log_level
        .clone()
        .or_else(|| config.logging.level.clone())
        .unwrap_or_else(|| "warn".to_string());
    // Dropped on return from main, which flushes the log file
    let _tracing_guard = init_tracing(&log_level, log_format, cli.log_file.as_deref());

    let mut options = config.guard;
    if let Some(minutes) = cli.session_timeout {
        options.session_timeout_minutes = minutes;
    }
    options.validate()?;

    let steps = parse_scenario(&cli.scenario)?;

    if cli.dry_run {
        println!("=== Dry Run ===");
        println!("Scenario: {}", cli.scenario.display());
        println!("Session timeout: {}m", options.session_timeout_minutes);
        println!("Host: {}", if cli.headless { "headless" } else { "document" });
        for (index, step) in steps.iter().enumerate() {
            println!("{:>4}. {}", index + 1, step.describe());
        }
        return Ok(ExitCode::SUCCESS);
    }

    let logger = match &cli.events_file {
        Some(path) => Logger::with_file(log_format, path)
            .with_context(|| format!("Failed to open events file {}", path.display()))?,
        None => Logger::new(log_format),
    };
    let logger = Arc::new(logger);

    logger.log(&LogEvent::ReplayStarted {
        scenario: cli.scenario.clone(),
        steps: steps.len(),
        session_timeout_minutes: options.session_timeout_minutes,
    });

    let mut runner = ScenarioRunner::new(options, logger).with_headless_host(cli.headless);
    if let Some(start_ms) = cli.start_ms {
        runner = runner.with_start_ms(start_ms);
    }
    let report = runner.run(&steps);

    if cli.json_output {
        let json = serde_json::to_string_pretty(&report)?;
        println!("{}", json);
    } else {
        print_report(&report);
    }

    Ok(ExitCode::from(report.exit_code()))
}

fn print_report(report: &ReplayReport) {
    eprintln!();
    if report.failed_steps == 0 {
        eprintln!("{}", "=== REPLAY COMPLETE ===".bright_green().bold());
    } else {
        eprintln!("{}", "=== REPLAY HAD FAILURES ===".bright_red().bold());
        eprintln!("Failed steps: {}", report.failed_steps);
    }
    eprintln!("Steps: {}", report.steps);
    eprintln!("Hits sent: {}", report.hits.len());
    for (hit_type, count) in &report.hits_by_type {
        eprintln!("  {:<12} {}", hit_type, count);
    }
    if !report.guard_active {
        eprintln!("Guard: inert");
    } else if report.guard_removed {
        eprintln!("Guard: removed");
    } else {
        eprintln!("Guard: active");
    }
}
