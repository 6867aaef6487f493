//! CLI: clap definitions and the command runner for the `watchpost` binary.

use crate::config::{HttpMethod, MonitorConfig};
use crate::error::MonitorError;
use crate::fetch::HttpFetcher;
use crate::history::HistoryLog;
use crate::logging::LoggingConfig;
use crate::probe::{ProbeOutcome, Prober};
use crate::report::{CycleReport, Reporter, TracingReporter};
use crate::scheduler::{Scheduler, StopReason};
use crate::store::{JsonFileStore, StateStore};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Watchpost - detect content changes on an opaque HTTP endpoint
#[derive(Parser, Debug)]
#[command(name = "watchpost")]
#[command(about = "Periodically probe an endpoint and report when its response changes")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Configuration file (default: ./watchpost.toml if present)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Target URL
    #[arg(long, global = true)]
    pub url: Option<String>,

    /// HTTP method (GET or POST)
    #[arg(long, global = true)]
    pub method: Option<HttpMethod>,

    /// JSON request body
    #[arg(long, global = true, value_parser = parse_json_body)]
    pub body: Option<serde_json::Value>,

    /// Request header as NAME:VALUE (repeatable)
    #[arg(long = "header", global = true, value_parser = parse_header)]
    pub headers: Vec<(String, String)>,

    /// State file holding the last snapshot
    #[arg(long, global = true)]
    pub state_file: Option<PathBuf>,

    /// Append detected changes to this JSON-lines file
    #[arg(long, global = true)]
    pub history_file: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(long, global = true, default_value = "false")]
    pub verbose: bool,

    /// Log level (trace, debug, info, warn, error, off)
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Log format (json, text)
    #[arg(long, global = true)]
    pub log_format: Option<String>,

    /// Log output (stdout, stderr, file)
    #[arg(long, global = true)]
    pub log_output: Option<String>,

    /// Log file path (if output is "file")
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Run a single check cycle
    Check,
    /// Check periodically until stopped (Ctrl-C) or --max-runs is reached
    Watch {
        /// Time between cycles in whole seconds, e.g. "30s", "5m"
        #[arg(long, value_parser = parse_interval)]
        interval: Option<Duration>,
        /// Stop after this many cycles
        #[arg(long)]
        max_runs: Option<u64>,
    },
    /// Show the stored snapshot
    Show {
        /// Also list recorded changes from the history file
        #[arg(long)]
        history: bool,
    },
}

fn parse_header(s: &str) -> Result<(String, String), String> {
    let (name, value) = s
        .split_once(':')
        .ok_or_else(|| format!("Invalid header '{}' (expected NAME:VALUE)", s))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(format!("Invalid header '{}' (empty name)", s));
    }
    Ok((name.to_string(), value.trim().to_string()))
}

fn parse_interval(s: &str) -> Result<Duration, String> {
    let interval =
        humantime::parse_duration(s).map_err(|e| format!("Invalid interval '{}': {}", s, e))?;
    if interval.subsec_nanos() != 0 {
        return Err(format!(
            "Invalid interval '{}': must be a whole number of seconds",
            s
        ));
    }
    if interval.is_zero() {
        return Err(format!("Invalid interval '{}': must be greater than zero", s));
    }
    Ok(interval)
}

fn parse_json_body(s: &str) -> Result<serde_json::Value, String> {
    serde_json::from_str(s).map_err(|e| format!("Invalid JSON body: {}", e))
}

impl Cli {
    /// Fold CLI flags over a loaded configuration. Flags win.
    pub fn apply_overrides(&self, mut config: MonitorConfig) -> MonitorConfig {
        if let Some(url) = &self.url {
            config.target.url = url.clone();
        }
        if let Some(method) = self.method {
            config.target.method = method;
        }
        if let Some(body) = &self.body {
            config.target.body = Some(body.clone());
        }
        for (name, value) in &self.headers {
            config.target.headers.insert(name.clone(), value.clone());
        }
        if let Some(state_file) = &self.state_file {
            config.storage.state_file = state_file.clone();
        }
        if let Some(history_file) = &self.history_file {
            config.storage.history_file = Some(history_file.clone());
        }
        if let Commands::Watch { interval, max_runs } = &self.command {
            if let Some(interval) = interval {
                config.schedule.interval_secs = interval.as_secs();
            }
            if max_runs.is_some() {
                config.schedule.max_runs = *max_runs;
            }
        }
        config.logging = self.logging_overrides(config.logging);
        config
    }

    fn logging_overrides(&self, mut logging: LoggingConfig) -> LoggingConfig {
        if self.verbose {
            logging.level = "debug".to_string();
        }
        if let Some(level) = &self.log_level {
            logging.level = level.clone();
        }
        if let Some(format) = &self.log_format {
            logging.format = format.clone();
        }
        if let Some(output) = &self.log_output {
            logging.output = output.clone();
        }
        if let Some(file) = &self.log_file {
            logging.file = file.clone();
        }
        logging
    }
}

/// Prints one line per cycle to stdout and forwards to tracing
pub struct ConsoleReporter;

impl Reporter for ConsoleReporter {
    fn report(&self, report: &CycleReport) {
        println!("{}", format_cycle(report));
        TracingReporter.report(report);
    }
}

fn format_cycle(report: &CycleReport) -> String {
    let now = chrono::Local::now().format("%Y-%m-%d %H:%M:%S");
    let line = match (&report.error, &report.reason) {
        (Some(error), _) => format!("[{}] {} - error: {}", report.cycle, now, error),
        (None, Some(reason)) if report.changed => {
            format!("[{}] {} - changed: {}", report.cycle, now, reason)
        }
        (None, Some(reason)) => format!("[{}] {} - no change: {}", report.cycle, now, reason),
        (None, None) => format!("[{}] {} - no result", report.cycle, now),
    };
    match &report.warning {
        Some(warning) => format!("{} ({})", line, warning),
        None => line,
    }
}

fn format_outcome(url: &str, state_file: &std::path::Path, outcome: &ProbeOutcome) -> String {
    let mut lines = vec![format!("Target: {}", url)];
    if let Some(comparison) = &outcome.comparison {
        lines.push(format!("Result: {}", comparison.reason));
        lines.push(format!(
            "Status: {}",
            if comparison.changed { "changed" } else { "unchanged" }
        ));
    }
    if let Some(snapshot) = &outcome.snapshot {
        lines.push(format!("Fingerprint: {}", snapshot.fingerprint()));
    }
    if let Some(discarded) = &outcome.discarded_state {
        lines.push(format!("Warning: discarded unreadable stored state: {}", discarded));
    }
    if let Some(error) = &outcome.error {
        lines.push(format!("Error: {}", error));
    }
    lines.push(format!("State file: {}", state_file.display()));
    lines.join("\n")
}

/// Validated configuration plus the command to run
pub struct RunContext {
    config: MonitorConfig,
}

impl RunContext {
    pub fn new(config: MonitorConfig) -> Self {
        Self { config }
    }

    fn build_prober(&self) -> Result<Prober, MonitorError> {
        let config = self.config.clone().validated()?;
        let fetcher = Arc::new(HttpFetcher::from_config(&config.target)?);
        let store = Arc::new(JsonFileStore::new(&config.storage.state_file));
        let mut prober = Prober::new(fetcher, store).with_options(config.probe.clone());
        if let Some(history_file) = &config.storage.history_file {
            prober = prober.with_history(HistoryLog::new(history_file));
        }
        Ok(prober)
    }

    /// Execute a command; `cancel` stops `watch`.
    pub async fn execute(
        &self,
        command: &Commands,
        cancel: CancellationToken,
    ) -> Result<String, MonitorError> {
        match command {
            Commands::Check => {
                let prober = self.build_prober()?;
                let outcome = prober.run_once().await;
                Ok(format_outcome(
                    &self.config.target.url,
                    &self.config.storage.state_file,
                    &outcome,
                ))
            }
            Commands::Watch { .. } => {
                let prober = self.build_prober()?;
                let schedule = &self.config.schedule;
                info!(
                    url = %self.config.target.url,
                    interval_secs = schedule.interval_secs,
                    max_runs = ?schedule.max_runs,
                    "Starting periodic monitoring"
                );
                let scheduler = Scheduler::new(schedule.interval(), schedule.max_runs, cancel);
                let prober = &prober;
                let summary = scheduler
                    .run(move || prober.run_once(), &ConsoleReporter)
                    .await;
                let stopped = match summary.stop_reason {
                    StopReason::MaxRunsReached => "max runs reached",
                    StopReason::Cancelled => "cancelled",
                };
                Ok(format!(
                    "Stopped ({}): {} cycles, {} changes, {} errors",
                    stopped, summary.cycles, summary.changes, summary.errors
                ))
            }
            Commands::Show { history } => self.show(*history),
        }
    }

    fn show(&self, include_history: bool) -> Result<String, MonitorError> {
        let state_file = &self.config.storage.state_file;
        let store = JsonFileStore::new(state_file);
        let mut lines = match store.load()? {
            Some(snapshot) => vec![
                format!("State file: {}", state_file.display()),
                format!("Captured at: {}", snapshot.captured_at().to_rfc3339()),
                format!("Fingerprint: {}", snapshot.fingerprint()),
                format!("Content length: {} bytes", snapshot.content().len()),
            ],
            None => vec![format!("No prior state at {}", state_file.display())],
        };

        if include_history {
            match &self.config.storage.history_file {
                Some(path) => {
                    let records = HistoryLog::new(path).read_all()?;
                    lines.push(format!("History ({} changes):", records.len()));
                    for record in records {
                        lines.push(format!(
                            "  {} {} {}",
                            record.detected_at.to_rfc3339(),
                            &record.fingerprint[..12.min(record.fingerprint.len())],
                            record.reason
                        ));
                    }
                }
                None => lines.push("No history file configured".to_string()),
            }
        }

        Ok(lines.join("\n"))
    }
}

/// Map errors to a string for CLI output.
pub fn map_error(e: &MonitorError) -> String {
    e.to_string()
}
