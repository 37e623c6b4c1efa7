//! Structured event logging
//!
//! Events go through the `log` facade as `<message> | <json payload>` and
//! are written to stderr by `env_logger`. `RUST_LOG` overrides the level
//! chosen on the command line.

use anyhow::{anyhow, Result};
use log::{Level, LevelFilter};
use serde_json::json;

use crate::models::{HealthReport, TransferJob, TransferOutcome};

/// Console verbosity selected by `-q` / `-v`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verbosity {
    Quiet,
    Normal,
    Verbose,
    Debug,
}

impl Verbosity {
    /// Map `-q` and the number of `-v` flags to a verbosity
    pub fn from_flags(quiet: bool, verbose: u8) -> Self {
        match (quiet, verbose) {
            (true, _) => Verbosity::Quiet,
            (false, 0) => Verbosity::Normal,
            (false, 1) => Verbosity::Verbose,
            (false, _) => Verbosity::Debug,
        }
    }

    pub fn level_filter(self) -> LevelFilter {
        match self {
            Verbosity::Quiet => LevelFilter::Error,
            Verbosity::Normal => LevelFilter::Warn,
            Verbosity::Verbose => LevelFilter::Info,
            Verbosity::Debug => LevelFilter::Debug,
        }
    }
}

/// Install the stderr logger
pub fn init(verbosity: Verbosity) -> Result<()> {
    env_logger::Builder::new()
        .filter_level(verbosity.level_filter())
        .format_target(false)
        .parse_default_env()
        .try_init()
        .map_err(|e| anyhow!("Failed to set logger: {}", e))
}

/// Emits the console's structured events
#[derive(Debug, Clone, Copy, Default)]
pub struct EventLogger;

impl EventLogger {
    pub fn transfer_started(&self, job: &TransferJob) {
        let data = json!({
            "event": "transfer_started",
            "mode": job.mode,
            "source": job.source,
            "destination": job.destination,
            "filters": job.filters.iter().map(|rule| rule.to_arg()).collect::<Vec<_>>(),
            "dry_run": job.dry_run,
            "timestamp": chrono::Utc::now().to_rfc3339(),
        });
        emit(
            Level::Info,
            &format!("transfer from '{}' to '{}'", job.source, job.destination),
            &data,
        );
    }

    pub fn transfer_finished(&self, job: &TransferJob, outcome: &TransferOutcome) {
        let data = json!({
            "event": "transfer_finished",
            "mode": job.mode,
            "outcome": outcome,
            "timestamp": chrono::Utc::now().to_rfc3339(),
        });
        let level = match outcome {
            TransferOutcome::TransferFailed { .. } => Level::Error,
            _ => Level::Info,
        };
        emit(level, &format!("{} transfer finished", job.mode), &data);
    }

    pub fn daemon_launch(&self, program: &str, args: &[String]) {
        let data = json!({
            "event": "daemon_launch",
            "program": program,
            "args": args,
            "timestamp": chrono::Utc::now().to_rfc3339(),
        });
        emit(Level::Info, "launching transfer daemon", &data);
    }

    pub fn daemon_signalled(&self, pid: u32) {
        let data = json!({
            "event": "daemon_signalled",
            "pid": pid,
            "signal": "SIGTERM",
            "timestamp": chrono::Utc::now().to_rfc3339(),
        });
        emit(Level::Info, &format!("sent SIGTERM to pid {}", pid), &data);
    }

    pub fn confirmation_declined(&self, action: &str) {
        let data = json!({
            "event": "confirmation_declined",
            "action": action,
            "timestamp": chrono::Utc::now().to_rfc3339(),
        });
        emit(Level::Info, &format!("{} declined by user", action), &data);
    }

    pub fn health_checked(&self, report: &HealthReport) {
        let data = json!({
            "event": "health_checked",
            "endpoint": report.endpoint,
            "reachable": report.reachable,
            "exit_code": report.exit_code,
            "missing": report.missing,
            "timestamp": chrono::Utc::now().to_rfc3339(),
        });
        let level = if report.reachable && report.missing.is_empty() {
            Level::Info
        } else {
            Level::Warn
        };
        emit(level, &format!("rsync daemon at {} checked", report.endpoint), &data);
    }
}

fn emit(level: Level, message: &str, data: &serde_json::Value) {
    log::log!(level, "{} | {}", message, data);
}
