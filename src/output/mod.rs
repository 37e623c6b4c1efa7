//! Output formatting module
//!
//! Handles:
//! - Human-readable rendering of every console report
//! - JSON output (`--json`) of the same reports
//! - Duration formatting for transfer timings

use anyhow::Result;
use std::time::Duration;

use crate::models::{
    DaemonState, HealthReport, ModeSummary, Report, StartOutcome, StatusReport, StopOutcome,
    TransferOutcome, TransferReport,
};

/// Print a report to stdout (failures to stderr)
pub fn render(report: &Report, json_output: bool) -> Result<()> {
    if json_output {
        println!("{}", serde_json::to_string_pretty(report)?);
        return Ok(());
    }

    match report {
        Report::Status(status) => print_status(status),
        Report::Start(outcome) => print_start(outcome),
        Report::Stop(outcome) => print_stop(outcome),
        Report::Transfer(transfer) => print_transfer(transfer),
        Report::Health(health) => print_health(health),
        Report::Modes(modes) => print_modes(modes),
    }
    Ok(())
}

fn print_status(status: &StatusReport) {
    println!("Transfer daemon: {}", status.state);
    println!("  PID file: {}", status.pid_file.display());
    if let DaemonState::Stale { .. } = status.state {
        println!("  The PID file is left over from a daemon that is no longer running.");
    }
}

fn print_start(outcome: &StartOutcome) {
    match outcome {
        StartOutcome::Declined => println!("Start declined, daemon not launched."),
        StartOutcome::Launched { state } if state.is_live() => {
            println!("✅ transfer daemon started: {}", state);
        }
        StartOutcome::Launched { state } => {
            eprintln!("❌ transfer daemon launched but not confirmed running");
            eprintln!("   State after launch: {}", state);
        }
    }
}

fn print_stop(outcome: &StopOutcome) {
    match outcome {
        StopOutcome::NotRunning => println!("Transfer daemon is not running, nothing to stop."),
        StopOutcome::Signalled { pid } => {
            println!("✅ sent SIGTERM to transfer daemon (pid {})", pid)
        }
        StopOutcome::Failed { reason, .. } => {
            eprintln!("❌ failed to stop transfer daemon: {}", reason);
        }
        StopOutcome::Declined => println!("Stop declined, daemon left running."),
    }
}

fn print_transfer(report: &TransferReport) {
    let job = &report.job;
    match &report.outcome {
        TransferOutcome::Completed { duration } => {
            let verb = if job.dry_run { "dry run" } else { "transfer" };
            println!(
                "✅ {} {} completed in {}",
                job.mode,
                verb,
                format_duration(*duration)
            );
            println!("  {} -> {}", job.source, job.destination);
        }
        TransferOutcome::Declined => {
            println!("Transfer declined, nothing sent.");
        }
        TransferOutcome::TransferFailed { code, interrupted } => {
            eprintln!("❌ {} transfer failed: sync tool exited with code {}", job.mode, code);
            if *interrupted {
                eprintln!("   Interrupted by a signal; the destination may hold a partial copy");
            }
        }
    }
}

fn print_health(health: &HealthReport) {
    if !health.reachable {
        eprintln!(
            "❌ rsync daemon at {} is not reachable (exit code {})",
            health.endpoint, health.exit_code
        );
        return;
    }

    println!("rsync daemon at {}:", health.endpoint);
    for module in &health.modules {
        println!("  {}", module);
    }
    if health.missing.is_empty() {
        println!("✅ all transfer modes have an exported module");
    } else {
        for mode in &health.missing {
            eprintln!("❌ no exported module for mode '{}'", mode);
        }
    }
}

fn print_modes(modes: &[ModeSummary]) {
    for summary in modes {
        let mode = &summary.mode;
        println!("{}:", mode.name);
        println!("  Destination: {}", summary.destination_url);
        println!(
            "  Confirmation: {}",
            if mode.requires_confirmation { "required" } else { "not required" }
        );
        println!("  Include: {}", mode.includes.join(" "));
        println!("  Exclude: {}", mode.excludes.join(" "));
        println!();
    }
}

/// Format an elapsed time: seconds below a minute, otherwise hours/minutes/seconds
pub fn format_duration(duration: Duration) -> String {
    let total = duration.as_secs_f64();
    if total > 60.0 {
        let whole = duration.as_secs();
        let hours = whole / 3600;
        let minutes = (whole % 3600) / 60;
        let seconds = total - (hours * 3600 + minutes * 60) as f64;
        format!("{}h {}m {:.3}s", hours, minutes, seconds)
    } else {
        format!("{:.3}s", total)
    }
}
