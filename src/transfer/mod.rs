//! Outbound transfers through the external sync tool
//!
//! Responsible for:
//! - Building the tool's argument list from a `TransferJob`
//! - Running the tool with the console's stdio and reporting its exit
//! - Routing a transfer request through validation, mode lookup and
//!   confirmation (`dispatch`)
//! - Checking the remote rsync daemon (`health`)

pub mod dispatch;
pub mod health;

use nix::sys::signal::{kill, Signal};
use nix::unistd::Pid;
use signal_hook::consts::{SIGINT, SIGTERM};
use signal_hook::SigId;
use std::io;
use std::os::unix::process::ExitStatusExt;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crate::config::TransferSettings;
use crate::constants::{EXIT_VALIDATION, RELATIVE_PATH_MARKER, TOOL_POLL_INTERVAL_MS};
use crate::models::TransferJob;

/// A fully resolved tool command line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncInvocation {
    pub program: String,
    pub args: Vec<String>,
}

impl SyncInvocation {
    /// Command line as a single display string
    pub fn display(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// How the tool process ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToolExit {
    pub code: i32,
    /// SIGINT or SIGTERM that reached the console while the tool was running
    pub interrupted: Option<i32>,
}

/// The external synchronization tool
pub trait SyncTool {
    /// Run with inherited stdio and wait for exit. No timeout.
    fn run(&self, invocation: &SyncInvocation) -> io::Result<ToolExit>;

    /// Run and capture stdout
    fn capture(&self, invocation: &SyncInvocation) -> io::Result<(i32, String)>;
}

/// rsync (or any compatible program) run as a child process
#[derive(Debug, Clone, Copy, Default)]
pub struct RsyncTool;

impl SyncTool for RsyncTool {
    fn run(&self, invocation: &SyncInvocation) -> io::Result<ToolExit> {
        // Ctrl-C reaches the tool through the shared process group; a signal
        // sent to the console alone does not, so it is forwarded. Either way
        // the console stays up to report the outcome.
        let received = Arc::new(AtomicUsize::new(0));
        let handlers = [SIGINT, SIGTERM]
            .into_iter()
            .map(|signal| {
                signal_hook::flag::register_usize(signal, Arc::clone(&received), signal as usize)
            })
            .collect::<io::Result<Vec<SigId>>>()?;

        let result = Command::new(&invocation.program)
            .args(&invocation.args)
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .spawn()
            .and_then(|child| supervise(child, &received));

        for handler in handlers {
            signal_hook::low_level::unregister(handler);
        }

        let (status, interrupted) = result?;
        Ok(ToolExit {
            code: exit_code(status),
            interrupted,
        })
    }

    fn capture(&self, invocation: &SyncInvocation) -> io::Result<(i32, String)> {
        let output = Command::new(&invocation.program)
            .args(&invocation.args)
            .stdin(Stdio::null())
            .output()?;
        if !output.status.success() {
            log::debug!(
                "'{}' stderr: {}",
                invocation.display(),
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }
        Ok((
            exit_code(output.status),
            String::from_utf8_lossy(&output.stdout).into_owned(),
        ))
    }
}

/// Wait for the tool, passing on any signal the console receives meanwhile
fn supervise(
    mut child: Child,
    received: &AtomicUsize,
) -> io::Result<(ExitStatus, Option<i32>)> {
    let mut interrupted = None;
    loop {
        let exited = child.try_wait()?;

        let signal = received.swap(0, Ordering::SeqCst) as i32;
        if signal != 0 {
            interrupted = Some(signal);
            if exited.is_none() {
                log::warn!(
                    "received signal {}, stopping sync tool (pid {})",
                    signal,
                    child.id()
                );
                forward_signal(child.id(), signal);
            }
        }

        if let Some(status) = exited {
            return Ok((status, interrupted));
        }
        thread::sleep(Duration::from_millis(TOOL_POLL_INTERVAL_MS));
    }
}

fn forward_signal(pid: u32, signal: i32) {
    let result = Signal::try_from(signal)
        .and_then(|signal| kill(Pid::from_raw(pid as i32), signal));
    if let Err(errno) = result {
        // The tool may already be gone
        log::debug!("could not forward signal {} to pid {}: {}", signal, pid, errno);
    }
}

/// Exit code of a finished child; death by signal maps to 128 + signal
pub fn exit_code(status: ExitStatus) -> i32 {
    status
        .code()
        .or_else(|| status.signal().map(|signal| 128 + signal))
        .unwrap_or(EXIT_VALIDATION)
}

/// Tool arguments for a job: option flags, filter rules in job order,
/// then source and destination
pub fn build_invocation(settings: &TransferSettings, job: &TransferJob) -> SyncInvocation {
    let mut args = Vec::new();

    let flags = [
        (settings.archive, "-a"),
        (settings.verbose, "-v"),
        (settings.compress, "-z"),
        (settings.itemize, "-i"),
        (job.source.contains(RELATIVE_PATH_MARKER), "-R"),
        (settings.progress, "--progress"),
        (job.dry_run, "--dry-run"),
    ];
    args.extend(
        flags
            .iter()
            .filter(|(enabled, _)| *enabled)
            .map(|(_, flag)| flag.to_string()),
    );

    args.extend(job.filters.iter().map(|rule| rule.to_arg()));
    args.push(job.source.clone());
    args.push(job.destination.clone());

    SyncInvocation {
        program: settings.program.clone(),
        args,
    }
}
