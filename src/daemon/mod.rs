//! Transfer daemon lifecycle
//!
//! Start, stop and status of the background rsync daemon, tracked through
//! the PID file the daemon writes for itself:
//! - `status` classifies the PID file in one read (absent / live / stale)
//! - `start` refuses a live daemon, confirms, runs the launcher, re-polls
//! - `stop` confirms and sends SIGTERM to a live daemon
//!
//! Nothing is locked: the daemon may exit or start between a status read
//! and the signal or launch that follows it. That window is accepted.

pub mod pidfile;
pub mod process;

use std::path::Path;
use std::thread;
use std::time::{Duration, Instant};

use crate::config::DaemonSettings;
use crate::confirm::Confirm;
use crate::constants::STATUS_POLL_INTERVAL_MS;
use crate::daemon::pidfile::{read_pid_file, PidRecord};
use crate::daemon::process::ProcessControl;
use crate::logging::EventLogger;
use crate::models::{ConsoleError, DaemonState, StartOutcome, StatusReport, StopOutcome};

/// Lifecycle manager for the transfer daemon
pub struct LifecycleManager<'a, P: ProcessControl> {
    settings: &'a DaemonSettings,
    processes: P,
    events: EventLogger,
}

impl<'a, P: ProcessControl> LifecycleManager<'a, P> {
    pub fn new(settings: &'a DaemonSettings, processes: P) -> Self {
        Self {
            settings,
            processes,
            events: EventLogger,
        }
    }

    /// Current daemon state. Read-only and repeatable.
    pub fn status(&self) -> Result<StatusReport, ConsoleError> {
        let state = match read_pid_file(&self.settings.pid_file)? {
            PidRecord::Missing => DaemonState::Absent,
            PidRecord::Invalid(content) => {
                log::warn!(
                    "pid file {} does not hold a process id: {:?}",
                    self.settings.pid_file.display(),
                    content
                );
                DaemonState::Stale { pid: None }
            }
            PidRecord::Pid(pid) => match self.processes.lookup(pid) {
                Some(name) => DaemonState::Live {
                    pid,
                    process_name: Some(name).filter(|n| !n.is_empty()),
                },
                None => DaemonState::Stale { pid: Some(pid) },
            },
        };

        log::debug!("daemon state: {}", state);
        Ok(StatusReport {
            pid_file: self.settings.pid_file.clone(),
            state,
        })
    }

    /// Launcher arguments: configured args, then the daemon config file
    pub fn launch_args(&self) -> Vec<String> {
        let mut args = self.settings.args.clone();
        if !self.settings.config_file.as_os_str().is_empty() {
            args.push(format!("--config={}", self.settings.config_file.display()));
        }
        args
    }

    /// Start the daemon unless one is already live
    pub fn start(&self, gate: &mut dyn Confirm) -> Result<StartOutcome, ConsoleError> {
        let before = self.status()?.state;
        if let DaemonState::Live { pid, .. } = before {
            return Err(ConsoleError::StateConflict { pid });
        }
        if let DaemonState::Stale { pid } = before {
            log::info!("replacing stale pid file (recorded pid {:?})", pid);
        }

        let args = self.launch_args();
        let command_line = std::iter::once(self.settings.program.as_str())
            .chain(args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ");

        let prompt = format!("start transfer daemon: {}", command_line);
        if !gate.confirm(&prompt).map_err(ConsoleError::Prompt)? {
            self.events.confirmation_declined("daemon start");
            return Ok(StartOutcome::Declined);
        }

        self.events.daemon_launch(&self.settings.program, &args);
        let status = self
            .processes
            .launch(&self.settings.program, &args)
            .map_err(|e| {
                ConsoleError::StartFailed(format!("could not run '{}': {}", command_line, e))
            })?;
        if !status.success() {
            return Err(ConsoleError::StartFailed(format!(
                "'{}' exited with {}",
                command_line, status
            )));
        }

        let state = self.await_live()?;
        if !state.is_live() {
            log::warn!(
                "daemon launched but {} shows it {}",
                self.settings.pid_file.display(),
                state
            );
        }
        Ok(StartOutcome::Launched { state })
    }

    /// Re-poll status until the daemon shows up live or the grace period ends
    fn await_live(&self) -> Result<DaemonState, ConsoleError> {
        let deadline = Instant::now() + Duration::from_millis(self.settings.startup_grace_ms);
        loop {
            let state = self.status()?.state;
            if state.is_live() || Instant::now() >= deadline {
                return Ok(state);
            }
            thread::sleep(Duration::from_millis(STATUS_POLL_INTERVAL_MS));
        }
    }

    /// Stop a live daemon. Absent is a no-op; stale is reported as a failure.
    pub fn stop(&self, gate: &mut dyn Confirm) -> Result<StopOutcome, ConsoleError> {
        match self.status()?.state {
            DaemonState::Absent => Ok(StopOutcome::NotRunning),
            DaemonState::Stale { pid } => Ok(StopOutcome::Failed {
                pid,
                reason: match pid {
                    Some(pid) => format!("no process with pid {} is running", pid),
                    None => "pid file does not hold a valid process id".to_string(),
                },
            }),
            DaemonState::Live { pid, process_name } => {
                let prompt = self.stop_prompt(pid, process_name.as_deref());
                if !gate.confirm(&prompt).map_err(ConsoleError::Prompt)? {
                    self.events.confirmation_declined("daemon stop");
                    return Ok(StopOutcome::Declined);
                }

                match self.processes.terminate(pid) {
                    Ok(()) => {
                        self.events.daemon_signalled(pid);
                        Ok(StopOutcome::Signalled { pid })
                    }
                    Err(reason) => Ok(StopOutcome::Failed {
                        pid: Some(pid),
                        reason,
                    }),
                }
            }
        }
    }

    /// Name the process about to be signalled; the pid may have been reused
    fn stop_prompt(&self, pid: u32, process_name: Option<&str>) -> String {
        let expected = Path::new(&self.settings.program)
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.settings.program.clone());

        match process_name {
            None => format!("stop transfer daemon (pid {})", pid),
            // Kernel process names are truncated to 15 bytes
            Some(name) if expected.starts_with(name) => {
                format!("stop transfer daemon (pid {}, {})", pid, name)
            }
            Some(name) => {
                log::warn!(
                    "pid {} from {} belongs to '{}', not '{}'",
                    pid,
                    self.settings.pid_file.display(),
                    name,
                    expected
                );
                format!(
                    "stop process '{}' (pid {}), which is not '{}'",
                    name, pid, expected
                )
            }
        }
    }
}
