//! Process table access, signalling and launching
//!
//! `SystemProcesses` is the real implementation; the lifecycle manager is
//! generic over `ProcessControl` so tests can substitute a fake.

use nix::sys::signal::{kill, Signal};
use nix::unistd::Pid as UnixPid;
use std::io;
use std::process::{Command, ExitStatus, Stdio};
use sysinfo::{Pid, PidExt, ProcessExt, ProcessStatus, System, SystemExt};

/// Operations the lifecycle manager needs from the operating system
pub trait ProcessControl {
    /// Name of the running process with this pid, or `None` if there is no
    /// such process (zombies count as gone)
    fn lookup(&self, pid: u32) -> Option<String>;

    /// Send SIGTERM to `pid`
    fn terminate(&self, pid: u32) -> Result<(), String>;

    /// Run the daemon launcher and wait for it to return
    fn launch(&self, program: &str, args: &[String]) -> io::Result<ExitStatus>;
}

/// The live operating system
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemProcesses;

impl ProcessControl for SystemProcesses {
    fn lookup(&self, pid: u32) -> Option<String> {
        let pid = Pid::from_u32(pid);
        let mut system = System::new();
        if !system.refresh_process(pid) {
            return None;
        }

        let process = system.process(pid)?;
        if matches!(process.status(), ProcessStatus::Zombie | ProcessStatus::Dead) {
            return None;
        }
        Some(process.name().to_string())
    }

    fn terminate(&self, pid: u32) -> Result<(), String> {
        let raw = i32::try_from(pid).map_err(|_| format!("pid {} is out of range", pid))?;
        kill(UnixPid::from_raw(raw), Signal::SIGTERM)
            .map_err(|errno| errno.to_string())
    }

    fn launch(&self, program: &str, args: &[String]) -> io::Result<ExitStatus> {
        // The daemon detaches on its own; the launcher returns once it has
        Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .status()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_finds_current_process() {
        let processes = SystemProcesses;
        assert!(processes.lookup(std::process::id()).is_some());
    }

    #[test]
    fn test_lookup_missing_process() {
        let processes = SystemProcesses;
        assert!(processes.lookup(999_999_999).is_none());
    }

    #[test]
    fn test_terminate_missing_process_fails() {
        let processes = SystemProcesses;
        assert!(processes.terminate(999_999_999).is_err());
    }

    #[test]
    fn test_terminate_stops_child() {
        let mut child = Command::new("sleep").arg("30").spawn().unwrap();
        SystemProcesses.terminate(child.id()).unwrap();
        let status = child.wait().unwrap();
        assert!(!status.success());
    }

    #[test]
    fn test_launch_reports_exit_status() {
        let status = SystemProcesses
            .launch("sh", &["-c".to_string(), "exit 3".to_string()])
            .unwrap();
        assert_eq!(status.code(), Some(3));
        assert!(SystemProcesses.launch("/nonexistent/launcher", &[]).is_err());
    }
}
