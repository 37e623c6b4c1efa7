//! PID file reading
//!
//! The daemon writes its own PID file; this side only ever reads it. The
//! whole file is read in one call and classified from that single read.

use std::io::ErrorKind;
use std::path::Path;

use crate::models::ConsoleError;

/// What the PID file held at the moment it was read
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PidRecord {
    /// No file at the path
    Missing,
    /// A usable process id
    Pid(u32),
    /// The file exists but does not hold a positive process id
    Invalid(String),
}

/// Read and classify the PID file at `path`.
///
/// Only I/O failures other than the file not existing are errors.
pub fn read_pid_file(path: &Path) -> Result<PidRecord, ConsoleError> {
    match std::fs::read_to_string(path) {
        Ok(content) => Ok(parse_pid(&content)
            .map(PidRecord::Pid)
            .unwrap_or_else(|| PidRecord::Invalid(content.trim().to_string()))),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(PidRecord::Missing),
        Err(source) => Err(ConsoleError::DaemonState {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// Parse the first line of a PID file. Zero is rejected since signalling
/// pid 0 addresses the caller's whole process group.
pub fn parse_pid(content: &str) -> Option<u32> {
    let first_line = content.lines().next()?.trim();
    match first_line.parse::<u32>() {
        Ok(0) | Err(_) => None,
        Ok(pid) if pid > i32::MAX as u32 => None,
        Ok(pid) => Some(pid),
    }
}
