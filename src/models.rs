//! Data models module
//!
//! Defines core data structures:
//! - ModeName / TransferMode: the fixed set of transfer profiles
//! - DaemonState: classification of the daemon's PID file
//! - TransferJob and the per-action outcomes
//! - Report: what a console action produced, plus its exit code
//! - ConsoleError: the error taxonomy

use serde::{Serialize, Serializer};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use crate::constants::{
    EXIT_DAEMON_STATE, EXIT_DECLINED, EXIT_START_FAILED, EXIT_STATE_CONFLICT, EXIT_STOP_FAILED,
    EXIT_SUCCESS, EXIT_TOOL_LAUNCH, EXIT_UNHEALTHY, EXIT_VALIDATION,
};

/// Name of a transfer profile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ModeName {
    /// Audio files of the library
    Music,
    /// DJ software preferences and collection exports
    Prefs,
}

impl ModeName {
    /// Every mode, in the order they are listed to users
    pub const ALL: [ModeName; 2] = [ModeName::Music, ModeName::Prefs];

    pub fn as_str(self) -> &'static str {
        match self {
            ModeName::Music => "music",
            ModeName::Prefs => "prefs",
        }
    }

    /// Parse a user-supplied mode name (exact, lowercase)
    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|mode| mode.as_str() == name)
    }
}

impl fmt::Display for ModeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single rsync filter rule
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterRule {
    Include(String),
    Exclude(String),
}

impl FilterRule {
    /// Render the rule as a command-line argument for the sync tool
    pub fn to_arg(&self) -> String {
        match self {
            FilterRule::Include(pattern) => format!("--include={}", pattern),
            FilterRule::Exclude(pattern) => format!("--exclude={}", pattern),
        }
    }
}

/// A named transfer profile
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransferMode {
    /// Mode identifier
    pub name: ModeName,
    /// Remote path suffix (rsync module, optionally followed by a sub-path)
    pub destination: String,
    /// Inclusion patterns, evaluated in order
    pub includes: Vec<String>,
    /// Exclusion patterns, evaluated in order after every inclusion
    pub excludes: Vec<String>,
    /// Whether a transfer in this mode must be confirmed interactively
    pub requires_confirmation: bool,
}

impl TransferMode {
    /// Mode filters in evaluation order: inclusions, then exclusions
    pub fn filter_rules(&self) -> Vec<FilterRule> {
        self.includes
            .iter()
            .cloned()
            .map(FilterRule::Include)
            .chain(self.excludes.iter().cloned().map(FilterRule::Exclude))
            .collect()
    }
}

/// State of the transfer daemon as derived from its PID file
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state")]
pub enum DaemonState {
    /// No PID file
    #[serde(rename = "absent")]
    Absent,
    /// PID file names a process that exists
    #[serde(rename = "present-live")]
    Live {
        pid: u32,
        #[serde(skip_serializing_if = "Option::is_none")]
        process_name: Option<String>,
    },
    /// PID file exists but names no running process.
    /// `pid` is `None` when the file does not hold a usable process id.
    #[serde(rename = "present-stale")]
    Stale { pid: Option<u32> },
}

impl DaemonState {
    pub fn is_live(&self) -> bool {
        matches!(self, DaemonState::Live { .. })
    }
}

impl fmt::Display for DaemonState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DaemonState::Absent => write!(f, "absent"),
            DaemonState::Live { pid, process_name: Some(name) } => {
                write!(f, "present-live (pid {}, {})", pid, name)
            }
            DaemonState::Live {
                pid,
                process_name: None,
            } => write!(f, "present-live (pid {})", pid),
            DaemonState::Stale { pid: Some(pid) } => write!(f, "present-stale (pid {})", pid),
            DaemonState::Stale { pid: None } => write!(f, "present-stale (no valid pid)"),
        }
    }
}

/// Daemon state together with the PID file it was read from
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusReport {
    pub pid_file: PathBuf,
    #[serde(flatten)]
    pub state: DaemonState,
}

/// Result of a start request
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "kebab-case")]
pub enum StartOutcome {
    /// The launcher ran; `state` is what the PID file showed afterwards
    Launched { state: DaemonState },
    Declined,
}

/// Result of a stop request
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "kebab-case")]
pub enum StopOutcome {
    /// Nothing to stop
    NotRunning,
    /// SIGTERM delivered
    Signalled { pid: u32 },
    /// The recorded process could not be signalled
    Failed { pid: Option<u32>, reason: String },
    Declined,
}

/// A synchronization job constructed for one invocation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransferJob {
    pub mode: ModeName,
    /// Source path exactly as given on the command line
    pub source: String,
    /// Full remote destination URL
    pub destination: String,
    /// Filter rules handed to the tool, in order
    pub filters: Vec<FilterRule>,
    pub dry_run: bool,
}

/// Result of a transfer request
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "kebab-case")]
pub enum TransferOutcome {
    Completed {
        #[serde(rename = "duration_ms", serialize_with = "serialize_millis")]
        duration: Duration,
    },
    Declined,
    TransferFailed { code: i32, interrupted: bool },
}

/// A transfer job and how it ended
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransferReport {
    pub job: TransferJob,
    #[serde(flatten)]
    pub outcome: TransferOutcome,
}

/// Remote rsync daemon health
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HealthReport {
    /// Remote endpoint that was queried
    pub endpoint: String,
    /// Whether the module listing succeeded
    pub reachable: bool,
    /// Tool exit code of the listing
    pub exit_code: i32,
    /// Modules exported by the remote daemon
    pub modules: Vec<String>,
    /// Modes whose destination module is not exported
    pub missing: Vec<ModeName>,
}

/// Registry entry as shown by the `modes` action
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModeSummary {
    #[serde(flatten)]
    pub mode: TransferMode,
    pub destination_url: String,
}

/// Action requested on the command line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Status,
    Start,
    Stop,
    Transfer {
        mode: String,
        source: String,
        dry_run: bool,
    },
    Health,
    Modes,
}

/// Everything a console action can report
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Report {
    Status(StatusReport),
    Start(StartOutcome),
    Stop(StopOutcome),
    Transfer(TransferReport),
    Health(HealthReport),
    Modes(Vec<ModeSummary>),
}

impl Report {
    /// Process exit code for this report
    pub fn exit_code(&self) -> i32 {
        match self {
            Report::Status(_) | Report::Modes(_) => EXIT_SUCCESS,
            Report::Start(StartOutcome::Declined)
            | Report::Stop(StopOutcome::Declined)
            | Report::Transfer(TransferReport {
                outcome: TransferOutcome::Declined,
                ..
            }) => EXIT_DECLINED,
            Report::Start(StartOutcome::Launched { state }) => {
                if state.is_live() {
                    EXIT_SUCCESS
                } else {
                    EXIT_START_FAILED
                }
            }
            Report::Stop(StopOutcome::NotRunning | StopOutcome::Signalled { .. }) => EXIT_SUCCESS,
            Report::Stop(StopOutcome::Failed { .. }) => EXIT_STOP_FAILED,
            Report::Transfer(TransferReport { outcome, .. }) => match outcome {
                TransferOutcome::TransferFailed { code, .. } => *code,
                _ => EXIT_SUCCESS,
            },
            Report::Health(health) => {
                if !health.reachable {
                    health.exit_code
                } else if !health.missing.is_empty() {
                    EXIT_UNHEALTHY
                } else {
                    EXIT_SUCCESS
                }
            }
        }
    }
}

/// Errors surfaced by console actions
#[derive(Debug, thiserror::Error)]
pub enum ConsoleError {
    #[error("unknown mode '{name}' (valid modes: {})", .valid.join(", "))]
    UnknownMode { name: String, valid: Vec<String> },

    #[error("source path must not be empty")]
    EmptySource,

    #[error("source path not found: {} ({reason})", .path.display())]
    MissingSource { path: PathBuf, reason: String },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("failed to read daemon pid file {}: {source}", .path.display())]
    DaemonState {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("transfer daemon already running (pid {pid}), stop it first")]
    StateConflict { pid: u32 },

    #[error("failed to start transfer daemon: {0}")]
    StartFailed(String),

    #[error("failed to launch '{program}': {source}")]
    ToolLaunch {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to read confirmation: {0}")]
    Prompt(#[source] std::io::Error),
}

impl ConsoleError {
    /// Process exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            ConsoleError::UnknownMode { .. }
            | ConsoleError::EmptySource
            | ConsoleError::MissingSource { .. }
            | ConsoleError::InvalidConfig(_)
            | ConsoleError::Prompt(_) => EXIT_VALIDATION,
            ConsoleError::DaemonState { .. } => EXIT_DAEMON_STATE,
            ConsoleError::StateConflict { .. } => EXIT_STATE_CONFLICT,
            ConsoleError::StartFailed(_) => EXIT_START_FAILED,
            ConsoleError::ToolLaunch { .. } => EXIT_TOOL_LAUNCH,
        }
    }
}

fn serialize_millis<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_u64(duration.as_millis() as u64)
}
