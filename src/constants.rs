//! Global constants for cratesync
//!
//! Centralized location for defaults and the exit-code contract

/// Application name, used for the config directory and log targets
pub const APP_NAME: &str = "cratesync";

/// Environment variable naming an alternate configuration file
pub const CONFIG_ENV_VAR: &str = "CRATESYNC_CONFIG";

/// Configuration file name inside the per-user config directory
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Media host defaults
pub const DEFAULT_REMOTE_HOST: &str = "corevega.local";
pub const DEFAULT_REMOTE_USER: &str = "zachvp";
pub const DEFAULT_REMOTE_PORT: u16 = 12000;

/// URL scheme for the remote rsync daemon
pub const RSYNC_PROTOCOL: &str = "rsync://";

/// Default remote modules per transfer mode
pub const DEFAULT_MUSIC_DESTINATION: &str = "navidrome";
pub const DEFAULT_PREFS_DESTINATION: &str = "rekordbox";

/// Daemon defaults
pub const DEFAULT_DAEMON_PROGRAM: &str = "rsync";
pub const DEFAULT_DAEMON_PID_FILE: &str = "/var/run/rsyncd.pid";
pub const DEFAULT_DAEMON_CONFIG_FILE: &str = "/etc/rsyncd.conf";
pub const DEFAULT_STARTUP_GRACE_MS: u64 = 2000;

/// Note: bounds are enforced by `Configuration::validate`
pub const STARTUP_GRACE_MAX_MS: u64 = 60_000;

/// Interval between status polls while waiting for a started daemon
pub const STATUS_POLL_INTERVAL_MS: u64 = 100;

/// Interval between exit checks on a running transfer
pub const TOOL_POLL_INTERVAL_MS: u64 = 50;

/// External synchronization tool
pub const DEFAULT_TRANSFER_PROGRAM: &str = "rsync";

/// Filter rule that keeps hidden entries out of every transfer
pub const HIDDEN_ENTRY_PATTERN: &str = ".*";

/// Path segment rsync treats as the start of the relative path under `-R`
pub const RELATIVE_PATH_MARKER: &str = "/./";

// Exit codes. Transfer failures exit with the tool's own status instead.
pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_VALIDATION: i32 = 1;
pub const EXIT_DECLINED: i32 = 2;
pub const EXIT_DAEMON_STATE: i32 = 3;
pub const EXIT_STATE_CONFLICT: i32 = 4;
pub const EXIT_STOP_FAILED: i32 = 5;
pub const EXIT_START_FAILED: i32 = 6;
pub const EXIT_UNHEALTHY: i32 = 7;
pub const EXIT_TOOL_LAUNCH: i32 = 127;
