//! Configuration management
//!
//! Handles TOML configuration parsing, defaults, validation, and location
//! lookup. A `Configuration` is loaded once at startup and never mutated.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::constants::{
    APP_NAME, CONFIG_ENV_VAR, CONFIG_FILE_NAME, DEFAULT_DAEMON_CONFIG_FILE, DEFAULT_DAEMON_PID_FILE,
    DEFAULT_DAEMON_PROGRAM, DEFAULT_MUSIC_DESTINATION, DEFAULT_PREFS_DESTINATION,
    DEFAULT_REMOTE_HOST, DEFAULT_REMOTE_PORT, DEFAULT_REMOTE_USER, DEFAULT_STARTUP_GRACE_MS,
    DEFAULT_TRANSFER_PROGRAM, RSYNC_PROTOCOL, STARTUP_GRACE_MAX_MS,
};
use crate::models::{ConsoleError, ModeName};

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Configuration {
    pub remote: RemoteSettings,
    pub modes: ModeSettings,
    pub daemon: DaemonSettings,
    pub transfer: TransferSettings,
}

/// Remote media host endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RemoteSettings {
    /// Host name or address of the media host
    pub host: String,
    /// User presented to the rsync daemon
    pub user: String,
    /// Port of the rsync daemon
    pub port: u16,
}

impl Default for RemoteSettings {
    fn default() -> Self {
        Self {
            host: DEFAULT_REMOTE_HOST.to_string(),
            user: DEFAULT_REMOTE_USER.to_string(),
            port: DEFAULT_REMOTE_PORT,
        }
    }
}

/// Per-mode remote destinations
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ModeSettings {
    pub music: ModeDestination,
    pub prefs: ModeDestination,
}

impl Default for ModeSettings {
    fn default() -> Self {
        Self {
            music: ModeDestination::new(DEFAULT_MUSIC_DESTINATION),
            prefs: ModeDestination::new(DEFAULT_PREFS_DESTINATION),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ModeDestination {
    /// Remote path suffix: rsync module, optionally followed by a sub-path
    pub destination: String,
}

impl ModeDestination {
    fn new(destination: &str) -> Self {
        Self {
            destination: destination.to_string(),
        }
    }
}

/// Local transfer daemon control
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DaemonSettings {
    /// PID file written by the daemon itself
    pub pid_file: PathBuf,
    /// Launcher program
    pub program: String,
    /// Launcher arguments, placed before `--config=<config_file>`
    pub args: Vec<String>,
    /// Daemon configuration file
    pub config_file: PathBuf,
    /// How long to wait for the PID file after launching (0-60000 ms)
    pub startup_grace_ms: u64,
}

impl Default for DaemonSettings {
    fn default() -> Self {
        Self {
            pid_file: PathBuf::from(DEFAULT_DAEMON_PID_FILE),
            program: DEFAULT_DAEMON_PROGRAM.to_string(),
            args: vec!["--daemon".to_string()],
            config_file: PathBuf::from(DEFAULT_DAEMON_CONFIG_FILE),
            startup_grace_ms: DEFAULT_STARTUP_GRACE_MS,
        }
    }
}

/// External synchronization tool options
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TransferSettings {
    pub program: String,
    pub archive: bool,
    pub verbose: bool,
    pub compress: bool,
    /// Print a change summary for every updated entry
    pub itemize: bool,
    pub progress: bool,
}

impl Default for TransferSettings {
    fn default() -> Self {
        Self {
            program: DEFAULT_TRANSFER_PROGRAM.to_string(),
            archive: true,
            verbose: true,
            compress: true,
            itemize: true,
            progress: true,
        }
    }
}

impl Configuration {
    /// Load and validate configuration from a TOML file
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: Configuration = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        config
            .validate()
            .with_context(|| format!("Config file is invalid: {}", path.display()))?;
        Ok(config)
    }

    /// Resolve and load the configuration for this invocation.
    ///
    /// An explicit path (flag or environment) must exist. The per-user
    /// default location is optional; built-in defaults apply without it.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let from_env = std::env::var_os(CONFIG_ENV_VAR).map(PathBuf::from);
        if let Some(path) = explicit.map(Path::to_path_buf).or(from_env) {
            log::debug!("loading configuration from {}", path.display());
            return Self::load_from_file(&path);
        }

        match Self::default_config_path() {
            Some(path) if path.exists() => {
                log::debug!("loading configuration from {}", path.display());
                Self::load_from_file(&path)
            }
            _ => {
                log::debug!("no configuration file found, using defaults");
                Ok(Self::default())
            }
        }
    }

    /// Per-user configuration file location
    pub fn default_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(APP_NAME).join(CONFIG_FILE_NAME))
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConsoleError> {
        if self.remote.host.trim().is_empty() {
            return Err(ConsoleError::InvalidConfig("remote.host must not be empty".into()));
        }
        if self.remote.user.trim().is_empty() {
            return Err(ConsoleError::InvalidConfig("remote.user must not be empty".into()));
        }
        if self.remote.port == 0 {
            return Err(ConsoleError::InvalidConfig(
                "remote.port must be between 1 and 65535".into(),
            ));
        }
        for mode in ModeName::ALL {
            if self.destination_for(mode).trim_matches('/').is_empty() {
                return Err(ConsoleError::InvalidConfig(format!(
                    "modes.{}.destination must not be empty",
                    mode
                )));
            }
        }
        if self.daemon.program.trim().is_empty() {
            return Err(ConsoleError::InvalidConfig("daemon.program must not be empty".into()));
        }
        if self.daemon.pid_file.as_os_str().is_empty() {
            return Err(ConsoleError::InvalidConfig("daemon.pid_file must not be empty".into()));
        }
        if self.daemon.startup_grace_ms > STARTUP_GRACE_MAX_MS {
            return Err(ConsoleError::InvalidConfig(format!(
                "daemon.startup_grace_ms must be at most {}",
                STARTUP_GRACE_MAX_MS
            )));
        }
        if self.transfer.program.trim().is_empty() {
            return Err(ConsoleError::InvalidConfig("transfer.program must not be empty".into()));
        }
        Ok(())
    }

    /// Configured destination suffix for a mode
    pub fn destination_for(&self, mode: ModeName) -> &str {
        match mode {
            ModeName::Music => &self.modes.music.destination,
            ModeName::Prefs => &self.modes.prefs.destination,
        }
    }

    /// Remote rsync daemon endpoint, without a module
    pub fn remote_endpoint(&self) -> String {
        format!(
            "{}{}@{}:{}",
            RSYNC_PROTOCOL, self.remote.user, self.remote.host, self.remote.port
        )
    }

    /// Join the remote endpoint with a destination suffix
    pub fn remote_url(&self, suffix: &str) -> String {
        format!("{}/{}", self.remote_endpoint(), suffix.trim_start_matches('/'))
    }
}
