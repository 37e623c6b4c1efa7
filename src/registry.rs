//! Transfer mode registry
//!
//! The set of modes is fixed. Filter rules are part of each mode's
//! definition; only the remote destination comes from configuration.

use crate::config::Configuration;
use crate::models::{ConsoleError, ModeName, ModeSummary, TransferMode};

/// Audio formats carried by the `music` mode
const MUSIC_INCLUDES: &[&str] = &["*/", "*.mp3", "*.flac", "*.wav", "*.aif", "*.aiff"];

/// Collection exports and settings carried by the `prefs` mode
const PREFS_INCLUDES: &[&str] = &["*/", "*.xml", "*.json", "*.plist"];

/// Anything not explicitly included stays behind
const CATCH_ALL_EXCLUDES: &[&str] = &["*"];

/// Read-only lookup table from mode name to transfer profile
#[derive(Debug, Clone)]
pub struct ModeRegistry {
    modes: Vec<TransferMode>,
}

impl ModeRegistry {
    /// Build the registry, taking destinations from configuration
    pub fn new(config: &Configuration) -> Self {
        let modes = ModeName::ALL
            .into_iter()
            .map(|name| {
                let includes = match name {
                    ModeName::Music => MUSIC_INCLUDES,
                    ModeName::Prefs => PREFS_INCLUDES,
                };
                TransferMode {
                    name,
                    destination: config.destination_for(name).to_string(),
                    includes: to_owned(includes),
                    excludes: to_owned(CATCH_ALL_EXCLUDES),
                    requires_confirmation: true,
                }
            })
            .collect();
        Self { modes }
    }

    /// Look up a mode by name
    pub fn resolve(&self, name: &str) -> Result<&TransferMode, ConsoleError> {
        ModeName::parse(name)
            .and_then(|parsed| self.modes.iter().find(|mode| mode.name == parsed))
            .ok_or_else(|| ConsoleError::UnknownMode {
                name: name.to_string(),
                valid: self.names(),
            })
    }

    /// Valid mode names, in listing order
    pub fn names(&self) -> Vec<String> {
        self.modes.iter().map(|mode| mode.name.to_string()).collect()
    }

    pub fn modes(&self) -> &[TransferMode] {
        &self.modes
    }

    /// Registry entries with their full destination URLs
    pub fn summaries(&self, config: &Configuration) -> Vec<ModeSummary> {
        self.modes
            .iter()
            .map(|mode| ModeSummary {
                mode: mode.clone(),
                destination_url: config.remote_url(&mode.destination),
            })
            .collect()
    }
}

fn to_owned(patterns: &[&str]) -> Vec<String> {
    patterns.iter().map(|p| p.to_string()).collect()
}
