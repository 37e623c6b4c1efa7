//! Remote rsync daemon health check
//!
//! Asking an rsync daemon for `rsync://user@host:port/` lists its exported
//! modules, one per line (`name<TAB>comment`). A healthy daemon answers and
//! exports the module of every transfer mode.

use crate::config::Configuration;
use crate::logging::EventLogger;
use crate::models::{ConsoleError, HealthReport, ModeName};
use crate::registry::ModeRegistry;
use crate::transfer::{SyncInvocation, SyncTool};

/// Query the remote daemon's module list
pub fn check<T: SyncTool>(
    config: &Configuration,
    registry: &ModeRegistry,
    tool: &T,
) -> Result<HealthReport, ConsoleError> {
    let endpoint = config.remote_endpoint();
    let invocation = SyncInvocation {
        program: config.transfer.program.clone(),
        args: vec![format!("{}/", endpoint)],
    };
    log::debug!("run command: {}", invocation.display());

    let (code, stdout) = tool
        .capture(&invocation)
        .map_err(|source| ConsoleError::ToolLaunch {
            program: invocation.program.clone(),
            source,
        })?;

    let reachable = code == 0;
    let modules = if reachable { parse_modules(&stdout) } else { Vec::new() };
    let missing: Vec<ModeName> = if reachable {
        registry
            .modes()
            .iter()
            .filter(|mode| !modules.iter().any(|m| m == module_of(&mode.destination)))
            .map(|mode| mode.name)
            .collect()
    } else {
        Vec::new()
    };

    let report = HealthReport {
        endpoint,
        reachable,
        exit_code: code,
        modules,
        missing,
    };
    EventLogger.health_checked(&report);
    Ok(report)
}

/// Module names from a daemon listing
pub fn parse_modules(listing: &str) -> Vec<String> {
    listing
        .lines()
        .filter_map(|line| line.split_whitespace().next())
        .map(str::to_string)
        .collect()
}

/// Leading path segment of a destination suffix: the rsync module
pub fn module_of(destination: &str) -> &str {
    destination
        .trim_start_matches('/')
        .split('/')
        .next()
        .unwrap_or_default()
}
