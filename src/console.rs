//! Console entry point
//!
//! Routes one `Action` to the component that handles it. Every action
//! variant has exactly one arm here.

use crate::config::Configuration;
use crate::confirm::Confirm;
use crate::daemon::process::ProcessControl;
use crate::daemon::LifecycleManager;
use crate::models::{Action, ConsoleError, Report};
use crate::registry::ModeRegistry;
use crate::transfer::dispatch::Dispatcher;
use crate::transfer::{health, SyncTool};

pub struct Console<'a, P: ProcessControl, T: SyncTool> {
    config: &'a Configuration,
    registry: &'a ModeRegistry,
    lifecycle: LifecycleManager<'a, P>,
    dispatcher: Dispatcher<'a, T>,
    tool: T,
}

impl<'a, P: ProcessControl, T: SyncTool + Clone> Console<'a, P, T> {
    pub fn new(
        config: &'a Configuration,
        registry: &'a ModeRegistry,
        processes: P,
        tool: T,
    ) -> Self {
        Self {
            config,
            registry,
            lifecycle: LifecycleManager::new(&config.daemon, processes),
            dispatcher: Dispatcher::new(config, registry, tool.clone()),
            tool,
        }
    }

    /// Run one action to completion
    pub fn execute(&self, action: &Action, gate: &mut dyn Confirm) -> Result<Report, ConsoleError> {
        log::debug!("executing {:?}", action);
        match action {
            Action::Status => self.lifecycle.status().map(Report::Status),
            Action::Start => self.lifecycle.start(gate).map(Report::Start),
            Action::Stop => self.lifecycle.stop(gate).map(Report::Stop),
            Action::Transfer {
                mode,
                source,
                dry_run,
            } => self
                .dispatcher
                .dispatch(mode, source, *dry_run, gate)
                .map(Report::Transfer),
            Action::Health => {
                health::check(self.config, self.registry, &self.tool).map(Report::Health)
            }
            Action::Modes => Ok(Report::Modes(self.registry.summaries(self.config))),
        }
    }
}
