//! Transfer dispatch
//!
//! Validates the request, resolves the mode, asks for confirmation when the
//! mode requires it and only then runs the sync tool. Partial transfers are
//! the tool's business; from here a transfer either completed or failed.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use crate::config::Configuration;
use crate::confirm::Confirm;
use crate::constants::HIDDEN_ENTRY_PATTERN;
use crate::logging::EventLogger;
use crate::models::{
    ConsoleError, FilterRule, TransferJob, TransferMode, TransferOutcome, TransferReport,
};
use crate::registry::ModeRegistry;
use crate::transfer::{build_invocation, SyncTool, ToolExit};

pub struct Dispatcher<'a, T: SyncTool> {
    config: &'a Configuration,
    registry: &'a ModeRegistry,
    tool: T,
    events: EventLogger,
}

impl<'a, T: SyncTool> Dispatcher<'a, T> {
    pub fn new(config: &'a Configuration, registry: &'a ModeRegistry, tool: T) -> Self {
        Self {
            config,
            registry,
            tool,
            events: EventLogger,
        }
    }

    /// Run one transfer in `mode_name` from the local `source`
    pub fn dispatch(
        &self,
        mode_name: &str,
        source: &str,
        dry_run: bool,
        gate: &mut dyn Confirm,
    ) -> Result<TransferReport, ConsoleError> {
        validate_source(source)?;
        let mode = self.registry.resolve(mode_name)?;
        let job = self.build_job(mode, source, dry_run);

        if mode.requires_confirmation {
            let prompt = format!("transfer '{}' to '{}'", job.source, job.destination);
            if !gate.confirm(&prompt).map_err(ConsoleError::Prompt)? {
                self.events.confirmation_declined(&format!("{} transfer", mode.name));
                return Ok(TransferReport {
                    job,
                    outcome: TransferOutcome::Declined,
                });
            }
        }

        let invocation = build_invocation(&self.config.transfer, &job);
        log::debug!("run command: {}", invocation.display());
        self.events.transfer_started(&job);

        let started = Instant::now();
        let exit = self
            .tool
            .run(&invocation)
            .map_err(|source| ConsoleError::ToolLaunch {
                program: invocation.program.clone(),
                source,
            })?;
        let duration = started.elapsed();

        let outcome = transfer_outcome(exit, duration);
        self.events.transfer_finished(&job, &outcome);

        Ok(TransferReport { job, outcome })
    }

    fn build_job(&self, mode: &TransferMode, source: &str, dry_run: bool) -> TransferJob {
        // Hidden entries are excluded ahead of every mode rule so no
        // include can select them first
        let filters = std::iter::once(FilterRule::Exclude(HIDDEN_ENTRY_PATTERN.to_string()))
            .chain(mode.filter_rules())
            .collect();

        TransferJob {
            mode: mode.name,
            source: source.to_string(),
            destination: self.config.remote_url(&mode.destination),
            filters,
            dry_run,
        }
    }
}

/// A signalled run never counts as completed, even if the tool exited 0
fn transfer_outcome(exit: ToolExit, duration: Duration) -> TransferOutcome {
    match (exit.code, exit.interrupted) {
        (0, None) => TransferOutcome::Completed { duration },
        (0, Some(signal)) => TransferOutcome::TransferFailed {
            code: 128 + signal,
            interrupted: true,
        },
        (code, interrupted) => TransferOutcome::TransferFailed {
            code,
            interrupted: interrupted.is_some(),
        },
    }
}

/// The source must be named and must exist locally
fn validate_source(source: &str) -> Result<(), ConsoleError> {
    if source.trim().is_empty() {
        return Err(ConsoleError::EmptySource);
    }
    std::fs::metadata(source).map_err(|e| ConsoleError::MissingSource {
        path: PathBuf::from(source),
        reason: e.to_string(),
    })?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::confirm::testing::ScriptedGate;
    use crate::transfer::SyncInvocation;
    use std::cell::RefCell;
    use std::io;
    use std::rc::Rc;
    use tempfile::tempdir;

    /// Records invocations and exits with a fixed code
    struct FakeTool {
        calls: Rc<RefCell<Vec<SyncInvocation>>>,
        code: i32,
        interrupted: Option<i32>,
    }

    impl FakeTool {
        fn exiting(code: i32) -> (Self, Rc<RefCell<Vec<SyncInvocation>>>) {
            let calls = Rc::new(RefCell::new(Vec::new()));
            (
                Self {
                    calls: Rc::clone(&calls),
                    code,
                    interrupted: None,
                },
                calls,
            )
        }

        fn interrupted_by(mut self, signal: i32) -> Self {
            self.interrupted = Some(signal);
            self
        }
    }

    impl SyncTool for FakeTool {
        fn run(&self, invocation: &SyncInvocation) -> io::Result<ToolExit> {
            self.calls.borrow_mut().push(invocation.clone());
            Ok(ToolExit {
                code: self.code,
                interrupted: self.interrupted,
            })
        }

        fn capture(&self, _invocation: &SyncInvocation) -> io::Result<(i32, String)> {
            unreachable!("dispatch never captures output")
        }
    }

    struct MissingTool;

    impl SyncTool for MissingTool {
        fn run(&self, _invocation: &SyncInvocation) -> io::Result<ToolExit> {
            Err(io::Error::new(io::ErrorKind::NotFound, "No such file or directory"))
        }

        fn capture(&self, _invocation: &SyncInvocation) -> io::Result<(i32, String)> {
            unreachable!()
        }
    }

    fn setup() -> (Configuration, ModeRegistry) {
        let config = Configuration::default();
        let registry = ModeRegistry::new(&config);
        (config, registry)
    }

    #[test]
    fn test_accepted_music_transfer_completes() {
        let (config, registry) = setup();
        let source = tempdir().unwrap();
        let (tool, calls) = FakeTool::exiting(0);
        let dispatcher = Dispatcher::new(&config, &registry, tool);
        let mut gate = ScriptedGate::answering(&["y"]);
        let source_path = source.path().to_str().unwrap();

        let report = dispatcher.dispatch("music", source_path, false, &mut gate).unwrap();

        assert!(matches!(report.outcome, TransferOutcome::Completed { .. }));
        assert_eq!(report.job.destination, "rsync://zachvp@corevega.local:12000/navidrome");
        assert_eq!(calls.borrow().len(), 1);
        assert_eq!(
            gate.prompts,
            vec![format!(
                "transfer '{}' to 'rsync://zachvp@corevega.local:12000/navidrome'",
                source_path
            )]
        );

        let calls = calls.borrow();
        let args = &calls[0].args;
        assert_eq!(args[args.len() - 2], source_path);
        assert_eq!(args[args.len() - 1], "rsync://zachvp@corevega.local:12000/navidrome");
    }

    #[test]
    fn test_hidden_exclude_precedes_mode_rules() {
        let (config, registry) = setup();
        let source = tempdir().unwrap();
        let (tool, calls) = FakeTool::exiting(0);
        let dispatcher = Dispatcher::new(&config, &registry, tool);
        let mut gate = ScriptedGate::answering(&["y"]);

        dispatcher
            .dispatch("prefs", source.path().to_str().unwrap(), false, &mut gate)
            .unwrap();

        let calls = calls.borrow();
        let rules: Vec<&String> = calls[0]
            .args
            .iter()
            .filter(|arg| arg.starts_with("--include=") || arg.starts_with("--exclude="))
            .collect();
        assert_eq!(
            rules,
            vec![
                "--exclude=.*",
                "--include=*/",
                "--include=*.xml",
                "--include=*.json",
                "--include=*.plist",
                "--exclude=*",
            ]
        );
    }

    #[test]
    fn test_declined_never_runs_tool() {
        let (config, registry) = setup();
        let source = tempdir().unwrap();

        for answer in ["", "n", "Y", "yes"] {
            let (tool, calls) = FakeTool::exiting(0);
            let dispatcher = Dispatcher::new(&config, &registry, tool);
            let mut gate = ScriptedGate::answering(&[answer]);

            let report = dispatcher
                .dispatch("prefs", source.path().to_str().unwrap(), false, &mut gate)
                .unwrap();
            assert_eq!(report.outcome, TransferOutcome::Declined);
            assert!(calls.borrow().is_empty(), "answer {:?} must not transfer", answer);
        }
    }

    #[test]
    fn test_unknown_mode_never_runs_tool() {
        let (config, registry) = setup();
        let source = tempdir().unwrap();
        let (tool, calls) = FakeTool::exiting(0);
        let dispatcher = Dispatcher::new(&config, &registry, tool);
        let mut gate = ScriptedGate::answering(&["y"]);

        let err = dispatcher
            .dispatch("bogus", source.path().to_str().unwrap(), false, &mut gate)
            .unwrap_err();
        match err {
            ConsoleError::UnknownMode { valid, .. } => assert_eq!(valid, vec!["music", "prefs"]),
            other => panic!("expected UnknownMode, got {:?}", other),
        }
        assert!(gate.prompts.is_empty());
        assert!(calls.borrow().is_empty());
    }

    #[test]
    fn test_missing_source_is_validation_error() {
        let (config, registry) = setup();
        let (tool, calls) = FakeTool::exiting(0);
        let dispatcher = Dispatcher::new(&config, &registry, tool);
        let mut gate = ScriptedGate::answering(&["y"]);

        let err = dispatcher
            .dispatch("music", "/nonexistent/crate/path", false, &mut gate)
            .unwrap_err();
        assert!(matches!(err, ConsoleError::MissingSource { .. }));
        assert_eq!(err.exit_code(), 1);

        let err = dispatcher.dispatch("music", "  ", false, &mut gate).unwrap_err();
        assert!(matches!(err, ConsoleError::EmptySource));
        assert!(calls.borrow().is_empty());
    }

    #[test]
    fn test_tool_failure_surfaces_code() {
        let (config, registry) = setup();
        let source = tempdir().unwrap();
        let (tool, calls) = FakeTool::exiting(23);
        let dispatcher = Dispatcher::new(&config, &registry, tool);
        let mut gate = ScriptedGate::answering(&["y"]);

        let report = dispatcher
            .dispatch("music", source.path().to_str().unwrap(), false, &mut gate)
            .unwrap();
        assert_eq!(
            report.outcome,
            TransferOutcome::TransferFailed {
                code: 23,
                interrupted: false
            }
        );
        // No automatic retry
        assert_eq!(calls.borrow().len(), 1);
    }

    #[test]
    fn test_unlaunchable_tool_is_error() {
        let (config, registry) = setup();
        let source = tempdir().unwrap();
        let dispatcher = Dispatcher::new(&config, &registry, MissingTool);
        let mut gate = ScriptedGate::answering(&["y"]);

        let err = dispatcher
            .dispatch("music", source.path().to_str().unwrap(), false, &mut gate)
            .unwrap_err();
        assert!(matches!(err, ConsoleError::ToolLaunch { .. }));
        assert_eq!(err.exit_code(), 127);
    }

    #[test]
    fn test_dry_run_is_forwarded() {
        let (config, registry) = setup();
        let source = tempdir().unwrap();
        let (tool, calls) = FakeTool::exiting(0);
        let dispatcher = Dispatcher::new(&config, &registry, tool);
        let mut gate = ScriptedGate::answering(&["y"]);

        let report = dispatcher
            .dispatch("music", source.path().to_str().unwrap(), true, &mut gate)
            .unwrap();
        assert!(report.job.dry_run);
        assert!(calls.borrow()[0].args.contains(&"--dry-run".to_string()));
    }

    #[test]
    fn test_signalled_transfer_is_not_completed() {
        let (config, registry) = setup();
        let source = tempdir().unwrap();
        let source_path = source.path().to_str().unwrap();

        // Tool shrugged off the forwarded SIGTERM and still exited 0
        let (tool, _calls) = FakeTool::exiting(0);
        let dispatcher = Dispatcher::new(&config, &registry, tool.interrupted_by(15));
        let mut gate = ScriptedGate::answering(&["y"]);
        let report = dispatcher.dispatch("music", source_path, false, &mut gate).unwrap();
        assert_eq!(
            report.outcome,
            TransferOutcome::TransferFailed {
                code: 143,
                interrupted: true
            }
        );

        // Tool died from SIGINT
        let (tool, _calls) = FakeTool::exiting(130);
        let dispatcher = Dispatcher::new(&config, &registry, tool.interrupted_by(2));
        let mut gate = ScriptedGate::answering(&["y"]);
        let report = dispatcher.dispatch("music", source_path, false, &mut gate).unwrap();
        assert_eq!(
            report.outcome,
            TransferOutcome::TransferFailed {
                code: 130,
                interrupted: true
            }
        );
    }
}
