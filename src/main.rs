#![forbid(unsafe_code)]

use anyhow::Result;
use std::process::ExitCode;

use cratesync::cli::{self, ACTIONS};
use cratesync::config::Configuration;
use cratesync::confirm::PromptGate;
use cratesync::console::Console;
use cratesync::constants::EXIT_VALIDATION;
use cratesync::daemon::process::SystemProcesses;
use cratesync::logging;
use cratesync::models::{ConsoleError, ModeName};
use cratesync::output;
use cratesync::registry::ModeRegistry;
use cratesync::transfer::RsyncTool;

fn main() -> ExitCode {
    let args = match cli::parse_args() {
        Ok(args) => args,
        Err(err) => {
            let _ = err.print();
            if cli::is_informational(&err) {
                return ExitCode::SUCCESS;
            }
            eprintln!();
            eprintln!("Valid actions: {}", ACTIONS.join(", "));
            eprintln!("Valid modes: {}", ModeName::ALL.map(ModeName::as_str).join(", "));
            return exit_code(EXIT_VALIDATION);
        }
    };

    if let Err(err) = logging::init(args.verbosity) {
        eprintln!("warning: {}", err);
    }

    match run(&args) {
        Ok(code) => exit_code(code),
        Err(err) => {
            eprintln!("error: {:#}", err);
            let code = err
                .downcast_ref::<ConsoleError>()
                .map(ConsoleError::exit_code)
                .unwrap_or(EXIT_VALIDATION);
            exit_code(code)
        }
    }
}

fn run(args: &cli::CliArgs) -> Result<i32> {
    let config = Configuration::load(args.config_path.as_deref())?;
    let registry = ModeRegistry::new(&config);
    let console = Console::new(&config, &registry, SystemProcesses, RsyncTool);
    let mut gate = PromptGate::stdio();

    let report = console.execute(&args.action, &mut gate)?;
    output::render(&report, args.json_output)?;
    Ok(report.exit_code())
}

fn exit_code(code: i32) -> ExitCode {
    ExitCode::from(u8::try_from(code).unwrap_or(1))
}
