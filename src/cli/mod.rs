//! CLI argument parsing module
//!
//! Handles the command-line interface using clap:
//! - One subcommand per console action
//! - Config file override, JSON output, verbosity
//! - Help and version

use clap::error::ErrorKind;
use clap::{Arg, ArgAction, ArgMatches, Command};
use std::ffi::OsString;
use std::path::PathBuf;

use crate::logging::Verbosity;
use crate::models::{Action, ModeName};

/// Names of every action, for usage messages
pub const ACTIONS: &[&str] = &["status", "start", "stop", "transfer", "health", "modes"];

/// Parsed command line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CliArgs {
    pub action: Action,
    /// Explicit configuration file
    pub config_path: Option<PathBuf>,
    /// Whether to output JSON format
    pub json_output: bool,
    pub verbosity: Verbosity,
}

/// Build the clap command tree
pub fn command() -> Command {
    let modes = ModeName::ALL.map(ModeName::as_str).join(", ");

    Command::new("cratesync")
        .version(concat!(env!("CRATESYNC_VERSION"), " (", env!("GIT_HASH"), ")"))
        .about("Sync a DJ library to the media host and manage its transfer daemon")
        .long_about(
            "Operator console for the media host: transfers the music library and DJ \
             preferences through rsync and controls the local rsync daemon.",
        )
        .subcommand_required(true)
        .arg_required_else_help(true)
        .after_help(format!("Transfer modes: {}", modes))
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("PATH")
                .help("Configuration file (default: $CRATESYNC_CONFIG or the user config dir)")
                .value_parser(clap::value_parser!(PathBuf))
                .global(true),
        )
        .arg(
            Arg::new("json")
                .short('j')
                .long("json")
                .help("Output in JSON format")
                .action(ArgAction::SetTrue)
                .global(true),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Log more detail (repeat for debug output)")
                .action(ArgAction::Count)
                .global(true),
        )
        .arg(
            Arg::new("quiet")
                .short('q')
                .long("quiet")
                .help("Only log errors")
                .action(ArgAction::SetTrue)
                .conflicts_with("verbose")
                .global(true),
        )
        .subcommand(Command::new("status").about("Show whether the transfer daemon is running"))
        .subcommand(
            Command::new("start").about("Start the transfer daemon (asks for confirmation)"),
        )
        .subcommand(Command::new("stop").about("Stop the transfer daemon (asks for confirmation)"))
        .subcommand(
            Command::new("transfer")
                .about("Send a local path to the media host")
                .arg(
                    Arg::new("mode")
                        .value_name("MODE")
                        .help(format!("Transfer mode: {}", modes))
                        .required(true),
                )
                .arg(
                    Arg::new("source")
                        .value_name("SOURCE")
                        .help("Local file or directory to send")
                        .required(true),
                )
                .arg(
                    Arg::new("dry-run")
                        .short('n')
                        .long("dry-run")
                        .help("Ask the sync tool to report without copying")
                        .action(ArgAction::SetTrue),
                ),
        )
        .subcommand(Command::new("health").about("Check the remote rsync daemon and its modules"))
        .subcommand(Command::new("modes").about("List transfer modes"))
}

/// Parse the process arguments
pub fn parse_args() -> Result<CliArgs, clap::Error> {
    parse_from(std::env::args_os())
}

/// Parse an explicit argument list
pub fn parse_from<I, T>(args: I) -> Result<CliArgs, clap::Error>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let matches = command().try_get_matches_from(args)?;
    let action = action_from(&matches)?;

    Ok(CliArgs {
        action,
        config_path: matches.get_one::<PathBuf>("config").cloned(),
        json_output: matches.get_flag("json"),
        verbosity: Verbosity::from_flags(matches.get_flag("quiet"), matches.get_count("verbose")),
    })
}

fn action_from(matches: &ArgMatches) -> Result<Action, clap::Error> {
    let action = match matches.subcommand() {
        Some(("status", _)) => Action::Status,
        Some(("start", _)) => Action::Start,
        Some(("stop", _)) => Action::Stop,
        Some(("transfer", sub)) => Action::Transfer {
            mode: required(sub, "mode")?,
            source: required(sub, "source")?,
            dry_run: sub.get_flag("dry-run"),
        },
        Some(("health", _)) => Action::Health,
        Some(("modes", _)) => Action::Modes,
        _ => return Err(command().error(ErrorKind::MissingSubcommand, "an action is required")),
    };
    Ok(action)
}

fn required(matches: &ArgMatches, name: &str) -> Result<String, clap::Error> {
    matches
        .get_one::<String>(name)
        .cloned()
        .ok_or_else(|| {
            command().error(
                ErrorKind::MissingRequiredArgument,
                format!("<{}> is required", name),
            )
        })
}

/// Whether a parse error is really a help/version request
pub fn is_informational(err: &clap::Error) -> bool {
    matches!(err.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion)
}
