//! Command line surface.
//!
//! `autokeepd run` is what the service manager launches; the remaining
//! subcommands control the supervisor's own service.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::error::{CliErrorKind, DaemonError, ServiceErrorKind};
use crate::services::{ServiceController, STATUS_NOT_INSTALLED};

/// Argument placed before the user's `--args` in the service definition.
pub const RUN_COMMAND: &str = "run";

#[derive(Parser, Debug)]
#[command(name = "autokeepd", version, about = "Keeps managed services running and up to date")]
pub struct Cli {
    /// Settings file [default: autokeepd.toml next to the executable]
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Run the supervisor (what the installed service executes)
    Run {
        /// Log to the console instead of the log file
        #[arg(long)]
        console: bool,
    },
    /// Install the supervisor as a service
    Install {
        /// Extra arguments passed to the service, whitespace separated
        #[arg(short, long, default_value = "", allow_hyphen_values = true)]
        args: String,
    },
    /// Remove the installed service
    Remove,
    /// Start the service
    Start,
    /// Stop the service
    Stop,
    /// Show the service status
    Status,
    #[command(external_subcommand)]
    External(Vec<String>),
}

/// Operation on the supervisor's own service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlAction {
    Install(Vec<String>),
    Remove,
    Start,
    Stop,
    Status,
}

/// What an invocation asks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Invocation {
    Run { console: bool },
    Control(ControlAction),
}

/// Map the parsed subcommand to an invocation.
pub fn resolve(command: Option<Commands>) -> Result<Invocation, DaemonError> {
    let command = command.ok_or(DaemonError::Cli {
        kind: CliErrorKind::NoCommand,
    })?;
    let invocation = match command {
        Commands::Run { console } => Invocation::Run { console },
        Commands::Install { args } => {
            Invocation::Control(ControlAction::Install(service_args(&args)))
        }
        Commands::Remove => Invocation::Control(ControlAction::Remove),
        Commands::Start => Invocation::Control(ControlAction::Start),
        Commands::Stop => Invocation::Control(ControlAction::Stop),
        Commands::Status => Invocation::Control(ControlAction::Status),
        Commands::External(words) => {
            return Err(DaemonError::Cli {
                kind: CliErrorKind::UnknownCommand {
                    name: words.into_iter().next().unwrap_or_default(),
                },
            })
        }
    };
    Ok(invocation)
}

/// Arguments written into the service definition for `install --args`.
pub fn service_args(extra: &str) -> Vec<String> {
    std::iter::once(RUN_COMMAND.to_string())
        .chain(extra.split_whitespace().map(str::to_string))
        .collect()
}

/// Perform `action` and describe the result.
pub fn execute(
    controller: &dyn ServiceController,
    action: &ControlAction,
) -> Result<String, DaemonError> {
    let name = controller.descriptor().name();
    match action {
        ControlAction::Install(args) => {
            controller.install(args)?;
            Ok(format!("Install {}:\t\t\t\t\t[  OK  ]", name))
        }
        ControlAction::Remove => {
            controller.remove()?;
            Ok(format!("Removing {}:\t\t\t\t\t[  OK  ]", name))
        }
        ControlAction::Start => {
            controller.start()?;
            Ok(format!("Starting {}:\t\t\t\t\t[  OK  ]", name))
        }
        ControlAction::Stop => {
            controller.stop()?;
            Ok(format!("Stopping {}:\t\t\t\t\t[  OK  ]", name))
        }
        ControlAction::Status => match controller.status() {
            Ok(status) => Ok(status.to_string()),
            Err(e) if e.service_kind() == Some(&ServiceErrorKind::NotInstalled) => {
                Ok(STATUS_NOT_INSTALLED.to_string())
            }
            Err(e) => Err(e),
        },
    }
}

/// One-line usage hint printed after a command line error.
pub fn usage() -> String {
    "Usage: autokeepd install [--args \"...\"] | remove | start | stop | status | run [--console]"
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::{ControllerFactory, HostOs, Kind, Privileges, ServiceEnvironment};

    fn parse(args: &[&str]) -> Result<Invocation, DaemonError> {
        let cli = Cli::try_parse_from(std::iter::once("autokeepd").chain(args.iter().copied()))
            .unwrap();
        resolve(cli.command)
    }

    #[test]
    fn test_no_command() {
        assert!(matches!(
            parse(&[]),
            Err(DaemonError::Cli {
                kind: CliErrorKind::NoCommand
            })
        ));
    }

    #[test]
    fn test_unknown_command() {
        match parse(&["upgrade", "now"]) {
            Err(DaemonError::Cli {
                kind: CliErrorKind::UnknownCommand { name },
            }) => assert_eq!(name, "upgrade"),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_control_commands() {
        assert_eq!(
            parse(&["remove"]).unwrap(),
            Invocation::Control(ControlAction::Remove)
        );
        assert_eq!(parse(&["start"]).unwrap(), Invocation::Control(ControlAction::Start));
        assert_eq!(parse(&["stop"]).unwrap(), Invocation::Control(ControlAction::Stop));
        assert_eq!(
            parse(&["status"]).unwrap(),
            Invocation::Control(ControlAction::Status)
        );
        assert_eq!(
            parse(&["run", "--console"]).unwrap(),
            Invocation::Run { console: true }
        );
    }

    #[test]
    fn test_install_args() {
        assert_eq!(
            parse(&["install"]).unwrap(),
            Invocation::Control(ControlAction::Install(vec!["run".to_string()]))
        );
        assert_eq!(
            parse(&["install", "--args", "--port 8080  -v"]).unwrap(),
            Invocation::Control(ControlAction::Install(vec![
                "run".to_string(),
                "--port".to_string(),
                "8080".to_string(),
                "-v".to_string(),
            ]))
        );
    }

    #[test]
    fn test_global_config_flag() {
        let cli = Cli::try_parse_from(["autokeepd", "status", "--config", "/etc/a.toml"]).unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("/etc/a.toml")));
    }

    #[test]
    fn test_execute_reports_precondition_errors() {
        let dir = tempfile::tempdir().unwrap();
        let env = ServiceEnvironment::rooted(dir.path()).with_privileges(Privileges::Assume(true));
        let controller = ControllerFactory::for_host(HostOs::Linux, env)
            .create("updater", "auto keep", Kind::SystemDaemon, &[])
            .unwrap();

        let err = execute(controller.as_ref(), &ControlAction::Remove).unwrap_err();
        assert!(err.to_string().contains("not installed"));
        assert_eq!(
            execute(controller.as_ref(), &ControlAction::Status).unwrap(),
            "Service not installed"
        );
    }

    #[test]
    fn test_status_without_privileges_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let env =
            ServiceEnvironment::rooted(dir.path()).with_privileges(Privileges::Assume(false));
        let controller = ControllerFactory::for_host(HostOs::Linux, env)
            .create("updater", "auto keep", Kind::SystemDaemon, &[])
            .unwrap();

        let err = execute(controller.as_ref(), &ControlAction::Status).unwrap_err();
        assert!(matches!(
            err.service_kind(),
            Some(ServiceErrorKind::Privilege)
        ));
    }
}
