//! Autokeep Daemon - keeps managed services running and up to date.

use std::process::ExitCode;

use clap::Parser;
use tracing::{error, info};

use autokeep_daemon::cli::{self, Cli, Invocation};
use autokeep_daemon::config::{executable_dir, Settings};
use autokeep_daemon::error::DaemonError;
use autokeep_daemon::logging::{self, LogTarget};
use autokeep_daemon::services::{new_controller, HostOs, Kind};
use autokeep_daemon::supervisor::Supervisor;

const VERSION: &str = env!("CARGO_PKG_VERSION");
const NAME: &str = env!("CARGO_PKG_NAME");

fn main() -> ExitCode {
    let cli = Cli::parse();

    let invocation = match cli::resolve(cli.command) {
        Ok(invocation) => invocation,
        Err(e) => {
            eprintln!("Error: {}", e);
            eprintln!("{}", cli::usage());
            return ExitCode::FAILURE;
        }
    };

    let settings = match Settings::load_or_default(cli.config.as_deref()) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error loading configuration: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let result = match invocation {
        Invocation::Control(action) => control(&settings, &action),
        Invocation::Run { console } => run(settings, console),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            error!(error = %e, "Daemon failed");
            ExitCode::FAILURE
        }
    }
}

/// Install/remove/start/stop/status of the supervisor's own service.
fn control(settings: &Settings, action: &cli::ControlAction) -> Result<(), DaemonError> {
    logging::init_logging(&settings.logging, &LogTarget::Console)?;

    let controller = new_controller(
        &settings.service.name,
        &settings.service.description,
        Kind::default_for(&HostOs::current()),
        &settings.service.dependencies,
    )?;
    let message = cli::execute(controller.as_ref(), action)?;
    println!("{}", message);
    Ok(())
}

/// Daemon mode: hand the supervisor to the service controller.
fn run(settings: Settings, console: bool) -> Result<(), DaemonError> {
    let target = if console {
        LogTarget::Console
    } else {
        LogTarget::File(settings.log_path()?)
    };
    logging::init_logging(&settings.logging, &target)?;
    logging::install_panic_hook(executable_dir()?, settings.service.name.clone());

    info!("Starting {} v{}", NAME, VERSION);
    info!(
        service = %settings.service.name,
        log_level = %settings.logging.level,
        "Configuration loaded"
    );

    let controller = new_controller(
        &settings.service.name,
        &settings.service.description,
        Kind::default_for(&HostOs::current()),
        &settings.service.dependencies,
    )?;
    let mut supervisor = Supervisor::new(settings);
    controller.run(&mut supervisor)?;

    info!("Daemon stopped");
    Ok(())
}
