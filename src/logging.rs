//! Log and panic redirection.
//!
//! In daemon mode the service manager discards stdout, so logs go to a file
//! next to the executable and panics are additionally written to a dated
//! crash file.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{Local, NaiveDate};
use tracing::error;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::LoggingConfig;
use crate::error::DaemonError;

/// Where log output goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogTarget {
    Console,
    File(PathBuf),
}

/// Install the global subscriber.
pub fn init_logging(config: &LoggingConfig, target: &LogTarget) -> Result<(), DaemonError> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    let (writer, ansi) = match target {
        LogTarget::Console => (BoxMakeWriter::new(std::io::stdout), true),
        LogTarget::File(path) => {
            let file = open_append(path)?;
            (BoxMakeWriter::new(Mutex::new(file)), false)
        }
    };

    let registry = tracing_subscriber::registry().with(env_filter);
    let result = match config.format.to_lowercase().as_str() {
        "json" => registry
            .with(fmt::layer().json().with_ansi(ansi).with_writer(writer))
            .try_init(),
        _ => registry
            .with(fmt::layer().pretty().with_ansi(ansi).with_writer(writer))
            .try_init(),
    };

    result.map_err(|e| DaemonError::Config {
        message: format!("Failed to initialize logging: {}", e),
    })
}

/// `<dir>/<name>_crash_<YYYYMMDD>.log`
pub fn crash_log_path(dir: &Path, name: &str, date: NaiveDate) -> PathBuf {
    dir.join(format!("{}_crash_{}.log", name, date.format("%Y%m%d")))
}

/// Write panics to the day's crash file before the default hook runs.
pub fn install_panic_hook(dir: PathBuf, name: String) {
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        error!(panic = %info, "Daemon panicked");

        let now = Local::now();
        let path = crash_log_path(&dir, &name, now.date_naive());
        if let Ok(mut file) = open_append(&path) {
            let _ = writeln!(
                file,
                "[{}] {}\n{}",
                now.format("%Y-%m-%d %H:%M:%S"),
                info,
                std::backtrace::Backtrace::force_capture()
            );
        }

        default_hook(info);
    }));
}

fn open_append(path: &Path) -> Result<std::fs::File, DaemonError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| DaemonError::Config {
            message: format!("Failed to open log file '{}': {}", path.display(), e),
        })
}
