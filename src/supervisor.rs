//! Supervisor lifecycle.
//!
//! Loads the managed-service state, runs the reconcile loop in the
//! background until a termination signal arrives, then lets the in-flight
//! tick finish and persists the state.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tokio::signal;
use tokio::sync::{Notify, RwLock};
use tracing::{error, info, warn};

use crate::config::{executable_dir, Settings};
use crate::error::DaemonError;
use crate::services::{ControllerFactory, Executable, HostOs, ManagedControllers};
use crate::update::{HttpUpdateSource, ReconcileLoop, UpdaterConfig};

/// How long shutdown waits for an in-flight tick.
pub const DRAIN_TIMEOUT: Duration = Duration::from_secs(30);

/// State found at startup.
#[derive(Debug)]
pub enum Startup {
    /// State loaded; the loop can run.
    Ready(UpdaterConfig),
    /// No usable state; a default one was written to `path`.
    Bootstrapped { path: PathBuf },
}

/// Load the state file, or seed it with the default entry.
///
/// A missing or unreadable file is replaced by the bootstrap config.
pub fn prepare_state(path: &Path) -> Result<Startup, DaemonError> {
    match UpdaterConfig::load(path) {
        Ok(config) => Ok(Startup::Ready(config)),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Cannot read updater config");
            UpdaterConfig::bootstrap().save(path)?;
            Ok(Startup::Bootstrapped {
                path: path.to_path_buf(),
            })
        }
    }
}

/// The daemon-mode program hosted by the supervisor's own service.
pub struct Supervisor {
    settings: Settings,
    stop: Arc<Notify>,
}

impl Supervisor {
    pub fn new(settings: Settings) -> Self {
        Self {
            settings,
            stop: Arc::new(Notify::new()),
        }
    }

    /// Handle that ends [`Supervisor::serve`] like a termination signal.
    pub fn stop_handle(&self) -> Arc<Notify> {
        Arc::clone(&self.stop)
    }

    /// Run until a termination signal or stop request.
    pub async fn serve(&self) -> Result<(), DaemonError> {
        let state_path = self.settings.state_path()?;
        let config = match prepare_state(&state_path)? {
            Startup::Ready(config) => config,
            Startup::Bootstrapped { path } => {
                info!(
                    path = %path.display(),
                    "Default updater config written; edit it and start again"
                );
                return Ok(());
            }
        };
        info!(
            path = %state_path.display(),
            services = config.entries.len(),
            "Updater config loaded"
        );

        let source = HttpUpdateSource::from_config(&self.settings.http)?;
        let kind = self.settings.updater.managed_kind_for(&HostOs::current());
        let controllers = ManagedControllers::new(ControllerFactory::system(), kind);
        let reconcile = ReconcileLoop::new(source, controllers, executable_dir()?)
            .with_interval(self.settings.updater.interval())
            .with_grace_period(self.settings.updater.grace_period());

        let config = Arc::new(RwLock::new(config));
        let shutdown = Arc::new(Notify::new());
        let handle = tokio::spawn({
            let config = Arc::clone(&config);
            let shutdown = Arc::clone(&shutdown);
            async move { reconcile.run(&config, &shutdown).await }
        });

        tokio::select! {
            _ = shutdown_signal() => info!("Shutdown signal received"),
            _ = self.stop.notified() => info!("Stop requested"),
        }
        shutdown.notify_one();

        match tokio::time::timeout(DRAIN_TIMEOUT, handle).await {
            Ok(Ok(())) => info!("Reconcile loop drained"),
            Ok(Err(e)) => error!(error = %e, "Reconcile loop task failed"),
            Err(_) => warn!(
                "In-flight tick still running after {}s, saving current state",
                DRAIN_TIMEOUT.as_secs()
            ),
        }

        config.read().await.save(&state_path)?;
        info!(path = %state_path.display(), "Updater config saved");
        Ok(())
    }
}

impl Executable for Supervisor {
    fn stop(&mut self) {
        self.stop.notify_one();
    }

    fn run(&mut self) -> Result<(), DaemonError> {
        let runtime = tokio::runtime::Runtime::new()?;
        let result = runtime.block_on(self.serve());
        runtime.shutdown_timeout(Duration::from_secs(1));
        result
    }
}

/// Wait for a shutdown signal (SIGTERM or SIGINT).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
