//! Reconcile loop.
//!
//! Every tick walks the managed entries in order. An entry with an update
//! URL is checked against its manifest and, when a newer version is
//! announced, stopped, replaced and restarted. Entries without a URL, and
//! entries whose update check did not go through, are only kept alive:
//! started when their status probe says they are not running.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Notify, RwLock};
use tracing::{debug, error, info, warn};

use crate::error::{CommandErrorKind, DaemonError};
use crate::services::{ControllerProvider, ServiceController};

use super::artifact::ArtifactReplacer;
use super::source::UpdateSource;
use super::state::{UpdateEntry, UpdaterConfig};

/// Default pause between ticks.
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(60);

/// Default wait between stopping a service and overwriting its files.
pub const DEFAULT_GRACE_PERIOD: Duration = Duration::from_secs(5);

/// Result of the keep-alive step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Liveness {
    AlreadyRunning,
    Started,
    Failed,
}

/// What a tick did for one entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryOutcome {
    /// New artifacts were installed and the entry now carries `version`.
    Updated { version: i64 },
    /// No update was applied; the keep-alive step ran instead.
    Ensured(Liveness),
    /// A newer version was announced but no controller could be resolved.
    Aborted,
}

enum Attempt {
    Applied(i64),
    Fallback,
    Aborted,
}

/// Periodic update-or-keep-alive driver.
pub struct ReconcileLoop<S, P> {
    source: S,
    controllers: P,
    base_dir: PathBuf,
    interval: Duration,
    grace_period: Duration,
}

impl<S: UpdateSource, P: ControllerProvider> ReconcileLoop<S, P> {
    /// `base_dir` anchors relative artifact paths.
    pub fn new(source: S, controllers: P, base_dir: PathBuf) -> Self {
        Self {
            source,
            controllers,
            base_dir,
            interval: DEFAULT_INTERVAL,
            grace_period: DEFAULT_GRACE_PERIOD,
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_grace_period(mut self, grace_period: Duration) -> Self {
        self.grace_period = grace_period;
        self
    }

    /// Tick until `shutdown` is notified.
    ///
    /// Shutdown is observed between ticks only; an entry in progress is
    /// always finished.
    pub async fn run(&self, config: &RwLock<UpdaterConfig>, shutdown: &Notify) {
        info!(
            interval_secs = self.interval.as_secs(),
            grace_secs = self.grace_period.as_secs(),
            "Reconcile loop started"
        );
        loop {
            self.tick(config).await;
            tokio::select! {
                _ = tokio::time::sleep(self.interval) => {}
                _ = shutdown.notified() => break,
            }
        }
        info!("Reconcile loop stopped");
    }

    /// Reconcile every entry once, in order.
    ///
    /// Successful updates are written back to `config` as soon as each
    /// entry finishes.
    pub async fn tick(&self, config: &RwLock<UpdaterConfig>) -> Vec<EntryOutcome> {
        let entries = config.read().await.entries.clone();
        debug!(entries = entries.len(), "Reconcile tick");

        let mut outcomes = Vec::with_capacity(entries.len());
        for (index, entry) in entries.iter().enumerate() {
            let outcome = self.reconcile_entry(entry).await;
            if let EntryOutcome::Updated { version } = outcome {
                config
                    .write()
                    .await
                    .record_version(index, &entry.name, version);
            }
            outcomes.push(outcome);
        }
        outcomes
    }

    /// Update `entry` if a newer version is announced, otherwise keep it alive.
    pub async fn reconcile_entry(&self, entry: &UpdateEntry) -> EntryOutcome {
        if !entry.has_update_url() {
            return EntryOutcome::Ensured(self.ensure_running(entry).await);
        }
        match self.try_update(entry).await {
            Attempt::Applied(version) => EntryOutcome::Updated { version },
            Attempt::Aborted => EntryOutcome::Aborted,
            Attempt::Fallback => EntryOutcome::Ensured(self.ensure_running(entry).await),
        }
    }

    async fn try_update(&self, entry: &UpdateEntry) -> Attempt {
        let manifest = match self.source.fetch_manifest(&entry.url).await {
            Ok(manifest) => manifest,
            Err(e) => {
                warn!(service = %entry.name, error = %e, "Update check failed");
                return Attempt::Fallback;
            }
        };
        if !manifest.is_newer_than(entry.version) {
            debug!(
                service = %entry.name,
                installed = entry.version,
                announced = manifest.version,
                "No update needed"
            );
            return Attempt::Fallback;
        }

        let controller = match self.controllers.controller(&entry.name, &entry.description) {
            Ok(controller) => controller,
            Err(e) => {
                error!(service = %entry.name, error = %e, "Cannot control service");
                return Attempt::Aborted;
            }
        };

        info!(
            service = %entry.name,
            from = entry.version,
            to = manifest.version,
            files = manifest.files.len(),
            "Updating service"
        );

        if let Err(e) = on_blocking(&controller, |c| c.stop()).await {
            warn!(service = %entry.name, error = %e, "Stop before update failed");
        }
        tokio::time::sleep(self.grace_period).await;

        let replacer = ArtifactReplacer::new(&self.source, &self.base_dir);
        if let Err(e) = replacer.replace_all(&manifest.files).await {
            error!(service = %entry.name, error = %e, "Update aborted");
            return Attempt::Fallback;
        }

        if let Err(e) = on_blocking(&controller, |c| c.start()).await {
            warn!(service = %entry.name, error = %e, "Start after update failed");
        }
        info!(service = %entry.name, version = manifest.version, "Service updated");
        Attempt::Applied(manifest.version)
    }

    /// Start `entry` unless its status probe reports it running.
    pub async fn ensure_running(&self, entry: &UpdateEntry) -> Liveness {
        let controller = match self.controllers.controller(&entry.name, &entry.description) {
            Ok(controller) => controller,
            Err(e) => {
                error!(service = %entry.name, error = %e, "Cannot control service");
                return Liveness::Failed;
            }
        };

        match on_blocking(&controller, |c| c.status()).await {
            Ok(status) if status.running => {
                debug!(service = %entry.name, pid = ?status.pid, "Service running");
                Liveness::AlreadyRunning
            }
            Ok(_) => match on_blocking(&controller, |c| c.start()).await {
                Ok(()) => {
                    info!(service = %entry.name, "Service started");
                    Liveness::Started
                }
                Err(e) => {
                    warn!(service = %entry.name, error = %e, "Service start failed");
                    Liveness::Failed
                }
            },
            Err(e) => {
                warn!(service = %entry.name, error = %e, "Status check failed");
                Liveness::Failed
            }
        }
    }
}

/// Run a native controller operation off the async workers.
async fn on_blocking<T, F>(controller: &Arc<dyn ServiceController>, op: F) -> Result<T, DaemonError>
where
    T: Send + 'static,
    F: FnOnce(&dyn ServiceController) -> Result<T, DaemonError> + Send + 'static,
{
    let controller = Arc::clone(controller);
    match tokio::task::spawn_blocking(move || op(controller.as_ref())).await {
        Ok(result) => result,
        Err(e) => Err(DaemonError::Command {
            kind: CommandErrorKind::ExecutionFailed {
                message: format!("controller task failed: {}", e),
            },
        }),
    }
}
