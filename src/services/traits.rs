//! Service controller traits.
//!
//! Defines the capability set every init-system backend implements.

use std::fmt;
use std::path::PathBuf;

use crate::error::DaemonError;

use super::descriptor::ServiceDescriptor;

/// Status line for a service with no definition file.
pub const STATUS_NOT_INSTALLED: &str = "Service not installed";

/// Status reported by a backend's native status probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServiceStatus {
    /// Whether the native service manager reports the service as running.
    pub running: bool,
    /// Main process id, when the probe output includes one.
    pub pid: Option<u32>,
}

impl ServiceStatus {
    pub const STOPPED: ServiceStatus = ServiceStatus {
        running: false,
        pid: None,
    };

    pub fn running(pid: Option<u32>) -> Self {
        Self { running: true, pid }
    }
}

impl fmt::Display for ServiceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.running, self.pid) {
            (true, Some(pid)) => write!(f, "Service (pid  {}) is running...", pid),
            (true, None) => f.write_str("Service is running..."),
            (false, _) => f.write_str("Service is stopped"),
        }
    }
}

/// A program that can be hosted as a service.
///
/// `run` is what executes when the OS actually launches the binary.
pub trait Executable {
    /// Non-blocking stop request.
    fn stop(&mut self) {}

    /// Blocking run until the program finishes.
    fn run(&mut self) -> Result<(), DaemonError>;
}

/// Controls one service through the host's native service manager.
///
/// Every operation first checks privileges (user agents need none), then
/// the installed/running preconditions, and only then touches the system.
/// Errors are returned as-is; nothing is retried internally.
pub trait ServiceController: Send + Sync {
    /// Identity of the controlled service.
    fn descriptor(&self) -> &ServiceDescriptor;

    /// Canonical location of the service definition file.
    fn definition_path(&self) -> PathBuf;

    /// Current definition-file template.
    fn template(&self) -> &str;

    /// Replace the definition-file template for this controller.
    fn set_template(&mut self, source: &str) -> Result<(), DaemonError>;

    /// Write the service definition and register it with the service manager.
    fn install(&self, args: &[String]) -> Result<(), DaemonError>;

    /// Unregister the service and delete its definition.
    fn remove(&self) -> Result<(), DaemonError>;

    /// Start the service.
    fn start(&self) -> Result<(), DaemonError>;

    /// Stop the service.
    fn stop(&self) -> Result<(), DaemonError>;

    /// Probe the native status command.
    fn status(&self) -> Result<ServiceStatus, DaemonError>;

    /// Hand control to `executable` inside the launched process.
    fn run(&self, executable: &mut dyn Executable) -> Result<(), DaemonError> {
        executable.run()
    }
}
