//! Service controller module.
//!
//! Abstracts installing, starting, stopping and probing a background service
//! across launchd (macOS), systemd and upstart (Linux).
//!
//! ## Adding a New Backend
//!
//! 1. Create a new file in this directory (e.g., `openrc.rs`)
//! 2. Implement the `ServiceController` trait
//! 3. Select it in `ControllerFactory::create`

mod darwin;
mod descriptor;
mod environment;
mod factory;
mod kind;
mod probe;
mod systemd;
mod traits;
mod upstart;

pub use darwin::LaunchdService;
pub use descriptor::{normalize_name, ServiceDescriptor};
pub use environment::{NativeRunner, Privileges, ServiceEnvironment, SystemRunner};
pub use factory::{
    new_controller, ControllerFactory, ControllerProvider, InitSystem, ManagedControllers,
};
pub use kind::{HostOs, Kind};
pub use probe::{parse_launchctl, parse_systemctl, parse_upstart};
pub use systemd::SystemdService;
pub use traits::{Executable, ServiceController, ServiceStatus, STATUS_NOT_INSTALLED};
pub use upstart::UpstartService;
