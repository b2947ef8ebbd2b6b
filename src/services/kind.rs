//! Deployment kinds and host operating systems.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{DaemonError, ServiceErrorKind};

/// Deployment scope of a managed service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Kind {
    /// Runs as the logged-in user; property list in the user's own
    /// `~/Library/LaunchAgents`. macOS only.
    UserAgent,
    /// Runs as the logged-in user; property list in `/Library/LaunchAgents`.
    /// macOS only.
    GlobalAgent,
    /// Runs as root; property list in `/Library/LaunchDaemons`. macOS only.
    GlobalDaemon,
    /// System-wide daemon running as root. Linux, FreeBSD and Windows.
    SystemDaemon,
}

impl Kind {
    pub const ALL: [Kind; 4] = [
        Kind::UserAgent,
        Kind::GlobalAgent,
        Kind::GlobalDaemon,
        Kind::SystemDaemon,
    ];

    /// The kind a service gets when nothing else is configured.
    pub fn default_for(os: &HostOs) -> Self {
        match os {
            HostOs::Darwin => Kind::UserAgent,
            _ => Kind::SystemDaemon,
        }
    }

    /// Whether this kind may be used on `os`.
    ///
    /// macOS forbids [`Kind::SystemDaemon`]; every other OS requires it.
    pub fn is_valid_for(self, os: &HostOs) -> bool {
        match os {
            HostOs::Darwin => self != Kind::SystemDaemon,
            _ => self == Kind::SystemDaemon,
        }
    }

    /// Fail with `InvalidKind` when this kind does not fit `os`.
    pub fn validate_for(self, os: &HostOs) -> Result<(), DaemonError> {
        if self.is_valid_for(os) {
            Ok(())
        } else {
            Err(DaemonError::service(ServiceErrorKind::InvalidKind {
                kind: self.to_string(),
                os: os.to_string(),
            }))
        }
    }

    /// User agents are managed without elevated privileges.
    pub fn requires_privileges(self) -> bool {
        self != Kind::UserAgent
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Kind::UserAgent => "UserAgent",
            Kind::GlobalAgent => "GlobalAgent",
            Kind::GlobalDaemon => "GlobalDaemon",
            Kind::SystemDaemon => "SystemDaemon",
        };
        f.write_str(name)
    }
}

/// Operating system the daemon runs on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostOs {
    Darwin,
    Linux,
    FreeBsd,
    Windows,
    Other(String),
}

impl HostOs {
    /// The OS this binary was built for.
    pub fn current() -> Self {
        Self::from_name(std::env::consts::OS)
    }

    /// Map a `std::env::consts::OS` style name.
    pub fn from_name(name: &str) -> Self {
        match name {
            "macos" | "darwin" => HostOs::Darwin,
            "linux" => HostOs::Linux,
            "freebsd" => HostOs::FreeBsd,
            "windows" => HostOs::Windows,
            other => HostOs::Other(other.to_string()),
        }
    }
}

impl fmt::Display for HostOs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HostOs::Darwin => f.write_str("darwin"),
            HostOs::Linux => f.write_str("linux"),
            HostOs::FreeBsd => f.write_str("freebsd"),
            HostOs::Windows => f.write_str("windows"),
            HostOs::Other(name) => f.write_str(name),
        }
    }
}
