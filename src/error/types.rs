//! Error types for the autokeep daemon.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for the daemon.
#[derive(Error, Debug)]
pub enum DaemonError {
    /// Configuration-related errors.
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Service controller errors (privileges, state preconditions, kind).
    #[error("Service error: {kind}")]
    Service { kind: ServiceErrorKind },

    /// Update source and artifact replacement errors.
    #[error("Update error: {kind}")]
    Update { kind: UpdateErrorKind },

    /// Command line misuse.
    #[error("Usage error: {kind}")]
    Cli { kind: CliErrorKind },

    /// Native command execution errors.
    #[error("Command error: {kind}")]
    Command { kind: CommandErrorKind },

    /// Template-related errors.
    #[error("Template error: {message}")]
    Template { message: String },

    /// I/O errors.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Service controller error kinds.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ServiceErrorKind {
    #[error("You must have root user privileges. Possibly using 'sudo' command should help")]
    Privilege,

    #[error("Service has already been installed")]
    AlreadyInstalled,

    #[error("Service is not installed")]
    NotInstalled,

    #[error("Service is already running")]
    AlreadyRunning,

    #[error("Service has already been stopped")]
    AlreadyStopped,

    #[error("Invalid daemon kind '{kind}' for {os}")]
    InvalidKind { kind: String, os: String },

    #[error("No service backend is available for {os}")]
    UnsupportedPlatform { os: String },
}

/// Update error kinds.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UpdateErrorKind {
    #[error("Failed to fetch '{url}': {message}")]
    ManifestFetch { url: String, message: String },

    #[error("Malformed manifest from '{url}': {message}")]
    ManifestParse { url: String, message: String },

    #[error("Failed to replace '{path}': {message}")]
    ArtifactWrite { path: PathBuf, message: String },
}

/// Command line error kinds.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CliErrorKind {
    #[error("No command specified")]
    NoCommand,

    #[error("Unknown command: {name}")]
    UnknownCommand { name: String },
}

/// Command error kinds.
#[derive(Error, Debug)]
pub enum CommandErrorKind {
    #[error("Command execution failed: {message}")]
    ExecutionFailed { message: String },
}

impl DaemonError {
    /// Shorthand for a service precondition or privilege error.
    pub fn service(kind: ServiceErrorKind) -> Self {
        Self::Service { kind }
    }

    /// Shorthand for an update error.
    pub fn update(kind: UpdateErrorKind) -> Self {
        Self::Update { kind }
    }

    /// Returns the service error kind, if this is one.
    pub fn service_kind(&self) -> Option<&ServiceErrorKind> {
        match self {
            Self::Service { kind } => Some(kind),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_service_kind_accessor() {
        let err = DaemonError::service(ServiceErrorKind::NotInstalled);
        assert_eq!(err.service_kind(), Some(&ServiceErrorKind::NotInstalled));

        let err = DaemonError::Config {
            message: "bad".to_string(),
        };
        assert!(err.service_kind().is_none());
    }

    #[test]
    fn test_fetch_and_parse_errors_are_distinct() {
        let fetch = UpdateErrorKind::ManifestFetch {
            url: "https://x/update.json".to_string(),
            message: "connection refused".to_string(),
        };
        let parse = UpdateErrorKind::ManifestParse {
            url: "https://x/update.json".to_string(),
            message: "expected value".to_string(),
        };
        assert_ne!(fetch, parse);
        assert!(fetch.to_string().starts_with("Failed to fetch"));
        assert!(parse.to_string().starts_with("Malformed manifest"));
    }
}
