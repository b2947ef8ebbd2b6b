//! Configuration settings for the autokeep daemon.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::debug;

use crate::error::DaemonError;
use crate::services::{HostOs, Kind};

use super::paths::{executable_dir, resolve_in};

/// Settings file looked up next to the executable when no path is given.
pub const DEFAULT_SETTINGS_FILE: &str = "autokeepd.toml";

/// Main configuration structure for the daemon.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub service: ServiceConfig,
    #[serde(default)]
    pub updater: UpdaterSettings,
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Identity of the supervisor's own OS service.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
    /// Service name registered with the native service manager.
    #[serde(default = "default_service_name")]
    pub name: String,
    /// Service description.
    #[serde(default = "default_service_description")]
    pub description: String,
    /// Services this one depends on.
    #[serde(default)]
    pub dependencies: Vec<String>,
}

/// Reconcile loop configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct UpdaterSettings {
    /// State file holding the managed entries (relative to the executable).
    #[serde(default = "default_state_file")]
    pub state_file: PathBuf,
    /// Seconds between reconcile ticks.
    #[serde(default = "default_interval")]
    pub interval_seconds: u64,
    /// Seconds to wait after stopping a service before replacing its files.
    #[serde(default = "default_grace_period")]
    pub grace_period_seconds: u64,
    /// Kind used for managed services; the host default when unset.
    #[serde(default)]
    pub managed_kind: Option<Kind>,
}

/// Update transport configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    /// TCP/TLS connect timeout in seconds.
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_seconds: u64,
    /// Time allowed between sending a request and receiving its headers.
    #[serde(default = "default_header_timeout")]
    pub response_header_timeout_seconds: u64,
    /// Overall request timeout in seconds.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_seconds: u64,
    /// PEM bundle replacing the built-in pinned certificate authority.
    pub ca_cert_path: Option<PathBuf>,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Log format ("pretty" or "json").
    #[serde(default = "default_log_format")]
    pub format: String,
    /// Log file; `<service name>.log` next to the executable when unset.
    pub file: Option<PathBuf>,
}

fn default_service_name() -> String {
    "updater".to_string()
}

fn default_service_description() -> String {
    "auto keep&update daemon service".to_string()
}

fn default_state_file() -> PathBuf {
    PathBuf::from("update.json")
}

fn default_interval() -> u64 {
    60
}

fn default_grace_period() -> u64 {
    5
}

fn default_connect_timeout() -> u64 {
    20
}

fn default_header_timeout() -> u64 {
    20
}

fn default_request_timeout() -> u64 {
    120
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: default_service_name(),
            description: default_service_description(),
            dependencies: Vec::new(),
        }
    }
}

impl Default for UpdaterSettings {
    fn default() -> Self {
        Self {
            state_file: default_state_file(),
            interval_seconds: default_interval(),
            grace_period_seconds: default_grace_period(),
            managed_kind: None,
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            connect_timeout_seconds: default_connect_timeout(),
            response_header_timeout_seconds: default_header_timeout(),
            request_timeout_seconds: default_request_timeout(),
            ca_cert_path: None,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            file: None,
        }
    }
}

impl UpdaterSettings {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_seconds)
    }

    pub fn grace_period(&self) -> Duration {
        Duration::from_secs(self.grace_period_seconds)
    }

    /// Kind for managed services on `os`.
    pub fn managed_kind_for(&self, os: &HostOs) -> Kind {
        self.managed_kind.unwrap_or_else(|| Kind::default_for(os))
    }
}

impl HttpConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_seconds)
    }

    pub fn response_header_timeout(&self) -> Duration {
        Duration::from_secs(self.response_header_timeout_seconds)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }
}

impl Settings {
    /// Load settings from a TOML configuration file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, DaemonError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| DaemonError::Config {
            message: format!("Failed to read config file '{}': {}", path.display(), e),
        })?;

        let settings = Self::from_toml(&content).map_err(|e| DaemonError::Config {
            message: format!("Failed to parse config file '{}': {}", path.display(), e),
        })?;

        debug!(path = %path.display(), "Settings loaded");
        Ok(settings)
    }

    /// Parse and validate settings from TOML text.
    pub fn from_toml(content: &str) -> Result<Self, DaemonError> {
        let settings: Settings = toml::from_str(content).map_err(|e| DaemonError::Config {
            message: e.to_string(),
        })?;
        settings.validate()?;
        Ok(settings)
    }

    /// Load `explicit` if given, else the default file next to the
    /// executable if it exists, else built-in defaults.
    pub fn load_or_default(explicit: Option<&Path>) -> Result<Self, DaemonError> {
        if let Some(path) = explicit {
            return Self::load(path);
        }
        let candidate = executable_dir()?.join(DEFAULT_SETTINGS_FILE);
        if candidate.is_file() {
            Self::load(candidate)
        } else {
            Ok(Self::default())
        }
    }

    /// Absolute path of the UpdaterConfig state file.
    pub fn state_path(&self) -> Result<PathBuf, DaemonError> {
        Ok(resolve_in(&executable_dir()?, &self.updater.state_file))
    }

    /// Absolute path of the daemon log file.
    pub fn log_path(&self) -> Result<PathBuf, DaemonError> {
        let file = self
            .logging
            .file
            .clone()
            .unwrap_or_else(|| PathBuf::from(format!("{}.log", self.service.name)));
        Ok(resolve_in(&executable_dir()?, &file))
    }

    /// Validate the settings.
    fn validate(&self) -> Result<(), DaemonError> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.to_lowercase().as_str()) {
            return Err(DaemonError::Config {
                message: format!(
                    "Invalid log level '{}'. Valid levels: {:?}",
                    self.logging.level, valid_levels
                ),
            });
        }

        let valid_formats = ["pretty", "json"];
        if !valid_formats.contains(&self.logging.format.to_lowercase().as_str()) {
            return Err(DaemonError::Config {
                message: format!(
                    "Invalid log format '{}'. Valid formats: {:?}",
                    self.logging.format, valid_formats
                ),
            });
        }

        if self.service.name.split_whitespace().next().is_none() {
            return Err(DaemonError::Config {
                message: "Service name cannot be empty".to_string(),
            });
        }

        if self.updater.interval_seconds == 0 {
            return Err(DaemonError::Config {
                message: "updater.interval_seconds must be greater than zero".to_string(),
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_values() {
        let settings = Settings::from_toml("").unwrap();
        assert_eq!(settings.service.name, "updater");
        assert_eq!(settings.service.description, "auto keep&update daemon service");
        assert_eq!(settings.updater.interval(), Duration::from_secs(60));
        assert_eq!(settings.updater.grace_period(), Duration::from_secs(5));
        assert_eq!(settings.http.connect_timeout(), Duration::from_secs(20));
        assert_eq!(settings.http.response_header_timeout(), Duration::from_secs(20));
        assert_eq!(settings.http.request_timeout(), Duration::from_secs(120));
        assert_eq!(settings.logging.level, "info");
        assert_eq!(settings.logging.format, "pretty");
    }

    #[test]
    fn test_parse_sections() {
        let settings = Settings::from_toml(
            r#"
            [service]
            name = "keeper"
            dependencies = ["network.target"]

            [updater]
            state_file = "/var/lib/keeper/update.json"
            interval_seconds = 30
            managed_kind = "global-daemon"

            [http]
            ca_cert_path = "/etc/keeper/ca.pem"

            [logging]
            level = "debug"
            format = "json"
            "#,
        )
        .unwrap();

        assert_eq!(settings.service.name, "keeper");
        assert_eq!(settings.service.dependencies, vec!["network.target"]);
        assert_eq!(settings.updater.interval_seconds, 30);
        assert_eq!(
            settings.updater.managed_kind_for(&HostOs::Linux),
            Kind::GlobalDaemon
        );
        assert_eq!(
            settings.http.ca_cert_path,
            Some(PathBuf::from("/etc/keeper/ca.pem"))
        );
        assert_eq!(
            settings.state_path().unwrap(),
            PathBuf::from("/var/lib/keeper/update.json")
        );
    }

    #[test]
    fn test_managed_kind_defaults_to_host() {
        let settings = Settings::default();
        assert_eq!(settings.updater.managed_kind_for(&HostOs::Darwin), Kind::UserAgent);
        assert_eq!(settings.updater.managed_kind_for(&HostOs::Linux), Kind::SystemDaemon);
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(Settings::from_toml("[logging]\nlevel = \"loud\"\n").is_err());
        assert!(Settings::from_toml("[logging]\nformat = \"xml\"\n").is_err());
        assert!(Settings::from_toml("[service]\nname = \"  \"\n").is_err());
        assert!(Settings::from_toml("[updater]\ninterval_seconds = 0\n").is_err());
        assert!(Settings::from_toml("[updater]\nmanaged_kind = \"robot\"\n").is_err());
    }

    #[test]
    fn test_load_missing_file() {
        let err = Settings::load("/nonexistent/autokeepd.toml").unwrap_err();
        assert!(matches!(err, DaemonError::Config { .. }));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("autokeepd.toml");
        std::fs::write(&path, "[updater]\ngrace_period_seconds = 1\n").unwrap();
        let settings = Settings::load_or_default(Some(&path)).unwrap();
        assert_eq!(settings.updater.grace_period(), Duration::from_secs(1));
    }
}
