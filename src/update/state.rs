//! Persisted list of managed services.
//!
//! Stored as JSON next to the executable:
//! `{"daemons":[{"name":"...","desc":"...","url":"...","ver":20210101}]}`.

use serde::{Deserialize, Serialize};
use std::path::Path;

use tracing::debug;

use crate::error::DaemonError;

/// One managed service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateEntry {
    #[serde(default)]
    pub name: String,
    #[serde(rename = "desc", default)]
    pub description: String,
    /// Manifest URL; empty means keep-alive only.
    #[serde(default)]
    pub url: String,
    /// Installed version.
    #[serde(rename = "ver", default)]
    pub version: i64,
}

impl UpdateEntry {
    pub fn new(name: &str, description: &str, url: &str, version: i64) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            url: url.to_string(),
            version,
        }
    }

    /// Whether this entry is checked for updates.
    pub fn has_update_url(&self) -> bool {
        !self.url.is_empty()
    }
}

/// Ordered set of managed services.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdaterConfig {
    #[serde(rename = "daemons", default)]
    pub entries: Vec<UpdateEntry>,
}

impl UpdaterConfig {
    /// Config seeded on first start, meant to be edited by the operator.
    pub fn bootstrap() -> Self {
        Self {
            entries: vec![UpdateEntry::new(
                "daemon",
                "daemon desc",
                "http://update.com/update.json",
                20210101,
            )],
        }
    }

    pub fn load(path: &Path) -> Result<Self, DaemonError> {
        let data = std::fs::read(path)?;
        let config: Self = serde_json::from_slice(&data)?;
        debug!(path = %path.display(), entries = config.entries.len(), "Updater config loaded");
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<(), DaemonError> {
        let data = serde_json::to_vec(self)?;
        std::fs::write(path, data)?;
        debug!(path = %path.display(), entries = self.entries.len(), "Updater config saved");
        Ok(())
    }

    /// Record a newly installed version for the entry at `index`.
    ///
    /// Versions only move forward; the entry must still carry `name`.
    pub fn record_version(&mut self, index: usize, name: &str, version: i64) -> bool {
        match self.entries.get_mut(index) {
            Some(entry) if entry.name == name && version > entry.version => {
                entry.version = version;
                true
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_format() {
        let json = serde_json::to_string(&UpdaterConfig::bootstrap()).unwrap();
        assert_eq!(
            json,
            r#"{"daemons":[{"name":"daemon","desc":"daemon desc","url":"http://update.com/update.json","ver":20210101}]}"#
        );
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("update.json");
        let config = UpdaterConfig {
            entries: vec![
                UpdateEntry::new("web", "web server", "https://u/web.json", 3),
                UpdateEntry::new("worker", "", "", 0),
            ],
        };
        config.save(&path).unwrap();
        assert_eq!(UpdaterConfig::load(&path).unwrap(), config);
    }

    #[test]
    fn test_load_failures() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("update.json");
        assert!(matches!(UpdaterConfig::load(&path), Err(DaemonError::Io(_))));

        std::fs::write(&path, "not json").unwrap();
        assert!(matches!(
            UpdaterConfig::load(&path),
            Err(DaemonError::Serialization(_))
        ));
    }

    #[test]
    fn test_keep_alive_entry() {
        let entry: UpdateEntry = serde_json::from_str(r#"{"name":"svc"}"#).unwrap();
        assert!(!entry.has_update_url());
        assert_eq!(entry.version, 0);
    }

    #[test]
    fn test_record_version_is_monotonic() {
        let mut config = UpdaterConfig::bootstrap();
        assert!(!config.record_version(0, "daemon", 20200101));
        assert!(!config.record_version(0, "other", 20220101));
        assert!(!config.record_version(3, "daemon", 20220101));
        assert!(config.record_version(0, "daemon", 20220101));
        assert_eq!(config.entries[0].version, 20220101);
    }
}
