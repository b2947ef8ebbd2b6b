//! Update manifest format.
//!
//! ```json
//! {"ver": 20210102, "files": [{"url": "https://host/daemon", "file": "daemon"}]}
//! ```

use serde::{Deserialize, Serialize};

use crate::error::{DaemonError, UpdateErrorKind};

/// One file to download and where to put it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestFile {
    /// Download location.
    #[serde(default)]
    pub url: String,
    /// Target path; relative paths are resolved against the supervisor's
    /// executable directory.
    #[serde(default)]
    pub file: String,
}

/// Document served at an entry's update URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateManifest {
    #[serde(rename = "ver", default)]
    pub version: i64,
    #[serde(default)]
    pub files: Vec<ManifestFile>,
}

impl UpdateManifest {
    /// Parse a manifest body fetched from `url`.
    pub fn parse(url: &str, body: &[u8]) -> Result<Self, DaemonError> {
        serde_json::from_slice(body).map_err(|e| {
            DaemonError::update(UpdateErrorKind::ManifestParse {
                url: url.to_string(),
                message: e.to_string(),
            })
        })
    }

    /// Whether this manifest announces something newer than `installed`.
    pub fn is_newer_than(&self, installed: i64) -> bool {
        self.version > installed
    }
}
