//! Artifact replacement.
//!
//! Downloads every file a manifest lists and writes it over its target in
//! order. Download and filesystem failures are both reported as
//! `ArtifactWrite` for the target being replaced. Replacement stops at the first failure; files already written stay
//! in place and the entry's version is left untouched, so the next tick
//! retries the whole set.

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::error::{DaemonError, UpdateErrorKind};

use super::manifest::ManifestFile;
use super::source::UpdateSource;

/// Mode given to every replaced artifact.
pub const ARTIFACT_MODE: u32 = 0o755;

/// Resolve a manifest target path against `base_dir`.
pub fn resolve_target(base_dir: &Path, file: &str) -> Result<PathBuf, DaemonError> {
    if file.is_empty() {
        return Err(write_error(PathBuf::new(), "empty target path"));
    }
    let target = Path::new(file);
    if target.is_absolute() {
        Ok(target.to_path_buf())
    } else {
        Ok(base_dir.join(target))
    }
}

/// Writes downloaded artifacts under a base directory.
pub struct ArtifactReplacer<'a, S> {
    source: &'a S,
    base_dir: &'a Path,
}

impl<'a, S: UpdateSource> ArtifactReplacer<'a, S> {
    pub fn new(source: &'a S, base_dir: &'a Path) -> Self {
        Self { source, base_dir }
    }

    /// Download and write each file in order.
    ///
    /// Returns the number of files written.
    pub async fn replace_all(&self, files: &[ManifestFile]) -> Result<usize, DaemonError> {
        for (written, file) in files.iter().enumerate() {
            let target = resolve_target(self.base_dir, &file.file)?;
            let bytes = self
                .source
                .download(&file.url)
                .await
                .map_err(|e| write_error(target.clone(), format!("download failed: {}", e)))?;
            write_artifact(&target, &bytes).await?;
            debug!(
                url = %file.url,
                target = %target.display(),
                bytes = bytes.len(),
                done = written + 1,
                "Artifact replaced"
            );
        }
        info!(files = files.len(), "Artifacts replaced");
        Ok(files.len())
    }
}

async fn write_artifact(target: &Path, bytes: &[u8]) -> Result<(), DaemonError> {
    if let Some(parent) = target.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| write_error(target.to_path_buf(), e))?;
    }
    tokio::fs::write(target, bytes)
        .await
        .map_err(|e| write_error(target.to_path_buf(), e))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        tokio::fs::set_permissions(target, std::fs::Permissions::from_mode(ARTIFACT_MODE))
            .await
            .map_err(|e| write_error(target.to_path_buf(), e))?;
    }
    Ok(())
}

fn write_error(path: PathBuf, error: impl std::fmt::Display) -> DaemonError {
    DaemonError::update(UpdateErrorKind::ArtifactWrite {
        path,
        message: error.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::update::manifest::UpdateManifest;
    use std::collections::HashMap;

    struct StaticSource {
        bodies: HashMap<String, Vec<u8>>,
    }

    impl StaticSource {
        fn new(bodies: &[(&str, &[u8])]) -> Self {
            Self {
                bodies: bodies
                    .iter()
                    .map(|(url, body)| (url.to_string(), body.to_vec()))
                    .collect(),
            }
        }
    }

    impl UpdateSource for StaticSource {
        async fn fetch_manifest(&self, url: &str) -> Result<UpdateManifest, DaemonError> {
            Err(DaemonError::update(UpdateErrorKind::ManifestFetch {
                url: url.to_string(),
                message: "not served".to_string(),
            }))
        }

        async fn download(&self, url: &str) -> Result<Vec<u8>, DaemonError> {
            self.bodies.get(url).cloned().ok_or_else(|| {
                DaemonError::update(UpdateErrorKind::ManifestFetch {
                    url: url.to_string(),
                    message: "404".to_string(),
                })
            })
        }
    }

    fn file(url: &str, target: &str) -> ManifestFile {
        ManifestFile {
            url: url.to_string(),
            file: target.to_string(),
        }
    }

    #[test]
    fn test_resolve_target() {
        let base = Path::new("/opt/autokeep");
        assert_eq!(
            resolve_target(base, "daemon").unwrap(),
            PathBuf::from("/opt/autokeep/daemon")
        );
        assert_eq!(
            resolve_target(base, "lib/libx.so").unwrap(),
            PathBuf::from("/opt/autokeep/lib/libx.so")
        );
        assert_eq!(
            resolve_target(base, "/usr/local/bin/daemon").unwrap(),
            PathBuf::from("/usr/local/bin/daemon")
        );
        assert!(resolve_target(base, "").is_err());
    }

    #[tokio::test]
    async fn test_replace_all_writes_targets() {
        let dir = tempfile::tempdir().unwrap();
        let absolute = dir.path().join("abs").join("tool");
        let source = StaticSource::new(&[("u1", b"one"), ("u2", b"two")]);
        let files = vec![
            file("u1", "nested/dir/daemon"),
            file("u2", absolute.to_str().unwrap()),
        ];

        let written = ArtifactReplacer::new(&source, dir.path())
            .replace_all(&files)
            .await
            .unwrap();

        assert_eq!(written, 2);
        assert_eq!(
            std::fs::read(dir.path().join("nested/dir/daemon")).unwrap(),
            b"one"
        );
        assert_eq!(std::fs::read(&absolute).unwrap(), b"two");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_replaced_files_are_executable() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("daemon");
        std::fs::write(&target, b"old").unwrap();
        std::fs::set_permissions(&target, std::fs::Permissions::from_mode(0o600)).unwrap();

        let source = StaticSource::new(&[("u1", b"new")]);
        ArtifactReplacer::new(&source, dir.path())
            .replace_all(&[file("u1", "daemon")])
            .await
            .unwrap();

        let mode = std::fs::metadata(&target).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, ARTIFACT_MODE);
        assert_eq!(std::fs::read(&target).unwrap(), b"new");
    }

    #[tokio::test]
    async fn test_stops_at_first_failure_without_rollback() {
        let dir = tempfile::tempdir().unwrap();
        let source = StaticSource::new(&[("u1", b"one"), ("u3", b"three")]);
        let files = vec![file("u1", "a"), file("missing", "b"), file("u3", "c")];

        let result = ArtifactReplacer::new(&source, dir.path())
            .replace_all(&files)
            .await;

        assert!(result.is_err());
        assert_eq!(std::fs::read(dir.path().join("a")).unwrap(), b"one");
        assert!(!dir.path().join("b").exists());
        assert!(!dir.path().join("c").exists());
    }

    #[tokio::test]
    async fn test_unwritable_target_is_artifact_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("blocker"), b"file").unwrap();
        let source = StaticSource::new(&[("u1", b"one")]);

        let err = ArtifactReplacer::new(&source, dir.path())
            .replace_all(&[file("u1", "blocker/daemon")])
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            DaemonError::Update {
                kind: UpdateErrorKind::ArtifactWrite { .. }
            }
        ));
    }

    #[tokio::test]
    async fn test_failed_download_is_artifact_error() {
        let dir = tempfile::tempdir().unwrap();
        let source = StaticSource::new(&[]);

        let err = ArtifactReplacer::new(&source, dir.path())
            .replace_all(&[file("u", "bin")])
            .await
            .unwrap_err();

        match err {
            DaemonError::Update {
                kind: UpdateErrorKind::ArtifactWrite { path, message },
            } => {
                assert_eq!(path, dir.path().join("bin"));
                assert!(message.contains("download failed"));
                assert!(message.contains("404"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert!(!dir.path().join("bin").exists());
    }
}
