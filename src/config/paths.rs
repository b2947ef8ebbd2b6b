//! Executable-relative paths.

use std::path::{Path, PathBuf};

use crate::error::DaemonError;

/// Directory containing the running executable.
pub fn executable_dir() -> Result<PathBuf, DaemonError> {
    let exe = std::env::current_exe()?;
    let exe = std::fs::canonicalize(&exe).unwrap_or(exe);
    exe.parent()
        .map(Path::to_path_buf)
        .ok_or_else(|| DaemonError::Config {
            message: format!("Executable path '{}' has no parent directory", exe.display()),
        })
}

/// Resolve `path` against `base` unless it is already absolute.
pub fn resolve_in(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_in() {
        let base = Path::new("/opt/autokeep");
        assert_eq!(
            resolve_in(base, Path::new("update.json")),
            PathBuf::from("/opt/autokeep/update.json")
        );
        assert_eq!(
            resolve_in(base, Path::new("/var/lib/update.json")),
            PathBuf::from("/var/lib/update.json")
        );
    }

    #[test]
    fn test_executable_dir_exists() {
        assert!(executable_dir().unwrap().is_dir());
    }
}
