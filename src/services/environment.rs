//! Host environment the backends operate in.
//!
//! Bundles the filesystem root for definition files, the privilege check,
//! the executable being installed, and the runner for native commands, so
//! a backend can be pointed at a scratch directory and a scripted runner.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use nix::unistd::{geteuid, getuid, User};
use tracing::debug;

use crate::error::{DaemonError, ServiceErrorKind};
use crate::executor::{probe_native, run_native};

/// Runs native service-manager commands.
pub trait NativeRunner: Send + Sync {
    /// Run a mutating command; a non-zero exit is an error.
    fn run(&self, program: &str, args: &[&str]) -> Result<String, DaemonError>;

    /// Run a status command; `None` when it failed or could not start.
    fn probe(&self, program: &str, args: &[&str]) -> Option<String>;
}

/// Runs commands as real subprocesses.
pub struct SystemRunner;

impl NativeRunner for SystemRunner {
    fn run(&self, program: &str, args: &[&str]) -> Result<String, DaemonError> {
        run_native(program, args)
    }

    fn probe(&self, program: &str, args: &[&str]) -> Option<String> {
        probe_native(program, args)
    }
}

/// How elevated privileges are determined.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Privileges {
    /// Effective UID 0.
    Detect,
    /// Fixed answer.
    Assume(bool),
}

impl Privileges {
    pub fn is_elevated(self) -> bool {
        match self {
            Privileges::Detect => geteuid().is_root(),
            Privileges::Assume(value) => value,
        }
    }
}

/// Environment shared by all backends built by one factory.
#[derive(Clone)]
pub struct ServiceEnvironment {
    root: PathBuf,
    home: Option<PathBuf>,
    executable: Option<PathBuf>,
    privileges: Privileges,
    runner: Arc<dyn NativeRunner>,
}

impl fmt::Debug for ServiceEnvironment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceEnvironment")
            .field("root", &self.root)
            .field("home", &self.home)
            .field("executable", &self.executable)
            .field("privileges", &self.privileges)
            .finish_non_exhaustive()
    }
}

impl ServiceEnvironment {
    /// The real host: `/`, the current user's home, subprocess runner.
    pub fn system() -> Self {
        Self {
            root: PathBuf::from("/"),
            home: current_home(),
            executable: None,
            privileges: Privileges::Detect,
            runner: Arc::new(SystemRunner),
        }
    }

    /// A host rooted at `root`, with `root/home` as the user's home.
    pub fn rooted(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
            home: Some(root.join("home")),
            executable: None,
            privileges: Privileges::Detect,
            runner: Arc::new(SystemRunner),
        }
    }

    pub fn with_privileges(mut self, privileges: Privileges) -> Self {
        self.privileges = privileges;
        self
    }

    pub fn with_runner(mut self, runner: Arc<dyn NativeRunner>) -> Self {
        self.runner = runner;
        self
    }

    /// Install this path instead of the running executable.
    pub fn with_executable(mut self, path: PathBuf) -> Self {
        self.executable = Some(path);
        self
    }

    /// Resolve an absolute system path (e.g. `/etc/init`) under the root.
    pub fn system_path(&self, absolute: &str) -> PathBuf {
        self.root.join(absolute.trim_start_matches('/'))
    }

    /// Resolve a path relative to the user's home directory.
    pub fn home_path(&self, relative: &str) -> PathBuf {
        match &self.home {
            Some(home) => home.join(relative),
            None => self.system_path("/var/root").join(relative),
        }
    }

    pub fn runner(&self) -> &dyn NativeRunner {
        self.runner.as_ref()
    }

    /// Fail with `Privilege` unless elevated, when `required`.
    pub fn require_privileges(&self, required: bool) -> Result<(), DaemonError> {
        if required && !self.privileges.is_elevated() {
            return Err(DaemonError::service(ServiceErrorKind::Privilege));
        }
        Ok(())
    }

    /// Absolute path of the binary to register.
    pub fn executable_path(&self) -> Result<PathBuf, DaemonError> {
        if let Some(path) = &self.executable {
            return Ok(path.clone());
        }
        let exe = std::env::current_exe()?;
        Ok(fs::canonicalize(&exe).unwrap_or(exe))
    }
}

fn current_home() -> Option<PathBuf> {
    match User::from_uid(getuid()) {
        Ok(Some(user)) => Some(user.dir),
        Ok(None) => std::env::var_os("HOME").map(PathBuf::from),
        Err(e) => {
            debug!(error = %e, "Failed to look up current user");
            std::env::var_os("HOME").map(PathBuf::from)
        }
    }
}

/// Whether a service definition exists at `path`.
pub(crate) fn is_installed(path: &Path) -> bool {
    path.exists()
}

/// Fail with `NotInstalled` when the definition file is absent.
pub(crate) fn require_installed(path: &Path) -> Result<(), DaemonError> {
    if is_installed(path) {
        Ok(())
    } else {
        Err(DaemonError::service(ServiceErrorKind::NotInstalled))
    }
}

/// Write a rendered definition file, creating its directory.
pub(crate) fn write_definition(
    path: &Path,
    content: &str,
    mode: Option<u32>,
) -> Result<(), DaemonError> {
    if let Some(parent) = path.parent() {
        if !parent.exists() {
            fs::create_dir_all(parent)?;
        }
    }
    fs::write(path, content)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        if let Some(mode) = mode {
            fs::set_permissions(path, fs::Permissions::from_mode(mode))?;
        }
    }
    #[cfg(not(unix))]
    let _ = mode;

    debug!(path = %path.display(), bytes = content.len(), "Service definition written");
    Ok(())
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_path_is_rooted() {
        let env = ServiceEnvironment::rooted(Path::new("/tmp/root"));
        assert_eq!(
            env.system_path("/etc/systemd/system"),
            PathBuf::from("/tmp/root/etc/systemd/system")
        );
        assert_eq!(
            env.home_path("Library/LaunchAgents"),
            PathBuf::from("/tmp/root/home/Library/LaunchAgents")
        );
    }

    #[test]
    fn test_require_privileges() {
        let env = ServiceEnvironment::rooted(Path::new("/tmp/root"))
            .with_privileges(Privileges::Assume(false));
        assert!(env.require_privileges(false).is_ok());
        assert!(matches!(
            env.require_privileges(true).unwrap_err().service_kind(),
            Some(ServiceErrorKind::Privilege)
        ));
    }

    #[test]
    fn test_write_definition_sets_mode() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("etc/init/svc.conf");
        write_definition(&path, "exec /bin/true\n", Some(0o755)).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "exec /bin/true\n");

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = fs::metadata(&path).unwrap().permissions().mode();
            assert_eq!(mode & 0o777, 0o755);
        }
    }
}
