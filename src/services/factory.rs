//! Controller factory.
//!
//! The only place the host OS is consulted. Everything downstream works
//! against `dyn ServiceController`.

use std::sync::Arc;

use tracing::debug;

use crate::error::{DaemonError, ServiceErrorKind};

use super::darwin::LaunchdService;
use super::descriptor::ServiceDescriptor;
use super::environment::ServiceEnvironment;
use super::kind::{HostOs, Kind};
use super::systemd::SystemdService;
use super::traits::ServiceController;
use super::upstart::UpstartService;

/// Linux init systems with a backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitSystem {
    Systemd,
    Upstart,
}

impl InitSystem {
    /// Detect the init system from well-known paths under the environment root.
    ///
    /// systemd wins when both are present; with neither, systemd is assumed.
    pub fn detect(env: &ServiceEnvironment) -> Self {
        if env.system_path("/run/systemd/system").is_dir() {
            InitSystem::Systemd
        } else if env.system_path("/sbin/initctl").exists() {
            InitSystem::Upstart
        } else {
            InitSystem::Systemd
        }
    }
}

/// Builds the backend matching the host OS.
#[derive(Debug, Clone)]
pub struct ControllerFactory {
    os: HostOs,
    init: Option<InitSystem>,
    env: ServiceEnvironment,
}

impl ControllerFactory {
    /// Factory for the real host.
    pub fn system() -> Self {
        Self::for_host(HostOs::current(), ServiceEnvironment::system())
    }

    /// Factory for an explicit OS and environment.
    pub fn for_host(os: HostOs, env: ServiceEnvironment) -> Self {
        Self {
            os,
            init: None,
            env,
        }
    }

    /// Skip init-system detection on Linux.
    pub fn with_init(mut self, init: InitSystem) -> Self {
        self.init = Some(init);
        self
    }

    pub fn os(&self) -> &HostOs {
        &self.os
    }

    /// Normalize the name, validate `kind` for the host, and build the backend.
    pub fn create(
        &self,
        name: &str,
        description: &str,
        kind: Kind,
        dependencies: &[String],
    ) -> Result<Box<dyn ServiceController>, DaemonError> {
        kind.validate_for(&self.os)?;

        let descriptor = ServiceDescriptor::new(name, description, kind, dependencies.to_vec());
        let env = self.env.clone();

        let controller: Box<dyn ServiceController> = match &self.os {
            HostOs::Darwin => Box::new(LaunchdService::new(descriptor, env)),
            HostOs::Linux => match self.init.unwrap_or_else(|| InitSystem::detect(&env)) {
                InitSystem::Systemd => Box::new(SystemdService::new(descriptor, env)),
                InitSystem::Upstart => Box::new(UpstartService::new(descriptor, env)),
            },
            other => {
                return Err(DaemonError::service(ServiceErrorKind::UnsupportedPlatform {
                    os: other.to_string(),
                }))
            }
        };

        debug!(
            service = %controller.descriptor().name(),
            kind = %kind,
            os = %self.os,
            "Service controller created"
        );
        Ok(controller)
    }
}

/// Create a controller for the running host.
pub fn new_controller(
    name: &str,
    description: &str,
    kind: Kind,
    dependencies: &[String],
) -> Result<Box<dyn ServiceController>, DaemonError> {
    ControllerFactory::system().create(name, description, kind, dependencies)
}

/// Resolves controllers for managed entries by name.
pub trait ControllerProvider: Send + Sync {
    fn controller(
        &self,
        name: &str,
        description: &str,
    ) -> Result<Arc<dyn ServiceController>, DaemonError>;
}

/// Resolves managed entries through a [`ControllerFactory`] with one fixed kind.
pub struct ManagedControllers {
    factory: ControllerFactory,
    kind: Kind,
}

impl ManagedControllers {
    pub fn new(factory: ControllerFactory, kind: Kind) -> Self {
        Self { factory, kind }
    }
}

impl ControllerProvider for ManagedControllers {
    fn controller(
        &self,
        name: &str,
        description: &str,
    ) -> Result<Arc<dyn ServiceController>, DaemonError> {
        self.factory
            .create(name, description, self.kind, &[])
            .map(Arc::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::environment::testing::scripted_env;
    use std::fs;

    fn factory(os: HostOs, root: &std::path::Path) -> ControllerFactory {
        let (env, _) = scripted_env(root);
        ControllerFactory::for_host(os, env)
    }

    #[test]
    fn test_create_succeeds_iff_kind_valid() {
        let dir = tempfile::tempdir().unwrap();
        for os in [HostOs::Darwin, HostOs::Linux] {
            let factory = factory(os.clone(), dir.path());
            for kind in Kind::ALL {
                let result = factory.create("svc", "sample", kind, &[]);
                assert_eq!(result.is_ok(), kind.is_valid_for(&os), "{kind} on {os}");
                if let Err(err) = result {
                    assert!(matches!(
                        err.service_kind(),
                        Some(ServiceErrorKind::InvalidKind { .. })
                    ));
                }
            }
        }
    }

    #[test]
    fn test_unimplemented_platforms() {
        let dir = tempfile::tempdir().unwrap();
        for os in [HostOs::Windows, HostOs::FreeBsd] {
            let err = factory(os.clone(), dir.path())
                .create("svc", "sample", Kind::SystemDaemon, &[])
                .err()
                .unwrap();
            assert!(matches!(
                err.service_kind(),
                Some(ServiceErrorKind::UnsupportedPlatform { .. })
            ));

            let err = factory(os, dir.path())
                .create("svc", "sample", Kind::UserAgent, &[])
                .err()
                .unwrap();
            assert!(matches!(
                err.service_kind(),
                Some(ServiceErrorKind::InvalidKind { .. })
            ));
        }
    }

    #[test]
    fn test_name_is_normalized() {
        let dir = tempfile::tempdir().unwrap();
        let controller = factory(HostOs::Linux, dir.path())
            .with_init(InitSystem::Systemd)
            .create("my  web\tservice", "sample", Kind::SystemDaemon, &[])
            .unwrap();
        assert_eq!(controller.descriptor().name(), "my_web_service");
        assert_eq!(
            controller.definition_path(),
            dir.path().join("etc/systemd/system/my_web_service.service")
        );
    }

    #[test]
    fn test_detect_init_system() {
        let dir = tempfile::tempdir().unwrap();
        let (env, _) = scripted_env(dir.path());
        assert_eq!(InitSystem::detect(&env), InitSystem::Systemd);

        fs::create_dir_all(dir.path().join("sbin")).unwrap();
        fs::write(dir.path().join("sbin/initctl"), "").unwrap();
        assert_eq!(InitSystem::detect(&env), InitSystem::Upstart);

        let controller = ControllerFactory::for_host(HostOs::Linux, env.clone())
            .create("svc", "sample", Kind::SystemDaemon, &[])
            .unwrap();
        assert_eq!(controller.definition_path(), dir.path().join("etc/init/svc.conf"));

        fs::create_dir_all(dir.path().join("run/systemd/system")).unwrap();
        assert_eq!(InitSystem::detect(&env), InitSystem::Systemd);
    }

    #[test]
    fn test_managed_controllers() {
        let dir = tempfile::tempdir().unwrap();
        let provider = ManagedControllers::new(
            factory(HostOs::Linux, dir.path()).with_init(InitSystem::Upstart),
            Kind::SystemDaemon,
        );
        let controller = provider.controller("worker", "worker desc").unwrap();
        assert_eq!(controller.descriptor().description(), "worker desc");

        let provider = ManagedControllers::new(
            factory(HostOs::Darwin, dir.path()),
            Kind::SystemDaemon,
        );
        assert!(provider.controller("worker", "worker desc").is_err());
    }
}
