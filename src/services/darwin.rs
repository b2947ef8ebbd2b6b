//! macOS launchd backend.

use std::fs;
use std::path::PathBuf;

use tracing::{debug, info};

use crate::error::{DaemonError, ServiceErrorKind};
use crate::templates::{ServiceTemplate, LAUNCHD_PLIST};

use super::descriptor::ServiceDescriptor;
use super::environment::{is_installed, require_installed, write_definition, ServiceEnvironment};
use super::kind::Kind;
use super::probe::parse_launchctl;
use super::traits::{ServiceController, ServiceStatus};

/// Launch agent or daemon controlled through `launchctl`.
pub struct LaunchdService {
    descriptor: ServiceDescriptor,
    template: ServiceTemplate,
    env: ServiceEnvironment,
}

impl LaunchdService {
    pub fn new(descriptor: ServiceDescriptor, env: ServiceEnvironment) -> Self {
        Self {
            descriptor,
            template: ServiceTemplate::builtin("propertyList", LAUNCHD_PLIST),
            env,
        }
    }

    fn require_privileges(&self) -> Result<(), DaemonError> {
        self.env
            .require_privileges(self.descriptor.kind().requires_privileges())
    }

    fn check_running(&self) -> ServiceStatus {
        let name = self.descriptor.name();
        match self.env.runner().probe("launchctl", &["list", name]) {
            Some(output) => parse_launchctl(name, &output),
            None => ServiceStatus::STOPPED,
        }
    }

    /// Render the property list for `args`.
    pub fn render(&self, args: &[String]) -> Result<String, DaemonError> {
        let path = self.env.executable_path()?;
        self.template.render(&serde_json::json!({
            "name": self.descriptor.name(),
            "path": path.to_string_lossy(),
            "args": args,
        }))
    }
}

impl ServiceController for LaunchdService {
    fn descriptor(&self) -> &ServiceDescriptor {
        &self.descriptor
    }

    fn definition_path(&self) -> PathBuf {
        let file = format!("{}.plist", self.descriptor.name());
        match self.descriptor.kind() {
            Kind::UserAgent => self.env.home_path("Library/LaunchAgents").join(file),
            Kind::GlobalAgent => self.env.system_path("/Library/LaunchAgents").join(file),
            Kind::GlobalDaemon | Kind::SystemDaemon => {
                self.env.system_path("/Library/LaunchDaemons").join(file)
            }
        }
    }

    fn template(&self) -> &str {
        self.template.source()
    }

    fn set_template(&mut self, source: &str) -> Result<(), DaemonError> {
        self.template.replace(source)
    }

    fn install(&self, args: &[String]) -> Result<(), DaemonError> {
        self.require_privileges()?;

        let path = self.definition_path();
        if is_installed(&path) {
            return Err(DaemonError::service(ServiceErrorKind::AlreadyInstalled));
        }

        let content = self.render(args)?;
        write_definition(&path, &content, None)?;

        info!(service = %self.descriptor.name(), path = %path.display(), "Service installed");
        Ok(())
    }

    fn remove(&self) -> Result<(), DaemonError> {
        self.require_privileges()?;

        let path = self.definition_path();
        require_installed(&path)?;
        fs::remove_file(&path)?;

        info!(service = %self.descriptor.name(), "Service removed");
        Ok(())
    }

    fn start(&self) -> Result<(), DaemonError> {
        self.require_privileges()?;
        let path = self.definition_path();
        require_installed(&path)?;

        if self.check_running().running {
            return Err(DaemonError::service(ServiceErrorKind::AlreadyRunning));
        }

        let plist = path.to_string_lossy().into_owned();
        self.env.runner().run("launchctl", &["load", plist.as_str()])?;
        debug!(service = %self.descriptor.name(), "Service loaded");
        Ok(())
    }

    fn stop(&self) -> Result<(), DaemonError> {
        self.require_privileges()?;
        let path = self.definition_path();
        require_installed(&path)?;

        if !self.check_running().running {
            return Err(DaemonError::service(ServiceErrorKind::AlreadyStopped));
        }

        let plist = path.to_string_lossy().into_owned();
        self.env.runner().run("launchctl", &["unload", plist.as_str()])?;
        debug!(service = %self.descriptor.name(), "Service unloaded");
        Ok(())
    }

    fn status(&self) -> Result<ServiceStatus, DaemonError> {
        self.require_privileges()?;
        require_installed(&self.definition_path())?;
        Ok(self.check_running())
    }
}
