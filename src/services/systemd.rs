//! Linux systemd backend.

use std::fs;
use std::path::PathBuf;

use tracing::{debug, info};

use crate::error::{DaemonError, ServiceErrorKind};
use crate::templates::{ServiceTemplate, SYSTEMD_UNIT};

use super::descriptor::ServiceDescriptor;
use super::environment::{is_installed, require_installed, write_definition, ServiceEnvironment};
use super::probe::parse_systemctl;
use super::traits::{ServiceController, ServiceStatus};

/// Service managed through `systemctl`, defined by a unit file in
/// `/etc/systemd/system`.
pub struct SystemdService {
    descriptor: ServiceDescriptor,
    template: ServiceTemplate,
    env: ServiceEnvironment,
}

impl SystemdService {
    pub fn new(descriptor: ServiceDescriptor, env: ServiceEnvironment) -> Self {
        Self {
            descriptor,
            template: ServiceTemplate::builtin("systemDConfig", SYSTEMD_UNIT),
            env,
        }
    }

    fn unit(&self) -> String {
        format!("{}.service", self.descriptor.name())
    }

    fn check_running(&self) -> ServiceStatus {
        let unit = self.unit();
        match self.env.runner().probe("systemctl", &["status", &unit]) {
            Some(output) => parse_systemctl(&output),
            None => ServiceStatus::STOPPED,
        }
    }

    /// Render the unit file for `args`.
    pub fn render(&self, args: &[String]) -> Result<String, DaemonError> {
        let path = self.env.executable_path()?;
        self.template.render(&serde_json::json!({
            "name": self.descriptor.name(),
            "description": self.descriptor.description(),
            "dependencies": self.descriptor.dependencies().join(" "),
            "path": path.to_string_lossy(),
            "args": args.join(" "),
        }))
    }

    fn require_privileges(&self) -> Result<(), DaemonError> {
        self.env.require_privileges(true)
    }
}

impl ServiceController for SystemdService {
    fn descriptor(&self) -> &ServiceDescriptor {
        &self.descriptor
    }

    fn definition_path(&self) -> PathBuf {
        self.env
            .system_path("/etc/systemd/system")
            .join(self.unit())
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

        let runner = self.env.runner();
        runner.run("systemctl", &["daemon-reload"])?;
        runner.run("systemctl", &["enable", &self.unit()])?;

        info!(service = %self.descriptor.name(), path = %path.display(), "Service installed");
        Ok(())
    }

    fn remove(&self) -> Result<(), DaemonError> {
        self.require_privileges()?;

        let path = self.definition_path();
        require_installed(&path)?;

        self.env.runner().run("systemctl", &["disable", &self.unit()])?;
        fs::remove_file(&path)?;

        info!(service = %self.descriptor.name(), "Service removed");
        Ok(())
    }

    fn start(&self) -> Result<(), DaemonError> {
        self.require_privileges()?;
        require_installed(&self.definition_path())?;

        if self.check_running().running {
            return Err(DaemonError::service(ServiceErrorKind::AlreadyRunning));
        }

        self.env.runner().run("systemctl", &["start", &self.unit()])?;
        debug!(service = %self.descriptor.name(), "Service started");
        Ok(())
    }

    fn stop(&self) -> Result<(), DaemonError> {
        self.require_privileges()?;
        require_installed(&self.definition_path())?;

        if !self.check_running().running {
            return Err(DaemonError::service(ServiceErrorKind::AlreadyStopped));
        }

        self.env.runner().run("systemctl", &["stop", &self.unit()])?;
        debug!(service = %self.descriptor.name(), "Service stopped");
        Ok(())
    }

    fn status(&self) -> Result<ServiceStatus, DaemonError> {
        self.require_privileges()?;
        require_installed(&self.definition_path())?;
        Ok(self.check_running())
    }
}
