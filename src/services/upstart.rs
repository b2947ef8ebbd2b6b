//! Linux upstart backend.

use std::fs;
use std::path::PathBuf;

use tracing::{debug, info};

use crate::error::{DaemonError, ServiceErrorKind};
use crate::templates::{ServiceTemplate, UPSTART_JOB};

use super::descriptor::ServiceDescriptor;
use super::environment::{is_installed, require_installed, write_definition, ServiceEnvironment};
use super::probe::parse_upstart;
use super::traits::{ServiceController, ServiceStatus};

/// Job files must be executable.
const JOB_FILE_MODE: u32 = 0o755;

/// Service managed through upstart's `start`/`stop`/`status`, defined by a
/// job file in `/etc/init`.
pub struct UpstartService {
    descriptor: ServiceDescriptor,
    template: ServiceTemplate,
    env: ServiceEnvironment,
}

impl UpstartService {
    pub fn new(descriptor: ServiceDescriptor, env: ServiceEnvironment) -> Self {
        Self {
            descriptor,
            template: ServiceTemplate::builtin("upstartConfig", UPSTART_JOB),
            env,
        }
    }

    fn check_running(&self) -> ServiceStatus {
        let name = self.descriptor.name();
        match self.env.runner().probe("status", &[name]) {
            Some(output) => parse_upstart(name, &output),
            None => ServiceStatus::STOPPED,
        }
    }

    /// Render the job file for `args`.
    pub fn render(&self, args: &[String]) -> Result<String, DaemonError> {
        let path = self.env.executable_path()?;
        self.template.render(&serde_json::json!({
            "name": self.descriptor.name(),
            "description": self.descriptor.description(),
            "path": path.to_string_lossy(),
            "args": args.join(" "),
        }))
    }
}

impl ServiceController for UpstartService {
    fn descriptor(&self) -> &ServiceDescriptor {
        &self.descriptor
    }

    fn definition_path(&self) -> PathBuf {
        self.env
            .system_path("/etc/init")
            .join(format!("{}.conf", self.descriptor.name()))
    }

    fn template(&self) -> &str {
        self.template.source()
    }

    fn set_template(&mut self, source: &str) -> Result<(), DaemonError> {
        self.template.replace(source)
    }

    fn install(&self, args: &[String]) -> Result<(), DaemonError> {
        self.env.require_privileges(true)?;

        let path = self.definition_path();
        if is_installed(&path) {
            return Err(DaemonError::service(ServiceErrorKind::AlreadyInstalled));
        }

        let content = self.render(args)?;
        write_definition(&path, &content, Some(JOB_FILE_MODE))?;

        info!(service = %self.descriptor.name(), path = %path.display(), "Service installed");
        Ok(())
    }

    fn remove(&self) -> Result<(), DaemonError> {
        self.env.require_privileges(true)?;

        let path = self.definition_path();
        require_installed(&path)?;
        fs::remove_file(&path)?;

        info!(service = %self.descriptor.name(), "Service removed");
        Ok(())
    }

    fn start(&self) -> Result<(), DaemonError> {
        self.env.require_privileges(true)?;
        require_installed(&self.definition_path())?;

        if self.check_running().running {
            return Err(DaemonError::service(ServiceErrorKind::AlreadyRunning));
        }

        self.env.runner().run("start", &[self.descriptor.name()])?;
        debug!(service = %self.descriptor.name(), "Service started");
        Ok(())
    }

    fn stop(&self) -> Result<(), DaemonError> {
        self.env.require_privileges(true)?;
        require_installed(&self.definition_path())?;

        if !self.check_running().running {
            return Err(DaemonError::service(ServiceErrorKind::AlreadyStopped));
        }

        self.env.runner().run("stop", &[self.descriptor.name()])?;
        debug!(service = %self.descriptor.name(), "Service stopped");
        Ok(())
    }

    fn status(&self) -> Result<ServiceStatus, DaemonError> {
        self.env.require_privileges(true)?;
        require_installed(&self.definition_path())?;
        Ok(self.check_running())
    }
}
