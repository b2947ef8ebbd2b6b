//! Tera wrapper for service definition templates.
//!
//! Each service controller owns one `ServiceTemplate`; replacing it never
//! affects other controllers.

use tera::{Context, Tera};
use tracing::debug;

use crate::error::DaemonError;

/// launchd property list for macOS agents and daemons.
pub const LAUNCHD_PLIST: &str = include_str!("launchd.plist.tera");

/// systemd unit file.
pub const SYSTEMD_UNIT: &str = include_str!("systemd.service.tera");

/// upstart job file.
pub const UPSTART_JOB: &str = include_str!("upstart.conf.tera");

/// A named definition-file template.
#[derive(Debug, Clone)]
pub struct ServiceTemplate {
    name: &'static str,
    source: String,
}

impl ServiceTemplate {
    /// Create a template, failing if `source` does not parse.
    pub fn new(name: &'static str, source: impl Into<String>) -> Result<Self, DaemonError> {
        let source = source.into();
        compile(name, &source)?;
        Ok(Self { name, source })
    }

    /// Built-in templates are known to parse.
    pub(crate) fn builtin(name: &'static str, source: &'static str) -> Self {
        Self {
            name,
            source: source.to_string(),
        }
    }

    /// Template identifier, used in error messages.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Raw template text.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Replace the template text, keeping the old one if the new one is invalid.
    pub fn replace(&mut self, source: impl Into<String>) -> Result<(), DaemonError> {
        let source = source.into();
        compile(self.name, &source)?;
        debug!(template = self.name, "Service template replaced");
        self.source = source;
        Ok(())
    }

    /// Render the template with the given context.
    pub fn render(&self, context: &serde_json::Value) -> Result<String, DaemonError> {
        let tera = compile(self.name, &self.source)?;

        let tera_context = Context::from_serialize(context).map_err(|e| DaemonError::Template {
            message: format!("Invalid template context: {}", e),
        })?;

        tera.render(self.name, &tera_context)
            .map_err(|e| DaemonError::Template {
                message: format!("Failed to render template '{}': {}", self.name, e),
            })
    }
}

fn compile(name: &'static str, source: &str) -> Result<Tera, DaemonError> {
    let mut tera = Tera::default();
    // Definition files are not HTML.
    tera.autoescape_on(vec![]);
    tera.add_raw_template(name, source)
        .map_err(|e| DaemonError::Template {
            message: format!("Failed to parse template '{}': {}", name, e),
        })?;
    Ok(tera)
}
