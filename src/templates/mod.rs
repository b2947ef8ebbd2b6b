//! Service definition templates.

mod engine;

pub use engine::{ServiceTemplate, LAUNCHD_PLIST, SYSTEMD_UNIT, UPSTART_JOB};
