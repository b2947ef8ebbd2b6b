//! Native status probes.
//!
//! Each backend's status command prints free text. These functions hold the
//! per-backend match rules so the mutating operations never parse output.

use std::sync::LazyLock;

use regex::Regex;

use super::traits::ServiceStatus;

static LAUNCHCTL_PID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"PID" = ([0-9]+);"#).expect("static regex"));

static SYSTEMCTL_ACTIVE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Active: active").expect("static regex"));

static SYSTEMCTL_PID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Main PID: ([0-9]+)").expect("static regex"));

static UPSTART_PID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"process ([0-9]+)").expect("static regex"));

fn capture_pid(re: &Regex, output: &str) -> Option<u32> {
    re.captures(output)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// `launchctl list <name>`: running when the label appears in the output.
pub fn parse_launchctl(name: &str, output: &str) -> ServiceStatus {
    if !output.contains(name) {
        return ServiceStatus::STOPPED;
    }
    ServiceStatus::running(capture_pid(&LAUNCHCTL_PID, output))
}

/// `systemctl status <name>.service`: running on `Active: active`.
pub fn parse_systemctl(output: &str) -> ServiceStatus {
    if !SYSTEMCTL_ACTIVE.is_match(output) {
        return ServiceStatus::STOPPED;
    }
    ServiceStatus::running(capture_pid(&SYSTEMCTL_PID, output))
}

/// `status <name>`: running on `<name> start/running`.
pub fn parse_upstart(name: &str, output: &str) -> ServiceStatus {
    if !output.contains(&format!("{} start/running", name)) {
        return ServiceStatus::STOPPED;
    }
    ServiceStatus::running(capture_pid(&UPSTART_PID, output))
}
