//! Command executor module.
//!
//! Handles subprocess spawning for native service-manager commands.

mod output;
mod subprocess;

pub use output::sanitize_output;
pub use subprocess::{probe_native, run_native, SubprocessBuilder, SubprocessResult};
