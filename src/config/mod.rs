//! Configuration module for the autokeep daemon.
//!
//! Handles loading and validating daemon settings from TOML files and
//! locating files next to the executable.

mod paths;
mod settings;

pub use paths::{executable_dir, resolve_in};
pub use settings::*;
