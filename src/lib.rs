//! Autokeep Daemon Library
//!
//! This crate provides the core functionality for the autokeep supervisor,
//! which keeps a set of OS services running and replaces their files when
//! an update manifest announces a newer version.

pub mod cli;
pub mod config;
pub mod error;
pub mod executor;
pub mod logging;
pub mod services;
pub mod supervisor;
pub mod templates;
pub mod update;
