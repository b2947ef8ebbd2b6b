//! Error types for the autokeep daemon.
//!
//! Provides a unified error handling system using thiserror.

mod types;

pub use types::*;
