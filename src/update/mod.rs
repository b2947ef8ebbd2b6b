//! Self-update pipeline.
//!
//! - [`manifest`]: the document an update URL serves
//! - [`source`]: where manifests and artifacts come from (pinned-TLS HTTP)
//! - [`artifact`]: writing downloaded files over the installed ones
//! - [`state`]: the persisted list of managed services
//! - [`reconcile`]: the periodic update-or-keep-alive loop

pub mod artifact;
pub mod manifest;
pub mod reconcile;
pub mod source;
pub mod state;

pub use artifact::{resolve_target, ArtifactReplacer};
pub use manifest::{ManifestFile, UpdateManifest};
pub use reconcile::{EntryOutcome, Liveness, ReconcileLoop};
pub use source::{HttpUpdateSource, UpdateSource, PINNED_CA_PEM};
pub use state::{UpdateEntry, UpdaterConfig};
