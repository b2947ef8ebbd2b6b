//! Service identity.

use super::kind::Kind;

/// Identity of a manageable OS service. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceDescriptor {
    name: String,
    description: String,
    kind: Kind,
    dependencies: Vec<String>,
}

impl ServiceDescriptor {
    /// Build a descriptor; `name` is normalized with [`normalize_name`].
    pub fn new(name: &str, description: &str, kind: Kind, dependencies: Vec<String>) -> Self {
        Self {
            name: normalize_name(name),
            description: description.to_string(),
            kind,
            dependencies,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn kind(&self) -> Kind {
        self.kind
    }

    pub fn dependencies(&self) -> &[String] {
        &self.dependencies
    }
}

/// Collapse whitespace runs into single underscores, trimming the ends.
pub fn normalize_name(name: &str) -> String {
    name.split_whitespace().collect::<Vec<_>>().join("_")
}
