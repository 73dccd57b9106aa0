/// Node handles and the registry of cascading parameters
use serde::{Deserialize, Serialize};

/// Handle of a parameter node inside a [`crate::Form`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone)]
struct RegistryEntry {
    node: NodeId,
    name: String,
    references: Vec<String>,
}

/// Every cascading node of a form, in registration order
///
/// Dependents are looked up by upstream *name*, so two nodes sharing a name are
/// both found.
#[derive(Debug, Clone, Default)]
pub struct DependencyRegistry {
    entries: Vec<RegistryEntry>,
}

impl DependencyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, node: NodeId, name: impl Into<String>) {
        self.entries.push(RegistryEntry {
            node,
            name: name.into(),
            references: Vec::new(),
        });
    }

    /// Record that `node` references the parameter called `upstream`
    ///
    /// Returns `false` when `node` was never registered.
    pub fn add_reference(&mut self, node: NodeId, upstream: impl Into<String>) -> bool {
        let upstream = upstream.into();
        let mut found = false;
        for entry in self.entries.iter_mut().filter(|e| e.node == node) {
            entry.references.push(upstream.clone());
            found = true;
        }
        found
    }

    /// Registered nodes whose references include `name`
    pub fn find_dependents(&self, name: &str) -> Vec<NodeId> {
        self.entries
            .iter()
            .filter(|entry| entry.references.iter().any(|r| r == name))
            .map(|entry| entry.node)
            .collect()
    }

    pub fn contains(&self, node: NodeId) -> bool {
        self.entries.iter().any(|e| e.node == node)
    }

    /// Name a node was registered under
    pub fn name_of(&self, node: NodeId) -> Option<&str> {
        self.entries
            .iter()
            .find(|e| e.node == node)
            .map(|e| e.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
