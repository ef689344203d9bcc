//! Workspaces: top-level containers of root nodes

use crate::ids::NodeIndex;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Workspace {
    pub(crate) name: String,
    pub(crate) roots: Vec<NodeIndex>,
    pub(crate) selected: Vec<NodeIndex>,
}

impl Workspace {
    pub(crate) fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            roots: Vec::new(),
            selected: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Registered root nodes in insertion order
    pub fn roots(&self) -> &[NodeIndex] {
        &self.roots
    }

    pub fn selected(&self) -> &[NodeIndex] {
        &self.selected
    }

    pub fn contains_root(&self, node: NodeIndex) -> bool {
        self.roots.contains(&node)
    }

    pub fn is_selected(&self, node: NodeIndex) -> bool {
        self.selected.contains(&node)
    }
}
