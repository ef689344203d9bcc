//! Node instances stored in the model arena

use crate::ids::{ConnectorIndex, ImitationId, NodeId, NodeIndex, WorkspaceIndex};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Where a node currently sits. Derived from its fields, never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum State {
    /// Root node registered in a workspace
    RootDirectlyUnderWorkspace,
    /// Root node that belongs to a workspace but is not registered in it
    RootDangling,
    /// Connected to a parent connector
    Child,
    /// Not part of any workspace
    Deleted,
}

/// Original/imitation links of an imitatable node
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImitationInfo {
    pub(crate) original: Option<NodeIndex>,
    pub(crate) imitations: Vec<NodeIndex>,
    pub(crate) tag_to_node_id: Arc<BTreeMap<ImitationId, NodeId>>,
    pub(crate) can_create_manually: bool,
    pub(crate) scope_name: String,
}

impl ImitationInfo {
    pub(crate) fn new(
        tag_to_node_id: Arc<BTreeMap<ImitationId, NodeId>>,
        can_create_manually: bool,
        scope_name: String,
    ) -> Self {
        Self {
            original: None,
            imitations: Vec::new(),
            tag_to_node_id,
            can_create_manually,
            scope_name,
        }
    }

    /// Same template configuration, no links
    pub(crate) fn detached_copy(&self) -> Self {
        Self::new(
            self.tag_to_node_id.clone(),
            self.can_create_manually,
            self.scope_name.clone(),
        )
    }

    pub fn original(&self) -> Option<NodeIndex> {
        self.original
    }

    pub fn imitations(&self) -> &[NodeIndex] {
        &self.imitations
    }

    pub fn is_imitation(&self) -> bool {
        self.original.is_some()
    }

    pub fn can_create_manually(&self) -> bool {
        self.can_create_manually
    }

    pub fn scope_name(&self) -> &str {
        &self.scope_name
    }

    /// Template to instantiate for `tag`. `NONE` never has one.
    pub fn imitation_node_id(&self, tag: &ImitationId) -> Option<&NodeId> {
        if tag.is_none() {
            return None;
        }
        self.tag_to_node_id.get(tag)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    Connective {
        connectors: Vec<ConnectorIndex>,
        imitation: ImitationInfo,
    },
    Text {
        text: String,
        imitation: ImitationInfo,
    },
    Void,
}

impl NodeKind {
    pub fn name(&self) -> &'static str {
        match self {
            NodeKind::Connective { .. } => "connective",
            NodeKind::Text { .. } => "text",
            NodeKind::Void => "void",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub(crate) id: NodeId,
    pub(crate) name: String,
    pub(crate) kind: NodeKind,
    pub(crate) parent_connector: Option<ConnectorIndex>,
    pub(crate) workspace: Option<WorkspaceIndex>,
    pub(crate) last_replaced: Option<NodeIndex>,
    pub(crate) is_default_node: bool,
    pub(crate) behavior: Option<String>,
}

impl Node {
    pub(crate) fn new(id: NodeId, name: String, kind: NodeKind, behavior: Option<String>) -> Self {
        Self {
            id,
            name,
            kind,
            parent_connector: None,
            workspace: None,
            last_replaced: None,
            is_default_node: false,
            behavior,
        }
    }

    /// Template identifier
    pub fn id(&self) -> &NodeId {
        &self.id
    }

    /// Symbol name
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    pub fn parent_connector(&self) -> Option<ConnectorIndex> {
        self.parent_connector
    }

    pub fn workspace(&self) -> Option<WorkspaceIndex> {
        self.workspace
    }

    /// Node that most recently took this node's place
    pub fn last_replaced(&self) -> Option<NodeIndex> {
        self.last_replaced
    }

    pub fn is_default_node(&self) -> bool {
        self.is_default_node
    }

    pub fn behavior(&self) -> Option<&str> {
        self.behavior.as_deref()
    }

    /// Child connectors in template order; empty for leaves
    pub fn connectors(&self) -> &[ConnectorIndex] {
        match &self.kind {
            NodeKind::Connective { connectors, .. } => connectors,
            _ => &[],
        }
    }

    pub fn text(&self) -> Option<&str> {
        match &self.kind {
            NodeKind::Text { text, .. } => Some(text),
            _ => None,
        }
    }

    pub fn imitation_info(&self) -> Option<&ImitationInfo> {
        match &self.kind {
            NodeKind::Connective { imitation, .. } | NodeKind::Text { imitation, .. } => {
                Some(imitation)
            }
            NodeKind::Void => None,
        }
    }

    pub(crate) fn imitation_info_mut(&mut self) -> Option<&mut ImitationInfo> {
        match &mut self.kind {
            NodeKind::Connective { imitation, .. } | NodeKind::Text { imitation, .. } => {
                Some(imitation)
            }
            NodeKind::Void => None,
        }
    }

    pub fn is_imitation(&self) -> bool {
        self.imitation_info().is_some_and(ImitationInfo::is_imitation)
    }

    pub fn original(&self) -> Option<NodeIndex> {
        self.imitation_info().and_then(ImitationInfo::original)
    }

    pub fn imitations(&self) -> &[NodeIndex] {
        match self.imitation_info() {
            Some(info) => &info.imitations,
            None => &[],
        }
    }
}
