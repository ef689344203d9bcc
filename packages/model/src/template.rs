//! # Node and Connector Templates
//!
//! Read-only definitions that node instances are built from.
//!
//! Definitions are usually loaded from JSON files:
//!
//! ```json
//! {
//!   "connectors": [
//!     { "id": "cnctrArg", "defaultNodeId": "idEmptyArg" }
//!   ],
//!   "nodes": [
//!     {
//!       "id": "idVarDecl",
//!       "type": "connective",
//!       "name": "VarDecl",
//!       "connectors": [
//!         { "connector": "cnctrArg", "name": "Arg0", "imitationConnectionPos": "imitCnctPosArg" }
//!       ],
//!       "imitations": { "imitIdManual": "idVar" },
//!       "canCreateImitManually": true
//!     },
//!     { "id": "idEmptyArg", "type": "void" }
//!   ]
//! }
//! ```
//!
//! The registry is populated once before any mutation and then shared
//! (behind an `Arc`) with every [`NodeModel`](crate::NodeModel) that uses it.

use crate::ids::{ConnectorId, ImitationConnectionPos, ImitationId, NodeId};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TemplateError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid template definition: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Duplicate node template: {0}")]
    DuplicateNode(NodeId),

    #[error("Duplicate connector template: {0}")]
    DuplicateConnector(ConnectorId),

    #[error("Template '{from}' refers to unknown node template '{missing}'")]
    UnknownNode { from: String, missing: NodeId },

    #[error("Node template '{node}' refers to unknown connector template '{connector}'")]
    UnknownConnector { node: NodeId, connector: ConnectorId },

    #[error("Connector template '{0}' has neither a default nor an initial node")]
    MissingFiller(ConnectorId),

    #[error("Node template '{node}' instantiates itself: {chain}")]
    CyclicInstantiation { node: NodeId, chain: String },
}

/// `a -> b -> a` rendering of a template chain
pub(crate) fn describe_chain(chain: &[NodeId]) -> String {
    chain
        .iter()
        .map(NodeId::as_str)
        .collect::<Vec<_>>()
        .join(" -> ")
}

/// Connector definition shared by every slot that uses it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectorTemplate {
    pub id: ConnectorId,

    /// Node connected in place of a removed one
    #[serde(default)]
    pub default_node_id: NodeId,

    /// Node connected when the connector is first built.
    /// Falls back to `default_node_id` when empty.
    #[serde(default)]
    pub initial_node_id: NodeId,

    /// Connected node cannot be detached or replaced by hand
    #[serde(default)]
    pub fixed: bool,

    #[serde(default)]
    pub class: String,

    /// Behavior consulted for replaceability checks
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub behavior: Option<String>,
}

impl ConnectorTemplate {
    pub fn new(id: impl Into<ConnectorId>, default_node_id: impl Into<NodeId>) -> Self {
        Self {
            id: id.into(),
            default_node_id: default_node_id.into(),
            initial_node_id: NodeId::NONE,
            fixed: false,
            class: String::new(),
            behavior: None,
        }
    }

    pub fn with_initial(mut self, initial_node_id: impl Into<NodeId>) -> Self {
        self.initial_node_id = initial_node_id.into();
        self
    }

    pub fn fixed(mut self) -> Self {
        self.fixed = true;
        self
    }

    pub fn with_behavior(mut self, behavior: impl Into<String>) -> Self {
        self.behavior = Some(behavior.into());
        self
    }

    /// Template of the node a fresh connector starts with
    pub fn first_node_id(&self) -> &NodeId {
        if self.initial_node_id.is_none() {
            &self.default_node_id
        } else {
            &self.initial_node_id
        }
    }
}

/// Placement of a connector inside a connective node template
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectorSlot {
    pub connector: ConnectorId,

    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub imitation_id: ImitationId,

    #[serde(default)]
    pub imitation_connection_pos: ImitationConnectionPos,
}

impl ConnectorSlot {
    pub fn new(connector: impl Into<ConnectorId>) -> Self {
        Self {
            connector: connector.into(),
            name: String::new(),
            imitation_id: ImitationId::NONE,
            imitation_connection_pos: ImitationConnectionPos::NONE,
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_imitation_id(mut self, imitation_id: impl Into<ImitationId>) -> Self {
        self.imitation_id = imitation_id.into();
        self
    }

    pub fn with_connection_pos(mut self, pos: impl Into<ImitationConnectionPos>) -> Self {
        self.imitation_connection_pos = pos.into();
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum NodeTemplateKind {
    Connective {
        #[serde(default)]
        connectors: Vec<ConnectorSlot>,
    },
    Text {
        #[serde(default)]
        text: String,
    },
    Void,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeTemplate {
    pub id: NodeId,

    /// Symbol name used by symbol lookups
    #[serde(default)]
    pub name: String,

    #[serde(flatten)]
    pub kind: NodeTemplateKind,

    /// Imitation tag -> template of the imitation node. Ignored for void nodes.
    #[serde(default)]
    pub imitations: BTreeMap<ImitationId, NodeId>,

    #[serde(default)]
    pub can_create_imit_manually: bool,

    #[serde(default)]
    pub scope_name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub behavior: Option<String>,
}

impl NodeTemplate {
    fn with_kind(id: impl Into<NodeId>, kind: NodeTemplateKind) -> Self {
        Self {
            id: id.into(),
            name: String::new(),
            kind,
            imitations: BTreeMap::new(),
            can_create_imit_manually: false,
            scope_name: String::new(),
            behavior: None,
        }
    }

    pub fn connective(id: impl Into<NodeId>, connectors: Vec<ConnectorSlot>) -> Self {
        Self::with_kind(id, NodeTemplateKind::Connective { connectors })
    }

    pub fn text(id: impl Into<NodeId>, text: impl Into<String>) -> Self {
        Self::with_kind(id, NodeTemplateKind::Text { text: text.into() })
    }

    pub fn void(id: impl Into<NodeId>) -> Self {
        Self::with_kind(id, NodeTemplateKind::Void)
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_imitation(mut self, tag: impl Into<ImitationId>, node_id: impl Into<NodeId>) -> Self {
        self.imitations.insert(tag.into(), node_id.into());
        self
    }

    /// Allows manual imitation creation, backed by the template for the `MANUAL` tag
    pub fn with_manual_imitation(mut self, node_id: impl Into<NodeId>) -> Self {
        self.imitations.insert(ImitationId::MANUAL, node_id.into());
        self.can_create_imit_manually = true;
        self
    }

    pub fn with_scope(mut self, scope_name: impl Into<String>) -> Self {
        self.scope_name = scope_name.into();
        self
    }

    pub fn with_behavior(mut self, behavior: impl Into<String>) -> Self {
        self.behavior = Some(behavior.into());
        self
    }

    pub fn kind_name(&self) -> &'static str {
        match self.kind {
            NodeTemplateKind::Connective { .. } => "connective",
            NodeTemplateKind::Text { .. } => "text",
            NodeTemplateKind::Void => "void",
        }
    }
}

/// On-disk layout of a template definition file
#[derive(Debug, Default, Serialize, Deserialize)]
struct TemplateFile {
    #[serde(default)]
    connectors: Vec<ConnectorTemplate>,

    #[serde(default)]
    nodes: Vec<NodeTemplate>,
}

/// Lookup table of node and connector templates
#[derive(Debug, Default, Clone)]
pub struct TemplateRegistry {
    nodes: HashMap<NodeId, NodeTemplate>,
    connectors: HashMap<ConnectorId, ConnectorTemplate>,
}

impl TemplateRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a template definition document
    pub fn from_json(source: &str) -> Result<Self, TemplateError> {
        let file: TemplateFile = serde_json::from_str(source)?;
        let mut registry = Self::new();
        for connector in file.connectors {
            registry.insert_connector(connector)?;
        }
        for node in file.nodes {
            registry.insert_node(node)?;
        }
        Ok(registry)
    }

    /// Load a template definition file from disk
    pub fn load(path: impl AsRef<Path>) -> Result<Self, TemplateError> {
        let source = std::fs::read_to_string(path)?;
        Self::from_json(&source)
    }

    /// Add every template of `other`, rejecting duplicates
    pub fn merge(&mut self, other: TemplateRegistry) -> Result<(), TemplateError> {
        for (_, connector) in other.connectors {
            self.insert_connector(connector)?;
        }
        for (_, node) in other.nodes {
            self.insert_node(node)?;
        }
        Ok(())
    }

    pub fn insert_node(&mut self, template: NodeTemplate) -> Result<(), TemplateError> {
        if self.nodes.contains_key(&template.id) {
            return Err(TemplateError::DuplicateNode(template.id));
        }
        self.nodes.insert(template.id.clone(), template);
        Ok(())
    }

    pub fn insert_connector(&mut self, template: ConnectorTemplate) -> Result<(), TemplateError> {
        if self.connectors.contains_key(&template.id) {
            return Err(TemplateError::DuplicateConnector(template.id));
        }
        self.connectors.insert(template.id.clone(), template);
        Ok(())
    }

    /// Builder-style insert for in-code definitions. A later template with
    /// the same id replaces the earlier one.
    pub fn with_node(mut self, template: NodeTemplate) -> Self {
        self.nodes.insert(template.id.clone(), template);
        self
    }

    /// Builder-style insert for in-code definitions. A later template with
    /// the same id replaces the earlier one.
    pub fn with_connector(mut self, template: ConnectorTemplate) -> Self {
        self.connectors.insert(template.id.clone(), template);
        self
    }

    pub fn node(&self, id: &NodeId) -> Option<&NodeTemplate> {
        self.nodes.get(id)
    }

    pub fn connector(&self, id: &ConnectorId) -> Option<&ConnectorTemplate> {
        self.connectors.get(id)
    }

    pub fn contains_node(&self, id: &NodeId) -> bool {
        self.nodes.contains_key(id)
    }

    /// Node template ids in sorted order
    pub fn node_ids(&self) -> Vec<&NodeId> {
        let mut ids: Vec<_> = self.nodes.keys().collect();
        ids.sort();
        ids
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn connector_count(&self) -> usize {
        self.connectors.len()
    }

    /// Check every cross reference between templates.
    ///
    /// Returns all problems found instead of stopping at the first one,
    /// so a definition author can fix them in one pass.
    pub fn validate(&self) -> Vec<TemplateError> {
        let mut problems = Vec::new();

        let mut connector_ids: Vec<_> = self.connectors.keys().collect();
        connector_ids.sort();
        for id in connector_ids {
            let connector = &self.connectors[id];
            if connector.default_node_id.is_none() && connector.initial_node_id.is_none() {
                problems.push(TemplateError::MissingFiller(id.clone()));
            }
            for node_id in [&connector.default_node_id, &connector.initial_node_id] {
                if !node_id.is_none() && !self.nodes.contains_key(node_id) {
                    problems.push(TemplateError::UnknownNode {
                        from: id.to_string(),
                        missing: node_id.clone(),
                    });
                }
            }
        }

        for id in self.node_ids() {
            let node = &self.nodes[id];
            if let NodeTemplateKind::Connective { connectors } = &node.kind {
                for slot in connectors {
                    if !self.connectors.contains_key(&slot.connector) {
                        problems.push(TemplateError::UnknownConnector {
                            node: id.clone(),
                            connector: slot.connector.clone(),
                        });
                    }
                }
            }
            for imitation_id in node.imitations.values() {
                if !self.nodes.contains_key(imitation_id) {
                    problems.push(TemplateError::UnknownNode {
                        from: id.to_string(),
                        missing: imitation_id.clone(),
                    });
                }
            }
        }

        let mut reported_cycles = HashSet::new();
        for id in self.node_ids() {
            let Some(cycle) = self.instantiation_cycle(id) else {
                continue;
            };
            let mut members = cycle.clone();
            members.sort();
            members.dedup();
            if reported_cycles.insert(members) {
                problems.push(TemplateError::CyclicInstantiation {
                    node: cycle[0].clone(),
                    chain: describe_chain(&cycle),
                });
            }
        }

        problems
    }

    /// Chain of templates through which building `id` would instantiate an
    /// enclosing template again, ending with the repeated one.
    ///
    /// Follows the first node (initial, else default) of every connector.
    /// Missing templates end a branch; `validate` reports them separately.
    pub fn instantiation_cycle(&self, id: &NodeId) -> Option<Vec<NodeId>> {
        let mut path = Vec::new();
        let mut finished = HashSet::new();
        self.find_cycle(id, &mut path, &mut finished)
    }

    fn find_cycle<'a>(
        &'a self,
        id: &'a NodeId,
        path: &mut Vec<&'a NodeId>,
        finished: &mut HashSet<&'a NodeId>,
    ) -> Option<Vec<NodeId>> {
        if let Some(start) = path.iter().position(|entry| *entry == id) {
            let mut cycle: Vec<NodeId> = path[start..].iter().map(|entry| (*entry).clone()).collect();
            cycle.push(id.clone());
            return Some(cycle);
        }
        if finished.contains(id) {
            return None;
        }
        let template = self.nodes.get(id)?;

        path.push(id);
        if let NodeTemplateKind::Connective { connectors } = &template.kind {
            for slot in connectors {
                let Some(connector) = self.connectors.get(&slot.connector) else {
                    continue;
                };
                if let Some(cycle) = self.find_cycle(connector.first_node_id(), path, finished) {
                    return Some(cycle);
                }
            }
        }
        path.pop();
        finished.insert(id);
        None
    }
}
