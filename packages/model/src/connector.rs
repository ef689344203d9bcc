//! Connectors: typed slots holding exactly one child node

use crate::errors::{ModelError, ModelResult};
use crate::ids::{
    ConnectorId, ConnectorIndex, ImitationConnectionPos, ImitationId, NodeId, NodeIndex,
};
use crate::model::NodeModel;
use crate::template::{ConnectorSlot, ConnectorTemplate};
use crate::undo_log::{Command, UndoLog};
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq)]
pub struct Connector {
    pub(crate) id: ConnectorId,
    pub(crate) name: String,
    pub(crate) default_node_id: NodeId,
    pub(crate) init_node_id: NodeId,
    pub(crate) fixed: bool,
    pub(crate) class: String,
    pub(crate) imitation_id: ImitationId,
    pub(crate) imitation_connection_pos: ImitationConnectionPos,
    pub(crate) behavior: Option<String>,
    pub(crate) parent: NodeIndex,
    pub(crate) connected: Option<NodeIndex>,
}

impl Connector {
    pub(crate) fn from_template(
        template: &ConnectorTemplate,
        slot: &ConnectorSlot,
        parent: NodeIndex,
    ) -> Self {
        Self {
            id: template.id.clone(),
            name: slot.name.clone(),
            default_node_id: template.default_node_id.clone(),
            init_node_id: template.initial_node_id.clone(),
            fixed: template.fixed,
            class: template.class.clone(),
            imitation_id: slot.imitation_id.clone(),
            imitation_connection_pos: slot.imitation_connection_pos.clone(),
            behavior: template.behavior.clone(),
            parent,
            connected: None,
        }
    }

    /// Same configuration under another parent, nothing connected yet
    pub(crate) fn detached_copy(&self, parent: NodeIndex) -> Self {
        Self {
            parent,
            connected: None,
            ..self.clone()
        }
    }

    pub fn id(&self) -> &ConnectorId {
        &self.id
    }

    /// Symbol name
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn default_node_id(&self) -> &NodeId {
        &self.default_node_id
    }

    pub fn init_node_id(&self) -> &NodeId {
        &self.init_node_id
    }

    /// Template of the node connected on construction
    pub fn first_node_id(&self) -> &NodeId {
        if self.init_node_id.is_none() {
            &self.default_node_id
        } else {
            &self.init_node_id
        }
    }

    pub fn is_fixed(&self) -> bool {
        self.fixed
    }

    pub fn class(&self) -> &str {
        &self.class
    }

    pub fn imitation_id(&self) -> &ImitationId {
        &self.imitation_id
    }

    pub fn imitation_connection_pos(&self) -> &ImitationConnectionPos {
        &self.imitation_connection_pos
    }

    pub fn behavior(&self) -> Option<&str> {
        self.behavior.as_deref()
    }

    /// Node owning this connector
    pub fn parent(&self) -> NodeIndex {
        self.parent
    }

    pub fn connected_node(&self) -> Option<NodeIndex> {
        self.connected
    }

    /// Whether a filler created from `node_id` counts as a default node
    pub(crate) fn is_default_filler(&self, node_id: &NodeId) -> bool {
        *node_id == self.default_node_id && self.default_node_id != self.init_node_id
    }
}

impl NodeModel {
    /// Attach `node` to `connector`, detaching whatever was connected before.
    ///
    /// Construction-time wiring passes no log.
    pub fn connect_node(
        &mut self,
        connector: ConnectorIndex,
        node: NodeIndex,
        log: Option<&mut UndoLog>,
    ) -> ModelResult<()> {
        self.check_connector(connector)?;
        self.check_node(node)?;
        if let Some(holder) = self.node(node).parent_connector {
            if holder != connector {
                return Err(ModelError::AlreadyConnected {
                    node,
                    connector: holder,
                });
            }
        }
        if self.connector(connector).parent == node {
            return Err(ModelError::InvalidOperation(format!(
                "{node} cannot be connected to its own {connector}"
            )));
        }

        let previous = self.connector(connector).connected;
        self.raw_connect(connector, Some(node));
        if let Some(log) = log {
            log.record(Command::ConnectNode {
                connector,
                previous,
                next: Some(node),
            });
        }
        Ok(())
    }

    /// Replace the connected node with a fresh default filler and return it.
    ///
    /// The previous node is detached, not deleted.
    pub fn remove_connected(
        &mut self,
        connector: ConnectorIndex,
        log: &mut UndoLog,
    ) -> ModelResult<NodeIndex> {
        self.check_connector(connector)?;
        let current = self.connector(connector).connected.ok_or_else(|| {
            ModelError::InvalidOperation(format!("{connector} has no connected node"))
        })?;
        let default_node_id = self.connector(connector).default_node_id.clone();

        let filler = self.create_node(&default_node_id)?;
        self.set_default_node(filler, true, log);
        self.replace(current, filler, log)?;
        debug!(%connector, removed = %current, %filler, "Connected node removed");
        Ok(filler)
    }

    /// Whether the connected node may be swapped for `candidate`.
    ///
    /// Fixed connectors never are and their behavior is not consulted. Any
    /// behavior failure or unexpected result counts as "no".
    pub fn is_connected_node_replaceable_with(
        &self,
        connector: ConnectorIndex,
        candidate: NodeIndex,
    ) -> bool {
        let Some(slot) = self.connectors.get(connector.get()) else {
            return false;
        };
        if slot.fixed {
            return false;
        }
        let Some(current) = slot.connected else {
            return false;
        };
        let Some(behavior) = self.connector_behavior(connector) else {
            return false;
        };

        match behavior.check_replaceable(self, connector, candidate, current) {
            Ok(replaceable) => replaceable,
            Err(err) => {
                warn!(%connector, %candidate, error = %err, "Replaceability check failed");
                false
            }
        }
    }

    /// Imitation tag of the connector, inherited from the nearest ancestor
    /// connector that has one
    pub fn find_imitation_id(&self, connector: ConnectorIndex) -> ImitationId {
        let mut current = connector;
        loop {
            let slot = self.connector(current);
            if !slot.imitation_id.is_none() {
                return slot.imitation_id.clone();
            }
            match self.node(slot.parent).parent_connector {
                Some(parent) => current = parent,
                None => return ImitationId::NONE,
            }
        }
    }
}
