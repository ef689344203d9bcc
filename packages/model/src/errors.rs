//! Error types for the node model

use crate::ids::{ConnectorId, ConnectorIndex, NodeId, NodeIndex};
use thiserror::Error;

pub type ModelResult<T> = Result<T, ModelError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ModelError {
    #[error("Node template not found: {0}")]
    TemplateNotFound(NodeId),

    #[error("Connector template not found: {0}")]
    ConnectorTemplateNotFound(ConnectorId),

    #[error("Node template {node} instantiates itself: {chain}")]
    CyclicTemplate { node: NodeId, chain: String },

    #[error("Node {0} is not part of this model")]
    UnknownNode(NodeIndex),

    #[error("Node {node} is already connected to {connector}")]
    AlreadyConnected {
        node: NodeIndex,
        connector: ConnectorIndex,
    },

    #[error("Node {0} has no parent connector")]
    NotAChild(NodeIndex),

    #[error("Node {0} does not support imitations")]
    NotImitatable(NodeIndex),

    #[error("Node {node} has no imitation template for tag '{tag}'")]
    NoImitationForTag { node: NodeIndex, tag: String },

    #[error("Imitation template {template} must be a {expected} node")]
    ImitationKindMismatch {
        template: NodeId,
        expected: &'static str,
    },

    #[error("Node {0} cannot be its own original")]
    SelfImitation(NodeIndex),

    #[error("Node {0} is not a text node")]
    NotText(NodeIndex),

    #[error("Node {0} is not in a workspace")]
    NotInWorkspace(NodeIndex),

    #[error("Node {0} is deleted")]
    Deleted(NodeIndex),

    #[error("Contract violation in '{callback}': {message}")]
    ContractViolation { callback: String, message: String },

    #[error("Invalid operation: {0}")]
    InvalidOperation(String),
}
