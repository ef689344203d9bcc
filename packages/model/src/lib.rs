//! # BunnyHop Model
//!
//! Node model engine of the BunnyHop visual programming editor.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │ templates: JSON definitions → registry      │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ model: arena of nodes, connectors, spaces   │
//! │  - Instantiate templates                    │
//! │  - Replace / remove / copy subtrees         │
//! │  - Keep imitations in step with originals   │
//! │  - Run node behaviors at mutation points    │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ undo log: every primitive change, batched   │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! ## Core Principles
//!
//! 1. **Handles, not pointers**: nodes refer to each other through arena
//!    indices that stay valid for the life of the model
//! 2. **State is derived**: root/child/deleted follows from the fields
//! 3. **Every change is logged**: undo restores field-for-field
//! 4. **Behaviors fail closed**: a failing hook counts as declined
//!
//! ## Usage
//!
//! ```rust,ignore
//! use bunnyhop_model::{NodeModel, TemplateRegistry, UndoLog, NodeId};
//! use std::sync::Arc;
//!
//! let templates = TemplateRegistry::load("templates.json")?;
//! let mut model = NodeModel::new(Arc::new(templates));
//! let mut log = UndoLog::new();
//!
//! let workspace = model.add_workspace("main");
//! let node = model.create_node(&NodeId::from("idVarDecl"))?;
//!
//! log.begin_batch();
//! model.add_root_node(workspace, node, &mut log)?;
//! let imitation = model.create_imitation_manually(node, &mut log)?;
//! log.end_batch();
//!
//! log.undo(&mut model);
//! ```

pub mod behavior;
pub mod connector;
pub mod errors;
mod handler;
mod hooks;
pub mod ids;
mod imitation;
pub mod imitation_builder;
pub mod model;
pub mod node;
mod node_deleter;
pub mod presentation;
pub mod symbol;
pub mod template;
pub mod undo_log;
pub mod visitor;
pub mod workspace;

pub use behavior::{
    BehaviorContext, BehaviorError, BehaviorRegistry, CauseOfDeletion, ChildReplaced,
    CopyDecision, CopyPredicate, MovedToChild, MovedToWorkspace, NodeBehavior, ScriptArg,
    ScriptArgs, ScriptFailure, ScriptHost, ScriptNames, ScriptValue, ScriptedBehavior,
};
pub use connector::Connector;
pub use errors::{ModelError, ModelResult};
pub use handler::Deletion;
pub use ids::{
    ConnectorId, ConnectorIndex, ImitationConnectionPos, ImitationId, NodeId, NodeIndex,
    WorkspaceIndex,
};
pub use imitation_builder::ImitationBuilder;
pub use model::{CopyFilter, NodeModel};
pub use node::{ImitationInfo, Node, NodeKind, State};
pub use presentation::{NoPresentation, PresentationEvent, PresentationHooks, RecordingPresentation};
pub use symbol::{symbol_matches, Symbol};
pub use template::{
    ConnectorSlot, ConnectorTemplate, NodeTemplate, NodeTemplateKind, TemplateError,
    TemplateRegistry,
};
pub use undo_log::{Command, CommandBatch, UndoLog};
pub use visitor::ModelVisitor;
pub use workspace::Workspace;
