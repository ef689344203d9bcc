//! # Undo/Redo Log
//!
//! Records every primitive model mutation so it can be rolled back exactly.
//!
//! ## Design
//!
//! - Each primitive mutation is a [`Command`] holding both the previous and
//!   the new value of the field it touches
//! - Undo applies the inverse of every command of a batch in reverse order
//! - Redo re-applies the commands in their original order
//! - New commands clear the redo stack
//! - Batches group all commands of one user operation into one undo step;
//!   batches may nest, only the outermost one produces an undo step
//!
//! ## Example
//!
//! ```rust,ignore
//! let mut log = UndoLog::new();
//!
//! log.begin_batch();
//! log.set_batch_description("Delete node");
//! model.delete_node(node, &mut log)?;
//! log.end_batch();
//!
//! log.undo(&mut model);
//! log.redo(&mut model);
//! ```

use crate::ids::{ConnectorIndex, NodeIndex, WorkspaceIndex};
use crate::model::NodeModel;
use tracing::{debug, warn};

/// One reversible primitive mutation
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Connector content changed from `previous` to `next`
    ConnectNode {
        connector: ConnectorIndex,
        previous: Option<NodeIndex>,
        next: Option<NodeIndex>,
    },

    SetWorkspace {
        node: NodeIndex,
        previous: Option<WorkspaceIndex>,
        next: Option<WorkspaceIndex>,
    },

    SetLastReplaced {
        node: NodeIndex,
        previous: Option<NodeIndex>,
        next: Option<NodeIndex>,
    },

    SetDefaultNode {
        node: NodeIndex,
        previous: bool,
        next: bool,
    },

    SetText {
        node: NodeIndex,
        previous: String,
        next: String,
    },

    SetOriginal {
        node: NodeIndex,
        previous: Option<NodeIndex>,
        next: Option<NodeIndex>,
    },

    InsertImitation {
        original: NodeIndex,
        imitation: NodeIndex,
        index: usize,
    },

    RemoveImitation {
        original: NodeIndex,
        imitation: NodeIndex,
        index: usize,
    },

    InsertRoot {
        workspace: WorkspaceIndex,
        node: NodeIndex,
        index: usize,
    },

    RemoveRoot {
        workspace: WorkspaceIndex,
        node: NodeIndex,
        index: usize,
    },

    Select {
        workspace: WorkspaceIndex,
        node: NodeIndex,
        index: usize,
    },

    Deselect {
        workspace: WorkspaceIndex,
        node: NodeIndex,
        index: usize,
    },
}

impl Command {
    /// The command that undoes this one
    pub fn inverse(&self) -> Command {
        match self.clone() {
            Command::ConnectNode { connector, previous, next } => Command::ConnectNode {
                connector,
                previous: next,
                next: previous,
            },
            Command::SetWorkspace { node, previous, next } => Command::SetWorkspace {
                node,
                previous: next,
                next: previous,
            },
            Command::SetLastReplaced { node, previous, next } => Command::SetLastReplaced {
                node,
                previous: next,
                next: previous,
            },
            Command::SetDefaultNode { node, previous, next } => Command::SetDefaultNode {
                node,
                previous: next,
                next: previous,
            },
            Command::SetText { node, previous, next } => Command::SetText {
                node,
                previous: next,
                next: previous,
            },
            Command::SetOriginal { node, previous, next } => Command::SetOriginal {
                node,
                previous: next,
                next: previous,
            },
            Command::InsertImitation { original, imitation, index } => Command::RemoveImitation {
                original,
                imitation,
                index,
            },
            Command::RemoveImitation { original, imitation, index } => Command::InsertImitation {
                original,
                imitation,
                index,
            },
            Command::InsertRoot { workspace, node, index } => Command::RemoveRoot {
                workspace,
                node,
                index,
            },
            Command::RemoveRoot { workspace, node, index } => Command::InsertRoot {
                workspace,
                node,
                index,
            },
            Command::Select { workspace, node, index } => Command::Deselect {
                workspace,
                node,
                index,
            },
            Command::Deselect { workspace, node, index } => Command::Select {
                workspace,
                node,
                index,
            },
        }
    }

    /// Apply this command to the model without recording anything
    pub fn apply(&self, model: &mut NodeModel) {
        match self {
            Command::ConnectNode { connector, next, .. } => {
                model.raw_connect(*connector, *next);
            }
            Command::SetWorkspace { node, next, .. } => {
                model.node_mut(*node).workspace = *next;
            }
            Command::SetLastReplaced { node, next, .. } => {
                model.node_mut(*node).last_replaced = *next;
            }
            Command::SetDefaultNode { node, next, .. } => {
                model.node_mut(*node).is_default_node = *next;
            }
            Command::SetText { node, next, .. } => {
                model.raw_set_text(*node, next.clone());
            }
            Command::SetOriginal { node, next, .. } => {
                if let Some(info) = model.node_mut(*node).imitation_info_mut() {
                    info.original = *next;
                }
            }
            Command::InsertImitation { original, imitation, index } => {
                if let Some(info) = model.node_mut(*original).imitation_info_mut() {
                    let index = (*index).min(info.imitations.len());
                    info.imitations.insert(index, *imitation);
                }
            }
            Command::RemoveImitation { original, imitation, index } => {
                if let Some(info) = model.node_mut(*original).imitation_info_mut() {
                    remove_entry(&mut info.imitations, *imitation, *index);
                }
            }
            Command::InsertRoot { workspace, node, index } => {
                let roots = &mut model.workspace_mut(*workspace).roots;
                let index = (*index).min(roots.len());
                roots.insert(index, *node);
            }
            Command::RemoveRoot { workspace, node, index } => {
                remove_entry(&mut model.workspace_mut(*workspace).roots, *node, *index);
            }
            Command::Select { workspace, node, index } => {
                let selected = &mut model.workspace_mut(*workspace).selected;
                let index = (*index).min(selected.len());
                selected.insert(index, *node);
            }
            Command::Deselect { workspace, node, index } => {
                remove_entry(&mut model.workspace_mut(*workspace).selected, *node, *index);
            }
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Command::ConnectNode { .. } => "ConnectNode",
            Command::SetWorkspace { .. } => "SetWorkspace",
            Command::SetLastReplaced { .. } => "SetLastReplaced",
            Command::SetDefaultNode { .. } => "SetDefaultNode",
            Command::SetText { .. } => "SetText",
            Command::SetOriginal { .. } => "SetOriginal",
            Command::InsertImitation { .. } => "InsertImitation",
            Command::RemoveImitation { .. } => "RemoveImitation",
            Command::InsertRoot { .. } => "InsertRoot",
            Command::RemoveRoot { .. } => "RemoveRoot",
            Command::Select { .. } => "Select",
            Command::Deselect { .. } => "Deselect",
        }
    }
}

/// Removes `item` at `index`, or wherever it is if the list has drifted
fn remove_entry<T: PartialEq + Copy>(list: &mut Vec<T>, item: T, index: usize) {
    if list.get(index) == Some(&item) {
        list.remove(index);
    } else if let Some(pos) = list.iter().position(|entry| *entry == item) {
        list.remove(pos);
    }
}

/// A group of commands that are undone/redone together
#[derive(Debug, Clone, Default)]
pub struct CommandBatch {
    /// The commands in this batch (in application order)
    pub commands: Vec<Command>,

    /// Optional description of this batch
    pub description: Option<String>,
}

impl CommandBatch {
    pub fn single(command: Command) -> Self {
        Self {
            commands: vec![command],
            description: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

/// Undo/redo history of model mutations
#[derive(Debug)]
pub struct UndoLog {
    /// Stack of applied batches (most recent last)
    undo_stack: Vec<CommandBatch>,

    /// Stack of undone batches (most recent last)
    redo_stack: Vec<CommandBatch>,

    /// Maximum number of undo levels (0 = unlimited)
    max_levels: usize,

    /// Batch being recorded and its nesting depth
    current_batch: Option<CommandBatch>,
    batch_depth: usize,
}

impl UndoLog {
    /// Create a log with the default max levels (100)
    pub fn new() -> Self {
        Self::with_max_levels(100)
    }

    pub fn with_max_levels(max_levels: usize) -> Self {
        Self {
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
            max_levels,
            current_batch: None,
            batch_depth: 0,
        }
    }

    /// Record a command that has already been applied to the model
    pub fn record(&mut self, command: Command) {
        if let Some(batch) = &mut self.current_batch {
            batch.commands.push(command);
        } else {
            self.push_batch(CommandBatch::single(command));
        }
    }

    /// Start a batch of commands (undone/redone together)
    pub fn begin_batch(&mut self) {
        if self.batch_depth == 0 {
            self.current_batch = Some(CommandBatch::default());
        }
        self.batch_depth += 1;
    }

    /// End the current batch. The outermost call pushes it to the undo stack.
    pub fn end_batch(&mut self) {
        if self.batch_depth == 0 {
            return;
        }
        self.batch_depth -= 1;
        if self.batch_depth > 0 {
            return;
        }
        if let Some(batch) = self.current_batch.take() {
            if !batch.is_empty() {
                self.push_batch(batch);
            }
        }
    }

    /// Set description for current batch (if batching)
    pub fn set_batch_description(&mut self, description: impl Into<String>) {
        if let Some(batch) = &mut self.current_batch {
            batch.description = Some(description.into());
        }
    }

    pub fn is_batching(&self) -> bool {
        self.current_batch.is_some()
    }

    /// Number of commands recorded in the open batch
    pub fn pending_commands(&self) -> usize {
        self.current_batch.as_ref().map_or(0, CommandBatch::len)
    }

    fn push_batch(&mut self, batch: CommandBatch) {
        debug!(commands = batch.len(), description = ?batch.description, "Recording undo step");
        self.undo_stack.push(batch);

        if self.max_levels > 0 && self.undo_stack.len() > self.max_levels {
            self.undo_stack.remove(0);
        }

        // A new action invalidates the undone future
        self.redo_stack.clear();
    }

    fn close_open_batch(&mut self) {
        if self.current_batch.is_some() {
            warn!(depth = self.batch_depth, "Undo/redo requested with an open batch, closing it");
            self.batch_depth = 1;
            self.end_batch();
        }
    }

    /// Undo the most recent batch. Returns false if there was nothing to undo.
    pub fn undo(&mut self, model: &mut NodeModel) -> bool {
        self.close_open_batch();
        let Some(batch) = self.undo_stack.pop() else {
            return false;
        };

        for command in batch.commands.iter().rev() {
            command.inverse().apply(model);
        }
        debug!(commands = batch.len(), "Undid batch");
        self.redo_stack.push(batch);
        true
    }

    /// Redo the most recently undone batch. Returns false if there was nothing to redo.
    pub fn redo(&mut self, model: &mut NodeModel) -> bool {
        self.close_open_batch();
        let Some(batch) = self.redo_stack.pop() else {
            return false;
        };

        for command in &batch.commands {
            command.apply(model);
        }
        debug!(commands = batch.len(), "Redid batch");
        self.undo_stack.push(batch);
        true
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn undo_levels(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn redo_levels(&self) -> usize {
        self.redo_stack.len()
    }

    /// Clear all undo/redo history
    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
        self.current_batch = None;
        self.batch_depth = 0;
    }

    pub fn undo_description(&self) -> Option<&str> {
        self.undo_stack
            .last()
            .and_then(|batch| batch.description.as_deref())
    }

    pub fn redo_description(&self) -> Option<&str> {
        self.redo_stack
            .last()
            .and_then(|batch| batch.description.as_deref())
    }

    /// The most recent undo step, if any
    pub fn last_batch(&self) -> Option<&CommandBatch> {
        self.undo_stack.last()
    }
}

impl Default for UndoLog {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::{NodeTemplate, TemplateRegistry};
    use crate::NodeId;
    use std::sync::Arc;

    fn text_model() -> (NodeModel, NodeIndex) {
        let templates = TemplateRegistry::new().with_node(NodeTemplate::text("idText", "v0"));
        let mut model = NodeModel::new(Arc::new(templates));
        let node = model.create_node(&NodeId::from("idText")).unwrap();
        (model, node)
    }

    #[test]
    fn test_undo_log_creation() {
        let log = UndoLog::new();
        assert_eq!(log.undo_levels(), 0);
        assert_eq!(log.redo_levels(), 0);
        assert!(!log.can_undo());
        assert!(!log.can_redo());
    }

    #[test]
    fn test_inverse_round_trips() {
        let command = Command::InsertRoot {
            workspace: WorkspaceIndex(0),
            node: NodeIndex(4),
            index: 2,
        };
        assert!(matches!(command.inverse(), Command::RemoveRoot { index: 2, .. }));
        assert_eq!(command.inverse().inverse(), command);
    }

    #[test]
    fn test_apply_and_undo_text_change() {
        let (mut model, node) = text_model();
        let mut log = UndoLog::new();

        model.set_text(node, "v1", &mut log).unwrap();
        assert_eq!(model.text(node), Some("v1"));
        assert_eq!(log.undo_levels(), 1);

        assert!(log.undo(&mut model));
        assert_eq!(model.text(node), Some("v0"));
        assert!(log.can_redo());

        assert!(log.redo(&mut model));
        assert_eq!(model.text(node), Some("v1"));
        assert_eq!(log.redo_levels(), 0);
    }

    #[test]
    fn test_batched_commands() {
        let (mut model, node) = text_model();
        let mut log = UndoLog::new();

        log.begin_batch();
        log.set_batch_description("Rename");
        model.set_text(node, "v1", &mut log).unwrap();
        model.set_text(node, "v2", &mut log).unwrap();
        log.end_batch();

        assert_eq!(log.undo_levels(), 1);
        assert_eq!(log.undo_description(), Some("Rename"));
        assert_eq!(log.last_batch().map(CommandBatch::len), Some(2));

        log.undo(&mut model);
        assert_eq!(model.text(node), Some("v0"));
        assert_eq!(log.redo_description(), Some("Rename"));
    }

    #[test]
    fn test_nested_batches_make_one_step() {
        let (mut model, node) = text_model();
        let mut log = UndoLog::new();

        log.begin_batch();
        model.set_text(node, "v1", &mut log).unwrap();
        log.begin_batch();
        model.set_text(node, "v2", &mut log).unwrap();
        log.end_batch();
        assert!(log.is_batching());
        assert_eq!(log.pending_commands(), 2);
        log.end_batch();

        assert!(!log.is_batching());
        assert_eq!(log.undo_levels(), 1);
    }

    #[test]
    fn test_empty_batch_is_dropped() {
        let mut log = UndoLog::new();
        log.begin_batch();
        log.end_batch();
        log.end_batch();
        assert_eq!(log.undo_levels(), 0);
    }

    #[test]
    fn test_new_command_clears_redo() {
        let (mut model, node) = text_model();
        let mut log = UndoLog::new();

        model.set_text(node, "v1", &mut log).unwrap();
        log.undo(&mut model);
        assert_eq!(log.redo_levels(), 1);

        model.set_text(node, "v2", &mut log).unwrap();
        assert_eq!(log.redo_levels(), 0);
    }

    #[test]
    fn test_max_levels_enforced() {
        let (mut model, node) = text_model();
        let mut log = UndoLog::with_max_levels(2);

        for i in 0..3 {
            model.set_text(node, format!("v{}", i + 1), &mut log).unwrap();
        }
        assert_eq!(log.undo_levels(), 2);

        log.undo(&mut model);
        log.undo(&mut model);
        assert!(!log.undo(&mut model));
        assert_eq!(model.text(node), Some("v1"));
    }

    #[test]
    fn test_undo_closes_open_batch() {
        let (mut model, node) = text_model();
        let mut log = UndoLog::new();

        log.begin_batch();
        model.set_text(node, "v1", &mut log).unwrap();
        assert!(log.undo(&mut model));
        assert_eq!(model.text(node), Some("v0"));
        assert!(!log.is_batching());
    }
}
