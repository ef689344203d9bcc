//! User-level node operations
//!
//! Each operation composes the primitives of the model and records every
//! change in the given [`UndoLog`]. Operations that change more than one
//! field run inside a batch of their own, so a single `undo` reverts the
//! whole operation. Batches nest: an operation started inside a caller's
//! batch becomes part of it.

use crate::behavior::{CauseOfDeletion, ChildReplaced, MovedToChild, MovedToWorkspace};
use crate::errors::{ModelError, ModelResult};
use crate::ids::{ImitationId, NodeIndex, WorkspaceIndex};
use crate::imitation_builder::ImitationBuilder;
use crate::model::NodeModel;
use crate::node::State;
use crate::node_deleter::NodeDeleter;
use crate::undo_log::{Command, UndoLog};
use tracing::{debug, instrument};

/// A node removed by [`NodeModel::delete_nodes`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Deletion {
    pub node: NodeIndex,
    /// Default node put in its place, when it was a child
    pub filler: Option<NodeIndex>,
}

impl NodeModel {
    /// Run `operation` as one undo step
    fn batched<T>(
        &mut self,
        log: &mut UndoLog,
        operation: impl FnOnce(&mut Self, &mut UndoLog) -> ModelResult<T>,
    ) -> ModelResult<T> {
        log.begin_batch();
        let result = operation(self, log);
        log.end_batch();
        result
    }

    /// Register a root node in a workspace, moving its subtree there
    #[instrument(skip(self, log))]
    pub fn add_root_node(
        &mut self,
        workspace: WorkspaceIndex,
        node: NodeIndex,
        log: &mut UndoLog,
    ) -> ModelResult<()> {
        self.check_workspace(workspace)?;
        self.check_node(node)?;
        if let Some(connector) = self.node(node).parent_connector {
            return Err(ModelError::AlreadyConnected { node, connector });
        }

        self.batched(log, |model, log| {
            if model.state(node) == State::RootDirectlyUnderWorkspace {
                model.remove_root_node(node, log)?;
            }
            model.set_workspace_recursive(node, Some(workspace), log);
            let index = model.workspace(workspace).roots.len();
            model.workspace_mut(workspace).roots.push(node);
            log.record(Command::InsertRoot {
                workspace,
                node,
                index,
            });
            Ok(())
        })
    }

    /// Unregister a root node. The subtree stays in the workspace, dangling.
    #[instrument(skip(self, log))]
    pub fn remove_root_node(&mut self, node: NodeIndex, log: &mut UndoLog) -> ModelResult<()> {
        self.check_node(node)?;
        let workspace = self.node(node).workspace.ok_or(ModelError::NotInWorkspace(node))?;
        let roots = &mut self.workspace_mut(workspace).roots;
        let index = roots
            .iter()
            .position(|root| *root == node)
            .ok_or_else(|| ModelError::InvalidOperation(format!("{node} is not a root of {workspace}")))?;
        roots.remove(index);
        log.record(Command::RemoveRoot {
            workspace,
            node,
            index,
        });
        Ok(())
    }

    /// Put a node on a workspace as a root.
    ///
    /// A child is detached first and a default node takes its place; the
    /// filler is returned.
    #[instrument(skip(self, log))]
    pub fn move_to_workspace(
        &mut self,
        workspace: WorkspaceIndex,
        node: NodeIndex,
        log: &mut UndoLog,
    ) -> ModelResult<Option<NodeIndex>> {
        self.check_workspace(workspace)?;
        self.check_node(node)?;
        match self.state(node) {
            State::Deleted => Err(ModelError::Deleted(node)),
            State::RootDirectlyUnderWorkspace | State::RootDangling => {
                self.add_root_node(workspace, node, log)?;
                Ok(None)
            }
            State::Child => {
                let connector = self.node(node).parent_connector.ok_or(ModelError::NotAChild(node))?;
                let old_parent = self.connector(connector).parent;
                let old_root = self.find_root_node(node);

                self.batched(log, |model, log| {
                    let filler = model.remove(node, log)?;
                    model.add_root_node(workspace, node, log)?;

                    let moved = MovedToWorkspace {
                        old_parent,
                        old_root,
                        new_replaced: filler,
                        manually_removed: true,
                    };
                    model.notify_moved_to_workspace(node, moved, log)?;
                    let replaced = ChildReplaced {
                        old_child: node,
                        new_child: filler,
                        connector,
                    };
                    model.notify_child_replaced(old_parent, replaced, log)?;
                    Ok(Some(filler))
                })
            }
        }
    }

    /// Drop `new_node` onto the place of `old_child`.
    ///
    /// The displaced child moves to the workspace, or is deleted if it was
    /// only a default filler.
    #[instrument(skip(self, log))]
    pub fn replace_child(
        &mut self,
        old_child: NodeIndex,
        new_node: NodeIndex,
        log: &mut UndoLog,
    ) -> ModelResult<()> {
        self.check_node(old_child)?;
        self.check_node(new_node)?;
        let connector = self
            .node(old_child)
            .parent_connector
            .ok_or(ModelError::NotAChild(old_child))?;
        let parent = self.connector(connector).parent;
        let old_root = self.find_root_node(old_child);

        self.batched(log, |model, log| {
            model.replace(old_child, new_node, log)?;

            let moved = MovedToChild {
                old_parent: None,
                old_root: new_node,
                old_replaced: old_child,
            };
            model.notify_moved_to_child(new_node, moved, log)?;

            if model.node(old_child).is_default_node {
                model.delete_node(old_child, log)?;
            } else if let Some(workspace) = model.node(old_child).workspace {
                model.add_root_node(workspace, old_child, log)?;
                let moved = MovedToWorkspace {
                    old_parent: parent,
                    old_root,
                    new_replaced: new_node,
                    manually_removed: false,
                };
                model.notify_moved_to_workspace(old_child, moved, log)?;
            }

            let replaced = ChildReplaced {
                old_child,
                new_child: new_node,
                connector,
            };
            model.notify_child_replaced(parent, replaced, log)
        })
    }

    /// Swap the places of two nodes.
    ///
    /// Two children trade connectors; a child and a root trade as in
    /// [`NodeModel::replace_child`].
    #[instrument(skip(self, log))]
    pub fn exchange_nodes(&mut self, a: NodeIndex, b: NodeIndex, log: &mut UndoLog) -> ModelResult<()> {
        self.check_node(a)?;
        self.check_node(b)?;
        if a == b {
            return Ok(());
        }
        if self.is_descendant_of(a, b) || self.is_descendant_of(b, a) {
            return Err(ModelError::InvalidOperation(format!(
                "{a} and {b} are in the same branch"
            )));
        }

        match (self.state(a), self.state(b)) {
            (State::Child, State::Child) => self.batched(log, |model, log| model.exchange_children(a, b, log)),
            (State::Child, State::RootDirectlyUnderWorkspace) => self.replace_child(a, b, log),
            (State::RootDirectlyUnderWorkspace, State::Child) => self.replace_child(b, a, log),
            (state_a, state_b) => Err(ModelError::InvalidOperation(format!(
                "cannot exchange {a} ({state_a:?}) with {b} ({state_b:?})"
            ))),
        }
    }

    fn exchange_children(&mut self, a: NodeIndex, b: NodeIndex, log: &mut UndoLog) -> ModelResult<()> {
        let (connector_a, connector_b) = match (self.node(a).parent_connector, self.node(b).parent_connector) {
            (Some(connector_a), Some(connector_b)) => (connector_a, connector_b),
            _ => return Err(ModelError::NotAChild(a)),
        };
        let parent_a = self.connector(connector_a).parent;
        let parent_b = self.connector(connector_b).parent;
        let root_a = self.find_root_node(a);
        let root_b = self.find_root_node(b);

        let placeholder_id = self.connector(connector_a).default_node_id.clone();
        let placeholder = self.create_node(&placeholder_id)?;
        self.replace(a, placeholder, log)?;
        self.replace(b, a, log)?;
        self.replace(placeholder, b, log)?;
        self.discard(placeholder, log)?;

        self.notify_moved_to_child(
            a,
            MovedToChild {
                old_parent: Some(parent_a),
                old_root: root_a,
                old_replaced: b,
            },
            log,
        )?;
        self.notify_moved_to_child(
            b,
            MovedToChild {
                old_parent: Some(parent_b),
                old_root: root_b,
                old_replaced: a,
            },
            log,
        )?;
        self.notify_child_replaced(
            parent_a,
            ChildReplaced {
                old_child: a,
                new_child: b,
                connector: connector_a,
            },
            log,
        )?;
        self.notify_child_replaced(
            parent_b,
            ChildReplaced {
                old_child: b,
                new_child: a,
                connector: connector_b,
            },
            log,
        )
    }

    /// Delete a node and its subtree.
    ///
    /// A child is first replaced by a default node, which is returned. Every
    /// imitation link in the subtree is severed and the imitations are
    /// deleted with it. Deleting a deleted node does nothing.
    #[instrument(skip(self, log))]
    pub fn delete_node(&mut self, node: NodeIndex, log: &mut UndoLog) -> ModelResult<Option<NodeIndex>> {
        self.check_node(node)?;
        if self.state(node) == State::Deleted {
            return Ok(None);
        }
        self.batched(log, |model, log| {
            let filler = match model.state(node) {
                State::Child => Some(model.remove(node, log)?),
                State::RootDirectlyUnderWorkspace => {
                    model.remove_root_node(node, log)?;
                    None
                }
                State::RootDangling | State::Deleted => None,
            };
            model.discard(node, log)?;
            Ok(filler)
        })
    }

    /// Take a detached subtree out of its workspace, then sever its links.
    ///
    /// Membership goes first, so imitations inside the subtree count as
    /// deleted while the links are cut and are not restructured or told
    /// about their own deletion.
    pub(crate) fn discard(&mut self, node: NodeIndex, log: &mut UndoLog) -> ModelResult<()> {
        for member in self.subtree(node) {
            if self.is_selected(member) {
                self.deselect_node(member, log)?;
            }
            self.set_workspace(member, None, log);
        }
        NodeDeleter::delete(self, node, log)?;
        debug!(%node, "Subtree discarded");
        Ok(())
    }

    /// Delete user-chosen nodes.
    ///
    /// Every candidate's behavior hears about the request first. Candidates
    /// already deleted as a consequence of an earlier one are skipped.
    #[instrument(skip(self, log), fields(count = nodes.len()))]
    pub fn delete_nodes(
        &mut self,
        nodes: &[NodeIndex],
        cause: CauseOfDeletion,
        log: &mut UndoLog,
    ) -> ModelResult<Vec<Deletion>> {
        for &node in nodes {
            self.check_node(node)?;
        }
        self.batched(log, |model, log| {
            for &node in nodes {
                if model.state(node) != State::Deleted {
                    model.notify_deletion_requested(node, nodes, cause, log)?;
                }
            }

            let mut deleted = Vec::new();
            for &node in nodes {
                if model.state(node) == State::Deleted {
                    continue;
                }
                let connector = model.node(node).parent_connector;
                let filler = model.delete_node(node, log)?;
                if let (Some(filler), Some(connector)) = (filler, connector) {
                    if let Some(parent) = model.find_parent_node(filler) {
                        let replaced = ChildReplaced {
                            old_child: node,
                            new_child: filler,
                            connector,
                        };
                        model.notify_child_replaced(parent, replaced, log)?;
                    }
                }
                deleted.push(Deletion { node, filler });
            }
            Ok(deleted)
        })
    }

    /// Create an imitation on user request and place it in the original's
    /// workspace
    #[instrument(skip(self, log))]
    pub fn create_imitation_manually(&mut self, node: NodeIndex, log: &mut UndoLog) -> ModelResult<NodeIndex> {
        self.check_node(node)?;
        let info = self
            .node(node)
            .imitation_info()
            .ok_or(ModelError::NotImitatable(node))?;
        if !info.can_create_manually() {
            return Err(ModelError::NoImitationForTag {
                node,
                tag: ImitationId::MANUAL.to_string(),
            });
        }
        let workspace = self.node(node).workspace.ok_or(ModelError::NotInWorkspace(node))?;

        self.batched(log, |model, log| {
            let imitation = ImitationBuilder::build_manual(model, node, log)?.ok_or_else(|| {
                ModelError::NoImitationForTag {
                    node,
                    tag: ImitationId::MANUAL.to_string(),
                }
            })?;
            model.add_root_node(workspace, imitation, log)?;
            Ok(imitation)
        })
    }

    /// Delete every node of a workspace whose syntax checker reports an error
    #[instrument(skip(self, log))]
    pub fn delete_syntax_error_nodes(
        &mut self,
        workspace: WorkspaceIndex,
        log: &mut UndoLog,
    ) -> ModelResult<Vec<Deletion>> {
        self.check_workspace(workspace)?;
        let mut candidates = Vec::new();
        for root in self.workspace(workspace).roots.clone() {
            for node in self.subtree(root) {
                if self.has_syntax_error(node)? {
                    candidates.push(node);
                }
            }
        }
        debug!(count = candidates.len(), "Syntax error nodes found");
        self.delete_nodes(&candidates, CauseOfDeletion::SyntaxError, log)
    }

    pub fn select_node(&mut self, node: NodeIndex, log: &mut UndoLog) -> ModelResult<()> {
        self.check_node(node)?;
        let workspace = self.node(node).workspace.ok_or(ModelError::NotInWorkspace(node))?;
        let selected = &mut self.workspace_mut(workspace).selected;
        if selected.contains(&node) {
            return Ok(());
        }
        let index = selected.len();
        selected.push(node);
        log.record(Command::Select {
            workspace,
            node,
            index,
        });
        Ok(())
    }

    pub fn deselect_node(&mut self, node: NodeIndex, log: &mut UndoLog) -> ModelResult<()> {
        self.check_node(node)?;
        let Some(workspace) = self.node(node).workspace else {
            return Ok(());
        };
        let selected = &mut self.workspace_mut(workspace).selected;
        if let Some(index) = selected.iter().position(|entry| *entry == node) {
            selected.remove(index);
            log.record(Command::Deselect {
                workspace,
                node,
                index,
            });
        }
        Ok(())
    }
}
