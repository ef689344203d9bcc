//! Original/imitation links and their propagation
//!
//! An imitation mirrors its original: it is created from the template the
//! original maps to the imitation tag, it follows structural replacements
//! made below the original, and it disappears with the original.
//!
//! Invariants kept by every operation here:
//!
//! - a node is an imitation iff its `original` is set
//! - a node is never its own original
//! - `original(A) == B` implies `imitations(B)` contains `A`

use crate::behavior::{CauseOfDeletion, ChildReplaced};
use crate::errors::{ModelError, ModelResult};
use crate::ids::{ImitationConnectionPos, ImitationId, NodeIndex};
use crate::imitation_builder::ImitationBuilder;
use crate::model::NodeModel;
use crate::node::{NodeKind, State};
use crate::template::NodeTemplateKind;
use crate::undo_log::{Command, UndoLog};
use tracing::debug;

impl NodeModel {
    pub fn is_imitation(&self, node: NodeIndex) -> bool {
        self.node(node).is_imitation()
    }

    pub fn original(&self, node: NodeIndex) -> Option<NodeIndex> {
        self.node(node).original()
    }

    pub fn imitations(&self, node: NodeIndex) -> &[NodeIndex] {
        self.node(node).imitations()
    }

    /// Whether the node has an imitation template for `tag`
    pub fn imitation_exists(&self, node: NodeIndex, tag: &ImitationId) -> bool {
        self.node(node)
            .imitation_info()
            .is_some_and(|info| info.imitation_node_id(tag).is_some())
    }

    pub fn add_imitation(
        &mut self,
        original: NodeIndex,
        imitation: NodeIndex,
        log: &mut UndoLog,
    ) -> ModelResult<()> {
        self.check_node(imitation)?;
        self.check_node(original)?;
        let info = self
            .node_mut(original)
            .imitation_info_mut()
            .ok_or(ModelError::NotImitatable(original))?;
        let index = info.imitations.len();
        info.imitations.push(imitation);
        log.record(Command::InsertImitation {
            original,
            imitation,
            index,
        });
        Ok(())
    }

    pub fn remove_imitation(
        &mut self,
        original: NodeIndex,
        imitation: NodeIndex,
        log: &mut UndoLog,
    ) -> ModelResult<()> {
        self.check_node(original)?;
        let info = self
            .node_mut(original)
            .imitation_info_mut()
            .ok_or(ModelError::NotImitatable(original))?;
        if let Some(index) = info.imitations.iter().position(|entry| *entry == imitation) {
            info.imitations.remove(index);
            log.record(Command::RemoveImitation {
                original,
                imitation,
                index,
            });
        }
        Ok(())
    }

    pub fn set_original(
        &mut self,
        node: NodeIndex,
        original: Option<NodeIndex>,
        log: &mut UndoLog,
    ) -> ModelResult<()> {
        self.check_node(node)?;
        if original == Some(node) {
            return Err(ModelError::SelfImitation(node));
        }
        let info = self
            .node_mut(node)
            .imitation_info_mut()
            .ok_or(ModelError::NotImitatable(node))?;
        let previous = info.original;
        info.original = original;
        log.record(Command::SetOriginal {
            node,
            previous,
            next: original,
        });
        Ok(())
    }

    /// Sever the link between an original and one of its imitations
    pub fn disconnect_imitation(
        &mut self,
        original: NodeIndex,
        imitation: NodeIndex,
        log: &mut UndoLog,
    ) -> ModelResult<()> {
        self.remove_imitation(original, imitation, log)?;
        self.set_original(imitation, None, log)
    }

    /// Instantiate the imitation template mapped to `tag` and link it.
    ///
    /// The imitation must be the same kind of node as its original. A text
    /// imitation starts with the original's text.
    pub fn create_imit_node(
        &mut self,
        node: NodeIndex,
        tag: &ImitationId,
        log: &mut UndoLog,
    ) -> ModelResult<NodeIndex> {
        self.check_node(node)?;
        let info = self
            .node(node)
            .imitation_info()
            .ok_or(ModelError::NotImitatable(node))?;
        let template_id = info
            .imitation_node_id(tag)
            .ok_or_else(|| ModelError::NoImitationForTag {
                node,
                tag: tag.to_string(),
            })?
            .clone();

        let expected = self.node(node).kind().name();
        let template = self
            .templates
            .node(&template_id)
            .ok_or_else(|| ModelError::TemplateNotFound(template_id.clone()))?;
        let matches = matches!(
            (&self.node(node).kind, &template.kind),
            (NodeKind::Connective { .. }, NodeTemplateKind::Connective { .. })
                | (NodeKind::Text { .. }, NodeTemplateKind::Text { .. })
        );
        if !matches {
            return Err(ModelError::ImitationKindMismatch {
                template: template_id,
                expected,
            });
        }

        let imitation = self.create_node(&template_id)?;
        if let Some(text) = self.node(node).text().map(str::to_string) {
            self.raw_set_text(imitation, text);
        }
        self.set_original(imitation, Some(node), log)?;
        self.add_imitation(node, imitation, log)?;
        debug!(original = %node, %imitation, %tag, "Imitation created");
        Ok(imitation)
    }

    /// Delete every imitation of `node`.
    ///
    /// Attached imitations are told first with cause
    /// [`CauseOfDeletion::InfluenceOfOriginalDeletion`]. Imitations that are
    /// already outside any workspace only lose their link; attached ones are
    /// structurally deleted and the parent of their filler is told about the
    /// swap.
    pub fn delete_all_imitations(&mut self, node: NodeIndex, log: &mut UndoLog) -> ModelResult<()> {
        self.check_node(node)?;
        for imitation in self.imitations(node).to_vec() {
            if self.state(imitation) != State::Deleted {
                self.notify_deletion_requested(
                    imitation,
                    &[imitation],
                    CauseOfDeletion::InfluenceOfOriginalDeletion,
                    log,
                )?;
            }
        }

        while let Some(&imitation) = self.imitations(node).first() {
            if self.state(imitation) == State::Deleted {
                self.disconnect_imitation(node, imitation, log)?;
                continue;
            }

            let connector = self.node(imitation).parent_connector;
            if let Some(filler) = self.delete_node(imitation, log)? {
                if let (Some(parent), Some(connector)) = (self.find_parent_node(filler), connector) {
                    let event = ChildReplaced {
                        old_child: imitation,
                        new_child: filler,
                        connector,
                    };
                    self.notify_child_replaced(parent, event, log)?;
                }
            }

            // A behavior may have relinked it during deletion
            if self.imitations(node).first() == Some(&imitation) {
                self.disconnect_imitation(node, imitation, log)?;
            }
        }
        Ok(())
    }

    /// First node below `parent_imitation` whose connector carries `pos`
    pub(crate) fn find_imitation_child(
        &self,
        parent_imitation: NodeIndex,
        pos: &ImitationConnectionPos,
    ) -> Option<NodeIndex> {
        if pos.is_none() {
            return None;
        }
        let mut pending: Vec<_> = self.node(parent_imitation).connectors().iter().rev().copied().collect();
        while let Some(connector) = pending.pop() {
            let slot = self.connector(connector);
            let Some(child) = slot.connected else {
                continue;
            };
            if slot.imitation_connection_pos == *pos {
                return Some(child);
            }
            pending.extend(self.node(child).connectors().iter().rev().copied());
        }
        None
    }

    /// Repeat the replacement of `old` by `new` in every imitation of
    /// `new`'s parent
    pub(crate) fn mirror_replacement(
        &mut self,
        new: NodeIndex,
        old: NodeIndex,
        log: &mut UndoLog,
    ) -> ModelResult<()> {
        let Some(connector) = self.node(new).parent_connector else {
            return Ok(());
        };
        let parent = self.connector(connector).parent;
        let parent_imitations = self.imitations(parent).to_vec();
        if parent_imitations.is_empty() {
            return Ok(());
        }
        let pos = self.connector(connector).imitation_connection_pos.clone();
        let tag = self.find_imitation_id(connector);

        for parent_imitation in parent_imitations {
            let Some(old_imitation) = self.find_imitation_child(parent_imitation, &pos) else {
                debug!(%parent_imitation, %pos, "No placeholder to mirror into");
                continue;
            };

            if self.imitation_exists(new, &tag) {
                let Some(new_imitation) = ImitationBuilder::build_auto(self, new, log)? else {
                    continue;
                };
                self.replace(old_imitation, new_imitation, log)?;
            } else if !self.node(old_imitation).is_default_node {
                self.remove(old_imitation, log)?;
            } else {
                continue;
            }
            debug!(%parent_imitation, replaced = %old_imitation, mirrored = %old, "Replacement mirrored");
            self.discard(old_imitation, log)?;
        }
        Ok(())
    }
}
