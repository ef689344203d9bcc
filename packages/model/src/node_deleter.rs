//! Subtree deletion traversal

use crate::errors::ModelResult;
use crate::ids::NodeIndex;
use crate::model::NodeModel;
use crate::undo_log::UndoLog;
use crate::visitor::{walk_connective, ModelVisitor};

/// Severs the imitation links of a subtree and deletes the imitations of
/// every node in it.
///
/// Per node, parents before children:
/// 1. the view drops it from the paste candidates
/// 2. if it is an imitation, its original forgets it
/// 3. its children are processed
/// 4. all of its own imitations are deleted
pub(crate) struct NodeDeleter<'log> {
    log: &'log mut UndoLog,
}

impl<'log> NodeDeleter<'log> {
    pub(crate) fn delete(model: &mut NodeModel, node: NodeIndex, log: &'log mut UndoLog) -> ModelResult<()> {
        NodeDeleter { log }.visit_node(model, node)
    }

    fn sever_from_original(&mut self, model: &mut NodeModel, node: NodeIndex) -> ModelResult<()> {
        match model.original(node) {
            Some(original) => model.disconnect_imitation(original, node, self.log),
            None => Ok(()),
        }
    }
}

impl ModelVisitor for NodeDeleter<'_> {
    fn visit_connective(&mut self, model: &mut NodeModel, node: NodeIndex) -> ModelResult<()> {
        model.notify_remove_paste_candidate(node);
        self.sever_from_original(model, node)?;
        walk_connective(self, model, node)?;
        model.delete_all_imitations(node, self.log)
    }

    fn visit_text(&mut self, model: &mut NodeModel, node: NodeIndex) -> ModelResult<()> {
        model.notify_remove_paste_candidate(node);
        self.sever_from_original(model, node)?;
        model.delete_all_imitations(node, self.log)
    }

    fn visit_void(&mut self, model: &mut NodeModel, node: NodeIndex) -> ModelResult<()> {
        model.notify_remove_paste_candidate(node);
        Ok(())
    }
}
