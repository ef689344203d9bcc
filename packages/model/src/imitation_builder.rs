//! Construction of imitation subtrees
//!
//! The builder walks an original depth-first, keeping a stack of the
//! imitations currently open. The root imitation is instantiated directly;
//! every descendant imitation replaces the placeholder that the parent
//! imitation's template reserves for it, found by the connection position of
//! the original's connector.

use crate::errors::ModelResult;
use crate::ids::{ImitationId, NodeIndex};
use crate::model::NodeModel;
use crate::undo_log::UndoLog;
use crate::visitor::{walk_connective, ModelVisitor};
use tracing::debug;

pub struct ImitationBuilder<'log> {
    log: &'log mut UndoLog,
    open: Vec<NodeIndex>,
    /// Tag for the root, used once
    root_tag: Option<ImitationId>,
    built: Option<NodeIndex>,
}

impl<'log> ImitationBuilder<'log> {
    /// Build with the tags inherited from the original's connectors
    pub fn build_auto(
        model: &mut NodeModel,
        node: NodeIndex,
        log: &'log mut UndoLog,
    ) -> ModelResult<Option<NodeIndex>> {
        Self::run(model, node, None, log)
    }

    /// Build the imitation a user asked for: the root uses the `MANUAL` tag
    pub fn build_manual(
        model: &mut NodeModel,
        node: NodeIndex,
        log: &'log mut UndoLog,
    ) -> ModelResult<Option<NodeIndex>> {
        Self::run(model, node, Some(ImitationId::MANUAL), log)
    }

    /// Build with an explicit tag for the root
    pub fn build_with_tag(
        model: &mut NodeModel,
        node: NodeIndex,
        tag: ImitationId,
        log: &'log mut UndoLog,
    ) -> ModelResult<Option<NodeIndex>> {
        Self::run(model, node, Some(tag), log)
    }

    fn run(
        model: &mut NodeModel,
        node: NodeIndex,
        root_tag: Option<ImitationId>,
        log: &'log mut UndoLog,
    ) -> ModelResult<Option<NodeIndex>> {
        model.check_node(node)?;
        let mut builder = ImitationBuilder {
            log,
            open: Vec::new(),
            root_tag,
            built: None,
        };
        builder.visit_node(model, node)?;
        Ok(builder.built)
    }

    fn resolve_tag(&mut self, model: &NodeModel, node: NodeIndex) -> ImitationId {
        if let Some(tag) = self.root_tag.take() {
            return tag;
        }
        match model.node(node).parent_connector() {
            Some(connector) => model.find_imitation_id(connector),
            None => ImitationId::NONE,
        }
    }

    /// Create the imitation of `node` and put it in place.
    ///
    /// Returns `None` when this branch has nothing to imitate.
    fn imitate(&mut self, model: &mut NodeModel, node: NodeIndex) -> ModelResult<Option<NodeIndex>> {
        let tag = self.resolve_tag(model, node);
        if !model.imitation_exists(node, &tag) {
            return Ok(None);
        }

        let Some(&parent_imitation) = self.open.last() else {
            let imitation = model.create_imit_node(node, &tag, self.log)?;
            self.built = Some(imitation);
            return Ok(Some(imitation));
        };

        let Some(connector) = model.node(node).parent_connector() else {
            return Ok(None);
        };
        let pos = model.connector(connector).imitation_connection_pos().clone();
        let Some(placeholder) = model.find_imitation_child(parent_imitation, &pos) else {
            debug!(original = %node, %parent_imitation, %pos, "No placeholder for imitation, skipping");
            return Ok(None);
        };

        let imitation = model.create_imit_node(node, &tag, self.log)?;
        model.replace(placeholder, imitation, self.log)?;
        model.discard(placeholder, self.log)?;
        Ok(Some(imitation))
    }
}

impl ModelVisitor for ImitationBuilder<'_> {
    fn visit_connective(&mut self, model: &mut NodeModel, node: NodeIndex) -> ModelResult<()> {
        if let Some(imitation) = self.imitate(model, node)? {
            self.open.push(imitation);
            walk_connective(self, model, node)?;
            self.open.pop();
        }
        Ok(())
    }

    fn visit_text(&mut self, model: &mut NodeModel, node: NodeIndex) -> ModelResult<()> {
        self.imitate(model, node).map(|_| ())
    }
}
