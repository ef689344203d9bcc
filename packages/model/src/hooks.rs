//! Dispatch of behavior hooks and presentation notifications

use crate::behavior::{
    BehaviorContext, BehaviorError, CauseOfDeletion, ChildReplaced, CopyDecision, MovedToChild,
    MovedToWorkspace, NodeBehavior,
};
use crate::errors::{ModelError, ModelResult};
use crate::ids::{ConnectorIndex, NodeIndex};
use crate::model::NodeModel;
use crate::node::State;
use crate::undo_log::UndoLog;
use std::sync::Arc;
use tracing::{debug, warn};

/// Recover failures as "declined", escalate contract breaches
fn settle<T>(callback: &str, node: NodeIndex, result: Result<T, BehaviorError>) -> ModelResult<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(BehaviorError::Failed(message)) => {
            warn!(%node, callback, error = %message, "Behavior failed, treating as declined");
            Ok(None)
        }
        Err(err @ BehaviorError::WrongReturnType { .. }) => Err(ModelError::ContractViolation {
            callback: callback.to_string(),
            message: err.to_string(),
        }),
    }
}

impl NodeModel {
    fn lookup_behavior(&self, name: Option<&str>) -> Option<Arc<dyn NodeBehavior>> {
        let name = name?;
        let behavior = self.behaviors.get(name);
        if behavior.is_none() {
            debug!(behavior = name, "Behavior not registered");
        }
        behavior
    }

    pub(crate) fn node_behavior(&self, node: NodeIndex) -> Option<Arc<dyn NodeBehavior>> {
        self.lookup_behavior(self.node(node).behavior())
    }

    pub(crate) fn connector_behavior(&self, connector: ConnectorIndex) -> Option<Arc<dyn NodeBehavior>> {
        self.lookup_behavior(self.connector(connector).behavior())
    }

    pub(crate) fn notify_moved_to_child(
        &mut self,
        node: NodeIndex,
        event: MovedToChild,
        log: &mut UndoLog,
    ) -> ModelResult<()> {
        let Some(behavior) = self.node_behavior(node) else {
            return Ok(());
        };
        let mut ctx = BehaviorContext { model: self, log };
        let result = behavior.on_moved_to_child(&mut ctx, node, event);
        settle("on_moved_to_child", node, result).map(|_| ())
    }

    pub(crate) fn notify_moved_to_workspace(
        &mut self,
        node: NodeIndex,
        event: MovedToWorkspace,
        log: &mut UndoLog,
    ) -> ModelResult<()> {
        let Some(behavior) = self.node_behavior(node) else {
            return Ok(());
        };
        let mut ctx = BehaviorContext { model: self, log };
        let result = behavior.on_moved_from_child_to_ws(&mut ctx, node, event);
        settle("on_moved_from_child_to_ws", node, result).map(|_| ())
    }

    pub(crate) fn notify_deletion_requested(
        &mut self,
        node: NodeIndex,
        candidates: &[NodeIndex],
        cause: CauseOfDeletion,
        log: &mut UndoLog,
    ) -> ModelResult<()> {
        let Some(behavior) = self.node_behavior(node) else {
            return Ok(());
        };
        let mut ctx = BehaviorContext { model: self, log };
        let result = behavior.on_deletion_requested(&mut ctx, node, candidates, cause);
        settle("on_deletion_requested", node, result).map(|_| ())
    }

    /// Tell the parent's behavior and the view that a child was swapped
    pub(crate) fn notify_child_replaced(
        &mut self,
        parent: NodeIndex,
        event: ChildReplaced,
        log: &mut UndoLog,
    ) -> ModelResult<()> {
        if let Some(behavior) = self.node_behavior(parent) {
            let mut ctx = BehaviorContext { model: self, log };
            let result = behavior.on_child_replaced(&mut ctx, parent, event);
            settle("on_child_replaced", parent, result)?;
        }
        self.presentation
            .child_replaced(parent, event.old_child, event.new_child, event.connector);
        Ok(())
    }

    pub(crate) fn notify_remove_paste_candidate(&self, node: NodeIndex) {
        self.presentation.remove_paste_candidate(node);
    }

    /// Ask the node whether it agrees to be cut together with `candidates`.
    ///
    /// A failing behavior counts as a refusal.
    pub fn cut_requested(
        &mut self,
        node: NodeIndex,
        candidates: &[NodeIndex],
        log: &mut UndoLog,
    ) -> ModelResult<bool> {
        self.check_node(node)?;
        let Some(behavior) = self.node_behavior(node) else {
            return Ok(true);
        };
        let mut ctx = BehaviorContext { model: self, log };
        let result = behavior.on_cut_requested(&mut ctx, node, candidates);
        Ok(settle("on_cut_requested", node, result)?.unwrap_or(false))
    }

    /// Copy a node the way its behavior wants it copied.
    ///
    /// Without a behavior the whole subtree is copied. A behavior that
    /// declines, or fails, produces no copy.
    pub fn gen_copy_node(
        &mut self,
        node: NodeIndex,
        candidates: &[NodeIndex],
        log: &mut UndoLog,
    ) -> ModelResult<Option<NodeIndex>> {
        self.check_node(node)?;
        let decision = match self.node_behavior(node) {
            Some(behavior) => {
                let mut ctx = BehaviorContext { model: self, log: &mut *log };
                let result = behavior.on_copy_requested(&mut ctx, node, candidates);
                settle("on_copy_requested", node, result)?
            }
            None => Some(CopyDecision::CopyAll),
        };

        match decision {
            Some(CopyDecision::CopyAll) => self.copy(node, &|_, _| true, log).map(Some),
            Some(CopyDecision::Filter(predicate)) => {
                let filter = |model: &NodeModel, candidate: NodeIndex| predicate(model, candidate);
                self.copy(node, &filter, log).map(Some)
            }
            Some(CopyDecision::Skip) | None => Ok(None),
        }
    }

    /// Run the node's syntax checker. Deleted nodes never have errors.
    pub fn has_syntax_error(&self, node: NodeIndex) -> ModelResult<bool> {
        self.check_node(node)?;
        if self.state(node) == State::Deleted {
            return Ok(false);
        }
        let Some(behavior) = self.node_behavior(node) else {
            return Ok(false);
        };
        let result = behavior.check_syntax_error(self, node);
        Ok(settle("check_syntax_error", node, result)?.unwrap_or(false))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::behavior::BehaviorRegistry;
    use crate::ids::NodeId;
    use crate::template::{NodeTemplate, TemplateRegistry};

    struct Scripted {
        syntax: Result<bool, BehaviorError>,
        cut: Result<bool, BehaviorError>,
    }

    impl NodeBehavior for Scripted {
        fn check_syntax_error(&self, _model: &NodeModel, _this: NodeIndex) -> Result<bool, BehaviorError> {
            self.syntax.clone()
        }

        fn on_cut_requested(
            &self,
            _ctx: &mut BehaviorContext<'_>,
            _this: NodeIndex,
            _candidates: &[NodeIndex],
        ) -> Result<bool, BehaviorError> {
            self.cut.clone()
        }

        fn on_copy_requested(
            &self,
            _ctx: &mut BehaviorContext<'_>,
            _this: NodeIndex,
            _candidates: &[NodeIndex],
        ) -> Result<CopyDecision, BehaviorError> {
            Err(BehaviorError::Failed("no copy today".into()))
        }
    }

    fn setup(behavior: Scripted) -> (NodeModel, NodeIndex, UndoLog) {
        let templates = TemplateRegistry::new()
            .with_node(NodeTemplate::text("idChecked", "").with_behavior("checked"));
        let behaviors = BehaviorRegistry::new().with("checked", Arc::new(behavior));
        let mut model = NodeModel::new(Arc::new(templates)).with_behaviors(behaviors);
        let mut log = UndoLog::new();
        let workspace = model.add_workspace("main");
        let node = model.create_node(&NodeId::from("idChecked")).unwrap();
        model.add_root_node(workspace, node, &mut log).unwrap();
        (model, node, log)
    }

    #[test]
    fn test_syntax_error_results() {
        let (model, node, _) = setup(Scripted {
            syntax: Ok(true),
            cut: Ok(true),
        });
        assert_eq!(model.has_syntax_error(node), Ok(true));

        let (model, node, _) = setup(Scripted {
            syntax: Err(BehaviorError::Failed("boom".into())),
            cut: Ok(true),
        });
        assert_eq!(model.has_syntax_error(node), Ok(false));

        let (model, node, _) = setup(Scripted {
            syntax: Err(BehaviorError::WrongReturnType {
                expected: "boolean",
                actual: "string",
            }),
            cut: Ok(true),
        });
        assert!(matches!(
            model.has_syntax_error(node),
            Err(ModelError::ContractViolation { callback, .. }) if callback == "check_syntax_error"
        ));
    }

    #[test]
    fn test_deleted_node_has_no_syntax_error() {
        let (mut model, node, mut log) = setup(Scripted {
            syntax: Ok(true),
            cut: Ok(true),
        });
        model.delete_node(node, &mut log).unwrap();
        assert_eq!(model.has_syntax_error(node), Ok(false));
    }

    #[test]
    fn test_failed_cut_is_refused() {
        let (mut model, node, mut log) = setup(Scripted {
            syntax: Ok(false),
            cut: Err(BehaviorError::Failed("boom".into())),
        });
        assert_eq!(model.cut_requested(node, &[node], &mut log), Ok(false));
    }

    #[test]
    fn test_failed_copy_produces_nothing() {
        let (mut model, node, mut log) = setup(Scripted {
            syntax: Ok(false),
            cut: Ok(true),
        });
        let before = model.node_count();
        assert_eq!(model.gen_copy_node(node, &[node], &mut log), Ok(None));
        assert_eq!(model.node_count(), before);
    }

    #[test]
    fn test_copy_without_behavior_copies_everything() {
        let templates = TemplateRegistry::new().with_node(NodeTemplate::text("idPlain", "v"));
        let mut model = NodeModel::new(Arc::new(templates));
        let mut log = UndoLog::new();
        let node = model.create_node(&NodeId::from("idPlain")).unwrap();

        let copy = model.gen_copy_node(node, &[node], &mut log).unwrap().unwrap();
        assert_ne!(copy, node);
        assert_eq!(model.text(copy), Some("v"));
    }
}
