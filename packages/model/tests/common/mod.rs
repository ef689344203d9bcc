#![allow(dead_code)]

use bunnyhop_model::{
    BehaviorContext, BehaviorError, BehaviorRegistry, CauseOfDeletion, ChildReplaced, ConnectorIndex,
    MovedToChild, MovedToWorkspace, NodeBehavior, NodeIndex, NodeModel, PresentationHooks, State,
    TemplateRegistry,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

pub const BLOCKS: &str = include_str!("../fixtures/blocks.json");

/// Accepts only number literals and counts how often it was asked
#[derive(Default)]
pub struct NumberOnly {
    pub calls: AtomicUsize,
}

impl NumberOnly {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl NodeBehavior for NumberOnly {
    fn check_replaceable(
        &self,
        model: &NodeModel,
        _connector: ConnectorIndex,
        candidate: NodeIndex,
        _current: NodeIndex,
    ) -> Result<bool, BehaviorError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(model.node(candidate).id().as_str() == "idNum")
    }
}

/// Writes one line per hook call
#[derive(Default)]
pub struct Recording {
    pub calls: Mutex<Vec<String>>,
}

impl Recording {
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn push(&self, line: String) {
        self.calls.lock().unwrap().push(line);
    }
}

impl NodeBehavior for Recording {
    fn on_moved_to_child(
        &self,
        _ctx: &mut BehaviorContext<'_>,
        this: NodeIndex,
        event: MovedToChild,
    ) -> Result<(), BehaviorError> {
        self.push(format!("moved_to_child {this} replaced {}", event.old_replaced));
        Ok(())
    }

    fn on_moved_from_child_to_ws(
        &self,
        _ctx: &mut BehaviorContext<'_>,
        this: NodeIndex,
        event: MovedToWorkspace,
    ) -> Result<(), BehaviorError> {
        self.push(format!("moved_to_ws {this} manual {}", event.manually_removed));
        Ok(())
    }

    fn on_deletion_requested(
        &self,
        _ctx: &mut BehaviorContext<'_>,
        this: NodeIndex,
        _candidates: &[NodeIndex],
        cause: CauseOfDeletion,
    ) -> Result<(), BehaviorError> {
        self.push(format!("deletion_requested {this} {cause:?}"));
        Ok(())
    }

    fn on_child_replaced(
        &self,
        _ctx: &mut BehaviorContext<'_>,
        this: NodeIndex,
        event: ChildReplaced,
    ) -> Result<(), BehaviorError> {
        self.push(format!("child_replaced {this} {} -> {}", event.old_child, event.new_child));
        Ok(())
    }

    fn check_syntax_error(&self, model: &NodeModel, this: NodeIndex) -> Result<bool, BehaviorError> {
        Ok(model.text(this) == Some("bad"))
    }
}

pub struct Fixture {
    pub model: NodeModel,
    pub number_only: Arc<NumberOnly>,
    pub recording: Arc<Recording>,
}

pub fn fixture() -> Fixture {
    fixture_with(None)
}

pub fn fixture_with(presentation: Option<Arc<dyn PresentationHooks>>) -> Fixture {
    let templates = TemplateRegistry::from_json(BLOCKS).unwrap();
    assert!(templates.validate().is_empty());

    let number_only = Arc::new(NumberOnly::default());
    let recording = Arc::new(Recording::default());
    let behaviors = BehaviorRegistry::new()
        .with("numberOnly", number_only.clone())
        .with("recording", recording.clone());

    let mut model = NodeModel::new(Arc::new(templates)).with_behaviors(behaviors);
    if let Some(presentation) = presentation {
        model = model.with_presentation(presentation);
    }
    Fixture {
        model,
        number_only,
        recording,
    }
}

pub fn child(model: &NodeModel, parent: NodeIndex, position: usize) -> NodeIndex {
    let connector = model.node(parent).connectors()[position];
    model.connector(connector).connected_node().unwrap()
}

/// Link symmetry and state/field agreement for every node
pub fn assert_consistent(model: &NodeModel) {
    for (index, node) in model.nodes() {
        if let Some(original) = node.original() {
            assert!(
                model.imitations(original).contains(&index),
                "{index} imitates {original} but is not listed"
            );
        }
        for &imitation in node.imitations() {
            assert_eq!(model.original(imitation), Some(index));
        }
        if let Some(connector) = node.parent_connector() {
            assert_eq!(model.connector(connector).connected_node(), Some(index));
        }

        let state = model.state(index);
        match state {
            State::Deleted => assert!(node.workspace().is_none()),
            State::Child => {
                assert!(node.parent_connector().is_some());
                let workspace = node.workspace().unwrap();
                assert!(
                    !model.workspace(workspace).contains_root(index),
                    "{index} is connected and registered as a root"
                );
            }
            State::RootDirectlyUnderWorkspace => {
                let workspace = node.workspace().unwrap();
                assert!(model.workspace(workspace).contains_root(index));
                assert!(node.parent_connector().is_none());
            }
            State::RootDangling => {
                let workspace = node.workspace().unwrap();
                assert!(!model.workspace(workspace).contains_root(index));
                assert!(node.parent_connector().is_none());
            }
        }
    }
}
