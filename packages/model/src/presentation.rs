//! Notifications for the view layer
//!
//! The model never waits on the view: hooks are fire-and-forget and cannot
//! fail.

use crate::ids::{ConnectorIndex, NodeIndex};
use std::sync::Mutex;

pub trait PresentationHooks: Send + Sync {
    /// `old_child` under `parent` was swapped for `new_child`
    fn child_replaced(
        &self,
        _parent: NodeIndex,
        _old_child: NodeIndex,
        _new_child: NodeIndex,
        _connector: ConnectorIndex,
    ) {
    }

    /// `node` is being deleted and must leave the paste buffer
    fn remove_paste_candidate(&self, _node: NodeIndex) {}
}

/// Headless hosts without a view
#[derive(Debug, Default, Clone, Copy)]
pub struct NoPresentation;

impl PresentationHooks for NoPresentation {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresentationEvent {
    ChildReplaced {
        parent: NodeIndex,
        old_child: NodeIndex,
        new_child: NodeIndex,
        connector: ConnectorIndex,
    },
    RemovePasteCandidate(NodeIndex),
}

/// Keeps every notification in order of arrival
#[derive(Debug, Default)]
pub struct RecordingPresentation {
    events: Mutex<Vec<PresentationEvent>>,
}

impl RecordingPresentation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<PresentationEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }

    pub fn clear(&self) {
        if let Ok(mut events) = self.events.lock() {
            events.clear();
        }
    }

    fn push(&self, event: PresentationEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}

impl PresentationHooks for RecordingPresentation {
    fn child_replaced(
        &self,
        parent: NodeIndex,
        old_child: NodeIndex,
        new_child: NodeIndex,
        connector: ConnectorIndex,
    ) {
        self.push(PresentationEvent::ChildReplaced {
            parent,
            old_child,
            new_child,
            connector,
        });
    }

    fn remove_paste_candidate(&self, node: NodeIndex) {
        self.push(PresentationEvent::RemovePasteCandidate(node));
    }
}
