//! The node model arena
//!
//! [`NodeModel`] owns every node, connector and workspace. Relationships
//! (parent connector, original/imitation links, workspace membership) are
//! stored as handles into these arenas. Slots are never freed: a deleted node
//! stays addressable but is no longer reachable from any workspace.

use crate::behavior::BehaviorRegistry;
use crate::connector::Connector;
use crate::errors::{ModelError, ModelResult};
use crate::ids::{ConnectorIndex, NodeId, NodeIndex, WorkspaceIndex};
use crate::node::{ImitationInfo, Node, NodeKind, State};
use crate::presentation::{NoPresentation, PresentationHooks};
use crate::template::{describe_chain, NodeTemplateKind, TemplateRegistry};
use crate::undo_log::{Command, UndoLog};
use crate::workspace::Workspace;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Predicate deciding which descendants [`NodeModel::copy`] clones
pub type CopyFilter<'a> = &'a dyn Fn(&NodeModel, NodeIndex) -> bool;

pub struct NodeModel {
    pub(crate) templates: Arc<TemplateRegistry>,
    pub(crate) behaviors: BehaviorRegistry,
    pub(crate) presentation: Arc<dyn PresentationHooks>,
    pub(crate) nodes: Vec<Node>,
    pub(crate) connectors: Vec<Connector>,
    pub(crate) workspaces: Vec<Workspace>,
}

impl NodeModel {
    pub fn new(templates: Arc<TemplateRegistry>) -> Self {
        Self {
            templates,
            behaviors: BehaviorRegistry::new(),
            presentation: Arc::new(NoPresentation),
            nodes: Vec::new(),
            connectors: Vec::new(),
            workspaces: Vec::new(),
        }
    }

    pub fn with_behaviors(mut self, behaviors: BehaviorRegistry) -> Self {
        self.behaviors = behaviors;
        self
    }

    pub fn with_presentation(mut self, presentation: Arc<dyn PresentationHooks>) -> Self {
        self.presentation = presentation;
        self
    }

    pub fn templates(&self) -> &TemplateRegistry {
        &self.templates
    }

    pub fn behaviors(&self) -> &BehaviorRegistry {
        &self.behaviors
    }

    // ------------------------------------------------------------------
    // Arena access
    // ------------------------------------------------------------------

    /// Node behind a handle.
    ///
    /// # Panics
    ///
    /// If `index` was not issued by this model. Use [`NodeModel::try_node`]
    /// for handles of unknown origin.
    pub fn node(&self, index: NodeIndex) -> &Node {
        &self.nodes[index.get()]
    }

    pub fn try_node(&self, index: NodeIndex) -> ModelResult<&Node> {
        self.nodes
            .get(index.get())
            .ok_or(ModelError::UnknownNode(index))
    }

    pub(crate) fn node_mut(&mut self, index: NodeIndex) -> &mut Node {
        &mut self.nodes[index.get()]
    }

    /// Connector behind a handle. Panics like [`NodeModel::node`].
    pub fn connector(&self, index: ConnectorIndex) -> &Connector {
        &self.connectors[index.get()]
    }

    pub fn try_connector(&self, index: ConnectorIndex) -> ModelResult<&Connector> {
        self.connectors.get(index.get()).ok_or_else(|| {
            ModelError::InvalidOperation(format!("{index} is not part of this model"))
        })
    }

    /// Workspace behind a handle. Panics like [`NodeModel::node`].
    pub fn workspace(&self, index: WorkspaceIndex) -> &Workspace {
        &self.workspaces[index.get()]
    }

    pub fn try_workspace(&self, index: WorkspaceIndex) -> ModelResult<&Workspace> {
        self.workspaces.get(index.get()).ok_or_else(|| {
            ModelError::InvalidOperation(format!("{index} is not part of this model"))
        })
    }

    pub(crate) fn workspace_mut(&mut self, index: WorkspaceIndex) -> &mut Workspace {
        &mut self.workspaces[index.get()]
    }

    pub(crate) fn check_node(&self, index: NodeIndex) -> ModelResult<()> {
        self.try_node(index).map(|_| ())
    }

    pub(crate) fn check_connector(&self, index: ConnectorIndex) -> ModelResult<()> {
        self.try_connector(index).map(|_| ())
    }

    pub(crate) fn check_workspace(&self, index: WorkspaceIndex) -> ModelResult<()> {
        self.try_workspace(index).map(|_| ())
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn nodes(&self) -> impl Iterator<Item = (NodeIndex, &Node)> + '_ {
        self.nodes
            .iter()
            .enumerate()
            .map(|(index, node)| (NodeIndex::from_usize(index), node))
    }

    pub fn workspaces(&self) -> impl Iterator<Item = (WorkspaceIndex, &Workspace)> + '_ {
        self.workspaces
            .iter()
            .enumerate()
            .map(|(index, workspace)| (WorkspaceIndex::from_usize(index), workspace))
    }

    pub fn add_workspace(&mut self, name: impl Into<String>) -> WorkspaceIndex {
        let index = WorkspaceIndex::from_usize(self.workspaces.len());
        self.workspaces.push(Workspace::new(name));
        index
    }

    fn push_node(&mut self, node: Node) -> NodeIndex {
        let index = NodeIndex::from_usize(self.nodes.len());
        self.nodes.push(node);
        index
    }

    fn push_connector(&mut self, parent: NodeIndex, connector: Connector) -> ConnectorIndex {
        let index = ConnectorIndex::from_usize(self.connectors.len());
        self.connectors.push(connector);
        if let NodeKind::Connective { connectors, .. } = &mut self.node_mut(parent).kind {
            connectors.push(index);
        }
        index
    }

    // ------------------------------------------------------------------
    // Instantiation
    // ------------------------------------------------------------------

    /// Instantiate a node template together with its initial children.
    ///
    /// The new node belongs to no workspace until it is added as a root or
    /// connected below a node that does. Templates that would instantiate
    /// themselves are rejected before anything is built, and a failure
    /// leaves no partial nodes behind.
    pub fn create_node(&mut self, id: &NodeId) -> ModelResult<NodeIndex> {
        if let Some(cycle) = self.templates.instantiation_cycle(id) {
            return Err(ModelError::CyclicTemplate {
                node: id.clone(),
                chain: describe_chain(&cycle),
            });
        }

        let (node_count, connector_count) = (self.nodes.len(), self.connectors.len());
        let result = self.instantiate(id);
        if result.is_err() {
            self.nodes.truncate(node_count);
            self.connectors.truncate(connector_count);
        }
        result
    }

    fn instantiate(&mut self, id: &NodeId) -> ModelResult<NodeIndex> {
        let templates = self.templates.clone();
        let template = templates
            .node(id)
            .ok_or_else(|| ModelError::TemplateNotFound(id.clone()))?;

        let mut slots = Vec::new();
        if let NodeTemplateKind::Connective { connectors } = &template.kind {
            for slot in connectors {
                let connector_template = templates
                    .connector(&slot.connector)
                    .ok_or_else(|| ModelError::ConnectorTemplateNotFound(slot.connector.clone()))?;
                slots.push((slot, connector_template));
            }
        }

        let imitation = || {
            ImitationInfo::new(
                Arc::new(template.imitations.clone()),
                template.can_create_imit_manually,
                template.scope_name.clone(),
            )
        };
        let kind = match &template.kind {
            NodeTemplateKind::Connective { .. } => NodeKind::Connective {
                connectors: Vec::new(),
                imitation: imitation(),
            },
            NodeTemplateKind::Text { text } => NodeKind::Text {
                text: text.clone(),
                imitation: imitation(),
            },
            NodeTemplateKind::Void => NodeKind::Void,
        };
        let node = self.push_node(Node::new(
            template.id.clone(),
            template.name.clone(),
            kind,
            template.behavior.clone(),
        ));

        for (slot, connector_template) in slots {
            let connector =
                self.push_connector(node, Connector::from_template(connector_template, slot, node));
            let child = self.instantiate(connector_template.first_node_id())?;
            self.connect_filler(connector, child)?;
        }
        Ok(node)
    }

    /// Wire a freshly created child without recording anything
    fn connect_filler(&mut self, connector: ConnectorIndex, child: NodeIndex) -> ModelResult<()> {
        if self.connector(connector).is_default_filler(&self.node(child).id) {
            self.node_mut(child).is_default_node = true;
        }
        self.connect_node(connector, child, None)
    }

    // ------------------------------------------------------------------
    // Logged primitives
    // ------------------------------------------------------------------

    pub(crate) fn raw_connect(&mut self, connector: ConnectorIndex, node: Option<NodeIndex>) {
        if let Some(previous) = self.connector(connector).connected {
            if self.node(previous).parent_connector == Some(connector) {
                self.node_mut(previous).parent_connector = None;
            }
        }
        self.connectors[connector.get()].connected = node;
        if let Some(node) = node {
            self.node_mut(node).parent_connector = Some(connector);
        }
    }

    pub(crate) fn raw_set_text(&mut self, node: NodeIndex, value: String) {
        if let NodeKind::Text { text, .. } = &mut self.node_mut(node).kind {
            *text = value;
        }
    }

    pub(crate) fn set_workspace(
        &mut self,
        node: NodeIndex,
        workspace: Option<WorkspaceIndex>,
        log: &mut UndoLog,
    ) {
        let previous = self.node(node).workspace;
        if previous == workspace {
            return;
        }
        self.node_mut(node).workspace = workspace;
        log.record(Command::SetWorkspace {
            node,
            previous,
            next: workspace,
        });
    }

    /// Move a whole subtree into (or out of) a workspace
    pub(crate) fn set_workspace_recursive(
        &mut self,
        root: NodeIndex,
        workspace: Option<WorkspaceIndex>,
        log: &mut UndoLog,
    ) {
        for node in self.subtree(root) {
            self.set_workspace(node, workspace, log);
        }
    }

    pub(crate) fn set_last_replaced(
        &mut self,
        node: NodeIndex,
        replaced_by: Option<NodeIndex>,
        log: &mut UndoLog,
    ) {
        let previous = self.node(node).last_replaced;
        self.node_mut(node).last_replaced = replaced_by;
        log.record(Command::SetLastReplaced {
            node,
            previous,
            next: replaced_by,
        });
    }

    pub(crate) fn set_default_node(&mut self, node: NodeIndex, is_default: bool, log: &mut UndoLog) {
        let previous = self.node(node).is_default_node;
        if previous == is_default {
            return;
        }
        self.node_mut(node).is_default_node = is_default;
        log.record(Command::SetDefaultNode {
            node,
            previous,
            next: is_default,
        });
    }

    pub fn text(&self, node: NodeIndex) -> Option<&str> {
        self.nodes.get(node.get()).and_then(Node::text)
    }

    /// Change the text of a text node and of every text imitation of it
    pub fn set_text(
        &mut self,
        node: NodeIndex,
        value: impl Into<String>,
        log: &mut UndoLog,
    ) -> ModelResult<()> {
        self.check_node(node)?;
        let value = value.into();
        let previous = self
            .node(node)
            .text()
            .ok_or(ModelError::NotText(node))?
            .to_string();
        if previous != value {
            self.raw_set_text(node, value.clone());
            log.record(Command::SetText {
                node,
                previous,
                next: value.clone(),
            });
        }

        for imitation in self.node(node).imitations().to_vec() {
            if self.node(imitation).text().is_some() {
                self.set_text(imitation, value.clone(), log)?;
            }
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    pub fn state(&self, node: NodeIndex) -> State {
        let entry = self.node(node);
        match (entry.workspace, entry.parent_connector) {
            (None, _) => State::Deleted,
            (Some(_), Some(_)) => State::Child,
            (Some(workspace), None) if self.workspace(workspace).contains_root(node) => {
                State::RootDirectlyUnderWorkspace
            }
            (Some(_), None) => State::RootDangling,
        }
    }

    pub fn is_deleted(&self, node: NodeIndex) -> bool {
        self.state(node) == State::Deleted
    }

    /// Whether the node can be detached from its connector by hand
    pub fn is_removable(&self, node: NodeIndex) -> bool {
        self.node(node)
            .parent_connector
            .is_some_and(|connector| !self.connector(connector).fixed)
    }

    pub fn is_movable(&self, node: NodeIndex) -> bool {
        self.is_removable(node) || self.state(node) == State::RootDirectlyUnderWorkspace
    }

    pub fn find_parent_node(&self, node: NodeIndex) -> Option<NodeIndex> {
        self.node(node)
            .parent_connector
            .map(|connector| self.connector(connector).parent)
    }

    pub fn find_root_node(&self, node: NodeIndex) -> NodeIndex {
        let mut current = node;
        while let Some(parent) = self.find_parent_node(current) {
            current = parent;
        }
        current
    }

    /// True when `node` is `ancestor` or lies in its subtree
    pub fn is_descendant_of(&self, node: NodeIndex, ancestor: NodeIndex) -> bool {
        let mut current = Some(node);
        while let Some(candidate) = current {
            if candidate == ancestor {
                return true;
            }
            current = self.find_parent_node(candidate);
        }
        false
    }

    /// Whether `candidate` may take the place of `node`
    pub fn can_be_replaced_with(&self, node: NodeIndex, candidate: NodeIndex) -> bool {
        if self.try_node(node).is_err() || self.try_node(candidate).is_err() {
            return false;
        }
        if self.state(node) != State::Child {
            return false;
        }
        if self.state(self.find_root_node(node)) != State::RootDirectlyUnderWorkspace {
            return false;
        }
        if self.is_descendant_of(node, candidate) {
            return false;
        }
        match self.node(node).parent_connector {
            Some(connector) => self.is_connected_node_replaceable_with(connector, candidate),
            None => false,
        }
    }

    pub fn is_selected(&self, node: NodeIndex) -> bool {
        self.node(node)
            .workspace
            .is_some_and(|workspace| self.workspace(workspace).is_selected(node))
    }

    /// All nodes of a subtree, parents before children
    pub fn subtree(&self, root: NodeIndex) -> Vec<NodeIndex> {
        let mut found = Vec::new();
        let mut pending = vec![root];
        while let Some(node) = pending.pop() {
            found.push(node);
            for &connector in self.node(node).connectors().iter().rev() {
                if let Some(child) = self.connector(connector).connected {
                    pending.push(child);
                }
            }
        }
        found
    }

    // ------------------------------------------------------------------
    // Replace / remove / copy
    // ------------------------------------------------------------------

    /// Put `new` where `old` is connected.
    ///
    /// `old` stays in its workspace as a dangling root. A `new` registered as
    /// a workspace root stops being one. The replacement is mirrored into
    /// every imitation of the parent node.
    pub fn replace(&mut self, old: NodeIndex, new: NodeIndex, log: &mut UndoLog) -> ModelResult<()> {
        self.check_node(old)?;
        self.check_node(new)?;
        let connector = self
            .node(old)
            .parent_connector
            .ok_or(ModelError::NotAChild(old))?;
        if let Some(holder) = self.node(new).parent_connector {
            return Err(ModelError::AlreadyConnected {
                node: new,
                connector: holder,
            });
        }
        if self.is_descendant_of(old, new) {
            return Err(ModelError::InvalidOperation(format!(
                "{new} cannot replace its own descendant {old}"
            )));
        }
        if self.state(new) == State::RootDirectlyUnderWorkspace {
            self.remove_root_node(new, log)?;
        }

        self.set_last_replaced(old, Some(new), log);
        self.connect_node(connector, new, Some(log))?;
        if let Some(workspace) = self.node(old).workspace {
            self.set_workspace_recursive(new, Some(workspace), log);
        }
        debug!(%old, %new, %connector, "Node replaced");

        self.mirror_replacement(new, old, log)
    }

    /// Detach `node` from its connector, leaving a default filler behind
    pub fn remove(&mut self, node: NodeIndex, log: &mut UndoLog) -> ModelResult<NodeIndex> {
        self.check_node(node)?;
        let connector = self
            .node(node)
            .parent_connector
            .ok_or(ModelError::NotAChild(node))?;
        self.remove_connected(connector, log)
    }

    /// Deep copy of `node`.
    ///
    /// The node itself is always cloned. Descendants rejected by `filter` are
    /// replaced by fresh initial (or default) nodes. A copy of an imitation
    /// imitates the same original; a copy of an original has no imitations.
    pub fn copy(
        &mut self,
        node: NodeIndex,
        filter: CopyFilter<'_>,
        log: &mut UndoLog,
    ) -> ModelResult<NodeIndex> {
        self.check_node(node)?;
        self.copy_subtree(node, filter, log)
    }

    fn copy_subtree(
        &mut self,
        source: NodeIndex,
        filter: CopyFilter<'_>,
        log: &mut UndoLog,
    ) -> ModelResult<NodeIndex> {
        let original = self.node(source);
        let kind = match &original.kind {
            NodeKind::Connective { imitation, .. } => NodeKind::Connective {
                connectors: Vec::new(),
                imitation: imitation.detached_copy(),
            },
            NodeKind::Text { text, imitation } => NodeKind::Text {
                text: text.clone(),
                imitation: imitation.detached_copy(),
            },
            NodeKind::Void => NodeKind::Void,
        };
        let mut copy = Node::new(
            original.id.clone(),
            original.name.clone(),
            kind,
            original.behavior.clone(),
        );
        copy.is_default_node = original.is_default_node;
        let imitated = original.original();
        let source_connectors = original.connectors().to_vec();

        let copy = self.push_node(copy);
        if let Some(imitated) = imitated {
            self.add_imitation(imitated, copy, log)?;
            self.set_original(copy, Some(imitated), log)?;
        }

        for source_connector in source_connectors {
            let connector = self.connector(source_connector).detached_copy(copy);
            let first_node_id = connector.first_node_id().clone();
            let connector = self.push_connector(copy, connector);

            let connected = self.connector(source_connector).connected;
            let child = match connected {
                Some(child) if filter(self, child) => self.copy_subtree(child, filter, log)?,
                _ => self.create_node(&first_node_id)?,
            };
            self.connect_filler(connector, child)?;
        }
        Ok(copy)
    }
}

impl fmt::Debug for NodeModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeModel")
            .field("nodes", &self.nodes.len())
            .field("connectors", &self.connectors.len())
            .field("workspaces", &self.workspaces.len())
            .field("behaviors", &self.behaviors)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::ConnectorId;
    use crate::template::{ConnectorSlot, ConnectorTemplate, NodeTemplate};

    fn templates() -> TemplateRegistry {
        TemplateRegistry::new()
            .with_node(NodeTemplate::connective(
                "idAssign",
                vec![
                    ConnectorSlot::new("cnctrVar").named("LeftVar"),
                    ConnectorSlot::new("cnctrExp").named("RightExp"),
                ],
            ))
            .with_node(NodeTemplate::connective(
                "idAdd",
                vec![
                    ConnectorSlot::new("cnctrExp").named("Left"),
                    ConnectorSlot::new("cnctrExp").named("Right"),
                ],
            ))
            .with_node(NodeTemplate::void("idVoid"))
            .with_node(NodeTemplate::text("idNum", "0"))
            .with_node(NodeTemplate::text("idVar", "x"))
            .with_connector(ConnectorTemplate::new("cnctrVar", "idVoid").with_initial("idVar").fixed())
            .with_connector(ConnectorTemplate::new("cnctrExp", "idNum"))
    }

    fn model() -> NodeModel {
        NodeModel::new(Arc::new(templates()))
    }

    fn child(model: &NodeModel, parent: NodeIndex, position: usize) -> NodeIndex {
        let connector = model.node(parent).connectors()[position];
        model.connector(connector).connected_node().unwrap()
    }

    #[test]
    fn test_missing_template() {
        let mut model = model();
        assert_eq!(
            model.create_node(&NodeId::from("idNope")),
            Err(ModelError::TemplateNotFound(NodeId::from("idNope")))
        );
    }

    #[test]
    fn test_unknown_handle() {
        let model = model();
        assert_eq!(
            model.try_node(NodeIndex(42)).unwrap_err(),
            ModelError::UnknownNode(NodeIndex(42))
        );
    }

    #[test]
    fn test_states() {
        let mut model = model();
        let mut log = UndoLog::new();
        let workspace = model.add_workspace("main");
        let assign = model.create_node(&NodeId::from("idAssign")).unwrap();
        let var = child(&model, assign, 0);

        assert_eq!(model.state(assign), State::Deleted);
        model.add_root_node(workspace, assign, &mut log).unwrap();
        assert_eq!(model.state(assign), State::RootDirectlyUnderWorkspace);
        assert_eq!(model.state(var), State::Child);

        model.remove_root_node(assign, &mut log).unwrap();
        assert_eq!(model.state(assign), State::RootDangling);
    }

    #[test]
    fn test_removable_and_movable() {
        let mut model = model();
        let mut log = UndoLog::new();
        let workspace = model.add_workspace("main");
        let assign = model.create_node(&NodeId::from("idAssign")).unwrap();
        model.add_root_node(workspace, assign, &mut log).unwrap();
        let var = child(&model, assign, 0);
        let exp = child(&model, assign, 1);

        assert!(!model.is_removable(var));
        assert!(!model.is_movable(var));
        assert!(model.is_removable(exp));
        assert!(!model.is_removable(assign));
        assert!(model.is_movable(assign));
    }

    #[test]
    fn test_tree_queries() {
        let mut model = model();
        let assign = model.create_node(&NodeId::from("idAssign")).unwrap();
        let exp = child(&model, assign, 1);

        assert_eq!(model.find_parent_node(exp), Some(assign));
        assert_eq!(model.find_parent_node(assign), None);
        assert_eq!(model.find_root_node(exp), assign);
        assert!(model.is_descendant_of(exp, assign));
        assert!(model.is_descendant_of(assign, assign));
        assert!(!model.is_descendant_of(assign, exp));
        assert_eq!(model.subtree(assign), vec![assign, child(&model, assign, 0), exp]);
    }

    #[test]
    fn test_set_text_requires_text_node() {
        let mut model = model();
        let mut log = UndoLog::new();
        let assign = model.create_node(&NodeId::from("idAssign")).unwrap();

        assert_eq!(
            model.set_text(assign, "nope", &mut log),
            Err(ModelError::NotText(assign))
        );
        assert_eq!(log.undo_levels(), 0);
    }

    #[test]
    fn test_replace_keeps_old_in_workspace() {
        let mut model = model();
        let mut log = UndoLog::new();
        let workspace = model.add_workspace("main");
        let assign = model.create_node(&NodeId::from("idAssign")).unwrap();
        model.add_root_node(workspace, assign, &mut log).unwrap();
        let old = child(&model, assign, 1);
        let add = model.create_node(&NodeId::from("idAdd")).unwrap();

        model.replace(old, add, &mut log).unwrap();

        assert_eq!(child(&model, assign, 1), add);
        assert_eq!(model.state(old), State::RootDangling);
        assert_eq!(model.node(old).last_replaced(), Some(add));
        for node in model.subtree(add) {
            assert_eq!(model.node(node).workspace(), Some(workspace));
        }
    }

    #[test]
    fn test_replace_root_is_rejected() {
        let mut model = model();
        let mut log = UndoLog::new();
        let a = model.create_node(&NodeId::from("idNum")).unwrap();
        let b = model.create_node(&NodeId::from("idNum")).unwrap();
        assert_eq!(model.replace(a, b, &mut log), Err(ModelError::NotAChild(a)));
    }

    #[test]
    fn test_replace_unregisters_root() {
        let mut model = model();
        let mut log = UndoLog::new();
        let workspace = model.add_workspace("main");
        let assign = model.create_node(&NodeId::from("idAssign")).unwrap();
        let add = model.create_node(&NodeId::from("idAdd")).unwrap();
        model.add_root_node(workspace, assign, &mut log).unwrap();
        model.add_root_node(workspace, add, &mut log).unwrap();
        let old = child(&model, assign, 1);

        model.replace(old, add, &mut log).unwrap();

        assert_eq!(model.state(add), State::Child);
        assert_eq!(model.workspace(workspace).roots(), &[assign]);
    }

    #[test]
    fn test_replace_rejects_connected_or_ancestor() {
        let mut model = model();
        let mut log = UndoLog::new();
        let workspace = model.add_workspace("main");
        let add = model.create_node(&NodeId::from("idAdd")).unwrap();
        model.add_root_node(workspace, add, &mut log).unwrap();
        let left = child(&model, add, 0);
        let right = child(&model, add, 1);

        assert!(matches!(
            model.replace(left, right, &mut log),
            Err(ModelError::AlreadyConnected { .. })
        ));
        let nested = model.create_node(&NodeId::from("idAdd")).unwrap();
        let inner = child(&model, nested, 0);
        assert!(matches!(
            model.replace(inner, nested, &mut log),
            Err(ModelError::InvalidOperation(_))
        ));
        assert_eq!(model.workspace(workspace).roots(), &[add]);
        assert_eq!(child(&model, add, 0), left);
    }

    #[test]
    fn test_cyclic_template_is_rejected() {
        let templates = TemplateRegistry::new()
            .with_node(NodeTemplate::connective("idList", vec![ConnectorSlot::new("cnctrNext")]))
            .with_connector(ConnectorTemplate::new("cnctrNext", "idList"));
        let mut model = NodeModel::new(Arc::new(templates));

        let err = model.create_node(&NodeId::from("idList")).unwrap_err();
        assert_eq!(
            err,
            ModelError::CyclicTemplate {
                node: NodeId::from("idList"),
                chain: "idList -> idList".to_string(),
            }
        );
        assert_eq!(model.node_count(), 0);
    }

    #[test]
    fn test_failed_instantiation_leaves_nothing_behind() {
        let templates = templates()
            .with_node(NodeTemplate::connective(
                "idBroken",
                vec![ConnectorSlot::new("cnctrExp"), ConnectorSlot::new("cnctrMissing")],
            ))
            .with_node(NodeTemplate::connective("idOuter", vec![ConnectorSlot::new("cnctrBroken")]))
            .with_connector(ConnectorTemplate::new("cnctrBroken", "idBroken"));
        let mut model = NodeModel::new(Arc::new(templates));
        let kept = model.create_node(&NodeId::from("idNum")).unwrap();

        assert_eq!(
            model.create_node(&NodeId::from("idBroken")),
            Err(ModelError::ConnectorTemplateNotFound(ConnectorId::from("cnctrMissing")))
        );
        assert_eq!(model.node_count(), 1);
        assert!(model.create_node(&NodeId::from("idOuter")).is_err());
        assert_eq!(model.node_count(), 1);
        assert_eq!(model.connectors.len(), 0);

        let next = model.create_node(&NodeId::from("idNum")).unwrap();
        assert_eq!(next.raw(), kept.raw() + 1);
    }

    #[test]
    fn test_copy_with_filter() {
        let mut model = model();
        let mut log = UndoLog::new();
        let add = model.create_node(&NodeId::from("idAdd")).unwrap();
        let left = child(&model, add, 0);
        let right = child(&model, add, 1);
        model.set_text(left, "1", &mut log).unwrap();
        model.set_text(right, "2", &mut log).unwrap();

        let keep_left = move |_: &NodeModel, node: NodeIndex| node == left;
        let copy = model.copy(add, &keep_left, &mut log).unwrap();

        assert_ne!(copy, add);
        assert_eq!(model.node(copy).id().as_str(), "idAdd");
        assert_eq!(model.text(child(&model, copy, 0)), Some("1"));
        assert_eq!(model.text(child(&model, copy, 1)), Some("0"));
        assert!(model.node(child(&model, copy, 1)).is_default_node());
        assert_eq!(model.state(copy), State::Deleted);
    }

    #[test]
    fn test_copy_marks_default_only_when_init_differs() {
        let mut model = model();
        let mut log = UndoLog::new();
        let assign = model.create_node(&NodeId::from("idAssign")).unwrap();

        let copy = model.copy(assign, &|_, _| false, &mut log).unwrap();
        let var = child(&model, copy, 0);
        assert_eq!(model.node(var).id().as_str(), "idVar");
        assert!(!model.node(var).is_default_node());
    }
}
