//! # Node Behaviors
//!
//! Per-template behavior that runs at mutation points.
//!
//! A node or connector template names a behavior; the model looks it up in
//! the [`BehaviorRegistry`] it was built with and calls the typed hooks of
//! [`NodeBehavior`]. Behaviors can be written natively in Rust or come from
//! an embedded interpreter through [`ScriptedBehavior`], which adapts any
//! [`ScriptHost`] to the same interface.
//!
//! ## Failure contract
//!
//! - A hook returning [`BehaviorError::Failed`] is treated as declined: the
//!   operation continues without the customization and the failure is logged.
//! - A hook returning [`BehaviorError::WrongReturnType`] breaks the contract
//!   and surfaces as [`ModelError::ContractViolation`](crate::ModelError).

use crate::ids::{ConnectorIndex, NodeIndex};
use crate::model::NodeModel;
use crate::undo_log::UndoLog;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Why a node is being deleted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CauseOfDeletion {
    /// An imitation is removed because its original was deleted
    InfluenceOfOriginalDeletion,
    TrashBox,
    SyntaxError,
    SelectedForDeletion,
    WorkspaceDeletion,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum BehaviorError {
    #[error("Behavior failed: {0}")]
    Failed(String),

    #[error("Expected {expected}, got {actual}")]
    WrongReturnType {
        expected: &'static str,
        actual: &'static str,
    },
}

/// Mutable access handed to behavior hooks.
///
/// Hooks may edit the model; every edit must be recorded in `log` so that it
/// is undone together with the operation that triggered the hook.
pub struct BehaviorContext<'a> {
    pub model: &'a mut NodeModel,
    pub log: &'a mut UndoLog,
}

/// Predicate deciding whether a descendant is copied verbatim
pub type CopyPredicate = Box<dyn Fn(&NodeModel, NodeIndex) -> bool + Send + Sync>;

/// Outcome of a copy request
pub enum CopyDecision {
    /// Copy the whole subtree
    CopyAll,
    /// Do not create a copy at all
    Skip,
    /// Copy descendants accepted by the predicate, fill the rest with fresh nodes
    Filter(CopyPredicate),
}

impl fmt::Debug for CopyDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CopyDecision::CopyAll => f.write_str("CopyAll"),
            CopyDecision::Skip => f.write_str("Skip"),
            CopyDecision::Filter(_) => f.write_str("Filter(..)"),
        }
    }
}

/// The node moved from the workspace or another connector into a connector
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MovedToChild {
    /// Parent before the move, none when it came from the workspace
    pub old_parent: Option<NodeIndex>,
    /// Root of the tree it belonged to, itself when it came from the workspace
    pub old_root: NodeIndex,
    /// Node that was connected where it now sits
    pub old_replaced: NodeIndex,
}

/// The node was detached from a connector and placed on the workspace
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MovedToWorkspace {
    pub old_parent: NodeIndex,
    pub old_root: NodeIndex,
    /// Node connected in its place
    pub new_replaced: NodeIndex,
    /// True when the user dragged it out by hand
    pub manually_removed: bool,
}

/// A child of the node was swapped for another node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChildReplaced {
    pub old_child: NodeIndex,
    pub new_child: NodeIndex,
    pub connector: ConnectorIndex,
}

/// Typed hooks a template can customize.
///
/// Every method has a default matching a template without that hook.
pub trait NodeBehavior: Send + Sync {
    fn on_moved_to_child(
        &self,
        _ctx: &mut BehaviorContext<'_>,
        _this: NodeIndex,
        _event: MovedToChild,
    ) -> Result<(), BehaviorError> {
        Ok(())
    }

    fn on_moved_from_child_to_ws(
        &self,
        _ctx: &mut BehaviorContext<'_>,
        _this: NodeIndex,
        _event: MovedToWorkspace,
    ) -> Result<(), BehaviorError> {
        Ok(())
    }

    /// Called before `this` is deleted together with `candidates`
    fn on_deletion_requested(
        &self,
        _ctx: &mut BehaviorContext<'_>,
        _this: NodeIndex,
        _candidates: &[NodeIndex],
        _cause: CauseOfDeletion,
    ) -> Result<(), BehaviorError> {
        Ok(())
    }

    /// Returns false to cancel the cut
    fn on_cut_requested(
        &self,
        _ctx: &mut BehaviorContext<'_>,
        _this: NodeIndex,
        _candidates: &[NodeIndex],
    ) -> Result<bool, BehaviorError> {
        Ok(true)
    }

    fn on_copy_requested(
        &self,
        _ctx: &mut BehaviorContext<'_>,
        _this: NodeIndex,
        _candidates: &[NodeIndex],
    ) -> Result<CopyDecision, BehaviorError> {
        Ok(CopyDecision::CopyAll)
    }

    fn on_child_replaced(
        &self,
        _ctx: &mut BehaviorContext<'_>,
        _this: NodeIndex,
        _event: ChildReplaced,
    ) -> Result<(), BehaviorError> {
        Ok(())
    }

    fn check_syntax_error(&self, _model: &NodeModel, _this: NodeIndex) -> Result<bool, BehaviorError> {
        Ok(false)
    }

    /// Asked through a connector: may `candidate` take the place of `current`?
    fn check_replaceable(
        &self,
        _model: &NodeModel,
        _connector: ConnectorIndex,
        _candidate: NodeIndex,
        _current: NodeIndex,
    ) -> Result<bool, BehaviorError> {
        Ok(false)
    }
}

/// Behaviors addressable by the names templates use
#[derive(Default, Clone)]
pub struct BehaviorRegistry {
    behaviors: HashMap<String, Arc<dyn NodeBehavior>>,
}

impl BehaviorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, name: impl Into<String>, behavior: Arc<dyn NodeBehavior>) {
        self.behaviors.insert(name.into(), behavior);
    }

    pub fn with(mut self, name: impl Into<String>, behavior: Arc<dyn NodeBehavior>) -> Self {
        self.register(name, behavior);
        self
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn NodeBehavior>> {
        self.behaviors.get(name).cloned()
    }

    pub fn len(&self) -> usize {
        self.behaviors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.behaviors.is_empty()
    }
}

impl fmt::Debug for BehaviorRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.behaviors.keys().collect();
        names.sort();
        f.debug_struct("BehaviorRegistry").field("behaviors", &names).finish()
    }
}

// ---------------------------------------------------------------------------
// Script host adapter
// ---------------------------------------------------------------------------

/// Names of the arguments passed to scripts
pub mod arg {
    pub const THIS: &str = "this";
    pub const CONNECTOR: &str = "connector";
    pub const NEW_NODE: &str = "newNode";
    pub const OLD_NODE: &str = "oldNode";
    pub const CANDIDATES: &str = "candidates";
    pub const CAUSE: &str = "cause";
    pub const OLD_PARENT: &str = "oldParent";
    pub const OLD_ROOT: &str = "oldRoot";
    pub const MANUALLY_REMOVED: &str = "manuallyRemoved";
}

#[derive(Debug, Clone, PartialEq)]
pub enum ScriptArg {
    Node(NodeIndex),
    OptionalNode(Option<NodeIndex>),
    Connector(ConnectorIndex),
    Nodes(Vec<NodeIndex>),
    Cause(CauseOfDeletion),
    Bool(bool),
}

/// Named arguments of one script invocation
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScriptArgs {
    entries: Vec<(&'static str, ScriptArg)>,
}

impl ScriptArgs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: &'static str, value: ScriptArg) -> Self {
        self.entries.push((name, value));
        self
    }

    pub fn get(&self, name: &str) -> Option<&ScriptArg> {
        self.entries
            .iter()
            .find(|(key, _)| *key == name)
            .map(|(_, value)| value)
    }

    pub fn node(&self, name: &str) -> Option<NodeIndex> {
        match self.get(name)? {
            ScriptArg::Node(node) => Some(*node),
            ScriptArg::OptionalNode(node) => *node,
            _ => None,
        }
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.entries.iter().map(|(key, _)| *key)
    }
}

/// Value returned by a script
pub enum ScriptValue {
    Null,
    Bool(bool),
    Text(String),
    CopyFilter(CopyPredicate),
}

impl ScriptValue {
    pub fn type_name(&self) -> &'static str {
        match self {
            ScriptValue::Null => "null",
            ScriptValue::Bool(_) => "boolean",
            ScriptValue::Text(_) => "string",
            ScriptValue::CopyFilter(_) => "function",
        }
    }
}

impl fmt::Debug for ScriptValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScriptValue::Null => f.write_str("Null"),
            ScriptValue::Bool(value) => write!(f, "Bool({value})"),
            ScriptValue::Text(value) => write!(f, "Text({value:?})"),
            ScriptValue::CopyFilter(_) => f.write_str("CopyFilter(..)"),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
#[error("Script '{script}' failed: {message}")]
pub struct ScriptFailure {
    pub script: String,
    pub message: String,
}

impl ScriptFailure {
    pub fn new(script: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            script: script.into(),
            message: message.into(),
        }
    }
}

/// An embedded interpreter that runs named scripts
pub trait ScriptHost: Send + Sync {
    /// Run a script that only inspects the model
    fn invoke(
        &self,
        script: &str,
        args: &ScriptArgs,
        model: &NodeModel,
    ) -> Result<ScriptValue, ScriptFailure>;

    /// Run a script that may edit the model
    fn invoke_mut(
        &self,
        script: &str,
        args: &ScriptArgs,
        ctx: &mut BehaviorContext<'_>,
    ) -> Result<ScriptValue, ScriptFailure> {
        self.invoke(script, args, ctx.model)
    }
}

/// Script names for each hook; `None` keeps the default behavior
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScriptNames {
    #[serde(default)]
    pub on_moved_to_child: Option<String>,
    #[serde(default)]
    pub on_moved_from_child_to_ws: Option<String>,
    #[serde(default)]
    pub on_deletion_requested: Option<String>,
    #[serde(default)]
    pub on_cut_requested: Option<String>,
    #[serde(default)]
    pub on_copy_requested: Option<String>,
    #[serde(default)]
    pub on_child_replaced: Option<String>,
    #[serde(default)]
    pub syntax_error_checker: Option<String>,
    #[serde(default)]
    pub replaceability_checker: Option<String>,
}

/// [`NodeBehavior`] backed by scripts run on a [`ScriptHost`]
pub struct ScriptedBehavior {
    host: Arc<dyn ScriptHost>,
    scripts: ScriptNames,
}

impl ScriptedBehavior {
    pub fn new(host: Arc<dyn ScriptHost>, scripts: ScriptNames) -> Self {
        Self { host, scripts }
    }

    fn run_mut(
        &self,
        script: &Option<String>,
        args: ScriptArgs,
        ctx: &mut BehaviorContext<'_>,
    ) -> Option<Result<ScriptValue, BehaviorError>> {
        let script = script.as_deref()?;
        Some(
            self.host
                .invoke_mut(script, &args, ctx)
                .map_err(|failure| BehaviorError::Failed(failure.to_string())),
        )
    }

    fn run(
        &self,
        script: &Option<String>,
        args: ScriptArgs,
        model: &NodeModel,
    ) -> Option<Result<ScriptValue, BehaviorError>> {
        let script = script.as_deref()?;
        Some(
            self.host
                .invoke(script, &args, model)
                .map_err(|failure| BehaviorError::Failed(failure.to_string())),
        )
    }
}

fn expect_bool(value: ScriptValue) -> Result<bool, BehaviorError> {
    match value {
        ScriptValue::Bool(value) => Ok(value),
        other => Err(BehaviorError::WrongReturnType {
            expected: "boolean",
            actual: other.type_name(),
        }),
    }
}

impl NodeBehavior for ScriptedBehavior {
    fn on_moved_to_child(
        &self,
        ctx: &mut BehaviorContext<'_>,
        this: NodeIndex,
        event: MovedToChild,
    ) -> Result<(), BehaviorError> {
        let args = ScriptArgs::new()
            .with(arg::THIS, ScriptArg::Node(this))
            .with(arg::OLD_PARENT, ScriptArg::OptionalNode(event.old_parent))
            .with(arg::OLD_ROOT, ScriptArg::Node(event.old_root))
            .with(arg::OLD_NODE, ScriptArg::Node(event.old_replaced));
        match self.run_mut(&self.scripts.on_moved_to_child, args, ctx) {
            Some(result) => result.map(|_| ()),
            None => Ok(()),
        }
    }

    fn on_moved_from_child_to_ws(
        &self,
        ctx: &mut BehaviorContext<'_>,
        this: NodeIndex,
        event: MovedToWorkspace,
    ) -> Result<(), BehaviorError> {
        let args = ScriptArgs::new()
            .with(arg::THIS, ScriptArg::Node(this))
            .with(arg::OLD_PARENT, ScriptArg::Node(event.old_parent))
            .with(arg::OLD_ROOT, ScriptArg::Node(event.old_root))
            .with(arg::NEW_NODE, ScriptArg::Node(event.new_replaced))
            .with(arg::MANUALLY_REMOVED, ScriptArg::Bool(event.manually_removed));
        match self.run_mut(&self.scripts.on_moved_from_child_to_ws, args, ctx) {
            Some(result) => result.map(|_| ()),
            None => Ok(()),
        }
    }

    fn on_deletion_requested(
        &self,
        ctx: &mut BehaviorContext<'_>,
        this: NodeIndex,
        candidates: &[NodeIndex],
        cause: CauseOfDeletion,
    ) -> Result<(), BehaviorError> {
        let args = ScriptArgs::new()
            .with(arg::THIS, ScriptArg::Node(this))
            .with(arg::CANDIDATES, ScriptArg::Nodes(candidates.to_vec()))
            .with(arg::CAUSE, ScriptArg::Cause(cause));
        match self.run_mut(&self.scripts.on_deletion_requested, args, ctx) {
            Some(result) => result.map(|_| ()),
            None => Ok(()),
        }
    }

    fn on_cut_requested(
        &self,
        ctx: &mut BehaviorContext<'_>,
        this: NodeIndex,
        candidates: &[NodeIndex],
    ) -> Result<bool, BehaviorError> {
        let args = ScriptArgs::new()
            .with(arg::THIS, ScriptArg::Node(this))
            .with(arg::CANDIDATES, ScriptArg::Nodes(candidates.to_vec()));
        match self.run_mut(&self.scripts.on_cut_requested, args, ctx) {
            Some(result) => expect_bool(result?),
            None => Ok(true),
        }
    }

    fn on_copy_requested(
        &self,
        ctx: &mut BehaviorContext<'_>,
        this: NodeIndex,
        candidates: &[NodeIndex],
    ) -> Result<CopyDecision, BehaviorError> {
        let args = ScriptArgs::new()
            .with(arg::THIS, ScriptArg::Node(this))
            .with(arg::CANDIDATES, ScriptArg::Nodes(candidates.to_vec()));
        match self.run_mut(&self.scripts.on_copy_requested, args, ctx) {
            Some(result) => match result? {
                ScriptValue::Null => Ok(CopyDecision::Skip),
                ScriptValue::CopyFilter(predicate) => Ok(CopyDecision::Filter(predicate)),
                other => Err(BehaviorError::WrongReturnType {
                    expected: "null or function",
                    actual: other.type_name(),
                }),
            },
            None => Ok(CopyDecision::CopyAll),
        }
    }

    fn on_child_replaced(
        &self,
        ctx: &mut BehaviorContext<'_>,
        this: NodeIndex,
        event: ChildReplaced,
    ) -> Result<(), BehaviorError> {
        let args = ScriptArgs::new()
            .with(arg::THIS, ScriptArg::Node(this))
            .with(arg::OLD_NODE, ScriptArg::Node(event.old_child))
            .with(arg::NEW_NODE, ScriptArg::Node(event.new_child))
            .with(arg::CONNECTOR, ScriptArg::Connector(event.connector));
        match self.run_mut(&self.scripts.on_child_replaced, args, ctx) {
            Some(result) => result.map(|_| ()),
            None => Ok(()),
        }
    }

    fn check_syntax_error(&self, model: &NodeModel, this: NodeIndex) -> Result<bool, BehaviorError> {
        let args = ScriptArgs::new().with(arg::THIS, ScriptArg::Node(this));
        match self.run(&self.scripts.syntax_error_checker, args, model) {
            Some(result) => expect_bool(result?),
            None => Ok(false),
        }
    }

    fn check_replaceable(
        &self,
        model: &NodeModel,
        connector: ConnectorIndex,
        candidate: NodeIndex,
        current: NodeIndex,
    ) -> Result<bool, BehaviorError> {
        let args = ScriptArgs::new()
            .with(arg::CONNECTOR, ScriptArg::Connector(connector))
            .with(arg::NEW_NODE, ScriptArg::Node(candidate))
            .with(arg::OLD_NODE, ScriptArg::Node(current));
        match self.run(&self.scripts.replaceability_checker, args, model) {
            Some(result) => expect_bool(result?),
            None => Ok(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::TemplateRegistry;
    use std::sync::Mutex;

    /// Host answering from a fixed table and remembering what it was asked
    struct TableHost {
        calls: Mutex<Vec<(String, Vec<&'static str>)>>,
    }

    impl TableHost {
        fn new() -> Self {
            Self {
                calls: Mutex::new(Vec::new()),
            }
        }
    }

    impl ScriptHost for TableHost {
        fn invoke(
            &self,
            script: &str,
            args: &ScriptArgs,
            _model: &NodeModel,
        ) -> Result<ScriptValue, ScriptFailure> {
            self.calls
                .lock()
                .unwrap()
                .push((script.to_string(), args.names().collect()));
            match script {
                "yes" => Ok(ScriptValue::Bool(true)),
                "text" => Ok(ScriptValue::Text("oops".into())),
                "null" => Ok(ScriptValue::Null),
                "filter" => Ok(ScriptValue::CopyFilter(Box::new(|_, _| false))),
                _ => Err(ScriptFailure::new(script, "ReferenceError")),
            }
        }
    }

    fn empty_model() -> NodeModel {
        NodeModel::new(Arc::new(TemplateRegistry::new()))
    }

    #[test]
    fn test_default_hooks() {
        struct Plain;
        impl NodeBehavior for Plain {}

        let model = empty_model();
        let behavior = Plain;
        assert_eq!(behavior.check_syntax_error(&model, NodeIndex(0)), Ok(false));
        assert_eq!(
            behavior.check_replaceable(&model, ConnectorIndex(0), NodeIndex(0), NodeIndex(1)),
            Ok(false)
        );
    }

    #[test]
    fn test_scripted_bool_results() {
        let host = Arc::new(TableHost::new());
        let model = empty_model();
        let behavior = ScriptedBehavior::new(
            host.clone(),
            ScriptNames {
                syntax_error_checker: Some("yes".into()),
                replaceability_checker: Some("text".into()),
                ..Default::default()
            },
        );

        assert_eq!(behavior.check_syntax_error(&model, NodeIndex(0)), Ok(true));
        assert_eq!(
            behavior.check_replaceable(&model, ConnectorIndex(0), NodeIndex(1), NodeIndex(2)),
            Err(BehaviorError::WrongReturnType {
                expected: "boolean",
                actual: "string"
            })
        );

        let calls = host.calls.lock().unwrap();
        assert_eq!(calls[1].0, "text");
        assert_eq!(calls[1].1, vec![arg::CONNECTOR, arg::NEW_NODE, arg::OLD_NODE]);
    }

    #[test]
    fn test_scripted_failure_is_reported_as_failed() {
        let host = Arc::new(TableHost::new());
        let model = empty_model();
        let behavior = ScriptedBehavior::new(
            host,
            ScriptNames {
                syntax_error_checker: Some("missing".into()),
                ..Default::default()
            },
        );

        let result = behavior.check_syntax_error(&model, NodeIndex(0));
        assert!(matches!(result, Err(BehaviorError::Failed(message)) if message.contains("ReferenceError")));
    }

    #[test]
    fn test_scripted_copy_decisions() {
        let host = Arc::new(TableHost::new());
        let mut model = empty_model();
        let mut log = UndoLog::new();
        let mut ctx = BehaviorContext {
            model: &mut model,
            log: &mut log,
        };

        let skip = ScriptedBehavior::new(
            host.clone(),
            ScriptNames {
                on_copy_requested: Some("null".into()),
                ..Default::default()
            },
        );
        assert!(matches!(
            skip.on_copy_requested(&mut ctx, NodeIndex(0), &[]),
            Ok(CopyDecision::Skip)
        ));

        let filter = ScriptedBehavior::new(
            host.clone(),
            ScriptNames {
                on_copy_requested: Some("filter".into()),
                ..Default::default()
            },
        );
        assert!(matches!(
            filter.on_copy_requested(&mut ctx, NodeIndex(0), &[]),
            Ok(CopyDecision::Filter(_))
        ));

        let unset = ScriptedBehavior::new(host, ScriptNames::default());
        assert!(matches!(
            unset.on_copy_requested(&mut ctx, NodeIndex(0), &[]),
            Ok(CopyDecision::CopyAll)
        ));
        assert_eq!(unset.on_cut_requested(&mut ctx, NodeIndex(0), &[]), Ok(true));
    }

    #[test]
    fn test_script_args_lookup() {
        let args = ScriptArgs::new()
            .with(arg::THIS, ScriptArg::Node(NodeIndex(7)))
            .with(arg::OLD_PARENT, ScriptArg::OptionalNode(None))
            .with(arg::CAUSE, ScriptArg::Cause(CauseOfDeletion::TrashBox));

        assert_eq!(args.node(arg::THIS), Some(NodeIndex(7)));
        assert_eq!(args.node(arg::OLD_PARENT), None);
        assert_eq!(
            args.get(arg::CAUSE),
            Some(&ScriptArg::Cause(CauseOfDeletion::TrashBox))
        );
        assert!(args.get(arg::CANDIDATES).is_none());
    }
}
