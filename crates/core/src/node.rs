use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use crate::arg_keys;
use crate::args::ArgSet;
use crate::context::NodeContext;
use crate::expansion::{Expansion, NodeStatus};
use crate::targets::ExecuteTarget;

/// Why a node operation stopped early.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum NodeError {
    /// Cooperative user interrupt. Not a failure.
    #[error("aborted")]
    Aborted,
    #[error("{0}")]
    Failed(String),
}

impl NodeError {
    pub fn failed(msg: impl Into<String>) -> Self {
        NodeError::Failed(msg.into())
    }

    /// Legacy integer code: -1 for abort, -2 for a hard error.
    pub fn state(&self) -> i32 {
        match self {
            NodeError::Aborted => -1,
            NodeError::Failed(_) => -2,
        }
    }

    /// Inverse of [`NodeError::state`]. States >= 0 are not errors.
    pub fn from_state(state: i32, msg: impl Into<String>) -> Option<Self> {
        match state {
            s if s >= 0 => None,
            -1 => Some(NodeError::Aborted),
            _ => Some(NodeError::Failed(msg.into())),
        }
    }

    pub fn message(&self) -> &str {
        match self {
            NodeError::Aborted => "",
            NodeError::Failed(msg) => msg,
        }
    }
}

pub type NodeResult = Result<(), NodeError>;

pub type SharedNode = Arc<Mutex<Box<dyn Node>>>;
/// Non-owning back-reference to a parent node.
pub type ParentLink = Weak<Mutex<Box<dyn Node>>>;

pub fn share(node: Box<dyn Node>) -> SharedNode {
    Arc::new(Mutex::new(node))
}

/// Locks a shared node, recovering the guard if another holder panicked.
pub fn lock_node(node: &SharedNode) -> MutexGuard<'_, Box<dyn Node>> {
    node.lock().unwrap_or_else(PoisonError::into_inner)
}

/// State every node carries: its arguments, tree links, validity, error slot
/// and expansion gate.
#[derive(Debug, Default)]
pub struct NodeCore {
    args: ArgSet,
    parent: Option<ParentLink>,
    children: Vec<SharedNode>,
    is_valid: bool,
    error: Option<NodeError>,
    expansion: Expansion,
}

impl std::fmt::Debug for dyn Node {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}('{}')", self.class_name(), self.core().path())
    }
}

impl NodeCore {
    pub fn new(args: ArgSet, parent: Option<ParentLink>) -> Self {
        Self {
            args,
            parent,
            ..Self::default()
        }
    }

    pub fn args(&self) -> &ArgSet {
        &self.args
    }

    pub fn args_mut(&mut self) -> &mut ArgSet {
        &mut self.args
    }

    pub fn name(&self) -> &str {
        self.args.get(arg_keys::NODE_NAME)
    }

    pub fn path(&self) -> &str {
        self.args.get(arg_keys::NODE_PATH)
    }

    pub fn node_type(&self) -> &str {
        self.args.get(arg_keys::NODE_TYPE)
    }

    pub fn debug(&self) -> i32 {
        self.args.get_int(arg_keys::NODE_DEBUG, 0)
    }

    pub fn debug_attribs(&self) -> i32 {
        self.args.get_int(arg_keys::NODE_DEBUG_ATTRIBS, 0)
    }

    pub fn is_valid(&self) -> bool {
        self.is_valid
    }

    pub fn invalidate(&mut self) {
        self.is_valid = false;
    }

    pub fn parent(&self) -> Option<SharedNode> {
        self.parent.as_ref().and_then(Weak::upgrade)
    }

    pub fn set_parent(&mut self, parent: Option<ParentLink>) {
        self.parent = parent;
    }

    //--------------------------------------------------------------------
    // Children

    pub fn add_child(&mut self, child: SharedNode) {
        self.children.push(child);
    }

    pub fn children(&self) -> &[SharedNode] {
        &self.children
    }

    pub fn num_children(&self) -> usize {
        self.children.len()
    }

    pub fn child(&self, index: usize) -> Option<SharedNode> {
        self.children.get(index).cloned()
    }

    pub fn child_by_name(&self, name: &str) -> Option<SharedNode> {
        self.children
            .iter()
            .find(|child| lock_node(child).core().name() == name)
            .cloned()
    }

    pub fn child_by_path(&self, path: &str) -> Option<SharedNode> {
        self.children
            .iter()
            .find(|child| lock_node(child).core().path() == path)
            .cloned()
    }

    //--------------------------------------------------------------------
    // Error slot. The first hard error wins until cleared.

    pub fn error_status(&self) -> Option<&NodeError> {
        self.error.as_ref()
    }

    /// 0, -1 (aborted) or -2 (error).
    pub fn error_state(&self) -> i32 {
        self.error.as_ref().map_or(0, NodeError::state)
    }

    pub fn error_message(&self) -> &str {
        self.error.as_ref().map_or("", NodeError::message)
    }

    pub fn has_error(&self) -> bool {
        matches!(self.error, Some(NodeError::Failed(_)))
    }

    pub fn has_aborted(&self) -> bool {
        matches!(self.error, Some(NodeError::Aborted))
    }

    /// Records a hard error unless one is already set, and returns the
    /// stored error.
    pub fn error(&mut self, msg: impl Into<String>) -> NodeError {
        if !self.has_error() {
            self.error = Some(NodeError::Failed(msg.into()));
        }
        self.current_error()
    }

    /// Flags a user abort. An existing hard error is kept.
    pub fn abort(&mut self) -> NodeError {
        if !self.has_error() {
            self.error = Some(NodeError::Aborted);
        }
        self.current_error()
    }

    pub fn clear_error(&mut self) {
        self.error = None;
    }

    fn record(&mut self, err: &NodeError) -> NodeError {
        match err {
            NodeError::Aborted => self.abort(),
            NodeError::Failed(msg) => self.error(msg.clone()),
        }
    }

    fn current_error(&self) -> NodeError {
        self.error.clone().unwrap_or(NodeError::Aborted)
    }

    //--------------------------------------------------------------------

    pub fn status(&self) -> NodeStatus {
        self.expansion.status()
    }

    pub fn expansion(&self) -> &Expansion {
        &self.expansion
    }

    /// Copies new or changed keys from `new_args`. Returns true when any
    /// value differed, or when `new_args` is empty and nothing is pending.
    fn merge_args(&mut self, new_args: &ArgSet) -> bool {
        let mut changed = false;
        for (key, value) in new_args.iter() {
            if !self.args.has(key) || self.args.get(key) != value {
                self.args.set(key, value);
                changed = true;
            }
        }
        changed
    }
}

/// A pluggable unit of scene execution.
///
/// Implementors supply [`Node::core`] plus whichever hooks they need; the
/// provided methods drive validation, execution, expansion and teardown.
pub trait Node: Send + Sync {
    fn core(&self) -> &NodeCore;
    fn core_mut(&mut self) -> &mut NodeCore;

    /// Class name the node was registered under.
    fn class_name(&self) -> &str;

    /// Refreshes local state from the current arguments.
    fn validate_hook(&mut self, _ctx: &NodeContext, _for_real: bool) {}

    fn execute_hook(&mut self, _ctx: &NodeContext, target: &mut ExecuteTarget<'_>) -> NodeResult {
        Err(NodeError::Failed(format!(
            "unrecognized target '{}'. This is likely a coding error",
            target.name()
        )))
    }

    /// Builds child nodes. `node_mask` selects which children to create.
    fn expand_hook(&self, _node_mask: &str) -> NodeResult {
        Ok(())
    }

    /// Releases anything built by [`Node::expand_hook`] besides children.
    fn destroy_contents_hook(&mut self) {}

    //--------------------------------------------------------------------

    /// Brings the node up to date with `ctx`, calling the refresh hook only
    /// when something changed or `force` is set. The parent is validated first.
    fn validate_state(&mut self, ctx: &NodeContext, for_real: bool, force: bool) {
        if let Some(parent) = self.core().parent() {
            // A busy parent is being validated or executed by its holder.
            let guard = match parent.try_lock() {
                Ok(guard) => Some(guard),
                Err(std::sync::TryLockError::Poisoned(poisoned)) => Some(poisoned.into_inner()),
                Err(std::sync::TryLockError::WouldBlock) => None,
            };
            if let Some(mut parent) = guard {
                parent.validate_state(ctx, for_real, force);
            }
        }

        let core = self.core_mut();
        if force {
            core.is_valid = false;
        } else if ctx.args().is_empty() {
            core.is_valid = true;
        } else if core.merge_args(ctx.args()) {
            core.is_valid = false;
        }

        if !self.core().is_valid {
            if self.core().debug() > 0 {
                tracing::debug!(
                    "{}::validate_state('{}') for_real={}",
                    self.class_name(),
                    self.core().path(),
                    for_real
                );
            }
            self.validate_hook(ctx, for_real);
            self.core_mut().is_valid = true;
        }
    }

    /// Validates, clears the error slot, then dispatches `target`.
    fn execute(&mut self, ctx: &NodeContext, target: &mut ExecuteTarget<'_>) -> NodeResult {
        self.validate_state(ctx, true, false);
        self.core_mut().clear_error();

        if self.core().debug() > 0 {
            tracing::debug!(
                "{}::execute('{}') target='{}'",
                self.class_name(),
                self.core().path(),
                target.name()
            );
        }

        let result = self.execute_hook(ctx, target);
        if let Err(err) = &result {
            return Err(self.core_mut().record(err));
        }
        match self.core().error_status() {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }

    /// Expands child contents once, even when called from several threads.
    fn expand_contents(&self, node_mask: &str) -> NodeResult {
        self.core()
            .expansion
            .expand(|| self.expand_hook(node_mask))
    }

    /// Recursively tears down children and returns to `NotExpanded`.
    fn destroy_contents(&mut self) {
        for child in self.core().children.clone() {
            lock_node(&child).destroy_contents();
        }
        self.destroy_contents_hook();
        let core = self.core_mut();
        core.children.clear();
        core.is_valid = false;
        core.expansion.reset();
    }

    fn disable(&mut self) {
        self.destroy_contents();
        self.core().expansion.disable();
    }

    fn status(&self) -> NodeStatus {
        self.core().status()
    }
}

/// Node standing in for one that failed to build, carrying the failure.
#[derive(Debug)]
pub struct ErrorNode {
    core: NodeCore,
    builder_class: String,
}

impl ErrorNode {
    /// `state` -1 flags an abort, anything lower a hard error.
    pub fn new(builder_class: impl Into<String>, state: i32, msg: &str) -> Self {
        let builder_class = builder_class.into();
        let mut core = NodeCore::new(ArgSet::new(), None);
        if state == -1 {
            core.abort();
        } else if state <= -2 {
            core.error(format!("{builder_class}: {msg}"));
        }
        Self {
            core,
            builder_class,
        }
    }

    pub fn builder_class(&self) -> &str {
        &self.builder_class
    }
}

impl Node for ErrorNode {
    fn core(&self) -> &NodeCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut NodeCore {
        &mut self.core
    }

    fn class_name(&self) -> &str {
        "ErrorNode"
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::targets::{NodeDescription, NodeDescriptionMap, SceneImport};
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Node that counts hook calls and lists fixed descriptions.
    #[derive(Debug, Default)]
    pub(crate) struct CountingNode {
        pub core: NodeCore,
        pub validations: usize,
        pub expansions: AtomicUsize,
        pub destroyed: usize,
    }

    impl CountingNode {
        pub fn with_args(args: ArgSet) -> Self {
            Self {
                core: NodeCore::new(args, None),
                ..Self::default()
            }
        }
    }

    impl Node for CountingNode {
        fn core(&self) -> &NodeCore {
            &self.core
        }

        fn core_mut(&mut self) -> &mut NodeCore {
            &mut self.core
        }

        fn class_name(&self) -> &str {
            "CountingNode"
        }

        fn validate_hook(&mut self, _ctx: &NodeContext, _for_real: bool) {
            self.validations += 1;
        }

        fn execute_hook(&mut self, _ctx: &NodeContext, target: &mut ExecuteTarget<'_>) -> NodeResult {
            match target {
                ExecuteTarget::SceneNodeDescriptions(map) => {
                    map.insert("/world".into(), NodeDescription::new("/world", "Xform"));
                    Ok(())
                }
                ExecuteTarget::SceneOpImport(_) => Err(self.core.abort()),
                _ => Err(NodeError::failed(format!("no {}", target.name()))),
            }
        }

        fn expand_hook(&self, _node_mask: &str) -> NodeResult {
            self.expansions.fetch_add(1, Ordering::SeqCst);
            std::thread::sleep(std::time::Duration::from_millis(10));
            Ok(())
        }

        fn destroy_contents_hook(&mut self) {
            self.destroyed += 1;
        }
    }

    fn ctx_with(key: &str, value: &str) -> NodeContext {
        let mut ctx = NodeContext::new();
        ctx.set_string(key, value);
        ctx
    }

    fn named(name: &str, path: &str) -> SharedNode {
        let args: ArgSet = [(arg_keys::NODE_NAME, name), (arg_keys::NODE_PATH, path)]
            .into_iter()
            .collect();
        share(Box::new(CountingNode::with_args(args)))
    }

    #[test]
    fn validate_is_idempotent() {
        let mut node = CountingNode::default();
        let ctx = ctx_with("scene:file", "a.usd");
        node.validate_state(&ctx, true, false);
        node.validate_state(&ctx, true, false);
        assert_eq!(node.validations, 1);
        assert_eq!(node.core().args().get("scene:file"), "a.usd");

        node.validate_state(&ctx_with("scene:file", "b.usd"), true, false);
        assert_eq!(node.validations, 2);
        node.validate_state(&ctx_with("other", "1"), false, false);
        assert_eq!(node.validations, 3);
        node.validate_state(&ctx, true, true);
        assert_eq!(node.validations, 4);
        node.validate_state(&NodeContext::new(), true, false);
        assert_eq!(node.validations, 4);
    }

    #[test]
    fn parent_is_validated_first() {
        let parent = share(Box::new(CountingNode::default()));
        let mut child = CountingNode::default();
        child.core.set_parent(Some(Arc::downgrade(&parent)));
        child.validate_state(&ctx_with("k", "v"), true, false);
        assert_eq!(lock_node(&parent).core().args().get("k"), "v");
        assert!(lock_node(&parent).core().is_valid());
        assert_eq!(child.validations, 1);
    }

    #[test]
    fn first_error_wins() {
        let mut core = NodeCore::default();
        core.error("first");
        let err = core.error("second");
        assert_eq!(err, NodeError::Failed("first".into()));
        assert_eq!(core.error_message(), "first");
        assert_eq!(core.error_state(), -2);

        let err = core.abort();
        assert!(core.has_error());
        assert!(!core.has_aborted());
        assert_eq!(err.message(), "first");

        core.clear_error();
        assert_eq!(core.error_state(), 0);
        assert_eq!(core.abort(), NodeError::Aborted);
        core.error("late");
        assert!(core.has_error());
        assert_eq!(core.error_message(), "late");
    }

    #[test]
    fn error_state_codes_round_trip() {
        assert_eq!(NodeError::from_state(0, "x"), None);
        assert_eq!(NodeError::from_state(-1, "x"), Some(NodeError::Aborted));
        assert_eq!(
            NodeError::from_state(-5, "bad"),
            Some(NodeError::Failed("bad".into()))
        );
        assert_eq!(NodeError::failed("x").state(), -2);
        assert_eq!(NodeError::failed("boom").to_string(), "boom");
    }

    #[test]
    fn execute_dispatches_and_reports() {
        let mut node = CountingNode::default();
        let ctx = NodeContext::new();

        let mut map = NodeDescriptionMap::new();
        assert!(node
            .execute(&ctx, &mut ExecuteTarget::SceneNodeDescriptions(&mut map))
            .is_ok());
        assert!(map.contains_key("/world"));

        let mut import = SceneImport::default();
        let result = node.execute(&ctx, &mut ExecuteTarget::SceneOpImport(&mut import));
        assert_eq!(result, Err(NodeError::Aborted));
        assert!(node.core().has_aborted());

        let mut tess = crate::targets::TessellateContext::default();
        let result = node.execute(&ctx, &mut ExecuteTarget::MeshTessellate(&mut tess));
        assert!(matches!(result, Err(NodeError::Failed(msg)) if msg == "no MeshTessellate"));

        // A new execute clears the previous failure.
        assert!(node
            .execute(&ctx, &mut ExecuteTarget::SceneNodeDescriptions(&mut map))
            .is_ok());
        assert_eq!(node.core().error_state(), 0);
    }

    #[test]
    fn unhandled_target_names_itself() {
        let mut node = ErrorNode::new("Sentinel", 0, "");
        let mut map = NodeDescriptionMap::new();
        let result = node.execute(
            &NodeContext::new(),
            &mut ExecuteTarget::SceneNodeDescriptions(&mut map),
        );
        let Err(NodeError::Failed(msg)) = result else {
            panic!("expected failure");
        };
        assert_eq!(
            msg,
            "unrecognized target 'SceneNodeDescriptions'. This is likely a coding error"
        );
    }

    #[test]
    fn error_node_encodes_state() {
        let node = ErrorNode::new("UsdIO", -2, "bad stage");
        assert_eq!(node.core().error_message(), "UsdIO: bad stage");
        assert!(ErrorNode::new("UsdIO", -1, "ignored").core().has_aborted());
        assert_eq!(ErrorNode::new("UsdIO", 0, "").core().error_state(), 0);
    }

    #[test]
    fn concurrent_expand_runs_hook_once() {
        let node = CountingNode::default();
        std::thread::scope(|scope| {
            for _ in 0..6 {
                scope.spawn(|| assert!(node.expand_contents("*").is_ok()));
            }
        });
        assert_eq!(node.expansions.load(Ordering::SeqCst), 1);
        assert_eq!(node.status(), NodeStatus::Complete);
    }

    #[test]
    fn children_lookup_and_destroy() {
        let mut node = CountingNode::default();
        node.core_mut().add_child(named("cam", "/root/cam"));
        node.core_mut().add_child(named("geo", "/root/geo"));
        assert_eq!(node.core().num_children(), 2);
        assert!(node.core().child_by_name("geo").is_some());
        assert!(node.core().child_by_path("/root/cam").is_some());
        assert!(node.core().child_by_name("light").is_none());
        assert!(node.core().child(5).is_none());

        let kept = node.core().child(0);
        node.expand_contents("").unwrap();
        node.destroy_contents();
        assert_eq!(node.destroyed, 1);
        assert_eq!(node.core().num_children(), 0);
        assert_eq!(node.status(), NodeStatus::NotExpanded);
        let kept = kept.unwrap();
        assert_eq!(lock_node(&kept).status(), NodeStatus::NotExpanded);

        node.disable();
        assert_eq!(node.status(), NodeStatus::Disabled);
        assert!(node.expand_contents("").is_ok());
        assert_eq!(node.expansions.load(Ordering::SeqCst), 1);
    }
}
