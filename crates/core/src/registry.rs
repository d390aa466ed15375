use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError};

use crate::args::ArgSet;
use crate::context::NodeContext;
use crate::node::{Node, NodeError, NodeResult, ParentLink};
use crate::targets::ExecuteTarget;

/// Prefix prepended to a class name to form its plugin module name.
pub const PLUGIN_PREFIX: &str = "fsr";

pub type NodeBuilder =
    fn(class: &str, args: &ArgSet, parent: Option<ParentLink>) -> Option<Box<dyn Node>>;

/// Class name plus the function that builds instances of it.
#[derive(Clone)]
pub struct Description {
    pub class: String,
    pub builder: NodeBuilder,
}

impl std::fmt::Debug for Description {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Description").field("class", &self.class).finish()
    }
}

impl Description {
    pub fn new(class: impl Into<String>, builder: NodeBuilder) -> Self {
        Self {
            class: class.into(),
            builder,
        }
    }
}

/// Loads external plugin modules. A successful load is expected to call
/// [`Registry::register`] for the classes the module provides.
pub trait PluginLoader: Send + Sync {
    fn load(&self, module: &str, registry: &Registry) -> Result<(), String>;
}

#[derive(Default)]
struct Tables {
    descriptions: HashMap<String, Description>,
    aliases: HashMap<String, String>,
}

/// Class name to builder map. Entries are added on registration or first
/// successful plugin load and are never evicted.
#[derive(Default)]
pub struct Registry {
    tables: Mutex<Tables>,
    loader: Mutex<Option<Arc<dyn PluginLoader>>>,
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut classes = self.classes();
        classes.sort();
        f.debug_struct("Registry").field("classes", &classes).finish()
    }
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Process-wide registry.
    pub fn global() -> &'static Registry {
        static GLOBAL: OnceLock<Registry> = OnceLock::new();
        GLOBAL.get_or_init(Registry::new)
    }

    fn tables(&self) -> MutexGuard<'_, Tables> {
        self.tables.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn set_plugin_loader(&self, loader: Arc<dyn PluginLoader>) {
        *self.loader.lock().unwrap_or_else(PoisonError::into_inner) = Some(loader);
    }

    pub fn register(&self, description: Description) {
        let mut tables = self.tables();
        tables
            .descriptions
            .insert(description.class.clone(), description);
    }

    /// Makes `alias` resolve to the already-named `class`.
    pub fn register_alias(&self, alias: impl Into<String>, class: impl Into<String>) {
        self.tables().aliases.insert(alias.into(), class.into());
    }

    pub fn classes(&self) -> Vec<String> {
        self.tables().descriptions.keys().cloned().collect()
    }

    /// In-memory lookup only, no plugin loading.
    pub fn lookup(&self, class: &str) -> Option<Description> {
        let tables = self.tables();
        if let Some(desc) = tables.descriptions.get(class) {
            return Some(desc.clone());
        }
        tables
            .aliases
            .get(class)
            .and_then(|target| tables.descriptions.get(target))
            .cloned()
    }

    /// Finds `class`, loading its plugin module on a miss.
    pub fn find(&self, class: &str) -> Option<Description> {
        if class.is_empty() {
            return None;
        }
        if let Some(desc) = self.lookup(class) {
            return Some(desc);
        }

        let module = format!("{PLUGIN_PREFIX}{class}");
        let loader = self
            .loader
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        let Some(loader) = loader else {
            tracing::error!("Registry::find('{module}') error: plugin not found, no loader installed");
            return None;
        };
        if let Err(err) = loader.load(&module, self) {
            tracing::error!("Registry::find('{module}') error: plugin not loaded, '{err}'");
            return None;
        }

        let desc = self.lookup(class);
        if desc.is_none() {
            tracing::error!(
                "Registry::find('{class}') error: plugin did not define a Description matching the plugin name"
            );
        }
        desc
    }

    pub fn create(
        &self,
        class: &str,
        args: &ArgSet,
        parent: Option<ParentLink>,
    ) -> Option<Box<dyn Node>> {
        let desc = self.find(class)?;
        (desc.builder)(class, args, parent)
    }

    /// Builds a node, executes `target` on it and drops it again. Creation
    /// failure and build-time errors are reported without executing.
    pub fn execute_immediate(
        &self,
        class: &str,
        args: &ArgSet,
        parent: Option<ParentLink>,
        ctx: &NodeContext,
        target: &mut ExecuteTarget<'_>,
    ) -> NodeResult {
        let Some(mut node) = self.create(class, args, parent) else {
            return Err(NodeError::Failed(format!(
                "cannot create node of class type '{class}'"
            )));
        };
        if let Some(err) = node.core().error_status() {
            return Err(err.clone());
        }
        node.execute(ctx, target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::tests::CountingNode;
    use crate::node::ErrorNode;
    use crate::targets::NodeDescriptionMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn build_counting(_class: &str, args: &ArgSet, _parent: Option<ParentLink>) -> Option<Box<dyn Node>> {
        Some(Box::new(CountingNode::with_args(args.clone())))
    }

    fn build_broken(class: &str, _args: &ArgSet, _parent: Option<ParentLink>) -> Option<Box<dyn Node>> {
        Some(Box::new(ErrorNode::new(class, -2, "cannot open stage")))
    }

    fn build_none(_class: &str, _args: &ArgSet, _parent: Option<ParentLink>) -> Option<Box<dyn Node>> {
        None
    }

    /// Registers `TestIO` when asked for `fsrTestIO`.
    #[derive(Default)]
    struct TestLoader {
        loads: AtomicUsize,
    }

    impl PluginLoader for TestLoader {
        fn load(&self, module: &str, registry: &Registry) -> Result<(), String> {
            self.loads.fetch_add(1, Ordering::SeqCst);
            match module {
                "fsrTestIO" => {
                    registry.register(Description::new("TestIO", build_counting));
                    Ok(())
                }
                "fsrEmptyIO" => Ok(()),
                _ => Err(format!("{module}: no such file")),
            }
        }
    }

    #[test]
    fn loads_plugin_once_on_miss() {
        let registry = Registry::new();
        let loader = Arc::new(TestLoader::default());
        registry.set_plugin_loader(loader.clone());

        assert!(registry.lookup("TestIO").is_none());
        assert!(registry.find("TestIO").is_some());
        assert!(registry.find("TestIO").is_some());
        assert_eq!(loader.loads.load(Ordering::SeqCst), 1);

        assert!(registry.find("MissingIO").is_none());
        assert!(registry.find("EmptyIO").is_none());
        assert!(registry.find("").is_none());
        assert_eq!(loader.loads.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn find_without_loader_fails() {
        let registry = Registry::new();
        assert!(registry.find("UsdIO").is_none());
        registry.register(Description::new("UsdIO", build_counting));
        registry.register_alias("UsdaIO", "UsdIO");
        assert_eq!(registry.find("UsdaIO").map(|d| d.class), Some("UsdIO".to_string()));
    }

    #[test]
    fn global_registry_is_shared() {
        Registry::global().register(Description::new("GlobalCountingIO", build_counting));
        assert!(std::ptr::eq(Registry::global(), Registry::global()));
        assert!(Registry::global().find("GlobalCountingIO").is_some());
        assert!(Registry::new().lookup("GlobalCountingIO").is_none());
    }

    #[test]
    fn concurrent_lookups_share_registration() {
        let registry = Registry::new();
        let loader = Arc::new(TestLoader::default());
        registry.set_plugin_loader(loader.clone());
        std::thread::scope(|scope| {
            for _ in 0..4 {
                scope.spawn(|| assert!(registry.create("TestIO", &ArgSet::new(), None).is_some()));
            }
        });
        assert!(loader.loads.load(Ordering::SeqCst) >= 1);
        assert_eq!(registry.classes(), vec!["TestIO".to_string()]);
    }

    #[test]
    fn execute_immediate_reports_each_failure() {
        let registry = Registry::new();
        registry.register(Description::new("TestIO", build_counting));
        registry.register(Description::new("BrokenIO", build_broken));
        registry.register(Description::new("NoneIO", build_none));
        let ctx = NodeContext::new();
        let mut map = NodeDescriptionMap::new();

        let result = registry.execute_immediate(
            "TestIO",
            &ArgSet::new(),
            None,
            &ctx,
            &mut ExecuteTarget::SceneNodeDescriptions(&mut map),
        );
        assert!(result.is_ok());
        assert_eq!(map.len(), 1);

        let result = registry.execute_immediate(
            "NopeIO",
            &ArgSet::new(),
            None,
            &ctx,
            &mut ExecuteTarget::SceneNodeDescriptions(&mut map),
        );
        assert_eq!(
            result,
            Err(NodeError::Failed("cannot create node of class type 'NopeIO'".into()))
        );

        let result = registry.execute_immediate(
            "NoneIO",
            &ArgSet::new(),
            None,
            &ctx,
            &mut ExecuteTarget::SceneNodeDescriptions(&mut map),
        );
        assert!(matches!(result, Err(NodeError::Failed(msg)) if msg.contains("'NoneIO'")));

        let result = registry.execute_immediate(
            "BrokenIO",
            &ArgSet::new(),
            None,
            &ctx,
            &mut ExecuteTarget::SceneNodeDescriptions(&mut map),
        );
        assert_eq!(
            result,
            Err(NodeError::Failed("BrokenIO: cannot open stage".into()))
        );
    }
}
