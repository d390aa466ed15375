//! Resolves scene files to IO plugins and drives them through the node
//! engine to list, find and import scene nodes.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, OnceLock, PoisonError};

use crate::arg_keys::scene;
use crate::args::ArgSet;
use crate::axis::AxisVals;
use crate::context::NodeContext;
use crate::node::NodeError;
use crate::registry::Registry;
use crate::settings::SceneReadSettings;
use crate::targets::{ExecuteTarget, NodeDescriptionMap, SceneImport};

/// Suffix appended to a camel-cased extension to form a plugin class.
pub const IO_PLUGIN_CLASS: &str = "IO";
pub const ROOT_PATH: &str = "/";
pub const PATH_MAX_DEPTH: i32 = 7;

/// Splits an extension off `path`, either a leading `ext:` prefix or a
/// trailing `.ext`. Returns `(trimmed_path, extension)`.
///
/// The prefix form only applies when no `/`, `\` or `.` precedes the colon.
/// A drive letter (`C:\` or `C:/`) is part of the path, not a prefix.
pub fn trimmed_path(path: &str) -> (String, String) {
    let mut ext_start: Option<usize> = None;
    let mut have_path_chars = false;
    for (idx, ch) in path.char_indices() {
        match ch {
            ':' if !have_path_chars && is_drive_colon(path, idx) => {
                have_path_chars = true;
            }
            ':' if !have_path_chars => {
                if idx == 0 {
                    return (String::new(), String::new());
                }
                return (path[idx + 1..].to_string(), path[..idx].to_string());
            }
            '.' => {
                ext_start = Some(idx + 1);
                have_path_chars = true;
            }
            '/' | '\\' => {
                ext_start = None;
                have_path_chars = true;
            }
            _ => {}
        }
    }
    let ext = ext_start.map(|start| path[start..].to_string()).unwrap_or_default();
    (path.to_string(), ext)
}

fn is_drive_colon(path: &str, idx: usize) -> bool {
    let bytes = path.as_bytes();
    idx == 1 && bytes[0].is_ascii_alphabetic() && matches!(bytes.get(2), Some(b'\\' | b'/'))
}

/// Extension to plugin class map. Unknown extensions are camel-cased
/// (`abc` -> `AbcIO`) and cached.
#[derive(Debug, Default)]
pub struct ExtensionMap {
    map: Mutex<HashMap<String, String>>,
}

impl ExtensionMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn global() -> &'static ExtensionMap {
        static GLOBAL: OnceLock<ExtensionMap> = OnceLock::new();
        GLOBAL.get_or_init(ExtensionMap::new)
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, String>> {
        self.map.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Adds whitespace-separated `ext[,ext...]=Plugin` mappings.
    /// Extensions are stored lower-case; malformed entries are skipped.
    pub fn add_mappings(&self, mappings: &str) {
        for mapping in mappings.split_whitespace() {
            let Some((exts, plugin)) = mapping.split_once('=') else {
                continue;
            };
            if exts.is_empty() {
                continue;
            }
            let mut map = self.lock();
            for ext in exts.split(',').filter(|ext| !ext.is_empty()) {
                map.insert(ext.to_lowercase(), plugin.to_string());
            }
        }
    }

    pub fn get(&self, ext: &str) -> Option<String> {
        self.lock().get(&ext.to_lowercase()).cloned()
    }

    /// `(file_path, plugin_type)` for `path`. The plugin type is empty when
    /// the path has no extension.
    pub fn plugin_type_for_path(&self, path: &str) -> (String, String) {
        let (file_path, ext) = trimmed_path(path);
        if ext.is_empty() {
            return (file_path, String::new());
        }
        let ext = ext.to_lowercase();
        let mut map = self.lock();
        let plugin_type = map
            .entry(ext.clone())
            .or_insert_with(|| {
                let mut chars = ext.chars();
                let mut plugin = String::with_capacity(ext.len() + IO_PLUGIN_CLASS.len());
                if let Some(first) = chars.next() {
                    plugin.extend(first.to_uppercase());
                }
                plugin.push_str(chars.as_str());
                plugin.push_str(IO_PLUGIN_CLASS);
                plugin
            })
            .clone();
        (file_path, plugin_type)
    }
}

/// Loads scene nodes through IO plugins, keeping the last load error.
#[derive(Debug, Default)]
pub struct SceneLoader {
    pub settings: SceneReadSettings,
    extensions: ExtensionMap,
    load_error: Option<String>,
}

impl SceneLoader {
    pub fn new(settings: SceneReadSettings) -> Self {
        let extensions = ExtensionMap::new();
        extensions.add_mappings(&settings.extension_mappings);
        Self {
            settings,
            extensions,
            load_error: None,
        }
    }

    pub fn extensions(&self) -> &ExtensionMap {
        &self.extensions
    }

    pub fn load_error(&self) -> Option<&str> {
        self.load_error.as_deref()
    }

    pub fn set_load_error(&mut self, msg: impl Into<String>) {
        let msg = msg.into();
        if self.settings.read_debug {
            tracing::debug!("{msg}");
        }
        self.load_error = Some(msg);
    }

    pub fn clear_load_error(&mut self) {
        self.load_error = None;
    }

    fn resolve(&self, file: &str) -> Option<(String, String)> {
        let (file_path, plugin_type) = self.extensions.plugin_type_for_path(file);
        if self.settings.read_debug {
            tracing::debug!("SceneLoader: file='{file}' plugin_type='{plugin_type}'");
        }
        if file_path.is_empty() || plugin_type.is_empty() {
            return None;
        }
        Some((file_path, plugin_type))
    }

    fn read_error(&mut self, err: &NodeError, file_path: &str) {
        self.set_load_error(format!(
            "SceneLoader: error '{}' trying to read file '{file_path}'",
            err.message()
        ));
    }

    /// Lists the nodes in the scene file, up to `PATH_MAX_DEPTH` below root.
    /// Returns `None` when the file cannot be read.
    pub fn get_node_descriptions(&mut self, registry: &Registry) -> Option<NodeDescriptionMap> {
        let Some((file_path, plugin_type)) = self.resolve(&self.settings.file) else {
            tracing::warn!(
                "SceneLoader: unable to read nodes from '{}'",
                self.settings.file
            );
            return None;
        };

        let node_args = self
            .settings
            .to_node_args(&file_path, scene::NODE_TYPE_CONTENTS, ROOT_PATH);
        let mut target_ctx = NodeContext::from_args(self.debug_args());
        target_ctx.set_string(scene::PATH, ROOT_PATH);
        target_ctx.set_int(scene::PATH_MAX_DEPTH, PATH_MAX_DEPTH);

        let mut descriptions = NodeDescriptionMap::new();
        let result = registry.execute_immediate(
            &plugin_type,
            &node_args,
            None,
            &target_ctx,
            &mut ExecuteTarget::SceneNodeDescriptions(&mut descriptions),
        );
        match result {
            Ok(()) | Err(NodeError::Aborted) => Some(descriptions),
            Err(err) => {
                tracing::warn!(
                    "SceneLoader::get_node_descriptions('{file_path}') error '{}'",
                    err.message()
                );
                None
            }
        }
    }

    /// First node of the default type under root, or an empty string.
    pub fn find_default_node(&mut self, registry: &Registry) -> String {
        let Some((file_path, plugin_type)) = self.resolve(&self.settings.file) else {
            return String::new();
        };
        let node_type = self.settings.default_node_type.clone();
        if node_type.is_empty() {
            tracing::warn!("SceneLoader: no default node type to search for");
            return String::new();
        }

        let node_args = self
            .settings
            .to_node_args(&file_path, scene::NODE_FIND_FIRST_VALID, ROOT_PATH);
        let mut target_ctx = NodeContext::from_args(self.debug_args());
        target_ctx.set_string(scene::PATH, ROOT_PATH);
        target_ctx.set_string(scene::NODE_TYPE, node_type);

        let mut found = NodeDescriptionMap::new();
        let result = registry.execute_immediate(
            &plugin_type,
            &node_args,
            None,
            &target_ctx,
            &mut ExecuteTarget::SceneNodeDescriptions(&mut found),
        );
        match result {
            Ok(()) => found.into_keys().next().unwrap_or_default(),
            Err(NodeError::Aborted) => String::new(),
            Err(err) => {
                self.read_error(&err, &file_path);
                String::new()
            }
        }
    }

    /// Fills in `node_path` with the default node when a file is set but no
    /// node was chosen. Returns true if the path changed.
    pub fn check_for_valid_node_path(&mut self, registry: &Registry) -> bool {
        if !self.settings.read_enabled
            || self.settings.file.is_empty()
            || !self.settings.node_path.is_empty()
        {
            return false;
        }
        let node_path = self.find_default_node(registry);
        if node_path.is_empty() {
            return false;
        }
        self.settings.node_path = node_path;
        true
    }

    /// Imports the transform samples of `node_path` at `times`. Samples come
    /// back sorted by time and Euler-filtered when enabled. An abort yields
    /// whatever the reader produced before stopping.
    pub fn read_scene_node(&mut self, registry: &Registry, times: &[f64]) -> Option<Vec<AxisVals>> {
        let Some((file_path, plugin_type)) = self.resolve(&self.settings.file) else {
            let file = self.settings.file.clone();
            self.set_load_error(format!("SceneLoader: no plugin available for file '{file}'"));
            return None;
        };
        let node_path = self.settings.node_path.clone();
        if node_path.is_empty() {
            self.set_load_error("SceneLoader: empty node path");
            return None;
        }

        let node_args = self
            .settings
            .to_node_args(&file_path, scene::NODE_TYPE_AUTO, &node_path);
        let target_ctx = NodeContext::from_args(self.settings.to_target_args());

        let mut import = SceneImport {
            node_path,
            times: times.to_vec(),
            ..SceneImport::default()
        };
        let result = registry.execute_immediate(
            &plugin_type,
            &node_args,
            None,
            &target_ctx,
            &mut ExecuteTarget::SceneOpImport(&mut import),
        );
        match result {
            Ok(()) | Err(NodeError::Aborted) => {}
            Err(err) => {
                self.read_error(&err, &file_path);
                return None;
            }
        }

        let mut samples = import.samples;
        samples.sort_by(|a, b| a.time.total_cmp(&b.time));
        if self.settings.euler_filter_enable {
            AxisVals::apply_euler_filter(self.settings.decompose_rot_order, &mut samples, false);
        }
        self.clear_load_error();
        Some(samples)
    }

    fn debug_args(&self) -> ArgSet {
        let mut args = ArgSet::new();
        args.set_bool(scene::READ_DEBUG, self.settings.read_debug);
        args.set_bool(scene::FILE_ARCHIVE_DEBUG, self.settings.archive_debug);
        args
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::arg_keys;
    use crate::math::{Mat4d, RotationOrder};
    use crate::node::{ErrorNode, Node, NodeCore, NodeResult, ParentLink};
    use crate::registry::Description;
    use crate::targets::NodeDescription;
    use glam::DVec3;

    /// Fake reader serving a fixed scene from its `scene:file` argument.
    struct FakeReader {
        core: NodeCore,
    }

    impl Node for FakeReader {
        fn core(&self) -> &NodeCore {
            &self.core
        }

        fn core_mut(&mut self) -> &mut NodeCore {
            &mut self.core
        }

        fn class_name(&self) -> &str {
            "FakeIO"
        }

        fn execute_hook(&mut self, ctx: &NodeContext, target: &mut ExecuteTarget<'_>) -> NodeResult {
            let file = self.core.args().get(scene::FILE).to_string();
            if file.contains("abort") {
                return Err(self.core.abort());
            }
            match target {
                ExecuteTarget::SceneNodeDescriptions(map) => {
                    let directive = self.core.args().get(arg_keys::NODE_DIRECTIVE);
                    let wanted = ctx.get_string(scene::NODE_TYPE, "");
                    for (path, node_type) in [("/world/geo", "mesh"), ("/world/cam", "xform"), ("/world/b", "xform")] {
                        if directive == scene::NODE_FIND_FIRST_VALID && node_type != wanted {
                            continue;
                        }
                        map.insert(path.to_string(), NodeDescription::new(path, node_type));
                    }
                    Ok(())
                }
                ExecuteTarget::SceneOpImport(import) => {
                    if import.node_path != "/world/cam" {
                        return Err(self.core.error(format!("no node '{}'", import.node_path)));
                    }
                    let order = RotationOrder::from_index(ctx.get_int(scene::DECOMPOSE_ROT_ORDER, 0))
                        .unwrap_or_default();
                    for (idx, time) in import.times.iter().enumerate().rev() {
                        let m = Mat4d::from_rotation_y((170.0 + 10.0 * idx as f64).to_radians());
                        let mut vals = AxisVals::new(*time);
                        vals.extract_from_matrix(&m, true, true, true, order, false);
                        import.samples.push(vals);
                    }
                    Ok(())
                }
                _ => Err(self.core.error("unsupported")),
            }
        }
    }

    fn build_fake(_class: &str, args: &ArgSet, parent: Option<ParentLink>) -> Option<Box<dyn Node>> {
        if args.get(scene::FILE).contains("broken") {
            return Some(Box::new(ErrorNode::new("FakeIO", -2, "bad header")));
        }
        Some(Box::new(FakeReader {
            core: NodeCore::new(args.clone(), parent),
        }))
    }

    pub(crate) fn registry() -> Registry {
        let registry = Registry::new();
        registry.register(Description::new("FakeIO", build_fake));
        registry
    }

    pub(crate) fn loader(file: &str) -> SceneLoader {
        SceneLoader::new(SceneReadSettings {
            file: file.to_string(),
            extension_mappings: "fk,fake=FakeIO".to_string(),
            ..SceneReadSettings::default()
        })
    }

    #[test]
    fn trims_prefix_and_suffix_extensions() {
        assert_eq!(trimmed_path("usd:/a/b"), ("/a/b".into(), "usd".into()));
        assert_eq!(trimmed_path("/a/b.Usda"), ("/a/b.Usda".into(), "Usda".into()));
        assert_eq!(trimmed_path("/a.dir/b"), ("/a.dir/b".into(), String::new()));
        assert_eq!(trimmed_path("/a/b:c.abc"), ("/a/b:c.abc".into(), "abc".into()));
        assert_eq!(trimmed_path(":x"), (String::new(), String::new()));
    }

    #[test]
    fn drive_letters_stay_in_the_path() {
        assert_eq!(
            trimmed_path("C:\\shots\\a.abc"),
            ("C:\\shots\\a.abc".into(), "abc".into())
        );
        assert_eq!(trimmed_path("d:/shots/b.usd"), ("d:/shots/b.usd".into(), "usd".into()));
        assert_eq!(trimmed_path("x:shot"), ("shot".into(), "x".into()));
        assert_eq!(trimmed_path("abc:C:/cache"), ("C:/cache".into(), "abc".into()));
    }

    #[test]
    fn plugin_types_from_map_or_camel_case() {
        let map = ExtensionMap::new();
        map.add_mappings("usd,USDA,usdc=UsdIO abc=AbcIO junk =NoExt");
        assert_eq!(map.plugin_type_for_path("/s/shot.usda").1, "UsdIO");
        assert_eq!(map.plugin_type_for_path("/s/shot.ABC").1, "AbcIO");
        assert_eq!(map.plugin_type_for_path("obj:/s/mesh").1, "ObjIO");
        assert_eq!(map.get("obj").as_deref(), Some("ObjIO"));
        assert_eq!(map.plugin_type_for_path("/s/noext").1, "");
        assert!(map.get("").is_none());
    }

    #[test]
    fn global_extension_map_is_shared() {
        ExtensionMap::global().add_mappings("fkg=GlobalFakeIO");
        assert!(std::ptr::eq(ExtensionMap::global(), ExtensionMap::global()));
        assert_eq!(
            ExtensionMap::global().plugin_type_for_path("/s/shot.FKG").1,
            "GlobalFakeIO"
        );
    }

    #[test]
    fn lists_node_descriptions() {
        let registry = registry();
        let mut loader = loader("/show/shot.fk");
        let nodes = loader.get_node_descriptions(&registry).unwrap();
        assert_eq!(nodes.len(), 3);
        assert!(loader.load_error().is_none());
        assert!(loader_none_for("/show/shot", &registry));
    }

    fn loader_none_for(file: &str, registry: &Registry) -> bool {
        loader(file).get_node_descriptions(registry).is_none()
    }

    #[test]
    fn finds_first_sorted_node_of_type() {
        let registry = registry();
        let mut loader = loader("fake:/show/shot");
        assert_eq!(loader.find_default_node(&registry), "/world/b");

        assert!(loader.check_for_valid_node_path(&registry));
        assert_eq!(loader.settings.node_path, "/world/b");
        assert!(!loader.check_for_valid_node_path(&registry));
    }

    #[test]
    fn find_reports_read_errors_but_not_aborts() {
        let registry = registry();
        let mut broken = loader("/show/broken.fk");
        assert_eq!(broken.find_default_node(&registry), "");
        assert_eq!(
            broken.load_error(),
            Some("SceneLoader: error 'FakeIO: bad header' trying to read file '/show/broken.fk'")
        );

        let mut aborted = loader("/show/abort.fk");
        assert_eq!(aborted.find_default_node(&registry), "");
        assert!(aborted.load_error().is_none());
    }

    #[test]
    fn reads_sorted_filtered_samples() {
        let registry = registry();
        let mut loader = loader("/show/shot.fk");
        loader.settings.node_path = "/world/cam".into();
        loader.settings.decompose_rot_order = RotationOrder::XYZ;
        let samples = loader.read_scene_node(&registry, &[1.0, 2.0, 3.0]).unwrap();
        let times: Vec<f64> = samples.iter().map(|s| s.time).collect();
        assert_eq!(times, vec![1.0, 2.0, 3.0]);
        for pair in samples.windows(2) {
            let delta = (pair[1].rotate - pair[0].rotate).abs().element_sum();
            assert!(delta < 20.0 + 1e-6, "flip between {:?} and {:?}", pair[0].rotate, pair[1].rotate);
        }
        let world = samples[2].local_matrix().vec_transform(DVec3::Z);
        let expected = Mat4d::from_rotation_y(190.0_f64.to_radians()).vec_transform(DVec3::Z);
        assert!((world - expected).abs().max_element() < 1e-9);
    }

    #[test]
    fn read_errors_are_recorded() {
        let registry = registry();
        let mut shot = loader("/show/shot.fk");
        assert!(shot.read_scene_node(&registry, &[1.0]).is_none());
        assert_eq!(shot.load_error(), Some("SceneLoader: empty node path"));

        shot.settings.node_path = "/world/missing".into();
        assert!(shot.read_scene_node(&registry, &[1.0]).is_none());
        assert_eq!(
            shot.load_error(),
            Some("SceneLoader: error 'no node '/world/missing'' trying to read file '/show/shot.fk'")
        );

        let mut no_plugin = SceneLoader::new(SceneReadSettings {
            file: "/show/noext".into(),
            node_path: "/world/cam".into(),
            ..SceneReadSettings::default()
        });
        assert!(no_plugin.read_scene_node(&registry, &[1.0]).is_none());
        assert_eq!(
            no_plugin.load_error(),
            Some("SceneLoader: no plugin available for file '/show/noext'")
        );

        let mut aborted = loader("/show/abort.fk");
        aborted.settings.node_path = "/world/cam".into();
        assert_eq!(aborted.read_scene_node(&registry, &[1.0]), Some(Vec::new()));
    }
}
