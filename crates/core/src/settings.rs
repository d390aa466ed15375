use serde::{Deserialize, Serialize};

use crate::arg_keys::{self, scene};
use crate::args::ArgSet;
use crate::math::{RotationOrder, XformOrder};

pub const DEFAULT_NODE_TYPE: &str = "xform";

/// Scene file import controls.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneReadSettings {
    pub read_enabled: bool,
    pub file: String,
    /// Scenegraph path of the node to import.
    pub node_path: String,
    /// Node type searched for when no path is given.
    pub default_node_type: String,
    pub decompose_xform_order: XformOrder,
    pub decompose_rot_order: RotationOrder,
    pub t_enable: bool,
    pub r_enable: bool,
    pub s_enable: bool,
    pub euler_filter_enable: bool,
    /// Keep the parent transform in separate channels.
    pub parent_extract_enable: bool,
    pub read_debug: bool,
    pub archive_debug: bool,
    /// Explicit extension mappings, e.g. `"usd,usda,usdc=UsdIO abc=AbcIO"`.
    pub extension_mappings: String,
}

impl Default for SceneReadSettings {
    fn default() -> Self {
        Self {
            read_enabled: true,
            file: String::new(),
            node_path: String::new(),
            default_node_type: DEFAULT_NODE_TYPE.to_string(),
            decompose_xform_order: XformOrder::SRT,
            decompose_rot_order: RotationOrder::ZXY,
            t_enable: true,
            r_enable: true,
            s_enable: true,
            euler_filter_enable: true,
            parent_extract_enable: true,
            read_debug: false,
            archive_debug: false,
            extension_mappings: String::new(),
        }
    }
}

impl SceneReadSettings {
    pub fn from_json(text: &str) -> Result<Self, String> {
        serde_json::from_str(text).map_err(|err| format!("invalid scene settings: {err}"))
    }

    pub fn to_json(&self) -> Result<String, String> {
        serde_json::to_string_pretty(self).map_err(|err| format!("cannot write scene settings: {err}"))
    }

    /// Arguments for building an IO node with `directive` rooted at `path`.
    pub fn to_node_args(&self, file: &str, directive: &str, path: &str) -> ArgSet {
        let mut args = ArgSet::new();
        args.set_string(arg_keys::NODE_DIRECTIVE, directive);
        args.set_string(scene::FILE, file);
        args.set_string(scene::PATH, path);
        args.set_bool(scene::READ_DEBUG, self.read_debug);
        args.set_bool(scene::FILE_ARCHIVE_DEBUG, self.archive_debug);
        args
    }

    /// Arguments controlling how a node's transform is imported.
    pub fn to_target_args(&self) -> ArgSet {
        let mut args = ArgSet::new();
        args.set_int(scene::DECOMPOSE_XFORM_ORDER, self.decompose_xform_order.index());
        args.set_int(scene::DECOMPOSE_ROT_ORDER, self.decompose_rot_order.index());
        args.set_bool(scene::T_ENABLE, self.t_enable);
        args.set_bool(scene::R_ENABLE, self.r_enable);
        args.set_bool(scene::S_ENABLE, self.s_enable);
        args.set_bool(scene::EULER_FILTER_ENABLE, self.euler_filter_enable);
        args.set_bool(scene::PARENT_EXTRACT_ENABLE, self.parent_extract_enable);
        args.set_bool(scene::READ_DEBUG, self.read_debug);
        args.set_bool(scene::FILE_ARCHIVE_DEBUG, self.archive_debug);
        args
    }

    /// Reads every `scene:*` key present in `args`, defaulting the rest.
    pub fn from_args(args: &ArgSet) -> Self {
        let defaults = Self::default();
        Self {
            read_enabled: defaults.read_enabled,
            file: args.get_string(scene::FILE, "").to_string(),
            node_path: args.get_string(scene::PATH, "").to_string(),
            default_node_type: args
                .get_string(scene::NODE_TYPE, &defaults.default_node_type)
                .to_string(),
            decompose_xform_order: XformOrder::from_index(
                args.get_int(scene::DECOMPOSE_XFORM_ORDER, defaults.decompose_xform_order.index()),
            )
            .unwrap_or(defaults.decompose_xform_order),
            decompose_rot_order: RotationOrder::from_index(
                args.get_int(scene::DECOMPOSE_ROT_ORDER, defaults.decompose_rot_order.index()),
            )
            .unwrap_or(defaults.decompose_rot_order),
            t_enable: args.get_bool(scene::T_ENABLE, defaults.t_enable),
            r_enable: args.get_bool(scene::R_ENABLE, defaults.r_enable),
            s_enable: args.get_bool(scene::S_ENABLE, defaults.s_enable),
            euler_filter_enable: args.get_bool(scene::EULER_FILTER_ENABLE, defaults.euler_filter_enable),
            parent_extract_enable: args
                .get_bool(scene::PARENT_EXTRACT_ENABLE, defaults.parent_extract_enable),
            read_debug: args.get_bool(scene::READ_DEBUG, defaults.read_debug),
            archive_debug: args.get_bool(scene::FILE_ARCHIVE_DEBUG, defaults.archive_debug),
            extension_mappings: defaults.extension_mappings,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_fills_defaults() {
        let settings = SceneReadSettings::from_json(
            r#"{ "file": "shot.usd", "decompose_rot_order": "XYZ", "s_enable": false }"#,
        )
        .unwrap();
        assert_eq!(settings.file, "shot.usd");
        assert_eq!(settings.decompose_rot_order, RotationOrder::XYZ);
        assert!(!settings.s_enable);
        assert!(settings.t_enable);
        assert_eq!(settings.default_node_type, DEFAULT_NODE_TYPE);
        assert!(SceneReadSettings::from_json("{ nope").is_err());
    }

    #[test]
    fn target_args_round_trip() {
        let settings = SceneReadSettings {
            decompose_xform_order: XformOrder::TRS,
            r_enable: false,
            euler_filter_enable: false,
            ..SceneReadSettings::default()
        };
        let args = settings.to_target_args();
        assert_eq!(args.get(scene::DECOMPOSE_XFORM_ORDER), "5");
        assert_eq!(args.get(scene::DECOMPOSE_ROT_ORDER), "4");
        let back = SceneReadSettings::from_args(&args);
        assert_eq!(back.decompose_xform_order, XformOrder::TRS);
        assert!(!back.r_enable);
        assert!(!back.euler_filter_enable);
        assert!(back.parent_extract_enable);
    }

    #[test]
    fn node_args_carry_directive() {
        let settings = SceneReadSettings::default();
        let args = settings.to_node_args("a.abc", scene::NODE_TYPE_AUTO, "/cam");
        assert_eq!(args.get(arg_keys::NODE_DIRECTIVE), "scene:node:auto-detect");
        assert_eq!(args.get(scene::FILE), "a.abc");
        assert_eq!(args.get(scene::PATH), "/cam");
        assert!(!args.get_bool(scene::READ_DEBUG, true));
    }
}
