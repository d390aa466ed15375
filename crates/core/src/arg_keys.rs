//! Reserved attribute names. Keys follow a `domain:subdomain:leaf` layout.

/// Prefix shared by all node keys.
pub const NODE: &str = "fsr:node";
/// Node class, the same string the node was built from.
pub const NODE_TYPE: &str = "fsr:node:type";
pub const NODE_NAME: &str = "fsr:node:name";
/// Node path inside the node tree, not a scenegraph path.
pub const NODE_PATH: &str = "fsr:node:path";
/// Builder/execution directive.
pub const NODE_DIRECTIVE: &str = "fsr:node:directive";
pub const NODE_DEBUG: &str = "fsr:node:debug";
pub const NODE_DEBUG_ATTRIBS: &str = "fsr:node:debug:attribs";
pub const NODE_ERROR_STATE: &str = "fsr:node:error_state";
pub const NODE_ERROR_MSG: &str = "fsr:node:error_msg";

/// Uninitialized string.
pub const INVALID_TOKEN: &str = "<invalid>";
/// Intentionally empty string.
pub const EMPTY_TOKEN: &str = "<empty>";

pub const FRAME: &str = "frame";
pub const FPS: &str = "fps";

pub mod scene {
    pub const READ_DEBUG: &str = "scene:read:debug";

    pub const DECOMPOSE_XFORM_ORDER: &str = "scene:decompose_xform_order";
    pub const DECOMPOSE_ROT_ORDER: &str = "scene:decompose_rot_order";

    pub const T_ENABLE: &str = "scene:T_enable";
    pub const R_ENABLE: &str = "scene:R_enable";
    pub const S_ENABLE: &str = "scene:S_enable";
    pub const EULER_FILTER_ENABLE: &str = "scene:euler_filter:enable";
    pub const PARENT_EXTRACT_ENABLE: &str = "scene:parent_extract:enable";

    pub const FILE: &str = "scene:file";

    pub const FILE_ARCHIVE: &str = "scene:file:archive";
    pub const FILE_ARCHIVE_OPEN: &str = "scene:file:archive:open";
    pub const FILE_ARCHIVE_CLOSE: &str = "scene:file:archive:close";
    pub const FILE_ARCHIVE_INVALIDATE: &str = "scene:file:archive:invalidate";
    pub const FILE_ARCHIVE_CONTEXT_ID: &str = "scene:file:archive:context:id";
    pub const FILE_ARCHIVE_CONTEXT_HASH: &str = "scene:file:archive:context:hash";
    pub const FILE_ARCHIVE_VARIANCE: &str = "scene:file:archive:variance";
    pub const FILE_ARCHIVE_DEBUG: &str = "scene:file:archive:debug";

    pub const NODE_FILTER_PATTERNS: &str = "scene:node:filter:patterns";
    pub const NODE_FILTER_HASH: &str = "scene:node:filter:hash";
    pub const NODE_SELECTION_HASH: &str = "scene:node:selection:hash";

    /// Scenegraph path, not a node tree path.
    pub const PATH: &str = "scene:path";
    pub const PATH_MAX_DEPTH: &str = "scene:path:max_depth";

    pub const NODE: &str = "scene:node";
    /// Node class hint for the IO plugin.
    pub const NODE_TYPE: &str = "scene:node:type";
    pub const NODE_FIND_FIRST_VALID: &str = "scene:node:find-first-valid";
    pub const NODE_TYPE_AUTO: &str = "scene:node:auto-detect";
    pub const NODE_TYPE_CONTENTS: &str = "scene:node:get-contents";
}

pub mod lookat {
    pub const ENABLE: &str = "lookat:enable";
    pub const AXIS: &str = "lookat:axis";
    pub const DO_RX: &str = "lookat:rx";
    pub const DO_RY: &str = "lookat:ry";
    pub const DO_RZ: &str = "lookat:rz";
    pub const USE_POINT: &str = "lookat:use_point";
    pub const POINT: &str = "lookat:point";
    pub const METHOD: &str = "lookat:method";
    pub const AIM_LOCATION: &str = "lookat:aim_location";
    pub const MIX: &str = "lookat:mix";
}
