pub mod arg_keys;
mod args;
mod axis;
mod context;
mod expansion;
mod lookat;
pub mod math;
mod node;
mod parallel;
mod registry;
mod scene;
mod scene_loader;
mod settings;
mod targets;

pub use args::{ArgSet, HashValue};
pub use axis::{AxisKnobVals, AxisVals};
pub use context::NodeContext;
pub use expansion::{Expansion, NodeStatus};
pub use lookat::{aim_rotations, AimLocation, LookatMethod, LookatVals, LOOKAT_ROT_ORDER};
pub use math::{AxisDirection, Box2d, Box3d, Mat4d, RotationOrder, TransformComponents, XformOrder};
pub use node::{
    lock_node, share, ErrorNode, Node, NodeCore, NodeError, NodeResult, ParentLink, SharedNode,
};
pub use registry::{Description, NodeBuilder, PluginLoader, Registry, PLUGIN_PREFIX};
pub use scene::{load_snapshot, samples_from_matrices, scene_node_infos, scene_xform_from_axis};
pub use scene_loader::{trimmed_path, ExtensionMap, SceneLoader, IO_PLUGIN_CLASS, PATH_MAX_DEPTH, ROOT_PATH};
pub use settings::{SceneReadSettings, DEFAULT_NODE_TYPE};
pub use targets::{
    ExecuteTarget, NodeDescription, NodeDescriptionMap, NodeFilterPattern, NodeFilterPatternList,
    NodePathSelections, SceneArchiveContext, SceneImport, TessellateContext,
};
