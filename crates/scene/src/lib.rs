use glam::{Mat4, Vec3};

/// A resolved transform sample, ready for a host to consume.
#[derive(Debug, Clone, PartialEq)]
pub struct SceneXform {
    pub time: f64,
    pub local: Mat4,
    pub parent: Mat4,
    pub world: Mat4,
}

impl Default for SceneXform {
    fn default() -> Self {
        Self {
            time: 0.0,
            local: Mat4::IDENTITY,
            parent: Mat4::IDENTITY,
            world: Mat4::IDENTITY,
        }
    }
}

impl SceneXform {
    pub fn world_translation(&self) -> Vec3 {
        self.world.w_axis.truncate()
    }

    /// Direction the local `axis` points in world space.
    pub fn world_direction(&self, axis: Vec3) -> Vec3 {
        self.world.transform_vector3(axis).normalize_or_zero()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SceneNodeInfo {
    pub path: String,
    pub node_type: String,
    pub note: String,
}

impl SceneNodeInfo {
    pub fn name(&self) -> &str {
        self.path.rsplit('/').next().unwrap_or(&self.path)
    }

    /// Number of path components below the root.
    pub fn depth(&self) -> usize {
        self.path.split('/').filter(|part| !part.is_empty()).count()
    }
}

/// Transform samples and node records gathered from one scene file.
#[derive(Debug, Clone, Default)]
pub struct SceneSnapshot {
    pub file: String,
    pub nodes: Vec<SceneNodeInfo>,
    pub xforms: Vec<SceneXform>,
}

impl SceneSnapshot {
    pub fn node(&self, path: &str) -> Option<&SceneNodeInfo> {
        self.nodes.iter().find(|node| node.path == path)
    }

    pub fn nodes_of_type<'a>(&'a self, node_type: &'a str) -> impl Iterator<Item = &'a SceneNodeInfo> {
        self.nodes.iter().filter(move |node| node.node_type == node_type)
    }

    /// Sample at or just before `time`.
    pub fn xform_at(&self, time: f64) -> Option<&SceneXform> {
        self.xforms
            .iter()
            .take_while(|xform| xform.time <= time)
            .last()
            .or_else(|| self.xforms.first())
    }
}
