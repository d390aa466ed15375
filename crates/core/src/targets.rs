use std::collections::{BTreeMap, BTreeSet};

use glam::DVec3;
use serde::{Deserialize, Serialize};

use crate::args::HashValue;
use crate::axis::AxisVals;
use crate::math::Box3d;

/// Operation a node is asked to perform, with its typed payload.
#[derive(Debug)]
pub enum ExecuteTarget<'a> {
    SceneArchive(&'a mut SceneArchiveContext),
    ScenePathFilters(&'a mut NodeFilterPatternList),
    SceneNodeDescriptions(&'a mut NodeDescriptionMap),
    SelectedSceneNodePaths(&'a mut NodePathSelections),
    SceneOpImport(&'a mut SceneImport),
    MeshTessellate(&'a mut TessellateContext),
}

impl ExecuteTarget<'_> {
    pub fn name(&self) -> &'static str {
        match self {
            ExecuteTarget::SceneArchive(_) => "SceneArchive",
            ExecuteTarget::ScenePathFilters(_) => "ScenePathFilters",
            ExecuteTarget::SceneNodeDescriptions(_) => "SceneNodeDescriptions",
            ExecuteTarget::SelectedSceneNodePaths(_) => "SelectedSceneNodePaths",
            ExecuteTarget::SceneOpImport(_) => "SceneOpImport",
            ExecuteTarget::MeshTessellate(_) => "MeshTessellate",
        }
    }
}

/// Cache handle for an open scene file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SceneArchiveContext {
    pub file: String,
    pub context_id: String,
    pub context_hash: HashValue,
    /// Number of distinct topologies over the archive's time range.
    pub topology_variance: u32,
    pub is_open: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeFilterPattern {
    pub name_expr: String,
    pub type_expr: String,
}

impl NodeFilterPattern {
    pub fn new(name_expr: impl Into<String>, type_expr: impl Into<String>) -> Self {
        Self {
            name_expr: name_expr.into(),
            type_expr: type_expr.into(),
        }
    }
}

pub type NodeFilterPatternList = Vec<NodeFilterPattern>;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeDescription {
    pub path: String,
    pub node_type: String,
    pub note: String,
}

impl NodeDescription {
    pub fn new(path: impl Into<String>, node_type: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            node_type: node_type.into(),
            note: String::new(),
        }
    }
}

/// Descriptions keyed and ordered by scenegraph path.
pub type NodeDescriptionMap = BTreeMap<String, NodeDescription>;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodePathSelections {
    pub paths: BTreeSet<String>,
}

/// Transform samples a reader fills in for one scene node.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SceneImport {
    pub node_path: String,
    /// Sample times requested by the caller.
    pub times: Vec<f64>,
    /// One entry per requested time, in any order.
    pub samples: Vec<AxisVals>,
    /// Class the reader detected for the node.
    pub node_type: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TessellateContext {
    pub points: Vec<DVec3>,
    pub face_vertex_counts: Vec<u32>,
    pub face_vertex_indices: Vec<u32>,
    pub bbox: Box3d,
}

impl TessellateContext {
    pub fn add_face(&mut self, points: &[DVec3]) {
        let base = self.points.len() as u32;
        for (idx, p) in points.iter().enumerate() {
            self.points.push(*p);
            self.face_vertex_indices.push(base + idx as u32);
            self.bbox.expand(*p);
        }
        self.face_vertex_counts.push(points.len() as u32);
    }
}
