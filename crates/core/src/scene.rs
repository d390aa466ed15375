//! Conversion into the single-precision `fuser_scene` boundary types.

use fuser_scene::{SceneNodeInfo, SceneSnapshot, SceneXform};

use crate::axis::{AxisKnobVals, AxisVals};
use crate::math::Mat4d;
use crate::parallel;
use crate::registry::Registry;
use crate::scene_loader::SceneLoader;
use crate::settings::SceneReadSettings;
use crate::targets::NodeDescriptionMap;

pub fn scene_xform_from_axis(knob: &AxisKnobVals) -> SceneXform {
    SceneXform {
        time: knob.vals.time,
        local: knob.local_matrix.to_glam_f32(),
        parent: knob.parent_matrix.to_glam_f32(),
        world: knob.world_matrix().to_glam_f32(),
    }
}

/// Records sorted by path.
pub fn scene_node_infos(descriptions: &NodeDescriptionMap) -> Vec<SceneNodeInfo> {
    descriptions
        .values()
        .map(|desc| SceneNodeInfo {
            path: desc.path.clone(),
            node_type: desc.node_type.clone(),
            note: desc.note.clone(),
        })
        .collect()
}

/// Decomposes one world matrix per sample time into transform channels,
/// using the decompose order and T/R/S enables from `settings`. Parent
/// extraction splits each matrix into `parents[i]` and the remaining local
/// part when a parent list is given.
pub fn samples_from_matrices(
    settings: &SceneReadSettings,
    times: &[f64],
    matrices: &[Mat4d],
    parents: Option<&[Mat4d]>,
) -> Result<Vec<AxisVals>, String> {
    if times.len() != matrices.len() {
        return Err(format!(
            "{} sample times but {} matrices",
            times.len(),
            matrices.len()
        ));
    }
    if let Some(parents) = parents {
        if parents.len() != matrices.len() {
            return Err(format!(
                "{} parent matrices for {} samples",
                parents.len(),
                matrices.len()
            ));
        }
    }

    let order = settings.decompose_rot_order;
    let decomposed = parallel::map_samples(times, |idx, time| {
        let mut sample = AxisVals::new(*time);
        sample.xform_order = settings.decompose_xform_order;
        let mut local = matrices[idx];
        if let Some(parents) = parents.filter(|_| settings.parent_extract_enable) {
            let parent = parents[idx];
            if !sample.extract_from_matrix(
                &parent,
                settings.t_enable,
                settings.r_enable,
                settings.s_enable,
                order,
                true,
            ) {
                return Err(format!("cannot decompose parent matrix at time {time}"));
            }
            local = parent.inverse() * local;
        }
        if sample.extract_from_matrix(
            &local,
            settings.t_enable,
            settings.r_enable,
            settings.s_enable,
            order,
            false,
        ) {
            Ok(sample)
        } else {
            Err(format!("cannot decompose matrix at time {time}"))
        }
    });
    let mut samples = decomposed.into_iter().collect::<Result<Vec<AxisVals>, String>>()?;

    if settings.euler_filter_enable {
        AxisVals::apply_euler_filter(order, &mut samples, true);
    }
    Ok(samples)
}

/// Lists the scene file's nodes and, when a node is selected (or a default
/// one is found), imports its transform at `times`.
pub fn load_snapshot(
    registry: &Registry,
    loader: &mut SceneLoader,
    times: &[f64],
) -> Result<SceneSnapshot, String> {
    let descriptions = loader
        .get_node_descriptions(registry)
        .ok_or_else(|| format!("cannot list nodes in '{}'", loader.settings.file))?;
    loader.check_for_valid_node_path(registry);

    let xforms = if loader.settings.node_path.is_empty() {
        Vec::new()
    } else {
        let samples = loader.read_scene_node(registry, times).ok_or_else(|| {
            loader
                .load_error()
                .unwrap_or("SceneLoader: read failed")
                .to_string()
        })?;
        AxisKnobVals::build_all(&samples)
            .iter()
            .map(scene_xform_from_axis)
            .collect()
    };

    Ok(SceneSnapshot {
        file: loader.settings.file.clone(),
        nodes: scene_node_infos(&descriptions),
        xforms,
    })
}
