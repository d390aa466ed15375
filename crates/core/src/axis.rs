//! Per-sample transform channels and the matrices built from them.

use std::fmt;

use glam::DVec3;
use serde::{Deserialize, Serialize};

use crate::lookat::LookatVals;
use crate::math::{
    euler_filter_rotations, round_if_nearly_one, round_if_nearly_zero, Mat4d, RotationOrder,
    XformOrder,
};
use crate::parallel;

/// Transform channels for one sample time. Rotations are in degrees.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AxisVals {
    pub time: f64,

    /// Parent channels are only used when this is set.
    pub parent_enable: bool,
    pub parent_translate: DVec3,
    pub parent_rotate: DVec3,
    pub parent_scale: DVec3,

    pub xform_order: XformOrder,
    pub rot_order: RotationOrder,
    pub translate: DVec3,
    pub rotate: DVec3,
    pub scaling: DVec3,
    pub uniform_scale: f64,
    pub skew: DVec3,
    pub pivot: DVec3,

    /// Use `matrix` instead of the local channels.
    pub use_matrix: bool,
    pub matrix: Mat4d,
}

impl Default for AxisVals {
    fn default() -> Self {
        Self::new(0.0)
    }
}

impl AxisVals {
    pub fn new(time: f64) -> Self {
        Self {
            time,
            parent_enable: false,
            parent_translate: DVec3::ZERO,
            parent_rotate: DVec3::ZERO,
            parent_scale: DVec3::ONE,
            xform_order: XformOrder::SRT,
            rot_order: RotationOrder::XYZ,
            translate: DVec3::ZERO,
            rotate: DVec3::ZERO,
            scaling: DVec3::ONE,
            uniform_scale: 1.0,
            skew: DVec3::ZERO,
            pivot: DVec3::ZERO,
            use_matrix: false,
            matrix: Mat4d::IDENTITY,
        }
    }

    pub fn set_to_default(&mut self, time: f64) {
        *self = Self::new(time);
    }

    pub fn set_local_xform_vals_to_default(&mut self) {
        self.translate = DVec3::ZERO;
        self.rotate = DVec3::ZERO;
        self.scaling = DVec3::ONE;
        self.uniform_scale = 1.0;
        self.skew = DVec3::ZERO;
        self.pivot = DVec3::ZERO;
        self.matrix = Mat4d::IDENTITY;
    }

    pub fn set_parent_xform_vals_to_default(&mut self) {
        self.parent_enable = false;
        self.parent_translate = DVec3::ZERO;
        self.parent_rotate = DVec3::ZERO;
        self.parent_scale = DVec3::ONE;
    }

    pub fn is_local_xform_vals_default(&self) -> bool {
        if self.use_matrix {
            return self.matrix.is_identity();
        }
        self.translate == DVec3::ZERO
            && self.rotate == DVec3::ZERO
            && self.scaling == DVec3::ONE
            && self.uniform_scale == 1.0
            && self.skew == DVec3::ZERO
            && self.pivot == DVec3::ZERO
    }

    pub fn is_parent_xform_vals_default(&self) -> bool {
        self.parent_translate == DVec3::ZERO
            && self.parent_rotate == DVec3::ZERO
            && self.parent_scale == DVec3::ONE
    }

    pub fn total_scaling(&self) -> DVec3 {
        self.scaling * self.uniform_scale
    }

    /// Identity unless the parent channels are enabled.
    pub fn parent_matrix(&self) -> Mat4d {
        if !self.parent_enable {
            return Mat4d::IDENTITY;
        }
        Mat4d::from_transform(
            XformOrder::SRT,
            self.rot_order,
            self.parent_translate,
            self.parent_rotate,
            self.parent_scale,
            DVec3::ZERO,
            DVec3::ZERO,
        )
    }

    pub fn local_matrix(&self) -> Mat4d {
        if self.use_matrix {
            return self.matrix;
        }
        Mat4d::from_transform(
            self.xform_order,
            self.rot_order,
            self.translate,
            self.rotate,
            self.total_scaling(),
            self.skew,
            self.pivot,
        )
    }

    /// World matrix with `lookat` aiming at `lookat_p`.
    pub fn matrix_with_lookat(&self, lookat: &LookatVals, parent: &Mat4d, lookat_p: DVec3) -> Mat4d {
        lookat.lookat_xform(parent, self, Some(lookat_p))
    }

    /// Decomposes `m` into the local (or parent) channels. Disabled
    /// components are left at their defaults. Returns false when the
    /// decomposition fails, in which case the defaults are kept.
    pub fn extract_from_matrix(
        &mut self,
        m: &Mat4d,
        t_enable: bool,
        r_enable: bool,
        s_enable: bool,
        rot_order: RotationOrder,
        apply_to_parent: bool,
    ) -> bool {
        let mut scale = DVec3::ONE;
        let mut skew = DVec3::ZERO;
        let mut rotate = DVec3::ZERO;
        let mut translate = DVec3::ZERO;
        let mut ok = true;
        if !m.is_identity() {
            match m.extract_shrt(rot_order) {
                Some(parts) => {
                    scale = parts.scale;
                    skew = parts.shear;
                    rotate = parts.rotation;
                    translate = parts.translation;
                    if t_enable {
                        translate = round_if_nearly_zero(translate);
                    }
                    if r_enable {
                        skew = round_if_nearly_zero(skew);
                        rotate = round_if_nearly_zero(rotate);
                    }
                    if s_enable {
                        scale = round_if_nearly_one(scale);
                    }
                }
                None => {
                    tracing::warn!("AxisVals: cannot decompose matrix {m}");
                    ok = false;
                }
            }
        }

        if apply_to_parent {
            self.set_parent_xform_vals_to_default();
            self.parent_enable = true;
            if s_enable {
                self.parent_scale = scale;
            }
            if r_enable {
                self.parent_rotate = rotate;
            }
            if t_enable {
                self.parent_translate = translate;
            }
        } else {
            self.set_local_xform_vals_to_default();
            self.use_matrix = false;
            self.rot_order = rot_order;
            if s_enable {
                self.scaling = scale;
            }
            if r_enable {
                self.skew = skew;
                self.rotate = rotate;
            }
            if t_enable {
                self.translate = translate;
            }
        }
        ok
    }

    /// Removes Euler flips from a sample sequence. Local rotations are
    /// filtered, and parent rotations separately when any sample uses them.
    pub fn apply_euler_filter(target_order: RotationOrder, samples: &mut [AxisVals], sort: bool) {
        if sort {
            samples.sort_by(|a, b| a.time.total_cmp(&b.time));
        }

        let mut rotations: Vec<DVec3> = samples.iter().map(|s| s.rotate).collect();
        euler_filter_rotations(&mut rotations, target_order);
        for (sample, rotate) in samples.iter_mut().zip(rotations) {
            sample.rotate = rotate;
        }

        if samples.iter().any(|s| s.parent_enable) {
            let mut rotations: Vec<DVec3> = samples.iter().map(|s| s.parent_rotate).collect();
            euler_filter_rotations(&mut rotations, target_order);
            for (sample, rotate) in samples.iter_mut().zip(rotations) {
                sample.parent_rotate = rotate;
            }
        }
    }
}

impl fmt::Display for AxisVals {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[ time={}, xform_order={}, rot_order={}, translate{}, rotate{}, scaling{}, uniform_scale={}, skew{}, pivot{}, use_matrix={}",
            self.time,
            self.xform_order,
            self.rot_order,
            self.translate,
            self.rotate,
            self.scaling,
            self.uniform_scale,
            self.skew,
            self.pivot,
            self.use_matrix,
        )?;
        if self.use_matrix {
            write!(f, ", matrix{}", self.matrix)?;
        }
        if self.parent_enable {
            write!(
                f,
                ", parent_translate{}, parent_rotate{}, parent_scale{}",
                self.parent_translate, self.parent_rotate, self.parent_scale
            )?;
        }
        write!(f, " ]")
    }
}

/// Sample values plus the matrices derived from them.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AxisKnobVals {
    pub vals: AxisVals,
    pub parent_matrix: Mat4d,
    pub local_matrix: Mat4d,
}

impl AxisKnobVals {
    pub fn new(vals: AxisVals) -> Self {
        let parent_matrix = vals.parent_matrix();
        let local_matrix = vals.local_matrix();
        Self {
            vals,
            parent_matrix,
            local_matrix,
        }
    }

    pub fn world_matrix(&self) -> Mat4d {
        self.parent_matrix * self.local_matrix
    }

    /// Rebuilds the cached matrices after `vals` changed.
    pub fn refresh(&mut self) {
        self.parent_matrix = self.vals.parent_matrix();
        self.local_matrix = self.vals.local_matrix();
    }

    /// Builds matrices for every sample, in parallel for large sets.
    pub fn build_all(samples: &[AxisVals]) -> Vec<AxisKnobVals> {
        parallel::map_samples(&samples, |_, vals| AxisKnobVals::new(vals.clone()))
    }
}
