//! Aim constraint: rotations that point one local axis at a target.

use glam::{DMat4, DQuat, DVec3};
use serde::{Deserialize, Serialize};

use crate::arg_keys::lookat as keys;
use crate::args::ArgSet;
use crate::axis::AxisVals;
use crate::math::{
    lerp, normalize_with_len, to_degrees, AxisDirection, Mat4d, RotationOrder, XformOrder,
};

/// Rotation order the aim angles are expressed in.
pub const LOOKAT_ROT_ORDER: RotationOrder = RotationOrder::ZXY;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LookatMethod {
    #[default]
    Vectors,
    Quaternions,
}

/// Where the aim is measured from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AimLocation {
    /// Origin of the full world transform (parent × local).
    #[default]
    UseLocalXform,
    /// Raw pivot point in parent space.
    FromPivot,
}

impl LookatMethod {
    pub const ALL: [LookatMethod; 2] = [LookatMethod::Vectors, LookatMethod::Quaternions];

    pub fn name(self) -> &'static str {
        match self {
            LookatMethod::Vectors => "vectors",
            LookatMethod::Quaternions => "quaternions",
        }
    }
}

impl AimLocation {
    pub const ALL: [AimLocation; 2] = [AimLocation::UseLocalXform, AimLocation::FromPivot];

    pub fn name(self) -> &'static str {
        match self {
            AimLocation::UseLocalXform => "use-local-xform",
            AimLocation::FromPivot => "from-pivot",
        }
    }
}

/// Lookat parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LookatVals {
    pub enable: bool,
    pub axis: AxisDirection,
    pub do_rx: bool,
    pub do_ry: bool,
    pub do_rz: bool,
    /// Aim at `point` instead of a connected target.
    pub use_point: bool,
    pub point: DVec3,
    pub method: LookatMethod,
    pub aim_location: AimLocation,
    /// 0 leaves rotations untouched, 1 replaces them.
    pub mix: f64,
}

impl Default for LookatVals {
    fn default() -> Self {
        Self {
            enable: true,
            axis: AxisDirection::ZMinus,
            do_rx: true,
            do_ry: true,
            do_rz: true,
            use_point: false,
            point: DVec3::ZERO,
            method: LookatMethod::Vectors,
            aim_location: AimLocation::UseLocalXform,
            mix: 1.0,
        }
    }
}

impl LookatVals {
    pub fn from_args(args: &ArgSet) -> Self {
        let defaults = Self::default();
        let axis = AxisDirection::from_index(args.get_int(keys::AXIS, defaults.axis.index()))
            .unwrap_or(defaults.axis);
        let method = match args.get_int(keys::METHOD, 0) {
            1 => LookatMethod::Quaternions,
            _ => LookatMethod::Vectors,
        };
        let aim_location = match args.get_int(keys::AIM_LOCATION, 0) {
            1 => AimLocation::FromPivot,
            _ => AimLocation::UseLocalXform,
        };
        Self {
            enable: args.get_bool(keys::ENABLE, defaults.enable),
            axis,
            do_rx: args.get_bool(keys::DO_RX, defaults.do_rx),
            do_ry: args.get_bool(keys::DO_RY, defaults.do_ry),
            do_rz: args.get_bool(keys::DO_RZ, defaults.do_rz),
            use_point: args.get_bool(keys::USE_POINT, defaults.use_point),
            point: args.get_vec3d(keys::POINT, defaults.point),
            method,
            aim_location,
            mix: args.get_double(keys::MIX, defaults.mix),
        }
    }

    pub fn to_args(&self, args: &mut ArgSet) {
        args.set_bool(keys::ENABLE, self.enable);
        args.set_int(keys::AXIS, self.axis.index());
        args.set_bool(keys::DO_RX, self.do_rx);
        args.set_bool(keys::DO_RY, self.do_ry);
        args.set_bool(keys::DO_RZ, self.do_rz);
        args.set_bool(keys::USE_POINT, self.use_point);
        args.set_vec3d(keys::POINT, self.point);
        args.set_int(keys::METHOD, self.method as i32);
        args.set_int(keys::AIM_LOCATION, self.aim_location as i32);
        args.set_double(keys::MIX, self.mix);
    }

    fn mask(&self) -> [bool; 3] {
        [self.do_rx, self.do_ry, self.do_rz]
    }

    /// Aims `rotations` (degrees, ZXY order) so the configured axis at `p`
    /// points at `lookat_p`. Returns false and leaves `rotations` untouched
    /// when disabled, when `mix <= 0` or when the two points coincide.
    pub fn lookat_point(&self, p: DVec3, lookat_p: DVec3, rotations: &mut DVec3) -> bool {
        if !self.enable {
            return false;
        }
        aim_rotations(
            self.method,
            lookat_p - p,
            self.axis,
            self.mask(),
            self.mix,
            rotations,
        )
    }

    /// World matrix for `vals` with the aim applied. `target` is the
    /// connected target's world position; `point` is used instead when
    /// `use_point` is set or nothing is connected. Falls back to the plain
    /// parent × local matrix when the aim cannot be computed.
    pub fn lookat_xform(&self, parent: &Mat4d, vals: &AxisVals, target: Option<DVec3>) -> Mat4d {
        let local = vals.local_matrix();
        let unaimed = *parent * local;
        let target = match target {
            Some(t) if !self.use_point => t,
            _ => self.point,
        };

        match self.aim_location {
            AimLocation::UseLocalXform => {
                let Some(world) = unaimed.extract_shrt(LOOKAT_ROT_ORDER) else {
                    tracing::warn!("lookat: cannot decompose world matrix, aim skipped");
                    return unaimed;
                };
                let mut rotation = world.rotation;
                if !self.lookat_point(world.translation, target, &mut rotation) {
                    return unaimed;
                }
                Mat4d::from_transform(
                    XformOrder::SRT,
                    LOOKAT_ROT_ORDER,
                    world.translation,
                    rotation,
                    world.scale,
                    DVec3::ZERO,
                    DVec3::ZERO,
                )
            }
            AimLocation::FromPivot => {
                if vals.use_matrix {
                    return unaimed;
                }
                let p = parent.transform(vals.translate + vals.pivot);
                let mut rotation = vals.rotate;
                if !self.lookat_point(p, target, &mut rotation) {
                    return unaimed;
                }
                *parent
                    * Mat4d::from_transform(
                        vals.xform_order,
                        LOOKAT_ROT_ORDER,
                        vals.translate,
                        rotation,
                        vals.total_scaling(),
                        vals.skew,
                        vals.pivot,
                    )
            }
        }
    }
}

/// Unit vector of the aimed axis in its rest orientation.
fn axis_vector(axis: AxisDirection) -> DVec3 {
    match axis {
        AxisDirection::XMinus => DVec3::NEG_X,
        AxisDirection::XPlus => DVec3::X,
        AxisDirection::YMinus => DVec3::NEG_Y,
        AxisDirection::YPlus => DVec3::Y,
        AxisDirection::ZMinus => DVec3::NEG_Z,
        AxisDirection::ZPlus => DVec3::Z,
    }
}

/// Writes the masked, blended aim rotations for `dir` into `rotations`.
pub fn aim_rotations(
    method: LookatMethod,
    dir: DVec3,
    axis: AxisDirection,
    mask: [bool; 3],
    mix: f64,
    rotations: &mut DVec3,
) -> bool {
    if mix <= 0.0 {
        return false;
    }
    let mut dir = dir;
    if normalize_with_len(&mut dir) < f64::EPSILON {
        return false;
    }

    let look = match method {
        LookatMethod::Vectors => vector_angles(dir, axis, mask),
        LookatMethod::Quaternions => {
            quat_rotations(DQuat::from_rotation_arc(axis_vector(axis), dir))
        }
    };
    let look = to_degrees(look);

    for idx in 0..3 {
        if !mask[idx] {
            continue;
        }
        rotations[idx] = if mix < 1.0 {
            lerp(rotations[idx], look[idx], mix)
        } else {
            look[idx]
        };
    }
    true
}

/// Two-angle solution per axis, in radians. Angles the axis does not need
/// stay zero.
fn vector_angles(dir: DVec3, axis: AxisDirection, [do_rx, do_ry, do_rz]: [bool; 3]) -> DVec3 {
    let DVec3 { x, y, z } = dir;
    let mut look = DVec3::ZERO;
    match axis {
        AxisDirection::XMinus => {
            let d = if do_ry {
                look.y = z.atan2(-x);
                (z * z + x * x).sqrt()
            } else {
                -x
            };
            if do_rz {
                look.z = (-y).atan2(d);
            }
        }
        AxisDirection::XPlus => {
            let d = if do_ry {
                look.y = (-z).atan2(x);
                (z * z + x * x).sqrt()
            } else {
                x
            };
            if do_rz {
                look.z = y.atan2(d);
            }
        }
        AxisDirection::YMinus => {
            let d = if do_rx {
                look.x = (-z).atan2(-y);
                (z * z + y * y).sqrt()
            } else {
                -y
            };
            if do_rz {
                look.z = x.atan2(d);
            }
        }
        AxisDirection::YPlus => {
            let d = if do_rx {
                look.x = z.atan2(y);
                (z * z + y * y).sqrt()
            } else {
                y
            };
            if do_rz {
                look.z = (-x).atan2(d);
            }
        }
        AxisDirection::ZMinus => {
            let d = if do_ry {
                look.y = (-x).atan2(-z);
                (x * x + z * z).sqrt()
            } else {
                -z
            };
            if do_rx {
                look.x = y.atan2(d);
            }
        }
        AxisDirection::ZPlus => {
            let d = if do_ry {
                look.y = x.atan2(z);
                (x * x + z * z).sqrt()
            } else {
                z
            };
            if do_rx {
                look.x = (-y).atan2(d);
            }
        }
    }
    look
}

/// Lookat-order angles in radians for the rotation `q`.
fn quat_rotations(q: DQuat) -> DVec3 {
    Mat4d::from(DMat4::from_quat(q)).get_rotations(LOOKAT_ROT_ORDER)
}
