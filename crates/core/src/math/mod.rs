//! Double-precision transform math.
//!
//! Vectors are glam's `DVec2`/`DVec3`/`DVec4`; single precision only appears
//! at the scene boundary.

mod boxes;
mod euler;
mod mat4;
mod orders;
mod vec;

pub use boxes::{Box2d, Box3d};
pub use euler::{align_angle, euler_filter_rotations};
pub use mat4::{Mat4d, TransformComponents};
pub use orders::{AxisDirection, ParseOrderError, RotationOrder, XformOrder};
pub use vec::{
    lerp, lerp_vec2, lerp_vec3, lerp_vec4, normalize_with_len, round_if_nearly_one,
    round_if_nearly_zero, to_degrees, to_radians,
};
