use glam::{DVec2, DVec3, DVec4};

/// Scalar lerp that snaps to the end values when `t` is within epsilon of 0 or 1.
pub fn lerp(a: f64, b: f64, t: f64) -> f64 {
    if t < f64::EPSILON {
        a
    } else if t > 1.0 - f64::EPSILON {
        b
    } else {
        a * (1.0 - t) + b * t
    }
}

pub fn lerp_vec2(v0: DVec2, v1: DVec2, t: f64) -> DVec2 {
    DVec2::new(lerp(v0.x, v1.x, t), lerp(v0.y, v1.y, t))
}

pub fn lerp_vec3(v0: DVec3, v1: DVec3, t: f64) -> DVec3 {
    if t < f64::EPSILON {
        v0
    } else if t > 1.0 - f64::EPSILON {
        v1
    } else {
        v0 * (1.0 - t) + v1 * t
    }
}

pub fn lerp_vec4(v0: DVec4, v1: DVec4, t: f64) -> DVec4 {
    if t < f64::EPSILON {
        v0
    } else if t > 1.0 - f64::EPSILON {
        v1
    } else {
        v0 * (1.0 - t) + v1 * t
    }
}

/// Normalizes `v` in place and returns the length it had before.
/// A zero-length vector is left untouched.
pub fn normalize_with_len(v: &mut DVec3) -> f64 {
    let len = v.length();
    if len > 0.0 {
        *v /= len;
    }
    len
}

pub fn round_if_nearly_zero(v: DVec3) -> DVec3 {
    let snap = |c: f64| if c.abs() < f64::EPSILON { 0.0 } else { c };
    DVec3::new(snap(v.x), snap(v.y), snap(v.z))
}

pub fn round_if_nearly_one(v: DVec3) -> DVec3 {
    let snap = |c: f64| if (1.0 - c).abs() <= f64::EPSILON { 1.0 } else { c };
    DVec3::new(snap(v.x), snap(v.y), snap(v.z))
}

pub fn to_radians(v: DVec3) -> DVec3 {
    DVec3::new(v.x.to_radians(), v.y.to_radians(), v.z.to_radians())
}

pub fn to_degrees(v: DVec3) -> DVec3 {
    DVec3::new(v.x.to_degrees(), v.y.to_degrees(), v.z.to_degrees())
}
