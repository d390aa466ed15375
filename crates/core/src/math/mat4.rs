use std::fmt;
use std::ops::{Mul, MulAssign};

use glam::{DMat4, DVec2, DVec3, DVec4};
use serde::{Deserialize, Serialize};

use super::boxes::{Box2d, Box3d};
use super::orders::{RotationOrder, XformOrder};
use super::vec::{lerp, lerp_vec3, normalize_with_len, to_degrees, to_radians};

/// Double-precision 4x4 transform.
///
/// Elements are named `a<row><col>` and stored column by column, so the
/// translation lives in `a03`, `a13`, `a23`. Points are column vectors:
/// `p' = M * p`.
#[derive(Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 16]", into = "[f64; 16]")]
pub struct Mat4d {
    pub a00: f64,
    pub a10: f64,
    pub a20: f64,
    pub a30: f64,
    pub a01: f64,
    pub a11: f64,
    pub a21: f64,
    pub a31: f64,
    pub a02: f64,
    pub a12: f64,
    pub a22: f64,
    pub a32: f64,
    pub a03: f64,
    pub a13: f64,
    pub a23: f64,
    pub a33: f64,
}

/// Result of [`Mat4d::extract_shrt`]. Rotation angles are in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransformComponents {
    pub scale: DVec3,
    pub shear: DVec3,
    pub rotation: DVec3,
    pub translation: DVec3,
}

impl Default for Mat4d {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Mat4d {
    pub const IDENTITY: Mat4d = Mat4d::from_column_major([
        1.0, 0.0, 0.0, 0.0, //
        0.0, 1.0, 0.0, 0.0, //
        0.0, 0.0, 1.0, 0.0, //
        0.0, 0.0, 0.0, 1.0,
    ]);

    pub const ZERO: Mat4d = Mat4d::from_column_major([0.0; 16]);

    /// Builds from 16 values in storage order: `a00 a10 a20 a30 a01 ... a33`.
    pub const fn from_column_major(v: [f64; 16]) -> Self {
        Self {
            a00: v[0],
            a10: v[1],
            a20: v[2],
            a30: v[3],
            a01: v[4],
            a11: v[5],
            a21: v[6],
            a31: v[7],
            a02: v[8],
            a12: v[9],
            a22: v[10],
            a32: v[11],
            a03: v[12],
            a13: v[13],
            a23: v[14],
            a33: v[15],
        }
    }

    pub const fn to_column_major(&self) -> [f64; 16] {
        [
            self.a00, self.a10, self.a20, self.a30, //
            self.a01, self.a11, self.a21, self.a31, //
            self.a02, self.a12, self.a22, self.a32, //
            self.a03, self.a13, self.a23, self.a33,
        ]
    }

    /// Builds from mathematical rows, `rows[r][c]` being `a<r><c>`.
    pub fn from_rows(rows: [[f64; 4]; 4]) -> Self {
        let mut v = [0.0; 16];
        for (r, row) in rows.iter().enumerate() {
            for (c, value) in row.iter().enumerate() {
                v[c * 4 + r] = *value;
            }
        }
        Self::from_column_major(v)
    }

    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.to_column_major()[col * 4 + row]
    }

    pub fn set(&mut self, row: usize, col: usize, value: f64) {
        let mut v = self.to_column_major();
        v[col * 4 + row] = value;
        *self = Self::from_column_major(v);
    }

    pub fn row(&self, row: usize) -> DVec4 {
        let v = self.to_column_major();
        DVec4::new(v[row], v[4 + row], v[8 + row], v[12 + row])
    }

    pub fn col(&self, col: usize) -> DVec4 {
        let v = self.to_column_major();
        DVec4::new(v[col * 4], v[col * 4 + 1], v[col * 4 + 2], v[col * 4 + 3])
    }

    pub fn set_row0(&mut self, v: DVec3) {
        self.a00 = v.x;
        self.a01 = v.y;
        self.a02 = v.z;
    }

    pub fn set_row1(&mut self, v: DVec3) {
        self.a10 = v.x;
        self.a11 = v.y;
        self.a12 = v.z;
    }

    pub fn set_row2(&mut self, v: DVec3) {
        self.a20 = v.x;
        self.a21 = v.y;
        self.a22 = v.z;
    }

    pub fn x_axis(&self) -> DVec3 {
        DVec3::new(self.a00, self.a10, self.a20)
    }

    pub fn y_axis(&self) -> DVec3 {
        DVec3::new(self.a01, self.a11, self.a21)
    }

    pub fn z_axis(&self) -> DVec3 {
        DVec3::new(self.a02, self.a12, self.a22)
    }

    pub fn set_x_axis(&mut self, v: DVec3) {
        self.a00 = v.x;
        self.a10 = v.y;
        self.a20 = v.z;
    }

    pub fn set_y_axis(&mut self, v: DVec3) {
        self.a01 = v.x;
        self.a11 = v.y;
        self.a21 = v.z;
    }

    pub fn set_z_axis(&mut self, v: DVec3) {
        self.a02 = v.x;
        self.a12 = v.y;
        self.a22 = v.z;
    }

    pub fn set_to_identity(&mut self) {
        *self = Self::IDENTITY;
    }

    /// Exact comparison against the identity, no tolerance.
    pub fn is_identity(&self) -> bool {
        *self == Self::IDENTITY
    }

    pub fn is_not_identity(&self) -> bool {
        !self.is_identity()
    }

    pub fn get_translation(&self) -> DVec3 {
        DVec3::new(self.a03, self.a13, self.a23)
    }

    pub fn set_translation(&mut self, t: DVec3) {
        self.a03 = t.x;
        self.a13 = t.y;
        self.a23 = t.z;
    }

    /// Column lengths of the upper three axes, bottom row included.
    pub fn get_scale(&self) -> DVec3 {
        DVec3::new(
            self.col(0).length(),
            self.col(1).length(),
            self.col(2).length(),
        )
    }

    pub fn transpose(&self) -> Self {
        Self::from_rows([
            [self.a00, self.a10, self.a20, self.a30],
            [self.a01, self.a11, self.a21, self.a31],
            [self.a02, self.a12, self.a22, self.a32],
            [self.a03, self.a13, self.a23, self.a33],
        ])
    }

    //--------------------------------------------------------------------
    // Elementary matrices

    pub fn from_translation(t: DVec3) -> Self {
        let mut m = Self::IDENTITY;
        m.set_translation(t);
        m
    }

    pub fn from_scale(s: DVec3) -> Self {
        let mut m = Self::IDENTITY;
        m.a00 = s.x;
        m.a11 = s.y;
        m.a22 = s.z;
        m
    }

    pub fn from_rotation_x(angle: f64) -> Self {
        let (s, c) = angle.sin_cos();
        let mut m = Self::IDENTITY;
        m.a11 = c;
        m.a12 = -s;
        m.a21 = s;
        m.a22 = c;
        m
    }

    pub fn from_rotation_y(angle: f64) -> Self {
        let (s, c) = angle.sin_cos();
        let mut m = Self::IDENTITY;
        m.a00 = c;
        m.a02 = s;
        m.a20 = -s;
        m.a22 = c;
        m
    }

    pub fn from_rotation_z(angle: f64) -> Self {
        let (s, c) = angle.sin_cos();
        let mut m = Self::IDENTITY;
        m.a00 = c;
        m.a01 = -s;
        m.a10 = s;
        m.a11 = c;
        m
    }

    /// Rotation of `angle` radians around a normalized `axis`.
    pub fn from_axis_angle(angle: f64, axis: DVec3) -> Self {
        let (s, c) = angle.sin_cos();
        let c1 = 1.0 - c;
        let (x, y, z) = (axis.x, axis.y, axis.z);
        let mut m = Self::IDENTITY;
        m.a00 = x * x * c1 + c;
        m.a01 = x * y * c1 - z * s;
        m.a02 = x * z * c1 + y * s;
        m.a10 = x * y * c1 + z * s;
        m.a11 = y * y * c1 + c;
        m.a12 = y * z * c1 - x * s;
        m.a20 = x * z * c1 - y * s;
        m.a21 = y * z * c1 + x * s;
        m.a22 = z * z * c1 + c;
        m
    }

    /// Euler rotation from radian angles.
    pub fn from_rotations(order: RotationOrder, radians: DVec3) -> Self {
        let mut m = Self::IDENTITY;
        m.rotate(order, radians);
        m
    }

    /// Full transform from components, rotation in degrees.
    #[allow(clippy::too_many_arguments)]
    pub fn from_transform(
        xform_order: XformOrder,
        rot_order: RotationOrder,
        translation: DVec3,
        rotation_degrees: DVec3,
        scaling: DVec3,
        skew: DVec3,
        pivot: DVec3,
    ) -> Self {
        let mut m = Self::IDENTITY;
        m.apply_transform(
            xform_order,
            rot_order,
            translation,
            rotation_degrees,
            scaling,
            skew,
            pivot,
        );
        m
    }

    #[allow(clippy::too_many_arguments)]
    pub fn set_to_transform(
        &mut self,
        xform_order: XformOrder,
        rot_order: RotationOrder,
        translation: DVec3,
        rotation_degrees: DVec3,
        scaling: DVec3,
        skew: DVec3,
        pivot: DVec3,
    ) {
        *self = Self::from_transform(
            xform_order,
            rot_order,
            translation,
            rotation_degrees,
            scaling,
            skew,
            pivot,
        );
    }

    //--------------------------------------------------------------------
    // In-place operations, each right-multiplies `self`

    pub fn translate(&mut self, t: DVec3) {
        let (x, y, z) = (t.x, t.y, t.z);
        self.a03 += x * self.a00 + y * self.a01 + z * self.a02;
        self.a13 += x * self.a10 + y * self.a11 + z * self.a12;
        self.a23 += x * self.a20 + y * self.a21 + z * self.a22;
        self.a33 += x * self.a30 + y * self.a31 + z * self.a32;
    }

    pub fn scale(&mut self, s: DVec3) {
        self.a00 *= s.x;
        self.a10 *= s.x;
        self.a20 *= s.x;
        self.a30 *= s.x;
        self.a01 *= s.y;
        self.a11 *= s.y;
        self.a21 *= s.y;
        self.a31 *= s.y;
        self.a02 *= s.z;
        self.a12 *= s.z;
        self.a22 *= s.z;
        self.a32 *= s.z;
    }

    pub fn scale_uniform(&mut self, s: f64) {
        self.scale(DVec3::splat(s));
    }

    /// Shear of X by Y.
    pub fn skew_xy(&mut self, d: f64) {
        if d == 0.0 {
            return;
        }
        let mut m = Self::IDENTITY;
        m.a01 = d;
        *self *= m;
    }

    /// Shear with `xy`, `xz` and `yz` factors, matching what
    /// [`Mat4d::extract_and_remove_scaling_and_shear`] returns.
    pub fn skew(&mut self, skew: DVec3) {
        if skew == DVec3::ZERO {
            return;
        }
        let mut m = Self::IDENTITY;
        m.a01 = skew.x;
        m.a02 = skew.y;
        m.a12 = skew.z;
        *self *= m;
    }

    pub fn rotate_x(&mut self, angle: f64) {
        if angle != 0.0 {
            *self *= Self::from_rotation_x(angle);
        }
    }

    pub fn rotate_y(&mut self, angle: f64) {
        if angle != 0.0 {
            *self *= Self::from_rotation_y(angle);
        }
    }

    pub fn rotate_z(&mut self, angle: f64) {
        if angle != 0.0 {
            *self *= Self::from_rotation_z(angle);
        }
    }

    pub fn rotate_axis(&mut self, angle: f64, axis: DVec3) {
        if angle != 0.0 {
            *self *= Self::from_axis_angle(angle, axis);
        }
    }

    /// Applies three single-axis rotations (radians). The first-named axis is
    /// applied to points first, so it is multiplied in last.
    pub fn rotate(&mut self, order: RotationOrder, radians: DVec3) {
        match order {
            RotationOrder::XYZ => {
                self.rotate_z(radians.z);
                self.rotate_y(radians.y);
                self.rotate_x(radians.x);
            }
            RotationOrder::XZY => {
                self.rotate_y(radians.y);
                self.rotate_z(radians.z);
                self.rotate_x(radians.x);
            }
            RotationOrder::YXZ => {
                self.rotate_z(radians.z);
                self.rotate_x(radians.x);
                self.rotate_y(radians.y);
            }
            RotationOrder::YZX => {
                self.rotate_x(radians.x);
                self.rotate_z(radians.z);
                self.rotate_y(radians.y);
            }
            RotationOrder::ZXY => {
                self.rotate_y(radians.y);
                self.rotate_x(radians.x);
                self.rotate_z(radians.z);
            }
            RotationOrder::ZYX => {
                self.rotate_x(radians.x);
                self.rotate_y(radians.y);
                self.rotate_z(radians.z);
            }
        }
    }

    /// Multiplies a pivoted SRT-style transform into `self`. Rotations are degrees.
    #[allow(clippy::too_many_arguments)]
    pub fn apply_transform(
        &mut self,
        xform_order: XformOrder,
        rot_order: RotationOrder,
        translation: DVec3,
        rotation_degrees: DVec3,
        scaling: DVec3,
        skew: DVec3,
        pivot: DVec3,
    ) {
        let radians = to_radians(rotation_degrees);
        self.translate(pivot);
        match xform_order {
            XformOrder::SRT => {
                self.translate(translation);
                self.rotate(rot_order, radians);
                self.skew(skew);
                self.scale(scaling);
            }
            XformOrder::STR => {
                self.rotate(rot_order, radians);
                self.skew(skew);
                self.translate(translation);
                self.scale(scaling);
            }
            XformOrder::RST => {
                self.translate(translation);
                self.scale(scaling);
                self.rotate(rot_order, radians);
                self.skew(skew);
            }
            XformOrder::RTS => {
                self.scale(scaling);
                self.translate(translation);
                self.rotate(rot_order, radians);
                self.skew(skew);
            }
            XformOrder::TSR => {
                self.rotate(rot_order, radians);
                self.skew(skew);
                self.scale(scaling);
                self.translate(translation);
            }
            XformOrder::TRS => {
                self.scale(scaling);
                self.rotate(rot_order, radians);
                self.skew(skew);
                self.translate(translation);
            }
        }
        self.translate(-pivot);
    }

    //--------------------------------------------------------------------
    // Inverse

    pub fn determinant(&self) -> f64 {
        let (s, c) = self.sub_determinants();
        s[0] * c[5] - s[1] * c[4] + s[2] * c[3] + s[3] * c[2] - s[4] * c[1] + s[5] * c[0]
    }

    fn sub_determinants(&self) -> ([f64; 6], [f64; 6]) {
        let s = [
            self.a00 * self.a11 - self.a10 * self.a01,
            self.a00 * self.a12 - self.a10 * self.a02,
            self.a00 * self.a13 - self.a10 * self.a03,
            self.a01 * self.a12 - self.a11 * self.a02,
            self.a01 * self.a13 - self.a11 * self.a03,
            self.a02 * self.a13 - self.a12 * self.a03,
        ];
        let c = [
            self.a20 * self.a31 - self.a30 * self.a21,
            self.a20 * self.a32 - self.a30 * self.a22,
            self.a20 * self.a33 - self.a30 * self.a23,
            self.a21 * self.a32 - self.a31 * self.a22,
            self.a21 * self.a33 - self.a31 * self.a23,
            self.a22 * self.a33 - self.a32 * self.a23,
        ];
        (s, c)
    }

    /// Cofactor inverse. The result is meaningless when the determinant is
    /// zero; use [`Mat4d::invert`] when that can happen.
    pub fn inverse(&self) -> Self {
        let (s, c) = self.sub_determinants();
        let det = s[0] * c[5] - s[1] * c[4] + s[2] * c[3] + s[3] * c[2] - s[4] * c[1]
            + s[5] * c[0];
        self.adjugate_scaled(&s, &c, 1.0 / det)
    }

    /// Writes the inverse into `out` and returns the determinant. `out` is
    /// left unchanged when the determinant is zero.
    pub fn invert(&self, out: &mut Mat4d) -> f64 {
        let (s, c) = self.sub_determinants();
        let det = s[0] * c[5] - s[1] * c[4] + s[2] * c[3] + s[3] * c[2] - s[4] * c[1]
            + s[5] * c[0];
        if det.abs() == 0.0 {
            return det;
        }
        *out = self.adjugate_scaled(&s, &c, 1.0 / det);
        det
    }

    fn adjugate_scaled(&self, s: &[f64; 6], c: &[f64; 6], inv_det: f64) -> Self {
        let a = self;
        Self::from_rows([
            [
                (a.a11 * c[5] - a.a12 * c[4] + a.a13 * c[3]) * inv_det,
                (-a.a01 * c[5] + a.a02 * c[4] - a.a03 * c[3]) * inv_det,
                (a.a31 * s[5] - a.a32 * s[4] + a.a33 * s[3]) * inv_det,
                (-a.a21 * s[5] + a.a22 * s[4] - a.a23 * s[3]) * inv_det,
            ],
            [
                (-a.a10 * c[5] + a.a12 * c[2] - a.a13 * c[1]) * inv_det,
                (a.a00 * c[5] - a.a02 * c[2] + a.a03 * c[1]) * inv_det,
                (-a.a30 * s[5] + a.a32 * s[2] - a.a33 * s[1]) * inv_det,
                (a.a20 * s[5] - a.a22 * s[2] + a.a23 * s[1]) * inv_det,
            ],
            [
                (a.a10 * c[4] - a.a11 * c[2] + a.a13 * c[0]) * inv_det,
                (-a.a00 * c[4] + a.a01 * c[2] - a.a03 * c[0]) * inv_det,
                (a.a30 * s[4] - a.a31 * s[2] + a.a33 * s[0]) * inv_det,
                (-a.a20 * s[4] + a.a21 * s[2] - a.a23 * s[0]) * inv_det,
            ],
            [
                (-a.a10 * c[3] + a.a11 * c[1] - a.a12 * c[0]) * inv_det,
                (a.a00 * c[3] - a.a01 * c[1] + a.a02 * c[0]) * inv_det,
                (-a.a30 * s[3] + a.a31 * s[1] - a.a32 * s[0]) * inv_det,
                (a.a20 * s[3] - a.a21 * s[1] + a.a22 * s[0]) * inv_det,
            ],
        ])
    }

    //--------------------------------------------------------------------
    // Point, vector and box transforms

    pub fn transform(&self, p: DVec3) -> DVec3 {
        DVec3::new(
            self.a00 * p.x + self.a01 * p.y + self.a02 * p.z + self.a03,
            self.a10 * p.x + self.a11 * p.y + self.a12 * p.z + self.a13,
            self.a20 * p.x + self.a21 * p.y + self.a22 * p.z + self.a23,
        )
    }

    pub fn transform_homogeneous(&self, p: DVec3) -> DVec4 {
        let xyz = self.transform(p);
        DVec4::new(
            xyz.x,
            xyz.y,
            xyz.z,
            self.a30 * p.x + self.a31 * p.y + self.a32 * p.z + self.a33,
        )
    }

    /// Direction transform, translation ignored.
    pub fn vec_transform(&self, v: DVec3) -> DVec3 {
        DVec3::new(
            self.a00 * v.x + self.a01 * v.y + self.a02 * v.z,
            self.a10 * v.x + self.a11 * v.y + self.a12 * v.z,
            self.a20 * v.x + self.a21 * v.y + self.a22 * v.z,
        )
    }

    /// Multiplies by the transpose; call on the inverse matrix to move normals.
    pub fn normal_transform(&self, n: DVec3) -> DVec3 {
        DVec3::new(
            self.a00 * n.x + self.a10 * n.y + self.a20 * n.z,
            self.a01 * n.x + self.a11 * n.y + self.a21 * n.z,
            self.a02 * n.x + self.a12 * n.y + self.a22 * n.z,
        )
    }

    /// Transforms an axis-aligned box, keeping it tight (Graphics Gems).
    pub fn transform_box(&self, bbox: &Box3d) -> Box3d {
        if bbox.is_empty() {
            return *bbox;
        }
        let translation = self.get_translation();
        let mut out = Box3d::new(translation, translation);
        for i in 0..3 {
            for j in 0..3 {
                let t = self.get(i, j);
                let a = t * bbox.min[j];
                let b = t * bbox.max[j];
                out.min[i] += a.min(b);
                out.max[i] += a.max(b);
            }
        }
        out
    }

    /// Projects the corners of `bbox` with a perspective divide. Corners
    /// at or behind the eye (w <= 0) are skipped.
    pub fn project_box(&self, bbox: &Box3d) -> Box2d {
        let mut out = Box2d::empty();
        if bbox.is_empty() {
            return out;
        }
        for corner in bbox.corners() {
            let p = self.transform_homogeneous(corner);
            if p.w <= 0.0 {
                continue;
            }
            out.expand(DVec2::new(p.x / p.w, p.y / p.w));
        }
        out
    }

    //--------------------------------------------------------------------
    // Partial copies

    pub fn translation_only(&self) -> Self {
        Self::from_translation(self.get_translation())
    }

    pub fn scale_only(&self) -> Self {
        Self::from_scale(self.get_scale())
    }

    pub fn scale_and_rotation_only(&self) -> Self {
        let mut m = *self;
        m.set_translation(DVec3::ZERO);
        m.a30 = 0.0;
        m.a31 = 0.0;
        m.a32 = 0.0;
        m.a33 = 1.0;
        m
    }

    pub fn rotation_only(&self) -> Self {
        let mut m = Self::IDENTITY;
        let mut x = self.x_axis();
        let mut y = self.y_axis();
        let mut z = self.z_axis();
        normalize_with_len(&mut x);
        normalize_with_len(&mut y);
        normalize_with_len(&mut z);
        m.set_x_axis(x);
        m.set_y_axis(y);
        m.set_z_axis(z);
        m
    }

    /// Blends two transforms by interpolating axis directions, axis lengths
    /// and translation separately.
    pub fn interpolate(m0: &Mat4d, m1: &Mat4d, t: f64) -> Self {
        if t < f64::EPSILON {
            return *m0;
        } else if t > 1.0 - f64::EPSILON {
            return *m1;
        }
        let blend_axis = |a: DVec3, b: DVec3| {
            let (mut na, mut nb) = (a, b);
            let la = normalize_with_len(&mut na);
            let lb = normalize_with_len(&mut nb);
            let mut dir = lerp_vec3(na, nb, t);
            normalize_with_len(&mut dir);
            dir * lerp(la, lb, t)
        };
        let mut m = Self::IDENTITY;
        m.set_x_axis(blend_axis(m0.x_axis(), m1.x_axis()));
        m.set_y_axis(blend_axis(m0.y_axis(), m1.y_axis()));
        m.set_z_axis(blend_axis(m0.z_axis(), m1.z_axis()));
        m.set_translation(lerp_vec3(m0.get_translation(), m1.get_translation(), t));
        m
    }

    //--------------------------------------------------------------------
    // Decomposition

    /// Euler angles (radians) of the rotation part for `order`. Rows of the
    /// upper 3x3 are normalized first so scale does not leak in.
    pub fn get_rotations(&self, order: RotationOrder) -> DVec3 {
        let mut r0 = DVec3::new(self.a00, self.a01, self.a02);
        let mut r1 = DVec3::new(self.a10, self.a11, self.a12);
        let mut r2 = DVec3::new(self.a20, self.a21, self.a22);
        normalize_with_len(&mut r0);
        normalize_with_len(&mut r1);
        normalize_with_len(&mut r2);
        let mut m = Self::IDENTITY;
        m.set_row0(r0);
        m.set_row1(r1);
        m.set_row2(r2);

        let mut rot = DVec3::ZERO;
        match order {
            RotationOrder::XYZ => {
                rot.x = m.a21.atan2(m.a22);
                m.rotate_x(-rot.x);
                rot.y = (-m.a20).atan2((m.a00 * m.a00 + m.a10 * m.a10).sqrt());
                rot.z = (-m.a01).atan2(m.a11);
            }
            RotationOrder::XZY => {
                rot.x = -m.a12.atan2(m.a11);
                m.rotate_x(-rot.x);
                rot.z = m.a10.atan2((m.a00 * m.a00 + m.a20 * m.a20).sqrt());
                rot.y = (-m.a20).atan2(m.a00);
            }
            RotationOrder::YXZ => {
                rot.y = -m.a20.atan2(m.a22);
                m.rotate_y(-rot.y);
                rot.x = m.a21.atan2((m.a01 * m.a01 + m.a11 * m.a11).sqrt());
                rot.z = (-m.a01).atan2(m.a11);
            }
            RotationOrder::YZX => {
                rot.y = m.a02.atan2(m.a00);
                m.rotate_y(-rot.y);
                rot.z = (-m.a01).atan2((m.a11 * m.a11 + m.a21 * m.a21).sqrt());
                rot.x = m.a21.atan2(m.a11);
            }
            RotationOrder::ZXY => {
                rot.z = m.a10.atan2(m.a11);
                m.rotate_z(-rot.z);
                rot.x = (-m.a12).atan2((m.a02 * m.a02 + m.a22 * m.a22).sqrt());
                rot.y = m.a02.atan2(m.a22);
            }
            RotationOrder::ZYX => {
                rot.z = -m.a01.atan2(m.a00);
                m.rotate_z(-rot.z);
                rot.y = -(-m.a02).atan2((m.a12 * m.a12 + m.a22 * m.a22).sqrt());
                rot.x = -(-m.a21).atan2(m.a11);
            }
        }
        rot
    }

    /// Removes scale and shear from the upper 3x3 (Gram-Schmidt on the rows)
    /// and returns them as `(scale, shear)`. Returns `None` and leaves
    /// `self` unchanged if a row is too small to normalize.
    pub fn extract_and_remove_scaling_and_shear(&mut self) -> Option<(DVec3, DVec3)> {
        let mut row0 = DVec3::new(self.a00, self.a01, self.a02);
        let mut row1 = DVec3::new(self.a10, self.a11, self.a12);
        let mut row2 = DVec3::new(self.a20, self.a21, self.a22);

        let max_val = row0
            .abs()
            .max_element()
            .max(row1.abs().max_element())
            .max(row2.abs().max_element());
        if max_val != 0.0 {
            for row in [row0, row1, row2] {
                if !check_for_zero_scale_in_row(max_val, row) {
                    return None;
                }
            }
            row0 /= max_val;
            row1 /= max_val;
            row2 /= max_val;
        }

        let mut scale = DVec3::ZERO;
        let mut shear = DVec3::ZERO;

        scale.x = row0.length();
        if !check_for_zero_scale_in_row(scale.x, row0) {
            return None;
        }
        row0 /= scale.x;

        shear.x = row0.dot(row1);
        row1 -= row0 * shear.x;

        scale.y = row1.length();
        if !check_for_zero_scale_in_row(scale.y, row1) {
            return None;
        }
        row1 /= scale.y;
        shear.x /= scale.y;

        shear.y = row0.dot(row2);
        row2 -= row0 * shear.y;
        shear.z = row1.dot(row2);
        row2 -= row1 * shear.z;

        scale.z = row2.length();
        if !check_for_zero_scale_in_row(scale.z, row2) {
            return None;
        }
        row2 /= scale.z;
        shear.y /= scale.z;
        shear.z /= scale.z;

        // Flip a left-handed basis.
        if row0.dot(row1.cross(row2)) < 0.0 {
            row0 = -row0;
            row1 = -row1;
            row2 = -row2;
            scale = -scale;
        }

        self.set_row0(row0);
        self.set_row1(row1);
        self.set_row2(row2);
        Some((scale * max_val, shear))
    }

    /// Splits the matrix into scale, shear, rotation (degrees) and translation.
    pub fn extract_shrt(&self, order: RotationOrder) -> Option<TransformComponents> {
        let mut m = *self;
        let translation = m.get_translation();
        let (scale, shear) = m.extract_and_remove_scaling_and_shear()?;
        let rotation = to_degrees(m.get_rotations(order));
        Some(TransformComponents {
            scale,
            shear,
            rotation,
            translation,
        })
    }

    //--------------------------------------------------------------------
    // Interop

    pub fn to_glam(&self) -> DMat4 {
        DMat4::from_cols_array(&self.to_column_major())
    }

    pub fn to_glam_f32(&self) -> glam::Mat4 {
        glam::Mat4::from_cols_array(&self.to_column_major().map(|v| v as f32))
    }
}

/// False when dividing `row` by `s` would overflow.
fn check_for_zero_scale_in_row(s: f64, row: DVec3) -> bool {
    let s = s.abs();
    if s < 1.0 {
        for c in row.to_array() {
            if c.abs() >= f64::MAX * s {
                return false;
            }
        }
    }
    true
}

impl From<[f64; 16]> for Mat4d {
    fn from(v: [f64; 16]) -> Self {
        Self::from_column_major(v)
    }
}

impl From<Mat4d> for [f64; 16] {
    fn from(m: Mat4d) -> Self {
        m.to_column_major()
    }
}

impl From<DMat4> for Mat4d {
    fn from(m: DMat4) -> Self {
        Self::from_column_major(m.to_cols_array())
    }
}

impl From<glam::Mat4> for Mat4d {
    fn from(m: glam::Mat4) -> Self {
        Self::from_column_major(m.to_cols_array().map(f64::from))
    }
}

impl Mul for Mat4d {
    type Output = Mat4d;

    fn mul(self, rhs: Mat4d) -> Mat4d {
        Mat4d::from(self.to_glam() * rhs.to_glam())
    }
}

impl MulAssign for Mat4d {
    fn mul_assign(&mut self, rhs: Mat4d) {
        *self = *self * rhs;
    }
}

impl fmt::Debug for Mat4d {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Mat4d")?;
        fmt::Display::fmt(self, f)
    }
}

impl fmt::Display for Mat4d {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for r in 0..4 {
            let row = self.row(r);
            write!(f, "[{} {} {} {}]", row.x, row.y, row.z, row.w)?;
        }
        write!(f, "]")
    }
}
