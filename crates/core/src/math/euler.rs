use glam::DVec3;

use super::orders::RotationOrder;

/// Unwinds `angle` (degrees) by whole turns until it is within 180 of `to`.
pub fn align_angle(angle: f64, to: f64) -> f64 {
    if !angle.is_finite() || !to.is_finite() || (to - angle).abs() <= 180.0 {
        return angle;
    }
    to + (angle - to + 180.0).rem_euclid(360.0) - 180.0
}

/// Removes Euler flips from a time-ordered rotation sequence (degrees).
///
/// Each sample is unwound towards its predecessor, then compared against the
/// equivalent rotation with the first and last axes of `order` turned by 180
/// and the middle axis mirrored. Whichever is closer to the previous sample
/// is kept.
pub fn euler_filter_rotations(rotations: &mut [DVec3], order: RotationOrder) {
    if rotations.len() < 2 {
        return;
    }
    let [axis0, axis1, axis2] = order.axes();

    let mut prev = rotations[0];
    for rotation in rotations.iter_mut().skip(1) {
        let cur = DVec3::new(
            align_angle(rotation.x, prev.x),
            align_angle(rotation.y, prev.y),
            align_angle(rotation.z, prev.z),
        );
        let mut flip = DVec3::ZERO;
        flip[axis0] = cur[axis0] + 180.0;
        flip[axis1] = -cur[axis1] + 180.0;
        flip[axis2] = cur[axis2] + 180.0;
        let flip = DVec3::new(
            align_angle(flip.x, prev.x),
            align_angle(flip.y, prev.y),
            align_angle(flip.z, prev.z),
        );

        let d_rot = (prev - cur).abs().element_sum();
        let d_flip = (prev - flip).abs().element_sum();
        *rotation = if d_flip < d_rot { flip } else { cur };
        prev = *rotation;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::Mat4d;

    #[test]
    fn align_unwinds_full_turns() {
        assert_eq!(align_angle(350.0, 0.0), -10.0);
        assert_eq!(align_angle(-710.0, 0.0), 10.0);
        assert_eq!(align_angle(90.0, 45.0), 90.0);
        assert_eq!(align_angle(-180.0, 0.0), -180.0);
    }

    #[test]
    fn align_handles_huge_angles() {
        let aligned = align_angle(1.0e18, 0.0);
        assert!(aligned.abs() <= 180.0, "{aligned}");
        let aligned = align_angle(-3.0e15 + 45.0, 90.0);
        assert!((aligned - 90.0).abs() <= 180.0, "{aligned}");
        assert!(align_angle(f64::INFINITY, 0.0).is_infinite());
    }

    #[test]
    fn filter_unwinds_wrapping_sequence() {
        let mut rotations = vec![
            DVec3::new(0.0, 0.0, 170.0),
            DVec3::new(0.0, 0.0, -175.0),
            DVec3::new(0.0, 0.0, -160.0),
        ];
        euler_filter_rotations(&mut rotations, RotationOrder::XYZ);
        assert_eq!(rotations[1].z, 185.0);
        assert_eq!(rotations[2].z, 200.0);
    }

    #[test]
    fn filter_prefers_flipped_equivalent() {
        // (180, 10, 180) in XYZ is the same orientation as (0, 170, 0).
        let mut rotations = vec![DVec3::new(0.0, 170.0, 0.0), DVec3::new(180.0, 10.0, 180.0)];
        euler_filter_rotations(&mut rotations, RotationOrder::XYZ);
        let filtered = rotations[1];
        assert!((filtered - DVec3::new(0.0, 170.0, 0.0)).abs().max_element() < 1e-9);

        let a = Mat4d::from_rotations(RotationOrder::XYZ, DVec3::new(180.0, 10.0, 180.0) * (std::f64::consts::PI / 180.0));
        let b = Mat4d::from_rotations(RotationOrder::XYZ, filtered * (std::f64::consts::PI / 180.0));
        let diff = a
            .to_column_major()
            .iter()
            .zip(b.to_column_major())
            .map(|(x, y)| (x - y).abs())
            .fold(0.0, f64::max);
        assert!(diff < 1e-9);
    }

    #[test]
    fn short_sequences_are_untouched() {
        let mut one = vec![DVec3::new(720.0, 0.0, 0.0)];
        euler_filter_rotations(&mut one, RotationOrder::ZXY);
        assert_eq!(one[0].x, 720.0);
    }
}
