use glam::{DVec2, DVec3};
use serde::{Deserialize, Serialize};

/// 2D bounding box. Empty when `max < min` on any axis; the empty sentinel
/// is `min = f64::MAX, max = -f64::MAX`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Box2d {
    pub min: DVec2,
    pub max: DVec2,
}

/// 3D bounding box, with the same `±f64::MAX` empty sentinel as [`Box2d`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Box3d {
    pub min: DVec3,
    pub max: DVec3,
}

impl Default for Box2d {
    fn default() -> Self {
        Self::empty()
    }
}

impl Default for Box3d {
    fn default() -> Self {
        Self::empty()
    }
}

impl Box2d {
    pub const fn empty() -> Self {
        Self {
            min: DVec2::splat(f64::MAX),
            max: DVec2::splat(-f64::MAX),
        }
    }

    pub fn new(min: DVec2, max: DVec2) -> Self {
        Self { min, max }
    }

    pub fn set_empty(&mut self) {
        *self = Self::empty();
    }

    pub fn is_empty(&self) -> bool {
        self.max.x < self.min.x || self.max.y < self.min.y
    }

    pub fn expand(&mut self, p: DVec2) {
        if self.is_empty() {
            self.min = p;
            self.max = p;
            return;
        }
        self.min = self.min.min(p);
        self.max = self.max.max(p);
    }

    pub fn expand_box(&mut self, other: &Box2d) {
        if other.is_empty() {
            return;
        }
        if self.is_empty() {
            *self = *other;
            return;
        }
        self.min = self.min.min(other.min);
        self.max = self.max.max(other.max);
    }

    pub fn intersect(&mut self, other: &Box2d) {
        self.min = self.min.max(other.min);
        self.max = self.max.min(other.max);
    }

    pub fn contains(&self, p: DVec2) -> bool {
        !self.is_empty() && p.cmpge(self.min).all() && p.cmple(self.max).all()
    }

    pub fn center(&self) -> DVec2 {
        (self.min + self.max) * 0.5
    }

    pub fn size(&self) -> DVec2 {
        self.max - self.min
    }

    pub fn pad(&mut self, amount: DVec2) {
        if self.is_empty() {
            return;
        }
        self.min -= amount;
        self.max += amount;
    }
}

impl Box3d {
    pub const fn empty() -> Self {
        Self {
            min: DVec3::splat(f64::MAX),
            max: DVec3::splat(-f64::MAX),
        }
    }

    pub fn new(min: DVec3, max: DVec3) -> Self {
        Self { min, max }
    }

    pub fn from_points(points: &[DVec3]) -> Self {
        let mut bbox = Self::empty();
        for p in points {
            bbox.expand(*p);
        }
        bbox
    }

    pub fn set_empty(&mut self) {
        *self = Self::empty();
    }

    pub fn is_empty(&self) -> bool {
        self.max.x < self.min.x || self.max.y < self.min.y || self.max.z < self.min.z
    }

    pub fn expand(&mut self, p: DVec3) {
        if self.is_empty() {
            self.min = p;
            self.max = p;
            return;
        }
        self.min = self.min.min(p);
        self.max = self.max.max(p);
    }

    pub fn expand_box(&mut self, other: &Box3d) {
        if other.is_empty() {
            return;
        }
        if self.is_empty() {
            *self = *other;
            return;
        }
        self.min = self.min.min(other.min);
        self.max = self.max.max(other.max);
    }

    pub fn intersect(&mut self, other: &Box3d) {
        self.min = self.min.max(other.min);
        self.max = self.max.min(other.max);
    }

    pub fn contains(&self, p: DVec3) -> bool {
        !self.is_empty() && p.cmpge(self.min).all() && p.cmple(self.max).all()
    }

    pub fn center(&self) -> DVec3 {
        (self.min + self.max) * 0.5
    }

    pub fn size(&self) -> DVec3 {
        self.max - self.min
    }

    pub fn pad(&mut self, amount: DVec3) {
        if self.is_empty() {
            return;
        }
        self.min -= amount;
        self.max += amount;
    }

    pub fn corners(&self) -> [DVec3; 8] {
        let (a, b) = (self.min, self.max);
        [
            DVec3::new(a.x, a.y, a.z),
            DVec3::new(b.x, a.y, a.z),
            DVec3::new(a.x, b.y, a.z),
            DVec3::new(b.x, b.y, a.z),
            DVec3::new(a.x, a.y, b.z),
            DVec3::new(b.x, a.y, b.z),
            DVec3::new(a.x, b.y, b.z),
            DVec3::new(b.x, b.y, b.z),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_box_is_empty() {
        assert!(Box3d::default().is_empty());
        assert!(Box2d::default().is_empty());
        assert!(!Box3d::default().contains(DVec3::ZERO));
    }

    #[test]
    fn expand_contains_point() {
        let mut bbox = Box3d::empty();
        let p = DVec3::new(1.0, -2.0, 3.5);
        bbox.expand(p);
        assert!(!bbox.is_empty());
        assert!(bbox.contains(p));
        assert_eq!(bbox.min, p);
        assert_eq!(bbox.max, p);

        bbox.expand(DVec3::new(-1.0, 0.0, 0.0));
        assert_eq!(bbox.min, DVec3::new(-1.0, -2.0, 0.0));
        assert_eq!(bbox.max, DVec3::new(1.0, 0.0, 3.5));
    }

    #[test]
    fn expand_box_copies_into_empty() {
        let source = Box3d::new(DVec3::new(-1.0, -2.0, -3.0), DVec3::new(4.0, 5.0, 6.0));
        let mut bbox = Box3d::empty();
        bbox.expand_box(&source);
        assert_eq!(bbox, source);

        let mut untouched = source;
        untouched.expand_box(&Box3d::empty());
        assert_eq!(untouched, source);
    }

    #[test]
    fn box2_union_and_pad() {
        let mut bbox = Box2d::empty();
        bbox.expand_box(&Box2d::empty());
        assert!(bbox.is_empty());
        bbox.expand(DVec2::new(0.0, 0.0));
        bbox.expand(DVec2::new(2.0, 4.0));
        bbox.pad(DVec2::splat(1.0));
        assert_eq!(bbox.min, DVec2::new(-1.0, -1.0));
        assert_eq!(bbox.size(), DVec2::new(4.0, 6.0));
        assert_eq!(bbox.center(), DVec2::new(1.0, 2.0));
    }

    #[test]
    fn disjoint_intersection_is_empty() {
        let mut a = Box3d::new(DVec3::ZERO, DVec3::ONE);
        a.intersect(&Box3d::new(DVec3::splat(2.0), DVec3::splat(3.0)));
        assert!(a.is_empty());
    }

    #[test]
    fn empty_box_survives_json() {
        let json = serde_json::to_string(&Box3d::empty()).unwrap();
        assert!(!json.contains("null"), "{json}");
        let back: Box3d = serde_json::from_str(&json).unwrap();
        assert!(back.is_empty());
        assert_eq!(back, Box3d::empty());
    }
}
