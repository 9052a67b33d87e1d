//! Axis-aligned boxes and the pose → world box transform
//!
//! Entities own a body-relative `local_box`. Each step the world box is
//! re-derived with [`world_box`] from that local box and the entity's
//! current [`Pose`], so nothing depends on a retained scene graph.

use glam::{Mat4, Quat, Vec3};
use serde::{Deserialize, Serialize};

/// Axis-aligned bounding box
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Default for Aabb {
    fn default() -> Self {
        Self {
            min: Vec3::ZERO,
            max: Vec3::ZERO,
        }
    }
}

impl Aabb {
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self {
            min: min.min(max),
            max: min.max(max),
        }
    }

    pub fn from_center_size(center: Vec3, size: Vec3) -> Self {
        let half = size.abs() * 0.5;
        Self {
            min: center - half,
            max: center + half,
        }
    }

    #[inline]
    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    #[inline]
    pub fn size(&self) -> Vec3 {
        self.max - self.min
    }

    pub fn volume(&self) -> f32 {
        let s = self.size();
        s.x * s.y * s.z
    }

    /// True when any extent is below `min_extent` (stale or placeholder transform)
    pub fn is_degenerate(&self, min_extent: f32) -> bool {
        self.size().min_element() < min_extent
    }

    /// Closed-interval overlap on all three axes
    #[inline]
    pub fn intersects(&self, other: &Aabb) -> bool {
        self.min.x <= other.max.x
            && self.max.x >= other.min.x
            && self.min.y <= other.max.y
            && self.max.y >= other.min.y
            && self.min.z <= other.max.z
            && self.max.z >= other.min.z
    }

    /// Overlap on the ground plane only (X and Z)
    #[inline]
    pub fn overlaps_xz(&self, other: &Aabb) -> bool {
        self.min.x <= other.max.x
            && self.max.x >= other.min.x
            && self.min.z <= other.max.z
            && self.max.z >= other.min.z
    }

    pub fn translated(&self, offset: Vec3) -> Self {
        Self {
            min: self.min + offset,
            max: self.max + offset,
        }
    }

    pub fn corners(&self) -> [Vec3; 8] {
        let (a, b) = (self.min, self.max);
        [
            Vec3::new(a.x, a.y, a.z),
            Vec3::new(b.x, a.y, a.z),
            Vec3::new(a.x, b.y, a.z),
            Vec3::new(b.x, b.y, a.z),
            Vec3::new(a.x, a.y, b.z),
            Vec3::new(b.x, a.y, b.z),
            Vec3::new(a.x, b.y, b.z),
            Vec3::new(b.x, b.y, b.z),
        ]
    }
}

/// World transform of an entity
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    pub translation: Vec3,
    /// Rotation about the vertical axis (radians)
    pub yaw: f32,
    pub scale: Vec3,
}

impl Default for Pose {
    fn default() -> Self {
        Self {
            translation: Vec3::ZERO,
            yaw: 0.0,
            scale: Vec3::ONE,
        }
    }
}

impl Pose {
    pub fn at(translation: Vec3) -> Self {
        Self {
            translation,
            ..Default::default()
        }
    }

    pub fn matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(
            self.scale,
            Quat::from_rotation_y(self.yaw),
            self.translation,
        )
    }
}

/// Transform a local box into an enclosing world-space box
pub fn world_box(local: &Aabb, pose: &Pose) -> Aabb {
    // Pure translation keeps the box exact and skips the matrix work
    if pose.yaw == 0.0 && pose.scale == Vec3::ONE {
        return local.translated(pose.translation);
    }

    let m = pose.matrix();
    let mut min = Vec3::splat(f32::INFINITY);
    let mut max = Vec3::splat(f32::NEG_INFINITY);
    for corner in local.corners() {
        let p = m.transform_point3(corner);
        min = min.min(p);
        max = max.max(p);
    }
    Aabb { min, max }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::FRAC_PI_2;

    fn approx(a: Vec3, b: Vec3) -> bool {
        (a - b).abs().max_element() < 1e-4
    }

    #[test]
    fn test_intersects_touching_edges() {
        let a = Aabb::from_center_size(Vec3::ZERO, Vec3::ONE);
        let b = Aabb::from_center_size(Vec3::new(1.0, 0.0, 0.0), Vec3::ONE);
        let c = Aabb::from_center_size(Vec3::new(1.2, 0.0, 0.0), Vec3::ONE);
        assert!(a.intersects(&b));
        assert!(!a.intersects(&c));
    }

    #[test]
    fn test_world_box_translation_only() {
        let local = Aabb::from_center_size(Vec3::new(0.0, 0.6, 0.0), Vec3::new(0.8, 1.2, 0.6));
        let w = world_box(&local, &Pose::at(Vec3::new(3.0, 0.0, -10.0)));
        assert!(approx(w.min, Vec3::new(2.6, 0.0, -10.3)));
        assert!(approx(w.max, Vec3::new(3.4, 1.2, -9.7)));
    }

    #[test]
    fn test_world_box_yaw_swaps_extents() {
        let local = Aabb::from_center_size(Vec3::ZERO, Vec3::new(2.0, 1.0, 0.5));
        let pose = Pose {
            yaw: FRAC_PI_2,
            ..Default::default()
        };
        let w = world_box(&local, &pose);
        assert!(approx(w.size(), Vec3::new(0.5, 1.0, 2.0)));
    }

    #[test]
    fn test_world_box_scale() {
        let local = Aabb::from_center_size(Vec3::ZERO, Vec3::ONE);
        let pose = Pose {
            scale: Vec3::new(1.0, 0.5, 1.0),
            ..Default::default()
        };
        assert!(approx(world_box(&local, &pose).size(), Vec3::new(1.0, 0.5, 1.0)));
    }

    #[test]
    fn test_degenerate() {
        let flat = Aabb::new(Vec3::ZERO, Vec3::new(1.0, 0.001, 1.0));
        assert!(flat.is_degenerate(0.01));
        assert!(!Aabb::from_center_size(Vec3::ZERO, Vec3::ONE).is_degenerate(0.01));
        assert_eq!(Aabb::default().volume(), 0.0);
    }
}
