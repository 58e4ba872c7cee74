//! Math types for the sound driver

pub use glam::{Quat, Vec3};

/// Position and orientation of the listener.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pose {
    pub position: Vec3,
    pub rotation: Quat,
}

impl Pose {
    pub fn new(position: Vec3, rotation: Quat) -> Self {
        Self { position, rotation }
    }

    pub fn identity() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
        }
    }

    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            rotation: Quat::IDENTITY,
        }
    }

    pub fn right(&self) -> Vec3 {
        self.rotation * Vec3::X
    }

    pub fn distance_to(&self, point: Vec3) -> f32 {
        self.position.distance(point)
    }

    /// Transforms a world-space point into this pose's local space.
    pub fn to_local(&self, point: Vec3) -> Vec3 {
        self.rotation.inverse() * (point - self.position)
    }
}

impl Default for Pose {
    fn default() -> Self {
        Self::identity()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::FRAC_PI_2;

    #[test]
    fn test_to_local_identity() {
        let pose = Pose::from_position(Vec3::new(1.0, 2.0, 3.0));
        let local = pose.to_local(Vec3::new(2.0, 2.0, 3.0));
        assert!((local - Vec3::X).length() < 1e-6);
    }

    #[test]
    fn test_to_local_rotated() {
        // Turned 90 degrees left around +Y: world -Z ends up on the local right.
        let pose = Pose::new(Vec3::ZERO, Quat::from_rotation_y(FRAC_PI_2));
        let local = pose.to_local(Vec3::new(0.0, 0.0, -1.0));
        assert!((local - Vec3::X).length() < 1e-5);
        assert!((pose.right() - Vec3::new(0.0, 0.0, -1.0)).length() < 1e-5);
    }
}
