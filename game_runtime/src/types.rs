// types.rs - Shared math and pose types exchanged with the physics collaborator
use rust_maze_generator::GridPos;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    #[inline]
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    #[inline]
    pub const fn zero() -> Self {
        Self::new(0.0, 0.0, 0.0)
    }

    #[inline]
    pub fn length(self) -> f32 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }

    #[inline]
    pub fn cross(self, other: Vec3) -> Vec3 {
        Vec3::new(
            self.y * other.z - self.z * other.y,
            self.z * other.x - self.x * other.z,
            self.x * other.y - self.y * other.x,
        )
    }
}

impl std::ops::Add for Vec3 {
    type Output = Vec3;
    #[inline]
    fn add(self, other: Vec3) -> Vec3 {
        Vec3::new(self.x + other.x, self.y + other.y, self.z + other.z)
    }
}

impl std::ops::Mul<f32> for Vec3 {
    type Output = Vec3;
    #[inline]
    fn mul(self, scalar: f32) -> Vec3 {
        Vec3::new(self.x * scalar, self.y * scalar, self.z * scalar)
    }
}

impl From<[f32; 3]> for Vec3 {
    #[inline]
    fn from(arr: [f32; 3]) -> Self {
        Vec3::new(arr[0], arr[1], arr[2])
    }
}

/// Unit quaternion (x, y, z, w)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Quat {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub w: f32,
}

impl Default for Quat {
    fn default() -> Self {
        Self::identity()
    }
}

impl Quat {
    #[inline]
    pub const fn identity() -> Self {
        Self { x: 0.0, y: 0.0, z: 0.0, w: 1.0 }
    }

    /// Rotation of `angle` radians about `axis` (normalized here; zero axis gives identity)
    pub fn from_axis_angle(axis: Vec3, angle: f32) -> Self {
        let len = axis.length();
        if len < 1e-6 {
            return Self::identity();
        }
        let (s, c) = (angle * 0.5).sin_cos();
        let k = s / len;
        Self {
            x: axis.x * k,
            y: axis.y * k,
            z: axis.z * k,
            w: c,
        }
    }

    /// Hamilton product `self * rhs` (apply `rhs` first)
    pub fn mul(self, rhs: Quat) -> Quat {
        Quat {
            w: self.w * rhs.w - self.x * rhs.x - self.y * rhs.y - self.z * rhs.z,
            x: self.w * rhs.x + self.x * rhs.w + self.y * rhs.z - self.z * rhs.y,
            y: self.w * rhs.y - self.x * rhs.z + self.y * rhs.w + self.z * rhs.x,
            z: self.w * rhs.z + self.x * rhs.y - self.y * rhs.x + self.z * rhs.w,
        }
    }

    pub fn norm(self) -> f32 {
        (self.x * self.x + self.y * self.y + self.z * self.z + self.w * self.w).sqrt()
    }

    pub fn normalize(self) -> Quat {
        let n = self.norm();
        if n < 1e-12 {
            return Self::identity();
        }
        Quat {
            x: self.x / n,
            y: self.y / n,
            z: self.z / n,
            w: self.w / n,
        }
    }
}

/// Ball position and orientation as reported by the physics world
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct BallPose {
    pub position: Vec3,
    pub orientation: Quat,
}

impl BallPose {
    pub fn at(position: Vec3) -> Self {
        Self {
            position,
            orientation: Quat::identity(),
        }
    }

    /// Grid cell under the ball (`floor(p + 0.5)` per axis)
    #[inline]
    pub fn cell(&self) -> GridPos {
        GridPos::round_from(self.position.x, self.position.y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pose_cell_rounding() {
        let pose = BallPose::at(Vec3::new(11.3, 9.4, 0.25));
        assert_eq!(pose.cell(), GridPos::new(11, 9));
        let pose = BallPose::at(Vec3::new(10.4, 9.4, 0.25));
        assert_eq!(pose.cell(), GridPos::new(10, 9));
    }

    #[test]
    fn test_quaternion_stays_unit() {
        let mut q = Quat::identity();
        let step = Quat::from_axis_angle(Vec3::new(-1.0, 2.0, 0.0), 0.3);
        for _ in 0..1000 {
            q = step.mul(q).normalize();
        }
        assert!((q.norm() - 1.0).abs() < 1e-4);
    }

    #[test]
    fn test_zero_axis_is_identity() {
        assert_eq!(Quat::from_axis_angle(Vec3::zero(), 1.0), Quat::identity());
    }
}
