//! Math utilities and types
//!
//! Provides the fundamental math types for rigid-body simulation geometry.
//! All simulation code works in `f64`; positions are plain vectors and
//! orientations are unit quaternions.

pub use nalgebra::{Unit, UnitQuaternion, Vector3};

/// 3D vector type
pub type Vec3 = Vector3<f64>;

/// 3D point type
pub type Point3 = nalgebra::Point3<f64>;

/// Quaternion type for rotations
pub type Quat = UnitQuaternion<f64>;

/// Rigid-body pose: position plus orientation, no scale.
///
/// A pose doubles as a reference frame: composing a frame with a local pose
/// yields the pose expressed in the frame's parent coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct Pose {
    /// Position in the parent frame
    pub position: Vec3,

    /// Orientation in the parent frame
    pub orientation: Quat,
}

impl Default for Pose {
    fn default() -> Self {
        Self {
            position: Vec3::zeros(),
            orientation: Quat::identity(),
        }
    }
}

impl Pose {
    /// Create an identity pose
    pub fn identity() -> Self {
        Self::default()
    }

    /// Create a pose with only a position
    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            ..Default::default()
        }
    }

    /// Create a pose with position and orientation
    pub fn from_position_rotation(position: Vec3, orientation: Quat) -> Self {
        Self {
            position,
            orientation,
        }
    }

    /// Compose this frame with a local pose, producing the local pose
    /// expressed in this frame's parent coordinates.
    pub fn compose(&self, local: &Pose) -> Pose {
        Pose {
            position: self.position + self.orientation * local.position,
            orientation: self.orientation * local.orientation,
        }
    }

    /// Apply this frame to a local point
    pub fn transform_point(&self, point: Vec3) -> Vec3 {
        self.position + self.orientation * point
    }

    /// Re-express a pose given in this frame's parent coordinates as a pose
    /// local to this frame. Inverse of [`Pose::compose`].
    pub fn express_in(&self, frame: &Pose) -> Pose {
        let inv = frame.orientation.inverse();
        Pose {
            position: inv * (self.position - frame.position),
            orientation: inv * self.orientation,
        }
    }

    /// Translate the pose in its parent frame
    pub fn translate(&mut self, translation: Vec3) {
        self.position += translation;
    }

    /// Compose a rotation onto the pose's orientation (body-frame rotation)
    pub fn rotate(&mut self, rotation: Quat) {
        self.orientation *= rotation;
    }
}

/// Shortest-arc rotation taking `from` onto `to`.
///
/// Falls back to a half-turn about an arbitrary orthogonal axis when the
/// directions are anti-parallel, and to identity when either input is zero.
pub fn rotation_onto(from: &Vec3, to: &Vec3) -> Quat {
    if from.norm() == 0.0 || to.norm() == 0.0 {
        return Quat::identity();
    }
    match Quat::rotation_between(from, to) {
        Some(rotation) => rotation,
        None => {
            // Anti-parallel directions: any axis orthogonal to `from` works.
            let axis = orthogonal_to(from);
            Quat::from_axis_angle(&Unit::new_normalize(axis), std::f64::consts::PI)
        }
    }
}

fn orthogonal_to(v: &Vec3) -> Vec3 {
    let candidate = if v.x.abs() < v.z.abs() {
        Vec3::x_axis().into_inner()
    } else {
        Vec3::z_axis().into_inner()
    };
    v.cross(&candidate)
}
