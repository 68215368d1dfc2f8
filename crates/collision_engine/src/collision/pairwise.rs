//! Narrow-phase pairwise distance tests
//!
//! Signed distances between posed shape pairs: zero or negative means the
//! bodies intersect. Dispatch happens on the pair of shape tags; pairs the
//! resolver does not support yield `None` and are skipped by callers.

use crate::foundation::math::{Pose, Vec3};
use crate::shapes::Shape;

/// Result of one pairwise test
#[derive(Debug, Clone, Copy)]
pub struct PairwiseResult {
    /// True when the bodies intersect
    pub collision: bool,
    /// Signed separation: negative or zero on intersection
    pub distance: f64,
}

/// Signed distance test for a pair of posed shapes.
///
/// Returns `None` for pairs without a resolver (any pair involving an
/// ellipsoid). The cylinder-cylinder case is a stub that reports no
/// collision at infinite distance.
pub fn shape_pair_distance(
    shape_a: &Shape,
    pose_a: &Pose,
    shape_b: &Shape,
    pose_b: &Pose,
) -> Option<PairwiseResult> {
    match (shape_a, shape_b) {
        (Shape::Sphere { radius: r1 }, Shape::Sphere { radius: r2 }) => {
            Some(sphere_sphere(pose_a.position, *r1, pose_b.position, *r2))
        }
        (Shape::Sphere { radius }, Shape::Cylinder { radius: cr, length }) => {
            Some(sphere_cylinder(pose_a.position, *radius, pose_b, *cr, *length))
        }
        (Shape::Cylinder { radius: cr, length }, Shape::Sphere { radius }) => {
            Some(sphere_cylinder(pose_b.position, *radius, pose_a, *cr, *length))
        }
        (Shape::Ellipsoid { .. }, _) | (_, Shape::Ellipsoid { .. }) => None,
        (Shape::Cylinder { .. }, Shape::Cylinder { .. }) => {
            // TODO: replace the stub once a cylinder-cylinder test with
            // reference cases exists.
            Some(PairwiseResult {
                collision: false,
                distance: f64::INFINITY,
            })
        }
    }
}

/// Sphere-sphere: center distance minus the radius sum
fn sphere_sphere(p1: Vec3, r1: f64, p2: Vec3, r2: f64) -> PairwiseResult {
    let distance = (p1 - p2).norm() - (r1 + r2);
    PairwiseResult {
        collision: distance <= 0.0,
        distance,
    }
}

/// Sphere-cylinder: radial gate against the barrel, then an axial check
/// against the caps. A sphere exactly grazing a cap plane counts as a miss.
fn sphere_cylinder(
    sphere_center: Vec3,
    sphere_radius: f64,
    cylinder_pose: &Pose,
    cylinder_radius: f64,
    cylinder_length: f64,
) -> PairwiseResult {
    let v = sphere_center - cylinder_pose.position;
    let axis = cylinder_pose.orientation * Vec3::z();
    let axial_component = v.dot(&axis);
    let perpendicular = v - axis * axial_component;
    let radial = perpendicular.norm() - (sphere_radius + cylinder_radius);
    if radial > 0.0 {
        return PairwiseResult {
            collision: false,
            distance: radial,
        };
    }
    let axial = axial_component.abs() - (cylinder_length / 2.0 + sphere_radius);
    if axial < 0.0 {
        PairwiseResult {
            collision: true,
            distance: radial,
        }
    } else {
        PairwiseResult {
            collision: false,
            distance: axial,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::Quat;
    use approx::assert_relative_eq;
    use std::f64::consts::SQRT_2;

    fn at(x: f64, y: f64, z: f64) -> Pose {
        Pose::from_position(Vec3::new(x, y, z))
    }

    #[test]
    fn test_sphere_sphere_overlap_and_separation() {
        let sphere = Shape::sphere(1.0).unwrap();
        let result =
            shape_pair_distance(&sphere, &at(1.0, 1.0, 0.0), &sphere, &at(0.0, 0.0, 0.0)).unwrap();
        assert!(result.collision);
        assert_relative_eq!(result.distance, SQRT_2 - 2.0, epsilon = 1e-12);

        let result =
            shape_pair_distance(&sphere, &at(4.0, 0.0, 0.0), &sphere, &at(0.0, 0.0, 0.0)).unwrap();
        assert!(!result.collision);
        assert_relative_eq!(result.distance, 2.0);

        // Touching spheres count as colliding.
        let result =
            shape_pair_distance(&sphere, &at(2.0, 0.0, 0.0), &sphere, &at(0.0, 0.0, 0.0)).unwrap();
        assert!(result.collision);
        assert_relative_eq!(result.distance, 0.0);
    }

    #[test]
    fn test_sphere_cylinder_radial_miss() {
        // Sphere r=1 at (3, 0, -2) beside a vertical cylinder r=1,
        // length 6 at the origin: separated by the barrel gap.
        let sphere = Shape::sphere(1.0).unwrap();
        let cylinder = Shape::cylinder(1.0, 6.0).unwrap();
        let result = shape_pair_distance(
            &sphere,
            &at(3.0, 0.0, -2.0),
            &cylinder,
            &Pose::identity(),
        )
        .unwrap();
        assert!(!result.collision);
        assert_relative_eq!(result.distance, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_sphere_cylinder_barrel_hit() {
        // Inside the barrel radius and between the caps.
        let sphere = Shape::sphere(1.0).unwrap();
        let cylinder = Shape::cylinder(1.0, 6.0).unwrap();
        let result = shape_pair_distance(
            &sphere,
            &at(1.5, 0.0, 1.0),
            &cylinder,
            &Pose::identity(),
        )
        .unwrap();
        assert!(result.collision);
        assert_relative_eq!(result.distance, -0.5, epsilon = 1e-12);
    }

    #[test]
    fn test_sphere_cylinder_axial_miss_beyond_cap() {
        // Radially inside but past the cap plane.
        let sphere = Shape::sphere(1.0).unwrap();
        let cylinder = Shape::cylinder(1.0, 6.0).unwrap();
        let result = shape_pair_distance(
            &sphere,
            &at(1.5, 0.0, 6.2),
            &cylinder,
            &Pose::identity(),
        )
        .unwrap();
        assert!(!result.collision);
        assert_relative_eq!(result.distance, 2.2, epsilon = 1e-12);
    }

    #[test]
    fn test_sphere_cylinder_cap_graze_is_a_miss() {
        // A sphere whose surface exactly reaches the cap plane: the axial
        // term is exactly zero and the pair does not collide.
        let sphere = Shape::sphere(1.0).unwrap();
        let cylinder = Shape::cylinder(1.0, 6.0).unwrap();
        let result = shape_pair_distance(
            &sphere,
            &at(1.0, 1.0, 4.0),
            &cylinder,
            &Pose::identity(),
        )
        .unwrap();
        assert!(!result.collision);
        assert_relative_eq!(result.distance, 0.0);

        // Slightly deeper, it collides.
        let result = shape_pair_distance(
            &sphere,
            &at(1.0, 1.0, 3.2),
            &cylinder,
            &Pose::identity(),
        )
        .unwrap();
        assert!(result.collision);
    }

    #[test]
    fn test_sphere_cylinder_respects_orientation() {
        // Cylinder tipped onto the X axis: a sphere beside it on Z now
        // faces the barrel instead of a cap.
        let sphere = Shape::sphere(1.0).unwrap();
        let cylinder = Shape::cylinder(1.0, 6.0).unwrap();
        let tipped = Pose::from_position_rotation(
            Vec3::zeros(),
            Quat::rotation_between(&Vec3::z(), &Vec3::x()).unwrap(),
        );
        let result =
            shape_pair_distance(&sphere, &at(0.0, 0.0, 1.5), &cylinder, &tipped).unwrap();
        assert!(result.collision);
        assert_relative_eq!(result.distance, -0.5, epsilon = 1e-12);

        let result =
            shape_pair_distance(&sphere, &at(4.5, 0.0, 0.0), &cylinder, &tipped).unwrap();
        assert!(!result.collision);
    }

    #[test]
    fn test_unsupported_pairs() {
        let sphere = Shape::sphere(1.0).unwrap();
        let ellipsoid = Shape::ellipsoid(1.0, 2.0, 3.0).unwrap();
        let cylinder = Shape::cylinder(1.0, 2.0).unwrap();
        assert!(shape_pair_distance(&sphere, &at(0.0, 0.0, 0.0), &ellipsoid, &at(0.0, 0.0, 0.0))
            .is_none());
        let stub = shape_pair_distance(
            &cylinder,
            &at(0.0, 0.0, 0.0),
            &cylinder,
            &at(0.0, 0.0, 0.0),
        )
        .unwrap();
        assert!(!stub.collision);
        assert_eq!(stub.distance, f64::INFINITY);
    }
}
