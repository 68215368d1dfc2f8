//! Collision detection over clustered agents
//!
//! The detector keeps one octree per registered cluster: every member agent
//! is indexed by a symmetric cube around its global position sized to its
//! shape's largest extent. A collision query walks the tree to the nearest
//! candidate leaf and resolves the contained agents pairwise.

pub mod pairwise;

pub use pairwise::{shape_pair_distance, PairwiseResult};

use crate::config::DetectorConfig;
use crate::foundation::math::Pose;
use crate::simulation::{SimulationContainer, SimulationError};
use crate::spatial::{Bounds, Octree};
use std::collections::{HashMap, HashSet};

/// Result of a cluster collision query
#[derive(Debug, Clone, Copy)]
pub struct CollisionOutcome {
    /// True when the candidate intersects at least one cluster agent
    pub collision: bool,
    /// On collision, the intersecting agent with the smallest signed
    /// distance; otherwise the first candidate considered, if any
    pub nearest: Option<u64>,
    /// Smallest signed distance among intersecting pairs; positive
    /// infinity when there is no collision
    pub nearest_distance: f64,
}

/// Per-cluster octree registry with pairwise collision resolution
#[derive(Debug, Default)]
pub struct CollisionDetector {
    trees: HashMap<u64, Octree>,
    config: DetectorConfig,
}

impl CollisionDetector {
    /// Create a detector with default tree settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a detector with explicit tree settings
    pub fn with_config(config: DetectorConfig) -> Self {
        Self {
            trees: HashMap::new(),
            config,
        }
    }

    /// Current tree settings
    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    /// Root diameter used for subsequently built trees
    pub fn set_initial_tree_diameter(&mut self, diameter: f64) {
        self.config.initial_tree_diameter = diameter;
    }

    /// Minimum leaf diameter used for subsequently built trees
    pub fn set_minimal_cell_diameter(&mut self, diameter: f64) {
        self.config.minimal_cell_diameter = diameter;
    }

    /// Whether subsequently built trees may grow on out-of-root inserts
    pub fn set_allow_rescaling(&mut self, allow: bool) {
        self.config.allow_rescaling = allow;
    }

    /// True if a tree has been built for the cluster
    pub fn is_cluster_in_detector(&self, cluster_id: u64) -> bool {
        self.trees.contains_key(&cluster_id)
    }

    /// The tree built for a cluster, if any
    pub fn tree(&self, cluster_id: u64) -> Option<&Octree> {
        self.trees.get(&cluster_id)
    }

    /// Build (or rebuild) the octree for a cluster from its current state
    pub fn build_tree(
        &mut self,
        container: &SimulationContainer,
        cluster_id: u64,
    ) -> Result<(), SimulationError> {
        let cluster = container.cluster(cluster_id)?;
        let mut tree = Octree::new(
            self.config.initial_tree_diameter,
            self.config.minimal_cell_diameter,
        );
        tree.set_allow_resize(self.config.allow_rescaling);
        for agent_id in cluster.agent_ids() {
            let (lower, upper) = agent_bounds(container, agent_id)?;
            tree.insert(agent_id, lower, upper);
        }
        log::info!(
            "built collision tree for cluster {cluster_id}: {} agents, {} nodes",
            cluster.len(),
            tree.len()
        );
        self.trees.insert(cluster_id, tree);
        Ok(())
    }

    /// Insert a single agent into the cluster's existing tree
    pub fn insert_agent(
        &mut self,
        container: &SimulationContainer,
        agent_id: u64,
        cluster_id: u64,
    ) -> Result<(), SimulationError> {
        let (lower, upper) = agent_bounds(container, agent_id)?;
        let tree = self
            .trees
            .get_mut(&cluster_id)
            .ok_or(SimulationError::UnknownId {
                entity: "collision tree",
                id: cluster_id,
            })?;
        tree.insert(agent_id, lower, upper);
        Ok(())
    }

    /// Test a posed candidate agent against a registered cluster.
    ///
    /// The octree supplies the nearest leaf whose ids are not all ignored;
    /// the agents behind those ids are then tested pairwise against the
    /// candidate in ascending id order.
    pub fn check_for_collision(
        &self,
        container: &SimulationContainer,
        cluster_id: u64,
        ignore: &HashSet<u64>,
        candidate_id: u64,
    ) -> Result<CollisionOutcome, SimulationError> {
        let cluster = container.cluster(cluster_id)?;
        let tree = self.trees.get(&cluster_id).ok_or(SimulationError::UnknownId {
            entity: "collision tree",
            id: cluster_id,
        })?;
        let candidate = container.agent(candidate_id)?;
        let candidate_pose = container.agent_global_pose(candidate_id)?;

        let leaf_key = tree.nearest_ignoring(
            candidate_pose.position.x,
            candidate_pose.position.y,
            candidate_pose.position.z,
            ignore,
        );
        let mut outcome = CollisionOutcome {
            collision: false,
            nearest: None,
            nearest_distance: f64::INFINITY,
        };
        let Some(leaf) = tree.node(leaf_key) else {
            return Ok(outcome);
        };

        for &other_id in leaf.ids() {
            if ignore.contains(&other_id) {
                continue;
            }
            if !cluster.contains(other_id) {
                return Err(SimulationError::ClusterMismatch(format!(
                    "agent {other_id} indexed for cluster {cluster_id} is not a member"
                )));
            }
            let other = container.agent(other_id)?;
            let other_pose = container.agent_global_pose(other_id)?;
            let Some(result) = shape_pair_distance(
                candidate.shape(),
                &candidate_pose,
                other.shape(),
                &other_pose,
            ) else {
                continue;
            };
            if outcome.nearest.is_none() {
                outcome.nearest = Some(other_id);
            }
            if result.collision && result.distance < outcome.nearest_distance {
                outcome.collision = true;
                outcome.nearest = Some(other_id);
                outcome.nearest_distance = result.distance;
            }
        }
        Ok(outcome)
    }

    /// Direct pairwise collision test between two agents, bypassing trees
    pub fn check_bodies(
        &self,
        container: &SimulationContainer,
        first_id: u64,
        second_id: u64,
    ) -> Result<bool, SimulationError> {
        Ok(self
            .body_pair(container, first_id, second_id)?
            .map_or(false, |result| result.collision))
    }

    /// Signed distance between two agents, positive infinity for pairs
    /// without a resolver
    pub fn body_distance(
        &self,
        container: &SimulationContainer,
        first_id: u64,
        second_id: u64,
    ) -> Result<f64, SimulationError> {
        match self.body_pair(container, first_id, second_id)? {
            Some(result) => Ok(result.distance),
            None => {
                log::warn!(
                    "no distance resolver for agents {first_id} and {second_id}, \
                     reporting infinite distance"
                );
                Ok(f64::INFINITY)
            }
        }
    }

    fn body_pair(
        &self,
        container: &SimulationContainer,
        first_id: u64,
        second_id: u64,
    ) -> Result<Option<PairwiseResult>, SimulationError> {
        let first = container.agent(first_id)?;
        let second = container.agent(second_id)?;
        let first_pose = container.agent_global_pose(first_id)?;
        let second_pose = container.agent_global_pose(second_id)?;
        Ok(shape_pair_distance(
            first.shape(),
            &first_pose,
            second.shape(),
            &second_pose,
        ))
    }
}

/// Symmetric index cube of an agent: centered on the global position, with
/// half-side equal to half the largest bounding-box extent
fn agent_bounds(
    container: &SimulationContainer,
    agent_id: u64,
) -> Result<(Bounds, Bounds), SimulationError> {
    let agent = container.agent(agent_id)?;
    let Pose { position, .. } = container.agent_global_pose(agent_id)?;
    let half = agent.shape().bounding_box().max_dimension() / 2.0;
    Ok((
        Bounds::new(position.x - half, position.y - half, position.z - half),
        Bounds::new(position.x + half, position.y + half, position.z + half),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::Vec3;
    use crate::shapes::Shape;
    use crate::simulation::specs::{AgentSpec, MetaSpec};
    use approx::assert_relative_eq;
    use std::f64::consts::SQRT_2;

    /// Unit sphere and unit-radius cylinder agent types.
    fn meta() -> MetaSpec {
        let sphere = AgentSpec::new("SphereAgent", Shape::sphere(1.0).unwrap(), []).unwrap();
        let cylinder =
            AgentSpec::new("CylinderAgent", Shape::cylinder(1.0, 6.0).unwrap(), []).unwrap();
        MetaSpec::new([sphere, cylinder]).unwrap()
    }

    /// Cluster 0 holding two unit spheres at the origin and (2, 0, 0),
    /// plus a free candidate agent. The probe points used below are
    /// equidistant from both spheres.
    fn two_sphere_setup(candidate_type: &str) -> (SimulationContainer, CollisionDetector) {
        let mut container = SimulationContainer::new(meta());
        container.add_agent(0, "SphereAgent").unwrap();
        container.add_agent(1, "SphereAgent").unwrap();
        container.agent_mut(1).unwrap().set_position(Vec3::new(2.0, 0.0, 0.0));
        container.add_agent_cluster(0, "default").unwrap();
        container.add_agent_to_cluster(0, 0).unwrap();
        container.add_agent_to_cluster(1, 0).unwrap();
        container.add_agent(8, candidate_type).unwrap();

        let mut detector = CollisionDetector::new();
        detector.build_tree(&container, 0).unwrap();
        (container, detector)
    }

    #[test]
    fn test_sphere_collision_with_progressive_ignores() {
        // Seed scenario: the candidate sphere overlaps both cluster
        // spheres at the same signed distance; ties go to the lower id.
        let (mut container, detector) = two_sphere_setup("SphereAgent");
        container.agent_mut(8).unwrap().set_position(Vec3::new(1.0, 1.0, 0.0));

        let outcome = detector
            .check_for_collision(&container, 0, &HashSet::new(), 8)
            .unwrap();
        assert!(outcome.collision);
        assert_eq!(outcome.nearest, Some(0));
        assert_relative_eq!(outcome.nearest_distance, SQRT_2 - 2.0, epsilon = 1e-12);

        let outcome = detector
            .check_for_collision(&container, 0, &HashSet::from([0]), 8)
            .unwrap();
        assert!(outcome.collision);
        assert_eq!(outcome.nearest, Some(1));
        assert_relative_eq!(outcome.nearest_distance, SQRT_2 - 2.0, epsilon = 1e-12);

        let outcome = detector
            .check_for_collision(&container, 0, &HashSet::from([0, 1]), 8)
            .unwrap();
        assert!(!outcome.collision);
        assert_eq!(outcome.nearest, None);
        assert_eq!(outcome.nearest_distance, f64::INFINITY);
    }

    #[test]
    fn test_sphere_out_of_range_reports_first_candidate() {
        // Seed scenario: candidate above the pair, no intersection. The
        // reported neighbor is the first candidate in id order and the
        // distance stays at infinity.
        let (mut container, detector) = two_sphere_setup("SphereAgent");
        container.agent_mut(8).unwrap().set_position(Vec3::new(1.0, 1.0, 6.0));

        let outcome = detector
            .check_for_collision(&container, 0, &HashSet::new(), 8)
            .unwrap();
        assert!(!outcome.collision);
        assert_eq!(outcome.nearest, Some(0));
        assert_eq!(outcome.nearest_distance, f64::INFINITY);
    }

    #[test]
    fn test_cylinder_candidate_axial_cases() {
        // Seed scenario: cylinder candidate over a sphere cluster. At
        // z = 4.0 the cap exactly grazes the sphere below: a miss. At
        // z = 3.2 the pair intersects.
        let (mut container, detector) = two_sphere_setup("CylinderAgent");

        container.agent_mut(8).unwrap().set_position(Vec3::new(1.0, 1.0, 4.0));
        let outcome = detector
            .check_for_collision(&container, 0, &HashSet::new(), 8)
            .unwrap();
        assert!(!outcome.collision);
        assert_eq!(outcome.nearest, Some(0));

        container.agent_mut(8).unwrap().set_position(Vec3::new(1.0, 1.0, 3.2));
        let outcome = detector
            .check_for_collision(&container, 0, &HashSet::from([0]), 8)
            .unwrap();
        assert!(outcome.collision);
        assert_eq!(outcome.nearest, Some(1));
    }

    #[test]
    fn test_cylinder_cluster_against_sphere_candidate() {
        // Vertical cylinder at the origin, sphere candidate beside it:
        // radial miss and barrel hit resolved through the octree path.
        let mut container = SimulationContainer::new(meta());
        container.add_agent(10, "CylinderAgent").unwrap();
        container.add_agent_cluster(1, "default").unwrap();
        container.add_agent_to_cluster(10, 1).unwrap();
        container.add_agent(8, "SphereAgent").unwrap();

        let mut detector = CollisionDetector::new();
        detector.build_tree(&container, 1).unwrap();

        container.agent_mut(8).unwrap().set_position(Vec3::new(3.0, 0.0, -2.0));
        let outcome = detector
            .check_for_collision(&container, 1, &HashSet::new(), 8)
            .unwrap();
        assert!(!outcome.collision);
        assert_eq!(outcome.nearest, Some(10));

        container.agent_mut(8).unwrap().set_position(Vec3::new(1.5, 0.0, 1.0));
        let outcome = detector
            .check_for_collision(&container, 1, &HashSet::new(), 8)
            .unwrap();
        assert!(outcome.collision);
        assert_eq!(outcome.nearest, Some(10));
        assert_relative_eq!(outcome.nearest_distance, -0.5, epsilon = 1e-12);
    }

    #[test]
    fn test_missing_tree_is_an_error() {
        let (container, detector) = two_sphere_setup("SphereAgent");
        assert!(matches!(
            detector.check_for_collision(&container, 99, &HashSet::new(), 8),
            Err(SimulationError::UnknownId { entity: "cluster", id: 99 })
        ));

        let mut container = container;
        container.add_agent_cluster(5, "default").unwrap();
        assert!(matches!(
            detector.check_for_collision(&container, 5, &HashSet::new(), 8),
            Err(SimulationError::UnknownId {
                entity: "collision tree",
                id: 5
            })
        ));
    }

    #[test]
    fn test_insert_agent_into_existing_tree() {
        let (mut container, mut detector) = two_sphere_setup("SphereAgent");
        container.add_agent(2, "SphereAgent").unwrap();
        container.agent_mut(2).unwrap().set_position(Vec3::new(-3.0, 0.0, 0.0));
        container.add_agent_to_cluster(2, 0).unwrap();
        detector.insert_agent(&container, 2, 0).unwrap();

        container.agent_mut(8).unwrap().set_position(Vec3::new(-3.0, 0.5, 0.0));
        let outcome = detector
            .check_for_collision(&container, 0, &HashSet::new(), 8)
            .unwrap();
        assert!(outcome.collision);
        assert_eq!(outcome.nearest, Some(2));
    }

    #[test]
    fn test_body_distance_and_direct_check() {
        let (mut container, detector) = two_sphere_setup("SphereAgent");
        container.agent_mut(8).unwrap().set_position(Vec3::new(5.0, 0.0, 0.0));
        assert_relative_eq!(
            detector.body_distance(&container, 8, 0).unwrap(),
            3.0,
            epsilon = 1e-12
        );
        assert!(!detector.check_bodies(&container, 8, 0).unwrap());

        container.agent_mut(8).unwrap().set_position(Vec3::new(1.5, 0.0, 0.0));
        assert!(detector.check_bodies(&container, 8, 0).unwrap());
        assert_relative_eq!(
            detector.body_distance(&container, 8, 0).unwrap(),
            -0.5,
            epsilon = 1e-12
        );
    }
}
