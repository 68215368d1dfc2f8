//! Controller facade binding specifications, entities, and collision trees
//!
//! The [`CollisionController`] is the stable entry point for hosts: it owns
//! the simulation container and the collision detector, builds entities
//! from specs, connects agents by their sites (with rigid pose alignment),
//! and answers nearest-neighbor and collision queries.

use crate::collision::{shape_pair_distance, CollisionDetector, CollisionOutcome};
use crate::config::{ConfigError, DetectorConfig};
use crate::foundation::math::{rotation_onto, Pose, Quat, Vec3};
use crate::shapes::{Shape, ShapeError, ShapeKind};
use crate::simulation::{
    AgentSpec, CoordKind, MetaSpec, SimulationContainer, SimulationError, SiteRef, SiteSpec,
};
use std::collections::HashSet;
use std::fmt;
use thiserror::Error;

/// Controller-level errors
#[derive(Error, Debug)]
pub enum ControllerError {
    /// Entity or specification failure
    #[error(transparent)]
    Simulation(#[from] SimulationError),

    /// Shape construction or conversion failure
    #[error(transparent)]
    Shape(#[from] ShapeError),

    /// Configuration file failure
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Facade over the simulation container and the collision detector
pub struct CollisionController {
    container: SimulationContainer,
    detector: CollisionDetector,
    next_cluster_id: u64,
}

impl CollisionController {
    /// Create a controller around a meta specification
    pub fn new(meta: MetaSpec) -> Self {
        Self {
            container: SimulationContainer::new(meta),
            detector: CollisionDetector::new(),
            next_cluster_id: 0,
        }
    }

    /// Create a controller with explicit detector settings
    pub fn with_config(meta: MetaSpec, config: DetectorConfig) -> Self {
        Self {
            container: SimulationContainer::new(meta),
            detector: CollisionDetector::with_config(config),
            next_cluster_id: 0,
        }
    }

    /// Create a controller with detector settings loaded from a TOML or
    /// RON file
    pub fn with_config_file(meta: MetaSpec, path: &str) -> Result<Self, ControllerError> {
        use crate::config::Config;
        Ok(Self::with_config(meta, DetectorConfig::load_from_file(path)?))
    }

    /// Build a site specification
    pub fn create_site_spec(
        id: u64,
        site_type: impl Into<String>,
        a: f64,
        b: f64,
        c: f64,
        kind: CoordKind,
    ) -> SiteSpec {
        SiteSpec::new(id, site_type, a, b, c, kind)
    }

    /// Build a shape from a discriminant and 1-3 dimensions
    pub fn create_shape(kind: ShapeKind, dims: &[f64]) -> Result<Shape, ShapeError> {
        Shape::from_kind(kind, dims)
    }

    /// Build an agent specification; duplicate site ids are rejected
    pub fn create_agent_spec(
        agent_type: impl Into<String>,
        shape: Shape,
        site_specs: impl IntoIterator<Item = SiteSpec>,
    ) -> Result<AgentSpec, SimulationError> {
        AgentSpec::new(agent_type, shape, site_specs)
    }

    /// Build a meta specification; duplicate agent types are rejected
    pub fn create_meta_spec(
        agent_specs: impl IntoIterator<Item = AgentSpec>,
    ) -> Result<MetaSpec, SimulationError> {
        MetaSpec::new(agent_specs)
    }

    /// Read access to the simulation container
    pub fn container(&self) -> &SimulationContainer {
        &self.container
    }

    /// Read access to the collision detector
    pub fn detector(&self) -> &CollisionDetector {
        &self.detector
    }

    /// Instantiate an agent of a registered type
    pub fn create_agent(&mut self, id: u64, agent_type: &str) -> Result<(), ControllerError> {
        self.container.add_agent(id, agent_type)?;
        Ok(())
    }

    /// Create an empty agent cluster
    pub fn create_agent_cluster(
        &mut self,
        id: u64,
        cluster_type: &str,
    ) -> Result<(), ControllerError> {
        self.container.add_agent_cluster(id, cluster_type)?;
        Ok(())
    }

    /// Add an agent to a cluster (idempotent for repeated membership)
    pub fn add_agent_to_cluster(
        &mut self,
        agent_id: u64,
        cluster_id: u64,
    ) -> Result<(), ControllerError> {
        self.container.add_agent_to_cluster(agent_id, cluster_id)?;
        Ok(())
    }

    /// Translate an agent within its frame
    pub fn move_agent(&mut self, id: u64, translation: Vec3) -> Result<(), ControllerError> {
        self.container.agent_mut(id)?.translate(translation);
        Ok(())
    }

    /// Compose a rotation onto an agent's orientation
    pub fn rotate_agent(&mut self, id: u64, rotation: Quat) -> Result<(), ControllerError> {
        self.container.agent_mut(id)?.rotate(rotation);
        Ok(())
    }

    /// Overwrite an agent's position within its frame
    pub fn set_agent_position(&mut self, id: u64, position: Vec3) -> Result<(), ControllerError> {
        self.container.agent_mut(id)?.set_position(position);
        Ok(())
    }

    /// Overwrite an agent's orientation within its frame
    pub fn set_agent_orientation(
        &mut self,
        id: u64,
        orientation: Quat,
    ) -> Result<(), ControllerError> {
        self.container.agent_mut(id)?.set_orientation(orientation);
        Ok(())
    }

    /// Translate a cluster frame
    pub fn move_cluster(&mut self, id: u64, translation: Vec3) -> Result<(), ControllerError> {
        self.container.cluster_mut(id)?.translate(translation);
        Ok(())
    }

    /// Compose a rotation onto a cluster frame
    pub fn rotate_cluster(&mut self, id: u64, rotation: Quat) -> Result<(), ControllerError> {
        self.container.cluster_mut(id)?.rotate(rotation);
        Ok(())
    }

    /// Connect two agents by bonding one site of each.
    ///
    /// The agents end up in one cluster, positioned so the two site
    /// positions coincide and their outward hull directions are
    /// anti-parallel. A fresh cluster is created when neither agent is
    /// clustered; a lone unclustered agent joins the other's cluster; two
    /// distinct clusters are merged by carrying the second agent's whole
    /// assembly rigidly. Connecting within one cluster is rejected, as is
    /// re-bonding an already connected site.
    pub fn connect_agents(
        &mut self,
        agent1: u64,
        agent2: u64,
        site1: u64,
        site2: u64,
    ) -> Result<(), ControllerError> {
        for (agent_id, site_id) in [(agent1, site1), (agent2, site2)] {
            let agent = self.container.agent(agent_id)?;
            let site = agent
                .site(site_id)
                .ok_or(SimulationError::UnknownId {
                    entity: "site",
                    id: site_id,
                })?;
            if site.is_connected() {
                return Err(SimulationError::SiteAlreadyConnected {
                    agent: agent_id,
                    site: site_id,
                }
                .into());
            }
        }

        let cluster1 = self.container.agent(agent1)?.cluster();
        let cluster2 = self.container.agent(agent2)?.cluster();

        let (target, anchor, moving, moved, source) = match (cluster1, cluster2) {
            (Some(c1), Some(c2)) if c1 == c2 => {
                return Err(SimulationError::ClusterMismatch(format!(
                    "agents {agent1} and {agent2} already share cluster {c1}"
                ))
                .into());
            }
            (Some(c1), Some(c2)) => {
                let members: Vec<u64> = self.container.cluster(c2)?.agent_ids().collect();
                (c1, (agent1, site1), (agent2, site2), members, Some(c2))
            }
            (Some(c1), None) => (c1, (agent1, site1), (agent2, site2), vec![agent2], None),
            (None, Some(c2)) => (c2, (agent2, site2), (agent1, site1), vec![agent1], None),
            (None, None) => {
                let cluster_id = self.next_free_cluster_id();
                self.container.add_agent_cluster(cluster_id, "default")?;
                self.container.add_agent_to_cluster(agent1, cluster_id)?;
                (
                    cluster_id,
                    (agent1, site1),
                    (agent2, site2),
                    vec![agent2],
                    None,
                )
            }
        };

        self.align_and_adopt(anchor, moving, &moved, target)?;
        if let Some(source) = source {
            self.container.remove_empty_cluster(source)?;
        }
        self.container.connect_sites(
            SiteRef {
                agent: agent1,
                site: site1,
            },
            SiteRef {
                agent: agent2,
                site: site2,
            },
        )?;
        log::debug!(
            "connected agent {agent1} site {site1} to agent {agent2} site {site2} \
             in cluster {target}"
        );
        Ok(())
    }

    /// Rigidly reposition `moved` so that the moving site lands on the
    /// anchor site with opposed outward directions, then adopt every moved
    /// agent into the target cluster preserving its new global pose.
    fn align_and_adopt(
        &mut self,
        anchor: (u64, u64),
        moving: (u64, u64),
        moved: &[u64],
        target_cluster: u64,
    ) -> Result<(), SimulationError> {
        // Capture everything in global coordinates before any membership
        // or pose changes.
        let anchor_site = self.container.site_global_position(anchor.0, anchor.1)?;
        let anchor_center = self.container.agent_global_pose(anchor.0)?.position;
        let moving_site = self.container.site_global_position(moving.0, moving.1)?;
        let moving_center = self.container.agent_global_pose(moving.0)?.position;

        // Outward directions: from each agent center to its site.
        let anchor_dir = anchor_site - anchor_center;
        let moving_dir = moving_site - moving_center;
        let rotation = rotation_onto(&moving_dir, &(-anchor_dir));

        let mut new_globals = Vec::with_capacity(moved.len());
        for &id in moved {
            let global = self.container.agent_global_pose(id)?;
            new_globals.push((
                id,
                Pose {
                    // Rotate about the moving site, then put it on the anchor.
                    position: rotation * (global.position - moving_site) + anchor_site,
                    orientation: rotation * global.orientation,
                },
            ));
        }

        let target_pose = self.container.cluster(target_cluster)?.pose().clone();
        for (id, global) in new_globals {
            self.container.transfer_agent(id, target_cluster)?;
            let local = global.express_in(&target_pose);
            let agent = self.container.agent_mut(id)?;
            agent.set_position(local.position);
            agent.set_orientation(local.orientation);
        }
        Ok(())
    }

    fn next_free_cluster_id(&mut self) -> u64 {
        while self.container.has_cluster(self.next_cluster_id) {
            self.next_cluster_id += 1;
        }
        let id = self.next_cluster_id;
        self.next_cluster_id += 1;
        id
    }

    /// Root diameter for subsequently built collision trees
    pub fn set_initial_root_diameter(&mut self, diameter: f64) {
        self.detector.set_initial_tree_diameter(diameter);
    }

    /// Minimum leaf diameter for subsequently built collision trees
    pub fn set_minimal_leaf_diameter(&mut self, diameter: f64) {
        self.detector.set_minimal_cell_diameter(diameter);
    }

    /// Whether subsequently built collision trees may grow on demand
    pub fn set_allow_rescaling(&mut self, allow: bool) {
        self.detector.set_allow_rescaling(allow);
    }

    /// Build the collision tree for a cluster
    pub fn add_agent_cluster_to_collision_detector(
        &mut self,
        cluster_id: u64,
    ) -> Result<(), ControllerError> {
        self.detector.build_tree(&self.container, cluster_id)?;
        Ok(())
    }

    /// Insert a single agent into a cluster's existing collision tree
    pub fn add_agent_to_collision_detector(
        &mut self,
        agent_id: u64,
        cluster_id: u64,
    ) -> Result<(), ControllerError> {
        self.detector.insert_agent(&self.container, agent_id, cluster_id)?;
        Ok(())
    }

    /// Full collision query of a candidate agent against a registered
    /// cluster
    pub fn check_cluster_collision(
        &self,
        cluster_id: u64,
        ignore: &HashSet<u64>,
        candidate_id: u64,
    ) -> Result<CollisionOutcome, ControllerError> {
        Ok(self
            .detector
            .check_for_collision(&self.container, cluster_id, ignore, candidate_id)?)
    }

    /// Nearest cluster agent to the candidate, or the candidate's own id
    /// when the query finds nothing
    pub fn find_nearest_to_agent(
        &self,
        candidate_id: u64,
        cluster_id: u64,
    ) -> Result<u64, ControllerError> {
        let ignore = HashSet::from([candidate_id]);
        let outcome =
            self.detector
                .check_for_collision(&self.container, cluster_id, &ignore, candidate_id)?;
        Ok(outcome.nearest.unwrap_or(candidate_id))
    }

    /// Direct pairwise collision test between two agents, bypassing trees
    pub fn check_collision_between_agents(
        &self,
        first_id: u64,
        second_id: u64,
    ) -> Result<bool, ControllerError> {
        let first = self.container.agent(first_id)?;
        let second = self.container.agent(second_id)?;
        let first_pose = self.container.agent_global_pose(first_id)?;
        let second_pose = self.container.agent_global_pose(second_id)?;
        Ok(
            shape_pair_distance(first.shape(), &first_pose, second.shape(), &second_pose)
                .map_or(false, |result| result.collision),
        )
    }

    /// Signed distance between two agents, positive infinity for pairs
    /// without a resolver
    pub fn distance_between_agents(
        &self,
        first_id: u64,
        second_id: u64,
    ) -> Result<f64, ControllerError> {
        Ok(self.detector.body_distance(&self.container, first_id, second_id)?)
    }

    /// Human-readable description of an agent (informational only)
    pub fn agent_info(&self, id: u64) -> Result<String, ControllerError> {
        Ok(self.container.agent(id)?.to_string())
    }

    /// Human-readable description of a cluster (informational only)
    pub fn cluster_info(&self, id: u64) -> Result<String, ControllerError> {
        Ok(self.container.cluster(id)?.to_string())
    }
}

impl fmt::Display for CollisionController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.container)
    }
}
