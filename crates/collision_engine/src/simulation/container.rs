//! Owner of all simulation entities
//!
//! The container holds agents and clusters by id and materializes new
//! agents from the [`MetaSpec`] templates. All cross-entity resolution
//! (global poses, site lookups, cluster membership) goes through it.

use super::agent::Agent;
use super::cluster::AgentCluster;
use super::site::{Site, SiteRef};
use super::specs::MetaSpec;
use super::SimulationError;
use crate::foundation::math::{Pose, Vec3};
use std::collections::HashMap;
use std::fmt;

/// Registry and factory for agents and agent clusters
#[derive(Debug, Clone, Default)]
pub struct SimulationContainer {
    meta: MetaSpec,
    agents: HashMap<u64, Agent>,
    clusters: HashMap<u64, AgentCluster>,
}

impl SimulationContainer {
    /// Create a container around a meta specification
    pub fn new(meta: MetaSpec) -> Self {
        Self {
            meta,
            agents: HashMap::new(),
            clusters: HashMap::new(),
        }
    }

    /// The meta specification agents are built from
    pub fn meta(&self) -> &MetaSpec {
        &self.meta
    }

    /// Instantiate an agent of a registered type.
    ///
    /// Site positions are materialized from the type's site specifications
    /// against the type's shape.
    pub fn add_agent(&mut self, id: u64, agent_type: &str) -> Result<(), SimulationError> {
        if self.agents.contains_key(&id) {
            return Err(SimulationError::DuplicateId { entity: "agent", id });
        }
        let spec = self.meta.agent_spec(agent_type)?;
        let shape = *spec.shape();
        let mut agent = Agent::new(id, agent_type, shape);
        for site_spec in spec.site_specs() {
            let position = site_spec.resolve(&shape);
            agent.add_site(Site::new(site_spec.id(), site_spec.site_type(), position, id));
        }
        self.agents.insert(id, agent);
        Ok(())
    }

    /// Create an empty cluster
    pub fn add_agent_cluster(
        &mut self,
        id: u64,
        cluster_type: &str,
    ) -> Result<(), SimulationError> {
        if self.clusters.contains_key(&id) {
            return Err(SimulationError::DuplicateId { entity: "cluster", id });
        }
        self.clusters.insert(id, AgentCluster::new(id, cluster_type));
        Ok(())
    }

    /// Add an agent to a cluster.
    ///
    /// Repeating the call for the same cluster is a no-op; an agent that
    /// already belongs to a different cluster is rejected.
    pub fn add_agent_to_cluster(
        &mut self,
        agent_id: u64,
        cluster_id: u64,
    ) -> Result<(), SimulationError> {
        match self.agent(agent_id)?.cluster() {
            Some(current) if current == cluster_id => return Ok(()),
            Some(current) => {
                return Err(SimulationError::ClusterMismatch(format!(
                    "agent {agent_id} already belongs to cluster {current}"
                )))
            }
            None => {}
        }
        self.transfer_agent(agent_id, cluster_id)
    }

    /// Move an agent into a cluster, leaving its previous cluster if any.
    /// The agent's local pose is reinterpreted in the new frame unchanged;
    /// callers that need to preserve the global pose must re-express it.
    pub(crate) fn transfer_agent(
        &mut self,
        agent_id: u64,
        cluster_id: u64,
    ) -> Result<(), SimulationError> {
        if !self.clusters.contains_key(&cluster_id) {
            return Err(SimulationError::UnknownId {
                entity: "cluster",
                id: cluster_id,
            });
        }
        let previous = self.agent(agent_id)?.cluster();
        if let Some(previous) = previous {
            if let Some(cluster) = self.clusters.get_mut(&previous) {
                cluster.remove_agent(agent_id);
            }
        }
        if let Some(cluster) = self.clusters.get_mut(&cluster_id) {
            cluster.insert_agent(agent_id);
        }
        if let Some(agent) = self.agents.get_mut(&agent_id) {
            agent.set_cluster(cluster_id);
        }
        Ok(())
    }

    /// Drop a cluster that has no members left
    pub(crate) fn remove_empty_cluster(&mut self, cluster_id: u64) -> Result<(), SimulationError> {
        let cluster = self.cluster(cluster_id)?;
        if !cluster.is_empty() {
            return Err(SimulationError::ClusterMismatch(format!(
                "cluster {cluster_id} still has members"
            )));
        }
        self.clusters.remove(&cluster_id);
        Ok(())
    }

    /// Bond two sites to each other.
    ///
    /// Both sites must exist and be unbound; the bond is symmetric.
    pub fn connect_sites(
        &mut self,
        first: SiteRef,
        second: SiteRef,
    ) -> Result<(), SimulationError> {
        for site_ref in [first, second] {
            let agent = self.agent(site_ref.agent)?;
            let site = agent.site(site_ref.site).ok_or(SimulationError::UnknownId {
                entity: "site",
                id: site_ref.site,
            })?;
            if site.is_connected() {
                return Err(SimulationError::SiteAlreadyConnected {
                    agent: site_ref.agent,
                    site: site_ref.site,
                });
            }
        }
        self.connect_site_halves(first, second)?;
        self.connect_site_halves(second, first)
    }

    fn connect_site_halves(&mut self, from: SiteRef, to: SiteRef) -> Result<(), SimulationError> {
        let agent = self
            .agents
            .get_mut(&from.agent)
            .ok_or(SimulationError::UnknownId {
                entity: "agent",
                id: from.agent,
            })?;
        let site = agent.site_mut(from.site).ok_or(SimulationError::UnknownId {
            entity: "site",
            id: from.site,
        })?;
        site.connect(to);
        Ok(())
    }

    /// An agent by id
    pub fn agent(&self, id: u64) -> Result<&Agent, SimulationError> {
        self.agents
            .get(&id)
            .ok_or(SimulationError::UnknownId { entity: "agent", id })
    }

    /// A mutable agent by id
    pub fn agent_mut(&mut self, id: u64) -> Result<&mut Agent, SimulationError> {
        self.agents
            .get_mut(&id)
            .ok_or(SimulationError::UnknownId { entity: "agent", id })
    }

    /// A cluster by id
    pub fn cluster(&self, id: u64) -> Result<&AgentCluster, SimulationError> {
        self.clusters
            .get(&id)
            .ok_or(SimulationError::UnknownId { entity: "cluster", id })
    }

    /// A mutable cluster by id
    pub fn cluster_mut(&mut self, id: u64) -> Result<&mut AgentCluster, SimulationError> {
        self.clusters
            .get_mut(&id)
            .ok_or(SimulationError::UnknownId { entity: "cluster", id })
    }

    /// True if an agent with the id exists
    pub fn has_agent(&self, id: u64) -> bool {
        self.agents.contains_key(&id)
    }

    /// True if a cluster with the id exists
    pub fn has_cluster(&self, id: u64) -> bool {
        self.clusters.contains_key(&id)
    }

    /// All agents, in unspecified order
    pub fn agents(&self) -> impl Iterator<Item = &Agent> {
        self.agents.values()
    }

    /// All clusters, in unspecified order
    pub fn clusters(&self) -> impl Iterator<Item = &AgentCluster> {
        self.clusters.values()
    }

    /// Global pose of an agent: the local pose composed through the cluster
    /// frame when the agent is clustered, the local pose itself otherwise
    pub fn agent_global_pose(&self, id: u64) -> Result<Pose, SimulationError> {
        let agent = self.agent(id)?;
        match agent.cluster() {
            Some(cluster_id) => {
                let cluster = self.cluster(cluster_id)?;
                Ok(cluster.pose().compose(agent.pose()))
            }
            None => Ok(agent.pose().clone()),
        }
    }

    /// Global position of a site, composed through its owner's global pose
    pub fn site_global_position(
        &self,
        agent_id: u64,
        site_id: u64,
    ) -> Result<Vec3, SimulationError> {
        let agent = self.agent(agent_id)?;
        let site = agent.site(site_id).ok_or(SimulationError::UnknownId {
            entity: "site",
            id: site_id,
        })?;
        let global = self.agent_global_pose(agent_id)?;
        Ok(global.transform_point(site.position()))
    }
}

impl fmt::Display for SimulationContainer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "SimulationContainer [")?;
        let mut agent_ids: Vec<u64> = self.agents.keys().copied().collect();
        agent_ids.sort_unstable();
        for id in agent_ids {
            writeln!(f, "{}", self.agents[&id])?;
        }
        let mut cluster_ids: Vec<u64> = self.clusters.keys().copied().collect();
        cluster_ids.sort_unstable();
        for id in cluster_ids {
            writeln!(f, "{}", self.clusters[&id])?;
        }
        write!(f, "]")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::Quat;
    use crate::shapes::Shape;
    use crate::simulation::specs::{AgentSpec, CoordKind, SiteSpec};
    use approx::assert_relative_eq;
    use std::f64::consts::FRAC_PI_2;

    /// Sphere of radius 5 with hull sites on the +X and +Y axes.
    fn sphere_meta() -> MetaSpec {
        let shape = Shape::sphere(5.0).unwrap();
        let spec = AgentSpec::new(
            "SphereAgent",
            shape,
            [
                SiteSpec::new(0, "s", 1.0, FRAC_PI_2, 0.0, CoordKind::ParametricPointerToHull),
                SiteSpec::new(1, "s", 1.0, FRAC_PI_2, FRAC_PI_2, CoordKind::ParametricPointerToHull),
            ],
        )
        .unwrap();
        MetaSpec::new([spec]).unwrap()
    }

    #[test]
    fn test_duplicate_and_unknown_agents() {
        let mut container = SimulationContainer::new(sphere_meta());
        container.add_agent(0, "SphereAgent").unwrap();
        assert!(matches!(
            container.add_agent(0, "SphereAgent"),
            Err(SimulationError::DuplicateId { entity: "agent", id: 0 })
        ));
        assert!(matches!(
            container.add_agent(1, "NoSuchAgent"),
            Err(SimulationError::UnknownType(_))
        ));
        assert!(matches!(
            container.agent(99),
            Err(SimulationError::UnknownId { entity: "agent", id: 99 })
        ));
    }

    #[test]
    fn test_site_materialization() {
        let mut container = SimulationContainer::new(sphere_meta());
        container.add_agent(0, "SphereAgent").unwrap();
        let agent = container.agent(0).unwrap();
        assert_relative_eq!(
            agent.site(0).unwrap().position(),
            Vec3::new(5.0, 0.0, 0.0),
            epsilon = 1e-10
        );
        assert_relative_eq!(
            agent.site(1).unwrap().position(),
            Vec3::new(0.0, 5.0, 0.0),
            epsilon = 1e-10
        );
    }

    #[test]
    fn test_agent_translation_moves_sites_globally() {
        // Move an unclustered agent and observe its sites in the local
        // and global frames.
        let mut container = SimulationContainer::new(sphere_meta());
        container.add_agent(0, "SphereAgent").unwrap();
        container.agent_mut(0).unwrap().translate(Vec3::new(12.0, 0.0, 0.0));

        let pose = container.agent_global_pose(0).unwrap();
        assert_relative_eq!(pose.position, Vec3::new(12.0, 0.0, 0.0));
        assert_relative_eq!(
            container.site_global_position(0, 0).unwrap(),
            Vec3::new(17.0, 0.0, 0.0),
            epsilon = 1e-10
        );
        assert_relative_eq!(
            container.site_global_position(0, 1).unwrap(),
            Vec3::new(12.0, 5.0, 0.0),
            epsilon = 1e-10
        );
        // Local site positions are untouched.
        assert_relative_eq!(
            container.agent(0).unwrap().site(0).unwrap().position(),
            Vec3::new(5.0, 0.0, 0.0),
            epsilon = 1e-10
        );
    }

    #[test]
    fn test_agent_rotation_rotates_sites() {
        let mut container = SimulationContainer::new(sphere_meta());
        container.add_agent(2, "SphereAgent").unwrap();
        let agent = container.agent_mut(2).unwrap();
        agent.translate(Vec3::new(-12.0, 0.0, 0.0));
        agent.rotate(Quat::rotation_between(&Vec3::x(), &Vec3::y()).unwrap());

        assert_relative_eq!(
            container.site_global_position(2, 0).unwrap(),
            Vec3::new(-12.0, 5.0, 0.0),
            epsilon = 1e-10
        );
        assert_relative_eq!(
            container.site_global_position(2, 1).unwrap(),
            Vec3::new(-17.0, 0.0, 0.0),
            epsilon = 1e-10
        );
    }

    #[test]
    fn test_cluster_frame_composition() {
        // Property: global pose composes local pose through the cluster.
        let mut container = SimulationContainer::new(sphere_meta());
        container.add_agent(0, "SphereAgent").unwrap();
        container.add_agent_cluster(0, "default").unwrap();
        container.add_agent_to_cluster(0, 0).unwrap();

        container.cluster_mut(0).unwrap().set_position(Vec3::new(5.0, 5.0, 5.0));
        let pose = container.agent_global_pose(0).unwrap();
        assert_relative_eq!(pose.position, Vec3::new(5.0, 5.0, 5.0));
        assert_relative_eq!(
            container.site_global_position(0, 0).unwrap(),
            Vec3::new(10.0, 5.0, 5.0),
            epsilon = 1e-10
        );

        // Rotating the frame about its own origin keeps the agent center
        // but carries the site.
        let cluster = container.cluster_mut(0).unwrap();
        cluster.rotate(Quat::rotation_between(&Vec3::x(), &Vec3::z()).unwrap());
        assert_relative_eq!(
            container.agent_global_pose(0).unwrap().position,
            Vec3::new(5.0, 5.0, 5.0),
            epsilon = 1e-10
        );
        assert_relative_eq!(
            container.site_global_position(0, 0).unwrap(),
            Vec3::new(5.0, 5.0, 10.0),
            epsilon = 1e-10
        );
    }

    #[test]
    fn test_membership_rules() {
        let mut container = SimulationContainer::new(sphere_meta());
        container.add_agent(0, "SphereAgent").unwrap();
        container.add_agent_cluster(0, "default").unwrap();
        container.add_agent_cluster(1, "default").unwrap();

        container.add_agent_to_cluster(0, 0).unwrap();
        // Idempotent for the same cluster.
        container.add_agent_to_cluster(0, 0).unwrap();
        assert_eq!(container.cluster(0).unwrap().len(), 1);
        // Rejected for a different cluster.
        assert!(matches!(
            container.add_agent_to_cluster(0, 1),
            Err(SimulationError::ClusterMismatch(_))
        ));
    }

    #[test]
    fn test_connect_sites_is_symmetric_and_exclusive() {
        let mut container = SimulationContainer::new(sphere_meta());
        container.add_agent(0, "SphereAgent").unwrap();
        container.add_agent(1, "SphereAgent").unwrap();

        let first = SiteRef { agent: 0, site: 0 };
        let second = SiteRef { agent: 1, site: 1 };
        container.connect_sites(first, second).unwrap();

        assert_eq!(
            container.agent(0).unwrap().site(0).unwrap().connected_to(),
            Some(second)
        );
        assert_eq!(
            container.agent(1).unwrap().site(1).unwrap().connected_to(),
            Some(first)
        );
        assert!(matches!(
            container.connect_sites(first, SiteRef { agent: 1, site: 0 }),
            Err(SimulationError::SiteAlreadyConnected { agent: 0, site: 0 })
        ));
    }
}
