//! Agent clusters: connected assemblies sharing one pose frame

use crate::foundation::math::{Pose, Quat, Vec3};
use std::collections::BTreeSet;
use std::fmt;

/// An assembly of agents with a common reference frame.
///
/// Member agents keep their poses in cluster coordinates; moving or
/// rotating the cluster carries every member rigidly.
#[derive(Debug, Clone)]
pub struct AgentCluster {
    id: u64,
    cluster_type: String,
    pose: Pose,
    agents: BTreeSet<u64>,
}

impl AgentCluster {
    pub(super) fn new(id: u64, cluster_type: impl Into<String>) -> Self {
        Self {
            id,
            cluster_type: cluster_type.into(),
            pose: Pose::identity(),
            agents: BTreeSet::new(),
        }
    }

    /// Stable cluster id
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Cluster type label
    pub fn cluster_type(&self) -> &str {
        &self.cluster_type
    }

    /// Cluster frame pose
    pub fn pose(&self) -> &Pose {
        &self.pose
    }

    /// Member agent ids in ascending order
    pub fn agent_ids(&self) -> impl Iterator<Item = u64> + '_ {
        self.agents.iter().copied()
    }

    /// True if the agent belongs to this cluster
    pub fn contains(&self, agent_id: u64) -> bool {
        self.agents.contains(&agent_id)
    }

    /// Number of member agents
    pub fn len(&self) -> usize {
        self.agents.len()
    }

    /// True if the cluster has no members
    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }

    pub(super) fn insert_agent(&mut self, agent_id: u64) {
        self.agents.insert(agent_id);
    }

    pub(super) fn remove_agent(&mut self, agent_id: u64) {
        self.agents.remove(&agent_id);
    }

    /// Translate the cluster frame
    pub fn translate(&mut self, translation: Vec3) {
        self.pose.translate(translation);
    }

    /// Compose a rotation onto the cluster frame
    pub fn rotate(&mut self, rotation: Quat) {
        self.pose.rotate(rotation);
    }

    /// Overwrite the cluster frame position
    pub fn set_position(&mut self, position: Vec3) {
        self.pose.position = position;
    }

    /// Overwrite the cluster frame orientation
    pub fn set_orientation(&mut self, orientation: Quat) {
        self.pose.orientation = orientation;
    }
}

impl fmt::Display for AgentCluster {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let p = self.pose.position;
        let q = self.pose.orientation;
        writeln!(f, "AgentCluster [type: {}, id: {}", self.cluster_type, self.id)?;
        writeln!(f, "  position: ({}, {}, {})", p.x, p.y, p.z)?;
        writeln!(f, "  orientation: (w: {}, x: {}, y: {}, z: {})", q.w, q.i, q.j, q.k)?;
        writeln!(f, "  agents: {:?}", self.agents)?;
        write!(f, "]")
    }
}
