//! Rigid agents: shaped bodies with poses and attachment sites

use super::site::Site;
use crate::foundation::math::{Pose, Quat, Vec3};
use crate::shapes::Shape;
use std::collections::BTreeMap;
use std::fmt;

/// A rigid compound body with a shape, a local pose, and named sites.
///
/// The pose is local: when the agent belongs to a cluster it is expressed
/// in the cluster frame, otherwise it coincides with the global pose.
#[derive(Debug, Clone)]
pub struct Agent {
    id: u64,
    agent_type: String,
    shape: Shape,
    pose: Pose,
    cluster: Option<u64>,
    sites: BTreeMap<u64, Site>,
}

impl Agent {
    pub(super) fn new(id: u64, agent_type: impl Into<String>, shape: Shape) -> Self {
        Self {
            id,
            agent_type: agent_type.into(),
            shape,
            pose: Pose::identity(),
            cluster: None,
            sites: BTreeMap::new(),
        }
    }

    pub(super) fn add_site(&mut self, site: Site) {
        self.sites.insert(site.id(), site);
    }

    /// Stable agent id
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Agent type name
    pub fn agent_type(&self) -> &str {
        &self.agent_type
    }

    /// The agent's shape (immutable after construction)
    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    /// Local pose of the agent
    pub fn pose(&self) -> &Pose {
        &self.pose
    }

    /// Id of the cluster the agent belongs to, if any
    pub fn cluster(&self) -> Option<u64> {
        self.cluster
    }

    pub(super) fn set_cluster(&mut self, cluster: u64) {
        self.cluster = Some(cluster);
    }

    /// A site by id
    pub fn site(&self, id: u64) -> Option<&Site> {
        self.sites.get(&id)
    }

    pub(super) fn site_mut(&mut self, id: u64) -> Option<&mut Site> {
        self.sites.get_mut(&id)
    }

    /// All sites in ascending id order
    pub fn sites(&self) -> impl Iterator<Item = &Site> {
        self.sites.values()
    }

    /// Translate the agent within its frame
    pub fn translate(&mut self, translation: Vec3) {
        self.pose.translate(translation);
    }

    /// Compose a rotation onto the agent's orientation
    pub fn rotate(&mut self, rotation: Quat) {
        self.pose.rotate(rotation);
    }

    /// Overwrite the agent's position within its frame
    pub fn set_position(&mut self, position: Vec3) {
        self.pose.position = position;
    }

    /// Overwrite the agent's orientation within its frame
    pub fn set_orientation(&mut self, orientation: Quat) {
        self.pose.orientation = orientation;
    }
}

impl fmt::Display for Agent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let p = self.pose.position;
        let q = self.pose.orientation;
        writeln!(f, "Agent [type: {}, id: {}", self.agent_type, self.id)?;
        writeln!(f, "  position: ({}, {}, {})", p.x, p.y, p.z)?;
        writeln!(f, "  orientation: (w: {}, x: {}, y: {}, z: {})", q.w, q.i, q.j, q.k)?;
        writeln!(f, "  shape: {}", self.shape)?;
        match self.cluster {
            Some(cluster) => writeln!(f, "  cluster: {cluster}")?,
            None => writeln!(f, "  cluster: none")?,
        }
        for site in self.sites.values() {
            writeln!(f, "  {site}")?;
        }
        write!(f, "]")
    }
}
