//! Attachment sites on agent hulls

use crate::foundation::math::Vec3;
use std::fmt;

/// Address of a site: owning agent plus site id within that agent
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SiteRef {
    /// Owning agent id
    pub agent: u64,
    /// Site id within the agent
    pub site: u64,
}

/// A named point on an agent's hull, optionally bonded to one peer site
#[derive(Debug, Clone)]
pub struct Site {
    id: u64,
    site_type: String,
    position: Vec3,
    owner: u64,
    connected_to: Option<SiteRef>,
}

impl Site {
    pub(super) fn new(id: u64, site_type: impl Into<String>, position: Vec3, owner: u64) -> Self {
        Self {
            id,
            site_type: site_type.into(),
            position,
            owner,
            connected_to: None,
        }
    }

    /// Site id, unique within the owning agent
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Site type label
    pub fn site_type(&self) -> &str {
        &self.site_type
    }

    /// Position relative to the owning agent's center
    pub fn position(&self) -> Vec3 {
        self.position
    }

    /// Id of the owning agent
    pub fn owner(&self) -> u64 {
        self.owner
    }

    /// True if this site is bonded to a peer
    pub fn is_connected(&self) -> bool {
        self.connected_to.is_some()
    }

    /// The bonded peer, if any
    pub fn connected_to(&self) -> Option<SiteRef> {
        self.connected_to
    }

    pub(super) fn connect(&mut self, peer: SiteRef) {
        self.connected_to = Some(peer);
    }
}

impl fmt::Display for Site {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Site [type: {}, id: {}, position: ({}, {}, {}), owner: {}",
            self.site_type, self.id, self.position.x, self.position.y, self.position.z, self.owner
        )?;
        if let Some(peer) = self.connected_to {
            write!(f, ", connected to site {} of agent {}", peer.site, peer.agent)?;
        }
        write!(f, "]")
    }
}
