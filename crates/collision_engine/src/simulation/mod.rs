//! Simulation entities: agents, sites, clusters, and their specifications
//!
//! Entities are owned by a [`SimulationContainer`] and refer to each other
//! by id. Agents are built from type templates held in a [`specs::MetaSpec`]
//! and carry attachment sites on their shape hulls; connected assemblies of
//! agents share a cluster frame through which all global poses compose.

pub mod agent;
pub mod cluster;
pub mod container;
pub mod site;
pub mod specs;

pub use agent::Agent;
pub use cluster::AgentCluster;
pub use container::SimulationContainer;
pub use site::{Site, SiteRef};
pub use specs::{AgentSpec, CoordKind, MetaSpec, SiteSpec};

use crate::shapes::ShapeError;
use thiserror::Error;

/// Errors raised by entity construction and lookup
#[derive(Error, Debug)]
pub enum SimulationError {
    /// An id is already taken within its scope
    #[error("duplicate {entity} id {id}")]
    DuplicateId {
        /// Entity kind the id belongs to
        entity: &'static str,
        /// The clashing id
        id: u64,
    },

    /// An agent type is already registered in the meta specification
    #[error("duplicate agent type '{0}' in meta specification")]
    DuplicateType(String),

    /// No entity with the given id exists in the addressed scope
    #[error("unknown {entity} id {id}")]
    UnknownId {
        /// Entity kind that was looked up
        entity: &'static str,
        /// The missing id
        id: u64,
    },

    /// No agent specification is registered under the given type
    #[error("unknown agent type '{0}'")]
    UnknownType(String),

    /// A coordinate-kind discriminant is not recognized
    #[error("unknown coordinate kind {0}")]
    UnknownKind(u32),

    /// A site that is already bonded cannot be bonded again
    #[error("site {site} on agent {agent} is already connected")]
    SiteAlreadyConnected {
        /// Owning agent id
        agent: u64,
        /// Site id within the agent
        site: u64,
    },

    /// Entities belong to incompatible clusters for the requested operation
    #[error("cluster mismatch: {0}")]
    ClusterMismatch(String),

    /// Shape construction or conversion failure
    #[error(transparent)]
    Shape(#[from] ShapeError),
}
