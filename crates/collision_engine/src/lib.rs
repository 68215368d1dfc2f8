//! # Collision Engine
//!
//! Octree-based collision detection for simulations built from rigid
//! compound bodies ("agents") that carry attachment points ("sites") and
//! assemble into connected clusters sharing a pose frame.
//!
//! ## Features
//!
//! - **Spatial Index**: per-cluster octrees with dynamic root expansion
//!   and best-first nearest-box search under an ignore set
//! - **Rigid Geometry**: sphere, cylinder, and ellipsoid primitives with
//!   parametric conversions and hull-pointer projection
//! - **Pose Composition**: local/global frames through cluster poses
//! - **Collision Resolution**: pairwise signed-distance tests driven by
//!   octree nearest-candidate lookup
//! - **Typed Errors**: construction and lookup failures surface as enums,
//!   queries stay total
//!
//! ## Quick Start
//!
//! ```rust
//! use collision_engine::prelude::*;
//!
//! fn main() -> Result<(), ControllerError> {
//!     let shape = CollisionController::create_shape(ShapeKind::Sphere, &[1.0])?;
//!     let spec = CollisionController::create_agent_spec("Probe", shape, [])?;
//!     let meta = CollisionController::create_meta_spec([spec])?;
//!
//!     let mut cc = CollisionController::new(meta);
//!     cc.create_agent(0, "Probe")?;
//!     cc.create_agent(1, "Probe")?;
//!     cc.move_agent(1, Vec3::new(1.5, 0.0, 0.0))?;
//!     assert!(cc.check_collision_between_agents(0, 1)?);
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::similar_names, clippy::too_many_arguments)]

pub mod collision;
pub mod config;
pub mod controller;
pub mod foundation;
pub mod shapes;
pub mod simulation;
pub mod spatial;

pub use controller::{CollisionController, ControllerError};

/// Common imports for engine users
pub mod prelude {
    pub use crate::{
        collision::{CollisionDetector, CollisionOutcome},
        config::{Config, ConfigError, DetectorConfig},
        controller::{CollisionController, ControllerError},
        foundation::math::{Pose, Quat, Vec3},
        shapes::{Shape, ShapeError, ShapeKind},
        simulation::{
            Agent, AgentCluster, AgentSpec, CoordKind, MetaSpec, SimulationContainer,
            SimulationError, Site, SiteRef, SiteSpec,
        },
        spatial::{Bounds, Octree},
    };
}
