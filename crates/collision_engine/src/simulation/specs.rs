//! Type templates for agent construction
//!
//! A [`MetaSpec`] registers one [`AgentSpec`] per agent type; each agent
//! spec pairs a shape with the [`SiteSpec`]s of its attachment points.
//! Site coordinates can be given in four interpretations, resolved against
//! the shape when an agent is instantiated.

use super::SimulationError;
use crate::foundation::math::Vec3;
use crate::shapes::Shape;
use std::collections::{BTreeMap, HashMap};

/// Interpretation of a site specification's coordinate triple
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoordKind {
    /// Cartesian coordinates, used as-is
    CartesianAbsolute = 0,
    /// Cartesian direction pointer, projected onto the shape hull
    CartesianPointerToHull = 1,
    /// Parametric coordinates, converted to cartesian
    ParametricAbsolute = 2,
    /// Parametric direction pointer, projected onto the shape hull
    ParametricPointerToHull = 3,
}

impl TryFrom<u32> for CoordKind {
    type Error = SimulationError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::CartesianAbsolute),
            1 => Ok(Self::CartesianPointerToHull),
            2 => Ok(Self::ParametricAbsolute),
            3 => Ok(Self::ParametricPointerToHull),
            other => Err(SimulationError::UnknownKind(other)),
        }
    }
}

/// Specification of one attachment site on an agent type
#[derive(Debug, Clone)]
pub struct SiteSpec {
    id: u64,
    site_type: String,
    coord: Vec3,
    kind: CoordKind,
}

impl SiteSpec {
    /// Create a site specification
    pub fn new(id: u64, site_type: impl Into<String>, a: f64, b: f64, c: f64, kind: CoordKind) -> Self {
        Self {
            id,
            site_type: site_type.into(),
            coord: Vec3::new(a, b, c),
            kind,
        }
    }

    /// Site id, unique within its agent type
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Site type label
    pub fn site_type(&self) -> &str {
        &self.site_type
    }

    /// Raw coordinate triple
    pub fn coord(&self) -> Vec3 {
        self.coord
    }

    /// Coordinate interpretation
    pub fn kind(&self) -> CoordKind {
        self.kind
    }

    /// Resolve the specification against a shape, yielding the site's local
    /// cartesian position on the owning agent
    pub fn resolve(&self, shape: &Shape) -> Vec3 {
        match self.kind {
            CoordKind::CartesianAbsolute => self.coord,
            CoordKind::CartesianPointerToHull => shape.hull_from_cart(self.coord),
            CoordKind::ParametricAbsolute => shape.param_to_cart(self.coord),
            CoordKind::ParametricPointerToHull => shape.hull_from_param(self.coord),
        }
    }
}

/// Template for one agent type: a shape plus its site specifications
#[derive(Debug, Clone)]
pub struct AgentSpec {
    agent_type: String,
    shape: Shape,
    site_specs: BTreeMap<u64, SiteSpec>,
}

impl AgentSpec {
    /// Create an agent specification; duplicate site ids are rejected
    pub fn new(
        agent_type: impl Into<String>,
        shape: Shape,
        site_specs: impl IntoIterator<Item = SiteSpec>,
    ) -> Result<Self, SimulationError> {
        let mut sites = BTreeMap::new();
        for spec in site_specs {
            let id = spec.id();
            if sites.insert(id, spec).is_some() {
                return Err(SimulationError::DuplicateId { entity: "site", id });
            }
        }
        Ok(Self {
            agent_type: agent_type.into(),
            shape,
            site_specs: sites,
        })
    }

    /// Agent type name
    pub fn agent_type(&self) -> &str {
        &self.agent_type
    }

    /// The type's shape
    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    /// Site specifications in ascending id order
    pub fn site_specs(&self) -> impl Iterator<Item = &SiteSpec> {
        self.site_specs.values()
    }
}

/// Registry of agent type templates
#[derive(Debug, Clone, Default)]
pub struct MetaSpec {
    agent_specs: HashMap<String, AgentSpec>,
}

impl MetaSpec {
    /// Build a registry; duplicate agent types are rejected
    pub fn new(agent_specs: impl IntoIterator<Item = AgentSpec>) -> Result<Self, SimulationError> {
        let mut specs = HashMap::new();
        for spec in agent_specs {
            let key = spec.agent_type().to_owned();
            if specs.insert(key.clone(), spec).is_some() {
                return Err(SimulationError::DuplicateType(key));
            }
        }
        Ok(Self { agent_specs: specs })
    }

    /// Look up the template for an agent type
    pub fn agent_spec(&self, agent_type: &str) -> Result<&AgentSpec, SimulationError> {
        self.agent_specs
            .get(agent_type)
            .ok_or_else(|| SimulationError::UnknownType(agent_type.to_owned()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f64::consts::FRAC_PI_2;

    #[test]
    fn test_duplicate_site_id_rejected() {
        let shape = Shape::sphere(1.0).unwrap();
        let result = AgentSpec::new(
            "A",
            shape,
            [
                SiteSpec::new(0, "s", 1.0, 0.0, 0.0, CoordKind::CartesianAbsolute),
                SiteSpec::new(0, "s", 0.0, 1.0, 0.0, CoordKind::CartesianAbsolute),
            ],
        );
        assert!(matches!(
            result,
            Err(SimulationError::DuplicateId { entity: "site", id: 0 })
        ));
    }

    #[test]
    fn test_duplicate_agent_type_rejected() {
        let shape = Shape::sphere(1.0).unwrap();
        let a = AgentSpec::new("A", shape, []).unwrap();
        let b = AgentSpec::new("A", shape, []).unwrap();
        assert!(matches!(
            MetaSpec::new([a, b]),
            Err(SimulationError::DuplicateType(_))
        ));
    }

    #[test]
    fn test_unknown_coord_kind() {
        assert!(matches!(
            CoordKind::try_from(4),
            Err(SimulationError::UnknownKind(4))
        ));
        assert_eq!(CoordKind::try_from(1).unwrap(), CoordKind::CartesianPointerToHull);
    }

    #[test]
    fn test_resolution_per_coord_kind() {
        let sphere = Shape::sphere(5.0).unwrap();

        let absolute = SiteSpec::new(0, "s", 1.0, 2.0, 3.0, CoordKind::CartesianAbsolute);
        assert_relative_eq!(absolute.resolve(&sphere), Vec3::new(1.0, 2.0, 3.0));

        let cart_hull = SiteSpec::new(1, "s", 1.0, 0.0, 0.0, CoordKind::CartesianPointerToHull);
        assert_relative_eq!(
            cart_hull.resolve(&sphere),
            Vec3::new(5.0, 0.0, 0.0),
            epsilon = 1e-10
        );

        let param_abs = SiteSpec::new(2, "s", 5.0, FRAC_PI_2, 0.0, CoordKind::ParametricAbsolute);
        assert_relative_eq!(
            param_abs.resolve(&sphere),
            Vec3::new(5.0, 0.0, 0.0),
            epsilon = 1e-10
        );

        let param_hull =
            SiteSpec::new(3, "s", 1.0, FRAC_PI_2, FRAC_PI_2, CoordKind::ParametricPointerToHull);
        assert_relative_eq!(
            param_hull.resolve(&sphere),
            Vec3::new(0.0, 5.0, 0.0),
            epsilon = 1e-10
        );
    }
}
