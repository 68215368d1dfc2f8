//! Shape primitives for rigid agents
//!
//! Shapes are stored in MODEL SPACE, centered on the owning agent, and are
//! transformed through the agent's pose on demand during collision tests.
//!
//! Every shape supports the same five geometric operations:
//!
//! - [`Shape::bounding_box`] - model-space axis-aligned extents
//! - [`Shape::cart_to_param`] / [`Shape::param_to_cart`] - conversions
//!   between cartesian and the shape's natural parametric coordinates
//! - [`Shape::hull_from_cart`] / [`Shape::hull_from_param`] - projection of
//!   a direction pointer onto the shape's hull
//!
//! Parametric conventions: spherical `(rho, theta, phi)`, cylindrical
//! `(rho, phi, z)`, ellipsoidal `(1, theta, phi)`.

use crate::foundation::math::Vec3;
use std::fmt;
use thiserror::Error;

/// Shape discriminants as exposed to hosts (stable integer values)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShapeKind {
    /// Sphere, one dimension (radius)
    Sphere = 0,
    /// Cylinder, two dimensions (radius, length), axis along local Z
    Cylinder = 1,
    /// Ellipsoid, three dimensions (rx, ry, rz)
    Ellipsoid = 2,
}

impl TryFrom<u32> for ShapeKind {
    type Error = ShapeError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Sphere),
            1 => Ok(Self::Cylinder),
            2 => Ok(Self::Ellipsoid),
            other => Err(ShapeError::UnknownKind(format!("shape kind {other}"))),
        }
    }
}

/// Model-space axis-aligned extents of a shape, centered on the origin
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    /// Extent along X
    pub width: f64,
    /// Extent along Y
    pub height: f64,
    /// Extent along Z
    pub length: f64,
}

impl BoundingBox {
    /// Create a bounding box from its three extents
    pub fn new(width: f64, height: f64, length: f64) -> Self {
        Self {
            width,
            height,
            length,
        }
    }

    /// Largest of the three extents
    pub fn max_dimension(&self) -> f64 {
        self.width.max(self.height).max(self.length)
    }
}

impl fmt::Display for BoundingBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "BBox [width: {}, height: {}, length: {}]",
            self.width, self.height, self.length
        )
    }
}

/// Shape-level errors
#[derive(Error, Debug)]
pub enum ShapeError {
    /// A shape was constructed with a non-positive dimension
    #[error("invalid shape: {name} must be positive, got {value}")]
    InvalidShape {
        /// Name of the offending dimension
        name: &'static str,
        /// Rejected value
        value: f64,
    },

    /// A conversion required dividing by a zero-length component
    #[error("math domain error: {0}")]
    MathDomain(&'static str),

    /// Unknown shape discriminant or unsupported dimension count
    #[error("unknown or unsupported shape kind: {0}")]
    UnknownKind(String),
}

/// Collision shape of an agent (model space)
///
/// A tagged sum rather than a trait object: the collision resolver
/// dispatches on the pair of tags, and shapes are small enough to copy.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Shape {
    /// Sphere of the given radius
    Sphere {
        /// Sphere radius
        radius: f64,
    },
    /// Cylinder with its axis along local Z, centered on the origin
    Cylinder {
        /// Cylinder radius
        radius: f64,
        /// Full axial length
        length: f64,
    },
    /// Axis-aligned ellipsoid with the given semi-axes
    Ellipsoid {
        /// Semi-axis along X
        rx: f64,
        /// Semi-axis along Y
        ry: f64,
        /// Semi-axis along Z
        rz: f64,
    },
}

fn positive(name: &'static str, value: f64) -> Result<f64, ShapeError> {
    if value > 0.0 {
        Ok(value)
    } else {
        Err(ShapeError::InvalidShape { name, value })
    }
}

impl Shape {
    /// Create a sphere, rejecting non-positive radii
    pub fn sphere(radius: f64) -> Result<Self, ShapeError> {
        Ok(Self::Sphere {
            radius: positive("radius", radius)?,
        })
    }

    /// Create a cylinder, rejecting non-positive dimensions
    pub fn cylinder(radius: f64, length: f64) -> Result<Self, ShapeError> {
        Ok(Self::Cylinder {
            radius: positive("radius", radius)?,
            length: positive("length", length)?,
        })
    }

    /// Create an ellipsoid, rejecting non-positive semi-axes
    pub fn ellipsoid(rx: f64, ry: f64, rz: f64) -> Result<Self, ShapeError> {
        Ok(Self::Ellipsoid {
            rx: positive("rx", rx)?,
            ry: positive("ry", ry)?,
            rz: positive("rz", rz)?,
        })
    }

    /// Create a shape from a discriminant and 1-3 dimension arguments
    pub fn from_kind(kind: ShapeKind, dims: &[f64]) -> Result<Self, ShapeError> {
        match (kind, dims) {
            (ShapeKind::Sphere, [radius]) => Self::sphere(*radius),
            (ShapeKind::Cylinder, [radius, length]) => Self::cylinder(*radius, *length),
            (ShapeKind::Ellipsoid, [rx, ry, rz]) => Self::ellipsoid(*rx, *ry, *rz),
            (kind, dims) => Err(ShapeError::UnknownKind(format!(
                "{kind:?} with {} dimension argument(s)",
                dims.len()
            ))),
        }
    }

    /// Discriminant of this shape
    pub fn kind(&self) -> ShapeKind {
        match self {
            Self::Sphere { .. } => ShapeKind::Sphere,
            Self::Cylinder { .. } => ShapeKind::Cylinder,
            Self::Ellipsoid { .. } => ShapeKind::Ellipsoid,
        }
    }

    /// Model-space bounding box, centered on the origin
    pub fn bounding_box(&self) -> BoundingBox {
        match *self {
            Self::Sphere { radius } => {
                BoundingBox::new(radius * 2.0, radius * 2.0, radius * 2.0)
            }
            Self::Cylinder { radius, length } => {
                BoundingBox::new(radius * 2.0, radius * 2.0, length)
            }
            Self::Ellipsoid { rx, ry, rz } => BoundingBox::new(rx * 2.0, ry * 2.0, rz * 2.0),
        }
    }

    /// Convert cartesian model coordinates into the shape's parametric form.
    ///
    /// Fails with [`ShapeError::MathDomain`] when the radial component that
    /// appears in a divisor is zero.
    pub fn cart_to_param(&self, cart: Vec3) -> Result<Vec3, ShapeError> {
        match *self {
            Self::Sphere { .. } => {
                let rho = cart.norm();
                if rho == 0.0 {
                    return Err(ShapeError::MathDomain(
                        "cannot convert the zero vector to spherical coordinates",
                    ));
                }
                let theta = (cart.z / rho).acos();
                let phi = cart.y.atan2(cart.x);
                Ok(Vec3::new(rho, theta, phi))
            }
            Self::Cylinder { .. } => {
                let rho = cart.x.hypot(cart.y);
                if rho == 0.0 {
                    return Err(ShapeError::MathDomain(
                        "cannot convert an axial vector to cylindrical coordinates",
                    ));
                }
                let phi = cart.y.atan2(cart.x);
                Ok(Vec3::new(rho, phi, cart.z))
            }
            Self::Ellipsoid { .. } => {
                let norm = cart.norm();
                if norm == 0.0 {
                    return Err(ShapeError::MathDomain(
                        "cannot convert the zero vector to ellipsoidal coordinates",
                    ));
                }
                let theta = (cart.z / norm).clamp(-1.0, 1.0).acos();
                let phi = cart.y.atan2(cart.x);
                Ok(Vec3::new(1.0, theta, phi))
            }
        }
    }

    /// Convert parametric coordinates back to cartesian model coordinates
    pub fn param_to_cart(&self, param: Vec3) -> Vec3 {
        match *self {
            Self::Sphere { .. } => {
                let (rho, theta, phi) = (param.x, param.y, param.z);
                Vec3::new(
                    rho * theta.sin() * phi.cos(),
                    rho * theta.sin() * phi.sin(),
                    rho * theta.cos(),
                )
            }
            Self::Cylinder { .. } => {
                let (rho, phi, z) = (param.x, param.y, param.z);
                Vec3::new(rho * phi.cos(), rho * phi.sin(), z)
            }
            Self::Ellipsoid { rx, ry, rz } => {
                let (theta, phi) = (param.y, param.z);
                Vec3::new(
                    rx * theta.sin() * phi.cos(),
                    ry * theta.sin() * phi.sin(),
                    rz * theta.cos(),
                )
            }
        }
    }

    /// Project a cartesian direction pointer onto the shape's hull.
    ///
    /// The projection preserves the pointer's direction where that is
    /// defined; a zero pointer yields an arbitrary but finite hull point.
    pub fn hull_from_cart(&self, pointer: Vec3) -> Vec3 {
        match *self {
            Self::Sphere { radius } => {
                let param = self
                    .cart_to_param(pointer)
                    .unwrap_or_else(|_| Vec3::new(1.0, 0.0, 0.0));
                self.param_to_cart(Vec3::new(radius, param.y, param.z))
            }
            Self::Cylinder { radius, length } => {
                if pointer.x == 0.0 && pointer.y == 0.0 {
                    // Pure axial pointer, including the zero pointer.
                    let half = if pointer.z >= 0.0 { 0.5 } else { -0.5 };
                    return Vec3::new(0.0, 0.0, length * half);
                }
                let unit = pointer.normalize();
                let (rho, phi) = (unit.x.hypot(unit.y), unit.y.atan2(unit.x));
                if unit.z == 0.0 {
                    // Pure radial pointer hits the barrel at z = 0.
                    return self.param_to_cart(Vec3::new(radius, phi, 0.0));
                }
                let slope = unit.z / rho;
                let z_at_barrel = radius * slope;
                if z_at_barrel.abs() > length / 2.0 {
                    // The ray leaves through a cap before reaching the barrel.
                    let cap_z = length * if z_at_barrel >= 0.0 { 0.5 } else { -0.5 };
                    self.param_to_cart(Vec3::new((cap_z / slope).abs(), phi, cap_z))
                } else {
                    self.param_to_cart(Vec3::new(radius, phi, z_at_barrel))
                }
            }
            Self::Ellipsoid { rx, .. } => {
                let param = match self.cart_to_param(pointer) {
                    Ok(param) => param,
                    // Zero pointer: the +X hull point is as good as any.
                    Err(_) => return Vec3::new(rx, 0.0, 0.0),
                };
                self.param_to_cart(param)
            }
        }
    }

    /// Project a parametric direction pointer onto the shape's hull
    pub fn hull_from_param(&self, pointer: Vec3) -> Vec3 {
        match *self {
            Self::Sphere { radius } => self.param_to_cart(Vec3::new(radius, pointer.y, pointer.z)),
            // The cylinder hull depends on the pointer direction as a whole,
            // so route through cartesian space.
            Self::Cylinder { .. } => self.hull_from_cart(self.param_to_cart(pointer)),
            Self::Ellipsoid { .. } => self.param_to_cart(pointer),
        }
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::Sphere { radius } => {
                write!(f, "Sphere [radius: {radius}, {}]", self.bounding_box())
            }
            Self::Cylinder { radius, length } => write!(
                f,
                "Cylinder [radius: {radius}, length: {length}, {}]",
                self.bounding_box()
            ),
            Self::Ellipsoid { rx, ry, rz } => write!(
                f,
                "Ellipsoid [rx: {rx}, ry: {ry}, rz: {rz}, {}]",
                self.bounding_box()
            ),
        }
    }
}
