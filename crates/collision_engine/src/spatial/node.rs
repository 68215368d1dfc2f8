//! Octree node: one cubic subspace of the spatial index
//!
//! A node knows its box, its center, its parent and up to eight children,
//! and the set of entity ids whose boxes reach into its subspace. Only
//! leaves carry ids; an id may occupy several leaves when its box spans
//! child boundaries.

use super::bounds::Bounds;
use super::octree::NodeKey;
use std::collections::BTreeSet;
use std::fmt;

/// One of the eight equally sized sectors around a node's center.
///
/// The numbering follows the classic sign-tuple order on (x, y, z):
/// `First` is (+,+,+), `Seventh` is (-,-,-). A box straddling the center
/// along any axis belongs to no single octant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Octant {
    /// (+,+,+)
    First,
    /// (-,+,+)
    Second,
    /// (-,-,+)
    Third,
    /// (+,-,+)
    Fourth,
    /// (+,+,-)
    Fifth,
    /// (-,+,-)
    Sixth,
    /// (-,-,-)
    Seventh,
    /// (+,-,-)
    Eighth,
}

impl Octant {
    /// All octants in numbering order
    pub const ALL: [Octant; 8] = [
        Octant::First,
        Octant::Second,
        Octant::Third,
        Octant::Fourth,
        Octant::Fifth,
        Octant::Sixth,
        Octant::Seventh,
        Octant::Eighth,
    ];

    /// Child-slot index of this octant
    pub fn index(self) -> usize {
        self as usize
    }

    /// Sign tuple (positive x, positive y, positive z) of this octant
    fn signs(self) -> (bool, bool, bool) {
        match self {
            Octant::First => (true, true, true),
            Octant::Second => (false, true, true),
            Octant::Third => (false, false, true),
            Octant::Fourth => (true, false, true),
            Octant::Fifth => (true, true, false),
            Octant::Sixth => (false, true, false),
            Octant::Seventh => (false, false, false),
            Octant::Eighth => (true, false, false),
        }
    }

    fn from_signs(px: bool, py: bool, pz: bool) -> Octant {
        match (px, py, pz) {
            (true, true, true) => Octant::First,
            (false, true, true) => Octant::Second,
            (false, false, true) => Octant::Third,
            (true, false, true) => Octant::Fourth,
            (true, true, false) => Octant::Fifth,
            (false, true, false) => Octant::Sixth,
            (false, false, false) => Octant::Seventh,
            (true, false, false) => Octant::Eighth,
        }
    }

    /// The octant mirrored through the center on all three axes.
    ///
    /// Used while growing the tree: the old child in octant `o` of the root
    /// becomes the `o.opposite()` grandchild of the new intermediary child
    /// covering `o`, which keeps its absolute position unchanged.
    pub fn opposite(self) -> Octant {
        let (px, py, pz) = self.signs();
        Octant::from_signs(!px, !py, !pz)
    }
}

/// A node of the octree, owned by the tree's arena
#[derive(Debug, Clone)]
pub struct OctreeNode {
    lower: Bounds,
    upper: Bounds,
    center: Bounds,
    parent: Option<NodeKey>,
    children: [Option<NodeKey>; 8],
    ids: BTreeSet<u64>,
}

impl OctreeNode {
    /// Create a node covering the given box
    pub(super) fn new(lower: Bounds, upper: Bounds) -> Self {
        let mut node = Self {
            lower,
            upper,
            center: Bounds::splat(0.0),
            parent: None,
            children: [None; 8],
            ids: BTreeSet::new(),
        };
        node.set_bounds(lower, upper);
        node
    }

    /// Reassign the node's box, recomputing its center
    pub(super) fn set_bounds(&mut self, lower: Bounds, upper: Bounds) {
        self.lower = lower;
        self.upper = upper;
        self.center = Bounds::new(
            lower.x + (upper.x - lower.x) / 2.0,
            lower.y + (upper.y - lower.y) / 2.0,
            lower.z + (upper.z - lower.z) / 2.0,
        );
    }

    pub(super) fn set_parent(&mut self, parent: NodeKey) {
        self.parent = Some(parent);
    }

    pub(super) fn set_child(&mut self, octant: Octant, child: NodeKey) {
        self.children[octant.index()] = Some(child);
    }

    /// Record an entity id in this node
    pub(super) fn add_id(&mut self, id: u64) {
        self.ids.insert(id);
    }

    /// Lower corner of the node's box
    pub fn lower(&self) -> Bounds {
        self.lower
    }

    /// Upper corner of the node's box
    pub fn upper(&self) -> Bounds {
        self.upper
    }

    /// Center of the node's box
    pub fn center(&self) -> Bounds {
        self.center
    }

    /// Box extents along each axis
    pub fn diameter(&self) -> Bounds {
        Bounds::new(
            (self.upper.x - self.lower.x).abs(),
            (self.upper.y - self.lower.y).abs(),
            (self.upper.z - self.lower.z).abs(),
        )
    }

    /// Entity ids stored in this node, in ascending order
    pub fn ids(&self) -> &BTreeSet<u64> {
        &self.ids
    }

    /// True if this node has no parent
    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    /// True if this node has no children
    pub fn is_leaf(&self) -> bool {
        self.children.iter().all(Option::is_none)
    }

    /// True if this node stores no ids
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Parent node key, `None` for the root
    pub fn parent(&self) -> Option<NodeKey> {
        self.parent
    }

    /// Child node covering the given octant, if it exists
    pub fn child(&self, octant: Octant) -> Option<NodeKey> {
        self.children[octant.index()]
    }

    /// All present children
    pub fn children(&self) -> impl Iterator<Item = NodeKey> + '_ {
        self.children.iter().flatten().copied()
    }

    /// True if the box fits entirely inside this node's box
    pub fn contains_box(&self, lower: &Bounds, upper: &Bounds) -> bool {
        lower.x >= self.lower.x
            && lower.y >= self.lower.y
            && lower.z >= self.lower.z
            && upper.x <= self.upper.x
            && upper.y <= self.upper.y
            && upper.z <= self.upper.z
    }

    /// True if the point lies inside this node's box (boundaries included)
    pub fn contains_point(&self, x: f64, y: f64, z: f64) -> bool {
        self.lower.x <= x
            && x <= self.upper.x
            && self.lower.y <= y
            && y <= self.upper.y
            && self.lower.z <= z
            && z <= self.upper.z
    }

    /// Octant of a point relative to this node's center. Total: boundary
    /// points count toward the positive side.
    pub fn octant_of_point(&self, x: f64, y: f64, z: f64) -> Octant {
        Octant::from_signs(x >= self.center.x, y >= self.center.y, z >= self.center.z)
    }

    /// Octant fully containing the box, or `None` if the box straddles the
    /// center along any axis
    pub fn octant_of_box(&self, lower: &Bounds, upper: &Bounds) -> Option<Octant> {
        let side = |low: f64, high: f64, center: f64| {
            if low >= center {
                Some(true)
            } else if high < center {
                Some(false)
            } else {
                None
            }
        };
        Some(Octant::from_signs(
            side(lower.x, upper.x, self.center.x)?,
            side(lower.y, upper.y, self.center.y)?,
            side(lower.z, upper.z, self.center.z)?,
        ))
    }

    /// Octants reached by the eight corners of the box
    pub fn involved_octants(&self, lower: &Bounds, upper: &Bounds) -> BTreeSet<Octant> {
        let xs = [lower.x, upper.x];
        let ys = [lower.y, upper.y];
        let zs = [lower.z, upper.z];
        let mut octants = BTreeSet::new();
        for &x in &xs {
            for &y in &ys {
                for &z in &zs {
                    octants.insert(self.octant_of_point(x, y, z));
                }
            }
        }
        octants
    }

    /// Exact box of the child covering the given octant
    pub fn child_bounds(&self, octant: Octant) -> (Bounds, Bounds) {
        let (px, py, pz) = octant.signs();
        let pick = |positive: bool, low: f64, center: f64, high: f64| {
            if positive {
                (center, high)
            } else {
                (low, center)
            }
        };
        let (lx, ux) = pick(px, self.lower.x, self.center.x, self.upper.x);
        let (ly, uy) = pick(py, self.lower.y, self.center.y, self.upper.y);
        let (lz, uz) = pick(pz, self.lower.z, self.center.z, self.upper.z);
        (Bounds::new(lx, ly, lz), Bounds::new(ux, uy, uz))
    }

    /// Clip a box against a child octant, yielding the part of the box that
    /// falls inside that octant
    pub fn clip_to_octant(
        &self,
        octant: Octant,
        lower: &Bounds,
        upper: &Bounds,
    ) -> (Bounds, Bounds) {
        let (child_lower, child_upper) = self.child_bounds(octant);
        (lower.max(&child_lower), upper.min(&child_upper))
    }

    /// Euclidean distance from a point to this node's box, zero inside
    pub fn min_distance(&self, x: f64, y: f64, z: f64) -> f64 {
        let axis = |low: f64, high: f64, v: f64| {
            if v < low {
                low - v
            } else if v > high {
                v - high
            } else {
                0.0
            }
        };
        let dx = axis(self.lower.x, self.upper.x, x);
        let dy = axis(self.lower.y, self.upper.y, y);
        let dz = axis(self.lower.z, self.upper.z, z);
        dx.hypot(dy).hypot(dz)
    }
}

impl fmt::Display for OctreeNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Node [{}, {}, {}]",
            if self.is_root() { "root" } else { "inner" },
            if self.is_leaf() { "leaf" } else { "branch" },
            if self.is_empty() { "empty" } else { "occupied" },
        )?;
        writeln!(f, "  lower: {}, upper: {}", self.lower, self.upper)?;
        writeln!(f, "  center: {}, diameter: {}", self.center, self.diameter())?;
        write!(f, "  ids: {:?}", self.ids)
    }
}
