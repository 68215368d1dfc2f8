//! Octree over axis-aligned boxes keyed by entity ids
//!
//! The tree subdivides a cubic region of space into eight child regions per
//! node, down to a configurable minimum cell diameter. Nodes live in a
//! single-owner arena ([`slotmap::SlotMap`]); parents and children refer to
//! each other by key, which breaks ownership cycles without reference
//! counting and keeps the nodes contiguous.
//!
//! The main query is a best-first nearest-box search used by the collision
//! detector to find candidate neighbors of a posed body.

use super::bounds::Bounds;
use super::node::{Octant, OctreeNode};
use std::cmp::{Ordering, Reverse};
use std::collections::{BinaryHeap, HashSet};

slotmap::new_key_type! {
    /// Arena key of an octree node
    pub struct NodeKey;
}

/// Maximum number of doubling steps a tree may undergo for one insertion
pub const MAX_RESIZE_STEPS: u32 = 10;

/// Spatial index over axis-aligned boxes keyed by `u64` ids
#[derive(Debug, Clone)]
pub struct Octree {
    nodes: slotmap::SlotMap<NodeKey, OctreeNode>,
    root: NodeKey,
    min_diameter: Bounds,
    allow_resize: bool,
}

/// Best-first queue entry ordered by distance to the query point
struct QueueEntry {
    distance: f64,
    key: NodeKey,
}

impl PartialEq for QueueEntry {
    fn eq(&self, other: &Self) -> bool {
        self.distance.total_cmp(&other.distance) == Ordering::Equal
    }
}

impl Eq for QueueEntry {}

impl PartialOrd for QueueEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for QueueEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        self.distance.total_cmp(&other.distance)
    }
}

impl Octree {
    /// Create a tree with explicit root corners and a minimum leaf diameter
    pub fn with_bounds(lower: Bounds, upper: Bounds, min_diameter: Bounds) -> Self {
        let mut nodes = slotmap::SlotMap::with_key();
        let root = nodes.insert(OctreeNode::new(lower, upper));
        Self {
            nodes,
            root,
            min_diameter,
            allow_resize: false,
        }
    }

    /// Create a tree centered on the origin with per-axis root diameters
    pub fn with_diameter(diameter: Bounds, min_diameter: Bounds) -> Self {
        Self::with_bounds(diameter.scaled(-0.5), diameter.scaled(0.5), min_diameter)
    }

    /// Create a symmetric tree centered on the origin
    pub fn new(tree_diameter: f64, min_cell_diameter: f64) -> Self {
        Self::with_diameter(
            Bounds::splat(tree_diameter),
            Bounds::splat(min_cell_diameter),
        )
    }

    /// Allow the tree to expand when a box outside the root is inserted
    pub fn set_allow_resize(&mut self, allow: bool) {
        self.allow_resize = allow;
    }

    /// Key of the root node
    pub fn root(&self) -> NodeKey {
        self.root
    }

    /// Node behind a key, if the key is valid for this tree
    pub fn node(&self, key: NodeKey) -> Option<&OctreeNode> {
        self.nodes.get(key)
    }

    /// All nodes of the tree, in arena order
    pub fn nodes(&self) -> impl Iterator<Item = (NodeKey, &OctreeNode)> {
        self.nodes.iter()
    }

    /// Number of nodes in the tree
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// True if the tree consists of the bare root
    pub fn is_empty(&self) -> bool {
        self.nodes.len() == 1 && self.nodes[self.root].is_empty()
    }

    /// Insert a box under an entity id.
    ///
    /// The id ends up in every leaf whose cell the box reaches; leaves are
    /// cells whose diameter has shrunk to the minimum along any axis. With
    /// resizing enabled, a box outside the root doubles the root about the
    /// origin (at most [`MAX_RESIZE_STEPS`] times) before insertion.
    pub fn insert(&mut self, id: u64, lower: Bounds, upper: Bounds) {
        if self.allow_resize && !self.nodes[self.root].contains_box(&lower, &upper) {
            self.resize_to_fit(&lower, &upper);
        }
        log::debug!("inserting id {id} with box {lower} .. {upper}");
        self.insert_into(self.root, id, lower, upper);
    }

    fn insert_into(&mut self, key: NodeKey, id: u64, lower: Bounds, upper: Bounds) {
        if self.nodes[key].diameter().any_le(&self.min_diameter) {
            // Resolution limit reached: this node is a leaf cell.
            self.nodes[key].add_id(id);
            return;
        }
        for octant in self.nodes[key].involved_octants(&lower, &upper) {
            if self.nodes[key].child(octant).is_none() {
                let (child_lower, child_upper) = self.nodes[key].child_bounds(octant);
                self.add_child(key, octant, child_lower, child_upper);
            }
            let (clipped_lower, clipped_upper) =
                self.nodes[key].clip_to_octant(octant, &lower, &upper);
            if let Some(child) = self.nodes[key].child(octant) {
                self.insert_into(child, id, clipped_lower, clipped_upper);
            }
        }
    }

    fn add_child(&mut self, parent: NodeKey, octant: Octant, lower: Bounds, upper: Bounds) -> NodeKey {
        let mut child = OctreeNode::new(lower, upper);
        child.set_parent(parent);
        let key = self.nodes.insert(child);
        self.nodes[parent].set_child(octant, key);
        key
    }

    /// Double the root bounds about the origin until the box fits,
    /// re-parenting existing children so every leaf keeps its absolute
    /// position: the old octant-`o` child becomes the `o.opposite()`
    /// grandchild of the new intermediary child covering octant `o`.
    fn resize_to_fit(&mut self, lower: &Bounds, upper: &Bounds) {
        let mut steps = 0;
        while !self.nodes[self.root].contains_box(lower, upper) {
            if steps == MAX_RESIZE_STEPS {
                log::warn!(
                    "octree resize cap of {MAX_RESIZE_STEPS} steps reached, \
                     box {lower} .. {upper} still outside the root"
                );
                return;
            }
            steps += 1;

            let old_children: Vec<(Octant, NodeKey)> = Octant::ALL
                .iter()
                .filter_map(|&octant| self.nodes[self.root].child(octant).map(|key| (octant, key)))
                .collect();

            let root_lower = self.nodes[self.root].lower().scaled(2.0);
            let root_upper = self.nodes[self.root].upper().scaled(2.0);
            self.nodes[self.root].set_bounds(root_lower, root_upper);

            let mut intermediaries = [None; 8];
            for octant in Octant::ALL {
                let (child_lower, child_upper) = self.nodes[self.root].child_bounds(octant);
                intermediaries[octant.index()] =
                    Some(self.add_child(self.root, octant, child_lower, child_upper));
            }
            for (octant, old_child) in old_children {
                if let Some(intermediary) = intermediaries[octant.index()] {
                    self.nodes[old_child].set_parent(intermediary);
                    self.nodes[intermediary].set_child(octant.opposite(), old_child);
                }
            }
        }
        log::debug!("octree resized in {steps} step(s)");
    }

    /// Nearest occupied leaf to a query point.
    ///
    /// Best-first search over the node boxes: a leaf is accepted when its
    /// id set is non-empty and not fully covered by `ignore`. Falls back to
    /// the root key when no leaf qualifies.
    pub fn nearest_ignoring(&self, x: f64, y: f64, z: f64, ignore: &HashSet<u64>) -> NodeKey {
        let mut queue = BinaryHeap::new();
        queue.push(Reverse(QueueEntry {
            distance: self.nodes[self.root].min_distance(x, y, z),
            key: self.root,
        }));
        while let Some(Reverse(entry)) = queue.pop() {
            let node = &self.nodes[entry.key];
            if node.is_leaf() && self.is_acceptable(node, ignore) {
                return entry.key;
            }
            for child in node.children() {
                queue.push(Reverse(QueueEntry {
                    distance: self.nodes[child].min_distance(x, y, z),
                    key: child,
                }));
            }
        }
        self.root
    }

    /// Nearest occupied leaf with no ids excluded
    pub fn nearest(&self, x: f64, y: f64, z: f64) -> NodeKey {
        self.nearest_ignoring(x, y, z, &HashSet::new())
    }

    /// Distance from the query point to the nearest occupied leaf box,
    /// positive infinity when the tree holds nothing
    pub fn nearest_distance(&self, x: f64, y: f64, z: f64) -> f64 {
        let key = self.nearest(x, y, z);
        if key == self.root && !self.is_acceptable(&self.nodes[key], &HashSet::new()) {
            return f64::INFINITY;
        }
        self.nodes[key].min_distance(x, y, z)
    }

    fn is_acceptable(&self, node: &OctreeNode, ignore: &HashSet<u64>) -> bool {
        !node.is_empty() && !node.ids().iter().all(|id| ignore.contains(id))
    }
}
