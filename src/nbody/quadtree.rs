//! Barnes-Hut quadtree.
//!
//! The simulation space is recursively subdivided into four quadrants; each
//! region is a node holding either nothing, a single resident body, or four
//! (lazily created) children. Every node aggregates the total mass and the
//! mass-weighted position sum of its subtree, so a distant cluster can stand
//! in for its bodies as a single point mass during force evaluation.
//!
//! Nodes live in an index arena (`Vec<Node>` plus a free list). Parent and
//! child links are plain indices, which keeps the upward walk used by
//! [`QuadTree::relocate`] cheap and avoids reference cycles entirely.
//!
//! Aggregates are stored as `(mass, Σ m·x, Σ m·y)` rather than a normalized
//! centroid. Incremental insertion adds a body's `m·(x, y)` term, removal
//! subtracts the identical term, and the centroid is only ever derived on
//! read, so repeated updates cannot compound rounding drift through the
//! stored state.

use log::debug;
use rayon::prelude::*;

use crate::nbody::Body;

/// Represents a square region in 2D space.
///
/// Each `Quad` has a center position (cx, cy) and a half-size, which is half
/// the length of one side of the square.
///
/// # Examples
///
/// ```
/// use rs_gravity::nbody::Quad;
///
/// let quad = Quad { cx: 0.0, cy: 0.0, half_size: 1.0 };
///
/// assert!(quad.contains(0.5, 0.5));
/// assert!(!quad.contains(1.5, 0.5)); // outside the square
/// ```
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Quad {
    pub cx: f64,        // center x-coordinate
    pub cy: f64,        // center y-coordinate
    pub half_size: f64, // half the length of one side
}

impl Quad {
    /// Returns true if the point (x, y) is inside this quad.
    ///
    /// The boundary is inclusive on the lower bounds and exclusive on the
    /// upper bounds, which avoids ambiguity when placing bodies exactly on a
    /// subdivision line.
    pub fn contains(&self, x: f64, y: f64) -> bool {
        x >= self.cx - self.half_size &&
            x <  self.cx + self.half_size &&
            y >= self.cy - self.half_size &&
            y <  self.cy + self.half_size
    }

    /// Full side length of the region.
    pub fn width(&self) -> f64 {
        self.half_size * 2.0
    }

    /// Subdivides the quad into four smaller quads (NW, NE, SW, SE).
    ///
    /// Subdivision is always a clean 2×2 split around the quad's own center:
    /// each child has exactly half the extent, offset by a quarter of it.
    ///
    /// # Examples
    ///
    /// ```
    /// use rs_gravity::nbody::Quad;
    ///
    /// let quad = Quad { cx: 0.0, cy: 0.0, half_size: 1.0 };
    /// let (nw, ne, _sw, se) = quad.subdivide();
    ///
    /// assert_eq!(nw.cx, -0.5);
    /// assert_eq!(nw.cy, 0.5);
    /// assert_eq!(nw.half_size, 0.5);
    /// assert_eq!(ne.cx, 0.5);
    /// assert!(se.contains(0.25, -0.25));
    /// ```
    pub fn subdivide(&self) -> (Quad, Quad, Quad, Quad) {
        (
            self.child_quad(0),
            self.child_quad(1),
            self.child_quad(2),
            self.child_quad(3),
        )
    }

    /// Determines which child quadrant the point (x, y) belongs to.
    ///
    /// Ties resolve toward the greater-or-equal side: a point exactly on the
    /// vertical center line goes east, on the horizontal one goes north.
    pub fn quadrant_index(&self, x: f64, y: f64) -> usize {
        let is_east = x >= self.cx;
        let is_north = y >= self.cy;

        match (is_north, is_east) {
            (true, false) => 0,  // NW
            (true, true) => 1,   // NE
            (false, false) => 2, // SW
            (false, true) => 3,  // SE
        }
    }

    /// The sub-quad for a quadrant index produced by [`Quad::quadrant_index`].
    pub fn child_quad(&self, index: usize) -> Quad {
        let hs = self.half_size / 2.0;
        match index {
            0 => Quad { cx: self.cx - hs, cy: self.cy + hs, half_size: hs }, // NW
            1 => Quad { cx: self.cx + hs, cy: self.cy + hs, half_size: hs }, // NE
            2 => Quad { cx: self.cx - hs, cy: self.cy - hs, half_size: hs }, // SW
            3 => Quad { cx: self.cx + hs, cy: self.cy - hs, half_size: hs }, // SE
            _ => *self,
        }
    }
}

/// A single quadtree node.
///
/// A node is in exactly one of three states:
/// - **empty**: no resident bodies, no children
/// - **leaf**: at least one resident body, no children (more than one body
///   only at the depth cap)
/// - **internal**: children present, no resident bodies
#[derive(Debug, Clone)]
pub struct Node {
    pub quad: Quad,
    pub depth: u32,
    pub parent: Option<usize>,
    /// Child slots in NW, NE, SW, SE order; created lazily on first insertion.
    pub children: [Option<usize>; 4],
    /// Resident body slots. Holds more than one entry only past the depth cap.
    pub bodies: Vec<usize>,
    /// Total mass of all bodies in this subtree.
    pub mass: f64,
    /// Mass-weighted position sum (Σ m·x, Σ m·y) of all bodies in this subtree.
    pub com_sum: (f64, f64),
    pub(crate) retired: bool,
}

impl Node {
    fn fresh(quad: Quad, depth: u32, parent: Option<usize>) -> Self {
        Node {
            quad,
            depth,
            parent,
            children: [None; 4],
            bodies: Vec::new(),
            mass: 0.0,
            com_sum: (0.0, 0.0),
            retired: false,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.bodies.is_empty() && self.children.iter().all(Option::is_none)
    }

    pub fn is_leaf(&self) -> bool {
        !self.bodies.is_empty()
    }

    pub fn is_internal(&self) -> bool {
        self.children.iter().any(Option::is_some)
    }

    /// Mass-weighted centroid of the subtree, or `None` for a massless node.
    ///
    /// Deriving the centroid on read (instead of storing it) is what keeps
    /// the incremental add/remove updates exact: nothing is ever multiplied
    /// back through the stored aggregates.
    pub fn centroid(&self) -> Option<(f64, f64)> {
        if self.mass > 0.0 {
            Some((self.com_sum.0 / self.mass, self.com_sum.1 / self.mass))
        } else {
            None
        }
    }
}

/// Read-only snapshot of one node, for visualization and telemetry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NodeView {
    pub center: (f64, f64),
    pub half_size: f64,
    pub depth: u32,
    pub mass: f64,
    pub centroid: Option<(f64, f64)>,
    pub body_count: usize,
}

/// The Barnes-Hut quadtree over an arena of nodes.
pub struct QuadTree {
    nodes: Vec<Node>,
    free: Vec<usize>,
    root: usize,
    bounds: Quad,
    max_depth: u32,
}

impl QuadTree {
    /// Creates an empty tree covering `bounds`, subdividing at most
    /// `max_depth` levels below the root.
    pub fn new(bounds: Quad, max_depth: u32) -> Self {
        QuadTree {
            nodes: vec![Node::fresh(bounds, 0, None)],
            free: Vec::new(),
            root: 0,
            bounds,
            max_depth,
        }
    }

    pub fn root(&self) -> usize {
        self.root
    }

    pub fn bounds(&self) -> Quad {
        self.bounds
    }

    pub fn node(&self, id: usize) -> &Node {
        &self.nodes[id]
    }

    /// Adjusts the subdivision cap. Takes effect on the next build; existing
    /// structure is left as-is.
    pub fn set_max_depth(&mut self, max_depth: u32) {
        self.max_depth = max_depth;
    }

    /// Number of live (non-retired) nodes in the arena.
    pub fn node_count(&self) -> usize {
        self.nodes.len() - self.free.len()
    }

    /// Total mass currently tracked at the root.
    pub fn total_mass(&self) -> f64 {
        self.nodes[self.root].mass
    }

    /// Mass-weighted centroid of the whole tree, or `None` when empty.
    pub fn centroid(&self) -> Option<(f64, f64)> {
        self.nodes[self.root].centroid()
    }

    /// Iterates read-only views of every live node, for visualization.
    pub fn nodes(&self) -> impl Iterator<Item = NodeView> + '_ {
        self.nodes.iter().filter(|n| !n.retired).map(|n| NodeView {
            center: (n.quad.cx, n.quad.cy),
            half_size: n.quad.half_size,
            depth: n.depth,
            mass: n.mass,
            centroid: n.centroid(),
            body_count: n.bodies.len(),
        })
    }

    /// Inserts a single body into the tree.
    ///
    /// Returns `false` without touching the tree when the body's position is
    /// outside the root bounds; the driver is responsible for keeping bodies
    /// inside the configured world box or accepting their exclusion.
    pub fn insert(&mut self, slot: usize, bodies: &mut [Body]) -> bool {
        let (x, y) = bodies[slot].position;
        if !self.bounds.contains(x, y) {
            debug!(
                "body {} at ({:.3}, {:.3}) is outside the world bounds; not inserted",
                bodies[slot].id, x, y
            );
            return false;
        }
        let root = self.root;
        self.insert_at(root, slot, bodies);
        true
    }

    fn insert_at(&mut self, id: usize, slot: usize, bodies: &mut [Body]) {
        let (x, y) = bodies[slot].position;
        let m = bodies[slot].mass;
        {
            let node = &mut self.nodes[id];
            node.mass += m;
            node.com_sum.0 += m * x;
            node.com_sum.1 += m * y;
        }

        if self.nodes[id].depth >= self.max_depth {
            // precision floor: co-resident bodies share the leaf instead of
            // subdividing further
            self.nodes[id].bodies.push(slot);
            bodies[slot].node = Some(id);
            return;
        }

        if self.nodes[id].is_internal() {
            let child = self.child_for(id, x, y);
            self.insert_at(child, slot, bodies);
            self.prune_children(id);
            return;
        }

        if let Some(resident) = self.nodes[id].bodies.pop() {
            // leaf: subdivide, push the former resident down, then the new body
            let (rx, ry) = bodies[resident].position;
            let child = self.child_for(id, rx, ry);
            self.insert_at(child, resident, bodies);

            let child = self.child_for(id, x, y);
            self.insert_at(child, slot, bodies);
            self.prune_children(id);
            return;
        }

        // empty node: the body becomes the resident
        self.nodes[id].bodies.push(slot);
        bodies[slot].node = Some(id);
    }

    /// Child node for the quadrant containing (x, y), created lazily.
    fn child_for(&mut self, id: usize, x: f64, y: f64) -> usize {
        let quad = self.nodes[id].quad;
        let index = quad.quadrant_index(x, y);
        if let Some(child) = self.nodes[id].children[index] {
            return child;
        }
        let depth = self.nodes[id].depth;
        let child = self.alloc(quad.child_quad(index), depth + 1, Some(id));
        self.nodes[id].children[index] = Some(child);
        child
    }

    /// Releases any child whose subtree ended up with neither bodies nor
    /// children. The tree self-compacts after every mutation.
    fn prune_children(&mut self, id: usize) {
        for index in 0..4 {
            if let Some(child) = self.nodes[id].children[index] {
                if self.nodes[child].is_empty() {
                    self.nodes[id].children[index] = None;
                    self.release(child);
                }
            }
        }
    }

    /// Moves a body whose position changed since it was inserted.
    ///
    /// `prev` must be the position the body occupied when its aggregate
    /// contribution was last recorded. If the body is still inside its leaf,
    /// the ancestor chain gets a delta update of the `m·(x, y)` term. If it
    /// left, the walk ascends the parent chain subtracting the stale
    /// contribution until an ancestor contains the new position, then
    /// reinserts from there; ancestors emptied on the way are pruned.
    ///
    /// Returns `false` when the body ended up outside the root bounds and was
    /// dropped from the tree.
    pub fn relocate(&mut self, slot: usize, prev: (f64, f64), bodies: &mut [Body]) -> bool {
        let (x, y) = bodies[slot].position;
        let m = bodies[slot].mass;
        let node_id = match bodies[slot].node {
            Some(id) => id,
            None => return self.insert(slot, bodies),
        };

        if self.nodes[node_id].quad.contains(x, y) {
            let dx = m * (x - prev.0);
            let dy = m * (y - prev.1);
            let mut cursor = Some(node_id);
            while let Some(id) = cursor {
                self.nodes[id].com_sum.0 += dx;
                self.nodes[id].com_sum.1 += dy;
                cursor = self.nodes[id].parent;
            }
            return true;
        }

        // detach from the old leaf and ascend
        self.nodes[node_id].bodies.retain(|&b| b != slot);
        bodies[slot].node = None;

        let mut cursor = node_id;
        loop {
            self.nodes[cursor].mass -= m;
            self.nodes[cursor].com_sum.0 -= m * prev.0;
            self.nodes[cursor].com_sum.1 -= m * prev.1;

            if self.nodes[cursor].quad.contains(x, y) {
                self.insert_at(cursor, slot, bodies);
                return true;
            }

            match self.nodes[cursor].parent {
                Some(parent) => {
                    if self.nodes[cursor].is_empty() {
                        if let Some(index) =
                            (0..4).find(|&i| self.nodes[parent].children[i] == Some(cursor))
                        {
                            self.nodes[parent].children[index] = None;
                        }
                        self.release(cursor);
                    }
                    cursor = parent;
                }
                None => {
                    debug!(
                        "body {} left the world bounds; dropped from the tree",
                        bodies[slot].id
                    );
                    return false;
                }
            }
        }
    }

    /// Drops every node and resets to a single empty root.
    pub fn reset(&mut self, bodies: &mut [Body]) {
        for body in bodies.iter_mut() {
            body.node = None;
        }
        self.nodes.clear();
        self.free.clear();
        self.nodes.push(Node::fresh(self.bounds, 0, None));
        self.root = 0;
    }

    /// Rebuilds the tree from scratch for the given body slots.
    ///
    /// Bulk construction partitions the slot list into four per-quadrant
    /// sublists in one pass per level and aggregates mass by summation over
    /// the list, avoiding per-body tree descent.
    pub fn rebuild(&mut self, slots: &[usize], bodies: &mut [Body]) {
        self.rebuild_with(slots, bodies, None);
    }

    /// Like [`QuadTree::rebuild`], but the four root quadrant subtrees are
    /// built on independent worker threads. The quadrants are disjoint, so
    /// each worker owns its subtree outright and no locking is needed; the
    /// finished sub-arenas are grafted into the root arena afterwards.
    pub fn rebuild_parallel(
        &mut self,
        slots: &[usize],
        bodies: &mut [Body],
        pool: &rayon::ThreadPool,
    ) {
        self.rebuild_with(slots, bodies, Some(pool));
    }

    fn rebuild_with(
        &mut self,
        slots: &[usize],
        bodies: &mut [Body],
        pool: Option<&rayon::ThreadPool>,
    ) {
        for &slot in slots {
            bodies[slot].node = None;
        }
        let bounds = self.bounds;
        let max_depth = self.max_depth;
        let in_bounds: Vec<usize> = slots
            .iter()
            .copied()
            .filter(|&slot| !bodies[slot].marked_for_removal)
            .filter(|&slot| {
                let (x, y) = bodies[slot].position;
                bounds.contains(x, y)
            })
            .collect();
        let excluded = slots.len() - in_bounds.len();
        if excluded > 0 {
            debug!(
                "batch rebuild excluded {} bodies (flagged or outside world bounds)",
                excluded
            );
        }

        self.free.clear();
        match pool {
            Some(pool) if in_bounds.len() > 1 && max_depth > 0 => {
                let mut root = Node::fresh(bounds, 0, None);
                for &slot in &in_bounds {
                    let body = &bodies[slot];
                    root.mass += body.mass;
                    root.com_sum.0 += body.mass * body.position.0;
                    root.com_sum.1 += body.mass * body.position.1;
                }
                let mut parts: [Vec<usize>; 4] = Default::default();
                for &slot in &in_bounds {
                    let (x, y) = bodies[slot].position;
                    parts[bounds.quadrant_index(x, y)].push(slot);
                }
                self.nodes.clear();
                self.nodes.push(root);
                self.root = 0;

                let occupied: Vec<(usize, Vec<usize>)> = parts
                    .into_iter()
                    .enumerate()
                    .filter(|(_, list)| !list.is_empty())
                    .collect();
                let bodies_ref: &[Body] = bodies;
                let built: Vec<(usize, SubArena)> = pool.install(|| {
                    occupied
                        .into_par_iter()
                        .map(|(index, list)| {
                            let quad = bounds.child_quad(index);
                            (index, build_standalone(quad, 1, max_depth, list, bodies_ref))
                        })
                        .collect()
                });
                for (index, sub) in built {
                    self.graft(0, index, sub);
                }
            }
            _ => {
                let sub = build_standalone(bounds, 0, max_depth, in_bounds, bodies);
                self.nodes = sub.nodes;
                self.root = 0;
            }
        }

        // leaf back-references
        for id in 0..self.nodes.len() {
            for k in 0..self.nodes[id].bodies.len() {
                let slot = self.nodes[id].bodies[k];
                bodies[slot].node = Some(id);
            }
        }
    }

    /// Appends a standalone sub-arena under `parent_id`, rewriting its local
    /// indices into the main arena's index space.
    fn graft(&mut self, parent_id: usize, quadrant: usize, sub: SubArena) {
        let offset = self.nodes.len();
        for mut node in sub.nodes {
            node.parent = match node.parent {
                Some(parent) => Some(parent + offset),
                None => Some(parent_id),
            };
            for child in node.children.iter_mut() {
                if let Some(child) = child {
                    *child += offset;
                }
            }
            self.nodes.push(node);
        }
        self.nodes[parent_id].children[quadrant] = Some(offset);
    }

    fn alloc(&mut self, quad: Quad, depth: u32, parent: Option<usize>) -> usize {
        if let Some(id) = self.free.pop() {
            self.nodes[id] = Node::fresh(quad, depth, parent);
            id
        } else {
            self.nodes.push(Node::fresh(quad, depth, parent));
            self.nodes.len() - 1
        }
    }

    fn release(&mut self, id: usize) {
        let node = &mut self.nodes[id];
        node.children = [None; 4];
        node.bodies.clear();
        node.mass = 0.0;
        node.com_sum = (0.0, 0.0);
        node.parent = None;
        node.retired = true;
        self.free.push(id);
    }
}

/// A subtree built in isolation; node 0 is the subtree root and every index
/// is local until [`QuadTree::graft`] rewrites it.
struct SubArena {
    nodes: Vec<Node>,
}

fn build_standalone(
    quad: Quad,
    depth: u32,
    max_depth: u32,
    slots: Vec<usize>,
    bodies: &[Body],
) -> SubArena {
    let mut sub = SubArena {
        nodes: vec![Node::fresh(quad, depth, None)],
    };
    sub.build(0, slots, max_depth, bodies);
    sub
}

impl SubArena {
    fn build(&mut self, id: usize, slots: Vec<usize>, max_depth: u32, bodies: &[Body]) {
        if slots.is_empty() {
            return;
        }
        {
            let node = &mut self.nodes[id];
            for &slot in &slots {
                let body = &bodies[slot];
                node.mass += body.mass;
                node.com_sum.0 += body.mass * body.position.0;
                node.com_sum.1 += body.mass * body.position.1;
            }
        }
        if slots.len() == 1 {
            self.nodes[id].bodies = slots;
            return;
        }

        let depth = self.nodes[id].depth;
        let quad = self.nodes[id].quad;
        if depth >= max_depth {
            debug!(
                "depth cap {} reached with {} co-resident bodies",
                max_depth,
                slots.len()
            );
            self.nodes[id].bodies = slots;
            return;
        }

        let mut parts: [Vec<usize>; 4] = Default::default();
        for &slot in &slots {
            let (x, y) = bodies[slot].position;
            parts[quad.quadrant_index(x, y)].push(slot);
        }
        for (index, list) in parts.into_iter().enumerate() {
            if list.is_empty() {
                continue;
            }
            let child = self.nodes.len();
            self.nodes.push(Node::fresh(quad.child_quad(index), depth + 1, Some(id)));
            self.nodes[id].children[index] = Some(child);
            self.build(child, list, max_depth, bodies);
        }
    }
}
