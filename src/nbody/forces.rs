//! Gravitational force evaluation over the Barnes-Hut tree.
//!
//! The walk is split into two phases, which keeps the hot arithmetic in one
//! tight loop: [`collect_approx_nodes`] gathers every contribution the
//! acceptance criterion allows — exact entries for nearby leaf bodies, one
//! aggregate entry per accepted internal node — and [`compute_force_scalar`]
//! folds the worklist into a net force. Overlapping leaf bodies are not
//! turned into force entries at all; they are reported back as collision
//! candidates so the stepper can resolve them by absorption.
//!
//! The walk only reads tree structure and aggregates, so the stepper may run
//! it for many bodies in parallel once tree construction has finished.

use crate::nbody::{Body, QuadTree};
use crate::utils::SimConstants;

/// A single contribution in a body's force worklist: either one nearby body
/// or an accepted subtree standing in as a point mass at its centroid.
#[derive(Debug, Clone, Copy)]
pub struct ApproxNode {
    pub mass: f64,
    pub com_x: f64,
    pub com_y: f64,
}

/// Everything one body's tree walk produced for this tick.
#[derive(Debug, Clone, Default)]
pub struct ForcePass {
    /// Net accumulated force on the body.
    pub force: (f64, f64),
    /// Overlapping body pairs found during the walk, as (query, other) slots.
    pub collisions: Vec<(usize, usize)>,
}

/// Recursively collects the contributions acting on body `slot`.
///
/// - Massless (empty) subtrees contribute nothing.
/// - Leaf residents other than the query body become exact entries, unless
///   the two bodies overlap, in which case the pair is recorded in
///   `collisions` instead. Bodies flagged for removal are skipped, as is the
///   query body itself (identity comparison, not spatial exclusion — the
///   query body routinely walks through its own leaf).
/// - An internal node passes the acceptance test when `w² < θ²·r²`, with `r`
///   measured from the query body to the node center; it then contributes a
///   single entry at the subtree centroid. Otherwise the walk descends into
///   every present child.
pub fn collect_approx_nodes(
    tree: &QuadTree,
    node_id: usize,
    slot: usize,
    bodies: &[Body],
    constants: &SimConstants,
    worklist: &mut Vec<ApproxNode>,
    collisions: &mut Vec<(usize, usize)>,
) {
    let node = tree.node(node_id);
    if node.mass <= 0.0 {
        return;
    }

    if node.is_leaf() {
        let p = &bodies[slot];
        for &other in &node.bodies {
            if other == slot {
                continue;
            }
            let q = &bodies[other];
            if q.marked_for_removal {
                continue;
            }
            if p.collides_with(q) {
                collisions.push((slot, other));
                continue;
            }
            worklist.push(ApproxNode {
                mass: q.mass,
                com_x: q.position.0,
                com_y: q.position.1,
            });
        }
        return;
    }

    let p = &bodies[slot];
    let dx = node.quad.cx - p.position.0;
    let dy = node.quad.cy - p.position.1;
    let dist_sq = dx * dx + dy * dy;
    let width = node.quad.width();

    // a region the query body sits in must always open, whatever theta says:
    // its aggregate would include the body's own mass
    let inside = node.quad.contains(p.position.0, p.position.1);

    if !inside && constants.accepts(width * width, dist_sq) {
        if let Some((com_x, com_y)) = node.centroid() {
            worklist.push(ApproxNode {
                mass: node.mass,
                com_x,
                com_y,
            });
        }
    } else {
        for &child in node.children.iter().flatten() {
            collect_approx_nodes(tree, child, slot, bodies, constants, worklist, collisions);
        }
    }
}

/// Folds a worklist into the net force on `p`.
///
/// Each entry contributes `G·m₁·m₂ / (r² + ε)` along the unit vector toward
/// it; the softening term `ε` keeps near-coincident pairs finite.
pub fn compute_force_scalar(p: &Body, worklist: &[ApproxNode], g: f64, softening: f64) -> (f64, f64) {
    let mut force_x = 0.0;
    let mut force_y = 0.0;
    for node in worklist {
        let dx = node.com_x - p.position.0;
        let dy = node.com_y - p.position.1;
        let dist_sq = dx * dx + dy * dy + softening;
        if dist_sq <= 0.0 {
            // coincident with zero softening; no defined direction
            continue;
        }
        let dist = dist_sq.sqrt();
        let force = g * p.mass * node.mass / dist_sq;
        force_x += force * dx / dist;
        force_y += force * dy / dist;
    }
    (force_x, force_y)
}

/// Computes the net force on body `slot` via the tree, together with any
/// collision candidates discovered along the way.
///
/// Bodies flagged for removal neither receive nor exert force.
pub fn compute_net_force(
    tree: &QuadTree,
    slot: usize,
    bodies: &[Body],
    constants: &SimConstants,
) -> ForcePass {
    let mut pass = ForcePass::default();
    if bodies[slot].marked_for_removal {
        return pass;
    }
    let mut worklist = Vec::new();
    collect_approx_nodes(
        tree,
        tree.root(),
        slot,
        bodies,
        constants,
        &mut worklist,
        &mut pass.collisions,
    );
    let (fx, fy) = compute_force_scalar(
        &bodies[slot],
        &worklist,
        constants.gravitational_constant,
        constants.softening,
    );
    pass.force = (fx * constants.force_scale, fy * constants.force_scale);
    pass
}

/// Exact all-pairs reference: the O(n²) sum the tree approximates.
///
/// Used by tests and benches to quantify the accuracy/speed trade-off as
/// theta varies.
pub fn brute_force_pairwise(slot: usize, bodies: &[Body], constants: &SimConstants) -> (f64, f64) {
    let p = &bodies[slot];
    let mut force_x = 0.0;
    let mut force_y = 0.0;
    for (other, q) in bodies.iter().enumerate() {
        if other == slot || q.marked_for_removal {
            continue;
        }
        let dx = q.position.0 - p.position.0;
        let dy = q.position.1 - p.position.1;
        let dist_sq = dx * dx + dy * dy + constants.softening;
        if dist_sq <= 0.0 {
            continue;
        }
        let dist = dist_sq.sqrt();
        let force = constants.gravitational_constant * p.mass * q.mass / dist_sq;
        force_x += force * dx / dist;
        force_y += force * dy / dist;
    }
    (force_x * constants.force_scale, force_y * constants.force_scale)
}
