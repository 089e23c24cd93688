use approx::assert_relative_eq;

use crate::nbody::{Body, Quad, QuadTree};

fn body(slot: u64, x: f64, y: f64, mass: f64) -> Body {
    Body::new(slot, (x, y), (0.0, 0.0), mass, 0.0).unwrap()
}

/// Cheap deterministic pseudo-random stream, good enough for scattering
/// test bodies without pulling randomness into assertions.
fn lcg(seed: &mut u64) -> f64 {
    *seed = seed
        .wrapping_mul(6364136223846793005)
        .wrapping_add(1442695040888963407);
    (*seed >> 11) as f64 / (1u64 << 53) as f64
}

fn scattered_bodies(count: usize, extent: f64) -> Vec<Body> {
    let mut seed = 0x9E3779B97F4A7C15u64;
    (0..count)
        .map(|i| {
            let x = (lcg(&mut seed) - 0.5) * 2.0 * extent;
            let y = (lcg(&mut seed) - 0.5) * 2.0 * extent;
            let mass = 1.0 + 9.0 * lcg(&mut seed);
            body(i as u64, x, y, mass)
        })
        .collect()
}

/// Asserts that every body in the subtree rooted at `id` satisfies `quad`'s
/// containment test.
fn assert_subtree_within(tree: &QuadTree, bodies: &[Body], id: usize, quad: Quad) {
    let node = tree.node(id);
    for &slot in &node.bodies {
        let (x, y) = bodies[slot].position;
        assert!(
            quad.contains(x, y),
            "body {} at ({}, {}) escapes node bounds",
            slot,
            x,
            y
        );
    }
    for &child in node.children.iter().flatten() {
        assert_subtree_within(tree, bodies, child, quad);
    }
}

fn assert_containment_invariant(tree: &QuadTree, bodies: &[Body]) {
    fn walk(tree: &QuadTree, bodies: &[Body], id: usize) {
        assert_subtree_within(tree, bodies, id, tree.node(id).quad);
        for &child in tree.node(id).children.iter().flatten() {
            walk(tree, bodies, child);
        }
    }
    walk(tree, bodies, tree.root());
}

/// Order-insensitive structural snapshot: one tuple per live node.
fn snapshot(tree: &QuadTree) -> Vec<(u32, f64, f64, f64, f64, usize)> {
    let mut nodes: Vec<_> = tree
        .nodes()
        .map(|n| (n.depth, n.center.0, n.center.1, n.half_size, n.mass, n.body_count))
        .collect();
    nodes.sort_by(|a, b| a.partial_cmp(b).unwrap());
    nodes
}

#[test]
fn test_quad_contains() {
    let quad = Quad { cx: 0.0, cy: 0.0, half_size: 1.0 };
    assert!(quad.contains(0.0, 0.0));
    assert!(quad.contains(-0.99, 0.99));
    assert!(!quad.contains(1.0, 0.0)); // upper bound is half-open
    assert!(!quad.contains(0.0, -1.5));
}

#[test]
fn test_quad_subdivide() {
    let quad = Quad { cx: 0.0, cy: 0.0, half_size: 1.0 };
    let (nw, ne, sw, se) = quad.subdivide();

    assert_eq!(nw.cx, -0.5);
    assert_eq!(nw.cy, 0.5);
    assert_eq!(nw.half_size, 0.5);
    assert_eq!(ne.cx, 0.5);
    assert_eq!(sw.cy, -0.5);
    assert!(se.contains(0.75, -0.75));
}

#[test]
fn test_quadrant_routing_matches_child_quads() {
    let quad = Quad { cx: 0.0, cy: 0.0, half_size: 8.0 };
    for &(x, y) in &[(-3.0, 3.0), (3.0, 3.0), (-3.0, -3.0), (3.0, -3.0), (0.0, 0.0), (0.0, -1.0)] {
        let index = quad.quadrant_index(x, y);
        assert!(quad.child_quad(index).contains(x, y));
    }
}

#[test]
fn test_insert_states() {
    let bounds = Quad { cx: 0.0, cy: 0.0, half_size: 64.0 };
    let mut tree = QuadTree::new(bounds, 16);
    let mut bodies = vec![body(0, -10.0, 10.0, 2.0), body(1, 10.0, -10.0, 3.0)];

    // empty → leaf
    assert!(tree.insert(0, &mut bodies));
    assert!(tree.node(tree.root()).is_leaf());
    assert_eq!(bodies[0].node, Some(tree.root()));

    // leaf → internal on the second insert
    assert!(tree.insert(1, &mut bodies));
    let root = tree.node(tree.root());
    assert!(root.is_internal());
    assert!(root.bodies.is_empty());
    assert_relative_eq!(tree.total_mass(), 5.0);
    assert_containment_invariant(&tree, &bodies);
}

#[test]
fn test_insert_out_of_bounds_is_a_noop() {
    let bounds = Quad { cx: 0.0, cy: 0.0, half_size: 4.0 };
    let mut tree = QuadTree::new(bounds, 16);
    let mut bodies = vec![body(0, 100.0, 0.0, 2.0)];

    assert!(!tree.insert(0, &mut bodies));
    assert_eq!(tree.node_count(), 1);
    assert_eq!(tree.total_mass(), 0.0);
    assert!(bodies[0].node.is_none());
}

#[test]
fn test_mass_conservation_incremental() {
    let bounds = Quad { cx: 0.0, cy: 0.0, half_size: 64.0 };
    let mut tree = QuadTree::new(bounds, 16);
    let mut bodies = scattered_bodies(40, 60.0);
    let expected: f64 = bodies.iter().map(|b| b.mass).sum();

    for slot in 0..bodies.len() {
        assert!(tree.insert(slot, &mut bodies));
    }
    assert_relative_eq!(tree.total_mass(), expected, epsilon = 1e-9);
}

#[test]
fn test_centroid_correctness() {
    let bounds = Quad { cx: 0.0, cy: 0.0, half_size: 64.0 };
    let mut tree = QuadTree::new(bounds, 16);
    let mut bodies = scattered_bodies(25, 60.0);
    let slots: Vec<usize> = (0..bodies.len()).collect();
    tree.rebuild(&slots, &mut bodies);

    let total: f64 = bodies.iter().map(|b| b.mass).sum();
    let expected_x: f64 = bodies.iter().map(|b| b.mass * b.position.0).sum::<f64>() / total;
    let expected_y: f64 = bodies.iter().map(|b| b.mass * b.position.1).sum::<f64>() / total;

    let (cx, cy) = tree.centroid().unwrap();
    assert_relative_eq!(cx, expected_x, epsilon = 1e-9);
    assert_relative_eq!(cy, expected_y, epsilon = 1e-9);
}

#[test]
fn test_containment_invariant_after_rebuild() {
    let bounds = Quad { cx: 0.0, cy: 0.0, half_size: 64.0 };
    let mut tree = QuadTree::new(bounds, 16);
    let mut bodies = scattered_bodies(100, 60.0);
    let slots: Vec<usize> = (0..bodies.len()).collect();
    tree.rebuild(&slots, &mut bodies);

    assert_containment_invariant(&tree, &bodies);

    // every leaf back-reference points at a node actually holding the body
    for (slot, b) in bodies.iter().enumerate() {
        let id = b.node.expect("body should be in the tree");
        assert!(tree.node(id).bodies.contains(&slot));
    }
}

#[test]
fn test_idempotent_rebuild() {
    let bounds = Quad { cx: 0.0, cy: 0.0, half_size: 64.0 };
    let mut tree = QuadTree::new(bounds, 16);
    let mut bodies = scattered_bodies(60, 60.0);
    let slots: Vec<usize> = (0..bodies.len()).collect();

    tree.rebuild(&slots, &mut bodies);
    let first = snapshot(&tree);

    tree.reset(&mut bodies);
    assert_eq!(tree.node_count(), 1);
    tree.rebuild(&slots, &mut bodies);
    let second = snapshot(&tree);

    assert_eq!(first, second);
}

#[test]
fn test_parallel_rebuild_matches_sequential() {
    let bounds = Quad { cx: 0.0, cy: 0.0, half_size: 64.0 };
    let mut bodies = scattered_bodies(200, 60.0);
    let mut bodies_par = bodies.clone();
    let slots: Vec<usize> = (0..bodies.len()).collect();

    let mut sequential = QuadTree::new(bounds, 16);
    sequential.rebuild(&slots, &mut bodies);

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(3)
        .build()
        .unwrap();
    let mut parallel = QuadTree::new(bounds, 16);
    parallel.rebuild_parallel(&slots, &mut bodies_par, &pool);

    assert_eq!(snapshot(&sequential), snapshot(&parallel));
    assert_containment_invariant(&parallel, &bodies_par);
}

#[test]
fn test_depth_cap_termination() {
    let bounds = Quad { cx: 0.0, cy: 0.0, half_size: 64.0 };
    let mut tree = QuadTree::new(bounds, 10);
    let mut bodies: Vec<Body> = (0..10_000).map(|i| body(i, 50.0, 50.0, 1.0)).collect();
    let slots: Vec<usize> = (0..bodies.len()).collect();

    tree.rebuild(&slots, &mut bodies);

    // all coincident bodies end up sharing one capped leaf; none are dropped
    let capped = tree
        .nodes()
        .find(|n| n.body_count == 10_000)
        .expect("expected a shared leaf at the depth cap");
    assert_eq!(capped.depth, 10);
    assert_relative_eq!(tree.total_mass(), 10_000.0);
}

#[test]
fn test_depth_cap_termination_incremental() {
    let bounds = Quad { cx: 0.0, cy: 0.0, half_size: 64.0 };
    let mut tree = QuadTree::new(bounds, 10);
    let mut bodies: Vec<Body> = (0..100).map(|i| body(i, -20.0, -20.0, 1.0)).collect();

    for slot in 0..bodies.len() {
        assert!(tree.insert(slot, &mut bodies));
    }
    let capped = tree
        .nodes()
        .find(|n| n.body_count == 100)
        .expect("expected a shared leaf at the depth cap");
    assert_eq!(capped.depth, 10);
}

#[test]
fn test_relocate_within_bounds() {
    let bounds = Quad { cx: 0.0, cy: 0.0, half_size: 64.0 };
    let mut tree = QuadTree::new(bounds, 16);
    let mut bodies = vec![
        body(0, -32.0, 32.0, 2.0),
        body(1, 32.0, 32.0, 3.0),
        body(2, 32.0, -32.0, 5.0),
    ];
    let slots: Vec<usize> = (0..bodies.len()).collect();
    tree.rebuild(&slots, &mut bodies);

    // move body 0 across the world into the empty SW quadrant
    let prev = bodies[0].position;
    bodies[0].position = (-32.0, -32.0);
    assert!(tree.relocate(0, prev, &mut bodies));

    assert_relative_eq!(tree.total_mass(), 10.0);
    assert_containment_invariant(&tree, &bodies);

    let total: f64 = bodies.iter().map(|b| b.mass).sum();
    let expected_x: f64 = bodies.iter().map(|b| b.mass * b.position.0).sum::<f64>() / total;
    let expected_y: f64 = bodies.iter().map(|b| b.mass * b.position.1).sum::<f64>() / total;
    let (cx, cy) = tree.centroid().unwrap();
    assert_relative_eq!(cx, expected_x, epsilon = 1e-9);
    assert_relative_eq!(cy, expected_y, epsilon = 1e-9);
}

#[test]
fn test_relocate_prunes_emptied_branch() {
    let bounds = Quad { cx: 0.0, cy: 0.0, half_size: 64.0 };
    let mut tree = QuadTree::new(bounds, 16);
    // two close bodies force a deep chain of subdivisions
    let mut bodies = vec![body(0, 10.0, 10.0, 1.0), body(1, 10.2, 10.2, 1.0)];
    let slots: Vec<usize> = (0..bodies.len()).collect();
    tree.rebuild(&slots, &mut bodies);
    let deep_count = tree.node_count();
    assert!(deep_count > 3);

    // once both bodies leave, the whole emptied chain is released on the
    // second relocation's upward walk
    let prev = bodies[0].position;
    bodies[0].position = (-30.0, -30.0);
    assert!(tree.relocate(0, prev, &mut bodies));
    let prev = bodies[1].position;
    bodies[1].position = (-35.0, -35.0);
    assert!(tree.relocate(1, prev, &mut bodies));

    assert!(tree.node_count() < deep_count);
    assert_containment_invariant(&tree, &bodies);
    assert_relative_eq!(tree.total_mass(), 2.0);
}

#[test]
fn test_relocate_out_of_bounds_drops_body() {
    let bounds = Quad { cx: 0.0, cy: 0.0, half_size: 8.0 };
    let mut tree = QuadTree::new(bounds, 16);
    let mut bodies = vec![body(0, 4.0, 0.0, 1.0), body(1, -4.0, 0.0, 1.0)];
    let slots: Vec<usize> = (0..bodies.len()).collect();
    tree.rebuild(&slots, &mut bodies);

    let prev = bodies[0].position;
    bodies[0].position = (100.0, 0.0);
    assert!(!tree.relocate(0, prev, &mut bodies));

    assert!(bodies[0].node.is_none());
    assert_relative_eq!(tree.total_mass(), 1.0);
    assert_containment_invariant(&tree, &bodies);
}

#[test]
fn test_relocate_within_same_leaf_refreshes_centroid() {
    let bounds = Quad { cx: 0.0, cy: 0.0, half_size: 64.0 };
    let mut tree = QuadTree::new(bounds, 16);
    let mut bodies = vec![body(0, -32.0, 32.0, 2.0), body(1, 32.0, -32.0, 2.0)];
    let slots: Vec<usize> = (0..bodies.len()).collect();
    tree.rebuild(&slots, &mut bodies);

    // nudge body 0 without leaving its quadrant leaf
    let prev = bodies[0].position;
    bodies[0].position = (-30.0, 30.0);
    assert!(tree.relocate(0, prev, &mut bodies));

    let (cx, cy) = tree.centroid().unwrap();
    assert_relative_eq!(cx, (2.0 * -30.0 + 2.0 * 32.0) / 4.0, epsilon = 1e-9);
    assert_relative_eq!(cy, (2.0 * 30.0 + 2.0 * -32.0) / 4.0, epsilon = 1e-9);
}

#[test]
fn test_rebuild_excludes_out_of_bounds_bodies() {
    let bounds = Quad { cx: 0.0, cy: 0.0, half_size: 8.0 };
    let mut tree = QuadTree::new(bounds, 16);
    let mut bodies = vec![body(0, 1.0, 1.0, 1.0), body(1, 100.0, 0.0, 7.0)];
    let slots: Vec<usize> = (0..bodies.len()).collect();
    tree.rebuild(&slots, &mut bodies);

    assert_relative_eq!(tree.total_mass(), 1.0);
    assert!(bodies[1].node.is_none());
}
