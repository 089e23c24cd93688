use criterion::{criterion_group, criterion_main, Criterion};
use rs_gravity::nbody::{brute_force_pairwise, compute_net_force, Body, Quad, QuadTree};
use rs_gravity::utils::SimConstants;

/// Deterministic spiral of bodies, dense toward the center.
fn spiral_bodies(count: usize) -> Vec<Body> {
    (0..count)
        .map(|i| {
            let angle = i as f64 * 0.37;
            let radius = 5.0 + (i as f64).sqrt() * 8.0;
            Body::new(
                i as u64,
                (radius * angle.cos(), radius * angle.sin()),
                (0.0, 0.0),
                1.0 + (i % 7) as f64,
                0.0,
            )
            .expect("valid bench body")
        })
        .collect()
}

pub fn bench_force_evaluation(c: &mut Criterion) {
    let mut group = c.benchmark_group("force_evaluation");
    group.measurement_time(std::time::Duration::from_secs(5));
    group.sample_size(30);

    let bounds = Quad { cx: 0.0, cy: 0.0, half_size: 512.0 };
    let mut bodies = spiral_bodies(2000);
    let slots: Vec<usize> = (0..bodies.len()).collect();
    let mut tree = QuadTree::new(bounds, 16);
    tree.rebuild(&slots, &mut bodies);

    for &theta in &[0.3, 0.6, 0.95] {
        let constants = SimConstants::new(Some(1.0), Some(theta), None, None, None, None, None);
        group.bench_function(format!("tree_theta_{theta}"), |b| {
            b.iter(|| {
                let mut sum = 0.0;
                for slot in 0..bodies.len() {
                    sum += compute_net_force(&tree, slot, &bodies, &constants).force.0;
                }
                sum
            })
        });
    }

    let constants = SimConstants::new(Some(1.0), None, None, None, None, None, None);
    group.bench_function("brute_force_pairs", |b| {
        b.iter(|| {
            let mut sum = 0.0;
            for slot in 0..bodies.len() {
                sum += brute_force_pairwise(slot, &bodies, &constants).0;
            }
            sum
        })
    });
    group.finish();
}

pub fn bench_tree_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("tree_build");
    group.measurement_time(std::time::Duration::from_secs(5));
    group.sample_size(30);

    let bounds = Quad { cx: 0.0, cy: 0.0, half_size: 512.0 };
    let mut bodies = spiral_bodies(2000);
    let slots: Vec<usize> = (0..bodies.len()).collect();

    group.bench_function("sequential_rebuild", |b| {
        let mut tree = QuadTree::new(bounds, 16);
        b.iter(|| {
            tree.rebuild(&slots, &mut bodies);
            tree.node_count()
        })
    });

    let pool = rayon::ThreadPoolBuilder::new()
        .build()
        .expect("bench thread pool");
    group.bench_function("parallel_rebuild", |b| {
        let mut tree = QuadTree::new(bounds, 16);
        b.iter(|| {
            tree.rebuild_parallel(&slots, &mut bodies, &pool);
            tree.node_count()
        })
    });
    group.finish();
}

criterion_group!(benches, bench_force_evaluation, bench_tree_build);
criterion_main!(benches);
