use crate::nbody::{populate_disc, spawn_disc, Quad, Simulation};
use crate::utils::SimConstants;

fn unit_constants() -> SimConstants {
    SimConstants::new(Some(1.0), None, None, None, None, None, None)
}

#[test]
fn test_spawn_disc_shape() {
    let constants = unit_constants();
    let specs = spawn_disc(50, 40.0, 1000.0, &constants);

    // the attractor plus the requested disc bodies
    assert_eq!(specs.len(), 51);
    assert_eq!(specs[0].position, (0.0, 0.0));
    assert_eq!(specs[0].mass, 1000.0);

    for spec in &specs[1..] {
        let (x, y) = spec.position;
        let radius = (x * x + y * y).sqrt();
        assert!(radius <= 40.0 + 1e-9, "body spawned outside the disc");
        assert!(spec.mass > 0.0);
        assert!(spec.radius > 0.0);
        // tangential launch: velocity is roughly perpendicular to the
        // radial direction, so the dot product stays small
        let (vx, vy) = spec.velocity;
        let speed = (vx * vx + vy * vy).sqrt();
        let radial = (x * vx + y * vy).abs() / (radius * speed);
        assert!(radial < 0.2, "velocity should be mostly tangential");
    }
}

#[test]
fn test_populate_disc_steps_cleanly() {
    let bounds = Quad { cx: 0.0, cy: 0.0, half_size: 256.0 };
    let mut sim = Simulation::new(bounds, unit_constants()).unwrap();
    populate_disc(&mut sim, 100, 40.0, 1000.0).unwrap();

    assert_eq!(sim.live_count(), 101);
    for _ in 0..5 {
        sim.step(0.01).unwrap();
    }
    // absorption may have merged close spawns, but nothing is lost silently
    assert!(sim.live_count() + sim.pending_removal_count() <= 101);
    assert!(sim.live_count() > 0);
    assert_eq!(sim.ticks(), 5);
}
