//! Random world population for demos, tests, and benches.

use std::f64::consts::PI;

use crate::nbody::Simulation;
use crate::utils::{SimConstants, SimError};

/// Seed values for one body, ready to feed to [`Simulation::add_body`].
#[derive(Debug, Clone, Copy)]
pub struct BodySpec {
    pub position: (f64, f64),
    pub velocity: (f64, f64),
    pub mass: f64,
    pub radius: f64,
}

/// Spawns a central attractor plus `count` bodies on near-circular orbits.
///
/// Bodies are placed in polar coordinates with a denser concentration toward
/// the center, each given the tangential speed of a circular orbit around
/// the attractor with a little jitter, so the disc holds together for many
/// ticks instead of dispersing immediately.
pub fn spawn_disc(
    count: usize,
    disc_radius: f64,
    attractor_mass: f64,
    constants: &SimConstants,
) -> Vec<BodySpec> {
    let mut specs = Vec::with_capacity(count + 1);
    specs.push(BodySpec {
        position: (0.0, 0.0),
        velocity: (0.0, 0.0),
        mass: attractor_mass,
        radius: 2.0,
    });

    for _ in 0..count {
        let radius = disc_radius * (0.05 + 0.95 * rand::random::<f64>().sqrt());
        let angle = 2.0 * PI * rand::random::<f64>();
        let x = radius * angle.cos();
        let y = radius * angle.sin();

        // circular orbital speed, jittered a few percent
        let speed = (constants.gravitational_constant * attractor_mass / radius).sqrt()
            * (0.95 + 0.1 * rand::random::<f64>());
        let tangent = angle + PI / 2.0;

        specs.push(BodySpec {
            position: (x, y),
            velocity: (speed * tangent.cos(), speed * tangent.sin()),
            mass: 0.1 + 0.9 * rand::random::<f64>(),
            radius: 0.2 + 0.3 * rand::random::<f64>(),
        });
    }

    specs
}

/// Populates `sim` with a [`spawn_disc`] world.
pub fn populate_disc(
    sim: &mut Simulation,
    count: usize,
    disc_radius: f64,
    attractor_mass: f64,
) -> Result<(), SimError> {
    let constants = *sim.constants();
    for spec in spawn_disc(count, disc_radius, attractor_mass, &constants) {
        sim.add_body(spec.position, spec.velocity, spec.mass, spec.radius)?;
    }
    Ok(())
}
