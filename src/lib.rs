//! # rs_gravity
//!
//! A Barnes-Hut n-body gravity simulation library.
//!
//! The [`nbody`] module holds the core: a spatial quadtree ([`nbody::QuadTree`])
//! that clusters bodies by region and tracks per-subtree center-of-mass, a
//! force evaluator applying the multipole acceptance criterion, and a
//! [`nbody::Simulation`] stepper that advances the world one driver-controlled
//! tick at a time.
//!
//! ```
//! use rs_gravity::nbody::{Quad, Simulation};
//! use rs_gravity::utils::SimConstants;
//!
//! let bounds = Quad { cx: 0.0, cy: 0.0, half_size: 128.0 };
//! let mut sim = Simulation::new(bounds, SimConstants::default())
//!     .expect("valid configuration");
//!
//! sim.add_body((-10.0, 0.0), (0.0, 0.0), 50.0, 1.0).expect("valid body");
//! sim.add_body((10.0, 0.0), (0.0, 0.0), 50.0, 1.0).expect("valid body");
//!
//! sim.step(0.016).expect("step");
//! assert_eq!(sim.ticks(), 1);
//! assert_eq!(sim.live_count(), 2);
//! ```
pub mod utils;
pub mod models;
pub mod nbody;

/// ### General helper function
/// - Asserts that two floating point numbers are approximately equal.
///
/// ### Arguments
///
/// * `a` - The first floating point number.
/// * `b` - The second floating point number.
/// * `epsilon` - The maximum difference between `a` and `b` for them to be considered equal.
/// * `optional_message` - An optional message to display if the assertion fails.
///
pub fn assert_float_eq(a: f64, b: f64, epsilon: f64, optional_message: Option<&str>) {
    match optional_message {
        Some(message) => assert!((a - b).abs() < epsilon, "a: {:?},\nb: {:?},\nepsilon: {:?},\n message: {:?}", a, b, epsilon, message),
        None => assert!((a - b).abs() < epsilon, "Expected {} to be approximately equal to {} (epsilon: {})", a, b, epsilon),
    }
}
