use crate::models::{Force2D, FromCoordinates, Velocity2D};
use crate::utils::SimError;

/// A single gravitating body.
///
/// Holds the mutable physical state the stepper advances every tick:
/// position, velocity, the force accumulated during the current tick's tree
/// walk, mass, and display radius. `node` is the arena index of the quadtree
/// leaf currently holding the body, used for fast relocation when the body
/// moves out of that leaf's bounds.
///
/// # Examples
///
/// ```
/// use rs_gravity::nbody::Body;
///
/// let body = Body::new(1, (0.5, -0.5), (1.0, 0.0), 2.0, 0.1)
///     .expect("valid body");
/// assert_eq!(body.mass, 2.0);
/// assert!(!body.marked_for_removal);
///
/// // Non-positive mass is rejected.
/// assert!(Body::new(2, (0.0, 0.0), (0.0, 0.0), 0.0, 0.1).is_err());
/// ```
#[derive(Debug, Clone)]
pub struct Body {
    /// Unique identifier, stable across tree rebuilds and sweeps.
    pub id: u64,
    pub position: (f64, f64),
    pub velocity: Velocity2D,
    /// Force accumulated by the current tick's tree walk; cleared on integration.
    pub force: Force2D,
    pub mass: f64,
    pub radius: f64,
    /// Set when the body has been absorbed or left the world; swept by the stepper.
    pub marked_for_removal: bool,
    /// Arena index of the containing quadtree node, if the body is in the tree.
    pub(crate) node: Option<usize>,
}

impl Body {
    /// Creates a new body, validating the physical state.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::InvalidBody`] if `mass` is non-positive or any of
    /// position, velocity, mass, or radius is non-finite, or `radius` is
    /// negative.
    pub fn new(
        id: u64,
        position: (f64, f64),
        velocity: (f64, f64),
        mass: f64,
        radius: f64,
    ) -> Result<Self, SimError> {
        if !mass.is_finite() || mass <= 0.0 {
            return Err(SimError::InvalidBody("mass must be positive and finite".to_string()));
        }
        if !position.0.is_finite() || !position.1.is_finite() {
            return Err(SimError::InvalidBody("position must be finite".to_string()));
        }
        if !velocity.0.is_finite() || !velocity.1.is_finite() {
            return Err(SimError::InvalidBody("velocity must be finite".to_string()));
        }
        if !radius.is_finite() || radius < 0.0 {
            return Err(SimError::InvalidBody("radius must be non-negative and finite".to_string()));
        }
        Ok(Body {
            id,
            position,
            velocity: Velocity2D::from_coord(velocity),
            force: Force2D::default(),
            mass,
            radius,
            marked_for_removal: false,
            node: None,
        })
    }

    /// Adds a force contribution to this tick's accumulator.
    pub fn accumulate_force(&mut self, fx: f64, fy: f64) {
        self.force.x += fx;
        self.force.y += fy;
    }

    /// Advances the body by `dt` using the accumulated force, then clears it.
    ///
    /// Euler integration: `v += F/m · dt`, `p += v · dt`.
    pub fn integrate(&mut self, dt: f64) {
        let ax = self.force.x / self.mass;
        let ay = self.force.y / self.mass;
        self.velocity.x += ax * dt;
        self.velocity.y += ay * dt;
        self.position.0 += self.velocity.x * dt;
        self.position.1 += self.velocity.y * dt;
        self.force.clear();
    }

    /// Distance between this body's center and another's.
    pub fn distance_to(&self, other: &Body) -> f64 {
        let dx = self.position.0 - other.position.0;
        let dy = self.position.1 - other.position.1;
        (dx * dx + dy * dy).sqrt()
    }

    /// Two bodies collide when their center distance is below the sum of
    /// their radii.
    pub fn collides_with(&self, other: &Body) -> bool {
        self.distance_to(other) < self.radius + other.radius
    }
}
