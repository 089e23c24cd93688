//! The simulation stepper: tree maintenance, force pass, collision
//! resolution, integration, and sweep, once per driver tick.

use log::debug;
use rayon::prelude::*;

use crate::nbody::{
    canonical_pairs, compute_net_force, resolve_absorption, Body, ForcePass, Quad, QuadTree,
};
use crate::utils::{SimConstants, SimError};

/// A complete Barnes-Hut n-body simulation.
///
/// Owns the body set, the quadtree, the configuration knobs, and a bounded
/// worker pool. There is no global state: the driver holds one `Simulation`
/// and calls [`Simulation::step`] whenever it wants time to advance, which
/// makes pausing trivial — a skipped tick simply keeps the previous
/// tree and force snapshot intact.
///
/// Each tick runs in strictly separated phases, so the parallel force walk
/// never observes a tree under mutation:
///
/// 1. tree maintenance — full parallel rebuild every `rebuild_interval`
///    ticks (or after any structural change), incremental relocation repair
///    otherwise
/// 2. read-only parallel force pass over every live body
/// 3. serial, deterministic collision resolution (absorption)
/// 4. Euler integration scaled by `dt × time_scale`, then relocation of
///    bodies that moved out of their node
/// 5. sweep of bodies flagged for removal
///
/// # Examples
///
/// ```
/// use rs_gravity::nbody::{Quad, Simulation};
/// use rs_gravity::utils::SimConstants;
///
/// let bounds = Quad { cx: 0.0, cy: 0.0, half_size: 64.0 };
/// let mut sim = Simulation::new(bounds, SimConstants::default()).expect("config");
/// sim.add_body((-4.0, 0.0), (0.0, 0.0), 10.0, 0.5).expect("body");
/// sim.add_body((4.0, 0.0), (0.0, 0.0), 10.0, 0.5).expect("body");
///
/// sim.step(0.016).expect("step");
/// assert_eq!(sim.live_count(), 2);
/// ```
pub struct Simulation {
    bodies: Vec<Body>,
    tree: QuadTree,
    constants: SimConstants,
    pool: rayon::ThreadPool,
    ticks: u64,
    next_id: u64,
    rebuild_needed: bool,
}

impl Simulation {
    /// Creates a simulation over the given world box.
    ///
    /// The worker pool is bounded to `available_parallelism − 1` threads
    /// (at least one), leaving a core for the driver.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::InvalidBounds`] for a degenerate world box, or the
    /// validation error of a bad constants knob.
    pub fn new(bounds: Quad, constants: SimConstants) -> Result<Self, SimError> {
        if !bounds.cx.is_finite()
            || !bounds.cy.is_finite()
            || !bounds.half_size.is_finite()
            || bounds.half_size <= 0.0
        {
            return Err(SimError::InvalidBounds);
        }
        constants.validate()?;
        let workers = std::thread::available_parallelism()
            .map(|n| n.get().saturating_sub(1))
            .unwrap_or(1)
            .max(1);
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .build()
            .map_err(|e| SimError::CalculationError(e.to_string()))?;
        Ok(Simulation {
            bodies: Vec::new(),
            tree: QuadTree::new(bounds, constants.max_depth),
            constants,
            pool,
            ticks: 0,
            next_id: 0,
            rebuild_needed: false,
        })
    }

    /// Adds a body and returns its stable id.
    ///
    /// A body placed outside the world box is kept in the body list but
    /// excluded from the tree (and therefore from force evaluation) until it
    /// is swept.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::InvalidBody`] for non-positive mass or non-finite
    /// state.
    pub fn add_body(
        &mut self,
        position: (f64, f64),
        velocity: (f64, f64),
        mass: f64,
        radius: f64,
    ) -> Result<u64, SimError> {
        let body = Body::new(self.next_id, position, velocity, mass, radius)?;
        let id = body.id;
        self.next_id += 1;
        let slot = self.bodies.len();
        self.bodies.push(body);
        if self.rebuild_needed {
            // the tree still references pre-sweep slots; a fresh build picks
            // the new body up along the way
            self.rebuild_tree();
        } else {
            self.tree.insert(slot, &mut self.bodies);
        }
        Ok(id)
    }

    /// Flags a body for removal; it is swept at the end of the next tick.
    /// Returns `false` for an unknown or already-flagged id.
    pub fn remove_body(&mut self, id: u64) -> bool {
        if let Some(body) = self.bodies.iter_mut().find(|b| b.id == id) {
            if !body.marked_for_removal {
                body.marked_for_removal = true;
                return true;
            }
        }
        false
    }

    /// Advances the simulation by one tick of `dt` seconds (before the
    /// global time-scale multiplier).
    ///
    /// # Errors
    ///
    /// Returns [`SimError::InvalidTimeStep`] for a non-positive or
    /// non-finite `dt`, or a constants validation error if a knob was set to
    /// an unusable value between ticks.
    pub fn step(&mut self, dt: f64) -> Result<(), SimError> {
        if !dt.is_finite() || dt <= 0.0 {
            return Err(SimError::InvalidTimeStep);
        }
        self.constants.validate()?;
        let dt_eff = self.constants.effective_dt(dt);

        // phase 1: tree maintenance, fully before any force reads
        if self.rebuild_needed || self.ticks % self.constants.rebuild_interval == 0 {
            self.rebuild_tree();
        }

        // phase 2: read-only parallel force pass
        let tree = &self.tree;
        let bodies = &self.bodies;
        let constants = self.constants;
        let passes: Vec<ForcePass> = self.pool.install(|| {
            (0..bodies.len())
                .into_par_iter()
                .map(|slot| compute_net_force(tree, slot, bodies, &constants))
                .collect()
        });

        // phase 3: serial, deterministic collision resolution
        let pairs = canonical_pairs(passes.iter().flat_map(|p| p.collisions.iter().copied()));
        let mut merged = 0usize;
        for (first, second) in pairs {
            if resolve_absorption(first, second, &mut self.bodies).is_some() {
                merged += 1;
            }
        }
        if merged > 0 {
            debug!("tick {}: {} absorption merges", self.ticks, merged);
            // masses changed; incremental repair would subtract stale terms
            self.rebuild_needed = true;
        }

        // phase 4: integration, then tree repair for bodies that moved
        for (slot, pass) in passes.iter().enumerate() {
            let body = &mut self.bodies[slot];
            if body.marked_for_removal {
                continue;
            }
            body.accumulate_force(pass.force.0, pass.force.1);
        }
        // Relocation happens right after each body's own integration: a
        // body not yet integrated still sits exactly where its aggregate
        // contribution was recorded, so reinsertions triggered by earlier
        // bodies (leaf subdivision pushing a resident down) stay consistent.
        for slot in 0..self.bodies.len() {
            if self.bodies[slot].marked_for_removal {
                continue;
            }
            let prev = self.bodies[slot].position;
            self.bodies[slot].integrate(dt_eff);
            if !self.rebuild_needed && !self.tree.relocate(slot, prev, &mut self.bodies) {
                // left the configured world: drop it
                self.bodies[slot].marked_for_removal = true;
            }
        }

        // phase 5: sweep
        self.sweep();
        self.ticks += 1;
        Ok(())
    }

    fn rebuild_tree(&mut self) {
        self.tree.set_max_depth(self.constants.max_depth);
        let slots: Vec<usize> = (0..self.bodies.len()).collect();
        self.tree
            .rebuild_parallel(&slots, &mut self.bodies, &self.pool);
        self.rebuild_needed = false;
    }

    fn sweep(&mut self) {
        let before = self.bodies.len();
        if self.bodies.iter().any(|b| b.marked_for_removal) {
            self.bodies.retain(|b| !b.marked_for_removal);
            debug!("swept {} bodies", before - self.bodies.len());
            // slots shifted; the tree is stale until the next tick's rebuild
            self.rebuild_needed = true;
        }
    }

    pub fn bodies(&self) -> &[Body] {
        &self.bodies
    }

    /// Looks a body up by its stable id.
    pub fn body(&self, id: u64) -> Option<&Body> {
        self.bodies.iter().find(|b| b.id == id)
    }

    /// Read access to the tree, e.g. for drawing node boundaries.
    pub fn tree(&self) -> &QuadTree {
        &self.tree
    }

    pub fn constants(&self) -> &SimConstants {
        &self.constants
    }

    /// Adjusts the global time-scale multiplier between ticks.
    pub fn set_time_scale(&mut self, time_scale: f64) -> Result<(), SimError> {
        let mut constants = self.constants;
        constants.time_scale = time_scale;
        constants.validate()?;
        self.constants = constants;
        Ok(())
    }

    /// Adjusts the acceptance threshold between ticks.
    pub fn set_theta(&mut self, theta: f64) -> Result<(), SimError> {
        let mut constants = self.constants;
        constants.theta = theta;
        constants.validate()?;
        self.constants = constants;
        Ok(())
    }

    /// Replaces the whole constants block between ticks.
    pub fn set_constants(&mut self, constants: SimConstants) -> Result<(), SimError> {
        constants.validate()?;
        if constants.max_depth != self.constants.max_depth {
            // the cap shapes the tree itself, not just its traversal
            self.rebuild_needed = true;
        }
        self.constants = constants;
        Ok(())
    }

    /// Bodies alive (not flagged for removal).
    pub fn live_count(&self) -> usize {
        self.bodies.iter().filter(|b| !b.marked_for_removal).count()
    }

    /// Bodies flagged but not yet swept.
    pub fn pending_removal_count(&self) -> usize {
        self.bodies.iter().filter(|b| b.marked_for_removal).count()
    }

    /// Ticks elapsed since construction.
    pub fn ticks(&self) -> u64 {
        self.ticks
    }
}
