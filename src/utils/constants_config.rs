// src/utils/constants_config.rs
use crate::utils::{
    DEFAULT_SIM_CONSTANTS,
    errors::SimError,
};

/// Tunable knobs for a Barnes-Hut simulation.
///
/// Every field may be adjusted by the driver between ticks. `theta` trades
/// accuracy for speed (larger accepts coarser approximations), `time_scale`
/// stretches or shrinks the integration step without touching force accuracy,
/// and `rebuild_interval` controls how many ticks of incremental tree repair
/// run between full rebuilds.
#[derive(Debug, Clone, Copy)]
pub struct SimConstants {
    pub gravitational_constant: f64,
    pub theta: f64,
    pub softening: f64,
    pub max_depth: u32,
    pub time_scale: f64,
    pub force_scale: f64,
    pub rebuild_interval: u64,
}

impl Default for SimConstants {
    fn default() -> Self {
        DEFAULT_SIM_CONSTANTS
    }
}

impl SimConstants {
    pub fn new(
        gravitational_constant: Option<f64>,
        theta: Option<f64>,
        softening: Option<f64>,
        max_depth: Option<u32>,
        time_scale: Option<f64>,
        force_scale: Option<f64>,
        rebuild_interval: Option<u64>,
    ) -> Self {
        let default = DEFAULT_SIM_CONSTANTS;
        Self {
            gravitational_constant: gravitational_constant.unwrap_or(default.gravitational_constant),
            theta: theta.unwrap_or(default.theta),
            softening: softening.unwrap_or(default.softening),
            max_depth: max_depth.unwrap_or(default.max_depth),
            time_scale: time_scale.unwrap_or(default.time_scale),
            force_scale: force_scale.unwrap_or(default.force_scale),
            rebuild_interval: rebuild_interval.unwrap_or(default.rebuild_interval),
        }
    }

    /// Checks every knob for a value the simulation cannot run with.
    pub fn validate(&self) -> Result<(), SimError> {
        if !self.gravitational_constant.is_finite() || self.gravitational_constant < 0.0 {
            return Err(SimError::InvalidConstant);
        }
        if !self.softening.is_finite() || self.softening < 0.0 {
            return Err(SimError::InvalidConstant);
        }
        if !self.theta.is_finite() || self.theta < 0.0 {
            return Err(SimError::InvalidTheta);
        }
        if !self.time_scale.is_finite() || self.time_scale <= 0.0 {
            return Err(SimError::InvalidTimeScale);
        }
        if !self.force_scale.is_finite() || self.force_scale <= 0.0 {
            return Err(SimError::InvalidConstant);
        }
        if self.max_depth > 128 {
            // tree operations recurse one frame per level
            return Err(SimError::CalculationError(
                "max_depth must be at most 128".to_string(),
            ));
        }
        if self.rebuild_interval == 0 {
            return Err(SimError::CalculationError(
                "rebuild_interval must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// The multipole acceptance test: a subtree of width `w` at squared
    /// distance `r²` may stand in for its bodies iff `w² < θ²·r²`.
    ///
    /// A zero distance never passes, so a query body can never accept the
    /// node it sits in.
    #[inline]
    pub fn accepts(&self, width_sq: f64, dist_sq: f64) -> bool {
        width_sq < self.theta * self.theta * dist_sq
    }

    /// Effective integration step for a tick: driver `dt` scaled by the
    /// global time-scale knob.
    #[inline]
    pub fn effective_dt(&self, dt: f64) -> f64 {
        dt * self.time_scale
    }
}
