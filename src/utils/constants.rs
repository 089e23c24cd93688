use crate::utils;

pub const DEFAULT_SIM_CONSTANTS: utils::SimConstants = utils::SimConstants {
    gravitational_constant: 6.67430e-11,
    theta: 0.95,
    softening: 1e-9,
    max_depth: 16,
    time_scale: 1.0,
    force_scale: 1.0,
    rebuild_interval: 8,
};
