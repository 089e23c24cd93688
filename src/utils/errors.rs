use std::fmt;
use std::error::Error;

/// Represents errors that can occur while configuring or stepping a simulation.
#[derive(Debug, Clone)]
pub enum SimError {
    /// Indicates a malformed body (non-positive mass, non-finite position,
    /// velocity, or radius).
    InvalidBody(String),
    /// Indicates an invalid world bounding box (non-positive or non-finite extent).
    InvalidBounds,
    /// Indicates an invalid opening-criterion threshold (negative or non-finite theta).
    InvalidTheta,
    /// Indicates an invalid global time-scale multiplier.
    InvalidTimeScale,
    /// Indicates an invalid per-tick time step.
    InvalidTimeStep,
    /// Indicates an invalid gravitational constant or softening term.
    InvalidConstant,
    /// A general error for calculations that produce invalid results.
    CalculationError(String),
}

impl fmt::Display for SimError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            SimError::InvalidBody(msg) => write!(f, "Invalid body: {}", msg),
            SimError::InvalidBounds => write!(f, "Invalid world bounds"),
            SimError::InvalidTheta => write!(f, "Invalid acceptance threshold"),
            SimError::InvalidTimeScale => write!(f, "Invalid time-scale multiplier"),
            SimError::InvalidTimeStep => write!(f, "Invalid time step"),
            SimError::InvalidConstant => write!(f, "Invalid physical constant"),
            SimError::CalculationError(msg) => write!(f, "Calculation error: {}", msg),
        }
    }
}

impl Error for SimError {}
