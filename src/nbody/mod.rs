mod body;
mod quadtree;
mod forces;
mod collisions;
mod stepper;
#[cfg(feature = "scenarios")]
mod scenario;

pub use body::*;

pub use quadtree::*;

pub use forces::*;

pub use collisions::*;

pub use stepper::*;

#[cfg(feature = "scenarios")]
pub use scenario::*;

#[cfg(test)]
mod quadtree_tests;
#[cfg(test)]
#[cfg(feature = "scenarios")]
mod scenario_tests;
