mod motion;

pub use motion::*;
