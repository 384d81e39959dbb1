/// Implemented RL algorithms
pub mod algo;

/// Implementations of strategies for time-decaying hyperparameters
pub mod decay;

/// Data structures
pub mod ds;

/// Environment
pub mod env;

/// Exploration policies
pub mod exploration;

/// Transitions
pub mod memory;

/// `.npy` array files
pub mod npy;

/// The drone navigation environment
pub mod gym;

/// Terminal rendering of the grid
#[cfg(feature = "viz")]
pub mod viz;

mod error;
mod util;

pub use error::Error;
