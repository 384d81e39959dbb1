pub mod drone_grid;

pub use drone_grid::{Action, DroneGrid, DroneGridConfig, GridState, Outcome, Pos, RewardShaping};
