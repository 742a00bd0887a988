mod engine;
mod state;

pub use engine::{
    next_rotation, winner_index, SelectionEngine, SpinResult, MAX_FULL_SPINS, MIN_FULL_SPINS,
    POINTER_OFFSET_DEG,
};
pub use state::{SpinStatus, WheelState};
