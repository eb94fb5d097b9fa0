mod config;
mod controller;
mod input;
mod state;

pub use config::{ModeTuning, MovementTuning, TuningError};
pub use controller::MovementController;
pub use input::{InputFlags, MovementInput};
pub use state::{MovementMode, MovementState};
