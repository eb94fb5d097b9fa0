mod tick;

pub use tick::{FixedTimestep, SimulationContext};
