//! Simulation time control and the frame loop

mod clock;
mod scheduler;
mod state;

pub use clock::*;
pub use scheduler::*;
pub use state::*;
