//! Domain types for the stream supervisor.
//!
//! Pure data with no infrastructure dependencies: the loopback device
//! identity, the state-machine phase, restart bookkeeping and the activity
//! record maintained by the output monitor.

mod activity;
mod device;
mod restart;
mod signal;
mod state;

pub use activity::ActivityState;
pub use device::LoopbackDevice;
pub use restart::{RestartDecision, RestartPolicy, RestartState};
pub use signal::StreamSignal;
pub use state::SupervisorState;
