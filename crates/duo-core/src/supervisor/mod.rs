mod events;
mod main;
mod monitor;
mod state;

pub use events::{Notice, Outcome, RunReport, ShutdownReport, StopOutcome, SupervisorEvent};
pub use main::Supervisor;
pub use monitor::Classifier;
pub use state::{ManagedProcess, Phase, SupervisorState};
