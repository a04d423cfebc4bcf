mod dependencies;
mod error;
mod process_manager;
mod supervisor;

pub use dependencies::{check_dependencies, resolve, DependencyReport, ResolvedTool};
pub use error::{Error, Result};
#[cfg(unix)]
pub use process_manager::UnixProcessManager;
pub use process_manager::{BoxStream, CommandSpec, ProcId, ProcessManager, Spawned};
pub use supervisor::{
    Classifier, ManagedProcess, Notice, Outcome, Phase, RunReport, ShutdownReport, StopOutcome,
    Supervisor, SupervisorEvent, SupervisorState,
};
