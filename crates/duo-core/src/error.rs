use duo_types::ProcessName;

use crate::process_manager::ProcId;

pub type Result<R, E = Error> = std::result::Result<R, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("io error: {0}")]
    IO(#[from] std::io::Error),

    #[error("{tool} not found (tried {candidates:?})")]
    DependencyMissing {
        tool: String,
        candidates: Vec<String>,
    },

    #[error("could not start {process} (tried {candidates:?})")]
    SpawnFailure {
        process: ProcessName,
        candidates: Vec<String>,
    },

    #[error("{0} is already running")]
    AlreadyRunning(ProcessName),

    #[error("empty command for `{0}`")]
    EmptyCommand(String),

    #[error("unknown process id {0:?}")]
    UnknownProcess(ProcId),

    #[error("process id {0:?} has already exited")]
    AlreadyExited(ProcId),
}

impl Error {
    /// Spawn errors that mean "this executable name is not usable here", so the next
    /// candidate name is worth a try.
    #[must_use]
    pub fn is_missing_executable(&self) -> bool {
        matches!(
            self,
            Error::IO(err) if matches!(
                err.kind(),
                std::io::ErrorKind::NotFound | std::io::ErrorKind::PermissionDenied
            )
        )
    }
}
