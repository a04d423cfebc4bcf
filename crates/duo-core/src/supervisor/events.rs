use std::{fmt, time::Duration};

use duo_types::ProcessName;

/// Milestones recognised in the frontend dev-server output.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Notice {
    CompiledSuccessfully,
    Available { url: String },
    WebpackCompiled,
    ReadyForDevelopment,
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Notice::CompiledSuccessfully => f.write_str("Compiled successfully!"),
            Notice::Available { url } => write!(f, "Available at {url}"),
            Notice::WebpackCompiled => f.write_str("Webpack compilation complete!"),
            Notice::ReadyForDevelopment => f.write_str("Ready for development!"),
        }
    }
}

/// Result of a single stop attempt.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StopOutcome {
    /// There was no live handle; nothing to do.
    NotRunning,
    /// Exited after the graceful request, with this code.
    Terminated(i32),
    /// Did not exit within the stop timeout and was killed.
    Killed,
    /// Both the graceful request and the kill failed.
    Failed(String),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ShutdownReport {
    pub backend: StopOutcome,
    pub frontend: StopOutcome,
}

impl ShutdownReport {
    #[must_use]
    pub fn get(&self, name: ProcessName) -> &StopOutcome {
        match name {
            ProcessName::Backend => &self.backend,
            ProcessName::Frontend => &self.frontend,
        }
    }
}

/// Why a run ended.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Outcome {
    Interrupted,
    SpawnFailed {
        process: ProcessName,
        reason: String,
    },
    ReadinessTimeout,
    UnexpectedExit {
        process: ProcessName,
        code: Option<i32>,
    },
}

impl Outcome {
    /// Only an operator interrupt counts as a clean run.
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Interrupted)
    }

    #[must_use]
    pub fn exit_code(&self) -> u8 {
        u8::from(!self.is_success())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RunReport {
    pub outcome: Outcome,
    pub shutdown: ShutdownReport,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SupervisorEvent {
    Log {
        process: ProcessName,
        line: String,
    },
    Notice {
        process: ProcessName,
        notice: Notice,
    },
    Starting {
        process: ProcessName,
    },
    Started {
        process: ProcessName,
        program: String,
        pid: Option<u32>,
    },
    SpawnFailed {
        process: ProcessName,
        message: String,
    },
    Waiting {
        elapsed: Duration,
    },
    Ready {
        frontend_url: String,
        backend_url: String,
    },
    Exited {
        process: ProcessName,
        code: i32,
    },
    /// The status of a process could not be read; it is treated as gone.
    Lost {
        process: ProcessName,
        message: String,
    },
    ReadinessTimeout {
        waited: Duration,
    },
    ShuttingDown,
    Stopped {
        process: ProcessName,
        outcome: StopOutcome,
    },
}
