use std::{fmt, path::PathBuf, time::Duration};

/// One of the two processes the launcher manages.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub enum ProcessName {
    Backend,
    Frontend,
}

impl ProcessName {
    pub const ALL: [ProcessName; 2] = [ProcessName::Backend, ProcessName::Frontend];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ProcessName::Backend => "backend",
            ProcessName::Frontend => "frontend",
        }
    }
}

impl fmt::Display for ProcessName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An external executable that may be installed under several names.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Tool {
    pub label: String,
    pub candidates: Vec<String>,
    pub version_args: Vec<String>,
}

impl Tool {
    #[must_use]
    pub fn new(label: impl Into<String>, candidates: Vec<String>) -> Self {
        Self {
            label: label.into(),
            candidates,
            version_args: vec!["--version".to_owned()],
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Service {
    pub name: ProcessName,
    /// Executable names tried in order until one spawns.
    pub candidates: Vec<String>,
    pub args: Vec<String>,
    pub cwd: PathBuf,
    pub port: u16,
    pub health_path: Option<String>,
}

impl Service {
    /// URL printed once the service is considered ready.
    #[must_use]
    pub fn url(&self) -> String {
        match &self.health_path {
            Some(path) => format!("http://localhost:{}{path}", self.port),
            None => format!("http://localhost:{}", self.port),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Timing {
    pub settle_delay: Duration,
    pub stop_timeout: Duration,
    pub poll_interval: Duration,
    pub readiness_attempts: u32,
    pub waiting_notice_every: u32,
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            settle_delay: Duration::from_secs(2),
            stop_timeout: Duration::from_secs(5),
            poll_interval: Duration::from_secs(1),
            readiness_attempts: 30,
            waiting_notice_every: 5,
        }
    }
}

/// Everything the launcher needs to bring both services up.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LaunchPlan {
    pub project_root: PathBuf,
    pub runtime: Tool,
    pub package_manager: Tool,
    pub backend: Service,
    pub frontend: Service,
    pub timing: Timing,
}

impl LaunchPlan {
    #[must_use]
    pub fn service(&self, name: ProcessName) -> &Service {
        match name {
            ProcessName::Backend => &self.backend,
            ProcessName::Frontend => &self.frontend,
        }
    }
}
