use std::{fmt::Debug, path::PathBuf, pin::Pin};

use futures::Stream;

pub type BoxStream<T> = Pin<Box<dyn Stream<Item = T> + Send>>;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommandSpec {
    pub name: String,
    pub cmd: Vec<String>,
    pub cwd: Option<PathBuf>,
}

impl CommandSpec {
    /// The executable, or `None` for an empty command line.
    #[must_use]
    pub fn program(&self) -> Option<&str> {
        self.cmd.first().map(String::as_str)
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct ProcId(pub u64);

/// A freshly spawned child. Output arrives as decoded lines without line terminators.
pub struct Spawned {
    pub id: ProcId,
    pub pid: Option<u32>,
    pub stdout: BoxStream<String>,
    pub stderr: BoxStream<String>,
}

impl Debug for Spawned {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Spawned")
            .field("id", &self.id)
            .field("pid", &self.pid)
            .field("stdout", &"<stream>")
            .field("stderr", &"<stream>")
            .finish()
    }
}
