use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard},
    time::Duration,
};

use async_trait::async_trait;
use tokio_stream::wrappers::ReceiverStream;

use crate::{
    error::{Error, Result},
    process_manager::{BoxStream, CommandSpec, ProcId, ProcessManager, Spawned},
};

/// How a scripted process reacts, keyed by program name.
#[derive(Clone, Debug)]
pub enum MockBehavior {
    /// Spawning fails as if the executable were not installed.
    Missing,
    /// Keeps running until it is stopped.
    RunForever,
    /// Reports running for `polls` status checks, then exits with `code`.
    ExitAfterPolls { polls: usize, code: i32 },
    /// Ignores graceful shutdown, only `kill` stops it.
    IgnoreTerm,
    /// Reports running for `polls` status checks, then the status check itself fails.
    FailAfterPolls { polls: usize },
}

#[derive(Debug)]
struct MockProc {
    program: String,
    behavior: MockBehavior,
    polls: usize,
    terminated: bool,
    killed: bool,
}

#[derive(Debug, Default)]
struct MockState {
    behaviors: HashMap<String, MockBehavior>,
    output: HashMap<String, Vec<String>>,
    spawned: Vec<CommandSpec>,
    shutdowns: Vec<String>,
    kills: Vec<String>,
    procs: Vec<Option<MockProc>>,
}

/// Scripted process manager. Clones share state so a test can inspect what the
/// supervisor did after handing its copy over.
#[derive(Clone, Debug, Default)]
pub struct MockProcessManager {
    state: Arc<Mutex<MockState>>,
}

impl MockProcessManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(self, program: &str, behavior: MockBehavior) -> Self {
        self.lock().behaviors.insert(program.to_owned(), behavior);
        self
    }

    pub fn with_output(self, program: &str, lines: &[&str]) -> Self {
        self.lock().output.insert(
            program.to_owned(),
            lines.iter().map(|l| (*l).to_owned()).collect(),
        );
        self
    }

    pub fn spawned(&self) -> Vec<CommandSpec> {
        self.lock().spawned.clone()
    }

    pub fn shutdowns(&self, program: &str) -> usize {
        self.lock().shutdowns.iter().filter(|p| *p == program).count()
    }

    pub fn kills(&self, program: &str) -> usize {
        self.lock().kills.iter().filter(|p| *p == program).count()
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap()
    }

    fn index(id: ProcId) -> usize {
        usize::try_from(id.0).unwrap()
    }
}

fn stream(lines: Vec<String>) -> BoxStream<String> {
    let (tx, rx) = tokio::sync::mpsc::channel(lines.len().max(1));
    for line in lines {
        tx.try_send(line).unwrap();
    }
    Box::pin(ReceiverStream::new(rx))
}

#[async_trait]
impl ProcessManager for MockProcessManager {
    async fn spawn(&mut self, spec: CommandSpec) -> Result<Spawned> {
        let mut state = self.lock();
        state.spawned.push(spec.clone());

        let Some(program) = spec.program().map(str::to_owned) else {
            return Err(Error::EmptyCommand(spec.name));
        };
        let behavior = state
            .behaviors
            .get(&program)
            .cloned()
            .unwrap_or(MockBehavior::Missing);
        if matches!(behavior, MockBehavior::Missing) {
            return Err(Error::IO(std::io::Error::from(
                std::io::ErrorKind::NotFound,
            )));
        }

        let output = state.output.get(&program).cloned().unwrap_or_default();
        let id = ProcId(state.procs.len() as u64);
        state.procs.push(Some(MockProc {
            program,
            behavior,
            polls: 0,
            terminated: false,
            killed: false,
        }));

        Ok(Spawned {
            id,
            pid: Some(1000 + u32::try_from(id.0).unwrap()),
            stdout: stream(output),
            stderr: stream(Vec::new()),
        })
    }

    async fn shutdown(&mut self, id: ProcId) -> Result<()> {
        let mut state = self.lock();
        let proc = state.procs[Self::index(id)]
            .as_mut()
            .ok_or(Error::AlreadyExited(id))?;
        proc.terminated = true;
        let program = proc.program.clone();
        state.shutdowns.push(program);
        Ok(())
    }

    async fn wait(&mut self, id: ProcId, d: Duration) -> Result<Option<i32>> {
        {
            let mut state = self.lock();
            let slot = &mut state.procs[Self::index(id)];
            let proc = slot.as_mut().ok_or(Error::AlreadyExited(id))?;
            proc.polls += 1;

            if let MockBehavior::FailAfterPolls { polls } = proc.behavior {
                if proc.polls > polls {
                    *slot = None;
                    return Err(Error::IO(std::io::Error::other("status unavailable")));
                }
            }

            let exited = if proc.killed {
                Some(137)
            } else if proc.terminated && !matches!(proc.behavior, MockBehavior::IgnoreTerm) {
                Some(143)
            } else {
                match proc.behavior {
                    MockBehavior::ExitAfterPolls { polls, code } if proc.polls > polls => {
                        Some(code)
                    }
                    _ => None,
                }
            };

            if exited.is_some() {
                *slot = None;
                return Ok(exited);
            }
        }

        if !d.is_zero() {
            tokio::time::sleep(d).await;
        }
        Ok(None)
    }

    async fn kill(&mut self, id: ProcId) -> Result<()> {
        let mut state = self.lock();
        let proc = state.procs[Self::index(id)]
            .as_mut()
            .ok_or(Error::AlreadyExited(id))?;
        proc.killed = true;
        let program = proc.program.clone();
        state.kills.push(program);
        Ok(())
    }
}
