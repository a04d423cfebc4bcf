use std::{future::Future, time::Duration};

use duo_types::{LaunchPlan, ProcessName, Timing};
use tokio::{sync::mpsc, time::sleep};

use crate::{
    error::{Error, Result},
    process_manager::{CommandSpec, ProcId, ProcessManager},
    supervisor::{
        events::{Outcome, RunReport, ShutdownReport, StopOutcome, SupervisorEvent},
        monitor::{self, Classifier},
        state::{Phase, SupervisorState},
    },
};

const EVENT_BUFFER: usize = 100;
const READER_JOIN_TIMEOUT: Duration = Duration::from_millis(500);

#[derive(Debug, PartialEq, Eq)]
enum Liveness {
    Running,
    Exited(Option<i32>),
}

/// Owns both managed processes and drives them from startup to shutdown.
///
/// A supervisor is meant to `run` once; afterwards its processes are stopped and its
/// readers are gone.
#[derive(Debug)]
pub struct Supervisor<P: ProcessManager> {
    process_manager: P,
    state: SupervisorState,
    timing: Timing,
    phase: Phase,
    output_tx: mpsc::Sender<SupervisorEvent>,
}

impl<P: ProcessManager> Supervisor<P> {
    pub fn new(plan: &LaunchPlan, process_manager: P) -> (Self, mpsc::Receiver<SupervisorEvent>) {
        let (output_tx, output_rx) = mpsc::channel(EVENT_BUFFER);

        (
            Self {
                process_manager,
                state: SupervisorState::new(plan),
                timing: plan.timing.clone(),
                phase: Phase::Starting,
                output_tx,
            },
            output_rx,
        )
    }

    #[must_use]
    pub fn phase(&self) -> Phase {
        self.phase
    }

    #[must_use]
    pub fn state(&self) -> &SupervisorState {
        &self.state
    }

    /// Start both processes, wait for them, and watch them until `interrupt` resolves
    /// or one of them exits. Both processes are stopped before this returns.
    pub async fn run<F>(&mut self, interrupt: F) -> RunReport
    where
        F: Future<Output = ()>,
    {
        let outcome = tokio::select! {
            outcome = self.start_and_monitor() => outcome,
            () = interrupt => {
                tracing::info!("Interrupt received");
                Outcome::Interrupted
            }
        };

        tracing::info!("Run finished in phase {:?}: {outcome:?}", self.phase);

        let shutdown = self.shutdown().await;
        RunReport { outcome, shutdown }
    }

    async fn start_and_monitor(&mut self) -> Outcome {
        self.enter(Phase::Starting);

        if let Err(outcome) = self.start(ProcessName::Backend).await {
            return outcome;
        }

        sleep(self.timing.settle_delay).await;

        if let Err(outcome) = self.start(ProcessName::Frontend).await {
            return outcome;
        }

        if !self.wait_until_ready().await {
            let waited = self.timing.poll_interval * self.timing.readiness_attempts;
            tracing::error!("Servers failed to start within {waited:?}");
            self.emit(SupervisorEvent::ReadinessTimeout { waited }).await;
            return Outcome::ReadinessTimeout;
        }

        self.enter(Phase::Ready);
        self.emit(SupervisorEvent::Ready {
            frontend_url: self.state.frontend.service.url(),
            backend_url: self.state.backend.service.url(),
        })
        .await;

        self.enter(Phase::Monitoring);
        self.watch().await
    }

    async fn start(&mut self, name: ProcessName) -> std::result::Result<(), Outcome> {
        self.emit(SupervisorEvent::Starting { process: name }).await;

        match self.spawn(name).await {
            Ok(_) => Ok(()),
            Err(err) => {
                tracing::error!("Failed to start {name}: {err}");
                self.emit(SupervisorEvent::SpawnFailed {
                    process: name,
                    message: err.to_string(),
                })
                .await;

                Err(Outcome::SpawnFailed {
                    process: name,
                    reason: err.to_string(),
                })
            }
        }
    }

    /// Spawn a managed process, trying its candidate executables in order, and start
    /// its output reader.
    ///
    /// # Errors
    ///
    /// Returns `Error::AlreadyRunning` if the process still has a live handle,
    /// `Error::SpawnFailure` if no candidate could be found, or the first spawn error
    /// that is not about a missing executable.
    pub async fn spawn(&mut self, name: ProcessName) -> Result<ProcId> {
        let process = self.state.get(name);
        if process.is_running() {
            return Err(Error::AlreadyRunning(name));
        }

        let service = process.service.clone();
        let classifier = Classifier::for_service(&service);

        for program in &service.candidates {
            let mut cmd = Vec::with_capacity(service.args.len() + 1);
            cmd.push(program.clone());
            cmd.extend(service.args.iter().cloned());

            let spec = CommandSpec {
                name: name.to_string(),
                cmd,
                cwd: Some(service.cwd.clone()),
            };

            match self.process_manager.spawn(spec).await {
                Ok(spawned) => {
                    let reader = monitor::spawn_reader(
                        name,
                        spawned.stdout,
                        spawned.stderr,
                        classifier,
                        self.state.active.clone(),
                        self.output_tx.clone(),
                    );

                    let process = self.state.get_mut(name);
                    process.handle = Some(spawned.id);
                    process.pid = spawned.pid;
                    if let Some(previous) = process.reader.replace(reader) {
                        previous.abort();
                    }

                    tracing::info!("Started {name} with `{program}` (pid {:?})", spawned.pid);
                    self.emit(SupervisorEvent::Started {
                        process: name,
                        program: program.clone(),
                        pid: spawned.pid,
                    })
                    .await;

                    return Ok(spawned.id);
                }
                Err(err) if err.is_missing_executable() => {
                    tracing::debug!("`{program}` is not usable for {name}: {err}");
                }
                Err(err) => return Err(err),
            }
        }

        Err(Error::SpawnFailure {
            process: name,
            candidates: service.candidates,
        })
    }

    /// Non-blocking status check. A confirmed exit clears the handle.
    async fn poll(&mut self, name: ProcessName) -> Liveness {
        let Some(id) = self.state.get(name).handle else {
            return Liveness::Exited(None);
        };

        match self.process_manager.wait(id, Duration::ZERO).await {
            Ok(None) => Liveness::Running,
            Ok(Some(code)) => {
                tracing::warn!("{name} exited with code {code}");
                self.state.get_mut(name).handle = None;
                self.emit(SupervisorEvent::Exited {
                    process: name,
                    code,
                })
                .await;
                Liveness::Exited(Some(code))
            }
            Err(err) => {
                tracing::error!("Failed to poll {name}: {err}");
                self.state.get_mut(name).handle = None;
                self.emit(SupervisorEvent::Lost {
                    process: name,
                    message: err.to_string(),
                })
                .await;
                Liveness::Exited(None)
            }
        }
    }

    /// Ready means both processes are still alive; nothing is probed over the network.
    async fn wait_until_ready(&mut self) -> bool {
        let interval = self.timing.poll_interval;
        let every = self.timing.waiting_notice_every;

        for attempt in 0..self.timing.readiness_attempts {
            let backend = self.poll(ProcessName::Backend).await;
            let frontend = self.poll(ProcessName::Frontend).await;
            if backend == Liveness::Running && frontend == Liveness::Running {
                return true;
            }

            if attempt % every == 0 {
                self.emit(SupervisorEvent::Waiting {
                    elapsed: interval * attempt,
                })
                .await;
            }

            sleep(interval).await;
        }

        false
    }

    async fn watch(&mut self) -> Outcome {
        loop {
            for name in ProcessName::ALL {
                if let Liveness::Exited(code) = self.poll(name).await {
                    tracing::error!("{name} process died");
                    return Outcome::UnexpectedExit {
                        process: name,
                        code,
                    };
                }
            }

            sleep(self.timing.poll_interval).await;
        }
    }

    /// Stop one process: terminate, wait up to the stop timeout, then kill.
    ///
    /// Never fails; a missing handle is a no-op and every error ends up in the outcome.
    pub async fn stop(&mut self, name: ProcessName) -> StopOutcome {
        let Some(id) = self.state.get_mut(name).handle.take() else {
            tracing::debug!("{name} is not running");
            return StopOutcome::NotRunning;
        };

        let outcome = match self.process_manager.shutdown(id).await {
            Ok(()) => match self.process_manager.wait(id, self.timing.stop_timeout).await {
                Ok(Some(code)) => StopOutcome::Terminated(code),
                Ok(None) => {
                    tracing::warn!(
                        "{name} did not exit within {:?}, killing it",
                        self.timing.stop_timeout
                    );
                    self.force_kill(name, id).await
                }
                Err(err) => {
                    tracing::warn!("Failed to wait for {name}: {err}");
                    self.force_kill(name, id).await
                }
            },
            Err(err) => {
                tracing::warn!("Graceful shutdown of {name} failed: {err}");
                self.force_kill(name, id).await
            }
        };

        tracing::info!("Stopped {name}: {outcome:?}");
        self.emit(SupervisorEvent::Stopped {
            process: name,
            outcome: outcome.clone(),
        })
        .await;

        outcome
    }

    async fn force_kill(&mut self, name: ProcessName, id: ProcId) -> StopOutcome {
        match self.process_manager.kill(id).await {
            Ok(()) => StopOutcome::Killed,
            Err(Error::AlreadyExited(_)) => StopOutcome::NotRunning,
            Err(err) => {
                tracing::error!("Failed to kill {name}: {err}");
                StopOutcome::Failed(err.to_string())
            }
        }
    }

    /// Cancel the readers and stop both processes. Safe to call more than once.
    pub async fn shutdown(&mut self) -> ShutdownReport {
        if self.phase == Phase::Stopped {
            tracing::debug!("Shutdown already completed");
            return ShutdownReport {
                backend: StopOutcome::NotRunning,
                frontend: StopOutcome::NotRunning,
            };
        }

        self.enter(Phase::ShuttingDown);
        self.state.active.cancel();
        self.emit(SupervisorEvent::ShuttingDown).await;

        let backend = self.stop(ProcessName::Backend).await;
        let frontend = self.stop(ProcessName::Frontend).await;

        self.join_readers().await;
        self.enter(Phase::Stopped);

        ShutdownReport { backend, frontend }
    }

    async fn join_readers(&mut self) {
        for name in ProcessName::ALL {
            let Some(mut reader) = self.state.get_mut(name).reader.take() else {
                continue;
            };

            match tokio::time::timeout(READER_JOIN_TIMEOUT, &mut reader).await {
                Ok(Ok(())) => {}
                Ok(Err(err)) => tracing::warn!("Reader for {name} failed: {err}"),
                Err(_) => {
                    tracing::warn!("Reader for {name} did not finish, aborting it");
                    reader.abort();
                }
            }
        }
    }

    fn enter(&mut self, phase: Phase) {
        if self.phase != phase {
            tracing::debug!("Phase {:?} -> {phase:?}", self.phase);
            self.phase = phase;
        }
    }

    async fn emit(&self, event: SupervisorEvent) {
        if let Err(err) = self.output_tx.send(event).await {
            tracing::warn!("Failed to send supervisor event: {err}");
        }
    }
}
