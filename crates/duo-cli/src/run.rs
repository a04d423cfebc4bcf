use std::{io::Write, path::PathBuf, process::ExitCode};

use anyhow::{Context, Result};
use duo_core::{
    check_dependencies, DependencyReport, StopOutcome, Supervisor, SupervisorEvent,
    UnixProcessManager,
};
use duo_types::{LaunchPlan, ProcessName};
use tokio::signal::unix::{signal, Signal, SignalKind};

use crate::logger::Logger;

const INSTALL_HINT: &str = "Please install Node.js: https://nodejs.org/";
const RULE: &str = "============================================================";

pub async fn run(file: Option<PathBuf>, project_root: Option<PathBuf>) -> Result<ExitCode> {
    let root = match project_root {
        Some(root) => root,
        None => std::env::current_dir().context("Failed to read the current directory")?,
    };
    let plan = duo_config::load(&root, file.as_deref())
        .with_context(|| format!("Failed to load configuration for {}", root.display()))?;

    let mut logger = Logger::default();
    banner(&mut logger, &plan);

    let dependencies = check_dependencies(&plan.runtime, &plan.package_manager).await;
    if !report_dependencies(&mut logger, &dependencies) {
        return Ok(ExitCode::FAILURE);
    }

    // Children run in their own sessions, so every signal that would end duo has to be
    // caught before the first spawn.
    let mut stop_signals = StopSignals::install().context("Failed to install signal handlers")?;

    let (mut supervisor, mut events) = Supervisor::new(&plan, UnixProcessManager::new());
    let printer = tokio::spawn(async move {
        let mut logger = Logger::default();
        while let Some(event) = events.recv().await {
            render(&mut logger, &event);
        }
    });

    let report = supervisor
        .run(async {
            stop_signals.recv().await;
        })
        .await;
    drop(supervisor);

    if let Err(err) = printer.await {
        tracing::error!("Event printer failed: {err}");
    }

    tracing::info!(
        "Run ended with {:?}; shutdown: {:?}",
        report.outcome,
        report.shutdown
    );

    Ok(ExitCode::from(report.outcome.exit_code()))
}

/// Signals that end a run: Ctrl+C, `kill` and a closed terminal.
struct StopSignals {
    interrupt: Signal,
    terminate: Signal,
    hangup: Signal,
}

impl StopSignals {
    fn install() -> std::io::Result<Self> {
        Ok(Self {
            interrupt: signal(SignalKind::interrupt())?,
            terminate: signal(SignalKind::terminate())?,
            hangup: signal(SignalKind::hangup())?,
        })
    }

    /// Resolves on the first of the signals; returns its name.
    async fn recv(&mut self) -> &'static str {
        let name = tokio::select! {
            Some(()) = self.interrupt.recv() => "SIGINT",
            Some(()) = self.terminate.recv() => "SIGTERM",
            Some(()) = self.hangup.recv() => "SIGHUP",
            else => std::future::pending().await,
        };
        tracing::info!("Received {name}");
        name
    }
}

fn banner<W: Write>(logger: &mut Logger<W>, plan: &LaunchPlan) {
    logger.system(RULE);
    logger.system("duo: backend + frontend launcher");
    logger.system(RULE);
    logger.system(&format!("Project path: {}", plan.project_root.display()));
    logger.system(&format!(
        "Starting backend (port {}) + frontend (port {})",
        plan.backend.port, plan.frontend.port
    ));
    logger.system(RULE);
}

fn versions<W: Write>(logger: &mut Logger<W>, report: &DependencyReport) {
    for tool in [&report.runtime, &report.package_manager] {
        logger.system(&format!("{}: {}", tool.label, tool.version));
    }
}

/// Print the resolved versions, or the error and an install hint. Returns whether
/// startup may continue.
fn report_dependencies<W: Write>(
    logger: &mut Logger<W>,
    result: &duo_core::Result<DependencyReport>,
) -> bool {
    match result {
        Ok(report) => {
            versions(logger, report);
            true
        }
        Err(err) => {
            tracing::error!("Dependency check failed: {err}");
            logger.error(&format!("Dependency error: {err}"));
            logger.system(INSTALL_HINT);
            false
        }
    }
}

fn title(process: ProcessName) -> &'static str {
    match process {
        ProcessName::Backend => "Backend",
        ProcessName::Frontend => "Frontend",
    }
}

fn render<W: Write>(logger: &mut Logger<W>, event: &SupervisorEvent) {
    match event {
        SupervisorEvent::Log { process, line } => logger.log(*process, line),
        SupervisorEvent::Notice { process, notice } => {
            logger.notice(*process, &notice.to_string());
        }
        SupervisorEvent::Starting { process } => {
            logger.system(&format!("Starting {process} server..."));
        }
        SupervisorEvent::Started {
            process,
            program,
            pid,
        } => {
            let name = title(*process);
            let message = match pid {
                Some(pid) => format!("{name} server started ({program}, pid {pid})"),
                None => format!("{name} server started ({program})"),
            };
            logger.system(&message);
        }
        SupervisorEvent::SpawnFailed { process, message } => {
            logger.error(&format!("{} start error: {message}", title(*process)));
        }
        SupervisorEvent::Waiting { elapsed } => {
            logger.system(&format!("Still waiting... ({}s)", elapsed.as_secs()));
        }
        SupervisorEvent::Ready {
            frontend_url,
            backend_url,
        } => {
            logger.system("Both servers running!");
            logger.system(&format!("Frontend: {frontend_url}"));
            logger.system(&format!("Backend:  {backend_url}"));
            logger.system("Press Ctrl+C to stop both servers");
        }
        SupervisorEvent::Exited { process, code } => {
            logger.error(&format!("{} process died! (exit code {code})", title(*process)));
        }
        SupervisorEvent::Lost { process, message } => {
            logger.error(&format!("Lost track of {process}: {message}"));
        }
        SupervisorEvent::ReadinessTimeout { waited } => {
            logger.error(&format!("Servers failed to start within {}s", waited.as_secs()));
        }
        SupervisorEvent::ShuttingDown => logger.system("Stopping servers..."),
        SupervisorEvent::Stopped { process, outcome } => match outcome {
            StopOutcome::NotRunning => {}
            StopOutcome::Terminated(_) => logger.system(&format!("{} stopped", title(*process))),
            StopOutcome::Killed => logger.system(&format!("{} force-killed", title(*process))),
            StopOutcome::Failed(reason) => {
                logger.error(&format!("Failed to stop {process}: {reason}"));
            }
        },
    }
}
