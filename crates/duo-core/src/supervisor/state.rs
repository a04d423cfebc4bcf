use duo_types::{LaunchPlan, ProcessName, Service};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::process_manager::ProcId;

/// Lifecycle of a run. Each run passes through `ShuttingDown` exactly once.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Phase {
    Starting,
    Ready,
    Monitoring,
    ShuttingDown,
    Stopped,
}

#[derive(Debug)]
pub struct ManagedProcess {
    pub service: Service,
    pub handle: Option<ProcId>,
    pub pid: Option<u32>,
    pub(crate) reader: Option<JoinHandle<()>>,
}

impl ManagedProcess {
    #[must_use]
    pub fn new(service: Service) -> Self {
        Self {
            service,
            handle: None,
            pid: None,
            reader: None,
        }
    }

    #[must_use]
    pub fn name(&self) -> ProcessName {
        self.service.name
    }

    /// A live handle exists; the process has not been seen exiting.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.handle.is_some()
    }
}

#[derive(Debug)]
pub struct SupervisorState {
    pub backend: ManagedProcess,
    pub frontend: ManagedProcess,
    /// Cancelled once shutdown begins; readers and loops stop on it.
    pub active: CancellationToken,
}

impl SupervisorState {
    #[must_use]
    pub fn new(plan: &LaunchPlan) -> Self {
        Self {
            backend: ManagedProcess::new(plan.backend.clone()),
            frontend: ManagedProcess::new(plan.frontend.clone()),
            active: CancellationToken::new(),
        }
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        !self.active.is_cancelled()
    }

    #[must_use]
    pub fn get(&self, name: ProcessName) -> &ManagedProcess {
        match name {
            ProcessName::Backend => &self.backend,
            ProcessName::Frontend => &self.frontend,
        }
    }

    pub fn get_mut(&mut self, name: ProcessName) -> &mut ManagedProcess {
        match name {
            ProcessName::Backend => &mut self.backend,
            ProcessName::Frontend => &mut self.frontend,
        }
    }
}
