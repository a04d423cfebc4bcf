use std::{path::Path, time::Duration};

use duo_types::{LaunchPlan, ProcessName, Service, Timing, Tool};

use crate::{
    raw::{RawConfig, RawService, RawTiming},
    ConfigError,
};

const DEFAULT_RUNTIME: &[&str] = &["node"];
const DEFAULT_PACKAGE_MANAGER: &[&str] = &["npm", "npm.cmd"];

const BACKEND_ARGS: &[&str] = &["backend/server.js"];
const BACKEND_PORT: u16 = 3001;
const BACKEND_HEALTH_PATH: &str = "/health";

const FRONTEND_ARGS: &[&str] = &["start"];
const FRONTEND_CWD: &str = "frontend";
const FRONTEND_PORT: u16 = 3000;

fn owned(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| (*s).to_owned()).collect()
}

fn candidates(
    field: &str,
    raw: Option<&Vec<String>>,
    default: &[&str],
) -> Result<Vec<String>, ConfigError> {
    let list = raw.cloned().unwrap_or_else(|| owned(default));
    if list.is_empty() {
        return Err(ConfigError::Validation(format!(
            "`{field}`: candidate list is empty"
        )));
    }
    if list.iter().any(|c| c.trim().is_empty()) {
        return Err(ConfigError::Validation(format!(
            "`{field}`: candidate list contains empty element"
        )));
    }
    Ok(list)
}

impl RawService {
    fn to_service(
        &self,
        name: ProcessName,
        root: &Path,
        candidates: Vec<String>,
        defaults: (&[&str], Option<&str>, u16, Option<&str>),
    ) -> Result<Service, ConfigError> {
        let (default_args, default_cwd, default_port, default_health) = defaults;

        let args = self.args.clone().unwrap_or_else(|| owned(default_args));
        if args.iter().any(|a| a.trim().is_empty()) {
            return Err(ConfigError::Validation(format!(
                "`{name}.args` contains empty element"
            )));
        }

        let cwd = match self.cwd.as_deref().or(default_cwd) {
            Some(dir) => root.join(dir),
            None => root.to_path_buf(),
        };

        let health_path = self
            .health_path
            .clone()
            .or_else(|| default_health.map(ToOwned::to_owned));
        if let Some(path) = &health_path {
            if !path.starts_with('/') {
                return Err(ConfigError::Validation(format!(
                    "`{name}.health_path` must start with `/`"
                )));
            }
        }

        Ok(Service {
            name,
            candidates,
            args,
            cwd,
            port: self.port.unwrap_or(default_port),
            health_path,
        })
    }
}

impl RawTiming {
    fn to_timing(&self) -> Result<Timing, ConfigError> {
        let defaults = Timing::default();
        let ms =
            |value: Option<u64>, default: Duration| value.map_or(default, Duration::from_millis);

        let timing = Timing {
            settle_delay: ms(self.settle_delay_ms, defaults.settle_delay),
            stop_timeout: ms(self.stop_timeout_ms, defaults.stop_timeout),
            poll_interval: ms(self.poll_interval_ms, defaults.poll_interval),
            readiness_attempts: self.readiness_attempts.unwrap_or(defaults.readiness_attempts),
            waiting_notice_every: self
                .waiting_notice_every
                .unwrap_or(defaults.waiting_notice_every),
        };

        if timing.readiness_attempts == 0 {
            return Err(ConfigError::Validation(
                "`timing.readiness_attempts` must be greater than zero".into(),
            ));
        }
        if timing.waiting_notice_every == 0 {
            return Err(ConfigError::Validation(
                "`timing.waiting_notice_every` must be greater than zero".into(),
            ));
        }
        if timing.poll_interval.is_zero() {
            return Err(ConfigError::Validation(
                "`timing.poll_interval_ms` must be greater than zero".into(),
            ));
        }

        Ok(timing)
    }
}

impl RawConfig {
    pub fn to_plan(&self, root: &Path) -> Result<LaunchPlan, ConfigError> {
        let runtime = candidates("runtime", self.runtime.as_ref(), DEFAULT_RUNTIME)?;
        let package_manager = candidates(
            "package_manager",
            self.package_manager.as_ref(),
            DEFAULT_PACKAGE_MANAGER,
        )?;

        let unset = RawService::default();
        let backend = self.backend.as_ref().unwrap_or(&unset).to_service(
            ProcessName::Backend,
            root,
            runtime.clone(),
            (BACKEND_ARGS, None, BACKEND_PORT, Some(BACKEND_HEALTH_PATH)),
        )?;
        let frontend = self.frontend.as_ref().unwrap_or(&unset).to_service(
            ProcessName::Frontend,
            root,
            package_manager.clone(),
            (FRONTEND_ARGS, Some(FRONTEND_CWD), FRONTEND_PORT, None),
        )?;

        if backend.port == frontend.port {
            return Err(ConfigError::Validation(format!(
                "backend and frontend both use port {}",
                backend.port
            )));
        }

        let timing = match &self.timing {
            Some(raw) => raw.to_timing()?,
            None => RawTiming::default().to_timing()?,
        };

        Ok(LaunchPlan {
            project_root: root.to_path_buf(),
            runtime: Tool::new("Node.js", runtime),
            package_manager: Tool::new("NPM", package_manager),
            backend,
            frontend,
            timing,
        })
    }
}
