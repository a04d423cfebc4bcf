use std::process::Stdio;

use duo_types::Tool;
use tokio::process::Command;

use crate::error::{Error, Result};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolvedTool {
    pub label: String,
    pub program: String,
    pub version: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DependencyReport {
    pub runtime: ResolvedTool,
    pub package_manager: ResolvedTool,
}

/// Check that both the runtime and its package manager can be invoked.
///
/// # Errors
///
/// Returns `Error::DependencyMissing` for the first tool none of whose candidate names
/// answers the version query successfully.
pub async fn check_dependencies(
    runtime: &Tool,
    package_manager: &Tool,
) -> Result<DependencyReport> {
    Ok(DependencyReport {
        runtime: resolve(runtime).await?,
        package_manager: resolve(package_manager).await?,
    })
}

/// Try each candidate name in order and keep the first that reports a version.
///
/// # Errors
///
/// Returns `Error::DependencyMissing` if every candidate is missing or exits non-zero.
pub async fn resolve(tool: &Tool) -> Result<ResolvedTool> {
    for program in &tool.candidates {
        let output = Command::new(program)
            .args(&tool.version_args)
            .stdin(Stdio::null())
            .output()
            .await;

        match output {
            Ok(output) if output.status.success() => {
                let version = String::from_utf8_lossy(&output.stdout).trim().to_owned();
                tracing::debug!("{} resolved to `{program}` ({version})", tool.label);

                return Ok(ResolvedTool {
                    label: tool.label.clone(),
                    program: program.clone(),
                    version,
                });
            }
            Ok(output) => {
                tracing::debug!(
                    "`{program}` exited with {} while probing {}",
                    output.status,
                    tool.label
                );
            }
            Err(err) => {
                tracing::debug!("`{program}` is not invocable: {err}");
            }
        }
    }

    Err(Error::DependencyMissing {
        tool: tool.label.clone(),
        candidates: tool.candidates.clone(),
    })
}
