mod adapter;
mod raw;

use std::path::{Path, PathBuf};

pub use duo_types::LaunchPlan;

/// File looked up in the project root when no explicit path is given.
pub const DEFAULT_FILENAME: &str = "duo.toml";

/// Error type for configuration parsing.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[cfg(feature = "toml")]
    #[error("toml parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("validation error(s): {0}")]
    Validation(String),
}

/// Resolve the launch plan for a project.
///
/// An explicit `file` must exist. Without one, `duo.toml` in `root` is used when
/// present and the built-in defaults otherwise.
///
/// # Errors
///
/// Returns a `ConfigError` if the configuration file cannot be read, parsed or validated.
pub fn load(root: &Path, file: Option<&Path>) -> Result<LaunchPlan, ConfigError> {
    let path: PathBuf = match file {
        Some(file) => file.to_path_buf(),
        None => {
            let candidate = root.join(DEFAULT_FILENAME);
            if !candidate.exists() {
                tracing::debug!("No {DEFAULT_FILENAME} in {root:?}, using defaults");
                return raw::RawConfig::default().to_plan(root);
            }
            candidate
        }
    };

    load_from_path(&path, root)
}

/// Load a launch plan from a file path.
///
/// # Errors
///
/// Returns a `ConfigError` if the configuration file cannot be read or parsed.
pub fn load_from_path(path: &Path, root: &Path) -> Result<LaunchPlan, ConfigError> {
    tracing::debug!("Loading config from {path:?}");

    let text = std::fs::read_to_string(path)?;
    parse_auto(&text, path, root)
}

/// Parse a launch plan, picking the format from the file extension.
///
/// # Errors
///
/// Returns a `ConfigError` if the configuration string cannot be parsed.
pub fn parse_auto(text: &str, path: &Path, root: &Path) -> Result<LaunchPlan, ConfigError> {
    let ext = path.extension().and_then(|s| s.to_str()).unwrap_or("");
    match ext {
        #[cfg(feature = "toml")]
        "toml" => parse_toml(text, root),
        _ => Err(ConfigError::Validation("unknown config extension".into())),
    }
}

/// Parse a launch plan from a TOML string.
///
/// # Errors
///
/// Returns a `ConfigError` if the configuration string cannot be parsed.
#[cfg(feature = "toml")]
pub fn parse_toml(config: &str, root: &Path) -> Result<LaunchPlan, ConfigError> {
    let raw = toml::from_str::<raw::RawConfig>(config)?;
    raw.to_plan(root)
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn parse_toml_ok() {
        let txt = r#"
            runtime = ["node", "nodejs"]

            [frontend]
            args = ["run", "dev"]
            port = 5173

            [timing]
            settle_delay_ms = 100
        "#;
        let plan = parse_toml(txt, Path::new("/project")).unwrap();
        assert_eq!(plan.backend.candidates, vec!["node", "nodejs"]);
        assert_eq!(plan.frontend.args, vec!["run", "dev"]);
        assert_eq!(plan.frontend.port, 5173);
        assert_eq!(plan.frontend.cwd, Path::new("/project/frontend"));
        assert_eq!(plan.timing.settle_delay, Duration::from_millis(100));
    }

    #[test]
    fn parse_toml_unknown_key() {
        let txt = r#"
            [backend]
            command = ["node"]
        "#;
        assert!(matches!(
            parse_toml(txt, Path::new("/project")),
            Err(ConfigError::Toml(_))
        ));
    }

    #[test]
    fn load_without_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let plan = load(dir.path(), None).unwrap();
        assert_eq!(plan.project_root, dir.path());
        assert_eq!(plan.frontend.cwd, dir.path().join("frontend"));
    }

    #[test]
    fn load_reads_default_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(DEFAULT_FILENAME),
            "package_manager = [\"yarn\"]\n",
        )
        .unwrap();

        let plan = load(dir.path(), None).unwrap();
        assert_eq!(plan.frontend.candidates, vec!["yarn"]);
    }

    #[test]
    fn load_missing_explicit_file() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.toml");
        assert!(matches!(
            load(dir.path(), Some(&missing)),
            Err(ConfigError::Io(_))
        ));
    }

    #[test]
    fn unknown_extension() {
        assert!(matches!(
            parse_auto("", Path::new("duo.yaml"), Path::new("/")),
            Err(ConfigError::Validation(_))
        ));
    }
}
