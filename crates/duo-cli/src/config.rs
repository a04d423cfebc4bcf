use std::path::PathBuf;

use clap::Parser;

/// CLI for duo
#[derive(Parser, Debug)]
#[command(
    name = "duo",
    version,
    about = "Runs a backend API and a frontend dev server side by side"
)]
pub struct Cli {
    /// File path to the configuration file (TOML). Defaults to duo.toml in the project root
    #[arg(short, long)]
    pub file: Option<PathBuf>,

    /// Project directory holding backend/ and frontend/. Defaults to the current directory
    #[arg(short = 'C', long)]
    pub project_root: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_arguments() {
        let cli = Cli::try_parse_from(["duo"]).unwrap();
        assert!(cli.file.is_none());
        assert!(cli.project_root.is_none());
    }

    #[test]
    fn test_flags() {
        let cli = Cli::try_parse_from(["duo", "-C", "/srv/retro", "--file", "dev.toml"]).unwrap();
        assert_eq!(cli.project_root, Some(PathBuf::from("/srv/retro")));
        assert_eq!(cli.file, Some(PathBuf::from("dev.toml")));
    }

    #[test]
    fn test_rejects_positional() {
        assert!(Cli::try_parse_from(["duo", "backend"]).is_err());
    }
}
