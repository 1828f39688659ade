//! Command-line interface for the managed Cloud SDK

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "managed-cloud-sdk")]
#[command(about = "Install, update and inspect a managed Google Cloud SDK")]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct Cli {
    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    /// Configuration file (defaults to the user config directory)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Directory holding managed SDK versions
    #[arg(long, global = true)]
    pub sdk_dir: Option<PathBuf>,

    /// SDK version to manage: LATEST or a release such as 190.0.0
    #[arg(long, global = true)]
    pub sdk_version: Option<String>,

    /// Let the SDK installer send usage statistics
    #[arg(long, global = true)]
    pub usage_reporting: bool,

    /// Fetch the SDK archive from this URL instead of the published one
    #[arg(long, global = true)]
    pub download_url: Option<String>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Clone, Debug)]
pub enum Commands {
    /// Install the SDK if missing, then any requested components (alias: i)
    #[command(alias = "i")]
    Install {
        /// Component id to ensure, repeatable
        #[arg(long = "component")]
        components: Vec<String>,
    },

    /// Install one component into the managed SDK (alias: ic)
    #[command(alias = "ic")]
    InstallComponent {
        /// Component id, e.g. app-engine-java
        component: String,
    },

    /// Update a LATEST SDK in place (alias: u)
    #[command(alias = "u")]
    Update,

    /// Show install and update state
    Status {
        /// Component id to check, repeatable
        #[arg(long = "component")]
        components: Vec<String>,
    },

    /// Print the managed gcloud path
    Path,

    /// Show version
    Version,
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Get the command or fall back to `status`
    pub fn get_command(&self) -> Commands {
        self.command.clone().unwrap_or(Commands::Status {
            components: Vec::new(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_install_with_components() {
        let cli = Cli::try_parse_from([
            "managed-cloud-sdk",
            "--sdk-version",
            "190.0.0",
            "install",
            "--component",
            "app-engine-java",
            "--component",
            "beta",
            "--debug",
        ])
        .unwrap();
        assert!(cli.debug);
        assert_eq!(cli.sdk_version.as_deref(), Some("190.0.0"));
        match cli.get_command() {
            Commands::Install { components } => assert_eq!(components, vec!["app-engine-java", "beta"]),
            _ => panic!("expected install"),
        }
    }

    #[test]
    fn test_default_command_is_status() {
        let cli = Cli::try_parse_from(["managed-cloud-sdk"]).unwrap();
        assert!(matches!(cli.get_command(), Commands::Status { components } if components.is_empty()));
    }
}
