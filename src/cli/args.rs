//! CLI argument definitions using clap
//!
//! Commands:
//! - commentd serve --config <path>
//! - commentd check --config <path>
//! - commentd compact --config <path>
//! - commentd export --config <path>
//! - commentd import <file> --config <path>

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// commentd - a self-hosted comment server
#[derive(Parser, Debug)]
#[command(name = "commentd")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Start the HTTP server
    Serve {
        /// Path to configuration file
        #[arg(long, default_value = "./commentd.json")]
        config: PathBuf,
    },

    /// Replay the comment log and report its state
    Check {
        /// Path to configuration file
        #[arg(long, default_value = "./commentd.json")]
        config: PathBuf,
    },

    /// Rewrite the comment log with live comments only
    Compact {
        /// Path to configuration file
        #[arg(long, default_value = "./commentd.json")]
        config: PathBuf,
    },

    /// Print every comment as JSON
    Export {
        /// Path to configuration file
        #[arg(long, default_value = "./commentd.json")]
        config: PathBuf,
    },

    /// Import comments from a JSON array file
    Import {
        /// File holding a JSON array of comments
        file: PathBuf,

        /// Path to configuration file
        #[arg(long, default_value = "./commentd.json")]
        config: PathBuf,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_path() {
        let cli = Cli::try_parse_from(["commentd", "serve"]).unwrap();
        match cli.command {
            Command::Serve { config } => assert_eq!(config, PathBuf::from("./commentd.json")),
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_import_takes_file() {
        let cli =
            Cli::try_parse_from(["commentd", "import", "backup.json", "--config", "/etc/c.json"])
                .unwrap();
        match cli.command {
            Command::Import { file, config } => {
                assert_eq!(file, PathBuf::from("backup.json"));
                assert_eq!(config, PathBuf::from("/etc/c.json"));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_import_requires_file() {
        assert!(Cli::try_parse_from(["commentd", "import"]).is_err());
    }
}
