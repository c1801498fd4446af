//! Command-line interface definition.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use fahrplan_core::SessionId;

/// fahrplan - conference schedule announcer
#[derive(Debug, Parser)]
#[command(name = "fahrplan")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(long, short, env = "FAHRPLAN_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Enable debug output
    #[arg(long, short = 'v', global = true)]
    pub debug: bool,

    /// Log format: pretty, compact or json
    #[arg(long, global = true)]
    pub log_format: Option<String>,

    /// Read the schedule from this file instead of the configured source
    #[arg(long, short, env = "FAHRPLAN_FILE", global = true)]
    pub file: Option<PathBuf>,

    /// Pretend today is this date (YYYY-MM-DD)
    #[arg(long, global = true)]
    pub fake_date: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the announcer until interrupted
    Run,

    /// Compare two schedule files
    Diff {
        old: PathBuf,
        new: PathBuf,
    },

    /// Show the next sessions
    Nextup {
        #[arg(long, short = 'n', default_value = "10")]
        limit: usize,
    },

    /// Search titles, descriptions, abstracts and speakers
    Search {
        term: String,
        #[arg(long, short = 'n', default_value = "10")]
        limit: usize,
    },

    /// Show details of sessions by id
    Info {
        #[arg(required = true)]
        ids: Vec<SessionId>,
    },

    /// Configuration commands
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

impl Command {
    /// True for the long-running announcer.
    pub fn is_daemon(&self) -> bool {
        matches!(self, Self::Run)
    }
}

#[derive(Debug, Subcommand)]
pub enum ConfigAction {
    /// Dump effective configuration
    Dump,

    /// Validate configuration
    Validate,

    /// Show configuration file path
    Path,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_subcommands() {
        let cli = Cli::try_parse_from(["fahrplan", "--file", "s.json", "info", "123", "124"]).unwrap();
        assert_eq!(cli.file, Some(PathBuf::from("s.json")));
        assert!(matches!(cli.command, Command::Info { ref ids } if *ids == vec![123, 124]));

        let cli = Cli::try_parse_from(["fahrplan", "search", "rust", "-n", "3", "-v"]).unwrap();
        assert!(cli.debug);
        assert!(matches!(cli.command, Command::Search { ref term, limit: 3 } if term == "rust"));

        let cli = Cli::try_parse_from(["fahrplan", "run"]).unwrap();
        assert!(cli.command.is_daemon());
    }

    #[test]
    fn info_needs_an_id() {
        assert!(Cli::try_parse_from(["fahrplan", "info"]).is_err());
        assert!(Cli::try_parse_from(["fahrplan", "info", "abc"]).is_err());
    }

    #[test]
    fn verify_cli() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
