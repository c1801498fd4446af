//! CLI: announcer daemon, schedule diff and lookups
//!
//! This crate provides the `fahrplan` command-line interface.

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;

pub use cli::Cli;
pub use config::CliConfig;
pub use error::{ClientError, ClientResult};
