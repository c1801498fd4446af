//! fahrplan CLI entry point.

use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tracing::Level;

use fahrplan_cli::cli::{Cli, Command, ConfigAction};
use fahrplan_cli::commands;
use fahrplan_cli::config::CliConfig;
use fahrplan_cli::error::{ClientError, ClientResult};
use fahrplan_core::{Clock, TracingConfig, TracingOutputFormat, init_tracing};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn tracing_config(cli: &Cli, config: &CliConfig) -> ClientResult<TracingConfig> {
    let mut tracing = if cli.command.is_daemon() {
        TracingConfig::daemon()
    } else {
        TracingConfig::cli()
    };

    if cli.debug {
        tracing = tracing.with_level(Level::DEBUG);
    } else if let Some(level) = config.log_level()? {
        tracing = tracing.with_level(level);
    }

    let format = match cli.log_format.as_deref() {
        Some(value) => Some(TracingOutputFormat::parse(value).ok_or_else(|| {
            ClientError::config(format!("unknown log format {value:?}"))
        })?),
        None => config.log_format()?,
    };
    if let Some(format) = format {
        tracing = tracing.with_format(format);
    }

    Ok(tracing)
}

async fn run(cli: Cli) -> ClientResult<()> {
    let mut config = match cli.config {
        Some(ref path) => CliConfig::load_from(path)?,
        None => CliConfig::load()?,
    };
    if let Some(ref file) = cli.file {
        config.source.file = Some(file.clone());
    }
    if let Some(ref date) = cli.fake_date {
        config.clock.fake_date = Some(date.clone());
    }

    init_tracing(tracing_config(&cli, &config)?)?;

    let clock: Arc<dyn Clock> = Arc::new(config.clock()?);

    match cli.command {
        Command::Run => commands::run::run(&config, clock).await,
        Command::Diff { ref old, ref new } => commands::diff::run(old, new).await,
        Command::Nextup { limit } => commands::query::nextup(&config, clock, limit).await,
        Command::Search { ref term, limit } => {
            commands::query::search(&config, clock, term, limit).await
        }
        Command::Info { ref ids } => commands::query::info(&config, clock, ids).await,
        Command::Config { ref action } => match action {
            ConfigAction::Dump => commands::config::dump(&config),
            ConfigAction::Validate => commands::config::validate(&config),
            ConfigAction::Path => commands::config::path(),
        },
    }
}
