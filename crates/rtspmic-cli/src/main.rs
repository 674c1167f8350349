//! CLI entry point and composition root.
//!
//! Loads `.env`, parses arguments, installs logging and hands off to the
//! subcommand handlers. Library errors are mapped to exit codes here.

use std::process::ExitCode;

use anyhow::Result;
use clap::{CommandFactory, Parser};
use rtspmic_cli::{Cli, CliError, Commands, ConfigOverrides, handlers, init_logging, load_config};
use rtspmic_core::StreamConfig;

#[tokio::main]
async fn main() -> ExitCode {
    // Load .env before clap reads RTSP_URL and friends
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_logging(cli.verbose);

    match dispatch(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {err:#}");
            let code = err.downcast_ref::<CliError>().map_or(1, CliError::exit_code);
            ExitCode::from(code)
        }
    }
}

async fn dispatch(cli: Cli) -> Result<()> {
    let Some(command) = cli.command.clone() else {
        Cli::command().print_help()?;
        return Ok(());
    };

    match command {
        Commands::Devices => handlers::devices::execute().await?,
        Commands::CheckConfig => handlers::check_config::execute(&config_from(&cli)?)?,
        Commands::Run {
            status_interval,
            no_autostart,
        } => handlers::run::execute(config_from(&cli)?, status_interval, !no_autostart).await?,
    }
    Ok(())
}

fn config_from(cli: &Cli) -> Result<StreamConfig, CliError> {
    load_config(cli.config.as_deref(), &ConfigOverrides::from(cli))
}
