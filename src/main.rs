// ABOUTME: Entry point for the spandex CLI application.
// ABOUTME: Parses arguments, installs logging and dispatches to command handlers.

mod cli;
mod commands;

use clap::Parser;
use cli::{Cli, Commands};
use spandex::config::{self, Config};
use spandex::error::Result;
use spandex::output::Output;
use std::env;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if cli.verbose {
            EnvFilter::new("debug")
        } else {
            EnvFilter::new("warn")
        }
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(cli).await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let output = Output::new(cli.output_mode());
    let cwd = env::current_dir()?;
    let load = || -> Result<Config> {
        let config = Config::load(cli.env.as_deref(), cli.config.as_deref(), &cwd)?;
        tracing::info!("using {} configuration", config.environment);
        Ok(config)
    };

    match cli.command {
        Commands::Init { force } => {
            let path = config::init_config(&cwd, force)?;
            output.success(&format!("Created {}", path.display()));
            Ok(())
        }
        Commands::Provision {
            suffix,
            load_balancer,
            no_deploy,
            deploy,
        } => {
            let args = commands::ProvisionArgs {
                suffix,
                load_balancer,
                no_deploy,
                deploy,
            };
            commands::provision(&load()?, &args, output).await
        }
        Commands::Deploy { host, deploy } => {
            commands::deploy(&load()?, &host, &deploy, output).await
        }
        Commands::FlushDatabase {
            host,
            skip_setup,
            skip_flush,
        } => commands::flush_database(&load()?, &host, !skip_setup, !skip_flush, output).await,
        Commands::ReplicateDatabase {
            host,
            masterless,
            slave,
        } => commands::replicate_database(&load()?, &host, masterless, slave, output).await,
        Commands::ConfigureMonitoring { host, license_key } => {
            commands::configure_monitoring(&load()?, &host, license_key, output).await
        }
    }
}
