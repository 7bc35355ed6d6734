//! CrateDB Toolkit CLI
//!
//! Command-line interface for loading data into CrateDB and querying it.

use anyhow::Result;
use clap::Parser;
use ctk::cli::{
    generate_completion, handle_config, handle_load, handle_shell, handle_show, Cli, Commands,
    OutputFormat,
};
use ctk::client::CrateDbClient;
use ctk::config::{CliConfig, ConfigBuilder};
use std::time::Duration;
use tracing::debug;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Completion output must not depend on a valid configuration.
    if let Commands::Completion { shell } = cli.command {
        generate_completion(shell);
        return Ok(());
    }

    // Build configuration using priority chain: defaults → file → env → CLI args
    let mut builder = CliConfig::builder();

    if !cli.no_config {
        builder = builder.with_config_file(cli.config.as_deref())?;
    }

    builder = builder.with_env_overrides();

    // Apply CLI argument overrides (highest priority)
    let overrides = apply_cli_overrides(builder, &cli);

    let config = match overrides {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Configuration error: {:#}", e);
            std::process::exit(1);
        }
    };

    init_tracing(config.verbose);

    let output_format = match config.output_format.as_str() {
        "json" => OutputFormat::Json,
        _ => OutputFormat::Table,
    };
    let config_path = cli.config.clone().unwrap_or_else(CliConfig::config_path);

    let result = run(cli.command, &config, &config_path, &output_format).await;

    if let Err(e) = result {
        eprintln!("Error: {:#}", e);
        if config.verbose {
            eprintln!("Error details: {:?}", e);
        }
        std::process::exit(1);
    }

    Ok(())
}

fn apply_cli_overrides(mut builder: ConfigBuilder, cli: &Cli) -> Result<CliConfig> {
    if let Some(ref url) = cli.cratedb_sqlalchemy_url {
        builder = builder.with_cratedb_url(url)?;
    }
    if let Some(ref format) = cli.format {
        builder = builder.with_output_format(format.as_str())?;
    }
    if cli.verbose {
        builder = builder.with_verbose(true);
    }
    if let Some(timeout) = cli.timeout {
        builder = builder.with_timeout(timeout)?;
    }
    builder.build()
}

async fn run(
    command: Commands,
    config: &CliConfig,
    config_path: &std::path::Path,
    output_format: &OutputFormat,
) -> Result<()> {
    let connect = || -> Result<CrateDbClient> {
        let address = config.database_address()?;
        debug!("Using CrateDB at {}", address);
        Ok(CrateDbClient::with_config(
            &address,
            config.timeout,
            3,
            Duration::from_millis(500),
        )?)
    };

    match command {
        Commands::Load { command } => handle_load(connect()?, config, command, output_format).await,
        Commands::Shell { command } => handle_shell(&connect()?, &command, output_format).await,
        Commands::Show { command } => handle_show(&connect()?, command, output_format).await,
        Commands::Config { command } => {
            handle_config(command, config, config_path, output_format).await
        }
        Commands::Completion { shell } => {
            generate_completion(shell);
            Ok(())
        }
    }
}

/// Log to stderr so command output on stdout stays machine-readable.
fn init_tracing(verbose: bool) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = if verbose {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("info,ctk=debug,ctk_dynamodb=debug"))
    } else {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("warn,ctk=info,ctk_dynamodb=info"))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
