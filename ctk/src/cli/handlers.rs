//! Command execution handlers

use anyhow::{Context, Result};
use ctk_core::{InputOutputResource, TableAddress};
use std::path::Path;
use tracing::debug;

use crate::client::CrateDbClient;
use crate::config::CliConfig;
use crate::format::{
    format_config, format_load_summary, format_query_result, format_success, format_table_info,
};
use crate::load::{load_table, LoadOptions};

use super::commands::*;

/// Handle `load table`
pub async fn handle_load(
    client: CrateDbClient,
    config: &CliConfig,
    command: LoadCommands,
    format: &OutputFormat,
) -> Result<()> {
    match command {
        LoadCommands::Table {
            url,
            batch_size,
            on_error,
        } => {
            let options = LoadOptions {
                batch_size: batch_size.unwrap_or(config.batch_size),
                on_error: on_error.into(),
            };
            options.validate()?;

            let address = config.database_address()?;
            let resource = InputOutputResource::new(url);
            let summary = load_table(&resource, &address, client, options).await?;

            println!("{}", format_load_summary(&summary, &format.into())?);
        }
    }

    Ok(())
}

/// Handle `shell --command`
pub async fn handle_shell(client: &CrateDbClient, sql: &str, format: &OutputFormat) -> Result<()> {
    let sql = sql.trim().trim_end_matches(';');
    if sql.is_empty() {
        anyhow::bail!("SQL statement cannot be empty");
    }

    let response = client.run_sql(sql, None).await?;
    debug!(
        "Statement returned {} row(s) in {} ms",
        response.rowcount, response.duration
    );
    println!("{}", format_query_result(&response, &format.into())?);

    Ok(())
}

/// Handle `show` commands
pub async fn handle_show(
    client: &CrateDbClient,
    command: ShowCommands,
    format: &OutputFormat,
) -> Result<()> {
    match command {
        ShowCommands::Table { name } => {
            let table = TableAddress::from_string(&name)?;
            let info = client
                .table_info(&table)
                .await
                .with_context(|| format!("Cannot inspect table {}", table))?;
            println!("{}", format_table_info(&info, &format.into())?);
        }
    }

    Ok(())
}

/// Handle config commands
///
/// `set` validates the new value against the same rules as the startup
/// configuration before writing the file.
pub async fn handle_config(
    command: ConfigCommands,
    current_config: &CliConfig,
    config_path: &Path,
    format: &OutputFormat,
) -> Result<()> {
    match command {
        ConfigCommands::Show => {
            println!("{}", format_config(current_config, &format.into())?);
        }
        ConfigCommands::Set { key, value } => {
            let stored = CliConfig::load_from(config_path)?;
            let builder = CliConfig::builder()
                .with_cratedb_url(stored.cratedb_url.clone())?
                .with_output_format(stored.output_format.clone())?
                .with_verbose(stored.verbose)
                .with_timeout(stored.timeout)?
                .with_batch_size(stored.batch_size)?;

            let builder = match key.as_str() {
                "cratedb_url" => builder.with_cratedb_url(value.clone())?,
                "output_format" => builder.with_output_format(value.clone())?,
                "verbose" => builder.with_verbose(value.to_lowercase() == "true" || value == "1"),
                "timeout" => builder.with_timeout(
                    value
                        .parse()
                        .map_err(|_| anyhow::anyhow!("Invalid timeout value. Must be a number"))?,
                )?,
                "batch_size" => builder.with_batch_size(
                    value
                        .parse()
                        .map_err(|_| anyhow::anyhow!("Invalid batch size. Must be a number"))?,
                )?,
                _ => anyhow::bail!("Unknown config key: {}", key),
            };

            builder.build()?.save_to(config_path)?;
            let shown = if key == "cratedb_url" {
                ctk_core::DatabaseAddress::parse(&value)
                    .map(|a| a.safe())
                    .unwrap_or(value)
            } else {
                value
            };
            println!("{}", format_success(&format!("Set {} = {}", key, shown)));
        }
        ConfigCommands::Reset => {
            CliConfig::default().save_to(config_path)?;
            println!("{}", format_success("Configuration reset to defaults"));
        }
    }

    Ok(())
}

/// Generate shell completion script
pub fn generate_completion(shell: clap_complete::Shell) {
    use clap::CommandFactory;
    use clap_complete::generate;
    use std::io;

    let mut cmd = Cli::command();
    let bin_name = cmd.get_name().to_string();
    generate(shell, &mut cmd, bin_name, &mut io::stdout());
}
