mod health;
mod historical;
mod intraday;
mod reference;

use std::time::Duration;

use termbridge_client::{export, BridgeClient, ClientConfig};
use termbridge_core::{CacheMode, FieldCode, QueryResult, RetryConfig, Security};

use crate::cli::{Cli, Command, ExportFormat, OutputArgs};
use crate::error::CliError;

pub async fn run(cli: &Cli) -> Result<(), CliError> {
    let config = ClientConfig::new(&cli.server, &cli.api_key)
        .with_timeout(Duration::from_millis(cli.timeout_ms))
        .with_retry(RetryConfig::exponential(cli.max_retries));
    let client = BridgeClient::new(config)?;

    match &cli.command {
        Command::Health => health::run(&client, cli.pretty).await,
        Command::Historical(args) => {
            require_api_key(cli)?;
            historical::run(args, &client, cli.pretty).await
        }
        Command::Reference(args) => {
            require_api_key(cli)?;
            reference::run(args, &client, cli.pretty).await
        }
        Command::Intraday(args) => {
            require_api_key(cli)?;
            intraday::run(args, &client, cli.pretty).await
        }
    }
}

fn require_api_key(cli: &Cli) -> Result<(), CliError> {
    if cli.api_key.trim().is_empty() {
        return Err(CliError::Usage(String::from(
            "an API key is required; pass --api-key or set TERMBRIDGE_API_KEY",
        )));
    }
    Ok(())
}

fn parse_securities(raw: &[String]) -> Result<Vec<Security>, CliError> {
    raw.iter()
        .map(|s| Security::parse(s).map_err(CliError::from))
        .collect()
}

fn parse_fields(raw: &[String]) -> Result<Vec<FieldCode>, CliError> {
    raw.iter()
        .map(|f| FieldCode::parse(f).map_err(CliError::from))
        .collect()
}

fn cache_mode(output: &OutputArgs) -> CacheMode {
    if output.no_cache {
        CacheMode::Bypass
    } else if output.refresh {
        CacheMode::Refresh
    } else {
        CacheMode::Use
    }
}

/// Print the result to stdout and export it when requested.
fn emit(result: &QueryResult, output: &OutputArgs, pretty: bool) -> Result<(), CliError> {
    let rendered = if pretty {
        serde_json::to_string_pretty(result)?
    } else {
        serde_json::to_string(result)?
    };
    println!("{rendered}");

    if let (Some(format), Some(path)) = (output.export, output.output.as_ref()) {
        match format {
            ExportFormat::Csv => export::write_csv(result, path)?,
            ExportFormat::Json => export::write_json(result, path, pretty)?,
        }
        eprintln!("wrote {} row(s) to {}", result.len(), path.display());
    }
    Ok(())
}
