use termbridge_client::{export, BridgeClient};
use termbridge_core::{IntradayQuery, MarketDateTime, Security};

use crate::cli::{ExportFormat, IntradayArgs};
use crate::error::CliError;

pub async fn run(args: &IntradayArgs, client: &BridgeClient, pretty: bool) -> Result<(), CliError> {
    let security = Security::parse(&args.security)?;
    let start = MarketDateTime::parse(&args.start)?;
    let end = MarketDateTime::parse(&args.end)?;

    let query = IntradayQuery::new(security, start, end, args.interval)?;
    let series = client.intraday(&query).await?;

    let rendered = if pretty {
        serde_json::to_string_pretty(&series)?
    } else {
        serde_json::to_string(&series)?
    };
    println!("{rendered}");

    if let (Some(format), Some(path)) = (args.export, args.output.as_ref()) {
        match format {
            ExportFormat::Csv => export::write_bars_csv(&series, path)?,
            ExportFormat::Json => export::write_json(&series, path, pretty)?,
        }
        eprintln!("wrote {} bar(s) to {}", series.len(), path.display());
    }
    Ok(())
}
