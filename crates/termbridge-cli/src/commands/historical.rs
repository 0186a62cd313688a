use termbridge_client::BridgeClient;
use termbridge_core::{HistoricalQuery, MarketDate};

use crate::cli::HistoricalArgs;
use crate::error::CliError;

pub async fn run(
    args: &HistoricalArgs,
    client: &BridgeClient,
    pretty: bool,
) -> Result<(), CliError> {
    let securities = super::parse_securities(&args.securities)?;
    let fields = super::parse_fields(&args.fields)?;
    let start = MarketDate::parse(&args.start)?;
    let end = MarketDate::parse(&args.end)?;

    let query = HistoricalQuery::new(securities, fields, start, end)?;
    let result = client
        .historical_with_mode(&query, super::cache_mode(&args.output))
        .await?;

    super::emit(&result, &args.output, pretty)
}
