use termbridge_client::BridgeClient;
use termbridge_core::ReferenceQuery;

use crate::cli::ReferenceArgs;
use crate::error::CliError;

pub async fn run(
    args: &ReferenceArgs,
    client: &BridgeClient,
    pretty: bool,
) -> Result<(), CliError> {
    let securities = super::parse_securities(&args.securities)?;
    let fields = super::parse_fields(&args.fields)?;

    let query = ReferenceQuery::new(securities, fields)?;
    let result = client
        .reference_with_mode(&query, super::cache_mode(&args.output))
        .await?;

    super::emit(&result, &args.output, pretty)
}
