use termbridge_client::BridgeClient;

use crate::error::CliError;

pub async fn run(client: &BridgeClient, pretty: bool) -> Result<(), CliError> {
    let health = client.health().await?;
    let rendered = if pretty {
        serde_json::to_string_pretty(&health)?
    } else {
        serde_json::to_string(&health)?
    };
    println!("{rendered}");
    Ok(())
}
