//! CLI argument definitions for the bridge client.
//!
//! # Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `health` | Probe the bridge server's health endpoint |
//! | `historical` | Fetch historical time-series data |
//! | `reference` | Fetch current/static reference data |
//! | `intraday` | Fetch intraday OHLCV bars for one security |
//!
//! # Global Options
//!
//! | Option | Default | Description |
//! |--------|---------|-------------|
//! | `--server` | `http://localhost:8080` | Bridge server base URL |
//! | `--api-key` | (env) | Credential sent in the request header |
//! | `--timeout-ms` | `30000` | Per-attempt request timeout in ms |
//! | `--max-retries` | `3` | Retries for transient failures |
//! | `--pretty` | `false` | Pretty-print JSON output |
//!
//! # Examples
//!
//! ```bash
//! # Probe the server
//! termbridge health
//!
//! # Fetch a year of closing prices
//! termbridge historical "AAPL US Equity" --fields PX_LAST \
//!     --start 2024-01-01 --end 2024-12-31 --pretty
//!
//! # Export reference data to CSV
//! termbridge reference "AAPL US Equity" "MSFT US Equity" \
//!     --fields PX_LAST,NAME --export csv --output snapshot.csv
//! ```

use clap::{Args, Parser, Subcommand, ValueEnum};

/// Client for a terminal data bridge server.
///
/// Fetches historical and reference market data over HTTP, with local
/// caching, automatic retry of transient failures, and CSV/JSON export.
#[derive(Debug, Parser)]
#[command(
    name = "termbridge",
    author,
    version,
    about = "Terminal data bridge client"
)]
pub struct Cli {
    /// Bridge server base URL.
    #[arg(long, global = true, env = "TERMBRIDGE_SERVER", default_value = "http://localhost:8080")]
    pub server: String,

    /// API key sent with every data request.
    #[arg(long, global = true, env = "TERMBRIDGE_API_KEY", default_value = "")]
    pub api_key: String,

    /// Per-attempt request timeout in milliseconds.
    #[arg(long, global = true, default_value_t = 30_000)]
    pub timeout_ms: u64,

    /// Maximum retries for transient failures.
    #[arg(long, global = true, default_value_t = 3)]
    pub max_retries: u32,

    /// Pretty-print JSON output.
    #[arg(long, global = true, default_value_t = false)]
    pub pretty: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Probe the bridge server's health endpoint.
    ///
    /// Reports liveness, whether the server is in live or mock mode, and
    /// the number of cached entries.
    Health,

    /// Fetch historical time-series data.
    ///
    /// # Examples
    ///
    ///   termbridge historical "AAPL US Equity" --fields PX_LAST --start 2024-01-01 --end 2024-03-31
    Historical(HistoricalArgs),

    /// Fetch current/static reference data.
    ///
    /// # Examples
    ///
    ///   termbridge reference "AAPL US Equity" --fields PX_LAST,NAME
    Reference(ReferenceArgs),

    /// Fetch intraday OHLCV bars for one security.
    ///
    /// Bars are fetched fresh on every call; intraday data is not cached.
    ///
    /// # Examples
    ///
    ///   termbridge intraday "AAPL US Equity" --start 2024-01-02T09:30:00 --end 2024-01-02T16:00:00 --interval 5
    Intraday(IntradayArgs),
}

/// Arguments for the `historical` command.
#[derive(Debug, Args)]
pub struct HistoricalArgs {
    /// One or more security identifiers (e.g. "AAPL US Equity").
    #[arg(required = true, num_args = 1..)]
    pub securities: Vec<String>,

    /// Comma-separated field mnemonics (e.g. PX_LAST,PX_VOLUME).
    #[arg(long, required = true, value_delimiter = ',')]
    pub fields: Vec<String>,

    /// Start of the date range (YYYY-MM-DD, inclusive).
    #[arg(long)]
    pub start: String,

    /// End of the date range (YYYY-MM-DD, inclusive).
    #[arg(long)]
    pub end: String,

    #[command(flatten)]
    pub output: OutputArgs,
}

/// Arguments for the `reference` command.
#[derive(Debug, Args)]
pub struct ReferenceArgs {
    /// One or more security identifiers.
    #[arg(required = true, num_args = 1..)]
    pub securities: Vec<String>,

    /// Comma-separated field mnemonics.
    #[arg(long, required = true, value_delimiter = ',')]
    pub fields: Vec<String>,

    #[command(flatten)]
    pub output: OutputArgs,
}

/// Arguments for the `intraday` command.
#[derive(Debug, Args)]
pub struct IntradayArgs {
    /// Security identifier (e.g. "AAPL US Equity").
    pub security: String,

    /// Start of the range (YYYY-MM-DDTHH:MM:SS, inclusive).
    #[arg(long)]
    pub start: String,

    /// End of the range (YYYY-MM-DDTHH:MM:SS, inclusive).
    #[arg(long)]
    pub end: String,

    /// Bar width in minutes.
    #[arg(long, default_value_t = 1)]
    pub interval: u32,

    /// Export format for --output.
    #[arg(long, value_enum, requires = "output")]
    pub export: Option<ExportFormat>,

    /// File to export bars to (requires --export).
    #[arg(long, requires = "export")]
    pub output: Option<std::path::PathBuf>,
}

/// Caching and export options shared by the data commands.
#[derive(Debug, Args)]
pub struct OutputArgs {
    /// Refetch even if a cached result exists, then update the cache.
    #[arg(long, default_value_t = false)]
    pub refresh: bool,

    /// Skip the local cache entirely for this request.
    #[arg(long, default_value_t = false, conflicts_with = "refresh")]
    pub no_cache: bool,

    /// Export format for --output.
    #[arg(long, value_enum, requires = "output")]
    pub export: Option<ExportFormat>,

    /// File to export results to (requires --export).
    #[arg(long, requires = "export")]
    pub output: Option<std::path::PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ExportFormat {
    /// Comma-separated values with a header row.
    Csv,
    /// Pretty-printed JSON document.
    Json,
}
