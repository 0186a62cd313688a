//! Export query results to CSV or JSON files.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use serde::Serialize;
use termbridge_core::{BarSeries, FieldValue, QueryResult};

use crate::error::ClientError;

/// Write rows as CSV with a `security,field,date,value` header.
///
/// Numbers are written bare, text is quoted when it contains a comma or a
/// quote, and null values become empty cells.
pub fn write_csv(result: &QueryResult, path: impl AsRef<Path>) -> Result<(), ClientError> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);

    writeln!(writer, "security,field,date,value")?;
    for row in &result.rows {
        let value = match &row.value {
            FieldValue::Number(number) => number.to_string(),
            FieldValue::Text(text) => escape_csv(text),
            FieldValue::Null => String::new(),
        };
        writeln!(
            writer,
            "{},{},{},{}",
            escape_csv(row.security.as_str()),
            escape_csv(row.field.as_str()),
            row.date,
            value
        )?;
    }
    writer.flush()?;
    Ok(())
}

/// Write intraday bars as CSV, one line per bar.
pub fn write_bars_csv(series: &BarSeries, path: impl AsRef<Path>) -> Result<(), ClientError> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);

    writeln!(writer, "time,open,high,low,close,volume,events")?;
    for bar in &series.bars {
        writeln!(
            writer,
            "{},{},{},{},{},{},{}",
            bar.time, bar.open, bar.high, bar.low, bar.close, bar.volume, bar.events
        )?;
    }
    writer.flush()?;
    Ok(())
}

/// Write any result document (origin included) as JSON.
pub fn write_json<T: Serialize>(
    value: &T,
    path: impl AsRef<Path>,
    pretty: bool,
) -> Result<(), ClientError> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    if pretty {
        serde_json::to_writer_pretty(&mut writer, value)?;
    } else {
        serde_json::to_writer(&mut writer, value)?;
    }
    writer.flush()?;
    Ok(())
}

fn escape_csv(field: &str) -> String {
    if field.contains(',') || field.contains('"') || field.contains('\n') {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}
