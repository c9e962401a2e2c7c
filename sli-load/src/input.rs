//! Reads the data file to load into rows of string fields.

use std::path::Path;

use anyhow::{Context, Result};
use tracing::info;

/// Rows of a delimited file. Records may have differing lengths; the encoder decides
/// which ones are usable.
pub fn read_rows(path: &Path, delimiter: u8, has_header: bool) -> Result<Vec<Vec<String>>> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(has_header)
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("Failed to open data file {}", path.display()))?;

    let mut rows = Vec::new();
    for (index, record) in reader.records().enumerate() {
        let record = record
            .with_context(|| format!("Failed to read record {} of {}", index + 1, path.display()))?;
        rows.push(record.iter().map(str::to_owned).collect());
    }
    info!(path = %path.display(), rows = rows.len(), "Data file read");
    Ok(rows)
}
