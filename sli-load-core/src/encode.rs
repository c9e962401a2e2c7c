//! Row data → delimited text in the manifest's column order.
//!
//! Rows whose field count differs from the manifest's column count are skipped with a
//! warning; they never fail the encoding. Values are rendered with `Display`, without
//! type coercion.
//!
//! By default fields are joined as-is, so a value containing the delimiter corrupts its
//! row. [`QuoteStyle::Necessary`] quotes such values instead.

use std::fmt::Display;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{Result, SliError};
use crate::manifest::DatasetManifest;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuoteStyle {
    /// Join fields verbatim.
    #[default]
    Never,
    /// Quote fields containing the delimiter, a quote or a line break.
    Necessary,
}

/// A skipped input row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowWarning {
    /// 1-based position in the input.
    pub row: usize,
    /// The row's fields joined with commas.
    pub raw: String,
    pub field_count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedCsv {
    pub text: String,
    pub accepted: usize,
    pub skipped: usize,
    pub warnings: Vec<RowWarning>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CsvEncoder {
    delimiter: u8,
    quote_style: QuoteStyle,
}

impl Default for CsvEncoder {
    fn default() -> Self {
        Self {
            delimiter: b',',
            quote_style: QuoteStyle::Never,
        }
    }
}

impl CsvEncoder {
    pub fn new(delimiter: u8, quote_style: QuoteStyle) -> Self {
        Self {
            delimiter,
            quote_style,
        }
    }

    pub fn delimiter(&self) -> u8 {
        self.delimiter
    }

    pub fn quote_style(&self) -> QuoteStyle {
        self.quote_style
    }

    /// Header line from the manifest columns, then one line per accepted row, `\n` separated.
    pub fn encode<R, V>(&self, manifest: &DatasetManifest, rows: &[R]) -> Result<EncodedCsv>
    where
        R: AsRef<[V]>,
        V: Display,
    {
        manifest.ensure_complete()?;
        let header: Vec<String> = manifest
            .column_names()
            .into_iter()
            .map(str::to_owned)
            .collect();
        let column_count = header.len();

        let mut records = Vec::with_capacity(rows.len() + 1);
        records.push(header);
        let mut warnings = Vec::new();

        for (index, row) in rows.iter().enumerate() {
            let fields: Vec<String> = row.as_ref().iter().map(ToString::to_string).collect();
            if fields.len() == column_count {
                records.push(fields);
                continue;
            }
            let warning = RowWarning {
                row: index + 1,
                raw: fields.join(","),
                field_count: fields.len(),
            };
            warn!(
                dataset = %manifest.dataset_id,
                row = warning.row,
                fields = warning.field_count,
                expected = column_count,
                raw = %warning.raw,
                "Invalid number of records in row, skipping"
            );
            warnings.push(warning);
        }

        let text = self.render(&records).map_err(|e| {
            SliError::packaging(&manifest.template_path, "cannot render CSV", e)
        })?;
        let accepted = records.len() - 1;
        let skipped = warnings.len();
        info!(dataset = %manifest.dataset_id, accepted, skipped, "Rows encoded");
        debug!(bytes = text.len(), "CSV payload size");

        Ok(EncodedCsv {
            text,
            accepted,
            skipped,
            warnings,
        })
    }

    fn render(&self, records: &[Vec<String>]) -> std::result::Result<String, csv::Error> {
        match self.quote_style {
            QuoteStyle::Never => {
                let delimiter = char::from(self.delimiter).to_string();
                Ok(records
                    .iter()
                    .map(|fields| fields.join(&delimiter))
                    .collect::<Vec<_>>()
                    .join("\n"))
            }
            QuoteStyle::Necessary => {
                let mut writer = csv::WriterBuilder::new()
                    .delimiter(self.delimiter)
                    .quote_style(csv::QuoteStyle::Necessary)
                    .terminator(csv::Terminator::Any(b'\n'))
                    .flexible(true)
                    .from_writer(Vec::new());
                for fields in records {
                    writer.write_record(fields)?;
                }
                let bytes = writer
                    .into_inner()
                    .map_err(|e| csv::Error::from(e.into_error()))?;
                let mut text = String::from_utf8_lossy(&bytes).into_owned();
                if text.ends_with('\n') {
                    text.pop();
                }
                Ok(text)
            }
        }
    }
}
