//! Delimited-text roster file importer.
//!
//! The production system accepts spreadsheet uploads parsed by an external
//! service; at this boundary the gateway only needs "bytes in, candidate
//! strings out". This implementation handles plain-text and CSV-style
//! payloads: entries are split on newlines, commas, and semicolons,
//! trimmed, and returned unvalidated (format filtering happens in the
//! roster service).

use super::FileImporter;

/// Splits UTF-8 text on newlines, commas, and semicolons.
#[derive(Debug, Clone, Copy, Default)]
pub struct DelimitedTextImporter;

impl FileImporter for DelimitedTextImporter {
    fn extract_emails(&self, bytes: &[u8]) -> anyhow::Result<Vec<String>> {
        let text = std::str::from_utf8(bytes)
            .map_err(|e| anyhow::anyhow!("roster file is not valid UTF-8: {e}"))?;

        Ok(text
            .split(['\n', '\r', ',', ';'])
            .map(str::trim)
            .filter(|entry| !entry.is_empty())
            .map(str::to_string)
            .collect())
    }
}
