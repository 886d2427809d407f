//! CSV parser
//!
//! Header row defines field names (trimmed, lower-cased); data lines are
//! quote-aware so commas inside quoted fields are not separators.

use crate::error::ImportError;
use crate::parsers::{RawRecord, RecordParser};

pub struct CsvParser;

impl RecordParser for CsvParser {
    fn parse(&self, bytes: &[u8]) -> Result<Vec<RawRecord>, ImportError> {
        let mut reader = ::csv::ReaderBuilder::new()
            .trim(::csv::Trim::All)
            .flexible(true)
            .from_reader(bytes);

        let headers: Vec<String> = reader
            .headers()
            .map_err(|e| ImportError::Format(format!("Invalid CSV header row: {}", e)))?
            .iter()
            .map(|h| h.trim().to_lowercase())
            .collect();

        let mut records = Vec::new();
        for result in reader.records() {
            let line =
                result.map_err(|e| ImportError::Format(format!("Invalid CSV row: {}", e)))?;

            let mut record = RawRecord::new();
            for (header, value) in headers.iter().zip(line.iter()) {
                record.insert(header, value.to_string());
            }
            if !record.is_empty() {
                records.push(record);
            }
        }

        Ok(records)
    }
}
