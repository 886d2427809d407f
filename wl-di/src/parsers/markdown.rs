//! Markdown parsers
//!
//! Two shapes are supported: pipe-delimited tables (header row + separator
//! row), and blank-line-separated blocks of `key: value` lines.

use crate::error::ImportError;
use crate::parsers::{RawRecord, RecordParser};

pub struct MarkdownTableParser;

impl RecordParser for MarkdownTableParser {
    fn parse(&self, bytes: &[u8]) -> Result<Vec<RawRecord>, ImportError> {
        let text = String::from_utf8_lossy(bytes);

        let mut rows = text
            .lines()
            .map(str::trim)
            .filter(|l| l.starts_with('|'));

        let Some(header_line) = rows.next() else {
            return Err(ImportError::Format(
                "Markdown table has no header row".to_string(),
            ));
        };
        let headers: Vec<String> = split_table_row(header_line)
            .into_iter()
            .map(|c| c.to_lowercase())
            .collect();

        let mut records = Vec::new();
        for line in rows {
            let cells = split_table_row(line);
            if is_separator_row(&cells) {
                continue;
            }

            let mut record = RawRecord::new();
            for (header, cell) in headers.iter().zip(cells) {
                record.insert(header, cell);
            }
            if !record.is_empty() {
                records.push(record);
            }
        }

        Ok(records)
    }
}

pub struct MarkdownKvParser;

impl RecordParser for MarkdownKvParser {
    fn parse(&self, bytes: &[u8]) -> Result<Vec<RawRecord>, ImportError> {
        let text = String::from_utf8_lossy(bytes);

        let mut records = Vec::new();
        let mut current = RawRecord::new();

        for raw_line in text.lines() {
            let line = raw_line.trim();

            if line.is_empty() {
                if !current.is_empty() {
                    records.push(std::mem::take(&mut current));
                }
                continue;
            }
            if line.starts_with('#') {
                continue;
            }

            // Tolerate list bullets in front of the pair
            let line = line
                .strip_prefix("- ")
                .or_else(|| line.strip_prefix("* "))
                .unwrap_or(line);

            if let Some((key, value)) = line.split_once(':') {
                if !key.trim().is_empty() {
                    current.insert(key, value.trim().to_string());
                }
            }
        }
        if !current.is_empty() {
            records.push(current);
        }

        Ok(records)
    }
}

/// Split `| a | b |` into trimmed cell values
fn split_table_row(line: &str) -> Vec<String> {
    line.trim()
        .trim_start_matches('|')
        .trim_end_matches('|')
        .split('|')
        .map(|c| c.trim().to_string())
        .collect()
}

/// Separator rows look like `| --- | :---: |`
fn is_separator_row(cells: &[String]) -> bool {
    !cells.is_empty()
        && cells.iter().all(|c| {
            !c.is_empty() && c.chars().all(|ch| ch == '-' || ch == ':')
        })
}
