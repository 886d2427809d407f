//! Format parsers for uploaded files
//!
//! Each parser turns raw bytes into an ordered sequence of raw field maps.
//! The registry owns MIME/content-shape detection and the format -> parser
//! lookup, so new formats register without touching existing ones.

pub mod csv;
pub mod json;
pub mod markdown;

use std::collections::HashMap;

use crate::error::ImportError;

/// Supported interchange formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileFormat {
    Csv,
    Json,
    MarkdownTable,
    MarkdownKv,
}

impl FileFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            FileFormat::Csv => "csv",
            FileFormat::Json => "json",
            FileFormat::MarkdownTable => "markdown-table",
            FileFormat::MarkdownKv => "markdown-kv",
        }
    }

    /// Mapping leniency for this format. Free-text formats coerce sloppy
    /// values; JSON rows are held to the strict schema.
    pub fn leniency(&self) -> Leniency {
        match self {
            FileFormat::Json => Leniency::Strict,
            _ => Leniency::Lenient,
        }
    }
}

/// How forgiving the row mapper is with malformed field values
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Leniency {
    Lenient,
    Strict,
}

/// One parsed record: a field map with case-insensitive, trimmed-key lookup.
/// Empty values count as absent.
#[derive(Debug, Clone, Default)]
pub struct RawRecord {
    fields: HashMap<String, String>,
}

impl RawRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a field. Keys are trimmed and lower-cased on the way in.
    pub fn insert(&mut self, key: &str, value: String) {
        let key = key.trim().to_lowercase();
        if !key.is_empty() {
            self.fields.insert(key, value);
        }
    }

    /// Look up a field by case-insensitive key. Empty values read as absent.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields
            .get(&key.trim().to_lowercase())
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }

    /// First non-empty value among the given keys
    pub fn first_of(&self, keys: &[&str]) -> Option<&str> {
        keys.iter().find_map(|k| self.get(k))
    }

    /// Whether the record carries a non-empty value for the key
    pub fn has(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.values().all(|v| v.trim().is_empty())
    }
}

/// A format parser: full byte buffer in, ordered raw records out
pub trait RecordParser: Send + Sync {
    fn parse(&self, bytes: &[u8]) -> Result<Vec<RawRecord>, ImportError>;
}

/// Format -> parser lookup plus MIME/content detection
pub struct ParserRegistry {
    parsers: HashMap<FileFormat, Box<dyn RecordParser>>,
}

impl ParserRegistry {
    /// Registry with all built-in formats registered
    pub fn with_defaults() -> Self {
        let mut registry = Self {
            parsers: HashMap::new(),
        };
        registry.register(FileFormat::Csv, Box::new(csv::CsvParser));
        registry.register(FileFormat::Json, Box::new(json::JsonParser));
        registry.register(FileFormat::MarkdownTable, Box::new(markdown::MarkdownTableParser));
        registry.register(FileFormat::MarkdownKv, Box::new(markdown::MarkdownKvParser));
        registry
    }

    pub fn register(&mut self, format: FileFormat, parser: Box<dyn RecordParser>) {
        self.parsers.insert(format, parser);
    }

    /// Select a format from the MIME type, falling back to content shape for
    /// the ambiguous text types
    pub fn detect(&self, mime_type: &str, bytes: &[u8]) -> Result<FileFormat, ImportError> {
        // Strip parameters such as "; charset=utf-8"
        let essence = mime_type
            .split(';')
            .next()
            .unwrap_or("")
            .trim()
            .to_lowercase();

        let format = match essence.as_str() {
            "application/json" => FileFormat::Json,
            "text/csv" | "application/vnd.ms-excel" => FileFormat::Csv,
            "text/markdown" => {
                let text = String::from_utf8_lossy(bytes);
                if has_table_row(&text) {
                    FileFormat::MarkdownTable
                } else {
                    FileFormat::MarkdownKv
                }
            }
            "text/plain" => {
                let text = String::from_utf8_lossy(bytes);
                if first_line_has_comma(&text) {
                    FileFormat::Csv
                } else if has_kv_line(&text) {
                    FileFormat::MarkdownKv
                } else {
                    return Err(ImportError::Format(
                        "Could not recognize the content shape of the text/plain upload"
                            .to_string(),
                    ));
                }
            }
            other => {
                return Err(ImportError::Format(format!(
                    "Unsupported MIME type: {}",
                    other
                )))
            }
        };

        tracing::debug!(mime_type = %essence, format = format.as_str(), "Detected upload format");

        Ok(format)
    }

    /// Parse bytes with the parser registered for the format
    pub fn parse(&self, format: FileFormat, bytes: &[u8]) -> Result<Vec<RawRecord>, ImportError> {
        let parser = self.parsers.get(&format).ok_or_else(|| {
            ImportError::Format(format!("No parser registered for format: {}", format.as_str()))
        })?;
        parser.parse(bytes)
    }
}

fn first_line_has_comma(text: &str) -> bool {
    text.lines()
        .find(|l| !l.trim().is_empty())
        .is_some_and(|l| l.contains(','))
}

fn has_table_row(text: &str) -> bool {
    text.lines().any(|l| l.trim_start().starts_with('|'))
}

fn has_kv_line(text: &str) -> bool {
    text.lines().any(|l| {
        let line = l.trim();
        !line.starts_with('#') && line.split_once(':').is_some_and(|(k, _)| !k.trim().is_empty())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_lookup_is_case_insensitive() {
        let mut record = RawRecord::new();
        record.insert(" Name ", "Alpha".to_string());
        assert_eq!(record.get("NAME"), Some("Alpha"));
        assert_eq!(record.first_of(&["title", "name"]), Some("Alpha"));
    }

    #[test]
    fn empty_values_read_as_absent() {
        let mut record = RawRecord::new();
        record.insert("title", "   ".to_string());
        assert!(!record.has("title"));
        assert!(record.is_empty());
    }

    #[test]
    fn detects_formats_from_mime() {
        let registry = ParserRegistry::with_defaults();
        assert_eq!(
            registry.detect("application/json; charset=utf-8", b"[]").unwrap(),
            FileFormat::Json
        );
        assert_eq!(registry.detect("text/csv", b"a,b").unwrap(), FileFormat::Csv);
        assert_eq!(
            registry.detect("text/markdown", b"| a | b |").unwrap(),
            FileFormat::MarkdownTable
        );
        assert_eq!(
            registry.detect("text/markdown", b"name: x").unwrap(),
            FileFormat::MarkdownKv
        );
    }

    #[test]
    fn text_plain_uses_content_shape() {
        let registry = ParserRegistry::with_defaults();
        assert_eq!(
            registry.detect("text/plain", b"name,status\nA,active").unwrap(),
            FileFormat::Csv
        );
        assert_eq!(
            registry.detect("text/plain", b"name: A\nstatus: active").unwrap(),
            FileFormat::MarkdownKv
        );
        assert!(registry.detect("text/plain", b"just prose").is_err());
    }

    #[test]
    fn unsupported_mime_is_a_format_error() {
        let registry = ParserRegistry::with_defaults();
        let err = registry.detect("application/octet-stream", b"...").unwrap_err();
        assert!(matches!(err, ImportError::Format(_)));
    }
}
