//! JSON parser
//!
//! Input must parse as an array of objects; each element is one raw row.

use serde_json::Value;

use crate::error::ImportError;
use crate::parsers::{RawRecord, RecordParser};

pub struct JsonParser;

impl RecordParser for JsonParser {
    fn parse(&self, bytes: &[u8]) -> Result<Vec<RawRecord>, ImportError> {
        let value: Value = serde_json::from_slice(bytes)
            .map_err(|e| ImportError::Format(format!("Invalid JSON payload: {}", e)))?;

        let Value::Array(elements) = value else {
            return Err(ImportError::Format(
                "JSON payload must be an array of objects".to_string(),
            ));
        };

        let mut records = Vec::with_capacity(elements.len());
        for (index, element) in elements.into_iter().enumerate() {
            let Value::Object(fields) = element else {
                return Err(ImportError::Format(format!(
                    "JSON array element {} is not an object",
                    index
                )));
            };

            let mut record = RawRecord::new();
            for (key, value) in fields {
                if let Some(text) = scalar_to_string(&value) {
                    record.insert(&key, text);
                }
            }
            records.push(record);
        }

        Ok(records)
    }
}

/// Flatten a JSON value to field text. Arrays of scalars join on commas so
/// tag lists survive the mapper's tag splitting; null reads as absent.
fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Array(items) => {
            let parts: Vec<String> = items.iter().filter_map(scalar_to_string).collect();
            if parts.is_empty() {
                None
            } else {
                Some(parts.join(","))
            }
        }
        Value::Object(_) => Some(value.to_string()),
    }
}
