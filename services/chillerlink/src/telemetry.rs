//! Telemetry values, records and the line decoder
//!
//! The controller publishes one JSON object per line. Grouped objects such as
//! `{"Temp":{"Evap_LWT":44.1}}` are flattened to dotted keys (`Temp.Evap_LWT`).
//! Members without a scalar value (`null`, arrays) are left out, so consumers
//! see them as unavailable.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{LinkError, Result};

/// Separator for flattened keys
pub const KEY_SEPARATOR: char = '.';

/// One telemetry value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TelemetryValue {
    Bool(bool),
    Number(f64),
    Text(String),
}

impl TelemetryValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Truthiness used by alarm flags: `true`, non-zero numbers, "ON"/"1"
    pub fn is_truthy(&self) -> bool {
        match self {
            Self::Bool(b) => *b,
            Self::Number(n) => *n != 0.0,
            Self::Text(s) => matches!(s.trim().to_ascii_uppercase().as_str(), "ON" | "1" | "TRUE"),
        }
    }

    /// Render for display with `decimals` places for numbers
    pub fn display(&self, decimals: usize) -> String {
        match self {
            Self::Bool(true) => "ON".to_string(),
            Self::Bool(false) => "OFF".to_string(),
            Self::Number(n) => format!("{:.*}", decimals, n),
            Self::Text(s) => s.clone(),
        }
    }
}

impl fmt::Display for TelemetryValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{}", b),
            Self::Number(n) => write!(f, "{}", n),
            Self::Text(s) => f.write_str(s),
        }
    }
}

impl From<f64> for TelemetryValue {
    fn from(v: f64) -> Self {
        Self::Number(v)
    }
}

impl From<bool> for TelemetryValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<&str> for TelemetryValue {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

/// One decoded telemetry line: a sparse map of key to value
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TelemetryRecord(HashMap<String, TelemetryValue>);

impl TelemetryRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&TelemetryValue> {
        self.0.get(key)
    }

    pub fn get_f64(&self, key: &str) -> Option<f64> {
        self.get(key).and_then(TelemetryValue::as_f64)
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.get(key).and_then(TelemetryValue::as_bool)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(TelemetryValue::as_str)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<TelemetryValue>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &TelemetryValue)> {
        self.0.iter()
    }

    /// Keys in sorted order
    pub fn sorted_keys(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = self.0.keys().map(String::as_str).collect();
        keys.sort_unstable();
        keys
    }
}

impl FromIterator<(String, TelemetryValue)> for TelemetryRecord {
    fn from_iter<I: IntoIterator<Item = (String, TelemetryValue)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Stateless line decoder
#[derive(Debug, Default, Clone, Copy)]
pub struct TelemetryDecoder;

impl TelemetryDecoder {
    /// Decode one framed line
    pub fn decode(line: &str) -> Result<TelemetryRecord> {
        let value: Value = serde_json::from_str(line)?;
        let map = match value {
            Value::Object(map) => map,
            other => {
                return Err(LinkError::malformed(format!(
                    "expected a JSON object, got {}",
                    kind_of(&other)
                )))
            },
        };

        let mut record = TelemetryRecord::new();
        flatten_into(&mut record, None, map);
        Ok(record)
    }
}

fn flatten_into(record: &mut TelemetryRecord, prefix: Option<&str>, map: Map<String, Value>) {
    for (key, value) in map {
        let key = match prefix {
            Some(p) => format!("{}{}{}", p, KEY_SEPARATOR, key),
            None => key,
        };
        match value {
            Value::Bool(b) => record.insert(key, b),
            Value::Number(n) => {
                if let Some(f) = n.as_f64() {
                    record.insert(key, f);
                }
            },
            Value::String(s) => record.insert(key, TelemetryValue::Text(s)),
            Value::Object(inner) => flatten_into(record, Some(&key), inner),
            Value::Null | Value::Array(_) => {},
        }
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
