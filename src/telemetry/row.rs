// src/telemetry/row.rs

use serde::Serialize;
use serde_json::Value;

/// Columns carried by every row execdesk records itself, so lifecycle and
/// execution rows share one header. `timestamp` is appended by the sink.
pub const STANDARD_COLUMNS: [&str; 5] = ["event", "kind", "target", "success", "duration_ms"];

/// A single telemetry cell.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ScalarValue {
    Null,
    Bool(bool),
    Integer(i64),
    Float(f64),
    Text(String),
}

impl ScalarValue {
    /// Text written into the CSV cell. `0` and `false` are written as-is.
    pub fn to_cell(&self) -> String {
        match self {
            ScalarValue::Null => String::new(),
            ScalarValue::Bool(b) => b.to_string(),
            ScalarValue::Integer(i) => i.to_string(),
            ScalarValue::Float(f) => f.to_string(),
            ScalarValue::Text(s) => s.clone(),
        }
    }

    /// Null or empty text.
    pub fn is_blank(&self) -> bool {
        match self {
            ScalarValue::Null => true,
            ScalarValue::Text(s) => s.is_empty(),
            _ => false,
        }
    }
}

impl From<&str> for ScalarValue {
    fn from(value: &str) -> Self {
        ScalarValue::Text(value.to_string())
    }
}

impl From<String> for ScalarValue {
    fn from(value: String) -> Self {
        ScalarValue::Text(value)
    }
}

impl From<bool> for ScalarValue {
    fn from(value: bool) -> Self {
        ScalarValue::Bool(value)
    }
}

impl From<i64> for ScalarValue {
    fn from(value: i64) -> Self {
        ScalarValue::Integer(value)
    }
}

impl From<i32> for ScalarValue {
    fn from(value: i32) -> Self {
        ScalarValue::Integer(i64::from(value))
    }
}

impl From<u64> for ScalarValue {
    fn from(value: u64) -> Self {
        i64::try_from(value)
            .map(ScalarValue::Integer)
            .unwrap_or_else(|_| ScalarValue::Text(value.to_string()))
    }
}

impl From<f64> for ScalarValue {
    fn from(value: f64) -> Self {
        ScalarValue::Float(value)
    }
}

impl<T: Into<ScalarValue>> From<Option<T>> for ScalarValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(ScalarValue::Null, Into::into)
    }
}

/// Arrays and objects are not scalars; they are kept as their JSON text.
impl From<Value> for ScalarValue {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => ScalarValue::Null,
            Value::Bool(b) => ScalarValue::Bool(b),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    ScalarValue::Integer(i)
                } else if let Some(u) = n.as_u64() {
                    ScalarValue::from(u)
                } else {
                    n.as_f64().map_or(ScalarValue::Text(n.to_string()), ScalarValue::Float)
                }
            }
            Value::String(s) => ScalarValue::Text(s),
            other => ScalarValue::Text(other.to_string()),
        }
    }
}

/// An ordered set of named cells appended to the tabular log.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TelemetryRow {
    fields: Vec<(String, ScalarValue)>,
}

impl TelemetryRow {
    pub fn new() -> Self {
        Self::default()
    }

    /// A row in the standard schema with only `event` filled in.
    pub fn standard(event: &str) -> Self {
        let mut row = Self::new();
        for column in STANDARD_COLUMNS {
            row.insert(column, ScalarValue::Null);
        }
        row.insert("event", event);
        row
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<ScalarValue>) -> Self {
        self.insert(key, value);
        self
    }

    /// Set `key`, replacing an existing value in place so column order is
    /// stable.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<ScalarValue>) {
        let key = key.into();
        let value = value.into();
        match self.fields.iter_mut().find(|(k, _)| *k == key) {
            Some((_, slot)) => *slot = value,
            None => self.fields.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&ScalarValue> {
        self.fields.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(k, _)| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ScalarValue)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Fill `timestamp` when it is missing or blank.
    pub fn ensure_timestamp(&mut self, now: impl FnOnce() -> String) {
        if self.get("timestamp").is_none_or(ScalarValue::is_blank) {
            self.insert("timestamp", now());
        }
    }
}

impl<K, V> FromIterator<(K, V)> for TelemetryRow
where
    K: Into<String>,
    V: Into<ScalarValue>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut row = TelemetryRow::new();
        for (k, v) in iter {
            row.insert(k, v);
        }
        row
    }
}

/// Keeps the object's key order (`serde_json` is built with
/// `preserve_order`).
impl From<serde_json::Map<String, Value>> for TelemetryRow {
    fn from(map: serde_json::Map<String, Value>) -> Self {
        map.into_iter().collect()
    }
}
