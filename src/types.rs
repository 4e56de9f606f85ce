use std::fmt;

use chrono::NaiveDateTime;
use clap::ValueEnum;
use serde_json::Value as JsonValue;

/// DB-API level implemented by the cursor/connection pair.
pub const API_LEVEL: &str = "2.0";
/// Threads may share the module and connections.
pub const THREADSAFETY: u8 = 2;
/// Extended format codes, e.g. `... WHERE name = %(name)s`.
pub const PARAMSTYLE: &str = "pyformat";

/// Values that appear in a result row or are substituted into a statement as parameters.
///
/// Rows decoded from the coordinator only ever produce `Int`, `Float`, `Text`, `Bool`,
/// `Null` and `JSON`; `Timestamp` and `Blob` exist so callers can pass them as parameters:
/// ```rust
/// use presto_txn::prelude::*;
///
/// let params = Params::positional(vec![
///     RowValues::Int(1),
///     RowValues::Text("alice".into()),
///     RowValues::Bool(true),
/// ]);
/// # let _ = params;
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum RowValues {
    /// Integer value (64-bit)
    Int(i64),
    /// Floating point value (64-bit)
    Float(f64),
    /// Text/string value
    Text(String),
    /// Boolean value
    Bool(bool),
    /// Timestamp value
    Timestamp(NaiveDateTime),
    /// NULL value
    Null,
    /// JSON value (arrays, maps and rows come back this way)
    JSON(JsonValue),
    /// Binary data
    Blob(Vec<u8>),
}

impl RowValues {
    /// Decode one cell of the `data` array in a statement response.
    #[must_use]
    pub fn from_json(value: &JsonValue) -> Self {
        match value {
            JsonValue::Null => RowValues::Null,
            JsonValue::Bool(b) => RowValues::Bool(*b),
            JsonValue::Number(n) => match n.as_i64() {
                Some(i) => RowValues::Int(i),
                None => n.as_f64().map_or(RowValues::JSON(value.clone()), RowValues::Float),
            },
            JsonValue::String(s) => RowValues::Text(s.clone()),
            JsonValue::Array(_) | JsonValue::Object(_) => RowValues::JSON(value.clone()),
        }
    }

    /// Check if this value is NULL
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    #[must_use]
    pub fn as_int(&self) -> Option<&i64> {
        if let RowValues::Int(value) = self {
            Some(value)
        } else {
            None
        }
    }

    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        if let RowValues::Text(value) = self {
            Some(value)
        } else {
            None
        }
    }

    #[must_use]
    pub fn as_bool(&self) -> Option<&bool> {
        if let RowValues::Bool(value) = self {
            Some(value)
        } else {
            None
        }
    }

    /// Timestamps arrive as text (`2024-01-31 12:00:00.000`); parse them on demand.
    #[must_use]
    pub fn as_timestamp(&self) -> Option<NaiveDateTime> {
        if let RowValues::Timestamp(value) = self {
            return Some(*value);
        } else if let Some(s) = self.as_text() {
            if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f") {
                return Some(dt);
            }
            if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
                return Some(dt);
            }
        }
        None
    }

    #[must_use]
    pub fn as_float(&self) -> Option<f64> {
        match self {
            RowValues::Float(value) => Some(*value),
            #[allow(clippy::cast_precision_loss)]
            RowValues::Int(value) => Some(*value as f64),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_json(&self) -> Option<&JsonValue> {
        if let RowValues::JSON(value) = self {
            Some(value)
        } else {
            None
        }
    }

    #[must_use]
    pub fn as_blob(&self) -> Option<&[u8]> {
        if let RowValues::Blob(bytes) = self {
            Some(bytes)
        } else {
            None
        }
    }
}

/// URL scheme used to reach the coordinator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, ValueEnum)]
pub enum Protocol {
    /// Plain HTTP
    #[default]
    Http,
    /// HTTP over TLS; required when a password is supplied
    Https,
}

impl Protocol {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Protocol::Http => "http",
            Protocol::Https => "https",
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decodes_json_cells() {
        assert_eq!(RowValues::from_json(&json!(7)), RowValues::Int(7));
        assert_eq!(RowValues::from_json(&json!(1.5)), RowValues::Float(1.5));
        assert_eq!(RowValues::from_json(&json!("x")), RowValues::Text("x".into()));
        assert_eq!(RowValues::from_json(&json!(null)), RowValues::Null);
        assert_eq!(RowValues::from_json(&json!(false)), RowValues::Bool(false));
        assert_eq!(
            RowValues::from_json(&json!([1, 2])),
            RowValues::JSON(json!([1, 2]))
        );
    }

    #[test]
    fn parses_presto_timestamp_text() {
        let cell = RowValues::Text("2024-01-31 12:30:00.250".into());
        let ts = cell.as_timestamp().expect("timestamp");
        assert_eq!(ts.format("%H:%M:%S%.3f").to_string(), "12:30:00.250");
    }

    #[test]
    fn protocol_parses_from_cli_style_value() {
        assert_eq!(Protocol::from_str("https", true), Ok(Protocol::Https));
        assert_eq!(Protocol::Http.to_string(), "http");
    }
}
