//! Records and wire parameters.
//!
//! Application-level values are `serde_json::Value`; a row is an ordered
//! map from column name to value (insertion order preserved). Binding to a
//! driver goes through the closed [`SqlParam`] enum.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// An ordered row: column name to application-level value.
pub type Record = serde_json::Map<String, JsonValue>;

/// A positional parameter bound to a prepared statement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SqlParam {
    /// NULL value
    Null,
    /// Boolean value
    Bool(bool),
    /// Signed integer (stored as i64 for maximum range)
    Int(i64),
    /// Unsigned integer beyond i64 range
    UInt(u64),
    /// Floating point value
    Float(f64),
    /// String value
    String(String),
    /// Binary data
    Bytes(Vec<u8>),
}

impl SqlParam {
    /// Check if this parameter is null.
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Type name of this parameter, for diagnostics.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::UInt(_) => "uint",
            Self::Float(_) => "float",
            Self::String(_) => "string",
            Self::Bytes(_) => "bytes",
        }
    }

    /// Bind-ready parameter from an application-level value. Arrays and
    /// objects are serialized to their JSON text; the type converter has
    /// already produced wire-shaped scalars for typed columns.
    pub fn from_value(value: &JsonValue) -> Self {
        match value {
            JsonValue::Null => Self::Null,
            JsonValue::Bool(b) => Self::Bool(*b),
            JsonValue::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Self::Int(i)
                } else if let Some(u) = n.as_u64() {
                    Self::UInt(u)
                } else {
                    Self::Float(n.as_f64().unwrap_or(0.0))
                }
            }
            JsonValue::String(s) => Self::String(s.clone()),
            other => Self::String(other.to_string()),
        }
    }

    /// Back to an application-level value (scalar results, generated keys).
    pub fn into_value(self) -> JsonValue {
        match self {
            Self::Null => JsonValue::Null,
            Self::Bool(b) => JsonValue::Bool(b),
            Self::Int(i) => JsonValue::from(i),
            Self::UInt(u) => JsonValue::from(u),
            Self::Float(f) => serde_json::Number::from_f64(f)
                .map(JsonValue::Number)
                .unwrap_or(JsonValue::Null),
            Self::String(s) => JsonValue::String(s),
            Self::Bytes(b) => {
                use base64::{Engine as _, engine::general_purpose::STANDARD};
                JsonValue::String(STANDARD.encode(b))
            }
        }
    }
}

/// Convert an ordered value map into bind-ready positional parameters,
/// in map order.
pub fn params_from(values: &Record) -> Vec<SqlParam> {
    values.values().map(SqlParam::from_value).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_param_from_value() {
        assert_eq!(SqlParam::from_value(&json!(null)), SqlParam::Null);
        assert_eq!(SqlParam::from_value(&json!(true)), SqlParam::Bool(true));
        assert_eq!(SqlParam::from_value(&json!(42)), SqlParam::Int(42));
        assert_eq!(
            SqlParam::from_value(&json!(18446744073709551615u64)),
            SqlParam::UInt(u64::MAX)
        );
        assert_eq!(SqlParam::from_value(&json!(1.5)), SqlParam::Float(1.5));
        assert_eq!(
            SqlParam::from_value(&json!("abc")),
            SqlParam::String("abc".to_string())
        );
    }

    #[test]
    fn test_param_round_trip() {
        for value in [json!(null), json!(false), json!(7), json!("x")] {
            assert_eq!(SqlParam::from_value(&value).into_value(), value);
        }
    }

    #[test]
    fn test_params_preserve_order() {
        let mut record = Record::new();
        record.insert("b".to_string(), json!(2));
        record.insert("a".to_string(), json!(1));
        let params = params_from(&record);
        assert_eq!(params, vec![SqlParam::Int(2), SqlParam::Int(1)]);
    }

    #[test]
    fn test_type_names() {
        assert_eq!(SqlParam::Null.type_name(), "null");
        assert_eq!(SqlParam::Bytes(vec![1]).type_name(), "bytes");
        assert!(SqlParam::Null.is_null());
    }
}
