//! Value conversion between application and wire representations.
//!
//! Before a write the supplied column values are normalized in place to
//! the shape the dialect stores (boolean encodings differ per engine,
//! numeric strings become numbers, UUID text is canonicalized). After a
//! read the same mapping runs in reverse over the fetched records. Both
//! directions are idempotent: converting an already-converted value of
//! the same type yields the value unchanged. Columns without a conversion
//! pass through untouched.

use crate::config::Driver;
use crate::overrides::ValueConversionFn;
use crate::records::{Record, SqlParam};
use crate::schema::{ColumnDescriptor, TableDescriptor};
use serde_json::Value as JsonValue;

pub struct DataConverter {
    driver: Driver,
}

impl DataConverter {
    pub fn new(driver: Driver) -> Self {
        Self { driver }
    }

    /// Normalize caller-supplied column values to their wire shape, in
    /// place. An override, when present, fully replaces the default
    /// conversion for the columns it returns a value for.
    pub fn convert_input_values(
        &self,
        table: &TableDescriptor,
        values: &mut Record,
        override_fn: Option<&ValueConversionFn>,
    ) {
        for (name, value) in values.iter_mut() {
            let Some(column) = table.column(name) else {
                continue;
            };
            if let Some(f) = override_fn {
                if let Some(replacement) = f(column, value) {
                    *value = replacement;
                    continue;
                }
            }
            *value = self.input_value(column, value.clone());
        }
    }

    /// Convert fetched records back to application shape, in place, for
    /// the requested columns (all table columns when none were named).
    pub fn convert_records(
        &self,
        table: &TableDescriptor,
        column_names: &[String],
        records: &mut [Record],
        override_fn: Option<&ValueConversionFn>,
    ) {
        let columns: Vec<&ColumnDescriptor> = if column_names.is_empty() {
            table.columns().iter().collect()
        } else {
            column_names
                .iter()
                .filter_map(|name| table.column(name))
                .collect()
        };
        for record in records.iter_mut() {
            for column in &columns {
                let Some(value) = record.get_mut(&column.name) else {
                    continue;
                };
                if let Some(f) = override_fn {
                    if let Some(replacement) = f(column, value) {
                        *value = replacement;
                        continue;
                    }
                }
                *value = self.record_value(column, value.clone());
            }
        }
    }

    /// Bind-ready parameters for a normalized column-value map, in map
    /// order. Binary columns carry base64 text at the application level
    /// and are decoded to raw bytes here, at the last step before the
    /// driver.
    pub fn bind_params(&self, table: &TableDescriptor, values: &Record) -> Vec<SqlParam> {
        values
            .iter()
            .map(|(name, value)| {
                if let (Some(column), JsonValue::String(text)) = (table.column(name), value) {
                    if column.is_binary() {
                        use base64::{Engine as _, engine::general_purpose::STANDARD};
                        if let Ok(bytes) = STANDARD.decode(text) {
                            return SqlParam::Bytes(bytes);
                        }
                    }
                }
                SqlParam::from_value(value)
            })
            .collect()
    }

    /// Application value to wire value for one column.
    fn input_value(&self, column: &ColumnDescriptor, value: JsonValue) -> JsonValue {
        if value.is_null() {
            return value;
        }
        if column.is_boolean() {
            return match self.driver {
                // stored as tinyint/bit
                Driver::MySql | Driver::SqlSrv => match value {
                    JsonValue::Bool(b) => JsonValue::from(b as i64),
                    other => other,
                },
                Driver::PgSql => match value {
                    JsonValue::Number(n) => JsonValue::Bool(n.as_i64() == Some(1)),
                    other => other,
                },
            };
        }
        if column.is_integer() {
            if let JsonValue::String(text) = &value {
                if let Ok(parsed) = text.trim().parse::<i64>() {
                    return JsonValue::from(parsed);
                }
            }
            return value;
        }
        if column.is_float() {
            if let JsonValue::String(text) = &value {
                if let Ok(parsed) = text.trim().parse::<f64>() {
                    return serde_json::Number::from_f64(parsed)
                        .map(JsonValue::Number)
                        .unwrap_or(value);
                }
            }
            return value;
        }
        if column.is_uuid() {
            if let JsonValue::String(text) = &value {
                if let Ok(parsed) = uuid::Uuid::parse_str(text) {
                    return JsonValue::String(parsed.to_string());
                }
            }
            return value;
        }
        value
    }

    /// Wire value back to application value for one column.
    fn record_value(&self, column: &ColumnDescriptor, value: JsonValue) -> JsonValue {
        if value.is_null() {
            return value;
        }
        if column.is_boolean() {
            return match value {
                JsonValue::Bool(b) => JsonValue::Bool(b),
                JsonValue::Number(n) => JsonValue::Bool(n.as_i64() == Some(1)),
                JsonValue::String(s) => JsonValue::Bool(s == "1" || s == "true"),
                other => other,
            };
        }
        if column.is_integer() {
            if let JsonValue::String(text) = &value {
                if let Ok(parsed) = text.trim().parse::<i64>() {
                    return JsonValue::from(parsed);
                }
            }
            return value;
        }
        if column.is_float() {
            if let JsonValue::String(text) = &value {
                if let Ok(parsed) = text.trim().parse::<f64>() {
                    return serde_json::Number::from_f64(parsed)
                        .map(JsonValue::Number)
                        .unwrap_or(value);
                }
            }
            return value;
        }
        if column.is_uuid() {
            if let JsonValue::String(text) = &value {
                if let Ok(parsed) = uuid::Uuid::parse_str(text) {
                    return JsonValue::String(parsed.to_string());
                }
            }
            return value;
        }
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::ColumnDescriptor;
    use serde_json::json;

    fn table() -> TableDescriptor {
        TableDescriptor::new(
            "flags",
            vec![
                ColumnDescriptor::new("id", "integer", false),
                ColumnDescriptor::new("active", "boolean", false),
                ColumnDescriptor::new("ratio", "double", true),
                ColumnDescriptor::new("token", "uuid", true),
                ColumnDescriptor::new("payload", "blob", true),
                ColumnDescriptor::new("note", "varchar", true),
            ],
            "id",
        )
    }

    fn record(pairs: &[(&str, JsonValue)]) -> Record {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_boolean_input_per_dialect() {
        let mut values = record(&[("active", json!(true))]);
        DataConverter::new(Driver::MySql).convert_input_values(&table(), &mut values, None);
        assert_eq!(values["active"], json!(1));

        let mut values = record(&[("active", json!(true))]);
        DataConverter::new(Driver::PgSql).convert_input_values(&table(), &mut values, None);
        assert_eq!(values["active"], json!(true));

        let mut values = record(&[("active", json!(true))]);
        DataConverter::new(Driver::SqlSrv).convert_input_values(&table(), &mut values, None);
        assert_eq!(values["active"], json!(1));
    }

    #[test]
    fn test_input_conversion_is_idempotent() {
        let converter = DataConverter::new(Driver::MySql);
        let mut values = record(&[
            ("active", json!(true)),
            ("id", json!("12")),
            ("ratio", json!("1.5")),
        ]);
        converter.convert_input_values(&table(), &mut values, None);
        let once = values.clone();
        converter.convert_input_values(&table(), &mut values, None);
        assert_eq!(values, once);
    }

    #[test]
    fn test_record_conversion_restores_booleans_and_numbers() {
        let converter = DataConverter::new(Driver::MySql);
        let mut records = vec![record(&[
            ("active", json!(1)),
            ("id", json!("7")),
            ("ratio", json!("2.25")),
        ])];
        converter.convert_records(&table(), &[], &mut records, None);
        assert_eq!(records[0]["active"], json!(true));
        assert_eq!(records[0]["id"], json!(7));
        assert_eq!(records[0]["ratio"], json!(2.25));
    }

    #[test]
    fn test_round_trip_identity() {
        // input conversion then record conversion gives back the original
        for driver in [Driver::MySql, Driver::PgSql, Driver::SqlSrv] {
            let converter = DataConverter::new(driver);
            let original = record(&[
                ("active", json!(true)),
                ("id", json!(42)),
                ("note", json!("unchanged")),
                ("token", json!("F47AC10B-58CC-4372-A567-0E02B2C3D479")),
            ]);
            let mut values = original.clone();
            converter.convert_input_values(&table(), &mut values, None);
            let mut records = vec![values];
            converter.convert_records(&table(), &[], &mut records, None);
            assert_eq!(records[0]["active"], json!(true));
            assert_eq!(records[0]["id"], json!(42));
            assert_eq!(records[0]["note"], json!("unchanged"));
            // uuid canonical form is stable once normalized
            assert_eq!(
                records[0]["token"],
                json!("f47ac10b-58cc-4372-a567-0e02b2c3d479")
            );
        }
    }

    #[test]
    fn test_unregistered_columns_pass_through() {
        let converter = DataConverter::new(Driver::MySql);
        let mut values = record(&[("note", json!("  keep me  ")), ("ghost", json!(5))]);
        converter.convert_input_values(&table(), &mut values, None);
        assert_eq!(values["note"], json!("  keep me  "));
        assert_eq!(values["ghost"], json!(5));
    }

    #[test]
    fn test_override_replaces_default() {
        let converter = DataConverter::new(Driver::MySql);
        let override_fn: ValueConversionFn = Box::new(|column, value| {
            if column.name == "active" {
                Some(json!(format!("custom:{}", value)))
            } else {
                None
            }
        });
        let mut values = record(&[("active", json!(true)), ("id", json!("3"))]);
        converter.convert_input_values(&table(), &mut values, Some(&override_fn));
        assert_eq!(values["active"], json!("custom:true"));
        // unmatched columns still take the default path
        assert_eq!(values["id"], json!(3));
    }

    #[test]
    fn test_binary_params_decode_base64() {
        let converter = DataConverter::new(Driver::PgSql);
        let values = record(&[("payload", json!("aGVsbG8=")), ("note", json!("x"))]);
        let params = converter.bind_params(&table(), &values);
        assert_eq!(params[0], SqlParam::Bytes(b"hello".to_vec()));
        assert_eq!(params[1], SqlParam::String("x".to_string()));
    }
}
