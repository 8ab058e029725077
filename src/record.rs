use serde_json::{Map, Value};

use crate::errors::BotError;
use crate::types::{FieldName, KeyValues};

/// One flat observation: field name to scalar value, in field order.
///
/// The map is index-backed (`serde_json` with `preserve_order`), so field
/// order survives a load, merge, and save round trip.
pub type Record = Map<String, Value>;

/// Decode a raw JSON payload into an ordered sequence of flat records.
///
/// `context` names the payload origin (usually a file path) for error
/// reporting. The payload must be an array; every element must be an
/// object; every field value must be a scalar (string, number, boolean, or
/// null). Anything else is a [`BotError::MalformedHistory`], never an empty
/// sequence.
pub fn records_from_value(value: Value, context: &str) -> Result<Vec<Record>, BotError> {
    let items = match value {
        Value::Array(items) => items,
        other => {
            return Err(malformed(
                context,
                format!("expected a JSON array of records, found {}", kind_of(&other)),
            ));
        }
    };
    let mut records = Vec::with_capacity(items.len());
    for (idx, item) in items.into_iter().enumerate() {
        let record = match item {
            Value::Object(fields) => fields,
            other => {
                return Err(malformed(
                    context,
                    format!("record {idx} is {}, not an object", kind_of(&other)),
                ));
            }
        };
        if let Some((field, value)) = record.iter().find(|(_, v)| !is_scalar(v)) {
            return Err(malformed(
                context,
                format!(
                    "record {idx} field '{field}' holds nested {}, records must be flat",
                    kind_of(value)
                ),
            ));
        }
        records.push(record);
    }
    Ok(records)
}

/// Coerce a scalar value to its canonical string form.
///
/// Strings pass through, numbers and booleans stringify, null maps to the
/// empty string (absent and null key fields compare equal).
pub fn scalar_to_string(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(text) => text.clone(),
        Value::Bool(flag) => flag.to_string(),
        Value::Number(number) => number.to_string(),
        other => other.to_string(),
    }
}

/// Extract a record's composite-key values for `fields`, in field order.
///
/// Missing fields contribute an empty string to the key and are returned in
/// the second tuple slot so callers can surface the degraded key.
pub fn key_values(record: &Record, fields: &[FieldName]) -> (KeyValues, Vec<FieldName>) {
    let mut values = Vec::with_capacity(fields.len());
    let mut missing = Vec::new();
    for field in fields {
        match record.get(field) {
            Some(value) => values.push(scalar_to_string(value)),
            None => {
                values.push(String::new());
                missing.push(field.clone());
            }
        }
    }
    (values, missing)
}

fn is_scalar(value: &Value) -> bool {
    !matches!(value, Value::Array(_) | Value::Object(_))
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

fn malformed(context: &str, reason: String) -> BotError {
    BotError::MalformedHistory {
        context: context.to_string(),
        reason,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decodes_flat_records_in_order() {
        let payload = json!([
            {"cookie": "milk_chocolate_chip", "fetched": "2025-08-01"},
            {"cookie": "snickerdoodle", "fetched": "2025-08-01"},
        ]);
        let records = records_from_value(payload, "test").unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0]["cookie"], "milk_chocolate_chip");
        assert_eq!(records[1]["cookie"], "snickerdoodle");
    }

    #[test]
    fn rejects_non_array_payloads() {
        let err = records_from_value(json!({"rows": []}), "test").unwrap_err();
        assert!(matches!(err, BotError::MalformedHistory { .. }));
    }

    #[test]
    fn rejects_non_object_elements() {
        let err = records_from_value(json!([1, 2, 3]), "test").unwrap_err();
        assert!(matches!(err, BotError::MalformedHistory { .. }));
    }

    #[test]
    fn rejects_nested_field_values() {
        let payload = json!([{"id": 1, "geometry": {"x": 1.0}}]);
        let err = records_from_value(payload, "test").unwrap_err();
        let text = err.to_string();
        assert!(text.contains("geometry"), "unexpected message: {text}");
    }

    #[test]
    fn scalar_strings_cover_every_scalar_kind() {
        assert_eq!(scalar_to_string(&json!("a")), "a");
        assert_eq!(scalar_to_string(&json!(12)), "12");
        assert_eq!(scalar_to_string(&json!(2.5)), "2.5");
        assert_eq!(scalar_to_string(&json!(true)), "true");
        assert_eq!(scalar_to_string(&Value::Null), "");
    }

    #[test]
    fn key_values_report_missing_fields() {
        let record = records_from_value(json!([{"username": "nasa"}]), "test")
            .unwrap()
            .remove(0);
        let fields = vec!["username".to_string(), "date".to_string()];
        let (values, missing) = key_values(&record, &fields);
        assert_eq!(values, vec!["nasa".to_string(), String::new()]);
        assert_eq!(missing, vec!["date".to_string()]);
    }
}
