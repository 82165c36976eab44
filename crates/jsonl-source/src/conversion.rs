//! JSON ↔ UniversalValue

use serde_json::Value;
use sync_core::UniversalValue;

/// Convert a JSON value read from a line into a cell value.
///
/// Numbers become `Int` when integral and representable, `Float`
/// otherwise. Arrays and objects are kept whole as `Json`.
pub fn json_to_value(value: Value) -> UniversalValue {
    match value {
        Value::Null => UniversalValue::Null,
        Value::Bool(b) => UniversalValue::Bool(b),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                UniversalValue::Int(i)
            } else if let Some(f) = n.as_f64() {
                UniversalValue::Float(f)
            } else {
                UniversalValue::Text(n.to_string())
            }
        }
        Value::String(s) => UniversalValue::Text(s),
        nested @ (Value::Array(_) | Value::Object(_)) => UniversalValue::Json(nested),
    }
}

/// Convert a cell value into JSON for output.
///
/// Non-finite floats have no JSON representation and are written as null.
/// Temporal values, UUIDs and bytes are written in their canonical text
/// form.
pub fn value_to_json(value: &UniversalValue) -> Value {
    match value {
        UniversalValue::Null => Value::Null,
        UniversalValue::Bool(b) => Value::Bool(*b),
        UniversalValue::Int(i) => Value::from(*i),
        UniversalValue::Float(f) => serde_json::Number::from_f64(*f)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        UniversalValue::Decimal(d) => {
            let text = d.normalize().to_string();
            serde_json::from_str::<serde_json::Number>(&text)
                .map(Value::Number)
                .unwrap_or(Value::String(text))
        }
        UniversalValue::Json(j) => j.clone(),
        UniversalValue::Text(s) => Value::String(s.clone()),
        other => Value::String(other.canonical_string()),
    }
}
