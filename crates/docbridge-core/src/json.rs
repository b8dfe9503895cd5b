//! JSON → host sequence model.
//!
//! Plain JSON has no subtype information, so integers become `xs:integer`
//! (narrowed later by the encoder's promotion rules), other numbers become
//! `xs:double`, and `null` becomes the empty sequence.

use crate::values::{ArrayValue, AtomicValue, MapValue, Sequence};
use num_bigint::BigInt;
use serde_json::Value;

/// Convert a JSON value into a host sequence.
pub fn sequence_from_json(value: &Value) -> Sequence {
    match value {
        Value::Null => Sequence::empty(),
        Value::Bool(b) => Sequence::singleton(AtomicValue::Boolean(*b)),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Sequence::singleton(AtomicValue::Integer(BigInt::from(i)))
            } else if let Some(u) = n.as_u64() {
                Sequence::singleton(AtomicValue::Integer(BigInt::from(u)))
            } else {
                // as_f64 only fails for arbitrary precision numbers, which are not enabled
                Sequence::singleton(AtomicValue::Double(n.as_f64().unwrap_or(f64::NAN)))
            }
        }
        Value::String(s) => Sequence::singleton(AtomicValue::String(s.clone())),
        Value::Array(elements) => {
            let array: ArrayValue = elements.iter().map(sequence_from_json).collect();
            Sequence::singleton(array)
        }
        Value::Object(fields) => {
            let mut map = MapValue::with_capacity(fields.len());
            for (key, value) in fields {
                map.insert(key.as_str(), sequence_from_json(value));
            }
            Sequence::singleton(map)
        }
    }
}
