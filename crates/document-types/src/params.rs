//! Parameter Adapter: host sequence → flat list of native call arguments.
//!
//! Used for opaque scripting calls, where the store receives an untyped
//! argument list instead of a document. This is the one conversion that
//! tolerates imprecision: anything without a native scalar form is passed as
//! its string representation, with a warning.

use crate::options::ConversionOptions;
use crate::scalar::encode_scalar;
use docbridge_core::{AtomicValue, DocValue, Item, Sequence};
use rust_decimal::prelude::ToPrimitive;

/// Native scalar argument for a scripting call.
#[derive(Debug, Clone, PartialEq)]
pub enum NativeArg {
    Bool(bool),
    Int(i64),
    Double(f64),
    String(String),
    /// Milliseconds since the Unix epoch
    DateTime(i64),
    Binary(Vec<u8>),
}

/// Convert every item of `sequence` to the nearest native scalar.
pub fn to_call_args(sequence: &Sequence) -> Vec<NativeArg> {
    let options = ConversionOptions::default();
    sequence
        .iter()
        .enumerate()
        .map(|(index, item)| to_call_arg(index, item, &options))
        .collect()
}

fn to_call_arg(index: usize, item: &Item, options: &ConversionOptions) -> NativeArg {
    let Item::Atomic(atomic) = item else {
        tracing::warn!(
            "Downgrading argument {} of type {} to its string form",
            index,
            item.type_name()
        );
        return NativeArg::String(item.to_string());
    };

    match encode_scalar(atomic, options) {
        Ok(scalar) => native_from_scalar(index, atomic, scalar),
        Err(e) => {
            tracing::warn!(
                "Downgrading argument {} to its string form: {}",
                index,
                e
            );
            NativeArg::String(atomic.lexical())
        }
    }
}

fn native_from_scalar(index: usize, atomic: &AtomicValue, scalar: DocValue) -> NativeArg {
    match scalar {
        DocValue::Boolean(b) => NativeArg::Bool(b),
        DocValue::Int32(i) => NativeArg::Int(i64::from(i)),
        DocValue::Int64(i) => NativeArg::Int(i),
        DocValue::Double(f) => NativeArg::Double(f),
        DocValue::Float32(f) => NativeArg::Double(f64::from(f)),
        DocValue::String(s) => NativeArg::String(s),
        DocValue::DateTime(millis) => NativeArg::DateTime(millis),
        DocValue::Binary(bytes) => NativeArg::Binary(bytes),
        DocValue::BigDecimal(d) => match d.to_f64() {
            Some(f) => {
                tracing::debug!("Passing decimal argument {} as a double", index);
                NativeArg::Double(f)
            }
            None => {
                tracing::warn!("Downgrading decimal argument {} to its string form", index);
                NativeArg::String(atomic.lexical())
            }
        },
        other => {
            tracing::warn!(
                "Downgrading argument {} ({}) to its string form",
                index,
                other.doc_type()
            );
            NativeArg::String(atomic.lexical())
        }
    }
}
