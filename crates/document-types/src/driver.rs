//! Driver boundary: document values ↔ BSON.
//!
//! The store driver speaks `bson::Bson`. This module maps it onto the
//! document model and back. BSON types with no document counterpart
//! (regular expressions, JavaScript code, min/max keys, DB pointers) are
//! rejected with `UnsupportedType`, not stringified.

use crate::error::{ConversionError, Result};
use crate::options::ConversionOptions;
use crate::params::NativeArg;
use crate::path::ValuePath;
use bson::spec::BinarySubtype;
use bson::{Binary, Bson, Decimal128, Document};
use docbridge_core::{DocObject, DocValue, OpaqueId};
use rust_decimal::Decimal;
use std::str::FromStr;

/// Convert a BSON value to a document value.
pub fn bson_to_doc(value: &Bson, options: &ConversionOptions) -> Result<DocValue> {
    Walker::new(options).read_value(value)
}

/// Convert a BSON document to a document object.
pub fn document_to_doc(document: &Document, options: &ConversionOptions) -> Result<DocObject> {
    Walker::new(options).read_document(document)
}

/// Convert a document value to BSON.
pub fn doc_to_bson(value: &DocValue, options: &ConversionOptions) -> Result<Bson> {
    Walker::new(options).write_value(value)
}

/// Convert a document object to a BSON document.
pub fn doc_to_document(object: &DocObject, options: &ConversionOptions) -> Result<Document> {
    Walker::new(options).write_document(object)
}

/// Convert a scripting call argument to BSON.
pub fn native_arg_to_bson(arg: &NativeArg) -> Bson {
    match arg {
        NativeArg::Bool(b) => Bson::Boolean(*b),
        NativeArg::Int(i) => match i32::try_from(*i) {
            Ok(narrow) => Bson::Int32(narrow),
            Err(_) => Bson::Int64(*i),
        },
        NativeArg::Double(f) => Bson::Double(*f),
        NativeArg::String(s) => Bson::String(s.clone()),
        NativeArg::DateTime(millis) => Bson::DateTime(bson::DateTime::from_millis(*millis)),
        NativeArg::Binary(bytes) => Bson::Binary(Binary {
            subtype: BinarySubtype::Generic,
            bytes: bytes.clone(),
        }),
    }
}

/// Name used in diagnostics for BSON types without a document counterpart.
fn bson_type_name(value: &Bson) -> &'static str {
    match value {
        Bson::RegularExpression(_) => "regex",
        Bson::JavaScriptCode(_) => "javascript",
        Bson::JavaScriptCodeWithScope(_) => "javascriptWithScope",
        Bson::MinKey => "minKey",
        Bson::MaxKey => "maxKey",
        Bson::DbPointer(_) => "dbPointer",
        _ => "bson",
    }
}

/// Largest scale an `xs:decimal` holds.
const MAX_DECIMAL_SCALE: i64 = 28;

/// Widest coefficient, in digits, of an `xs:decimal` with scale zero.
const MAX_DECIMAL_DIGITS: i64 = 29;

/// Decimal128 → `xs:decimal`, exactly or not at all.
///
/// Trailing zeros are dropped only as far as needed to bring the scale into
/// range, so representable values keep their scale. Any zero coefficient is
/// zero whatever its exponent.
fn decimal_from_bson(d: &Decimal128) -> Result<Decimal> {
    let text = d.to_string();
    if text.contains("NaN") || text.contains("Inf") {
        return Err(ConversionError::malformed(
            "decimal128",
            format!("{text} is not a finite decimal"),
        ));
    }
    let overflow = || ConversionError::overflow(&text, "xs:decimal");
    let malformed = || ConversionError::malformed("decimal128", format!("unreadable text {text}"));

    let (mantissa, exponent) = match text.split_once(['E', 'e']) {
        Some((mantissa, exponent)) => {
            let exponent = exponent.parse::<i64>().map_err(|_| malformed())?;
            (mantissa, exponent)
        }
        None => (text.as_str(), 0),
    };
    let (negative, mantissa) = match mantissa.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, mantissa.strip_prefix('+').unwrap_or(mantissa)),
    };
    let (whole, fraction) = mantissa.split_once('.').unwrap_or((mantissa, ""));
    if !whole.bytes().chain(fraction.bytes()).all(|b| b.is_ascii_digit()) {
        return Err(malformed());
    }

    let mut exponent = exponent - fraction.len() as i64;
    let mut digits = format!("{whole}{fraction}").trim_start_matches('0').to_string();
    if digits.is_empty() {
        return Ok(Decimal::ZERO);
    }
    while exponent < -MAX_DECIMAL_SCALE && digits.ends_with('0') {
        digits.pop();
        exponent += 1;
    }
    if exponent < -MAX_DECIMAL_SCALE {
        return Err(overflow());
    }

    let plain = if exponent >= 0 {
        if digits.len() as i64 + exponent > MAX_DECIMAL_DIGITS {
            return Err(overflow());
        }
        digits.extend(std::iter::repeat('0').take(exponent as usize));
        digits
    } else {
        let scale = exponent.unsigned_abs() as usize;
        if digits.len() > scale {
            let (int_part, frac_part) = digits.split_at(digits.len() - scale);
            format!("{int_part}.{frac_part}")
        } else {
            format!("0.{}{digits}", "0".repeat(scale - digits.len()))
        }
    };
    let value = Decimal::from_str_exact(&plain).map_err(|_| overflow())?;
    Ok(if negative { -value } else { value })
}

fn decimal_to_bson(d: &Decimal) -> Result<Decimal128> {
    Decimal128::from_str(&d.to_string()).map_err(|_| ConversionError::overflow(d, "decimal128"))
}

struct Walker<'a> {
    options: &'a ConversionOptions,
    path: ValuePath,
    depth: usize,
}

impl<'a> Walker<'a> {
    fn new(options: &'a ConversionOptions) -> Self {
        Self {
            options,
            path: ValuePath::root(),
            depth: 0,
        }
    }

    fn enter(&mut self) -> Result<()> {
        self.depth += 1;
        if self.depth > self.options.max_depth {
            return Err(ConversionError::TooDeeplyNested {
                depth: self.depth,
                limit: self.options.max_depth,
                path: self.path.clone(),
            });
        }
        Ok(())
    }

    fn leave(&mut self) {
        self.depth -= 1;
    }

    fn read_document(&mut self, document: &Document) -> Result<DocObject> {
        self.enter()?;
        let mut object = DocObject::with_capacity(document.len());
        for (key, value) in document {
            self.path.push_key(key.as_str());
            let converted = self.read_value(value)?;
            self.path.pop();
            object.insert(key.clone(), converted);
        }
        self.leave();
        Ok(object)
    }

    fn read_value(&mut self, value: &Bson) -> Result<DocValue> {
        let converted = match value {
            Bson::Document(document) => DocValue::Object(self.read_document(document)?),
            Bson::Array(elements) => {
                self.enter()?;
                let mut values = Vec::with_capacity(elements.len());
                for (i, element) in elements.iter().enumerate() {
                    self.path.push_index(i);
                    values.push(self.read_value(element)?);
                    self.path.pop();
                }
                self.leave();
                DocValue::Array(values)
            }
            Bson::Null | Bson::Undefined => DocValue::Null,
            Bson::String(s) | Bson::Symbol(s) => DocValue::String(s.clone()),
            Bson::Boolean(b) => DocValue::Boolean(*b),
            Bson::Int32(i) => DocValue::Int32(*i),
            Bson::Int64(i) => DocValue::Int64(*i),
            Bson::Double(f) => DocValue::Double(*f),
            Bson::Decimal128(d) => {
                DocValue::BigDecimal(decimal_from_bson(d).map_err(|e| e.at(&self.path))?)
            }
            Bson::ObjectId(oid) => DocValue::ObjectId(OpaqueId::from_bytes(oid.bytes())),
            Bson::DateTime(dt) => DocValue::DateTime(dt.timestamp_millis()),
            // Replication timestamps carry whole seconds
            Bson::Timestamp(ts) => DocValue::DateTime(i64::from(ts.time) * 1000),
            Bson::Binary(binary) => DocValue::Binary(binary.bytes.clone()),
            other => {
                return Err(ConversionError::UnsupportedType {
                    type_name: bson_type_name(other).to_string(),
                    path: self.path.clone(),
                })
            }
        };
        Ok(converted)
    }

    fn write_document(&mut self, object: &DocObject) -> Result<Document> {
        self.enter()?;
        let mut document = Document::new();
        for (key, value) in object {
            self.path.push_key(key.as_str());
            let converted = self.write_value(value)?;
            self.path.pop();
            document.insert(key.clone(), converted);
        }
        self.leave();
        Ok(document)
    }

    fn write_value(&mut self, value: &DocValue) -> Result<Bson> {
        let converted = match value {
            DocValue::Object(object) => Bson::Document(self.write_document(object)?),
            DocValue::Array(elements) => {
                self.enter()?;
                let mut values = Vec::with_capacity(elements.len());
                for (i, element) in elements.iter().enumerate() {
                    self.path.push_index(i);
                    values.push(self.write_value(element)?);
                    self.path.pop();
                }
                self.leave();
                Bson::Array(values)
            }
            DocValue::Null => Bson::Null,
            DocValue::String(s) => Bson::String(s.clone()),
            DocValue::Boolean(b) => Bson::Boolean(*b),
            DocValue::Int32(i) => Bson::Int32(*i),
            DocValue::Int64(i) => Bson::Int64(*i),
            DocValue::Double(f) => Bson::Double(*f),
            DocValue::Float32(f) => Bson::Double(f64::from(*f)),
            // BSON has no arbitrary precision integer type
            DocValue::BigInteger(i) => {
                return Err(ConversionError::overflow(i, "int64").at(&self.path));
            }
            DocValue::BigDecimal(d) => {
                Bson::Decimal128(decimal_to_bson(d).map_err(|e| e.at(&self.path))?)
            }
            DocValue::ObjectId(id) => Bson::ObjectId(bson::oid::ObjectId::from_bytes(id.bytes())),
            DocValue::DateTime(millis) => Bson::DateTime(bson::DateTime::from_millis(*millis)),
            DocValue::Binary(bytes) => Bson::Binary(Binary {
                subtype: BinarySubtype::Generic,
                bytes: bytes.clone(),
            }),
        };
        Ok(converted)
    }
}
