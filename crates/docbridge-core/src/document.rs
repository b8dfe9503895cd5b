//! Schema-less document values.
//!
//! This is the shape the document store produces and consumes: objects with
//! ordered string keys, arrays, and tagged scalars. The driver boundary in
//! `document-types` maps it to and from the driver's own BSON values.

use crate::types::DocType;
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use num_bigint::BigInt;
use rust_decimal::Decimal;
use std::fmt;

/// A store-native 12-byte identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OpaqueId([u8; 12]);

impl OpaqueId {
    /// Wrap raw identifier bytes.
    pub fn from_bytes(bytes: [u8; 12]) -> Self {
        Self(bytes)
    }

    /// Parse the canonical 24-character hex form (either case).
    pub fn parse_hex(s: &str) -> Result<Self, hex::FromHexError> {
        let mut bytes = [0u8; 12];
        hex::decode_to_slice(s, &mut bytes)?;
        Ok(Self(bytes))
    }

    /// Raw identifier bytes.
    pub fn bytes(&self) -> [u8; 12] {
        self.0
    }

    /// Canonical lowercase hex encoding.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for OpaqueId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// Ordered mapping from string key to document value.
///
/// Insertion order is preserved. Inserting an existing key replaces the value
/// in place, so the last write wins while the key keeps its first position.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DocObject {
    fields: IndexMap<String, DocValue>,
}

impl DocObject {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            fields: IndexMap::with_capacity(capacity),
        }
    }

    /// Insert a field, returning the previous value for that key if any.
    pub fn insert(&mut self, key: impl Into<String>, value: DocValue) -> Option<DocValue> {
        self.fields.insert(key.into(), value)
    }

    pub fn get(&self, key: &str) -> Option<&DocValue> {
        self.fields.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    pub fn iter(&self) -> indexmap::map::Iter<'_, String, DocValue> {
        self.fields.iter()
    }
}

impl FromIterator<(String, DocValue)> for DocObject {
    fn from_iter<T: IntoIterator<Item = (String, DocValue)>>(iter: T) -> Self {
        let mut object = DocObject::new();
        for (key, value) in iter {
            object.insert(key, value);
        }
        object
    }
}

impl IntoIterator for DocObject {
    type Item = (String, DocValue);
    type IntoIter = indexmap::map::IntoIter<String, DocValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.into_iter()
    }
}

impl<'a> IntoIterator for &'a DocObject {
    type Item = (&'a String, &'a DocValue);
    type IntoIter = indexmap::map::Iter<'a, String, DocValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.iter()
    }
}

/// A schema-less document value.
#[derive(Debug, Clone, PartialEq)]
pub enum DocValue {
    /// Embedded document
    Object(DocObject),

    /// Ordered list of values
    Array(Vec<DocValue>),

    /// Explicit null
    Null,

    /// UTF-8 string
    String(String),

    /// 32-bit signed integer
    Int32(i32),

    /// 64-bit signed integer
    Int64(i64),

    /// 64-bit floating point
    Double(f64),

    /// 32-bit floating point
    Float32(f32),

    /// Boolean
    Boolean(bool),

    /// Arbitrary precision integer (only for stores that support it)
    BigInteger(BigInt),

    /// Exact decimal
    BigDecimal(Decimal),

    /// Store-native 12-byte identifier
    ObjectId(OpaqueId),

    /// Milliseconds since the Unix epoch
    DateTime(i64),

    /// Opaque bytes
    Binary(Vec<u8>),
}

impl DocValue {
    /// Declared variant of this value.
    pub fn doc_type(&self) -> DocType {
        match self {
            DocValue::Object(_) => DocType::Object,
            DocValue::Array(_) => DocType::Array,
            DocValue::Null => DocType::Null,
            DocValue::String(_) => DocType::String,
            DocValue::Int32(_) => DocType::Int32,
            DocValue::Int64(_) => DocType::Int64,
            DocValue::Double(_) => DocType::Double,
            DocValue::Float32(_) => DocType::Float32,
            DocValue::Boolean(_) => DocType::Boolean,
            DocValue::BigInteger(_) => DocType::BigInteger,
            DocValue::BigDecimal(_) => DocType::BigDecimal,
            DocValue::ObjectId(_) => DocType::ObjectId,
            DocValue::DateTime(_) => DocType::DateTime,
            DocValue::Binary(_) => DocType::Binary,
        }
    }

    /// Build a `DateTime` value from a chrono instant.
    ///
    /// Returns `None` when the instant has sub-millisecond precision.
    pub fn exact_datetime(dt: &DateTime<Utc>) -> Option<Self> {
        if dt.timestamp_subsec_nanos() % 1_000_000 != 0 {
            return None;
        }
        Some(DocValue::DateTime(dt.timestamp_millis()))
    }

    pub fn is_null(&self) -> bool {
        matches!(self, DocValue::Null)
    }

    pub fn as_object(&self) -> Option<&DocObject> {
        match self {
            DocValue::Object(o) => Some(o),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[DocValue]> {
        match self {
            DocValue::Array(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            DocValue::String(s) => Some(s),
            _ => None,
        }
    }
}

impl From<DocObject> for DocValue {
    fn from(object: DocObject) -> Self {
        DocValue::Object(object)
    }
}

impl From<Vec<DocValue>> for DocValue {
    fn from(values: Vec<DocValue>) -> Self {
        DocValue::Array(values)
    }
}

impl From<&str> for DocValue {
    fn from(s: &str) -> Self {
        DocValue::String(s.to_string())
    }
}

impl From<String> for DocValue {
    fn from(s: String) -> Self {
        DocValue::String(s)
    }
}

impl From<i32> for DocValue {
    fn from(i: i32) -> Self {
        DocValue::Int32(i)
    }
}

impl From<i64> for DocValue {
    fn from(i: i64) -> Self {
        DocValue::Int64(i)
    }
}

impl From<f64> for DocValue {
    fn from(f: f64) -> Self {
        DocValue::Double(f)
    }
}

impl From<bool> for DocValue {
    fn from(b: bool) -> Self {
        DocValue::Boolean(b)
    }
}

impl From<OpaqueId> for DocValue {
    fn from(id: OpaqueId) -> Self {
        DocValue::ObjectId(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_opaque_id_hex_is_lowercase() {
        let id = OpaqueId::from_bytes([
            0x50, 0x7F, 0x1F, 0x77, 0xBC, 0xF8, 0x6C, 0xD7, 0x99, 0x43, 0x90, 0x11,
        ]);
        assert_eq!(id.to_hex(), "507f1f77bcf86cd799439011");
        assert_eq!(OpaqueId::parse_hex("507F1F77BCF86CD799439011").unwrap(), id);
    }

    #[test]
    fn test_opaque_id_rejects_wrong_length() {
        assert!(OpaqueId::parse_hex("507f1f").is_err());
        assert!(OpaqueId::parse_hex("zz7f1f77bcf86cd799439011").is_err());
    }

    #[test]
    fn test_object_last_write_wins_in_place() {
        let mut object = DocObject::new();
        object.insert("b", DocValue::Int32(1));
        object.insert("a", DocValue::Int32(2));
        let previous = object.insert("b", DocValue::Int32(3));

        assert_eq!(previous, Some(DocValue::Int32(1)));
        assert_eq!(object.keys().collect::<Vec<_>>(), vec!["b", "a"]);
        assert_eq!(object.get("b"), Some(&DocValue::Int32(3)));
    }

    #[test]
    fn test_doc_type_tags() {
        assert_eq!(DocValue::Null.doc_type(), DocType::Null);
        assert_eq!(DocValue::from(7i64).doc_type(), DocType::Int64);
        assert_eq!(
            DocValue::from(DocObject::new()).doc_type(),
            DocType::Object
        );
    }

    #[test]
    fn test_exact_datetime() {
        let dt = Utc.with_ymd_and_hms(2024, 6, 15, 10, 30, 0).unwrap();
        assert_eq!(
            DocValue::exact_datetime(&dt),
            Some(DocValue::DateTime(dt.timestamp_millis()))
        );

        let fine = dt + chrono::Duration::nanoseconds(1_500);
        assert_eq!(DocValue::exact_datetime(&fine), None);
    }
}
