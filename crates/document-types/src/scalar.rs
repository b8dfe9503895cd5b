//! Scalar Codec: atomic value ↔ scalar document value.
//!
//! Dispatch is on the runtime tag of the input. Integer values promote to the
//! narrowest document width that holds them; nothing is ever truncated.
//!
//! Opaque identifiers decode to their lowercase hex string, but a string is
//! never turned back into an identifier on encode. That direction is a
//! one-way convenience; callers that need an identifier must build one.
//!
//! Stored dates span the whole `i64` millisecond range, but `xs:dateTime`
//! only reaches about 262,000 years either side of year 0. A stored date
//! beyond that decodes to `MalformedScalar` rather than a clamped instant.

use crate::error::{ConversionError, Result};
use crate::options::ConversionOptions;
use chrono::DateTime;
use docbridge_core::{AtomicValue, DocValue};

/// Convert a host atomic value to a scalar document value.
///
/// # Errors
///
/// - `UnsupportedType` for `xs:dayTimeDuration` and `xs:QName`
/// - `NumericOverflow` for an `xs:integer` outside the 64-bit range when the
///   target does not accept big integers, and for an `xs:dateTime` with
///   sub-millisecond precision
pub fn encode_scalar(value: &AtomicValue, options: &ConversionOptions) -> Result<DocValue> {
    match value {
        AtomicValue::String(s) | AtomicValue::UntypedAtomic(s) => Ok(DocValue::String(s.clone())),
        AtomicValue::Boolean(b) => Ok(DocValue::Boolean(*b)),

        AtomicValue::Int(i) => Ok(DocValue::Int32(*i)),
        AtomicValue::Long(i) => Ok(DocValue::Int64(*i)),
        AtomicValue::Integer(i) => {
            if let Ok(narrow) = i32::try_from(i) {
                Ok(DocValue::Int32(narrow))
            } else if let Ok(wide) = i64::try_from(i) {
                Ok(DocValue::Int64(wide))
            } else if options.big_integers {
                Ok(DocValue::BigInteger(i.clone()))
            } else {
                Err(ConversionError::overflow(i, "int64"))
            }
        }

        AtomicValue::Decimal(d) => Ok(DocValue::BigDecimal(*d)),
        AtomicValue::Double(f) => Ok(DocValue::Double(*f)),
        AtomicValue::Float(f) => Ok(DocValue::Float32(*f)),

        AtomicValue::DateTime(dt) => DocValue::exact_datetime(dt)
            .ok_or_else(|| ConversionError::overflow(value.lexical(), "dateTime (milliseconds)")),

        AtomicValue::Base64Binary(bytes) => Ok(DocValue::Binary(bytes.clone())),

        AtomicValue::DayTimeDuration(_) | AtomicValue::QName { .. } => {
            Err(ConversionError::unsupported(value.atomic_type().name()))
        }
    }
}

/// Convert a scalar document value to a host atomic value.
///
/// # Errors
///
/// - `UnsupportedType` for objects, arrays and null, which are not scalars
/// - `MalformedScalar` for a date/time outside the representable range
pub fn decode_scalar(value: &DocValue) -> Result<AtomicValue> {
    match value {
        DocValue::String(s) => Ok(AtomicValue::String(s.clone())),
        DocValue::Boolean(b) => Ok(AtomicValue::Boolean(*b)),
        DocValue::Int32(i) => Ok(AtomicValue::Int(*i)),
        DocValue::Int64(i) => Ok(AtomicValue::Long(*i)),
        DocValue::Double(f) => Ok(AtomicValue::Double(*f)),
        DocValue::Float32(f) => Ok(AtomicValue::Float(*f)),
        DocValue::BigInteger(i) => Ok(AtomicValue::Integer(i.clone())),
        DocValue::BigDecimal(d) => Ok(AtomicValue::Decimal(*d)),
        DocValue::ObjectId(id) => Ok(AtomicValue::String(id.to_hex())),
        DocValue::DateTime(millis) => DateTime::from_timestamp_millis(*millis)
            .map(AtomicValue::DateTime)
            .ok_or_else(|| {
                ConversionError::malformed(
                    "dateTime",
                    format!("{millis} ms since the epoch is out of range"),
                )
            }),
        DocValue::Binary(bytes) => Ok(AtomicValue::Base64Binary(bytes.clone())),
        DocValue::Object(_) | DocValue::Array(_) | DocValue::Null => {
            Err(ConversionError::unsupported(value.doc_type().name()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use docbridge_core::OpaqueId;
    use num_bigint::BigInt;
    use rust_decimal::Decimal;
    use std::str::FromStr;

    fn encode(value: AtomicValue) -> Result<DocValue> {
        encode_scalar(&value, &ConversionOptions::default())
    }

    #[test]
    fn test_int_widths() {
        assert_eq!(encode(AtomicValue::Int(7)).unwrap(), DocValue::Int32(7));
        assert_eq!(encode(AtomicValue::Long(7)).unwrap(), DocValue::Int64(7));
    }

    #[test]
    fn test_integer_promotes_to_narrowest_width() {
        assert_eq!(
            encode(AtomicValue::Integer(BigInt::from(i32::MAX))).unwrap(),
            DocValue::Int32(i32::MAX)
        );
        assert_eq!(
            encode(AtomicValue::Integer(BigInt::from(i64::from(i32::MAX) + 1))).unwrap(),
            DocValue::Int64(i64::from(i32::MAX) + 1)
        );
        assert_eq!(
            encode(AtomicValue::Integer(BigInt::from(i64::MIN))).unwrap(),
            DocValue::Int64(i64::MIN)
        );
    }

    #[test]
    fn test_big_integer_requires_support() {
        let huge: BigInt = BigInt::from(i64::MAX) * 4;
        let err = encode(AtomicValue::Integer(huge.clone())).unwrap_err();
        assert!(matches!(err, ConversionError::NumericOverflow { ref target, .. }
            if target == "int64"));

        let options = ConversionOptions::default().with_big_integers(true);
        assert_eq!(
            encode_scalar(&AtomicValue::Integer(huge.clone()), &options).unwrap(),
            DocValue::BigInteger(huge)
        );
    }

    #[test]
    fn test_decimal_and_floats() {
        let d = Decimal::from_str("12345.67890").unwrap();
        assert_eq!(encode(AtomicValue::Decimal(d)).unwrap(), DocValue::BigDecimal(d));
        assert_eq!(encode(AtomicValue::Float(1.5)).unwrap(), DocValue::Float32(1.5));
        assert_eq!(decode_scalar(&DocValue::Float32(1.5)).unwrap(), AtomicValue::Float(1.5));
        assert_eq!(decode_scalar(&DocValue::BigDecimal(d)).unwrap(), AtomicValue::Decimal(d));
    }

    #[test]
    fn test_untyped_atomic_encodes_as_string() {
        assert_eq!(
            encode(AtomicValue::UntypedAtomic("x".into())).unwrap(),
            DocValue::String("x".into())
        );
    }

    #[test]
    fn test_datetime_millisecond_precision() {
        let dt = Utc.with_ymd_and_hms(2024, 6, 15, 10, 30, 0).unwrap();
        let encoded = encode(AtomicValue::DateTime(dt)).unwrap();
        assert_eq!(encoded, DocValue::DateTime(dt.timestamp_millis()));
        assert_eq!(decode_scalar(&encoded).unwrap(), AtomicValue::DateTime(dt));

        let fine = dt + chrono::Duration::microseconds(5);
        assert!(matches!(
            encode(AtomicValue::DateTime(fine)),
            Err(ConversionError::NumericOverflow { .. })
        ));
    }

    #[test]
    fn test_datetime_out_of_range_is_malformed() {
        let err = decode_scalar(&DocValue::DateTime(i64::MAX)).unwrap_err();
        assert!(matches!(err, ConversionError::MalformedScalar { ref type_name, .. }
            if type_name == "dateTime"));
    }

    #[test]
    fn test_datetime_range_edge() {
        let last = DateTime::<Utc>::MAX_UTC.timestamp_millis();
        assert!(matches!(
            decode_scalar(&DocValue::DateTime(last)),
            Ok(AtomicValue::DateTime(_))
        ));
        let err = decode_scalar(&DocValue::DateTime(last + 1)).unwrap_err();
        assert_eq!(err.kind(), "malformed-scalar");
    }

    #[test]
    fn test_unsupported_atomics() {
        let err = encode(AtomicValue::QName {
            namespace: None,
            local_name: "a".into(),
        })
        .unwrap_err();
        assert_eq!(err, ConversionError::unsupported("xs:QName"));

        let err = encode(AtomicValue::DayTimeDuration(chrono::Duration::seconds(3))).unwrap_err();
        assert_eq!(err.kind(), "unsupported-type");
    }

    #[test]
    fn test_composites_are_not_scalars() {
        assert_eq!(
            decode_scalar(&DocValue::Null).unwrap_err(),
            ConversionError::unsupported("null")
        );
        assert_eq!(
            decode_scalar(&DocValue::Array(vec![])).unwrap_err(),
            ConversionError::unsupported("array")
        );
    }

    #[test]
    fn test_object_id_decodes_to_hex_string() {
        let id = OpaqueId::parse_hex("507f1f77bcf86cd799439011").unwrap();
        assert_eq!(
            decode_scalar(&DocValue::ObjectId(id)).unwrap(),
            AtomicValue::String("507f1f77bcf86cd799439011".into())
        );
    }

    #[test]
    fn test_binary_round_trip() {
        let bytes = vec![0x01, 0x02, 0x03];
        let encoded = encode(AtomicValue::Base64Binary(bytes.clone())).unwrap();
        assert_eq!(encoded, DocValue::Binary(bytes.clone()));
        assert_eq!(decode_scalar(&encoded).unwrap(), AtomicValue::Base64Binary(bytes));
    }
}
