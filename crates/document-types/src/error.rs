//! Error types for document conversions.
//!
//! Every error aborts the whole conversion of the current call and is never
//! recovered from locally. Each variant carries the path of the offending
//! value.

use crate::path::ValuePath;
use thiserror::Error;

/// Errors that can occur while converting between host sequences and documents.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConversionError {
    /// A host or document value has no counterpart on the other side.
    #[error("{type_name} has no document representation (at {path})")]
    UnsupportedType { type_name: String, path: ValuePath },

    /// A host map key is not string-valued.
    #[error("Map key of type {key_type} is not a string (at {path})")]
    NonStringKey { key_type: String, path: ValuePath },

    /// The recursion guard tripped.
    #[error("Nesting depth {depth} exceeds the limit of {limit} (at {path})")]
    TooDeeplyNested {
        depth: usize,
        limit: usize,
        path: ValuePath,
    },

    /// A numeric or temporal value cannot be narrowed without loss.
    #[error("Numeric overflow converting {value} to {target} (at {path})")]
    NumericOverflow {
        value: String,
        target: String,
        path: ValuePath,
    },

    /// A document scalar's internal encoding is inconsistent.
    #[error("Malformed {type_name} value: {reason} (at {path})")]
    MalformedScalar {
        type_name: String,
        reason: String,
        path: ValuePath,
    },
}

impl ConversionError {
    pub(crate) fn unsupported(type_name: impl Into<String>) -> Self {
        ConversionError::UnsupportedType {
            type_name: type_name.into(),
            path: ValuePath::root(),
        }
    }

    pub(crate) fn overflow(value: impl ToString, target: impl Into<String>) -> Self {
        ConversionError::NumericOverflow {
            value: value.to_string(),
            target: target.into(),
            path: ValuePath::root(),
        }
    }

    pub(crate) fn malformed(type_name: impl Into<String>, reason: impl Into<String>) -> Self {
        ConversionError::MalformedScalar {
            type_name: type_name.into(),
            reason: reason.into(),
            path: ValuePath::root(),
        }
    }

    /// Path of the offending value.
    pub fn path(&self) -> &ValuePath {
        match self {
            ConversionError::UnsupportedType { path, .. }
            | ConversionError::NonStringKey { path, .. }
            | ConversionError::TooDeeplyNested { path, .. }
            | ConversionError::NumericOverflow { path, .. }
            | ConversionError::MalformedScalar { path, .. } => path,
        }
    }

    /// Relocate the error to `at`.
    ///
    /// Scalar conversions have no notion of position; the tree walkers call
    /// this to attach the current path.
    pub fn at(mut self, at: &ValuePath) -> Self {
        match &mut self {
            ConversionError::UnsupportedType { path, .. }
            | ConversionError::NonStringKey { path, .. }
            | ConversionError::TooDeeplyNested { path, .. }
            | ConversionError::NumericOverflow { path, .. }
            | ConversionError::MalformedScalar { path, .. } => *path = at.clone(),
        }
        self
    }

    /// Stable kind name, independent of the message text.
    pub fn kind(&self) -> &'static str {
        match self {
            ConversionError::UnsupportedType { .. } => "unsupported-type",
            ConversionError::NonStringKey { .. } => "non-string-key",
            ConversionError::TooDeeplyNested { .. } => "too-deeply-nested",
            ConversionError::NumericOverflow { .. } => "numeric-overflow",
            ConversionError::MalformedScalar { .. } => "malformed-scalar",
        }
    }
}

/// Result type for document conversions.
pub type Result<T> = std::result::Result<T, ConversionError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_at_replaces_path() {
        let mut path = ValuePath::root();
        path.push_key("items");
        path.push_index(2);

        let err = ConversionError::unsupported("xs:QName").at(&path);
        assert_eq!(err.path(), &path);
        assert_eq!(
            err.to_string(),
            "xs:QName has no document representation (at root.items[2])"
        );
        assert_eq!(err.kind(), "unsupported-type");
    }

    #[test]
    fn test_overflow_message() {
        let err = ConversionError::overflow(u64::MAX, "int64");
        assert_eq!(
            err.to_string(),
            "Numeric overflow converting 18446744073709551615 to int64 (at root)"
        );
    }
}
