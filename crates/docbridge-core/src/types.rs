//! Runtime type tags for both value universes.
//!
//! Both the host sequence model and the document model carry an explicit tag
//! on every scalar. Converters dispatch on these tags, never on the static
//! Rust type, so a value keeps its declared subtype across the boundary.

use std::fmt;

/// Declared subtype of a host atomic value.
///
/// The names follow the query engine's `xs:` type vocabulary and are what
/// error messages report to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AtomicType {
    /// `xs:string`
    String,

    /// `xs:untypedAtomic` - string content without a declared type
    UntypedAtomic,

    /// `xs:boolean`
    Boolean,

    /// `xs:int` - 32-bit signed integer
    Int,

    /// `xs:long` - 64-bit signed integer
    Long,

    /// `xs:integer` - arbitrary precision integer
    Integer,

    /// `xs:decimal` - exact decimal
    Decimal,

    /// `xs:double` - 64-bit IEEE 754 floating point
    Double,

    /// `xs:float` - 32-bit IEEE 754 floating point
    Float,

    /// `xs:dateTime` - instant in UTC
    DateTime,

    /// `xs:base64Binary` - opaque bytes
    Base64Binary,

    /// `xs:dayTimeDuration`
    DayTimeDuration,

    /// `xs:QName` - qualified name
    QName,
}

impl AtomicType {
    /// Lexical type name, e.g. `xs:int`.
    pub fn name(&self) -> &'static str {
        match self {
            AtomicType::String => "xs:string",
            AtomicType::UntypedAtomic => "xs:untypedAtomic",
            AtomicType::Boolean => "xs:boolean",
            AtomicType::Int => "xs:int",
            AtomicType::Long => "xs:long",
            AtomicType::Integer => "xs:integer",
            AtomicType::Decimal => "xs:decimal",
            AtomicType::Double => "xs:double",
            AtomicType::Float => "xs:float",
            AtomicType::DateTime => "xs:dateTime",
            AtomicType::Base64Binary => "xs:base64Binary",
            AtomicType::DayTimeDuration => "xs:dayTimeDuration",
            AtomicType::QName => "xs:QName",
        }
    }

    /// Whether values of this type are string-valued (usable as document keys).
    pub fn is_string_like(&self) -> bool {
        matches!(self, AtomicType::String | AtomicType::UntypedAtomic)
    }
}

impl fmt::Display for AtomicType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Declared variant of a document value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DocType {
    Object,
    Array,
    Null,
    String,
    Int32,
    Int64,
    Double,
    Float32,
    Boolean,
    BigInteger,
    BigDecimal,
    ObjectId,
    DateTime,
    Binary,
}

impl DocType {
    /// Name used in diagnostics.
    pub fn name(&self) -> &'static str {
        match self {
            DocType::Object => "object",
            DocType::Array => "array",
            DocType::Null => "null",
            DocType::String => "string",
            DocType::Int32 => "int32",
            DocType::Int64 => "int64",
            DocType::Double => "double",
            DocType::Float32 => "float32",
            DocType::Boolean => "boolean",
            DocType::BigInteger => "bigInteger",
            DocType::BigDecimal => "bigDecimal",
            DocType::ObjectId => "objectId",
            DocType::DateTime => "dateTime",
            DocType::Binary => "binary",
        }
    }

    /// Whether this variant is a container (object or array).
    pub fn is_composite(&self) -> bool {
        matches!(self, DocType::Object | DocType::Array)
    }
}

impl fmt::Display for DocType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
