//! Document conversions for docbridge-core types.
//!
//! This crate is the bidirectional value-conversion engine between the
//! query engine's host sequence model and schema-less document values.
//!
//! # Modules
//!
//! - [`scalar`] - Scalar Codec: atomic value ↔ scalar document value
//! - [`forward`] - Encoder: Sequence → DocValue
//! - [`reverse`] - Decoder: DocValue → Sequence
//! - [`params`] - Parameter Adapter: Sequence → native call arguments
//! - [`driver`] - DocValue ↔ `bson::Bson` for the store driver
//! - [`error`] - Error types for conversion failures
//!
//! # Key Design Principles
//!
//! 1. **No silent fallbacks** - every unrepresentable value is an error that
//!    names the host type and the path where it was found
//! 2. **Promotion, not truncation** - integers widen to fit, never wrap
//! 3. **Bounded nesting** - both directions fail with `TooDeeplyNested`
//!    past [`ConversionOptions::max_depth`]
//!
//! The only tolerated imprecision is in [`params`], whose target is an
//! untyped scripting boundary.
//!
//! # Example
//!
//! ```ignore
//! use document_types::{decode, encode, ConversionOptions};
//! use docbridge_core::{AtomicValue, MapValue, Sequence};
//!
//! let mut map = MapValue::new();
//! map.insert("n", Sequence::singleton(AtomicValue::Int(1)));
//!
//! let options = ConversionOptions::default();
//! let doc = encode(&Sequence::singleton(map), &options)?;
//! let back = decode(&doc, &options)?;
//! ```
//!
//! All functions are pure: no shared state, no I/O, safe to call from any
//! number of threads.

pub mod driver;
pub mod error;
pub mod forward;
pub mod options;
pub mod params;
pub mod path;
pub mod reverse;
pub mod scalar;

pub use driver::{bson_to_doc, doc_to_bson, doc_to_document, document_to_doc, native_arg_to_bson};
pub use error::{ConversionError, Result};
pub use forward::{encode, encode_document, encode_item};
pub use options::{ConversionOptions, DEFAULT_MAX_DEPTH};
pub use params::{to_call_args, NativeArg};
pub use path::{PathSegment, ValuePath};
pub use reverse::{decode, decode_document};
pub use scalar::{decode_scalar, encode_scalar};
