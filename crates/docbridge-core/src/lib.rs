//! Core value types for docbridge.
//!
//! This crate provides the two value universes that the conversion engine
//! bridges:
//!
//! - [`values`] - the query engine's host sequence model ([`Sequence`],
//!   [`Item`], [`AtomicValue`], [`MapValue`], [`ArrayValue`])
//! - [`document`] - the schema-less document model ([`DocValue`],
//!   [`DocObject`], [`OpaqueId`])
//! - [`types`] - runtime type tags for both ([`AtomicType`], [`DocType`])
//!
//! # Architecture
//!
//! ```text
//! docbridge-core (this crate)
//!    │
//!    └─── document-types   (Scalar Codec, Encoder, Decoder, Parameter Adapter,
//!                           BSON driver boundary)
//! ```
//!
//! Both universes are plain trees built bottom-up and owned by one call.
//! Nothing here is shared or cached.

pub mod document;
pub mod json;
pub mod types;
pub mod values;

pub use document::{DocObject, DocValue, OpaqueId};
pub use json::sequence_from_json;
pub use types::{AtomicType, DocType};
pub use values::{
    ArrayValue, AtomicValue, FunctionRef, Item, MapKey, MapValue, NodeKind, NodeRef, Sequence,
};
