//! docbridge
//!
//! Converts between a query engine's sequence model (sequences of atomics,
//! maps, arrays) and MongoDB documents, and runs store operations whose
//! arguments and replies cross that boundary.
//!
//! # Crates
//!
//! - `docbridge_core` - the host sequence model and the document model
//! - `document_types` - the conversion engine (encoder, decoder, scalar
//!   codec, parameter adapter, BSON boundary)
//!
//! # CLI Usage
//!
//! ```bash
//! # Print extended-JSON documents as host sequences
//! docbridge decode --input dump.jsonl
//!
//! # Encode JSON values as documents, printed as relaxed extended JSON
//! echo '{"a": [1, 2]}' | docbridge encode
//!
//! # Query a configured connection
//! docbridge --config docbridge.toml find --connection local --collection users
//! ```

pub mod config;
pub mod glue;
pub mod mongodb;
pub mod registry;
pub mod store;

pub use config::{ConfigError, ConnectionConfig, ConversionOpts, DocbridgeConfig};
pub use glue::{ErrorCode, FindArgs, GlueError, OperationGlue};
pub use registry::{Handle, HandleRegistry};
pub use store::{
    DocumentStore, FindOptions, MemoryStore, StoreError, UpdateOptions, UpdateOutcome,
};
