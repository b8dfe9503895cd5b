//! Document store abstraction.
//!
//! The operation glue talks to a store only through [`DocumentStore`], so the
//! same conversion path runs against:
//! - a MongoDB deployment (`crate::mongodb::MongoStore`)
//! - an in-process store (`MemoryStore`)

pub mod memory;

use async_trait::async_trait;
use bson::Document;
use thiserror::Error;

pub use memory::MemoryStore;

/// Failures reported by a store
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StoreError {
    /// The store rejected or failed to run the command
    #[error("Command failed: {0}")]
    Command(String),

    /// Transport or connection failure
    #[error("I/O failure: {0}")]
    Io(String),

    /// The request itself was not well formed
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

pub type Result<T> = std::result::Result<T, StoreError>;

/// Options for a `find` call
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FindOptions {
    pub projection: Option<Document>,
    pub sort: Option<Document>,
    pub skip: Option<u64>,
    pub limit: Option<i64>,
}

/// Options for an `update` call
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpdateOptions {
    /// Update every matching document instead of the first
    pub multi: bool,
    /// Insert a document when nothing matches
    pub upsert: bool,
}

/// Counts reported by an `update` call
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpdateOutcome {
    pub matched: u64,
    pub modified: u64,
    pub upserted: bool,
}

/// Whether `update` is an operator update (`$set`, ...) rather than a
/// replacement document.
pub fn is_operator_update(update: &Document) -> bool {
    update.keys().next().is_some_and(|k| k.starts_with('$'))
}

#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Short name used in log output (e.g. "mongodb", "memory").
    fn store_type(&self) -> &'static str;

    async fn find(
        &self,
        collection: &str,
        filter: Document,
        options: FindOptions,
    ) -> Result<Vec<Document>>;

    /// Insert documents, returning how many were written.
    async fn insert_many(&self, collection: &str, documents: Vec<Document>) -> Result<u64>;

    async fn update(
        &self,
        collection: &str,
        filter: Document,
        update: Document,
        options: UpdateOptions,
    ) -> Result<UpdateOutcome>;

    /// Delete the first matching document, or all of them when `multi` is set.
    async fn delete(&self, collection: &str, filter: Document, multi: bool) -> Result<u64>;

    async fn count(&self, collection: &str, filter: Document) -> Result<u64>;

    async fn aggregate(&self, collection: &str, pipeline: Vec<Document>)
        -> Result<Vec<Document>>;

    /// Run a database command and return its reply.
    async fn run_command(&self, command: Document) -> Result<Document>;
}
