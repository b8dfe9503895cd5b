//! Operation glue: host-facing store operations.
//!
//! Every operation follows the same steps:
//!
//! 1. resolve the handle against the registry
//! 2. encode the host arguments to BSON
//! 3. make exactly one store call
//! 4. decode the reply back to a host sequence
//! 5. map any failure to an [`ErrorCode`]

use crate::registry::{Handle, HandleRegistry};
use crate::store::{DocumentStore, FindOptions, StoreError, UpdateOptions, UpdateOutcome};
use bson::{doc, Bson, Document};
use docbridge_core::{DocValue, Sequence};
use document_types::{
    bson_to_doc, decode, decode_document, doc_to_bson, doc_to_document, document_to_doc,
    encode_document, encode_item, native_arg_to_bson, to_call_args, ConversionError,
    ConversionOptions,
};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Error codes reported to the host
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    ConnectionNotFound,
    MalformedInput,
    CommandFailure,
    IoFailure,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::ConnectionNotFound => "connection-not-found",
            ErrorCode::MalformedInput => "malformed-input",
            ErrorCode::CommandFailure => "command-failure",
            ErrorCode::IoFailure => "io-failure",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{code}: {message}")]
pub struct GlueError {
    pub code: ErrorCode,
    pub message: String,
}

impl GlueError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl From<ConversionError> for GlueError {
    fn from(err: ConversionError) -> Self {
        GlueError::new(ErrorCode::MalformedInput, err.to_string())
    }
}

impl From<StoreError> for GlueError {
    fn from(err: StoreError) -> Self {
        let code = match err {
            StoreError::Command(_) => ErrorCode::CommandFailure,
            StoreError::Io(_) => ErrorCode::IoFailure,
            StoreError::InvalidArgument(_) => ErrorCode::MalformedInput,
        };
        GlueError::new(code, err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, GlueError>;

/// Host-side options for `find`. Empty sequences mean "not given".
#[derive(Debug, Clone, Default)]
pub struct FindArgs {
    pub projection: Sequence,
    pub sort: Sequence,
    pub skip: Option<u64>,
    pub limit: Option<i64>,
}

#[derive(Debug)]
pub struct OperationGlue {
    registry: Arc<HandleRegistry>,
    options: ConversionOptions,
}

impl OperationGlue {
    pub fn new(registry: Arc<HandleRegistry>, options: ConversionOptions) -> Self {
        Self { registry, options }
    }

    pub fn registry(&self) -> &Arc<HandleRegistry> {
        &self.registry
    }

    pub fn options(&self) -> &ConversionOptions {
        &self.options
    }

    pub async fn find(
        &self,
        handle: &Handle,
        collection: &str,
        filter: &Sequence,
        args: &FindArgs,
    ) -> Result<Sequence> {
        let store = self.store(handle)?;
        let filter = self.optional_document(filter)?.unwrap_or_default();
        let options = FindOptions {
            projection: self.optional_document(&args.projection)?,
            sort: self.optional_document(&args.sort)?,
            skip: args.skip,
            limit: args.limit,
        };
        tracing::debug!("find on '{}' with filter {}", collection, filter);
        let documents = store.find(collection, filter, options).await?;
        self.decode_documents(&documents)
    }

    /// `find` limited to the first match; the empty sequence when nothing matches.
    pub async fn find_one(
        &self,
        handle: &Handle,
        collection: &str,
        filter: &Sequence,
    ) -> Result<Sequence> {
        let args = FindArgs {
            limit: Some(1),
            ..FindArgs::default()
        };
        self.find(handle, collection, filter, &args).await
    }

    /// Insert each item of `documents`. An item may be a map or an array of
    /// maps; every document is encoded before anything is written.
    pub async fn insert(
        &self,
        handle: &Handle,
        collection: &str,
        documents: &Sequence,
    ) -> Result<u64> {
        let store = self.store(handle)?;
        let documents = self.document_list(documents)?;
        tracing::debug!("insert of {} documents into '{}'", documents.len(), collection);
        Ok(store.insert_many(collection, documents).await?)
    }

    pub async fn update(
        &self,
        handle: &Handle,
        collection: &str,
        filter: &Sequence,
        update: &Sequence,
        options: UpdateOptions,
    ) -> Result<UpdateOutcome> {
        let store = self.store(handle)?;
        let filter = self.optional_document(filter)?.unwrap_or_default();
        let update = self.document(update)?;
        tracing::debug!("update on '{}' ({:?})", collection, options);
        Ok(store.update(collection, filter, update, options).await?)
    }

    pub async fn delete(
        &self,
        handle: &Handle,
        collection: &str,
        filter: &Sequence,
        multi: bool,
    ) -> Result<u64> {
        let store = self.store(handle)?;
        let filter = self.optional_document(filter)?.unwrap_or_default();
        tracing::debug!("delete on '{}' (multi: {})", collection, multi);
        Ok(store.delete(collection, filter, multi).await?)
    }

    pub async fn count(&self, handle: &Handle, collection: &str, filter: &Sequence) -> Result<u64> {
        let store = self.store(handle)?;
        let filter = self.optional_document(filter)?.unwrap_or_default();
        Ok(store.count(collection, filter).await?)
    }

    /// Run an aggregation. The pipeline is a sequence of stage maps, or a
    /// single array of them.
    pub async fn aggregate(
        &self,
        handle: &Handle,
        collection: &str,
        pipeline: &Sequence,
    ) -> Result<Sequence> {
        let store = self.store(handle)?;
        let pipeline = self.document_list(pipeline)?;
        tracing::debug!("aggregate on '{}' with {} stages", collection, pipeline.len());
        let documents = store.aggregate(collection, pipeline).await?;
        self.decode_documents(&documents)
    }

    pub async fn run_command(&self, handle: &Handle, command: &Sequence) -> Result<Sequence> {
        let store = self.store(handle)?;
        let command = self.document(command)?;
        tracing::debug!("command {}", command);
        let reply = store.run_command(command).await?;
        self.decode_documents(std::slice::from_ref(&reply))
    }

    /// Run server-side code with positional arguments.
    ///
    /// Arguments go through the lenient parameter conversion, so values with
    /// no native form are passed as strings. The reply's `retval` field is
    /// returned when present, otherwise the whole reply.
    pub async fn eval(&self, handle: &Handle, code: &str, args: &Sequence) -> Result<Sequence> {
        let store = self.store(handle)?;
        let args: Vec<Bson> = to_call_args(args).iter().map(native_arg_to_bson).collect();
        let command = doc! { "eval": code, "args": args };
        let reply = store.run_command(command).await?;
        match reply.get("retval") {
            Some(retval) => {
                let value = bson_to_doc(retval, &self.options)?;
                Ok(decode(&value, &self.options)?)
            }
            None => self.decode_documents(std::slice::from_ref(&reply)),
        }
    }

    fn store(&self, handle: &Handle) -> Result<Arc<dyn DocumentStore>> {
        self.registry.get(handle).ok_or_else(|| {
            GlueError::new(
                ErrorCode::ConnectionNotFound,
                format!("no open connection for handle {handle}"),
            )
        })
    }

    fn document(&self, payload: &Sequence) -> Result<Document> {
        let object = encode_document(payload, &self.options)?;
        Ok(doc_to_document(&object, &self.options)?)
    }

    fn optional_document(&self, payload: &Sequence) -> Result<Option<Document>> {
        if payload.is_empty() {
            return Ok(None);
        }
        self.document(payload).map(Some)
    }

    fn document_list(&self, payload: &Sequence) -> Result<Vec<Document>> {
        let mut documents = Vec::with_capacity(payload.len());
        for item in payload {
            match encode_item(item, &self.options)? {
                DocValue::Array(elements) => {
                    for element in &elements {
                        documents.push(self.to_document(element)?);
                    }
                }
                value => documents.push(self.to_document(&value)?),
            }
        }
        Ok(documents)
    }

    fn to_document(&self, value: &DocValue) -> Result<Document> {
        match doc_to_bson(value, &self.options)? {
            Bson::Document(document) => Ok(document),
            other => Err(GlueError::new(
                ErrorCode::MalformedInput,
                format!("expected a document, got {:?}", other.element_type()),
            )),
        }
    }

    fn decode_documents(&self, documents: &[Document]) -> Result<Sequence> {
        let mut sequence = Sequence::empty();
        for document in documents {
            let object = document_to_doc(document, &self.options)?;
            sequence.append(decode_document(&object, &self.options)?);
        }
        Ok(sequence)
    }
}
