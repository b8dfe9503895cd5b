//! MongoDB-backed document store.

use crate::store::{
    is_operator_update, DocumentStore, FindOptions, Result, StoreError, UpdateOptions,
    UpdateOutcome,
};
use async_trait::async_trait;
use bson::Document;
use futures::TryStreamExt;
use mongodb::error::ErrorKind;
use mongodb::options::ClientOptions;
use mongodb::{Client as MongoClient, Collection, Database};
use std::time::Duration;

impl From<mongodb::error::Error> for StoreError {
    fn from(err: mongodb::error::Error) -> Self {
        match err.kind.as_ref() {
            ErrorKind::Command(_) | ErrorKind::Write(_) => StoreError::Command(err.to_string()),
            ErrorKind::InvalidArgument { .. } => StoreError::InvalidArgument(err.to_string()),
            _ => StoreError::Io(err.to_string()),
        }
    }
}

pub struct MongoStore {
    database: Database,
}

impl MongoStore {
    /// Connect to `uri` and bind to `database`.
    ///
    /// The client is built with 10 second connect and server-selection
    /// timeouts so an unreachable deployment fails instead of hanging.
    pub async fn connect(uri: &str, database: &str) -> Result<Self> {
        tracing::debug!("Parsing MongoDB connection options from URI: {}", uri);
        let mut options = match ClientOptions::parse(uri).await {
            Ok(options) => options,
            Err(e) => {
                tracing::error!("Failed to parse MongoDB connection options: {}", e);
                return Err(e.into());
            }
        };
        options.connect_timeout = Some(Duration::from_secs(10));
        options.server_selection_timeout = Some(Duration::from_secs(10));

        let client = MongoClient::with_options(options)?;
        tracing::info!("Connected MongoDB client for database '{}'", database);
        Ok(Self::new(client.database(database)))
    }

    pub fn new(database: Database) -> Self {
        Self { database }
    }

    fn collection(&self, name: &str) -> Collection<Document> {
        self.database.collection::<Document>(name)
    }
}

#[async_trait]
impl DocumentStore for MongoStore {
    fn store_type(&self) -> &'static str {
        "mongodb"
    }

    async fn find(
        &self,
        collection: &str,
        filter: Document,
        options: FindOptions,
    ) -> Result<Vec<Document>> {
        let coll = self.collection(collection);
        let mut action = coll.find(filter);
        if let Some(projection) = options.projection {
            action = action.projection(projection);
        }
        if let Some(sort) = options.sort {
            action = action.sort(sort);
        }
        if let Some(skip) = options.skip {
            action = action.skip(skip);
        }
        if let Some(limit) = options.limit {
            action = action.limit(limit);
        }
        let cursor = action.await?;
        Ok(cursor.try_collect().await?)
    }

    async fn insert_many(&self, collection: &str, documents: Vec<Document>) -> Result<u64> {
        if documents.is_empty() {
            return Ok(0);
        }
        let result = self.collection(collection).insert_many(documents).await?;
        Ok(result.inserted_ids.len() as u64)
    }

    async fn update(
        &self,
        collection: &str,
        filter: Document,
        update: Document,
        options: UpdateOptions,
    ) -> Result<UpdateOutcome> {
        let target = self.collection(collection);
        let result = if !is_operator_update(&update) {
            if options.multi {
                return Err(StoreError::InvalidArgument(
                    "a replacement document cannot update multiple documents".to_string(),
                ));
            }
            target
                .replace_one(filter, update)
                .upsert(options.upsert)
                .await?
        } else if options.multi {
            target
                .update_many(filter, update)
                .upsert(options.upsert)
                .await?
        } else {
            target
                .update_one(filter, update)
                .upsert(options.upsert)
                .await?
        };
        Ok(UpdateOutcome {
            matched: result.matched_count,
            modified: result.modified_count,
            upserted: result.upserted_id.is_some(),
        })
    }

    async fn delete(&self, collection: &str, filter: Document, multi: bool) -> Result<u64> {
        let target = self.collection(collection);
        let result = if multi {
            target.delete_many(filter).await?
        } else {
            target.delete_one(filter).await?
        };
        Ok(result.deleted_count)
    }

    async fn count(&self, collection: &str, filter: Document) -> Result<u64> {
        Ok(self.collection(collection).count_documents(filter).await?)
    }

    async fn aggregate(
        &self,
        collection: &str,
        pipeline: Vec<Document>,
    ) -> Result<Vec<Document>> {
        let cursor = self.collection(collection).aggregate(pipeline).await?;
        Ok(cursor.try_collect().await?)
    }

    async fn run_command(&self, command: Document) -> Result<Document> {
        Ok(self.database.run_command(command).await?)
    }
}
