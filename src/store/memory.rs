//! In-process document store.
//!
//! Supports the subset of MongoDB behavior the glue and the CLI dry runs need:
//! top-level equality filters, find sort/skip/limit/projection, `$set`/`$unset`
//! and replacement updates, `$match`/`$sort`/`$skip`/`$limit`/`$project`
//! pipelines and the `ping` command. Anything else fails with
//! `StoreError::Command`, the same way a server rejects an unknown operator.

use super::{
    is_operator_update, DocumentStore, FindOptions, Result, StoreError, UpdateOptions,
    UpdateOutcome,
};
use async_trait::async_trait;
use bson::oid::ObjectId;
use bson::{doc, Bson, Document};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

#[derive(Debug, Default)]
pub struct MemoryStore {
    collections: Mutex<HashMap<String, Vec<Document>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<String, Vec<Document>>>> {
        self.collections
            .lock()
            .map_err(|_| StoreError::Io("memory store lock poisoned".to_string()))
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    fn store_type(&self) -> &'static str {
        "memory"
    }

    async fn find(
        &self,
        collection: &str,
        filter: Document,
        options: FindOptions,
    ) -> Result<Vec<Document>> {
        let collections = self.lock()?;
        let documents = collections.get(collection).map(Vec::as_slice).unwrap_or(&[]);
        let mut found = select(documents, &filter)?;
        if let Some(sort) = &options.sort {
            sort_documents(&mut found, sort)?;
        }
        let skip = options.skip.unwrap_or(0) as usize;
        let mut found: Vec<Document> = found.into_iter().skip(skip).collect();
        // Zero means no limit; a negative limit asks for a single batch of that size
        if let Some(limit) = options.limit.filter(|l| *l != 0) {
            found.truncate(limit.unsigned_abs() as usize);
        }
        if let Some(projection) = &options.projection {
            found = found.iter().map(|d| project(d, projection)).collect();
        }
        Ok(found)
    }

    async fn insert_many(&self, collection: &str, documents: Vec<Document>) -> Result<u64> {
        let mut collections = self.lock()?;
        let target = collections.entry(collection.to_string()).or_default();
        let count = documents.len() as u64;
        target.extend(documents.into_iter().map(with_id));
        tracing::debug!("Inserted {} documents into '{}'", count, collection);
        Ok(count)
    }

    async fn update(
        &self,
        collection: &str,
        filter: Document,
        update: Document,
        options: UpdateOptions,
    ) -> Result<UpdateOutcome> {
        let operator = is_operator_update(&update);
        if !operator && options.multi {
            return Err(StoreError::InvalidArgument(
                "a replacement document cannot update multiple documents".to_string(),
            ));
        }

        let mut collections = self.lock()?;
        let target = collections.entry(collection.to_string()).or_default();
        let mut outcome = UpdateOutcome::default();
        for document in target.iter_mut() {
            if !matches_filter(document, &filter)? {
                continue;
            }
            outcome.matched += 1;
            let updated = if operator {
                apply_operators(document, &update)?
            } else {
                replace(document, &update)?
            };
            if updated != *document {
                *document = updated;
                outcome.modified += 1;
            }
            if !options.multi {
                break;
            }
        }

        if outcome.matched == 0 && options.upsert {
            let inserted = if operator {
                apply_operators(&filter, &update)?
            } else {
                replace(&filter, &update)?
            };
            target.push(with_id(inserted));
            outcome.upserted = true;
        }
        Ok(outcome)
    }

    async fn delete(&self, collection: &str, filter: Document, multi: bool) -> Result<u64> {
        let mut collections = self.lock()?;
        let Some(target) = collections.get_mut(collection) else {
            return Ok(0);
        };
        let mut deleted = 0;
        let mut kept = Vec::with_capacity(target.len());
        for document in target.drain(..) {
            if (multi || deleted == 0) && matches_filter(&document, &filter)? {
                deleted += 1;
            } else {
                kept.push(document);
            }
        }
        *target = kept;
        Ok(deleted)
    }

    async fn count(&self, collection: &str, filter: Document) -> Result<u64> {
        let collections = self.lock()?;
        let documents = collections.get(collection).map(Vec::as_slice).unwrap_or(&[]);
        Ok(select(documents, &filter)?.len() as u64)
    }

    async fn aggregate(
        &self,
        collection: &str,
        pipeline: Vec<Document>,
    ) -> Result<Vec<Document>> {
        let collections = self.lock()?;
        let mut current: Vec<Document> = collections.get(collection).cloned().unwrap_or_default();
        drop(collections);

        for stage in &pipeline {
            let mut entries = stage.iter();
            let (Some((name, spec)), None) = (entries.next(), entries.next()) else {
                return Err(StoreError::InvalidArgument(
                    "a pipeline stage must have exactly one field".to_string(),
                ));
            };
            current = match (name.as_str(), spec) {
                ("$match", Bson::Document(filter)) => select(&current, filter)?,
                ("$sort", Bson::Document(sort)) => {
                    sort_documents(&mut current, sort)?;
                    current
                }
                ("$skip", n) => {
                    let n = stage_count(name, n)?;
                    current.into_iter().skip(n).collect()
                }
                ("$limit", n) => {
                    let n = stage_count(name, n)?;
                    current.into_iter().take(n).collect()
                }
                ("$project", Bson::Document(projection)) => {
                    current.iter().map(|d| project(d, projection)).collect()
                }
                (name, _) if name.starts_with('$') => {
                    return Err(StoreError::Command(format!(
                        "unsupported pipeline stage '{name}'"
                    )));
                }
                (name, _) => {
                    return Err(StoreError::InvalidArgument(format!(
                        "unrecognized pipeline stage name '{name}'"
                    )));
                }
            };
        }
        Ok(current)
    }

    async fn run_command(&self, command: Document) -> Result<Document> {
        let Some(name) = command.keys().next() else {
            return Err(StoreError::InvalidArgument("empty command document".to_string()));
        };
        match name.as_str() {
            "ping" => Ok(doc! { "ok": 1.0 }),
            other => Err(StoreError::Command(format!("no such command: '{other}'"))),
        }
    }
}

fn with_id(document: Document) -> Document {
    if document.contains_key("_id") {
        return document;
    }
    let mut identified = doc! { "_id": ObjectId::new() };
    identified.extend(document);
    identified
}

fn select(documents: &[Document], filter: &Document) -> Result<Vec<Document>> {
    let mut selected = Vec::new();
    for document in documents {
        if matches_filter(document, filter)? {
            selected.push(document.clone());
        }
    }
    Ok(selected)
}

fn matches_filter(document: &Document, filter: &Document) -> Result<bool> {
    for (key, expected) in filter {
        if key.starts_with('$') {
            return Err(StoreError::Command(format!(
                "unsupported query operator '{key}'"
            )));
        }
        if let Bson::Document(inner) = expected {
            if let Some(op) = inner.keys().find(|k| k.starts_with('$')) {
                return Err(StoreError::Command(format!(
                    "unsupported query operator '{op}'"
                )));
            }
        }
        if !field_matches(document.get(key), expected) {
            return Ok(false);
        }
    }
    Ok(true)
}

fn field_matches(actual: Option<&Bson>, expected: &Bson) -> bool {
    match (actual, expected) {
        (None, Bson::Null) => true,
        (None, _) => false,
        (Some(Bson::Array(elements)), expected) if !matches!(expected, Bson::Array(_)) => {
            elements.iter().any(|e| values_equal(e, expected))
        }
        (Some(actual), expected) => values_equal(actual, expected),
    }
}

fn values_equal(a: &Bson, b: &Bson) -> bool {
    match (as_number(a), as_number(b)) {
        (Some(x), Some(y)) => x == y,
        _ => a == b,
    }
}

fn as_number(value: &Bson) -> Option<f64> {
    match value {
        Bson::Int32(i) => Some(f64::from(*i)),
        Bson::Int64(i) => Some(*i as f64),
        Bson::Double(f) => Some(*f),
        _ => None,
    }
}

fn is_truthy(value: &Bson) -> bool {
    match value {
        Bson::Boolean(b) => *b,
        Bson::Null => false,
        other => as_number(other).is_none_or(|n| n != 0.0),
    }
}

fn stage_count(name: &str, value: &Bson) -> Result<usize> {
    match as_number(value) {
        Some(n) if n >= 0.0 && n.fract() == 0.0 => Ok(n as usize),
        _ => Err(StoreError::InvalidArgument(format!(
            "{name} requires a non-negative integer, got {value}"
        ))),
    }
}

/// Rank of a value in MongoDB's cross-type sort order.
fn type_rank(value: &Bson) -> u8 {
    match value {
        Bson::Null | Bson::Undefined => 0,
        Bson::Int32(_) | Bson::Int64(_) | Bson::Double(_) | Bson::Decimal128(_) => 1,
        Bson::String(_) | Bson::Symbol(_) => 2,
        Bson::Document(_) => 3,
        Bson::Array(_) => 4,
        Bson::Binary(_) => 5,
        Bson::ObjectId(_) => 6,
        Bson::Boolean(_) => 7,
        Bson::DateTime(_) => 8,
        _ => 9,
    }
}

fn compare_values(a: Option<&Bson>, b: Option<&Bson>) -> Ordering {
    let null = Bson::Null;
    let (a, b) = (a.unwrap_or(&null), b.unwrap_or(&null));
    if let (Some(x), Some(y)) = (as_number(a), as_number(b)) {
        return x.partial_cmp(&y).unwrap_or(Ordering::Equal);
    }
    match (a, b) {
        (Bson::String(x), Bson::String(y)) => x.cmp(y),
        (Bson::Boolean(x), Bson::Boolean(y)) => x.cmp(y),
        (Bson::DateTime(x), Bson::DateTime(y)) => x.timestamp_millis().cmp(&y.timestamp_millis()),
        (Bson::ObjectId(x), Bson::ObjectId(y)) => x.bytes().cmp(&y.bytes()),
        _ => type_rank(a).cmp(&type_rank(b)),
    }
}

fn sort_documents(documents: &mut [Document], sort: &Document) -> Result<()> {
    let mut keys = Vec::with_capacity(sort.len());
    for (field, direction) in sort {
        let descending = match as_number(direction) {
            Some(d) if d == 1.0 => false,
            Some(d) if d == -1.0 => true,
            _ => {
                return Err(StoreError::InvalidArgument(format!(
                    "sort direction for '{field}' must be 1 or -1"
                )))
            }
        };
        keys.push((field.as_str(), descending));
    }
    documents.sort_by(|a, b| {
        keys.iter()
            .map(|(field, descending)| {
                let ordering = compare_values(a.get(field), b.get(field));
                if *descending {
                    ordering.reverse()
                } else {
                    ordering
                }
            })
            .find(|o| o.is_ne())
            .unwrap_or(Ordering::Equal)
    });
    Ok(())
}

fn project(document: &Document, projection: &Document) -> Document {
    let include_id = projection.get("_id").is_none_or(is_truthy);
    let inclusion = projection
        .iter()
        .any(|(k, v)| k != "_id" && is_truthy(v));

    document
        .iter()
        .filter(|(key, _)| {
            if key.as_str() == "_id" {
                return include_id;
            }
            match projection.get(key.as_str()) {
                Some(flag) => is_truthy(flag) == inclusion,
                None => !inclusion,
            }
        })
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect()
}

fn apply_operators(document: &Document, update: &Document) -> Result<Document> {
    let mut updated = document.clone();
    for (operator, fields) in update {
        let Bson::Document(fields) = fields else {
            return Err(StoreError::InvalidArgument(format!(
                "modifier '{operator}' requires a document argument"
            )));
        };
        match operator.as_str() {
            "$set" => {
                for (field, value) in fields {
                    updated.insert(field.clone(), value.clone());
                }
            }
            "$unset" => {
                for field in fields.keys() {
                    updated.remove(field);
                }
            }
            other => {
                return Err(StoreError::Command(format!(
                    "unsupported update operator '{other}'"
                )))
            }
        }
    }
    Ok(updated)
}

fn replace(document: &Document, replacement: &Document) -> Result<Document> {
    let current_id = document.get("_id");
    if let (Some(current), Some(new)) = (current_id, replacement.get("_id")) {
        if current != new {
            return Err(StoreError::Command(
                "the (immutable) field '_id' was found to have been altered".to_string(),
            ));
        }
    }
    let mut replaced = Document::new();
    if let Some(id) = current_id.or_else(|| replacement.get("_id")) {
        replaced.insert("_id", id.clone());
    }
    for (key, value) in replacement {
        if key != "_id" {
            replaced.insert(key.clone(), value.clone());
        }
    }
    Ok(replaced)
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn seeded() -> MemoryStore {
        let store = MemoryStore::new();
        store
            .insert_many(
                "people",
                vec![
                    doc! { "_id": 1, "name": "Alice", "age": 30, "tags": ["admin", "dev"] },
                    doc! { "_id": 2, "name": "Bob", "age": 25 },
                    doc! { "_id": 3, "name": "Carol", "age": 35i64 },
                ],
            )
            .await
            .unwrap();
        store
    }

    #[tokio::test]
    async fn test_insert_assigns_id_first() {
        let store = MemoryStore::new();
        store
            .insert_many("c", vec![doc! { "x": 1 }])
            .await
            .unwrap();
        let found = store.find("c", doc! {}, FindOptions::default()).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].keys().next().map(String::as_str), Some("_id"));
        assert!(matches!(found[0].get("_id"), Some(Bson::ObjectId(_))));
    }

    #[tokio::test]
    async fn test_equality_filter_across_numeric_widths() {
        let store = seeded().await;
        let found = store
            .find("people", doc! { "age": 35 }, FindOptions::default())
            .await
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].get_str("name").unwrap(), "Carol");
    }

    #[tokio::test]
    async fn test_filter_matches_array_members() {
        let store = seeded().await;
        let count = store.count("people", doc! { "tags": "dev" }).await.unwrap();
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn test_operator_filter_is_command_error() {
        let store = seeded().await;
        let err = store
            .find("people", doc! { "age": { "$gt": 20 } }, FindOptions::default())
            .await
            .unwrap_err();
        assert_eq!(err, StoreError::Command("unsupported query operator '$gt'".into()));
    }

    #[tokio::test]
    async fn test_find_sort_skip_limit_projection() {
        let store = seeded().await;
        let options = FindOptions {
            projection: Some(doc! { "name": 1, "_id": 0 }),
            sort: Some(doc! { "age": -1 }),
            skip: Some(1),
            limit: Some(1),
        };
        let found = store.find("people", doc! {}, options).await.unwrap();
        assert_eq!(found, vec![doc! { "name": "Alice" }]);
    }

    #[tokio::test]
    async fn test_update_set_unset() {
        let store = seeded().await;
        let outcome = store
            .update(
                "people",
                doc! { "name": "Bob" },
                doc! { "$set": { "age": 26 }, "$unset": { "name": "" } },
                UpdateOptions::default(),
            )
            .await
            .unwrap();
        assert_eq!(
            outcome,
            UpdateOutcome {
                matched: 1,
                modified: 1,
                upserted: false
            }
        );
        let found = store
            .find("people", doc! { "_id": 2 }, FindOptions::default())
            .await
            .unwrap();
        assert_eq!(found, vec![doc! { "_id": 2, "age": 26 }]);
    }

    #[tokio::test]
    async fn test_replacement_keeps_id() {
        let store = seeded().await;
        store
            .update(
                "people",
                doc! { "_id": 1 },
                doc! { "name": "Alicia" },
                UpdateOptions::default(),
            )
            .await
            .unwrap();
        let found = store
            .find("people", doc! { "_id": 1 }, FindOptions::default())
            .await
            .unwrap();
        assert_eq!(found, vec![doc! { "_id": 1, "name": "Alicia" }]);
    }

    #[tokio::test]
    async fn test_upsert_seeds_from_filter() {
        let store = MemoryStore::new();
        let outcome = store
            .update(
                "c",
                doc! { "sku": "A-1" },
                doc! { "$set": { "qty": 5 } },
                UpdateOptions {
                    multi: false,
                    upsert: true,
                },
            )
            .await
            .unwrap();
        assert!(outcome.upserted);
        let found = store
            .find("c", doc! { "sku": "A-1" }, FindOptions::default())
            .await
            .unwrap();
        assert_eq!(found[0].get_i32("qty").unwrap(), 5);
    }

    #[tokio::test]
    async fn test_unsupported_update_operator() {
        let store = seeded().await;
        let err = store
            .update(
                "people",
                doc! {},
                doc! { "$inc": { "age": 1 } },
                UpdateOptions::default(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Command(_)));
    }

    #[tokio::test]
    async fn test_delete_single_and_multi() {
        let store = seeded().await;
        assert_eq!(store.delete("people", doc! {}, false).await.unwrap(), 1);
        assert_eq!(store.count("people", doc! {}).await.unwrap(), 2);
        assert_eq!(store.delete("people", doc! {}, true).await.unwrap(), 2);
        assert_eq!(store.delete("missing", doc! {}, true).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_aggregate_pipeline() {
        let store = seeded().await;
        let result = store
            .aggregate(
                "people",
                vec![
                    doc! { "$sort": { "age": 1 } },
                    doc! { "$skip": 1 },
                    doc! { "$limit": 1 },
                    doc! { "$project": { "name": 1 } },
                ],
            )
            .await
            .unwrap();
        assert_eq!(result, vec![doc! { "_id": 1, "name": "Alice" }]);

        let err = store
            .aggregate("people", vec![doc! { "$group": { "_id": null } }])
            .await
            .unwrap_err();
        assert_eq!(
            err,
            StoreError::Command("unsupported pipeline stage '$group'".into())
        );
    }

    #[tokio::test]
    async fn test_run_command() {
        let store = MemoryStore::new();
        assert_eq!(
            store.run_command(doc! { "ping": 1 }).await.unwrap(),
            doc! { "ok": 1.0 }
        );
        assert!(matches!(
            store.run_command(doc! { "eval": "1" }).await,
            Err(StoreError::Command(_))
        ));
        assert!(matches!(
            store.run_command(Document::new()).await,
            Err(StoreError::InvalidArgument(_))
        ));
    }
}
