//! Document store layer.
//!
//! [`DocumentStore`] is the seam to the hosted document database: named
//! collections of JSON documents, server-assigned timestamps, atomic batches and
//! realtime collection listeners. [`Database`] is the SQLite-backed implementation.

mod database;
mod listeners;
mod paths;
mod schema;

pub use database::*;
pub use listeners::*;
pub use paths::*;
pub use schema::*;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;

/// Store errors.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Document not found: {0}")]
    NotFound(String),

    #[error("Invalid path: {0}")]
    InvalidPath(String),

    #[error("Document body must be a JSON object")]
    NotAnObject,

    #[error("Lock poisoned")]
    LockPoisoned,
}

impl<T> From<std::sync::PoisonError<T>> for StoreError {
    fn from(_: std::sync::PoisonError<T>) -> Self {
        StoreError::LockPoisoned
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Body of a document: a JSON object.
pub type DocumentData = Map<String, Value>;

/// Sentinel field value replaced by the commit time when written.
pub fn server_timestamp() -> Value {
    serde_json::json!({ ".sv": "timestamp" })
}

pub(crate) fn is_server_timestamp(value: &Value) -> bool {
    match value {
        Value::Object(map) => map.len() == 1 && map.get(".sv").and_then(Value::as_str) == Some("timestamp"),
        _ => false,
    }
}

/// Serialize a model into a document body.
pub fn to_document<T: Serialize>(value: &T) -> StoreResult<DocumentData> {
    match serde_json::to_value(value)? {
        Value::Object(map) => Ok(map),
        _ => Err(StoreError::NotAnObject),
    }
}

/// How [`DocumentStore::set`] treats an existing document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SetMode {
    /// Replace the whole document.
    #[default]
    Overwrite,
    /// Deep-merge into the existing document, keeping unrelated fields.
    Merge,
}

/// A document as read from the store.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentSnapshot {
    pub path: DocumentPath,
    pub data: DocumentData,
    pub create_time: String,
    pub update_time: String,
}

impl DocumentSnapshot {
    pub fn id(&self) -> &str {
        self.path.id()
    }

    /// Deserialize the body into a model.
    pub fn decode<T: DeserializeOwned>(&self) -> StoreResult<T> {
        Ok(serde_json::from_value(Value::Object(self.data.clone()))?)
    }
}

/// Where a snapshot's contents came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SnapshotMetadata {
    /// Served from a local cache rather than confirmed by the backend
    pub from_cache: bool,
}

impl SnapshotMetadata {
    /// Confirmed by the backing store.
    pub fn confirmed() -> Self {
        Self::default()
    }
}

/// Full contents of a collection at one point in commit order.
#[derive(Debug, Clone, PartialEq)]
pub struct QuerySnapshot {
    pub collection: CollectionPath,
    pub documents: Vec<DocumentSnapshot>,
    pub metadata: SnapshotMetadata,
}

impl QuerySnapshot {
    pub fn contains(&self, id: &str) -> bool {
        self.documents.iter().any(|doc| doc.id() == id)
    }

    pub fn ids(&self) -> Vec<&str> {
        self.documents.iter().map(DocumentSnapshot::id).collect()
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}

/// One write inside a batch.
#[derive(Debug, Clone, PartialEq)]
pub enum WriteOp {
    Set {
        path: DocumentPath,
        data: DocumentData,
        mode: SetMode,
    },
    Update {
        path: DocumentPath,
        data: DocumentData,
    },
    Delete {
        path: DocumentPath,
    },
}

impl WriteOp {
    pub fn path(&self) -> &DocumentPath {
        match self {
            WriteOp::Set { path, .. } | WriteOp::Update { path, .. } | WriteOp::Delete { path } => path,
        }
    }
}

/// Writes committed atomically: all succeed or none are applied.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WriteBatch {
    ops: Vec<WriteOp>,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, path: DocumentPath, data: DocumentData, mode: SetMode) -> &mut Self {
        self.ops.push(WriteOp::Set { path, data, mode });
        self
    }

    pub fn update(&mut self, path: DocumentPath, data: DocumentData) -> &mut Self {
        self.ops.push(WriteOp::Update { path, data });
        self
    }

    pub fn delete(&mut self, path: DocumentPath) -> &mut Self {
        self.ops.push(WriteOp::Delete { path });
        self
    }

    pub fn ops(&self) -> &[WriteOp] {
        &self.ops
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn into_ops(self) -> Vec<WriteOp> {
        self.ops
    }
}

/// Generic document database with realtime collection listeners.
///
/// Listeners receive an initial snapshot on subscription and one snapshot per
/// committed write touching their collection, in commit order. Listeners run
/// outside the store's internal locks and may call back into the store.
pub trait DocumentStore: Send + Sync {
    /// Create a document with a store-generated ID.
    fn add(&self, collection: &CollectionPath, data: DocumentData) -> StoreResult<String>;

    /// Create or replace (or merge into) a document with a caller-chosen ID.
    fn set(&self, path: &DocumentPath, data: DocumentData, mode: SetMode) -> StoreResult<()>;

    /// Replace top-level fields of an existing document.
    fn update(&self, path: &DocumentPath, data: DocumentData) -> StoreResult<()>;

    /// Delete a document. Deleting a missing document is not an error.
    fn delete(&self, path: &DocumentPath) -> StoreResult<()>;

    fn get(&self, path: &DocumentPath) -> StoreResult<Option<DocumentSnapshot>>;

    /// Every document in a collection, oldest first.
    fn list(&self, collection: &CollectionPath) -> StoreResult<Vec<DocumentSnapshot>>;

    /// Apply a batch atomically.
    fn commit(&self, batch: WriteBatch) -> StoreResult<()>;

    /// Watch a collection until the returned handle is dropped.
    fn subscribe(&self, collection: &CollectionPath, listener: Listener) -> StoreResult<Subscription>;
}
