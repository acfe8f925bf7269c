//! SQLite-backed document store.

use std::path::Path;
use std::sync::{Arc, Mutex};

use rusqlite::{params, Connection, OptionalExtension};
use serde_json::Value;

use super::{
    is_server_timestamp, CollectionPath, DocumentData, DocumentPath, DocumentSnapshot,
    DocumentStore, Listener, ListenerRegistry, QuerySnapshot, SetMode, SnapshotMetadata,
    StoreError, StoreResult, Subscription, WriteBatch, WriteOp, SCHEMA,
};

/// Database connection wrapper implementing [`DocumentStore`].
pub struct Database {
    conn: Mutex<Connection>,
    listeners: Arc<ListenerRegistry>,
}

impl Database {
    /// Open database at path, creating if needed.
    pub fn open<P: AsRef<Path>>(path: P) -> StoreResult<Self> {
        let conn = Connection::open(path)?;
        Self::with_connection(conn)
    }

    /// Create in-memory database (for testing).
    pub fn open_in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory()?;
        Self::with_connection(conn)
    }

    fn with_connection(conn: Connection) -> StoreResult<Self> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
            listeners: ListenerRegistry::new(),
        })
    }

    /// Number of active realtime listeners.
    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    /// Apply writes in one transaction, then notify listeners of each touched collection.
    fn commit_ops(&self, ops: Vec<WriteOp>) -> StoreResult<()> {
        if ops.is_empty() {
            return Ok(());
        }
        for op in &ops {
            validate(op.path())?;
        }

        let now = now();
        let mut touched: Vec<CollectionPath> = Vec::new();
        {
            let mut conn = self.conn.lock()?;
            let tx = conn.transaction()?;
            for op in ops {
                let collection = op.path().collection().clone();
                apply_op(&tx, op, &now)?;
                if !touched.contains(&collection) {
                    touched.push(collection);
                }
            }
            tx.commit()?;
        }
        tracing::debug!(collections = touched.len(), "write committed");

        for collection in touched {
            self.notify(&collection)?;
        }
        Ok(())
    }

    fn notify(&self, collection: &CollectionPath) -> StoreResult<()> {
        let listeners = self.listeners.listeners_for(collection);
        if listeners.is_empty() {
            return Ok(());
        }
        let snapshot = self.query_snapshot(collection)?;
        for listener in listeners {
            listener(&snapshot);
        }
        Ok(())
    }

    fn query_snapshot(&self, collection: &CollectionPath) -> StoreResult<QuerySnapshot> {
        Ok(QuerySnapshot {
            collection: collection.clone(),
            documents: self.list(collection)?,
            metadata: SnapshotMetadata::confirmed(),
        })
    }
}

impl DocumentStore for Database {
    fn add(&self, collection: &CollectionPath, data: DocumentData) -> StoreResult<String> {
        let id = uuid::Uuid::new_v4().simple().to_string();
        self.commit_ops(vec![WriteOp::Set {
            path: collection.doc(id.clone()),
            data,
            mode: SetMode::Overwrite,
        }])?;
        Ok(id)
    }

    fn set(&self, path: &DocumentPath, data: DocumentData, mode: SetMode) -> StoreResult<()> {
        self.commit_ops(vec![WriteOp::Set {
            path: path.clone(),
            data,
            mode,
        }])
    }

    fn update(&self, path: &DocumentPath, data: DocumentData) -> StoreResult<()> {
        self.commit_ops(vec![WriteOp::Update {
            path: path.clone(),
            data,
        }])
    }

    fn delete(&self, path: &DocumentPath) -> StoreResult<()> {
        self.commit_ops(vec![WriteOp::Delete { path: path.clone() }])
    }

    fn get(&self, path: &DocumentPath) -> StoreResult<Option<DocumentSnapshot>> {
        validate(path)?;
        let conn = self.conn.lock()?;
        conn.query_row(
            r#"
            SELECT data, created_at, updated_at
            FROM documents
            WHERE collection = ?1 AND doc_id = ?2
            "#,
            params![path.collection().as_str(), path.id()],
            |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                ))
            },
        )
        .optional()?
        .map(|(data, created_at, updated_at)| -> StoreResult<DocumentSnapshot> {
            Ok(DocumentSnapshot {
                path: path.clone(),
                data: parse_body(&data)?,
                create_time: created_at,
                update_time: updated_at,
            })
        })
        .transpose()
    }

    fn list(&self, collection: &CollectionPath) -> StoreResult<Vec<DocumentSnapshot>> {
        if !collection.is_valid() {
            return Err(StoreError::InvalidPath(collection.to_string()));
        }
        let conn = self.conn.lock()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT doc_id, data, created_at, updated_at
            FROM documents
            WHERE collection = ?
            ORDER BY rowid ASC
            "#,
        )?;

        let rows = stmt.query_map([collection.as_str()], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
            ))
        })?;

        let mut documents = Vec::new();
        for row in rows {
            let (doc_id, data, created_at, updated_at) = row?;
            documents.push(DocumentSnapshot {
                path: collection.doc(doc_id),
                data: parse_body(&data)?,
                create_time: created_at,
                update_time: updated_at,
            });
        }
        Ok(documents)
    }

    fn commit(&self, batch: WriteBatch) -> StoreResult<()> {
        self.commit_ops(batch.into_ops())
    }

    fn subscribe(&self, collection: &CollectionPath, listener: Listener) -> StoreResult<Subscription> {
        if !collection.is_valid() {
            return Err(StoreError::InvalidPath(collection.to_string()));
        }
        let subscription = self.listeners.register(collection.clone(), Arc::clone(&listener));
        let snapshot = self.query_snapshot(collection)?;
        listener(&snapshot);
        Ok(subscription)
    }
}

fn validate(path: &DocumentPath) -> StoreResult<()> {
    if path.is_valid() {
        Ok(())
    } else {
        Err(StoreError::InvalidPath(path.to_string()))
    }
}

/// Commit time; fixed-width so timestamps sort lexicographically.
fn now() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Micros, true)
}

fn parse_body(data: &str) -> StoreResult<DocumentData> {
    match serde_json::from_str(data)? {
        Value::Object(map) => Ok(map),
        _ => Err(StoreError::NotAnObject),
    }
}

fn read_body(conn: &Connection, path: &DocumentPath) -> StoreResult<Option<DocumentData>> {
    conn.query_row(
        "SELECT data FROM documents WHERE collection = ?1 AND doc_id = ?2",
        params![path.collection().as_str(), path.id()],
        |row| row.get::<_, String>(0),
    )
    .optional()?
    .map(|data| parse_body(&data))
    .transpose()
}

fn write_body(conn: &Connection, path: &DocumentPath, data: &DocumentData, now: &str) -> StoreResult<()> {
    let json = serde_json::to_string(data)?;
    conn.execute(
        r#"
        INSERT INTO documents (collection, doc_id, data, created_at, updated_at)
        VALUES (?1, ?2, ?3, ?4, ?4)
        ON CONFLICT(collection, doc_id) DO UPDATE SET
            data = excluded.data,
            updated_at = excluded.updated_at
        "#,
        params![path.collection().as_str(), path.id(), json, now],
    )?;
    Ok(())
}

fn apply_op(conn: &Connection, op: WriteOp, now: &str) -> StoreResult<()> {
    match op {
        WriteOp::Set { path, mut data, mode } => {
            resolve_timestamps(&mut data, now);
            let body = match (mode, read_body(conn, &path)?) {
                (SetMode::Merge, Some(mut existing)) => {
                    deep_merge(&mut existing, data);
                    existing
                }
                _ => data,
            };
            write_body(conn, &path, &body, now)
        }
        WriteOp::Update { path, mut data } => {
            let mut existing =
                read_body(conn, &path)?.ok_or_else(|| StoreError::NotFound(path.to_string()))?;
            resolve_timestamps(&mut data, now);
            for (key, value) in data {
                existing.insert(key, value);
            }
            write_body(conn, &path, &existing, now)
        }
        WriteOp::Delete { path } => {
            conn.execute(
                "DELETE FROM documents WHERE collection = ?1 AND doc_id = ?2",
                params![path.collection().as_str(), path.id()],
            )?;
            Ok(())
        }
    }
}

fn resolve_timestamps(data: &mut DocumentData, now: &str) {
    for value in data.values_mut() {
        resolve_value(value, now);
    }
}

fn resolve_value(value: &mut Value, now: &str) {
    if is_server_timestamp(value) {
        *value = Value::String(now.to_string());
        return;
    }
    match value {
        Value::Object(map) => {
            for nested in map.values_mut() {
                resolve_value(nested, now);
            }
        }
        Value::Array(items) => {
            for nested in items {
                resolve_value(nested, now);
            }
        }
        _ => {}
    }
}

fn deep_merge(target: &mut DocumentData, incoming: DocumentData) {
    for (key, value) in incoming {
        if let Value::Object(nested) = value {
            if let Some(Value::Object(existing)) = target.get_mut(&key) {
                deep_merge(existing, nested);
                continue;
            }
            target.insert(key, Value::Object(nested));
        } else {
            target.insert(key, value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{server_timestamp, to_document};
    use serde_json::json;

    fn body(value: Value) -> DocumentData {
        to_document(&value).unwrap()
    }

    #[test]
    fn test_open_in_memory() {
        let db = Database::open_in_memory();
        assert!(db.is_ok());
    }

    #[test]
    fn test_add_and_get() {
        let db = Database::open_in_memory().unwrap();
        let id = db
            .add(&CollectionPath::patients(), body(json!({ "firstNames": "Ana" })))
            .unwrap();

        let doc = db.get(&CollectionPath::patients().doc(&id)).unwrap().unwrap();
        assert_eq!(doc.id(), id);
        assert_eq!(doc.data["firstNames"], "Ana");
        assert_eq!(db.get(&CollectionPath::patients().doc("missing")).unwrap(), None);
    }

    #[test]
    fn test_merge_keeps_unrelated_fields() {
        let db = Database::open_in_memory().unwrap();
        let path = CollectionPath::sessions("u1").doc("sess_a");
        db.set(&path, body(json!({ "browser": "Firefox", "extra": { "a": 1, "b": 2 } })), SetMode::Overwrite)
            .unwrap();
        db.set(&path, body(json!({ "browser": "Chrome", "extra": { "b": 3 } })), SetMode::Merge)
            .unwrap();

        let doc = db.get(&path).unwrap().unwrap();
        assert_eq!(doc.data["browser"], "Chrome");
        assert_eq!(doc.data["extra"], json!({ "a": 1, "b": 3 }));
    }

    #[test]
    fn test_overwrite_drops_fields() {
        let db = Database::open_in_memory().unwrap();
        let path = CollectionPath::services().doc("svc");
        db.set(&path, body(json!({ "a": 1, "b": 2 })), SetMode::Overwrite).unwrap();
        db.set(&path, body(json!({ "a": 5 })), SetMode::Overwrite).unwrap();
        assert_eq!(db.get(&path).unwrap().unwrap().data, body(json!({ "a": 5 })));
    }

    #[test]
    fn test_update_requires_existing() {
        let db = Database::open_in_memory().unwrap();
        let path = CollectionPath::odontograms("p1").doc("o1");
        let result = db.update(&path, body(json!({ "notes": "x" })));
        assert!(matches!(result, Err(StoreError::NotFound(_))));
    }

    #[test]
    fn test_update_replaces_top_level_fields() {
        let db = Database::open_in_memory().unwrap();
        let path = CollectionPath::odontograms("p1").doc("o1");
        db.set(&path, body(json!({ "teeth": { "16": 1, "46": 2 }, "name": "Initial" })), SetMode::Overwrite)
            .unwrap();
        db.update(&path, body(json!({ "teeth": { "11": 3 } }))).unwrap();

        let doc = db.get(&path).unwrap().unwrap();
        assert_eq!(doc.data["teeth"], json!({ "11": 3 }));
        assert_eq!(doc.data["name"], "Initial");
    }

    #[test]
    fn test_server_timestamp_resolved() {
        let db = Database::open_in_memory().unwrap();
        let path = CollectionPath::sessions("u1").doc("sess_a");
        db.set(&path, body(json!({ "lastActiveAt": server_timestamp() })), SetMode::Merge)
            .unwrap();

        let doc = db.get(&path).unwrap().unwrap();
        let stamp = doc.data["lastActiveAt"].as_str().unwrap();
        assert!(chrono::DateTime::parse_from_rfc3339(stamp).is_ok());
    }

    #[test]
    fn test_batch_is_atomic() {
        let db = Database::open_in_memory().unwrap();
        let services = CollectionPath::services();
        db.set(&services.doc("a"), body(json!({ "n": 1 })), SetMode::Overwrite).unwrap();

        let mut batch = WriteBatch::new();
        batch
            .delete(services.doc("a"))
            .update(services.doc("missing"), body(json!({ "n": 2 })));
        assert!(db.commit(batch).is_err());

        // First op rolled back
        assert!(db.get(&services.doc("a")).unwrap().is_some());
    }

    #[test]
    fn test_delete_missing_is_ok() {
        let db = Database::open_in_memory().unwrap();
        assert!(db.delete(&CollectionPath::services().doc("nope")).is_ok());
    }

    #[test]
    fn test_invalid_path_rejected() {
        let db = Database::open_in_memory().unwrap();
        let result = db.set(&CollectionPath::services().doc(""), DocumentData::new(), SetMode::Overwrite);
        assert!(matches!(result, Err(StoreError::InvalidPath(_))));
    }

    #[test]
    fn test_subscription_initial_and_updates() {
        let db = Database::open_in_memory().unwrap();
        let sessions = CollectionPath::sessions("u1");
        db.set(&sessions.doc("a"), DocumentData::new(), SetMode::Overwrite).unwrap();

        let seen: Arc<Mutex<Vec<Vec<String>>>> = Arc::default();
        let sink = Arc::clone(&seen);
        let listener: Listener = Arc::new(move |snapshot: &QuerySnapshot| {
            let ids = snapshot.ids().into_iter().map(String::from).collect();
            sink.lock().unwrap().push(ids);
        });
        let subscription = db.subscribe(&sessions, listener).unwrap();

        db.set(&sessions.doc("b"), DocumentData::new(), SetMode::Overwrite).unwrap();
        db.delete(&sessions.doc("a")).unwrap();
        // Other collections do not notify
        db.add(&CollectionPath::patients(), DocumentData::new()).unwrap();

        drop(subscription);
        db.delete(&sessions.doc("b")).unwrap();

        let seen = seen.lock().unwrap();
        assert_eq!(
            *seen,
            vec![
                vec!["a".to_string()],
                vec!["a".to_string(), "b".to_string()],
                vec!["b".to_string()],
            ]
        );
        assert_eq!(db.listener_count(), 0);
    }

    #[test]
    fn test_listener_may_write_back() {
        let db = Arc::new(Database::open_in_memory().unwrap());
        let watched = CollectionPath::services();
        let echo = Arc::clone(&db);
        let listener: Listener = Arc::new(move |snapshot: &QuerySnapshot| {
            if snapshot.len() == 1 {
                echo.add(&CollectionPath::audit_log(), DocumentData::new()).unwrap();
            }
        });
        let _subscription = db.subscribe(&watched, listener).unwrap();

        db.add(&watched, DocumentData::new()).unwrap();
        assert_eq!(db.list(&CollectionPath::audit_log()).unwrap().len(), 1);
    }

    #[test]
    fn test_file_backed_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("claudent.db");
        {
            let db = Database::open(&path).unwrap();
            db.set(&CollectionPath::services().doc("svc"), body(json!({ "n": 1 })), SetMode::Overwrite)
                .unwrap();
        }
        let db = Database::open(&path).unwrap();
        assert!(db.get(&CollectionPath::services().doc("svc")).unwrap().is_some());
    }
}
