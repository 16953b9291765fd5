use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::{Mutex, RwLock};
use serde_json::Value;
use tokio::sync::{broadcast, mpsc};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};
use uuid::Uuid;

use crate::contract::model::RecordId;
use crate::domain::ports::{
    AuthSession, Document, Fields, Query, RecordStore, StoreError, StoreListener,
};

const LISTENER_BUFFER: usize = 16;
const CHANGE_BUFFER: usize = 256;

/// Access rule tying documents of a collection to the session user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OwnerRule {
    /// The named field must hold the session user id.
    Field(String),
    /// The document id is the session user id.
    DocumentId,
}

#[derive(Debug, Clone)]
enum Change {
    Written(String),
    Fault(String, StoreError),
}

type Collection = BTreeMap<RecordId, Document>;

struct Inner {
    collections: RwLock<HashMap<String, Collection>>,
    changes: broadcast::Sender<Change>,
    session: Option<Arc<dyn AuthSession>>,
    rules: HashMap<String, OwnerRule>,
    next_write_failure: Mutex<Option<StoreError>>,
}

/// In-process document store with realtime listeners. Each write wakes every
/// listener on the collection, which re-runs its query and delivers the full
/// result.
#[derive(Clone)]
pub struct MemoryRecordStore {
    inner: Arc<Inner>,
}

impl Default for MemoryRecordStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::build(None, HashMap::new())
    }

    /// Store that enforces `rules` against the user of `session`.
    pub fn with_owner_rules(
        session: Arc<dyn AuthSession>,
        rules: impl IntoIterator<Item = (String, OwnerRule)>,
    ) -> Self {
        Self::build(Some(session), rules.into_iter().collect())
    }

    fn build(session: Option<Arc<dyn AuthSession>>, rules: HashMap<String, OwnerRule>) -> Self {
        let (changes, _rx) = broadcast::channel(CHANGE_BUFFER);
        Self {
            inner: Arc::new(Inner {
                collections: RwLock::new(HashMap::new()),
                changes,
                session,
                rules,
                next_write_failure: Mutex::new(None),
            }),
        }
    }

    /// Make the next write (insert, create, update or remove) fail with `error`.
    pub fn fail_next_write(&self, error: StoreError) {
        *self.inner.next_write_failure.lock() = Some(error);
    }

    /// Deliver `error` to every open listener on `collection`.
    pub fn inject_listener_error(&self, collection: &str, error: StoreError) {
        let _ = self
            .inner
            .changes
            .send(Change::Fault(collection.to_string(), error));
    }

    /// Write a document without access checks or failure injection.
    pub fn seed(&self, collection: &str, id: impl Into<RecordId>, fields: Fields) -> Document {
        let now = Utc::now();
        let doc = Document {
            id: id.into(),
            fields,
            created_at: now,
            updated_at: now,
        };
        self.inner
            .collections
            .write()
            .entry(collection.to_string())
            .or_default()
            .insert(doc.id.clone(), doc.clone());
        self.notify(collection);
        doc
    }

    /// Number of documents in `collection`, ignoring access rules.
    pub fn len(&self, collection: &str) -> usize {
        self.inner
            .collections
            .read()
            .get(collection)
            .map_or(0, BTreeMap::len)
    }

    pub fn is_empty(&self, collection: &str) -> bool {
        self.len(collection) == 0
    }

    fn notify(&self, collection: &str) {
        // no receivers just means no open listeners
        let _ = self
            .inner
            .changes
            .send(Change::Written(collection.to_string()));
    }

    fn take_write_failure(&self) -> Result<(), StoreError> {
        match self.inner.next_write_failure.lock().take() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    fn rule(&self, collection: &str) -> Option<(&OwnerRule, Option<String>)> {
        let session = self.inner.session.as_ref()?;
        let rule = self.inner.rules.get(collection)?;
        Some((rule, session.current_user_id()))
    }

    fn check_query(&self, collection: &str, query: &Query) -> Result<(), StoreError> {
        let Some((rule, uid)) = self.rule(collection) else {
            return Ok(());
        };
        let uid = uid.ok_or_else(|| StoreError::permission_denied("not signed in"))?;
        match rule {
            OwnerRule::Field(name) => match query.equality_on(name) {
                Some(Value::String(v)) if *v == uid => Ok(()),
                _ => Err(StoreError::permission_denied(format!(
                    "queries on '{collection}' must be scoped to {name} == current user"
                ))),
            },
            OwnerRule::DocumentId => Err(StoreError::permission_denied(format!(
                "collection '{collection}' only allows reads by id"
            ))),
        }
    }

    fn check_doc(&self, collection: &str, id: &RecordId, fields: &Fields) -> Result<(), StoreError> {
        let Some((rule, uid)) = self.rule(collection) else {
            return Ok(());
        };
        let uid = uid.ok_or_else(|| StoreError::permission_denied("not signed in"))?;
        let owned = match rule {
            OwnerRule::Field(name) => fields.get(name).and_then(Value::as_str) == Some(uid.as_str()),
            OwnerRule::DocumentId => id.as_str() == uid,
        };
        if owned {
            Ok(())
        } else {
            Err(StoreError::permission_denied(format!(
                "document {collection}/{id} belongs to another user"
            )))
        }
    }

    fn check_patch(&self, collection: &str, patch: &Fields) -> Result<(), StoreError> {
        if let Some((OwnerRule::Field(name), _)) = self.rule(collection) {
            if patch.contains_key(name) {
                return Err(StoreError::permission_denied(format!(
                    "field '{name}' cannot be changed"
                )));
            }
        }
        Ok(())
    }

    fn run_query(&self, collection: &str, query: &Query) -> Vec<Document> {
        let guard = self.inner.collections.read();
        match guard.get(collection) {
            Some(docs) => query.apply(docs.values()),
            None => Vec::new(),
        }
    }

    fn not_found(collection: &str, id: &RecordId) -> StoreError {
        StoreError::NotFound {
            collection: collection.to_string(),
            id: id.clone(),
        }
    }
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    async fn query(&self, collection: &str, query: &Query) -> Result<Vec<Document>, StoreError> {
        self.check_query(collection, query)?;
        Ok(self.run_query(collection, query))
    }

    async fn subscribe(&self, collection: &str, query: Query) -> Result<StoreListener, StoreError> {
        self.check_query(collection, &query)?;

        let (tx, rx) = mpsc::channel(LISTENER_BUFFER);
        let cancel = CancellationToken::new();
        // subscribe before the first read so no write can slip in between
        let mut changes = self.inner.changes.subscribe();
        let initial = self.run_query(collection, &query);
        if tx.send(Ok(initial)).await.is_err() {
            return Ok(StoreListener::new(rx, cancel));
        }

        let store = self.clone();
        let collection = collection.to_string();
        let token = cancel.clone();
        tokio::spawn(async move {
            loop {
                let change = tokio::select! {
                    biased;
                    _ = token.cancelled() => break,
                    c = changes.recv() => c,
                };
                let delivery = match change {
                    Ok(Change::Written(c)) if c == collection => {
                        Ok(store.run_query(&collection, &query))
                    }
                    Ok(Change::Fault(c, e)) if c == collection => Err(e),
                    Ok(_) => continue,
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        debug!(skipped = n, "listener lagged; re-reading");
                        Ok(store.run_query(&collection, &query))
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                };
                if tx.send(delivery).await.is_err() {
                    break;
                }
            }
            trace!(%collection, "memory listener stopped");
        });

        Ok(StoreListener::new(rx, cancel))
    }

    async fn get(&self, collection: &str, id: &RecordId) -> Result<Option<Document>, StoreError> {
        let doc = self
            .inner
            .collections
            .read()
            .get(collection)
            .and_then(|c| c.get(id).cloned());
        if let Some(doc) = &doc {
            self.check_doc(collection, id, &doc.fields)?;
        } else if let Some((OwnerRule::DocumentId, uid)) = self.rule(collection) {
            if uid.as_deref() != Some(id.as_str()) {
                return Err(StoreError::permission_denied(format!(
                    "document {collection}/{id} belongs to another user"
                )));
            }
        }
        Ok(doc)
    }

    async fn insert(&self, collection: &str, fields: Fields) -> Result<Document, StoreError> {
        let id = RecordId::new(Uuid::new_v4().simple().to_string());
        self.check_doc(collection, &id, &fields)?;
        self.take_write_failure()?;
        Ok(self.seed(collection, id, fields))
    }

    async fn create_with_id(
        &self,
        collection: &str,
        id: &RecordId,
        fields: Fields,
    ) -> Result<Document, StoreError> {
        self.check_doc(collection, id, &fields)?;
        self.take_write_failure()?;
        let now = Utc::now();
        let doc = {
            let mut guard = self.inner.collections.write();
            let docs = guard.entry(collection.to_string()).or_default();
            if docs.contains_key(id) {
                return Err(StoreError::AlreadyExists {
                    collection: collection.to_string(),
                    id: id.clone(),
                });
            }
            let doc = Document {
                id: id.clone(),
                fields,
                created_at: now,
                updated_at: now,
            };
            docs.insert(id.clone(), doc.clone());
            doc
        };
        self.notify(collection);
        Ok(doc)
    }

    async fn update(
        &self,
        collection: &str,
        id: &RecordId,
        patch: Fields,
    ) -> Result<Document, StoreError> {
        self.check_patch(collection, &patch)?;
        let existing = self
            .inner
            .collections
            .read()
            .get(collection)
            .and_then(|c| c.get(id).cloned())
            .ok_or_else(|| Self::not_found(collection, id))?;
        self.check_doc(collection, id, &existing.fields)?;
        self.take_write_failure()?;

        let doc = {
            let mut guard = self.inner.collections.write();
            let doc = guard
                .get_mut(collection)
                .and_then(|c| c.get_mut(id))
                .ok_or_else(|| Self::not_found(collection, id))?;
            doc.fields.extend(patch);
            doc.updated_at = Utc::now();
            doc.clone()
        };
        self.notify(collection);
        Ok(doc)
    }

    async fn remove(&self, collection: &str, id: &RecordId) -> Result<(), StoreError> {
        let existing = self
            .inner
            .collections
            .read()
            .get(collection)
            .and_then(|c| c.get(id).cloned())
            .ok_or_else(|| Self::not_found(collection, id))?;
        self.check_doc(collection, id, &existing.fields)?;
        self.take_write_failure()?;

        let removed = self
            .inner
            .collections
            .write()
            .get_mut(collection)
            .and_then(|c| c.remove(id));
        if removed.is_none() {
            return Err(Self::not_found(collection, id));
        }
        self.notify(collection);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ports::Direction;
    use crate::infra::local_session::LocalSession;
    use serde_json::json;

    fn fields(v: Value) -> Fields {
        v.as_object().cloned().unwrap_or_default()
    }

    #[tokio::test]
    async fn listener_redelivers_on_write() {
        let store = MemoryRecordStore::new();
        let query = Query::new()
            .where_eq("user_id", "u1")
            .order_by("interview_date", Direction::Descending);
        let mut listener = store.subscribe("interviews", query).await.unwrap();
        assert!(listener.next().await.unwrap().unwrap().is_empty());

        store
            .insert("interviews", fields(json!({"user_id": "u1", "interview_date": "2024-01-01"})))
            .await
            .unwrap();
        store
            .insert("interviews", fields(json!({"user_id": "u2", "interview_date": "2024-01-02"})))
            .await
            .unwrap();

        let first = listener.next().await.unwrap().unwrap();
        assert_eq!(first.len(), 1);
        // the u2 write re-runs the query with the same result
        let second = listener.next().await.unwrap().unwrap();
        assert_eq!(second, first);
    }

    #[tokio::test]
    async fn owner_rule_rejects_foreign_documents() {
        let session = Arc::new(LocalSession::new());
        session.sign_in("u1", "u1@example.com");
        let store = MemoryRecordStore::with_owner_rules(
            session.clone(),
            [("interviews".to_string(), OwnerRule::Field("user_id".into()))],
        );
        let foreign = store.seed("interviews", "x", fields(json!({"user_id": "u2"})));

        let err = store
            .update("interviews", &foreign.id, fields(json!({"status": "Passed"})))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::PermissionDenied { .. }));

        let err = store
            .query("interviews", &Query::new().where_eq("user_id", "u2"))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::PermissionDenied { .. }));

        let err = store
            .insert("interviews", fields(json!({"user_id": "u2"})))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::PermissionDenied { .. }));
    }

    #[tokio::test]
    async fn injected_write_failure_fires_once() {
        let store = MemoryRecordStore::new();
        store.fail_next_write(StoreError::unavailable("offline"));
        assert!(store.insert("c", Fields::new()).await.is_err());
        assert!(store.insert("c", Fields::new()).await.is_ok());
        assert_eq!(store.len("c"), 1);
    }

    #[tokio::test]
    async fn create_with_id_refuses_duplicates() {
        let store = MemoryRecordStore::new();
        let id = RecordId::from("u1");
        store.create_with_id("profiles", &id, Fields::new()).await.unwrap();
        let err = store
            .create_with_id("profiles", &id, Fields::new())
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::AlreadyExists { .. }));
    }

    #[tokio::test]
    async fn remove_of_missing_document_is_not_found() {
        let store = MemoryRecordStore::new();
        let err = store
            .remove("interviews", &RecordId::from("nope"))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }));
    }
}
