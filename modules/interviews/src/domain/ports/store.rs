use std::cmp::Ordering;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use thiserror::Error;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::contract::model::RecordId;

/// Document body: field name → JSON value.
pub type Fields = Map<String, Value>;

/// A stored document with its server-assigned id and timestamps.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: RecordId,
    pub fields: Fields,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Document {
    pub fn str_field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).and_then(Value::as_str)
    }

    pub fn bool_field(&self, name: &str) -> Option<bool> {
        self.fields.get(name).and_then(Value::as_bool)
    }
}

/// Remote store failures, reported verbatim to callers.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("document {collection}/{id} not found")]
    NotFound { collection: String, id: RecordId },

    #[error("document {collection}/{id} already exists")]
    AlreadyExists { collection: String, id: RecordId },

    #[error("permission denied: {message}")]
    PermissionDenied { message: String },

    #[error("store unavailable: {message}")]
    Unavailable { message: String },

    #[error("quota exceeded: {message}")]
    QuotaExceeded { message: String },

    #[error("store rejected the request: {message}")]
    Rejected { message: String },
}

impl StoreError {
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable {
            message: message.into(),
        }
    }

    pub fn permission_denied(message: impl Into<String>) -> Self {
        Self::PermissionDenied {
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Ascending,
    Descending,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderBy {
    pub field: String,
    pub direction: Direction,
}

/// Equality filters plus an optional ordering; the only query shape the
/// core needs from the store.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Query {
    pub filters: Vec<(String, Value)>,
    pub order_by: Option<OrderBy>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn where_eq(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filters.push((field.into(), value.into()));
        self
    }

    pub fn order_by(mut self, field: impl Into<String>, direction: Direction) -> Self {
        self.order_by = Some(OrderBy {
            field: field.into(),
            direction,
        });
        self
    }

    /// Value required for `field` by an equality filter, if any.
    pub fn equality_on(&self, field: &str) -> Option<&Value> {
        self.filters
            .iter()
            .find(|(f, _)| f == field)
            .map(|(_, v)| v)
    }

    pub fn matches(&self, doc: &Document) -> bool {
        self.filters
            .iter()
            .all(|(field, value)| doc.fields.get(field) == Some(value))
    }

    /// Filter and order `docs`; ordering is stable so equal keys keep input order.
    pub fn apply<'a, I>(&self, docs: I) -> Vec<Document>
    where
        I: IntoIterator<Item = &'a Document>,
    {
        let mut out: Vec<Document> = docs
            .into_iter()
            .filter(|d| self.matches(d))
            .cloned()
            .collect();
        if let Some(order) = &self.order_by {
            out.sort_by(|a, b| {
                let ord = compare_values(a.fields.get(&order.field), b.fields.get(&order.field));
                match order.direction {
                    Direction::Ascending => ord,
                    Direction::Descending => ord.reverse(),
                }
            });
        }
        out
    }
}

fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        (Some(Value::Number(x)), Some(Value::Number(y))) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        // missing values sort first
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        _ => Ordering::Equal,
    }
}

pub type Delivery = Result<Vec<Document>, StoreError>;

/// Receiving side of a realtime query. Every change to the matching set is
/// delivered as the full current result. Dropping or cancelling the listener
/// stops delivery.
pub struct StoreListener {
    rx: mpsc::Receiver<Delivery>,
    cancel: CancellationToken,
}

impl StoreListener {
    pub fn new(rx: mpsc::Receiver<Delivery>, cancel: CancellationToken) -> Self {
        Self { rx, cancel }
    }

    /// Next delivery, or `None` once the listener is closed.
    pub async fn next(&mut self) -> Option<Delivery> {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => None,
            item = self.rx.recv() => item,
        }
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

impl Drop for StoreListener {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// Port for the hosted document database.
/// Object-safe and async-friendly via `async_trait`.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// One-shot read of the documents matching `query`.
    async fn query(&self, collection: &str, query: &Query) -> Result<Vec<Document>, StoreError>;

    /// Standing query; the first delivery is the current result.
    async fn subscribe(&self, collection: &str, query: Query) -> Result<StoreListener, StoreError>;

    async fn get(&self, collection: &str, id: &RecordId) -> Result<Option<Document>, StoreError>;

    /// Insert with a store-assigned id; both timestamps are set by the store.
    async fn insert(&self, collection: &str, fields: Fields) -> Result<Document, StoreError>;

    /// Create a document under a caller-chosen id; fails with `AlreadyExists`.
    async fn create_with_id(
        &self,
        collection: &str,
        id: &RecordId,
        fields: Fields,
    ) -> Result<Document, StoreError>;

    /// Merge `patch` into the document and refresh `updated_at`.
    async fn update(
        &self,
        collection: &str,
        id: &RecordId,
        patch: Fields,
    ) -> Result<Document, StoreError>;

    async fn remove(&self, collection: &str, id: &RecordId) -> Result<(), StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(id: &str, fields: Value) -> Document {
        let now = Utc::now();
        Document {
            id: RecordId::from(id),
            fields: fields.as_object().cloned().unwrap_or_default(),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn query_filters_and_orders_stably() {
        let docs = vec![
            doc("a", json!({"user_id": "u1", "interview_date": "2024-03-10"})),
            doc("b", json!({"user_id": "u2", "interview_date": "2024-01-01"})),
            doc("c", json!({"user_id": "u1", "interview_date": "2024-01-05"})),
            doc("d", json!({"user_id": "u1", "interview_date": "2024-03-10"})),
        ];

        let q = Query::new()
            .where_eq("user_id", "u1")
            .order_by("interview_date", Direction::Descending);
        let ids: Vec<String> = q
            .apply(&docs)
            .into_iter()
            .map(|d| d.id.to_string())
            .collect();
        assert_eq!(ids, vec!["a", "d", "c"]);
        assert_eq!(q.equality_on("user_id"), Some(&json!("u1")));
    }

    #[tokio::test]
    async fn listener_stops_after_cancel() {
        let (tx, rx) = mpsc::channel(4);
        let mut listener = StoreListener::new(rx, CancellationToken::new());
        tx.send(Ok(vec![])).await.unwrap();
        assert!(matches!(listener.next().await, Some(Ok(v)) if v.is_empty()));

        listener.cancel();
        listener.cancel();
        tx.send(Ok(vec![])).await.unwrap();
        assert!(listener.next().await.is_none());
        assert!(listener.is_cancelled());
    }
}
