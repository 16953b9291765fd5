use std::sync::Arc;

use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::contract::model::{Interview, InterviewDraft, InterviewPatch, RecordId};
use crate::domain::error::DomainError;
use crate::domain::mapper::{self, field};
use crate::domain::ports::{
    AuthSession, Direction, Document, Query, RecordStore, SessionUser, StoreError, StoreListener,
};
use crate::domain::validation::{validate_draft, validate_patch};

/// Canonical, user-scoped state held by the synchronizer.
///
/// `generation` increases every time a subscription is opened or released,
/// so stale deliveries from a torn-down listener can be told apart.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SyncState {
    pub generation: u64,
    pub user_id: Option<String>,
    pub interviews: Arc<[Interview]>,
    /// Last listener failure; cleared by the next good delivery.
    pub error: Option<StoreError>,
    /// True once the first delivery for this generation has arrived.
    pub loaded: bool,
}

impl SyncState {
    fn reset(generation: u64, user_id: Option<String>) -> Self {
        Self {
            generation,
            user_id,
            ..Default::default()
        }
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            interviews: self.interviews.clone(),
            error: self.error.clone(),
        }
    }
}

/// One delivery: the full current list plus the error marker, if any.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub interviews: Arc<[Interview]>,
    pub error: Option<StoreError>,
}

/// Configuration for the synchronizer
#[derive(Debug, Clone)]
pub struct SyncConfig {
    pub collection: String,
    pub max_text_length: usize,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            collection: "interviews".to_string(),
            max_text_length: 200,
        }
    }
}

#[derive(Default)]
struct Slot {
    generation: u64,
    active: Option<CancellationToken>,
}

/// Live mirror of the signed-in user's interviews plus the mutations on them.
pub struct InterviewSynchronizer {
    store: Arc<dyn RecordStore>,
    session: Arc<dyn AuthSession>,
    config: SyncConfig,
    state: Arc<watch::Sender<SyncState>>,
    slot: Mutex<Slot>,
    // subscription opened by `bind_session`, kept alive until sign-out
    bound: parking_lot::Mutex<Option<Subscription>>,
}

impl InterviewSynchronizer {
    pub fn new(
        store: Arc<dyn RecordStore>,
        session: Arc<dyn AuthSession>,
        config: SyncConfig,
    ) -> Self {
        let (tx, _rx) = watch::channel(SyncState::default());
        Self {
            store,
            session,
            config,
            state: Arc::new(tx),
            slot: Mutex::new(Slot::default()),
            bound: parking_lot::Mutex::new(None),
        }
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Read-only copy of the canonical state.
    pub fn current(&self) -> SyncState {
        self.state.borrow().clone()
    }

    /// Receiver over the canonical state; every change is observable.
    pub fn watch_state(&self) -> watch::Receiver<SyncState> {
        self.state.subscribe()
    }

    /// Open a standing subscription to `user_id`'s interviews, newest first.
    /// Any previous subscription is torn down first.
    #[instrument(name = "interviews.sync.subscribe", skip(self), fields(user_id = %user_id))]
    pub async fn subscribe(&self, user_id: &str) -> Result<Subscription, DomainError> {
        let mut slot = self.slot.lock().await;
        if let Some(prev) = slot.active.take() {
            debug!("tearing down previous subscription");
            prev.cancel();
        }
        slot.generation += 1;
        let generation = slot.generation;
        self.state
            .send_replace(SyncState::reset(generation, Some(user_id.to_string())));

        let query = Query::new()
            .where_eq(field::USER_ID, user_id)
            .order_by(field::INTERVIEW_DATE, Direction::Descending);
        let listener = match self.store.subscribe(&self.config.collection, query).await {
            Ok(l) => l,
            Err(e) => {
                warn!(error = %e, "failed to open store listener");
                self.state.send_modify(|s| s.error = Some(e.clone()));
                return Err(e.into());
            }
        };

        let cancel = CancellationToken::new();
        slot.active = Some(cancel.clone());
        // subscribe before the pump starts so the first delivery is observed
        let rx = self.state.subscribe();
        tokio::spawn(pump(
            listener,
            self.state.clone(),
            generation,
            cancel.clone(),
        ));

        info!(generation, "subscription opened");
        Ok(Subscription {
            generation,
            rx,
            cancel,
        })
    }

    /// Release the active subscription and clear the canonical list. Safe to
    /// call when nothing is subscribed.
    #[instrument(name = "interviews.sync.unsubscribe", skip(self))]
    pub async fn unsubscribe(&self) {
        let held = self.bound.lock().take();
        drop(held);

        let mut slot = self.slot.lock().await;
        if let Some(active) = slot.active.take() {
            active.cancel();
            info!("subscription released");
        }
        slot.generation += 1;
        self.state.send_replace(SyncState::reset(slot.generation, None));
    }

    /// Follow the session: sign-in (re)subscribes for that user, sign-out
    /// releases the subscription. Stops when the returned binding is dropped.
    pub fn bind_session(self: &Arc<Self>) -> SessionBinding {
        let cancel = CancellationToken::new();
        let this = Arc::clone(self);
        let token = cancel.clone();
        let task = tokio::spawn(async move {
            let mut rx = this.session.watch();
            loop {
                let user = rx.borrow_and_update().clone();
                this.follow(user).await;
                tokio::select! {
                    biased;
                    _ = token.cancelled() => break,
                    changed = rx.changed() => {
                        if changed.is_err() {
                            debug!("session provider closed its change feed");
                            break;
                        }
                    }
                }
            }
        });
        SessionBinding {
            cancel,
            task: Some(task),
        }
    }

    async fn follow(&self, user: Option<SessionUser>) {
        match user {
            Some(user) => {
                if self.current().user_id.as_deref() == Some(user.id.as_str())
                    && self.bound.lock().is_some()
                {
                    return;
                }
                match self.subscribe(&user.id).await {
                    Ok(sub) => {
                        *self.bound.lock() = Some(sub);
                    }
                    Err(e) => warn!(error = %e, "could not subscribe for signed-in user"),
                }
            }
            None => self.unsubscribe().await,
        }
    }

    fn require_user(&self) -> Result<SessionUser, DomainError> {
        self.session
            .current_user()
            .ok_or_else(DomainError::unauthenticated)
    }

    /// Create an interview for the signed-in user and return its id.
    /// Completion does not imply the snapshot already holds the record.
    #[instrument(
        name = "interviews.sync.create",
        skip(self, draft),
        fields(company = %draft.company_name)
    )]
    pub async fn create(&self, draft: InterviewDraft) -> Result<RecordId, DomainError> {
        let valid = validate_draft(&draft, self.config.max_text_length)?;
        let user = self.require_user()?;

        let doc = self
            .store
            .insert(&self.config.collection, mapper::draft_to_fields(&user.id, &valid))
            .await?;

        info!(id = %doc.id, "interview created");
        Ok(doc.id)
    }

    #[instrument(name = "interviews.sync.update", skip(self, patch), fields(id = %id))]
    pub async fn update(&self, id: RecordId, patch: InterviewPatch) -> Result<(), DomainError> {
        let valid = validate_patch(&patch, self.config.max_text_length)?;
        self.require_user()?;

        match self
            .store
            .update(&self.config.collection, &id, mapper::patch_to_fields(&valid))
            .await
        {
            Ok(_) => {
                info!("interview updated");
                Ok(())
            }
            Err(StoreError::NotFound { .. }) => Err(DomainError::interview_not_found(id)),
            Err(e) => Err(e.into()),
        }
    }

    /// Hard delete. An absent id surfaces as a store error and leaves the
    /// canonical list untouched.
    #[instrument(name = "interviews.sync.delete", skip(self), fields(id = %id))]
    pub async fn delete(&self, id: RecordId) -> Result<(), DomainError> {
        self.require_user()?;
        self.store.remove(&self.config.collection, &id).await?;
        info!("interview deleted");
        Ok(())
    }
}

/// Moves deliveries from the store listener into the canonical state until
/// cancelled, superseded, or the listener closes.
async fn pump(
    mut listener: StoreListener,
    state: Arc<watch::Sender<SyncState>>,
    generation: u64,
    cancel: CancellationToken,
) {
    loop {
        let delivery = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            d = listener.next() => d,
        };
        let Some(delivery) = delivery else {
            debug!(generation, "store listener closed");
            break;
        };

        let current = state.send_if_modified(|s| {
            if s.generation != generation {
                return false;
            }
            match &delivery {
                Ok(docs) => {
                    s.interviews = decode(docs).into();
                    s.error = None;
                    s.loaded = true;
                }
                Err(e) => {
                    warn!(generation, error = %e, "subscription error; keeping last list");
                    s.error = Some(e.clone());
                }
            }
            true
        });
        if !current {
            debug!(generation, "subscription superseded");
            break;
        }
    }
    listener.cancel();
}

fn decode(docs: &[Document]) -> Vec<Interview> {
    docs.iter()
        .filter_map(|doc| match mapper::interview_from_document(doc) {
            Ok(i) => Some(i),
            Err(e) => {
                warn!(id = %doc.id, error = %e, "skipping malformed interview document");
                None
            }
        })
        .collect()
}

/// Caller's handle on a standing subscription. Dropping it, or calling
/// `unsubscribe`, stops delivery.
pub struct Subscription {
    generation: u64,
    rx: watch::Receiver<SyncState>,
    cancel: CancellationToken,
}

impl Subscription {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Wait for the next snapshot. Deliveries that arrive between two calls
    /// collapse into the latest one. Returns `None` once released or
    /// superseded by a newer subscription.
    pub async fn next(&mut self) -> Option<Snapshot> {
        loop {
            if self.cancel.is_cancelled() {
                return None;
            }
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return None,
                changed = self.rx.changed() => {
                    if changed.is_err() {
                        return None;
                    }
                }
            }
            let state = self.rx.borrow_and_update();
            if state.generation != self.generation {
                return None;
            }
            if state.loaded || state.error.is_some() {
                return Some(state.snapshot());
            }
        }
    }

    /// Stop delivery; calling it again has no effect.
    pub fn unsubscribe(&mut self) {
        self.cancel.cancel();
    }

    pub fn is_active(&self) -> bool {
        !self.cancel.is_cancelled() && self.rx.borrow().generation == self.generation
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// Keeps the synchronizer following the session while alive.
pub struct SessionBinding {
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl SessionBinding {
    /// Stop following the session and wait for the task to finish.
    pub async fn shutdown(mut self) {
        self.cancel.cancel();
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                warn!(error = %e, "session binding task failed");
            }
        }
    }
}

impl Drop for SessionBinding {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
