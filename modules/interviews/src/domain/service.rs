use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, instrument, warn};

use crate::contract::model::{
    DeletionReport, ExportData, ImageSlot, ImageUpload, Interview, InterviewDraft,
    InterviewPatch, Profile, ProfilePatch, RecordId,
};
use crate::domain::account::AccountService;
use crate::domain::error::DomainError;
use crate::domain::export::ExportService;
use crate::domain::ports::{AuthSession, SessionUser};
use crate::domain::profile::ProfileService;
use crate::domain::sync::{InterviewSynchronizer, SyncState};
use crate::domain::views::{self, DashboardView, InterviewFilter};

/// Entry point for the REST layer and the local client: reads go through the
/// synchronizer's canonical state, writes go to the owning component.
#[derive(Clone)]
pub struct Service {
    session: Arc<dyn AuthSession>,
    sync: Arc<InterviewSynchronizer>,
    profile: ProfileService,
    account: AccountService,
    export: ExportService,
}

impl Service {
    pub fn new(
        session: Arc<dyn AuthSession>,
        sync: Arc<InterviewSynchronizer>,
        profile: ProfileService,
        account: AccountService,
        export: ExportService,
    ) -> Self {
        Self {
            session,
            sync,
            profile,
            account,
            export,
        }
    }

    pub fn synchronizer(&self) -> &Arc<InterviewSynchronizer> {
        &self.sync
    }

    fn require_user(&self) -> Result<SessionUser, DomainError> {
        self.session
            .current_user()
            .ok_or_else(DomainError::unauthenticated)
    }

    /// Canonical state for the signed-in user. State that belongs to another
    /// user (the binding has not caught up yet) is reported as empty.
    pub fn state(&self) -> Result<SyncState, DomainError> {
        let user = self.require_user()?;
        let state = self.sync.current();
        if state.user_id.as_deref() == Some(user.id.as_str()) {
            Ok(state)
        } else {
            debug!("canonical state not yet bound to the session user");
            Ok(SyncState {
                user_id: Some(user.id),
                ..Default::default()
            })
        }
    }

    /// Wait until the canonical state belongs to `user_id` and has its first
    /// delivery (or error). Returns false on timeout.
    pub async fn wait_until_bound(&self, user_id: &str, timeout: Duration) -> bool {
        let mut rx = self.sync.watch_state();
        let ready = rx.wait_for(|s| {
            s.user_id.as_deref() == Some(user_id) && (s.loaded || s.error.is_some())
        });
        let outcome = tokio::time::timeout(timeout, ready).await.map(|r| r.is_ok());
        match outcome {
            Ok(bound) => bound,
            Err(_) => {
                warn!(user_id, "timed out waiting for the first snapshot");
                false
            }
        }
    }

    #[instrument(name = "interviews.service.list", skip(self))]
    pub fn list_interviews(&self, filter: &InterviewFilter) -> Result<Vec<Interview>, DomainError> {
        let state = self.state()?;
        Ok(filter.apply(&state.interviews))
    }

    #[instrument(name = "interviews.service.dashboard", skip(self))]
    pub fn dashboard(&self, search: &str) -> Result<DashboardView, DomainError> {
        let state = self.state()?;
        Ok(views::dashboard(&state.interviews, search))
    }

    pub async fn create_interview(&self, draft: InterviewDraft) -> Result<RecordId, DomainError> {
        self.sync.create(draft).await
    }

    pub async fn update_interview(
        &self,
        id: RecordId,
        patch: InterviewPatch,
    ) -> Result<(), DomainError> {
        self.sync.update(id, patch).await
    }

    pub async fn delete_interview(&self, id: RecordId) -> Result<(), DomainError> {
        self.sync.delete(id).await
    }

    pub async fn profile(&self) -> Result<Profile, DomainError> {
        self.profile.fetch_or_create().await
    }

    pub async fn update_profile(&self, patch: ProfilePatch) -> Result<Profile, DomainError> {
        self.profile.update(patch).await
    }

    pub async fn accept_terms(&self) -> Result<Profile, DomainError> {
        self.profile.accept_terms().await
    }

    pub async fn upload_image(
        &self,
        slot: ImageSlot,
        upload: ImageUpload,
    ) -> Result<Profile, DomainError> {
        self.profile.upload_image(slot, upload).await
    }

    pub async fn export_data(&self) -> Result<ExportData, DomainError> {
        self.export.export_data().await
    }

    pub async fn delete_account(&self) -> Result<DeletionReport, DomainError> {
        self.account.delete_account().await
    }
}
