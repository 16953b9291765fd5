use std::sync::Arc;

use tracing::{error, info, instrument};

use crate::contract::model::{DeletionReport, DeletionStep, ImageSlot, RecordId};
use crate::domain::error::DomainError;
use crate::domain::mapper::field;
use crate::domain::ports::{AuthSession, BlobStore, Query, RecordStore, StoreError};
use crate::domain::sync::InterviewSynchronizer;

/// Removes everything a user owns: interviews, then images, then the profile.
#[derive(Clone)]
pub struct AccountService {
    store: Arc<dyn RecordStore>,
    blobs: Arc<dyn BlobStore>,
    session: Arc<dyn AuthSession>,
    sync: Arc<InterviewSynchronizer>,
    interviews_collection: String,
    profiles_collection: String,
}

impl AccountService {
    pub fn new(
        store: Arc<dyn RecordStore>,
        blobs: Arc<dyn BlobStore>,
        session: Arc<dyn AuthSession>,
        sync: Arc<InterviewSynchronizer>,
        interviews_collection: impl Into<String>,
        profiles_collection: impl Into<String>,
    ) -> Self {
        Self {
            store,
            blobs,
            session,
            sync,
            interviews_collection: interviews_collection.into(),
            profiles_collection: profiles_collection.into(),
        }
    }

    /// Run the deletion steps in order. A failure after anything was removed
    /// is reported as `AccountDeletionIncomplete`, carrying what was removed.
    #[instrument(name = "interviews.account.delete", skip(self))]
    pub async fn delete_account(&self) -> Result<DeletionReport, DomainError> {
        let user = self
            .session
            .current_user()
            .ok_or_else(DomainError::unauthenticated)?;
        info!(user_id = %user.id, "deleting account");

        let mut report = DeletionReport::default();
        let mut completed = Vec::with_capacity(DeletionStep::ORDER.len());
        for step in DeletionStep::ORDER {
            let outcome = match step {
                DeletionStep::Interviews => self.delete_interviews(&user.id, &mut report).await,
                DeletionStep::Images => self.delete_images(&user.id, &mut report).await,
                DeletionStep::Profile => self
                    .delete_profile(&user.id)
                    .await
                    .map(|removed| report.profile_removed = removed),
            };
            if let Err(e) = outcome {
                error!(step = %step, error = %e, "account deletion step failed");
                if completed.is_empty() && report == DeletionReport::default() {
                    return Err(e);
                }
                return Err(DomainError::deletion_incomplete(completed, step, report, e));
            }
            completed.push(step);
        }

        self.sync.unsubscribe().await;
        info!(
            interviews = report.interviews_removed,
            images = report.images_removed,
            "account deleted"
        );
        Ok(report)
    }

    async fn delete_interviews(
        &self,
        user_id: &str,
        report: &mut DeletionReport,
    ) -> Result<(), DomainError> {
        let query = Query::new().where_eq(field::USER_ID, user_id);
        let docs = self
            .store
            .query(&self.interviews_collection, &query)
            .await?;
        for doc in &docs {
            match self.store.remove(&self.interviews_collection, &doc.id).await {
                Ok(()) => report.interviews_removed += 1,
                // removed concurrently; nothing left to do
                Err(StoreError::NotFound { .. }) => {}
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }

    async fn delete_images(
        &self,
        user_id: &str,
        report: &mut DeletionReport,
    ) -> Result<(), DomainError> {
        for slot in [ImageSlot::Avatar, ImageSlot::Cover] {
            let prefix = format!("{}/{}-", slot.folder(), user_id);
            report.images_removed += self.blobs.remove_prefix(&prefix).await?;
        }
        Ok(())
    }

    async fn delete_profile(&self, user_id: &str) -> Result<bool, DomainError> {
        match self
            .store
            .remove(&self.profiles_collection, &RecordId::new(user_id))
            .await
        {
            Ok(()) => Ok(true),
            Err(StoreError::NotFound { .. }) => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}
