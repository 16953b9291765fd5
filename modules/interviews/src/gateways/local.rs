use async_trait::async_trait;
use std::sync::Arc;

use crate::contract::{
    client::InterviewsApi,
    error::InterviewsError,
    model::{
        DeletionReport, ExportData, ImageSlot, ImageUpload, Interview, InterviewDraft,
        InterviewPatch, Profile, ProfilePatch, RecordId,
    },
};
use crate::domain::service::Service;
use crate::domain::views::{DashboardView, InterviewFilter};

/// Local implementation of the InterviewsApi trait that delegates to the domain service
pub struct InterviewsLocalClient {
    service: Arc<Service>,
}

impl InterviewsLocalClient {
    pub fn new(service: Arc<Service>) -> Self {
        Self { service }
    }
}

#[async_trait]
impl InterviewsApi for InterviewsLocalClient {
    async fn list_interviews(
        &self,
        filter: InterviewFilter,
    ) -> Result<Vec<Interview>, InterviewsError> {
        self.service.list_interviews(&filter).map_err(Into::into)
    }

    async fn dashboard(&self, search: &str) -> Result<DashboardView, InterviewsError> {
        self.service.dashboard(search).map_err(Into::into)
    }

    async fn create_interview(&self, draft: InterviewDraft) -> Result<RecordId, InterviewsError> {
        self.service.create_interview(draft).await.map_err(Into::into)
    }

    async fn update_interview(
        &self,
        id: RecordId,
        patch: InterviewPatch,
    ) -> Result<(), InterviewsError> {
        self.service
            .update_interview(id, patch)
            .await
            .map_err(Into::into)
    }

    async fn delete_interview(&self, id: RecordId) -> Result<(), InterviewsError> {
        self.service.delete_interview(id).await.map_err(Into::into)
    }

    async fn profile(&self) -> Result<Profile, InterviewsError> {
        self.service.profile().await.map_err(Into::into)
    }

    async fn update_profile(&self, patch: ProfilePatch) -> Result<Profile, InterviewsError> {
        self.service.update_profile(patch).await.map_err(Into::into)
    }

    async fn accept_terms(&self) -> Result<Profile, InterviewsError> {
        self.service.accept_terms().await.map_err(Into::into)
    }

    async fn upload_image(
        &self,
        slot: ImageSlot,
        upload: ImageUpload,
    ) -> Result<Profile, InterviewsError> {
        self.service
            .upload_image(slot, upload)
            .await
            .map_err(Into::into)
    }

    async fn export_data(&self) -> Result<ExportData, InterviewsError> {
        self.service.export_data().await.map_err(Into::into)
    }

    async fn delete_account(&self) -> Result<DeletionReport, InterviewsError> {
        self.service.delete_account().await.map_err(Into::into)
    }
}
