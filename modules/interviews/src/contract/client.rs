use async_trait::async_trait;

use crate::contract::{
    error::InterviewsError,
    model::{
        DeletionReport, ExportData, ImageSlot, ImageUpload, Interview, InterviewDraft,
        InterviewPatch, Profile, ProfilePatch, RecordId,
    },
};
use crate::domain::views::{DashboardView, InterviewFilter};

/// Public API of the interviews module for in-process consumers.
#[async_trait]
pub trait InterviewsApi: Send + Sync {
    /// Current canonical list with the combined filter applied.
    async fn list_interviews(
        &self,
        filter: InterviewFilter,
    ) -> Result<Vec<Interview>, InterviewsError>;

    /// Stats and the date-sorted pending list, searched by `search`.
    async fn dashboard(&self, search: &str) -> Result<DashboardView, InterviewsError>;

    async fn create_interview(&self, draft: InterviewDraft) -> Result<RecordId, InterviewsError>;

    async fn update_interview(
        &self,
        id: RecordId,
        patch: InterviewPatch,
    ) -> Result<(), InterviewsError>;

    async fn delete_interview(&self, id: RecordId) -> Result<(), InterviewsError>;

    async fn profile(&self) -> Result<Profile, InterviewsError>;

    async fn update_profile(&self, patch: ProfilePatch) -> Result<Profile, InterviewsError>;

    async fn accept_terms(&self) -> Result<Profile, InterviewsError>;

    async fn upload_image(
        &self,
        slot: ImageSlot,
        upload: ImageUpload,
    ) -> Result<Profile, InterviewsError>;

    async fn export_data(&self) -> Result<ExportData, InterviewsError>;

    async fn delete_account(&self) -> Result<DeletionReport, InterviewsError>;
}
