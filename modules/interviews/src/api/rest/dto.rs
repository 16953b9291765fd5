use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use utoipa::ToSchema;

use crate::contract::model::{
    DeletionReport, ExportData, Interview, InterviewDraft, InterviewPatch, InterviewStatus,
    PriorityLevel, Profile, ProfilePatch,
};
use crate::domain::ports::SessionUser;
use crate::domain::sync::{Snapshot, SyncState};
use crate::domain::validation::format_interview_date;
use crate::domain::views::{DashboardView, InterviewStats};

/// Keeps an explicit `null` apart from an absent field.
fn double_option<'de, D, T>(de: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(de).map(Some)
}

fn status_from_label(raw: String) -> InterviewStatus {
    InterviewStatus::parse_label(&raw).unwrap_or(InterviewStatus::Unrecognized(raw))
}

fn priority_from_label(raw: String) -> PriorityLevel {
    PriorityLevel::parse_label(&raw).unwrap_or(PriorityLevel::Unrecognized(raw))
}

/// REST DTO for signing in the local session
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SignInReq {
    pub user_id: String,
    pub email: String,
    pub display_name: Option<String>,
    pub photo_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SessionDto {
    pub user_id: String,
    pub email: String,
    pub display_name: Option<String>,
}

impl From<SignInReq> for SessionUser {
    fn from(req: SignInReq) -> Self {
        Self {
            id: req.user_id,
            email: req.email,
            display_name: req.display_name,
            photo_url: req.photo_url,
        }
    }
}

impl From<SessionUser> for SessionDto {
    fn from(user: SessionUser) -> Self {
        Self {
            user_id: user.id,
            email: user.email,
            display_name: user.display_name,
        }
    }
}

/// REST DTO for interview representation
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct InterviewDto {
    pub id: String,
    pub user_id: String,
    pub company_name: String,
    pub job_position: String,
    pub interviewer_name: String,
    /// `YYYY-MM-DD`
    pub interview_date: String,
    pub priority_level: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&Interview> for InterviewDto {
    fn from(i: &Interview) -> Self {
        Self {
            id: i.id.to_string(),
            user_id: i.user_id.clone(),
            company_name: i.company_name.clone(),
            job_position: i.job_position.clone(),
            interviewer_name: i.interviewer_name.clone(),
            interview_date: format_interview_date(i.interview_date),
            priority_level: i.priority_level.to_string(),
            status: i.status.to_string(),
            created_at: i.created_at,
            updated_at: i.updated_at,
        }
    }
}

/// REST DTO for creating an interview
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CreateInterviewReq {
    pub company_name: String,
    pub job_position: String,
    pub interviewer_name: String,
    /// `YYYY-MM-DD`; a trailing time part is ignored.
    pub interview_date: String,
    /// Defaults to `Medium`.
    pub priority_level: Option<String>,
    /// Defaults to `Pending`.
    pub status: Option<String>,
}

impl From<CreateInterviewReq> for InterviewDraft {
    fn from(req: CreateInterviewReq) -> Self {
        Self {
            company_name: req.company_name,
            job_position: req.job_position,
            interviewer_name: req.interviewer_name,
            interview_date: req.interview_date,
            priority_level: req
                .priority_level
                .map(priority_from_label)
                .unwrap_or_default(),
            status: req.status.map(status_from_label),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CreatedDto {
    pub id: String,
}

/// REST DTO for updating an interview (partial). The owner cannot be changed.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Default)]
#[serde(deny_unknown_fields)]
pub struct UpdateInterviewReq {
    pub company_name: Option<String>,
    pub job_position: Option<String>,
    pub interviewer_name: Option<String>,
    pub interview_date: Option<String>,
    pub priority_level: Option<String>,
    pub status: Option<String>,
}

impl From<UpdateInterviewReq> for InterviewPatch {
    fn from(req: UpdateInterviewReq) -> Self {
        Self {
            company_name: req.company_name,
            job_position: req.job_position,
            interviewer_name: req.interviewer_name,
            interview_date: req.interview_date,
            priority_level: req.priority_level.map(priority_from_label),
            status: req.status.map(status_from_label),
        }
    }
}

/// Query parameters of the list endpoint
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct ListInterviewsQuery {
    pub search: Option<String>,
    /// `all` or a status label
    pub status: Option<String>,
    /// `all` or a priority label
    pub priority: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct DashboardQuery {
    pub search: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct InterviewListDto {
    pub interviews: Vec<InterviewDto>,
    pub total: usize,
    /// False until the first snapshot for the session user has arrived.
    pub loaded: bool,
    /// Last subscription error; the list is the last one known to be good.
    pub sync_error: Option<String>,
}

impl InterviewListDto {
    pub fn new(filtered: &[Interview], state: &SyncState) -> Self {
        Self {
            interviews: filtered.iter().map(InterviewDto::from).collect(),
            total: filtered.len(),
            loaded: state.loaded,
            sync_error: state.error.as_ref().map(ToString::to_string),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, ToSchema)]
pub struct StatsDto {
    pub total: usize,
    pub pending: usize,
    pub passed: usize,
    pub failed: usize,
    pub no_feedback: usize,
}

impl From<InterviewStats> for StatsDto {
    fn from(s: InterviewStats) -> Self {
        Self {
            total: s.total,
            pending: s.pending,
            passed: s.passed,
            failed: s.failed,
            no_feedback: s.no_feedback,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DashboardDto {
    pub stats: StatsDto,
    pub pending: Vec<InterviewDto>,
}

impl From<DashboardView> for DashboardDto {
    fn from(v: DashboardView) -> Self {
        Self {
            stats: v.stats.into(),
            pending: v.pending.iter().map(InterviewDto::from).collect(),
        }
    }
}

/// Transport-level SSE payload: one full snapshot.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[schema(title = "InterviewsSnapshot", description = "Server-sent interview snapshot")]
pub struct SnapshotEvent {
    pub interviews: Vec<InterviewDto>,
    pub total: usize,
    pub error: Option<String>,
}

impl From<&Snapshot> for SnapshotEvent {
    fn from(s: &Snapshot) -> Self {
        Self {
            interviews: s.interviews.iter().map(InterviewDto::from).collect(),
            total: s.interviews.len(),
            error: s.error.as_ref().map(ToString::to_string),
        }
    }
}

/// REST DTO for profile representation
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ProfileDto {
    pub id: String,
    pub email: String,
    pub full_name: Option<String>,
    pub professional_title: Option<String>,
    pub employment_status: Option<String>,
    pub avatar_url: Option<String>,
    pub cover_photo_url: Option<String>,
    pub onboarding_completed: bool,
    pub terms_accepted: bool,
    pub terms_accepted_at: Option<DateTime<Utc>>,
    pub needs_onboarding: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Profile> for ProfileDto {
    fn from(p: Profile) -> Self {
        Self {
            needs_onboarding: p.needs_onboarding(),
            id: p.id,
            email: p.email,
            full_name: p.full_name,
            professional_title: p.professional_title,
            employment_status: p.employment_status,
            avatar_url: p.avatar_url,
            cover_photo_url: p.cover_photo_url,
            onboarding_completed: p.onboarding_completed,
            terms_accepted: p.terms_accepted,
            terms_accepted_at: p.terms_accepted_at,
            created_at: p.created_at,
            updated_at: p.updated_at,
        }
    }
}

/// REST DTO for profile edits. Absent leaves a field alone, `null` unsets it.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Default)]
#[serde(deny_unknown_fields)]
pub struct UpdateProfileReq {
    pub email: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub full_name: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub professional_title: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub employment_status: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub avatar_url: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub cover_photo_url: Option<Option<String>>,
    pub onboarding_completed: Option<bool>,
}

impl From<UpdateProfileReq> for ProfilePatch {
    fn from(req: UpdateProfileReq) -> Self {
        Self {
            email: req.email,
            full_name: req.full_name.into(),
            professional_title: req.professional_title.into(),
            employment_status: req.employment_status.into(),
            avatar_url: req.avatar_url.into(),
            cover_photo_url: req.cover_photo_url.into(),
            onboarding_completed: req.onboarding_completed,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ExportProfileDto {
    pub email: String,
    pub full_name: Option<String>,
    pub professional_title: Option<String>,
    pub employment_status: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Body of the export download
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ExportDto {
    pub profile: Option<ExportProfileDto>,
    pub interviews: Vec<InterviewDto>,
    pub export_date: DateTime<Utc>,
    pub total_interviews: usize,
}

impl From<&ExportData> for ExportDto {
    fn from(e: &ExportData) -> Self {
        Self {
            profile: e.profile.as_ref().map(|p| ExportProfileDto {
                email: p.email.clone(),
                full_name: p.full_name.clone(),
                professional_title: p.professional_title.clone(),
                employment_status: p.employment_status.clone(),
                created_at: p.created_at,
            }),
            interviews: e.interviews.iter().map(InterviewDto::from).collect(),
            export_date: e.exported_at,
            total_interviews: e.interviews.len(),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, ToSchema)]
pub struct DeletionReportDto {
    pub interviews_removed: usize,
    pub images_removed: usize,
    pub profile_removed: bool,
}

impl From<DeletionReport> for DeletionReportDto {
    fn from(r: DeletionReport) -> Self {
        Self {
            interviews_removed: r.interviews_removed,
            images_removed: r.images_removed,
            profile_removed: r.profile_removed,
        }
    }
}
