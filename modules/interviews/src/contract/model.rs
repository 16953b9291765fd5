use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Opaque record identifier assigned by the record store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(String);

impl RecordId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RecordId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for RecordId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

fn label_key(s: &str) -> String {
    s.chars()
        .filter(|c| !matches!(c, ' ' | '_' | '-'))
        .flat_map(char::to_lowercase)
        .collect()
}

/// Outcome of an interview. Values read back from the store that match none
/// of the known labels are kept verbatim in `Unrecognized`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum InterviewStatus {
    #[default]
    Pending,
    Passed,
    Failed,
    NoFeedback,
    Unrecognized(String),
}

impl InterviewStatus {
    pub const KNOWN: [InterviewStatus; 4] = [
        InterviewStatus::Pending,
        InterviewStatus::Passed,
        InterviewStatus::Failed,
        InterviewStatus::NoFeedback,
    ];

    pub fn as_str(&self) -> &str {
        match self {
            Self::Pending => "Pending",
            Self::Passed => "Passed",
            Self::Failed => "Failed",
            Self::NoFeedback => "No Feedback",
            Self::Unrecognized(raw) => raw,
        }
    }

    pub fn is_recognized(&self) -> bool {
        !matches!(self, Self::Unrecognized(_))
    }

    /// Lenient label parsing: "No Feedback", "no_feedback" and "NO-FEEDBACK"
    /// all resolve to `NoFeedback`.
    pub fn parse_label(s: &str) -> Option<Self> {
        match label_key(s).as_str() {
            "pending" => Some(Self::Pending),
            "passed" => Some(Self::Passed),
            "failed" => Some(Self::Failed),
            "nofeedback" => Some(Self::NoFeedback),
            _ => None,
        }
    }
}

impl From<String> for InterviewStatus {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            "Pending" => Self::Pending,
            "Passed" => Self::Passed,
            "Failed" => Self::Failed,
            "No Feedback" => Self::NoFeedback,
            _ => Self::Unrecognized(raw),
        }
    }
}

impl From<InterviewStatus> for String {
    fn from(status: InterviewStatus) -> Self {
        match status {
            InterviewStatus::Unrecognized(raw) => raw,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for InterviewStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum PriorityLevel {
    High,
    #[default]
    Medium,
    Low,
    Unrecognized(String),
}

impl PriorityLevel {
    pub fn as_str(&self) -> &str {
        match self {
            Self::High => "High",
            Self::Medium => "Medium",
            Self::Low => "Low",
            Self::Unrecognized(raw) => raw,
        }
    }

    pub fn is_recognized(&self) -> bool {
        !matches!(self, Self::Unrecognized(_))
    }

    pub fn parse_label(s: &str) -> Option<Self> {
        match label_key(s).as_str() {
            "high" => Some(Self::High),
            "medium" => Some(Self::Medium),
            "low" => Some(Self::Low),
            _ => None,
        }
    }
}

impl From<String> for PriorityLevel {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            "High" => Self::High,
            "Medium" => Self::Medium,
            "Low" => Self::Low,
            _ => Self::Unrecognized(raw),
        }
    }
}

impl From<PriorityLevel> for String {
    fn from(priority: PriorityLevel) -> Self {
        match priority {
            PriorityLevel::Unrecognized(raw) => raw,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for PriorityLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One interview record as held in a snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Interview {
    pub id: RecordId,
    pub user_id: String,
    pub company_name: String,
    pub job_position: String,
    pub interviewer_name: String,
    pub interview_date: NaiveDate,
    pub priority_level: PriorityLevel,
    pub status: InterviewStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating an interview. The owner is taken from the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterviewDraft {
    pub company_name: String,
    pub job_position: String,
    pub interviewer_name: String,
    /// ISO date; a trailing time part (`2024-03-10T09:00`) is dropped.
    pub interview_date: String,
    pub priority_level: PriorityLevel,
    /// Defaults to `Pending`.
    pub status: Option<InterviewStatus>,
}

/// Partial update; `None` leaves the field untouched.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct InterviewPatch {
    pub company_name: Option<String>,
    pub job_position: Option<String>,
    pub interviewer_name: Option<String>,
    pub interview_date: Option<String>,
    pub priority_level: Option<PriorityLevel>,
    pub status: Option<InterviewStatus>,
}

impl InterviewPatch {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Per-user profile, keyed by the session user id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Profile {
    pub id: String,
    pub email: String,
    /// `None` means never provided; `Some("")` means cleared by the user.
    pub full_name: Option<String>,
    pub professional_title: Option<String>,
    pub employment_status: Option<String>,
    pub avatar_url: Option<String>,
    pub cover_photo_url: Option<String>,
    pub onboarding_completed: bool,
    pub terms_accepted: bool,
    pub terms_accepted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Profile {
    pub fn needs_onboarding(&self) -> bool {
        !self.terms_accepted || !self.onboarding_completed
    }
}

/// Employment statuses offered by the profile editor; free text is accepted too.
pub const EMPLOYMENT_STATUS_SUGGESTIONS: [&str; 4] = [
    "Actively Looking",
    "Open to Opportunities",
    "Employed",
    "Not Looking",
];

/// Tri-state update for nullable profile fields.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum FieldUpdate {
    #[default]
    Keep,
    Unset,
    Set(String),
}

impl FieldUpdate {
    pub fn is_keep(&self) -> bool {
        matches!(self, Self::Keep)
    }
}

impl From<Option<Option<String>>> for FieldUpdate {
    fn from(v: Option<Option<String>>) -> Self {
        match v {
            None => Self::Keep,
            Some(None) => Self::Unset,
            Some(Some(s)) => Self::Set(s),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ProfilePatch {
    pub email: Option<String>,
    pub full_name: FieldUpdate,
    pub professional_title: FieldUpdate,
    pub employment_status: FieldUpdate,
    pub avatar_url: FieldUpdate,
    pub cover_photo_url: FieldUpdate,
    pub onboarding_completed: Option<bool>,
}

/// Which image slot of the profile an upload targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageSlot {
    Avatar,
    Cover,
}

impl ImageSlot {
    pub fn folder(self) -> &'static str {
        match self {
            Self::Avatar => "avatars",
            Self::Cover => "covers",
        }
    }

    pub fn field(self) -> &'static str {
        match self {
            Self::Avatar => "avatar_url",
            Self::Cover => "cover_photo_url",
        }
    }
}

/// Raw image payload for profile uploads.
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub bytes: Vec<u8>,
    pub content_type: String,
}

/// Steps of account deletion, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeletionStep {
    Interviews,
    Images,
    Profile,
}

impl DeletionStep {
    pub const ORDER: [DeletionStep; 3] = [
        DeletionStep::Interviews,
        DeletionStep::Images,
        DeletionStep::Profile,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Interviews => "interviews",
            Self::Images => "images",
            Self::Profile => "profile",
        }
    }
}

impl fmt::Display for DeletionStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Summary of a completed account deletion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DeletionReport {
    pub interviews_removed: usize,
    pub images_removed: usize,
    pub profile_removed: bool,
}

/// Everything a user can download about themselves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportData {
    pub profile: Option<Profile>,
    pub interviews: Vec<Interview>,
    pub exported_at: DateTime<Utc>,
}

impl ExportData {
    pub fn file_name(&self) -> String {
        format!("interfy-export-{}.json", self.exported_at.format("%Y-%m-%d"))
    }
}

impl FromStr for InterviewStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse_label(s).ok_or_else(|| format!("unknown status '{s}'"))
    }
}

impl FromStr for PriorityLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse_label(s).ok_or_else(|| format!("unknown priority level '{s}'"))
    }
}
