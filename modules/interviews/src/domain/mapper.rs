//! Conversion between store documents and contract models.

use chrono::{DateTime, Utc};
use serde_json::{json, Value};
use thiserror::Error;

use crate::contract::model::{
    FieldUpdate, Interview, InterviewStatus, PriorityLevel, Profile, ProfilePatch,
};
use crate::domain::ports::{Document, Fields};
use crate::domain::validation::{format_interview_date, parse_interview_date, ValidDraft, ValidPatch};

pub mod field {
    pub const USER_ID: &str = "user_id";
    pub const COMPANY_NAME: &str = "company_name";
    pub const JOB_POSITION: &str = "job_position";
    pub const INTERVIEWER_NAME: &str = "interviewer_name";
    pub const INTERVIEW_DATE: &str = "interview_date";
    pub const PRIORITY_LEVEL: &str = "priority_level";
    pub const STATUS: &str = "status";

    pub const EMAIL: &str = "email";
    pub const FULL_NAME: &str = "full_name";
    pub const PROFESSIONAL_TITLE: &str = "professional_title";
    pub const EMPLOYMENT_STATUS: &str = "employment_status";
    pub const AVATAR_URL: &str = "avatar_url";
    pub const COVER_PHOTO_URL: &str = "cover_photo_url";
    pub const ONBOARDING_COMPLETED: &str = "onboarding_completed";
    pub const TERMS_ACCEPTED: &str = "terms_accepted";
    pub const TERMS_ACCEPTED_AT: &str = "terms_accepted_at";
}

/// Why a document could not be read as a model.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("field '{field}': {reason}")]
pub struct MappingError {
    pub field: &'static str,
    pub reason: String,
}

fn required_str<'a>(doc: &'a Document, name: &'static str) -> Result<&'a str, MappingError> {
    doc.str_field(name).ok_or_else(|| MappingError {
        field: name,
        reason: "missing or not a string".to_string(),
    })
}

fn optional_str(doc: &Document, name: &str) -> Option<String> {
    doc.str_field(name).map(str::to_string)
}

pub fn interview_from_document(doc: &Document) -> Result<Interview, MappingError> {
    let raw_date = required_str(doc, field::INTERVIEW_DATE)?;
    let interview_date = parse_interview_date(raw_date).map_err(|_| MappingError {
        field: field::INTERVIEW_DATE,
        reason: format!("unparseable date '{raw_date}'"),
    })?;

    Ok(Interview {
        id: doc.id.clone(),
        user_id: required_str(doc, field::USER_ID)?.to_string(),
        company_name: required_str(doc, field::COMPANY_NAME)?.to_string(),
        job_position: required_str(doc, field::JOB_POSITION)?.to_string(),
        interviewer_name: required_str(doc, field::INTERVIEWER_NAME)?.to_string(),
        interview_date,
        // unknown labels survive as Unrecognized instead of failing the row
        priority_level: PriorityLevel::from(
            optional_str(doc, field::PRIORITY_LEVEL).unwrap_or_default(),
        ),
        status: InterviewStatus::from(optional_str(doc, field::STATUS).unwrap_or_default()),
        created_at: doc.created_at,
        updated_at: doc.updated_at,
    })
}

pub fn draft_to_fields(user_id: &str, draft: &ValidDraft) -> Fields {
    let mut fields = Fields::new();
    fields.insert(field::USER_ID.into(), json!(user_id));
    fields.insert(field::COMPANY_NAME.into(), json!(draft.company_name));
    fields.insert(field::JOB_POSITION.into(), json!(draft.job_position));
    fields.insert(field::INTERVIEWER_NAME.into(), json!(draft.interviewer_name));
    fields.insert(
        field::INTERVIEW_DATE.into(),
        json!(format_interview_date(draft.interview_date)),
    );
    fields.insert(
        field::PRIORITY_LEVEL.into(),
        json!(draft.priority_level.as_str()),
    );
    fields.insert(field::STATUS.into(), json!(draft.status.as_str()));
    fields
}

/// Only supplied fields end up in the patch; `user_id` is never included.
pub fn patch_to_fields(patch: &ValidPatch) -> Fields {
    let mut fields = Fields::new();
    let mut put = |name: &str, value: Option<Value>| {
        if let Some(v) = value {
            fields.insert(name.to_string(), v);
        }
    };
    put(field::COMPANY_NAME, patch.company_name.as_ref().map(|v| json!(v)));
    put(field::JOB_POSITION, patch.job_position.as_ref().map(|v| json!(v)));
    put(
        field::INTERVIEWER_NAME,
        patch.interviewer_name.as_ref().map(|v| json!(v)),
    );
    put(
        field::INTERVIEW_DATE,
        patch
            .interview_date
            .map(|d| json!(format_interview_date(d))),
    );
    put(
        field::PRIORITY_LEVEL,
        patch.priority_level.as_ref().map(|p| json!(p.as_str())),
    );
    put(field::STATUS, patch.status.as_ref().map(|s| json!(s.as_str())));
    fields
}

pub fn profile_from_document(doc: &Document) -> Result<Profile, MappingError> {
    let terms_accepted_at = match doc.fields.get(field::TERMS_ACCEPTED_AT) {
        None | Some(Value::Null) => None,
        Some(Value::String(raw)) => Some(
            DateTime::parse_from_rfc3339(raw)
                .map_err(|e| MappingError {
                    field: field::TERMS_ACCEPTED_AT,
                    reason: e.to_string(),
                })?
                .with_timezone(&Utc),
        ),
        Some(other) => {
            return Err(MappingError {
                field: field::TERMS_ACCEPTED_AT,
                reason: format!("unexpected value {other}"),
            })
        }
    };

    Ok(Profile {
        id: doc.id.to_string(),
        email: optional_str(doc, field::EMAIL).unwrap_or_default(),
        full_name: optional_str(doc, field::FULL_NAME),
        professional_title: optional_str(doc, field::PROFESSIONAL_TITLE),
        employment_status: optional_str(doc, field::EMPLOYMENT_STATUS),
        avatar_url: optional_str(doc, field::AVATAR_URL),
        cover_photo_url: optional_str(doc, field::COVER_PHOTO_URL),
        onboarding_completed: doc.bool_field(field::ONBOARDING_COMPLETED).unwrap_or(false),
        terms_accepted: doc.bool_field(field::TERMS_ACCEPTED).unwrap_or(false),
        terms_accepted_at,
        created_at: doc.created_at,
        updated_at: doc.updated_at,
    })
}

/// Fields of a fresh profile seeded from the session bootstrap.
pub fn new_profile_fields(
    email: &str,
    display_name: Option<&str>,
    photo_url: Option<&str>,
) -> Fields {
    let mut fields = Fields::new();
    fields.insert(field::EMAIL.into(), json!(email));
    fields.insert(field::FULL_NAME.into(), json!(display_name));
    fields.insert(field::PROFESSIONAL_TITLE.into(), Value::Null);
    fields.insert(field::EMPLOYMENT_STATUS.into(), Value::Null);
    fields.insert(field::AVATAR_URL.into(), json!(photo_url));
    fields.insert(field::COVER_PHOTO_URL.into(), Value::Null);
    fields.insert(field::ONBOARDING_COMPLETED.into(), json!(false));
    fields.insert(field::TERMS_ACCEPTED.into(), json!(false));
    fields.insert(field::TERMS_ACCEPTED_AT.into(), Value::Null);
    fields
}

pub fn profile_patch_to_fields(patch: &ProfilePatch) -> Fields {
    let mut fields = Fields::new();
    if let Some(email) = &patch.email {
        fields.insert(field::EMAIL.into(), json!(email));
    }
    let nullable = [
        (field::FULL_NAME, &patch.full_name),
        (field::PROFESSIONAL_TITLE, &patch.professional_title),
        (field::EMPLOYMENT_STATUS, &patch.employment_status),
        (field::AVATAR_URL, &patch.avatar_url),
        (field::COVER_PHOTO_URL, &patch.cover_photo_url),
    ];
    for (name, update) in nullable {
        match update {
            FieldUpdate::Keep => {}
            FieldUpdate::Unset => {
                fields.insert(name.into(), Value::Null);
            }
            FieldUpdate::Set(v) => {
                fields.insert(name.into(), json!(v));
            }
        }
    }
    if let Some(done) = patch.onboarding_completed {
        fields.insert(field::ONBOARDING_COMPLETED.into(), json!(done));
    }
    fields
}

pub fn terms_accepted_fields(at: DateTime<Utc>) -> Fields {
    let mut fields = Fields::new();
    fields.insert(field::TERMS_ACCEPTED.into(), json!(true));
    fields.insert(field::TERMS_ACCEPTED_AT.into(), json!(at.to_rfc3339()));
    fields.insert(field::ONBOARDING_COMPLETED.into(), json!(true));
    fields
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::model::RecordId;

    fn doc(fields: Value) -> Document {
        let now = Utc::now();
        Document {
            id: RecordId::from("doc-1"),
            fields: fields.as_object().cloned().unwrap_or_default(),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn unknown_labels_become_unrecognized() {
        let d = doc(json!({
            "user_id": "u1",
            "company_name": "Acme",
            "job_position": "Dev",
            "interviewer_name": "Kim",
            "interview_date": "2024-02-01",
            "priority_level": "Urgent",
            "status": "Ghosted",
        }));
        let i = interview_from_document(&d).unwrap();
        assert_eq!(i.status, InterviewStatus::Unrecognized("Ghosted".into()));
        assert_eq!(i.priority_level, PriorityLevel::Unrecognized("Urgent".into()));
        assert_eq!(i.id.as_str(), "doc-1");
    }

    #[test]
    fn bad_date_is_a_mapping_error() {
        let d = doc(json!({
            "user_id": "u1",
            "company_name": "Acme",
            "job_position": "Dev",
            "interviewer_name": "Kim",
            "interview_date": "someday",
        }));
        let err = interview_from_document(&d).unwrap_err();
        assert_eq!(err.field, field::INTERVIEW_DATE);
        assert_eq!(err.to_string(), "field 'interview_date': unparseable date 'someday'");

        let boxed: Box<dyn std::error::Error + Send + Sync> = Box::new(err);
        assert!(boxed.source().is_none());
    }

    #[test]
    fn profile_patch_distinguishes_unset_from_cleared() {
        let patch = ProfilePatch {
            full_name: FieldUpdate::Set(String::new()),
            professional_title: FieldUpdate::Unset,
            ..Default::default()
        };
        let fields = profile_patch_to_fields(&patch);
        assert_eq!(fields.get(field::FULL_NAME), Some(&json!("")));
        assert_eq!(fields.get(field::PROFESSIONAL_TITLE), Some(&Value::Null));
        assert!(!fields.contains_key(field::EMPLOYMENT_STATUS));

        let profile = profile_from_document(&doc(Value::Object(fields))).unwrap();
        assert_eq!(profile.full_name.as_deref(), Some(""));
        assert_eq!(profile.professional_title, None);
    }
}
