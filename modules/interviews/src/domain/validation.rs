//! Local input checks. Everything here runs before the record store is
//! contacted, so a failure never costs a round trip.

use chrono::NaiveDate;

use crate::contract::model::{InterviewDraft, InterviewPatch, InterviewStatus, PriorityLevel};
use crate::domain::error::DomainError;

pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Parse an interview date. Only the part before a `T` is considered, so
/// `2024-03-10T09:30` yields `2024-03-10`.
pub fn parse_interview_date(raw: &str) -> Result<NaiveDate, DomainError> {
    let day = raw.trim().split('T').next().unwrap_or_default();
    NaiveDate::parse_from_str(day, DATE_FORMAT).map_err(|_| {
        DomainError::validation(
            "interview_date",
            format!("'{raw}' is not a valid date (expected YYYY-MM-DD)"),
        )
    })
}

pub fn format_interview_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

/// Required text: non-blank and at most `max_len` characters. Returns the
/// value unchanged; trimming is left to the caller's input.
pub fn require_text<'a>(
    field: &str,
    value: &'a str,
    max_len: usize,
) -> Result<&'a str, DomainError> {
    if value.trim().is_empty() {
        return Err(DomainError::validation(field, "must not be blank"));
    }
    let len = value.chars().count();
    if len > max_len {
        return Err(DomainError::validation(
            field,
            format!("too long: {len} characters (max: {max_len})"),
        ));
    }
    Ok(value)
}

fn require_recognized_status(status: &InterviewStatus) -> Result<(), DomainError> {
    if status.is_recognized() {
        Ok(())
    } else {
        Err(DomainError::validation(
            "status",
            format!("unknown status '{status}'"),
        ))
    }
}

fn require_recognized_priority(priority: &PriorityLevel) -> Result<(), DomainError> {
    if priority.is_recognized() {
        Ok(())
    } else {
        Err(DomainError::validation(
            "priority_level",
            format!("unknown priority level '{priority}'"),
        ))
    }
}

/// Checked form of a draft, ready to be written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidDraft {
    pub company_name: String,
    pub job_position: String,
    pub interviewer_name: String,
    pub interview_date: NaiveDate,
    pub priority_level: PriorityLevel,
    pub status: InterviewStatus,
}

pub fn validate_draft(draft: &InterviewDraft, max_len: usize) -> Result<ValidDraft, DomainError> {
    let company_name = require_text("company_name", &draft.company_name, max_len)?;
    let job_position = require_text("job_position", &draft.job_position, max_len)?;
    let interviewer_name = require_text("interviewer_name", &draft.interviewer_name, max_len)?;
    let interview_date = parse_interview_date(&draft.interview_date)?;
    require_recognized_priority(&draft.priority_level)?;
    let status = draft.status.clone().unwrap_or_default();
    require_recognized_status(&status)?;

    Ok(ValidDraft {
        company_name: company_name.to_string(),
        job_position: job_position.to_string(),
        interviewer_name: interviewer_name.to_string(),
        interview_date,
        priority_level: draft.priority_level.clone(),
        status,
    })
}

/// Checked form of a patch; only supplied fields are present.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ValidPatch {
    pub company_name: Option<String>,
    pub job_position: Option<String>,
    pub interviewer_name: Option<String>,
    pub interview_date: Option<NaiveDate>,
    pub priority_level: Option<PriorityLevel>,
    pub status: Option<InterviewStatus>,
}

pub fn validate_patch(patch: &InterviewPatch, max_len: usize) -> Result<ValidPatch, DomainError> {
    if patch.is_empty() {
        return Err(DomainError::validation("patch", "no fields to update"));
    }

    let text = |field: &str, v: &Option<String>| -> Result<Option<String>, DomainError> {
        v.as_deref()
            .map(|s| require_text(field, s, max_len).map(str::to_string))
            .transpose()
    };

    let interview_date = patch
        .interview_date
        .as_deref()
        .map(parse_interview_date)
        .transpose()?;
    if let Some(p) = &patch.priority_level {
        require_recognized_priority(p)?;
    }
    if let Some(s) = &patch.status {
        require_recognized_status(s)?;
    }

    Ok(ValidPatch {
        company_name: text("company_name", &patch.company_name)?,
        job_position: text("job_position", &patch.job_position)?,
        interviewer_name: text("interviewer_name", &patch.interviewer_name)?,
        interview_date,
        priority_level: patch.priority_level.clone(),
        status: patch.status.clone(),
    })
}
