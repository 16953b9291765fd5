use axum::{
    http::{HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::error::DomainError;
use crate::domain::ports::StoreError;

/// Content type for Problem Details as per RFC 9457.
pub const APPLICATION_PROBLEM_JSON: &str = "application/problem+json";

/// RFC 9457 Problem Details for HTTP APIs.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[schema(
    title = "Problem",
    description = "RFC 9457 Problem Details for HTTP APIs"
)]
pub struct Problem {
    /// A URI reference that identifies the problem type.
    #[serde(rename = "type")]
    pub type_url: String,
    /// A short, human-readable summary of the problem type.
    pub title: String,
    /// The HTTP status code for this occurrence of the problem.
    pub status: u16,
    /// A human-readable explanation specific to this occurrence of the problem.
    pub detail: String,
    /// A URI reference that identifies the specific occurrence of the problem.
    pub instance: String,
    /// Machine-readable error code.
    pub code: String,
    /// Offending field for validation problems.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    /// Steps that finished before a partial account deletion failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_steps: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failed_step: Option<String>,
    /// Current tracing span id, useful when correlating logs.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trace_id: Option<String>,
}

impl Problem {
    pub fn new(status: StatusCode, title: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            type_url: "about:blank".to_string(),
            title: title.into(),
            status: status.as_u16(),
            detail: detail.into(),
            instance: String::new(),
            code: String::new(),
            field: None,
            completed_steps: None,
            failed_step: None,
            trace_id: None,
        }
    }

    pub fn with_type(mut self, type_url: impl Into<String>) -> Self {
        self.type_url = type_url.into();
        self
    }

    pub fn with_instance(mut self, uri: impl Into<String>) -> Self {
        self.instance = uri.into();
        self
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = code.into();
        self
    }

    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }

    pub fn with_trace_id(mut self, id: impl Into<String>) -> Self {
        self.trace_id = Some(id.into());
        self
    }
}

/// Axum response wrapper that renders `Problem` with correct status & content type.
#[derive(Debug, Clone)]
pub struct ProblemResponse(pub Problem);

impl From<Problem> for ProblemResponse {
    fn from(p: Problem) -> Self {
        Self(p)
    }
}

impl IntoResponse for ProblemResponse {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.0.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let mut resp = axum::Json(self.0).into_response();
        *resp.status_mut() = status;
        resp.headers_mut().insert(
            axum::http::header::CONTENT_TYPE,
            HeaderValue::from_static(APPLICATION_PROBLEM_JSON),
        );
        resp
    }
}

/// Helper to create a Problem with less boilerplate
pub fn from_parts(
    status: StatusCode,
    code: &str,
    title: &str,
    detail: impl Into<String>,
    instance: &str,
) -> Problem {
    let problem = Problem::new(status, title, detail)
        .with_type(format!("https://errors.interfy.dev/{}", code.to_lowercase()))
        .with_code(code)
        .with_instance(instance);

    if let Some(id) = tracing::Span::current().id() {
        problem.with_trace_id(id.into_u64().to_string())
    } else {
        problem
    }
}

pub fn bad_request(detail: impl Into<String>, instance: &str) -> ProblemResponse {
    from_parts(
        StatusCode::BAD_REQUEST,
        "INTERVIEWS_VALIDATION",
        "Validation error",
        detail,
        instance,
    )
    .into()
}

/// Map domain error to RFC9457 ProblemResponse
pub fn map_domain_error(e: &DomainError, instance: &str) -> ProblemResponse {
    let problem = match e {
        DomainError::Validation { field, message } => from_parts(
            StatusCode::BAD_REQUEST,
            "INTERVIEWS_VALIDATION",
            "Validation error",
            format!("{field}: {message}"),
            instance,
        )
        .with_field(field.clone()),
        DomainError::Unauthenticated => from_parts(
            StatusCode::UNAUTHORIZED,
            "INTERVIEWS_UNAUTHENTICATED",
            "Not signed in",
            "This operation requires an active session",
            instance,
        ),
        DomainError::Store(StoreError::PermissionDenied { message }) => from_parts(
            StatusCode::UNAUTHORIZED,
            "INTERVIEWS_FORBIDDEN",
            "Access denied",
            message.clone(),
            instance,
        ),
        DomainError::InterviewNotFound { id } => from_parts(
            StatusCode::NOT_FOUND,
            "INTERVIEWS_NOT_FOUND",
            "Interview not found",
            format!("Interview with id {id} was not found"),
            instance,
        ),
        DomainError::Store(_) | DomainError::Blob(_) | DomainError::MalformedRecord { .. } => {
            tracing::error!(error = ?e, "Backend error");
            from_parts(
                StatusCode::BAD_GATEWAY,
                "INTERVIEWS_BACKEND",
                "Backend error",
                e.to_string(),
                instance,
            )
        }
        DomainError::AccountDeletionIncomplete {
            completed, failed, ..
        } => {
            tracing::error!(error = %e, "Account deletion incomplete");
            let mut problem = from_parts(
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERVIEWS_ACCOUNT_DELETION_INCOMPLETE",
                "Account deletion incomplete",
                e.to_string(),
                instance,
            );
            problem.completed_steps = Some(completed.iter().map(|s| s.to_string()).collect());
            problem.failed_step = Some(failed.to_string());
            problem
        }
    };
    ProblemResponse(problem)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::model::{DeletionReport, DeletionStep, RecordId};

    #[test]
    fn problem_into_response_sets_status_and_content_type() {
        let p = Problem::new(StatusCode::BAD_REQUEST, "Bad Request", "invalid payload");
        let resp = ProblemResponse(p).into_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let ct = resp
            .headers()
            .get(axum::http::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("");
        assert_eq!(ct, APPLICATION_PROBLEM_JSON);
    }

    #[test]
    fn domain_errors_map_to_documented_statuses() {
        let cases = [
            (DomainError::validation("company_name", "blank"), 400),
            (DomainError::unauthenticated(), 401),
            (
                DomainError::Store(StoreError::permission_denied("not yours")),
                401,
            ),
            (DomainError::interview_not_found(RecordId::from("x")), 404),
            (DomainError::Store(StoreError::unavailable("down")), 502),
            (
                DomainError::deletion_incomplete(
                    vec![DeletionStep::Interviews],
                    DeletionStep::Images,
                    DeletionReport::default(),
                    DomainError::Store(StoreError::unavailable("down")),
                ),
                500,
            ),
        ];
        for (err, status) in cases {
            assert_eq!(map_domain_error(&err, "/api/x").0.status, status, "{err}");
        }
    }

    #[test]
    fn partial_deletion_names_steps() {
        let err = DomainError::deletion_incomplete(
            vec![DeletionStep::Interviews],
            DeletionStep::Images,
            DeletionReport {
                interviews_removed: 3,
                ..DeletionReport::default()
            },
            DomainError::Store(StoreError::unavailable("down")),
        );
        let problem = map_domain_error(&err, "/api/account").0;
        assert_eq!(problem.completed_steps, Some(vec!["interviews".to_string()]));
        assert_eq!(problem.failed_step.as_deref(), Some("images"));
    }
}
