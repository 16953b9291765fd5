use thiserror::Error;

use crate::contract::model::{DeletionReport, RecordId};

/// Errors that are safe to expose to other modules and callers.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InterviewsError {
    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Authentication error: {message}")]
    Auth { message: String },

    #[error("Interview not found: {id}")]
    NotFound { id: RecordId },

    #[error("Backend error: {message}")]
    Backend { message: String },

    #[error("Account deletion incomplete: completed [{}], failed at {failed}: {message}", completed.join(", "))]
    AccountDeletionIncomplete {
        completed: Vec<String>,
        failed: String,
        removed: DeletionReport,
        message: String,
    },
}

impl InterviewsError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub fn auth(message: impl Into<String>) -> Self {
        Self::Auth {
            message: message.into(),
        }
    }

    pub fn not_found(id: RecordId) -> Self {
        Self::NotFound { id }
    }

    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend {
            message: message.into(),
        }
    }
}

impl From<crate::domain::error::DomainError> for InterviewsError {
    fn from(domain_error: crate::domain::error::DomainError) -> Self {
        use crate::domain::error::DomainError::*;
        use crate::domain::ports::StoreError;
        match domain_error {
            Validation { field, message } => Self::validation(format!("{field}: {message}")),
            Unauthenticated => Self::auth("No active session"),
            InterviewNotFound { id } => Self::not_found(id),
            MalformedRecord { id, message } => Self::backend(format!("record {id}: {message}")),
            Store(StoreError::PermissionDenied { message }) => Self::auth(message),
            Store(e) => Self::backend(e.to_string()),
            Blob(e) => Self::backend(e.to_string()),
            AccountDeletionIncomplete {
                completed,
                failed,
                removed,
                source,
            } => Self::AccountDeletionIncomplete {
                completed: completed.iter().map(|s| s.as_str().to_string()).collect(),
                failed: failed.as_str().to_string(),
                removed,
                message: source.to_string(),
            },
        }
    }
}
