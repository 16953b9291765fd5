use thiserror::Error;

use crate::contract::model::{DeletionReport, DeletionStep, RecordId};
use crate::domain::ports::{BlobError, StoreError};

/// Domain-specific errors using thiserror
#[derive(Error, Debug)]
pub enum DomainError {
    #[error("Validation failed: {field}: {message}")]
    Validation { field: String, message: String },

    #[error("No active session")]
    Unauthenticated,

    #[error("Interview not found: {id}")]
    InterviewNotFound { id: RecordId },

    #[error("Stored record {id} is malformed: {message}")]
    MalformedRecord { id: RecordId, message: String },

    #[error("Record store error: {0}")]
    Store(#[from] StoreError),

    #[error("Blob store error: {0}")]
    Blob(#[from] BlobError),

    #[error(
        "Account deletion failed at step '{failed}' after removing {} interviews and {} images: {source}",
        .removed.interviews_removed,
        .removed.images_removed
    )]
    AccountDeletionIncomplete {
        completed: Vec<DeletionStep>,
        failed: DeletionStep,
        removed: DeletionReport,
        #[source]
        source: Box<DomainError>,
    },
}

impl DomainError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn unauthenticated() -> Self {
        Self::Unauthenticated
    }

    pub fn interview_not_found(id: RecordId) -> Self {
        Self::InterviewNotFound { id }
    }

    pub fn malformed_record(id: RecordId, message: impl Into<String>) -> Self {
        Self::MalformedRecord {
            id,
            message: message.into(),
        }
    }

    pub fn deletion_incomplete(
        completed: Vec<DeletionStep>,
        failed: DeletionStep,
        removed: DeletionReport,
        source: DomainError,
    ) -> Self {
        Self::AccountDeletionIncomplete {
            completed,
            failed,
            removed,
            source: Box::new(source),
        }
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation { .. })
    }
}
