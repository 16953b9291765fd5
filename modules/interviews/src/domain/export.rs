use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, instrument, warn};

use crate::contract::model::{ExportData, RecordId};
use crate::domain::error::DomainError;
use crate::domain::mapper::{self, field};
use crate::domain::ports::{AuthSession, Direction, Query, RecordStore};

/// One-shot export of the signed-in user's data. Reads the store directly
/// rather than the synchronizer's snapshot.
#[derive(Clone)]
pub struct ExportService {
    store: Arc<dyn RecordStore>,
    session: Arc<dyn AuthSession>,
    interviews_collection: String,
    profiles_collection: String,
}

impl ExportService {
    pub fn new(
        store: Arc<dyn RecordStore>,
        session: Arc<dyn AuthSession>,
        interviews_collection: impl Into<String>,
        profiles_collection: impl Into<String>,
    ) -> Self {
        Self {
            store,
            session,
            interviews_collection: interviews_collection.into(),
            profiles_collection: profiles_collection.into(),
        }
    }

    #[instrument(name = "interviews.export.export_data", skip(self))]
    pub async fn export_data(&self) -> Result<ExportData, DomainError> {
        let user = self
            .session
            .current_user()
            .ok_or_else(DomainError::unauthenticated)?;

        let query = Query::new()
            .where_eq(field::USER_ID, user.id.as_str())
            .order_by(field::INTERVIEW_DATE, Direction::Descending);
        let docs = self
            .store
            .query(&self.interviews_collection, &query)
            .await?;
        let interviews = docs
            .iter()
            .filter_map(|doc| {
                mapper::interview_from_document(doc)
                    .inspect_err(|e| warn!(id = %doc.id, error = %e, "skipping malformed interview"))
                    .ok()
            })
            .collect::<Vec<_>>();

        let profile = match self
            .store
            .get(&self.profiles_collection, &RecordId::new(user.id.clone()))
            .await?
        {
            Some(doc) => Some(
                mapper::profile_from_document(&doc)
                    .map_err(|e| DomainError::malformed_record(doc.id.clone(), e.to_string()))?,
            ),
            None => None,
        };

        debug!(interviews = interviews.len(), "export assembled");
        Ok(ExportData {
            profile,
            interviews,
            exported_at: Utc::now(),
        })
    }
}
