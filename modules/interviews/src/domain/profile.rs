use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, instrument, warn};

use crate::contract::model::{
    FieldUpdate, ImageSlot, ImageUpload, Profile, ProfilePatch, RecordId,
};
use crate::domain::error::DomainError;
use crate::domain::mapper::{self, field};
use crate::domain::ports::{AuthSession, BlobStore, Document, Fields, RecordStore, SessionUser, StoreError};
use crate::domain::validation::require_text;

/// Configuration for the profile service
#[derive(Debug, Clone)]
pub struct ProfileConfig {
    pub collection: String,
    pub max_text_length: usize,
    pub max_upload_bytes: usize,
}

impl Default for ProfileConfig {
    fn default() -> Self {
        Self {
            collection: "profiles".to_string(),
            max_text_length: 200,
            max_upload_bytes: 5 * 1024 * 1024,
        }
    }
}

/// Per-user profile: lazy creation, edits, terms acceptance and images.
#[derive(Clone)]
pub struct ProfileService {
    store: Arc<dyn RecordStore>,
    blobs: Arc<dyn BlobStore>,
    session: Arc<dyn AuthSession>,
    config: ProfileConfig,
}

impl ProfileService {
    pub fn new(
        store: Arc<dyn RecordStore>,
        blobs: Arc<dyn BlobStore>,
        session: Arc<dyn AuthSession>,
        config: ProfileConfig,
    ) -> Self {
        Self {
            store,
            blobs,
            session,
            config,
        }
    }

    fn require_user(&self) -> Result<SessionUser, DomainError> {
        self.session
            .current_user()
            .ok_or_else(DomainError::unauthenticated)
    }

    fn decode(doc: &Document) -> Result<Profile, DomainError> {
        mapper::profile_from_document(doc)
            .map_err(|e| DomainError::malformed_record(doc.id.clone(), e.to_string()))
    }

    /// Read the signed-in user's profile, creating it from the session
    /// bootstrap on first use. Never creates a second document.
    #[instrument(name = "interviews.profile.fetch_or_create", skip(self))]
    pub async fn fetch_or_create(&self) -> Result<Profile, DomainError> {
        let user = self.require_user()?;
        self.ensure_profile(&user).await
    }

    async fn ensure_profile(&self, user: &SessionUser) -> Result<Profile, DomainError> {
        let id = RecordId::new(user.id.clone());
        if let Some(doc) = self.store.get(&self.config.collection, &id).await? {
            debug!("profile found");
            return Self::decode(&doc);
        }

        let fields = mapper::new_profile_fields(
            &user.email,
            user.display_name.as_deref(),
            user.photo_url.as_deref(),
        );
        match self
            .store
            .create_with_id(&self.config.collection, &id, fields)
            .await
        {
            Ok(doc) => {
                info!(user_id = %user.id, "profile created");
                Self::decode(&doc)
            }
            Err(StoreError::AlreadyExists { .. }) => {
                // lost a creation race; the other writer's document wins
                debug!("profile created concurrently, re-reading");
                let doc = self
                    .store
                    .get(&self.config.collection, &id)
                    .await?
                    .ok_or_else(|| StoreError::NotFound {
                        collection: self.config.collection.clone(),
                        id: id.clone(),
                    })?;
                Self::decode(&doc)
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn write(&self, user: &SessionUser, fields: Fields) -> Result<Profile, DomainError> {
        self.ensure_profile(user).await?;
        let doc = self
            .store
            .update(&self.config.collection, &RecordId::new(user.id.clone()), fields)
            .await?;
        Self::decode(&doc)
    }

    fn validate_patch(&self, patch: &ProfilePatch) -> Result<(), DomainError> {
        if let Some(email) = &patch.email {
            require_text(field::EMAIL, email, self.config.max_text_length)?;
        }
        let nullable = [
            (field::FULL_NAME, &patch.full_name),
            (field::PROFESSIONAL_TITLE, &patch.professional_title),
            (field::EMPLOYMENT_STATUS, &patch.employment_status),
        ];
        for (name, update) in nullable {
            // empty strings are allowed: they mean "cleared"
            if let FieldUpdate::Set(v) = update {
                let len = v.chars().count();
                if len > self.config.max_text_length {
                    return Err(DomainError::validation(
                        name,
                        format!(
                            "too long: {len} characters (max: {})",
                            self.config.max_text_length
                        ),
                    ));
                }
            }
        }
        Ok(())
    }

    #[instrument(name = "interviews.profile.update", skip(self, patch))]
    pub async fn update(&self, patch: ProfilePatch) -> Result<Profile, DomainError> {
        self.validate_patch(&patch)?;
        let user = self.require_user()?;

        let fields = mapper::profile_patch_to_fields(&patch);
        if fields.is_empty() {
            return self.ensure_profile(&user).await;
        }
        let profile = self.write(&user, fields).await?;
        info!("profile updated");
        Ok(profile)
    }

    #[instrument(name = "interviews.profile.accept_terms", skip(self))]
    pub async fn accept_terms(&self) -> Result<Profile, DomainError> {
        let user = self.require_user()?;
        let profile = self
            .write(&user, mapper::terms_accepted_fields(Utc::now()))
            .await?;
        info!("terms accepted");
        Ok(profile)
    }

    pub fn needs_onboarding(profile: &Profile) -> bool {
        profile.needs_onboarding()
    }

    /// Store an image under `{folder}/{uid}-{millis}.{ext}` and point the
    /// profile at its URL.
    #[instrument(
        name = "interviews.profile.upload_image",
        skip(self, upload),
        fields(slot = ?slot, size = upload.bytes.len())
    )]
    pub async fn upload_image(
        &self,
        slot: ImageSlot,
        upload: ImageUpload,
    ) -> Result<Profile, DomainError> {
        let ext = image_extension(&upload.content_type).ok_or_else(|| {
            DomainError::validation(
                "content_type",
                format!("'{}' is not an image type", upload.content_type),
            )
        })?;
        if upload.bytes.is_empty() {
            return Err(DomainError::validation("image", "payload is empty"));
        }
        if upload.bytes.len() > self.config.max_upload_bytes {
            return Err(DomainError::validation(
                "image",
                format!(
                    "too large: {} bytes (max: {})",
                    upload.bytes.len(),
                    self.config.max_upload_bytes
                ),
            ));
        }
        let user = self.require_user()?;

        let path = image_path(slot, &user.id, Utc::now().timestamp_millis(), ext);
        let url = self
            .blobs
            .put(&path, upload.bytes, &upload.content_type)
            .await?;
        debug!(%path, "image stored");

        let mut fields = Fields::new();
        fields.insert(slot.field().to_string(), url.into());
        let profile = self.write(&user, fields).await.inspect_err(|e| {
            warn!(%path, error = %e, "image stored but profile update failed");
        })?;
        info!("profile image updated");
        Ok(profile)
    }
}

pub fn image_path(slot: ImageSlot, user_id: &str, millis: i64, ext: &str) -> String {
    format!("{}/{}-{}.{}", slot.folder(), user_id, millis, ext)
}

/// File extension for an `image/*` content type, `None` for anything else.
pub fn image_extension(content_type: &str) -> Option<&str> {
    let essence = content_type.split(';').next().unwrap_or_default().trim();
    let subtype = essence.strip_prefix("image/")?;
    match subtype {
        "" => None,
        "jpeg" | "pjpeg" => Some("jpg"),
        "svg+xml" => Some("svg"),
        "x-icon" | "vnd.microsoft.icon" => Some("ico"),
        other => Some(other),
    }
}
