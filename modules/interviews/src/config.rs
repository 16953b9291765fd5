use serde::{Deserialize, Serialize};

/// Configuration for the interviews module (`modules.interviews`)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct InterviewsConfig {
    #[serde(default = "default_interviews_collection")]
    pub interviews_collection: String,
    #[serde(default = "default_profiles_collection")]
    pub profiles_collection: String,
    #[serde(default = "default_max_text_length")]
    pub max_text_length: usize,
    /// Public prefix of blob URLs; the server serves them under `/files`.
    #[serde(default = "default_blob_base_url")]
    pub blob_base_url: String,
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
    /// Reject reads and writes of documents owned by another user.
    #[serde(default = "default_owner_rule")]
    pub owner_rule: bool,
}

impl Default for InterviewsConfig {
    fn default() -> Self {
        Self {
            interviews_collection: default_interviews_collection(),
            profiles_collection: default_profiles_collection(),
            max_text_length: default_max_text_length(),
            blob_base_url: default_blob_base_url(),
            max_upload_bytes: default_max_upload_bytes(),
            owner_rule: default_owner_rule(),
        }
    }
}

fn default_interviews_collection() -> String {
    "interviews".to_string()
}

fn default_profiles_collection() -> String {
    "profiles".to_string()
}

fn default_max_text_length() -> usize {
    200
}

fn default_blob_base_url() -> String {
    "http://127.0.0.1:8087/files".to_string()
}

fn default_max_upload_bytes() -> usize {
    5 * 1024 * 1024
}

fn default_owner_rule() -> bool {
    true
}
