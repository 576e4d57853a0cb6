use super::common::MediaType;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Where the generated media lives: an object-storage URI or the bytes themselves.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum MediaRef {
    Uri(String),
    Inline(Vec<u8>),
}

impl MediaRef {
    pub fn as_uri(&self) -> Option<&str> {
        match self {
            MediaRef::Uri(uri) => Some(uri),
            MediaRef::Inline(_) => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            MediaRef::Inline(bytes) => Some(bytes),
            MediaRef::Uri(_) => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryRecord {
    pub id: String,
    pub media_type: MediaType,
    pub model_id: String,
    pub prompt: Option<String>,
    pub media_ref: MediaRef,
    /// Provider metadata, kept opaque.
    pub details: serde_json::Value,
    pub reference_image_b64: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl HistoryRecord {
    pub fn new(media_type: MediaType, model_id: impl Into<String>, media_ref: MediaRef) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            media_type,
            model_id: model_id.into(),
            prompt: None,
            media_ref,
            details: serde_json::Value::Null,
            reference_image_b64: None,
            created_at: Utc::now(),
        }
    }

    pub fn with_prompt(mut self, prompt: Option<String>) -> Self {
        self.prompt = prompt;
        self
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = details;
        self
    }

    pub fn with_reference_image(mut self, image_b64: Option<String>) -> Self {
        self.reference_image_b64 = image_b64;
        self
    }

    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = created_at;
        self
    }
}
