use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::UploadMode;

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

/// Asks the backend for a presigned destination.
///
/// `sha256hex` is always serialized; `null` means Mode B.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NegotiateUploadRequest {
    pub filename: String,
    pub content_type: String,
    pub file_size: u64,
    #[serde(default)]
    pub sha256hex: Option<String>,
}

/// Asks the backend to verify the landed object and finalize the record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmUploadRequest {
    pub video_id: String,
    pub object_key: String,
}

// ---------------------------------------------------------------------------
// Responses
// ---------------------------------------------------------------------------

/// Presigned destination issued by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NegotiateUploadResponse {
    pub upload_url: String,
    pub object_key: String,
    pub video_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<UploadMode>,
}

/// Acknowledgement of a confirm call.
///
/// The backend returns the finalized record under `data`; the pipeline
/// only inspects `success`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfirmUploadResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub success: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl ConfirmUploadResponse {
    /// An absent `success` flag counts as acknowledged.
    pub fn is_acknowledged(&self) -> bool {
        self.success.unwrap_or(true)
    }
}
