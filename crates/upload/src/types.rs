//! Events emitted while an upload runs.

use serde::Serialize;
use vidingest_protocol::{ErrorTag, UploadMode, UploadStage};

/// Progress and outcome notifications, in emission order.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum UploadEvent {
    /// The session entered a new stage.
    StageChanged { stage: UploadStage },
    /// Hashing progress (0-100).
    HashProgress { percent: u8 },
    /// Bytes accepted by the transport so far.
    TransferProgress {
        percent: u8,
        bytes_sent: u64,
        bytes_per_sec: f64,
    },
    /// The backend acknowledged the upload.
    Succeeded { asset_id: String, mode: UploadMode },
    /// The attempt ended with an error.
    Failed { tag: ErrorTag, message: String },
}

impl UploadEvent {
    /// Returns `true` for the last event of an attempt.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded { .. } | Self::Failed { .. })
    }
}
