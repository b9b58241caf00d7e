//! Upload pipeline error types.

use vidingest_protocol::{ErrorTag, UploadStage};
use vidingest_transfer::{Rejection, TransferError};

/// Rejections raised synchronously by [`crate::Uploader::select`].
///
/// The session is left untouched; the caller may pick another file.
#[derive(Debug, thiserror::Error)]
pub enum SelectError {
    #[error("unsupported file type: {mime_type}")]
    UnsupportedType { mime_type: String },

    #[error("file too large ({size}); maximum is {limit}")]
    FileTooLarge { size: String, limit: String },

    #[error("an upload is already in progress")]
    Busy,
}

impl From<Rejection> for SelectError {
    fn from(rejection: Rejection) -> Self {
        match rejection {
            Rejection::UnsupportedType { mime_type } => Self::UnsupportedType { mime_type },
            Rejection::FileTooLarge { size, limit } => Self::FileTooLarge { size, limit },
        }
    }
}

/// Why the PUT to the object store did not succeed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransferFailure {
    #[error("upload network error: {0}")]
    Network(String),

    #[error("upload failed: HTTP {0}")]
    Status(u16),

    #[error("upload cancelled")]
    Cancelled,
}

/// Terminal failures of [`crate::Uploader::start_upload`].
#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("no file selected")]
    NoFile,

    #[error("an upload is already in progress")]
    Busy,

    #[error("session is {0:?}; select a file or reset first")]
    NotReady(UploadStage),

    #[error("negotiation failed: {0}")]
    Negotiation(String),

    #[error(transparent)]
    Transfer(#[from] TransferFailure),

    #[error("verification failed: {0}")]
    Verification(String),

    #[error("session error: {0}")]
    Session(#[from] TransferError),
}

impl UploadError {
    /// Category recorded on the failed session.
    pub fn tag(&self) -> ErrorTag {
        match self {
            Self::Negotiation(_) => ErrorTag::Negotiation,
            Self::Transfer(TransferFailure::Network(_)) => ErrorTag::TransferNetwork,
            Self::Transfer(TransferFailure::Status(_)) => ErrorTag::TransferStatus,
            Self::Transfer(TransferFailure::Cancelled) => ErrorTag::TransferCancelled,
            Self::Verification(_) => ErrorTag::Verification,
            Self::NoFile | Self::Busy | Self::NotReady(_) | Self::Session(_) => ErrorTag::Internal,
        }
    }

    /// Message meant for the end user (server text passed through as-is).
    pub fn detail(&self) -> String {
        match self {
            Self::Negotiation(msg) | Self::Verification(msg) => msg.clone(),
            other => other.to_string(),
        }
    }
}

/// Errors loading or validating [`crate::UploaderConfig`].
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}
