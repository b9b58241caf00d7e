use crate::progress::format_bytes;
use crate::source::FileInfo;

/// Why a selected file was turned away.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Rejection {
    #[error("unsupported file type: {mime_type}")]
    UnsupportedType { mime_type: String },

    #[error("file too large ({size}); maximum is {limit}")]
    FileTooLarge { size: String, limit: String },
}

/// Gatekeeps a selected file before any bytes are read.
///
/// Rejects:
/// - MIME types outside `accepted` (exact match)
/// - Files larger than `max_size` bytes (a file of exactly `max_size` passes)
pub fn validate_selection<S: AsRef<str>>(
    info: &FileInfo,
    accepted: &[S],
    max_size: u64,
) -> Result<(), Rejection> {
    if !accepted.iter().any(|t| t.as_ref() == info.mime_type) {
        return Err(Rejection::UnsupportedType {
            mime_type: info.mime_type.clone(),
        });
    }

    if info.size > max_size {
        return Err(Rejection::FileTooLarge {
            size: format_bytes(info.size),
            limit: format_bytes(max_size),
        });
    }

    Ok(())
}
