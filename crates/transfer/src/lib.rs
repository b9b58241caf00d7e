//! Byte-level building blocks of the upload pipeline.
//!
//! - [`UploadSource`] abstracts the local blob (disk file or memory buffer).
//! - [`ChunkReader`] slices a source into bounded chunks.
//! - [`Sha256Digester`] streams a source through SHA-256 under a wall-clock
//!   budget and degrades to "no digest" instead of failing.
//! - [`ThroughputSampler`] and [`TransferPercent`] turn raw byte counts
//!   into the observable progress figures.
//! - [`UploadSession`] is the per-attempt state record.

mod chunked;
mod digest;
mod progress;
mod source;
mod types;
mod validation;

pub use chunked::{ChunkReader, checksum_bytes, hex_digest_to_base64};
pub use digest::{DigestOutcome, Digester, Sha256Digester};
pub use progress::{ThroughputSampler, TransferPercent, format_bytes, percent_of};
pub use source::{FileInfo, LocalFile, MemoryFile, UploadSource, guess_mime_type};
pub use types::{Chunk, Destination, SessionError, SessionSnapshot, UploadSession};
pub use validation::{Rejection, validate_selection};

use vidingest_protocol::UploadStage;

/// Errors produced by the transfer crate.
#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid digest: {0}")]
    InvalidDigest(String),

    #[error("invalid stage transition: {from:?} -> {to:?}")]
    InvalidTransition { from: UploadStage, to: UploadStage },

    #[error("{0} already set for this session")]
    AlreadySet(&'static str),

    #[error("no file selected")]
    NoFile,
}
