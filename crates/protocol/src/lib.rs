//! Wire types for the upload negotiation contract.
//!
//! Everything the pipeline sends to or receives from the metadata backend
//! lives here, together with the fixed limits both sides agree on. The
//! crate performs no I/O.

pub mod constants;
pub mod envelope;
pub mod messages;
pub mod types;

// Re-export primary types for convenience.
pub use envelope::{ApiError, ProtocolError, parse_api_payload};
pub use messages::{
    ConfirmUploadRequest, ConfirmUploadResponse, NegotiateUploadRequest,
    NegotiateUploadResponse,
};
pub use types::{ErrorTag, UploadMode, UploadStage};
