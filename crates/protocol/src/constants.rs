use std::time::Duration;

/// MIME types accepted for upload (video containers only).
pub const ACCEPTED_VIDEO_TYPES: &[&str] = &["video/mp4", "video/webm", "video/quicktime"];

/// Upload size ceiling: 2 GiB. A file of exactly this size is accepted.
pub const MAX_FILE_SIZE: u64 = 2 * 1024 * 1024 * 1024;

/// Slice size fed to the digest accumulator (64 MiB).
///
/// This is also the peak extra memory held by the digester.
pub const HASH_CHUNK_SIZE: usize = 64 * 1024 * 1024;

/// Wall-clock budget for hashing, measured from the first chunk.
pub const HASH_BUDGET: Duration = Duration::from_secs(60);

/// Size of the body pieces streamed to the object store (1 MiB).
pub const UPLOAD_PIECE_SIZE: usize = 1024 * 1024;

/// Minimum spacing between throughput samples (at most 2 Hz).
pub const THROUGHPUT_SAMPLE_INTERVAL: Duration = Duration::from_millis(500);

/// Integrity header sent on the PUT in Mode A.
///
/// Value is the base64 encoding of the 32 raw digest bytes.
pub const CHECKSUM_HEADER: &str = "x-amz-checksum-sha256";

/// Backend route that issues a presigned destination.
pub const NEGOTIATE_PATH: &str = "/api/v2/admin/videos/upload-url";

/// Backend route that verifies and finalizes an uploaded object.
pub const CONFIRM_PATH: &str = "/api/v2/admin/videos/upload-complete";
