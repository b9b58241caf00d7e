//! Budgeted streaming SHA-256.
//!
//! Hashing is advisory: whatever goes wrong (slow disk, revoked blob, a
//! panicking accumulator, an exhausted budget) the digester reports an
//! outcome instead of an error, and the pipeline falls back to uploading
//! without a client-asserted checksum.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use sha2::{Digest, Sha256};
use tokio::time::Instant;
use tracing::{debug, warn};
use vidingest_protocol::constants::{HASH_BUDGET, HASH_CHUNK_SIZE};

use crate::chunked::ChunkReader;
use crate::progress::percent_of;
use crate::source::UploadSource;

/// How a hashing attempt ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DigestOutcome {
    /// Full digest, lowercase hex.
    Complete(String),
    /// The wall-clock budget ran out after `hashed` bytes.
    TimedOut { hashed: u64 },
    /// Reading or hashing failed.
    Failed(String),
}

impl DigestOutcome {
    /// The digest if hashing completed, `None` otherwise.
    pub fn into_hex(self) -> Option<String> {
        match self {
            Self::Complete(hex) => Some(hex),
            Self::TimedOut { .. } | Self::Failed(_) => None,
        }
    }
}

/// Produces a content fingerprint for a source.
///
/// `on_progress` receives the hashed percentage after every chunk.
pub trait Digester: Send + Sync {
    fn digest<'a>(
        &'a self,
        source: Arc<dyn UploadSource>,
        on_progress: &'a (dyn Fn(u8) + Send + Sync),
    ) -> Pin<Box<dyn Future<Output = DigestOutcome> + Send + 'a>>;
}

/// SHA-256 over fixed-size chunks with a wall-clock budget.
///
/// Peak extra memory is one chunk regardless of source size. Each chunk is
/// hashed on the blocking pool, so the async executor gets control back
/// between chunks.
#[derive(Debug, Clone)]
pub struct Sha256Digester {
    chunk_size: usize,
    budget: Duration,
}

impl Default for Sha256Digester {
    fn default() -> Self {
        Self::new(HASH_CHUNK_SIZE, HASH_BUDGET)
    }
}

impl Sha256Digester {
    /// Creates a digester. A zero `chunk_size` selects the default; a zero
    /// `budget` disables hashing.
    pub fn new(chunk_size: usize, budget: Duration) -> Self {
        Self {
            chunk_size: if chunk_size == 0 {
                HASH_CHUNK_SIZE
            } else {
                chunk_size
            },
            budget,
        }
    }

    async fn run(
        &self,
        source: Arc<dyn UploadSource>,
        on_progress: &(dyn Fn(u8) + Send + Sync),
    ) -> DigestOutcome {
        let started = Instant::now();
        let mut reader = ChunkReader::new(source, self.chunk_size);
        let total = reader.size();
        let mut hasher = Sha256::new();

        loop {
            if started.elapsed() >= self.budget {
                return DigestOutcome::TimedOut {
                    hashed: reader.offset(),
                };
            }

            let chunk = match reader.next_chunk().await {
                Ok(Some(chunk)) => chunk,
                Ok(None) => break,
                Err(e) => return DigestOutcome::Failed(e.to_string()),
            };

            // The chunk buffer is dropped inside the blocking task.
            let hashed = tokio::task::spawn_blocking(move || {
                hasher.update(&chunk.data);
                hasher
            })
            .await;
            hasher = match hashed {
                Ok(h) => h,
                Err(e) => return DigestOutcome::Failed(format!("hash task failed: {e}")),
            };

            let offset = reader.offset();
            on_progress(percent_of(offset, total));
            debug!(offset, total, "hashed chunk");
        }

        on_progress(100);
        DigestOutcome::Complete(hex::encode(hasher.finalize()))
    }
}

impl Digester for Sha256Digester {
    fn digest<'a>(
        &'a self,
        source: Arc<dyn UploadSource>,
        on_progress: &'a (dyn Fn(u8) + Send + Sync),
    ) -> Pin<Box<dyn Future<Output = DigestOutcome> + Send + 'a>> {
        Box::pin(async move {
            let outcome = self.run(source, on_progress).await;
            match &outcome {
                DigestOutcome::Complete(_) => {}
                DigestOutcome::TimedOut { hashed } => {
                    warn!(hashed, budget = ?self.budget, "hash budget exceeded, uploading without checksum");
                }
                DigestOutcome::Failed(reason) => {
                    warn!(%reason, "hashing failed, uploading without checksum");
                }
            }
            outcome
        })
    }
}
