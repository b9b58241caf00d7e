use std::sync::Arc;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use futures_util::Stream;
use sha2::{Digest, Sha256};

use crate::TransferError;
use crate::source::UploadSource;
use crate::types::Chunk;

// ---------------------------------------------------------------------------
// Checksum helpers
// ---------------------------------------------------------------------------

/// Computes SHA-256 of `data` and returns the lowercase hex digest.
///
/// Non-streaming reference; the pipeline uses [`crate::Sha256Digester`].
pub fn checksum_bytes(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// Converts a hex SHA-256 digest into the base64 of its 32 raw bytes.
///
/// This is the value object stores expect in the integrity header; the hex
/// string itself is never sent there.
pub fn hex_digest_to_base64(hex_digest: &str) -> Result<String, TransferError> {
    let raw = hex::decode(hex_digest)
        .map_err(|e| TransferError::InvalidDigest(format!("{hex_digest}: {e}")))?;
    if raw.len() != 32 {
        return Err(TransferError::InvalidDigest(format!(
            "expected 32 bytes, got {}",
            raw.len()
        )));
    }
    Ok(BASE64.encode(raw))
}

// ---------------------------------------------------------------------------
// ChunkReader
// ---------------------------------------------------------------------------

/// Reads a source in fixed-size chunks, holding one chunk at a time.
pub struct ChunkReader {
    source: Arc<dyn UploadSource>,
    chunk_size: usize,
    offset: u64,
    size: u64,
}

impl ChunkReader {
    /// Creates a reader over `source`.
    ///
    /// If `chunk_size` is 0, [`vidingest_protocol::constants::HASH_CHUNK_SIZE`]
    /// is used.
    pub fn new(source: Arc<dyn UploadSource>, chunk_size: usize) -> Self {
        let chunk_size = if chunk_size == 0 {
            vidingest_protocol::constants::HASH_CHUNK_SIZE
        } else {
            chunk_size
        };
        let size = source.info().size;
        Self {
            source,
            chunk_size,
            offset: 0,
            size,
        }
    }

    /// Reads the next chunk. Returns `None` at EOF.
    ///
    /// A source that ends before its advertised size is an error: the blob
    /// changed underneath us.
    pub async fn next_chunk(&mut self) -> Result<Option<Chunk>, TransferError> {
        let remaining = self.remaining();
        if remaining == 0 {
            return Ok(None);
        }

        let read_size = std::cmp::min(remaining, self.chunk_size as u64) as usize;
        let data = self.source.read_at(self.offset, read_size).await?;
        if data.is_empty() {
            return Err(TransferError::Io(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                format!(
                    "source ended at {} of {} bytes",
                    self.offset, self.size
                ),
            )));
        }

        let chunk = Chunk {
            offset: self.offset,
            data,
        };
        self.offset += chunk.len() as u64;
        Ok(Some(chunk))
    }

    /// Turns the reader into a stream of chunk payloads (for request bodies).
    pub fn into_stream(self) -> impl Stream<Item = Result<Vec<u8>, TransferError>> + Send + 'static {
        futures_util::stream::try_unfold(self, |mut reader| async move {
            Ok(reader
                .next_chunk()
                .await?
                .map(|chunk| (chunk.data, reader)))
        })
    }

    /// Current byte offset.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Total source size in bytes.
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Bytes remaining to read.
    pub fn remaining(&self) -> u64 {
        self.size.saturating_sub(self.offset)
    }
}
