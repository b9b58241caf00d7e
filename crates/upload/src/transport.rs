//! Object-store PUT.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use futures_util::TryStreamExt;
use reqwest::header::{CONTENT_LENGTH, CONTENT_TYPE};
use tracing::debug;
use vidingest_protocol::constants::{CHECKSUM_HEADER, UPLOAD_PIECE_SIZE};
use vidingest_transfer::{ChunkReader, UploadSource};

use crate::error::TransferFailure;

/// Receives the cumulative number of body bytes handed to the connection.
pub type ProgressFn = Arc<dyn Fn(u64) + Send + Sync>;

/// One PUT of a whole object.
#[derive(Debug, Clone, PartialEq)]
pub struct PutRequest {
    pub url: String,
    pub content_type: String,
    pub content_length: u64,
    /// Base64 of the raw SHA-256 bytes. `None` omits the integrity header.
    pub checksum_base64: Option<String>,
}

/// Moves bytes to a presigned destination.
///
/// Dropping the returned future aborts the request.
pub trait ObjectTransport: Send + Sync {
    fn put(
        &self,
        request: PutRequest,
        source: Arc<dyn UploadSource>,
        on_progress: ProgressFn,
    ) -> Pin<Box<dyn Future<Output = Result<(), TransferFailure>> + Send + '_>>;
}

/// [`ObjectTransport`] streaming the source over a reqwest PUT.
pub struct HttpTransport {
    client: reqwest::Client,
    piece_size: usize,
}

impl HttpTransport {
    /// `piece_size` bounds each body piece read from the source; 0 selects 1 MiB.
    pub fn new(client: reqwest::Client, piece_size: usize) -> Self {
        Self {
            client,
            piece_size: if piece_size == 0 {
                UPLOAD_PIECE_SIZE
            } else {
                piece_size
            },
        }
    }

    async fn do_put(
        &self,
        request: PutRequest,
        source: Arc<dyn UploadSource>,
        on_progress: ProgressFn,
    ) -> Result<(), TransferFailure> {
        let sent = Arc::new(AtomicU64::new(0));
        let counter = Arc::clone(&sent);
        let body = ChunkReader::new(source, self.piece_size)
            .into_stream()
            .inspect_ok(move |piece| {
                let total = counter.fetch_add(piece.len() as u64, Ordering::Relaxed)
                    + piece.len() as u64;
                on_progress(total);
            });

        let mut builder = self
            .client
            .put(&request.url)
            .header(CONTENT_TYPE, &request.content_type)
            .header(CONTENT_LENGTH, request.content_length)
            .body(reqwest::Body::wrap_stream(body));
        if let Some(checksum) = &request.checksum_base64 {
            builder = builder.header(CHECKSUM_HEADER, checksum);
        }

        debug!(
            size = request.content_length,
            checksum = request.checksum_base64.is_some(),
            "PUT started"
        );
        let response = builder
            .send()
            .await
            .map_err(|e| TransferFailure::Network(e.to_string()))?;

        let status = response.status();
        debug!(
            status = status.as_u16(),
            sent = sent.load(Ordering::Relaxed),
            "PUT finished"
        );
        if !status.is_success() {
            return Err(TransferFailure::Status(status.as_u16()));
        }
        Ok(())
    }
}

impl ObjectTransport for HttpTransport {
    fn put(
        &self,
        request: PutRequest,
        source: Arc<dyn UploadSource>,
        on_progress: ProgressFn,
    ) -> Pin<Box<dyn Future<Output = Result<(), TransferFailure>> + Send + '_>> {
        Box::pin(self.do_put(request, source, on_progress))
    }
}
