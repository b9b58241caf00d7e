//! Upload pipeline driver.
//!
//! One [`Uploader`] owns one [`UploadSession`] and runs its stages strictly
//! in sequence: hash, negotiate, transfer, verify. Progress and outcomes
//! are published on a bounded channel; the session snapshot is available
//! at any time.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Instant;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use vidingest_protocol::{
    ConfirmUploadRequest, NegotiateUploadRequest, UploadMode, UploadStage,
};
use vidingest_transfer::{
    Destination, Digester, FileInfo, SessionSnapshot, Sha256Digester, ThroughputSampler,
    TransferError, TransferPercent, UploadSession, UploadSource, hex_digest_to_base64,
    validate_selection,
};

use crate::backend::{HttpBackend, UploadBackend};
use crate::config::UploaderConfig;
use crate::error::{SelectError, TransferFailure, UploadError};
use crate::transport::{HttpTransport, ObjectTransport, ProgressFn, PutRequest};
use crate::types::UploadEvent;

const EVENT_BUFFER: usize = 256;

/// Drives a single upload session.
pub struct Uploader {
    config: UploaderConfig,
    backend: Arc<dyn UploadBackend>,
    transport: Arc<dyn ObjectTransport>,
    digester: Arc<dyn Digester>,
    session: Arc<UploadSession>,
    cancel: Mutex<CancellationToken>,
    running: AtomicBool,
    events_tx: mpsc::Sender<UploadEvent>,
    events_rx: Option<mpsc::Receiver<UploadEvent>>,
}

/// Clears the running flag when a pipeline run ends, however it ends.
struct RunGuard<'a>(&'a AtomicBool);

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Transfer-side progress state shared with the transport callback.
struct TransferTracker {
    total: u64,
    percent: TransferPercent,
    sampler: ThroughputSampler,
}

impl Uploader {
    /// Creates an uploader over the given collaborators, hashing with
    /// SHA-256 as configured.
    pub fn new(
        config: UploaderConfig,
        backend: Arc<dyn UploadBackend>,
        transport: Arc<dyn ObjectTransport>,
    ) -> Self {
        let digester = Arc::new(Sha256Digester::new(
            config.hash_chunk_size,
            config.hash_budget(),
        ));
        let (events_tx, events_rx) = mpsc::channel(EVENT_BUFFER);
        Self {
            config,
            backend,
            transport,
            digester,
            session: Arc::new(UploadSession::new(uuid::Uuid::new_v4().to_string())),
            cancel: Mutex::new(CancellationToken::new()),
            running: AtomicBool::new(false),
            events_tx,
            events_rx: Some(events_rx),
        }
    }

    /// Creates an uploader talking HTTP to the configured backend.
    ///
    /// `auth_token` is sent as a bearer token on backend calls only; the
    /// presigned PUT carries its own authorization.
    pub fn http(config: UploaderConfig, auth_token: Option<String>) -> Self {
        let client = reqwest::Client::new();
        let backend = Arc::new(HttpBackend::new(client.clone(), &config, auth_token));
        let transport = Arc::new(HttpTransport::new(client, config.upload_piece_size));
        Self::new(config, backend, transport)
    }

    /// Replaces the digester.
    pub fn with_digester(mut self, digester: Arc<dyn Digester>) -> Self {
        self.digester = digester;
        self
    }

    /// Takes the event receiver. Can only be called once.
    pub fn take_events(&mut self) -> Option<mpsc::Receiver<UploadEvent>> {
        self.events_rx.take()
    }

    pub fn config(&self) -> &UploaderConfig {
        &self.config
    }

    /// Read-only projection of the session.
    pub fn snapshot(&self) -> SessionSnapshot {
        self.session.snapshot()
    }

    pub fn stage(&self) -> UploadStage {
        self.session.stage()
    }

    /// Validates and attaches a file.
    ///
    /// Rejections leave the session exactly as it was. Only allowed while
    /// the session is Idle, Succeeded or Failed.
    pub fn select(&self, source: Arc<dyn UploadSource>) -> Result<(), SelectError> {
        if self.running.load(Ordering::Acquire) || !self.session.stage().is_terminal() {
            return Err(SelectError::Busy);
        }

        validate_selection(
            source.info(),
            self.config.accepted_types.as_slice(),
            self.config.max_file_size,
        )?;

        let info = source.info().clone();
        self.session.select(source).map_err(|_| SelectError::Busy)?;
        info!(
            session = %self.session.id(),
            file = %info.name,
            mime = %info.mime_type,
            size = info.size,
            "file selected"
        );
        Ok(())
    }

    /// Runs the pipeline for the selected file and returns the asset ID.
    ///
    /// Only one run at a time; a concurrent call fails with
    /// [`UploadError::Busy`] without touching the running session. Stage
    /// failures move the session to Failed and are returned as-is.
    pub async fn start_upload(&self) -> Result<String, UploadError> {
        if self.running.swap(true, Ordering::AcqRel) {
            return Err(UploadError::Busy);
        }
        let _guard = RunGuard(&self.running);

        let source = self.session.begin().map_err(|e| match e {
            TransferError::NoFile => UploadError::NoFile,
            TransferError::InvalidTransition { from, .. } => UploadError::NotReady(from),
            other => UploadError::Session(other),
        })?;
        info!(session = %self.session.id(), stage = ?UploadStage::Validating, "stage changed");
        self.emit(UploadEvent::StageChanged {
            stage: UploadStage::Validating,
        });

        let cancel = {
            let mut token = self.cancel.lock().unwrap();
            *token = CancellationToken::new();
            token.clone()
        };

        match self.run(source, cancel).await {
            Ok(asset_id) => Ok(asset_id),
            Err(err) => {
                let message = err.detail();
                error!(
                    session = %self.session.id(),
                    tag = ?err.tag(),
                    error = %message,
                    "upload failed"
                );
                self.session.fail(err.tag(), message.clone());
                self.emit(UploadEvent::StageChanged {
                    stage: UploadStage::Failed,
                });
                self.emit(UploadEvent::Failed {
                    tag: err.tag(),
                    message,
                });
                Err(err)
            }
        }
    }

    /// Aborts an in-flight transfer. No-op outside Transferring.
    ///
    /// Returns whether a cancellation was requested.
    pub fn cancel(&self) -> bool {
        if self.session.stage() != UploadStage::Transferring {
            debug!(stage = ?self.session.stage(), "cancel ignored");
            return false;
        }
        self.cancel.lock().unwrap().cancel();
        info!(session = %self.session.id(), "cancellation requested");
        true
    }

    /// Returns the session to Idle, dropping the file and all computed state.
    pub fn reset(&self) -> Result<(), UploadError> {
        if self.running.load(Ordering::Acquire) {
            return Err(UploadError::Busy);
        }
        self.session.reset();
        self.emit(UploadEvent::StageChanged {
            stage: UploadStage::Idle,
        });
        debug!(session = %self.session.id(), "session reset");
        Ok(())
    }

    async fn run(
        &self,
        source: Arc<dyn UploadSource>,
        cancel: CancellationToken,
    ) -> Result<String, UploadError> {
        let info = source.info().clone();

        self.advance(UploadStage::Hashing)?;
        let digest = self.hash(&source).await;
        let mode = UploadMode::for_digest(digest.as_deref());
        self.session.settle_digest(digest.clone())?;

        self.advance(UploadStage::Negotiating)?;
        let negotiated = self
            .backend
            .negotiate(&NegotiateUploadRequest {
                filename: info.name.clone(),
                content_type: info.mime_type.clone(),
                file_size: info.size,
                sha256hex: digest.clone(),
            })
            .await?;
        if let Some(server_mode) = negotiated.mode {
            if server_mode != mode {
                warn!(client = ?mode, server = ?server_mode, "backend reports a different upload mode");
            }
        }
        self.session.set_destination(Destination {
            upload_url: negotiated.upload_url.clone(),
            object_key: negotiated.object_key.clone(),
            asset_id: negotiated.video_id.clone(),
            expires_at: negotiated.expires_at,
        })?;

        self.advance(UploadStage::Transferring)?;
        self.transfer(&info, source, digest.as_deref(), negotiated.upload_url, cancel)
            .await?;

        self.advance(UploadStage::Verifying)?;
        self.backend
            .confirm(&ConfirmUploadRequest {
                video_id: negotiated.video_id.clone(),
                object_key: negotiated.object_key,
            })
            .await?;

        self.advance(UploadStage::Succeeded)?;
        info!(
            session = %self.session.id(),
            asset_id = %negotiated.video_id,
            mode = ?mode,
            elapsed = ?self.session.elapsed(),
            "upload verified"
        );
        self.emit(UploadEvent::Succeeded {
            asset_id: negotiated.video_id.clone(),
            mode,
        });
        Ok(negotiated.video_id)
    }

    /// Hashes the source, returning `None` whenever the digest is unusable.
    async fn hash(&self, source: &Arc<dyn UploadSource>) -> Option<String> {
        let session = Arc::clone(&self.session);
        let events = self.events_tx.clone();
        let on_progress = move |percent: u8| {
            session.set_hash_progress(percent);
            let _ = events.try_send(UploadEvent::HashProgress { percent });
        };

        let hex = self
            .digester
            .digest(Arc::clone(source), &on_progress)
            .await
            .into_hex()?;
        match hex_digest_to_base64(&hex) {
            Ok(_) => Some(hex.to_ascii_lowercase()),
            Err(e) => {
                warn!(error = %e, "discarding malformed digest, uploading without checksum");
                None
            }
        }
    }

    async fn transfer(
        &self,
        info: &FileInfo,
        source: Arc<dyn UploadSource>,
        digest: Option<&str>,
        upload_url: String,
        cancel: CancellationToken,
    ) -> Result<(), UploadError> {
        let request = PutRequest {
            url: upload_url,
            content_type: info.mime_type.clone(),
            content_length: info.size,
            checksum_base64: digest.map(hex_digest_to_base64).transpose()?,
        };

        let tracker = Arc::new(Mutex::new(TransferTracker {
            total: info.size,
            percent: TransferPercent::new(info.size),
            sampler: ThroughputSampler::new(Some(self.config.progress_interval()), Instant::now()),
        }));

        let on_progress: ProgressFn = {
            let tracker = Arc::clone(&tracker);
            let session = Arc::clone(&self.session);
            let events = self.events_tx.clone();
            Arc::new(move |bytes_sent: u64| {
                let mut t = tracker.lock().unwrap();
                if let Some(rate) = t.sampler.sample(bytes_sent, Instant::now()) {
                    let eta = t.sampler.eta(t.total.saturating_sub(bytes_sent));
                    session.set_throughput(rate, eta);
                    debug!(bytes_sent, rate = %t.sampler.label(), "transfer throughput");
                }
                if let Some(percent) = t.percent.observe(bytes_sent) {
                    session.set_transfer_progress(percent, bytes_sent);
                    let _ = events.try_send(UploadEvent::TransferProgress {
                        percent,
                        bytes_sent,
                        bytes_per_sec: t.sampler.bytes_per_second(),
                    });
                }
            })
        };

        let put = self.transport.put(request, source, on_progress);
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                return Err(TransferFailure::Cancelled.into());
            }
            result = put => result?,
        }

        let done = {
            let mut t = tracker.lock().unwrap();
            t.percent.finish().map(|p| (p, t.sampler.bytes_per_second()))
        };
        if let Some((percent, bytes_per_sec)) = done {
            self.session.set_transfer_progress(percent, info.size);
            self.emit(UploadEvent::TransferProgress {
                percent,
                bytes_sent: info.size,
                bytes_per_sec,
            });
        }
        Ok(())
    }

    fn advance(&self, stage: UploadStage) -> Result<(), UploadError> {
        self.session.advance(stage)?;
        info!(session = %self.session.id(), stage = ?stage, "stage changed");
        self.emit(UploadEvent::StageChanged { stage });
        Ok(())
    }

    fn emit(&self, event: UploadEvent) {
        if self.events_tx.try_send(event).is_err() {
            debug!("event dropped: receiver full or gone");
        }
    }
}
