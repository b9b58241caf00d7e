use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::Serialize;
use vidingest_protocol::{ErrorTag, UploadMode, UploadStage};

use crate::TransferError;
use crate::source::{FileInfo, UploadSource};

/// A slice of source data.
#[derive(Debug, Clone)]
pub struct Chunk {
    /// Byte offset within the source.
    pub offset: u64,
    /// Raw chunk data.
    pub data: Vec<u8>,
}

impl Chunk {
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Negotiated upload destination.
#[derive(Debug, Clone, PartialEq)]
pub struct Destination {
    /// Presigned, single-use PUT URL.
    pub upload_url: String,
    /// Opaque key of the object in the store.
    pub object_key: String,
    /// Backend-issued identifier of the logical video record.
    pub asset_id: String,
    pub expires_at: Option<DateTime<Utc>>,
}

/// Terminal error recorded on a failed session.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionError {
    pub tag: ErrorTag,
    pub message: String,
}

/// Read-only projection of a session for presentation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub session_id: String,
    pub stage: UploadStage,
    pub file_name: Option<String>,
    pub mime_type: Option<String>,
    pub size_bytes: Option<u64>,
    pub hash_progress_percent: u8,
    pub transfer_progress_percent: u8,
    pub transfer_throughput_bytes_per_sec: f64,
    /// Estimated seconds left in the transfer, when a throughput sample exists.
    pub eta_secs: Option<f64>,
    /// Known once hashing has finished.
    pub mode: Option<UploadMode>,
    pub digest_hex: Option<String>,
    pub remote_object_key: Option<String>,
    pub asset_id: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
    pub error: Option<SessionError>,
}

/// State of one user-initiated upload (thread-safe).
///
/// Enforces the record's invariants: stages only move forward, the digest
/// and the destination are written at most once, and transfer progress
/// never decreases. The only way back is [`reset`](Self::reset).
pub struct UploadSession {
    inner: RwLock<SessionInner>,
}

struct SessionInner {
    id: String,
    stage: UploadStage,
    source: Option<Arc<dyn UploadSource>>,
    hash_progress: u8,
    transfer_progress: u8,
    bytes_sent: u64,
    throughput: f64,
    eta: Option<Duration>,
    digest_hex: Option<String>,
    digest_settled: bool,
    destination: Option<Destination>,
    error: Option<SessionError>,
    started_at: Option<Instant>,
    updated_at: Instant,
    completed_at: Option<Instant>,
}

impl SessionInner {
    fn fresh(id: String) -> Self {
        Self {
            id,
            stage: UploadStage::Idle,
            source: None,
            hash_progress: 0,
            transfer_progress: 0,
            bytes_sent: 0,
            throughput: 0.0,
            eta: None,
            digest_hex: None,
            digest_settled: false,
            destination: None,
            error: None,
            started_at: None,
            updated_at: Instant::now(),
            completed_at: None,
        }
    }

    fn file_info(&self) -> Option<&FileInfo> {
        self.source.as_ref().map(|s| s.info())
    }
}

impl UploadSession {
    /// Creates an idle session with no file.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            inner: RwLock::new(SessionInner::fresh(id.into())),
        }
    }

    /// Attaches a validated file, discarding any state of a finished attempt.
    ///
    /// Only allowed from Idle, Succeeded or Failed.
    pub fn select(&self, source: Arc<dyn UploadSource>) -> Result<(), TransferError> {
        let mut s = self.inner.write().unwrap();
        if !s.stage.is_terminal() {
            return Err(TransferError::InvalidTransition {
                from: s.stage,
                to: UploadStage::Idle,
            });
        }
        let id = std::mem::take(&mut s.id);
        *s = SessionInner::fresh(id);
        s.source = Some(source);
        Ok(())
    }

    /// Discards everything, file included, and returns to Idle.
    pub fn reset(&self) {
        let mut s = self.inner.write().unwrap();
        let id = std::mem::take(&mut s.id);
        *s = SessionInner::fresh(id);
    }

    /// Claims the selected file for a run, moving Idle to Validating.
    ///
    /// The check and the transition happen under one lock, so a concurrent
    /// [`select`](Self::select) either lands before (and its file is the one
    /// returned) or is rejected.
    pub fn begin(&self) -> Result<Arc<dyn UploadSource>, TransferError> {
        let mut s = self.inner.write().unwrap();
        let Some(source) = s.source.clone() else {
            return Err(TransferError::NoFile);
        };
        if s.stage != UploadStage::Idle {
            return Err(TransferError::InvalidTransition {
                from: s.stage,
                to: UploadStage::Validating,
            });
        }
        let now = Instant::now();
        s.stage = UploadStage::Validating;
        s.started_at = Some(now);
        s.updated_at = now;
        Ok(source)
    }

    /// Moves to `to`. Rejects regressions and moves out of a finished session.
    pub fn advance(&self, to: UploadStage) -> Result<(), TransferError> {
        let mut s = self.inner.write().unwrap();
        let from = s.stage;
        let finished = matches!(from, UploadStage::Succeeded | UploadStage::Failed);
        if finished || to.rank() < from.rank() || to == UploadStage::Idle {
            return Err(TransferError::InvalidTransition { from, to });
        }
        if from == UploadStage::Idle {
            s.started_at = Some(Instant::now());
        }
        s.stage = to;
        let now = Instant::now();
        s.updated_at = now;
        if to == UploadStage::Succeeded {
            s.completed_at = Some(now);
        }
        Ok(())
    }

    /// Records hashing progress (0-100).
    pub fn set_hash_progress(&self, percent: u8) {
        let mut s = self.inner.write().unwrap();
        s.hash_progress = percent.min(100);
        s.updated_at = Instant::now();
    }

    /// Records the outcome of hashing. `None` is a valid result (Mode B).
    pub fn settle_digest(&self, digest_hex: Option<String>) -> Result<(), TransferError> {
        let mut s = self.inner.write().unwrap();
        if s.digest_settled {
            return Err(TransferError::AlreadySet("digest"));
        }
        s.digest_hex = digest_hex;
        s.digest_settled = true;
        s.updated_at = Instant::now();
        Ok(())
    }

    /// Records the negotiated destination.
    pub fn set_destination(&self, destination: Destination) -> Result<(), TransferError> {
        let mut s = self.inner.write().unwrap();
        if s.destination.is_some() {
            return Err(TransferError::AlreadySet("destination"));
        }
        s.destination = Some(destination);
        s.updated_at = Instant::now();
        Ok(())
    }

    /// Records transfer progress. Lower values than already seen are ignored.
    pub fn set_transfer_progress(&self, percent: u8, bytes_sent: u64) {
        let mut s = self.inner.write().unwrap();
        s.transfer_progress = s.transfer_progress.max(percent.min(100));
        s.bytes_sent = s.bytes_sent.max(bytes_sent);
        s.updated_at = Instant::now();
    }

    /// Records the latest throughput estimate and time remaining (advisory).
    pub fn set_throughput(&self, bytes_per_sec: f64, eta: Option<Duration>) {
        let mut s = self.inner.write().unwrap();
        s.throughput = bytes_per_sec;
        s.eta = eta;
    }

    /// Moves to Failed with a categorized error.
    pub fn fail(&self, tag: ErrorTag, message: impl Into<String>) {
        let mut s = self.inner.write().unwrap();
        s.stage = UploadStage::Failed;
        s.error = Some(SessionError {
            tag,
            message: message.into(),
        });
        let now = Instant::now();
        s.completed_at = Some(now);
        s.updated_at = now;
    }

    /// Returns the session ID.
    pub fn id(&self) -> String {
        let s = self.inner.read().unwrap();
        s.id.clone()
    }

    /// Returns the current stage.
    pub fn stage(&self) -> UploadStage {
        let s = self.inner.read().unwrap();
        s.stage
    }

    /// Returns the selected source, if any.
    pub fn source(&self) -> Option<Arc<dyn UploadSource>> {
        let s = self.inner.read().unwrap();
        s.source.clone()
    }

    /// Returns the computed digest (`None` before hashing or in Mode B).
    pub fn digest_hex(&self) -> Option<String> {
        let s = self.inner.read().unwrap();
        s.digest_hex.clone()
    }

    /// Returns the negotiated destination.
    pub fn destination(&self) -> Option<Destination> {
        let s = self.inner.read().unwrap();
        s.destination.clone()
    }

    /// Returns the recorded error, if the session failed.
    pub fn error(&self) -> Option<SessionError> {
        let s = self.inner.read().unwrap();
        s.error.clone()
    }

    /// Time since the attempt started, until it finished.
    pub fn elapsed(&self) -> Option<Duration> {
        let s = self.inner.read().unwrap();
        let started = s.started_at?;
        Some(s.completed_at.unwrap_or_else(Instant::now) - started)
    }

    /// Returns a read-only projection for presentation.
    pub fn snapshot(&self) -> SessionSnapshot {
        let s = self.inner.read().unwrap();
        let info = s.file_info();
        let eta_secs = match s.stage {
            UploadStage::Transferring => s.eta.map(|d| d.as_secs_f64()),
            _ => None,
        };

        SessionSnapshot {
            session_id: s.id.clone(),
            stage: s.stage,
            file_name: info.map(|i| i.name.clone()),
            mime_type: info.map(|i| i.mime_type.clone()),
            size_bytes: info.map(|i| i.size),
            hash_progress_percent: s.hash_progress,
            transfer_progress_percent: s.transfer_progress,
            transfer_throughput_bytes_per_sec: s.throughput,
            eta_secs,
            mode: s
                .digest_settled
                .then(|| UploadMode::for_digest(s.digest_hex.as_deref())),
            digest_hex: s.digest_hex.clone(),
            remote_object_key: s.destination.as_ref().map(|d| d.object_key.clone()),
            asset_id: s.destination.as_ref().map(|d| d.asset_id.clone()),
            expires_at: s.destination.as_ref().and_then(|d| d.expires_at),
            error: s.error.clone(),
        }
    }
}
