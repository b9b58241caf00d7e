use serde::{Deserialize, Serialize};

/// Pipeline stage of an upload session.
///
/// Stages only move forward; the single way back is a reset to `Idle`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UploadStage {
    #[default]
    Idle,
    Validating,
    Hashing,
    Negotiating,
    Transferring,
    Verifying,
    Succeeded,
    Failed,
}

impl UploadStage {
    /// Returns `true` for stages in which a new file may be selected.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Idle | Self::Succeeded | Self::Failed)
    }

    /// Position along the forward path, used to reject regressions.
    ///
    /// `Failed` shares the rank of `Succeeded`: both end the session.
    pub fn rank(self) -> u8 {
        match self {
            Self::Idle => 0,
            Self::Validating => 1,
            Self::Hashing => 2,
            Self::Negotiating => 3,
            Self::Transferring => 4,
            Self::Verifying => 5,
            Self::Succeeded | Self::Failed => 6,
        }
    }
}

/// Whether the upload carries a client-computed digest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UploadMode {
    /// Digest computed; the PUT asserts it via the integrity header.
    #[serde(rename = "A")]
    Verified,
    /// No digest; the backend verifies out-of-band.
    #[serde(rename = "B")]
    Fallback,
}

impl UploadMode {
    /// Mode implied by an optional digest.
    pub fn for_digest(digest: Option<&str>) -> Self {
        if digest.is_some() {
            Self::Verified
        } else {
            Self::Fallback
        }
    }
}

/// Categorical error recorded on a failed session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorTag {
    Negotiation,
    TransferNetwork,
    TransferStatus,
    TransferCancelled,
    Verification,
    /// Session bookkeeping refused a transition; indicates misuse, not I/O.
    Internal,
}
