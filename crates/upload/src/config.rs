//! Uploader configuration.
//!
//! Reads JSON such as:
//!
//! ```json
//! { "apiBaseUrl": "https://api.example.com", "hashBudgetSecs": 30 }
//! ```
//!
//! Missing fields take their defaults. Credentials are not part of the
//! file; they are handed to [`crate::HttpBackend`] explicitly.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use vidingest_protocol::constants::{
    ACCEPTED_VIDEO_TYPES, CONFIRM_PATH, HASH_BUDGET, HASH_CHUNK_SIZE, MAX_FILE_SIZE,
    NEGOTIATE_PATH, THROUGHPUT_SAMPLE_INTERVAL, UPLOAD_PIECE_SIZE,
};

use crate::error::ConfigError;

/// Pipeline configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UploaderConfig {
    pub api_base_url: String,
    pub negotiate_path: String,
    pub confirm_path: String,
    pub hash_chunk_size: usize,
    pub hash_budget_secs: u64,
    pub max_file_size: u64,
    pub accepted_types: Vec<String>,
    pub upload_piece_size: usize,
    pub progress_interval_ms: u64,
}

impl Default for UploaderConfig {
    fn default() -> Self {
        Self {
            api_base_url: "http://127.0.0.1:3000".into(),
            negotiate_path: NEGOTIATE_PATH.into(),
            confirm_path: CONFIRM_PATH.into(),
            hash_chunk_size: HASH_CHUNK_SIZE,
            hash_budget_secs: HASH_BUDGET.as_secs(),
            max_file_size: MAX_FILE_SIZE,
            accepted_types: ACCEPTED_VIDEO_TYPES.iter().map(|t| t.to_string()).collect(),
            upload_piece_size: UPLOAD_PIECE_SIZE,
            progress_interval_ms: THROUGHPUT_SAMPLE_INTERVAL.as_millis() as u64,
        }
    }
}

impl UploaderConfig {
    /// Defaults pointed at `api_base_url`.
    pub fn with_base_url(api_base_url: impl Into<String>) -> Self {
        Self {
            api_base_url: api_base_url.into(),
            ..Default::default()
        }
    }

    /// Loads configuration from a JSON file.
    ///
    /// A missing file yields defaults; a malformed or invalid one is an error.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no uploader config, using defaults");
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        tracing::info!(path = %path.display(), base_url = %config.api_base_url, "uploader config loaded");
        Ok(config)
    }

    /// Rejects values the pipeline cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.api_base_url.starts_with("http://") && !self.api_base_url.starts_with("https://") {
            return Err(ConfigError::Invalid(format!(
                "apiBaseUrl must be an http(s) URL: {}",
                self.api_base_url
            )));
        }
        if self.hash_chunk_size == 0 {
            return Err(ConfigError::Invalid("hashChunkSize must be > 0".into()));
        }
        if self.upload_piece_size == 0 {
            return Err(ConfigError::Invalid("uploadPieceSize must be > 0".into()));
        }
        if self.accepted_types.is_empty() {
            return Err(ConfigError::Invalid("acceptedTypes must not be empty".into()));
        }
        Ok(())
    }

    pub fn hash_budget(&self) -> Duration {
        Duration::from_secs(self.hash_budget_secs)
    }

    pub fn progress_interval(&self) -> Duration {
        Duration::from_millis(self.progress_interval_ms)
    }

    pub fn negotiate_url(&self) -> String {
        join_url(&self.api_base_url, &self.negotiate_path)
    }

    pub fn confirm_url(&self) -> String {
        join_url(&self.api_base_url, &self.confirm_path)
    }
}

fn join_url(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}
