//! Content-verified upload of large video files.
//!
//! [`Uploader`] validates a selected file, hashes it with SHA-256 inside a
//! time budget, negotiates a presigned destination with the backend, PUTs
//! the bytes (asserting the checksum when one was computed) and asks the
//! backend to confirm. When hashing is too slow or fails, the upload still
//! proceeds, just without the checksum header.
//!
//! ```no_run
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! use std::sync::Arc;
//! use vidingest_transfer::LocalFile;
//! use vidingest_upload::{Uploader, UploaderConfig};
//!
//! let config = UploaderConfig::with_base_url("https://api.example.com");
//! let mut uploader = Uploader::http(config, Some("token".into()));
//! let mut events = uploader.take_events().unwrap();
//! tokio::spawn(async move {
//!     while let Some(event) = events.recv().await {
//!         println!("{event:?}");
//!     }
//! });
//!
//! uploader.select(Arc::new(LocalFile::open("clip.mp4", None).await?))?;
//! let asset_id = uploader.start_upload().await?;
//! println!("uploaded as {asset_id}");
//! # Ok(())
//! # }
//! ```

pub mod backend;
pub mod config;
pub mod error;
pub mod transport;
pub mod types;
pub mod uploader;

pub use backend::{HttpBackend, UploadBackend};
pub use config::UploaderConfig;
pub use error::{ConfigError, SelectError, TransferFailure, UploadError};
pub use transport::{HttpTransport, ObjectTransport, ProgressFn, PutRequest};
pub use types::UploadEvent;
pub use uploader::Uploader;
