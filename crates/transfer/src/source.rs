use std::future::Future;
use std::io::SeekFrom;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::Arc;

use tokio::io::{AsyncReadExt, AsyncSeekExt};

/// Immutable attributes of a selected file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileInfo {
    pub name: String,
    pub mime_type: String,
    pub size: u64,
}

/// A local blob that can be read in arbitrary slices.
///
/// Implementations must not hold more than the requested slice in memory;
/// the digester and the PUT body both rely on that to stay bounded.
pub trait UploadSource: Send + Sync {
    /// Name, MIME type and size. Never changes for the lifetime of the source.
    fn info(&self) -> &FileInfo;

    /// Reads up to `len` bytes starting at `offset`.
    ///
    /// Returns fewer bytes only at end of file.
    fn read_at(
        &self,
        offset: u64,
        len: usize,
    ) -> Pin<Box<dyn Future<Output = std::io::Result<Vec<u8>>> + Send + '_>>;
}

/// Guesses a MIME type from a file extension.
pub fn guess_mime_type(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase());

    match ext.as_deref() {
        Some("mp4" | "m4v") => "video/mp4",
        Some("webm") => "video/webm",
        Some("mov" | "qt") => "video/quicktime",
        Some("mkv") => "video/x-matroska",
        Some("avi") => "video/x-msvideo",
        _ => "application/octet-stream",
    }
}

// ---------------------------------------------------------------------------
// LocalFile
// ---------------------------------------------------------------------------

/// A file on disk. Each read opens its own handle, so the source is
/// freely shareable between the digester and the transport.
#[derive(Debug, Clone)]
pub struct LocalFile {
    path: PathBuf,
    info: FileInfo,
}

impl LocalFile {
    /// Stats `path` and captures its attributes.
    ///
    /// If `mime_type` is `None` it is guessed from the extension.
    pub async fn open(path: impl AsRef<Path>, mime_type: Option<&str>) -> std::io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let metadata = tokio::fs::metadata(&path).await?;
        if !metadata.is_file() {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("not a regular file: {}", path.display()),
            ));
        }

        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let mime_type = mime_type
            .map(str::to_string)
            .unwrap_or_else(|| guess_mime_type(&path).to_string());

        Ok(Self {
            info: FileInfo {
                name,
                mime_type,
                size: metadata.len(),
            },
            path,
        })
    }

    /// Path on disk.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl UploadSource for LocalFile {
    fn info(&self) -> &FileInfo {
        &self.info
    }

    fn read_at(
        &self,
        offset: u64,
        len: usize,
    ) -> Pin<Box<dyn Future<Output = std::io::Result<Vec<u8>>> + Send + '_>> {
        Box::pin(async move {
            let mut file = tokio::fs::File::open(&self.path).await?;
            file.seek(SeekFrom::Start(offset)).await?;

            let mut buf = Vec::with_capacity(len);
            file.take(len as u64).read_to_end(&mut buf).await?;
            Ok(buf)
        })
    }
}

// ---------------------------------------------------------------------------
// MemoryFile
// ---------------------------------------------------------------------------

/// An in-memory blob (already-buffered input, tests).
#[derive(Debug, Clone)]
pub struct MemoryFile {
    info: FileInfo,
    data: Arc<[u8]>,
}

impl MemoryFile {
    pub fn new(name: impl Into<String>, mime_type: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            info: FileInfo {
                name: name.into(),
                mime_type: mime_type.into(),
                size: data.len() as u64,
            },
            data: data.into(),
        }
    }
}

impl UploadSource for MemoryFile {
    fn info(&self) -> &FileInfo {
        &self.info
    }

    fn read_at(
        &self,
        offset: u64,
        len: usize,
    ) -> Pin<Box<dyn Future<Output = std::io::Result<Vec<u8>>> + Send + '_>> {
        let start = (offset as usize).min(self.data.len());
        let end = start.saturating_add(len).min(self.data.len());
        let slice = self.data[start..end].to_vec();
        Box::pin(async move { Ok(slice) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn guesses_video_types() {
        assert_eq!(guess_mime_type(Path::new("a.MP4")), "video/mp4");
        assert_eq!(guess_mime_type(Path::new("a.webm")), "video/webm");
        assert_eq!(guess_mime_type(Path::new("a.mov")), "video/quicktime");
        assert_eq!(guess_mime_type(Path::new("a.txt")), "application/octet-stream");
        assert_eq!(guess_mime_type(Path::new("noext")), "application/octet-stream");
    }

    #[tokio::test]
    async fn local_file_reads_slices() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clip.mp4");
        std::fs::File::create(&path)
            .unwrap()
            .write_all(b"0123456789")
            .unwrap();

        let file = LocalFile::open(&path, None).await.unwrap();
        assert_eq!(file.info().name, "clip.mp4");
        assert_eq!(file.info().mime_type, "video/mp4");
        assert_eq!(file.info().size, 10);

        assert_eq!(file.read_at(0, 4).await.unwrap(), b"0123");
        assert_eq!(file.read_at(6, 100).await.unwrap(), b"6789");
        assert!(file.read_at(10, 4).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn local_file_explicit_mime_wins() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clip.bin");
        std::fs::write(&path, b"x").unwrap();

        let file = LocalFile::open(&path, Some("video/webm")).await.unwrap();
        assert_eq!(file.info().mime_type, "video/webm");
    }

    #[tokio::test]
    async fn local_file_rejects_directory() {
        let dir = tempfile::tempdir().unwrap();
        assert!(LocalFile::open(dir.path(), None).await.is_err());
    }

    #[tokio::test]
    async fn memory_file_clamps_reads() {
        let file = MemoryFile::new("m.mp4", "video/mp4", b"abcdef".to_vec());
        assert_eq!(file.info().size, 6);
        assert_eq!(file.read_at(2, 2).await.unwrap(), b"cd");
        assert_eq!(file.read_at(4, 10).await.unwrap(), b"ef");
        assert!(file.read_at(99, 1).await.unwrap().is_empty());
    }
}
