//! File handles for chunked uploads.
//!
//! The upload splitter only needs metadata plus a synchronous byte read,
//! so attachments are abstracted behind [`FileHandle`]. Two
//! implementations ship with the crate: in-memory buffers and filesystem
//! paths.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

use crate::error::LimpError;

/// A file-like attachment: name, size, content type, last-modified
/// timestamp and a synchronous byte-read capability.
pub trait FileHandle: Send + Sync {
    fn name(&self) -> &str;
    fn size(&self) -> u64;
    fn content_type(&self) -> &str;
    /// Seconds since the Unix epoch.
    fn last_modified(&self) -> u64;
    fn read_bytes(&self) -> Result<Vec<u8>, LimpError>;
}

/// An in-memory attachment.
#[derive(Debug, Clone)]
pub struct MemoryFile {
    name: String,
    content_type: String,
    last_modified: u64,
    content: Vec<u8>,
}

impl MemoryFile {
    pub fn new(
        name: impl Into<String>,
        content_type: impl Into<String>,
        content: Vec<u8>,
    ) -> Self {
        Self {
            name: name.into(),
            content_type: content_type.into(),
            last_modified: crate::signing::unix_now(),
            content,
        }
    }

    pub fn with_last_modified(mut self, last_modified: u64) -> Self {
        self.last_modified = last_modified;
        self
    }
}

impl FileHandle for MemoryFile {
    fn name(&self) -> &str {
        &self.name
    }

    fn size(&self) -> u64 {
        self.content.len() as u64
    }

    fn content_type(&self) -> &str {
        &self.content_type
    }

    fn last_modified(&self) -> u64 {
        self.last_modified
    }

    fn read_bytes(&self) -> Result<Vec<u8>, LimpError> {
        Ok(self.content.clone())
    }
}

/// A filesystem attachment. Metadata is captured at open time; content is
/// read when the upload happens.
#[derive(Debug, Clone)]
pub struct FsFile {
    path: PathBuf,
    name: String,
    content_type: String,
    size: u64,
    last_modified: u64,
}

impl FsFile {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, LimpError> {
        let path = path.as_ref().to_path_buf();
        let metadata = fs::metadata(&path)?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| {
                LimpError::Config(format!("path has no file name: {}", path.display()))
            })?;
        let content_type = content_type_for(&name);
        let last_modified = metadata
            .modified()
            .ok()
            .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
            .map(|d| d.as_secs())
            .unwrap_or(0);
        Ok(Self {
            path,
            name,
            content_type,
            size: metadata.len(),
            last_modified,
        })
    }
}

impl FileHandle for FsFile {
    fn name(&self) -> &str {
        &self.name
    }

    fn size(&self) -> u64 {
        self.size
    }

    fn content_type(&self) -> &str {
        &self.content_type
    }

    fn last_modified(&self) -> u64 {
        self.last_modified
    }

    fn read_bytes(&self) -> Result<Vec<u8>, LimpError> {
        Ok(fs::read(&self.path)?)
    }
}

/// Content type derived from the file extension.
fn content_type_for(name: &str) -> String {
    match name.rsplit('.').next().map(|e| e.to_ascii_lowercase()) {
        Some(ext) if matches!(ext.as_str(), "png" | "gif" | "bmp" | "webp") => {
            format!("image/{ext}")
        }
        Some(ext) if ext == "jpg" || ext == "jpeg" => "image/jpeg".to_string(),
        Some(ext) if ext == "svg" => "image/svg+xml".to_string(),
        Some(ext) if ext == "pdf" => "application/pdf".to_string(),
        Some(ext) if ext == "txt" => "text/plain".to_string(),
        Some(ext) if ext == "json" => "application/json".to_string(),
        _ => "application/octet-stream".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_memory_file() {
        let file = MemoryFile::new("cat.png", "image/png", vec![1, 2, 3]).with_last_modified(42);
        assert_eq!(file.name(), "cat.png");
        assert_eq!(file.size(), 3);
        assert_eq!(file.last_modified(), 42);
        assert_eq!(file.read_bytes().unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn test_fs_file_reads_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("photo.jpg");
        let mut f = fs::File::create(&path).unwrap();
        f.write_all(b"not really a jpeg").unwrap();
        drop(f);

        let file = FsFile::open(&path).unwrap();
        assert_eq!(file.name(), "photo.jpg");
        assert_eq!(file.content_type(), "image/jpeg");
        assert_eq!(file.size(), 17);
        assert_eq!(file.read_bytes().unwrap(), b"not really a jpeg");
    }

    #[test]
    fn test_content_type_fallback() {
        assert_eq!(content_type_for("archive.tar.gz"), "application/octet-stream");
        assert_eq!(content_type_for("noext"), "application/octet-stream");
        assert_eq!(content_type_for("logo.SVG"), "image/svg+xml");
    }
}
