//! Classifying and reading user-selected files

use crate::attachment::{ImageAttachment, image_mime_type};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::io::AsyncReadExt;

/// Text files above this size are cut and annotated
pub const MAX_LOG_BYTES: u64 = 5 * 1024 * 1024;

pub const TRUNCATION_NOTICE: &str =
    "\n\n[... Log truncated: the file exceeds 5 MB, only the first 5 MB are included in the analysis ...]";

pub const BINARY_LOG_NOTICE: &str = "Binary .bin logs cannot be analyzed directly. \
Convert the log to text first (Mission Planner: DataFlash Logs > \"Convert .bin to .log\", or MAVExplorer), \
then upload the resulting .log file or paste its contents here.";

/// User-facing message for any failure to read a text-like file
pub const READ_ERROR_MESSAGE: &str =
    "Could not read the selected file. Make sure it is a plain-text log or parameter file.";

#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("failed to read file: {0}")]
    Read(#[from] std::io::Error),

    #[error("file is not valid UTF-8 text: {0}")]
    Decode(std::str::Utf8Error),
}

/// A user-selected file: name and size are known up front, content is read on demand.
#[async_trait]
pub trait SourceFile: Send + Sync {
    fn name(&self) -> &str;

    fn len(&self) -> u64;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Displayable reference to the file, used for image previews
    fn preview_ref(&self) -> String;

    /// Read at most `limit` leading bytes
    async fn read_prefix(&self, limit: u64) -> std::io::Result<Vec<u8>>;

    async fn read_all(&self) -> std::io::Result<Vec<u8>> {
        self.read_prefix(u64::MAX).await
    }
}

impl std::fmt::Debug for dyn SourceFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceFile")
            .field("name", &self.name())
            .field("len", &self.len())
            .finish()
    }
}

pub struct LocalFile {
    path: PathBuf,
    name: String,
    len: u64,
}

impl LocalFile {
    pub async fn open(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let path = std::path::absolute(path.as_ref())?;
        let metadata = tokio::fs::metadata(&path).await?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok(Self {
            path,
            name,
            len: metadata.len(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl SourceFile for LocalFile {
    fn name(&self) -> &str {
        &self.name
    }

    fn len(&self) -> u64 {
        self.len
    }

    fn preview_ref(&self) -> String {
        format!("file://{}", self.path.display())
    }

    async fn read_prefix(&self, limit: u64) -> std::io::Result<Vec<u8>> {
        let file = tokio::fs::File::open(&self.path).await?;
        let mut bytes = Vec::with_capacity(self.len.min(limit) as usize);
        file.take(limit).read_to_end(&mut bytes).await?;
        Ok(bytes)
    }
}

/// In-memory file, e.g. bytes handed over by a drag-and-drop surface.
/// Counts how often its content was read.
pub struct MemoryFile {
    name: String,
    bytes: Vec<u8>,
    reads: AtomicUsize,
}

impl MemoryFile {
    pub fn new(name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            bytes: bytes.into(),
            reads: AtomicUsize::new(0),
        }
    }

    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SourceFile for MemoryFile {
    fn name(&self) -> &str {
        &self.name
    }

    fn len(&self) -> u64 {
        self.bytes.len() as u64
    }

    fn preview_ref(&self) -> String {
        format!("memory://{}", self.name)
    }

    async fn read_prefix(&self, limit: u64) -> std::io::Result<Vec<u8>> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        let end = self.bytes.len().min(usize::try_from(limit).unwrap_or(usize::MAX));
        Ok(self.bytes[..end].to_vec())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FileKind {
    Image { mime_type: &'static str },
    BinaryLog,
    Text,
}

/// Classify by filename suffix, case-insensitively
pub fn classify(name: &str) -> FileKind {
    if let Some(mime_type) = image_mime_type(name) {
        return FileKind::Image { mime_type };
    }
    if name.to_ascii_lowercase().ends_with(".bin") {
        return FileKind::BinaryLog;
    }
    FileKind::Text
}

#[derive(Clone, Debug)]
pub enum Ingested {
    Image(ImageAttachment),
    /// The file was not read; the notice replaces the log text
    BinaryLog,
    Text { text: String, truncated: bool },
}

pub async fn ingest(file: Arc<dyn SourceFile>) -> Result<Ingested, IngestError> {
    match classify(file.name()) {
        FileKind::Image { mime_type } => {
            tracing::debug!(name = file.name(), mime_type, "Staging image attachment");
            Ok(Ingested::Image(ImageAttachment::new(file, mime_type)))
        }
        FileKind::BinaryLog => {
            tracing::debug!(name = file.name(), "Refusing binary log");
            Ok(Ingested::BinaryLog)
        }
        FileKind::Text => {
            // Reported length may be stale or zero (pipes); only the bytes read count
            let mut bytes = file.read_prefix(MAX_LOG_BYTES + 1).await?;
            let truncated = bytes.len() as u64 > MAX_LOG_BYTES;
            if truncated {
                bytes.truncate(MAX_LOG_BYTES as usize);
            }
            let read = bytes.len();
            let mut text = decode_text(bytes, truncated)?;
            if truncated {
                text.push_str(TRUNCATION_NOTICE);
            }
            tracing::debug!(name = file.name(), bytes = read, truncated, "Read text log");
            Ok(Ingested::Text { text, truncated })
        }
    }
}

/// Decode as UTF-8. A cut at the size ceiling may split a character; that
/// incomplete tail is dropped. Any other invalid sequence is an error.
fn decode_text(bytes: Vec<u8>, truncated: bool) -> Result<String, IngestError> {
    match String::from_utf8(bytes) {
        Ok(text) => Ok(text),
        Err(e) => {
            let utf8_error = e.utf8_error();
            if truncated && utf8_error.error_len().is_none() {
                let mut bytes = e.into_bytes();
                bytes.truncate(utf8_error.valid_up_to());
                String::from_utf8(bytes).map_err(|e| IngestError::Decode(e.utf8_error()))
            } else {
                Err(IngestError::Decode(utf8_error))
            }
        }
    }
}
