//! Byte source abstraction for flexible upload handling.
//!
//! This module provides `ByteSource`, which lets the gateway accept file
//! content from multiple origins: paths, in-memory bytes, or async streams.
//! A source is single-pass and owned by the caller for one scan call; the
//! gateway copies it into a spool before anything else touches it.

use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::task::{Context, Poll};

use pin_project_lite::pin_project;
use tokio::io::{AsyncRead, ReadBuf};

/// A single-pass readable sequence of bytes with an optionally known length.
///
/// # Examples
///
/// ```rust
/// use threatgate::core::ByteSource;
///
/// // From a file path
/// let source = ByteSource::from_path("/uploads/invoice.pdf");
///
/// // From bytes already in memory
/// let source = ByteSource::from_bytes(b"%PDF-1.4".to_vec()).with_filename("invoice.pdf");
/// ```
pub enum ByteSource {
    /// A file path on disk.
    Path(PathBuf),

    /// In-memory bytes with an optional filename.
    Bytes {
        /// The file data.
        data: Vec<u8>,
        /// Optional original filename.
        filename: Option<String>,
    },

    /// An async stream of bytes, consumed exactly once.
    Stream {
        /// The reader providing the data.
        reader: Box<dyn AsyncRead + Send + Unpin>,
        /// Optional length hint; the spool enforces the real limit.
        size_hint: Option<u64>,
        /// Optional filename.
        filename: Option<String>,
    },
}

impl std::fmt::Debug for ByteSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Path(path) => f.debug_tuple("Path").field(path).finish(),
            Self::Bytes { data, filename } => f
                .debug_struct("Bytes")
                .field("data_len", &data.len())
                .field("filename", filename)
                .finish(),
            Self::Stream {
                size_hint,
                filename,
                ..
            } => f
                .debug_struct("Stream")
                .field("size_hint", size_hint)
                .field("filename", filename)
                .finish_non_exhaustive(),
        }
    }
}

impl ByteSource {
    /// Creates a `ByteSource` from a file path.
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        Self::Path(path.into())
    }

    /// Creates a `ByteSource` from bytes.
    pub fn from_bytes(data: impl Into<Vec<u8>>) -> Self {
        Self::Bytes {
            data: data.into(),
            filename: None,
        }
    }

    /// Creates a `ByteSource` from an async reader.
    pub fn from_stream(reader: impl AsyncRead + Send + Unpin + 'static) -> Self {
        Self::Stream {
            reader: Box::new(reader),
            size_hint: None,
            filename: None,
        }
    }

    /// Sets the filename for bytes or stream sources.
    pub fn with_filename(mut self, filename: impl Into<String>) -> Self {
        match &mut self {
            Self::Bytes { filename: f, .. } => *f = Some(filename.into()),
            Self::Stream { filename: f, .. } => *f = Some(filename.into()),
            Self::Path(_) => {} // Filename is derived from the path.
        }
        self
    }

    /// Sets the size hint for stream sources.
    pub fn with_size_hint(mut self, size: u64) -> Self {
        if let Self::Stream { size_hint, .. } = &mut self {
            *size_hint = Some(size);
        }
        self
    }

    /// Returns the filename, if known.
    pub fn filename(&self) -> Option<&str> {
        match self {
            Self::Path(path) => path.file_name().and_then(|n| n.to_str()),
            Self::Bytes { filename, .. } => filename.as_deref(),
            Self::Stream { filename, .. } => filename.as_deref(),
        }
    }

    /// Returns the length in bytes, if known without I/O.
    pub fn size_hint(&self) -> Option<u64> {
        match self {
            Self::Path(_) => None, // Would require a stat call.
            Self::Bytes { data, .. } => Some(data.len() as u64),
            Self::Stream { size_hint, .. } => *size_hint,
        }
    }

    /// Returns the path, if this is a path-based source.
    pub fn as_path(&self) -> Option<&Path> {
        match self {
            Self::Path(path) => Some(path),
            _ => None,
        }
    }
}

impl From<PathBuf> for ByteSource {
    fn from(path: PathBuf) -> Self {
        Self::Path(path)
    }
}

impl From<&Path> for ByteSource {
    fn from(path: &Path) -> Self {
        Self::Path(path.to_path_buf())
    }
}

impl From<Vec<u8>> for ByteSource {
    fn from(data: Vec<u8>) -> Self {
        Self::from_bytes(data)
    }
}

impl From<&[u8]> for ByteSource {
    fn from(data: &[u8]) -> Self {
        Self::from_bytes(data.to_vec())
    }
}

pin_project! {
    /// An owned in-memory buffer readable as an async stream.
    ///
    /// Useful for feeding `ByteSource::from_stream` in tests and adapters.
    pub struct BytesReader {
        data: Vec<u8>,
        position: usize,
    }
}

impl BytesReader {
    /// Creates a new `BytesReader` over the given bytes.
    pub fn new(data: Vec<u8>) -> Self {
        Self { data, position: 0 }
    }
}

impl AsyncRead for BytesReader {
    fn poll_read(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<std::io::Result<()>> {
        let this = self.project();
        let remaining = &this.data[*this.position..];
        let to_copy = std::cmp::min(buf.remaining(), remaining.len());
        buf.put_slice(&remaining[..to_copy]);
        *this.position += to_copy;
        Poll::Ready(Ok(()))
    }
}
