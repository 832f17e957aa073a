//! Temporary on-disk spool for incoming bytes.
//!
//! Every scan materializes its input as a uniquely named temporary file so
//! the digest pass and the engine can each read it through an independent
//! handle. The file is removed when the [`Spool`] is dropped, which covers
//! every exit path: success, scan failure, and future cancellation alike.

use crate::core::error::{Result, ScanError};
use crate::core::source::ByteSource;

use std::path::Path;
use tempfile::NamedTempFile;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt, BufWriter};

const COPY_BUF_SIZE: usize = 64 * 1024;

/// A spooled copy of one scan input, deleted on drop.
#[derive(Debug)]
pub(crate) struct Spool {
    file: NamedTempFile,
    len: u64,
}

impl Spool {
    /// Drains `source` into a fresh temporary file under `dir`.
    ///
    /// Enforces `max_size` while copying, so an over-long stream is cut off
    /// without ever occupying more than `max_size` bytes of spool space.
    /// A source with a knowable length, in-memory bytes, a hinted stream,
    /// or a file on disk, is rejected before any byte is written; the file
    /// length comes from a stat call. The mid-copy bound stays as the
    /// backstop for unhinted streams and files that grow after the stat.
    pub(crate) async fn from_source(
        source: ByteSource,
        dir: &Path,
        max_size: u64,
    ) -> Result<Self> {
        let known_size = match source.as_path() {
            Some(path) => Some(tokio::fs::metadata(path).await.map_err(ScanError::Io)?.len()),
            None => source.size_hint(),
        };
        if let Some(size) = known_size {
            if size > max_size {
                return Err(ScanError::FileTooLarge {
                    size,
                    max: max_size,
                });
            }
        }

        let file = NamedTempFile::new_in(dir).map_err(ScanError::Io)?;
        let out = tokio::fs::File::create(file.path())
            .await
            .map_err(ScanError::Io)?;
        let mut writer = BufWriter::new(out);

        let len = match source {
            ByteSource::Bytes { data, .. } => {
                writer.write_all(&data).await.map_err(ScanError::Io)?;
                data.len() as u64
            }
            ByteSource::Path(path) => {
                let mut reader = tokio::fs::File::open(&path).await.map_err(ScanError::Io)?;
                copy_bounded(&mut reader, &mut writer, max_size).await?
            }
            ByteSource::Stream { mut reader, .. } => {
                copy_bounded(&mut reader, &mut writer, max_size).await?
            }
        };

        writer.flush().await.map_err(ScanError::Io)?;
        Ok(Self { file, len })
    }

    /// Path of the spooled file, valid until drop.
    pub(crate) fn path(&self) -> &Path {
        self.file.path()
    }

    /// Number of bytes spooled.
    pub(crate) fn len(&self) -> u64 {
        self.len
    }
}

/// Copies `reader` to `writer`, failing once more than `max_size` bytes
/// have been seen. Returns the byte count on success.
async fn copy_bounded<R, W>(reader: &mut R, writer: &mut W, max_size: u64) -> Result<u64>
where
    R: AsyncRead + Unpin + ?Sized,
    W: AsyncWriteExt + Unpin,
{
    let mut buf = vec![0u8; COPY_BUF_SIZE];
    let mut total: u64 = 0;
    loop {
        let n = reader.read(&mut buf).await.map_err(ScanError::Io)?;
        if n == 0 {
            break;
        }
        total += n as u64;
        if total > max_size {
            return Err(ScanError::FileTooLarge {
                size: total,
                max: max_size,
            });
        }
        writer.write_all(&buf[..n]).await.map_err(ScanError::Io)?;
    }
    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn spools_bytes_and_deletes_on_drop() {
        let dir = tempfile::tempdir().unwrap();
        let source = ByteSource::from_bytes(b"hello spool".to_vec());
        let spool = Spool::from_source(source, dir.path(), 1024).await.unwrap();

        assert_eq!(spool.len(), 11);
        let content = tokio::fs::read(spool.path()).await.unwrap();
        assert_eq!(content, b"hello spool");

        let path = spool.path().to_path_buf();
        drop(spool);
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn rejects_oversized_bytes_before_writing() {
        let dir = tempfile::tempdir().unwrap();
        let source = ByteSource::from_bytes(vec![0u8; 100]);
        let result = Spool::from_source(source, dir.path(), 50).await;
        assert!(matches!(
            result,
            Err(ScanError::FileTooLarge { size: 100, max: 50 })
        ));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn cuts_off_unhinted_stream_past_the_limit() {
        let dir = tempfile::tempdir().unwrap();
        let reader = crate::core::BytesReader::new(vec![7u8; 200]);
        let source = ByteSource::from_stream(reader);
        let result = Spool::from_source(source, dir.path(), 150).await;
        assert!(matches!(result, Err(ScanError::FileTooLarge { .. })));
    }

    #[tokio::test]
    async fn zero_byte_input_spools_cleanly() {
        let dir = tempfile::tempdir().unwrap();
        let source = ByteSource::from_bytes(Vec::new());
        let spool = Spool::from_source(source, dir.path(), 1024).await.unwrap();
        assert_eq!(spool.len(), 0);
        assert!(spool.path().exists());
    }

    #[tokio::test]
    async fn rejects_oversized_file_before_any_spool_write() {
        let input_dir = tempfile::tempdir().unwrap();
        let input = input_dir.path().join("big.bin");
        tokio::fs::write(&input, vec![0u8; 4096]).await.unwrap();

        let spool_dir = tempfile::tempdir().unwrap();
        let result =
            Spool::from_source(ByteSource::from_path(&input), spool_dir.path(), 1024).await;

        assert!(matches!(
            result,
            Err(ScanError::FileTooLarge {
                size: 4096,
                max: 1024
            })
        ));
        // The rejection must come from the stat, not from a partial copy.
        assert_eq!(std::fs::read_dir(spool_dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn missing_path_source_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = Spool::from_source(
            ByteSource::from_path("/nonexistent/threatgate-input"),
            dir.path(),
            1024,
        )
        .await;
        assert!(matches!(result, Err(ScanError::Io(_))));
    }

    #[tokio::test]
    async fn spools_an_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("input.bin");
        tokio::fs::write(&input, b"from disk").await.unwrap();

        let spool = Spool::from_source(ByteSource::from_path(&input), dir.path(), 1024)
            .await
            .unwrap();
        assert_eq!(spool.len(), 9);
        let content = tokio::fs::read(spool.path()).await.unwrap();
        assert_eq!(content, b"from disk");
    }
}
