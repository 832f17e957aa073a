//! Single-pass content digesting.
//!
//! `DigestComputer` streams a byte source through MD5, SHA-1, and SHA-256
//! accumulators in one pass: each chunk is fed to all three before the next
//! read, so a short read or truncation is reflected identically in every
//! digest. The digest set matches what the provenance store records.

use crate::core::error::{Result, ScanError};
use crate::core::types::Digests;

use md5::Md5;
use sha1::Sha1;
use sha2::{Digest, Sha256};
use std::path::Path;
use tokio::io::{AsyncRead, AsyncReadExt};

const READ_BUF_SIZE: usize = 64 * 1024;

/// Computes the fixed digest set over a byte stream.
#[derive(Debug, Clone, Default)]
pub struct DigestComputer {
    _private: (),
}

impl DigestComputer {
    /// Creates a new `DigestComputer`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Digests all bytes from an async reader.
    ///
    /// Reads the source exactly once. Fails with `ScanError::Io` if the
    /// source cannot be fully read; no partial digests are ever returned.
    pub async fn digest_reader<R>(&self, reader: &mut R) -> Result<Digests>
    where
        R: AsyncRead + Unpin + ?Sized,
    {
        let mut md5 = Md5::new();
        let mut sha1 = Sha1::new();
        let mut sha256 = Sha256::new();

        let mut buf = vec![0u8; READ_BUF_SIZE];
        loop {
            let n = reader.read(&mut buf).await.map_err(ScanError::Io)?;
            if n == 0 {
                break;
            }
            let chunk = &buf[..n];
            md5.update(chunk);
            sha1.update(chunk);
            sha256.update(chunk);
        }

        Ok(Digests {
            md5: format!("{:x}", md5.finalize()),
            sha1: format!("{:x}", sha1.finalize()),
            sha256: format!("{:x}", sha256.finalize()),
        })
    }

    /// Digests a file on disk through its own read handle.
    pub async fn digest_file(&self, path: &Path) -> Result<Digests> {
        let mut file = tokio::fs::File::open(path).await.map_err(ScanError::Io)?;
        self.digest_reader(&mut file).await
    }

    /// Digests an in-memory buffer.
    pub fn digest_bytes(&self, data: &[u8]) -> Digests {
        Digests {
            md5: format!("{:x}", Md5::digest(data)),
            sha1: format!("{:x}", Sha1::digest(data)),
            sha256: format!("{:x}", Sha256::digest(data)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_input_reference_digests() {
        let digests = DigestComputer::new().digest_bytes(b"");
        assert_eq!(digests.md5, "d41d8cd98f00b204e9800998ecf8427e");
        assert_eq!(digests.sha1, "da39a3ee5e6b4b0d3255bfef95601890afd80709");
        assert_eq!(
            digests.sha256,
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn abc_reference_digests() {
        let digests = DigestComputer::new().digest_bytes(b"abc");
        assert_eq!(digests.md5, "900150983cd24fb0d6963f7d28e17f72");
        assert_eq!(digests.sha1, "a9993e364706816aba3e25717850c26c9cd0d89d");
        assert_eq!(
            digests.sha256,
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[tokio::test]
    async fn reader_and_bytes_agree() {
        let data: Vec<u8> = (0..200_000u32).map(|i| (i % 251) as u8).collect();
        let computer = DigestComputer::new();

        let from_bytes = computer.digest_bytes(&data);
        let mut cursor = std::io::Cursor::new(data);
        let from_reader = computer.digest_reader(&mut cursor).await.unwrap();

        assert_eq!(from_bytes, from_reader);
    }

    #[tokio::test]
    async fn digesting_is_deterministic() {
        let computer = DigestComputer::new();
        let first = computer.digest_bytes(b"fixed benign sequence");
        let second = computer.digest_bytes(b"fixed benign sequence");
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn file_digests_match_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sample.bin");
        tokio::fs::write(&path, b"spooled content").await.unwrap();

        let computer = DigestComputer::new();
        let from_file = computer.digest_file(&path).await.unwrap();
        let from_bytes = computer.digest_bytes(b"spooled content");
        assert_eq!(from_file, from_bytes);
    }

    #[tokio::test]
    async fn missing_file_is_io_error() {
        let result = DigestComputer::new()
            .digest_file(Path::new("/nonexistent/threatgate-test"))
            .await;
        assert!(matches!(result, Err(ScanError::Io(_))));
    }
}
