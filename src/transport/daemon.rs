//! Streaming daemon transport (clamd INSTREAM protocol).
//!
//! Talks to a long-running clamd over a Unix socket or TCP. The scan uses
//! the `INSTREAM` command: a newline-terminated command token, then the file
//! as 4-byte big-endian length-prefixed chunks, then a zero-length chunk as
//! end-of-stream, then one textual response. Chunks are written
//! synchronously with explicit backpressure so framing errors surface at
//! the write that caused them.
//!
//! Every connect/read/write is bounded by a client-side budget; the daemon
//! itself is never blocked on.

use crate::core::error::{Result, ScanError};
use crate::core::types::Verdict;
use crate::transport::response::parse_engine_response;
use crate::transport::ScanTransport;

use async_trait::async_trait;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Chunk size bounds for the INSTREAM framing.
const MIN_CHUNK_SIZE: usize = 4 * 1024;
const MAX_CHUNK_SIZE: usize = 1024 * 1024;

/// Configuration for the daemon transport.
#[derive(Debug, Clone)]
pub struct DaemonConfig {
    /// Path to the clamd Unix socket.
    pub socket_path: Option<PathBuf>,

    /// TCP `host:port` address (alternative to the socket).
    pub tcp_address: Option<String>,

    /// Budget for establishing the connection.
    pub connect_timeout: Duration,

    /// Budget for each individual read or write on the connection.
    pub io_timeout: Duration,

    /// INSTREAM chunk size, clamped to 4 KiB..=1 MiB.
    pub chunk_size: usize,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            socket_path: Some(PathBuf::from("/var/run/clamav/clamd.sock")),
            tcp_address: None,
            connect_timeout: Duration::from_secs(10),
            io_timeout: Duration::from_secs(30),
            chunk_size: 64 * 1024,
        }
    }
}

impl DaemonConfig {
    /// Creates a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Uses a Unix socket.
    pub fn with_socket(mut self, path: impl Into<PathBuf>) -> Self {
        self.socket_path = Some(path.into());
        self.tcp_address = None;
        self
    }

    /// Uses a TCP connection.
    pub fn with_tcp(mut self, address: impl Into<String>) -> Self {
        self.tcp_address = Some(address.into());
        self.socket_path = None;
        self
    }

    /// Sets the connection timeout.
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Sets the per-operation I/O timeout.
    pub fn with_io_timeout(mut self, timeout: Duration) -> Self {
        self.io_timeout = timeout;
        self
    }

    /// Sets the chunk size, clamped to the framing bounds.
    pub fn with_chunk_size(mut self, size: usize) -> Self {
        self.chunk_size = size.clamp(MIN_CHUNK_SIZE, MAX_CHUNK_SIZE);
        self
    }
}

/// Type-erased bidirectional connection (Unix socket or TCP).
trait Connection: AsyncRead + AsyncWrite + Send + Unpin {}
impl<T: AsyncRead + AsyncWrite + Send + Unpin> Connection for T {}

/// Streaming transport to a running clamd.
#[derive(Debug)]
pub struct DaemonTransport {
    config: DaemonConfig,
}

impl DaemonTransport {
    /// Creates a new daemon transport with the given configuration.
    pub fn new(config: DaemonConfig) -> Result<Self> {
        if config.socket_path.is_none() && config.tcp_address.is_none() {
            return Err(ScanError::configuration(
                "either socket_path or tcp_address must be specified",
            ));
        }
        Ok(Self { config })
    }

    /// Creates a daemon transport with default configuration.
    pub fn with_defaults() -> Result<Self> {
        Self::new(DaemonConfig::default())
    }

    /// Bounds one I/O operation by the configured budget.
    async fn timed<T, F>(&self, budget: Duration, fut: F) -> Result<T>
    where
        F: Future<Output = std::io::Result<T>>,
    {
        match tokio::time::timeout(budget, fut).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(err)) => Err(ScanError::Io(err)),
            Err(_) => Err(ScanError::timeout(budget)),
        }
    }

    async fn connect(&self) -> Result<Box<dyn Connection>> {
        if let Some(ref address) = self.config.tcp_address {
            let connect = tokio::net::TcpStream::connect(address.as_str());
            return match tokio::time::timeout(self.config.connect_timeout, connect).await {
                Ok(Ok(stream)) => Ok(Box::new(stream)),
                Ok(Err(err)) => Err(ScanError::from_connect_error(err)),
                Err(_) => Err(ScanError::timeout(self.config.connect_timeout)),
            };
        }

        if let Some(ref socket_path) = self.config.socket_path {
            #[cfg(unix)]
            {
                let connect = tokio::net::UnixStream::connect(socket_path);
                return match tokio::time::timeout(self.config.connect_timeout, connect).await {
                    Ok(Ok(stream)) => Ok(Box::new(stream)),
                    Ok(Err(err)) => Err(ScanError::from_connect_error(err)),
                    Err(_) => Err(ScanError::timeout(self.config.connect_timeout)),
                };
            }
            #[cfg(not(unix))]
            {
                let _ = socket_path;
                return Err(ScanError::configuration(
                    "Unix sockets are not supported on this platform",
                ));
            }
        }

        Err(ScanError::configuration("no connection method configured"))
    }

    /// One-shot command round trip (`PING`, `VERSION`).
    async fn roundtrip(&self, command: &[u8]) -> Result<String> {
        let mut conn = self.connect().await?;
        self.timed(self.config.io_timeout, conn.write_all(command))
            .await?;
        let mut response = String::new();
        self.timed(self.config.io_timeout, conn.read_to_string(&mut response))
            .await?;
        Ok(response)
    }
}

#[async_trait]
impl ScanTransport for DaemonTransport {
    fn name(&self) -> &str {
        "clamd"
    }

    async fn scan_path(&self, path: &Path, size_hint: u64) -> Result<Verdict> {
        let io_budget = self.config.io_timeout;
        let mut file = tokio::fs::File::open(path).await.map_err(ScanError::Io)?;
        let mut conn = self.connect().await?;

        tracing::debug!(path = %path.display(), size = size_hint, "streaming spool to daemon");

        self.timed(io_budget, conn.write_all(b"nINSTREAM\n")).await?;

        // Write chunk, await completion, read next: the zero-byte case
        // skips straight to the terminator but still completes the
        // handshake and waits for a response.
        let mut buf = vec![0u8; self.config.chunk_size];
        loop {
            let n = file.read(&mut buf).await.map_err(ScanError::Io)?;
            if n == 0 {
                break;
            }
            self.timed(io_budget, conn.write_all(&(n as u32).to_be_bytes()))
                .await?;
            self.timed(io_budget, conn.write_all(&buf[..n])).await?;
        }
        self.timed(io_budget, conn.write_all(&0u32.to_be_bytes()))
            .await?;
        self.timed(io_budget, conn.flush()).await?;

        let mut response = String::new();
        self.timed(io_budget, conn.read_to_string(&mut response))
            .await?;

        parse_engine_response(&response)
    }

    async fn probe(&self) -> Result<()> {
        let response = self.roundtrip(b"nPING\n").await?;
        if response.trim() == "PONG" {
            Ok(())
        } else {
            Err(ScanError::engine_unavailable(format!(
                "unexpected PING response: {}",
                response.trim()
            )))
        }
    }

    async fn engine_version(&self) -> Result<String> {
        let response = self.roundtrip(b"nVERSION\n").await?;
        let line = response.trim();
        if line.is_empty() {
            return Err(ScanError::protocol("empty VERSION response"));
        }
        Ok(line.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Minimal clamd stand-in: answers PING/VERSION, consumes one INSTREAM
    /// transfer, and replies with `FOUND` when the payload contains the
    /// given marker.
    async fn fake_clamd(listener: TcpListener, infected_marker: &'static [u8]) {
        let (mut sock, _) = listener.accept().await.unwrap();

        let mut command = Vec::new();
        let mut byte = [0u8; 1];
        loop {
            sock.read_exact(&mut byte).await.unwrap();
            if byte[0] == b'\n' {
                break;
            }
            command.push(byte[0]);
        }

        match command.as_slice() {
            b"nPING" => {
                sock.write_all(b"PONG\n").await.unwrap();
            }
            b"nVERSION" => {
                sock.write_all(b"ClamAV 1.2.1/27500/Tue Aug 25 08:12:44 2026\n")
                    .await
                    .unwrap();
            }
            b"nINSTREAM" => {
                let mut payload = Vec::new();
                loop {
                    let mut len_buf = [0u8; 4];
                    sock.read_exact(&mut len_buf).await.unwrap();
                    let len = u32::from_be_bytes(len_buf) as usize;
                    if len == 0 {
                        break;
                    }
                    let mut chunk = vec![0u8; len];
                    sock.read_exact(&mut chunk).await.unwrap();
                    payload.extend_from_slice(&chunk);
                }
                let reply = if !infected_marker.is_empty()
                    && payload
                        .windows(infected_marker.len())
                        .any(|w| w == infected_marker)
                {
                    "stream: Win.Test.EICAR_HDB-1 FOUND\n"
                } else {
                    "stream: OK\n"
                };
                sock.write_all(reply.as_bytes()).await.unwrap();
            }
            other => panic!("unexpected command: {:?}", String::from_utf8_lossy(other)),
        }
    }

    async fn transport_for(listener: &TcpListener) -> DaemonTransport {
        let addr = listener.local_addr().unwrap();
        DaemonTransport::new(DaemonConfig::new().with_tcp(addr.to_string())).unwrap()
    }

    async fn spooled(content: &[u8]) -> (tempfile::TempDir, std::path::PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("upload.bin");
        tokio::fs::write(&path, content).await.unwrap();
        (dir, path)
    }

    #[tokio::test]
    async fn clean_stream_scan() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let transport = transport_for(&listener).await;
        let server = tokio::spawn(fake_clamd(listener, b"INFECTED-MARKER"));

        let (_dir, path) = spooled(b"plain harmless bytes").await;
        let verdict = transport.scan_path(&path, 20).await.unwrap();
        assert!(verdict.is_clean());
        server.await.unwrap();
    }

    #[tokio::test]
    async fn infected_stream_scan() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let transport = transport_for(&listener).await;
        let server = tokio::spawn(fake_clamd(listener, b"INFECTED-MARKER"));

        let (_dir, path) = spooled(b"prefix INFECTED-MARKER suffix").await;
        let verdict = transport.scan_path(&path, 29).await.unwrap();
        assert!(verdict.is_infected());
        assert_eq!(verdict.threats(), &["Win.Test.EICAR_HDB-1".to_string()]);
        server.await.unwrap();
    }

    #[tokio::test]
    async fn zero_byte_input_completes_handshake() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let transport = transport_for(&listener).await;
        let server = tokio::spawn(fake_clamd(listener, b"INFECTED-MARKER"));

        let (_dir, path) = spooled(b"").await;
        let verdict = transport.scan_path(&path, 0).await.unwrap();
        assert!(verdict.is_clean());
        server.await.unwrap();
    }

    #[tokio::test]
    async fn ping_and_version() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let transport = transport_for(&listener).await;
        let server = tokio::spawn(fake_clamd(listener, b""));
        transport.probe().await.unwrap();
        server.await.unwrap();

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let transport = transport_for(&listener).await;
        let server = tokio::spawn(fake_clamd(listener, b""));
        let version = transport.engine_version().await.unwrap();
        assert!(version.starts_with("ClamAV 1.2.1"));
        server.await.unwrap();
    }

    #[tokio::test]
    async fn closed_port_is_connection_refused() {
        // Bind then drop to obtain a port with nothing listening.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let transport =
            DaemonTransport::new(DaemonConfig::new().with_tcp(addr.to_string())).unwrap();
        let (_dir, path) = spooled(b"anything").await;
        let result = transport.scan_path(&path, 8).await;
        assert!(matches!(result, Err(ScanError::ConnectionRefused { .. })));
    }

    #[test]
    fn config_requires_a_connection_method() {
        let mut config = DaemonConfig::new();
        config.socket_path = None;
        config.tcp_address = None;
        assert!(matches!(
            DaemonTransport::new(config),
            Err(ScanError::Configuration { .. })
        ));
    }

    #[test]
    fn chunk_size_is_clamped() {
        let config = DaemonConfig::new().with_chunk_size(1);
        assert_eq!(config.chunk_size, MIN_CHUNK_SIZE);
        let config = DaemonConfig::new().with_chunk_size(usize::MAX);
        assert_eq!(config.chunk_size, MAX_CHUNK_SIZE);
    }
}
