//! Mock transport for testing.
//!
//! A configurable stand-in for a real scanning engine: fixed verdicts,
//! content-based EICAR detection, simulated latency, forced connection
//! refusals, and availability toggling.

use crate::core::error::{Result, ScanError};
use crate::core::types::Verdict;
use crate::transport::ScanTransport;

use async_trait::async_trait;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::RwLock;
use std::time::Duration;

/// The body of the standard antivirus test file.
///
/// Industry-standard harmless test string; every real engine detects it.
pub const EICAR_TEST_BODY: &[u8] =
    br"X5O!P%@AP[4\PZX54(P^)7CC)7}$EICAR-STANDARD-ANTIVIRUS-TEST-FILE!$H+H*";

/// Threat name reported for the EICAR test file.
pub const EICAR_THREAT_NAME: &str = "Win.Test.EICAR_HDB-1";

/// A mock scanning transport.
///
/// By default every file is clean except those containing the EICAR test
/// string, which report infected with [`EICAR_THREAT_NAME`]. A fixed
/// verdict, a forced connection refusal, or unavailability can be
/// configured on top.
///
/// # Examples
///
/// ```rust
/// use threatgate::transport::MockTransport;
/// use threatgate::core::Verdict;
///
/// // Clean unless the content is the EICAR test string
/// let transport = MockTransport::new();
///
/// // Always infected
/// let transport = MockTransport::new()
///     .with_verdict(Verdict::infected(vec!["Test.Malware".into()]));
///
/// // Daemon-down simulation
/// let transport = MockTransport::new().with_connection_refused(true);
/// ```
#[derive(Debug)]
pub struct MockTransport {
    name: String,
    fixed_verdict: RwLock<Option<Verdict>>,
    refuse_connections: AtomicBool,
    unavailable: AtomicBool,
    latency: Option<Duration>,
    scan_count: AtomicU64,
    version: String,
}

impl MockTransport {
    /// Creates a mock transport with default behavior.
    pub fn new() -> Self {
        Self {
            name: "mock".to_string(),
            fixed_verdict: RwLock::new(None),
            refuse_connections: AtomicBool::new(false),
            unavailable: AtomicBool::new(false),
            latency: None,
            scan_count: AtomicU64::new(0),
            version: "ClamAV 1.2.1/27500/Tue Aug 25 08:12:44 2026".to_string(),
        }
    }

    /// Sets the transport name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Makes every scan return the given verdict regardless of content.
    pub fn with_verdict(self, verdict: Verdict) -> Self {
        *self.fixed_verdict.write().unwrap() = Some(verdict);
        self
    }

    /// Makes every scan fail with `ConnectionRefused`.
    pub fn with_connection_refused(self, refuse: bool) -> Self {
        self.refuse_connections.store(refuse, Ordering::Relaxed);
        self
    }

    /// Makes probes and version queries fail.
    pub fn with_unavailable(self, unavailable: bool) -> Self {
        self.unavailable.store(unavailable, Ordering::Relaxed);
        self
    }

    /// Adds simulated scan latency.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Sets the reported version line.
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    /// Returns the number of scans performed.
    pub fn scan_count(&self) -> u64 {
        self.scan_count.load(Ordering::Relaxed)
    }

    /// Flips the connection-refused behavior after construction.
    pub fn set_connection_refused(&self, refuse: bool) {
        self.refuse_connections.store(refuse, Ordering::Relaxed);
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ScanTransport for MockTransport {
    fn name(&self) -> &str {
        &self.name
    }

    async fn scan_path(&self, path: &Path, _size_hint: u64) -> Result<Verdict> {
        self.scan_count.fetch_add(1, Ordering::Relaxed);

        if self.refuse_connections.load(Ordering::Relaxed) {
            return Err(ScanError::connection_refused("mock daemon down"));
        }

        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        if let Some(verdict) = self.fixed_verdict.read().unwrap().clone() {
            return Ok(verdict);
        }

        let content = tokio::fs::read(path).await.map_err(ScanError::Io)?;
        if content
            .windows(EICAR_TEST_BODY.len())
            .any(|w| w == EICAR_TEST_BODY)
        {
            Ok(
                Verdict::infected(vec![EICAR_THREAT_NAME.to_string()])
                    .with_raw_note(format!("stream: {EICAR_THREAT_NAME} FOUND")),
            )
        } else {
            Ok(Verdict::clean().with_raw_note("stream: OK"))
        }
    }

    async fn probe(&self) -> Result<()> {
        if self.unavailable.load(Ordering::Relaxed)
            || self.refuse_connections.load(Ordering::Relaxed)
        {
            return Err(ScanError::connection_refused("mock daemon down"));
        }
        Ok(())
    }

    async fn engine_version(&self) -> Result<String> {
        if self.unavailable.load(Ordering::Relaxed) {
            return Err(ScanError::engine_unavailable("mock engine offline"));
        }
        Ok(self.version.clone())
    }
}
