//! Scan orchestration.

use crate::audit;
use crate::core::digest::DigestComputer;
use crate::core::error::{Result, ScanError};
use crate::core::source::ByteSource;
use crate::core::types::{ClientContext, ScanRecord, UpdateEvent, Verdict};
use crate::gateway::spool::Spool;
use crate::record::ArcRecorder;
use crate::transport::ArcTransport;

use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default maximum accepted file size: 50 MiB.
pub const DEFAULT_MAX_FILE_SIZE: u64 = 50 * 1024 * 1024;

/// Default overall budget for one scan call.
pub const DEFAULT_SCAN_TIMEOUT: Duration = Duration::from_secs(300);

/// Configuration for the scan gateway.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Maximum accepted input size in bytes.
    pub max_file_size: u64,

    /// Directory where inputs are spooled during a scan.
    pub spool_dir: PathBuf,

    /// Whether a refused daemon connection falls back to the local-process
    /// transport for the current call.
    pub fallback_enabled: bool,

    /// Budget covering spooling, digesting, and scanning together.
    pub scan_timeout: Duration,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            spool_dir: std::env::temp_dir(),
            fallback_enabled: true,
            scan_timeout: DEFAULT_SCAN_TIMEOUT,
        }
    }
}

impl GatewayConfig {
    /// Creates a config with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the maximum accepted file size in bytes.
    pub fn with_max_file_size(mut self, max: u64) -> Self {
        self.max_file_size = max;
        self
    }

    /// Sets the spool directory.
    pub fn with_spool_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.spool_dir = dir.into();
        self
    }

    /// Enables or disables the local-process fallback.
    pub fn with_fallback_enabled(mut self, enabled: bool) -> Self {
        self.fallback_enabled = enabled;
        self
    }

    /// Sets the overall per-scan time budget.
    pub fn with_scan_timeout(mut self, timeout: Duration) -> Self {
        self.scan_timeout = timeout;
        self
    }
}

/// Builder for [`ScanGateway`].
#[derive(Debug, Default)]
pub struct ScanGatewayBuilder {
    primary: Option<ArcTransport>,
    fallback: Option<ArcTransport>,
    recorder: Option<ArcRecorder>,
    config: Option<GatewayConfig>,
}

impl ScanGatewayBuilder {
    /// Sets the primary transport. Required.
    pub fn primary(mut self, transport: ArcTransport) -> Self {
        self.primary = Some(transport);
        self
    }

    /// Sets the fallback transport, used once per call when the primary
    /// refuses the connection.
    pub fn fallback(mut self, transport: ArcTransport) -> Self {
        self.fallback = Some(transport);
        self
    }

    /// Sets the provenance recorder. Required.
    pub fn recorder(mut self, recorder: ArcRecorder) -> Self {
        self.recorder = Some(recorder);
        self
    }

    /// Sets the gateway configuration.
    pub fn config(mut self, config: GatewayConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Builds the gateway, failing if a required component is missing.
    pub fn build(self) -> Result<ScanGateway> {
        let primary = self
            .primary
            .ok_or_else(|| ScanError::configuration("a primary transport is required"))?;
        let recorder = self
            .recorder
            .ok_or_else(|| ScanError::configuration("a provenance recorder is required"))?;
        Ok(ScanGateway {
            primary,
            fallback: self.fallback,
            recorder,
            config: self.config.unwrap_or_default(),
            digester: DigestComputer::new(),
        })
    }
}

/// Orchestrates one scan from raw bytes to a persisted provenance record.
///
/// # Examples
///
/// ```rust
/// use std::sync::Arc;
/// use threatgate::core::{ByteSource, ClientContext};
/// use threatgate::gateway::ScanGateway;
/// use threatgate::record::MemoryRecorder;
/// use threatgate::transport::MockTransport;
///
/// # async fn example() -> threatgate::core::Result<()> {
/// let gateway = ScanGateway::builder()
///     .primary(Arc::new(MockTransport::new()))
///     .recorder(Arc::new(MemoryRecorder::new()))
///     .build()?;
///
/// let source = ByteSource::from_bytes(b"%PDF-1.4".to_vec()).with_filename("invoice.pdf");
/// let record = gateway.scan(source, ClientContext::new()).await?;
/// assert!(!record.is_infected());
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct ScanGateway {
    primary: ArcTransport,
    fallback: Option<ArcTransport>,
    recorder: ArcRecorder,
    config: GatewayConfig,
    digester: DigestComputer,
}

impl ScanGateway {
    /// Returns a builder.
    pub fn builder() -> ScanGatewayBuilder {
        ScanGatewayBuilder::default()
    }

    /// Scans one input end to end.
    ///
    /// Spools the bytes, computes all three digests and the verdict
    /// concurrently over independent read handles, removes the spool file,
    /// then persists and audits a [`ScanRecord`]. The digests always cover
    /// exactly the spooled bytes the engine saw.
    ///
    /// An infected verdict is a successful scan; only the listed
    /// [`ScanError`] cases are failures. A persistence failure after a
    /// computed verdict surfaces as [`ScanError::Persistence`].
    pub async fn scan(&self, source: ByteSource, client: ClientContext) -> Result<ScanRecord> {
        let filename = source.filename().unwrap_or("unnamed").to_string();

        let spool =
            Spool::from_source(source, &self.config.spool_dir, self.config.max_file_size).await?;
        let byte_length = spool.len();

        tracing::debug!(
            filename = %filename,
            byte_length,
            spool = %spool.path().display(),
            "input spooled"
        );

        let work = async {
            tokio::try_join!(
                self.digester.digest_file(spool.path()),
                self.scan_spooled(spool.path(), byte_length),
            )
        };
        let (digests, (verdict, engine)) = tokio::time::timeout(self.config.scan_timeout, work)
            .await
            .map_err(|_| ScanError::timeout(self.config.scan_timeout))??;

        drop(spool);

        let record = ScanRecord::new(filename, byte_length, digests, verdict, engine, client);
        self.recorder
            .record_scan(&record)
            .await
            .map_err(|err| ScanError::persistence(err.to_string()))?;
        audit::emit_scan_recorded(&record);

        Ok(record)
    }

    /// Runs the engine over the spooled file, falling back at most once.
    async fn scan_spooled(&self, path: &Path, size_hint: u64) -> Result<(Verdict, String)> {
        match self.primary.scan_path(path, size_hint).await {
            Ok(verdict) => Ok((verdict, self.primary.name().to_string())),
            Err(err) if err.triggers_fallback() && self.config.fallback_enabled => {
                let Some(fallback) = &self.fallback else {
                    return Err(err);
                };
                tracing::warn!(
                    error = %err,
                    primary = %self.primary.name(),
                    fallback = %fallback.name(),
                    "primary transport unreachable, retrying over fallback"
                );
                let verdict = fallback.scan_path(path, size_hint).await?;
                Ok((verdict, fallback.name().to_string()))
            }
            Err(err) => Err(err),
        }
    }

    /// Lists recorded scans, newest first.
    pub async fn scan_history(&self, limit: usize, offset: usize) -> Result<Vec<ScanRecord>> {
        self.recorder
            .scan_history(limit, offset)
            .await
            .map_err(|err| ScanError::persistence(err.to_string()))
    }

    /// Lists recorded update cycles, newest first.
    pub async fn update_history(&self, limit: usize, offset: usize) -> Result<Vec<UpdateEvent>> {
        self.recorder
            .update_history(limit, offset)
            .await
            .map_err(|err| ScanError::persistence(err.to_string()))
    }
}
