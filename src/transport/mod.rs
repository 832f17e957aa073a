//! Scan transports: how bytes reach the scanning engine.
//!
//! A [`ScanTransport`] delivers the spooled bytes to the engine and turns
//! its answer into a [`Verdict`](crate::core::Verdict). Two production
//! implementations exist: [`DaemonTransport`] streams over a socket to a
//! long-running clamd, and [`ProcessTransport`] invokes a local `clamscan`
//! executable. [`MockTransport`] serves tests. Selection is explicit
//! configuration, never runtime type inspection.

pub mod daemon;
pub mod mock;
pub mod process;
mod response;

pub use daemon::{DaemonConfig, DaemonTransport};
pub use mock::MockTransport;
pub use process::{ProcessConfig, ProcessTransport};

use crate::core::error::Result;
use crate::core::types::{TransportMode, Verdict};

use async_trait::async_trait;
use std::fmt::Debug;
use std::path::Path;
use std::sync::Arc;

/// Delivers bytes to a scanning engine and obtains a verdict.
///
/// Implementations must be `Send + Sync` and must never panic; every
/// failure mode maps to a [`ScanError`](crate::core::ScanError) variant.
/// The transport reads the spooled file through its own handle so the
/// concurrent digest pass is never starved.
#[async_trait]
pub trait ScanTransport: Send + Sync + Debug {
    /// Returns a stable, human-readable engine identifier like `clamd`.
    fn name(&self) -> &str;

    /// Scans the file at `path`, whose length is `size_hint` bytes.
    ///
    /// A zero-byte file is valid input and still performs the engine's
    /// full handshake.
    async fn scan_path(&self, path: &Path, size_hint: u64) -> Result<Verdict>;

    /// Lightweight reachability check, used for startup mode selection.
    async fn probe(&self) -> Result<()>;

    /// Returns the engine's version line, e.g.
    /// `ClamAV 1.2.1/27500/Tue Aug 25 08:12:44 2026`.
    async fn engine_version(&self) -> Result<String>;
}

/// An arc-wrapped transport for shared ownership across scans.
pub type ArcTransport = Arc<dyn ScanTransport>;

/// Picks the transport mode at startup.
///
/// A manual override wins; otherwise the daemon is probed once and the
/// local-process mode is chosen when it is unreachable. The result is
/// process-wide, read-only configuration for steady-state operation: the
/// caller maps it to the transport handed to
/// [`ScanGatewayBuilder::primary`](crate::gateway::ScanGatewayBuilder::primary),
/// typically a [`DaemonTransport`] for [`TransportMode::Daemon`] and a
/// [`ProcessTransport`] for [`TransportMode::LocalProcess`].
///
/// ```rust
/// use std::sync::Arc;
/// use threatgate::core::TransportMode;
/// use threatgate::transport::{select_mode, ArcTransport, DaemonTransport, ProcessTransport};
///
/// # async fn wire() -> threatgate::core::Result<ArcTransport> {
/// let daemon = DaemonTransport::with_defaults()?;
/// let primary: ArcTransport = match select_mode(&daemon, None).await {
///     TransportMode::Daemon => Arc::new(daemon),
///     TransportMode::LocalProcess => Arc::new(ProcessTransport::with_defaults()),
/// };
/// # Ok(primary)
/// # }
/// ```
pub async fn select_mode(
    daemon: &dyn ScanTransport,
    manual_override: Option<TransportMode>,
) -> TransportMode {
    if let Some(mode) = manual_override {
        tracing::info!(mode = %mode, "transport mode set by manual override");
        return mode;
    }
    match daemon.probe().await {
        Ok(()) => {
            tracing::info!("scan daemon reachable, using daemon transport");
            TransportMode::Daemon
        }
        Err(err) => {
            tracing::warn!(error = %err, "scan daemon unreachable, using local-process transport");
            TransportMode::LocalProcess
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::TransportMode;

    #[tokio::test]
    async fn manual_override_wins_over_probe() {
        let unreachable = MockTransport::new().with_unavailable(true);
        let mode = select_mode(&unreachable, Some(TransportMode::Daemon)).await;
        assert_eq!(mode, TransportMode::Daemon);
    }

    #[tokio::test]
    async fn probe_failure_selects_local_process() {
        let unreachable = MockTransport::new().with_unavailable(true);
        let mode = select_mode(&unreachable, None).await;
        assert_eq!(mode, TransportMode::LocalProcess);
    }

    #[tokio::test]
    async fn probe_success_selects_daemon() {
        let reachable = MockTransport::new();
        let mode = select_mode(&reachable, None).await;
        assert_eq!(mode, TransportMode::Daemon);
    }
}
