//! Signature-database status and update tracking.
//!
//! [`SignatureStatusTracker`] answers two questions: what signature state
//! is the engine running right now, and what happened the last times an
//! update was triggered. Status is always observed, never invented: when
//! the tooling reports no per-database breakdown the snapshot simply
//! carries none, and totals stay `None` rather than being fabricated.

pub mod freshclam;

pub use freshclam::{ArcUpdater, FreshclamUpdater, SignatureUpdater, UpdaterConfig};

use crate::audit;
use crate::core::error::{Result, ScanError};
use crate::core::types::{SignatureSnapshot, UpdateEvent, UpdateStatus};
use crate::record::ArcRecorder;
use crate::transport::ArcTransport;

use tokio::sync::Mutex;

/// Tracks engine signature state and runs serialized update cycles.
#[derive(Debug)]
pub struct SignatureStatusTracker {
    transport: ArcTransport,
    updater: ArcUpdater,
    recorder: ArcRecorder,
    // Held for the whole update cycle; a second trigger is rejected, not
    // queued.
    update_gate: Mutex<()>,
}

impl SignatureStatusTracker {
    /// Creates a tracker over the given engine transport and updater.
    pub fn new(transport: ArcTransport, updater: ArcUpdater, recorder: ArcRecorder) -> Self {
        Self {
            transport,
            updater,
            recorder,
            update_gate: Mutex::new(()),
        }
    }

    /// Observes the engine's current signature state.
    ///
    /// The engine version comes from the scan transport; the per-database
    /// breakdown comes from the updater tooling. A failed breakdown query
    /// degrades to a snapshot without databases, but an unreachable engine
    /// is an error: no snapshot is fabricated for an engine that cannot be
    /// asked.
    pub async fn current_status(&self) -> Result<SignatureSnapshot> {
        let version_line = self
            .transport
            .engine_version()
            .await
            .map_err(|err| ScanError::engine_unavailable(err.to_string()))?;
        let engine_version = parse_version_line(&version_line);

        let databases = match self.updater.check().await {
            Ok(databases) => databases,
            Err(err) => {
                tracing::warn!(error = %err, "signature breakdown unavailable");
                Vec::new()
            }
        };

        Ok(SignatureSnapshot::from_databases(engine_version, databases))
    }

    /// Runs one signature update cycle.
    ///
    /// At most one cycle runs at a time; a concurrent trigger fails fast
    /// with [`ScanError::UpdateInProgress`]. Once the before-snapshot is
    /// taken, exactly one [`UpdateEvent`] is appended to history whether
    /// the update succeeds or fails.
    pub async fn trigger_update(&self) -> Result<UpdateEvent> {
        let _gate = self
            .update_gate
            .try_lock()
            .map_err(|_| ScanError::UpdateInProgress)?;

        let before = self.current_status().await?;
        tracing::info!(
            signatures_before = ?before.total_signatures,
            "signature update started"
        );

        let (status, detail) = match self.updater.update().await {
            Ok(output) => (UpdateStatus::Success, output),
            Err(err) => (UpdateStatus::Failed, err.to_string()),
        };

        let (after, detail) = match self.current_status().await {
            Ok(after) => (after, detail),
            Err(err) => (
                before.clone(),
                format!("{detail} (post-update status unavailable: {err})"),
            ),
        };

        let event = UpdateEvent::new(status, detail, before, after);
        self.recorder
            .record_update(&event)
            .await
            .map_err(|err| ScanError::persistence(err.to_string()))?;
        audit::emit_update_recorded(&event);

        Ok(event)
    }
}

/// Extracts the engine version from a daemon VERSION line.
///
/// `ClamAV 1.2.1/27500/Tue Aug 25 08:12:44 2026` carries the engine
/// version, the daily database version, and its build date; only the first
/// segment identifies the engine.
pub(crate) fn parse_version_line(line: &str) -> Option<String> {
    let first = line.split('/').next()?.trim();
    if first.is_empty() {
        None
    } else {
        Some(first.to_string())
    }
}
