//! Structured audit emission.
//!
//! Every recorded scan and every update cycle is also emitted as a
//! structured tracing event under the `threatgate::audit` target, so a
//! deployment can route the audit stream independently of operational
//! logs.

use crate::core::types::{ScanRecord, UpdateEvent, VerdictStatus};

/// Emits an audit event for a completed, recorded scan.
pub fn emit_scan_recorded(record: &ScanRecord) {
    let outcome = match &record.verdict.status {
        VerdictStatus::Clean => "clean",
        VerdictStatus::Infected { .. } => "infected",
    };

    tracing::info!(
        target: "threatgate::audit",
        event_type = "scan_recorded",
        scan_id = %record.id,
        filename = %record.filename,
        byte_length = record.byte_length,
        sha256 = %record.digests.sha256,
        md5 = %record.digests.md5,
        outcome = %outcome,
        threats = ?record.verdict.threats(),
        engine = %record.engine,
        client_ip = ?record.client.client_ip,
        request_id = ?record.client.request_id,
        "Scan recorded"
    );
}

/// Emits an audit event for a completed signature update cycle.
pub fn emit_update_recorded(event: &UpdateEvent) {
    tracing::info!(
        target: "threatgate::audit",
        event_type = "update_recorded",
        update_id = %event.id,
        status = %event.status,
        signatures_before = ?event.before.total_signatures,
        signatures_after = ?event.after.total_signatures,
        new_signatures = ?event.new_signatures,
        "Signature update recorded"
    );
}
