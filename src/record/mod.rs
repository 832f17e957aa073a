//! Provenance recording: append-only history of scans and updates.
//!
//! A [`ProvenanceRecorder`] persists one [`ScanRecord`] per completed scan
//! and one [`UpdateEvent`] per signature update cycle. Records are write
//! once: recorders append and list, nothing edits or deletes. Two
//! implementations ship: [`MemoryRecorder`] for tests and embedding, and
//! [`JsonlRecorder`] for durable single-node deployments.

pub mod jsonl;
pub mod memory;

pub use jsonl::JsonlRecorder;
pub use memory::MemoryRecorder;

use crate::core::types::{ScanRecord, UpdateEvent};

use async_trait::async_trait;
use std::fmt::Debug;
use std::sync::Arc;
use thiserror::Error;

/// Failures inside a recorder backend.
///
/// Kept separate from [`ScanError`](crate::core::ScanError): a verdict can
/// be perfectly valid while its persistence fails, and callers need to
/// tell those situations apart.
#[derive(Debug, Error)]
pub enum RecorderError {
    /// The backing store rejected the write.
    #[error("storage failure: {message}")]
    Storage {
        /// Backend-specific description.
        message: String,
    },

    /// An underlying I/O operation failed.
    #[error("recorder i/o failure: {0}")]
    Io(#[from] std::io::Error),

    /// A record could not be serialized or deserialized.
    #[error("record serialization failure: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Convenience alias for recorder operations.
pub type RecorderResult<T> = std::result::Result<T, RecorderError>;

/// Append-only storage for scan and update history.
///
/// Histories are returned newest first. `limit` bounds the page size and
/// `offset` skips past newer entries, so `(limit: 20, offset: 20)` is the
/// second page.
#[async_trait]
pub trait ProvenanceRecorder: Send + Sync + Debug {
    /// Appends one completed scan.
    async fn record_scan(&self, record: &ScanRecord) -> RecorderResult<()>;

    /// Appends one completed update cycle.
    async fn record_update(&self, event: &UpdateEvent) -> RecorderResult<()>;

    /// Lists recorded scans, newest first.
    async fn scan_history(&self, limit: usize, offset: usize) -> RecorderResult<Vec<ScanRecord>>;

    /// Lists recorded update cycles, newest first.
    async fn update_history(&self, limit: usize, offset: usize)
        -> RecorderResult<Vec<UpdateEvent>>;
}

/// An arc-wrapped recorder for shared ownership.
pub type ArcRecorder = Arc<dyn ProvenanceRecorder>;

/// Pages a chronologically ordered slice newest first.
pub(crate) fn page_newest_first<T: Clone>(items: &[T], limit: usize, offset: usize) -> Vec<T> {
    items.iter().rev().skip(offset).take(limit).cloned().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paging_is_newest_first() {
        let items = vec![1, 2, 3, 4, 5];
        assert_eq!(page_newest_first(&items, 2, 0), vec![5, 4]);
        assert_eq!(page_newest_first(&items, 2, 2), vec![3, 2]);
        assert_eq!(page_newest_first(&items, 10, 4), vec![1]);
        assert!(page_newest_first(&items, 3, 99).is_empty());
    }
}
