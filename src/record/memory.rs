//! In-memory provenance recorder.

use crate::core::types::{ScanRecord, UpdateEvent};
use crate::record::{page_newest_first, ProvenanceRecorder, RecorderResult};

use async_trait::async_trait;
use tokio::sync::RwLock;

/// A recorder that keeps all history in process memory.
///
/// Suitable for tests and for embedders that handle persistence
/// themselves. History is lost when the process exits.
#[derive(Debug, Default)]
pub struct MemoryRecorder {
    scans: RwLock<Vec<ScanRecord>>,
    updates: RwLock<Vec<UpdateEvent>>,
}

impl MemoryRecorder {
    /// Creates an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of recorded scans.
    pub async fn scan_count(&self) -> usize {
        self.scans.read().await.len()
    }

    /// Total number of recorded update cycles.
    pub async fn update_count(&self) -> usize {
        self.updates.read().await.len()
    }
}

#[async_trait]
impl ProvenanceRecorder for MemoryRecorder {
    async fn record_scan(&self, record: &ScanRecord) -> RecorderResult<()> {
        self.scans.write().await.push(record.clone());
        Ok(())
    }

    async fn record_update(&self, event: &UpdateEvent) -> RecorderResult<()> {
        self.updates.write().await.push(event.clone());
        Ok(())
    }

    async fn scan_history(&self, limit: usize, offset: usize) -> RecorderResult<Vec<ScanRecord>> {
        Ok(page_newest_first(&self.scans.read().await, limit, offset))
    }

    async fn update_history(
        &self,
        limit: usize,
        offset: usize,
    ) -> RecorderResult<Vec<UpdateEvent>> {
        Ok(page_newest_first(&self.updates.read().await, limit, offset))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{ClientContext, Digests, Verdict};

    fn record(filename: &str) -> ScanRecord {
        ScanRecord::new(
            filename,
            3,
            Digests {
                md5: "md5".into(),
                sha1: "sha1".into(),
                sha256: "sha256".into(),
            },
            Verdict::clean(),
            "mock",
            ClientContext::new(),
        )
    }

    #[tokio::test]
    async fn appends_and_lists_newest_first() {
        let recorder = MemoryRecorder::new();
        recorder.record_scan(&record("first.txt")).await.unwrap();
        recorder.record_scan(&record("second.txt")).await.unwrap();

        let history = recorder.scan_history(10, 0).await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].filename, "second.txt");
        assert_eq!(history[1].filename, "first.txt");
    }

    #[tokio::test]
    async fn offset_pages_past_newer_entries() {
        let recorder = MemoryRecorder::new();
        for i in 0..5 {
            recorder
                .record_scan(&record(&format!("file-{i}.txt")))
                .await
                .unwrap();
        }
        let page = recorder.scan_history(2, 2).await.unwrap();
        assert_eq!(page.len(), 2);
        assert_eq!(page[0].filename, "file-2.txt");
        assert_eq!(page[1].filename, "file-1.txt");
    }
}
