//! File-backed provenance recorder using JSON Lines.
//!
//! One line per record, appended atomically under an internal lock. The
//! format is greppable, tail-able, and trivially re-ingested elsewhere,
//! which fits an append-only audit trail better than a mutable document.

use crate::core::types::{ScanRecord, UpdateEvent};
use crate::record::{page_newest_first, ProvenanceRecorder, RecorderError, RecorderResult};

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

const SCANS_FILE: &str = "scans.jsonl";
const UPDATES_FILE: &str = "updates.jsonl";

/// A recorder that appends JSON Lines files under a directory.
#[derive(Debug)]
pub struct JsonlRecorder {
    scans_path: PathBuf,
    updates_path: PathBuf,
    // One lock per file keeps concurrent appends whole-line.
    scans_lock: Mutex<()>,
    updates_lock: Mutex<()>,
}

impl JsonlRecorder {
    /// Creates a recorder rooted at `dir`, creating the directory if needed.
    pub async fn open(dir: impl Into<PathBuf>) -> RecorderResult<Self> {
        let dir = dir.into();
        tokio::fs::create_dir_all(&dir).await?;
        Ok(Self {
            scans_path: dir.join(SCANS_FILE),
            updates_path: dir.join(UPDATES_FILE),
            scans_lock: Mutex::new(()),
            updates_lock: Mutex::new(()),
        })
    }

    async fn append_line<T: Serialize>(&self, path: &Path, value: &T) -> RecorderResult<()> {
        let mut line = serde_json::to_vec(value)?;
        line.push(b'\n');
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .await?;
        file.write_all(&line).await?;
        file.flush().await?;
        Ok(())
    }

    async fn read_all<T: DeserializeOwned>(&self, path: &Path) -> RecorderResult<Vec<T>> {
        let content = match tokio::fs::read_to_string(path).await {
            Ok(content) => content,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(RecorderError::Io(err)),
        };
        content
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| serde_json::from_str(line).map_err(RecorderError::Serialization))
            .collect()
    }
}

#[async_trait]
impl ProvenanceRecorder for JsonlRecorder {
    async fn record_scan(&self, record: &ScanRecord) -> RecorderResult<()> {
        let _guard = self.scans_lock.lock().await;
        self.append_line(&self.scans_path, record).await
    }

    async fn record_update(&self, event: &UpdateEvent) -> RecorderResult<()> {
        let _guard = self.updates_lock.lock().await;
        self.append_line(&self.updates_path, event).await
    }

    async fn scan_history(&self, limit: usize, offset: usize) -> RecorderResult<Vec<ScanRecord>> {
        let _guard = self.scans_lock.lock().await;
        let all: Vec<ScanRecord> = self.read_all(&self.scans_path).await?;
        Ok(page_newest_first(&all, limit, offset))
    }

    async fn update_history(
        &self,
        limit: usize,
        offset: usize,
    ) -> RecorderResult<Vec<UpdateEvent>> {
        let _guard = self.updates_lock.lock().await;
        let all: Vec<UpdateEvent> = self.read_all(&self.updates_path).await?;
        Ok(page_newest_first(&all, limit, offset))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{ClientContext, Digests, Verdict};

    fn record(filename: &str, verdict: Verdict) -> ScanRecord {
        ScanRecord::new(
            filename,
            4,
            Digests {
                md5: "m".into(),
                sha1: "s1".into(),
                sha256: "s256".into(),
            },
            verdict,
            "clamd",
            ClientContext::new().with_client_ip("10.0.0.9"),
        )
    }

    #[tokio::test]
    async fn round_trips_scan_records_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let recorder = JsonlRecorder::open(dir.path()).await.unwrap();

        recorder
            .record_scan(&record("clean.pdf", Verdict::clean()))
            .await
            .unwrap();
        recorder
            .record_scan(&record(
                "bad.exe",
                Verdict::infected(vec!["Win.Test.EICAR_HDB-1".into()]),
            ))
            .await
            .unwrap();

        let history = recorder.scan_history(10, 0).await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].filename, "bad.exe");
        assert!(history[0].is_infected());
        assert_eq!(history[1].client.client_ip.as_deref(), Some("10.0.0.9"));
    }

    #[tokio::test]
    async fn empty_store_lists_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let recorder = JsonlRecorder::open(dir.path()).await.unwrap();
        assert!(recorder.scan_history(10, 0).await.unwrap().is_empty());
        assert!(recorder.update_history(10, 0).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        {
            let recorder = JsonlRecorder::open(dir.path()).await.unwrap();
            recorder
                .record_scan(&record("kept.txt", Verdict::clean()))
                .await
                .unwrap();
        }
        let reopened = JsonlRecorder::open(dir.path()).await.unwrap();
        let history = reopened.scan_history(10, 0).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].filename, "kept.txt");
    }
}
