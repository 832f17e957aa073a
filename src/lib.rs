//! # Threatgate
//!
//! A malware-scan gateway over ClamAV: spool, digest, scan, record.
//!
//! ## Overview
//!
//! Threatgate accepts untrusted bytes and turns each submission into a
//! verdict plus a durable provenance record:
//!
//! - Spool the input to a uniquely named temporary file, gone by the time
//!   the call returns
//! - Compute MD5, SHA-1, and SHA-256 digests concurrently with the scan,
//!   over exactly the bytes the engine saw
//! - Scan through a long-running clamd daemon, with a one-shot `clamscan`
//!   subprocess as configurable fallback
//! - Persist a write-once [`ScanRecord`] and emit a structured audit event
//! - Track signature-database state and run serialized update cycles
//!
//! An infected verdict is a successful scan. Signature state is observed,
//! never invented: unknown totals stay unknown.
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use threatgate::core::{ByteSource, ClientContext};
//! use threatgate::gateway::ScanGateway;
//! use threatgate::record::MemoryRecorder;
//! use threatgate::transport::MockTransport;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let gateway = ScanGateway::builder()
//!         .primary(Arc::new(MockTransport::new()))
//!         .recorder(Arc::new(MemoryRecorder::new()))
//!         .build()?;
//!
//!     let source = ByteSource::from_bytes(b"file content".to_vec())
//!         .with_filename("upload.bin");
//!     let record = gateway.scan(source, ClientContext::new()).await?;
//!
//!     if !record.is_infected() {
//!         println!("clean: sha256 {}", record.digests.sha256);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! A production deployment swaps [`MockTransport`](transport::MockTransport)
//! for [`DaemonTransport`](transport::DaemonTransport) with a
//! [`ProcessTransport`](transport::ProcessTransport) fallback, and
//! [`MemoryRecorder`](record::MemoryRecorder) for
//! [`JsonlRecorder`](record::JsonlRecorder).
//!
//! ## Architecture
//!
//! - **core**: verdicts, digests, records, byte sources, errors
//! - **transport**: daemon socket protocol, local subprocess, mock
//! - **gateway**: per-scan orchestration and spool hygiene
//! - **signature**: database status snapshots and update cycles
//! - **record**: append-only scan and update history
//! - **audit**: structured tracing events for every recorded outcome

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod audit;
pub mod core;
pub mod gateway;
pub mod record;
pub mod signature;
pub mod transport;

// Re-export commonly used types at the crate root
pub use crate::core::{
    ByteSource, ClientContext, DatabaseStatus, DigestComputer, Digests, Result, ScanError,
    ScanRecord, SignatureSnapshot, TransportMode, UpdateEvent, UpdateStatus, Verdict,
    VerdictStatus,
};

pub use crate::gateway::{GatewayConfig, ScanGateway};
pub use crate::record::{JsonlRecorder, MemoryRecorder, ProvenanceRecorder, RecorderError};
pub use crate::signature::{FreshclamUpdater, SignatureStatusTracker, UpdaterConfig};
pub use crate::transport::{
    DaemonConfig, DaemonTransport, MockTransport, ProcessConfig, ProcessTransport, ScanTransport,
};

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::core::{
        ByteSource, ClientContext, Digests, Result, ScanError, ScanRecord, Verdict, VerdictStatus,
    };
    pub use crate::gateway::{GatewayConfig, ScanGateway};
    pub use crate::record::{MemoryRecorder, ProvenanceRecorder};
    pub use crate::signature::SignatureStatusTracker;
    pub use crate::transport::{MockTransport, ScanTransport};
}
