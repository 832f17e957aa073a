//! The scan gateway: spool, digest, scan, record.
//!
//! [`ScanGateway`] is the orchestrator that ties the other modules
//! together. One call to [`ScanGateway::scan`] spools the input, computes
//! digests and the verdict concurrently, persists a provenance record, and
//! emits an audit event. The spool file is gone by the time the call
//! returns, however it returns.

mod scan;
mod spool;

pub use scan::{GatewayConfig, ScanGateway, ScanGatewayBuilder};
