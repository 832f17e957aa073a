//! Core types, errors, and the digest computer.

pub mod digest;
pub mod error;
pub mod source;
pub mod types;

pub use digest::DigestComputer;
pub use error::{Result, ScanError};
pub use source::{ByteSource, BytesReader};
pub use types::{
    ClientContext, DatabaseStatus, Digests, ScanRecord, SignatureSnapshot, TransportMode,
    UpdateEvent, UpdateStatus, Verdict, VerdictStatus,
};
