//! Core types used throughout the threatgate library.
//!
//! This module defines the fundamental data structures for representing
//! verdicts, content digests, scan records, and signature-database state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// The classification assigned to one scanned byte sequence.
///
/// The enum shape makes the core invariant unrepresentable: a clean verdict
/// cannot carry threat names, and an infected verdict always does.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum VerdictStatus {
    /// No threats were detected.
    Clean,

    /// One or more threats were detected.
    Infected {
        /// Names of all detected threats, in engine-reported order.
        threats: Vec<String>,
    },
}

/// The clean/infected classification plus the engine's raw response note.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verdict {
    /// The classification.
    #[serde(flatten)]
    pub status: VerdictStatus,

    /// The raw textual response from the engine, kept for audit.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_note: Option<String>,
}

impl Verdict {
    /// Creates a clean verdict.
    pub fn clean() -> Self {
        Self {
            status: VerdictStatus::Clean,
            raw_note: None,
        }
    }

    /// Creates an infected verdict with the given threat names.
    ///
    /// Empty names are dropped; at least one non-empty name is required,
    /// otherwise the verdict degrades to a single `"Unknown"` entry rather
    /// than an unrepresentable infected-with-no-names state.
    pub fn infected(threats: Vec<String>) -> Self {
        let mut threats: Vec<String> = threats
            .into_iter()
            .filter(|t| !t.trim().is_empty())
            .collect();
        if threats.is_empty() {
            threats.push("Unknown".to_string());
        }
        Self {
            status: VerdictStatus::Infected { threats },
            raw_note: None,
        }
    }

    /// Attaches the engine's raw response text.
    pub fn with_raw_note(mut self, note: impl Into<String>) -> Self {
        self.raw_note = Some(note.into());
        self
    }

    /// Returns `true` if no threats were detected.
    pub fn is_clean(&self) -> bool {
        matches!(self.status, VerdictStatus::Clean)
    }

    /// Returns `true` if at least one threat was detected.
    pub fn is_infected(&self) -> bool {
        matches!(self.status, VerdictStatus::Infected { .. })
    }

    /// Returns the detected threat names, empty for a clean verdict.
    pub fn threats(&self) -> &[String] {
        match &self.status {
            VerdictStatus::Clean => &[],
            VerdictStatus::Infected { threats } => threats,
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.status {
            VerdictStatus::Clean => write!(f, "clean"),
            VerdictStatus::Infected { threats } => {
                write!(f, "infected: {}", threats.join(", "))
            }
        }
    }
}

/// Content digests of one scanned byte sequence, lowercase hex.
///
/// All three digests are computed in a single pass over the same bytes that
/// were delivered to the scanner, so truncation affects them identically.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Digests {
    /// MD5 digest (legacy interop with external threat databases).
    pub md5: String,

    /// SHA-1 digest.
    pub sha1: String,

    /// SHA-256 digest, the primary content identity.
    pub sha256: String,
}

impl Digests {
    /// Returns the primary digest (SHA-256).
    pub fn primary(&self) -> &str {
        &self.sha256
    }
}

impl fmt::Display for Digests {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sha256:{}", self.sha256)
    }
}

/// Context about the client that submitted a file for scanning.
///
/// Carried onto the scan record for audit; all fields are optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientContext {
    /// Client IP address as reported by the caller.
    pub client_ip: Option<String>,

    /// User agent string, if any.
    pub user_agent: Option<String>,

    /// Request or correlation ID for tracing.
    pub request_id: Option<String>,
}

impl ClientContext {
    /// Creates an empty client context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the client IP.
    pub fn with_client_ip(mut self, ip: impl Into<String>) -> Self {
        self.client_ip = Some(ip.into());
        self
    }

    /// Sets the user agent.
    pub fn with_user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = Some(agent.into());
        self
    }

    /// Sets the request ID.
    pub fn with_request_id(mut self, id: impl Into<String>) -> Self {
        self.request_id = Some(id.into());
        self
    }
}

/// The write-once provenance record of one completed scan.
///
/// Created only after the verdict is final; never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanRecord {
    /// Unique identifier for this record.
    pub id: String,

    /// Original filename as declared by the caller.
    pub filename: String,

    /// Number of bytes actually spooled and scanned.
    pub byte_length: u64,

    /// Content digests of the scanned bytes.
    pub digests: Digests,

    /// The final verdict.
    pub verdict: Verdict,

    /// Name of the transport/engine that produced the verdict.
    pub engine: String,

    /// When the scan completed.
    pub scanned_at: DateTime<Utc>,

    /// Context about the submitting client.
    pub client: ClientContext,
}

impl ScanRecord {
    /// Creates a new record with a fresh ID and the current timestamp.
    pub fn new(
        filename: impl Into<String>,
        byte_length: u64,
        digests: Digests,
        verdict: Verdict,
        engine: impl Into<String>,
        client: ClientContext,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            filename: filename.into(),
            byte_length,
            digests,
            verdict,
            engine: engine.into(),
            scanned_at: Utc::now(),
            client,
        }
    }

    /// Returns `true` if the verdict is infected.
    pub fn is_infected(&self) -> bool {
        self.verdict.is_infected()
    }
}

/// Identity and size of one signature database, as reported by the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseStatus {
    /// Database file name, e.g. `main.cvd` or `daily.cld`.
    pub name: String,

    /// Database version number, if reported.
    pub version: Option<u32>,

    /// Number of signatures in this database.
    pub signature_count: u64,

    /// Last update time of this database, if reported.
    pub last_update: Option<DateTime<Utc>>,
}

/// A point-in-time observation of the engine's signature-database state.
///
/// When the engine reports a per-database breakdown, `total_signatures` is
/// the sum of the per-database counts. When it reports neither a breakdown
/// nor an aggregate, the total is `None` rather than an invented figure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignatureSnapshot {
    /// Engine version string, e.g. `ClamAV 1.2.1`.
    pub engine_version: Option<String>,

    /// Per-database breakdown; empty when the engine reports none.
    pub databases: Vec<DatabaseStatus>,

    /// Total signature count across all databases, if known.
    pub total_signatures: Option<u64>,

    /// When this snapshot was taken.
    pub observed_at: DateTime<Utc>,
}

impl SignatureSnapshot {
    /// Builds a snapshot from a per-database breakdown.
    ///
    /// The total is the sum of per-database counts, or `None` when the
    /// breakdown is empty.
    pub fn from_databases(engine_version: Option<String>, databases: Vec<DatabaseStatus>) -> Self {
        let total_signatures = if databases.is_empty() {
            None
        } else {
            Some(databases.iter().map(|d| d.signature_count).sum())
        };
        Self {
            engine_version,
            databases,
            total_signatures,
            observed_at: Utc::now(),
        }
    }

    /// Builds an aggregate-only snapshot, for engines that report a total
    /// without a per-database breakdown.
    pub fn aggregate_only(engine_version: Option<String>, total_signatures: u64) -> Self {
        Self {
            engine_version,
            databases: Vec::new(),
            total_signatures: Some(total_signatures),
            observed_at: Utc::now(),
        }
    }
}

/// Outcome of one signature update cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UpdateStatus {
    /// The update mechanism reported success.
    Success,
    /// The update mechanism failed; the event is still recorded.
    Failed,
}

impl fmt::Display for UpdateStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success => write!(f, "success"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// One completed signature update cycle, bounded by before/after snapshots.
///
/// Events are append-only history: created once per trigger, never edited.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateEvent {
    /// Unique identifier for this event.
    pub id: String,

    /// Whether the update mechanism succeeded.
    pub status: UpdateStatus,

    /// Updater output tail on success, failure description otherwise.
    pub detail: String,

    /// Signature state before the update ran.
    pub before: SignatureSnapshot,

    /// Signature state after the update ran, regardless of outcome.
    pub after: SignatureSnapshot,

    /// Signatures gained across the cycle, when both totals are known.
    pub new_signatures: Option<u64>,

    /// When the cycle completed.
    pub observed_at: DateTime<Utc>,
}

impl UpdateEvent {
    /// Creates a new event with a fresh ID and the current timestamp.
    pub fn new(
        status: UpdateStatus,
        detail: impl Into<String>,
        before: SignatureSnapshot,
        after: SignatureSnapshot,
    ) -> Self {
        let new_signatures = match (before.total_signatures, after.total_signatures) {
            (Some(b), Some(a)) => Some(a.saturating_sub(b)),
            _ => None,
        };
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            status,
            detail: detail.into(),
            before,
            after,
            new_signatures,
            observed_at: Utc::now(),
        }
    }
}

/// How bytes are delivered to the scanning engine.
///
/// Process-wide configuration selected at startup (or by availability
/// probing); read-only during steady-state operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportMode {
    /// Streaming scan over a persistent socket to a long-running daemon.
    Daemon,
    /// Invoking a local scanner executable against a file path.
    LocalProcess,
}

impl fmt::Display for TransportMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Daemon => write!(f, "daemon"),
            Self::LocalProcess => write!(f, "local-process"),
        }
    }
}
