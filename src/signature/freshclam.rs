//! Signature update execution via the `freshclam` tool.
//!
//! `freshclam --check` reports per-database state on lines like
//! `daily.cld database is up to date (version: 27500, sigs: 2059934,
//! f-level: 90, builder: raynman)`. A plain invocation downloads fresh
//! databases. Both are one-shot subprocesses with a hard client-side
//! time budget, in the same manner as the local-process scan transport.

use crate::core::error::{Result, ScanError};
use crate::core::types::DatabaseStatus;

use async_trait::async_trait;
use std::fmt::Debug;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use tokio::process::Command;

const DEFAULT_UPDATE_TIMEOUT: Duration = Duration::from_secs(120);

/// How much process output is kept in results and errors.
const OUTPUT_TAIL: usize = 2000;

/// Source of signature-database state and updates.
///
/// The production implementation is [`FreshclamUpdater`]; tests substitute
/// their own.
#[async_trait]
pub trait SignatureUpdater: Send + Sync + Debug {
    /// Reports the current per-database breakdown.
    ///
    /// An empty vector means the tool reported no recognizable breakdown,
    /// not that zero databases exist.
    async fn check(&self) -> Result<Vec<DatabaseStatus>>;

    /// Runs one update cycle, returning the tool's output tail.
    async fn update(&self) -> Result<String>;
}

/// An arc-wrapped updater for shared ownership.
pub type ArcUpdater = Arc<dyn SignatureUpdater>;

/// Configuration for [`FreshclamUpdater`].
#[derive(Debug, Clone)]
pub struct UpdaterConfig {
    /// Updater executable name or path.
    pub command: String,

    /// Arguments for a status check without downloading.
    pub check_args: Vec<String>,

    /// Arguments for a real update run.
    pub update_args: Vec<String>,

    /// Budget for one tool invocation.
    pub timeout: Duration,
}

impl Default for UpdaterConfig {
    fn default() -> Self {
        Self {
            command: "freshclam".to_string(),
            check_args: vec!["--check".to_string()],
            update_args: vec!["--stdout".to_string()],
            timeout: DEFAULT_UPDATE_TIMEOUT,
        }
    }
}

impl UpdaterConfig {
    /// Creates a config with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the executable name or path.
    pub fn with_command(mut self, command: impl Into<String>) -> Self {
        self.command = command.into();
        self
    }

    /// Sets the status-check arguments.
    pub fn with_check_args(mut self, args: Vec<String>) -> Self {
        self.check_args = args;
        self
    }

    /// Sets the update-run arguments.
    pub fn with_update_args(mut self, args: Vec<String>) -> Self {
        self.update_args = args;
        self
    }

    /// Sets the per-invocation time budget.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Runs `freshclam` as a subprocess for checks and updates.
#[derive(Debug)]
pub struct FreshclamUpdater {
    config: UpdaterConfig,
}

impl FreshclamUpdater {
    /// Creates an updater with the given configuration.
    pub fn new(config: UpdaterConfig) -> Self {
        Self { config }
    }

    /// Runs the tool with `args`, enforcing the configured time budget.
    async fn run(&self, args: &[String]) -> Result<String> {
        let child = Command::new(&self.config.command)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output();

        let output = tokio::time::timeout(self.config.timeout, child)
            .await
            .map_err(|_| ScanError::timeout(self.config.timeout))?
            .map_err(|err| {
                ScanError::execution(
                    format!("failed to run {}: {err}", self.config.command),
                    None,
                )
            })?;

        let combined = combined_output(&output.stdout, &output.stderr);
        if output.status.success() {
            Ok(tail(&combined, OUTPUT_TAIL).to_string())
        } else {
            Err(ScanError::execution(
                tail(&combined, OUTPUT_TAIL),
                output.status.code(),
            ))
        }
    }
}

#[async_trait]
impl SignatureUpdater for FreshclamUpdater {
    async fn check(&self) -> Result<Vec<DatabaseStatus>> {
        let output = self.run(&self.config.check_args).await?;
        Ok(parse_check_output(&output))
    }

    async fn update(&self) -> Result<String> {
        self.run(&self.config.update_args).await
    }
}

/// Extracts per-database state from `freshclam --check` output.
///
/// Lines without a recognizable `<name> database ... sigs: <n>` shape are
/// skipped; no figures are ever invented for them.
pub(crate) fn parse_check_output(output: &str) -> Vec<DatabaseStatus> {
    output
        .lines()
        .filter_map(|line| {
            let (name, rest) = line.trim().split_once(" database ")?;
            let signature_count = number_after(rest, "sigs: ")?;
            Some(DatabaseStatus {
                name: name.trim().to_string(),
                version: number_after(rest, "version: ").map(|v| v as u32),
                signature_count,
                last_update: None,
            })
        })
        .collect()
}

/// Parses the unsigned number directly following `key` in `text`.
fn number_after(text: &str, key: &str) -> Option<u64> {
    let start = text.find(key)? + key.len();
    let digits: String = text[start..]
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse().ok()
}

fn combined_output(stdout: &[u8], stderr: &[u8]) -> String {
    let stdout = String::from_utf8_lossy(stdout);
    let stderr = String::from_utf8_lossy(stderr);
    if stderr.trim().is_empty() {
        stdout.into_owned()
    } else if stdout.trim().is_empty() {
        stderr.into_owned()
    } else {
        format!("{stdout}\n{stderr}")
    }
}

fn tail(text: &str, max: usize) -> &str {
    let trimmed = text.trim();
    match trimmed.char_indices().nth_back(max.saturating_sub(1)) {
        Some((idx, _)) => &trimmed[idx..],
        None => trimmed,
    }
}
