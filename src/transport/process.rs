//! Local-process fallback transport.
//!
//! Invokes a one-shot scanner executable (`clamscan`) against the spooled
//! file path. This mode exists because the daemon socket may be unreachable
//! (no socket mounted, wrong network namespace); it is slower per call but
//! needs nothing running.
//!
//! Exit-status interpretation: scanners signal "threat found" through a
//! dedicated non-zero status together with `FOUND` lines in the output.
//! That combination is a successful scan with an infected verdict, not an
//! execution failure. Any other non-zero status is an execution failure.

use crate::core::error::{Result, ScanError};
use crate::core::types::Verdict;
use crate::transport::response::parse_engine_response;
use crate::transport::ScanTransport;

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

/// The exit status scanners use for "threats found".
const FOUND_EXIT_STATUS: i32 = 1;

/// Configuration for the local-process transport.
#[derive(Debug, Clone)]
pub struct ProcessConfig {
    /// Scanner executable to invoke.
    pub command: PathBuf,

    /// Arguments passed before the target path.
    pub args: Vec<String>,

    /// Arguments that print the engine version and exit.
    pub version_args: Vec<String>,

    /// Budget for one scan invocation. Longer than the daemon budget
    /// because archive scanning through the one-shot scanner is slow.
    pub timeout: Duration,
}

impl Default for ProcessConfig {
    fn default() -> Self {
        Self {
            command: PathBuf::from("clamscan"),
            args: vec!["--no-summary".to_string()],
            version_args: vec!["--version".to_string()],
            timeout: Duration::from_secs(120),
        }
    }
}

impl ProcessConfig {
    /// Creates a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the scanner executable.
    pub fn with_command(mut self, command: impl Into<PathBuf>) -> Self {
        self.command = command.into();
        self
    }

    /// Replaces the arguments passed before the target path.
    pub fn with_args(mut self, args: Vec<String>) -> Self {
        self.args = args;
        self
    }

    /// Sets the invocation timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Fallback transport that executes a local scanner binary.
#[derive(Debug)]
pub struct ProcessTransport {
    config: ProcessConfig,
}

impl ProcessTransport {
    /// Creates a new process transport with the given configuration.
    pub fn new(config: ProcessConfig) -> Self {
        Self { config }
    }

    /// Creates a process transport with default configuration.
    pub fn with_defaults() -> Self {
        Self::new(ProcessConfig::default())
    }

    /// Runs the scanner with the given arguments, bounded by the budget.
    ///
    /// The child is killed if the future is dropped or the budget expires;
    /// the abort is purely client-side.
    async fn run(&self, args: &[String], target: Option<&Path>) -> Result<std::process::Output> {
        let mut command = Command::new(&self.config.command);
        command
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(path) = target {
            command.arg(path);
        }

        match tokio::time::timeout(self.config.timeout, command.output()).await {
            Ok(Ok(output)) => Ok(output),
            Ok(Err(err)) => Err(ScanError::execution(
                format!("failed to invoke {}: {err}", self.config.command.display()),
                None,
            )),
            Err(_) => Err(ScanError::timeout(self.config.timeout)),
        }
    }
}

/// Combines stdout and stderr into one lossy string.
fn combined_output(output: &std::process::Output) -> String {
    let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
    if !output.stderr.is_empty() {
        if !text.is_empty() && !text.ends_with('\n') {
            text.push('\n');
        }
        text.push_str(&String::from_utf8_lossy(&output.stderr));
    }
    text
}

/// Keeps error details readable when a scanner dumps pages of output.
fn tail(text: &str, max: usize) -> &str {
    let trimmed = text.trim();
    match trimmed.char_indices().nth_back(max.saturating_sub(1)) {
        Some((idx, _)) => &trimmed[idx..],
        None => trimmed,
    }
}

#[async_trait]
impl ScanTransport for ProcessTransport {
    fn name(&self) -> &str {
        "clamscan"
    }

    async fn scan_path(&self, path: &Path, size_hint: u64) -> Result<Verdict> {
        tracing::debug!(
            path = %path.display(),
            size = size_hint,
            command = %self.config.command.display(),
            "scanning spool with local process"
        );

        let output = self.run(&self.config.args, Some(path)).await?;
        let text = combined_output(&output);

        match output.status.code() {
            Some(0) => Ok(Verdict::clean().with_raw_note(text.trim())),
            Some(FOUND_EXIT_STATUS) => {
                let verdict = parse_engine_response(&text)?;
                if verdict.is_infected() {
                    Ok(verdict)
                } else {
                    // Found-status without FOUND lines is not a verdict.
                    Err(ScanError::execution(
                        format!("found-exit status without FOUND output: {}", tail(&text, 300)),
                        Some(FOUND_EXIT_STATUS),
                    ))
                }
            }
            Some(code) => Err(ScanError::execution(tail(&text, 300), Some(code))),
            None => Err(ScanError::execution("scanner terminated by signal", None)),
        }
    }

    async fn probe(&self) -> Result<()> {
        let output = self.run(&self.config.version_args, None).await?;
        if output.status.success() {
            Ok(())
        } else {
            Err(ScanError::engine_unavailable(format!(
                "{} --version exited with {:?}",
                self.config.command.display(),
                output.status.code()
            )))
        }
    }

    async fn engine_version(&self) -> Result<String> {
        let output = self.run(&self.config.version_args, None).await?;
        if !output.status.success() {
            return Err(ScanError::engine_unavailable(format!(
                "version query exited with {:?}",
                output.status.code()
            )));
        }
        let text = String::from_utf8_lossy(&output.stdout);
        let line = text.lines().next().unwrap_or("").trim();
        if line.is_empty() {
            return Err(ScanError::engine_unavailable("empty version output"));
        }
        Ok(line.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A transport whose "scanner" is a shell script; the spool path lands
    /// in `$0` of the script and is ignored.
    fn scripted(script: &str) -> ProcessTransport {
        ProcessTransport::new(
            ProcessConfig::new()
                .with_command("sh")
                .with_args(vec!["-c".to_string(), script.to_string()]),
        )
    }

    async fn spooled(content: &[u8]) -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("upload.bin");
        tokio::fs::write(&path, content).await.unwrap();
        (dir, path)
    }

    #[tokio::test]
    async fn zero_exit_is_clean() {
        let transport = scripted("echo '/tmp/upload.bin: OK'");
        let (_dir, path) = spooled(b"fine").await;
        let verdict = transport.scan_path(&path, 4).await.unwrap();
        assert!(verdict.is_clean());
    }

    #[tokio::test]
    async fn found_exit_with_found_output_is_infected() {
        let transport =
            scripted("echo '/tmp/upload.bin: Eicar-Test-Signature FOUND'; exit 1");
        let (_dir, path) = spooled(b"bad").await;
        let verdict = transport.scan_path(&path, 3).await.unwrap();
        assert!(verdict.is_infected());
        assert_eq!(verdict.threats(), &["Eicar-Test-Signature".to_string()]);
    }

    #[tokio::test]
    async fn found_exit_collects_multiple_threats() {
        let transport = scripted(
            "printf 'a.zip!x: Win.Trojan.A FOUND\\na.zip!y: Js.Dropper.B FOUND\\n'; exit 1",
        );
        let (_dir, path) = spooled(b"archive").await;
        let verdict = transport.scan_path(&path, 7).await.unwrap();
        assert_eq!(
            verdict.threats(),
            &["Win.Trojan.A".to_string(), "Js.Dropper.B".to_string()]
        );
    }

    #[tokio::test]
    async fn found_exit_without_found_output_is_execution_error() {
        let transport = scripted("echo 'something odd'; exit 1");
        let (_dir, path) = spooled(b"x").await;
        let result = transport.scan_path(&path, 1).await;
        assert!(matches!(
            result,
            Err(ScanError::Execution {
                status: Some(1),
                ..
            })
        ));
    }

    #[tokio::test]
    async fn other_exit_status_is_execution_error() {
        let transport = scripted("echo 'cannot open database' >&2; exit 2");
        let (_dir, path) = spooled(b"x").await;
        let result = transport.scan_path(&path, 1).await;
        match result {
            Err(ScanError::Execution {
                status: Some(2),
                message,
            }) => assert!(message.contains("cannot open database")),
            other => panic!("expected execution error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn missing_executable_is_execution_error() {
        let transport = ProcessTransport::new(
            ProcessConfig::new().with_command("/nonexistent/threatgate-scanner"),
        );
        let (_dir, path) = spooled(b"x").await;
        let result = transport.scan_path(&path, 1).await;
        assert!(matches!(result, Err(ScanError::Execution { .. })));
    }

    #[tokio::test]
    async fn slow_scanner_hits_timeout() {
        let transport = ProcessTransport::new(
            ProcessConfig::new()
                .with_command("sh")
                .with_args(vec!["-c".to_string(), "sleep 5".to_string()])
                .with_timeout(Duration::from_millis(100)),
        );
        let (_dir, path) = spooled(b"x").await;
        let result = transport.scan_path(&path, 1).await;
        assert!(matches!(result, Err(ScanError::Timeout { .. })));
    }

    #[test]
    fn tail_keeps_the_end() {
        assert_eq!(tail("abcdef", 3), "def");
        assert_eq!(tail("ab", 10), "ab");
    }
}
