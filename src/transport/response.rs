//! Shared parsing of the engine's textual scan output.
//!
//! Both the daemon and the local-process transports speak the same response
//! grammar: one line per scanned object, ending in `OK` for clean or
//! `<name> FOUND` for a detection. Archive inputs can yield several `FOUND`
//! lines; all of them are collected.

use crate::core::error::{Result, ScanError};
use crate::core::types::Verdict;

/// Parses engine output into a verdict.
///
/// Rules, applied per non-empty line:
/// - a line containing `FOUND` contributes a threat name: the substring
///   between the last `:` and the `FOUND` token, trimmed;
/// - a line whose last token is `OK` marks the object clean;
/// - a line containing `ERROR` marks the response as a protocol violation.
///
/// Any `FOUND` wins over `OK` (an archive can contain both). Output with
/// neither verdict token is a protocol violation, never a guessed verdict.
pub(crate) fn parse_engine_response(response: &str) -> Result<Verdict> {
    let trimmed = response.trim();
    if trimmed.is_empty() {
        return Err(ScanError::protocol("empty response from engine"));
    }

    let mut threats = Vec::new();
    let mut saw_ok = false;
    let mut error_line: Option<&str> = None;

    for line in trimmed.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line.contains("FOUND") {
            threats.push(extract_threat_name(line));
        } else if line.split_whitespace().next_back() == Some("OK") {
            saw_ok = true;
        } else if line.contains("ERROR") {
            error_line.get_or_insert(line);
        }
    }

    if !threats.is_empty() {
        return Ok(Verdict::infected(threats).with_raw_note(trimmed));
    }
    if let Some(line) = error_line {
        return Err(ScanError::protocol(format!("engine reported: {line}")));
    }
    if saw_ok {
        return Ok(Verdict::clean().with_raw_note(trimmed));
    }
    Err(ScanError::protocol(format!(
        "unrecognized engine response: {trimmed}"
    )))
}

/// Extracts the threat name from a line like
/// `stream: Eicar-Test-Signature FOUND`.
fn extract_threat_name(line: &str) -> String {
    let before_found = match line.rfind("FOUND") {
        Some(idx) => &line[..idx],
        None => line,
    };
    let name = match before_found.rfind(':') {
        Some(idx) => &before_found[idx + 1..],
        None => before_found,
    };
    name.trim().to_string()
}
