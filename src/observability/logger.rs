//! Structured JSON logger for the WAL and recovery subsystems
//!
//! - One log line = one event
//! - `event` first, then `severity`, then fields sorted by key
//! - Synchronous, no buffering
//! - INFO and below go to stdout, WARN and above to stderr

use std::fmt;
use std::io::{self, Write};

/// Log severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    /// Fine-grained detail (per record)
    Trace = 0,
    /// Normal operations
    Info = 1,
    /// Recoverable issues, e.g. a skipped log line
    Warn = 2,
    /// Operation failures reported to the caller
    Error = 3,
    /// Unrecoverable
    Fatal = 4,
}

impl Severity {
    /// Returns the string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Trace => "TRACE",
            Severity::Info => "INFO",
            Severity::Warn => "WARN",
            Severity::Error => "ERROR",
            Severity::Fatal => "FATAL",
        }
    }

    fn to_stderr(self) -> bool {
        self >= Severity::Warn
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Stateless structured logger.
///
/// ```ignore
/// Logger::info("WAL_FLUSH", &[("records", "4"), ("mode", "forced")]);
/// ```
pub struct Logger;

impl Logger {
    /// Log an event with the given severity and fields
    pub fn log(severity: Severity, event: &str, fields: &[(&str, &str)]) {
        let line = Self::render(severity, event, fields);
        if severity.to_stderr() {
            Self::emit(&line, &mut io::stderr());
        } else {
            Self::emit(&line, &mut io::stdout());
        }
    }

    fn emit<W: Write>(line: &str, writer: &mut W) {
        // Logging must never fail the operation being logged.
        let _ = writer.write_all(line.as_bytes());
        let _ = writer.flush();
    }

    /// Render one event as a single JSON line (trailing newline included)
    pub(crate) fn render(severity: Severity, event: &str, fields: &[(&str, &str)]) -> String {
        let mut out = String::with_capacity(128);
        out.push_str("{\"event\":\"");
        escape_into(&mut out, event);
        out.push_str("\",\"severity\":\"");
        out.push_str(severity.as_str());
        out.push('"');

        let mut sorted: Vec<&(&str, &str)> = fields.iter().collect();
        sorted.sort_by_key(|(k, _)| *k);

        for (key, value) in sorted {
            out.push_str(",\"");
            escape_into(&mut out, key);
            out.push_str("\":\"");
            escape_into(&mut out, value);
            out.push('"');
        }

        out.push_str("}\n");
        out
    }

    /// Log at TRACE level
    pub fn trace(event: &str, fields: &[(&str, &str)]) {
        Self::log(Severity::Trace, event, fields);
    }

    /// Log at INFO level
    pub fn info(event: &str, fields: &[(&str, &str)]) {
        Self::log(Severity::Info, event, fields);
    }

    /// Log at WARN level
    pub fn warn(event: &str, fields: &[(&str, &str)]) {
        Self::log(Severity::Warn, event, fields);
    }

    /// Log at ERROR level
    pub fn error(event: &str, fields: &[(&str, &str)]) {
        Self::log(Severity::Error, event, fields);
    }

    /// Log at FATAL level
    pub fn fatal(event: &str, fields: &[(&str, &str)]) {
        Self::log(Severity::Fatal, event, fields);
    }
}

fn escape_into(out: &mut String, s: &str) {
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c.is_control() => out.push_str(&format!("\\u{:04x}", c as u32)),
            c => out.push(c),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_ordering() {
        assert!(Severity::Trace < Severity::Info);
        assert!(Severity::Info < Severity::Warn);
        assert!(Severity::Warn < Severity::Error);
        assert!(Severity::Error < Severity::Fatal);
    }

    #[test]
    fn test_warn_and_above_go_to_stderr() {
        assert!(!Severity::Info.to_stderr());
        assert!(Severity::Warn.to_stderr());
        assert!(Severity::Fatal.to_stderr());
    }

    #[test]
    fn test_render_is_valid_json() {
        let line = Logger::render(Severity::Warn, "WAL_LINE_SKIPPED", &[("line", "7")]);
        let parsed: serde_json::Value = serde_json::from_str(&line).unwrap();
        assert_eq!(parsed["event"], "WAL_LINE_SKIPPED");
        assert_eq!(parsed["severity"], "WARN");
        assert_eq!(parsed["line"], "7");
    }

    #[test]
    fn test_render_sorts_fields() {
        let a = Logger::render(Severity::Info, "E", &[("zeta", "1"), ("alpha", "2")]);
        let b = Logger::render(Severity::Info, "E", &[("alpha", "2"), ("zeta", "1")]);
        assert_eq!(a, b);
        assert!(a.find("alpha").unwrap() < a.find("zeta").unwrap());
    }

    #[test]
    fn test_render_escapes_statement_text() {
        let stmt = "UPDATE t SET name='a \"b\"'\nWHERE id=1;";
        let line = Logger::render(Severity::Info, "E", &[("statement", stmt)]);
        assert_eq!(line.matches('\n').count(), 1);
        let parsed: serde_json::Value = serde_json::from_str(&line).unwrap();
        assert_eq!(parsed["statement"], stmt);
    }
}
