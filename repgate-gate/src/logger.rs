//! Logging abstraction for the gate.
//!
//! The gate runs under a process supervisor with no interactive error
//! channel, so diagnostics are (severity, message) pairs handed to an
//! injected logging sink. A trait keeps components free of global logger
//! state and lets tests capture output deterministically.

use std::io::Write;
use std::sync::{Arc, RwLock};

/// Severity of a diagnostic message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Info,
    Warning,
    Error,
}

impl Severity {
    /// Label used when formatting a message.
    pub fn label(self) -> &'static str {
        match self {
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Error => "error",
        }
    }
}

/// Trait for the diagnostic logging sink.
///
/// Implementations must be thread-safe: the forked delay worker logs from
/// its own process image, and mocks are shared across test threads.
pub trait Logger: Send + Sync {
    /// Log a message at the given severity.
    fn log(&self, severity: Severity, message: &str);

    /// Log a fatal or otherwise unrecoverable condition.
    fn error(&self, message: &str) {
        self.log(Severity::Error, message);
    }

    /// Log a condition the instance survives with degraded behavior.
    fn warn(&self, message: &str) {
        self.log(Severity::Warning, message);
    }

    /// Log normal progress.
    fn info(&self, message: &str) {
        self.log(Severity::Info, message);
    }
}

/// Logger that writes to stderr, tagged with the process id.
///
/// Under inetd the descriptors 0/1 belong to the connection; stderr is the
/// only stream safe to write diagnostics to.
#[derive(Debug, Default, Clone, Copy)]
pub struct StderrLogger;

impl StderrLogger {
    /// Create a new stderr logger.
    pub fn new() -> Self {
        Self
    }
}

impl Logger for StderrLogger {
    fn log(&self, severity: Severity, message: &str) {
        let _ = writeln!(
            std::io::stderr(),
            "repgate[{}]: {}: {}",
            std::process::id(),
            severity.label(),
            message
        );
    }
}

/// A captured log entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub severity: Severity,
    pub message: String,
}

/// Mock logger for testing that captures all messages.
#[derive(Debug, Clone, Default)]
pub struct MockLogger {
    entries: Arc<RwLock<Vec<LogEntry>>>,
}

impl MockLogger {
    /// Create a new capturing logger.
    pub fn new() -> Self {
        Self::default()
    }

    /// All captured entries.
    pub fn entries(&self) -> Vec<LogEntry> {
        self.entries.read().unwrap().clone()
    }

    /// All captured message texts.
    pub fn messages(&self) -> Vec<String> {
        self.entries().iter().map(|e| e.message.clone()).collect()
    }

    /// Messages at a specific severity.
    pub fn messages_at(&self, severity: Severity) -> Vec<String> {
        self.entries()
            .iter()
            .filter(|e| e.severity == severity)
            .map(|e| e.message.clone())
            .collect()
    }

    /// Whether any captured message contains the substring.
    pub fn contains(&self, substring: &str) -> bool {
        self.messages().iter().any(|m| m.contains(substring))
    }

    /// Number of captured messages.
    pub fn count(&self) -> usize {
        self.entries.read().unwrap().len()
    }
}

impl Logger for MockLogger {
    fn log(&self, severity: Severity, message: &str) {
        self.entries.write().unwrap().push(LogEntry {
            severity,
            message: message.to_string(),
        });
    }
}

/// A no-op logger that discards all messages.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullLogger;

impl NullLogger {
    /// Create a new null logger.
    pub fn new() -> Self {
        Self
    }
}

impl Logger for NullLogger {
    fn log(&self, _severity: Severity, _message: &str) {
        // Discard
    }
}
