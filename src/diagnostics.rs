//! Build logger
//!
//! Every core component receives an explicit `Arc<dyn BuildLogger>` instead of
//! reaching for a process-wide logger. `TracingLogger` forwards to `tracing`;
//! `RecordingLogger` keeps the records in memory.

use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;

/// Record severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    Debug,
    Info,
    Warn,
    Error,
    Fatal,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Severity::Debug => "debug",
            Severity::Info => "info",
            Severity::Warn => "warn",
            Severity::Error => "error",
            Severity::Fatal => "fatal",
        };
        f.write_str(label)
    }
}

/// Logging collaborator shared by the build engine, checker and pool.
///
/// Implementations must tolerate concurrent calls from worker threads.
pub trait BuildLogger: Send + Sync {
    fn log(&self, severity: Severity, message: &str);

    fn debug(&self, message: &str) {
        self.log(Severity::Debug, message);
    }

    fn info(&self, message: &str) {
        self.log(Severity::Info, message);
    }

    fn warn(&self, message: &str) {
        self.log(Severity::Warn, message);
    }

    fn error(&self, message: &str) {
        self.log(Severity::Error, message);
    }

    fn fatal(&self, message: &str) {
        self.log(Severity::Fatal, message);
    }
}

/// Forwards records to `tracing`, tagged with the component name.
#[derive(Debug, Clone)]
pub struct TracingLogger {
    component: &'static str,
}

impl TracingLogger {
    pub fn new(component: &'static str) -> Self {
        Self { component }
    }

    pub fn shared(component: &'static str) -> Arc<dyn BuildLogger> {
        Arc::new(Self::new(component))
    }
}

impl Default for TracingLogger {
    fn default() -> Self {
        Self::new("provgen")
    }
}

impl BuildLogger for TracingLogger {
    fn log(&self, severity: Severity, message: &str) {
        let component = self.component;
        match severity {
            Severity::Debug => tracing::debug!(component, "{}", message),
            Severity::Info => tracing::info!(component, "{}", message),
            Severity::Warn => tracing::warn!(component, "{}", message),
            Severity::Error => tracing::error!(component, "{}", message),
            Severity::Fatal => tracing::error!(component, fatal = true, "{}", message),
        }
    }
}

/// A captured log record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogRecord {
    pub severity: Severity,
    pub message: String,
}

/// In-memory logger, optionally chained to another logger.
#[derive(Default)]
pub struct RecordingLogger {
    records: Mutex<Vec<LogRecord>>,
    forward: Option<Arc<dyn BuildLogger>>,
}

impl RecordingLogger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record and also forward every message to `inner`.
    pub fn forwarding(inner: Arc<dyn BuildLogger>) -> Self {
        Self {
            records: Mutex::new(Vec::new()),
            forward: Some(inner),
        }
    }

    pub fn records(&self) -> Vec<LogRecord> {
        self.records.lock().clone()
    }

    pub fn count(&self, severity: Severity) -> usize {
        self.records
            .lock()
            .iter()
            .filter(|r| r.severity == severity)
            .count()
    }

    /// Messages at `severity` or above
    pub fn messages_at_least(&self, severity: Severity) -> Vec<String> {
        self.records
            .lock()
            .iter()
            .filter(|r| r.severity >= severity)
            .map(|r| r.message.clone())
            .collect()
    }

    pub fn clear(&self) {
        self.records.lock().clear();
    }
}

impl BuildLogger for RecordingLogger {
    fn log(&self, severity: Severity, message: &str) {
        self.records.lock().push(LogRecord {
            severity,
            message: message.to_string(),
        });
        if let Some(inner) = &self.forward {
            inner.log(severity, message);
        }
    }
}
