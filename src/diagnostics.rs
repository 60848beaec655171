//! Injectable diagnostic sink.
//!
//! The hub reports everything it wants an operator to see through
//! [`Diagnostics`]. Without a sink the reports are dropped; the binary
//! installs [`TracingSink`], which forwards to `tracing`.

use std::error::Error;
use std::fmt;
use std::sync::Arc;

/// Severity of a diagnostic report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Severity {
    /// Very fine grained tracing.
    Trace,
    /// Lifecycle chatter useful while debugging.
    Debug,
    /// Normal operational events.
    Info,
    /// Something unexpected that the hub recovered from.
    Warn,
    /// A failed operation.
    Error,
    /// A failure the host should treat as unrecoverable.
    Fatal,
    /// Reported regardless of filtering.
    Always,
}

impl Severity {
    /// Lowercase name of the severity.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
            Self::Fatal => "fatal",
            Self::Always => "always",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Receiver of diagnostic reports.
///
/// Implementations must not block for long: reports are emitted inline on
/// the send and publish paths.
pub trait DiagnosticSink: Send + Sync {
    /// Records one report with an optional fault.
    fn report(&self, severity: Severity, message: &str, fault: Option<&(dyn Error + 'static)>);
}

/// Optional handle to a [`DiagnosticSink`], cheap to clone.
#[derive(Clone, Default)]
pub struct Diagnostics {
    sink: Option<Arc<dyn DiagnosticSink>>,
}

impl fmt::Debug for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Diagnostics")
            .field("sink", &self.sink.is_some())
            .finish()
    }
}

impl Diagnostics {
    /// Diagnostics that forward to `sink`.
    #[must_use]
    pub fn new(sink: Arc<dyn DiagnosticSink>) -> Self {
        Self { sink: Some(sink) }
    }

    /// Diagnostics that drop every report.
    #[must_use]
    pub fn disabled() -> Self {
        Self { sink: None }
    }

    /// Returns `true` if a sink is installed.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.sink.is_some()
    }

    /// Forwards a report to the sink, if any.
    pub fn report(&self, severity: Severity, message: &str, fault: Option<&(dyn Error + 'static)>) {
        if let Some(sink) = &self.sink {
            sink.report(severity, message, fault);
        }
    }

    /// Reports at [`Severity::Trace`].
    pub fn trace(&self, message: &str) {
        self.report(Severity::Trace, message, None);
    }

    /// Reports at [`Severity::Debug`].
    pub fn debug(&self, message: &str) {
        self.report(Severity::Debug, message, None);
    }

    /// Reports at [`Severity::Info`].
    pub fn info(&self, message: &str) {
        self.report(Severity::Info, message, None);
    }

    /// Reports at [`Severity::Warn`].
    pub fn warn(&self, message: &str, fault: Option<&(dyn Error + 'static)>) {
        self.report(Severity::Warn, message, fault);
    }

    /// Reports at [`Severity::Error`].
    pub fn error(&self, message: &str, fault: Option<&(dyn Error + 'static)>) {
        self.report(Severity::Error, message, fault);
    }

    /// Reports at [`Severity::Fatal`].
    pub fn fatal(&self, message: &str, fault: Option<&(dyn Error + 'static)>) {
        self.report(Severity::Fatal, message, fault);
    }

    /// Reports at [`Severity::Always`], for lines that should survive any
    /// filtering.
    pub fn always(&self, message: &str) {
        self.report(Severity::Always, message, None);
    }
}

/// [`DiagnosticSink`] backed by `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
    fn report(&self, severity: Severity, message: &str, fault: Option<&(dyn Error + 'static)>) {
        let error = fault.map(|e| e.to_string());
        match severity {
            Severity::Trace => tracing::trace!(error, "{message}"),
            Severity::Debug => tracing::debug!(error, "{message}"),
            Severity::Info => tracing::info!(error, "{message}"),
            Severity::Warn => tracing::warn!(error, "{message}"),
            Severity::Error => tracing::error!(error, "{message}"),
            Severity::Fatal => tracing::error!(fatal = true, error, "{message}"),
            Severity::Always => tracing::info!(always = true, error, "{message}"),
        }
    }
}
