//! Test doubles shared by the unit tests.

use std::error::Error;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::diagnostics::{DiagnosticSink, Severity};
use crate::transport::{Transport, TransportError};

/// In-memory [`Transport`] that records frames and can be told to fail.
#[derive(Debug, Default)]
pub(crate) struct MockTransport {
    sent: Mutex<Vec<String>>,
    fail_sends: AtomicBool,
    fail_close: AtomicBool,
    close_calls: AtomicUsize,
    in_flight: AtomicUsize,
    overlapped: AtomicBool,
    send_delay: Mutex<Option<Duration>>,
}

impl MockTransport {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub(crate) fn fail_sends(&self) {
        self.fail_sends.store(true, Ordering::SeqCst);
    }

    pub(crate) fn fail_close(&self) {
        self.fail_close.store(true, Ordering::SeqCst);
    }

    pub(crate) fn set_send_delay(&self, delay: Duration) {
        *self.send_delay.lock() = Some(delay);
    }

    pub(crate) fn sent(&self) -> Vec<String> {
        self.sent.lock().clone()
    }

    pub(crate) fn close_calls(&self) -> usize {
        self.close_calls.load(Ordering::SeqCst)
    }

    /// `true` if two `send_text` calls were ever in flight at once.
    pub(crate) fn overlapped(&self) -> bool {
        self.overlapped.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send_text(&self, text: &str) -> Result<(), TransportError> {
        if self.in_flight.fetch_add(1, Ordering::SeqCst) > 0 {
            self.overlapped.store(true, Ordering::SeqCst);
        }
        let delay = *self.send_delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        let result = if self.fail_sends.load(Ordering::SeqCst) {
            Err(TransportError::Send(Box::new(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                "peer went away",
            ))))
        } else {
            self.sent.lock().push(text.to_string());
            Ok(())
        };
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }

    async fn close(&self) -> Result<(), TransportError> {
        self.close_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_close.load(Ordering::SeqCst) {
            return Err(TransportError::Closed);
        }
        Ok(())
    }
}

/// One captured diagnostic report.
#[derive(Debug, Clone)]
pub(crate) struct Report {
    pub(crate) severity: Severity,
    pub(crate) message: String,
    pub(crate) fault: Option<String>,
}

/// [`DiagnosticSink`] that keeps every report in memory.
#[derive(Debug, Default)]
pub(crate) struct RecordingSink {
    reports: Mutex<Vec<Report>>,
}

impl RecordingSink {
    pub(crate) fn reports(&self) -> Vec<Report> {
        self.reports.lock().clone()
    }

    pub(crate) fn messages(&self) -> Vec<String> {
        self.reports.lock().iter().map(|r| r.message.clone()).collect()
    }

    pub(crate) fn count(&self, severity: Severity) -> usize {
        self.reports
            .lock()
            .iter()
            .filter(|r| r.severity == severity)
            .count()
    }
}

impl DiagnosticSink for RecordingSink {
    fn report(&self, severity: Severity, message: &str, fault: Option<&(dyn Error + 'static)>) {
        self.reports.lock().push(Report {
            severity,
            message: message.to_string(),
            fault: fault.map(|e| e.to_string()),
        });
    }
}
