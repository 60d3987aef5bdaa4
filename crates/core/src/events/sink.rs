//! Error sink trait and implementations.

use std::sync::{Arc, Mutex};

use log::error;

use crate::errors::Error;

/// Receives user-visible failures of the update cycle.
///
/// # Design Rules
///
/// - `report()` must return quickly; implementations that talk to the
///   network dispatch in the background
/// - Failure to report must not affect the caller
pub trait ErrorSink: Send + Sync {
    /// Report a single failure.
    fn report(&self, error: &Error);
}

/// Writes every report to the log.
#[derive(Clone, Default)]
pub struct LogSink;

impl ErrorSink for LogSink {
    fn report(&self, err: &Error) {
        error!("{err}");
    }
}

/// Forwards every report to several sinks.
#[derive(Clone, Default)]
pub struct CompositeSink {
    sinks: Vec<Arc<dyn ErrorSink>>,
}

impl CompositeSink {
    pub fn new(sinks: Vec<Arc<dyn ErrorSink>>) -> Self {
        Self { sinks }
    }
}

impl ErrorSink for CompositeSink {
    fn report(&self, err: &Error) {
        for sink in &self.sinks {
            sink.report(err);
        }
    }
}

/// Mock sink for testing - collects reported messages.
#[derive(Clone, Default)]
pub struct MockErrorSink {
    messages: Arc<Mutex<Vec<String>>>,
}

impl MockErrorSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns all collected messages.
    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().unwrap().clone()
    }

    /// Returns true if some message contains `needle`.
    pub fn contains(&self, needle: &str) -> bool {
        self.messages
            .lock()
            .unwrap()
            .iter()
            .any(|message| message.contains(needle))
    }

    /// Returns the number of collected messages.
    pub fn len(&self) -> usize {
        self.messages.lock().unwrap().len()
    }

    /// Returns true if nothing has been reported.
    pub fn is_empty(&self) -> bool {
        self.messages.lock().unwrap().is_empty()
    }
}

impl ErrorSink for MockErrorSink {
    fn report(&self, err: &Error) {
        self.messages.lock().unwrap().push(err.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_composite_sink_fans_out() {
        let first = MockErrorSink::new();
        let second = MockErrorSink::new();
        let sink = CompositeSink::new(vec![Arc::new(first.clone()), Arc::new(second.clone())]);

        sink.report(&Error::Parse("bad csv".to_string()).within("data/status/status"));

        assert_eq!(first.len(), 1);
        assert!(second.contains("data/status/status"));
    }
}
