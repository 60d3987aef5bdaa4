//! Reporting of update failures.

mod sink;

pub use sink::{CompositeSink, ErrorSink, LogSink, MockErrorSink};

use log::warn;

use crate::errors::Error;

/// Logs a failure of an update step and hands it to the sink.
pub fn warn_and_report(sink: &dyn ErrorSink, err: &Error) {
    warn!("{err}");
    sink.report(err);
}
