//! Handler traits tying transports to the emitting application.

use std::sync::Arc;

use crate::error::{DeliveryError, FailureKind};
use crate::log_record::LogRecord;
use crate::reporter::{ErrorReporter, LogReporter};

/// Delivers one record per call over a fresh connection.
///
/// Implementations run on the caller's thread and return every failure to
/// the caller instead of handling it.
pub trait Transport: Send + Sync {
    fn deliver(&self, record: &LogRecord) -> Result<(), DeliveryError>;
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn deliver(&self, record: &LogRecord) -> Result<(), DeliveryError> {
        (**self).deliver(record)
    }
}

impl<T: Transport + ?Sized> Transport for Arc<T> {
    fn deliver(&self, record: &LogRecord) -> Result<(), DeliveryError> {
        (**self).deliver(record)
    }
}

/// What happened to a record handed to [`RecordHandler::handle`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DeliveryOutcome {
    Delivered,
    /// Dropped because the collector refused the connection.
    Refused,
    /// Dropped after a failure was reported.
    Failed,
}

/// Trait implemented by all record handlers.
///
/// `handle` must never panic on delivery failure; failures are reported
/// out of band and summarised in the returned [`DeliveryOutcome`].
pub trait RecordHandler: Send + Sync {
    fn handle(&self, record: &LogRecord) -> DeliveryOutcome;
}

/// Pairs a [`Transport`] with the [`ErrorReporter`] receiving its failures.
pub struct ShippingHandler<T> {
    transport: T,
    reporter: Arc<dyn ErrorReporter>,
}

impl<T: Transport> ShippingHandler<T> {
    /// Wrap `transport`, reporting failures through [`LogReporter`].
    pub fn new(transport: T) -> Self {
        Self::with_reporter(transport, Arc::new(LogReporter::default()))
    }

    pub fn with_reporter(transport: T, reporter: Arc<dyn ErrorReporter>) -> Self {
        Self {
            transport,
            reporter,
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Deliver `record`, routing any failure to the reporter.
    pub fn emit(&self, record: &LogRecord) -> DeliveryOutcome {
        match self.transport.deliver(record) {
            Ok(()) => DeliveryOutcome::Delivered,
            Err(err) => match err.kind() {
                FailureKind::ConnectionRefused => {
                    self.reporter.connection_refused(record, &err);
                    DeliveryOutcome::Refused
                }
                FailureKind::Transport => {
                    self.reporter.delivery_failed(record, &err);
                    DeliveryOutcome::Failed
                }
            },
        }
    }
}

impl<T: Transport> RecordHandler for ShippingHandler<T> {
    fn handle(&self, record: &LogRecord) -> DeliveryOutcome {
        self.emit(record)
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for ShippingHandler<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShippingHandler")
            .field("transport", &self.transport)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Stage;
    use crate::level::LogLevel;
    use parking_lot::Mutex;
    use rstest::rstest;
    use std::io;

    struct Scripted(fn() -> Result<(), DeliveryError>);

    impl Transport for Scripted {
        fn deliver(&self, _record: &LogRecord) -> Result<(), DeliveryError> {
            (self.0)()
        }
    }

    #[derive(Default)]
    struct Recording {
        refused: Mutex<Vec<String>>,
        failed: Mutex<Vec<String>>,
    }

    impl ErrorReporter for Recording {
        fn connection_refused(&self, record: &LogRecord, _err: &DeliveryError) {
            self.refused.lock().push(record.name.clone());
        }

        fn delivery_failed(&self, record: &LogRecord, err: &DeliveryError) {
            self.failed.lock().push(format!("{}: {err}", record.name));
        }
    }

    fn emit_with(script: fn() -> Result<(), DeliveryError>) -> (DeliveryOutcome, Arc<Recording>) {
        let reporter = Arc::new(Recording::default());
        let handler = ShippingHandler::with_reporter(Scripted(script), reporter.clone());
        let outcome = handler.emit(&LogRecord::new("svc", LogLevel::Info, "hi"));
        (outcome, reporter)
    }

    #[rstest]
    fn successful_delivery_reports_nothing() {
        let (outcome, reporter) = emit_with(|| Ok(()));
        assert_eq!(outcome, DeliveryOutcome::Delivered);
        assert!(reporter.refused.lock().is_empty());
        assert!(reporter.failed.lock().is_empty());
    }

    #[rstest]
    fn refusal_goes_to_diagnostic_channel() {
        let (outcome, reporter) = emit_with(|| {
            Err(DeliveryError::ConnectionRefused {
                endpoint: "h:1".into(),
            })
        });
        assert_eq!(outcome, DeliveryOutcome::Refused);
        assert_eq!(*reporter.refused.lock(), vec!["svc".to_string()]);
        assert!(reporter.failed.lock().is_empty());
    }

    #[rstest]
    fn other_failures_go_to_failure_reporter() {
        let (outcome, reporter) = emit_with(|| {
            Err(DeliveryError::from_io(
                "h:1",
                Stage::Write,
                io::Error::from(io::ErrorKind::ConnectionReset),
            ))
        });
        assert_eq!(outcome, DeliveryOutcome::Failed);
        assert!(reporter.refused.lock().is_empty());
        assert_eq!(reporter.failed.lock().len(), 1);
    }

    #[rstest]
    #[should_panic(expected = "transport bug")]
    fn panics_are_not_swallowed() {
        let _ = emit_with(|| panic!("transport bug"));
    }
}
