//! Side channel for delivery failures.
//!
//! [`ShippingHandler`](crate::handler::ShippingHandler) never surfaces a
//! delivery failure to the code that emitted the record. Instead it hands the
//! failure to an [`ErrorReporter`]. The default [`LogReporter`] writes through
//! the `log` facade and rate limits the refused-connection diagnostic, which
//! otherwise fires once per record while a collector is down.

use std::time::Duration;

use log::warn;

use crate::error::DeliveryError;
use crate::log_record::LogRecord;
use crate::rate_limited_warner::{DEFAULT_WARN_INTERVAL, RateLimitedWarner};

/// Receives failures that were caught at the transport boundary.
pub trait ErrorReporter: Send + Sync {
    /// The collector refused the connection; `record` has been dropped.
    fn connection_refused(&self, record: &LogRecord, err: &DeliveryError);

    /// Any other delivery failure.
    fn delivery_failed(&self, record: &LogRecord, err: &DeliveryError);
}

/// Reporter writing diagnostics through the `log` facade.
#[derive(Debug)]
pub struct LogReporter {
    refused: RateLimitedWarner,
}

impl LogReporter {
    pub fn new(warn_interval: Duration) -> Self {
        Self {
            refused: RateLimitedWarner::new(warn_interval),
        }
    }
}

impl Default for LogReporter {
    fn default() -> Self {
        Self::new(DEFAULT_WARN_INTERVAL)
    }
}

impl ErrorReporter for LogReporter {
    fn connection_refused(&self, record: &LogRecord, err: &DeliveryError) {
        self.refused.record_drop();
        self.refused.warn_if_due(|count| {
            warn!(
                "logship: message from {} - {err}; dropped {count} records",
                record.name
            );
        });
    }

    fn delivery_failed(&self, record: &LogRecord, err: &DeliveryError) {
        warn!("logship: failed to deliver record from {}: {err}", record.name);
    }
}

/// Reporter that discards everything.
#[derive(Clone, Copy, Debug, Default)]
pub struct SilentReporter;

impl ErrorReporter for SilentReporter {
    fn connection_refused(&self, _record: &LogRecord, _err: &DeliveryError) {}

    fn delivery_failed(&self, _record: &LogRecord, _err: &DeliveryError) {}
}

impl<F> ErrorReporter for F
where
    F: Fn(&LogRecord, &DeliveryError) + Send + Sync,
{
    fn connection_refused(&self, record: &LogRecord, err: &DeliveryError) {
        self(record, err);
    }

    fn delivery_failed(&self, record: &LogRecord, err: &DeliveryError) {
        self(record, err);
    }
}
