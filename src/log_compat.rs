//! Compatibility bridge for the Rust `log` crate.
//!
//! [`LogShipAdapter`] implements `log::Log` and ships every enabled record
//! through a [`RecordHandler`]. Records emitted by this crate (target prefix
//! `logship`) are never shipped, and a per-thread guard stops a handler that
//! logs while delivering from recursing into itself.

use std::borrow::Cow;
use std::cell::Cell;

use log::{LevelFilter, Metadata, Record, SetLoggerError};

use crate::handler::RecordHandler;
use crate::level::LogLevel;
use crate::log_record::{LogRecord, RecordMetadata};

const INTERNAL_TARGET: &str = "logship";

thread_local! {
    static IN_DELIVERY: Cell<bool> = const { Cell::new(false) };
}

/// Adapter implementing the Rust `log::Log` trait.
pub struct LogShipAdapter {
    handler: Box<dyn RecordHandler>,
    max_level: LevelFilter,
}

fn normalise_target(target: &str) -> Cow<'_, str> {
    if target.contains("::") {
        Cow::Owned(target.replace("::", "."))
    } else {
        Cow::Borrowed(target)
    }
}

fn is_internal(target: &str) -> bool {
    target == INTERNAL_TARGET || target.starts_with("logship::")
}

/// Clears the re-entrancy flag even if the handler panics.
struct DeliveryGuard;

impl DeliveryGuard {
    fn enter() -> Option<Self> {
        IN_DELIVERY.with(|flag| {
            if flag.replace(true) {
                None
            } else {
                Some(DeliveryGuard)
            }
        })
    }
}

impl Drop for DeliveryGuard {
    fn drop(&mut self) {
        IN_DELIVERY.with(|flag| flag.set(false));
    }
}

impl LogShipAdapter {
    /// Ship records at `Info` and above through `handler`.
    pub fn new(handler: impl RecordHandler + 'static) -> Self {
        Self::from_boxed(Box::new(handler))
    }

    pub fn from_boxed(handler: Box<dyn RecordHandler>) -> Self {
        Self {
            handler,
            max_level: LevelFilter::Info,
        }
    }

    pub fn with_max_level(mut self, max_level: LevelFilter) -> Self {
        self.max_level = max_level;
        self
    }

    /// Install the adapter as the global logger.
    ///
    /// # Errors
    ///
    /// Fails when another global logger is already set.
    pub fn install(self) -> Result<(), SetLoggerError> {
        let max_level = self.max_level;
        log::set_boxed_logger(Box::new(self))?;
        log::set_max_level(max_level);
        Ok(())
    }

    fn to_record(record: &Record<'_>) -> LogRecord {
        let metadata = RecordMetadata {
            module_path: record.module_path().unwrap_or_default().to_string(),
            filename: record.file().unwrap_or_default().to_string(),
            line_number: record.line().unwrap_or(0),
            ..Default::default()
        };
        LogRecord::with_metadata(
            normalise_target(record.target()).as_ref(),
            LogLevel::from(record.level()),
            record.args().to_string(),
            metadata,
        )
    }
}

impl log::Log for LogShipAdapter {
    fn enabled(&self, metadata: &Metadata<'_>) -> bool {
        metadata.level() <= self.max_level && !is_internal(metadata.target())
    }

    fn log(&self, record: &Record<'_>) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let Some(_guard) = DeliveryGuard::enter() else {
            return;
        };
        self.handler.handle(&Self::to_record(record));
    }

    // Deliveries are synchronous; nothing is buffered.
    fn flush(&self) {}
}

impl std::fmt::Debug for LogShipAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LogShipAdapter")
            .field("max_level", &self.max_level)
            .finish_non_exhaustive()
    }
}
