//! The fan-out façade callers log through.

use std::sync::Arc;

use crate::config::LogBuilder;
use crate::level::Level;
use crate::record::LogValue;
use crate::registry::Registry;
use crate::trace;
use crate::writer::LogWriter;

/// A configured log: a call-site trace capture plus pure fan-out to every
/// writer. Filtering and buffering live in the writers, not here.
///
/// # Example
///
/// ```rust
/// use logpack::{Log, values};
///
/// let log = Log::default_console();
/// log.info(&values!["you are about to get an error"]);
/// log.error(&values!["error!"]);
/// ```
pub struct Log {
    writers: Vec<Arc<dyn LogWriter>>,
    registry: Arc<Registry>,
}

impl Log {
    pub(crate) fn with_writers(writers: Vec<Arc<dyn LogWriter>>, registry: Arc<Registry>) -> Self {
        Self { writers, registry }
    }

    /// Starts configuring a log.
    #[must_use]
    pub fn builder() -> LogBuilder {
        LogBuilder::new()
    }

    /// The default log: one console writer at `Info`, unbuffered, plain
    /// formatting.
    #[must_use]
    pub fn default_console() -> Self {
        LogBuilder::new().build()
    }

    /// Logs at debug level.
    pub fn debug(&self, messages: &[LogValue]) {
        self.dispatch(Level::Debug, messages);
    }

    /// Alias for [`debug`](Self::debug).
    pub fn d(&self, messages: &[LogValue]) {
        self.debug(messages);
    }

    /// Logs at info level.
    pub fn info(&self, messages: &[LogValue]) {
        self.dispatch(Level::Info, messages);
    }

    /// Alias for [`info`](Self::info).
    pub fn i(&self, messages: &[LogValue]) {
        self.info(messages);
    }

    /// Logs at warning level.
    pub fn warn(&self, messages: &[LogValue]) {
        self.dispatch(Level::Warning, messages);
    }

    /// Alias for [`warn`](Self::warn).
    pub fn w(&self, messages: &[LogValue]) {
        self.warn(messages);
    }

    /// Logs at error level. Error messages force-flush every buffered writer.
    pub fn error(&self, messages: &[LogValue]) {
        self.dispatch(Level::Error, messages);
    }

    /// Alias for [`error`](Self::error).
    pub fn e(&self, messages: &[LogValue]) {
        self.error(messages);
    }

    /// The registry this log's buffers registered their teardown flushes
    /// with.
    #[must_use]
    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    /// Flushes every buffer registered with this log's registry,
    /// last-registered-first. Call at host teardown so nothing buffered is
    /// silently dropped.
    pub fn shutdown(&self) {
        self.registry.flush_all();
    }

    fn dispatch(&self, level: Level, messages: &[LogValue]) {
        let trace = trace::capture();
        for writer in &self.writers {
            writer.write(level, &trace, messages);
        }
    }
}

impl std::fmt::Debug for Log {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Log")
            .field("writers", &self.writers.len())
            .field("registry", &self.registry)
            .finish()
    }
}
