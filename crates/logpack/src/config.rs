//! Construction-time configuration: tagged variants wired together by
//! [`LogBuilder`].

use std::sync::Arc;
use std::time::Duration;

use crate::buffer::{Buffer, CountBuffer, ImmediateBuffer, SizeBuffer, TimeBuffer};
use crate::format::{Formatter, SimpleFormatter, StructuredFormatter, UidSource};
use crate::level::Level;
use crate::log::Log;
use crate::registry::Registry;
use crate::store::{BufferStore, MemoryStore};
use crate::writer::{ConsoleWriter, LogWriter, RemoteWriter};

/// Default store count for [`BufferConfig::Count`].
pub const DEFAULT_COUNT_THRESHOLD: u32 = 30;
/// Default size limit in kilobytes for [`BufferConfig::Size`].
pub const DEFAULT_SIZE_LIMIT_KB: u64 = 500;
/// Default flush interval for [`BufferConfig::Time`].
pub const DEFAULT_TIME_INTERVAL: Duration = Duration::from_millis(1000);
/// Default writer level threshold.
pub const DEFAULT_LEVEL: Level = Level::Info;

/// Buffer policy selection. A zero threshold, limit, or interval falls back
/// to the policy default; the optional `id` keeps the storage keys stable
/// across reconstructions (see [`Registry::next_stamp`]).
#[derive(Debug, Clone, Default)]
pub enum BufferConfig {
    /// No buffering (the default): deliver every record as it arrives.
    #[default]
    Immediate,
    /// Flush every `threshold` stores.
    Count {
        /// Stores per flush.
        threshold: u32,
        /// Optional stable storage id.
        id: Option<String>,
    },
    /// Flush when the buffered size exceeds `limit_kb` kilobytes.
    Size {
        /// Size limit in kilobytes.
        limit_kb: u64,
        /// Optional stable storage id.
        id: Option<String>,
    },
    /// Flush `interval` after each (re)arm.
    Time {
        /// Countdown interval.
        interval: Duration,
        /// Optional stable storage id.
        id: Option<String>,
    },
}

impl BufferConfig {
    /// Count policy with the given threshold and no stable id.
    #[must_use]
    pub const fn count(threshold: u32) -> Self {
        Self::Count {
            threshold,
            id: None,
        }
    }

    /// Size policy with the given limit and no stable id.
    #[must_use]
    pub const fn size(limit_kb: u64) -> Self {
        Self::Size {
            limit_kb,
            id: None,
        }
    }

    /// Time policy with the given interval and no stable id.
    #[must_use]
    pub const fn time(interval: Duration) -> Self {
        Self::Time { interval, id: None }
    }

    fn build(&self, store: &Arc<dyn BufferStore>, registry: &Registry) -> Arc<dyn Buffer> {
        match self {
            Self::Immediate => Arc::new(ImmediateBuffer::new()),
            Self::Count { threshold, id } => {
                let threshold = if *threshold == 0 {
                    DEFAULT_COUNT_THRESHOLD
                } else {
                    *threshold
                };
                Arc::new(CountBuffer::new(
                    threshold,
                    id.as_deref(),
                    Arc::clone(store),
                    registry,
                ))
            }
            Self::Size { limit_kb, id } => {
                let limit_kb = if *limit_kb == 0 {
                    DEFAULT_SIZE_LIMIT_KB
                } else {
                    *limit_kb
                };
                Arc::new(SizeBuffer::new(
                    limit_kb,
                    id.as_deref(),
                    Arc::clone(store),
                    registry,
                ))
            }
            Self::Time { interval, id } => {
                let interval = if interval.is_zero() {
                    DEFAULT_TIME_INTERVAL
                } else {
                    *interval
                };
                Arc::new(TimeBuffer::new(
                    interval,
                    id.as_deref(),
                    Arc::clone(store),
                    registry,
                ))
            }
        }
    }
}

/// Formatter selection.
#[derive(Clone, Default)]
pub enum FormatterConfig {
    /// Plain-text formatting (the default).
    #[default]
    Simple,
    /// Structured `LogData` records.
    Structured {
        /// Component tag stamped into every record.
        component: String,
        /// Optional correlation-id source.
        uid_source: Option<Arc<dyn UidSource>>,
    },
}

impl FormatterConfig {
    /// Structured formatting with the given component tag and no uid source.
    #[must_use]
    pub fn structured(component: impl Into<String>) -> Self {
        Self::Structured {
            component: component.into(),
            uid_source: None,
        }
    }

    fn build(&self) -> Arc<dyn Formatter> {
        match self {
            Self::Simple => Arc::new(SimpleFormatter::new()),
            Self::Structured {
                component,
                uid_source,
            } => {
                let mut formatter = StructuredFormatter::new().with_component(component.clone());
                if let Some(source) = uid_source {
                    formatter = formatter.with_uid_source(Arc::clone(source));
                }
                Arc::new(formatter)
            }
        }
    }
}

impl std::fmt::Debug for FormatterConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Simple => f.write_str("Simple"),
            Self::Structured {
                component,
                uid_source,
            } => f
                .debug_struct("Structured")
                .field("component", component)
                .field("uid_source", &uid_source.is_some())
                .finish(),
        }
    }
}

/// One writer's configuration: the destination variant plus its level
/// threshold, buffer policy, and formatter.
#[derive(Debug, Clone)]
pub enum WriterConfig {
    /// Console delivery.
    Console {
        /// Minimum level delivered.
        level: Level,
        /// Buffer policy.
        buffer: BufferConfig,
        /// Formatter.
        formatter: FormatterConfig,
    },
    /// Remote HTTP delivery. An invalid `url` silently disables delivery.
    Remote {
        /// Minimum level delivered.
        level: Level,
        /// Buffer policy.
        buffer: BufferConfig,
        /// Formatter.
        formatter: FormatterConfig,
        /// Endpoint the flushed payload is POSTed to.
        url: String,
    },
}

impl WriterConfig {
    /// A console writer with the defaults: `Info`, unbuffered, plain
    /// formatting.
    #[must_use]
    pub fn console() -> Self {
        Self::Console {
            level: DEFAULT_LEVEL,
            buffer: BufferConfig::default(),
            formatter: FormatterConfig::default(),
        }
    }

    /// A remote writer for `url` with the same defaults.
    #[must_use]
    pub fn remote(url: impl Into<String>) -> Self {
        Self::Remote {
            level: DEFAULT_LEVEL,
            buffer: BufferConfig::default(),
            formatter: FormatterConfig::default(),
            url: url.into(),
        }
    }

    /// Replaces the level threshold.
    #[must_use]
    pub fn with_level(mut self, new_level: Level) -> Self {
        match &mut self {
            Self::Console { level, .. } | Self::Remote { level, .. } => *level = new_level,
        }
        self
    }

    /// Replaces the buffer policy.
    #[must_use]
    pub fn with_buffer(mut self, new_buffer: BufferConfig) -> Self {
        match &mut self {
            Self::Console { buffer, .. } | Self::Remote { buffer, .. } => *buffer = new_buffer,
        }
        self
    }

    /// Replaces the formatter.
    #[must_use]
    pub fn with_formatter(mut self, new_formatter: FormatterConfig) -> Self {
        match &mut self {
            Self::Console { formatter, .. } | Self::Remote { formatter, .. } => {
                *formatter = new_formatter;
            }
        }
        self
    }

    fn build(&self, store: &Arc<dyn BufferStore>, registry: &Registry) -> Arc<dyn LogWriter> {
        match self {
            Self::Console {
                level,
                buffer,
                formatter,
            } => Arc::new(ConsoleWriter::new(
                *level,
                buffer.build(store, registry),
                formatter.build(),
            )),
            Self::Remote {
                level,
                buffer,
                formatter,
                url,
            } => Arc::new(RemoteWriter::new(
                *level,
                buffer.build(store, registry),
                formatter.build(),
                url,
            )),
        }
    }
}

enum WriterSpec {
    Config(WriterConfig),
    Custom(Arc<dyn LogWriter>),
}

/// Wires writers, buffers, and formatters into a [`Log`].
///
/// # Example
///
/// ```rust,no_run
/// use logpack::{BufferConfig, Level, Log, WriterConfig};
///
/// let log = Log::builder()
///     .writer(WriterConfig::console().with_level(Level::Warning))
///     .writer(WriterConfig::remote("http://rest.com/log").with_buffer(BufferConfig::count(10)))
///     .build();
///
/// log.warn(&logpack::values!["final warning"]);
/// log.shutdown();
/// ```
#[derive(Default)]
pub struct LogBuilder {
    writers: Vec<WriterSpec>,
    storage: Option<Arc<dyn BufferStore>>,
    registry: Option<Arc<Registry>>,
}

impl LogBuilder {
    /// Creates an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a writer built from configuration.
    #[must_use]
    pub fn writer(mut self, config: WriterConfig) -> Self {
        self.writers.push(WriterSpec::Config(config));
        self
    }

    /// Adds an already-built writer.
    #[must_use]
    pub fn custom_writer(mut self, writer: Arc<dyn LogWriter>) -> Self {
        self.writers.push(WriterSpec::Custom(writer));
        self
    }

    /// Backs every configured buffer with `storage` instead of a fresh
    /// in-memory store.
    #[must_use]
    pub fn storage(mut self, storage: Arc<dyn BufferStore>) -> Self {
        self.storage = Some(storage);
        self
    }

    /// Uses `registry` for stamp allocation and teardown flushing instead of
    /// a fresh one.
    #[must_use]
    pub fn registry(mut self, registry: Arc<Registry>) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Builds the log. With no writers configured, the default console
    /// writer is used.
    #[must_use]
    pub fn build(self) -> Log {
        let registry = self
            .registry
            .unwrap_or_else(|| Arc::new(Registry::new()));
        let storage: Arc<dyn BufferStore> = self
            .storage
            .unwrap_or_else(|| Arc::new(MemoryStore::new()));

        let specs = if self.writers.is_empty() {
            vec![WriterSpec::Config(WriterConfig::console())]
        } else {
            self.writers
        };

        let writers = specs
            .into_iter()
            .map(|spec| match spec {
                WriterSpec::Config(config) => config.build(&storage, &registry),
                WriterSpec::Custom(writer) => writer,
            })
            .collect();

        Log::with_writers(writers, registry)
    }
}
