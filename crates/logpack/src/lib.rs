#![forbid(unsafe_code)]
// Allow pedantic lints for early-stage API ergonomics.
#![allow(clippy::nursery)]
#![allow(clippy::pedantic)]

//! # Logpack
//!
//! A pluggable, buffered logging facility for client applications.
//!
//! Logpack routes leveled messages through configurable writers:
//! - Multiple log levels (debug, info, warning, error, silent)
//! - Console and remote HTTP destinations
//! - Plain-text and structured formatting
//! - Client-side buffering (immediate, count, size, or time policy) with
//!   error-triggered and teardown force-flushes
//!
//! ## Example
//!
//! ```rust
//! use logpack::{Log, values};
//!
//! let log = Log::default_console();
//! log.info(&values!["application started"]);
//! ```
//!
//! Writers compose freely; here a warning-level console alongside a count-
//! buffered remote endpoint:
//!
//! ```rust,no_run
//! use logpack::{BufferConfig, Level, Log, WriterConfig};
//!
//! let log = Log::builder()
//!     .writer(WriterConfig::console().with_level(Level::Warning))
//!     .writer(WriterConfig::remote("http://rest.com/log").with_buffer(BufferConfig::count(10)))
//!     .build();
//!
//! log.warn(&logpack::values!["final warning"]);
//! // At host teardown, deliver whatever is still buffered.
//! log.shutdown();
//! ```
//!
//! Every seam is a trait: supply your own [`LogWriter`], [`Buffer`],
//! [`Formatter`], [`BufferStore`], or [`Console`] to replace the built-ins.

pub mod buffer;
pub mod config;
pub mod format;
pub mod level;
pub mod log;
pub mod record;
pub mod registry;
pub mod store;
pub mod trace;
pub mod writer;

pub use buffer::{Buffer, CountBuffer, FlushFn, ImmediateBuffer, SizeBuffer, TimeBuffer};
pub use config::{
    BufferConfig, DEFAULT_COUNT_THRESHOLD, DEFAULT_LEVEL, DEFAULT_SIZE_LIMIT_KB,
    DEFAULT_TIME_INTERVAL, FormatterConfig, LogBuilder, WriterConfig,
};
pub use format::{
    Formatter, NO_UID_SENTINEL, SimpleFormatter, StructuredFormatter, UidSource,
};
pub use level::{Level, ParseLevelError, ParseResult};
pub use log::Log;
pub use record::{LogValue, Record};
pub use registry::{PolicyKind, Registry};
pub use store::{BufferStore, MemoryStore};
pub use writer::{
    Console, ConsoleWriter, HttpTransport, LogWriter, RemoteWriter, StdConsole, Transport,
};

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::{
        Buffer, BufferConfig, BufferStore, Console, ConsoleWriter, CountBuffer, FlushFn,
        Formatter, FormatterConfig, ImmediateBuffer, Level, Log, LogBuilder, LogValue, LogWriter,
        MemoryStore, ParseLevelError, ParseResult, Record, Registry, RemoteWriter, SimpleFormatter,
        SizeBuffer, StdConsole, StructuredFormatter, TimeBuffer, Transport, UidSource,
        WriterConfig,
    };
}
