//! The message values callers log and the canonical record buffers carry.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::level::Level;

/// One value in a log call's argument list.
///
/// Formatters pattern-match on the variant instead of inspecting arbitrary
/// payloads: plain text renders as-is, errors unwrap into message-plus-stack
/// text, and structured data passes through as JSON.
#[derive(Debug, Clone, PartialEq)]
pub enum LogValue {
    /// A plain text message.
    Text(String),
    /// An error with an optional captured stack trace.
    Error {
        /// The error message.
        message: String,
        /// The stack trace, when one was captured.
        stack: Option<String>,
    },
    /// An opaque structured payload.
    Data(Value),
}

impl LogValue {
    /// Creates an error value.
    #[must_use]
    pub fn error(message: impl Into<String>, stack: Option<String>) -> Self {
        Self::Error {
            message: message.into(),
            stack,
        }
    }
}

impl From<&str> for LogValue {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<String> for LogValue {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<Value> for LogValue {
    fn from(value: Value) -> Self {
        Self::Data(value)
    }
}

/// Builds a `[LogValue; N]` argument list from anything convertible into
/// [`LogValue`].
///
/// # Example
///
/// ```rust
/// use logpack::{Log, values};
///
/// let log = Log::default_console();
/// log.info(&values!["starting up", serde_json::json!({"version": "1.0"})]);
/// ```
#[macro_export]
macro_rules! values {
    ($($value:expr),* $(,)?) => {
        [$($crate::LogValue::from($value)),*]
    };
}

/// The unit stored by a buffer: a level plus the already-formatted body.
///
/// Every buffer policy carries this one shape. The body is whatever the
/// writer's formatter produced at call time, so buffered and unbuffered paths
/// deliver structurally identical payloads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// The level the message was logged at.
    pub level: Level,
    /// The formatted payload.
    pub body: Value,
}

impl Record {
    /// Creates a record from a level and a formatted body.
    #[must_use]
    pub const fn new(level: Level, body: Value) -> Self {
        Self { level, body }
    }
}
