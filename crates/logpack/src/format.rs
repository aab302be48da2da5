//! Message formatters: plain text and structured.

use std::sync::Arc;

use chrono::{SecondsFormat, Utc};
use serde_json::{Value, json};

use crate::level::Level;
use crate::record::LogValue;

/// Sentinel correlation id used when no [`UidSource`] is configured.
pub const NO_UID_SENTINEL: &str = "no uid source configured";

/// Maps a log call onto the payload a sink delivers.
///
/// Implementations must be pure given their inputs; the structured formatter
/// additionally reads the clock and its uid source.
pub trait Formatter: Send + Sync {
    /// Formats `messages` logged at `level` with the captured call-site
    /// `trace` into a renderable JSON payload.
    fn format(&self, level: Level, trace: &[String], messages: &[LogValue]) -> Value;
}

/// Source of correlation ids for the structured formatter, e.g. the id of the
/// request currently being handled.
pub trait UidSource: Send + Sync {
    /// Returns the current correlation id.
    fn uid(&self) -> String;
}

/// Renders one argument the way both formatters agree on: text as-is, errors
/// unwrapped into message-plus-stack text, structured data passed through.
fn message_entry(value: &LogValue) -> Value {
    match value {
        LogValue::Text(text) => Value::String(text.clone()),
        LogValue::Error { message, stack } => {
            Value::String(render_error(message, stack.as_deref()))
        }
        LogValue::Data(data) => data.clone(),
    }
}

fn render_error(message: &str, stack: Option<&str>) -> String {
    match stack {
        Some(stack) if !message.is_empty() && !stack.contains(message) => {
            format!("Error: {message}\n{stack}")
        }
        Some(stack) => stack.to_string(),
        None => message.to_string(),
    }
}

/// Splits the first trace frame into its `function` and `file:line:column`
/// halves.
fn first_frame(trace: &[String]) -> (Option<&str>, Option<&str>) {
    let Some(frame) = trace.first() else {
        return (None, None);
    };
    let mut parts = frame.splitn(2, '@');
    (parts.next(), parts.next())
}

/// Plain-text formatter (the default).
///
/// Produces an array with one rendered entry per argument plus a trailing
/// `"[file:line:column]"` call-site annotation, or an empty string when no
/// trace is available.
#[derive(Debug, Clone, Copy, Default)]
pub struct SimpleFormatter;

impl SimpleFormatter {
    /// Creates the formatter.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Formatter for SimpleFormatter {
    fn format(&self, _level: Level, trace: &[String], messages: &[LogValue]) -> Value {
        let mut entries: Vec<Value> = messages.iter().map(message_entry).collect();
        let call_site = match first_frame(trace).1 {
            Some(location) => format!("[{location}]"),
            None => String::new(),
        };
        entries.push(Value::String(call_site));
        Value::Array(entries)
    }
}

/// Structured formatter producing one `LogData` object per call.
///
/// ```json
/// {
///     "LogData": {
///         "Log_level": "info",
///         "Message_Text": ["random text"],
///         "Log_timestamp": "2014-04-17T13:18:30.000Z",
///         "component": "transactionsWidget",
///         "function": "[sort_by_name]",
///         "line": "[widget.rs:405:9]",
///         "Event_Id": "23412432434"
///     }
/// }
/// ```
#[derive(Clone, Default)]
pub struct StructuredFormatter {
    component: String,
    uid_source: Option<Arc<dyn UidSource>>,
}

impl StructuredFormatter {
    /// Creates the formatter with an empty component tag and no uid source.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the component tag stamped into every record.
    #[must_use]
    pub fn with_component(mut self, component: impl Into<String>) -> Self {
        self.component = component.into();
        self
    }

    /// Sets the correlation-id source.
    #[must_use]
    pub fn with_uid_source(mut self, uid_source: Arc<dyn UidSource>) -> Self {
        self.uid_source = Some(uid_source);
        self
    }

    fn uid(&self) -> String {
        self.uid_source
            .as_ref()
            .map_or_else(|| NO_UID_SENTINEL.to_string(), |source| source.uid())
    }
}

impl std::fmt::Debug for StructuredFormatter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StructuredFormatter")
            .field("component", &self.component)
            .field("uid_source", &self.uid_source.is_some())
            .finish()
    }
}

impl Formatter for StructuredFormatter {
    fn format(&self, level: Level, trace: &[String], messages: &[LogValue]) -> Value {
        let (function, location) = first_frame(trace);
        let function = function.filter(|name| !name.is_empty()).unwrap_or("unknown");
        let location = location.filter(|loc| !loc.is_empty()).unwrap_or("-1");
        let rendered: Vec<Value> = messages.iter().map(message_entry).collect();

        json!({
            "LogData": {
                "Log_level": level.display_name(),
                "Message_Text": rendered,
                "Log_timestamp": Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
                "component": self.component,
                "function": format!("[{function}]"),
                "line": format!("[{location}]"),
                "Event_Id": self.uid(),
            }
        })
    }
}
