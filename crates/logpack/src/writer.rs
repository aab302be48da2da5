//! Writers bind a level threshold, a buffer, and a formatter to a delivery
//! sink.

use std::io::{self, Write};
use std::sync::Arc;
use std::thread;

use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::blocking::Client;
use reqwest::header::CONTENT_TYPE;
use serde_json::Value;

use crate::buffer::{Buffer, FlushFn};
use crate::format::Formatter;
use crate::level::Level;
use crate::record::{LogValue, Record};

/// A log destination. The façade fans every call out to each configured
/// writer; implementations filter by level and deliver however they like.
pub trait LogWriter: Send + Sync {
    /// Handles one log call.
    fn write(&self, level: Level, trace: &[String], messages: &[LogValue]);
}

/// The console surface a [`ConsoleWriter`] delivers to, one method per level
/// display name. Records whose display name has no method here (`log`) are
/// skipped.
pub trait Console: Send + Sync {
    /// Writes a debug line.
    fn debug(&self, line: &str);
    /// Writes an info line.
    fn info(&self, line: &str);
    /// Writes a warning line.
    fn warn(&self, line: &str);
    /// Writes an error line.
    fn error(&self, line: &str);
}

/// Default console: `"{name}: {line}"` on stderr, write failures ignored.
#[derive(Debug, Clone, Copy, Default)]
pub struct StdConsole;

impl StdConsole {
    fn emit(name: &str, line: &str) {
        let _ = writeln!(io::stderr(), "{name}: {line}");
    }
}

impl Console for StdConsole {
    fn debug(&self, line: &str) {
        Self::emit("debug", line);
    }

    fn info(&self, line: &str) {
        Self::emit("info", line);
    }

    fn warn(&self, line: &str) {
        Self::emit("warn", line);
    }

    fn error(&self, line: &str) {
        Self::emit("error", line);
    }
}

fn render_entry(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        value => value.to_string(),
    }
}

/// Renders a record body for the console: array bodies spread into
/// space-separated arguments, single values render alone.
fn render_body(body: &Value) -> String {
    match body {
        Value::Array(entries) => entries
            .iter()
            .map(render_entry)
            .collect::<Vec<_>>()
            .join(" "),
        value => render_entry(value),
    }
}

fn deliver_to_console(console: &dyn Console, record: &Record) {
    let line = render_body(&record.body);
    match record.level.display_name() {
        "debug" => console.debug(&line),
        "info" => console.info(&line),
        "warn" => console.warn(&line),
        "error" => console.error(&line),
        _ => {}
    }
}

/// Writer delivering flushed records to a [`Console`].
pub struct ConsoleWriter {
    threshold: Level,
    buffer: Arc<dyn Buffer>,
    formatter: Arc<dyn Formatter>,
    console: Arc<dyn Console>,
}

impl ConsoleWriter {
    /// Creates a console writer targeting [`StdConsole`].
    #[must_use]
    pub fn new(threshold: Level, buffer: Arc<dyn Buffer>, formatter: Arc<dyn Formatter>) -> Self {
        Self::with_console(threshold, buffer, formatter, Arc::new(StdConsole))
    }

    /// Creates a console writer targeting a specific console.
    #[must_use]
    pub fn with_console(
        threshold: Level,
        buffer: Arc<dyn Buffer>,
        formatter: Arc<dyn Formatter>,
        console: Arc<dyn Console>,
    ) -> Self {
        Self {
            threshold,
            buffer,
            formatter,
            console,
        }
    }
}

impl LogWriter for ConsoleWriter {
    fn write(&self, level: Level, trace: &[String], messages: &[LogValue]) {
        if level < self.threshold {
            return;
        }
        let record = Record::new(level, self.formatter.format(level, trace, messages));
        let console = Arc::clone(&self.console);
        let on_flush: FlushFn = Arc::new(move |records| {
            for record in &records {
                deliver_to_console(console.as_ref(), record);
            }
        });
        self.buffer.store(record, on_flush, level == Level::Error);
    }
}

/// Delivery seam for the remote writer. The default implementation POSTs over
/// HTTP; tests substitute a recording one.
pub trait Transport: Send + Sync {
    /// Sends `body` to `url`. Best-effort: failures are unobservable.
    fn post(&self, url: &str, body: Vec<u8>);
}

/// Fire-and-forget HTTP transport: one POST per flush on a detached thread,
/// no response handling, no retry, no timeout.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
}

impl Default for HttpTransport {
    fn default() -> Self {
        Self {
            client: Client::new(),
        }
    }
}

impl Transport for HttpTransport {
    fn post(&self, url: &str, body: Vec<u8>) {
        let client = self.client.clone();
        let url = url.to_string();
        let _ = thread::Builder::new()
            .name("logpack-remote".to_string())
            .spawn(move || {
                let _ = client
                    .post(url.as_str())
                    .header(CONTENT_TYPE, "application/json")
                    .body(body)
                    .send();
            });
    }
}

/// Conservative host/IP/path/query/fragment pattern; anything it rejects
/// silently disables remote delivery.
static URL_PATTERN: Lazy<Option<Regex>> = Lazy::new(|| {
    Regex::new(
        r"(?i)^(https?://)?((([a-z\d]([a-z\d-]*[a-z\d])*)\.)+[a-z]{2,}|((\d{1,3}\.){3}\d{1,3}))(:\d+)?(/[-a-z\d%_.~+]*)*(\?[;&a-z\d%_.~+=-]*)?(#[-a-z\d_]*)?$",
    )
    .ok()
});

fn validate_url(url: &str) -> bool {
    URL_PATTERN.as_ref().is_some_and(|pattern| pattern.is_match(url))
}

/// Writer POSTing flushed records to a remote endpoint as a JSON array of
/// their formatted bodies.
pub struct RemoteWriter {
    threshold: Level,
    buffer: Arc<dyn Buffer>,
    formatter: Arc<dyn Formatter>,
    sink: Arc<RemoteSink>,
}

struct RemoteSink {
    url: Option<String>,
    transport: Arc<dyn Transport>,
}

impl RemoteSink {
    fn deliver(&self, records: Vec<Record>) {
        let Some(url) = &self.url else {
            return;
        };
        let bodies: Vec<Value> = records.into_iter().map(|record| record.body).collect();
        if let Ok(payload) = serde_json::to_vec(&bodies) {
            self.transport.post(url, payload);
        }
    }
}

impl RemoteWriter {
    /// Creates a remote writer delivering over HTTP. The URL is validated
    /// eagerly; an invalid one disables delivery without an error.
    #[must_use]
    pub fn new(
        threshold: Level,
        buffer: Arc<dyn Buffer>,
        formatter: Arc<dyn Formatter>,
        url: &str,
    ) -> Self {
        Self::with_transport(
            threshold,
            buffer,
            formatter,
            url,
            Arc::new(HttpTransport::default()),
        )
    }

    /// Creates a remote writer with a custom transport.
    #[must_use]
    pub fn with_transport(
        threshold: Level,
        buffer: Arc<dyn Buffer>,
        formatter: Arc<dyn Formatter>,
        url: &str,
        transport: Arc<dyn Transport>,
    ) -> Self {
        let url = validate_url(url).then(|| url.to_string());
        Self {
            threshold,
            buffer,
            formatter,
            sink: Arc::new(RemoteSink { url, transport }),
        }
    }

    /// Whether the configured URL passed validation and delivery is active.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.sink.url.is_some()
    }
}

impl LogWriter for RemoteWriter {
    fn write(&self, level: Level, trace: &[String], messages: &[LogValue]) {
        if level < self.threshold {
            return;
        }
        let record = Record::new(level, self.formatter.format(level, trace, messages));
        let sink = Arc::clone(&self.sink);
        let on_flush: FlushFn = Arc::new(move |records| sink.deliver(records));
        self.buffer.store(record, on_flush, level == Level::Error);
    }
}
