use std::fmt;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use tracing::{Dispatch, Event, Level, Subscriber, field::Visit};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::layer::{Context, Layer, SubscriberExt};
use tracing_subscriber::registry::LookupSpan;

use crate::error::Result;
use crate::types::Severity;

/// The host's message window.
pub trait MessageSink: Send + Sync {
    fn add_message(&self, message: &str);
    fn add_warning(&self, message: &str);
    fn add_error(&self, message: &str);
}

/// Prints host messages to the terminal, errors and warnings on stderr.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsoleMessages;

impl MessageSink for ConsoleMessages {
    fn add_message(&self, message: &str) {
        println!("{}", message);
    }

    fn add_warning(&self, message: &str) {
        eprintln!("WARNING: {}", message);
    }

    fn add_error(&self, message: &str) {
        eprintln!("ERROR: {}", message);
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostMessage {
    pub severity: Severity,
    pub text: String,
}

/// Keeps host messages in memory; clones share the same buffer.
#[derive(Debug, Clone, Default)]
pub struct MessageLog {
    entries: Arc<Mutex<Vec<HostMessage>>>,
}

impl MessageLog {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&self, severity: Severity, message: &str) {
        if let Ok(mut buf) = self.entries.lock() {
            buf.push(HostMessage {
                severity,
                text: message.to_string(),
            });
        }
    }

    pub fn entries(&self) -> Vec<HostMessage> {
        self.entries.lock().map(|b| b.clone()).unwrap_or_default()
    }

    pub fn with_severity(&self, severity: Severity) -> Vec<String> {
        self.entries()
            .into_iter()
            .filter(|m| m.severity == severity)
            .map(|m| m.text)
            .collect()
    }

    pub fn contains(&self, needle: &str) -> bool {
        self.entries().iter().any(|m| m.text.contains(needle))
    }
}

impl MessageSink for MessageLog {
    fn add_message(&self, message: &str) {
        self.push(Severity::Info, message);
    }

    fn add_warning(&self, message: &str) {
        self.push(Severity::Warning, message);
    }

    fn add_error(&self, message: &str) {
        self.push(Severity::Error, message);
    }
}

/// Collapse a message onto one line for the host message window.
pub fn single_line(message: &str) -> String {
    message
        .replace('\n', ", ")
        .replace('\t', " ")
        .replace("  ", " ")
}

struct MessageVisitor {
    message: String,
    fields: String,
}

impl MessageVisitor {
    fn new() -> Self {
        Self {
            message: String::new(),
            fields: String::new(),
        }
    }

    fn text(self) -> String {
        if self.fields.is_empty() {
            self.message
        } else if self.message.is_empty() {
            self.fields.trim_start().to_string()
        } else {
            format!("{}{}", self.message, self.fields)
        }
    }
}

impl Visit for MessageVisitor {
    fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
        if field.name() == "message" {
            self.message = value.to_string();
        } else {
            self.fields.push_str(&format!(" {}={}", field.name(), value));
        }
    }

    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            self.message = format!("{:?}", value);
        } else {
            self.fields.push_str(&format!(" {}={:?}", field.name(), value));
        }
    }
}

fn event_text(event: &Event<'_>) -> String {
    let mut visitor = MessageVisitor::new();
    event.record(&mut visitor);
    visitor.text()
}

/// Forwards events to a [`MessageSink`]; [`run_dispatch`] limits it to INFO and
/// more severe.
pub struct HostMessageLayer {
    sink: Arc<dyn MessageSink>,
}

impl HostMessageLayer {
    pub fn new(sink: Arc<dyn MessageSink>) -> Self {
        Self { sink }
    }
}

impl<S> Layer<S> for HostMessageLayer
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let message = single_line(&event_text(event));
        match *event.metadata().level() {
            Level::ERROR => self.sink.add_error(&message),
            Level::WARN => self.sink.add_warning(&message),
            _ => self.sink.add_message(&message),
        }
    }
}

/// Appends every event to the tool's log file as
/// `date time.millis LEVEL module function line message`.
pub struct FileLogLayer {
    file: Mutex<File>,
}

impl FileLogLayer {
    /// Open `path` for appending, creating it and its directory if needed.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(dir) = path.parent() {
            if !dir.as_os_str().is_empty() {
                std::fs::create_dir_all(dir)?;
            }
        }
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            file: Mutex::new(file),
        })
    }
}

impl<S> Layer<S> for FileLogLayer
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_event(&self, event: &Event<'_>, ctx: Context<'_, S>) {
        let metadata = event.metadata();
        let function = ctx
            .event_span(event)
            .map(|span| span.name())
            .unwrap_or("-");
        let line = format!(
            "{} {} {} {} {} {}",
            chrono::Local::now().format("%Y%m%d %H%M%S%.3f"),
            metadata.level(),
            metadata.module_path().unwrap_or_else(|| metadata.target()),
            function,
            metadata.line().unwrap_or(0),
            event_text(event)
        );
        if let Ok(mut file) = self.file.lock() {
            let _ = writeln!(file, "{}", line);
        }
    }
}

/// Where a run writes its log file.
pub fn log_file_path(app_data_dir: &Path, tool_name: &str) -> PathBuf {
    app_data_dir.join(format!("{}.log", tool_name))
}

/// Build the dispatcher for one run: host messages at INFO and above, the log
/// file at everything `filter` lets through. An invalid `filter` falls back to
/// `debug` and says so on both sinks.
pub fn run_dispatch(
    messages: Arc<dyn MessageSink>,
    log_file: &Path,
    filter: &str,
) -> Result<Dispatch> {
    let (file_filter, rejected) = match EnvFilter::try_new(filter) {
        Ok(f) => (f, None),
        Err(e) => (EnvFilter::new("debug"), Some(e)),
    };
    let subscriber = tracing_subscriber::registry()
        .with(HostMessageLayer::new(messages).with_filter(LevelFilter::INFO))
        .with(FileLogLayer::open(log_file)?.with_filter(file_filter));
    let dispatch = Dispatch::new(subscriber);

    if let Some(e) = rejected {
        tracing::dispatcher::with_default(&dispatch, || {
            tracing::warn!("Invalid log filter '{}' ({}), using 'debug'", filter, e);
        });
    }
    Ok(dispatch)
}
