//! # Logging & Tracing Infrastructure
//!
//! Configures `tracing-subscriber` for the player core:
//! - Pretty, JSON and compact output formats
//! - Per-crate filtering with an `EnvFilter`
//! - Forwarding to a host [`LoggerSink`] (OSLog, Logcat, ...)
//! - Redaction helpers for signed stream URLs
//!
//! ## Usage
//!
//! ```ignore
//! use bridge_traits::time::{ConsoleLogger, LogLevel};
//! use core_runtime::logging::{init_logging, LogFormat, LoggingConfig};
//! use std::sync::Arc;
//!
//! let config = LoggingConfig::default()
//!     .with_format(LogFormat::Compact)
//!     .with_level(LogLevel::Debug)
//!     .with_logger_sink(Arc::new(ConsoleLogger::default()));
//! init_logging(config)?;
//!
//! tracing::info!(target: "core_playback", "Player ready");
//! ```
//!
//! When a sink is configured every event that survives filtering is mirrored
//! to it as a [`LogEntry`] carrying the message and all recorded fields.

use crate::error::{Error, Result};

use bridge_traits::time::{LogEntry, LogLevel, LoggerSink};

use std::collections::HashMap;
use std::fmt;
use std::io;
use std::sync::Arc;

use tracing::field::{Field, Visit};
use tracing::{Event, Subscriber};
use tracing_subscriber::{
    filter::EnvFilter,
    fmt::format::FmtSpan,
    layer::{Context, SubscriberExt},
    registry::LookupSpan,
    util::SubscriberInitExt,
    Layer, Registry,
};

/// Crates whose logs follow the configured level by default.
const WORKSPACE_CRATES: &[&str] = &[
    "core_runtime",
    "core_playback",
    "core_service",
    "bridge_traits",
    "bridge_desktop",
];

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable multi-line format
    Pretty,
    /// Structured JSON, one object per line
    Json,
    /// Single-line format for production consoles
    Compact,
}

impl Default for LogFormat {
    fn default() -> Self {
        #[cfg(debug_assertions)]
        return Self::Pretty;

        #[cfg(not(debug_assertions))]
        return Self::Json;
    }
}

/// Logging configuration
#[derive(Clone)]
pub struct LoggingConfig {
    pub format: LogFormat,
    /// Minimum level for workspace crates
    pub level: LogLevel,
    /// Custom filter string (e.g., "core_playback=trace,sqlx=warn")
    pub filter: Option<String>,
    /// Optional sink mirroring events to the host
    pub logger_sink: Option<Arc<dyn LoggerSink>>,
    /// Log span open/close events (pretty format) or span lists (JSON)
    pub enable_spans: bool,
    pub display_target: bool,
    pub display_thread_info: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::default(),
            level: LogLevel::Info,
            filter: None,
            logger_sink: None,
            enable_spans: false,
            display_target: true,
            display_thread_info: false,
        }
    }
}

impl fmt::Debug for LoggingConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoggingConfig")
            .field("format", &self.format)
            .field("level", &self.level)
            .field("filter", &self.filter)
            .field("logger_sink", &self.logger_sink.is_some())
            .field("enable_spans", &self.enable_spans)
            .finish()
    }
}

impl LoggingConfig {
    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_level(mut self, level: LogLevel) -> Self {
        self.level = level;
        self
    }

    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = Some(filter.into());
        self
    }

    pub fn with_logger_sink(mut self, sink: Arc<dyn LoggerSink>) -> Self {
        self.logger_sink = Some(sink);
        self
    }

    pub fn with_spans(mut self, enable: bool) -> Self {
        self.enable_spans = enable;
        self
    }

    pub fn with_target(mut self, display: bool) -> Self {
        self.display_target = display;
        self
    }

    pub fn with_thread_info(mut self, display: bool) -> Self {
        self.display_thread_info = display;
        self
    }
}

/// Initialize the global subscriber.
///
/// Call once at startup.
///
/// # Errors
///
/// Returns [`Error::Config`] if the filter string is invalid or a global
/// subscriber is already installed.
pub fn init_logging(config: LoggingConfig) -> Result<()> {
    let filter = build_filter(&config)?;
    let fmt_layer = build_fmt_layer(&config);

    tracing_subscriber::registry()
        .with(fmt_layer)
        .with(LoggerSinkLayer::new(config.logger_sink.clone()))
        .with(filter)
        .try_init()
        .map_err(|e| Error::Config(format!("Failed to initialize logging: {}", e)))
}

fn level_str(level: LogLevel) -> &'static str {
    match level {
        LogLevel::Trace => "trace",
        LogLevel::Debug => "debug",
        LogLevel::Info => "info",
        LogLevel::Warn => "warn",
        LogLevel::Error => "error",
    }
}

fn build_filter(config: &LoggingConfig) -> Result<EnvFilter> {
    let filter_string = match &config.filter {
        Some(custom) => custom.clone(),
        None => {
            let level = level_str(config.level);
            let mut directives: Vec<String> = WORKSPACE_CRATES
                .iter()
                .map(|krate| format!("{}={}", krate, level))
                .collect();
            directives.push("sqlx=warn".to_string());
            directives.join(",")
        }
    };

    EnvFilter::try_new(filter_string)
        .map_err(|e| Error::Config(format!("Invalid log filter: {}", e)))
}

fn build_fmt_layer(config: &LoggingConfig) -> Box<dyn Layer<Registry> + Send + Sync> {
    match config.format {
        LogFormat::Pretty => tracing_subscriber::fmt::layer()
            .pretty()
            .with_target(config.display_target)
            .with_thread_ids(config.display_thread_info)
            .with_thread_names(config.display_thread_info)
            .with_span_events(if config.enable_spans {
                FmtSpan::ACTIVE
            } else {
                FmtSpan::NONE
            })
            .with_writer(io::stdout)
            .boxed(),
        LogFormat::Json => tracing_subscriber::fmt::layer()
            .json()
            .flatten_event(true)
            .with_current_span(config.enable_spans)
            .with_span_list(config.enable_spans)
            .with_target(config.display_target)
            .with_thread_ids(config.display_thread_info)
            .with_thread_names(config.display_thread_info)
            .with_writer(io::stdout)
            .boxed(),
        LogFormat::Compact => tracing_subscriber::fmt::layer()
            .compact()
            .with_target(config.display_target)
            .with_thread_ids(config.display_thread_info)
            .with_thread_names(config.display_thread_info)
            .with_writer(io::stdout)
            .boxed(),
    }
}

/// Layer that forwards events to a `LoggerSink` implementation.
struct LoggerSinkLayer {
    sink: Option<Arc<dyn LoggerSink>>,
}

impl LoggerSinkLayer {
    fn new(sink: Option<Arc<dyn LoggerSink>>) -> Self {
        Self { sink }
    }
}

impl<S> Layer<S> for LoggerSinkLayer
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_event(&self, event: &Event<'_>, ctx: Context<'_, S>) {
        let Some(sink) = self.sink.as_ref() else {
            return;
        };

        let metadata = event.metadata();
        let level = tracing_level_to_log_level(*metadata.level());
        if level < sink.min_level() {
            return;
        }

        let mut visitor = SinkVisitor::default();
        event.record(&mut visitor);

        let message = visitor
            .message
            .unwrap_or_else(|| metadata.name().to_string());
        let mut entry = LogEntry::new(level, metadata.target(), message);
        for (key, value) in visitor.fields {
            entry = entry.with_field(key, value);
        }
        if let Some(span) = ctx.lookup_current() {
            entry.span_id = Some(span.name().to_string());
        }

        let sink = Arc::clone(sink);

        // Inside a runtime the sink call is spawned; outside one it runs inline.
        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            handle.spawn(async move {
                if let Err(err) = sink.log(entry).await {
                    eprintln!("LoggerSink error: {}", err);
                }
            });
            return;
        }

        if let Err(err) = futures::executor::block_on(sink.log(entry)) {
            eprintln!("LoggerSink error: {}", err);
        }
    }
}

#[derive(Default)]
struct SinkVisitor {
    message: Option<String>,
    fields: HashMap<String, String>,
}

impl SinkVisitor {
    fn record_value(&mut self, field: &Field, value: String) {
        if field.name() == "message" {
            self.message = Some(value);
        } else {
            self.fields.insert(field.name().to_string(), value);
        }
    }
}

impl Visit for SinkVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        self.record_value(field, value.to_string());
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.record_value(field, value.to_string());
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.record_value(field, value.to_string());
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.record_value(field, value.to_string());
    }

    fn record_f64(&mut self, field: &Field, value: f64) {
        self.record_value(field, value.to_string());
    }

    fn record_error(&mut self, field: &Field, value: &(dyn std::error::Error + 'static)) {
        self.record_value(field, value.to_string());
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        self.record_value(field, format!("{:?}", value));
    }
}

fn tracing_level_to_log_level(level: tracing::Level) -> LogLevel {
    match level {
        tracing::Level::TRACE => LogLevel::Trace,
        tracing::Level::DEBUG => LogLevel::Debug,
        tracing::Level::INFO => LogLevel::Info,
        tracing::Level::WARN => LogLevel::Warn,
        tracing::Level::ERROR => LogLevel::Error,
    }
}

/// Drop the query string and fragment of a stream URL.
///
/// Resolved URLs are usually signed; the signature must not reach log files.
///
/// ```
/// use core_runtime::logging::redact_url;
///
/// assert_eq!(
///     redact_url("https://cdn.example.com/a.flac?sig=abc#t=1"),
///     "https://cdn.example.com/a.flac?[REDACTED]"
/// );
/// ```
pub fn redact_url(url: &str) -> String {
    match url.find(|c| c == '?' || c == '#') {
        Some(idx) => format!("{}?[REDACTED]", &url[..idx]),
        None => url.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bridge_traits::error::Result as SinkResult;
    use std::sync::Mutex;

    #[test]
    fn test_logging_config_builder() {
        let config = LoggingConfig::default()
            .with_format(LogFormat::Json)
            .with_level(LogLevel::Debug)
            .with_filter("core_playback=trace")
            .with_spans(true)
            .with_target(false)
            .with_thread_info(true);

        assert_eq!(config.format, LogFormat::Json);
        assert_eq!(config.level, LogLevel::Debug);
        assert_eq!(config.filter.as_deref(), Some("core_playback=trace"));
        assert!(config.enable_spans);
        assert!(!config.display_target);
        assert!(config.display_thread_info);
    }

    #[test]
    fn test_redact_url() {
        assert_eq!(
            redact_url("https://cdn.example.com/x.mp3?token=1"),
            "https://cdn.example.com/x.mp3?[REDACTED]"
        );
        assert_eq!(
            redact_url("https://cdn.example.com/x.mp3"),
            "https://cdn.example.com/x.mp3"
        );
    }

    #[test]
    fn test_default_filter_covers_workspace() {
        let config = LoggingConfig::default().with_level(LogLevel::Debug);
        let filter = build_filter(&config).unwrap().to_string();
        assert!(filter.contains("core_playback=debug"));
        assert!(filter.contains("sqlx=warn"));
    }

    #[test]
    fn test_invalid_filter_is_config_error() {
        let config = LoggingConfig::default().with_filter("core_playback=notalevel");
        assert!(matches!(build_filter(&config), Err(Error::Config(_))));
    }

    #[test]
    fn test_logger_sink_layer_forwards_event() {
        let sink = Arc::new(TestLoggerSink::default());
        let trait_sink: Arc<dyn LoggerSink> = sink.clone();
        let subscriber =
            tracing_subscriber::registry().with(LoggerSinkLayer::new(Some(trait_sink)));
        let _guard = tracing::subscriber::set_default(subscriber);

        tracing::info!(target: "core_playback::orchestrator", track = "primary:1", "loading");
        tracing::trace!(target: "core_playback", "below sink level");

        let entries = sink.entries.lock().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].target, "core_playback::orchestrator");
        assert_eq!(entries[0].message, "loading");
        assert_eq!(entries[0].fields.get("track").map(String::as_str), Some("primary:1"));
    }

    #[derive(Default)]
    struct TestLoggerSink {
        entries: Mutex<Vec<LogEntry>>,
    }

    #[async_trait]
    impl LoggerSink for TestLoggerSink {
        async fn log(&self, entry: LogEntry) -> SinkResult<()> {
            self.entries.lock().unwrap().push(entry);
            Ok(())
        }

        fn min_level(&self) -> LogLevel {
            LogLevel::Debug
        }
    }
}
