//! Integration tests for logging system

use async_trait::async_trait;
use bridge_traits::error::Result as SinkResult;
use bridge_traits::time::{LogEntry, LogLevel, LoggerSink};
use core_runtime::logging::{init_logging, redact_url, LogFormat, LoggingConfig};
use core_runtime::Error;
use std::sync::{Arc, Mutex};

#[derive(Default)]
struct CollectingSink {
    entries: Mutex<Vec<LogEntry>>,
}

#[async_trait]
impl LoggerSink for CollectingSink {
    async fn log(&self, entry: LogEntry) -> SinkResult<()> {
        self.entries.lock().unwrap().push(entry);
        Ok(())
    }

    fn min_level(&self) -> LogLevel {
        LogLevel::Info
    }
}

// The global subscriber can only be installed once per process, so every
// assertion about it lives in this single test.
#[test]
fn test_global_initialization_forwards_to_sink() {
    let sink = Arc::new(CollectingSink::default());
    let config = LoggingConfig::default()
        .with_format(LogFormat::Compact)
        .with_level(LogLevel::Debug)
        .with_logger_sink(sink.clone());

    init_logging(config).unwrap();

    tracing::info!(target: "core_playback::orchestrator", track = "primary:9", "Track loaded");
    tracing::debug!(target: "core_playback", "below the sink threshold");
    tracing::info!(target: "some_other_crate", "filtered by the env filter");

    {
        let entries = sink.entries.lock().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].message, "Track loaded");
        assert_eq!(
            entries[0].fields.get("track").map(String::as_str),
            Some("primary:9")
        );
    }

    let second = init_logging(LoggingConfig::default());
    assert!(matches!(second, Err(Error::Config(_))));
}

#[test]
fn test_url_redaction() {
    let url = "https://m701.music.example.com/obj/abc.mp3?vuutv=signed&expires=1";
    let redacted = redact_url(url);
    assert!(!redacted.contains("signed"));
    assert!(redacted.starts_with("https://m701.music.example.com/obj/abc.mp3"));
}
