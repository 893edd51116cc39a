//! Clock and log-forwarding abstractions.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::Result;

/// Wall-clock source, injectable so snapshot timestamps are testable.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;

    fn unix_timestamp_millis(&self) -> i64 {
        self.now().timestamp_millis()
    }
}

#[derive(Debug, Clone, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock frozen at a single instant.
#[derive(Debug, Clone)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "TRACE",
            LogLevel::Debug => "DEBUG",
            LogLevel::Info => "INFO",
            LogLevel::Warn => "WARN",
            LogLevel::Error => "ERROR",
        }
    }
}

/// One structured log record forwarded to the host.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    pub level: LogLevel,
    pub timestamp: DateTime<Utc>,
    /// Module path that produced the record.
    pub target: String,
    pub message: String,
    pub fields: HashMap<String, String>,
    pub span_id: Option<String>,
}

impl LogEntry {
    pub fn new(level: LogLevel, target: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            level,
            timestamp: Utc::now(),
            target: target.into(),
            message: message.into(),
            fields: HashMap::new(),
            span_id: None,
        }
    }

    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    pub fn with_span_id(mut self, span_id: impl Into<String>) -> Self {
        self.span_id = Some(span_id.into());
        self
    }
}

/// Receives log records from the core and hands them to the host pipeline
/// (OSLog on iOS, Logcat on Android, stdout on desktop).
///
/// Implementations must not block; records below [`LoggerSink::min_level`]
/// are filtered before they are sent.
#[async_trait]
pub trait LoggerSink: Send + Sync {
    async fn log(&self, entry: LogEntry) -> Result<()>;

    async fn flush(&self) -> Result<()> {
        Ok(())
    }

    fn min_level(&self) -> LogLevel {
        LogLevel::Info
    }
}

/// Prints records to stdout; intended for development builds.
#[derive(Debug, Clone)]
pub struct ConsoleLogger {
    pub min_level: LogLevel,
}

impl Default for ConsoleLogger {
    fn default() -> Self {
        Self {
            min_level: LogLevel::Info,
        }
    }
}

#[async_trait]
impl LoggerSink for ConsoleLogger {
    async fn log(&self, entry: LogEntry) -> Result<()> {
        if entry.level < self.min_level {
            return Ok(());
        }

        let mut line = format!(
            "[{}] {} {}: {}",
            entry.timestamp.format("%Y-%m-%d %H:%M:%S%.3f"),
            entry.level.as_str(),
            entry.target,
            entry.message
        );
        if !entry.fields.is_empty() {
            let mut fields: Vec<_> = entry.fields.iter().collect();
            fields.sort();
            for (key, value) in fields {
                line.push_str(&format!(" {}={}", key, value));
            }
        }
        println!("{}", line);
        Ok(())
    }

    fn min_level(&self) -> LogLevel {
        self.min_level
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn fixed_clock_is_stable() {
        let instant = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let clock = FixedClock(instant);
        assert_eq!(clock.now(), instant);
        assert_eq!(clock.unix_timestamp_millis(), instant.timestamp_millis());
    }

    #[test]
    fn log_entry_builder() {
        let entry = LogEntry::new(LogLevel::Warn, "core_playback", "save failed")
            .with_field("key", "player.queue.v3")
            .with_span_id("span-1");

        assert_eq!(entry.level, LogLevel::Warn);
        assert_eq!(entry.fields.get("key").map(String::as_str), Some("player.queue.v3"));
        assert_eq!(entry.span_id.as_deref(), Some("span-1"));
    }

    #[tokio::test]
    async fn console_logger_accepts_entries() {
        let logger = ConsoleLogger {
            min_level: LogLevel::Debug,
        };
        logger
            .log(LogEntry::new(LogLevel::Trace, "test", "filtered"))
            .await
            .unwrap();
        logger
            .log(LogEntry::new(LogLevel::Info, "test", "printed"))
            .await
            .unwrap();
    }
}
