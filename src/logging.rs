//! # Structured Logging
//!
//! Timestamped, sheet-scoped events emitted by the pipeline. There is no
//! process-wide logger; a sink handle is passed to the engine and shared by
//! concurrent sheet workers, so every sink serializes its own writes.
use chrono::DateTime;
use chrono::Utc;
use serde::Serialize;
use serde_json::Map;
use serde_json::Value;
use std::io::Write;
use std::sync::Mutex;

/// Severity of a log event.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogLevel {
    Info,
    Warn,
    Error,
}

/// One structured pipeline event.
#[derive(Clone, Debug, Serialize)]
pub struct LogEvent {
    /// UTC timestamp taken when the event was created
    pub ts: DateTime<Utc>,
    pub lvl: LogLevel,
    /// Event name, e.g. "split.blocks" or "merge.decision"
    pub event: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sheet: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub block: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Map::is_empty")]
    pub metrics: Map<String, Value>,
}

impl LogEvent {
    /// Creates an INFO event with the current UTC timestamp.
    pub fn new(event: &str) -> Self {
        LogEvent {
            ts: Utc::now(),
            lvl: LogLevel::Info,
            event: event.to_owned(),
            sheet: None,
            block: None,
            message: None,
            metrics: Map::new(),
        }
    }

    /// Sets the severity.
    pub fn level(mut self, lvl: LogLevel) -> Self {
        self.lvl = lvl;
        self
    }

    /// Scopes the event to a sheet.
    pub fn sheet(mut self, sheet: &str) -> Self {
        self.sheet = Some(sheet.to_owned());
        self
    }

    /// Scopes the event to a block label ("b1", "b2", ...).
    pub fn block(mut self, block: &str) -> Self {
        self.block = Some(block.to_owned());
        self
    }

    /// Attaches a free-form message.
    pub fn message(mut self, message: &str) -> Self {
        self.message = Some(message.to_owned());
        self
    }

    /// Attaches one metric value.
    pub fn metric(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.metrics.insert(key.to_owned(), value.into());
        self
    }
}

/// Destination for pipeline events. Implementations must serialize their
/// writes; events arrive from concurrent sheet workers.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: LogEvent);
}

/// Discards all events.
pub struct NullSink;

impl EventSink for NullSink {
    fn emit(&self, _: LogEvent) {}
}

/// Collects events in memory, mainly for tests and callers that want to
/// inspect the run afterwards.
#[derive(Default)]
pub struct MemorySink {
    events: Mutex<Vec<LogEvent>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a snapshot of all events emitted so far.
    pub fn events(&self) -> Vec<LogEvent> {
        self.events.lock().map(|events| events.clone()).unwrap_or_default()
    }
}

impl EventSink for MemorySink {
    fn emit(&self, event: LogEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}

/// Writes one JSON object per line to the wrapped writer. The writer sits
/// behind a mutex so concurrent sheet workers append whole lines in order
/// of arrival. Write failures are swallowed; logging never fails the run.
pub struct JsonLinesSink<W: Write + Send> {
    writer: Mutex<W>,
}

impl<W: Write + Send> JsonLinesSink<W> {
    pub fn new(writer: W) -> Self {
        JsonLinesSink {
            writer: Mutex::new(writer),
        }
    }

    /// Returns the wrapped writer.
    pub fn into_inner(self) -> W {
        match self.writer.into_inner() {
            Ok(writer) => writer,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl<W: Write + Send> EventSink for JsonLinesSink<W> {
    fn emit(&self, event: LogEvent) {
        if let (Ok(line), Ok(mut writer)) = (serde_json::to_string(&event), self.writer.lock()) {
            let _ = writeln!(writer, "{}", line);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn memory_sink_collects_in_order() {
        let sink = MemorySink::new();
        sink.emit(LogEvent::new("split.blocks").sheet("s1").metric("count", 2));
        sink.emit(LogEvent::new("sheet.empty").sheet("s2"));
        let events = sink.events();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].event, "split.blocks");
        assert_eq!(events[0].metrics["count"], 2);
        assert_eq!(events[1].sheet.as_deref(), Some("s2"));
    }

    #[test]
    fn json_lines_sink_writes_one_line_per_event() {
        let sink = JsonLinesSink::new(Vec::new());
        sink.emit(
            LogEvent::new("merge.decision")
                .sheet("s1")
                .level(LogLevel::Warn)
                .metric("gain", 0.25)
                .metric("merged", false),
        );
        let buffer = sink.into_inner();
        let text = String::from_utf8(buffer).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 1);
        let parsed: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(parsed["event"], "merge.decision");
        assert_eq!(parsed["lvl"], "WARN");
        assert_eq!(parsed["metrics"]["merged"], false);
        assert!(parsed.get("block").is_none());
    }
}
