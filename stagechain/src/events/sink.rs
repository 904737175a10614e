//! Event sink trait and implementations.

use crate::core::Event;
use parking_lot::RwLock;
use tracing::{debug, info, warn, Level};

/// Receives every event a runner relays.
///
/// Sinks observe; they cannot alter or drop events on the way to the caller.
/// Implementations must not panic.
pub trait EventSink: Send + Sync {
    /// Records one event.
    fn emit(&self, event: &Event);
}

/// A no-op event sink that discards all events.
///
/// Used as the default when no sink is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpEventSink;

impl EventSink for NoOpEventSink {
    fn emit(&self, _event: &Event) {}
}

/// An event sink that logs events using the tracing framework.
///
/// Terminal events are always logged at `WARN` so a stopped run is visible
/// at default filter levels.
#[derive(Debug, Clone)]
pub struct LoggingEventSink {
    level: Level,
}

impl Default for LoggingEventSink {
    fn default() -> Self {
        Self { level: Level::INFO }
    }
}

impl LoggingEventSink {
    /// Creates a new logging event sink with the specified level.
    #[must_use]
    pub fn new(level: Level) -> Self {
        Self { level }
    }

    /// Creates a debug-level logging sink.
    #[must_use]
    pub fn debug() -> Self {
        Self::new(Level::DEBUG)
    }

    /// Creates an info-level logging sink.
    #[must_use]
    pub fn info() -> Self {
        Self::new(Level::INFO)
    }
}

impl EventSink for LoggingEventSink {
    fn emit(&self, event: &Event) {
        let author = event.author();
        let text = event.text();

        if event.is_terminal() {
            warn!(author, terminal = true, event_id = %event.id(), "{}", text);
        } else if self.level == Level::DEBUG {
            debug!(author, terminal = false, event_id = %event.id(), "{}", text);
        } else {
            info!(author, terminal = false, event_id = %event.id(), "{}", text);
        }
    }
}

/// A sink that keeps an ordered copy of every event.
#[derive(Debug, Default)]
pub struct CollectingEventSink {
    events: RwLock<Vec<Event>>,
}

impl CollectingEventSink {
    /// Creates a new collecting sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns all collected events.
    #[must_use]
    pub fn events(&self) -> Vec<Event> {
        self.events.read().clone()
    }

    /// Returns the number of collected events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.read().len()
    }

    /// Returns true if no events have been collected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.read().is_empty()
    }

    /// Clears all collected events.
    pub fn clear(&self) {
        self.events.write().clear();
    }

    /// Returns events produced by one stage.
    #[must_use]
    pub fn events_from(&self, author: &str) -> Vec<Event> {
        self.events
            .read()
            .iter()
            .filter(|e| e.author() == author)
            .cloned()
            .collect()
    }
}

impl EventSink for CollectingEventSink {
    fn emit(&self, event: &Event) {
        self.events.write().push(event.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_noop_sink() {
        NoOpEventSink.emit(&Event::progress("a", "b"));
    }

    #[test]
    fn test_logging_sink() {
        let sink = LoggingEventSink::default();
        sink.emit(&Event::progress("a", "progress"));
        sink.emit(&Event::terminal("a", "stop"));
        LoggingEventSink::debug().emit(&Event::progress("a", "quiet"));
    }

    #[test]
    fn test_collecting_sink() {
        let sink = CollectingEventSink::new();
        assert!(sink.is_empty());

        sink.emit(&Event::progress("first", "1"));
        sink.emit(&Event::terminal("second", "2"));

        assert_eq!(sink.len(), 2);
        let events = sink.events();
        assert_eq!(events[0].author(), "first");
        assert!(events[1].is_terminal());
    }

    #[test]
    fn test_collecting_sink_filter_and_clear() {
        let sink = CollectingEventSink::new();
        sink.emit(&Event::progress("ingest", "a"));
        sink.emit(&Event::progress("report", "b"));
        sink.emit(&Event::progress("ingest", "c"));

        assert_eq!(sink.events_from("ingest").len(), 2);

        sink.clear();
        assert!(sink.is_empty());
    }
}
