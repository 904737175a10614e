//! Event sink system for observability.
//!
//! The runner hands every event it relays to an [`EventSink`] before yielding
//! it to the caller. A process-wide default sink can be installed so runners
//! built without an explicit sink still report somewhere.

mod sink;

pub use sink::{CollectingEventSink, EventSink, LoggingEventSink, NoOpEventSink};

use parking_lot::RwLock;
use std::sync::Arc;

static GLOBAL_EVENT_SINK: RwLock<Option<Arc<dyn EventSink>>> = RwLock::new(None);

/// Sets the current global event sink.
pub fn set_event_sink(sink: Arc<dyn EventSink>) {
    *GLOBAL_EVENT_SINK.write() = Some(sink);
}

/// Clears the current global event sink.
pub fn clear_event_sink() {
    *GLOBAL_EVENT_SINK.write() = None;
}

/// Gets the current global event sink.
///
/// Returns a `NoOpEventSink` if no sink is set.
pub fn get_event_sink() -> Arc<dyn EventSink> {
    GLOBAL_EVENT_SINK
        .read()
        .clone()
        .unwrap_or_else(|| Arc::new(NoOpEventSink))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Event;

    #[test]
    fn test_set_get_and_clear_sink() {
        let collecting = Arc::new(CollectingEventSink::new());
        set_event_sink(collecting.clone());

        get_event_sink().emit(&Event::progress("global-sink-test", "b"));
        assert_eq!(collecting.events_from("global-sink-test").len(), 1);

        clear_event_sink();
        get_event_sink().emit(&Event::progress("global-sink-test", "c"));
        assert_eq!(collecting.events_from("global-sink-test").len(), 1);
    }
}
