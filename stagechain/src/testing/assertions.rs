//! Test assertions for event sequences.

use crate::core::Event;

/// Asserts that events were authored by `expected`, in order.
pub fn assert_authors(events: &[Event], expected: &[&str]) {
    let authors: Vec<&str> = events.iter().map(Event::author).collect();
    assert_eq!(authors, expected, "Unexpected event authors");
}

/// Asserts that no event in the sequence is terminal.
pub fn assert_no_terminal(events: &[Event]) {
    assert!(
        events.iter().all(|e| !e.is_terminal()),
        "Expected no terminal events, got: {:?}",
        events.iter().filter(|e| e.is_terminal()).map(Event::text).collect::<Vec<_>>()
    );
}

/// Asserts that the last event, and only the last, is terminal.
pub fn assert_terminal_last(events: &[Event]) {
    let Some((last, rest)) = events.split_last() else {
        panic!("Expected a terminal event, got an empty sequence");
    };
    assert!(last.is_terminal(), "Expected last event to be terminal: {last:?}");
    assert_no_terminal(rest);
}
