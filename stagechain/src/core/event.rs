//! Event type emitted by stages during execution.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One piece of event content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Part {
    /// Human-readable text.
    Text(String),
    /// A structured payload.
    Data(serde_json::Value),
}

impl Part {
    /// Returns the text content, if this is a text part.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            Self::Data(_) => None,
        }
    }
}

/// An immutable record of something a stage did.
///
/// A `terminal` event tells the pipeline not to invoke any further stage,
/// whether the stage that produced it succeeded or failed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    id: Uuid,
    author: String,
    parts: Vec<Part>,
    terminal: bool,
    timestamp: String,
}

impl Event {
    /// Creates a new event.
    #[must_use]
    pub fn new(author: impl Into<String>, parts: Vec<Part>, terminal: bool) -> Self {
        Self {
            id: crate::utils::generate_uuid(),
            author: author.into(),
            parts,
            terminal,
            timestamp: crate::utils::iso_timestamp(),
        }
    }

    /// Creates a non-terminal event carrying one text part.
    #[must_use]
    pub fn progress(author: impl Into<String>, text: impl Into<String>) -> Self {
        Self::new(author, vec![Part::Text(text.into())], false)
    }

    /// Creates a terminal event carrying one text part.
    #[must_use]
    pub fn terminal(author: impl Into<String>, text: impl Into<String>) -> Self {
        Self::new(author, vec![Part::Text(text.into())], true)
    }

    /// Appends a structured payload part.
    #[must_use]
    pub fn with_data(mut self, value: serde_json::Value) -> Self {
        self.parts.push(Part::Data(value));
        self
    }

    /// Returns the event id.
    #[must_use]
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Returns the name of the stage that produced the event.
    #[must_use]
    pub fn author(&self) -> &str {
        &self.author
    }

    /// Returns the content parts in order.
    #[must_use]
    pub fn parts(&self) -> &[Part] {
        &self.parts
    }

    /// Returns true if the pipeline must stop after this event.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        self.terminal
    }

    /// Returns when the event was created (RFC 3339, UTC).
    #[must_use]
    pub fn timestamp(&self) -> &str {
        &self.timestamp
    }

    /// Joins all text parts with newlines.
    #[must_use]
    pub fn text(&self) -> String {
        self.parts
            .iter()
            .filter_map(Part::as_text)
            .collect::<Vec<_>>()
            .join("\n")
    }
}
