//! End-of-run reporting.

use crate::core::Event;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// How a run ended, judged only by its last event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RunOutcome {
    /// Every stage ran and none emitted a terminal event.
    Completed,
    /// A terminal event stopped the run.
    Stopped {
        /// The stage that emitted the terminal event.
        stage: String,
        /// The terminal event's text.
        explanation: String,
    },
}

impl RunOutcome {
    /// Derives the outcome from an ordered event log.
    #[must_use]
    pub fn from_events(events: &[Event]) -> Self {
        match events.last() {
            Some(last) if last.is_terminal() => Self::Stopped {
                stage: last.author().to_string(),
                explanation: last.text(),
            },
            _ => Self::Completed,
        }
    }

    /// Returns true if a terminal event stopped the run.
    #[must_use]
    pub fn is_stopped(&self) -> bool {
        matches!(self, Self::Stopped { .. })
    }
}

/// Everything a caller learns from a finished run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    /// Every event, in the order it was produced.
    pub events: Vec<Event>,
    /// How the run ended.
    pub outcome: RunOutcome,
    /// A copy of the session state after the run.
    pub final_state: BTreeMap<String, serde_json::Value>,
}

impl RunReport {
    /// Builds a report, deriving the outcome from the events.
    #[must_use]
    pub fn new(events: Vec<Event>, final_state: BTreeMap<String, serde_json::Value>) -> Self {
        let outcome = RunOutcome::from_events(&events);
        Self {
            events,
            outcome,
            final_state,
        }
    }

    /// Returns the terminal event, if the run was stopped by one.
    #[must_use]
    pub fn terminal_event(&self) -> Option<&Event> {
        self.events.last().filter(|e| e.is_terminal())
    }

    /// Renders the one-line human explanation of how the run ended.
    #[must_use]
    pub fn summary(&self) -> String {
        match &self.outcome {
            RunOutcome::Completed => format!(
                "Pipeline finished: all stages completed ({} events).",
                self.events.len()
            ),
            RunOutcome::Stopped { stage, explanation } => {
                format!("Pipeline stopped by '{stage}': {explanation}")
            }
        }
    }
}
