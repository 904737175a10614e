//! Mock stages for testing.

use async_stream::stream;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;

use crate::context::SharedState;
use crate::core::Event;
use crate::errors::StageError;
use crate::stages::{EventStream, Stage};

/// Shared, ordered record of which stages were invoked.
pub type CallLog = Arc<Mutex<Vec<String>>>;

#[derive(Debug, Clone)]
enum Step {
    Write(String, serde_json::Value),
    Emit { text: String, terminal: bool },
    Sleep(Duration),
}

/// A stage that replays a fixed script of writes and events.
///
/// Required keys are checked before any step runs, so a missing key yields
/// a single terminal event and no writes.
#[derive(Debug)]
pub struct ScriptedStage {
    name: String,
    requires: Vec<String>,
    steps: Vec<Step>,
    log: CallLog,
}

impl ScriptedStage {
    /// Creates a stage with an empty script.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            requires: Vec::new(),
            steps: Vec::new(),
            log: CallLog::default(),
        }
    }

    /// Records invocations into a log shared with other stages.
    #[must_use]
    pub fn logging_to(mut self, log: &CallLog) -> Self {
        self.log = Arc::clone(log);
        self
    }

    /// Adds a key that must be present before the script runs.
    #[must_use]
    pub fn requires(mut self, key: impl Into<String>) -> Self {
        self.requires.push(key.into());
        self
    }

    /// Appends a state write.
    #[must_use]
    pub fn writes(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.steps.push(Step::Write(key.into(), value));
        self
    }

    /// Appends a progress event.
    #[must_use]
    pub fn emits(mut self, text: impl Into<String>) -> Self {
        self.steps.push(Step::Emit {
            text: text.into(),
            terminal: false,
        });
        self
    }

    /// Appends a terminal event.
    #[must_use]
    pub fn emits_terminal(mut self, text: impl Into<String>) -> Self {
        self.steps.push(Step::Emit {
            text: text.into(),
            terminal: true,
        });
        self
    }

    /// Appends a pause.
    #[must_use]
    pub fn sleeps_ms(mut self, ms: u64) -> Self {
        self.steps.push(Step::Sleep(Duration::from_millis(ms)));
        self
    }

    /// Returns the invocation log.
    #[must_use]
    pub fn log(&self) -> CallLog {
        Arc::clone(&self.log)
    }
}

impl Stage for ScriptedStage {
    fn name(&self) -> &str {
        &self.name
    }

    fn execute<'a>(&'a self, state: &'a mut SharedState) -> EventStream<'a> {
        Box::pin(stream! {
            self.log.lock().push(self.name.clone());

            if let Some(missing) = self.requires.iter().find(|key| !state.contains(key)) {
                yield StageError::missing(missing.as_str()).into_event(&self.name);
                return;
            }

            for step in &self.steps {
                match step {
                    Step::Write(key, value) => {
                        state.set(key.clone(), value.clone());
                    }
                    Step::Emit { text, terminal } => {
                        yield Event::new(
                            &self.name,
                            vec![crate::core::Part::Text(text.clone())],
                            *terminal,
                        );
                    }
                    Step::Sleep(delay) => {
                        tokio::time::sleep(*delay).await;
                    }
                }
            }
        })
    }
}
