//! Stage trait and implementations.
//!
//! Stages are the units of work a pipeline runs one after another. A stage
//! reads what earlier stages left in the [`SharedState`], writes its own
//! outputs, and reports through a finite stream of [`Event`]s.

use crate::context::SharedState;
use crate::core::Event;
use crate::errors::StageError;
use async_stream::stream;
use futures::Stream;
use std::fmt::Debug;
use std::pin::Pin;

/// A lazy, finite, non-restartable sequence of events.
pub type EventStream<'a> = Pin<Box<dyn Stream<Item = Event> + Send + 'a>>;

/// Trait for pipeline stages.
///
/// Implementations must keep every failure inside the stream:
///
/// - check every state key the stage depends on before doing real work, and
///   emit exactly one terminal event naming the first missing key;
/// - write output keys *before* yielding the event that reports completion;
/// - convert I/O, remote-call, and parse failures into exactly one terminal
///   event (see [`StageError::into_event`]) instead of panicking.
///
/// Nothing should happen until the returned stream is polled.
pub trait Stage: Send + Sync + Debug {
    /// Returns the name of the stage, used as the author of its events.
    fn name(&self) -> &str;

    /// Executes the stage against the run's shared state.
    fn execute<'a>(&'a self, state: &'a mut SharedState) -> EventStream<'a>;
}

/// A stage backed by a synchronous function.
///
/// `Ok(text)` becomes one progress event, `Err` becomes one terminal event.
pub struct FnStage<F>
where
    F: Fn(&mut SharedState) -> Result<String, StageError> + Send + Sync,
{
    name: String,
    func: F,
}

impl<F> FnStage<F>
where
    F: Fn(&mut SharedState) -> Result<String, StageError> + Send + Sync,
{
    /// Creates a new function-based stage.
    pub fn new(name: impl Into<String>, func: F) -> Self {
        Self {
            name: name.into(),
            func,
        }
    }
}

impl<F> Debug for FnStage<F>
where
    F: Fn(&mut SharedState) -> Result<String, StageError> + Send + Sync,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnStage").field("name", &self.name).finish()
    }
}

impl<F> Stage for FnStage<F>
where
    F: Fn(&mut SharedState) -> Result<String, StageError> + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn execute<'a>(&'a self, state: &'a mut SharedState) -> EventStream<'a> {
        Box::pin(stream! {
            match (self.func)(state) {
                Ok(text) => {
                    yield Event::progress(&self.name, text);
                }
                Err(err) => {
                    yield err.into_event(&self.name);
                }
            }
        })
    }
}

/// A stage that does nothing and emits no events.
#[derive(Debug, Clone)]
pub struct NoOpStage {
    name: String,
}

impl NoOpStage {
    /// Creates a new no-op stage.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl Stage for NoOpStage {
    fn name(&self) -> &str {
        &self.name
    }

    fn execute<'a>(&'a self, _state: &'a mut SharedState) -> EventStream<'a> {
        Box::pin(futures::stream::empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;
    use serde_json::json;

    #[tokio::test]
    async fn test_fn_stage_success() {
        let stage = FnStage::new("writer", |state: &mut SharedState| {
            state.set("out", json!("done"));
            Ok("written".to_string())
        });
        let mut state = SharedState::new();

        let events: Vec<Event> = stage.execute(&mut state).collect().await;

        assert_eq!(events.len(), 1);
        assert_eq!(events[0].text(), "written");
        assert!(!events[0].is_terminal());
        assert_eq!(state.get("out"), Some(&json!("done")));
    }

    #[tokio::test]
    async fn test_fn_stage_failure_is_terminal() {
        let stage = FnStage::new("reader", |state: &mut SharedState| {
            state.require("x")?;
            Ok("unreachable".to_string())
        });
        let mut state = SharedState::new();

        let events: Vec<Event> = stage.execute(&mut state).collect().await;

        assert_eq!(events.len(), 1);
        assert!(events[0].is_terminal());
        assert_eq!(events[0].text(), "missing dependency: x");
    }

    #[tokio::test]
    async fn test_fn_stage_is_lazy() {
        let stage = FnStage::new("writer", |state: &mut SharedState| {
            state.set("touched", json!(true));
            Ok(String::new())
        });
        let mut state = SharedState::new();

        drop(stage.execute(&mut state));

        assert!(state.is_empty());
    }

    #[tokio::test]
    async fn test_noop_stage() {
        let stage = NoOpStage::new("noop");
        let mut state = SharedState::new();

        assert_eq!(stage.name(), "noop");
        assert_eq!(stage.execute(&mut state).count().await, 0);
    }
}
