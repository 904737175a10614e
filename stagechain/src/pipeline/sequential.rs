//! Sequential pipeline executor.

use crate::context::SharedState;
use crate::observability::SpanTimer;
use crate::stages::{EventStream, Stage};
use async_stream::stream;
use futures::StreamExt;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// An ordered list of stages.
///
/// Running a pipeline relays each stage's events as they are produced and
/// stops right after the first terminal event. Stages after that one are
/// never invoked. A pipeline with no stages produces no events.
#[derive(Clone)]
pub struct Pipeline {
    name: String,
    stages: Vec<Arc<dyn Stage>>,
}

impl Pipeline {
    /// Creates an empty pipeline.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            stages: Vec::new(),
        }
    }

    /// Appends a stage.
    #[must_use]
    pub fn stage(self, stage: impl Stage + 'static) -> Self {
        self.with_stage(Arc::new(stage))
    }

    /// Appends a shared stage.
    #[must_use]
    pub fn with_stage(mut self, stage: Arc<dyn Stage>) -> Self {
        self.stages.push(stage);
        self
    }

    /// Returns the pipeline name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the stage names in execution order.
    #[must_use]
    pub fn stage_names(&self) -> Vec<&str> {
        self.stages.iter().map(|s| s.name()).collect()
    }

    /// Returns the number of stages.
    #[must_use]
    pub fn len(&self) -> usize {
        self.stages.len()
    }

    /// Returns true if the pipeline has no stages.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Runs every stage in order against `state`.
    ///
    /// The returned stream is lazy: no stage runs until it is polled, and
    /// dropping it stops the run (no further stage is invoked and no further
    /// state is written).
    pub fn run<'a>(&'a self, state: &'a mut SharedState) -> EventStream<'a> {
        Box::pin(stream! {
            let timer = SpanTimer::start(&self.name);
            info!(pipeline = %self.name, stages = self.stages.len(), "Pipeline started");

            for (index, stage) in self.stages.iter().enumerate() {
                let stage_timer = SpanTimer::start(stage.name());
                info!(pipeline = %self.name, stage = stage.name(), index, "Stage started");

                let mut events = stage.execute(&mut *state);
                let mut emitted = 0_usize;

                while let Some(event) = events.next().await {
                    emitted += 1;
                    let terminal = event.is_terminal();
                    yield event;

                    if terminal {
                        warn!(
                            pipeline = %self.name,
                            stage = stage.name(),
                            skipped = self.stages.len() - index - 1,
                            "Terminal event, stopping pipeline"
                        );
                        return;
                    }
                }

                if emitted == 0 {
                    debug!(stage = stage.name(), "Stage produced no events");
                }
                debug!(
                    stage = stage_timer.name(),
                    events = emitted,
                    duration_ms = stage_timer.elapsed_ms(),
                    "Stage finished"
                );
            }

            info!(pipeline = timer.name(), duration_ms = timer.elapsed_ms(), "Pipeline completed");
        })
    }
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("name", &self.name)
            .field("stages", &self.stage_names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Event;
    use crate::stages::NoOpStage;
    use crate::testing::ScriptedStage;

    #[test]
    fn test_pipeline_builder() {
        let pipeline = Pipeline::new("p")
            .stage(NoOpStage::new("a"))
            .stage(NoOpStage::new("b"));

        assert_eq!(pipeline.name(), "p");
        assert_eq!(pipeline.len(), 2);
        assert_eq!(pipeline.stage_names(), vec!["a", "b"]);
        assert!(format!("{pipeline:?}").contains("\"a\""));
    }

    #[tokio::test]
    async fn test_run_is_lazy() {
        let first = ScriptedStage::new("first").writes("x", serde_json::json!(1));
        let log = first.log();
        let pipeline = Pipeline::new("p").stage(first);
        let mut state = SharedState::new();

        drop(pipeline.run(&mut state));

        assert!(log.lock().is_empty());
        assert!(state.is_empty());
    }

    #[tokio::test]
    async fn test_dropping_stream_stops_later_stages() {
        let log = crate::testing::CallLog::default();
        let pipeline = Pipeline::new("p")
            .stage(ScriptedStage::new("a").logging_to(&log).emits("a done"))
            .stage(
                ScriptedStage::new("b")
                    .logging_to(&log)
                    .writes("b_out", serde_json::json!(true))
                    .emits("b done"),
            );
        let mut state = SharedState::new();

        {
            let mut events = pipeline.run(&mut state);
            let first: Option<Event> = events.next().await;
            assert_eq!(first.map(|e| e.author().to_string()), Some("a".to_string()));
        }

        assert_eq!(*log.lock(), vec!["a".to_string()]);
        assert!(!state.contains("b_out"));
    }

    #[tokio::test]
    async fn test_events_after_terminal_are_discarded() {
        let pipeline = Pipeline::new("p").stage(
            ScriptedStage::new("chatty")
                .emits_terminal("stop")
                .writes("late", serde_json::json!(1))
                .emits("ignored"),
        );
        let mut state = SharedState::new();

        let events: Vec<Event> = pipeline.run(&mut state).collect().await;

        assert_eq!(events.len(), 1);
        assert!(!state.contains("late"));
    }
}
