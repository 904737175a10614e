//! Top-level run driver.
//!
//! The [`Runner`] binds a pipeline to sessions held by an
//! [`InMemorySessionService`]. It relays the pipeline's events, mirrors each
//! one into an [`EventSink`], and decides what the end of a run means.

mod report;

pub use report::{RunOutcome, RunReport};

use crate::context::{InMemorySessionService, Session, SessionKey};
use crate::core::Event;
use crate::errors::EngineError;
use crate::events::{get_event_sink, EventSink};
use crate::pipeline::Pipeline;
use crate::stages::EventStream;
use async_stream::stream;
use futures::StreamExt;
use std::fmt;
use std::sync::Arc;
use tokio::sync::OwnedMutexGuard;
use tracing::info;

/// Drives one pipeline over sessions of one application.
#[derive(Clone)]
pub struct Runner {
    app_name: String,
    pipeline: Arc<Pipeline>,
    sessions: Arc<InMemorySessionService>,
    event_sink: Arc<dyn EventSink>,
}

impl Runner {
    /// Creates a runner that reports to the global event sink.
    #[must_use]
    pub fn new(
        app_name: impl Into<String>,
        pipeline: Arc<Pipeline>,
        sessions: Arc<InMemorySessionService>,
    ) -> Self {
        Self {
            app_name: app_name.into(),
            pipeline,
            sessions,
            event_sink: get_event_sink(),
        }
    }

    /// Sets the event sink.
    #[must_use]
    pub fn with_event_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.event_sink = sink;
        self
    }

    /// Returns the application name.
    #[must_use]
    pub fn app_name(&self) -> &str {
        &self.app_name
    }

    /// Returns the pipeline.
    #[must_use]
    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    /// Returns the session service.
    #[must_use]
    pub fn session_service(&self) -> &Arc<InMemorySessionService> {
        &self.sessions
    }

    /// Starts a run against an existing session.
    ///
    /// The session is claimed and locked here, before any stage runs, and
    /// stays locked until the stream ends or is dropped. Stages still run only
    /// when the stream is polled. A session carries exactly one run.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::SessionNotFound` if the session was never created,
    /// `EngineError::SessionInUse` if it is locked by a run or a reader, and
    /// `EngineError::SessionAlreadyRun` if a run was already started on it.
    pub fn run(&self, user_id: &str, session_id: &str) -> Result<EventStream<'static>, EngineError> {
        let mut session = self.claim(user_id, session_id)?;
        let pipeline = Arc::clone(&self.pipeline);
        let sink = Arc::clone(&self.event_sink);

        Ok(Box::pin(stream! {
            let mut events = relay(&pipeline, sink.as_ref(), &mut session);
            while let Some(event) = events.next().await {
                yield event;
            }
        }))
    }

    /// Runs to the end and reports the outcome with the final state.
    ///
    /// The final state is read before the session lock is released, so it is
    /// always the state this run's pipeline left behind.
    ///
    /// # Errors
    ///
    /// Same as [`Runner::run`].
    pub async fn run_to_completion(
        &self,
        user_id: &str,
        session_id: &str,
    ) -> Result<RunReport, EngineError> {
        let mut session = self.claim(user_id, session_id)?;
        let events: Vec<Event> = relay(&self.pipeline, self.event_sink.as_ref(), &mut session)
            .collect()
            .await;

        Ok(RunReport::new(events, session.state().snapshot()))
    }

    fn claim(&self, user_id: &str, session_id: &str) -> Result<OwnedMutexGuard<Session>, EngineError> {
        let key = self.key(user_id, session_id);
        let handle = self.sessions.handle(&key).ok_or_else(|| not_found(&key))?;
        let mut session = handle.try_lock_owned().map_err(|_| EngineError::SessionInUse {
            session: key.to_string(),
        })?;

        if session.has_run() {
            return Err(EngineError::SessionAlreadyRun {
                session: key.to_string(),
            });
        }
        session.mark_run();
        Ok(session)
    }

    fn key(&self, user_id: &str, session_id: &str) -> SessionKey {
        SessionKey::new(&self.app_name, user_id, session_id)
    }
}

fn relay<'a>(
    pipeline: &'a Pipeline,
    sink: &'a dyn EventSink,
    session: &'a mut Session,
) -> EventStream<'a> {
    Box::pin(stream! {
        let key = session.key().clone();
        info!(session = %key, pipeline = pipeline.name(), "Run started");

        let mut terminated = false;
        {
            let mut events = pipeline.run(session.state_mut());
            while let Some(event) = events.next().await {
                terminated = event.is_terminal();
                sink.emit(&event);
                yield event;
            }
        }

        session.touch();
        info!(session = %key, terminated, keys = session.state().len(), "Run finished");
    })
}

impl fmt::Debug for Runner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runner")
            .field("app_name", &self.app_name)
            .field("pipeline", &self.pipeline)
            .finish_non_exhaustive()
    }
}

fn not_found(key: &SessionKey) -> EngineError {
    EngineError::SessionNotFound {
        app_name: key.app_name.clone(),
        user_id: key.user_id.clone(),
        session_id: key.session_id.clone(),
    }
}
