//! # Stagechain
//!
//! A sequential stage pipeline engine.
//!
//! Stagechain runs a fixed, ordered list of stages over one piece of shared,
//! run-scoped state:
//!
//! - **Stages** read what earlier stages wrote, write their own outputs, and
//!   report progress as a lazy stream of events
//! - **Terminal events** stop the pipeline: no later stage is invoked
//! - **Sessions** bind a run to an (application, user, session) identity and
//!   own its state
//! - **Runners** drive a pipeline against a session and report how the run
//!   ended together with the final state
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use stagechain::prelude::*;
//!
//! let pipeline = Pipeline::new("analytics")
//!     .stage(IngestStage::new())
//!     .stage(TransformStage::new());
//!
//! let sessions = Arc::new(InMemorySessionService::new());
//! sessions.create_session("app", "user", Some("run-1"));
//!
//! let runner = Runner::new("app", Arc::new(pipeline), sessions);
//! let report = runner.run_to_completion("user", "run-1").await?;
//! println!("{}", report.summary());
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod analytics;
pub mod context;
pub mod core;
pub mod errors;
pub mod events;
pub mod observability;
pub mod pipeline;
pub mod runner;
pub mod stages;
pub mod utils;

#[cfg(test)]
pub(crate) mod testing;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::context::{InMemorySessionService, Session, SessionKey, SharedState};
    pub use crate::core::{Event, Part};
    pub use crate::errors::{EngineError, StageError};
    pub use crate::events::{CollectingEventSink, EventSink, LoggingEventSink, NoOpEventSink};
    pub use crate::pipeline::Pipeline;
    pub use crate::runner::{RunOutcome, RunReport, Runner};
    pub use crate::stages::{EventStream, FnStage, NoOpStage, Stage};
}
