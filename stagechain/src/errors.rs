//! Error types for the stagechain engine.
//!
//! Two families live here. [`StageError`] describes why a single stage could
//! not do its work; it never crosses the stage boundary as a Rust error and is
//! always folded into one terminal [`Event`]. [`EngineError`] is what the
//! runner and the session service hand back to their callers.

use crate::core::Event;
use thiserror::Error;

/// Why a stage stopped the run.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StageError {
    /// A key the stage depends on was never written to the shared state.
    #[error("missing dependency: {key}")]
    MissingDependency {
        /// The absent state key.
        key: String,
    },

    /// An underlying operation (I/O, remote call, parse) failed.
    #[error("{context}: {message}")]
    CollaboratorFailure {
        /// What the stage was doing when it failed.
        context: String,
        /// The underlying error description.
        message: String,
    },

    /// The stage could not set up its external clients when it was built.
    #[error("configuration error: {0}")]
    Configuration(String),
}

impl StageError {
    /// Creates a missing dependency error.
    #[must_use]
    pub fn missing(key: impl Into<String>) -> Self {
        Self::MissingDependency { key: key.into() }
    }

    /// Wraps an underlying failure with the operation that triggered it.
    #[must_use]
    pub fn collaborator(context: impl Into<String>, err: impl std::fmt::Display) -> Self {
        Self::CollaboratorFailure {
            context: context.into(),
            message: err.to_string(),
        }
    }

    /// Creates a configuration error.
    #[must_use]
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    /// Returns a short machine-friendly kind label.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::MissingDependency { .. } => "missing_dependency",
            Self::CollaboratorFailure { .. } => "collaborator_failure",
            Self::Configuration(_) => "configuration",
        }
    }

    /// Converts the error into the single terminal event a stage must emit.
    #[must_use]
    pub fn into_event(self, author: &str) -> Event {
        tracing::warn!(stage = author, kind = self.kind(), error = %self, "Stage failed");
        Event::terminal(author, self.to_string())
            .with_data(serde_json::json!({ "error_kind": self.kind() }))
    }
}

/// Errors returned by the runner and session service.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    /// The run was requested against a session that was never created.
    #[error("session not found: app '{app_name}', user '{user_id}', session '{session_id}'")]
    SessionNotFound {
        /// Application name.
        app_name: String,
        /// User id.
        user_id: String,
        /// Session id.
        session_id: String,
    },

    /// The session is locked by another run or a reader.
    #[error("session '{session}' is in use")]
    SessionInUse {
        /// The session, as `app/user/session`.
        session: String,
    },

    /// A run was already started on this session.
    #[error("session '{session}' has already been run")]
    SessionAlreadyRun {
        /// The session, as `app/user/session`.
        session: String,
    },
}
