//! Run context for pipeline execution.
//!
//! This module provides:
//! - The shared state stages read from and write to
//! - Session identity
//! - Sessions and the in-memory session service

mod identity;
mod session;
mod state;

pub use identity::SessionKey;
pub use session::{InMemorySessionService, Session, SessionHandle};
pub use state::SharedState;
