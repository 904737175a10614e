//! Core domain model types for stagechain.
//!
//! This module contains the event record stages use to report progress and
//! to request that the run stop.

mod event;

pub use event::{Event, Part};
