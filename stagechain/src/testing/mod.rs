//! Testing utilities for stagechain pipelines.
//!
//! This module provides:
//! - Scripted stages with invocation tracking
//! - Assertions over event sequences

mod assertions;
mod mocks;

pub use assertions::{assert_authors, assert_no_terminal, assert_terminal_last};
pub use mocks::{CallLog, ScriptedStage};
