//! Pipeline building and execution.
//!
//! A [`Pipeline`] is an ordered list of stages run strictly one at a time
//! against a single [`SharedState`](crate::context::SharedState). The first
//! terminal event stops the run.

mod sequential;

pub use sequential::Pipeline;
