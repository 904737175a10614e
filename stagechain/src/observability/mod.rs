//! Observability utilities.

mod tracing;

pub use self::tracing::SpanTimer;
