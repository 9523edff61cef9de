//! Structured logging: tracing subscriber setup and one-line JSON emission.

mod format;

pub use format::{StageEvent, StructuredLogger};
