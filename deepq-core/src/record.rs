//! Types for recording training metrics.
//!
//! A [`Record`] is a set of named values produced during training or
//! evaluation (losses, returns, epsilon). Records flow from the agent and
//! the trainer into a [`Recorder`], which decides what to do with them:
//! [`BufferedRecorder`] keeps them in memory for inspection (used in
//! tests), [`NullRecorder`] discards them.
mod base;
mod buffered_recorder;
mod null_recorder;
mod recorder;

pub use base::{Record, RecordValue};
pub use buffered_recorder::BufferedRecorder;
pub use null_recorder::NullRecorder;
pub use recorder::Recorder;
