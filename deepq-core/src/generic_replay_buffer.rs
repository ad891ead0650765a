//! A generic ring-buffer replay memory with uniform sampling.
//!
//! Transitions are stored column-wise: observation and action columns are
//! generic [`BatchBase`] stores, reward and done flags are plain vectors.
//! [`SimpleReplayBuffer::batch`] draws indices uniformly at random without
//! replacement within a batch.
mod base;
mod batch;
mod config;
mod step_proc;
pub use base::SimpleReplayBuffer;
pub use batch::{BatchBase, GenericTransitionBatch};
pub use config::SimpleReplayBufferConfig;
pub use step_proc::{SimpleStepProcessor, SimpleStepProcessorConfig};
