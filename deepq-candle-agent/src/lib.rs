#![warn(missing_docs)]
//! DQN agent implemented with [candle](https://crates.io/crates/candle-core).
//!
//! The agent in [`dqn`] plugs into the traits of `deepq-core`: it is a
//! [`Policy`] selecting discrete actions from the action-value output of a
//! Q-network, and an [`Agent`] learning that network from batches sampled
//! out of a replay buffer.
//!
//! [`Policy`]: deepq_core::Policy
//! [`Agent`]: deepq_core::Agent
pub mod dqn;
pub mod mlp;
pub mod model;
pub mod opt;
mod tensor_batch;
pub mod util;
use serde::{Deserialize, Serialize};
pub use tensor_batch::TensorBatch;

#[derive(Clone, Debug, Copy, Deserialize, Serialize, PartialEq)]
/// Device for using candle.
///
/// This enum is added because [`candle_core::Device`] does not support
/// serialization.
pub enum Device {
    /// The main CPU device.
    Cpu,

    /// The main GPU device.
    Cuda(usize),
}

impl From<candle_core::Device> for Device {
    fn from(device: candle_core::Device) -> Self {
        match device {
            candle_core::Device::Cpu => Self::Cpu,
            _ => unimplemented!(),
        }
    }
}

impl Into<candle_core::Device> for Device {
    fn into(self) -> candle_core::Device {
        match self {
            Self::Cpu => candle_core::Device::Cpu,
            Self::Cuda(n) => candle_core::Device::new_cuda(n).unwrap(),
        }
    }
}
