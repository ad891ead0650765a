#![warn(missing_docs)]
//! Backend-agnostic core of a deep Q-learning library.
//!
//! This crate defines the seams between the three moving parts of a
//! Q-learning system: an environment implementing [`Env`], an agent
//! implementing [`Agent`], and an experience store implementing
//! [`ReplayBufferBase`]. On top of these it provides a generic ring-buffer
//! replay memory ([`generic_replay_buffer`]), an episode-driven training
//! loop ([`Trainer`]) and a greedy evaluation loop ([`DefaultEvaluator`]).
//!
//! Concrete agents live in backend crates (see `deepq-candle-agent`).
pub mod error;
pub mod generic_replay_buffer;
pub mod record;

mod base;
pub use base::{
    Act, Agent, Configurable, Env, ExperienceBufferBase, Info, Obs, Policy, ReplayBufferBase,
    Step, StepProcessor, TransitionBatch,
};

mod evaluator;
pub use evaluator::{DefaultEvaluator, Evaluator};

mod trainer;
pub use trainer::{Sampler, Trainer, TrainerConfig, TrainingSummary};
