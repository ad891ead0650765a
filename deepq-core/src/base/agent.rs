//! Agent.
use super::{Env, Policy, ReplayBufferBase};
use crate::record::Record;
use anyhow::Result;
use std::path::Path;

/// Represents a trainable policy on an environment.
pub trait Agent<E: Env, R: ReplayBufferBase>: Policy<E> {
    /// Sets the policy to training mode.
    fn train(&mut self);

    /// Sets the policy to evaluation mode.
    fn eval(&mut self);

    /// Returns if it is in training mode.
    fn is_train(&self) -> bool;

    /// Performs an optimization step with a batch sampled from `buffer`.
    ///
    /// Returns `None` if the agent skipped the step, e.g. because the
    /// buffer does not hold enough transitions yet.
    fn opt(&mut self, buffer: &mut R) -> Option<Record>;

    /// Called by the trainer at the end of every training episode.
    ///
    /// Agents use this to advance per-episode schedules like epsilon
    /// annealing. The returned record is merged into the episode record.
    fn on_episode_end(&mut self) -> Record {
        Record::empty()
    }

    /// Saves the learned parameters of the agent at the given path.
    fn save_params(&self, path: &Path) -> Result<()>;

    /// Loads the learned parameters of the agent from the given path.
    ///
    /// Fails if the file does not exist or its contents do not match the
    /// constructed model.
    fn load_params(&mut self, path: &Path) -> Result<()>;
}
