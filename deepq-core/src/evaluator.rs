//! Evaluation of trained agents.
use crate::{Agent, Env, ReplayBufferBase};
use anyhow::Result;
use crate::record::Record;
mod default_evaluator;
pub use default_evaluator::DefaultEvaluator;

/// Evaluates an [`Agent`] over a number of episodes.
pub trait Evaluator<E: Env> {
    /// Runs evaluation episodes and returns the collected metrics.
    ///
    /// The caller is responsible for the mode of the agent; evaluation is
    /// usually run with `agent.eval()` so the policy acts greedily and no
    /// learning takes place.
    fn evaluate<R>(&mut self, agent: &mut Box<dyn Agent<E, R>>) -> Result<Record>
    where
        R: ReplayBufferBase;
}
