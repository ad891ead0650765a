//! Default implementation of the [`Evaluator`] trait.
use super::Evaluator;
use crate::{
    record::{Record, RecordValue},
    Agent, Env, ReplayBufferBase,
};
use anyhow::Result;

/// Runs a fixed number of greedy episodes and reports the returns.
///
/// Each episode is started with an indexed, non-exploratory reset
/// ([`Env::reset_with_index`]). The returned record holds the return of
/// every episode, the running average after each episode, and the final
/// mean return.
pub struct DefaultEvaluator<E: Env> {
    /// The number of episodes to run during evaluation.
    n_episodes: usize,

    /// The environment used for evaluation.
    env: E,
}

impl<E: Env> Evaluator<E> for DefaultEvaluator<E> {
    fn evaluate<R>(&mut self, agent: &mut Box<dyn Agent<E, R>>) -> Result<Record>
    where
        R: ReplayBufferBase,
    {
        let mut returns = Vec::with_capacity(self.n_episodes);
        let mut running_avgs = Vec::with_capacity(self.n_episodes);

        for ix in 0..self.n_episodes {
            let mut prev_obs = self.env.reset_with_index(ix)?;
            let mut r_total = 0f32;

            loop {
                let act = agent.sample(&prev_obs);
                let (step, _) = self.env.step(&act);
                r_total += step.reward;
                if step.is_done {
                    break;
                }
                prev_obs = step.obs;
            }

            returns.push(r_total);
            running_avgs.push(returns.iter().sum::<f32>() / returns.len() as f32);
        }

        let mean = returns.iter().sum::<f32>() / self.n_episodes as f32;
        let mut record = Record::from_scalar("episode_return_mean", mean);
        record.insert("episode_returns", RecordValue::Array1(returns));
        record.insert("episode_return_avgs", RecordValue::Array1(running_avgs));
        Ok(record)
    }
}

impl<E: Env> DefaultEvaluator<E> {
    /// Constructs a new [`DefaultEvaluator`].
    ///
    /// * `config` - Configuration of the evaluation environment.
    /// * `seed` - Random seed of the environment.
    /// * `n_episodes` - Number of episodes to run per evaluation.
    pub fn new(config: &E::Config, seed: i64, n_episodes: usize) -> Result<Self> {
        Ok(Self {
            n_episodes,
            env: E::build(config, seed)?,
        })
    }
}
