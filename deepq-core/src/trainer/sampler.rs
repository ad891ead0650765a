//! Interaction of the agent and the environment.
use crate::{record::Record, Agent, Env, ExperienceBufferBase, ReplayBufferBase, StepProcessor};
use anyhow::Result;

/// Drives the agent-environment interaction and fills the replay buffer.
///
/// One call to [`Sampler::sample_and_push`] performs one environment step:
/// the agent samples an action for the previous observation, the
/// environment applies it, and the resulting transition is pushed into the
/// buffer. The environment is reset lazily, at the first step after
/// construction or after [`Sampler::reset`].
pub struct Sampler<E, P>
where
    E: Env,
    P: StepProcessor<E>,
{
    env: E,
    prev_obs: Option<E::Obs>,
    step_processor: P,
}

impl<E, P> Sampler<E, P>
where
    E: Env,
    P: StepProcessor<E>,
{
    /// Creates a sampler for the given environment and step processor.
    pub fn new(env: E, step_processor: P) -> Self {
        Self {
            env,
            prev_obs: None,
            step_processor,
        }
    }

    /// Forces an environment reset before the next sampled step.
    ///
    /// Used by the trainer when an episode is cut off at the step limit,
    /// where the environment itself does not report an episode end.
    pub fn reset(&mut self) {
        self.prev_obs = None;
    }

    /// Samples one environment step and pushes the transition.
    ///
    /// Returns the record emitted by the environment, the reward of the
    /// step, and whether the episode ended.
    pub fn sample_and_push<R>(
        &mut self,
        agent: &mut Box<dyn Agent<E, R>>,
        buffer: &mut R,
    ) -> Result<(Record, f32, bool)>
    where
        R: ExperienceBufferBase<Item = P::Output> + ReplayBufferBase,
    {
        // Reset the environment if required
        if self.prev_obs.is_none() {
            self.prev_obs = Some(self.env.reset()?);
            self.step_processor
                .reset(self.prev_obs.as_ref().unwrap().clone());
        }

        // Sample an action and apply it to the environment
        let act = agent.sample(self.prev_obs.as_ref().unwrap());
        let (step, record) = self.env.step_with_reset(&act);
        let reward = step.reward;
        let is_done = step.is_done;

        // Update the previous observation
        self.prev_obs = match is_done {
            true => Some(step.init_obs.clone().expect("Failed to unwrap init_obs")),
            false => Some(step.obs.clone()),
        };

        // Produce and push the transition
        let transition = self.step_processor.process(step);
        buffer.push(transition)?;

        Ok((record, reward, is_done))
    }
}
