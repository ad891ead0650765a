//! Conversion of environment steps into transitions.
use super::{BatchBase, GenericTransitionBatch};
use crate::{Env, StepProcessor};
use std::{default::Default, marker::PhantomData};

/// Configuration of [`SimpleStepProcessor`].
#[derive(Clone, Debug)]
pub struct SimpleStepProcessorConfig {}

impl Default for SimpleStepProcessorConfig {
    fn default() -> Self {
        Self {}
    }
}

/// Converts a [`Step`] into a transition batch of length 1.
///
/// The processor keeps the previous observation `o_t` between calls, so
/// that a step carrying `(a_t, o_t+1, r_t)` can be completed into the
/// transition `(o_t, a_t, o_t+1, r_t, done_t)`.
///
/// [`Step`]: crate::Step
pub struct SimpleStepProcessor<E, O, A> {
    prev_obs: Option<O>,
    phantom: PhantomData<(E, A)>,
}

impl<E, O, A> StepProcessor<E> for SimpleStepProcessor<E, O, A>
where
    E: Env,
    O: BatchBase + From<E::Obs>,
    A: BatchBase + From<E::Act>,
{
    type Config = SimpleStepProcessorConfig;
    type Output = GenericTransitionBatch<O, A>;

    fn build(_config: &Self::Config) -> Self {
        Self {
            prev_obs: None,
            phantom: PhantomData,
        }
    }

    fn reset(&mut self, init_obs: E::Obs) {
        self.prev_obs = Some(init_obs.into());
    }

    /// Processes a [`Step`] object into a transition.
    ///
    /// # Panics
    ///
    /// Panics if [`Self::reset`] has not been called before the first step
    /// of an episode, or if the step is terminal but carries no initial
    /// observation of the next episode.
    ///
    /// [`Step`]: crate::Step
    /// [`Self::reset`]: StepProcessor::reset
    fn process(&mut self, step: crate::Step<E>) -> Self::Output {
        if self.prev_obs.is_none() {
            panic!("prev_obs is not set. Forgot to call reset()?");
        }

        let is_done = step.is_done;
        let next_obs = step.obs.clone().into();
        let obs = self.prev_obs.replace(step.obs.into()).unwrap();
        let act = step.act.into();
        let reward = vec![step.reward];
        let is_done = vec![is_done as i8];

        if step.is_done {
            self.prev_obs
                .replace(step.init_obs.expect("Failed to unwrap init_obs").into());
        }

        GenericTransitionBatch {
            obs,
            act,
            next_obs,
            reward,
            is_done,
        }
    }
}
