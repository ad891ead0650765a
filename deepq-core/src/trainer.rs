//! Episode-driven training loop.
mod config;
mod sampler;
use crate::{
    record::{Record, RecordValue::Scalar, Recorder},
    Agent, Env, ExperienceBufferBase, ReplayBufferBase, StepProcessor,
};
use anyhow::Result;
pub use config::TrainerConfig;
use log::info;
pub use sampler::Sampler;
use std::{
    collections::VecDeque,
    io::{self, Write},
    path::Path,
};

/// Scores collected over a training run.
#[derive(Debug, Default)]
pub struct TrainingSummary {
    /// Return of each episode, in order.
    pub scores: Vec<f32>,

    /// Mean return over the trailing score window, one entry per episode.
    pub moving_avgs: Vec<f32>,

    /// `episode - score_window` at the moment the solved threshold was
    /// reached, if it was.
    pub solved_in: Option<i64>,
}

#[cfg_attr(doc, aquamarine::aquamarine)]
/// Manages the training loop and related objects.
///
/// # Training loop
///
/// For every episode, up to [`TrainerConfig::max_episodes`]:
///
/// 1. Reset the environment (through the [`Sampler`]).
/// 2. Run up to [`TrainerConfig::max_steps_per_episode`] environment steps
///    or until the episode ends. Every step pushes one transition into the
///    replay buffer; every [`TrainerConfig::opt_interval`]-th step triggers
///    an optimization step on the agent, which the agent may skip while
///    the buffer is filling up.
/// 3. Push the episode return into a trailing window of
///    [`TrainerConfig::score_window`] episodes and recompute its mean.
/// 4. Notify the agent of the episode end (this advances per-episode
///    schedules such as epsilon annealing) and write an episode record.
/// 5. If the trailing mean reaches [`TrainerConfig::solved_threshold`],
///    save a checkpoint and stop.
///
/// # Interaction of objects
///
/// ```mermaid
/// graph LR
///     A[Agent]-->|Env::Act|B[Env]
///     B -->|Env::Obs|A
///     B -->|"Step&lt;E: Env&gt;"|C[StepProcessor]
///     C -->|ExperienceBufferBase::Item|D[ReplayBufferBase]
///     D -->|TransitionBatch|A
/// ```
pub struct Trainer {
    /// The maximum number of training episodes.
    max_episodes: usize,

    /// The maximum number of environment steps per episode.
    max_steps_per_episode: usize,

    /// Interval of optimization steps in environment steps.
    opt_interval: usize,

    /// Length of the trailing score window.
    score_window: usize,

    /// Mean trailing score at which training stops early.
    solved_threshold: Option<f32>,

    /// Where the checkpoint is saved when the environment is solved.
    checkpoint_path: Option<String>,
}

impl Trainer {
    /// Constructs a trainer.
    pub fn build(config: TrainerConfig) -> Self {
        Self {
            max_episodes: config.max_episodes,
            max_steps_per_episode: config.max_steps_per_episode,
            opt_interval: config.opt_interval,
            score_window: config.score_window,
            solved_threshold: config.solved_threshold,
            checkpoint_path: config.checkpoint_path,
        }
    }

    /// Performs a training step.
    ///
    /// First, it performs an environment step once and pushes the
    /// transition into the given buffer with [`Sampler`]. Then, if the
    /// number of environment steps reaches the optimization interval, it
    /// asks the agent for an optimization step; the agent skips the
    /// request while the buffer does not hold more transitions than its
    /// batch size.
    ///
    /// `opt_steps` counts the optimization steps actually performed.
    /// Returns the record of the step, the reward, and whether the episode
    /// ended.
    pub fn train_step<E, P, R>(
        &mut self,
        agent: &mut Box<dyn Agent<E, R>>,
        buffer: &mut R,
        sampler: &mut Sampler<E, P>,
        env_steps: &mut usize,
        opt_steps: &mut usize,
    ) -> Result<(Record, f32, bool)>
    where
        E: Env,
        P: StepProcessor<E>,
        R: ExperienceBufferBase<Item = P::Output> + ReplayBufferBase,
    {
        let (mut record, reward, is_done) = sampler.sample_and_push(agent, buffer)?;
        *env_steps += 1;

        if *env_steps % self.opt_interval == 0 {
            if let Some(record_agent) = agent.opt(buffer) {
                *opt_steps += 1;
                record = record.merge(record_agent);
            }
        }

        Ok((record, reward, is_done))
    }

    /// Trains the agent and returns the collected scores.
    ///
    /// The environment and the step processor are consumed; the agent, the
    /// buffer and the recorder are borrowed so the caller can evaluate or
    /// inspect them afterwards.
    pub fn train<E, P, R, D>(
        &mut self,
        env: E,
        step_proc: P,
        agent: &mut Box<dyn Agent<E, R>>,
        buffer: &mut R,
        recorder: &mut D,
    ) -> Result<TrainingSummary>
    where
        E: Env,
        P: StepProcessor<E>,
        R: ExperienceBufferBase<Item = P::Output> + ReplayBufferBase,
        D: Recorder,
    {
        let mut sampler = Sampler::new(env, step_proc);
        let mut scores_window: VecDeque<f32> = VecDeque::with_capacity(self.score_window);
        let mut summary = TrainingSummary::default();
        let mut env_steps: usize = 0;
        let mut opt_steps: usize = 0;
        agent.train();

        for i_episode in 1..=self.max_episodes {
            let mut score = 0f32;
            let mut is_done = false;

            for _t in 0..self.max_steps_per_episode {
                let (record, reward, done) =
                    self.train_step(agent, buffer, &mut sampler, &mut env_steps, &mut opt_steps)?;
                score += reward;
                if !record.is_empty() {
                    recorder.write(record);
                }
                if done {
                    is_done = true;
                    break;
                }
            }

            // The episode was cut at max_steps_per_episode; force a fresh
            // environment reset at the start of the next one.
            if !is_done {
                sampler.reset();
            }

            if scores_window.len() == self.score_window {
                scores_window.pop_front();
            }
            scores_window.push_back(score);
            let moving_avg = scores_window.iter().sum::<f32>() / scores_window.len() as f32;
            summary.scores.push(score);
            summary.moving_avgs.push(moving_avg);

            let mut record = agent.on_episode_end();
            record.insert("episode", Scalar(i_episode as f32));
            record.insert("score", Scalar(score));
            record.insert("avg_score", Scalar(moving_avg));
            recorder.write(record);
            recorder.flush(i_episode as i64);

            print!("\rEpisode {}\tAverage Score: {:.2}", i_episode, moving_avg);
            io::stdout().flush()?;
            if i_episode % self.score_window == 0 {
                println!("\rEpisode {}\tAverage Score: {:.2}", i_episode, moving_avg);
            }

            if let Some(threshold) = self.solved_threshold {
                if moving_avg >= threshold {
                    let solved_in = i_episode as i64 - self.score_window as i64;
                    println!(
                        "\nEnvironment solved in {} episodes!\tAverage Score: {:.2}",
                        solved_in, moving_avg
                    );
                    summary.solved_in = Some(solved_in);
                    if let Some(path) = &self.checkpoint_path {
                        agent.save_params(Path::new(path))?;
                        info!("Saved checkpoint in {:?}", path);
                    }
                    break;
                }
            }
        }

        Ok(summary)
    }
}
