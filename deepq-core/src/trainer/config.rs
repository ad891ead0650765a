//! Configuration of [`Trainer`](super::Trainer).
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::{
    fs::File,
    io::{BufReader, Write},
    path::Path,
};

/// Configuration of [`Trainer`](super::Trainer).
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
pub struct TrainerConfig {
    /// The maximum number of training episodes.
    pub max_episodes: usize,

    /// The maximum number of environment steps per episode.
    pub max_steps_per_episode: usize,

    /// Interval of optimization steps in environment steps.
    pub opt_interval: usize,

    /// Length of the trailing window over which episode returns are
    /// averaged.
    pub score_window: usize,

    /// Mean trailing return at which training stops early. `None`
    /// disables early stopping.
    pub solved_threshold: Option<f32>,

    /// Path of the checkpoint written when the threshold is reached.
    pub checkpoint_path: Option<String>,
}

impl Default for TrainerConfig {
    fn default() -> Self {
        Self {
            max_episodes: 2000,
            max_steps_per_episode: 1000,
            opt_interval: 4,
            score_window: 100,
            solved_threshold: None,
            checkpoint_path: None,
        }
    }
}

impl TrainerConfig {
    /// Sets the maximum number of training episodes.
    pub fn max_episodes(mut self, v: usize) -> Self {
        self.max_episodes = v;
        self
    }

    /// Sets the maximum number of environment steps per episode.
    pub fn max_steps_per_episode(mut self, v: usize) -> Self {
        self.max_steps_per_episode = v;
        self
    }

    /// Sets the interval of optimization in environment steps.
    pub fn opt_interval(mut self, v: usize) -> Self {
        self.opt_interval = v;
        self
    }

    /// Sets the length of the trailing score window.
    pub fn score_window(mut self, v: usize) -> Self {
        self.score_window = v;
        self
    }

    /// Sets the mean trailing return at which training stops early.
    pub fn solved_threshold(mut self, v: f32) -> Self {
        self.solved_threshold = Some(v);
        self
    }

    /// Sets the path of the checkpoint written on solving.
    pub fn checkpoint_path(mut self, v: impl Into<String>) -> Self {
        self.checkpoint_path = Some(v.into());
        self
    }

    /// Constructs [`TrainerConfig`] from a YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path)?;
        let rdr = BufReader::new(file);
        let b = serde_yaml::from_reader(rdr)?;
        Ok(b)
    }

    /// Saves [`TrainerConfig`] as a YAML file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut file = File::create(path)?;
        file.write_all(serde_yaml::to_string(&self)?.as_bytes())?;
        Ok(())
    }
}
