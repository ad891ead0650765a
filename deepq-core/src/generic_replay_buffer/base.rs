//! The ring-buffer replay memory.
use super::{BatchBase, GenericTransitionBatch, SimpleReplayBufferConfig};
use crate::{error::DeepqError, ExperienceBufferBase, ReplayBufferBase, TransitionBatch};
use anyhow::Result;
use rand::{rngs::StdRng, SeedableRng};

/// A fixed-capacity replay buffer with uniform random sampling.
///
/// Storage is a ring: `push` writes at the current head and wraps around,
/// overwriting the oldest transitions once the buffer is full. The length
/// saturates at the configured capacity.
pub struct SimpleReplayBuffer<O, A>
where
    O: BatchBase,
    A: BatchBase,
{
    capacity: usize,
    i: usize,
    size: usize,
    obs: O,
    act: A,
    next_obs: O,
    reward: Vec<f32>,
    is_done: Vec<i8>,
    rng: StdRng,
}

impl<O, A> SimpleReplayBuffer<O, A>
where
    O: BatchBase,
    A: BatchBase,
{
    #[inline]
    fn push_reward(&mut self, i: usize, b: &[f32]) {
        let mut j = i;
        for r in b.iter() {
            self.reward[j] = *r;
            j += 1;
            if j == self.capacity {
                j = 0;
            }
        }
    }

    #[inline]
    fn push_is_done(&mut self, i: usize, b: &[i8]) {
        let mut j = i;
        for d in b.iter() {
            self.is_done[j] = *d;
            j += 1;
            if j == self.capacity {
                j = 0;
            }
        }
    }

    fn sample_reward(&self, ixs: &Vec<usize>) -> Vec<f32> {
        ixs.iter().map(|ix| self.reward[*ix]).collect()
    }

    fn sample_is_done(&self, ixs: &Vec<usize>) -> Vec<i8> {
        ixs.iter().map(|ix| self.is_done[*ix]).collect()
    }

    /// Returns the capacity of the buffer.
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl<O, A> ExperienceBufferBase for SimpleReplayBuffer<O, A>
where
    O: BatchBase,
    A: BatchBase,
{
    type Item = GenericTransitionBatch<O, A>;

    fn len(&self) -> usize {
        self.size
    }

    fn push(&mut self, tr: Self::Item) -> Result<()> {
        let len = tr.len();
        let (obs, act, next_obs, reward, is_done) = tr.unpack();
        self.obs.push(self.i, obs);
        self.act.push(self.i, act);
        self.next_obs.push(self.i, next_obs);
        self.push_reward(self.i, &reward);
        self.push_is_done(self.i, &is_done);

        self.i = (self.i + len) % self.capacity;
        self.size += len;
        if self.size >= self.capacity {
            self.size = self.capacity;
        }

        Ok(())
    }
}

impl<O, A> ReplayBufferBase for SimpleReplayBuffer<O, A>
where
    O: BatchBase,
    A: BatchBase,
{
    type Config = SimpleReplayBufferConfig;
    type Batch = GenericTransitionBatch<O, A>;

    fn build(config: &Self::Config) -> Self {
        let capacity = config.capacity;
        Self {
            capacity,
            i: 0,
            size: 0,
            obs: O::new(capacity),
            act: A::new(capacity),
            next_obs: O::new(capacity),
            reward: vec![0.; capacity],
            is_done: vec![0; capacity],
            rng: StdRng::seed_from_u64(config.seed),
        }
    }

    /// Samples `size` transitions uniformly at random, without replacement
    /// within the batch.
    fn batch(&mut self, size: usize) -> Result<Self::Batch> {
        if size > self.size {
            return Err(DeepqError::NotEnoughTransitions {
                len: self.size,
                requested: size,
            }
            .into());
        }

        let ixs = rand::seq::index::sample(&mut self.rng, self.size, size).into_vec();

        Ok(Self::Batch {
            obs: self.obs.sample(&ixs),
            act: self.act.sample(&ixs),
            next_obs: self.next_obs.sample(&ixs),
            reward: self.sample_reward(&ixs),
            is_done: self.sample_is_done(&ixs),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Scalar column store used to observe the ring behavior directly.
    #[derive(Clone, Debug)]
    struct ScalarBatch(Vec<f32>);

    impl BatchBase for ScalarBatch {
        fn new(capacity: usize) -> Self {
            Self(vec![0.; capacity])
        }

        fn push(&mut self, ix: usize, data: Self) {
            let capacity = self.0.len();
            for (j, v) in data.0.iter().enumerate() {
                self.0[(ix + j) % capacity] = *v;
            }
        }

        fn sample(&self, ixs: &Vec<usize>) -> Self {
            Self(ixs.iter().map(|ix| self.0[*ix]).collect())
        }
    }

    fn transition(id: f32) -> GenericTransitionBatch<ScalarBatch, ScalarBatch> {
        GenericTransitionBatch {
            obs: ScalarBatch(vec![id]),
            act: ScalarBatch(vec![0.]),
            next_obs: ScalarBatch(vec![id + 1.]),
            reward: vec![id],
            is_done: vec![0],
        }
    }

    fn filled_buffer(
        capacity: usize,
        n: usize,
    ) -> SimpleReplayBuffer<ScalarBatch, ScalarBatch> {
        let config = SimpleReplayBufferConfig::default().capacity(capacity);
        let mut buffer = SimpleReplayBuffer::build(&config);
        for i in 0..n {
            buffer.push(transition(i as f32)).unwrap();
        }
        buffer
    }

    #[test]
    fn test_len_saturates_at_capacity() {
        let buffer = filled_buffer(100, 30);
        assert_eq!(buffer.len(), 30);

        let buffer = filled_buffer(100, 150);
        assert_eq!(buffer.len(), 100);
    }

    #[test]
    fn test_overwrites_oldest() {
        // After 150 pushes into a buffer of 100, exactly the most recent
        // 100 transitions remain. A full-size batch is drawn without
        // replacement, so it enumerates the whole contents.
        let mut buffer = filled_buffer(100, 150);
        let batch = buffer.batch(100).unwrap();
        let mut rewards = batch.reward;
        rewards.sort_by(|a, b| a.partial_cmp(b).unwrap());
        let expected: Vec<f32> = (50..150).map(|i| i as f32).collect();
        assert_eq!(rewards, expected);
    }

    #[test]
    fn test_batch_fails_on_underfilled_buffer() {
        let mut buffer = filled_buffer(100, 7);
        assert!(buffer.batch(8).is_err());
        assert!(buffer.batch(7).is_ok());
    }

    #[test]
    fn test_batch_size_and_membership() {
        let mut buffer = filled_buffer(100, 40);
        let batch = buffer.batch(16).unwrap();
        assert_eq!(batch.len(), 16);
        for r in batch.reward.iter() {
            assert!(*r >= 0. && *r < 40.);
        }
    }

    #[test]
    fn test_batch_without_replacement() {
        let mut buffer = filled_buffer(100, 32);
        let batch = buffer.batch(32).unwrap();
        let mut rewards = batch.reward;
        rewards.sort_by(|a, b| a.partial_cmp(b).unwrap());
        rewards.dedup();
        assert_eq!(rewards.len(), 32);
    }

    #[test]
    fn test_columns_stay_aligned() {
        let mut buffer = filled_buffer(50, 75);
        let batch = buffer.batch(50).unwrap();
        for (obs, next_obs) in batch.obs.0.iter().zip(batch.next_obs.0.iter()) {
            assert_eq!(*next_obs, *obs + 1.);
        }
    }
}
