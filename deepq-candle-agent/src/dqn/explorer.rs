//! Exploration strategies of DQN.
use candle_core::Tensor;
use candle_nn::ops::softmax;
use rand::{distributions::WeightedIndex, Rng};
use serde::{Deserialize, Serialize};

/// Takes the greedy action for every row of action values, breaking ties
/// at the lowest index, and returns an i64 tensor.
///
/// * `a` - action values of shape `[n, n_actions]`.
pub fn greedy(a: &Tensor) -> Tensor {
    let rows = a.to_vec2::<f32>().unwrap();
    let data = rows
        .iter()
        .map(|row| {
            let mut best = 0;
            let mut best_value = row[0];
            for (i, v) in row.iter().enumerate().skip(1) {
                if *v > best_value {
                    best = i;
                    best_value = *v;
                }
            }
            best as i64
        })
        .collect::<Vec<_>>();
    Tensor::from_vec(data, &[rows.len()], a.device()).unwrap()
}

/// Explorers for DQN.
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
pub enum DqnExplorer {
    /// Epsilon-greedy action selection.
    EpsilonGreedy(EpsilonGreedy),

    /// Softmax action selection.
    Softmax(Softmax),
}

/// Epsilon-greedy explorer for DQN.
///
/// With probability `eps` a uniformly random action is taken, otherwise
/// the greedy one. `eps` decays multiplicatively once per episode through
/// [`EpsilonGreedy::decay`], saturating at `eps_final`.
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
pub struct EpsilonGreedy {
    /// Current epsilon value.
    pub eps: f64,

    /// Lower bound of epsilon.
    pub eps_final: f64,

    /// Multiplicative decay factor applied per episode.
    pub eps_decay: f64,
}

#[allow(clippy::new_without_default)]
impl EpsilonGreedy {
    /// Constructs an epsilon-greedy explorer with the common annealing
    /// schedule (start 1.0, floor 0.01, decay 0.995 per episode).
    pub fn new() -> Self {
        Self {
            eps: 1.0,
            eps_final: 0.01,
            eps_decay: 0.995,
        }
    }

    /// Constructs an epsilon-greedy explorer with the given schedule.
    pub fn with_params(eps_start: f64, eps_final: f64, eps_decay: f64) -> Self {
        Self {
            eps: eps_start,
            eps_final,
            eps_decay,
        }
    }

    /// Returns the current epsilon value.
    pub fn eps(&self) -> f64 {
        self.eps
    }

    /// Applies one step of the annealing schedule:
    /// `eps <- max(eps_final, eps_decay * eps)`.
    pub fn decay(&mut self) {
        self.eps = (self.eps_decay * self.eps).max(self.eps_final);
    }

    /// Takes an action based on action values, returns an i64 tensor.
    ///
    /// * `a` - action values of shape `[n, n_actions]`.
    pub fn action(&mut self, a: &Tensor, rng: &mut impl Rng) -> Tensor {
        let is_random = rng.gen::<f64>() < self.eps;

        if is_random {
            let n_samples = a.dims()[0];
            let n_actions = a.dims()[1] as u64;
            Tensor::from_slice(
                (0..n_samples)
                    .map(|_| (rng.gen::<u64>() % n_actions) as i64)
                    .collect::<Vec<_>>()
                    .as_slice(),
                &[n_samples],
                a.device(),
            )
            .unwrap()
        } else {
            greedy(a)
        }
    }
}

/// Softmax explorer for DQN.
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
pub struct Softmax {}

#[allow(clippy::new_without_default)]
impl Softmax {
    /// Constructs softmax explorer.
    pub fn new() -> Self {
        Self {}
    }

    /// Takes an action based on action values, returns an i64 tensor.
    ///
    /// * `a` - action values of shape `[n, n_actions]`.
    pub fn action(&mut self, a: &Tensor, rng: &mut impl Rng) -> Tensor {
        let device = a.device();
        let probs = softmax(a, 1).unwrap().to_vec2::<f32>().unwrap();
        let n_samples = probs.len();
        let data = probs
            .into_iter()
            .map(|p| rng.sample(WeightedIndex::new(&p).unwrap()) as i64)
            .collect::<Vec<_>>();
        Tensor::from_vec(data, &[n_samples], device).unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use candle_core::Device;
    use rand::{rngs::SmallRng, SeedableRng};

    fn action_values(values: &[f32]) -> Tensor {
        Tensor::from_slice(values, (1, values.len()), &Device::Cpu).unwrap()
    }

    #[test]
    fn test_greedy_is_deterministic_and_breaks_ties_low() {
        let a = action_values(&[1.0, 3.0, 3.0, 0.5]);
        for _ in 0..10 {
            let act = greedy(&a).to_vec1::<i64>().unwrap();
            assert_eq!(act, vec![1]);
        }
    }

    #[test]
    fn test_eps_zero_is_greedy() {
        let mut explorer = EpsilonGreedy::with_params(0.0, 0.0, 1.0);
        let mut rng = SmallRng::seed_from_u64(0);
        let a = action_values(&[0.1, 0.9, 0.5]);
        for _ in 0..100 {
            let act = explorer.action(&a, &mut rng).to_vec1::<i64>().unwrap();
            assert_eq!(act, vec![1]);
        }
    }

    #[test]
    fn test_eps_one_is_uniform() {
        let mut explorer = EpsilonGreedy::with_params(1.0, 1.0, 1.0);
        let mut rng = SmallRng::seed_from_u64(42);
        let a = action_values(&[0.0, 0.0, 0.0, 10.0]);
        let n_draws = 4000;
        let mut counts = [0usize; 4];
        for _ in 0..n_draws {
            let act = explorer.action(&a, &mut rng).to_vec1::<i64>().unwrap();
            counts[act[0] as usize] += 1;
        }
        // Each action is expected 1000 times; allow a wide band.
        for c in counts.iter() {
            assert!(*c > 850 && *c < 1150, "counts = {:?}", counts);
        }
    }

    #[test]
    fn test_decay_schedule() {
        let mut explorer = EpsilonGreedy::with_params(1.0, 0.01, 0.995);
        let mut expected = 1.0f64;
        let mut prev = explorer.eps();
        for _ in 0..2000 {
            explorer.decay();
            expected = (0.995 * expected).max(0.01);
            assert!(explorer.eps() <= prev);
            prev = explorer.eps();
        }
        assert_eq!(explorer.eps(), expected);
        // 0.995^2000 is far below the floor.
        assert_eq!(explorer.eps(), 0.01);
    }
}
