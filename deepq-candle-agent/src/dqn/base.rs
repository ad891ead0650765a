//! DQN agent implemented with candle.
use super::{
    config::DqnConfig,
    explorer::{greedy, DqnExplorer},
    model::QModel,
};
use crate::{
    model::SubModel,
    util::{smooth_l1_loss, track, CriticLoss, OutDim},
};
use anyhow::Result;
use candle_core::{shape::D, Device, Tensor};
use candle_nn::loss::mse;
use deepq_core::{
    record::{Record, RecordValue},
    Agent, Configurable, Env, ExperienceBufferBase, Policy, ReplayBufferBase, TransitionBatch,
};
use rand::{rngs::SmallRng, SeedableRng};
use serde::{de::DeserializeOwned, Serialize};
use std::{marker::PhantomData, path::Path};

/// Computes the TD target `r + gamma * (1 - done) * q_next`, detached from
/// the computation graph.
///
/// `is_not_done` holds `1 - done` per transition, so the bootstrap term
/// vanishes for terminal transitions and the target reduces to the
/// immediate reward.
fn td_target(
    reward: Tensor,
    is_not_done: Tensor,
    next_q: Tensor,
    gamma: f64,
) -> candle_core::Result<Tensor> {
    Ok((reward + is_not_done * gamma * next_q)?.detach())
}

/// DQN agent over an opaque action-value network `Q`.
///
/// Holds a pair of structurally identical [`QModel`]s: `qnet` is trained
/// by gradient descent, `qnet_tgt` supplies the bootstrap targets and is
/// pulled toward `qnet` by a soft update after every optimization step.
/// Both start from identical parameters.
pub struct Dqn<E, Q, R>
where
    E: Env,
    Q: SubModel<Output = Tensor>,
    R: ReplayBufferBase,
    E::Obs: Into<Q::Input>,
    E::Act: From<Q::Output>,
    Q::Config: DeserializeOwned + Serialize + OutDim + std::fmt::Debug + PartialEq + Clone,
    R::Batch: TransitionBatch,
    <R::Batch as TransitionBatch>::ObsBatch: Into<Q::Input>,
    <R::Batch as TransitionBatch>::ActBatch: Into<Tensor>,
{
    pub(in crate::dqn) batch_size: usize,
    pub(in crate::dqn) qnet: QModel<Q>,
    pub(in crate::dqn) qnet_tgt: QModel<Q>,
    pub(in crate::dqn) train: bool,
    pub(in crate::dqn) discount_factor: f64,
    pub(in crate::dqn) tau: f64,
    pub(in crate::dqn) double_dqn: bool,
    pub(in crate::dqn) critic_loss: CriticLoss,
    pub(in crate::dqn) explorer: DqnExplorer,
    pub(in crate::dqn) device: Device,
    rng: SmallRng,
    phantom: PhantomData<(E, R)>,
}

impl<E, Q, R> Dqn<E, Q, R>
where
    E: Env,
    Q: SubModel<Output = Tensor>,
    R: ReplayBufferBase,
    E::Obs: Into<Q::Input>,
    E::Act: From<Q::Output>,
    Q::Config: DeserializeOwned + Serialize + OutDim + std::fmt::Debug + PartialEq + Clone,
    R::Batch: TransitionBatch,
    <R::Batch as TransitionBatch>::ObsBatch: Into<Q::Input>,
    <R::Batch as TransitionBatch>::ActBatch: Into<Tensor>,
{
    /// One gradient step of the local network on a freshly sampled batch.
    fn update_critic(&mut self, buffer: &mut R) -> Result<f32> {
        let batch = buffer.batch(self.batch_size)?;
        let (obs, act, next_obs, reward, is_done) = batch.unpack();
        let obs: Q::Input = obs.into();
        let act: Tensor = act.into();
        let act = act.to_device(&self.device)?;
        let next_obs: Q::Input = next_obs.into();
        let reward = Tensor::from_slice(&reward[..], (reward.len(),), &self.device)?;
        let is_not_done = {
            let is_not_done = is_done
                .into_iter()
                .map(|v| (1 - v) as f32)
                .collect::<Vec<_>>();
            Tensor::from_slice(&is_not_done[..], (is_not_done.len(),), &self.device)?
        };

        // Q-values of the actions actually taken
        let pred = {
            let x = self.qnet.forward(&obs);
            x.gather(&act, D::Minus1)?.squeeze(D::Minus1)?
        };

        // Bootstrap values from the target network, no gradient flows back
        let next_q = if self.double_dqn {
            let ix = self.qnet.forward(&next_obs).argmax_keepdim(D::Minus1)?;
            self.qnet_tgt
                .forward(&next_obs)
                .gather(&ix, D::Minus1)?
                .squeeze(D::Minus1)?
        } else {
            self.qnet_tgt.forward(&next_obs).max(D::Minus1)?
        };
        let tgt = td_target(reward, is_not_done, next_q, self.discount_factor)?;

        let loss = match self.critic_loss {
            CriticLoss::Mse => mse(&pred, &tgt)?,
            CriticLoss::SmoothL1 => smooth_l1_loss(&pred, &tgt)?,
        };
        self.qnet.backward_step(&loss)?;

        Ok(loss.to_scalar::<f32>()?)
    }

    fn opt_(&mut self, buffer: &mut R) -> Record {
        let loss = self
            .update_critic(buffer)
            .expect("Failed to perform an optimization step");

        // Pull the target network toward the local one
        track(self.qnet_tgt.varmap(), self.qnet.varmap(), self.tau)
            .expect("Q-network pair holds different parameter sets");

        Record::from_slice(&[("loss", RecordValue::Scalar(loss))])
    }
}

impl<E, Q, R> Configurable<E> for Dqn<E, Q, R>
where
    E: Env,
    Q: SubModel<Output = Tensor>,
    R: ReplayBufferBase,
    E::Obs: Into<Q::Input>,
    E::Act: From<Q::Output>,
    Q::Config: DeserializeOwned + Serialize + OutDim + std::fmt::Debug + PartialEq + Clone,
    R::Batch: TransitionBatch,
    <R::Batch as TransitionBatch>::ObsBatch: Into<Q::Input>,
    <R::Batch as TransitionBatch>::ActBatch: Into<Tensor>,
{
    type Config = DqnConfig<Q>;

    /// Constructs a DQN agent.
    fn build(config: Self::Config) -> Self {
        let device: Device = config.device.unwrap_or(crate::Device::Cpu).into();
        let qnet = QModel::build(config.model_config.clone(), device.clone())
            .expect("Failed to build Q-network");
        let qnet_tgt = QModel::build(config.model_config, device.clone())
            .expect("Failed to build target Q-network");

        // The pair starts from identical parameters, independent of how
        // the two networks were initialized.
        track(qnet_tgt.varmap(), qnet.varmap(), 1.0)
            .expect("Q-network pair holds different parameter sets");

        Dqn {
            batch_size: config.batch_size,
            qnet,
            qnet_tgt,
            train: config.train,
            discount_factor: config.discount_factor,
            tau: config.tau,
            double_dqn: config.double_dqn,
            critic_loss: config.critic_loss,
            explorer: config.explorer,
            device,
            rng: SmallRng::seed_from_u64(config.seed),
            phantom: PhantomData,
        }
    }
}

impl<E, Q, R> Policy<E> for Dqn<E, Q, R>
where
    E: Env,
    Q: SubModel<Output = Tensor>,
    R: ReplayBufferBase,
    E::Obs: Into<Q::Input>,
    E::Act: From<Q::Output>,
    Q::Config: DeserializeOwned + Serialize + OutDim + std::fmt::Debug + PartialEq + Clone,
    R::Batch: TransitionBatch,
    <R::Batch as TransitionBatch>::ObsBatch: Into<Q::Input>,
    <R::Batch as TransitionBatch>::ActBatch: Into<Tensor>,
{
    /// Samples an action for the given observation.
    ///
    /// In training mode the configured explorer decides between
    /// exploration and exploitation; in evaluation mode the action is the
    /// greedy one. Evaluating the network here neither tracks gradients
    /// nor mutates parameters.
    fn sample(&mut self, obs: &E::Obs) -> E::Act {
        let q = self.qnet.forward(&obs.clone().into());
        let a = if self.train {
            match &mut self.explorer {
                DqnExplorer::EpsilonGreedy(egreedy) => egreedy.action(&q, &mut self.rng),
                DqnExplorer::Softmax(softmax) => softmax.action(&q, &mut self.rng),
            }
        } else {
            greedy(&q)
        };
        a.into()
    }
}

impl<E, Q, R> Agent<E, R> for Dqn<E, Q, R>
where
    E: Env,
    Q: SubModel<Output = Tensor>,
    R: ExperienceBufferBase + ReplayBufferBase,
    E::Obs: Into<Q::Input>,
    E::Act: From<Q::Output>,
    Q::Config: DeserializeOwned + Serialize + OutDim + std::fmt::Debug + PartialEq + Clone,
    R::Batch: TransitionBatch,
    <R::Batch as TransitionBatch>::ObsBatch: Into<Q::Input>,
    <R::Batch as TransitionBatch>::ActBatch: Into<Tensor>,
{
    fn train(&mut self) {
        self.train = true;
    }

    fn eval(&mut self) {
        self.train = false;
    }

    fn is_train(&self) -> bool {
        self.train
    }

    /// Performs an optimization step, skipped while the buffer holds no
    /// more transitions than the batch size.
    fn opt(&mut self, buffer: &mut R) -> Option<Record> {
        if buffer.len() > self.batch_size {
            Some(self.opt_(buffer))
        } else {
            None
        }
    }

    /// Advances the epsilon annealing schedule by one episode.
    fn on_episode_end(&mut self) -> Record {
        match &mut self.explorer {
            DqnExplorer::EpsilonGreedy(egreedy) => {
                egreedy.decay();
                Record::from_slice(&[("eps", RecordValue::Scalar(egreedy.eps() as f32))])
            }
            DqnExplorer::Softmax(_) => Record::empty(),
        }
    }

    /// Saves the parameters of the local Q-network as a single blob,
    /// overwriting the path unconditionally. Neither the target network
    /// nor the optimizer state is persisted.
    fn save_params(&self, path: &Path) -> Result<()> {
        self.qnet.save(path)
    }

    /// Loads the local Q-network parameters and re-synchronizes the target
    /// network to them with a hard copy.
    fn load_params(&mut self, path: &Path) -> Result<()> {
        self.qnet.load(path)?;
        track(self.qnet_tgt.varmap(), self.qnet.varmap(), 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::td_target;
    use super::*;
    use crate::{
        dqn::{DqnConfig, QModelConfig},
        mlp::{Mlp, MlpConfig},
        TensorBatch,
    };
    use deepq_core::generic_replay_buffer::{
        GenericTransitionBatch, SimpleReplayBuffer, SimpleReplayBufferConfig,
    };
    use deepq_core::{Act, Obs};
    use candle_core::{Device, Tensor};

    // Placeholder environment types; the optimization path of the agent
    // never touches the environment.
    #[derive(Clone, Debug)]
    struct NullObs;

    impl Obs for NullObs {
        fn len(&self) -> usize {
            unimplemented!();
        }
    }

    impl From<NullObs> for Tensor {
        fn from(_obs: NullObs) -> Tensor {
            unimplemented!();
        }
    }

    #[derive(Clone, Debug)]
    struct NullAct;

    impl Act for NullAct {
        fn len(&self) -> usize {
            unimplemented!();
        }
    }

    impl From<Tensor> for NullAct {
        fn from(_t: Tensor) -> Self {
            unimplemented!();
        }
    }

    struct NullEnv;

    impl Env for NullEnv {
        type Config = usize;
        type Obs = NullObs;
        type Act = NullAct;
        type Info = ();

        fn build(_config: &Self::Config, _seed: i64) -> Result<Self> {
            unimplemented!();
        }

        fn reset(&mut self) -> Result<Self::Obs> {
            unimplemented!();
        }

        fn reset_with_index(&mut self, _ix: usize) -> Result<Self::Obs> {
            unimplemented!();
        }

        fn step(&mut self, _a: &Self::Act) -> (deepq_core::Step<Self>, Record) {
            unimplemented!();
        }

        fn step_with_reset(&mut self, _a: &Self::Act) -> (deepq_core::Step<Self>, Record) {
            unimplemented!();
        }
    }

    type ReplayBuffer = SimpleReplayBuffer<TensorBatch, TensorBatch>;
    type TestDqn = Dqn<NullEnv, Mlp, ReplayBuffer>;

    fn agent_config(batch_size: usize, tau: f64) -> DqnConfig<Mlp> {
        DqnConfig::default()
            .model_config(QModelConfig::default().q_config(MlpConfig::new(4, vec![16], 2)))
            .batch_size(batch_size)
            .tau(tau)
            .seed(0)
    }

    fn params_of(model: &QModel<Mlp>) -> Vec<(String, Vec<f32>)> {
        let data = model.varmap().data().lock().unwrap();
        let mut params: Vec<(String, Vec<f32>)> = data
            .iter()
            .map(|(k, v)| {
                let t = v.as_tensor().flatten_all().unwrap();
                (k.clone(), t.to_vec1::<f32>().unwrap())
            })
            .collect();
        params.sort_by(|a, b| a.0.cmp(&b.0));
        params
    }

    fn push_transitions(buffer: &mut ReplayBuffer, n: usize) {
        for i in 0..n {
            let x = (i % 4) as f32;
            let obs = Tensor::from_slice(&[x, 0., 1., 0.5], (1, 4), &Device::Cpu).unwrap();
            let next_obs =
                Tensor::from_slice(&[x + 1., 0., 1., 0.5], (1, 4), &Device::Cpu).unwrap();
            let act = Tensor::from_slice(&[(i % 2) as i64], (1, 1), &Device::Cpu).unwrap();
            buffer
                .push(GenericTransitionBatch {
                    obs: TensorBatch::from_tensor(obs),
                    act: TensorBatch::from_tensor(act),
                    next_obs: TensorBatch::from_tensor(next_obs),
                    reward: vec![1.0],
                    is_done: vec![0],
                })
                .unwrap();
        }
    }

    #[test]
    fn test_network_pair_starts_identical() {
        let agent = TestDqn::build(agent_config(8, 1e-3));
        assert_eq!(params_of(&agent.qnet), params_of(&agent.qnet_tgt));
    }

    #[test]
    fn test_opt_waits_for_warmup() {
        let mut agent = TestDqn::build(agent_config(8, 1e-3));
        let mut buffer = ReplayBuffer::build(&SimpleReplayBufferConfig::default().capacity(100));

        push_transitions(&mut buffer, 8);
        assert!(agent.opt(&mut buffer).is_none());

        push_transitions(&mut buffer, 1);
        let record = agent.opt(&mut buffer).unwrap();
        assert!(record.get_scalar("loss").is_ok());
    }

    #[test]
    fn test_opt_moves_both_networks() {
        let mut agent = TestDqn::build(agent_config(8, 0.1));
        let mut buffer = ReplayBuffer::build(&SimpleReplayBufferConfig::default().capacity(100));
        push_transitions(&mut buffer, 32);

        let local_before = params_of(&agent.qnet);
        let target_before = params_of(&agent.qnet_tgt);
        for _ in 0..5 {
            assert!(agent.opt(&mut buffer).is_some());
        }

        assert_ne!(params_of(&agent.qnet), local_before);
        // The target follows by soft interpolation only.
        assert_ne!(params_of(&agent.qnet_tgt), target_before);
        assert_ne!(params_of(&agent.qnet_tgt), params_of(&agent.qnet));
    }

    #[test]
    fn test_td_target_equals_reward_on_terminal() -> candle_core::Result<()> {
        let device = Device::Cpu;
        let reward = Tensor::from_slice(&[1.5f32, 2.0], (2,), &device)?;
        // First transition terminal, second not
        let is_not_done = Tensor::from_slice(&[0.0f32, 1.0], (2,), &device)?;
        let next_q = Tensor::from_slice(&[10.0f32, 10.0], (2,), &device)?;

        let tgt = td_target(reward, is_not_done, next_q, 0.99)?.to_vec1::<f32>()?;

        assert_eq!(tgt[0], 1.5);
        assert!((tgt[1] - (2.0 + 0.99 * 10.0)).abs() < 1e-5);
        Ok(())
    }

    #[test]
    fn test_td_target_terminal_ignores_gamma() -> candle_core::Result<()> {
        let device = Device::Cpu;
        for gamma in [0.0, 0.5, 1.0] {
            let reward = Tensor::from_slice(&[3.0f32], (1,), &device)?;
            let is_not_done = Tensor::from_slice(&[0.0f32], (1,), &device)?;
            let next_q = Tensor::from_slice(&[-7.0f32], (1,), &device)?;
            let tgt = td_target(reward, is_not_done, next_q, gamma)?.to_vec1::<f32>()?;
            assert_eq!(tgt[0], 3.0);
        }
        Ok(())
    }
}
