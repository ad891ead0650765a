//! Q-network model: parameters, network and optimizer.
use crate::{
    model::SubModel,
    opt::{Optimizer, OptimizerConfig},
    util::OutDim,
};
use anyhow::{Context, Result};
use candle_core::{DType, Device, Tensor};
use candle_nn::{VarBuilder, VarMap};
use log::info;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::{
    fs::File,
    io::{BufReader, Write},
    path::Path,
};

#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
/// Configuration of [`QModel`].
pub struct QModelConfig<Q>
where
    Q: OutDim,
{
    pub(super) q_config: Option<Q>,
    pub(super) opt_config: OptimizerConfig,
}

impl<Q> Default for QModelConfig<Q>
where
    Q: OutDim,
{
    fn default() -> Self {
        Self {
            q_config: None,
            opt_config: OptimizerConfig::default(),
        }
    }
}

impl<Q> QModelConfig<Q>
where
    Q: DeserializeOwned + Serialize + OutDim,
{
    /// Sets the configuration of the action-value network.
    pub fn q_config(mut self, v: Q) -> Self {
        self.q_config = Some(v);
        self
    }

    /// Sets the output dimension of the model, i.e. the number of actions.
    pub fn out_dim(mut self, v: i64) -> Self {
        match &mut self.q_config {
            None => {}
            Some(q_config) => q_config.set_out_dim(v),
        };
        self
    }

    /// Sets the optimizer configuration.
    pub fn opt_config(mut self, v: OptimizerConfig) -> Self {
        self.opt_config = v;
        self
    }

    /// Constructs [`QModelConfig`] from a YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path)?;
        let rdr = BufReader::new(file);
        let b = serde_yaml::from_reader(rdr)?;
        Ok(b)
    }

    /// Saves [`QModelConfig`] as a YAML file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut file = File::create(path)?;
        file.write_all(serde_yaml::to_string(&self)?.as_bytes())?;
        Ok(())
    }
}

/// An action-value function with its parameter store and optimizer.
///
/// The model owns the [`VarMap`] its network was built on; the optimizer
/// holds references to the same variables, so its moment estimates persist
/// across [`QModel::backward_step`] calls.
pub struct QModel<Q>
where
    Q: SubModel<Output = Tensor>,
    Q::Config: DeserializeOwned + Serialize + OutDim,
{
    varmap: VarMap,

    // Action-value network
    q: Q,

    // Optimizer of the network parameters
    opt: Optimizer,
}

impl<Q> QModel<Q>
where
    Q: SubModel<Output = Tensor>,
    Q::Config: DeserializeOwned + Serialize + OutDim + Clone,
{
    /// Constructs [`QModel`] on the given device.
    pub fn build(config: QModelConfig<Q::Config>, device: Device) -> Result<Self> {
        let q_config = config.q_config.context("q_config is not set.")?;
        let varmap = VarMap::new();
        let q = {
            let vb = VarBuilder::from_varmap(&varmap, DType::F32, &device);
            Q::build(vb, q_config)
        };
        let opt = config.opt_config.build(varmap.all_vars())?;

        Ok(Self { varmap, q, opt })
    }

    /// Outputs the action-values given observation(s).
    pub fn forward(&self, obs: &Q::Input) -> Tensor {
        self.q.forward(obs)
    }

    /// Computes gradients of the loss and applies one optimization step.
    pub fn backward_step(&mut self, loss: &Tensor) -> Result<()> {
        self.opt.backward_step(loss)
    }

    /// Returns the parameter store of the model.
    pub fn varmap(&self) -> &VarMap {
        &self.varmap
    }

    /// Saves the model parameters at the given path as a single blob,
    /// overwriting any existing file.
    pub fn save<T: AsRef<Path>>(&self, path: T) -> Result<()> {
        self.varmap.save(&path)?;
        info!("Save Q-network parameters to {:?}", path.as_ref());
        Ok(())
    }

    /// Loads model parameters from the given path.
    ///
    /// Fails if the file does not exist or if any tensor name or shape
    /// does not match the constructed network.
    pub fn load<T: AsRef<Path>>(&mut self, path: T) -> Result<()> {
        self.varmap.load(&path)?;
        info!("Load Q-network parameters from {:?}", path.as_ref());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mlp::{Mlp, MlpConfig};
    use tempdir::TempDir;

    fn model_config(units: Vec<i64>) -> QModelConfig<MlpConfig> {
        QModelConfig::default().q_config(MlpConfig::new(4, units, 2))
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

    #[test]
    fn test_save_load_roundtrip() -> Result<()> {
        let tmp_dir = TempDir::new("qmodel")?;
        let path = tmp_dir.path().join("qnet.safetensors");

        let model = QModel::<Mlp>::build(model_config(vec![16]), Device::Cpu)?;
        model.save(&path)?;

        let mut model_ = QModel::<Mlp>::build(model_config(vec![16]), Device::Cpu)?;
        model_.load(&path)?;

        for ((k1, v1), (k2, v2)) in params_of(&model).iter().zip(params_of(&model_).iter()) {
            assert_eq!(k1, k2);
            for (a, b) in v1.iter().zip(v2.iter()) {
                assert!((a - b).abs() < 1e-6);
            }
        }
        Ok(())
    }

    #[test]
    fn test_load_rejects_mismatched_shapes() -> Result<()> {
        let tmp_dir = TempDir::new("qmodel")?;
        let path = tmp_dir.path().join("qnet.safetensors");

        let model = QModel::<Mlp>::build(model_config(vec![16]), Device::Cpu)?;
        model.save(&path)?;

        let mut model_ = QModel::<Mlp>::build(model_config(vec![32]), Device::Cpu)?;
        assert!(model_.load(&path).is_err());
        Ok(())
    }

    #[test]
    fn test_load_requires_existing_file() -> Result<()> {
        let tmp_dir = TempDir::new("qmodel")?;
        let path = tmp_dir.path().join("missing.safetensors");

        let mut model = QModel::<Mlp>::build(model_config(vec![16]), Device::Cpu)?;
        assert!(model.load(&path).is_err());
        Ok(())
    }
}
