use super::{mlp_forward, MlpConfig};
use crate::model::SubModel;
use candle_core::{Device, Tensor};
use candle_nn::{linear, Linear, VarBuilder};

/// Returns a vector of linear modules from [`MlpConfig`].
fn create_linear_layers(prefix: &str, vs: VarBuilder, config: &MlpConfig) -> Vec<Linear> {
    let mut in_out_pairs: Vec<(usize, usize)> = (0..config.units.len() - 1)
        .map(|i| (config.units[i] as usize, config.units[i + 1] as usize))
        .collect();
    in_out_pairs.insert(0, (config.in_dim as usize, config.units[0] as usize));
    in_out_pairs.push((
        *config.units.last().unwrap() as usize,
        config.out_dim as usize,
    ));
    let vs = vs.pp(prefix);

    in_out_pairs
        .iter()
        .enumerate()
        .map(|(i, &(in_dim, out_dim))| linear(in_dim, out_dim, vs.pp(format!("ln{}", i))).unwrap())
        .collect()
}

/// Multilayer perceptron with ReLU activations and a linear output layer.
pub struct Mlp {
    device: Device,
    layers: Vec<Linear>,
}

impl SubModel for Mlp {
    type Config = MlpConfig;
    type Input = Tensor;
    type Output = Tensor;

    fn forward(&self, xs: &Self::Input) -> Tensor {
        let xs = xs.to_device(&self.device).unwrap();
        mlp_forward(xs, &self.layers)
    }

    fn build(vs: VarBuilder, config: Self::Config) -> Self {
        let device = vs.device().clone();
        let layers = create_linear_layers("mlp", vs, &config);

        Mlp { device, layers }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use candle_core::DType;
    use candle_nn::VarMap;

    #[test]
    fn test_forward_shape() {
        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, &Device::Cpu);
        let mlp = Mlp::build(vb, MlpConfig::new(4, vec![16, 16], 2));
        let xs = Tensor::zeros((3, 4), DType::F32, &Device::Cpu).unwrap();
        let ys = mlp.forward(&xs);
        assert_eq!(ys.dims(), &[3, 2]);
    }
}
