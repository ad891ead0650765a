//! Multilayer perceptron.
mod base;
mod config;
pub use base::Mlp;
use candle_core::Tensor;
use candle_nn::{Linear, Module};
pub use config::MlpConfig;

fn mlp_forward(xs: Tensor, layers: &Vec<Linear>) -> Tensor {
    let n_layers = layers.len();
    let mut xs = xs;

    for i in 0..n_layers - 1 {
        xs = layers[i].forward(&xs).unwrap().relu().unwrap();
    }

    layers[n_layers - 1].forward(&xs).unwrap()
}
