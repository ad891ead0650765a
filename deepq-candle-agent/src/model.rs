//! Interface of neural networks used in RL agents.
use candle_nn::VarBuilder;

/// A neural network module not owning its [`VarMap`] internally.
///
/// Networks implementing this trait are built on a [`VarBuilder`] handed
/// in by the owner of the parameters, so that a model (e.g.
/// [`QModel`](crate::dqn::QModel)) can hold the parameter store, the
/// optimizer and the network separately.
///
/// [`VarMap`]: candle_nn::VarMap
pub trait SubModel {
    /// Configuration from which [`SubModel`] is constructed.
    type Config;

    /// Input of the [`SubModel`].
    type Input;

    /// Output of the [`SubModel`].
    type Output;

    /// Builds [`SubModel`] with [`VarBuilder`] and [`SubModel::Config`].
    fn build(vb: VarBuilder, config: Self::Config) -> Self;

    /// A generalized forward function.
    fn forward(&self, input: &Self::Input) -> Self::Output;
}
