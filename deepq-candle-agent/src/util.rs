//! Utilities.
use anyhow::Result;
use candle_core::{DType, Tensor, WithDType};
use candle_nn::VarMap;
use log::trace;
use ndarray::ArrayD;
use num_traits::AsPrimitive;
use serde::{Deserialize, Serialize};
use std::convert::TryFrom;

/// Critic loss type.
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
pub enum CriticLoss {
    /// Mean squared error.
    Mse,

    /// Smooth L1 loss.
    SmoothL1,
}

/// Applies a soft update on variables.
///
/// Variables are identified by their names.
///
/// dest = tau * src + (1.0 - tau) * dest
pub fn track(dest: &VarMap, src: &VarMap, tau: f64) -> Result<()> {
    trace!("dest");
    let dest = dest.data().lock().unwrap();
    trace!("src");
    let src = src.data().lock().unwrap();

    dest.iter().for_each(|(k_dest, v_dest)| {
        let v_src = src.get(k_dest).unwrap();
        let t_src = v_src.as_tensor();
        let t_dest = v_dest.as_tensor();
        let t_dest = ((tau * t_src).unwrap() + (1.0 - tau) * t_dest).unwrap();
        v_dest.set(&t_dest).unwrap();
    });

    Ok(())
}

/// Interface for handling output dimensions.
pub trait OutDim {
    /// Returns the output dimension.
    fn get_out_dim(&self) -> i64;

    /// Sets the output dimension.
    fn set_out_dim(&mut self, v: i64);
}

/// See <https://pytorch.org/docs/stable/generated/torch.nn.SmoothL1Loss.html>.
pub fn smooth_l1_loss(x: &Tensor, y: &Tensor) -> Result<Tensor, candle_core::Error> {
    let device = x.device();
    let d = (x - y)?.abs()?;
    let m1 = d.lt(1.0)?.to_dtype(DType::F32)?.to_device(&device)?;
    let m2 = Tensor::try_from(1f32)?
        .to_device(&device)?
        .broadcast_sub(&m1)?;
    (((0.5 * m1)? * d.powf(2.0)?)? + m2 * (d - 0.5))?.mean_all()
}

/// Converts a vector into a tensor, optionally adding a batch dimension.
pub fn vec_to_tensor<T1, T2>(v: Vec<T1>, add_batch_dim: bool) -> Result<Tensor>
where
    T1: AsPrimitive<T2>,
    T2: WithDType,
{
    let v = v.iter().map(|e| e.as_()).collect::<Vec<_>>();
    let t: Tensor = TryFrom::<Vec<T2>>::try_from(v)?;

    match add_batch_dim {
        true => Ok(t.unsqueeze(0)?),
        false => Ok(t),
    }
}

/// Converts an ndarray into a tensor, optionally adding a batch dimension.
pub fn arrayd_to_tensor<T1, T2>(a: ArrayD<T1>, add_batch_dim: bool) -> Result<Tensor>
where
    T1: AsPrimitive<T2>,
    T2: WithDType,
{
    let shape = a.shape();
    let v = a.iter().map(|e| e.as_()).collect::<Vec<_>>();
    let t: Tensor = TryFrom::<Vec<T2>>::try_from(v)?;
    let t = t.reshape(shape)?;

    match add_batch_dim {
        true => Ok(t.unsqueeze(0)?),
        false => Ok(t),
    }
}

/// Converts a tensor into an ndarray, optionally deleting the batch
/// dimension.
pub fn tensor_to_arrayd<T>(t: Tensor, delete_batch_dim: bool) -> Result<ArrayD<T>>
where
    T: WithDType,
{
    let shape = match delete_batch_dim {
        false => t.dims()[..].iter().map(|x| *x as usize).collect::<Vec<_>>(),
        true => t.dims()[1..]
            .iter()
            .map(|x| *x as usize)
            .collect::<Vec<_>>(),
    };
    let v: Vec<T> = t.flatten_all()?.to_vec1()?;

    Ok(ndarray::Array1::<T>::from(v).into_shape(ndarray::IxDyn(&shape))?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use candle_core::Device;
    use candle_nn::Init;

    fn varmap_with(name: &str, values: &[f32]) -> Result<VarMap> {
        let vm = VarMap::new();
        let init = Init::Randn {
            mean: 0.0,
            stdev: 1.0,
        };
        vm.get((values.len(),), name, init, DType::F32, &Device::Cpu)?;
        let t = Tensor::from_slice(values, (values.len(),), &Device::Cpu)?;
        vm.data().lock().unwrap().get(name).unwrap().set(&t)?;
        Ok(vm)
    }

    fn values_of(vm: &VarMap, name: &str) -> Vec<f32> {
        vm.data()
            .lock()
            .unwrap()
            .get(name)
            .unwrap()
            .as_tensor()
            .to_vec1::<f32>()
            .unwrap()
    }

    #[test]
    fn test_track() -> Result<()> {
        let tau = 0.7;
        let vm_src = varmap_with("var1", &[1.0, 2.0, 3.0])?;
        let vm_dest = varmap_with("var1", &[4.0, 5.0, 6.0])?;

        track(&vm_dest, &vm_src, tau)?;

        let expected: Vec<f32> = [(1.0, 4.0), (2.0, 5.0), (3.0, 6.0)]
            .iter()
            .map(|(s, d)| (tau * s + (1.0 - tau) * d) as f32)
            .collect();
        for (a, b) in values_of(&vm_dest, "var1").iter().zip(expected.iter()) {
            assert!((a - b).abs() < 1e-6);
        }

        Ok(())
    }

    #[test]
    fn test_track_tau_zero_keeps_dest() -> Result<()> {
        let vm_src = varmap_with("var1", &[1.0, 2.0, 3.0])?;
        let vm_dest = varmap_with("var1", &[4.0, 5.0, 6.0])?;

        track(&vm_dest, &vm_src, 0.0)?;

        assert_eq!(values_of(&vm_dest, "var1"), vec![4.0, 5.0, 6.0]);
        Ok(())
    }

    #[test]
    fn test_track_tau_one_copies_src() -> Result<()> {
        let vm_src = varmap_with("var1", &[1.0, 2.0, 3.0])?;
        let vm_dest = varmap_with("var1", &[4.0, 5.0, 6.0])?;

        track(&vm_dest, &vm_src, 1.0)?;

        assert_eq!(values_of(&vm_dest, "var1"), vec![1.0, 2.0, 3.0]);
        Ok(())
    }
}
