use candle_core::{Device, IndexOp, Tensor};
use deepq_core::generic_replay_buffer::BatchBase;

/// A column store backed by a [`Tensor`].
///
/// The internal buffer is allocated lazily at the first push, taking its
/// element shape and dtype from the pushed data, with the leading
/// dimension set to the capacity.
///
/// [`Tensor`]: https://docs.rs/candle-core/0.8.4/candle_core/struct.Tensor.html
#[derive(Clone, Debug)]
pub struct TensorBatch {
    buf: Option<Tensor>,
    capacity: usize,
}

impl TensorBatch {
    /// Creates a store holding the given tensor, with the leading
    /// dimension as capacity.
    pub fn from_tensor(t: Tensor) -> Self {
        let capacity = t.dims()[0] as _;
        Self {
            buf: Some(t),
            capacity,
        }
    }
}

impl BatchBase for TensorBatch {
    fn new(capacity: usize) -> Self {
        Self {
            buf: None,
            capacity,
        }
    }

    /// Writes the given data starting at `index`, wrapping around at the
    /// capacity.
    fn push(&mut self, index: usize, data: Self) {
        if data.buf.is_none() {
            return;
        }

        let batch_size = data.buf.as_ref().unwrap().dims()[0];
        if batch_size == 0 {
            return;
        }

        if self.buf.is_none() {
            let mut shape = data.buf.as_ref().unwrap().dims().to_vec();
            shape[0] = self.capacity;
            let dtype = data.buf.as_ref().unwrap().dtype();
            let device = Device::Cpu;
            self.buf = Some(Tensor::zeros(shape, dtype, &device).unwrap());
        }

        if index + batch_size > self.capacity {
            let batch_size = self.capacity - index;
            let data = &data.buf.unwrap();
            let data1 = data.i((..batch_size,)).unwrap();
            let data2 = data.i((batch_size..,)).unwrap();
            self.buf
                .as_mut()
                .unwrap()
                .slice_set(&data1, 0, index)
                .unwrap();
            self.buf.as_mut().unwrap().slice_set(&data2, 0, 0).unwrap();
        } else {
            self.buf
                .as_mut()
                .unwrap()
                .slice_set(&data.buf.unwrap(), 0, index)
                .unwrap();
        }
    }

    fn sample(&self, ixs: &Vec<usize>) -> Self {
        let capacity = ixs.len();
        let ixs = {
            let device = self.buf.as_ref().unwrap().device();
            let ixs = ixs.iter().map(|x| *x as u32).collect();
            Tensor::from_vec(ixs, &[capacity], device).unwrap()
        };
        let buf = Some(self.buf.as_ref().unwrap().index_select(&ixs, 0).unwrap());
        Self { buf, capacity }
    }
}

impl From<TensorBatch> for Tensor {
    fn from(b: TensorBatch) -> Self {
        b.buf.expect("TensorBatch is empty")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use candle_core::DType;

    fn row(v: f32) -> TensorBatch {
        TensorBatch::from_tensor(
            Tensor::from_slice(&[v, v], (1, 2), &Device::Cpu).unwrap(),
        )
    }

    #[test]
    fn test_push_wraps_at_capacity() {
        let mut batch = TensorBatch::new(4);
        for i in 0..6 {
            batch.push(i % 4, row(i as f32));
        }

        let buf: Tensor = batch.into();
        assert_eq!(buf.dtype(), DType::F32);
        let first = buf.i((0, 0)).unwrap().to_scalar::<f32>().unwrap();
        let last = buf.i((3, 0)).unwrap().to_scalar::<f32>().unwrap();
        assert_eq!(first, 4.);
        assert_eq!(last, 3.);
    }

    #[test]
    fn test_sample_selects_rows() {
        let mut batch = TensorBatch::new(4);
        for i in 0..4 {
            batch.push(i, row(i as f32));
        }

        let sampled: Tensor = batch.sample(&vec![2, 0]).into();
        assert_eq!(sampled.dims(), &[2, 2]);
        assert_eq!(sampled.i((0, 0)).unwrap().to_scalar::<f32>().unwrap(), 2.);
        assert_eq!(sampled.i((1, 0)).unwrap().to_scalar::<f32>().unwrap(), 0.);
    }
}
