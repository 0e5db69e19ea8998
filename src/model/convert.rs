//! Conversion helpers between ndarray and burn tensors.

use burn::prelude::*;
use ndarray::{Array1, Array2, Array3};

use crate::core::{NetError, NetResult};

/// Convert an ndarray Array2<f32> to a burn Tensor<B, 2>.
pub fn ndarray2_to_tensor<B: Backend>(arr: &Array2<f32>, device: &B::Device) -> Tensor<B, 2> {
    let (rows, cols) = arr.dim();
    let data: Vec<f32> = match arr.as_slice() {
        Some(slice) => slice.to_vec(),
        None => arr.iter().copied().collect(),
    };
    Tensor::from_data(TensorData::new(data, [rows, cols]), device)
}

/// Convert a `[batch, vocab, time]` one-hot array into the `[batch, time, vocab]`
/// layout the recurrent layers consume.
pub fn sequence_to_tensor<B: Backend>(arr: &Array3<f32>, device: &B::Device) -> Tensor<B, 3> {
    let (batch, vocab, time) = arr.dim();
    let data: Vec<f32> = arr.view().permuted_axes([0, 2, 1]).iter().copied().collect();
    Tensor::from_data(TensorData::new(data, [batch, time, vocab]), device)
}

/// Convert a `[batch, time]` mask into a `[batch, time, 1]` tensor that
/// broadcasts against per-step losses.
pub fn mask_to_tensor<B: Backend>(mask: &Array2<f32>, device: &B::Device) -> Tensor<B, 3> {
    let (batch, time) = mask.dim();
    let data: Vec<f32> = mask.iter().copied().collect();
    Tensor::from_data(TensorData::new(data, [batch, time, 1]), device)
}

/// Convert a burn Tensor<B, 2> to an ndarray Array2<f32>.
///
/// # Errors
///
/// Returns [`NetError::ShapeMismatch`] if the tensor data cannot be read as `f32`.
pub fn tensor_to_ndarray2<B: Backend>(tensor: Tensor<B, 2>) -> NetResult<Array2<f32>> {
    let [rows, cols] = tensor.dims();
    let data: Vec<f32> = tensor
        .into_data()
        .to_vec()
        .map_err(|e| NetError::ShapeMismatch(format!("tensor to vec: {e:?}")))?;
    Array2::from_shape_vec((rows, cols), data).map_err(|e| NetError::ShapeMismatch(e.to_string()))
}

/// Convert a burn Tensor<B, 1> to an ndarray Array1<f32>.
///
/// # Errors
///
/// Returns [`NetError::ShapeMismatch`] if the tensor data cannot be read as `f32`.
pub fn tensor_to_ndarray1<B: Backend>(tensor: Tensor<B, 1>) -> NetResult<Array1<f32>> {
    let data: Vec<f32> = tensor
        .into_data()
        .to_vec()
        .map_err(|e| NetError::ShapeMismatch(format!("tensor to vec: {e:?}")))?;
    Ok(Array1::from_vec(data))
}
