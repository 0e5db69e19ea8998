//! Two-layer LSTM character model.
//!
//! ```text
//! one-hot [batch, time, vocab]
//!   -> LSTM(vocab -> hidden, tanh)
//!   -> LSTM(hidden -> hidden, tanh)
//!   -> Linear(hidden -> vocab)   (softmax applied by loss / sampling)
//! ```
//!
//! Training scores the logits with a masked multi-class cross-entropy so the
//! warm-up steps of each window do not contribute. Generation goes through
//! [`RnnStepper`], which feeds one step at a time and keeps the LSTM state.

use burn::nn::{Initializer, Linear, LinearConfig, Lstm, LstmConfig, LstmState};
use burn::prelude::*;
use burn::tensor::activation::{log_softmax, softmax};
use ndarray::Array1;

use super::convert::tensor_to_ndarray1;
use crate::core::{NetError, NetResult, SequenceModel};

#[derive(Config, Debug)]
pub struct CharRnnConfig {
    /// One-hot input width and number of output classes.
    pub vocab_size: usize,
    /// Units per LSTM layer.
    #[config(default = 512)]
    pub hidden_size: usize,
}

impl CharRnnConfig {
    /// Build the network with Xavier-initialized weights.
    pub fn init<B: Backend>(&self, device: &B::Device) -> CharRnn<B> {
        let xavier = Initializer::XavierUniform { gain: 1.0 };
        let lstm_in = LstmConfig::new(self.vocab_size, self.hidden_size, true)
            .with_initializer(xavier.clone())
            .init(device);
        let lstm_hidden = LstmConfig::new(self.hidden_size, self.hidden_size, true)
            .with_initializer(xavier.clone())
            .init(device);
        let output = LinearConfig::new(self.hidden_size, self.vocab_size)
            .with_initializer(xavier)
            .init(device);
        CharRnn {
            lstm_in,
            lstm_hidden,
            output,
            vocab_size: self.vocab_size,
        }
    }
}

/// Recurrent state of both LSTM layers.
pub type RnnState<B> = (LstmState<B, 2>, LstmState<B, 2>);

#[derive(Module, Debug)]
pub struct CharRnn<B: Backend> {
    lstm_in: Lstm<B>,
    lstm_hidden: Lstm<B>,
    output: Linear<B>,
    vocab_size: usize,
}

impl<B: Backend> CharRnn<B> {
    #[must_use]
    pub fn vocab_size(&self) -> usize {
        self.vocab_size
    }

    /// `input`: [batch, time, vocab] -> logits [batch, time, vocab] and the
    /// state after the last time step.
    pub fn forward(
        &self,
        input: Tensor<B, 3>,
        state: Option<RnnState<B>>,
    ) -> (Tensor<B, 3>, RnnState<B>) {
        let (state_in, state_hidden) = match state {
            Some((a, b)) => (Some(a), Some(b)),
            None => (None, None),
        };
        let (h, state_in) = self.lstm_in.forward(input, state_in);
        let (h, state_hidden) = self.lstm_hidden.forward(h, state_hidden);
        (self.output.forward(h), (state_in, state_hidden))
    }

    /// Mean cross-entropy over the steps where `mask` is one.
    ///
    /// `labels` are one-hot [batch, time, vocab]; `mask` is [batch, time, 1].
    pub fn masked_loss(
        &self,
        features: Tensor<B, 3>,
        labels: Tensor<B, 3>,
        mask: Tensor<B, 3>,
        scored_steps: usize,
    ) -> Tensor<B, 1> {
        let (logits, _) = self.forward(features, None);
        masked_cross_entropy(logits, labels, mask, scored_steps)
    }
}

/// Masked multi-class cross-entropy of `logits` against one-hot `labels`.
#[allow(clippy::cast_precision_loss)]
pub fn masked_cross_entropy<B: Backend>(
    logits: Tensor<B, 3>,
    labels: Tensor<B, 3>,
    mask: Tensor<B, 3>,
    scored_steps: usize,
) -> Tensor<B, 1> {
    let nll = (log_softmax(logits, 2) * labels).sum_dim(2).neg();
    (nll * mask).sum().div_scalar(scored_steps.max(1) as f32)
}

/// Drives a [`CharRnn`] one character at a time, carrying the LSTM state
/// between calls.
pub struct RnnStepper<B: Backend> {
    model: CharRnn<B>,
    state: Option<RnnState<B>>,
    device: B::Device,
}

impl<B: Backend> RnnStepper<B> {
    pub fn new(model: CharRnn<B>, device: &B::Device) -> Self {
        Self {
            model,
            state: None,
            device: device.clone(),
        }
    }

    #[must_use]
    pub fn into_model(self) -> CharRnn<B> {
        self.model
    }
}

impl<B: Backend> SequenceModel for RnnStepper<B> {
    fn vocab_size(&self) -> usize {
        self.model.vocab_size
    }

    fn clear_state(&mut self) {
        self.state = None;
    }

    fn time_step(&mut self, input: &Array1<f32>) -> NetResult<Array1<f32>> {
        let width = self.model.vocab_size;
        if input.len() != width {
            return Err(NetError::ShapeMismatch(format!(
                "input of width {} for a model with {} classes",
                input.len(),
                width
            )));
        }
        let x = Tensor::<B, 3>::from_data(
            TensorData::new(input.to_vec(), [1, 1, width]),
            &self.device,
        );
        let (logits, state) = self.model.forward(x, self.state.take());
        self.state = Some(state);
        let logits: Tensor<B, 1> = logits.reshape([width]);
        tensor_to_ndarray1(softmax(logits, 0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use burn::backend::NdArray;

    type TestBackend = NdArray<f32>;

    fn tiny_model() -> CharRnn<TestBackend> {
        CharRnnConfig::new(3).with_hidden_size(8).init(&Default::default())
    }

    #[test]
    fn test_forward_shapes() {
        let device = Default::default();
        let model = tiny_model();
        let input = Tensor::<TestBackend, 3>::zeros([2, 5, 3], &device);
        let (logits, (s1, s2)) = model.forward(input, None);
        assert_eq!(logits.dims(), [2, 5, 3]);
        assert_eq!(s1.hidden.dims(), [2, 8]);
        assert_eq!(s2.cell.dims(), [2, 8]);
    }

    #[test]
    fn test_stepper_outputs_distribution() {
        let device = Default::default();
        let mut stepper = RnnStepper::new(tiny_model(), &device);
        let out = stepper
            .time_step(&ndarray::arr1(&[1.0, 0.0, 0.0]))
            .expect("time step");
        assert_eq!(out.len(), 3);
        assert!(out.iter().all(|&p| p >= 0.0));
        assert_abs_diff_eq!(out.sum(), 1.0, epsilon = 1e-5);
    }

    #[test]
    fn test_stepper_carries_state() {
        let device = Default::default();
        let mut stepper = RnnStepper::new(tiny_model(), &device);
        let x = ndarray::arr1(&[0.0, 1.0, 0.0]);

        let first = stepper.time_step(&x).expect("step");
        let _ = stepper.time_step(&x).expect("step");
        stepper.clear_state();
        let again = stepper.time_step(&x).expect("step");

        for (a, b) in first.iter().zip(again.iter()) {
            assert_abs_diff_eq!(*a, *b, epsilon = 1e-6);
        }
    }

    #[test]
    fn test_stepper_rejects_wrong_width() {
        let device = Default::default();
        let mut stepper = RnnStepper::new(tiny_model(), &device);
        let result = stepper.time_step(&ndarray::arr1(&[1.0, 0.0]));
        assert!(matches!(result, Err(NetError::ShapeMismatch(_))));
    }

    #[test]
    fn test_masked_loss_ignores_masked_steps() {
        let device = Default::default();
        let logits = Tensor::<TestBackend, 3>::from_floats([[[10.0, 0.0], [0.0, 10.0]]], &device);
        // Step 0 is predicted wrong, step 1 right; masking step 0 leaves a tiny loss.
        let labels = Tensor::<TestBackend, 3>::from_floats([[[0.0, 1.0], [0.0, 1.0]]], &device);
        let mask = Tensor::<TestBackend, 3>::from_floats([[[0.0], [1.0]]], &device);
        let loss: f32 = masked_cross_entropy(logits, labels, mask, 1).into_scalar().elem();
        assert!(loss < 1e-3, "loss {loss}");
    }
}
