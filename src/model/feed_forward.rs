//! Feed-forward digit classifier.
//!
//! ```text
//! pixels [batch, 784] -> Linear(784 -> 1000) -> ReLU -> Linear(1000 -> 10)
//! ```
//!
//! Logits are turned into class probabilities with a softmax; training uses
//! the negative log-likelihood of the true class.

use burn::nn::{Initializer, Linear, LinearConfig};
use burn::prelude::*;
use burn::tensor::activation::{log_softmax, relu, softmax};

#[derive(Config, Debug)]
pub struct FeedForwardConfig {
    #[config(default = 784)]
    pub input_size: usize,
    #[config(default = 1000)]
    pub hidden_size: usize,
    #[config(default = 10)]
    pub num_classes: usize,
}

impl FeedForwardConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> FeedForward<B> {
        let xavier = Initializer::XavierUniform { gain: 1.0 };
        FeedForward {
            hidden: LinearConfig::new(self.input_size, self.hidden_size)
                .with_initializer(xavier.clone())
                .init(device),
            output: LinearConfig::new(self.hidden_size, self.num_classes)
                .with_initializer(xavier)
                .init(device),
            input_size: self.input_size,
        }
    }
}

#[derive(Module, Debug)]
pub struct FeedForward<B: Backend> {
    hidden: Linear<B>,
    output: Linear<B>,
    input_size: usize,
}

impl<B: Backend> FeedForward<B> {
    #[must_use]
    pub fn input_size(&self) -> usize {
        self.input_size
    }

    /// `images`: [batch, pixels] -> logits [batch, classes].
    pub fn forward(&self, images: Tensor<B, 2>) -> Tensor<B, 2> {
        self.output.forward(relu(self.hidden.forward(images)))
    }

    /// Class probabilities, [batch, classes].
    pub fn predict(&self, images: Tensor<B, 2>) -> Tensor<B, 2> {
        softmax(self.forward(images), 1)
    }

    /// Mean negative log-likelihood against one-hot `targets`.
    pub fn loss(&self, images: Tensor<B, 2>, targets: Tensor<B, 2>) -> Tensor<B, 1> {
        negative_log_likelihood(self.forward(images), targets)
    }
}

/// Mean over the batch of `-sum(targets * log_softmax(logits))`.
pub fn negative_log_likelihood<B: Backend>(
    logits: Tensor<B, 2>,
    targets: Tensor<B, 2>,
) -> Tensor<B, 1> {
    (log_softmax(logits, 1) * targets).sum_dim(1).neg().mean()
}
