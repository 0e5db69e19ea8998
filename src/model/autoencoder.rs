//! Digit autoencoder with a class-code bottleneck.
//!
//! ```text
//! encoder: pixels 784 -> Linear 256 -> ReLU -> Linear 10 -> ReLU   (code)
//! decoder: code 10    -> Linear 256 -> ReLU -> Linear 784 -> sigmoid
//! ```
//!
//! The loss adds a cross-entropy term on the code to the reconstruction
//! error, pushing the code towards a scaled one-hot of the digit. A one-hot
//! class code fed into the decoder alone then renders a prototype image of
//! that digit.

use burn::nn::{Initializer, Linear, LinearConfig};
use burn::prelude::*;
use burn::tensor::activation::{relu, sigmoid};

use super::feed_forward::negative_log_likelihood;

#[derive(Config, Debug)]
pub struct AutoencoderConfig {
    #[config(default = 784)]
    pub input_size: usize,
    #[config(default = 256)]
    pub hidden_size: usize,
    #[config(default = 10)]
    pub code_size: usize,
}

impl AutoencoderConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> Autoencoder<B> {
        let xavier = Initializer::XavierUniform { gain: 1.0 };
        let linear = |d_in: usize, d_out: usize| -> Linear<B> {
            LinearConfig::new(d_in, d_out)
                .with_initializer(xavier.clone())
                .init(device)
        };
        Autoencoder {
            enc_hidden: linear(self.input_size, self.hidden_size),
            enc_code: linear(self.hidden_size, self.code_size),
            dec_hidden: linear(self.code_size, self.hidden_size),
            dec_output: linear(self.hidden_size, self.input_size),
            input_size: self.input_size,
            code_size: self.code_size,
        }
    }
}

#[derive(Module, Debug)]
pub struct Autoencoder<B: Backend> {
    enc_hidden: Linear<B>,
    enc_code: Linear<B>,
    dec_hidden: Linear<B>,
    dec_output: Linear<B>,
    input_size: usize,
    code_size: usize,
}

impl<B: Backend> Autoencoder<B> {
    #[must_use]
    pub fn input_size(&self) -> usize {
        self.input_size
    }

    #[must_use]
    pub fn code_size(&self) -> usize {
        self.code_size
    }

    /// [batch, pixels] -> non-negative code [batch, code_size].
    pub fn encode(&self, images: Tensor<B, 2>) -> Tensor<B, 2> {
        relu(self.enc_code.forward(relu(self.enc_hidden.forward(images))))
    }

    /// [batch, code_size] -> pixels in (0, 1) [batch, pixels].
    pub fn decode(&self, code: Tensor<B, 2>) -> Tensor<B, 2> {
        sigmoid(self.dec_output.forward(relu(self.dec_hidden.forward(code))))
    }

    /// Returns `(code, reconstruction)`.
    pub fn forward(&self, images: Tensor<B, 2>) -> (Tensor<B, 2>, Tensor<B, 2>) {
        let code = self.encode(images);
        let reconstruction = self.decode(code.clone());
        (code, reconstruction)
    }

    /// Reconstruction MSE plus `code_weight` times the code cross-entropy
    /// against one-hot `targets`.
    pub fn loss(
        &self,
        images: Tensor<B, 2>,
        targets: Tensor<B, 2>,
        code_weight: f32,
    ) -> Tensor<B, 1> {
        let (code, reconstruction) = self.forward(images.clone());
        let mse = (reconstruction - images).powf_scalar(2.0).mean();
        mse + negative_log_likelihood(code, targets).mul_scalar(code_weight)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type TestBackend = NdArray<f32>;

    #[test]
    fn test_shapes_and_ranges() {
        let device = Default::default();
        let model = AutoencoderConfig::new()
            .with_input_size(6)
            .with_hidden_size(5)
            .with_code_size(3)
            .init::<TestBackend>(&device);
        let (code, recon) = model.forward(Tensor::ones([2, 6], &device));
        assert_eq!(code.dims(), [2, 3]);
        assert_eq!(recon.dims(), [2, 6]);

        let code: Vec<f32> = code.into_data().to_vec().expect("f32 data");
        assert!(code.iter().all(|&c| c >= 0.0));
        let recon: Vec<f32> = recon.into_data().to_vec().expect("f32 data");
        assert!(recon.iter().all(|&p| p > 0.0 && p < 1.0));
    }

    #[test]
    fn test_decode_only() {
        let device = Default::default();
        let model = AutoencoderConfig::new().init::<TestBackend>(&device);
        let images = model.decode(Tensor::zeros([10, 10], &device));
        assert_eq!(images.dims(), [10, 784]);
    }
}
