use ndarray::{Array2, ArrayView2};
use serde::{Deserialize, Serialize};

/// The activation applied after a dense layer's affine transform.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize, Default)]
pub enum Activation {
    #[default]
    Relu,
    Linear,
    Tanh,
    LeakyRelu { alpha: f32 },
}

impl Activation {
    /// Apply the activation to a batch of pre-activations in place.
    pub fn apply_batch(&self, inputs: &mut Array2<f32>) {
        match *self {
            Activation::Relu => inputs.mapv_inplace(|v| v.max(0.0)),
            Activation::Linear => {}
            Activation::Tanh => inputs.mapv_inplace(f32::tanh),
            Activation::LeakyRelu { alpha } => {
                inputs.mapv_inplace(|v| if v > 0.0 { v } else { alpha * v })
            }
        }
    }

    /// Derivative of the activation evaluated at the given pre-activations.
    pub fn derivative_batch(&self, inputs: ArrayView2<f32>) -> Array2<f32> {
        match *self {
            Activation::Relu => inputs.mapv(|v| if v > 0.0 { 1.0 } else { 0.0 }),
            Activation::Linear => Array2::ones(inputs.dim()),
            Activation::Tanh => inputs.mapv(|v| {
                let t = v.tanh();
                1.0 - t * t
            }),
            Activation::LeakyRelu { alpha } => inputs.mapv(|v| if v > 0.0 { 1.0 } else { alpha }),
        }
    }
}
