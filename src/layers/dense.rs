use ndarray::{Array1, Array2, ArrayView2, Axis};
use rand::Rng;

use super::initialization::WeightInit;
use crate::activations::Activation;
use crate::error::{DqnError, Result};

/// A fully connected (dense) layer in a neural network
#[derive(Clone, Debug)]
pub struct DenseLayer {
    pub weights: Array2<f32>,
    pub biases: Array1<f32>,
    pub activation: Activation,
    pre_activation_output: Option<Array2<f32>>,
    inputs: Option<Array2<f32>>,
}

impl DenseLayer {
    /// Create a new dense layer with the given input size, output size and activation function.
    pub fn new<R: Rng + ?Sized>(
        input_size: usize,
        output_size: usize,
        activation: Activation,
        init: WeightInit,
        rng: &mut R,
    ) -> Result<Self> {
        let weights = init.initialize_weights((input_size, output_size), rng)?;
        let biases = init.initialize_biases(output_size);
        Ok(DenseLayer {
            weights,
            biases,
            activation,
            pre_activation_output: None,
            inputs: None,
        })
    }

    pub fn input_size(&self) -> usize {
        self.weights.shape()[0]
    }

    pub fn output_size(&self) -> usize {
        self.weights.shape()[1]
    }

    /// Forward pass without recording anything for backpropagation.
    pub fn predict_batch(&self, inputs: ArrayView2<f32>) -> Array2<f32> {
        let mut outputs = inputs.dot(&self.weights) + &self.biases.view().insert_axis(Axis(0));
        self.activation.apply_batch(&mut outputs);
        outputs
    }

    /// Forward pass that keeps the inputs and pre-activations for [`Self::backward_batch`].
    pub fn forward_batch(&mut self, inputs: ArrayView2<f32>) -> Array2<f32> {
        self.inputs = Some(inputs.to_owned());
        let mut outputs = inputs.dot(&self.weights) + &self.biases.view().insert_axis(Axis(0));
        self.pre_activation_output = Some(outputs.clone());
        self.activation.apply_batch(&mut outputs);
        outputs
    }

    /// Gradients of this layer given the error at its output.
    ///
    /// Returns `(adjusted_error, weight_gradients, bias_gradients)`, where
    /// `adjusted_error` is the error behind the activation, ready to be pushed
    /// through `weights.t()` to the previous layer. Consumes the forward cache.
    pub fn backward_batch(
        &mut self,
        output_errors: ArrayView2<f32>,
    ) -> Result<(Array2<f32>, Array2<f32>, Array1<f32>)> {
        let (pre_activation_output, inputs) =
            match (self.pre_activation_output.take(), self.inputs.take()) {
                (Some(pre), Some(inputs)) => (pre, inputs),
                _ => {
                    return Err(DqnError::Numerical(
                        "forward_batch() must be called before backward_batch()".to_string(),
                    ))
                }
            };
        if pre_activation_output.dim() != output_errors.dim() {
            return Err(DqnError::dimension_mismatch(
                format!("{:?}", pre_activation_output.dim()),
                format!("{:?}", output_errors.dim()),
            ));
        }

        let activation_deriv = self.activation.derivative_batch(pre_activation_output.view());
        let adjusted_error = &output_errors * &activation_deriv;
        let weight_gradients = inputs.t().dot(&adjusted_error);
        let bias_gradients = adjusted_error.sum_axis(Axis(0));

        Ok((adjusted_error, weight_gradients, bias_gradients))
    }
}
