//! Gradient-descent rules for the value network.
//!
//! Optimizers keep one slot of state per layer, indexed by the layer's
//! position in the network, so layers of different shapes never share moment
//! estimates.

use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

use crate::layers::DenseLayer;

pub trait Optimizer {
    fn update_weights(&mut self, layer: usize, weights: &mut Array2<f32>, gradients: &Array2<f32>, learning_rate: f32);
    fn update_biases(&mut self, layer: usize, biases: &mut Array1<f32>, gradients: &Array1<f32>, learning_rate: f32);

    /// Called once after every layer of a training step has been updated.
    fn end_step(&mut self) {}
}

/// Which gradient algorithm the actor trains with.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum OptimizerKind {
    Sgd,
    Adam,
    #[default]
    RmsProp,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub enum OptimizerWrapper {
    Sgd(Sgd),
    Adam(Adam),
    RmsProp(RmsProp),
}

impl OptimizerWrapper {
    /// Build the optimizer state for `layers`. `rms_decay` only affects RMSProp.
    pub fn build(kind: OptimizerKind, rms_decay: f32, layers: &[DenseLayer]) -> Self {
        match kind {
            OptimizerKind::Sgd => OptimizerWrapper::Sgd(Sgd::new()),
            OptimizerKind::Adam => OptimizerWrapper::Adam(Adam::default(layers)),
            OptimizerKind::RmsProp => OptimizerWrapper::RmsProp(RmsProp::new(layers, rms_decay, 1e-8)),
        }
    }

    pub fn kind(&self) -> OptimizerKind {
        match self {
            OptimizerWrapper::Sgd(_) => OptimizerKind::Sgd,
            OptimizerWrapper::Adam(_) => OptimizerKind::Adam,
            OptimizerWrapper::RmsProp(_) => OptimizerKind::RmsProp,
        }
    }
}

impl Optimizer for OptimizerWrapper {
    fn update_weights(&mut self, layer: usize, weights: &mut Array2<f32>, gradients: &Array2<f32>, learning_rate: f32) {
        match self {
            OptimizerWrapper::Sgd(optimizer) => optimizer.update_weights(layer, weights, gradients, learning_rate),
            OptimizerWrapper::Adam(optimizer) => optimizer.update_weights(layer, weights, gradients, learning_rate),
            OptimizerWrapper::RmsProp(optimizer) => optimizer.update_weights(layer, weights, gradients, learning_rate),
        }
    }

    fn update_biases(&mut self, layer: usize, biases: &mut Array1<f32>, gradients: &Array1<f32>, learning_rate: f32) {
        match self {
            OptimizerWrapper::Sgd(optimizer) => optimizer.update_biases(layer, biases, gradients, learning_rate),
            OptimizerWrapper::Adam(optimizer) => optimizer.update_biases(layer, biases, gradients, learning_rate),
            OptimizerWrapper::RmsProp(optimizer) => optimizer.update_biases(layer, biases, gradients, learning_rate),
        }
    }

    fn end_step(&mut self) {
        match self {
            OptimizerWrapper::Sgd(optimizer) => optimizer.end_step(),
            OptimizerWrapper::Adam(optimizer) => optimizer.end_step(),
            OptimizerWrapper::RmsProp(optimizer) => optimizer.end_step(),
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct Sgd;

impl Sgd {
    pub fn new() -> Sgd {
        Sgd
    }
}

impl Optimizer for Sgd {
    fn update_weights(&mut self, _layer: usize, weights: &mut Array2<f32>, gradients: &Array2<f32>, learning_rate: f32) {
        weights.zip_mut_with(gradients, |w, &g| *w -= learning_rate * g);
    }

    fn update_biases(&mut self, _layer: usize, biases: &mut Array1<f32>, gradients: &Array1<f32>, learning_rate: f32) {
        biases.zip_mut_with(gradients, |b, &g| *b -= learning_rate * g);
    }
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Adam {
    pub beta1: f32,
    pub beta2: f32,
    pub epsilon: f32,
    m_weights: Vec<Array2<f32>>,
    v_weights: Vec<Array2<f32>>,
    m_biases: Vec<Array1<f32>>,
    v_biases: Vec<Array1<f32>>,
    /// Step counter for bias correction, starts at 1.
    pub t: usize,
}

impl Adam {
    pub fn new(layers: &[DenseLayer], beta1: f32, beta2: f32, epsilon: f32) -> Self {
        Adam {
            beta1,
            beta2,
            epsilon,
            m_weights: layers.iter().map(|l| Array2::zeros(l.weights.dim())).collect(),
            v_weights: layers.iter().map(|l| Array2::zeros(l.weights.dim())).collect(),
            m_biases: layers.iter().map(|l| Array1::zeros(l.biases.dim())).collect(),
            v_biases: layers.iter().map(|l| Array1::zeros(l.biases.dim())).collect(),
            t: 1,
        }
    }

    pub fn default(layers: &[DenseLayer]) -> Self {
        Self::new(layers, 0.9, 0.999, 1e-8)
    }

    fn corrections(&self) -> (f32, f32) {
        (
            1.0 - self.beta1.powi(self.t as i32),
            1.0 - self.beta2.powi(self.t as i32),
        )
    }
}

impl Optimizer for Adam {
    fn update_weights(&mut self, layer: usize, weights: &mut Array2<f32>, gradients: &Array2<f32>, learning_rate: f32) {
        let (c1, c2) = self.corrections();
        let (beta1, beta2, eps) = (self.beta1, self.beta2, self.epsilon);
        let m = &mut self.m_weights[layer];
        let v = &mut self.v_weights[layer];

        m.zip_mut_with(gradients, |m, &g| *m = beta1 * *m + (1.0 - beta1) * g);
        v.zip_mut_with(gradients, |v, &g| *v = beta2 * *v + (1.0 - beta2) * g * g);

        ndarray::Zip::from(weights)
            .and(&*m)
            .and(&*v)
            .for_each(|w, &m, &v| *w -= learning_rate * (m / c1) / ((v / c2).sqrt() + eps));
    }

    fn update_biases(&mut self, layer: usize, biases: &mut Array1<f32>, gradients: &Array1<f32>, learning_rate: f32) {
        let (c1, c2) = self.corrections();
        let (beta1, beta2, eps) = (self.beta1, self.beta2, self.epsilon);
        let m = &mut self.m_biases[layer];
        let v = &mut self.v_biases[layer];

        m.zip_mut_with(gradients, |m, &g| *m = beta1 * *m + (1.0 - beta1) * g);
        v.zip_mut_with(gradients, |v, &g| *v = beta2 * *v + (1.0 - beta2) * g * g);

        ndarray::Zip::from(biases)
            .and(&*m)
            .and(&*v)
            .for_each(|b, &m, &v| *b -= learning_rate * (m / c1) / ((v / c2).sqrt() + eps));
    }

    fn end_step(&mut self) {
        self.t += 1;
    }
}

/// RMSProp optimizer
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct RmsProp {
    pub decay: f32,
    pub epsilon: f32,
    v_weights: Vec<Array2<f32>>,
    v_biases: Vec<Array1<f32>>,
}

impl RmsProp {
    pub fn new(layers: &[DenseLayer], decay: f32, epsilon: f32) -> Self {
        RmsProp {
            decay,
            epsilon,
            v_weights: layers.iter().map(|l| Array2::zeros(l.weights.dim())).collect(),
            v_biases: layers.iter().map(|l| Array1::zeros(l.biases.dim())).collect(),
        }
    }
}

impl Optimizer for RmsProp {
    fn update_weights(&mut self, layer: usize, weights: &mut Array2<f32>, gradients: &Array2<f32>, learning_rate: f32) {
        let (decay, eps) = (self.decay, self.epsilon);
        let v = &mut self.v_weights[layer];

        // Moving average of squared gradients
        v.zip_mut_with(gradients, |v, &g| *v = decay * *v + (1.0 - decay) * g * g);

        ndarray::Zip::from(weights)
            .and(gradients)
            .and(&*v)
            .for_each(|w, &g, &v| *w -= learning_rate * g / (v.sqrt() + eps));
    }

    fn update_biases(&mut self, layer: usize, biases: &mut Array1<f32>, gradients: &Array1<f32>, learning_rate: f32) {
        let (decay, eps) = (self.decay, self.epsilon);
        let v = &mut self.v_biases[layer];

        v.zip_mut_with(gradients, |v, &g| *v = decay * *v + (1.0 - decay) * g * g);

        ndarray::Zip::from(biases)
            .and(gradients)
            .and(&*v)
            .for_each(|b, &g, &v| *b -= learning_rate * g / (v.sqrt() + eps));
    }
}
