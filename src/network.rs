//! The Q-value network.
//!
//! One [`Architecture`] builds any number of [`QNetwork`]s with the same
//! topology and independent parameters. The agent builds two of them: the
//! actor it trains and the target it only queries, which is refreshed from
//! the actor by a deep parameter copy.

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use log::info;
use ndarray::{Array1, Array2, ArrayD, ArrayView1, ArrayView2, Ix1, Ix2};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::activations::Activation;
use crate::error::{DqnError, Result};
use crate::layers::{DenseLayer, WeightInit};
use crate::optimizer::{Optimizer, OptimizerKind, OptimizerWrapper};

/// Named parameter tensors, keyed `layer{i}/weights` and `layer{i}/biases`.
pub type Parameters = BTreeMap<String, ArrayD<f32>>;

/// Hidden-layer layout of the value network.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    pub hidden_sizes: Vec<usize>,
    pub activation: Activation,
    /// `None` picks the initialization recommended for `activation`.
    pub init: Option<WeightInit>,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        NetworkConfig {
            hidden_sizes: vec![256, 128],
            activation: Activation::Relu,
            init: None,
        }
    }
}

/// Everything needed to build a network: input shape, action count and hidden layout.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Architecture {
    pub state_shape: Vec<usize>,
    pub num_actions: usize,
    pub network: NetworkConfig,
}

impl Architecture {
    pub fn new(state_shape: &[usize], num_actions: usize) -> Self {
        Architecture {
            state_shape: state_shape.to_vec(),
            num_actions,
            network: NetworkConfig::default(),
        }
    }

    pub fn with_network(mut self, network: NetworkConfig) -> Self {
        self.network = network;
        self
    }

    pub fn hidden_sizes(mut self, sizes: &[usize]) -> Self {
        self.network.hidden_sizes = sizes.to_vec();
        self
    }

    /// Number of scalars in one flattened state.
    pub fn state_size(&self) -> usize {
        self.state_shape.iter().product()
    }

    /// Sizes of every layer boundary, input and output included.
    pub fn layer_sizes(&self) -> Vec<usize> {
        let mut sizes = Vec::with_capacity(self.network.hidden_sizes.len() + 2);
        sizes.push(self.state_size());
        sizes.extend_from_slice(&self.network.hidden_sizes);
        sizes.push(self.num_actions);
        sizes
    }

    /// Whether parameters of `other` can stand in for this architecture's.
    ///
    /// The state shape is compared as declared, not flattened. The weight
    /// initialization is ignored: it only decides the starting values.
    pub fn same_topology(&self, other: &Architecture) -> bool {
        self.state_shape == other.state_shape
            && self.num_actions == other.num_actions
            && self.network.hidden_sizes == other.network.hidden_sizes
            && self.network.activation == other.network.activation
    }

    fn check_topology(&self, other: &Architecture) -> Result<()> {
        if !self.same_topology(other) {
            return Err(DqnError::dimension_mismatch(
                format!(
                    "state {:?} -> {:?} ({:?}) -> {} actions",
                    self.state_shape, self.network.hidden_sizes, self.network.activation, self.num_actions
                ),
                format!(
                    "state {:?} -> {:?} ({:?}) -> {} actions",
                    other.state_shape, other.network.hidden_sizes, other.network.activation, other.num_actions
                ),
            ));
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.state_shape.is_empty() || self.state_size() == 0 {
            return Err(DqnError::invalid_parameter(
                "state_shape".to_string(),
                format!("must describe a non-empty state, got {:?}", self.state_shape),
            ));
        }
        if self.num_actions == 0 {
            return Err(DqnError::invalid_parameter("num_actions", "must be positive"));
        }
        if self.network.hidden_sizes.iter().any(|&size| size == 0) {
            return Err(DqnError::invalid_parameter(
                "hidden_sizes".to_string(),
                format!("every hidden layer needs at least one unit, got {:?}", self.network.hidden_sizes),
            ));
        }
        Ok(())
    }

    /// Build a freshly initialized network of this architecture.
    pub fn build<R: Rng + ?Sized>(
        &self,
        optimizer: OptimizerKind,
        rms_decay: f32,
        learning_rate: f32,
        rng: &mut R,
    ) -> Result<QNetwork> {
        self.validate()?;
        let sizes = self.layer_sizes();
        let last = sizes.len() - 2;
        let mut layers = Vec::with_capacity(sizes.len() - 1);
        for (i, window) in sizes.windows(2).enumerate() {
            // Action values are unbounded, so the output layer stays linear.
            let activation = if i == last {
                Activation::Linear
            } else {
                self.network.activation
            };
            let init = self
                .network
                .init
                .unwrap_or_else(|| WeightInit::for_activation(activation));
            layers.push(DenseLayer::new(window[0], window[1], activation, init, rng)?);
        }
        let optimizer = OptimizerWrapper::build(optimizer, rms_decay, &layers);

        let mut network = QNetwork {
            architecture: self.clone(),
            layers,
            optimizer,
            learning_rate: 0.0,
        };
        network.set_option(NetOption::LearningRate, learning_rate)?;
        Ok(network)
    }
}

/// Named outputs of the network.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Output {
    /// `Q(s, a)` for every action, shape `(N, A)`.
    Values,
    /// `max_a Q(s, a)`, shape `(N,)`.
    Value,
    /// One-hot greedy action, shape `(N, A)`.
    Choice,
}

/// Named scalar options consumed by [`QNetwork::train`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NetOption {
    LearningRate,
}

#[derive(Serialize, Deserialize)]
struct Checkpoint {
    architecture: Architecture,
    parameters: Parameters,
}

/// A fully connected Q-value network with its own optimizer state.
pub struct QNetwork {
    architecture: Architecture,
    layers: Vec<DenseLayer>,
    optimizer: OptimizerWrapper,
    learning_rate: f32,
}

impl QNetwork {
    pub fn architecture(&self) -> &Architecture {
        &self.architecture
    }

    pub fn layers(&self) -> &[DenseLayer] {
        &self.layers
    }

    pub fn optimizer_kind(&self) -> OptimizerKind {
        self.optimizer.kind()
    }

    pub fn num_actions(&self) -> usize {
        self.architecture.num_actions
    }

    pub fn state_size(&self) -> usize {
        self.architecture.state_size()
    }

    pub fn parameter_count(&self) -> usize {
        self.layers
            .iter()
            .map(|l| l.weights.len() + l.biases.len())
            .sum()
    }

    fn check_states(&self, states: &ArrayView2<f32>) -> Result<()> {
        if states.ncols() != self.state_size() {
            return Err(DqnError::dimension_mismatch(
                format!("(_, {})", self.state_size()),
                format!("{:?}", states.dim()),
            ));
        }
        Ok(())
    }

    /// Action values for a batch of flattened states.
    pub fn values(&self, states: ArrayView2<f32>) -> Result<Array2<f32>> {
        self.check_states(&states)?;
        let mut current = states.to_owned();
        for layer in &self.layers {
            current = layer.predict_batch(current.view());
        }
        Ok(current)
    }

    /// Best action value per state. A NaN anywhere in a row makes its value NaN.
    pub fn value(&self, states: ArrayView2<f32>) -> Result<Array1<f32>> {
        let values = self.values(states)?;
        Ok(values
            .rows()
            .into_iter()
            .map(|row| {
                row.fold(f32::NEG_INFINITY, |max, &v| {
                    if v.is_nan() || v > max {
                        v
                    } else {
                        max
                    }
                })
            })
            .collect())
    }

    /// One-hot encoded greedy action per state. Ties go to the lowest index.
    pub fn choice(&self, states: ArrayView2<f32>) -> Result<Array2<f32>> {
        let values = self.values(states)?;
        let mut choice = Array2::zeros(values.dim());
        for (i, row) in values.rows().into_iter().enumerate() {
            choice[[i, argmax(row)]] = 1.0;
        }
        Ok(choice)
    }

    /// Compute one of the named outputs.
    pub fn compute(&self, output: Output, states: ArrayView2<f32>) -> Result<ArrayD<f32>> {
        Ok(match output {
            Output::Values => self.values(states)?.into_dyn(),
            Output::Value => self.value(states)?.into_dyn(),
            Output::Choice => self.choice(states)?.into_dyn(),
        })
    }

    pub fn set_option(&mut self, option: NetOption, value: f32) -> Result<()> {
        match option {
            NetOption::LearningRate => {
                if !value.is_finite() || value < 0.0 {
                    return Err(DqnError::invalid_parameter(
                        "learning_rate".to_string(),
                        format!("must be finite and non-negative, got {}", value),
                    ));
                }
                self.learning_rate = value;
            }
        }
        Ok(())
    }

    pub fn option(&self, option: NetOption) -> f32 {
        match option {
            NetOption::LearningRate => self.learning_rate,
        }
    }

    /// One gradient step on `mean_i (Q(s_i, a_i) - target_i)^2`.
    ///
    /// Only the taken action's output receives error. Returns the cost measured
    /// on the forward pass the gradient was taken from, i.e. before the update.
    pub fn train(
        &mut self,
        states: ArrayView2<f32>,
        actions: &[usize],
        targets: ArrayView1<f32>,
    ) -> Result<f32> {
        self.check_states(&states)?;
        let batch_size = states.nrows();
        if batch_size == 0 {
            return Err(DqnError::invalid_parameter("states", "cannot train on an empty batch"));
        }
        if actions.len() != batch_size || targets.len() != batch_size {
            return Err(DqnError::dimension_mismatch(
                format!("{} actions and targets", batch_size),
                format!("{} actions, {} targets", actions.len(), targets.len()),
            ));
        }
        let num_actions = self.num_actions();
        if let Some(&action) = actions.iter().find(|&&a| a >= num_actions) {
            return Err(DqnError::InvalidAction {
                action,
                max_actions: num_actions,
            });
        }

        let mut current = states.to_owned();
        for layer in &mut self.layers {
            current = layer.forward_batch(current.view());
        }

        let mut output_errors = Array2::zeros(current.dim());
        let mut cost = 0.0;
        for (i, (&action, &target)) in actions.iter().zip(targets.iter()).enumerate() {
            let error = current[[i, action]] - target;
            cost += error * error;
            output_errors[[i, action]] = 2.0 * error / batch_size as f32;
        }
        cost /= batch_size as f32;

        // Gradients for every layer are taken before any parameter moves.
        let gradients = self.backward_batch(output_errors)?;
        let learning_rate = self.learning_rate;
        for (i, (layer, (weight_gradients, bias_gradients))) in
            self.layers.iter_mut().zip(gradients).enumerate()
        {
            self.optimizer
                .update_weights(i, &mut layer.weights, &weight_gradients, learning_rate);
            self.optimizer
                .update_biases(i, &mut layer.biases, &bias_gradients, learning_rate);
        }
        self.optimizer.end_step();

        Ok(cost)
    }

    fn backward_batch(&mut self, output_errors: Array2<f32>) -> Result<Vec<(Array2<f32>, Array1<f32>)>> {
        let mut gradients = Vec::with_capacity(self.layers.len());
        let mut current_error = output_errors;
        for i in (0..self.layers.len()).rev() {
            let layer = &mut self.layers[i];
            let (adjusted_error, weight_gradients, bias_gradients) =
                layer.backward_batch(current_error.view())?;
            gradients.push((weight_gradients, bias_gradients));
            if i != 0 {
                current_error = adjusted_error.dot(&layer.weights.t());
            }
        }
        gradients.reverse();
        Ok(gradients)
    }

    /// Deep copy of every parameter tensor.
    pub fn parameters(&self) -> Parameters {
        let mut parameters = Parameters::new();
        for (i, layer) in self.layers.iter().enumerate() {
            parameters.insert(weights_key(i), layer.weights.clone().into_dyn());
            parameters.insert(biases_key(i), layer.biases.clone().into_dyn());
        }
        parameters
    }

    /// Overwrite every parameter from `parameters`.
    ///
    /// All names and shapes are checked before anything is written, so a
    /// rejected snapshot leaves the network untouched.
    pub fn set_parameters(&mut self, parameters: &Parameters) -> Result<()> {
        if parameters.len() != 2 * self.layers.len() {
            return Err(DqnError::dimension_mismatch(
                format!("{} parameter tensors", 2 * self.layers.len()),
                format!("{}", parameters.len()),
            ));
        }
        let mut staged = Vec::with_capacity(self.layers.len());
        for (i, layer) in self.layers.iter().enumerate() {
            let weights = lookup(parameters, &weights_key(i))?
                .clone()
                .into_dimensionality::<Ix2>()?;
            let biases = lookup(parameters, &biases_key(i))?
                .clone()
                .into_dimensionality::<Ix1>()?;
            if weights.dim() != layer.weights.dim() || biases.dim() != layer.biases.dim() {
                return Err(DqnError::dimension_mismatch(
                    format!("layer{} {:?}/{:?}", i, layer.weights.dim(), layer.biases.dim()),
                    format!("{:?}/{:?}", weights.dim(), biases.dim()),
                ));
            }
            staged.push((weights, biases));
        }
        for (layer, (weights, biases)) in self.layers.iter_mut().zip(staged) {
            layer.weights = weights;
            layer.biases = biases;
        }
        Ok(())
    }

    /// Copy `source`'s parameters into this network's own storage.
    pub fn sync_from(&mut self, source: &QNetwork) -> Result<()> {
        self.architecture.check_topology(&source.architecture)?;
        for (layer, source) in self.layers.iter_mut().zip(&source.layers) {
            layer.weights.assign(&source.weights);
            layer.biases.assign(&source.biases);
        }
        Ok(())
    }

    /// Write the architecture and parameters to `directory/name.bin`.
    ///
    /// The file is written next to the target and renamed over it, so an
    /// interrupted save leaves the previous checkpoint intact.
    pub fn save(&self, directory: &Path, name: &str) -> Result<PathBuf> {
        fs::create_dir_all(directory)?;
        let path = directory.join(format!("{}.bin", name));
        let checkpoint = Checkpoint {
            architecture: self.architecture.clone(),
            parameters: self.parameters(),
        };
        let staging = directory.join(format!("{}.bin.tmp", name));
        fs::write(&staging, bincode::serialize(&checkpoint)?)?;
        fs::rename(&staging, &path)?;
        info!("Saved model to {}", path.display());
        Ok(path)
    }

    /// Restore parameters written by [`Self::save`] into this network.
    pub fn load_parameters(&mut self, path: &Path) -> Result<()> {
        let checkpoint: Checkpoint = bincode::deserialize(&fs::read(path)?)?;
        self.architecture.check_topology(&checkpoint.architecture)?;
        self.set_parameters(&checkpoint.parameters)
    }

    /// Build a network from a checkpoint, with fresh optimizer state.
    pub fn restore<R: Rng + ?Sized>(
        path: &Path,
        optimizer: OptimizerKind,
        rms_decay: f32,
        learning_rate: f32,
        rng: &mut R,
    ) -> Result<Self> {
        let checkpoint: Checkpoint = bincode::deserialize(&fs::read(path)?)?;
        let mut network = checkpoint
            .architecture
            .build(optimizer, rms_decay, learning_rate, rng)?;
        network.set_parameters(&checkpoint.parameters)?;
        Ok(network)
    }
}

impl fmt::Display for QNetwork {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "QNetwork(state {:?}", self.architecture.state_shape)?;
        for layer in &self.layers {
            write!(f, " -> {} {:?}", layer.output_size(), layer.activation)?;
        }
        write!(
            f,
            ", {} parameters, {:?})",
            self.parameter_count(),
            self.optimizer.kind()
        )
    }
}

/// Index of the largest entry, the first one on ties.
///
/// NaN ranks above every number, matching [`QNetwork::value`], so the first
/// NaN wins.
pub fn argmax(row: ArrayView1<f32>) -> usize {
    let mut best = 0;
    for (i, &v) in row.iter().enumerate() {
        if !row[best].is_nan() && (v.is_nan() || v > row[best]) {
            best = i;
        }
    }
    best
}

fn weights_key(layer: usize) -> String {
    format!("layer{}/weights", layer)
}

fn biases_key(layer: usize) -> String {
    format!("layer{}/biases", layer)
}

fn lookup<'a>(parameters: &'a Parameters, key: &str) -> Result<&'a ArrayD<f32>> {
    parameters
        .get(key)
        .ok_or_else(|| DqnError::invalid_parameter(key.to_string(), "missing from snapshot".to_string()))
}
