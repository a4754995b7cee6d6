//! Agent configuration.
//!
//! [`DqnConfig`] is read once when the agent is built and never changes
//! afterwards. It round-trips through YAML, and missing keys fall back to the
//! defaults below.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{DqnError, Result};
use crate::network::NetworkConfig;
use crate::optimizer::OptimizerKind;
use crate::schedule::Decay;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DqnConfig {
    /// Frame downsampling factor, consumed by the preprocessing pipeline.
    pub downsample: usize,
    /// Frames per decision, consumed by the preprocessing pipeline.
    pub frame_skip: usize,

    /// Exploration rate schedule, consumed by the epsilon-greedy wrapper.
    pub epsilon_from: f32,
    pub epsilon_to: f32,
    pub epsilon_duration: u64,

    pub replay_capacity: usize,
    pub batch_size: usize,

    pub initial_learning_rate: f32,
    pub final_learning_rate: f32,
    /// Timesteps over which the learning rate decays to `final_learning_rate`.
    pub learning_rate_duration: u64,
    pub optimizer: OptimizerKind,
    pub rms_decay: f32,

    /// Learning steps per reported mean cost.
    pub print_cost: usize,
    /// Buffer size that must be reached before the first learning step.
    pub start_learning: usize,
    /// Timesteps between checkpoints.
    pub save_model: u64,
    pub discount: f32,
    /// Learning steps between target network syncs.
    pub target_sync_interval: usize,

    pub seed: Option<u64>,
    pub metrics_history: usize,
    pub network: NetworkConfig,
}

impl Default for DqnConfig {
    fn default() -> Self {
        DqnConfig {
            downsample: 2,
            frame_skip: 4,
            epsilon_from: 1.0,
            epsilon_to: 0.1,
            epsilon_duration: 500_000,
            replay_capacity: 20_000,
            batch_size: 32,
            initial_learning_rate: 1e-4,
            final_learning_rate: 0.0,
            learning_rate_duration: 20_000_000,
            optimizer: OptimizerKind::RmsProp,
            rms_decay: 0.99,
            print_cost: 10_000,
            start_learning: 100,
            save_model: 100_000,
            discount: 0.99,
            target_sync_interval: 1,
            seed: None,
            metrics_history: 1000,
            network: NetworkConfig::default(),
        }
    }
}

impl DqnConfig {
    pub fn replay_capacity(mut self, capacity: usize) -> Self {
        self.replay_capacity = capacity;
        self
    }

    pub fn batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn start_learning(mut self, start_learning: usize) -> Self {
        self.start_learning = start_learning;
        self
    }

    pub fn learning_rate(mut self, initial: f32, last: f32, duration: u64) -> Self {
        self.initial_learning_rate = initial;
        self.final_learning_rate = last;
        self.learning_rate_duration = duration;
        self
    }

    pub fn optimizer(mut self, optimizer: OptimizerKind) -> Self {
        self.optimizer = optimizer;
        self
    }

    pub fn rms_decay(mut self, rms_decay: f32) -> Self {
        self.rms_decay = rms_decay;
        self
    }

    pub fn discount(mut self, discount: f32) -> Self {
        self.discount = discount;
        self
    }

    pub fn print_cost(mut self, every: usize) -> Self {
        self.print_cost = every;
        self
    }

    pub fn save_model(mut self, every: u64) -> Self {
        self.save_model = every;
        self
    }

    pub fn target_sync_interval(mut self, interval: usize) -> Self {
        self.target_sync_interval = interval;
        self
    }

    pub fn epsilon(mut self, from: f32, to: f32, duration: u64) -> Self {
        self.epsilon_from = from;
        self.epsilon_to = to;
        self.epsilon_duration = duration;
        self
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn metrics_history(mut self, size: usize) -> Self {
        self.metrics_history = size;
        self
    }

    pub fn network(mut self, network: NetworkConfig) -> Self {
        self.network = network;
        self
    }

    /// Exploration rate over time, for the epsilon-greedy wrapper around the agent.
    pub fn epsilon_schedule(&self) -> Decay {
        Decay::new(self.epsilon_from, self.epsilon_to, self.epsilon_duration)
    }

    pub fn learning_rate_schedule(&self) -> Decay {
        Decay::new(
            self.initial_learning_rate,
            self.final_learning_rate,
            self.learning_rate_duration,
        )
    }

    pub fn validate(&self) -> Result<()> {
        if self.replay_capacity == 0 {
            return Err(DqnError::invalid_parameter("replay_capacity", "must be greater than 0"));
        }
        if self.batch_size == 0 {
            return Err(DqnError::invalid_parameter("batch_size", "must be greater than 0"));
        }
        if self.start_learning == 0 {
            return Err(DqnError::invalid_parameter("start_learning", "must be greater than 0"));
        }
        if !(0.0..1.0).contains(&self.discount) {
            return Err(DqnError::invalid_parameter(
                "discount".to_string(),
                format!("must lie in [0, 1), got {}", self.discount),
            ));
        }
        if !self.initial_learning_rate.is_finite() || self.initial_learning_rate <= 0.0 {
            return Err(DqnError::invalid_parameter(
                "initial_learning_rate".to_string(),
                format!("must be finite and positive, got {}", self.initial_learning_rate),
            ));
        }
        if !self.final_learning_rate.is_finite() || self.final_learning_rate < 0.0 {
            return Err(DqnError::invalid_parameter(
                "final_learning_rate".to_string(),
                format!("must be finite and non-negative, got {}", self.final_learning_rate),
            ));
        }
        if !(0.0..1.0).contains(&self.rms_decay) {
            return Err(DqnError::invalid_parameter(
                "rms_decay".to_string(),
                format!("must lie in [0, 1), got {}", self.rms_decay),
            ));
        }
        if self.target_sync_interval == 0 {
            return Err(DqnError::invalid_parameter(
                "target_sync_interval",
                "must be greater than 0",
            ));
        }
        let hidden = &self.network.hidden_sizes;
        if hidden.is_empty() || hidden.contains(&0) {
            return Err(DqnError::invalid_parameter(
                "network.hidden_sizes".to_string(),
                format!("needs at least one non-empty hidden layer, got {:?}", hidden),
            ));
        }
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Ok(serde_yaml::from_str(&text)?)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        fs::write(path, serde_yaml::to_string(self)?)?;
        Ok(())
    }
}
