//! # vizdqn - Deep Q-Network agent core
//!
//! The learning core of a DQN agent that plays from preprocessed, fixed-shape
//! observations: replay memory, a value network paired with a lagged target
//! copy, bootstrapped regression targets and the learning step that ties them
//! together. Environments, frame preprocessing and epsilon-greedy exploration
//! live outside this crate and talk to it through [`agent::Agent`].
//!
//! ## Key Features
//!
//! - **Replay memory**: bounded FIFO with uniform sampling with replacement
//! - **Target network**: refreshed from the actor by deep copy, never aliased
//! - **Terminal masking**: episode ends bootstrap from the reward alone
//! - **Optimizers**: SGD, Adam and RMSProp with per-layer state
//! - **Schedules**: linear decay of learning rate and exploration rate
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use ndarray::ArrayD;
//! use vizdqn::agent::DqnAgent;
//! use vizdqn::config::DqnConfig;
//! use vizdqn::replay_buffer::{Successor, Transition};
//!
//! let config = DqnConfig::default().start_learning(32).seed(0);
//! let mut agent = DqnAgent::new(config, &[84, 84], 4).unwrap();
//!
//! let frame = ArrayD::zeros(vec![84, 84]);
//! let action = agent.greedy_action(&frame).unwrap();
//! let outcome = agent
//!     .experience(1, Transition::new(frame, action, 0.0, Successor::Terminal))
//!     .unwrap();
//! println!("{:?}", outcome);
//! ```
//!
//! ## Module Organization
//!
//! - [`activations`] - Hidden-layer non-linearities
//! - [`agent`] - The DQN agent and the trait trainers drive it through
//! - [`config`] - Agent configuration with YAML persistence
//! - [`error`] - Error types and result handling
//! - [`layers`] - Dense layer and weight initialization
//! - [`metrics`] - Running statistics and training history
//! - [`network`] - The Q-value network, parameter snapshots and checkpoints
//! - [`optimizer`] - Optimization algorithms
//! - [`replay_buffer`] - Experience replay
//! - [`schedule`] - Decay schedules and cadence helpers
//! - [`target`] - Bootstrapped target computation

pub mod activations;
pub mod agent;
pub mod config;
pub mod error;
pub mod layers;
pub mod metrics;
pub mod network;
pub mod optimizer;
pub mod replay_buffer;
pub mod schedule;
pub mod target;

#[cfg(test)]
mod tests;
