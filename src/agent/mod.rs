//! # DQN agent
//!
//! [`DqnAgent`] owns the replay memory and both halves of the network pair.
//! An external trainer drives it through the [`Agent`] trait: `act` once per
//! environment step, `experience` once per completed transition, plus
//! [`DqnAgent::checkpoint`] at episode boundaries.
//!
//! Exploration is not done here. A wrapper reads
//! [`DqnConfig::epsilon_schedule`](crate::config::DqnConfig::epsilon_schedule)
//! and decides when to override the greedy action.
//!
//! ## Example
//!
//! ```rust,no_run
//! use ndarray::ArrayD;
//! use vizdqn::agent::{Agent, DqnAgent};
//! use vizdqn::config::DqnConfig;
//! use vizdqn::replay_buffer::{Successor, Transition};
//!
//! let config = DqnConfig::default().seed(7);
//! let mut agent = DqnAgent::new(config, &[4], 2).unwrap();
//!
//! let state = ArrayD::zeros(vec![4]);
//! let action = agent.act(&state).unwrap();
//! let next = ArrayD::ones(vec![4]);
//! let transition = Transition::new(state, action, 1.0, Successor::Active(next));
//! agent.experience(0, transition).unwrap();
//! ```

pub mod traits;

mod dqn;
pub use dqn::{one_hot, DqnAgent, LearnOutcome};
pub(crate) use dqn::gigabytes;
pub use traits::Agent;
