//! # Activation Functions
//!
//! Element-wise non-linearities for the hidden layers of the value network.
//! The output layer of a Q-network is always [`Activation::Linear`]: action
//! values are unbounded regression targets.
//!
//! - **ReLU**: `max(0, x)`, the default for hidden layers
//! - **LeakyReLU**: ReLU with a small negative slope
//! - **Tanh**: hyperbolic tangent, outputs between -1 and 1
//! - **Linear**: identity

pub mod functions;

pub use functions::Activation;
