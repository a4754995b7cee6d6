//! Bootstrapped regression targets for Q-learning.

use log::debug;
use ndarray::{Array1, ArrayView1, ArrayView2};

use crate::error::{DqnError, Result};
use crate::network::QNetwork;
use crate::replay_buffer::Batch;

/// Anything that can estimate the best achievable value of a batch of states.
pub trait ValueEstimator {
    fn max_values(&self, states: ArrayView2<f32>) -> Result<Array1<f32>>;
}

impl ValueEstimator for QNetwork {
    fn max_values(&self, states: ArrayView2<f32>) -> Result<Array1<f32>> {
        self.value(states)
    }
}

pub fn terminal_count(terminal: &[bool]) -> usize {
    terminal.iter().filter(|&&t| t).count()
}

/// `reward + discount * future`, with the future of terminal entries forced to zero.
///
/// Terminal entries come out as exactly their reward, whatever `future_values`
/// holds for them.
pub fn bootstrap_targets(
    rewards: ArrayView1<f32>,
    future_values: ArrayView1<f32>,
    terminal: &[bool],
    discount: f32,
) -> Result<Array1<f32>> {
    let n = rewards.len();
    if future_values.len() != n || terminal.len() != n {
        return Err(DqnError::dimension_mismatch(
            format!("{} future values and terminal flags", n),
            format!("{} future values, {} terminal flags", future_values.len(), terminal.len()),
        ));
    }
    Ok(rewards
        .iter()
        .zip(future_values.iter())
        .zip(terminal)
        .map(|((&reward, &future), &is_terminal)| {
            if is_terminal {
                reward
            } else {
                reward + discount * future
            }
        })
        .collect())
}

/// Regression targets for `batch`, estimating successor values with `estimator`.
pub fn compute_targets<E: ValueEstimator + ?Sized>(
    estimator: &E,
    batch: &Batch,
    discount: f32,
) -> Result<Array1<f32>> {
    let finals = terminal_count(&batch.terminal);
    if finals > 0 {
        debug!("{} terminal states in current batch", finals);
    }
    let future = estimator.max_values(batch.successors.view())?;
    bootstrap_targets(batch.rewards.view(), future.view(), &batch.terminal, discount)
}
