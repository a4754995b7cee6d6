use std::collections::VecDeque;
use std::path::Path;

use serde::{Deserialize, Serialize};

/// Bounded histories of what the learning step produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingMetrics {
    history_size: usize,

    /// Cost of each learning step
    pub costs: VecDeque<f32>,

    /// Learning rate the actor trained with
    pub learning_rates: VecDeque<f32>,

    /// Terminal successors per sampled batch
    pub terminal_counts: VecDeque<usize>,

    /// Learning steps performed in total
    pub learning_steps: usize,

    /// Learning steps whose cost was NaN or infinite
    pub non_finite_costs: usize,
}

impl TrainingMetrics {
    pub fn new(history_size: usize) -> Self {
        TrainingMetrics {
            history_size,
            costs: VecDeque::with_capacity(history_size),
            learning_rates: VecDeque::with_capacity(history_size),
            terminal_counts: VecDeque::with_capacity(history_size),
            learning_steps: 0,
            non_finite_costs: 0,
        }
    }

    pub fn record_step(&mut self, cost: f32, learning_rate: f32, terminals: usize) {
        push_bounded(&mut self.costs, cost, self.history_size);
        push_bounded(&mut self.learning_rates, learning_rate, self.history_size);
        push_bounded(&mut self.terminal_counts, terminals, self.history_size);
        self.learning_steps += 1;
        if !cost.is_finite() {
            self.non_finite_costs += 1;
        }
    }

    /// Mean of the most recent `window` costs
    pub fn avg_cost(&self, window: usize) -> Option<f32> {
        let n = window.min(self.costs.len());
        if n == 0 {
            return None;
        }
        let sum: f32 = self.costs.iter().rev().take(n).sum();
        Some(sum / n as f32)
    }

    /// Save metrics to file
    pub fn save(&self, path: &Path) -> crate::error::Result<()> {
        let serialized = serde_json::to_string_pretty(self)?;
        std::fs::write(path, serialized)?;
        Ok(())
    }

    /// Load metrics from file
    pub fn load(path: &Path) -> crate::error::Result<Self> {
        let data = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&data)?)
    }
}

impl Default for TrainingMetrics {
    fn default() -> Self {
        Self::new(1000)
    }
}

fn push_bounded<T>(history: &mut VecDeque<T>, value: T, limit: usize) {
    if limit == 0 {
        return;
    }
    if history.len() >= limit {
        history.pop_front();
    }
    history.push_back(value);
}
