use std::path::{Path, PathBuf};

use log::{debug, info, warn};
use ndarray::{Array1, Array2};
use rand::rngs::StdRng;
use rand::SeedableRng;

use super::traits::Agent;
use crate::config::DqnConfig;
use crate::error::{DqnError, Result};
use crate::metrics::{Statistic, TrainingMetrics};
use crate::network::{argmax, Architecture, NetOption, QNetwork};
use crate::replay_buffer::{ReplayBuffer, State, Successor, Transition};
use crate::schedule::{Decay, Every};
use crate::target::compute_targets;

const BYTES_PER_GB: f64 = 1024.0 * 1024.0 * 1024.0;

/// What one call of [`DqnAgent::experience`] did.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum LearnOutcome {
    /// The transition was stored, but the buffer is below `start_learning`.
    WarmingUp { stored: usize },
    /// A minibatch was sampled and the actor took one gradient step.
    Trained {
        /// Cost before the update
        cost: f32,
        learning_rate: f32,
        /// Terminal successors in the sampled batch
        terminals: usize,
        /// Whether the target network was refreshed from the actor this step
        synced: bool,
    },
}

impl LearnOutcome {
    pub fn cost(&self) -> Option<f32> {
        match self {
            LearnOutcome::WarmingUp { .. } => None,
            LearnOutcome::Trained { cost, .. } => Some(*cost),
        }
    }

    pub fn trained(&self) -> bool {
        matches!(self, LearnOutcome::Trained { .. })
    }
}

/// Deep Q-Network agent with experience replay and a lagged target network.
///
/// The actor network picks actions and is trained. The target network only
/// estimates successor values for the regression targets. It is refreshed from
/// the actor every `target_sync_interval` learning steps, after the targets of
/// that step were computed, so it always trails the actor by at least one update.
pub struct DqnAgent {
    config: DqnConfig,
    actor: QNetwork,
    target: QNetwork,
    memory: ReplayBuffer,
    learning_rate: Decay,
    costs: Statistic,
    metrics: TrainingMetrics,
    save_every: Every,
    rng: StdRng,
    train_steps: usize,
    logged_footprint: bool,
}

impl DqnAgent {
    /// Build an agent for states of `state_shape` and `num_actions` discrete actions.
    pub fn new(config: DqnConfig, state_shape: &[usize], num_actions: usize) -> Result<Self> {
        config.validate()?;
        let architecture =
            Architecture::new(state_shape, num_actions).with_network(config.network.clone());
        let mut rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        let learning_rate = config.learning_rate_schedule();
        let actor = architecture.build(
            config.optimizer,
            config.rms_decay,
            learning_rate.value(0),
            &mut rng,
        )?;
        let mut target = architecture.build(
            config.optimizer,
            config.rms_decay,
            learning_rate.value(0),
            &mut rng,
        )?;
        target.sync_from(&actor)?;
        info!("{}", actor);

        Ok(DqnAgent {
            memory: ReplayBuffer::new(config.replay_capacity)?,
            costs: Statistic::new("Cost", config.print_cost),
            metrics: TrainingMetrics::new(config.metrics_history),
            save_every: Every::new(config.save_model),
            config,
            actor,
            target,
            learning_rate,
            rng,
            train_steps: 0,
            logged_footprint: false,
        })
    }

    pub fn config(&self) -> &DqnConfig {
        &self.config
    }

    pub fn actor(&self) -> &QNetwork {
        &self.actor
    }

    pub fn target(&self) -> &QNetwork {
        &self.target
    }

    pub fn memory(&self) -> &ReplayBuffer {
        &self.memory
    }

    pub fn metrics(&self) -> &TrainingMetrics {
        &self.metrics
    }

    /// Learning steps performed so far.
    pub fn train_steps(&self) -> usize {
        self.train_steps
    }

    pub fn num_actions(&self) -> usize {
        self.actor.num_actions()
    }

    /// One-hot greedy action for a single state.
    pub fn step(&self, state: &State) -> Result<Array1<f32>> {
        let states = self.single_row(state)?;
        let choice = self.actor.choice(states.view())?;
        Ok(choice.row(0).to_owned())
    }

    /// Index of the greedy action for a single state. Ties go to the lowest index.
    pub fn greedy_action(&self, state: &State) -> Result<usize> {
        let states = self.single_row(state)?;
        let values = self.actor.values(states.view())?;
        Ok(argmax(values.row(0)))
    }

    /// Store `transition` and, once the memory holds `start_learning`
    /// transitions, perform one learning step.
    pub fn experience(&mut self, timestep: u64, transition: Transition) -> Result<LearnOutcome> {
        self.check_transition(&transition)?;
        self.memory.append(transition);
        if !self.logged_footprint {
            self.log_footprint();
            self.logged_footprint = true;
        }
        if self.memory.len() < self.config.start_learning {
            return Ok(LearnOutcome::WarmingUp {
                stored: self.memory.len(),
            });
        }

        let batch = self.memory.sample(self.config.batch_size, &mut self.rng)?;
        let targets = compute_targets(&self.target, &batch, self.config.discount)?;

        let synced = self.train_steps % self.config.target_sync_interval == 0;
        if synced {
            self.target.sync_from(&self.actor)?;
            debug!("Synced target network at learning step {}", self.train_steps);
        }

        let learning_rate = self.learning_rate.value(timestep);
        self.actor.set_option(NetOption::LearningRate, learning_rate)?;
        let cost = self
            .actor
            .train(batch.states.view(), &batch.actions, targets.view())?;
        self.train_steps += 1;

        if !cost.is_finite() {
            warn!(
                "Non-finite cost {} at timestep {} (learning step {})",
                cost, timestep, self.train_steps
            );
        }
        let terminals = batch.terminal_count();
        self.costs.record(cost);
        self.metrics.record_step(cost, learning_rate, terminals);

        Ok(LearnOutcome::Trained {
            cost,
            learning_rate,
            terminals,
            synced,
        })
    }

    /// Save the actor as `directory/model.bin` once per `save_model` timesteps.
    ///
    /// Returns the written path, or `None` when nothing was due or no
    /// directory was given.
    pub fn checkpoint(&mut self, timestep: u64, directory: Option<&Path>) -> Result<Option<PathBuf>> {
        let directory = match directory {
            Some(directory) => directory,
            None => return Ok(None),
        };
        if !self.save_every.due(timestep) {
            return Ok(None);
        }
        self.actor.save(directory, "model").map(Some)
    }

    /// Load actor parameters from a checkpoint and copy them into the target.
    pub fn load_model(&mut self, path: &Path) -> Result<()> {
        self.actor.load_parameters(path)?;
        self.target.sync_from(&self.actor)
    }

    fn single_row(&self, state: &State) -> Result<Array2<f32>> {
        self.check_state(state)?;
        let size = self.actor.state_size();
        Ok(Array2::from_shape_vec((1, size), state.iter().copied().collect())?)
    }

    fn check_state(&self, state: &State) -> Result<()> {
        let expected = &self.actor.architecture().state_shape;
        if state.shape() != expected.as_slice() {
            return Err(DqnError::dimension_mismatch(
                format!("state of shape {:?}", expected),
                format!("{:?}", state.shape()),
            ));
        }
        Ok(())
    }

    fn check_transition(&self, transition: &Transition) -> Result<()> {
        self.check_state(&transition.state)?;
        if transition.action >= self.num_actions() {
            return Err(DqnError::InvalidAction {
                action: transition.action,
                max_actions: self.num_actions(),
            });
        }
        if let Successor::Active(next) = &transition.successor {
            self.check_state(next)?;
        }
        Ok(())
    }

    fn log_footprint(&self) {
        info!(
            "Replay memory uses {:.3} GB, {:.3} GB once all {} slots are filled",
            gigabytes(self.memory.nbytes()),
            gigabytes(self.memory.projected_nbytes()),
            self.memory.capacity()
        );
    }
}

impl Agent for DqnAgent {
    fn act(&mut self, state: &State) -> Result<usize> {
        self.greedy_action(state)
    }

    fn experience(&mut self, timestep: u64, transition: Transition) -> Result<LearnOutcome> {
        DqnAgent::experience(self, timestep, transition)
    }
}

pub(crate) fn gigabytes(bytes: usize) -> f64 {
    bytes as f64 / BYTES_PER_GB
}

/// One-hot encoding of `action` among `num_actions`.
pub fn one_hot(action: usize, num_actions: usize) -> Result<Array1<f32>> {
    if action >= num_actions {
        return Err(DqnError::InvalidAction {
            action,
            max_actions: num_actions,
        });
    }
    let mut encoded = Array1::zeros(num_actions);
    encoded[action] = 1.0;
    Ok(encoded)
}
