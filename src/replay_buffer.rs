//! Experience replay: a bounded FIFO of transitions with uniform sampling.

use std::collections::VecDeque;
use std::mem::size_of;

use ndarray::{Array1, Array2, ArrayD};
use rand::Rng;

use crate::error::{DqnError, Result};

/// A preprocessed observation of fixed shape.
pub type State = ArrayD<f32>;

/// What followed a transition: either the episode ended or a next state exists.
#[derive(Clone, Debug, PartialEq)]
pub enum Successor {
    Terminal,
    Active(State),
}

impl Successor {
    /// Decode an observation that marks episode ends with NaN.
    ///
    /// Any NaN anywhere in the flattened state makes it terminal.
    pub fn from_sentinel(state: State) -> Self {
        if state.iter().any(|v| v.is_nan()) {
            Successor::Terminal
        } else {
            Successor::Active(state)
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Successor::Terminal)
    }

    pub fn state(&self) -> Option<&State> {
        match self {
            Successor::Terminal => None,
            Successor::Active(state) => Some(state),
        }
    }
}

impl From<Option<State>> for Successor {
    fn from(state: Option<State>) -> Self {
        state.map_or(Successor::Terminal, Successor::Active)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Transition {
    pub state: State,
    pub action: usize,
    pub reward: f32,
    pub successor: Successor,
}

impl Transition {
    pub fn new(state: State, action: usize, reward: f32, successor: Successor) -> Self {
        Transition {
            state,
            action,
            reward,
            successor,
        }
    }

    /// Bytes held by this transition's tensors and scalars.
    pub fn nbytes(&self) -> usize {
        let successor = self.successor.state().map_or(0, |s| s.len());
        (self.state.len() + successor) * size_of::<f32>() + size_of::<usize>() + size_of::<f32>()
    }
}

/// A sampled minibatch, stacked row-wise with states flattened.
///
/// Rows of `successors` whose `terminal` flag is set are zero-filled and carry
/// no information.
#[derive(Clone, Debug)]
pub struct Batch {
    pub states: Array2<f32>,
    pub actions: Vec<usize>,
    pub rewards: Array1<f32>,
    pub successors: Array2<f32>,
    pub terminal: Vec<bool>,
}

impl Batch {
    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    pub fn terminal_count(&self) -> usize {
        self.terminal.iter().filter(|&&t| t).count()
    }
}

#[derive(Clone, Debug)]
pub struct ReplayBuffer {
    buffer: VecDeque<Transition>,
    capacity: usize,
    nbytes: usize,
}

impl ReplayBuffer {
    pub fn new(capacity: usize) -> Result<Self> {
        if capacity == 0 {
            return Err(DqnError::invalid_parameter("capacity", "must be greater than 0"));
        }
        Ok(ReplayBuffer {
            buffer: VecDeque::with_capacity(capacity),
            capacity,
            nbytes: 0,
        })
    }

    /// Store a transition, evicting the oldest one when full.
    pub fn append(&mut self, transition: Transition) {
        if self.buffer.len() == self.capacity {
            if let Some(evicted) = self.buffer.pop_front() {
                self.nbytes -= evicted.nbytes();
            }
        }
        self.nbytes += transition.nbytes();
        self.buffer.push_back(transition);
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Stored transitions, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &Transition> {
        self.buffer.iter()
    }

    pub fn get(&self, index: usize) -> Option<&Transition> {
        self.buffer.get(index)
    }

    /// Bytes held by the stored transitions.
    pub fn nbytes(&self) -> usize {
        self.nbytes
    }

    /// Estimated bytes once the buffer is full, assuming transitions like the stored ones.
    pub fn projected_nbytes(&self) -> usize {
        if self.buffer.is_empty() {
            return 0;
        }
        let mean = self.nbytes as f64 / self.buffer.len() as f64;
        (mean * self.capacity as f64).round() as usize
    }

    /// Draw `batch_size` indices uniformly, with replacement.
    pub fn sample_indices<R: Rng + ?Sized>(&self, batch_size: usize, rng: &mut R) -> Result<Vec<usize>> {
        if self.buffer.is_empty() {
            return Err(DqnError::EmptyBuffer("cannot sample before anything was stored".to_string()));
        }
        if batch_size == 0 {
            return Err(DqnError::invalid_parameter("batch_size", "must be greater than 0"));
        }
        let len = self.buffer.len();
        Ok((0..batch_size).map(|_| rng.gen_range(0..len)).collect())
    }

    /// Sample and stack a minibatch.
    pub fn sample<R: Rng + ?Sized>(&self, batch_size: usize, rng: &mut R) -> Result<Batch> {
        let indices = self.sample_indices(batch_size, rng)?;
        let state_size = self.buffer[indices[0]].state.len();

        let mut states = Vec::with_capacity(batch_size * state_size);
        let mut successors = Vec::with_capacity(batch_size * state_size);
        let mut actions = Vec::with_capacity(batch_size);
        let mut rewards = Vec::with_capacity(batch_size);
        let mut terminal = Vec::with_capacity(batch_size);

        for &index in &indices {
            let transition = &self.buffer[index];
            check_size(state_size, transition.state.len())?;
            states.extend(transition.state.iter().copied());
            match &transition.successor {
                Successor::Terminal => {
                    successors.extend(std::iter::repeat(0.0).take(state_size));
                    terminal.push(true);
                }
                Successor::Active(next) => {
                    check_size(state_size, next.len())?;
                    successors.extend(next.iter().copied());
                    terminal.push(false);
                }
            }
            actions.push(transition.action);
            rewards.push(transition.reward);
        }

        Ok(Batch {
            states: Array2::from_shape_vec((batch_size, state_size), states)?,
            actions,
            rewards: Array1::from_vec(rewards),
            successors: Array2::from_shape_vec((batch_size, state_size), successors)?,
            terminal,
        })
    }
}

fn check_size(expected: usize, actual: usize) -> Result<()> {
    if expected != actual {
        return Err(DqnError::dimension_mismatch(
            format!("state of {} values", expected),
            format!("{} values", actual),
        ));
    }
    Ok(())
}
