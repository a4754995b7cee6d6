use super::LearnOutcome;
use crate::error::Result;
use crate::replay_buffer::{State, Transition};

/// What a trainer needs from an agent.
pub trait Agent {
    /// Select an action index for `state`.
    fn act(&mut self, state: &State) -> Result<usize>;

    /// Hand over one completed transition observed at `timestep`.
    fn experience(&mut self, timestep: u64, transition: Transition) -> Result<LearnOutcome>;
}
