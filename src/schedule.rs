//! Time-indexed hyper-parameter schedules.
//!
//! [`Decay`] linearly interpolates a scalar (learning rate, exploration rate)
//! between two values over a fixed number of timesteps. It holds no mutable
//! state: the caller passes the current timestep on every query.
//!
//! [`Every`] answers "has a new window of `interval` timesteps started since I
//! last fired?", which is how checkpointing is paced.

use serde::{Deserialize, Serialize};

/// Linear decay from `start_value` to `end_value` over `duration` timesteps.
///
/// ```
/// use vizdqn::schedule::Decay;
///
/// let lr = Decay::new(1e-3, 0.0, 1000);
/// assert_eq!(lr.value(0), 1e-3);
/// assert!((lr.value(500) - 5e-4).abs() < 1e-9);
/// assert_eq!(lr.value(5000), 0.0);
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Decay {
    pub start_value: f32,
    pub end_value: f32,
    pub duration: u64,
}

impl Decay {
    pub fn new(start_value: f32, end_value: f32, duration: u64) -> Self {
        Decay {
            start_value,
            end_value,
            duration,
        }
    }

    /// A schedule that always yields `value`.
    pub fn constant(value: f32) -> Self {
        Self::new(value, value, 0)
    }

    /// Get the scheduled value at `timestep`.
    ///
    /// A zero `duration` counts as fully decayed.
    pub fn value(&self, timestep: u64) -> f32 {
        if timestep >= self.duration {
            return self.end_value;
        }
        let progress = (timestep as f64 / self.duration as f64) as f32;
        self.start_value + (self.end_value - self.start_value) * progress
    }
}

/// Fires once per window of `interval` timesteps.
///
/// The first query always fires. After that, a query fires only when its
/// timestep falls into a later window than the one that fired last, so skipped
/// timesteps (frame skip, several steps between queries) never cause a missed
/// or doubled trigger.
#[derive(Clone, Debug)]
pub struct Every {
    interval: u64,
    last_window: Option<u64>,
}

impl Every {
    pub fn new(interval: u64) -> Self {
        Every {
            interval,
            last_window: None,
        }
    }

    pub fn interval(&self) -> u64 {
        self.interval
    }

    /// `interval == 0` never fires.
    pub fn due(&mut self, timestep: u64) -> bool {
        if self.interval == 0 {
            return false;
        }
        let window = timestep / self.interval;
        match self.last_window {
            Some(last) if window <= last => false,
            _ => {
                self.last_window = Some(window);
                true
            }
        }
    }
}
