//! Simulation clock — owns virtual time and the run horizon.
//!
//! Time only moves forward, and only when the scheduler pops a wakeup.
//! There is no relation to wall-clock time.

use crate::{
    error::{SimError, SimResult},
    types::SimTime,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SimClock {
    pub now:     SimTime,
    pub horizon: SimTime,
}

impl SimClock {
    pub fn new(horizon: SimTime) -> Self {
        Self { now: 0.0, horizon }
    }

    /// Move the clock to `at`. Errors if `at` lies in the past.
    pub fn advance_to(&mut self, at: SimTime) -> SimResult<SimTime> {
        if at < self.now {
            return Err(SimError::ClockRegression { now: self.now, at });
        }
        self.now = at;
        Ok(self.now)
    }

    /// True once nothing more may happen: `at` lies beyond the horizon.
    pub fn is_past_horizon(&self, at: SimTime) -> bool {
        at > self.horizon
    }

    /// Portion of `duration` starting now that falls inside the horizon.
    pub fn clip_to_horizon(&self, duration: SimTime) -> SimTime {
        duration.min((self.horizon - self.now).max(0.0))
    }
}
