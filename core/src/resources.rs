//! Resource contention model.
//!
//! Two very different pools:
//!   - EvaluatorPool: homogeneous counting resource, strict FIFO, no
//!     individual identity.
//!   - VolunteerPool: heterogeneous capacity-1 members. Acquisition is
//!     done by the matching engine, never by queue position.

use crate::{
    config::RosterEntry,
    error::ConfigError,
    model::{Level, Volunteer},
    types::{EntityId, SimTime},
};
use std::collections::VecDeque;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Acquire {
    Granted,
    /// Queued behind `ahead` earlier requesters.
    Queued { ahead: usize },
}

#[derive(Debug, Clone)]
pub struct EvaluatorPool {
    capacity:  usize,
    holders:   usize,
    waiting:   VecDeque<EntityId>,
    busy_time: SimTime,
    max_queue: usize,
}

impl EvaluatorPool {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            holders: 0,
            waiting: VecDeque::new(),
            busy_time: 0.0,
            max_queue: 0,
        }
    }

    /// Take a slot now, or join the back of the queue.
    pub fn acquire(&mut self, child: EntityId) -> Acquire {
        if self.holders < self.capacity {
            self.holders += 1;
            return Acquire::Granted;
        }
        let ahead = self.waiting.len();
        self.waiting.push_back(child);
        self.max_queue = self.max_queue.max(self.waiting.len());
        Acquire::Queued { ahead }
    }

    /// Give a slot back. If anyone is queued, the slot passes straight
    /// to the head of the queue and that child's id is returned so the
    /// caller can wake it in the same time step.
    pub fn release(&mut self) -> Option<EntityId> {
        debug_assert!(self.holders > 0, "release() on idle evaluator pool");
        match self.waiting.pop_front() {
            Some(next) => Some(next),
            None => {
                self.holders = self.holders.saturating_sub(1);
                None
            }
        }
    }

    /// Add evaluation time to the busy-time accumulator.
    pub fn accrue(&mut self, duration: SimTime) {
        self.busy_time += duration;
    }

    pub fn capacity(&self) -> usize { self.capacity }
    pub fn holders(&self) -> usize { self.holders }
    pub fn queue_len(&self) -> usize { self.waiting.len() }
    pub fn max_queue(&self) -> usize { self.max_queue }
    pub fn busy_time(&self) -> SimTime { self.busy_time }
}

#[derive(Debug, Clone)]
pub struct VolunteerPool {
    members: Vec<Volunteer>,
}

impl VolunteerPool {
    pub fn from_roster(roster: &[RosterEntry]) -> Result<Self, ConfigError> {
        let members = roster
            .iter()
            .enumerate()
            .map(|(index, entry)| {
                let skill = Level::from_rank(entry.skill).ok_or_else(|| {
                    ConfigError::SkillOutOfRange { name: entry.name.clone(), skill: entry.skill }
                })?;
                Ok(Volunteer {
                    index,
                    name: entry.name.clone(),
                    skill,
                    domain: entry.domain,
                    busy: false,
                    busy_time: 0.0,
                })
            })
            .collect::<Result<Vec<_>, ConfigError>>()?;
        Ok(Self { members })
    }

    pub fn members(&self) -> &[Volunteer] {
        &self.members
    }

    pub fn get(&self, index: usize) -> Option<&Volunteer> {
        self.members.get(index)
    }

    /// Free members, in roster order.
    pub fn free(&self) -> impl Iterator<Item = &Volunteer> + Clone {
        self.members.iter().filter(|v| !v.busy)
    }

    pub fn free_count(&self) -> usize {
        self.free().count()
    }

    /// Mark a member busy. Only the matching engine calls this.
    pub(crate) fn occupy(&mut self, index: usize) {
        if let Some(v) = self.members.get_mut(index) {
            debug_assert!(!v.busy, "volunteer {} assigned twice", v.name);
            v.busy = true;
        }
    }

    /// Free a member after service and credit the service duration.
    pub fn release(&mut self, index: usize, service: SimTime) {
        if let Some(v) = self.members.get_mut(index) {
            debug_assert!(v.busy, "volunteer {} released while free", v.name);
            v.busy = false;
            v.busy_time += service;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn release_hands_slot_to_queue_head() {
        let mut pool = EvaluatorPool::new(1);
        assert_eq!(pool.acquire(1), Acquire::Granted);
        assert_eq!(pool.acquire(2), Acquire::Queued { ahead: 0 });
        assert_eq!(pool.acquire(3), Acquire::Queued { ahead: 1 });

        assert_eq!(pool.release(), Some(2));
        assert_eq!(pool.holders(), 1);
        assert_eq!(pool.release(), Some(3));
        assert_eq!(pool.release(), None);
        assert_eq!(pool.holders(), 0);
        assert_eq!(pool.max_queue(), 2);
    }

    #[test]
    fn roster_skill_out_of_range_is_rejected() {
        let roster = [RosterEntry::new("Vol-09", 4, crate::model::Domain::Literacy)];
        assert!(matches!(
            VolunteerPool::from_roster(&roster),
            Err(ConfigError::SkillOutOfRange { skill: 4, .. })
        ));
    }
}
