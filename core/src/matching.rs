//! Matching engine — picks a free volunteer for a child.
//!
//! Evaluated in strict order, first hit wins:
//!   1. Same domain, skill >= severity      -> lowest skill     (Optimal)
//!   2. Strict policy stops here            -> no match
//!   3. Same domain, skill <  severity      -> highest skill    (Suboptimal)
//!   4. Any domain,  skill >= severity      -> lowest skill     (Generalist)
//!   5. Any free volunteer                  -> first in roster  (Generalist)
//!
//! Ties always go to the earliest volunteer in roster order.

use crate::{
    config::MatchPolicy,
    model::{Child, Volunteer},
    resources::VolunteerPool,
};
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchQuality {
    /// Same domain, enough skill.
    Optimal,
    /// Same domain, not enough skill.
    Suboptimal,
    /// Different domain.
    Generalist,
}

impl MatchQuality {
    pub fn label(self) -> &'static str {
        match self {
            Self::Optimal => "OPTIMAL",
            Self::Suboptimal => "SUBOPTIMAL",
            Self::Generalist => "GENERALIST",
        }
    }

    pub fn tag(self) -> &'static str {
        match self {
            Self::Optimal => "[OK]",
            Self::Suboptimal => "[!!]",
            Self::Generalist => "[XX]",
        }
    }
}

impl fmt::Display for MatchQuality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.tag(), self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Assignment {
    pub volunteer: usize,
    pub quality:   MatchQuality,
}

pub fn classify(child: &Child, volunteer: &Volunteer) -> MatchQuality {
    if volunteer.domain != child.domain {
        MatchQuality::Generalist
    } else if volunteer.covers(child) {
        MatchQuality::Optimal
    } else {
        MatchQuality::Suboptimal
    }
}

/// Choose a free volunteer for `child` without mutating the pool.
pub fn select<'a>(
    child: &Child,
    free: impl Iterator<Item = &'a Volunteer> + Clone,
    policy: MatchPolicy,
) -> Option<&'a Volunteer> {
    let same_domain = free.clone().filter(|v| v.domain == child.domain);

    let optimal = same_domain.clone().filter(|v| v.covers(child)).min_by_key(|v| v.skill);
    if optimal.is_some() || policy == MatchPolicy::Strict {
        return optimal;
    }

    let under_skilled = same_domain
        .filter(|v| !v.covers(child))
        .min_by_key(|v| Reverse(v.skill));
    if under_skilled.is_some() {
        return under_skilled;
    }

    let cross_domain = free.clone().filter(|v| v.covers(child)).min_by_key(|v| v.skill);
    if cross_domain.is_some() {
        return cross_domain;
    }

    free.into_iter().next()
}

/// Run the matching engine and, on success, mark the chosen volunteer
/// busy in the same step.
pub fn assign(child: &Child, pool: &mut VolunteerPool, policy: MatchPolicy) -> Option<Assignment> {
    let chosen = select(child, pool.free(), policy)?;
    let assignment = Assignment {
        volunteer: chosen.index,
        quality:   classify(child, chosen),
    };
    pool.occupy(assignment.volunteer);
    Some(assignment)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::RosterEntry,
        model::{Domain, Level},
    };

    fn child(severity: Level, domain: Domain) -> Child {
        Child { id: 1, severity, domain, arrived_at: 0.0 }
    }

    fn pool(entries: &[(u8, Domain)]) -> VolunteerPool {
        let roster: Vec<_> = entries
            .iter()
            .enumerate()
            .map(|(i, (skill, domain))| RosterEntry::new(format!("V{i}"), *skill, *domain))
            .collect();
        VolunteerPool::from_roster(&roster).unwrap()
    }

    #[test]
    fn optimal_prefers_lowest_sufficient_skill() {
        let mut p = pool(&[(3, Domain::Numeracy), (2, Domain::Numeracy), (1, Domain::Numeracy)]);
        let a = assign(&child(Level::Moderate, Domain::Numeracy), &mut p, MatchPolicy::Fallback)
            .unwrap();
        assert_eq!(a, Assignment { volunteer: 1, quality: MatchQuality::Optimal });
        assert!(p.members()[1].busy);
    }

    #[test]
    fn strict_policy_never_falls_back() {
        let mut p = pool(&[(1, Domain::Numeracy), (3, Domain::Literacy)]);
        let c = child(Level::High, Domain::Numeracy);
        assert!(assign(&c, &mut p, MatchPolicy::Strict).is_none());
        assert_eq!(p.free_count(), 2);
    }

    #[test]
    fn suboptimal_prefers_highest_same_domain_skill() {
        let mut p = pool(&[
            (1, Domain::Literacy),
            (2, Domain::Literacy),
            (2, Domain::Literacy),
            (3, Domain::Numeracy),
        ]);
        let a = assign(&child(Level::High, Domain::Literacy), &mut p, MatchPolicy::Fallback)
            .unwrap();
        // Ties go to the earlier roster entry.
        assert_eq!(a, Assignment { volunteer: 1, quality: MatchQuality::Suboptimal });
    }

    #[test]
    fn cross_domain_requires_enough_skill_first() {
        let mut p = pool(&[(1, Domain::Literacy), (3, Domain::GraphicSkills), (2, Domain::Literacy)]);
        let a = assign(&child(Level::Moderate, Domain::Numeracy), &mut p, MatchPolicy::Fallback)
            .unwrap();
        assert_eq!(a, Assignment { volunteer: 2, quality: MatchQuality::Generalist });
    }

    #[test]
    fn any_free_volunteer_is_last_resort() {
        let mut p = pool(&[(1, Domain::Literacy), (2, Domain::GraphicSkills)]);
        let a = assign(&child(Level::High, Domain::Numeracy), &mut p, MatchPolicy::Fallback)
            .unwrap();
        assert_eq!(a, Assignment { volunteer: 0, quality: MatchQuality::Generalist });
    }

    #[test]
    fn busy_pool_yields_nothing() {
        let mut p = pool(&[(3, Domain::Numeracy)]);
        let c = child(Level::Low, Domain::Numeracy);
        assert!(assign(&c, &mut p, MatchPolicy::Fallback).is_some());
        assert!(assign(&c, &mut p, MatchPolicy::Fallback).is_none());
        p.release(0, 2.5);
        assert_eq!(p.members()[0].busy_time, 2.5);
        assert!(assign(&c, &mut p, MatchPolicy::Fallback).is_some());
    }

    #[test]
    fn classification_follows_domain_then_skill() {
        let p = pool(&[(2, Domain::Numeracy), (1, Domain::Numeracy), (3, Domain::Literacy)]);
        let c = child(Level::Moderate, Domain::Numeracy);
        assert_eq!(classify(&c, &p.members()[0]), MatchQuality::Optimal);
        assert_eq!(classify(&c, &p.members()[1]), MatchQuality::Suboptimal);
        assert_eq!(classify(&c, &p.members()[2]), MatchQuality::Generalist);
    }
}
