//! The trace stream — one entry per notable transition.
//!
//! RULE: The trace is for display and archiving only. Nothing in the
//! engine reads it back, and every fact in it is also carried by the
//! KPI record.

use crate::{
    matching::MatchQuality,
    model::{Domain, Level},
    types::{EntityId, SimTime},
};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Variants are appended, never removed or reordered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SimEvent {
    // ── Engine events ──────────────────────────────
    RunInitialized {
        scenario: String,
        seed:     u64,
        horizon:  SimTime,
    },
    RunCompleted {
        arrived:   u64,
        served:    u64,
        abandoned: u64,
        in_flight: u64,
    },

    // ── Lifecycle events ───────────────────────────
    ChildArrived {
        child:    EntityId,
        severity: Level,
        domain:   Domain,
    },
    EvaluatorWaited {
        child:  EntityId,
        waited: SimTime,
    },
    EvaluationCompleted {
        child:    EntityId,
        duration: SimTime,
    },
    VolunteerAssigned {
        child:     EntityId,
        volunteer: String,
        skill:     Level,
        domain:    Domain,
        quality:   MatchQuality,
        waited:    SimTime,
    },
    ServiceCompleted {
        child:     EntityId,
        volunteer: String,
        duration:  SimTime,
    },
    ChildAbandoned {
        child:  EntityId,
        waited: SimTime,
    },
}

impl SimEvent {
    /// Stable name used as the event_type column in the results store.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::RunInitialized { .. }      => "run_initialized",
            Self::RunCompleted { .. }        => "run_completed",
            Self::ChildArrived { .. }        => "child_arrived",
            Self::EvaluatorWaited { .. }     => "evaluator_waited",
            Self::EvaluationCompleted { .. } => "evaluation_completed",
            Self::VolunteerAssigned { .. }   => "volunteer_assigned",
            Self::ServiceCompleted { .. }    => "service_completed",
            Self::ChildAbandoned { .. }      => "child_abandoned",
        }
    }
}

impl fmt::Display for SimEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RunInitialized { scenario, seed, horizon } => {
                write!(f, "run '{scenario}' started (seed {seed}, horizon {horizon})")
            }
            Self::RunCompleted { arrived, served, abandoned, in_flight } => write!(
                f,
                "run finished: {arrived} arrived, {served} served, \
                 {abandoned} abandoned, {in_flight} in flight"
            ),
            Self::ChildArrived { child, severity, domain } => {
                write!(f, ">> Child-{child:03} arrives | severity {severity} | domain {domain}")
            }
            Self::EvaluatorWaited { child, waited } => {
                write!(f, "   Child-{child:03} waited {waited:.1} for an evaluator")
            }
            Self::EvaluationCompleted { child, duration } => {
                write!(f, "   Child-{child:03} evaluated (took {duration:.1})")
            }
            Self::VolunteerAssigned { child, volunteer, skill, domain, quality, waited } => {
                write!(
                    f,
                    "{} Child-{child:03} -> {volunteer} (skill {skill}, {domain}) [{}]",
                    quality.tag(),
                    quality.label()
                )?;
                if *waited > 0.01 {
                    write!(f, " after waiting {waited:.1}")?;
                }
                Ok(())
            }
            Self::ServiceCompleted { child, volunteer, duration } => write!(
                f,
                "<< Child-{child:03} finished service ({duration:.1}); {volunteer} is free"
            ),
            Self::ChildAbandoned { child, waited } => {
                write!(f, "-- Child-{child:03} left without a volunteer after {waited:.1}")
            }
        }
    }
}

/// A trace event stamped with the virtual time it happened at.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceEntry {
    pub time:  SimTime,
    pub event: SimEvent,
}

impl fmt::Display for TraceEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{:6.1}] {}", self.time, self.event)
    }
}
