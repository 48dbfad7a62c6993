//! Statistics collector — passive accumulator, reduced once at run end.
//!
//! Mutation points (and only these):
//!   - child arrival
//!   - evaluator acquisition
//!   - volunteer assignment, with its quality tag
//!   - service completion
//!   - abandonment
//!
//! Every ratio is zero-safe: an empty denominator yields 0.0.

use crate::{
    matching::MatchQuality,
    model::{Child, Domain, Level, Volunteer},
    resources::{EvaluatorPool, VolunteerPool},
    types::{EntityId, SimTime},
};
use serde::{Deserialize, Serialize};

/// Mean, median and maximum of one waiting-time series.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct WaitSummary {
    pub count:  u64,
    pub mean:   SimTime,
    pub median: SimTime,
    pub max:    SimTime,
}

impl WaitSummary {
    pub fn from_samples(samples: &[SimTime]) -> Self {
        if samples.is_empty() {
            return Self::default();
        }
        let mut sorted = samples.to_vec();
        sorted.sort_by(|a, b| a.total_cmp(b));
        let n = sorted.len();
        let median = if n % 2 == 1 {
            sorted[n / 2]
        } else {
            (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0
        };
        Self {
            count: n as u64,
            mean: sorted.iter().sum::<f64>() / n as f64,
            median,
            max: sorted[n - 1],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeverityWait {
    pub severity: Level,
    pub summary:  WaitSummary,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MatchBreakdown {
    pub total:          u64,
    pub optimal:        u64,
    pub suboptimal:     u64,
    pub generalist:     u64,
    pub optimal_pct:    f64,
    pub suboptimal_pct: f64,
    pub generalist_pct: f64,
    /// Suboptimal plus generalist, as a percentage of all assignments.
    pub mismatch_pct:   f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VolunteerUtilization {
    pub name:        String,
    pub skill:       Level,
    pub domain:      Domain,
    pub busy_time:   SimTime,
    /// busy_time / horizon, in [0, 1].
    pub utilization: f64,
}

/// One volunteer assignment, kept so match quality can be audited.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssignmentRecord {
    pub child:            EntityId,
    pub severity:         Level,
    pub child_domain:     Domain,
    pub volunteer:        String,
    pub skill:            Level,
    pub volunteer_domain: Domain,
    pub quality:          MatchQuality,
    pub assigned_at:      SimTime,
    pub waited:           SimTime,
}

/// Run-level output. Read-only once produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KpiRecord {
    pub scenario: String,
    pub seed:     u64,
    pub horizon:  SimTime,

    // ── Counts ─────────────────────────────────────
    pub arrived:   u64,
    pub served:    u64,
    pub abandoned: u64,
    pub in_flight: u64,

    // ── Waiting times ──────────────────────────────
    /// Time in system minus service time, served children only.
    pub total_wait:       WaitSummary,
    pub evaluator_wait:   WaitSummary,
    /// Search time until assignment or abandonment.
    pub volunteer_wait:   WaitSummary,
    pub abandon_wait:     WaitSummary,
    pub wait_by_severity: Vec<SeverityWait>,

    // ── Match quality ──────────────────────────────
    pub matches:     MatchBreakdown,
    pub assignments: Vec<AssignmentRecord>,

    // ── Utilization ────────────────────────────────
    pub volunteers:            Vec<VolunteerUtilization>,
    /// Total volunteer busy time / (roster size * horizon).
    pub volunteer_utilization: f64,
    pub evaluator_capacity:    usize,
    pub evaluator_busy_time:   SimTime,
    pub evaluator_utilization: f64,
    pub evaluator_max_queue:   usize,
}

impl KpiRecord {
    /// served + abandoned + in_flight == arrived.
    pub fn is_balanced(&self) -> bool {
        self.served + self.abandoned + self.in_flight == self.arrived
    }
}

#[derive(Debug, Default)]
pub struct StatsCollector {
    arrived:           u64,
    served:            u64,
    abandoned:         u64,
    evaluator_waits:   Vec<SimTime>,
    volunteer_waits:   Vec<SimTime>,
    abandon_waits:     Vec<SimTime>,
    total_waits:       Vec<SimTime>,
    severity_waits:    [Vec<SimTime>; 3],
    assignments:       Vec<AssignmentRecord>,
}

impl StatsCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_arrival(&mut self) {
        self.arrived += 1;
    }

    pub fn record_evaluator_wait(&mut self, waited: SimTime) {
        self.evaluator_waits.push(waited);
    }

    pub fn record_assignment(
        &mut self,
        child: &Child,
        volunteer: &Volunteer,
        quality: MatchQuality,
        assigned_at: SimTime,
        waited: SimTime,
    ) {
        self.volunteer_waits.push(waited);
        self.assignments.push(AssignmentRecord {
            child:            child.id,
            severity:         child.severity,
            child_domain:     child.domain,
            volunteer:        volunteer.name.clone(),
            skill:            volunteer.skill,
            volunteer_domain: volunteer.domain,
            quality,
            assigned_at,
            waited,
        });
    }

    /// `total_wait` is time in system minus the service duration.
    pub fn record_service_completed(&mut self, child: &Child, total_wait: SimTime) {
        self.served += 1;
        self.total_waits.push(total_wait);
        self.severity_waits[usize::from(child.severity.rank() - 1)].push(total_wait);
    }

    pub fn record_abandonment(&mut self, waited: SimTime) {
        self.abandoned += 1;
        self.volunteer_waits.push(waited);
        self.abandon_waits.push(waited);
    }

    pub fn arrived(&self) -> u64 { self.arrived }
    pub fn served(&self) -> u64 { self.served }
    pub fn abandoned(&self) -> u64 { self.abandoned }

    /// Reduce everything collected into the KPI record.
    pub fn finalize(
        &self,
        scenario: &str,
        seed: u64,
        horizon: SimTime,
        in_flight: u64,
        volunteers: &VolunteerPool,
        evaluator: &EvaluatorPool,
    ) -> KpiRecord {
        let volunteer_rows: Vec<VolunteerUtilization> = volunteers
            .members()
            .iter()
            .map(|v| VolunteerUtilization {
                name:        v.name.clone(),
                skill:       v.skill,
                domain:      v.domain,
                busy_time:   v.busy_time,
                utilization: ratio(v.busy_time, horizon),
            })
            .collect();
        let total_busy: SimTime = volunteer_rows.iter().map(|r| r.busy_time).sum();

        KpiRecord {
            scenario: scenario.to_string(),
            seed,
            horizon,
            arrived: self.arrived,
            served: self.served,
            abandoned: self.abandoned,
            in_flight,
            total_wait: WaitSummary::from_samples(&self.total_waits),
            evaluator_wait: WaitSummary::from_samples(&self.evaluator_waits),
            volunteer_wait: WaitSummary::from_samples(&self.volunteer_waits),
            abandon_wait: WaitSummary::from_samples(&self.abandon_waits),
            wait_by_severity: Level::ALL
                .iter()
                .zip(self.severity_waits.iter())
                .map(|(severity, waits)| SeverityWait {
                    severity: *severity,
                    summary:  WaitSummary::from_samples(waits),
                })
                .collect(),
            matches: self.match_breakdown(),
            assignments: self.assignments.clone(),
            volunteer_utilization: ratio(total_busy, volunteer_rows.len() as f64 * horizon),
            volunteers: volunteer_rows,
            evaluator_capacity: evaluator.capacity(),
            evaluator_busy_time: evaluator.busy_time(),
            evaluator_utilization: ratio(
                evaluator.busy_time(),
                evaluator.capacity() as f64 * horizon,
            ),
            evaluator_max_queue: evaluator.max_queue(),
        }
    }

    fn match_breakdown(&self) -> MatchBreakdown {
        let count = |q: MatchQuality| {
            self.assignments.iter().filter(|a| a.quality == q).count() as u64
        };
        let optimal = count(MatchQuality::Optimal);
        let suboptimal = count(MatchQuality::Suboptimal);
        let generalist = count(MatchQuality::Generalist);
        let total = self.assignments.len() as u64;
        let pct = |n: u64| 100.0 * ratio(n as f64, total as f64);
        MatchBreakdown {
            total,
            optimal,
            suboptimal,
            generalist,
            optimal_pct: pct(optimal),
            suboptimal_pct: pct(suboptimal),
            generalist_pct: pct(generalist),
            mismatch_pct: pct(suboptimal + generalist),
        }
    }
}

/// Zero-safe division.
pub fn ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator > 0.0 {
        numerator / denominator
    } else {
        0.0
    }
}
