//! Traffic-light diagnosis of a finished run, and the side-by-side
//! comparison of several runs.
//!
//! Read-only consumers of [`KpiRecord`]. Nothing here feeds back into
//! the engine.
//!
//! Bands (percentages, strict inequalities):
//!   volunteer utilization    > 85 red, > 60 yellow
//!   evaluator utilization    > 85 red, > 60 yellow
//!   mismatch rate            > 40 red, > 20 yellow
//!   mean total wait          > 4 red,  > 2 yellow   (time units)
//!   abandonments             > 0 yellow

use crate::stats::KpiRecord;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Write as _};

const UTILIZATION_RED: f64 = 85.0;
const UTILIZATION_YELLOW: f64 = 60.0;
const MISMATCH_RED: f64 = 40.0;
const MISMATCH_YELLOW: f64 = 20.0;
const WAIT_RED: f64 = 4.0;
const WAIT_YELLOW: f64 = 2.0;

/// Base-scenario acceptance: mean wait and mismatch rate below these.
const ACCEPTABLE_WAIT: f64 = 3.0;
const ACCEPTABLE_MISMATCH: f64 = 30.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertLevel {
    Green,
    Yellow,
    Red,
}

impl AlertLevel {
    pub fn tag(self) -> &'static str {
        match self {
            Self::Green => "[GREEN]",
            Self::Yellow => "[YELLOW]",
            Self::Red => "[RED]",
        }
    }

    fn banded(value: f64, red: f64, yellow: f64) -> Self {
        if value > red {
            Self::Red
        } else if value > yellow {
            Self::Yellow
        } else {
            Self::Green
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Indicator {
    VolunteerUtilization,
    EvaluatorUtilization,
    MismatchRate,
    MeanWait,
    Abandonment,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub indicator: Indicator,
    pub level:     AlertLevel,
    pub value:     f64,
    pub message:   String,
}

impl fmt::Display for Alert {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.level.tag(), self.message)
    }
}

/// One alert per indicator, in a fixed order. The abandonment alert is
/// present only when someone left.
pub fn diagnose(kpis: &KpiRecord) -> Vec<Alert> {
    let mut alerts = Vec::with_capacity(5);

    let volunteers = kpis.volunteer_utilization * 100.0;
    let level = AlertLevel::banded(volunteers, UTILIZATION_RED, UTILIZATION_YELLOW);
    alerts.push(Alert {
        indicator: Indicator::VolunteerUtilization,
        level,
        value: volunteers,
        message: match level {
            AlertLevel::Red => format!("Volunteers overloaded ({volunteers:.0}%). Recruit more volunteers."),
            AlertLevel::Yellow => format!("Volunteer load moderate ({volunteers:.0}%). Little slack."),
            AlertLevel::Green => format!("Volunteer capacity sufficient ({volunteers:.0}%)."),
        },
    });

    let evaluators = kpis.evaluator_utilization * 100.0;
    let level = AlertLevel::banded(evaluators, UTILIZATION_RED, UTILIZATION_YELLOW);
    alerts.push(Alert {
        indicator: Indicator::EvaluatorUtilization,
        level,
        value: evaluators,
        message: match level {
            AlertLevel::Red => format!("Evaluators saturated ({evaluators:.0}%). Add evaluators."),
            AlertLevel::Yellow => format!("Evaluator load moderate ({evaluators:.0}%)."),
            AlertLevel::Green => format!("Evaluator capacity sufficient ({evaluators:.0}%)."),
        },
    });

    let mismatch = kpis.matches.mismatch_pct;
    let level = AlertLevel::banded(mismatch, MISMATCH_RED, MISMATCH_YELLOW);
    alerts.push(Alert {
        indicator: Indicator::MismatchRate,
        level,
        value: mismatch,
        message: match level {
            AlertLevel::Red => format!("Mismatch rate high ({mismatch:.0}%). Specialised volunteers needed."),
            AlertLevel::Yellow => format!("Mismatch rate moderate ({mismatch:.0}%). Review the skill mix."),
            AlertLevel::Green => format!("Mismatch rate acceptable ({mismatch:.0}%)."),
        },
    });

    let wait = kpis.total_wait.mean;
    let level = AlertLevel::banded(wait, WAIT_RED, WAIT_YELLOW);
    alerts.push(Alert {
        indicator: Indicator::MeanWait,
        level,
        value: wait,
        message: match level {
            AlertLevel::Red => format!("Mean wait very high ({wait:.1}). Demand is not covered."),
            AlertLevel::Yellow => format!("Mean wait moderate ({wait:.1})."),
            AlertLevel::Green => format!("Mean wait acceptable ({wait:.1})."),
        },
    });

    if kpis.abandoned > 0 {
        alerts.push(Alert {
            indicator: Indicator::Abandonment,
            level:     AlertLevel::Yellow,
            value:     kpis.abandoned as f64,
            message:   format!("{} children left without a volunteer.", kpis.abandoned),
        });
    }
    alerts
}

/// The most severe level among `alerts`, green when empty.
pub fn worst(alerts: &[Alert]) -> AlertLevel {
    alerts.iter().map(|a| a.level).max().unwrap_or(AlertLevel::Green)
}

/// Whether a baseline run is good enough to deploy the matching rules:
/// mean wait under 3 and mismatch rate under 30%.
pub fn baseline_acceptable(base: &KpiRecord) -> bool {
    base.total_wait.mean < ACCEPTABLE_WAIT && base.matches.mismatch_pct < ACCEPTABLE_MISMATCH
}

/// Whether waits stay within twice the baseline under extra demand.
pub fn scales_with_demand(base: &KpiRecord, grown: &KpiRecord) -> bool {
    grown.total_wait.mean <= base.total_wait.mean * 2.0
}

/// Fixed-width table with one column per run.
pub fn comparison_table(runs: &[KpiRecord]) -> String {
    let rows: [(&str, fn(&KpiRecord) -> String); 8] = [
        ("Arrived", |k| k.arrived.to_string()),
        ("Served", |k| k.served.to_string()),
        ("Abandoned", |k| k.abandoned.to_string()),
        ("Mean wait", |k| format!("{:.2}", k.total_wait.mean)),
        ("Max wait", |k| format!("{:.2}", k.total_wait.max)),
        ("Mismatch (%)", |k| format!("{:.1}", k.matches.mismatch_pct)),
        ("Volunteer util. (%)", |k| format!("{:.1}", k.volunteer_utilization * 100.0)),
        ("Evaluator util. (%)", |k| format!("{:.1}", k.evaluator_utilization * 100.0)),
    ];

    let mut out = String::new();
    let _ = write!(out, "{:<22}", "Metric");
    for run in runs {
        let name: String = run.scenario.chars().take(18).collect();
        let _ = write!(out, " | {name:>18}");
    }
    out.push('\n');
    out.push_str(&"-".repeat(22 + 21 * runs.len()));
    out.push('\n');

    for (label, cell) in rows {
        let _ = write!(out, "{label:<22}");
        for run in runs {
            let _ = write!(out, " | {:>18}", cell(run));
        }
        out.push('\n');
    }
    out
}
