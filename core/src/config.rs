use crate::{
    error::ConfigError,
    model::{Domain, Level},
    types::SimTime,
};
use serde::{Deserialize, Serialize};

const WEIGHT_TOLERANCE: f64 = 1e-6;

/// One volunteer on the roster. `skill` is the 1..=3 rank of [`Level`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RosterEntry {
    pub name:   String,
    pub skill:  u8,
    pub domain: Domain,
}

impl RosterEntry {
    pub fn new(name: impl Into<String>, skill: u8, domain: Domain) -> Self {
        Self { name: name.into(), skill, domain }
    }
}

/// Truncated-normal duration parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DurationParams {
    pub mean:    SimTime,
    pub std_dev: SimTime,
    /// Draws below this are clamped up to it.
    pub floor:   SimTime,
}

impl DurationParams {
    /// A duration with no variance.
    pub fn fixed(value: SimTime, floor: SimTime) -> Self {
        Self { mean: value, std_dev: 0.0, floor }
    }

    fn validate(&self, field: &'static str) -> Result<(), ConfigError> {
        let ok = [self.mean, self.std_dev, self.floor]
            .iter()
            .all(|v| v.is_finite() && *v >= 0.0);
        if ok { Ok(()) } else { Err(ConfigError::Duration { field }) }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchPolicy {
    /// Only optimal matches; a child abandons after `abandon_after`.
    Strict,
    /// Fall back to suboptimal or cross-domain volunteers.
    Fallback,
}

/// How a searching child learns that a volunteer may be free.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum SearchMode {
    /// Re-run the matching engine every `interval` time units.
    Poll { interval: SimTime },
    /// Sleep until a volunteer is released, then retry immediately.
    OnRelease,
}

impl Default for SearchMode {
    fn default() -> Self {
        SearchMode::Poll { interval: 0.25 }
    }
}

/// A pre-planned arrival, replayed instead of the Poisson process.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScriptedArrival {
    pub at:       SimTime,
    pub severity: Level,
    pub domain:   Domain,
}

/// Every control variable of one scenario. Immutable for the run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioConfig {
    pub name: String,
    pub horizon: SimTime,
    #[serde(default = "default_seed")]
    pub seed: u64,

    // ── Demand ─────────────────────────────────────
    pub arrival_rate: f64,
    /// Low, Moderate, High.
    #[serde(default = "default_severity_weights")]
    pub severity_weights: Vec<f64>,
    /// Numeracy, Literacy, GraphicSkills.
    #[serde(default = "default_domain_weights")]
    pub domain_weights: Vec<f64>,
    #[serde(default)]
    pub scripted_arrivals: Option<Vec<ScriptedArrival>>,

    // ── Supply ─────────────────────────────────────
    pub roster: Vec<RosterEntry>,
    #[serde(default = "default_evaluator_capacity")]
    pub evaluator_capacity: usize,
    #[serde(default = "default_evaluation")]
    pub evaluation: DurationParams,
    #[serde(default = "default_service")]
    pub service: DurationParams,

    // ── Policy ─────────────────────────────────────
    #[serde(default = "default_policy")]
    pub policy: MatchPolicy,
    #[serde(default = "default_abandon_after")]
    pub abandon_after: SimTime,
    #[serde(default)]
    pub search: SearchMode,
}

fn default_seed() -> u64 { 42 }
fn default_severity_weights() -> Vec<f64> { vec![0.50, 0.35, 0.15] }
fn default_domain_weights() -> Vec<f64> { vec![0.45, 0.35, 0.20] }
fn default_evaluator_capacity() -> usize { 2 }
fn default_evaluation() -> DurationParams { DurationParams { mean: 1.5, std_dev: 0.5, floor: 0.5 } }
fn default_service() -> DurationParams { DurationParams { mean: 6.0, std_dev: 2.0, floor: 2.0 } }
fn default_policy() -> MatchPolicy { MatchPolicy::Fallback }
fn default_abandon_after() -> SimTime { 8.0 }

impl ScenarioConfig {
    /// Load a scenario from a JSON file.
    /// In tests, use ScenarioConfig::default_test() or a preset.
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Cannot read {path}: {e}"))?;
        let config: ScenarioConfig = serde_json::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Cannot parse {path}: {e}"))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject anything that cannot be simulated.
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_weights("severity_weights", &self.severity_weights)?;
        check_weights("domain_weights", &self.domain_weights)?;

        if !(self.arrival_rate.is_finite() && self.arrival_rate > 0.0) {
            return Err(ConfigError::ArrivalRate(self.arrival_rate));
        }
        if self.evaluator_capacity == 0 {
            return Err(ConfigError::ZeroEvaluatorCapacity);
        }
        if self.roster.is_empty() {
            return Err(ConfigError::EmptyRoster);
        }
        if let Some(entry) = self.roster.iter().find(|e| Level::from_rank(e.skill).is_none()) {
            return Err(ConfigError::SkillOutOfRange {
                name:  entry.name.clone(),
                skill: entry.skill,
            });
        }
        if !(self.horizon.is_finite() && self.horizon > 0.0) {
            return Err(ConfigError::Horizon(self.horizon));
        }
        self.evaluation.validate("evaluation")?;
        self.service.validate("service")?;

        if let SearchMode::Poll { interval } = self.search {
            if !(interval.is_finite() && interval > 0.0) {
                return Err(ConfigError::PollInterval(interval));
            }
        }
        if self.policy == MatchPolicy::Strict
            && !(self.abandon_after.is_finite() && self.abandon_after > 0.0)
        {
            return Err(ConfigError::AbandonTimeout(self.abandon_after));
        }
        if let Some(script) = &self.scripted_arrivals {
            for (index, arrival) in script.iter().enumerate() {
                if !(arrival.at.is_finite() && arrival.at >= 0.0) {
                    return Err(ConfigError::ScriptedArrival { index, at: arrival.at });
                }
            }
        }
        Ok(())
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_horizon(mut self, horizon: SimTime) -> Self {
        self.horizon = horizon;
        self
    }

    pub fn with_search(mut self, search: SearchMode) -> Self {
        self.search = search;
        self
    }

    // ── Presets ────────────────────────────────────────────────

    /// Normal operation: ~3 children a week, 8 volunteers, 2 evaluators.
    pub fn base() -> Self {
        Self {
            name:               "Base".into(),
            horizon:            52.0,
            seed:               default_seed(),
            arrival_rate:       3.0,
            severity_weights:   default_severity_weights(),
            domain_weights:     default_domain_weights(),
            scripted_arrivals:  None,
            roster:             base_roster(),
            evaluator_capacity: 2,
            evaluation:         default_evaluation(),
            service:            default_service(),
            policy:             MatchPolicy::Fallback,
            abandon_after:      default_abandon_after(),
            search:             SearchMode::default(),
        }
    }

    /// Resource deficit: mostly severe cases, few low-skill volunteers,
    /// a single evaluator.
    pub fn deficit() -> Self {
        Self {
            name:               "A - Deficit".into(),
            arrival_rate:       5.0,
            severity_weights:   vec![0.15, 0.30, 0.55],
            roster: vec![
                RosterEntry::new("Vol-01", 1, Domain::Numeracy),
                RosterEntry::new("Vol-02", 1, Domain::Literacy),
                RosterEntry::new("Vol-03", 2, Domain::GraphicSkills),
                RosterEntry::new("Vol-04", 1, Domain::Numeracy),
            ],
            evaluator_capacity: 1,
            ..Self::base()
        }
    }

    /// Enrolment up 200% with the base resources.
    pub fn growth() -> Self {
        Self {
            name:         "B - Growth".into(),
            arrival_rate: 9.0,
            ..Self::base()
        }
    }

    /// Base scenario without generalist fallback: children wait for a
    /// suitable volunteer or leave.
    pub fn base_strict() -> Self {
        Self {
            name:   "Base (Strict)".into(),
            policy: MatchPolicy::Strict,
            ..Self::base()
        }
    }

    /// Look a preset up by its CLI name.
    pub fn preset(name: &str) -> Option<Self> {
        match name {
            "base" => Some(Self::base()),
            "deficit" => Some(Self::deficit()),
            "growth" => Some(Self::growth()),
            "strict" | "base_strict" => Some(Self::base_strict()),
            _ => None,
        }
    }

    /// Small fully deterministic config for use in tests.
    pub fn default_test() -> Self {
        Self {
            name:               "test".into(),
            horizon:            20.0,
            seed:               default_seed(),
            arrival_rate:       1.0,
            severity_weights:   default_severity_weights(),
            domain_weights:     default_domain_weights(),
            scripted_arrivals:  Some(Vec::new()),
            roster:             vec![RosterEntry::new("Vol-01", 3, Domain::Numeracy)],
            evaluator_capacity: 1,
            evaluation:         DurationParams::fixed(1.0, 0.5),
            service:            DurationParams::fixed(4.0, 2.0),
            policy:             MatchPolicy::Fallback,
            abandon_after:      default_abandon_after(),
            search:             SearchMode::default(),
        }
    }
}

/// Roster shared by the base, growth and strict presets.
pub fn base_roster() -> Vec<RosterEntry> {
    vec![
        RosterEntry::new("Vol-01", 3, Domain::Numeracy),
        RosterEntry::new("Vol-02", 2, Domain::Numeracy),
        RosterEntry::new("Vol-03", 3, Domain::Literacy),
        RosterEntry::new("Vol-04", 2, Domain::Literacy),
        RosterEntry::new("Vol-05", 1, Domain::Literacy),
        RosterEntry::new("Vol-06", 2, Domain::GraphicSkills),
        RosterEntry::new("Vol-07", 1, Domain::GraphicSkills),
        RosterEntry::new("Vol-08", 1, Domain::Numeracy),
    ]
}

/// `n` volunteers whose skill cycles 1, 2, 3 and whose domain cycles
/// through every domain.
pub fn rotating_roster(n: usize) -> Vec<RosterEntry> {
    (0..n)
        .map(|i| {
            RosterEntry::new(
                format!("Vol-{:02}", i + 1),
                (i % 3) as u8 + 1,
                Domain::ALL[i % Domain::ALL.len()],
            )
        })
        .collect()
}

fn check_weights(field: &'static str, weights: &[f64]) -> Result<(), ConfigError> {
    if weights.len() != 3 {
        return Err(ConfigError::WeightCount { field, len: weights.len() });
    }
    if let Some(&value) = weights.iter().find(|w| !w.is_finite() || **w < 0.0) {
        return Err(ConfigError::InvalidWeight { field, value });
    }
    let sum: f64 = weights.iter().sum();
    if (sum - 1.0).abs() > WEIGHT_TOLERANCE {
        return Err(ConfigError::WeightSum { field, sum });
    }
    Ok(())
}
