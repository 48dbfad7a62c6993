use thiserror::Error;

/// A scenario configuration that cannot be simulated.
/// Always raised before any simulated time elapses.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("{field}: expected 3 weights, got {len}")]
    WeightCount { field: &'static str, len: usize },

    #[error("{field}: weight {value} is negative or not finite")]
    InvalidWeight { field: &'static str, value: f64 },

    #[error("{field}: weights sum to {sum}, expected 1")]
    WeightSum { field: &'static str, sum: f64 },

    #[error("arrival rate must be positive and finite, got {0}")]
    ArrivalRate(f64),

    #[error("evaluator capacity must be at least 1")]
    ZeroEvaluatorCapacity,

    #[error("volunteer roster is empty")]
    EmptyRoster,

    #[error("volunteer '{name}' has skill {skill}, expected 1..=3")]
    SkillOutOfRange { name: String, skill: u8 },

    #[error("horizon must be positive and finite, got {0}")]
    Horizon(f64),

    #[error("{field}: mean, std_dev and floor must be finite and non-negative")]
    Duration { field: &'static str },

    #[error("poll interval must be positive, got {0}")]
    PollInterval(f64),

    #[error("abandonment timeout must be positive under the strict policy, got {0}")]
    AbandonTimeout(f64),

    #[error("scripted arrival #{index} has invalid time {at}")]
    ScriptedArrival { index: usize, at: f64 },
}

#[derive(Error, Debug)]
pub enum SimError {
    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Clock regression: now {now}, event due at {at}")]
    ClockRegression { now: f64, at: f64 },

    #[error("Run not found: {run_id}")]
    RunNotFound { run_id: String },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type SimResult<T> = Result<T, SimError>;
