//! Discrete-event simulation of a tutoring centre's intake: children
//! arrive, queue for an evaluator, then wait for a volunteer matched on
//! domain and skill.

pub mod arrivals;
pub mod clock;
pub mod config;
pub mod diagnosis;
pub mod engine;
pub mod error;
pub mod event;
pub mod lifecycle;
pub mod matching;
pub mod model;
pub mod process;
pub mod resources;
pub mod rng;
pub mod scheduler;
pub mod stats;
pub mod store;
pub mod types;

pub use engine::{run_scenario, SimEngine};
