//! Deterministic random number generation.
//!
//! RULE: Nothing in the simulation may call any platform RNG.
//! All randomness flows through StreamRng instances derived from the
//! single scenario seed.
//!
//! Each stream is seeded from (seed XOR stream_index * golden ratio).
//! This means:
//!   - Changing how many service durations are drawn never shifts the
//!     arrival process, and vice versa.
//!   - Each stream is fully reproducible in isolation.

use rand::SeedableRng;
use rand_distr::{Distribution, Exp, Normal};
use rand_pcg::Pcg64Mcg;

/// A named, deterministic RNG for one family of variates.
pub struct StreamRng {
    pub name: &'static str,
    inner: Pcg64Mcg,
}

impl StreamRng {
    /// Create a stream RNG from the scenario seed and a stable stream
    /// index. The index must never change once assigned.
    pub fn new(seed: u64, stream_index: u64) -> Self {
        let derived_seed = seed ^ (stream_index.wrapping_mul(0x9e37_79b9_7f4a_7c15));
        Self {
            name: "unnamed",
            inner: Pcg64Mcg::seed_from_u64(derived_seed),
        }
    }

    pub fn with_name(mut self, name: &'static str) -> Self {
        self.name = name;
        self
    }

    /// Roll a float in [0.0, 1.0).
    pub fn next_f64(&mut self) -> f64 {
        use rand::RngCore;
        let bits = self.inner.next_u64();
        (bits >> 11) as f64 * (1.0 / (1u64 << 53) as f64)
    }

    /// Exponential gap with the given rate (mean = 1 / rate).
    /// A rate that is not positive yields an infinite gap.
    pub fn exponential(&mut self, rate: f64) -> f64 {
        match Exp::new(rate) {
            Ok(dist) if rate > 0.0 => dist.sample(&mut self.inner),
            _ => f64::INFINITY,
        }
    }

    /// Normal draw clamped from below at `floor`.
    /// A zero standard deviation returns the mean without consuming
    /// randomness, so deterministic durations stay exact.
    pub fn truncated_normal(&mut self, mean: f64, std_dev: f64, floor: f64) -> f64 {
        if std_dev <= 0.0 {
            return mean.max(floor);
        }
        let raw = match Normal::new(mean, std_dev) {
            Ok(dist) => dist.sample(&mut self.inner),
            Err(_) => mean,
        };
        raw.max(floor)
    }

    /// Cumulative-threshold sampling over `weights`.
    ///
    /// Draws u in [0, 1) and returns the first index whose cumulative
    /// weight is >= u. Falls through to the last index when rounding
    /// leaves the total a hair under u.
    pub fn pick_weighted(&mut self, weights: &[f64]) -> usize {
        let roll = self.next_f64();
        pick_by_threshold(weights, roll)
    }
}

/// Deterministic half of [`StreamRng::pick_weighted`], split out so the
/// threshold walk can be exercised with chosen rolls.
pub fn pick_by_threshold(weights: &[f64], roll: f64) -> usize {
    let mut cumulative = 0.0;
    for (index, weight) in weights.iter().enumerate() {
        cumulative += weight;
        if roll <= cumulative {
            return index;
        }
    }
    weights.len().saturating_sub(1)
}

/// All stream RNGs for a single run, indexed by stable slot.
pub struct RngBank {
    seed: u64,
}

impl RngBank {
    pub fn new(seed: u64) -> Self {
        Self { seed }
    }

    pub fn for_stream(&self, slot: StreamSlot) -> StreamRng {
        StreamRng::new(self.seed, slot as u64).with_name(slot.name())
    }
}

/// Stable stream slot assignments.
/// NEVER reorder or remove entries — only append.
/// Reordering changes every stream's seed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u64)]
pub enum StreamSlot {
    InterArrival = 0,
    Attributes = 1,
    Evaluation = 2,
    Service = 3,
}

impl StreamSlot {
    pub fn name(&self) -> &'static str {
        match self {
            Self::InterArrival => "inter_arrival",
            Self::Attributes => "attributes",
            Self::Evaluation => "evaluation",
            Self::Service => "service",
        }
    }
}
