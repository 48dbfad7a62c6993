//! Domain model: children, volunteers and the shared level scale.

use crate::types::{EntityId, SimTime};
use serde::{Deserialize, Serialize};
use std::fmt;

/// The ordered scale shared by a child's severity and a volunteer's
/// skill. A volunteer covers a child when `skill >= severity`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Level {
    Low,
    Moderate,
    High,
}

impl Level {
    pub const ALL: [Level; 3] = [Level::Low, Level::Moderate, Level::High];

    /// 1-based rank on the scale.
    pub fn rank(self) -> u8 {
        match self {
            Self::Low => 1,
            Self::Moderate => 2,
            Self::High => 3,
        }
    }

    pub fn from_rank(rank: u8) -> Option<Self> {
        match rank {
            1 => Some(Self::Low),
            2 => Some(Self::Moderate),
            3 => Some(Self::High),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Low => "Low",
            Self::Moderate => "Moderate",
            Self::High => "High",
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Domain {
    Numeracy,
    Literacy,
    GraphicSkills,
}

impl Domain {
    pub const ALL: [Domain; 3] = [Domain::Numeracy, Domain::Literacy, Domain::GraphicSkills];

    pub fn label(self) -> &'static str {
        match self {
            Self::Numeracy => "Numeracy",
            Self::Literacy => "Literacy",
            Self::GraphicSkills => "GraphicSkills",
        }
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A unit of demand. Immutable once created by the arrival generator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Child {
    pub id:         EntityId,
    pub severity:   Level,
    pub domain:     Domain,
    pub arrived_at: SimTime,
}

impl Child {
    pub fn label(&self) -> String {
        format!("Child-{:03}", self.id)
    }
}

/// A capacity-1 server with fixed attributes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Volunteer {
    pub index:     usize,
    pub name:      String,
    pub skill:     Level,
    pub domain:    Domain,
    pub busy:      bool,
    /// Sum of completed service durations.
    pub busy_time: SimTime,
}

impl Volunteer {
    pub fn covers(&self, child: &Child) -> bool {
        self.skill >= child.severity
    }
}
