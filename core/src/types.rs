//! Shared primitive types used across the entire simulation.

/// A point on the virtual time axis. One unit = one week in the
/// preset scenarios; the engine itself attaches no unit to it.
pub type SimTime = f64;

/// Sequence number of a child, assigned in arrival order starting at 1.
pub type EntityId = u64;

/// The canonical run identifier.
pub type RunId = String;
