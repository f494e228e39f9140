//! Schedule conflict detection for the Calendor backend.
//!
//! A stateless, rule-based analyzer over a time-ordered event sequence.
//! Four independent sub-analyses classify overlapping events, overbooked
//! days, burnout risk, and insufficient buffer time, each with a
//! type-specific suggested resolution. Running `detect` twice over the
//! same events yields identical conflict ids and counts.

mod detector;
mod suggest;
mod types;

pub use detector::{ConflictDetector, DetectorConfig, EventSpan};
pub use suggest::{suggest_reschedule, MoveOption, RescheduleProposal, TimeSlot};
pub use types::{
    ConflictKind, ConflictRecord, Resolution, ResolutionStatus, RescheduleOption, Severity,
};
