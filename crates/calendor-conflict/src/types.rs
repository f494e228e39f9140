use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Classification of a detected scheduling problem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictKind {
    TimeOverlap,
    Overbooked,
    BurnoutRisk,
    InsufficientBuffer,
}

impl std::fmt::Display for ConflictKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConflictKind::TimeOverlap => write!(f, "time_overlap"),
            ConflictKind::Overbooked => write!(f, "overbooked"),
            ConflictKind::BurnoutRisk => write!(f, "burnout_risk"),
            ConflictKind::InsufficientBuffer => write!(f, "insufficient_buffer"),
        }
    }
}

/// How serious a conflict is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

/// Whether anyone has acted on the conflict yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionStatus {
    Pending,
    Resolved,
    Ignored,
}

/// One concrete way to resolve an overlap.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RescheduleOption {
    pub action: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_start: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_end: Option<DateTime<Utc>>,
    pub reason: String,
}

/// Type-specific suggested resolution attached to a conflict.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Resolution {
    /// Move or shrink one of two overlapping events.
    Reschedule { options: Vec<RescheduleOption> },
    /// Spread an overbooked day's meetings over other days.
    Redistribute {
        current_count: usize,
        recommended_count: usize,
        suggestion: String,
    },
    /// Break up long consecutive meeting runs.
    ScheduleBreaks {
        total_hours: f64,
        max_consecutive: f64,
        recommendations: Vec<String>,
    },
    /// Insert the configured buffer between two back-to-back events.
    AddBuffer {
        current_gap_minutes: f64,
        recommended_gap_minutes: f64,
        suggestion: String,
    },
}

/// A detected scheduling conflict.
///
/// The conflict id is derived deterministically from the affected entity
/// pair or day plus the conflict kind, so repeated detection runs over the
/// same schedule produce the same ids.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConflictRecord {
    pub conflict_id: String,
    pub user_id: String,
    pub kind: ConflictKind,
    pub affected_events: Vec<String>,
    pub severity: Severity,
    pub detected_at: DateTime<Utc>,
    pub resolution_status: ResolutionStatus,
    pub suggested_resolution: Option<Resolution>,
    #[serde(default)]
    pub auto_resolved: bool,
}

impl ConflictRecord {
    pub(crate) fn new(
        conflict_id: String,
        user_id: &str,
        kind: ConflictKind,
        affected_events: Vec<String>,
        severity: Severity,
        resolution: Resolution,
    ) -> Self {
        Self {
            conflict_id,
            user_id: user_id.to_string(),
            kind,
            affected_events,
            severity,
            detected_at: Utc::now(),
            resolution_status: ResolutionStatus::Pending,
            suggested_resolution: Some(resolution),
            auto_resolved: false,
        }
    }
}
