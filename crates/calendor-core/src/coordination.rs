use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Kind of multi-agent workflow a coordination record tracks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowKind {
    MailProcessing,
    ScheduleOptimization,
    ConflictResolution,
}

impl std::fmt::Display for WorkflowKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WorkflowKind::MailProcessing => write!(f, "mail_processing"),
            WorkflowKind::ScheduleOptimization => write!(f, "schedule_optimization"),
            WorkflowKind::ConflictResolution => write!(f, "conflict_resolution"),
        }
    }
}

/// Lifecycle of a coordination record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowState {
    Active,
    Completed,
    Failed,
}

/// Audit entry for one initiated multi-agent workflow.
///
/// Agents participate through the task queue, not by mutating this record;
/// it is largely write-once. Live progress is derived from agent statuses
/// and the tasks created after `created_at`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoordinationRecord {
    pub coordination_id: String,
    pub user_id: String,
    pub workflow: WorkflowKind,
    pub involved_agents: Vec<String>,
    pub state: WorkflowState,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub result: Option<serde_json::Value>,
}

impl CoordinationRecord {
    pub fn new(user_id: impl Into<String>, workflow: WorkflowKind) -> Self {
        let user_id = user_id.into();
        let created_at = Utc::now();
        Self {
            coordination_id: format!("coord_{}_{}", user_id, created_at.timestamp_millis()),
            user_id,
            workflow,
            involved_agents: Vec::new(),
            state: WorkflowState::Active,
            created_at,
            completed_at: None,
            result: None,
        }
    }

    pub fn with_agents(mut self, agents: Vec<String>) -> Self {
        self.involved_agents = agents;
        self
    }
}

/// Result of a finalized schedule pass, written by the coordinator worker.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleOptimization {
    pub optimization_id: String,
    pub user_id: String,
    pub improvements: Vec<String>,
    pub efficiency_score: f64,
    pub created_at: DateTime<Utc>,
    pub applied: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_workflow_kind_serialization() {
        let json = serde_json::to_string(&WorkflowKind::MailProcessing).unwrap();
        assert_eq!(json, "\"mail_processing\"");
        let parsed: WorkflowKind = serde_json::from_str("\"conflict_resolution\"").unwrap();
        assert_eq!(parsed, WorkflowKind::ConflictResolution);
    }

    #[test]
    fn test_new_record_is_active() {
        let record = CoordinationRecord::new("u1", WorkflowKind::ScheduleOptimization)
            .with_agents(vec!["calendar-a".into(), "coordinator-a".into()]);
        assert_eq!(record.state, WorkflowState::Active);
        assert!(record.coordination_id.starts_with("coord_u1_"));
        assert_eq!(record.involved_agents.len(), 2);
        assert!(record.completed_at.is_none());
    }
}
