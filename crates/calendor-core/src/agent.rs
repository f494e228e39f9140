use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Role of each agent in the assistant pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentRole {
    /// Fetches mail, classifies it, drafts replies, schedules reminders.
    Mailbox,
    /// Joins mail records across stages and filters them for the coordinator.
    Aggregator,
    /// Provides upcoming calendar data and runs conflict detection.
    Calendar,
    /// Finalizes schedules and records cross-agent coordination data.
    Coordinator,
    /// Observes the whole fleet and reports system-level status.
    Overseer,
}

impl std::fmt::Display for AgentRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AgentRole::Mailbox => write!(f, "mailbox"),
            AgentRole::Aggregator => write!(f, "aggregator"),
            AgentRole::Calendar => write!(f, "calendar"),
            AgentRole::Coordinator => write!(f, "coordinator"),
            AgentRole::Overseer => write!(f, "overseer"),
        }
    }
}

/// Lifecycle state of a running agent.
///
/// `Error` is non-terminal: the runtime reports it, backs off, and returns
/// to its poll loop. `Stopped` is only written on shutdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentLifecycle {
    Starting,
    Idle,
    Processing,
    Error,
    Stopped,
}

impl std::fmt::Display for AgentLifecycle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AgentLifecycle::Starting => write!(f, "starting"),
            AgentLifecycle::Idle => write!(f, "idle"),
            AgentLifecycle::Processing => write!(f, "processing"),
            AgentLifecycle::Error => write!(f, "error"),
            AgentLifecycle::Stopped => write!(f, "stopped"),
        }
    }
}

/// Health record for one agent identity, upserted on every state transition.
///
/// Mutated only by the owning runtime; readers treat it as an eventually
/// consistent snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentStatusRecord {
    pub agent_id: String,
    pub role: AgentRole,
    pub name: String,
    pub state: AgentLifecycle,
    pub current_task: Option<String>,
    pub last_activity: DateTime<Utc>,
    pub processed_count: u64,
    pub error_count: u64,
    #[serde(default)]
    pub metrics: HashMap<String, serde_json::Value>,
}

impl AgentStatusRecord {
    pub fn new(agent_id: impl Into<String>, role: AgentRole, name: impl Into<String>) -> Self {
        Self {
            agent_id: agent_id.into(),
            role,
            name: name.into(),
            state: AgentLifecycle::Starting,
            current_task: None,
            last_activity: Utc::now(),
            processed_count: 0,
            error_count: 0,
            metrics: HashMap::new(),
        }
    }

    /// Success rate over all terminal outcomes, as a percentage.
    pub fn success_rate(&self) -> f64 {
        let total = self.processed_count + self.error_count;
        if total == 0 {
            return 0.0;
        }
        self.processed_count as f64 / total as f64 * 100.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_display() {
        assert_eq!(AgentRole::Mailbox.to_string(), "mailbox");
        assert_eq!(AgentRole::Coordinator.to_string(), "coordinator");
        assert_eq!(AgentRole::Overseer.to_string(), "overseer");
    }

    #[test]
    fn test_lifecycle_serialization() {
        let json = serde_json::to_string(&AgentLifecycle::Processing).unwrap();
        assert_eq!(json, "\"processing\"");
        let parsed: AgentLifecycle = serde_json::from_str("\"stopped\"").unwrap();
        assert_eq!(parsed, AgentLifecycle::Stopped);
    }

    #[test]
    fn test_new_status_record() {
        let status = AgentStatusRecord::new("mailbox-a", AgentRole::Mailbox, "Mail Assistant");
        assert_eq!(status.state, AgentLifecycle::Starting);
        assert_eq!(status.processed_count, 0);
        assert!(status.current_task.is_none());
    }

    #[test]
    fn test_success_rate() {
        let mut status = AgentStatusRecord::new("mailbox-a", AgentRole::Mailbox, "Mail Assistant");
        assert_eq!(status.success_rate(), 0.0);
        status.processed_count = 3;
        status.error_count = 1;
        assert_eq!(status.success_rate(), 75.0);
    }
}
