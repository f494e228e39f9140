use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle state of a task in an agent's queue partition.
///
/// Transitions are monotonic: `pending → processing → {completed | failed}`.
/// A task never returns to `pending` on its own; only a higher-level
/// workflow may re-queue work by creating a fresh task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskState {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl TaskState {
    /// Whether this state is terminal (no further transitions).
    pub fn is_terminal(self) -> bool {
        matches!(self, TaskState::Completed | TaskState::Failed)
    }
}

impl std::fmt::Display for TaskState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TaskState::Pending => write!(f, "pending"),
            TaskState::Processing => write!(f, "processing"),
            TaskState::Completed => write!(f, "completed"),
            TaskState::Failed => write!(f, "failed"),
        }
    }
}

/// One unit of work addressed to a specific agent identity.
///
/// The input payload is an opaque document; each worker deserializes it
/// into a typed input struct at the point of consumption. Tasks are never
/// physically deleted — terminal tasks remain in the store as an audit log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentTask {
    pub task_id: Uuid,
    /// Identity of the agent this task is addressed to.
    pub agent_id: String,
    pub task_type: String,
    pub input: serde_json::Value,
    pub output: Option<serde_json::Value>,
    pub state: TaskState,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub error: Option<String>,
    /// 1–5, 5 being highest. Clamped on construction.
    pub priority: u8,
    /// Task ids this task waits on; a task is not eligible for execution
    /// until every dependency has completed.
    #[serde(default)]
    pub dependencies: Vec<Uuid>,
}

impl AgentTask {
    pub fn new(
        agent_id: impl Into<String>,
        task_type: impl Into<String>,
        input: serde_json::Value,
    ) -> Self {
        Self {
            task_id: Uuid::new_v4(),
            agent_id: agent_id.into(),
            task_type: task_type.into(),
            input,
            output: None,
            state: TaskState::Pending,
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
            error: None,
            priority: 1,
            dependencies: Vec::new(),
        }
    }

    pub fn with_priority(mut self, priority: u8) -> Self {
        self.priority = priority.clamp(1, 5);
        self
    }

    pub fn with_dependencies(mut self, deps: Vec<Uuid>) -> Self {
        self.dependencies = deps;
        self
    }

    /// Whether this task is eligible to run given the set of completed ids.
    pub fn is_ready(&self, completed_ids: &[Uuid]) -> bool {
        self.state == TaskState::Pending
            && self
                .dependencies
                .iter()
                .all(|dep| completed_ids.contains(dep))
    }
}
