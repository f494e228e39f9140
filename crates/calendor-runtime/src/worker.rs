use async_trait::async_trait;
use calendor_core::{AgentRole, CalendorResult};
use serde_json::Value;

/// Identity of one agent in the fleet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentDescriptor {
    pub agent_id: String,
    pub role: AgentRole,
    pub name: String,
}

impl AgentDescriptor {
    pub fn new(agent_id: impl Into<String>, role: AgentRole, name: impl Into<String>) -> Self {
        Self {
            agent_id: agent_id.into(),
            role,
            name: name.into(),
        }
    }
}

/// Domain logic behind one agent identity.
///
/// The runtime owns the poll loop, status reporting, and task state
/// transitions; implementations only turn a task payload into an output
/// document. `handle` must reject unknown task types with a task error
/// rather than panicking.
#[async_trait]
pub trait WorkerLogic: Send + Sync {
    fn descriptor(&self) -> AgentDescriptor;

    /// One-time setup before the poll loop starts.
    async fn initialize(&self) -> CalendorResult<()> {
        Ok(())
    }

    /// Execute a single task and return its output document.
    async fn handle(&self, task_type: &str, input: &Value) -> CalendorResult<Value>;
}
