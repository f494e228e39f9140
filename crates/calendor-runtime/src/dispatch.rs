use calendor_core::{AgentTask, CalendorResult};
use calendor_store::Datastore;
use uuid::Uuid;

/// Well-known agent identities in the default fleet.
pub mod agents {
    pub const MAILBOX: &str = "mailbox-a";
    pub const AGGREGATOR: &str = "aggregator-a";
    pub const CALENDAR: &str = "calendar-a";
    pub const COORDINATOR: &str = "coordinator-a";
    pub const OVERSEER: &str = "overseer";
}

/// Cloneable handle for queueing tasks to any agent identity.
///
/// Workers fan out follow-up work through this seam instead of reaching
/// into each other's runtimes; the queue is the only coupling between
/// agents.
#[derive(Clone)]
pub struct TaskDispatcher {
    store: Datastore,
}

impl TaskDispatcher {
    pub fn new(store: Datastore) -> Self {
        Self { store }
    }

    /// Queue a task and return its id.
    pub async fn dispatch(&self, task: AgentTask) -> CalendorResult<Uuid> {
        let task_id = task.task_id;
        tracing::info!(
            agent_id = %task.agent_id,
            task_type = %task.task_type,
            task_id = %task_id,
            priority = task.priority,
            "task dispatched"
        );
        self.store.insert_task(&task).await?;
        Ok(task_id)
    }
}
