use crate::dispatch::{agents, TaskDispatcher};
use calendor_core::{
    AgentStatusRecord, AgentTask, CalendorError, CalendorResult, CoordinationRecord, TaskState,
    WorkflowKind, WorkflowState,
};
use calendor_store::Datastore;
use chrono::Utc;
use serde::Serialize;
use serde_json::{json, Value};
use std::collections::BTreeMap;

/// Snapshot of one workflow: its record plus the live state of the agents
/// involved and the tasks created since it started.
#[derive(Debug, Clone, Serialize)]
pub struct WorkflowStatus {
    pub record: CoordinationRecord,
    pub agents: Vec<AgentStatusRecord>,
    pub tasks: Vec<AgentTask>,
}

/// Per-agent slice of the fleet metrics.
#[derive(Debug, Clone, Default, Serialize)]
pub struct AgentMetrics {
    pub total: usize,
    pub pending: usize,
    pub processing: usize,
    pub completed: usize,
    pub failed: usize,
}

impl AgentMetrics {
    /// Share of terminal tasks that completed, as a percentage.
    pub fn success_rate(&self) -> f64 {
        let terminal = self.completed + self.failed;
        if terminal == 0 {
            return 0.0;
        }
        self.completed as f64 / terminal as f64 * 100.0
    }
}

/// Aggregate view over the whole task audit log.
#[derive(Debug, Clone, Serialize)]
pub struct FleetMetrics {
    pub total_tasks: usize,
    pub per_agent: BTreeMap<String, AgentMetrics>,
}

/// Derive fleet metrics from the task audit log.
pub async fn fleet_metrics(store: &Datastore) -> CalendorResult<FleetMetrics> {
    let tasks = store.all_tasks().await?;
    let mut per_agent: BTreeMap<String, AgentMetrics> = BTreeMap::new();
    for task in &tasks {
        let entry = per_agent.entry(task.agent_id.clone()).or_default();
        entry.total += 1;
        match task.state {
            TaskState::Pending => entry.pending += 1,
            TaskState::Processing => entry.processing += 1,
            TaskState::Completed => entry.completed += 1,
            TaskState::Failed => entry.failed += 1,
        }
    }
    Ok(FleetMetrics {
        total_tasks: tasks.len(),
        per_agent,
    })
}

/// Starts multi-agent workflows and tracks them through the store.
///
/// Initiating a workflow writes a coordination record and seeds the first
/// tasks; everything after that flows through the task queue. The record
/// itself stays write-once except for the closing transition.
#[derive(Clone)]
pub struct CoordinationLedger {
    store: Datastore,
    dispatcher: TaskDispatcher,
}

impl CoordinationLedger {
    pub fn new(store: Datastore) -> Self {
        let dispatcher = TaskDispatcher::new(store.clone());
        Self { store, dispatcher }
    }

    /// Start a workflow for a user: write its record, seed its tasks, and
    /// return the coordination id.
    pub async fn initiate(&self, workflow: WorkflowKind, user_id: &str) -> CalendorResult<String> {
        let record = CoordinationRecord::new(user_id, workflow)
            .with_agents(Self::involved_agents(workflow));
        self.store.insert_coordination(&record).await?;
        self.seed_tasks(workflow, user_id).await?;
        tracing::info!(
            coordination_id = %record.coordination_id,
            workflow = %workflow,
            user_id,
            "workflow initiated"
        );
        Ok(record.coordination_id)
    }

    fn involved_agents(workflow: WorkflowKind) -> Vec<String> {
        let ids: &[&str] = match workflow {
            WorkflowKind::MailProcessing => &[agents::MAILBOX, agents::AGGREGATOR],
            WorkflowKind::ScheduleOptimization => &[agents::CALENDAR, agents::COORDINATOR],
            WorkflowKind::ConflictResolution => &[agents::CALENDAR],
        };
        ids.iter().map(ToString::to_string).collect()
    }

    async fn seed_tasks(&self, workflow: WorkflowKind, user_id: &str) -> CalendorResult<()> {
        match workflow {
            WorkflowKind::MailProcessing => {
                let fetch = AgentTask::new(
                    agents::MAILBOX,
                    "fetch_mail",
                    json!({ "user_id": user_id, "max_results": 20 }),
                )
                .with_priority(5);
                let fetch_id = fetch.task_id;
                self.dispatcher.dispatch(fetch).await?;
                self.dispatcher
                    .dispatch(
                        AgentTask::new(
                            agents::AGGREGATOR,
                            "aggregate_mail_data",
                            json!({ "user_id": user_id }),
                        )
                        .with_priority(4)
                        .with_dependencies(vec![fetch_id]),
                    )
                    .await?;
            }
            WorkflowKind::ScheduleOptimization => {
                self.dispatcher
                    .dispatch(
                        AgentTask::new(
                            agents::CALENDAR,
                            "fetch_calendar_data",
                            json!({ "user_id": user_id, "days_ahead": 30 }),
                        )
                        .with_priority(4),
                    )
                    .await?;
            }
            WorkflowKind::ConflictResolution => {
                let fetch = AgentTask::new(
                    agents::CALENDAR,
                    "fetch_calendar_data",
                    json!({ "user_id": user_id, "days_ahead": 7 }),
                )
                .with_priority(5);
                let fetch_id = fetch.task_id;
                self.dispatcher.dispatch(fetch).await?;
                self.dispatcher
                    .dispatch(
                        AgentTask::new(
                            agents::CALENDAR,
                            "detect_conflicts",
                            json!({ "user_id": user_id, "days_ahead": 7 }),
                        )
                        .with_priority(5)
                        .with_dependencies(vec![fetch_id]),
                    )
                    .await?;
            }
        }
        Ok(())
    }

    /// Current state of a workflow: record, involved-agent statuses, and
    /// all tasks addressed to those agents since it started.
    pub async fn status(&self, coordination_id: &str) -> CalendorResult<WorkflowStatus> {
        let record = self
            .store
            .get_coordination(coordination_id)
            .await?
            .ok_or_else(|| {
                CalendorError::Coordination(format!("unknown coordination: {coordination_id}"))
            })?;

        let mut statuses = Vec::new();
        for agent_id in &record.involved_agents {
            if let Some(status) = self.store.get_status(agent_id).await? {
                statuses.push(status);
            }
        }
        let tasks = self
            .store
            .tasks_since(&record.involved_agents, record.created_at)
            .await?;

        Ok(WorkflowStatus {
            record,
            agents: statuses,
            tasks,
        })
    }

    /// Close a workflow as completed, attaching its result document.
    pub async fn complete(&self, coordination_id: &str, result: Value) -> CalendorResult<()> {
        self.close(coordination_id, WorkflowState::Completed, result)
            .await
    }

    /// Close a workflow as failed, recording the failure reason.
    pub async fn fail(&self, coordination_id: &str, reason: &str) -> CalendorResult<()> {
        self.close(
            coordination_id,
            WorkflowState::Failed,
            json!({ "error": reason }),
        )
        .await
    }

    async fn close(
        &self,
        coordination_id: &str,
        state: WorkflowState,
        result: Value,
    ) -> CalendorResult<()> {
        let patch = json!({
            "state": state,
            "completed_at": Utc::now(),
            "result": result,
        });
        if !self.store.patch_coordination(coordination_id, patch).await? {
            return Err(CalendorError::Coordination(format!(
                "unknown coordination: {coordination_id}"
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use calendor_store::MemoryStore;
    use std::sync::Arc;

    fn ledger() -> (Datastore, CoordinationLedger) {
        let store = Datastore::new(Arc::new(MemoryStore::new()));
        let ledger = CoordinationLedger::new(store.clone());
        (store, ledger)
    }

    #[tokio::test]
    async fn test_mail_processing_seeds_gated_aggregate() {
        let (store, ledger) = ledger();
        let id = ledger
            .initiate(WorkflowKind::MailProcessing, "u1")
            .await
            .unwrap();
        assert!(id.starts_with("coord_u1_"));

        let fetch = &store.pending_tasks(agents::MAILBOX).await.unwrap()[0];
        assert_eq!(fetch.task_type, "fetch_mail");
        assert_eq!(fetch.priority, 5);

        let aggregate = &store.pending_tasks(agents::AGGREGATOR).await.unwrap()[0];
        assert_eq!(aggregate.task_type, "aggregate_mail_data");
        assert_eq!(aggregate.priority, 4);
        assert_eq!(aggregate.dependencies, vec![fetch.task_id]);
    }

    #[tokio::test]
    async fn test_conflict_resolution_uses_short_horizon() {
        let (store, ledger) = ledger();
        ledger
            .initiate(WorkflowKind::ConflictResolution, "u1")
            .await
            .unwrap();

        let tasks = store.pending_tasks(agents::CALENDAR).await.unwrap();
        assert_eq!(tasks.len(), 2);
        let fetch = tasks.iter().find(|t| t.task_type == "fetch_calendar_data").unwrap();
        let detect = tasks.iter().find(|t| t.task_type == "detect_conflicts").unwrap();
        assert_eq!(fetch.input["days_ahead"], 7);
        assert_eq!(detect.dependencies, vec![fetch.task_id]);
    }

    #[tokio::test]
    async fn test_status_includes_seeded_tasks() {
        let (_, ledger) = ledger();
        let id = ledger
            .initiate(WorkflowKind::ScheduleOptimization, "u1")
            .await
            .unwrap();
        let status = ledger.status(&id).await.unwrap();
        assert_eq!(status.record.workflow, WorkflowKind::ScheduleOptimization);
        assert_eq!(status.tasks.len(), 1);
        assert_eq!(status.tasks[0].task_type, "fetch_calendar_data");
    }

    #[tokio::test]
    async fn test_complete_closes_record() {
        let (_, ledger) = ledger();
        let id = ledger
            .initiate(WorkflowKind::MailProcessing, "u1")
            .await
            .unwrap();
        ledger.complete(&id, json!({"drafts": 2})).await.unwrap();

        let status = ledger.status(&id).await.unwrap();
        assert_eq!(status.record.state, WorkflowState::Completed);
        assert!(status.record.completed_at.is_some());
        assert_eq!(status.record.result, Some(json!({"drafts": 2})));
    }

    #[tokio::test]
    async fn test_unknown_coordination_id_fails() {
        let (_, ledger) = ledger();
        assert!(ledger.status("coord_missing").await.is_err());
        assert!(ledger.fail("coord_missing", "nope").await.is_err());
    }

    #[tokio::test]
    async fn test_fleet_metrics_counts_by_state() {
        let (store, ledger) = ledger();
        ledger
            .initiate(WorkflowKind::MailProcessing, "u1")
            .await
            .unwrap();

        let metrics = fleet_metrics(&store).await.unwrap();
        assert_eq!(metrics.total_tasks, 2);
        assert_eq!(metrics.per_agent[agents::MAILBOX].pending, 1);
        assert_eq!(metrics.per_agent[agents::AGGREGATOR].pending, 1);
        assert_eq!(metrics.per_agent[agents::MAILBOX].success_rate(), 0.0);
    }
}
