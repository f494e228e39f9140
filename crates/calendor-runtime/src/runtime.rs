use crate::worker::{AgentDescriptor, WorkerLogic};
use calendor_core::{AgentLifecycle, AgentStatusRecord, AgentTask, CalendorError, CalendorResult, TaskState};
use calendor_store::Datastore;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use uuid::Uuid;

/// Poll-loop timing for one agent runtime.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeConfig {
    /// Seconds between polls when the last cycle succeeded.
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
    /// Seconds to wait before polling again after a cycle-level failure.
    #[serde(default = "default_error_backoff_secs")]
    pub error_backoff_secs: u64,
}

fn default_poll_interval_secs() -> u64 {
    5
}

fn default_error_backoff_secs() -> u64 {
    10
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: default_poll_interval_secs(),
            error_backoff_secs: default_error_backoff_secs(),
        }
    }
}

/// Poll loop and task lifecycle for one agent identity.
///
/// The runtime fetches eligible pending tasks for its agent, executes them
/// in priority order through the [`WorkerLogic`], and records every state
/// transition in the store. A failing task is recorded and skipped; only
/// store-level faults abort a cycle, and those back off and retry.
pub struct AgentRuntime {
    worker: Arc<dyn WorkerLogic>,
    store: Datastore,
    config: RuntimeConfig,
    descriptor: AgentDescriptor,
    processed: AtomicU64,
    errors: AtomicU64,
}

impl AgentRuntime {
    pub fn new(worker: Arc<dyn WorkerLogic>, store: Datastore, config: RuntimeConfig) -> Self {
        let descriptor = worker.descriptor();
        Self {
            worker,
            store,
            config,
            descriptor,
            processed: AtomicU64::new(0),
            errors: AtomicU64::new(0),
        }
    }

    pub fn agent_id(&self) -> &str {
        &self.descriptor.agent_id
    }

    /// Upsert this agent's status record with the current counters.
    pub async fn report_status(
        &self,
        state: AgentLifecycle,
        current_task: Option<&str>,
    ) -> CalendorResult<()> {
        let mut status = AgentStatusRecord::new(
            &self.descriptor.agent_id,
            self.descriptor.role,
            &self.descriptor.name,
        );
        status.state = state;
        status.current_task = current_task.map(str::to_string);
        status.last_activity = Utc::now();
        status.processed_count = self.processed.load(Ordering::Relaxed);
        status.error_count = self.errors.load(Ordering::Relaxed);
        self.store.upsert_status(&status).await
    }

    /// Queue a task addressed to any agent, returning its id.
    pub async fn enqueue_task(&self, task: AgentTask) -> CalendorResult<Uuid> {
        let task_id = task.task_id;
        tracing::info!(
            agent_id = %task.agent_id,
            task_type = %task.task_type,
            task_id = %task_id,
            priority = task.priority,
            "task queued"
        );
        self.store.insert_task(&task).await?;
        Ok(task_id)
    }

    /// Transition a task, maintaining its timestamps.
    ///
    /// The start timestamp is set only on the first entry to `processing`;
    /// the completion timestamp is set whenever the new state is terminal.
    pub async fn update_task(
        &self,
        task_id: Uuid,
        state: TaskState,
        output: Option<Value>,
        error: Option<String>,
    ) -> CalendorResult<()> {
        let existing = self
            .store
            .get_task(task_id)
            .await?
            .ok_or_else(|| CalendorError::Task(format!("unknown task: {task_id}")))?;

        let mut patch = json!({ "state": state });
        if state == TaskState::Processing && existing.started_at.is_none() {
            patch["started_at"] = serde_json::to_value(Utc::now())?;
        }
        if state.is_terminal() {
            patch["completed_at"] = serde_json::to_value(Utc::now())?;
        }
        if let Some(output) = output {
            patch["output"] = output;
        }
        if let Some(error) = error {
            patch["error"] = Value::String(error);
        }
        self.store.patch_task(task_id, patch).await?;
        Ok(())
    }

    /// Pending tasks for this agent in execution order, excluding any whose
    /// dependencies have not all completed.
    pub async fn fetch_pending(&self) -> CalendorResult<Vec<AgentTask>> {
        let pending = self.store.pending_tasks(&self.descriptor.agent_id).await?;
        if pending.iter().all(|t| t.dependencies.is_empty()) {
            return Ok(pending);
        }
        let completed = self.store.completed_task_ids().await?;
        Ok(pending
            .into_iter()
            .filter(|t| t.is_ready(&completed))
            .collect())
    }

    /// One poll cycle: drain the eligible queue, then report idle.
    ///
    /// Returns the number of tasks handled, successful or not.
    pub async fn run_cycle(&self) -> CalendorResult<usize> {
        let tasks = self.fetch_pending().await?;
        if tasks.is_empty() {
            self.report_status(AgentLifecycle::Idle, None).await?;
            return Ok(0);
        }

        let mut handled = 0;
        for task in tasks {
            self.report_status(AgentLifecycle::Processing, Some(&task.task_type))
                .await?;
            if let Err(error) = self.execute_task(&task).await {
                self.errors.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(
                    agent_id = %self.descriptor.agent_id,
                    task_id = %task.task_id,
                    task_type = %task.task_type,
                    %error,
                    "task failed"
                );
                let _ = self
                    .update_task(task.task_id, TaskState::Failed, None, Some(error.to_string()))
                    .await;
            }
            handled += 1;
        }

        self.report_status(AgentLifecycle::Idle, None).await?;
        Ok(handled)
    }

    async fn execute_task(&self, task: &AgentTask) -> CalendorResult<()> {
        self.update_task(task.task_id, TaskState::Processing, None, None)
            .await?;
        let output = self.worker.handle(&task.task_type, &task.input).await?;
        self.update_task(task.task_id, TaskState::Completed, Some(output), None)
            .await?;
        self.processed.fetch_add(1, Ordering::Relaxed);
        tracing::info!(
            agent_id = %self.descriptor.agent_id,
            task_id = %task.task_id,
            task_type = %task.task_type,
            "task completed"
        );
        Ok(())
    }

    /// Run the poll loop until the stop signal flips or its sender drops.
    ///
    /// Cycle failures are reported and backed off, never propagated; the
    /// loop is only left through the stop channel. A best-effort `stopped`
    /// status is written on the way out.
    pub async fn run(&self, mut stop: watch::Receiver<bool>) {
        let agent_id = self.descriptor.agent_id.clone();

        if let Err(error) = self.start().await {
            tracing::error!(agent_id = %agent_id, %error, "agent failed to start");
            let _ = self.report_status(AgentLifecycle::Error, None).await;
            return;
        }
        tracing::info!(agent_id = %agent_id, role = %self.descriptor.role, "agent started");

        while !*stop.borrow() {
            let delay = match self.run_cycle().await {
                Ok(_) => Duration::from_secs(self.config.poll_interval_secs),
                Err(error) => {
                    tracing::error!(agent_id = %agent_id, %error, "agent cycle failed");
                    let _ = self.report_status(AgentLifecycle::Error, None).await;
                    Duration::from_secs(self.config.error_backoff_secs)
                }
            };

            tokio::select! {
                () = tokio::time::sleep(delay) => {}
                changed = stop.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }

        let _ = self.report_status(AgentLifecycle::Stopped, None).await;
        tracing::info!(agent_id = %agent_id, "agent stopped");
    }

    /// Report `starting`, initialize the worker, then settle to `idle`
    /// ahead of the first cycle.
    async fn start(&self) -> CalendorResult<()> {
        self.report_status(AgentLifecycle::Starting, None).await?;
        self.worker.initialize().await?;
        self.report_status(AgentLifecycle::Idle, None).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use calendor_core::AgentRole;
    use calendor_store::MemoryStore;

    /// Worker that completes every task except those of type `boom`.
    struct StubWorker;

    #[async_trait]
    impl WorkerLogic for StubWorker {
        fn descriptor(&self) -> AgentDescriptor {
            AgentDescriptor::new("stub-a", AgentRole::Mailbox, "Stub")
        }

        async fn handle(&self, task_type: &str, input: &Value) -> CalendorResult<Value> {
            if task_type == "boom" {
                return Err(CalendorError::Worker("boom".into()));
            }
            Ok(json!({ "echo": input }))
        }
    }

    fn runtime(store: &Datastore) -> AgentRuntime {
        AgentRuntime::new(Arc::new(StubWorker), store.clone(), RuntimeConfig::default())
    }

    fn store() -> Datastore {
        Datastore::new(Arc::new(MemoryStore::new()))
    }

    #[tokio::test]
    async fn test_cycle_completes_tasks_in_priority_order() {
        let store = store();
        let rt = runtime(&store);
        let low = AgentTask::new("stub-a", "echo", json!({"n": 1})).with_priority(1);
        let high = AgentTask::new("stub-a", "echo", json!({"n": 2})).with_priority(5);
        rt.enqueue_task(low.clone()).await.unwrap();
        rt.enqueue_task(high.clone()).await.unwrap();

        assert_eq!(rt.run_cycle().await.unwrap(), 2);

        let done_high = store.get_task(high.task_id).await.unwrap().unwrap();
        let done_low = store.get_task(low.task_id).await.unwrap().unwrap();
        assert_eq!(done_high.state, TaskState::Completed);
        assert_eq!(done_low.state, TaskState::Completed);
        // Higher priority ran first.
        assert!(done_high.completed_at.unwrap() <= done_low.completed_at.unwrap());
        assert_eq!(done_high.output, Some(json!({"echo": {"n": 2}})));
    }

    #[tokio::test]
    async fn test_task_failure_is_isolated() {
        let store = store();
        let rt = runtime(&store);
        let bad = AgentTask::new("stub-a", "boom", json!({})).with_priority(5);
        let good = AgentTask::new("stub-a", "echo", json!({})).with_priority(1);
        rt.enqueue_task(bad.clone()).await.unwrap();
        rt.enqueue_task(good.clone()).await.unwrap();

        assert_eq!(rt.run_cycle().await.unwrap(), 2);

        let failed = store.get_task(bad.task_id).await.unwrap().unwrap();
        assert_eq!(failed.state, TaskState::Failed);
        assert!(failed.error.as_deref().unwrap().contains("boom"));
        assert!(failed.completed_at.is_some());

        // The failure did not block the rest of the cycle.
        let ok = store.get_task(good.task_id).await.unwrap().unwrap();
        assert_eq!(ok.state, TaskState::Completed);

        let status = store.get_status("stub-a").await.unwrap().unwrap();
        assert_eq!(status.processed_count, 1);
        assert_eq!(status.error_count, 1);
        assert_eq!(status.state, AgentLifecycle::Idle);
    }

    #[tokio::test]
    async fn test_started_at_set_only_once() {
        let store = store();
        let rt = runtime(&store);
        let task = AgentTask::new("stub-a", "echo", json!({}));
        rt.enqueue_task(task.clone()).await.unwrap();

        rt.update_task(task.task_id, TaskState::Processing, None, None)
            .await
            .unwrap();
        let first = store.get_task(task.task_id).await.unwrap().unwrap();
        let started = first.started_at.unwrap();

        rt.update_task(task.task_id, TaskState::Processing, None, None)
            .await
            .unwrap();
        let second = store.get_task(task.task_id).await.unwrap().unwrap();
        assert_eq!(second.started_at, Some(started));
        assert!(second.completed_at.is_none());
    }

    #[tokio::test]
    async fn test_dependency_gating() {
        let store = store();
        let rt = runtime(&store);
        let dep = AgentTask::new("other-a", "echo", json!({}));
        let gated =
            AgentTask::new("stub-a", "echo", json!({})).with_dependencies(vec![dep.task_id]);
        store.insert_task(&dep).await.unwrap();
        rt.enqueue_task(gated.clone()).await.unwrap();

        // Dependency still pending: nothing is eligible.
        assert!(rt.fetch_pending().await.unwrap().is_empty());

        store
            .patch_task(dep.task_id, json!({"state": "completed"}))
            .await
            .unwrap();
        let eligible = rt.fetch_pending().await.unwrap();
        assert_eq!(eligible.len(), 1);
        assert_eq!(eligible[0].task_id, gated.task_id);
    }

    #[tokio::test]
    async fn test_start_settles_to_idle() {
        let store = store();
        let rt = runtime(&store);
        rt.start().await.unwrap();
        // An initialized agent is idle until its first task, never stuck
        // on `starting`.
        let status = store.get_status("stub-a").await.unwrap().unwrap();
        assert_eq!(status.state, AgentLifecycle::Idle);
        assert_eq!(status.processed_count, 0);
    }

    #[tokio::test]
    async fn test_idle_cycle_reports_status() {
        let store = store();
        let rt = runtime(&store);
        assert_eq!(rt.run_cycle().await.unwrap(), 0);
        let status = store.get_status("stub-a").await.unwrap().unwrap();
        assert_eq!(status.state, AgentLifecycle::Idle);
    }

    #[tokio::test]
    async fn test_update_unknown_task_fails() {
        let store = store();
        let rt = runtime(&store);
        let result = rt
            .update_task(Uuid::new_v4(), TaskState::Completed, None, None)
            .await;
        assert!(matches!(result, Err(CalendorError::Task(_))));
    }
}
