use crate::input::parse_input;
use async_trait::async_trait;
use calendor_core::{AgentRole, CalendorError, CalendorResult, ScheduleOptimization};
use calendor_runtime::{agents, AgentDescriptor, WorkerLogic};
use calendor_store::Datastore;
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};

#[derive(Debug, Deserialize)]
struct ProcessDataInput {
    user_id: String,
    #[serde(default)]
    items: Vec<Value>,
    #[serde(default)]
    calendar_data: Vec<Value>,
    #[serde(default)]
    source: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UserInput {
    user_id: String,
}

/// Collects stage outputs from the other agents and finalizes schedules.
pub struct CoordinatorWorker {
    store: Datastore,
}

impl CoordinatorWorker {
    pub fn new(store: Datastore) -> Self {
        Self { store }
    }

    async fn process_data(
        &self,
        data_type: &str,
        input: ProcessDataInput,
    ) -> CalendorResult<Value> {
        let data = if data_type == "mail_data" {
            Value::Array(input.items)
        } else {
            Value::Array(input.calendar_data)
        };
        self.store
            .insert_coordination_data(json!({
                "type": data_type,
                "data": data,
                "user_id": input.user_id,
                "source": input.source,
                "processed_at": Utc::now(),
            }))
            .await?;
        Ok(json!({ "status": "processed", "data_type": data_type }))
    }

    async fn finalize_schedule(&self, input: UserInput) -> CalendorResult<Value> {
        let optimization = ScheduleOptimization {
            optimization_id: format!("opt_{}_{}", input.user_id, Utc::now().timestamp_millis()),
            user_id: input.user_id.clone(),
            improvements: vec![
                "Resolved scheduling conflicts".into(),
                "Added buffer time between meetings".into(),
                "Optimized for productivity".into(),
            ],
            efficiency_score: 0.85,
            created_at: Utc::now(),
            applied: false,
        };
        self.store.insert_optimization(&optimization).await?;

        tracing::info!(
            user_id = %input.user_id,
            optimization_id = %optimization.optimization_id,
            "schedule finalized"
        );
        Ok(json!({
            "status": "finalized",
            "optimization_id": optimization.optimization_id,
            "efficiency_score": optimization.efficiency_score,
        }))
    }
}

#[async_trait]
impl WorkerLogic for CoordinatorWorker {
    fn descriptor(&self) -> AgentDescriptor {
        AgentDescriptor::new(agents::COORDINATOR, AgentRole::Coordinator, "Coordinator")
    }

    async fn handle(&self, task_type: &str, input: &Value) -> CalendorResult<Value> {
        match task_type {
            "process_mail_data" => {
                self.process_data("mail_data", parse_input(task_type, input)?).await
            }
            "process_calendar_data" => {
                self.process_data("calendar_data", parse_input(task_type, input)?)
                    .await
            }
            "finalize_schedule" => self.finalize_schedule(parse_input(task_type, input)?).await,
            other => Err(CalendorError::Task(format!("unknown task type: {other}"))),
        }
    }
}

/// Observes the whole fleet and reports system-level status.
pub struct OverseerWorker {
    store: Datastore,
}

impl OverseerWorker {
    pub fn new(store: Datastore) -> Self {
        Self { store }
    }

    async fn coordinate_system(&self, input: UserInput) -> CalendorResult<Value> {
        let mut by_role = serde_json::Map::new();
        for role in [
            AgentRole::Mailbox,
            AgentRole::Aggregator,
            AgentRole::Calendar,
            AgentRole::Coordinator,
        ] {
            let statuses = self.store.statuses_by_role(role).await?;
            let entries: Vec<Value> = statuses
                .iter()
                .map(|s| {
                    json!({
                        "agent_id": s.agent_id,
                        "state": s.state,
                        "processed_count": s.processed_count,
                        "error_count": s.error_count,
                        "success_rate": s.success_rate(),
                    })
                })
                .collect();
            by_role.insert(role.to_string(), Value::Array(entries));
        }

        Ok(json!({
            "status": "coordinated",
            "user_id": input.user_id,
            "system_status": by_role,
            "overseer_status": "active",
            "last_coordination": Utc::now(),
        }))
    }
}

#[async_trait]
impl WorkerLogic for OverseerWorker {
    fn descriptor(&self) -> AgentDescriptor {
        AgentDescriptor::new(agents::OVERSEER, AgentRole::Overseer, "Master Coordinator")
    }

    async fn handle(&self, task_type: &str, input: &Value) -> CalendorResult<Value> {
        match task_type {
            "coordinate_system" => self.coordinate_system(parse_input(task_type, input)?).await,
            other => Err(CalendorError::Task(format!("unknown task type: {other}"))),
        }
    }
}
