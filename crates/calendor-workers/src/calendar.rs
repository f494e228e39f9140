use crate::input::parse_input;
use async_trait::async_trait;
use calendor_conflict::{ConflictDetector, EventSpan};
use calendor_core::{AgentRole, AgentTask, CalendorError, CalendorResult};
use calendor_runtime::{agents, AgentDescriptor, TaskDispatcher, WorkerLogic};
use calendor_store::Datastore;
use chrono::{Duration, Utc};
use serde::Deserialize;
use serde_json::{json, Value};

#[derive(Debug, Deserialize)]
struct FetchCalendarInput {
    user_id: String,
    #[serde(default = "default_fetch_days")]
    days_ahead: i64,
}

fn default_fetch_days() -> i64 {
    30
}

#[derive(Debug, Deserialize)]
struct DetectConflictsInput {
    user_id: String,
    #[serde(default = "default_detect_days")]
    days_ahead: i64,
}

fn default_detect_days() -> i64 {
    7
}

/// Provides upcoming calendar data and runs conflict detection over it.
pub struct CalendarWorker {
    store: Datastore,
    dispatcher: TaskDispatcher,
    detector: ConflictDetector,
}

impl CalendarWorker {
    pub fn new(store: Datastore, detector: ConflictDetector) -> Self {
        let dispatcher = TaskDispatcher::new(store.clone());
        Self {
            store,
            dispatcher,
            detector,
        }
    }

    async fn fetch_calendar_data(&self, input: FetchCalendarInput) -> CalendorResult<Value> {
        let from = Utc::now();
        let to = from + Duration::days(input.days_ahead);
        let events = self.store.events_between(from, to).await?;

        let calendar_data: Vec<Value> = events
            .iter()
            .map(|event| {
                json!({
                    "event_id": event.event_id,
                    "title": event.title,
                    "start": event.start,
                    "end": event.end,
                    "duration_minutes": event.duration_minutes(),
                    "attendees": event.attendees,
                    "description": event.description,
                })
            })
            .collect();

        self.dispatcher
            .dispatch(
                AgentTask::new(
                    agents::COORDINATOR,
                    "process_calendar_data",
                    json!({
                        "user_id": input.user_id,
                        "calendar_data": calendar_data,
                        "source": agents::CALENDAR,
                    }),
                )
                .with_priority(3),
            )
            .await?;

        tracing::info!(
            user_id = %input.user_id,
            events_count = events.len(),
            days_ahead = input.days_ahead,
            "calendar data fetched"
        );
        Ok(json!({
            "user_id": input.user_id,
            "events_count": events.len(),
            "calendar_data": calendar_data,
        }))
    }

    async fn detect_conflicts(&self, input: DetectConflictsInput) -> CalendorResult<Value> {
        let from = Utc::now();
        let to = from + Duration::days(input.days_ahead);
        let events = self.store.events_between(from, to).await?;
        let spans: Vec<EventSpan> = events.iter().map(EventSpan::from).collect();

        let conflicts = self.detector.detect(&spans, &input.user_id);
        for conflict in &conflicts {
            // Deterministic ids keep re-runs idempotent.
            self.store
                .upsert_conflict(&conflict.conflict_id, serde_json::to_value(conflict)?)
                .await?;
        }

        tracing::info!(
            user_id = %input.user_id,
            conflict_count = conflicts.len(),
            "conflict detection run"
        );
        Ok(json!({
            "user_id": input.user_id,
            "events_count": events.len(),
            "conflict_count": conflicts.len(),
            "conflicts": conflicts,
        }))
    }
}

#[async_trait]
impl WorkerLogic for CalendarWorker {
    fn descriptor(&self) -> AgentDescriptor {
        AgentDescriptor::new(agents::CALENDAR, AgentRole::Calendar, "Calendar Data Provider")
    }

    async fn handle(&self, task_type: &str, input: &Value) -> CalendorResult<Value> {
        match task_type {
            "fetch_calendar_data" => {
                self.fetch_calendar_data(parse_input(task_type, input)?).await
            }
            "detect_conflicts" => self.detect_conflicts(parse_input(task_type, input)?).await,
            other => Err(CalendorError::Task(format!("unknown task type: {other}"))),
        }
    }
}
