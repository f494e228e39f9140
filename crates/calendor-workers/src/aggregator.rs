use crate::input::parse_input;
use async_trait::async_trait;
use calendor_core::{
    AgentRole, AgentTask, CalendorError, CalendorResult, MailCategory, MailContext, MailDraft,
    MailMessage, MailPriority,
};
use calendor_runtime::{agents, AgentDescriptor, TaskDispatcher, WorkerLogic};
use calendor_store::Datastore;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::HashMap;

#[derive(Debug, Deserialize)]
struct AggregateInput {
    user_id: String,
}

#[derive(Debug, Deserialize)]
struct FilterInput {
    user_id: String,
    #[serde(default)]
    items: Vec<AggregatedItem>,
}

/// One message joined with its pipeline artifacts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregatedItem {
    pub message: MailMessage,
    pub context: Option<MailContext>,
    pub draft: Option<MailDraft>,
}

impl AggregatedItem {
    /// Whether the item survives the relevance filter: high or urgent
    /// priority, an actionable category, or still unread.
    fn is_relevant(&self) -> bool {
        if !self.message.is_read {
            return true;
        }
        match &self.context {
            Some(ctx) => {
                matches!(ctx.priority, MailPriority::High | MailPriority::Urgent)
                    || matches!(ctx.category, MailCategory::Meeting | MailCategory::Task)
            }
            None => false,
        }
    }
}

/// Joins mail records across pipeline stages and filters them down to the
/// set the coordinator should see.
pub struct AggregatorWorker {
    store: Datastore,
    dispatcher: TaskDispatcher,
}

impl AggregatorWorker {
    pub fn new(store: Datastore) -> Self {
        let dispatcher = TaskDispatcher::new(store.clone());
        Self { store, dispatcher }
    }

    async fn aggregate_mail_data(&self, input: AggregateInput) -> CalendorResult<Value> {
        let messages = self.store.messages_for_recipient(&input.user_id).await?;
        let contexts: HashMap<String, MailContext> = self
            .store
            .all_contexts()
            .await?
            .into_iter()
            .map(|ctx| (ctx.message_id.clone(), ctx))
            .collect();
        let drafts: HashMap<String, MailDraft> = self
            .store
            .drafts_for_user(&input.user_id, None)
            .await?
            .into_iter()
            .map(|draft| (draft.message_id.clone(), draft))
            .collect();

        let items: Vec<AggregatedItem> = messages
            .into_iter()
            .map(|message| {
                let context = contexts.get(&message.message_id).cloned();
                let draft = drafts.get(&message.message_id).cloned();
                AggregatedItem {
                    message,
                    context,
                    draft,
                }
            })
            .collect();

        tracing::info!(user_id = %input.user_id, total = items.len(), "mail data aggregated");
        Ok(json!({
            "user_id": input.user_id,
            "total_messages": items.len(),
            "items": items,
            "aggregated_at": Utc::now(),
        }))
    }

    async fn filter_mail_data(&self, input: FilterInput) -> CalendorResult<Value> {
        let filtered: Vec<AggregatedItem> = input
            .items
            .into_iter()
            .filter(AggregatedItem::is_relevant)
            .collect();

        self.dispatcher
            .dispatch(
                AgentTask::new(
                    agents::COORDINATOR,
                    "process_mail_data",
                    json!({
                        "user_id": input.user_id,
                        "items": filtered,
                        "source": agents::AGGREGATOR,
                    }),
                )
                .with_priority(3),
            )
            .await?;

        Ok(json!({
            "user_id": input.user_id,
            "filtered_count": filtered.len(),
            "items": filtered,
        }))
    }
}

#[async_trait]
impl WorkerLogic for AggregatorWorker {
    fn descriptor(&self) -> AgentDescriptor {
        AgentDescriptor::new(agents::AGGREGATOR, AgentRole::Aggregator, "Mail Data Aggregator")
    }

    async fn handle(&self, task_type: &str, input: &Value) -> CalendorResult<Value> {
        match task_type {
            "aggregate_mail_data" => {
                self.aggregate_mail_data(parse_input(task_type, input)?).await
            }
            "filter_mail_data" => self.filter_mail_data(parse_input(task_type, input)?).await,
            other => Err(CalendorError::Task(format!("unknown task type: {other}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use calendor_core::Sentiment;
    use calendor_store::MemoryStore;
    use std::sync::Arc;

    fn message(id: &str, is_read: bool) -> MailMessage {
        MailMessage {
            message_id: id.into(),
            thread_id: format!("thread-{id}"),
            subject: "subject".into(),
            sender: "alice@example.com".into(),
            recipient: "u1@example.com".into(),
            body: "body".into(),
            snippet: "snippet".into(),
            timestamp: Utc::now(),
            is_read,
            labels: vec![],
        }
    }

    fn context(id: &str, priority: MailPriority, category: MailCategory) -> MailContext {
        MailContext {
            message_id: id.into(),
            sentiment: Sentiment::Neutral,
            priority,
            category,
            key_points: vec![],
            suggested_actions: vec![],
        }
    }

    fn item(
        id: &str,
        is_read: bool,
        ctx: Option<(MailPriority, MailCategory)>,
    ) -> AggregatedItem {
        AggregatedItem {
            message: message(id, is_read),
            context: ctx.map(|(p, c)| context(id, p, c)),
            draft: None,
        }
    }

    #[tokio::test]
    async fn test_aggregate_joins_by_message_id() {
        let store = Datastore::new(Arc::new(MemoryStore::new()));
        store.insert_message(&message("m1", true)).await.unwrap();
        store.insert_message(&message("m2", false)).await.unwrap();
        store
            .upsert_context(&context("m1", MailPriority::High, MailCategory::Meeting))
            .await
            .unwrap();
        store
            .insert_draft(&MailDraft::new("m1", "u1", "draft"))
            .await
            .unwrap();

        let worker = AggregatorWorker::new(store);
        let output = worker
            .handle("aggregate_mail_data", &json!({"user_id": "u1"}))
            .await
            .unwrap();
        assert_eq!(output["total_messages"], 2);

        let items: Vec<AggregatedItem> =
            serde_json::from_value(output["items"].clone()).unwrap();
        let m1 = items.iter().find(|i| i.message.message_id == "m1").unwrap();
        assert!(m1.context.is_some());
        assert!(m1.draft.is_some());
        let m2 = items.iter().find(|i| i.message.message_id == "m2").unwrap();
        assert!(m2.context.is_none());
        assert!(m2.draft.is_none());
    }

    #[tokio::test]
    async fn test_filter_keeps_relevant_items_only() {
        let store = Datastore::new(Arc::new(MemoryStore::new()));
        let worker = AggregatorWorker::new(store.clone());

        let items = vec![
            // Kept: urgent priority.
            item("m1", true, Some((MailPriority::Urgent, MailCategory::Information))),
            // Kept: meeting category.
            item("m2", true, Some((MailPriority::Low, MailCategory::Meeting))),
            // Kept: unread.
            item("m3", false, None),
            // Dropped: read, low priority, informational.
            item("m4", true, Some((MailPriority::Low, MailCategory::Information))),
            // Dropped: read with no context.
            item("m5", true, None),
        ];
        let output = worker
            .handle(
                "filter_mail_data",
                &json!({"user_id": "u1", "items": items}),
            )
            .await
            .unwrap();
        assert_eq!(output["filtered_count"], 3);

        // The filtered set is forwarded to the coordinator.
        let pending = store.pending_tasks(agents::COORDINATOR).await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].task_type, "process_mail_data");
        assert_eq!(pending[0].priority, 3);
        assert_eq!(pending[0].input["items"].as_array().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_unknown_task_type_rejected() {
        let store = Datastore::new(Arc::new(MemoryStore::new()));
        let worker = AggregatorWorker::new(store);
        assert!(matches!(
            worker.handle("mystery", &json!({})).await,
            Err(CalendorError::Task(_))
        ));
    }
}
