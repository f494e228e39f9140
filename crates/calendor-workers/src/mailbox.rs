use crate::classifier::classify_message;
use crate::gateway::{summarize_with_retry, MailGateway, Summarizer};
use crate::input::parse_input;
use crate::templates::draft_reply;
use async_trait::async_trait;
use calendor_core::{
    AgentRole, AgentTask, CalendorError, CalendorResult, DraftState, MailCategory, MailContext,
    MailDraft, MailReminder,
};
use calendor_runtime::{agents, AgentDescriptor, TaskDispatcher, WorkerLogic};
use calendor_store::Datastore;
use chrono::{Duration, Utc};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use uuid::Uuid;

#[derive(Debug, Deserialize)]
struct FetchMailInput {
    user_id: String,
    #[serde(default = "default_max_results")]
    max_results: usize,
}

fn default_max_results() -> usize {
    20
}

#[derive(Debug, Deserialize)]
struct MessageRefInput {
    message_id: String,
    user_id: String,
}

#[derive(Debug, Deserialize)]
struct ScheduleReminderInput {
    message_id: String,
    user_id: String,
    #[serde(default = "default_delay_hours")]
    delay_hours: i64,
}

fn default_delay_hours() -> i64 {
    24
}

/// Mail pipeline worker: fetch, classify, draft, remind.
///
/// Each stage fans out the next one through the task queue, so a single
/// `fetch_mail` task unrolls into one `process_message` per new message,
/// a `generate_draft` for every message that warrants a reply, and a
/// `schedule_reminder` per draft.
pub struct MailboxWorker {
    store: Datastore,
    dispatcher: TaskDispatcher,
    gateway: Arc<dyn MailGateway>,
    summarizer: Option<Arc<dyn Summarizer>>,
}

impl MailboxWorker {
    pub fn new(store: Datastore, gateway: Arc<dyn MailGateway>) -> Self {
        let dispatcher = TaskDispatcher::new(store.clone());
        Self {
            store,
            dispatcher,
            gateway,
            summarizer: None,
        }
    }

    /// Attach a summarizer used for meeting preparation notes.
    pub fn with_summarizer(mut self, summarizer: Arc<dyn Summarizer>) -> Self {
        self.summarizer = Some(summarizer);
        self
    }

    async fn fetch_mail(&self, input: FetchMailInput) -> CalendorResult<Value> {
        let messages = self.gateway.fetch_unread(input.max_results).await?;
        let fetched_count = messages.len();

        let mut stored_count = 0;
        for message in messages {
            if self.store.find_message(&message.message_id).await?.is_some() {
                continue;
            }
            self.store.insert_message(&message).await?;
            stored_count += 1;
            self.dispatcher
                .dispatch(
                    AgentTask::new(
                        agents::MAILBOX,
                        "process_message",
                        json!({ "message_id": message.message_id, "user_id": input.user_id }),
                    )
                    .with_priority(3),
                )
                .await?;
        }

        tracing::info!(user_id = %input.user_id, fetched_count, stored_count, "mail fetched");
        Ok(json!({ "fetched_count": fetched_count, "stored_count": stored_count }))
    }

    async fn process_message(&self, input: MessageRefInput) -> CalendorResult<Value> {
        let message = self
            .store
            .find_message(&input.message_id)
            .await?
            .ok_or_else(|| {
                CalendorError::Worker(format!("message not found: {}", input.message_id))
            })?;

        let context = classify_message(&message);
        let requires_response = context.category.requires_response();
        self.store.upsert_context(&context).await?;

        if requires_response {
            self.dispatcher
                .dispatch(
                    AgentTask::new(
                        agents::MAILBOX,
                        "generate_draft",
                        json!({ "message_id": input.message_id, "user_id": input.user_id }),
                    )
                    .with_priority(4),
                )
                .await?;
        }

        Ok(json!({
            "message_id": input.message_id,
            "context": context,
            "requires_response": requires_response,
        }))
    }

    async fn generate_draft(&self, input: MessageRefInput) -> CalendorResult<Value> {
        let message = self
            .store
            .find_message(&input.message_id)
            .await?
            .ok_or_else(|| {
                CalendorError::Worker(format!("message not found: {}", input.message_id))
            })?;
        // A missing context (e.g. the message was fetched before a crash
        // wiped the contexts collection) falls back to the safe default
        // rather than failing the draft.
        let context = match self.store.get_context(&input.message_id).await? {
            Some(context) => context,
            None => {
                let fallback =
                    MailContext::fallback(input.message_id.as_str(), message.snippet.as_str());
                self.store.upsert_context(&fallback).await?;
                fallback
            }
        };
        let category = context.category;

        let mut content = draft_reply(category, &message.subject);
        if category == MailCategory::Meeting {
            if let Some(summarizer) = &self.summarizer {
                let prompt = format!(
                    "Summarize the agenda of this meeting request:\n{}",
                    message.body
                );
                let notes = summarize_with_retry(summarizer.as_ref(), &prompt).await;
                content.push_str("\n\nMeeting preparation notes: ");
                content.push_str(&notes);
            }
        }

        let draft = MailDraft::new(&input.message_id, &input.user_id, content);
        self.store.insert_draft(&draft).await?;

        self.dispatcher
            .dispatch(
                AgentTask::new(
                    agents::MAILBOX,
                    "schedule_reminder",
                    json!({
                        "message_id": input.message_id,
                        "user_id": input.user_id,
                        "delay_hours": 24,
                    }),
                )
                .with_priority(2),
            )
            .await?;

        Ok(json!({
            "message_id": input.message_id,
            "draft_id": draft.draft_id,
            "state": draft.state,
        }))
    }

    async fn schedule_reminder(&self, input: ScheduleReminderInput) -> CalendorResult<Value> {
        if self.store.find_message(&input.message_id).await?.is_none() {
            return Err(CalendorError::Worker(format!(
                "message not found: {}",
                input.message_id
            )));
        }

        let remind_at = Utc::now() + Duration::hours(input.delay_hours);
        let reminder = MailReminder::new(&input.message_id, &input.user_id, remind_at);
        self.store.insert_reminder(&reminder).await?;

        Ok(json!({
            "message_id": input.message_id,
            "reminder_id": reminder.reminder_id,
            "remind_at": remind_at,
        }))
    }

    /// Approve a pending draft and send it as a reply to the original
    /// message.
    ///
    /// On success the draft moves to `sent` and every open reminder for
    /// the message completes. On failure the draft moves to `failed` with
    /// the error recorded, reminders stay active, and the fault surfaces
    /// to the caller.
    pub async fn approve_draft(&self, draft_id: Uuid) -> CalendorResult<Value> {
        let draft = self
            .store
            .get_draft(draft_id)
            .await?
            .ok_or_else(|| CalendorError::Worker(format!("draft not found: {draft_id}")))?;
        let message = self
            .store
            .find_message(&draft.message_id)
            .await?
            .ok_or_else(|| {
                CalendorError::Worker(format!("message not found: {}", draft.message_id))
            })?;

        let subject = format!("Re: {}", message.subject);
        let sent = match self
            .gateway
            .send(&message.sender, &subject, &draft.content, &message.thread_id)
            .await
        {
            Ok(true) => Ok(()),
            Ok(false) => Err(CalendorError::Gateway("provider rejected message".into())),
            Err(error) => Err(error),
        };

        match sent {
            Ok(()) => {
                self.store
                    .patch_draft(
                        draft_id,
                        json!({ "state": DraftState::Sent, "sent_at": Utc::now() }),
                    )
                    .await?;
                let completed = self.store.complete_reminders(&draft.message_id).await?;
                tracing::info!(%draft_id, reminders_completed = completed, "draft sent");
                Ok(json!({ "draft_id": draft_id, "state": DraftState::Sent }))
            }
            Err(error) => {
                self.store
                    .patch_draft(
                        draft_id,
                        json!({ "state": DraftState::Failed, "error": error.to_string() }),
                    )
                    .await?;
                tracing::warn!(%draft_id, %error, "draft send failed");
                Err(error)
            }
        }
    }
}

#[async_trait]
impl WorkerLogic for MailboxWorker {
    fn descriptor(&self) -> AgentDescriptor {
        AgentDescriptor::new(agents::MAILBOX, AgentRole::Mailbox, "Mail Assistant")
    }

    async fn handle(&self, task_type: &str, input: &Value) -> CalendorResult<Value> {
        match task_type {
            "fetch_mail" => self.fetch_mail(parse_input(task_type, input)?).await,
            "process_message" => self.process_message(parse_input(task_type, input)?).await,
            "generate_draft" => self.generate_draft(parse_input(task_type, input)?).await,
            "schedule_reminder" => {
                self.schedule_reminder(parse_input(task_type, input)?).await
            }
            other => Err(CalendorError::Task(format!("unknown task type: {other}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use calendor_core::{MailMessage, ReminderState};
    use calendor_store::MemoryStore;
    use tokio::sync::RwLock;

    /// Gateway over a fixed inbox with a switchable send outcome.
    struct FixedGateway {
        inbox: Vec<MailMessage>,
        accept_sends: bool,
        sent: RwLock<Vec<String>>,
    }

    impl FixedGateway {
        fn new(inbox: Vec<MailMessage>, accept_sends: bool) -> Self {
            Self {
                inbox,
                accept_sends,
                sent: RwLock::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl MailGateway for FixedGateway {
        async fn fetch_unread(&self, limit: usize) -> CalendorResult<Vec<MailMessage>> {
            Ok(self.inbox.iter().take(limit).cloned().collect())
        }

        async fn send(
            &self,
            to: &str,
            _subject: &str,
            _body: &str,
            _thread_ref: &str,
        ) -> CalendorResult<bool> {
            self.sent.write().await.push(to.to_string());
            Ok(self.accept_sends)
        }
    }

    fn message(id: &str, subject: &str, body: &str) -> MailMessage {
        MailMessage {
            message_id: id.into(),
            thread_id: format!("thread-{id}"),
            subject: subject.into(),
            sender: "alice@example.com".into(),
            recipient: "u1@example.com".into(),
            body: body.into(),
            snippet: "snippet".into(),
            timestamp: Utc::now(),
            is_read: false,
            labels: vec![],
        }
    }

    fn store() -> Datastore {
        Datastore::new(Arc::new(MemoryStore::new()))
    }

    #[tokio::test]
    async fn test_fetch_mail_dedups_and_fans_out() {
        let store = store();
        // One of the two inbox items is already stored.
        store.insert_message(&message("m1", "old", "old")).await.unwrap();
        let gateway = Arc::new(FixedGateway::new(
            vec![message("m1", "old", "old"), message("m2", "new", "new")],
            true,
        ));
        let worker = MailboxWorker::new(store.clone(), gateway);

        let output = worker
            .handle("fetch_mail", &json!({"user_id": "u1"}))
            .await
            .unwrap();
        assert_eq!(output["fetched_count"], 2);
        assert_eq!(output["stored_count"], 1);

        let pending = store.pending_tasks(agents::MAILBOX).await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].task_type, "process_message");
        assert_eq!(pending[0].input["message_id"], "m2");
        assert_eq!(pending[0].priority, 3);
    }

    #[tokio::test]
    async fn test_process_message_classifies_and_chains_draft() {
        let store = store();
        store
            .insert_message(&message("m1", "Team meeting", "please confirm the schedule"))
            .await
            .unwrap();
        let worker = MailboxWorker::new(store.clone(), Arc::new(FixedGateway::new(vec![], true)));

        let output = worker
            .handle(
                "process_message",
                &json!({"message_id": "m1", "user_id": "u1"}),
            )
            .await
            .unwrap();
        assert_eq!(output["requires_response"], true);

        let context = store.get_context("m1").await.unwrap().unwrap();
        assert_eq!(context.category, MailCategory::Meeting);

        let pending = store.pending_tasks(agents::MAILBOX).await.unwrap();
        assert_eq!(pending[0].task_type, "generate_draft");
        assert_eq!(pending[0].priority, 4);
    }

    #[tokio::test]
    async fn test_informational_message_gets_no_draft() {
        let store = store();
        store
            .insert_message(&message("m1", "Weekly digest", "fyi only"))
            .await
            .unwrap();
        let worker = MailboxWorker::new(store.clone(), Arc::new(FixedGateway::new(vec![], true)));

        let output = worker
            .handle(
                "process_message",
                &json!({"message_id": "m1", "user_id": "u1"}),
            )
            .await
            .unwrap();
        assert_eq!(output["requires_response"], false);
        assert!(store.pending_tasks(agents::MAILBOX).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_generate_draft_uses_category_template() {
        let store = store();
        store
            .insert_message(&message("m1", "Task list", "todo items attached"))
            .await
            .unwrap();
        let worker = MailboxWorker::new(store.clone(), Arc::new(FixedGateway::new(vec![], true)));
        worker
            .handle(
                "process_message",
                &json!({"message_id": "m1", "user_id": "u1"}),
            )
            .await
            .unwrap();

        worker
            .handle(
                "generate_draft",
                &json!({"message_id": "m1", "user_id": "u1"}),
            )
            .await
            .unwrap();

        let drafts = store.drafts_for_user("u1", None).await.unwrap();
        assert_eq!(drafts.len(), 1);
        assert_eq!(drafts[0].state, DraftState::Pending);
        assert!(drafts[0].content.contains("'Task list'"));
        assert!(drafts[0].content.contains("task requirements"));

        // The draft chains a 24h reminder task at low priority.
        let pending = store.pending_tasks(agents::MAILBOX).await.unwrap();
        let reminder = pending
            .iter()
            .find(|t| t.task_type == "schedule_reminder")
            .unwrap();
        assert_eq!(reminder.priority, 2);
        assert_eq!(reminder.input["delay_hours"], 24);
    }

    #[tokio::test]
    async fn test_generate_draft_without_context_falls_back() {
        let store = store();
        store
            .insert_message(&message("m1", "Untriaged note", "body"))
            .await
            .unwrap();
        let worker = MailboxWorker::new(store.clone(), Arc::new(FixedGateway::new(vec![], true)));

        // No classification ran for this message, so no context exists.
        worker
            .handle(
                "generate_draft",
                &json!({"message_id": "m1", "user_id": "u1"}),
            )
            .await
            .unwrap();

        let drafts = store.drafts_for_user("u1", None).await.unwrap();
        assert_eq!(drafts.len(), 1);
        // The information-category template is the safe default.
        assert!(drafts[0].content.contains("received your message"));

        let context = store.get_context("m1").await.unwrap().unwrap();
        assert_eq!(context.category, MailCategory::Information);
        assert_eq!(context.key_points, vec!["snippet".to_string()]);
    }

    #[tokio::test]
    async fn test_schedule_reminder_uses_delay() {
        let store = store();
        store
            .insert_message(&message("m1", "s", "b"))
            .await
            .unwrap();
        let worker = MailboxWorker::new(store.clone(), Arc::new(FixedGateway::new(vec![], true)));

        let before = Utc::now();
        worker
            .handle(
                "schedule_reminder",
                &json!({"message_id": "m1", "user_id": "u1", "delay_hours": 48}),
            )
            .await
            .unwrap();

        let reminders = store.active_reminders("m1").await.unwrap();
        assert_eq!(reminders.len(), 1);
        assert!(reminders[0].remind_at >= before + Duration::hours(48));
        assert_eq!(reminders[0].state, ReminderState::Active);
    }

    #[tokio::test]
    async fn test_approve_draft_sends_and_completes_reminders() {
        let store = store();
        let msg = message("m1", "Team meeting", "body");
        store.insert_message(&msg).await.unwrap();
        let draft = MailDraft::new("m1", "u1", "Reply content");
        store.insert_draft(&draft).await.unwrap();
        store
            .insert_reminder(&MailReminder::new("m1", "u1", Utc::now()))
            .await
            .unwrap();

        let gateway = Arc::new(FixedGateway::new(vec![], true));
        let worker = MailboxWorker::new(store.clone(), Arc::clone(&gateway) as Arc<dyn MailGateway>);
        worker.approve_draft(draft.draft_id).await.unwrap();

        let sent = store.get_draft(draft.draft_id).await.unwrap().unwrap();
        assert_eq!(sent.state, DraftState::Sent);
        assert!(sent.sent_at.is_some());
        assert!(store.active_reminders("m1").await.unwrap().is_empty());
        assert_eq!(gateway.sent.read().await.as_slice(), ["alice@example.com"]);
    }

    #[tokio::test]
    async fn test_approve_draft_send_failure_marks_failed() {
        let store = store();
        store.insert_message(&message("m1", "s", "b")).await.unwrap();
        let draft = MailDraft::new("m1", "u1", "Reply content");
        store.insert_draft(&draft).await.unwrap();
        store
            .insert_reminder(&MailReminder::new("m1", "u1", Utc::now()))
            .await
            .unwrap();

        let worker = MailboxWorker::new(store.clone(), Arc::new(FixedGateway::new(vec![], false)));
        assert!(worker.approve_draft(draft.draft_id).await.is_err());

        let failed = store.get_draft(draft.draft_id).await.unwrap().unwrap();
        assert_eq!(failed.state, DraftState::Failed);
        assert!(failed.error.is_some());
        // Reminders stay active when the send fails.
        assert_eq!(store.active_reminders("m1").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_unknown_task_type_rejected() {
        let store = store();
        let worker = MailboxWorker::new(store, Arc::new(FixedGateway::new(vec![], true)));
        let result = worker.handle("mystery", &json!({})).await;
        assert!(matches!(result, Err(CalendorError::Task(_))));
    }

    #[tokio::test]
    async fn test_missing_required_field_rejected() {
        let store = store();
        let worker = MailboxWorker::new(store, Arc::new(FixedGateway::new(vec![], true)));
        let result = worker
            .handle("process_message", &json!({"user_id": "u1"}))
            .await;
        assert!(matches!(result, Err(CalendorError::Task(_))));
    }

    #[tokio::test]
    async fn test_process_missing_message_fails() {
        // The classifier itself never fails; a deleted message is the one
        // fault path.
        let store = store();
        let worker = MailboxWorker::new(store, Arc::new(FixedGateway::new(vec![], true)));
        let result = worker
            .handle(
                "process_message",
                &json!({"message_id": "ghost", "user_id": "u1"}),
            )
            .await;
        assert!(matches!(result, Err(CalendorError::Worker(_))));
    }
}
