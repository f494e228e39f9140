use crate::filter::{Filter, SortKey};
use crate::store::DocumentStore;
use calendor_core::{
    AgentRole, AgentStatusRecord, AgentTask, CalendarEvent, CalendorResult, CoordinationRecord,
    DraftState, MailContext, MailDraft, MailMessage, MailReminder, ScheduleOptimization,
    TaskState,
};
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use uuid::Uuid;

/// Collection names used across the backend.
pub mod collections {
    pub const TASKS: &str = "agent_tasks";
    pub const AGENT_STATUS: &str = "agent_status";
    pub const COORDINATION: &str = "coordination";
    pub const COORDINATION_DATA: &str = "coordination_data";
    pub const MESSAGES: &str = "mail_messages";
    pub const CONTEXTS: &str = "mail_contexts";
    pub const DRAFTS: &str = "mail_drafts";
    pub const REMINDERS: &str = "mail_reminders";
    pub const EVENTS: &str = "events";
    pub const CONFLICTS: &str = "conflicts";
    pub const OPTIMIZATIONS: &str = "schedule_optimizations";
}

/// Typed facade over a [`DocumentStore`].
///
/// All serde between domain records and raw documents happens here; the
/// only payloads that stay opaque are task inputs/outputs, which each
/// worker deserializes at its own boundary.
#[derive(Clone)]
pub struct Datastore {
    inner: Arc<dyn DocumentStore>,
}

fn to_doc<T: Serialize>(record: &T) -> CalendorResult<Value> {
    Ok(serde_json::to_value(record)?)
}

fn from_doc<T: DeserializeOwned>(doc: Value) -> CalendorResult<T> {
    Ok(serde_json::from_value(doc)?)
}

fn from_docs<T: DeserializeOwned>(docs: Vec<Value>) -> CalendorResult<Vec<T>> {
    docs.into_iter().map(from_doc).collect()
}

impl Datastore {
    pub fn new(inner: Arc<dyn DocumentStore>) -> Self {
        Self { inner }
    }

    /// Access the underlying schema-less store.
    pub fn raw(&self) -> &Arc<dyn DocumentStore> {
        &self.inner
    }

    /// Replace-or-insert a document identified by a key field.
    pub async fn upsert_keyed(
        &self,
        collection: &str,
        key_field: &str,
        key: &str,
        doc: Value,
    ) -> CalendorResult<()> {
        let filter = Filter::new().eq(key_field, key);
        if !self.inner.update_one(collection, &filter, doc.clone()).await? {
            self.inner.insert(collection, doc).await?;
        }
        Ok(())
    }

    // --- Tasks ---

    pub async fn insert_task(&self, task: &AgentTask) -> CalendorResult<()> {
        self.inner.insert(collections::TASKS, to_doc(task)?).await
    }

    pub async fn get_task(&self, task_id: Uuid) -> CalendorResult<Option<AgentTask>> {
        let filter = Filter::new().eq("task_id", task_id.to_string());
        match self.inner.find_one(collections::TASKS, &filter).await? {
            Some(doc) => Ok(Some(from_doc(doc)?)),
            None => Ok(None),
        }
    }

    /// Pending tasks for one agent: priority descending, then creation time
    /// ascending. Ties beyond both keys keep store order.
    pub async fn pending_tasks(&self, agent_id: &str) -> CalendorResult<Vec<AgentTask>> {
        let filter = Filter::new()
            .eq("agent_id", agent_id)
            .eq("state", "pending");
        let docs = self
            .inner
            .find(
                collections::TASKS,
                &filter,
                &[SortKey::desc("priority"), SortKey::asc("created_at")],
                None,
            )
            .await?;
        from_docs(docs)
    }

    /// Merge fields into the task document identified by id.
    pub async fn patch_task(&self, task_id: Uuid, patch: Value) -> CalendorResult<bool> {
        let filter = Filter::new().eq("task_id", task_id.to_string());
        self.inner.update_one(collections::TASKS, &filter, patch).await
    }

    /// Ids of all completed tasks, across every agent. Used for dependency
    /// gating; dependencies may point at another agent's tasks.
    pub async fn completed_task_ids(&self) -> CalendorResult<Vec<Uuid>> {
        let filter = Filter::new().eq("state", "completed");
        let docs = self.inner.find(collections::TASKS, &filter, &[], None).await?;
        Ok(docs
            .iter()
            .filter_map(|d| d.get("task_id").and_then(Value::as_str))
            .filter_map(|s| Uuid::parse_str(s).ok())
            .collect())
    }

    /// Tasks addressed to the given agents and created at or after `since`,
    /// newest first. Used to derive workflow progress.
    pub async fn tasks_since(
        &self,
        agent_ids: &[String],
        since: DateTime<Utc>,
    ) -> CalendorResult<Vec<AgentTask>> {
        let ids = agent_ids.iter().map(|id| Value::from(id.as_str())).collect();
        let filter = Filter::new()
            .is_in("agent_id", ids)
            .gte("created_at", serde_json::to_value(since)?);
        let docs = self
            .inner
            .find(collections::TASKS, &filter, &[SortKey::desc("created_at")], None)
            .await?;
        from_docs(docs)
    }

    /// Full task audit log. Used for fleet metrics.
    pub async fn all_tasks(&self) -> CalendorResult<Vec<AgentTask>> {
        let docs = self
            .inner
            .find(collections::TASKS, &Filter::new(), &[], None)
            .await?;
        from_docs(docs)
    }

    pub async fn count_tasks(&self, agent_id: &str, state: TaskState) -> CalendorResult<usize> {
        let filter = Filter::new()
            .eq("agent_id", agent_id)
            .eq("state", serde_json::to_value(state)?);
        self.inner.count(collections::TASKS, &filter).await
    }

    // --- Agent status ---

    pub async fn upsert_status(&self, status: &AgentStatusRecord) -> CalendorResult<()> {
        self.upsert_keyed(
            collections::AGENT_STATUS,
            "agent_id",
            &status.agent_id,
            to_doc(status)?,
        )
        .await
    }

    pub async fn get_status(&self, agent_id: &str) -> CalendorResult<Option<AgentStatusRecord>> {
        let filter = Filter::new().eq("agent_id", agent_id);
        match self.inner.find_one(collections::AGENT_STATUS, &filter).await? {
            Some(doc) => Ok(Some(from_doc(doc)?)),
            None => Ok(None),
        }
    }

    pub async fn statuses_by_role(&self, role: AgentRole) -> CalendorResult<Vec<AgentStatusRecord>> {
        let filter = Filter::new().eq("role", serde_json::to_value(role)?);
        let docs = self
            .inner
            .find(collections::AGENT_STATUS, &filter, &[], None)
            .await?;
        from_docs(docs)
    }

    pub async fn all_statuses(&self) -> CalendorResult<Vec<AgentStatusRecord>> {
        let docs = self
            .inner
            .find(
                collections::AGENT_STATUS,
                &Filter::new(),
                &[SortKey::desc("last_activity")],
                None,
            )
            .await?;
        from_docs(docs)
    }

    // --- Coordination ---

    pub async fn insert_coordination(&self, record: &CoordinationRecord) -> CalendorResult<()> {
        self.inner
            .insert(collections::COORDINATION, to_doc(record)?)
            .await
    }

    pub async fn get_coordination(
        &self,
        coordination_id: &str,
    ) -> CalendorResult<Option<CoordinationRecord>> {
        let filter = Filter::new().eq("coordination_id", coordination_id);
        match self.inner.find_one(collections::COORDINATION, &filter).await? {
            Some(doc) => Ok(Some(from_doc(doc)?)),
            None => Ok(None),
        }
    }

    pub async fn patch_coordination(
        &self,
        coordination_id: &str,
        patch: Value,
    ) -> CalendorResult<bool> {
        let filter = Filter::new().eq("coordination_id", coordination_id);
        self.inner
            .update_one(collections::COORDINATION, &filter, patch)
            .await
    }

    /// Append a stage-data entry written by the coordinator worker.
    pub async fn insert_coordination_data(&self, entry: Value) -> CalendorResult<()> {
        self.inner.insert(collections::COORDINATION_DATA, entry).await
    }

    // --- Mail ---

    pub async fn insert_message(&self, message: &MailMessage) -> CalendorResult<()> {
        self.inner.insert(collections::MESSAGES, to_doc(message)?).await
    }

    pub async fn find_message(&self, message_id: &str) -> CalendorResult<Option<MailMessage>> {
        let filter = Filter::new().eq("message_id", message_id);
        match self.inner.find_one(collections::MESSAGES, &filter).await? {
            Some(doc) => Ok(Some(from_doc(doc)?)),
            None => Ok(None),
        }
    }

    /// Messages whose recipient field contains the user id (case-insensitive).
    pub async fn messages_for_recipient(&self, user_id: &str) -> CalendorResult<Vec<MailMessage>> {
        let filter = Filter::new().contains_ci("recipient", user_id);
        let docs = self.inner.find(collections::MESSAGES, &filter, &[], None).await?;
        from_docs(docs)
    }

    pub async fn upsert_context(&self, context: &MailContext) -> CalendorResult<()> {
        self.upsert_keyed(
            collections::CONTEXTS,
            "message_id",
            &context.message_id,
            to_doc(context)?,
        )
        .await
    }

    pub async fn get_context(&self, message_id: &str) -> CalendorResult<Option<MailContext>> {
        let filter = Filter::new().eq("message_id", message_id);
        match self.inner.find_one(collections::CONTEXTS, &filter).await? {
            Some(doc) => Ok(Some(from_doc(doc)?)),
            None => Ok(None),
        }
    }

    pub async fn all_contexts(&self) -> CalendorResult<Vec<MailContext>> {
        let docs = self
            .inner
            .find(collections::CONTEXTS, &Filter::new(), &[], None)
            .await?;
        from_docs(docs)
    }

    pub async fn insert_draft(&self, draft: &MailDraft) -> CalendorResult<()> {
        self.inner.insert(collections::DRAFTS, to_doc(draft)?).await
    }

    pub async fn get_draft(&self, draft_id: Uuid) -> CalendorResult<Option<MailDraft>> {
        let filter = Filter::new().eq("draft_id", draft_id.to_string());
        match self.inner.find_one(collections::DRAFTS, &filter).await? {
            Some(doc) => Ok(Some(from_doc(doc)?)),
            None => Ok(None),
        }
    }

    pub async fn drafts_for_user(
        &self,
        user_id: &str,
        state: Option<DraftState>,
    ) -> CalendorResult<Vec<MailDraft>> {
        let mut filter = Filter::new().eq("user_id", user_id);
        if let Some(state) = state {
            filter = filter.eq("state", serde_json::to_value(state)?);
        }
        let docs = self
            .inner
            .find(
                collections::DRAFTS,
                &filter,
                &[SortKey::desc("generated_at")],
                None,
            )
            .await?;
        from_docs(docs)
    }

    pub async fn patch_draft(&self, draft_id: Uuid, patch: Value) -> CalendorResult<bool> {
        let filter = Filter::new().eq("draft_id", draft_id.to_string());
        self.inner.update_one(collections::DRAFTS, &filter, patch).await
    }

    pub async fn insert_reminder(&self, reminder: &MailReminder) -> CalendorResult<()> {
        self.inner.insert(collections::REMINDERS, to_doc(reminder)?).await
    }

    /// Mark every open reminder for a message as completed.
    pub async fn complete_reminders(&self, message_id: &str) -> CalendorResult<u64> {
        let filter = Filter::new()
            .eq("message_id", message_id)
            .eq("state", "active");
        self.inner
            .update_many(
                collections::REMINDERS,
                &filter,
                serde_json::json!({"state": "completed"}),
            )
            .await
    }

    pub async fn active_reminders(&self, message_id: &str) -> CalendorResult<Vec<MailReminder>> {
        let filter = Filter::new()
            .eq("message_id", message_id)
            .eq("state", "active");
        let docs = self.inner.find(collections::REMINDERS, &filter, &[], None).await?;
        from_docs(docs)
    }

    // --- Calendar ---

    pub async fn insert_event(&self, event: &CalendarEvent) -> CalendorResult<()> {
        self.inner.insert(collections::EVENTS, to_doc(event)?).await
    }

    /// Events starting within `[from, to]`, ascending by start time.
    pub async fn events_between(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> CalendorResult<Vec<CalendarEvent>> {
        let filter = Filter::new()
            .gte("start", serde_json::to_value(from)?)
            .lte("start", serde_json::to_value(to)?);
        let docs = self
            .inner
            .find(collections::EVENTS, &filter, &[SortKey::asc("start")], None)
            .await?;
        from_docs(docs)
    }

    // --- Conflicts & optimizations ---

    /// Replace-or-insert a conflict document by its deterministic id, so
    /// repeated detection runs stay idempotent.
    pub async fn upsert_conflict(&self, conflict_id: &str, doc: Value) -> CalendorResult<()> {
        self.upsert_keyed(collections::CONFLICTS, "conflict_id", conflict_id, doc)
            .await
    }

    pub async fn conflicts_for_user(&self, user_id: &str) -> CalendorResult<Vec<Value>> {
        let filter = Filter::new().eq("user_id", user_id);
        self.inner.find(collections::CONFLICTS, &filter, &[], None).await
    }

    pub async fn insert_optimization(
        &self,
        optimization: &ScheduleOptimization,
    ) -> CalendorResult<()> {
        self.inner
            .insert(collections::OPTIMIZATIONS, to_doc(optimization)?)
            .await
    }
}
