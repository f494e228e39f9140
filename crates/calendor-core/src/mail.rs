use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A fetched mail item, keyed by the provider's message id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MailMessage {
    pub message_id: String,
    pub thread_id: String,
    pub subject: String,
    pub sender: String,
    pub recipient: String,
    pub body: String,
    pub snippet: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub is_read: bool,
    #[serde(default)]
    pub labels: Vec<String>,
}

/// Sentiment assigned by the keyword classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Negative,
    Positive,
    Neutral,
}

/// Priority assigned by the keyword classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MailPriority {
    Urgent,
    High,
    Medium,
    Low,
}

/// Category assigned by the keyword classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MailCategory {
    Meeting,
    Task,
    Question,
    Complaint,
    Information,
}

impl MailCategory {
    /// Categories that warrant an automatic reply draft.
    pub fn requires_response(self) -> bool {
        matches!(
            self,
            MailCategory::Meeting | MailCategory::Task | MailCategory::Question
        )
    }
}

/// Structured context derived from one mail message, upserted by message id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MailContext {
    pub message_id: String,
    pub sentiment: Sentiment,
    pub priority: MailPriority,
    pub category: MailCategory,
    #[serde(default)]
    pub key_points: Vec<String>,
    #[serde(default)]
    pub suggested_actions: Vec<String>,
}

impl MailContext {
    /// The safe default context used when classification cannot complete.
    pub fn fallback(message_id: impl Into<String>, snippet: impl Into<String>) -> Self {
        Self {
            message_id: message_id.into(),
            sentiment: Sentiment::Neutral,
            priority: MailPriority::Medium,
            category: MailCategory::Information,
            key_points: vec![snippet.into()],
            suggested_actions: vec!["Review and respond if necessary".to_string()],
        }
    }
}

/// Approval state of a generated reply draft.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DraftState {
    Pending,
    Sent,
    Rejected,
    Failed,
}

/// A template-generated reply awaiting user approval.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MailDraft {
    pub draft_id: Uuid,
    pub message_id: String,
    pub user_id: String,
    pub content: String,
    pub generated_at: DateTime<Utc>,
    pub state: DraftState,
    pub sent_at: Option<DateTime<Utc>>,
    pub error: Option<String>,
}

impl MailDraft {
    pub fn new(
        message_id: impl Into<String>,
        user_id: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            draft_id: Uuid::new_v4(),
            message_id: message_id.into(),
            user_id: user_id.into(),
            content: content.into(),
            generated_at: Utc::now(),
            state: DraftState::Pending,
            sent_at: None,
            error: None,
        }
    }
}

/// State of a follow-up reminder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReminderState {
    Active,
    Completed,
    Cancelled,
}

/// A reminder to reply to a message if no response has gone out.
///
/// No calendar entry is created for it; wiring reminders into a real
/// calendar backend is out of scope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MailReminder {
    pub reminder_id: Uuid,
    pub message_id: String,
    pub user_id: String,
    pub remind_at: DateTime<Utc>,
    pub state: ReminderState,
    pub created_at: DateTime<Utc>,
}

impl MailReminder {
    pub fn new(
        message_id: impl Into<String>,
        user_id: impl Into<String>,
        remind_at: DateTime<Utc>,
    ) -> Self {
        Self {
            reminder_id: Uuid::new_v4(),
            message_id: message_id.into(),
            user_id: user_id.into(),
            remind_at,
            state: ReminderState::Active,
            created_at: Utc::now(),
        }
    }
}
