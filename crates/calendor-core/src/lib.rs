//! Core types and error definitions for the Calendor assistant backend.
//!
//! This crate provides the foundational types shared across all Calendor
//! crates: the unified error enum, the agent/task data model, workflow
//! coordination records, and the mail/calendar domain records.
//!
//! # Main types
//!
//! - [`CalendorError`] — Unified error enum for all Calendor subsystems.
//! - [`CalendorResult`] — Convenience alias for `Result<T, CalendorError>`.
//! - [`AgentRole`] / [`AgentLifecycle`] / [`AgentStatusRecord`] — agent identity and health.
//! - [`AgentTask`] / [`TaskState`] — one unit of work addressed to an agent.
//! - [`CoordinationRecord`] / [`WorkflowKind`] — multi-agent workflow audit entries.

pub mod agent;
pub mod calendar;
pub mod coordination;
pub mod mail;
pub mod task;

pub use agent::{AgentLifecycle, AgentRole, AgentStatusRecord};
pub use calendar::CalendarEvent;
pub use coordination::{CoordinationRecord, ScheduleOptimization, WorkflowKind, WorkflowState};
pub use mail::{
    DraftState, MailCategory, MailContext, MailDraft, MailMessage, MailPriority, MailReminder,
    ReminderState, Sentiment,
};
pub use task::{AgentTask, TaskState};

/// Top-level error type for the Calendor backend.
///
/// Each variant corresponds to a subsystem that can produce errors.
#[derive(Debug, thiserror::Error)]
pub enum CalendorError {
    /// An error from the document store (missing record, backend failure).
    #[error("Store error: {0}")]
    Store(String),

    /// A task-level fault: validation failure or unknown task type.
    /// These are recorded on the failed task and never crash the runtime.
    #[error("Task error: {0}")]
    Task(String),

    /// An error raised by a worker while executing a task.
    #[error("Worker error: {0}")]
    Worker(String),

    /// An error from an external capability (mail gateway, summarizer).
    #[error("Gateway error: {0}")]
    Gateway(String),

    /// An error from the schedule conflict detector.
    #[error("Conflict error: {0}")]
    Conflict(String),

    /// An error from the multi-agent coordination layer.
    #[error("Coordination error: {0}")]
    Coordination(String),

    /// An error in configuration parsing or validation.
    #[error("Config error: {0}")]
    Config(String),

    /// A JSON serialization or deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A standard I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// A convenience `Result` alias using [`CalendorError`].
pub type CalendorResult<T> = Result<T, CalendorError>;
