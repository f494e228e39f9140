//! The concrete agent fleet for the Calendor backend.
//!
//! Five workers plug into the runtime's poll loops: the mailbox worker
//! runs the mail pipeline (fetch, classify, draft, remind), the aggregator
//! joins and filters mail records, the calendar worker provides upcoming
//! events and runs conflict detection, the coordinator collects stage data
//! and finalizes schedules, and the overseer reports fleet-level status.
//!
//! External capabilities (mail provider, summarizer) stay behind the
//! traits in [`gateway`]; no real integrations live here.

mod aggregator;
mod calendar;
pub mod classifier;
mod coordinator;
pub mod gateway;
mod input;
mod mailbox;
pub mod templates;

pub use aggregator::{AggregatedItem, AggregatorWorker};
pub use calendar::CalendarWorker;
pub use coordinator::{CoordinatorWorker, OverseerWorker};
pub use gateway::{summarize_with_retry, MailGateway, StubMailGateway, Summarizer};
pub use mailbox::MailboxWorker;
