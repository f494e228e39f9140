//! Agent task-orchestration runtime for the Calendor backend.
//!
//! Agents are long-lived identities that poll a shared task queue held in
//! the document store. The runtime owns the poll loop, the task state
//! machine, and status reporting; domain logic lives behind the
//! [`WorkerLogic`] trait. Cross-agent work flows through [`TaskDispatcher`]
//! fan-out, and [`CoordinationLedger`] seeds and tracks multi-agent
//! workflows.
//!
//! # Main types
//!
//! - [`WorkerLogic`] / [`AgentDescriptor`] — the seam workers implement.
//! - [`AgentRuntime`] — poll loop and task lifecycle for one agent.
//! - [`AgentRegistry`] — spawns the fleet and fans out the stop signal.
//! - [`CoordinationLedger`] — initiates and closes workflows.

mod coordination;
mod dispatch;
mod registry;
mod runtime;
mod worker;

pub use coordination::{
    fleet_metrics, AgentMetrics, CoordinationLedger, FleetMetrics, WorkflowStatus,
};
pub use dispatch::{agents, TaskDispatcher};
pub use registry::AgentRegistry;
pub use runtime::{AgentRuntime, RuntimeConfig};
pub use worker::{AgentDescriptor, WorkerLogic};
