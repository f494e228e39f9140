//! Schema-less document store abstraction for the Calendor backend.
//!
//! The store is the sole shared mutable resource between agents. It exposes
//! point lookups and filtered scans over named collections with no
//! cross-call atomicity — the runtime's at-least-once execution model is
//! built on top of exactly these semantics.
//!
//! # Main types
//!
//! - [`DocumentStore`] — the backend trait (insert / find / update / count).
//! - [`Filter`] / [`SortKey`] — conjunctive field conditions and multi-key sort.
//! - [`MemoryStore`] — in-memory backend for tests and embedded use.
//! - [`JsonFileStore`] — one-JSON-file-per-collection persistence.
//! - [`Datastore`] — typed facade owning all serde at the collection boundary.

mod datastore;
mod file;
mod filter;
mod memory;
mod store;

pub use datastore::{collections, Datastore};
pub use file::JsonFileStore;
pub use filter::{Condition, Filter, SortKey};
pub use memory::MemoryStore;
pub use store::DocumentStore;
