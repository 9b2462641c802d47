//! # Aegis Audit
//!
//! Append-only compliance trail. Every consequential change in the guardrail
//! (decisions, registrations, overrides, policy edits) is written here before
//! the change becomes visible to callers.
//!
//! Storage is pluggable through [`AuditStore`]; [`MemoryStore`] serves tests
//! and demos, [`JsonlStore`] persists one JSON object per line.

pub mod sink;
pub mod store;
pub mod trail;

pub use sink::{AuditSink, TracingSink};
pub use store::{AuditStore, JsonlStore, MemoryStore};
pub use trail::AuditTrail;
