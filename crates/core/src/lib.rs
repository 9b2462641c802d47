//! # Aegis Core
//!
//! Domain types and error definitions for the Aegis transaction guardrail.
//! This crate has **no framework dependencies** beyond serialization and a
//! broadcast channel; it defines the model every other crate works against.
//!
//! ## Bounded contexts
//!
//! - **Agents**: identity, trust score, lifetime counters
//! - **Transactions**: the immutable request and the terminal [`Decision`]
//! - **Risk**: analyzer signals and the LOW/MEDIUM/HIGH/CRITICAL banding
//! - **Audit**: append-only event records
//! - **Events**: fire-and-forget notifications for observers

pub mod address;
pub mod agent;
pub mod audit;
pub mod error;
pub mod event;
pub mod risk;
pub mod transaction;

// Re-export key types at crate root for ergonomics
pub use address::{normalize_address, short_address};
pub use agent::{Agent, Outcome};
pub use audit::{AuditEvent, AuditEventType, AuditFilter, NewAuditEvent};
pub use error::{AnalyzerError, Error, RegistryError, Result, StorageError};
pub use event::{DomainEvent, EventBus};
pub use risk::{RiskBands, RiskLevel, RiskSignals};
pub use transaction::{
    Decision, ManualOverride, TransactionRecord, TransactionRequest, TxDecision, Violation,
};
