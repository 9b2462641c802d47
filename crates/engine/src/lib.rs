//! # Aegis Engine
//!
//! The policy and risk engine. Given a [`TransactionRequest`](aegis_core::TransactionRequest)
//! it runs the deterministic checks in order, scores the remaining risk, and
//! renders an APPROVED / BLOCKED / PENDING [`Decision`](aegis_core::Decision).
//!
//! A decision is only returned once its audit event is durable; every side
//! effect (spend, trust drift, history) is committed after that.
//!
//! ```text
//! request ─► trust ─► blacklist ─► burn ─► max value ─► daily limit ─► risk score ─► decision
//! ```

pub mod config;
pub mod guardrail;
pub mod ledger;
pub mod policy;
pub mod scoring;
pub mod spend;

pub use config::{GuardrailConfig, ThresholdUpdate};
pub use guardrail::{Guardrail, GuardrailBuilder};
pub use ledger::{Stats, TransactionLedger};
pub use policy::PolicyEngine;
pub use scoring::{RiskAssessment, RiskScorer, ScoreInput};
pub use spend::{SpendLedger, SpendWindow};
