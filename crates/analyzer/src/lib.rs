//! # Aegis Analyzer
//!
//! Checks that a transaction matches what the agent says it is doing.
//!
//! The analyzer reports evidence as [`RiskSignals`](aegis_core::RiskSignals)
//! and never decides. Identical inputs always produce identical signals.

pub mod intent;
pub mod threats;

pub use intent::{IntentAnalyzer, SignalAnalyzer};
pub use threats::{KnownProtocol, KnownSelector, SelectorClass};
