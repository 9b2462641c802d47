//! # Aegis Registry
//!
//! The agent trust registry: identity, trust score, active flag and lifetime
//! counters for every agent allowed to submit transaction requests.
//!
//! The policy engine holds a reference to the registry and reports outcomes
//! through [`AgentRegistry::record_outcome`]; the registry never calls back.

pub mod registry;

pub use registry::AgentRegistry;
