//! Priority escalation
//!
//! Raises a work order up the priority ladder and tightens its SLA clock.
//!
//! # Escalation Ladder
//!
//! ```text
//! low ──▶ medium ──▶ high ──▶ critical
//! 72h      24h        8h        4h
//! ```
//!
//! Without an explicit target an order moves one rung up. An explicit target
//! must outrank the current priority; `critical` has nowhere left to go.
//! The resolution deadline is always recomputed from `created_at`, so
//! escalating late can produce a deadline that has already passed.

pub mod engine;
pub mod ladder;

pub use engine::{EscalationManager, EscalationOutcome};
pub use ladder::resolve_target;
