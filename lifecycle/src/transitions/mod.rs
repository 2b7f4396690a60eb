//! Work-order status state machine
//!
//! Three layers, each usable on its own:
//!
//! 1. **Status table** (`table.rs`): the `const` edge list with per-edge role
//!    sets and optional guards.
//! 2. **Validator** (`validator.rs`): looks up the edge, checks the role, then
//!    evaluates the guard against a [`GuardContext`].
//! 3. **Executor** (`executor.rs`): loads the order in-tenant, validates, and
//!    commits with a compare-and-swap on status and version.
//!
//! ```text
//! request ──▶ find_one(tenant, id) ──▶ validate(from, to, guard)
//!                                           │
//!                              ┌────────────┴────────────┐
//!                              ▼                         ▼
//!                   conditional_update          InvalidTransition
//!                  (status == from,            (+ valid edges)
//!                   version == read)
//!                     │          │
//!                matched=1    matched=0
//!                     ▼          ▼
//!          TransitionResult  ConcurrentModification
//! ```

pub mod executor;
pub mod guard;
pub mod table;
pub mod validator;

pub use executor::{TransitionExecutor, TransitionResult};
pub use guard::{GuardContext, ResourceContext, TransitionGuard};
pub use table::{find_edge, is_valid_transition, valid_transitions, TransitionEdge, STATUS_TABLE};
pub use validator::{validate, Rejection};
