//! Work-Order Lifecycle Library
//!
//! This library provides the core of a multi-tenant facility-management
//! platform's work-order handling:
//! - A role- and guard-gated status state machine with compare-and-swap writes
//! - SLA deadlines derived from priority, recomputed on escalation
//! - Assignment with validated `NEW -> ASSESSMENT` auto-advance
//! - Per-tenant statistics
//!
//! # Components
//!
//! - `transitions`: status table, validator and executor
//! - `sla`: budgets, deadlines and overdue checks
//! - `assignment`: binds orders to users, teams and vendors
//! - `escalation`: priority ladder and SLA recompute
//! - `stats`: filtered per-tenant aggregates
//! - `state`: the `WorkOrder` aggregate and the `WorkOrderStore` seam
//! - `events`: broadcast of committed changes
//! - `service`: the `WorkOrderService` facade over all of the above
//!
//! # Usage
//!
//! ```ignore
//! use workorder_lifecycle::{InMemoryStore, ResourceContext, Role, WorkOrderService, WorkOrderStatus};
//!
//! let service = WorkOrderService::new(InMemoryStore::new().shared());
//! let ctx = ResourceContext::new(tenant_id, user_id, Role::Manager);
//! service
//!     .transition_status(&id, WorkOrderStatus::Assessment, &ctx, None, None)
//!     .await?;
//! ```

#![allow(clippy::uninlined_format_args)]

pub mod assignment;
pub mod config;
pub mod error;
pub mod escalation;
pub mod events;
pub mod service;
pub mod sla;
pub mod state;
pub mod stats;
pub mod transitions;

pub use assignment::{AssignmentManager, AssignmentOutcome};
pub use config::{ConfigError, EngineConfig};
pub use error::{LifecycleError, LifecycleResult, StructuredError, Violation};
pub use escalation::{resolve_target, EscalationManager, EscalationOutcome};
pub use events::{EventBus, EventFilter, LifecycleEvent};
pub use service::WorkOrderService;
pub use sla::{deadline, is_overdue, is_overdue_at, sla_config, SlaInfo, SlaPolicy, SlaStatus};
pub use state::{
    Assignee, AssigneeKind, InMemoryStore, NewWorkOrder, Plan, Priority, Role, StoreError,
    WorkOrder, WorkOrderStatus, WorkOrderStore,
};
pub use stats::{DateRange, Stats, StatsAggregator, StatsFilter};
pub use transitions::{
    is_valid_transition, valid_transitions, GuardContext, Rejection, ResourceContext,
    TransitionExecutor, TransitionResult,
};
