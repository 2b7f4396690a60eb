//! Work-order state and persistence
//!
//! - `types.rs`: the `WorkOrder` aggregate and its closed enumerations
//! - `store.rs`: the tenant-scoped `WorkOrderStore` contract, the update
//!   document it applies atomically, and `InMemoryStore`
//! - `schema.rs`: collection name and key layout
//!
//! # Usage
//!
//! ```ignore
//! use workorder_lifecycle::state::{InMemoryStore, NewWorkOrder, WorkOrder, WorkOrderStore};
//!
//! let store = InMemoryStore::new();
//! let order = WorkOrder::new(intake, &SlaPolicy::default(), Utc::now());
//! store.insert_one(order).await?;
//! ```

pub mod schema;
pub mod store;
pub mod types;

pub use store::{
    AssignmentSet, InMemoryStore, SharedWorkOrderStore, StatsQuery, StatsRow, StoreError,
    StoreResult, UpdateFilter, UpdateOutcome, WorkOrderStore, WorkOrderUpdate,
};
pub use types::{
    parse_identifier, Assignee, AssigneeKind, AssignmentState, Communication,
    CommunicationUpdate, NewWorkOrder, ParseEnumError, Plan, Priority, ReassignmentEntry, Role,
    StatusChange, TenantId, UpdateKind, UserId, WorkOrder, WorkOrderId, WorkOrderMetrics,
    WorkOrderStatus,
};
