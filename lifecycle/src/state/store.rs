//! Tenant-scoped persistence seam and the in-memory reference store
//!
//! The [`WorkOrderStore`] trait is the contract the engine needs from a
//! document store: `find_one`, a conditional update with compare-and-swap
//! predicates and append primitives, and a projection for statistics. Every
//! method takes the tenant as part of its predicate.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use super::schema;
use super::types::*;
use crate::sla::SlaInfo;

/// Error type for store operations
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Duplicate work order id: {0}")]
    Duplicate(WorkOrderId),

    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Lock poisoned")]
    LockPoisoned,
}

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Shared reference to a store
pub type SharedWorkOrderStore = Arc<dyn WorkOrderStore>;

/// Predicate of a conditional update
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateFilter {
    pub id: WorkOrderId,
    pub tenant_id: TenantId,
    /// Compare-and-swap on status
    pub expected_status: Option<WorkOrderStatus>,
    /// Compare-and-swap on revision
    pub expected_version: Option<u64>,
}

impl UpdateFilter {
    pub fn new(id: WorkOrderId, tenant_id: TenantId) -> Self {
        Self {
            id,
            tenant_id,
            expected_status: None,
            expected_version: None,
        }
    }

    pub fn expect_status(mut self, status: WorkOrderStatus) -> Self {
        self.expected_status = Some(status);
        self
    }

    pub fn expect_version(mut self, version: u64) -> Self {
        self.expected_version = Some(version);
        self
    }

    /// Whether a stored order satisfies this predicate
    pub fn matches(&self, order: &WorkOrder) -> bool {
        order.id == self.id
            && order.tenant_id == self.tenant_id
            && self.expected_status.map_or(true, |s| order.status == s)
            && self.expected_version.map_or(true, |v| order.version == v)
    }
}

/// New assignment fields
#[derive(Debug, Clone, PartialEq)]
pub struct AssignmentSet {
    pub assigned_to: Assignee,
    pub assigned_by: UserId,
    pub assigned_at: DateTime<Utc>,
}

/// Update document: field sets, appends and increments, applied atomically
#[derive(Debug, Clone, PartialEq)]
pub struct WorkOrderUpdate {
    pub updated_at: DateTime<Utc>,
    pub set_status: Option<WorkOrderStatus>,
    pub set_priority: Option<Priority>,
    pub set_sla: Option<SlaInfo>,
    pub set_started_at: Option<DateTime<Utc>>,
    pub set_completed_at: Option<DateTime<Utc>>,
    /// Unset `completed_at` before any set is applied
    pub unset_completed_at: bool,
    pub set_assignment: Option<AssignmentSet>,
    pub push_status_history: Vec<StatusChange>,
    pub push_reassignment: Vec<ReassignmentEntry>,
    pub push_communication: Vec<CommunicationUpdate>,
    pub inc_escalation_count: u32,
}

impl WorkOrderUpdate {
    /// Empty update stamped with `updated_at`
    pub fn at(updated_at: DateTime<Utc>) -> Self {
        Self {
            updated_at,
            set_status: None,
            set_priority: None,
            set_sla: None,
            set_started_at: None,
            set_completed_at: None,
            unset_completed_at: false,
            set_assignment: None,
            push_status_history: Vec::new(),
            push_reassignment: Vec::new(),
            push_communication: Vec::new(),
            inc_escalation_count: 0,
        }
    }

    /// Set status and append the matching history entry
    pub fn transition(mut self, change: StatusChange) -> Self {
        self.set_status = Some(change.to);
        self.push_status_history.push(change);
        self
    }

    pub fn started_at(mut self, at: DateTime<Utc>) -> Self {
        self.set_started_at = Some(at);
        self
    }

    pub fn completed_at(mut self, at: DateTime<Utc>) -> Self {
        self.set_completed_at = Some(at);
        self
    }

    pub fn unset_completed_at(mut self) -> Self {
        self.unset_completed_at = true;
        self
    }

    /// Set assignment fields and append the reassignment entry
    pub fn assign(mut self, set: AssignmentSet, entry: ReassignmentEntry) -> Self {
        self.set_assignment = Some(set);
        self.push_reassignment.push(entry);
        self
    }

    /// Set priority together with its recomputed SLA
    pub fn reprioritize(mut self, priority: Priority, sla: SlaInfo) -> Self {
        self.set_priority = Some(priority);
        self.set_sla = Some(sla);
        self
    }

    pub fn increment_escalations(mut self) -> Self {
        self.inc_escalation_count += 1;
        self
    }

    pub fn push_communication(mut self, update: CommunicationUpdate) -> Self {
        self.push_communication.push(update);
        self
    }

    /// Apply to a document in place and bump its version
    pub fn apply(self, order: &mut WorkOrder) {
        if let Some(status) = self.set_status {
            order.status = status;
        }
        if let Some(priority) = self.set_priority {
            order.priority = priority;
        }
        if let Some(sla) = self.set_sla {
            order.sla = sla;
        }
        if let Some(at) = self.set_started_at {
            order.started_at = Some(at);
        }
        if self.unset_completed_at {
            order.completed_at = None;
        }
        if let Some(at) = self.set_completed_at {
            order.completed_at = Some(at);
        }
        if let Some(set) = self.set_assignment {
            order.assignment.assigned_to = Some(set.assigned_to);
            order.assignment.assigned_by = Some(set.assigned_by);
            order.assignment.assigned_at = Some(set.assigned_at);
        }
        order.status_history.extend(self.push_status_history);
        order
            .assignment
            .reassignment_history
            .extend(self.push_reassignment);
        order.communication.updates.extend(self.push_communication);
        order.metrics.escalation_count += self.inc_escalation_count;
        order.updated_at = self.updated_at;
        order.version += 1;
    }
}

/// Result of a conditional update
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateOutcome {
    /// Documents that satisfied the predicate (0 or 1)
    pub matched: u64,
}

/// Tenant-scoped selection for statistics
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsQuery {
    pub tenant_id: TenantId,
    pub status: Option<WorkOrderStatus>,
    pub priority: Option<Priority>,
    pub assignee_id: Option<Uuid>,
    pub property_id: Option<Uuid>,
    /// Inclusive lower bound on `created_at`
    pub created_from: Option<DateTime<Utc>>,
    /// Exclusive upper bound on `created_at`
    pub created_to: Option<DateTime<Utc>>,
}

impl StatsQuery {
    pub fn tenant(tenant_id: TenantId) -> Self {
        Self {
            tenant_id,
            status: None,
            priority: None,
            assignee_id: None,
            property_id: None,
            created_from: None,
            created_to: None,
        }
    }

    pub fn matches(&self, order: &WorkOrder) -> bool {
        order.tenant_id == self.tenant_id
            && self.status.map_or(true, |s| order.status == s)
            && self.priority.map_or(true, |p| order.priority == p)
            && self.assignee_id.map_or(true, |a| order.is_assigned_to(a))
            && self
                .property_id
                .map_or(true, |p| order.property_id == Some(p))
            && self.created_from.map_or(true, |from| order.created_at >= from)
            && self.created_to.map_or(true, |to| order.created_at < to)
    }
}

/// Projection of the fields statistics need
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsRow {
    pub status: WorkOrderStatus,
    pub priority: Priority,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub resolution_deadline: DateTime<Utc>,
}

impl From<&WorkOrder> for StatsRow {
    fn from(order: &WorkOrder) -> Self {
        Self {
            status: order.status,
            priority: order.priority,
            created_at: order.created_at,
            completed_at: order.completed_at,
            resolution_deadline: order.sla.resolution_deadline,
        }
    }
}

/// Persistence contract consumed by the engine
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait WorkOrderStore: Send + Sync {
    /// Store a freshly created order (intake path)
    async fn insert_one(&self, order: WorkOrder) -> StoreResult<()>;

    /// Fetch one order within a tenant
    async fn find_one(&self, tenant_id: TenantId, id: WorkOrderId)
        -> StoreResult<Option<WorkOrder>>;

    /// Apply `update` atomically to the order matching `filter`
    async fn conditional_update(
        &self,
        filter: UpdateFilter,
        update: WorkOrderUpdate,
    ) -> StoreResult<UpdateOutcome>;

    /// Project the orders selected by `query`
    async fn aggregate(&self, query: &StatsQuery) -> StoreResult<Vec<StatsRow>>;
}

/// In-memory reference store
///
/// A single `RwLock` makes each conditional update atomic; the lock is never
/// held across an `.await`.
#[derive(Default)]
pub struct InMemoryStore {
    orders: RwLock<HashMap<String, WorkOrder>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a store from a snapshot
    pub fn from_orders(orders: impl IntoIterator<Item = WorkOrder>) -> Self {
        let orders = orders
            .into_iter()
            .map(|order| (schema::keys::work_order(&order.tenant_id, &order.id), order))
            .collect();
        Self {
            orders: RwLock::new(orders),
        }
    }

    /// Create a shared reference to this store
    pub fn shared(self) -> Arc<Self> {
        Arc::new(self)
    }

    /// Every stored order, oldest first
    pub fn snapshot(&self) -> StoreResult<Vec<WorkOrder>> {
        let orders = self.orders.read().map_err(|_| StoreError::LockPoisoned)?;
        let mut all: Vec<WorkOrder> = orders.values().cloned().collect();
        all.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(all)
    }
}

#[async_trait]
impl WorkOrderStore for InMemoryStore {
    async fn insert_one(&self, order: WorkOrder) -> StoreResult<()> {
        let mut orders = self.orders.write().map_err(|_| StoreError::LockPoisoned)?;
        if orders.values().any(|existing| existing.id == order.id) {
            return Err(StoreError::Duplicate(order.id));
        }
        let key = schema::keys::work_order(&order.tenant_id, &order.id);
        debug!(collection = schema::WORK_ORDERS, %key, "insert_one");
        orders.insert(key, order);
        Ok(())
    }

    async fn find_one(
        &self,
        tenant_id: TenantId,
        id: WorkOrderId,
    ) -> StoreResult<Option<WorkOrder>> {
        let key = schema::keys::work_order(&tenant_id, &id);
        let orders = self.orders.read().map_err(|_| StoreError::LockPoisoned)?;
        Ok(orders.get(&key).cloned())
    }

    async fn conditional_update(
        &self,
        filter: UpdateFilter,
        update: WorkOrderUpdate,
    ) -> StoreResult<UpdateOutcome> {
        let key = schema::keys::work_order(&filter.tenant_id, &filter.id);
        let mut orders = self.orders.write().map_err(|_| StoreError::LockPoisoned)?;

        match orders.get_mut(&key) {
            Some(order) if filter.matches(order) => {
                update.apply(order);
                debug!(%key, version = order.version, "conditional_update matched");
                Ok(UpdateOutcome { matched: 1 })
            }
            _ => {
                debug!(%key, "conditional_update matched nothing");
                Ok(UpdateOutcome { matched: 0 })
            }
        }
    }

    async fn aggregate(&self, query: &StatsQuery) -> StoreResult<Vec<StatsRow>> {
        let prefix = schema::keys::tenant_prefix(&query.tenant_id);
        let orders = self.orders.read().map_err(|_| StoreError::LockPoisoned)?;
        Ok(orders
            .iter()
            .filter(|(key, order)| key.starts_with(&prefix) && query.matches(order))
            .map(|(_, order)| StatsRow::from(order))
            .collect())
    }
}
