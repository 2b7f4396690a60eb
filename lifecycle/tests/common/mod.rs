//! Shared fixtures for lifecycle integration tests

#![allow(dead_code)]

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Barrier;
use uuid::Uuid;
use workorder_lifecycle::state::{
    Assignee, AssigneeKind, SharedWorkOrderStore, StatsQuery, StatsRow, StoreResult, TenantId,
    UpdateFilter, UpdateOutcome, WorkOrderId, WorkOrderStore, WorkOrderUpdate,
};
use workorder_lifecycle::{
    InMemoryStore, NewWorkOrder, Priority, ResourceContext, Role, SlaPolicy, WorkOrder,
    WorkOrderService, WorkOrderStatus,
};

pub struct Harness {
    pub store: Arc<InMemoryStore>,
    pub service: Arc<WorkOrderService>,
    pub tenant_id: Uuid,
}

/// Delegating store that parks every `find_one` caller until `parties`
/// readers have loaded the same document, so their writes contend.
pub struct RendezvousStore {
    inner: Arc<InMemoryStore>,
    barrier: Barrier,
}

impl RendezvousStore {
    pub fn new(inner: Arc<InMemoryStore>, parties: usize) -> Self {
        Self {
            inner,
            barrier: Barrier::new(parties),
        }
    }
}

#[async_trait]
impl WorkOrderStore for RendezvousStore {
    async fn insert_one(&self, order: WorkOrder) -> StoreResult<()> {
        self.inner.insert_one(order).await
    }

    async fn find_one(
        &self,
        tenant_id: TenantId,
        id: WorkOrderId,
    ) -> StoreResult<Option<WorkOrder>> {
        let found = self.inner.find_one(tenant_id, id).await?;
        self.barrier.wait().await;
        Ok(found)
    }

    async fn conditional_update(
        &self,
        filter: UpdateFilter,
        update: WorkOrderUpdate,
    ) -> StoreResult<UpdateOutcome> {
        self.inner.conditional_update(filter, update).await
    }

    async fn aggregate(&self, query: &StatsQuery) -> StoreResult<Vec<StatsRow>> {
        self.inner.aggregate(query).await
    }
}

/// Route engine logs through the test harness; honours `RUST_LOG`
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .with_test_writer()
        .try_init();
}

impl Harness {
    pub fn new() -> Self {
        let store = InMemoryStore::new().shared();
        Self::over(store.clone(), store)
    }

    /// Service reads go through a [`RendezvousStore`]; seeding and reloads
    /// use the backing store directly
    pub fn rendezvous(parties: usize) -> Self {
        let store = InMemoryStore::new().shared();
        let gate: SharedWorkOrderStore = Arc::new(RendezvousStore::new(store.clone(), parties));
        Self::over(store, gate)
    }

    fn over(store: Arc<InMemoryStore>, service_store: SharedWorkOrderStore) -> Self {
        init_tracing();
        Self {
            service: Arc::new(WorkOrderService::new(service_store)),
            store,
            tenant_id: Uuid::new_v4(),
        }
    }

    pub fn ctx(&self, role: Role) -> ResourceContext {
        ResourceContext::new(self.tenant_id, Uuid::new_v4(), role)
    }

    /// Insert an order created at `created_at` and forced into `status`
    pub async fn seed_at(
        &self,
        priority: Priority,
        status: WorkOrderStatus,
        created_at: DateTime<Utc>,
        assignee: Option<Uuid>,
    ) -> WorkOrder {
        let mut order = WorkOrder::new(intake(self.tenant_id, priority), &SlaPolicy::default(), created_at);
        order.status = status;
        order.assignment.assigned_to = assignee.map(|id| Assignee {
            kind: AssigneeKind::User,
            id,
        });
        self.store.insert_one(order.clone()).await.unwrap();
        order
    }

    pub async fn seed(&self, priority: Priority, status: WorkOrderStatus) -> WorkOrder {
        self.seed_at(priority, status, Utc::now(), None).await
    }

    pub async fn reload(&self, order: &WorkOrder) -> WorkOrder {
        self.store
            .find_one(order.tenant_id, order.id)
            .await
            .unwrap()
            .expect("order should exist")
    }
}

pub fn intake(tenant_id: Uuid, priority: Priority) -> NewWorkOrder {
    NewWorkOrder {
        tenant_id,
        title: "Ceiling leak above stairwell".to_string(),
        description: "Reported by front desk".to_string(),
        category: "plumbing".to_string(),
        priority,
        property_id: None,
        unit_id: None,
        requested_by: Uuid::new_v4(),
    }
}
