//! Work-order service facade
//!
//! Entry point for callers: owns the store handle, configuration and event
//! bus, delegates to the transition, assignment, escalation and statistics
//! components, and publishes a [`LifecycleEvent`] for each outcome.

use std::sync::Arc;

use chrono::Utc;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::assignment::{AssignmentManager, AssignmentOutcome, AUTO_ADVANCE_REASON};
use crate::config::EngineConfig;
use crate::error::{LifecycleError, LifecycleResult};
use crate::escalation::{EscalationManager, EscalationOutcome};
use crate::events::{EventBus, EventFilter, FilteredReceiver, LifecycleEvent, SharedEventBus};
use crate::sla::SlaStatus;
use crate::state::{
    parse_identifier, AssigneeKind, NewWorkOrder, Priority, SharedWorkOrderStore, TenantId,
    WorkOrder, WorkOrderStatus,
};
use crate::stats::{Stats, StatsAggregator, StatsFilter};
use crate::transitions::{GuardContext, ResourceContext, TransitionExecutor, TransitionResult};

pub struct WorkOrderService {
    store: SharedWorkOrderStore,
    config: EngineConfig,
    events: SharedEventBus,
    executor: TransitionExecutor,
    assignments: AssignmentManager,
    escalations: EscalationManager,
    stats: StatsAggregator,
}

impl WorkOrderService {
    pub fn new(store: SharedWorkOrderStore) -> Self {
        Self::with_config(store, EngineConfig::default())
    }

    pub fn with_config(store: SharedWorkOrderStore, config: EngineConfig) -> Self {
        let max = config.max_reason_len;
        Self {
            executor: TransitionExecutor::new(store.clone(), max),
            assignments: AssignmentManager::new(store.clone(), max),
            escalations: EscalationManager::new(store.clone(), config.sla.clone(), max),
            stats: StatsAggregator::new(store.clone()),
            events: EventBus::new(config.event_capacity).shared(),
            store,
            config,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Shared handle to the event bus
    pub fn events(&self) -> SharedEventBus {
        Arc::clone(&self.events)
    }

    pub fn subscribe(&self, filter: EventFilter) -> FilteredReceiver {
        self.events.subscribe_filtered(filter)
    }

    /// Intake: build a `NEW` order under the configured SLA policy and store it
    pub async fn create(&self, intake: NewWorkOrder) -> LifecycleResult<WorkOrder> {
        let order = WorkOrder::new(intake, &self.config.sla, Utc::now());
        self.store.insert_one(order.clone()).await?;
        info!(
            work_order_id = %order.id,
            tenant_id = %order.tenant_id,
            code = %order.code,
            priority = %order.priority,
            "Work order created"
        );
        Ok(order)
    }

    /// Load one order within `tenant_id`
    pub async fn get(&self, work_order_id: &str, tenant_id: TenantId) -> LifecycleResult<WorkOrder> {
        let id = parse_identifier("work_order_id", work_order_id)?;
        self.store
            .find_one(tenant_id, id)
            .await?
            .ok_or(LifecycleError::NotFoundOrDenied)
    }

    pub async fn sla_status(
        &self,
        work_order_id: &str,
        tenant_id: TenantId,
    ) -> LifecycleResult<SlaStatus> {
        let order = self.get(work_order_id, tenant_id).await?;
        Ok(SlaStatus::of(&order, Utc::now()))
    }

    #[instrument(skip(self, ctx, reason, guard), fields(tenant_id = %ctx.tenant_id))]
    pub async fn transition_status(
        &self,
        work_order_id: &str,
        to: WorkOrderStatus,
        ctx: &ResourceContext,
        reason: Option<String>,
        guard: Option<GuardContext>,
    ) -> LifecycleResult<TransitionResult> {
        match self
            .executor
            .transition_status(work_order_id, to, ctx, reason, guard)
            .await
        {
            Ok(result) => {
                if let Ok(id) = Uuid::parse_str(work_order_id.trim()) {
                    self.events.publish(LifecycleEvent::StatusChanged {
                        tenant_id: ctx.tenant_id,
                        work_order_id: id,
                        from: result.from_status,
                        to: result.to_status,
                        changed_by: result.transitioned_by,
                        reason: result.reason.clone(),
                        timestamp: result.transitioned_at,
                    });
                }
                Ok(result)
            }
            Err(err) => {
                if let LifecycleError::InvalidTransition {
                    from,
                    to,
                    rejection,
                    ..
                } = &err
                {
                    if let Ok(id) = Uuid::parse_str(work_order_id.trim()) {
                        self.events.publish(LifecycleEvent::TransitionRejected {
                            tenant_id: ctx.tenant_id,
                            work_order_id: id,
                            from: *from,
                            to: *to,
                            requested_by: ctx.user_id,
                            rejection: *rejection,
                            timestamp: Utc::now(),
                        });
                    }
                }
                Err(err)
            }
        }
    }

    #[instrument(skip(self, ctx, notes), fields(tenant_id = %ctx.tenant_id))]
    pub async fn assign(
        &self,
        work_order_id: &str,
        assignee_id: &str,
        assignee_kind: AssigneeKind,
        ctx: &ResourceContext,
        notes: Option<String>,
    ) -> LifecycleResult<AssignmentOutcome> {
        let outcome = self
            .assignments
            .assign(work_order_id, assignee_id, assignee_kind, ctx, notes)
            .await?;

        self.events.publish(LifecycleEvent::Assigned {
            tenant_id: ctx.tenant_id,
            work_order_id: outcome.work_order_id,
            assignee: outcome.assignee,
            previous: outcome.previous,
            assigned_by: ctx.user_id,
            auto_advanced: outcome.auto_advanced,
            timestamp: outcome.assigned_at,
        });
        if outcome.auto_advanced {
            self.events.publish(LifecycleEvent::StatusChanged {
                tenant_id: ctx.tenant_id,
                work_order_id: outcome.work_order_id,
                from: WorkOrderStatus::New,
                to: WorkOrderStatus::Assessment,
                changed_by: ctx.user_id,
                reason: Some(AUTO_ADVANCE_REASON.to_string()),
                timestamp: outcome.assigned_at,
            });
        }
        Ok(outcome)
    }

    #[instrument(skip(self, ctx, reason), fields(tenant_id = %ctx.tenant_id))]
    pub async fn escalate(
        &self,
        work_order_id: &str,
        ctx: &ResourceContext,
        reason: &str,
        target: Option<Priority>,
    ) -> LifecycleResult<EscalationOutcome> {
        let outcome = self
            .escalations
            .escalate(work_order_id, ctx, reason, target)
            .await?;

        self.events.publish(LifecycleEvent::Escalated {
            tenant_id: ctx.tenant_id,
            work_order_id: outcome.work_order_id,
            from: outcome.previous_priority,
            to: outcome.new_priority,
            resolution_deadline: outcome.sla.resolution_deadline,
            escalated_by: ctx.user_id,
            timestamp: Utc::now(),
        });
        Ok(outcome)
    }

    pub async fn get_stats(&self, filter: &StatsFilter) -> LifecycleResult<Stats> {
        self.stats.get_stats(filter).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::store::MockWorkOrderStore;
    use crate::state::{InMemoryStore, Role, StoreError, UpdateOutcome};

    fn intake(tenant_id: TenantId, priority: Priority) -> NewWorkOrder {
        NewWorkOrder {
            tenant_id,
            title: "Fire door not latching".to_string(),
            description: String::new(),
            category: "safety".to_string(),
            priority,
            property_id: None,
            unit_id: None,
            requested_by: Uuid::new_v4(),
        }
    }

    #[tokio::test]
    async fn test_events_follow_committed_writes() {
        let service = WorkOrderService::new(InMemoryStore::new().shared());
        let tenant = Uuid::new_v4();
        let order = service.create(intake(tenant, Priority::Medium)).await.unwrap();
        let mut rx = service.subscribe(EventFilter::new().work_order(order.id));
        let ctx = ResourceContext::new(tenant, Uuid::new_v4(), Role::Manager);
        let id = order.id.to_string();

        service
            .transition_status(&id, WorkOrderStatus::Assessment, &ctx, None, None)
            .await
            .unwrap();
        service.escalate(&id, &ctx, "VIP tenant", None).await.unwrap();

        assert_eq!(rx.recv().await.unwrap().event_type(), "status_changed");
        assert_eq!(rx.recv().await.unwrap().event_type(), "escalated");
    }

    #[tokio::test]
    async fn test_auto_advance_event_matches_history() {
        let service = WorkOrderService::new(InMemoryStore::new().shared());
        let tenant = Uuid::new_v4();
        let order = service.create(intake(tenant, Priority::Medium)).await.unwrap();
        let mut rx = service.subscribe(EventFilter::new().types(vec!["status_changed"]));
        let ctx = ResourceContext::new(tenant, Uuid::new_v4(), Role::Manager);

        service
            .assign(
                &order.id.to_string(),
                &Uuid::new_v4().to_string(),
                AssigneeKind::User,
                &ctx,
                None,
            )
            .await
            .unwrap();

        let stored = service.get(&order.id.to_string(), tenant).await.unwrap();
        match rx.recv().await.unwrap() {
            LifecycleEvent::StatusChanged { reason, to, .. } => {
                assert_eq!(to, WorkOrderStatus::Assessment);
                assert_eq!(reason, stored.status_history[0].reason);
                assert_eq!(reason.as_deref(), Some("Assigned"));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_rejected_transition_is_published() {
        let service = WorkOrderService::new(InMemoryStore::new().shared());
        let tenant = Uuid::new_v4();
        let order = service.create(intake(tenant, Priority::Low)).await.unwrap();
        let mut rx = service.events().subscribe();
        let ctx = ResourceContext::new(tenant, Uuid::new_v4(), Role::Requester);

        let err = service
            .transition_status(
                &order.id.to_string(),
                WorkOrderStatus::Assessment,
                &ctx,
                None,
                None,
            )
            .await
            .unwrap_err();
        assert_eq!(err.code(), "INVALID_TRANSITION");

        match rx.recv().await.unwrap() {
            LifecycleEvent::TransitionRejected { rejection, .. } => {
                assert_eq!(
                    rejection,
                    crate::transitions::Rejection::RoleNotPermitted {
                        role: Role::Requester
                    }
                );
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_create_uses_configured_policy() {
        let mut config = EngineConfig::default();
        config.sla.medium_hours = 12;
        let service = WorkOrderService::with_config(InMemoryStore::new().shared(), config);

        let order = service
            .create(intake(Uuid::new_v4(), Priority::Medium))
            .await
            .unwrap();
        assert_eq!(order.sla.resolution_time_minutes, 12 * 60);

        let fetched = service
            .get(&order.id.to_string(), order.tenant_id)
            .await
            .unwrap();
        assert_eq!(fetched, order);

        let sla = service
            .sla_status(&order.id.to_string(), order.tenant_id)
            .await
            .unwrap();
        assert!(!sla.is_overdue);
        assert!(sla.minutes_remaining > 11 * 60);
    }

    #[tokio::test]
    async fn test_store_failure_propagates() {
        let mut store = MockWorkOrderStore::new();
        store
            .expect_find_one()
            .returning(|_, _| Err(StoreError::Unavailable("connection refused".to_string())));
        let service = WorkOrderService::new(Arc::new(store));
        let ctx = ResourceContext::new(Uuid::new_v4(), Uuid::new_v4(), Role::Admin);

        let err = service
            .escalate(&Uuid::new_v4().to_string(), &ctx, "reason", None)
            .await
            .unwrap_err();
        assert!(matches!(err, LifecycleError::Store(StoreError::Unavailable(_))));
        assert!(err.is_retryable());
        assert_eq!(err.to_structured().code, "STORE_UNAVAILABLE");
    }

    #[tokio::test]
    async fn test_zero_match_is_concurrent_modification() {
        let tenant = Uuid::new_v4();
        let mut order = WorkOrder::new(
            intake(tenant, Priority::High),
            &crate::sla::SlaPolicy::default(),
            Utc::now(),
        );
        order.status = WorkOrderStatus::InProgress;
        let id = order.id;

        let mut store = MockWorkOrderStore::new();
        store
            .expect_find_one()
            .returning(move |_, _| Ok(Some(order.clone())));
        store
            .expect_conditional_update()
            .times(1)
            .returning(|_, _| Ok(UpdateOutcome { matched: 0 }));
        let service = WorkOrderService::new(Arc::new(store));
        let mut rx = service.events().subscribe();
        let ctx = ResourceContext::new(tenant, Uuid::new_v4(), Role::Manager);

        let err = service
            .transition_status(&id.to_string(), WorkOrderStatus::OnHold, &ctx, None, None)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            LifecycleError::ConcurrentModification { work_order_id } if work_order_id == id
        ));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_stats_with_malformed_filter_skip_the_store() {
        let mut store = MockWorkOrderStore::new();
        store.expect_aggregate().never();
        let service = WorkOrderService::new(Arc::new(store));

        let mut filter = StatsFilter::tenant(Uuid::new_v4());
        filter.assignee_id = Some("not-an-id".to_string());
        let stats = service.get_stats(&filter).await.unwrap();
        assert_eq!(stats, Stats::empty());
    }
}
