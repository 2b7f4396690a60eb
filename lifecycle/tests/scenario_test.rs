//! End-to-end scenarios against the in-memory store

mod common;

use chrono::{Duration, TimeZone, Utc};
use common::Harness;
use uuid::Uuid;
use workorder_lifecycle::state::{AssigneeKind, Role, UpdateKind};
use workorder_lifecycle::{
    is_overdue_at, DateRange, EventFilter, LifecycleError, LifecycleEvent, Priority,
    StatsFilter, Violation, WorkOrderStatus,
};

/// Scenario 1: a medium order is on time at intake and overdue a day later
#[tokio::test]
async fn test_medium_order_goes_overdue_after_24h() {
    let h = Harness::new();
    let t0 = Utc.with_ymd_and_hms(2026, 1, 12, 8, 0, 0).unwrap();
    let order = h.seed_at(Priority::Medium, WorkOrderStatus::New, t0, None).await;

    assert_eq!(order.sla.resolution_deadline, t0 + Duration::hours(24));
    assert!(!is_overdue_at(order.sla.resolution_deadline, order.status, t0));
    assert!(is_overdue_at(
        order.sla.resolution_deadline,
        order.status,
        t0 + Duration::hours(25)
    ));
}

/// Scenario 2: medium -> high pulls the deadline in to T0 + 8h
#[tokio::test]
async fn test_escalation_medium_to_high() {
    let h = Harness::new();
    let t0 = Utc::now() - Duration::hours(3);
    let order = h.seed_at(Priority::Medium, WorkOrderStatus::Assessment, t0, None).await;

    let outcome = h
        .service
        .escalate(&order.id.to_string(), &h.ctx(Role::Manager), "no heat", None)
        .await
        .unwrap();

    assert_eq!(outcome.new_priority, Priority::High);
    assert_eq!(outcome.sla.resolution_deadline, t0 + Duration::hours(8));

    let stored = h.reload(&order).await;
    assert_eq!(stored.sla.resolution_deadline, t0 + Duration::hours(8));
    assert_eq!(stored.status, WorkOrderStatus::Assessment);
    assert_eq!(stored.metrics.escalation_count, 1);
    assert_eq!(stored.communication.updates[0].kind, UpdateKind::Escalation);
}

/// Scenario 3: a downgrade request is refused and nothing changes
#[tokio::test]
async fn test_escalation_downgrade_rejected() {
    let h = Harness::new();
    let order = h.seed(Priority::High, WorkOrderStatus::InProgress).await;

    let err = h
        .service
        .escalate(
            &order.id.to_string(),
            &h.ctx(Role::Manager),
            "typo",
            Some(Priority::Medium),
        )
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        LifecycleError::InvariantViolation(Violation::NonIncreasingPriority {
            current: Priority::High,
            target: Priority::Medium
        })
    ));
    assert_eq!(h.reload(&order).await, order);
}

/// Scenario 4: assigning a NEW order advances it within the same commit
#[tokio::test]
async fn test_assignment_auto_advances_new_order() {
    let h = Harness::new();
    let order = h.seed(Priority::Medium, WorkOrderStatus::New).await;
    let ctx = h.ctx(Role::PropertyManager);
    let mut events = h.service.subscribe(EventFilter::new().tenant(h.tenant_id));

    let outcome = h
        .service
        .assign(
            &order.id.to_string(),
            &Uuid::new_v4().to_string(),
            AssigneeKind::User,
            &ctx,
            Some("on call tonight".to_string()),
        )
        .await
        .unwrap();
    assert!(outcome.auto_advanced);

    let stored = h.reload(&order).await;
    assert_eq!(stored.status, WorkOrderStatus::Assessment);
    assert_eq!(stored.status_history.len(), 1);
    assert_eq!(stored.assignment.reassignment_history.len(), 1);
    assert_eq!(
        stored.assignment.reassignment_history[0].notes.as_deref(),
        Some("on call tonight")
    );
    // One write carried both changes
    assert_eq!(stored.version, order.version + 1);
    assert_eq!(
        stored.status_history[0].changed_at,
        stored.assignment.reassignment_history[0].reassigned_at
    );

    assert_eq!(events.recv().await.unwrap().event_type(), "assigned");
    assert_eq!(events.recv().await.unwrap().event_type(), "status_changed");
}

/// Scenario 5: two transitions out of IN_PROGRESS load the same version;
/// exactly one write lands and the other loses the compare-and-swap
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_concurrent_transitions_one_winner() {
    for _ in 0..10 {
        let h = Harness::rendezvous(2);
        let order = h.seed(Priority::High, WorkOrderStatus::InProgress).await;
        let ctx = h.ctx(Role::Manager);

        let race = |to: WorkOrderStatus| {
            let service = h.service.clone();
            let id = order.id.to_string();
            let ctx = ctx.clone();
            tokio::spawn(async move {
                service
                    .transition_status(&id, to, &ctx, None, None)
                    .await
            })
        };
        let hold = race(WorkOrderStatus::OnHold);
        let complete = race(WorkOrderStatus::WorkComplete);
        let outcomes = [hold.await.unwrap(), complete.await.unwrap()];

        let winners = outcomes.iter().filter(|r| r.is_ok()).count();
        assert_eq!(winners, 1, "exactly one transition must commit");
        let loser = outcomes
            .iter()
            .find_map(|r| r.as_ref().err())
            .expect("one transition must lose");
        assert!(
            matches!(
                loser,
                LifecycleError::ConcurrentModification { work_order_id }
                    if *work_order_id == order.id
            ),
            "unexpected loser error: {loser:?}"
        );
        assert!(loser.is_retryable());

        let stored = h.reload(&order).await;
        assert_eq!(stored.status_history.len(), 1);
        assert_eq!(stored.version, order.version + 1);
        assert!(matches!(
            stored.status,
            WorkOrderStatus::OnHold | WorkOrderStatus::WorkComplete
        ));
    }
}

/// Test: every operation treats a foreign tenant as nonexistent
#[tokio::test]
async fn test_tenant_isolation_round_trip() {
    let h = Harness::new();
    let order = h.seed(Priority::Low, WorkOrderStatus::New).await;
    let id = order.id.to_string();
    let foreign = Uuid::new_v4();
    let outsider = workorder_lifecycle::ResourceContext::new(foreign, Uuid::new_v4(), Role::SuperAdmin);

    let transition = h
        .service
        .transition_status(&id, WorkOrderStatus::Assessment, &outsider, None, None)
        .await;
    let assign = h
        .service
        .assign(&id, &Uuid::new_v4().to_string(), AssigneeKind::Team, &outsider, None)
        .await;
    let escalate = h.service.escalate(&id, &outsider, "reason", None).await;
    let get = h.service.get(&id, foreign).await;

    assert!(matches!(transition, Err(LifecycleError::NotFoundOrDenied)));
    assert!(matches!(assign, Err(LifecycleError::NotFoundOrDenied)));
    assert!(matches!(escalate, Err(LifecycleError::NotFoundOrDenied)));
    assert!(matches!(get, Err(LifecycleError::NotFoundOrDenied)));

    // Indistinguishable from an id that does not exist at all
    let missing = h.service.get(&Uuid::new_v4().to_string(), h.tenant_id).await;
    assert!(matches!(missing, Err(LifecycleError::NotFoundOrDenied)));

    assert_eq!(h.reload(&order).await, order);
    let stats = h.service.get_stats(&StatsFilter::tenant(foreign)).await.unwrap();
    assert_eq!(stats.total, 0);
}

/// Test: malformed identifiers are reported as such, never as not-found
#[tokio::test]
async fn test_malformed_identifiers() {
    let h = Harness::new();
    let err = h.service.get("WO-20260101-ABCD", h.tenant_id).await.unwrap_err();
    assert_eq!(err.code(), "INVALID_IDENTIFIER");

    let mut filter = StatsFilter::tenant(h.tenant_id);
    filter.property_id = Some("north-wing".to_string());
    h.seed(Priority::Low, WorkOrderStatus::New).await;
    let stats = h.service.get_stats(&filter).await.unwrap();
    assert_eq!(stats.total, 0);
    assert_eq!(stats.by_status.len(), WorkOrderStatus::ALL.len());
}

/// Test: statistics over a tenant with a created_at window
#[tokio::test]
async fn test_stats_with_date_range() {
    let h = Harness::new();
    let now = Utc::now();
    let old = h
        .seed_at(Priority::Critical, WorkOrderStatus::InProgress, now - Duration::days(40), None)
        .await;
    h.seed_at(Priority::High, WorkOrderStatus::New, now - Duration::hours(1), None)
        .await;
    h.seed_at(Priority::Low, WorkOrderStatus::Cancelled, now - Duration::hours(2), None)
        .await;

    let all = h.service.get_stats(&StatsFilter::tenant(h.tenant_id)).await.unwrap();
    assert_eq!(all.total, 3);
    assert_eq!(all.by_priority[&Priority::Critical], 1);
    // The 40-day-old critical order is live and far past its 4h deadline
    assert!(all.overdue >= 1);

    let mut recent = StatsFilter::tenant(h.tenant_id);
    recent.date_range = Some(DateRange {
        from: now - Duration::days(1),
        to: now + Duration::minutes(1),
    });
    let recent = h.service.get_stats(&recent).await.unwrap();
    assert_eq!(recent.total, 2);
    assert_eq!(recent.by_priority[&Priority::Critical], 0);

    // Start is inclusive, end is exclusive
    let mut exact = StatsFilter::tenant(h.tenant_id);
    exact.date_range = Some(DateRange {
        from: old.created_at,
        to: old.created_at + Duration::seconds(1),
    });
    assert_eq!(h.service.get_stats(&exact).await.unwrap().total, 1);
    exact.date_range = Some(DateRange {
        from: old.created_at - Duration::seconds(1),
        to: old.created_at,
    });
    assert_eq!(h.service.get_stats(&exact).await.unwrap().total, 0);
}

/// Test: rework reopens the SLA clock for both the status view and stats
#[tokio::test]
async fn test_rework_is_reported_as_live() {
    let h = Harness::new();
    let order = h
        .seed_at(
            Priority::Medium,
            WorkOrderStatus::InProgress,
            Utc::now() - Duration::hours(48),
            None,
        )
        .await;
    let id = order.id.to_string();
    let ctx = h.ctx(Role::Manager);

    h.service
        .transition_status(&id, WorkOrderStatus::WorkComplete, &ctx, None, None)
        .await
        .unwrap();
    h.service
        .transition_status(
            &id,
            WorkOrderStatus::InProgress,
            &ctx,
            Some("rework".to_string()),
            None,
        )
        .await
        .unwrap();

    let stored = h.reload(&order).await;
    assert_eq!(stored.status, WorkOrderStatus::InProgress);
    assert!(stored.completed_at.is_none());

    let sla = h.service.sla_status(&id, h.tenant_id).await.unwrap();
    assert!(sla.is_overdue);

    let stats = h.service.get_stats(&StatsFilter::tenant(h.tenant_id)).await.unwrap();
    assert_eq!(stats.overdue, 1);
    assert_eq!(stats.completed_this_week, 0);
    assert_eq!(stats.completed_this_month, 0);
    assert_eq!(stats.average_resolution_hours, 0.0);
}

/// Test: completion statistics once orders finish
#[tokio::test]
async fn test_completed_orders_feed_resolution_average() {
    let h = Harness::new();
    let order = h.seed(Priority::High, WorkOrderStatus::InProgress).await;
    let ctx = h.ctx(Role::Manager);
    let mut rx = h.service.subscribe(EventFilter::new().types(vec!["status_changed"]));

    h.service
        .transition_status(&order.id.to_string(), WorkOrderStatus::WorkComplete, &ctx, None, None)
        .await
        .unwrap();

    match rx.recv().await.unwrap() {
        LifecycleEvent::StatusChanged { to, .. } => assert_eq!(to, WorkOrderStatus::WorkComplete),
        other => panic!("unexpected {other:?}"),
    }

    let stats = h.service.get_stats(&StatsFilter::tenant(h.tenant_id)).await.unwrap();
    assert_eq!(stats.completed_this_week, 1);
    assert_eq!(stats.completed_this_month, 1);
    assert_eq!(stats.overdue, 0);
    assert!(stats.average_resolution_hours >= 0.0);
}
