//! Transition Executor: applies validated status changes.
//!
//! One read to load the order within its tenant, one conditional write that
//! only lands if neither status nor version moved in between.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::guard::{GuardContext, ResourceContext};
use super::validator::validate;
use crate::error::{LifecycleError, LifecycleResult, StructuredError, Violation};
use crate::state::{
    parse_identifier, SharedWorkOrderStore, StatusChange, UpdateFilter, UserId, WorkOrderStatus,
    WorkOrderUpdate,
};

/// Outcome of a status change request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransitionResult {
    pub success: bool,
    pub from_status: WorkOrderStatus,
    pub to_status: WorkOrderStatus,
    pub transitioned_at: DateTime<Utc>,
    pub transitioned_by: UserId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<StructuredError>,
}

impl TransitionResult {
    pub fn committed(change: &StatusChange) -> Self {
        Self {
            success: true,
            from_status: change.from,
            to_status: change.to,
            transitioned_at: change.changed_at,
            transitioned_by: change.changed_by,
            reason: change.reason.clone(),
            error: None,
        }
    }

    /// Failure record for callers that report rather than propagate
    pub fn rejected(
        from: WorkOrderStatus,
        to: WorkOrderStatus,
        by: UserId,
        at: DateTime<Utc>,
        err: &LifecycleError,
    ) -> Self {
        Self {
            success: false,
            from_status: from,
            to_status: to,
            transitioned_at: at,
            transitioned_by: by,
            reason: None,
            error: Some(err.to_structured()),
        }
    }
}

/// Reject reasons over `max` characters
pub(crate) fn check_reason(reason: Option<&str>, max: usize) -> LifecycleResult<()> {
    match reason.map(|r| r.chars().count()) {
        Some(len) if len > max => Err(LifecycleError::InvariantViolation(
            Violation::ReasonTooLong { len, max },
        )),
        _ => Ok(()),
    }
}

/// Applies approved transitions through the store
#[derive(Clone)]
pub struct TransitionExecutor {
    store: SharedWorkOrderStore,
    max_reason_len: usize,
}

impl TransitionExecutor {
    pub fn new(store: SharedWorkOrderStore, max_reason_len: usize) -> Self {
        Self {
            store,
            max_reason_len,
        }
    }

    /// Move a work order to `to` on behalf of `ctx`.
    ///
    /// A supplied `guard` contributes only its evidence; identity and
    /// assignment facts are always re-derived from `ctx` and the stored order.
    pub async fn transition_status(
        &self,
        work_order_id: &str,
        to: WorkOrderStatus,
        ctx: &ResourceContext,
        reason: Option<String>,
        guard: Option<GuardContext>,
    ) -> LifecycleResult<TransitionResult> {
        let id = parse_identifier("work_order_id", work_order_id)?;
        check_reason(reason.as_deref(), self.max_reason_len)?;

        let order = self
            .store
            .find_one(ctx.tenant_id, id)
            .await?
            .ok_or(LifecycleError::NotFoundOrDenied)?;
        let from = order.status;

        let guard = match guard {
            Some(supplied) => supplied.bind(ctx, &order),
            None => GuardContext::derive(ctx, &order),
        };

        let edge = match validate(from, to, &guard) {
            Ok(edge) => edge,
            Err(rejection) => {
                warn!(
                    work_order_id = %id,
                    tenant_id = %ctx.tenant_id,
                    from = %from,
                    to = %to,
                    role = %ctx.role,
                    %rejection,
                    "Transition rejected"
                );
                return Err(LifecycleError::invalid_transition(from, to, rejection));
            }
        };

        let now = Utc::now();
        let change = StatusChange {
            from,
            to,
            changed_by: ctx.user_id,
            changed_at: now,
            reason,
        };

        let mut update = WorkOrderUpdate::at(now).transition(change.clone());
        if to == WorkOrderStatus::InProgress && order.started_at.is_none() {
            update = update.started_at(now);
        }
        // Rework clears completion; the next WORK_COMPLETE stamps it again
        if edge.is_reopen() {
            update = update.unset_completed_at();
        } else if to == WorkOrderStatus::WorkComplete && order.completed_at.is_none() {
            update = update.completed_at(now);
        }

        let filter = UpdateFilter::new(id, ctx.tenant_id)
            .expect_status(from)
            .expect_version(order.version);

        let outcome = self.store.conditional_update(filter, update).await?;
        if outcome.matched == 0 {
            warn!(
                work_order_id = %id,
                tenant_id = %ctx.tenant_id,
                from = %from,
                to = %to,
                "Lost compare-and-swap race"
            );
            return Err(LifecycleError::ConcurrentModification { work_order_id: id });
        }

        info!(
            work_order_id = %id,
            tenant_id = %ctx.tenant_id,
            from = %from,
            to = %to,
            user_id = %ctx.user_id,
            "Work order transitioned"
        );

        Ok(TransitionResult::committed(&change))
    }
}
