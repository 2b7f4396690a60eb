//! Escalation Manager: applies a resolved escalation in one conditional write.

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::ladder::resolve_target;
use crate::error::{LifecycleError, LifecycleResult, Violation};
use crate::sla::{SlaInfo, SlaPolicy};
use crate::state::{
    parse_identifier, CommunicationUpdate, Priority, SharedWorkOrderStore, UpdateFilter,
    UpdateKind, WorkOrderId, WorkOrderUpdate,
};
use crate::transitions::executor::check_reason;
use crate::transitions::ResourceContext;

/// Result of a committed escalation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EscalationOutcome {
    pub work_order_id: WorkOrderId,
    pub previous_priority: Priority,
    pub new_priority: Priority,
    /// SLA recomputed for `new_priority` from the original `created_at`
    pub sla: SlaInfo,
    pub escalation_count: u32,
}

#[derive(Clone)]
pub struct EscalationManager {
    store: SharedWorkOrderStore,
    policy: SlaPolicy,
    max_reason_len: usize,
}

impl EscalationManager {
    pub fn new(store: SharedWorkOrderStore, policy: SlaPolicy, max_reason_len: usize) -> Self {
        Self {
            store,
            policy,
            max_reason_len,
        }
    }

    /// Raise priority one rung, or to `target`. Status is never touched.
    pub async fn escalate(
        &self,
        work_order_id: &str,
        ctx: &ResourceContext,
        reason: &str,
        target: Option<Priority>,
    ) -> LifecycleResult<EscalationOutcome> {
        let id = parse_identifier("work_order_id", work_order_id)?;
        check_reason(Some(reason), self.max_reason_len)?;

        let order = self
            .store
            .find_one(ctx.tenant_id, id)
            .await?
            .ok_or(LifecycleError::NotFoundOrDenied)?;

        if !order.status.is_active() {
            return Err(LifecycleError::InvariantViolation(Violation::InactiveOrder {
                status: order.status,
            }));
        }

        let previous = order.priority;
        let next = resolve_target(previous, target).map_err(LifecycleError::InvariantViolation)?;
        let sla = self.policy.compute(next, order.created_at);

        let now = chrono::Utc::now();
        let note = CommunicationUpdate {
            kind: UpdateKind::Escalation,
            author: Some(ctx.user_id),
            message: format!("Escalated from {} to {}: {}", previous, next, reason),
            at: now,
        };
        let update = WorkOrderUpdate::at(now)
            .reprioritize(next, sla.clone())
            .increment_escalations()
            .push_communication(note);

        let filter = UpdateFilter::new(id, ctx.tenant_id).expect_version(order.version);
        let outcome = self.store.conditional_update(filter, update).await?;
        if outcome.matched == 0 {
            warn!(work_order_id = %id, tenant_id = %ctx.tenant_id, "Escalation lost compare-and-swap race");
            return Err(LifecycleError::ConcurrentModification { work_order_id: id });
        }

        info!(
            work_order_id = %id,
            tenant_id = %ctx.tenant_id,
            from = %previous,
            to = %next,
            resolution_deadline = %sla.resolution_deadline,
            "Work order escalated"
        );

        Ok(EscalationOutcome {
            work_order_id: id,
            previous_priority: previous,
            new_priority: next,
            sla,
            escalation_count: order.metrics.escalation_count + 1,
        })
    }
}
