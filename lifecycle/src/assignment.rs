//! Assignment Manager
//!
//! Binds a work order to a user, team or vendor. Assigning a `NEW` order
//! also moves it into `ASSESSMENT` when the validator allows it, in the same
//! conditional write as the assignment itself.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{LifecycleError, LifecycleResult, Violation};
use crate::state::{
    parse_identifier, Assignee, AssigneeKind, AssignmentSet, ReassignmentEntry, Role,
    SharedWorkOrderStore, StatusChange, UpdateFilter, WorkOrderId, WorkOrderStatus,
    WorkOrderUpdate,
};
use crate::transitions::executor::check_reason;
use crate::transitions::{validate, GuardContext, ResourceContext};

pub(crate) const AUTO_ADVANCE_REASON: &str = "Assigned";

/// Result of a committed assignment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssignmentOutcome {
    pub work_order_id: WorkOrderId,
    pub assignee: Assignee,
    pub previous: Option<Assignee>,
    /// Status after the write
    pub status: WorkOrderStatus,
    /// Whether `NEW -> ASSESSMENT` was applied alongside the assignment
    pub auto_advanced: bool,
    pub assigned_at: DateTime<Utc>,
}

#[derive(Clone)]
pub struct AssignmentManager {
    store: SharedWorkOrderStore,
    max_reason_len: usize,
}

impl AssignmentManager {
    pub fn new(store: SharedWorkOrderStore, max_reason_len: usize) -> Self {
        Self {
            store,
            max_reason_len,
        }
    }

    pub async fn assign(
        &self,
        work_order_id: &str,
        assignee_id: &str,
        assignee_kind: AssigneeKind,
        ctx: &ResourceContext,
        notes: Option<String>,
    ) -> LifecycleResult<AssignmentOutcome> {
        let id = parse_identifier("work_order_id", work_order_id)?;
        let assignee = Assignee {
            kind: assignee_kind,
            id: parse_identifier("assignee_id", assignee_id)?,
        };
        check_reason(notes.as_deref(), self.max_reason_len)?;

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

        let now = Utc::now();
        let previous = order.assignment.assigned_to;
        let mut update = WorkOrderUpdate::at(now).assign(
            AssignmentSet {
                assigned_to: assignee,
                assigned_by: ctx.user_id,
                assigned_at: now,
            },
            ReassignmentEntry {
                previous,
                assignee,
                reassigned_by: ctx.user_id,
                reassigned_at: now,
                notes,
            },
        );

        let mut status = order.status;
        let mut auto_advanced = false;
        if order.status == WorkOrderStatus::New {
            // The advance acts as a manager but keeps the caller's guard facts
            let guard = GuardContext {
                role: Role::Manager,
                ..GuardContext::derive(ctx, &order)
            };
            match validate(WorkOrderStatus::New, WorkOrderStatus::Assessment, &guard) {
                Ok(_) => {
                    update = update.transition(StatusChange {
                        from: WorkOrderStatus::New,
                        to: WorkOrderStatus::Assessment,
                        changed_by: ctx.user_id,
                        changed_at: now,
                        reason: Some(AUTO_ADVANCE_REASON.to_string()),
                    });
                    status = WorkOrderStatus::Assessment;
                    auto_advanced = true;
                }
                Err(rejection) => {
                    debug!(work_order_id = %id, %rejection, "Skipping auto-advance");
                }
            }
        }

        let filter = UpdateFilter::new(id, ctx.tenant_id)
            .expect_status(order.status)
            .expect_version(order.version);

        let outcome = self.store.conditional_update(filter, update).await?;
        if outcome.matched == 0 {
            warn!(work_order_id = %id, tenant_id = %ctx.tenant_id, "Assignment lost compare-and-swap race");
            return Err(LifecycleError::ConcurrentModification { work_order_id: id });
        }

        info!(
            work_order_id = %id,
            tenant_id = %ctx.tenant_id,
            assignee = %assignee.id,
            kind = assignee.kind.as_str(),
            auto_advanced,
            "Work order assigned"
        );

        Ok(AssignmentOutcome {
            work_order_id: id,
            assignee,
            previous,
            status,
            auto_advanced,
            assigned_at: now,
        })
    }
}
