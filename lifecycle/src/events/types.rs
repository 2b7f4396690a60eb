//! Lifecycle events published after committed writes

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::state::{Assignee, Priority, TenantId, UserId, WorkOrderId, WorkOrderStatus};
use crate::transitions::Rejection;

/// Everything the engine announces to notification and audit subscribers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LifecycleEvent {
    /// A status transition committed
    StatusChanged {
        tenant_id: TenantId,
        work_order_id: WorkOrderId,
        from: WorkOrderStatus,
        to: WorkOrderStatus,
        changed_by: UserId,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
        timestamp: DateTime<Utc>,
    },

    /// A transition request was refused by the validator
    TransitionRejected {
        tenant_id: TenantId,
        work_order_id: WorkOrderId,
        from: WorkOrderStatus,
        to: WorkOrderStatus,
        requested_by: UserId,
        rejection: Rejection,
        timestamp: DateTime<Utc>,
    },

    /// A work order was bound to a new assignee
    Assigned {
        tenant_id: TenantId,
        work_order_id: WorkOrderId,
        assignee: Assignee,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        previous: Option<Assignee>,
        assigned_by: UserId,
        auto_advanced: bool,
        timestamp: DateTime<Utc>,
    },

    /// Priority was raised and the SLA tightened
    Escalated {
        tenant_id: TenantId,
        work_order_id: WorkOrderId,
        from: Priority,
        to: Priority,
        resolution_deadline: DateTime<Utc>,
        escalated_by: UserId,
        timestamp: DateTime<Utc>,
    },
}

impl LifecycleEvent {
    /// Get the event type as a string
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::StatusChanged { .. } => "status_changed",
            Self::TransitionRejected { .. } => "transition_rejected",
            Self::Assigned { .. } => "assigned",
            Self::Escalated { .. } => "escalated",
        }
    }

    pub fn tenant_id(&self) -> TenantId {
        match self {
            Self::StatusChanged { tenant_id, .. }
            | Self::TransitionRejected { tenant_id, .. }
            | Self::Assigned { tenant_id, .. }
            | Self::Escalated { tenant_id, .. } => *tenant_id,
        }
    }

    pub fn work_order_id(&self) -> WorkOrderId {
        match self {
            Self::StatusChanged { work_order_id, .. }
            | Self::TransitionRejected { work_order_id, .. }
            | Self::Assigned { work_order_id, .. }
            | Self::Escalated { work_order_id, .. } => *work_order_id,
        }
    }
}
