//! Transition Validator: table lookup, role gate, then guard.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::guard::{GuardContext, TransitionGuard};
use super::table::{find_edge, TransitionEdge};
use crate::state::{Role, WorkOrderStatus};

/// Why a requested transition was refused
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Rejection {
    /// The table has no `from -> to` edge
    NoEdge,
    /// The edge exists but the role is outside its role set
    RoleNotPermitted { role: Role },
    /// Role allowed, guard refused this instance
    GuardRejected { guard: TransitionGuard },
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoEdge => write!(f, "no such edge"),
            Self::RoleNotPermitted { role } => write!(f, "role {} may not take this edge", role),
            Self::GuardRejected { guard } => write!(f, "guard {} rejected the request", guard),
        }
    }
}

/// Approve or reject `from -> to` for the caller described by `ctx`
pub fn validate(
    from: WorkOrderStatus,
    to: WorkOrderStatus,
    ctx: &GuardContext,
) -> Result<&'static TransitionEdge, Rejection> {
    let edge = find_edge(from, to).ok_or(Rejection::NoEdge)?;

    if !edge.permits_role(ctx.role) {
        return Err(Rejection::RoleNotPermitted { role: ctx.role });
    }

    if let Some(guard) = edge.guard {
        if !guard.evaluate(ctx) {
            return Err(Rejection::GuardRejected { guard });
        }
    }

    Ok(edge)
}
