//! The status table: every legal edge of the work-order graph.
//!
//! ```text
//! NEW ──────────────▶ ASSESSMENT ──────────▶ IN_PROGRESS ◀────────┐
//!  │  ▲                 │    │                 │  │  │  ▲          │
//!  │  │                 │    ▼                 │  │  │  │          │
//!  │  │                 │  PENDING_APPROVAL ───┘  │  │  │ (reopen) │
//!  │  │                 │                         │  │  │          │
//!  │  │                 │       ON_HOLD ◀─────────┘  │  │          │
//!  │  │                 │       PENDING_PARTS ◀──────┘  │          │
//!  │  │                 │                               ▼          │
//!  │  │                 │                         WORK_COMPLETE ───┘
//!  │  │                 │                          │         │
//!  ▼  │                 ▼                          ▼         ▼
//! CANCELLED ◀───────────┘              FINANCIAL_POSTING ──▶ CLOSED
//! ```
//!
//! `CLOSED` is the only status without outgoing edges.

use serde::Serialize;

use super::guard::TransitionGuard;
use crate::state::{Role, WorkOrderStatus};

/// One permitted `from -> to` move
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TransitionEdge {
    pub from: WorkOrderStatus,
    pub to: WorkOrderStatus,
    /// Roles that may ever take this edge
    pub roles: &'static [Role],
    /// Contextual check evaluated in addition to the role set
    pub guard: Option<TransitionGuard>,
}

impl TransitionEdge {
    pub fn permits_role(&self, role: Role) -> bool {
        self.roles.contains(&role)
    }

    /// Leaves an SLA-terminal status for a live one
    pub fn is_reopen(&self) -> bool {
        self.from.is_sla_terminal() && !self.to.is_sla_terminal()
    }
}

const fn edge(
    from: WorkOrderStatus,
    to: WorkOrderStatus,
    roles: &'static [Role],
    guard: Option<TransitionGuard>,
) -> TransitionEdge {
    TransitionEdge {
        from,
        to,
        roles,
        guard,
    }
}

use Role::*;
use TransitionGuard::*;
use WorkOrderStatus::*;

/// The full transition graph
pub const STATUS_TABLE: &[TransitionEdge] = &[
    // Triage
    edge(
        New,
        Assessment,
        &[SuperAdmin, Admin, Manager, PropertyManager, Dispatcher],
        Some(OrgMember),
    ),
    edge(
        New,
        Cancelled,
        &[SuperAdmin, Admin, Manager, PropertyManager, Requester],
        Some(OrgMember),
    ),
    // Assessment
    edge(
        Assessment,
        InProgress,
        &[SuperAdmin, Admin, Manager, Dispatcher, Technician, Vendor],
        Some(AssignedFieldWorker),
    ),
    edge(
        Assessment,
        PendingApproval,
        &[SuperAdmin, Admin, Manager, PropertyManager, Technician],
        Some(AssignedFieldWorker),
    ),
    edge(
        Assessment,
        Cancelled,
        &[SuperAdmin, Admin, Manager, PropertyManager],
        None,
    ),
    // Approval
    edge(
        PendingApproval,
        InProgress,
        &[SuperAdmin, Admin, Manager, PropertyManager],
        None,
    ),
    edge(
        PendingApproval,
        Cancelled,
        &[SuperAdmin, Admin, Manager, PropertyManager],
        None,
    ),
    // Field work
    edge(
        InProgress,
        OnHold,
        &[SuperAdmin, Admin, Manager, Technician, Vendor],
        Some(AssignedFieldWorker),
    ),
    edge(
        InProgress,
        PendingParts,
        &[SuperAdmin, Admin, Manager, Technician],
        Some(AssignedFieldWorker),
    ),
    edge(
        InProgress,
        WorkComplete,
        &[SuperAdmin, Admin, Manager, Technician, Vendor],
        Some(CompletionEvidence),
    ),
    edge(
        OnHold,
        InProgress,
        &[SuperAdmin, Admin, Manager, Technician, Vendor],
        Some(AssignedFieldWorker),
    ),
    edge(OnHold, Cancelled, &[SuperAdmin, Admin, Manager], None),
    edge(
        PendingParts,
        InProgress,
        &[SuperAdmin, Admin, Manager, Technician],
        Some(AssignedFieldWorker),
    ),
    edge(PendingParts, OnHold, &[SuperAdmin, Admin, Manager], None),
    // Close-out
    edge(
        WorkComplete,
        FinancialPosting,
        &[SuperAdmin, Admin, Finance],
        Some(FinancePlan),
    ),
    edge(
        WorkComplete,
        Closed,
        &[SuperAdmin, Admin, Manager, PropertyManager],
        None,
    ),
    // Rework after a failed inspection
    edge(WorkComplete, InProgress, &[SuperAdmin, Admin, Manager], None),
    edge(FinancialPosting, Closed, &[SuperAdmin, Admin, Finance], None),
    // Reinstate a cancelled order
    edge(Cancelled, New, &[SuperAdmin, Admin, Manager], None),
];

/// Look up the edge `from -> to`, if the table has one
pub fn find_edge(from: WorkOrderStatus, to: WorkOrderStatus) -> Option<&'static TransitionEdge> {
    STATUS_TABLE.iter().find(|e| e.from == from && e.to == to)
}

/// Edge exists and `role` is in its role set. Guards are not consulted.
pub fn is_valid_transition(from: WorkOrderStatus, to: WorkOrderStatus, role: Role) -> bool {
    find_edge(from, to).is_some_and(|e| e.permits_role(role))
}

/// Every status reachable from `from`, regardless of role
pub fn valid_transitions(from: WorkOrderStatus) -> Vec<WorkOrderStatus> {
    STATUS_TABLE
        .iter()
        .filter(|e| e.from == from)
        .map(|e| e.to)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::{BTreeSet, HashSet};

    /// Hand-authored reference graph, kept separate from STATUS_TABLE.
    fn reference(from: WorkOrderStatus) -> BTreeSet<WorkOrderStatus> {
        let targets: &[WorkOrderStatus] = match from {
            New => &[Assessment, Cancelled],
            Assessment => &[InProgress, PendingApproval, Cancelled],
            InProgress => &[OnHold, PendingParts, WorkComplete],
            OnHold => &[InProgress, Cancelled],
            PendingParts => &[InProgress, OnHold],
            PendingApproval => &[InProgress, Cancelled],
            WorkComplete => &[FinancialPosting, Closed, InProgress],
            FinancialPosting => &[Closed],
            Closed => &[],
            Cancelled => &[New],
        };
        targets.iter().copied().collect()
    }

    #[test]
    fn test_table_matches_reference_graph() {
        for from in WorkOrderStatus::ALL {
            let actual: BTreeSet<_> = valid_transitions(from).into_iter().collect();
            assert_eq!(actual, reference(from), "edges out of {}", from);
        }
    }

    #[test]
    fn test_no_duplicate_edges() {
        let mut seen = HashSet::new();
        for e in STATUS_TABLE {
            assert!(seen.insert((e.from, e.to)), "duplicate {} -> {}", e.from, e.to);
        }
    }

    #[test]
    fn test_no_self_edges_and_no_empty_role_sets() {
        for e in STATUS_TABLE {
            assert_ne!(e.from, e.to);
            assert!(!e.roles.is_empty(), "{} -> {} has no roles", e.from, e.to);
        }
    }

    #[test]
    fn test_closed_is_the_only_sink() {
        for status in WorkOrderStatus::ALL {
            let sink = valid_transitions(status).is_empty();
            assert_eq!(sink, status == Closed, "{}", status);
        }
    }

    #[test]
    fn test_only_explicit_reopen_leaves_terminal_states() {
        let reopens: Vec<_> = STATUS_TABLE.iter().filter(|e| e.is_reopen()).collect();
        assert_eq!(reopens.len(), 1);
        assert_eq!((reopens[0].from, reopens[0].to), (WorkComplete, InProgress));
    }

    #[test]
    fn test_role_gating() {
        assert!(is_valid_transition(New, Assessment, Dispatcher));
        assert!(!is_valid_transition(New, Assessment, Technician));
        assert!(is_valid_transition(WorkComplete, FinancialPosting, Finance));
        assert!(!is_valid_transition(WorkComplete, FinancialPosting, Manager));
        assert!(!is_valid_transition(New, Closed, SuperAdmin));
    }
}
