//! Per-edge guards and the facts they are evaluated against.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::state::{Plan, Role, TenantId, UserId, WorkOrder};

/// Identity of the caller, as resolved by the session layer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceContext {
    pub tenant_id: TenantId,
    pub user_id: UserId,
    pub role: Role,
    #[serde(default)]
    pub plan: Option<Plan>,
    /// Whether the user belongs to the owning organization
    #[serde(default = "default_true")]
    pub is_org_member: bool,
}

fn default_true() -> bool {
    true
}

impl ResourceContext {
    /// An organization member acting under `role`
    pub fn new(tenant_id: TenantId, user_id: UserId, role: Role) -> Self {
        Self {
            tenant_id,
            user_id,
            role,
            plan: None,
            is_org_member: true,
        }
    }

    pub fn with_plan(mut self, plan: Plan) -> Self {
        self.plan = Some(plan);
        self
    }

    pub fn external(mut self) -> Self {
        self.is_org_member = false;
        self
    }
}

/// Facts a guard may inspect
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuardContext {
    pub tenant_id: TenantId,
    pub role: Role,
    pub user_id: UserId,
    #[serde(default)]
    pub plan: Option<Plan>,
    pub is_org_member: bool,
    /// Acting user is the party the order is assigned to
    pub is_assigned_technician: bool,
    /// Evidence references (photos, sign-off sheets) attached by the caller
    #[serde(default)]
    pub evidence_attached: Vec<String>,
}

impl GuardContext {
    /// Derive guard facts from the caller and the stored order
    pub fn derive(ctx: &ResourceContext, order: &WorkOrder) -> Self {
        Self {
            tenant_id: ctx.tenant_id,
            role: ctx.role,
            user_id: ctx.user_id,
            plan: ctx.plan,
            is_org_member: ctx.is_org_member,
            is_assigned_technician: order.is_assigned_to(ctx.user_id),
            evidence_attached: Vec::new(),
        }
    }

    /// Attach evidence references
    pub fn with_evidence(mut self, evidence: impl IntoIterator<Item = String>) -> Self {
        self.evidence_attached.extend(evidence);
        self
    }

    /// Overwrite identity and assignment facts with authoritative values.
    ///
    /// Callers may supply evidence, but never who they are or whether they
    /// hold the assignment.
    pub fn bind(self, ctx: &ResourceContext, order: &WorkOrder) -> Self {
        Self {
            evidence_attached: self.evidence_attached,
            ..Self::derive(ctx, order)
        }
    }
}

/// Contextual predicate attached to a table edge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionGuard {
    /// Acting user belongs to the owning organization
    OrgMember,
    /// Technicians and vendors must be the assigned party
    AssignedFieldWorker,
    /// Assigned field worker with at least one piece of evidence attached
    CompletionEvidence,
    /// Organization plan includes finance posting
    FinancePlan,
}

impl TransitionGuard {
    pub fn evaluate(self, ctx: &GuardContext) -> bool {
        match self {
            Self::OrgMember => ctx.is_org_member,
            Self::AssignedFieldWorker => !ctx.role.is_field_worker() || ctx.is_assigned_technician,
            Self::CompletionEvidence => {
                Self::AssignedFieldWorker.evaluate(ctx)
                    && (!ctx.role.is_field_worker() || !ctx.evidence_attached.is_empty())
            }
            Self::FinancePlan => ctx.plan.is_some_and(Plan::permits_financial_posting),
        }
    }
}

impl fmt::Display for TransitionGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OrgMember => write!(f, "org_member"),
            Self::AssignedFieldWorker => write!(f, "assigned_field_worker"),
            Self::CompletionEvidence => write!(f, "completion_evidence"),
            Self::FinancePlan => write!(f, "finance_plan"),
        }
    }
}
